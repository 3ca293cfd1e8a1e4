use crate::core::commands::CommandError;
use crate::jobs::JobError;
use crate::parser::ParseError;
use crate::process::ProcessError;

#[derive(Debug)]
pub enum ShellError {
    Readline(rustyline::error::ReadlineError),
    Io(std::io::Error),
    HomeDirNotFound,
    FlagError(String),
    SignalError(String),
    Parse(ParseError),
    Process(ProcessError),
    Command(CommandError),
    Job(JobError),
}

impl ShellError {
    /// Status reported to the parent when a line is run with `--command`.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShellError::Process(e) => e.exit_code(),
            ShellError::Parse(_) | ShellError::FlagError(_) => 2,
            _ => 1,
        }
    }
}

impl From<rustyline::error::ReadlineError> for ShellError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        ShellError::Readline(err)
    }
}

impl From<std::io::Error> for ShellError {
    fn from(err: std::io::Error) -> Self {
        ShellError::Io(err)
    }
}

impl From<ParseError> for ShellError {
    fn from(err: ParseError) -> Self {
        ShellError::Parse(err)
    }
}

impl From<ProcessError> for ShellError {
    fn from(err: ProcessError) -> Self {
        ShellError::Process(err)
    }
}

impl From<CommandError> for ShellError {
    fn from(err: CommandError) -> Self {
        ShellError::Command(err)
    }
}

impl From<crate::input::HistoryError> for ShellError {
    fn from(err: crate::input::HistoryError) -> Self {
        ShellError::Command(CommandError::HistoryError(err))
    }
}

impl From<JobError> for ShellError {
    fn from(err: JobError) -> Self {
        ShellError::Job(err)
    }
}

impl std::fmt::Display for ShellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShellError::Readline(e) => write!(f, "readline error: {}", e),
            ShellError::Io(e) => write!(f, "IO error: {}", e),
            ShellError::HomeDirNotFound => write!(f, "home directory not found"),
            ShellError::FlagError(msg) => write!(f, "flag error: {}", msg),
            ShellError::SignalError(msg) => write!(f, "signal error: {}", msg),
            ShellError::Parse(e) => write!(f, "parse error: {}", e),
            ShellError::Process(e) => write!(f, "{}", e),
            ShellError::Command(e) => write!(f, "{}", e),
            ShellError::Job(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ShellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShellError::Readline(e) => Some(e),
            ShellError::Io(e) => Some(e),
            ShellError::Parse(e) => Some(e),
            ShellError::Process(e) => Some(e),
            ShellError::Command(e) => Some(e),
            ShellError::Job(e) => Some(e),
            _ => None,
        }
    }
}
