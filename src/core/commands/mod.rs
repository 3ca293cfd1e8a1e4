use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

mod alias;
mod builtin;
mod cd;
mod export;
mod history;
mod jobs;

pub use alias::{AliasCommand, UnaliasCommand};
pub use builtin::{EchoCommand, ExitCommand, PwdCommand};
pub use cd::CdCommand;
pub use export::ExportCommand;
pub use history::HistoryCommand;
pub use jobs::{BgCommand, FgCommand, JobsCommand};

use crate::core::config::AliasManager;
use crate::error::ShellError;
use crate::input::history::HistoryError;
use crate::input::History;
use crate::jobs::{JobError, JobManager};
use crate::parser::{Pipeline, Stage};
use crate::process::pipeline::{open_input, open_output};
use crate::process::PipelineLauncher;

#[derive(Debug)]
pub enum CommandError {
    InvalidArguments(String),
    ExecutionError(String),
    IoError(std::io::Error),
    HistoryError(HistoryError),
    JobError(JobError),
    HomeDirNotFound,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::InvalidArguments(msg) => write!(f, "{}", msg),
            CommandError::ExecutionError(msg) => write!(f, "{}", msg),
            CommandError::IoError(err) => write!(f, "{}", err),
            CommandError::HistoryError(err) => write!(f, "{}", err),
            CommandError::JobError(err) => write!(f, "{}", err),
            CommandError::HomeDirNotFound => write!(f, "home directory not found"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::IoError(err) => Some(err),
            CommandError::HistoryError(err) => Some(err),
            CommandError::JobError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::IoError(err)
    }
}

impl From<HistoryError> for CommandError {
    fn from(err: HistoryError) -> Self {
        CommandError::HistoryError(err)
    }
}

impl From<JobError> for CommandError {
    fn from(err: JobError) -> Self {
        CommandError::JobError(err)
    }
}

/// A command run inside the shell process. `args` excludes the command name;
/// regular output goes to `out`.
pub trait Command {
    fn execute(&self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError>;
}

#[derive(Clone)]
enum CommandType {
    Cd(CdCommand),
    Pwd(PwdCommand),
    Echo(EchoCommand),
    Export(ExportCommand),
    History(HistoryCommand),
    Alias(AliasCommand),
    Unalias(UnaliasCommand),
    Jobs(JobsCommand),
    Fg(FgCommand),
    Bg(BgCommand),
    Exit(ExitCommand),
}

impl Command for CommandType {
    fn execute(&self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        match self {
            CommandType::Cd(cmd) => cmd.execute(args, out),
            CommandType::Pwd(cmd) => cmd.execute(args, out),
            CommandType::Echo(cmd) => cmd.execute(args, out),
            CommandType::Export(cmd) => cmd.execute(args, out),
            CommandType::History(cmd) => cmd.execute(args, out),
            CommandType::Alias(cmd) => cmd.execute(args, out),
            CommandType::Unalias(cmd) => cmd.execute(args, out),
            CommandType::Jobs(cmd) => cmd.execute(args, out),
            CommandType::Fg(cmd) => cmd.execute(args, out),
            CommandType::Bg(cmd) => cmd.execute(args, out),
            CommandType::Exit(cmd) => cmd.execute(args, out),
        }
    }
}

/// Routes a stage to a built-in command or to the pipeline launcher.
pub struct CommandExecutor {
    commands: BTreeMap<&'static str, CommandType>,
    launcher: PipelineLauncher,
}

impl CommandExecutor {
    pub fn new(
        aliases: Arc<Mutex<AliasManager>>,
        history: Arc<Mutex<History>>,
        jobs: JobManager,
    ) -> Self {
        let mut commands = BTreeMap::new();

        commands.insert("cd", CommandType::Cd(CdCommand::new()));
        commands.insert("pwd", CommandType::Pwd(PwdCommand));
        commands.insert("echo", CommandType::Echo(EchoCommand));
        commands.insert("export", CommandType::Export(ExportCommand));
        commands.insert(
            "history",
            CommandType::History(HistoryCommand::new(Arc::clone(&history))),
        );
        commands.insert(
            "alias",
            CommandType::Alias(AliasCommand::new(Arc::clone(&aliases))),
        );
        commands.insert("unalias", CommandType::Unalias(UnaliasCommand::new(aliases)));
        commands.insert("jobs", CommandType::Jobs(JobsCommand::new(jobs.clone())));
        commands.insert("fg", CommandType::Fg(FgCommand::new(jobs.clone())));
        commands.insert("bg", CommandType::Bg(BgCommand::new(jobs.clone())));
        commands.insert("exit", CommandType::Exit(ExitCommand::new(history)));

        Self {
            commands,
            launcher: PipelineLauncher::new(jobs),
        }
    }

    #[cfg(test)]
    fn is_builtin(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Runs a single stage. Built-ins honor the stage's redirections and
    /// never run in the background.
    pub fn execute(&self, stage: &Stage, background: bool) -> Result<(), ShellError> {
        let Some(name) = stage.program() else {
            return Ok(());
        };

        let Some(command) = self.commands.get(name) else {
            return self.execute_pipeline(&Pipeline::single(stage.clone(), background));
        };

        tracing::debug!(builtin = name, args = ?&stage.args[1..], "running builtin");
        if let Some(path) = &stage.input {
            open_input(path)?;
        }

        match &stage.output {
            Some(path) => {
                let mut file = open_output(path, stage.append)?;
                command.execute(&stage.args[1..], &mut file)?;
            }
            None => {
                let mut stdout = io::stdout().lock();
                command.execute(&stage.args[1..], &mut stdout)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    pub fn execute_pipeline(&self, pipeline: &Pipeline) -> Result<(), ShellError> {
        self.launcher.launch(pipeline)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_stage, ParseMode};
    use std::fs;

    fn executor(dir: &std::path::Path) -> CommandExecutor {
        let history = History::new(dir.join("history"), 100).unwrap();
        CommandExecutor::new(
            Arc::new(Mutex::new(AliasManager::with_defaults())),
            Arc::new(Mutex::new(history)),
            JobManager::new(),
        )
    }

    #[test]
    fn test_builtin_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(dir.path());

        for name in ["cd", "pwd", "echo", "export", "history", "alias", "unalias", "jobs", "fg", "bg", "exit"] {
            assert!(executor.is_builtin(name), "{} should be a builtin", name);
        }
        assert!(!executor.is_builtin("ls"));
    }

    #[test]
    fn test_builtin_output_redirection() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(dir.path());
        let target = dir.path().join("greeting.txt");

        let line = format!("echo hello world > {}", target.display());
        let stage = parse_stage(&line, ParseMode::Permissive).unwrap();
        executor.execute(&stage, false).unwrap();

        let line = format!("echo again >> {}", target.display());
        let stage = parse_stage(&line, ParseMode::Permissive).unwrap();
        executor.execute(&stage, false).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "hello world\nagain\n");
    }

    #[test]
    fn test_builtin_missing_input_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(dir.path());

        let line = format!("pwd < {}", dir.path().join("absent").display());
        let stage = parse_stage(&line, ParseMode::Permissive).unwrap();
        assert!(matches!(
            executor.execute(&stage, false),
            Err(ShellError::Process(_))
        ));
    }

    #[test]
    fn test_external_command_runs() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(dir.path());
        let target = dir.path().join("out.txt");

        let line = format!("printf abc > {}", target.display());
        let stage = parse_stage(&line, ParseMode::Permissive).unwrap();
        executor.execute(&stage, false).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "abc");
    }

    #[test]
    fn test_unknown_command() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(dir.path());

        let stage = parse_stage("strand-no-such-program", ParseMode::Permissive).unwrap();
        let err = executor.execute(&stage, false).unwrap_err();
        assert_eq!(err.exit_code(), 127);
    }
}
