use std::io::{self, Write};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

mod interpreter;
mod prompt;

pub use interpreter::Interpreter;
pub use prompt::Prompt;

use crate::{
    core::config::{read_rc_lines, ConfigPaths},
    error::ShellError,
    flags::Flags,
    input::History,
    parser::ParseMode,
    process::{ProcessError, SignalDispatcher, SignalEvent},
};

pub struct Shell {
    editor: DefaultEditor,
    interpreter: Interpreter,
    prompt: Prompt,
    paths: ConfigPaths,
    flags: Flags,
}

/// Parse mode selected by `--strict`.
pub fn parse_mode(flags: &Flags) -> ParseMode {
    if flags.is_set("strict") {
        ParseMode::Strict
    } else {
        ParseMode::Permissive
    }
}

/// Writes `error` with the `strand: ` prefix. `quiet` only drops the exit
/// status report of a command that ran and failed.
pub fn report_error(out: &mut dyn Write, error: &ShellError, quiet: bool) {
    if quiet && matches!(error, ShellError::Process(ProcessError::Failed { .. })) {
        return;
    }
    let _ = writeln!(out, "strand: {}", error);
}

impl Shell {
    pub fn new(flags: Flags) -> Result<Self, ShellError> {
        let paths = ConfigPaths::new()?;
        let history = History::new(paths.history_path.clone(), History::DEFAULT_MAX_ENTRIES)?;

        let mut editor = DefaultEditor::new()?;
        for entry in history.entries() {
            editor.add_history_entry(entry.as_str())?;
        }

        Ok(Shell {
            editor,
            interpreter: Interpreter::new(history, parse_mode(&flags)),
            prompt: Prompt::new(),
            paths,
            flags,
        })
    }

    /// Runs a single line without an editor, for `--command`, and returns
    /// its exit status. Errors go to `err`.
    pub fn run_command(flags: &Flags, line: &str, err: &mut dyn Write) -> i32 {
        match Self::evaluate_once(flags, line) {
            Ok(()) => 0,
            Err(e) => {
                report_error(err, &e, flags.is_set("quiet"));
                e.exit_code()
            }
        }
    }

    fn evaluate_once(flags: &Flags, line: &str) -> Result<(), ShellError> {
        let paths = ConfigPaths::new()?;
        let history = History::new(paths.history_path, History::DEFAULT_MAX_ENTRIES)?;
        Interpreter::new(history, parse_mode(flags)).execute_line(line)
    }

    pub fn run(&mut self) -> Result<(), ShellError> {
        let signals = if self.quiet() {
            SignalDispatcher::start_with(|_| {})?
        } else {
            let prompt = self.prompt.clone();
            SignalDispatcher::start(move || prompt.render())?
        };

        self.load_rc();

        loop {
            self.report_finished_jobs();

            match self.editor.readline(&self.prompt.render()) {
                Ok(line) => {
                    if let Err(e) = self.interpreter.execute_line(&line) {
                        self.report_error(&e);
                    }

                    if !line.trim().is_empty() {
                        if let Err(e) = self.editor.add_history_entry(line.trim()) {
                            tracing::warn!("couldn't add to line editor history: {}", e);
                        }
                        self.interpreter.record(&line);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    if !self.quiet() {
                        println!("{}", SignalEvent::Interrupt.notice());
                    }
                }
                Err(ReadlineError::Eof) => {
                    if !self.quiet() {
                        println!("exit");
                    }
                    break;
                }
                Err(e) => {
                    self.report_error(&ShellError::from(e));
                    break;
                }
            }
        }

        signals.shutdown();
        self.interpreter.save_history()
    }

    fn load_rc(&self) {
        let lines = match read_rc_lines(&self.paths.rc_path) {
            Ok(lines) => lines,
            Err(e) => {
                self.report_error(&e);
                return;
            }
        };

        tracing::debug!(
            lines = lines.len(),
            "loading {}",
            self.paths.rc_path.display()
        );
        for line in lines {
            if let Err(e) = self.interpreter.execute_line(&line) {
                self.report_error(&e);
            }
        }
    }

    fn report_finished_jobs(&self) {
        match self.interpreter.take_finished_jobs() {
            Ok(finished) => {
                if !self.quiet() {
                    for job in finished {
                        println!("{}", job);
                    }
                }
            }
            Err(e) => self.report_error(&ShellError::from(e)),
        }
    }

    fn report_error(&self, error: &ShellError) {
        report_error(&mut io::stderr().lock(), error, self.quiet());
    }

    fn quiet(&self) -> bool {
        self.flags.is_set("quiet")
    }
}
