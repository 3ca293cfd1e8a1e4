use super::{Command, CommandError};
use crate::input::History;
use std::env;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Saves history and ends the process with the given status.
#[derive(Clone)]
pub struct ExitCommand {
    history: Arc<Mutex<History>>,
}

impl ExitCommand {
    pub fn new(history: Arc<Mutex<History>>) -> Self {
        Self { history }
    }

    fn status(args: &[String]) -> Result<i32, CommandError> {
        match args.first() {
            None => Ok(0),
            Some(code) => code.parse().map_err(|_| {
                CommandError::InvalidArguments(format!("exit: {}: numeric argument required", code))
            }),
        }
    }
}

impl Command for ExitCommand {
    fn execute(&self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        let status = Self::status(args)?;
        out.flush()?;

        match self.history.lock() {
            Ok(history) => {
                if let Err(e) = history.save() {
                    tracing::warn!("could not save history: {}", e);
                }
            }
            Err(_) => tracing::warn!("history unavailable, not saved"),
        }
        std::process::exit(status);
    }
}

#[derive(Clone, Default)]
pub struct PwdCommand;

impl Command for PwdCommand {
    fn execute(&self, _args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        let cwd = env::current_dir()?;
        writeln!(out, "{}", cwd.display())?;
        Ok(())
    }
}

/// Arguments joined by single spaces.
#[derive(Clone, Default)]
pub struct EchoCommand;

impl Command for EchoCommand {
    fn execute(&self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        writeln!(out, "{}", args.join(" "))?;
        Ok(())
    }
}
