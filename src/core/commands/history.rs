use super::{Command, CommandError};
use crate::input::History;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// `history [N]`: the last N entries, or all of them, numbered from 1.
#[derive(Clone)]
pub struct HistoryCommand {
    history: Arc<Mutex<History>>,
}

impl HistoryCommand {
    pub fn new(history: Arc<Mutex<History>>) -> Self {
        Self { history }
    }
}

impl Command for HistoryCommand {
    fn execute(&self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        let count = match args.first() {
            Some(n) => Some(n.parse::<usize>().map_err(|_| {
                CommandError::InvalidArguments(format!("history: {}: numeric argument required", n))
            })?),
            None => None,
        };

        let history = self
            .history
            .lock()
            .map_err(|_| CommandError::ExecutionError("history unavailable".to_string()))?;

        for (number, line) in history.recent(count) {
            writeln!(out, "{:4}  {}", number, line)?;
        }
        Ok(())
    }
}
