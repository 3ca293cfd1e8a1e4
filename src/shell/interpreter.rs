use std::sync::{Arc, Mutex};

use crate::core::commands::{CommandError, CommandExecutor};
use crate::core::config::AliasManager;
use crate::error::ShellError;
use crate::input::History;
use crate::jobs::{Job, JobError, JobManager};
use crate::parser::{parse_line, ParseMode};

/// Evaluates command lines against the shell's shared state: aliases,
/// history and the job table.
pub struct Interpreter {
    executor: CommandExecutor,
    aliases: Arc<Mutex<AliasManager>>,
    history: Arc<Mutex<History>>,
    jobs: JobManager,
    mode: ParseMode,
}

impl Interpreter {
    pub fn new(history: History, mode: ParseMode) -> Self {
        let aliases = Arc::new(Mutex::new(AliasManager::with_defaults()));
        let history = Arc::new(Mutex::new(history));
        let jobs = JobManager::new();
        let executor =
            CommandExecutor::new(Arc::clone(&aliases), Arc::clone(&history), jobs.clone());

        Self {
            executor,
            aliases,
            history,
            jobs,
            mode,
        }
    }

    /// Parses and runs one line. A single stage goes through alias expansion
    /// and may be a built-in; a pipeline is always launched as processes.
    pub fn execute_line(&self, line: &str) -> Result<(), ShellError> {
        let pipeline = parse_line(line, self.mode)?;
        if pipeline.is_empty() {
            return Ok(());
        }
        tracing::debug!(?pipeline, "parsed line");

        if pipeline.len() > 1 {
            return self.executor.execute_pipeline(&pipeline);
        }

        let stage = pipeline.stages[0].clone();
        let stage = self
            .aliases
            .lock()
            .map_err(|_| CommandError::ExecutionError("aliases unavailable".to_string()))?
            .expand_stage(stage);
        self.executor.execute(&stage, pipeline.background)
    }

    /// Appends a line to history. Blank lines are skipped.
    pub fn record(&self, line: &str) {
        match self.history.lock() {
            Ok(mut history) => history.add(line),
            Err(_) => tracing::warn!("history unavailable, line not recorded"),
        }
    }

    #[cfg(test)]
    fn history_entries(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|history| history.entries().to_vec())
            .unwrap_or_default()
    }

    pub fn save_history(&self) -> Result<(), ShellError> {
        let history = self
            .history
            .lock()
            .map_err(|_| CommandError::ExecutionError("history unavailable".to_string()))?;
        history.save()?;
        Ok(())
    }

    /// Background jobs that finished since the last call, removed from the
    /// table.
    pub fn take_finished_jobs(&self) -> Result<Vec<Job>, JobError> {
        self.jobs.take_finished()
    }

    pub fn jobs(&self) -> &JobManager {
        &self.jobs
    }
}
