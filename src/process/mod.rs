use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use crate::jobs::JobError;

pub mod pipeline;
pub mod search;
pub mod signal;

pub use pipeline::{LaunchOutcome, PipelineLauncher, RunningPipeline};
pub use signal::{SignalDispatcher, SignalEvent};

#[derive(Debug)]
pub enum ProcessError {
    CommandNotFound(String),
    Redirection {
        path: String,
        source: std::io::Error,
    },
    Pipe(std::io::Error),
    Spawn {
        command: String,
        source: std::io::Error,
    },
    Wait(std::io::Error),
    Failed {
        command: String,
        status: ExitStatus,
    },
    Job(JobError),
}

impl ProcessError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ProcessError::CommandNotFound(_) => 127,
            ProcessError::Spawn { .. } => 126,
            ProcessError::Failed { status, .. } => status
                .code()
                .or_else(|| status.signal().map(|sig| 128 + sig))
                .unwrap_or(1),
            _ => 1,
        }
    }
}

impl From<JobError> for ProcessError {
    fn from(e: JobError) -> Self {
        ProcessError::Job(e)
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::CommandNotFound(cmd) => write!(f, "{}: command not found", cmd),
            ProcessError::Redirection { path, source } => write!(f, "{}: {}", path, source),
            ProcessError::Pipe(e) => write!(f, "cannot create pipe: {}", e),
            ProcessError::Spawn { command, source } => write!(f, "{}: {}", command, source),
            ProcessError::Wait(e) => write!(f, "wait failed: {}", e),
            ProcessError::Failed { command, status } => write!(f, "{}: {}", command, status),
            ProcessError::Job(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessError::Redirection { source, .. } | ProcessError::Spawn { source, .. } => {
                Some(source)
            }
            ProcessError::Pipe(e) | ProcessError::Wait(e) => Some(e),
            ProcessError::Job(e) => Some(e),
            _ => None,
        }
    }
}
