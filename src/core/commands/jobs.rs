use super::{Command, CommandError};
use crate::jobs::{parse_job_id, JobManager};
use std::io::Write;

fn job_arg(args: &[String]) -> Result<Option<usize>, CommandError> {
    match args.first() {
        Some(arg) => Ok(Some(parse_job_id(arg)?)),
        None => Ok(None),
    }
}

#[derive(Clone)]
pub struct JobsCommand {
    jobs: JobManager,
}

impl JobsCommand {
    pub fn new(jobs: JobManager) -> Self {
        Self { jobs }
    }
}

impl Command for JobsCommand {
    fn execute(&self, _args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        for job in self.jobs.list()? {
            writeln!(out, "{}", job)?;
        }
        Ok(())
    }
}

/// Forgets a job and prints its command. The process itself is left alone.
#[derive(Clone)]
pub struct FgCommand {
    jobs: JobManager,
}

impl FgCommand {
    pub fn new(jobs: JobManager) -> Self {
        Self { jobs }
    }
}

impl Command for FgCommand {
    fn execute(&self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        let job = self.jobs.bring_to_foreground(job_arg(args)?)?;
        writeln!(out, "{}", job.command)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct BgCommand {
    jobs: JobManager,
}

impl BgCommand {
    pub fn new(jobs: JobManager) -> Self {
        Self { jobs }
    }
}

impl Command for BgCommand {
    fn execute(&self, args: &[String], _out: &mut dyn Write) -> Result<(), CommandError> {
        self.jobs.resume_in_background(job_arg(args)?)?;
        Ok(())
    }
}
