//! Launches a parsed [`Pipeline`] as one OS process per stage.
//!
//! Nothing is started until every executable has been resolved, both
//! redirection files are open and every pipe exists. Stages are then spawned
//! in order; stage *i*'s stdout is the write end of the pipe whose read end is
//! stage *i + 1*'s stdin. Only the first stage sees the input file and only
//! the last stage writes the output file. stderr is always inherited.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

use super::{search, ProcessError};
use crate::jobs::{JobManager, JobState};
use crate::parser::Pipeline;

const OUTPUT_MODE: u32 = 0o644;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Completed,
    Detached { job_id: usize, pid: u32 },
}

#[derive(Clone)]
pub struct PipelineLauncher {
    jobs: JobManager,
}

impl PipelineLauncher {
    pub fn new(jobs: JobManager) -> Self {
        Self { jobs }
    }

    /// Runs `pipeline` to completion, or registers it as a job and returns
    /// at once when it is marked for the background.
    pub fn launch(&self, pipeline: &Pipeline) -> Result<LaunchOutcome, ProcessError> {
        if pipeline.is_empty() {
            return Ok(LaunchOutcome::Completed);
        }

        let running = spawn(pipeline)?;
        if pipeline.background {
            let (job_id, pid) = running.detach(&self.jobs)?;
            println!("[{}] {}", job_id, pid);
            Ok(LaunchOutcome::Detached { job_id, pid })
        } else {
            running.wait()?;
            Ok(LaunchOutcome::Completed)
        }
    }
}

/// Every process of a started pipeline.
pub struct RunningPipeline {
    upstream: Vec<(String, Child)>,
    terminal: (String, Child),
    command: String,
}

impl RunningPipeline {
    #[cfg(test)]
    fn pids(&self) -> Vec<u32> {
        self.upstream
            .iter()
            .chain(std::iter::once(&self.terminal))
            .map(|(_, child)| child.id())
            .collect()
    }

    /// Waits for every stage in stage order and reports the first failure.
    ///
    /// All stages are waited on even after a failure so none is left as a
    /// zombie. An upstream stage killed by `SIGPIPE` only means its reader
    /// finished early and does not count as a failure.
    pub fn wait(self) -> Result<(), ProcessError> {
        let mut first_failure = None;

        let stages = self
            .upstream
            .into_iter()
            .map(|stage| (stage, false))
            .chain(std::iter::once((self.terminal, true)));

        for ((name, mut child), is_terminal) in stages {
            match child.wait() {
                Ok(status) => {
                    tracing::debug!(pid = child.id(), %status, "stage {} exited", name);
                    let broken_pipe = !is_terminal && status.signal() == Some(libc::SIGPIPE);
                    if !status.success() && !broken_pipe && first_failure.is_none() {
                        first_failure = Some(ProcessError::Failed {
                            command: name,
                            status,
                        });
                    }
                }
                Err(e) => {
                    if first_failure.is_none() {
                        first_failure = Some(ProcessError::Wait(e));
                    }
                }
            }
        }

        first_failure.map_or(Ok(()), Err)
    }

    /// Registers the pipeline as a job and hands its processes to a waiter
    /// thread. Returns the job id and the pid of the last stage.
    pub fn detach(self, jobs: &JobManager) -> Result<(usize, u32), ProcessError> {
        let RunningPipeline {
            upstream,
            terminal: (name, terminal),
            command,
        } = self;

        let pid = terminal.id();
        let id = match jobs.register(&command, pid) {
            Ok(id) => id,
            Err(e) => {
                let mut children = upstream;
                children.push((name, terminal));
                reap_in_background(children);
                return Err(e.into());
            }
        };

        let waiter_jobs = jobs.clone();
        let handle = thread::Builder::new()
            .name(format!("job-{}", id))
            .spawn(move || {
                // Reaped through waitpid below, so the handle is only kept
                // alive to own the child's resources until then.
                let _terminal = terminal;
                match wait_tracking_stops(pid as libc::pid_t, |state| {
                    let _ = waiter_jobs.set_state(id, state);
                }) {
                    Ok(status) => tracing::debug!(id, %status, "job {} finished", name),
                    Err(e) => tracing::warn!(id, "waiting for job failed: {}", e),
                }

                for (_, mut child) in upstream {
                    let _ = child.wait();
                }

                if let Err(e) = waiter_jobs.set_state(id, JobState::Done) {
                    tracing::warn!(id, "cannot mark job done: {}", e);
                }
            })
            .map_err(|source| ProcessError::Spawn {
                command: format!("job-{}", id),
                source,
            })?;

        jobs.attach_waiter(id, handle)?;
        Ok((id, pid))
    }
}

/// Resolves, wires and starts every stage of `pipeline`.
pub fn spawn(pipeline: &Pipeline) -> Result<RunningPipeline, ProcessError> {
    let programs = pipeline
        .stages
        .iter()
        .map(|stage| {
            let name = stage.program().unwrap_or_default();
            search::resolve(name).ok_or_else(|| ProcessError::CommandNotFound(name.to_string()))
        })
        .collect::<Result<Vec<PathBuf>, _>>()?;

    let mut next_stdin = match pipeline.input() {
        Some(path) => Stdio::from(open_input(path)?),
        None => Stdio::inherit(),
    };
    let mut last_stdout = match pipeline.output() {
        Some((path, append)) => Some(open_output(path, append)?),
        None => None,
    };

    let last = pipeline.len().saturating_sub(1);
    let mut commands = Vec::with_capacity(pipeline.len());

    for (i, (stage, program)) in pipeline.stages.iter().zip(&programs).enumerate() {
        let name = stage.program().unwrap_or_default().to_string();
        tracing::debug!(stage = i, program = %program.display(), "resolved {}", name);

        let mut command = Command::new(program);
        command
            .arg0(&name)
            .args(stage.args.iter().skip(1))
            .stderr(Stdio::inherit());

        let stdin = std::mem::replace(&mut next_stdin, Stdio::inherit());
        command.stdin(stdin);

        if i == last {
            match last_stdout.take() {
                Some(file) => command.stdout(file),
                None => command.stdout(Stdio::inherit()),
            };
        } else {
            let (reader, writer) = pipe().map_err(ProcessError::Pipe)?;
            command.stdout(writer);
            next_stdin = Stdio::from(reader);
        }

        commands.push((name, command));
    }

    // Each Command is dropped right after spawning so the parent's copies of
    // the pipe ends are closed and readers see end of file.
    let mut children: Vec<(String, Child)> = Vec::with_capacity(commands.len());
    for (name, mut command) in commands {
        match command.spawn() {
            Ok(child) => {
                tracing::debug!(pid = child.id(), "spawned {}", name);
                children.push((name, child));
            }
            Err(source) => {
                if !children.is_empty() {
                    tracing::warn!(
                        "{} failed to start, leaving {} earlier stage(s) running",
                        name,
                        children.len()
                    );
                    reap_in_background(children);
                }
                return Err(ProcessError::Spawn {
                    command: name,
                    source,
                });
            }
        }
    }

    let terminal = children.pop().ok_or_else(|| ProcessError::Spawn {
        command: String::new(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "empty pipeline"),
    })?;

    Ok(RunningPipeline {
        upstream: children,
        terminal,
        command: pipeline.command_text(),
    })
}

pub fn open_input(path: &str) -> Result<File, ProcessError> {
    File::open(path).map_err(|source| ProcessError::Redirection {
        path: path.to_string(),
        source,
    })
}

/// Opens an output redirection target, creating it with mode 0644.
pub fn open_output(path: &str, append: bool) -> Result<File, ProcessError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(OUTPUT_MODE);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }

    options.open(path).map_err(|source| ProcessError::Redirection {
        path: path.to_string(),
        source,
    })
}

fn reap_in_background(children: Vec<(String, Child)>) {
    let spawned = thread::Builder::new()
        .name("reaper".to_string())
        .spawn(move || {
            for (_, mut child) in children {
                let _ = child.wait();
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("cannot start reaper thread: {}", e);
    }
}

/// Blocks until `pid` exits, reporting stops and resumptions along the way.
fn wait_tracking_stops<F>(pid: libc::pid_t, on_change: F) -> io::Result<ExitStatus>
where
    F: Fn(JobState),
{
    loop {
        let mut status: libc::c_int = 0;
        // SAFETY: `status` is a valid, writable c_int for the duration of the call.
        let rc = unsafe { libc::waitpid(pid, &mut status, libc::WUNTRACED | libc::WCONTINUED) };
        if rc == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }

        if libc::WIFSTOPPED(status) {
            on_change(JobState::Stopped);
        } else if libc::WIFCONTINUED(status) {
            on_change(JobState::Running);
        } else {
            return Ok(ExitStatus::from_raw(status));
        }
    }
}

/// Creates a pipe whose ends are closed on exec; the child's copies made by
/// dup2 onto stdin/stdout stay open.
fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds: [libc::c_int; 2] = [0; 2];
    // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: pipe(2) succeeded, so both descriptors are open and owned by us.
    let (reader, writer) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    set_cloexec(reader.as_raw_fd())?;
    set_cloexec(writer.as_raw_fd())?;
    Ok((reader, writer))
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
    // SAFETY: F_GETFD and F_SETFD take no pointers; a bad `fd` only yields EBADF.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags == -1 || unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobError;
    use crate::parser::{parse_line, ParseMode};
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, Instant};

    fn pipeline(line: &str) -> Pipeline {
        parse_line(line, ParseMode::Permissive).unwrap()
    }

    fn launcher() -> (PipelineLauncher, JobManager) {
        let jobs = JobManager::new();
        (PipelineLauncher::new(jobs.clone()), jobs)
    }

    fn wait_for_state(jobs: &JobManager, id: usize, state: JobState) {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let current = jobs.get(id).unwrap().map(|job| job.state);
            if current == Some(state) {
                return;
            }
            assert!(Instant::now() < deadline, "job {} never became {}", id, state);
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_truncate_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let (launcher, _) = launcher();

        launcher
            .launch(&pipeline(&format!("echo hi > {}", out.display())))
            .unwrap();
        launcher
            .launch(&pipeline(&format!("echo bye >> {}", out.display())))
            .unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "hi\nbye\n");
    }

    #[test]
    fn test_three_stage_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sorted.txt");
        let (launcher, _) = launcher();

        let line = format!("printf 'b\\na\\nc\\n' | sort | head -n 2 > {}", out.display());
        assert_eq!(
            launcher.launch(&pipeline(&line)).unwrap(),
            LaunchOutcome::Completed
        );
        assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_input_redirection() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let out = dir.path().join("out.txt");
        fs::write(&input, "shout\n").unwrap();
        let (launcher, _) = launcher();

        let line = format!("tr a-z A-Z < {} > {}", input.display(), out.display());
        launcher.launch(&pipeline(&line)).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "SHOUT\n");
    }

    #[test]
    fn test_missing_input_fails_before_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let missing = dir.path().join("missing.txt");

        let line = format!("touch {} < {}", marker.display(), missing.display());
        let result = spawn(&pipeline(&line));

        assert!(matches!(result, Err(ProcessError::Redirection { .. })));
        assert!(!marker.exists());
    }

    #[test]
    fn test_unresolvable_stage_starts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");

        let line = format!("touch {} | strand-no-such-program", marker.display());
        let result = spawn(&pipeline(&line));

        match result {
            Err(ProcessError::CommandNotFound(name)) => {
                assert_eq!(name, "strand-no-such-program")
            }
            _ => panic!("expected CommandNotFound"),
        }
        assert!(!marker.exists());
    }

    #[test]
    fn test_first_failure_is_reported() {
        let (launcher, _) = launcher();

        match launcher.launch(&pipeline("false | true")) {
            Err(ProcessError::Failed { command, status }) => {
                assert_eq!(command, "false");
                assert_eq!(status.code(), Some(1));
            }
            _ => panic!("expected the failing stage"),
        }
        assert!(launcher.launch(&pipeline("true | true")).is_ok());
    }

    #[test]
    fn test_broken_pipe_upstream_is_not_a_failure() {
        let (launcher, _) = launcher();
        assert!(launcher.launch(&pipeline("yes | head -n 1")).is_ok());
    }

    #[test]
    fn test_running_pipeline_pids() {
        let running = spawn(&pipeline("true | true | true")).unwrap();
        assert_eq!(running.pids().len(), 3);
        running.wait().unwrap();
    }

    #[test]
    fn test_failed_registration_still_reaps_stages() {
        let jobs = JobManager::new();
        let running = spawn(&pipeline("true | true")).unwrap();
        let pids = running.pids();
        jobs.poison();

        assert!(matches!(
            running.detach(&jobs),
            Err(ProcessError::Job(JobError::Poisoned))
        ));

        // A zombie keeps its /proc entry until it is reaped.
        let deadline = Instant::now() + Duration::from_secs(10);
        for pid in pids {
            let entry = format!("/proc/{}", pid);
            while Path::new(&entry).exists() {
                assert!(Instant::now() < deadline, "stage {} was never reaped", pid);
                thread::sleep(Duration::from_millis(20));
            }
        }
    }

    #[test]
    fn test_background_job_lifecycle() {
        let (launcher, jobs) = launcher();

        let outcome = launcher.launch(&pipeline("sleep 0.3 | cat &")).unwrap();
        let LaunchOutcome::Detached { job_id, pid } = outcome else {
            panic!("expected a detached pipeline");
        };
        assert_eq!(job_id, 1);

        let listed = jobs.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].pid, pid);
        assert_eq!(listed[0].command, "sleep 0.3 | cat");
        assert_eq!(listed[0].state, JobState::Running);

        wait_for_state(&jobs, job_id, JobState::Done);
        let finished = jobs.take_finished().unwrap();
        assert_eq!(finished.len(), 1);

        let outcome = launcher.launch(&pipeline("true &")).unwrap();
        assert!(matches!(outcome, LaunchOutcome::Detached { job_id: 2, .. }));
    }

    #[test]
    fn test_stop_and_continue_are_tracked() {
        let (launcher, jobs) = launcher();

        let LaunchOutcome::Detached { job_id, pid } =
            launcher.launch(&pipeline("sleep 30 &")).unwrap()
        else {
            panic!("expected a detached pipeline");
        };
        let pid = pid as libc::pid_t;

        unsafe { libc::kill(pid, libc::SIGSTOP) };
        wait_for_state(&jobs, job_id, JobState::Stopped);

        unsafe { libc::kill(pid, libc::SIGCONT) };
        wait_for_state(&jobs, job_id, JobState::Running);

        unsafe { libc::kill(pid, libc::SIGKILL) };
        wait_for_state(&jobs, job_id, JobState::Done);
    }

    #[test]
    fn test_output_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.txt");
        open_output(path.to_str().unwrap(), false).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o002, 0);
    }
}
