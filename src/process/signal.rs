use std::io::{self, Write};
use std::thread::{self, JoinHandle};

use signal_hook::consts::{SIGINT, SIGTSTP};
use signal_hook::iterator::{Handle, Signals};

use crate::error::ShellError;

/// What the shell makes of a terminal signal it receives itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Interrupt,
    Stop,
}

impl SignalEvent {
    pub const SIGNALS: [libc::c_int; 2] = [SIGINT, SIGTSTP];

    pub fn from_raw(signal: libc::c_int) -> Option<Self> {
        match signal {
            SIGINT => Some(SignalEvent::Interrupt),
            SIGTSTP => Some(SignalEvent::Stop),
            _ => None,
        }
    }

    pub fn notice(self) -> &'static str {
        match self {
            SignalEvent::Interrupt => "(Use 'exit' to quit)",
            SignalEvent::Stop => "(Job stopped - use 'fg' to resume)",
        }
    }

    /// Whether the prompt is printed again after the notice.
    pub fn reprompts(self) -> bool {
        matches!(self, SignalEvent::Interrupt)
    }
}

/// Listens for SIGINT and SIGTSTP on a dedicated thread for as long as it
/// lives. Neither signal is forwarded to children and no job changes state;
/// the shell only prints a notice.
pub struct SignalDispatcher {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalDispatcher {
    /// Prints each notice on stdout, followed by `prompt()` after an interrupt.
    pub fn start<P>(prompt: P) -> Result<Self, ShellError>
    where
        P: Fn() -> String + Send + 'static,
    {
        Self::start_with(move |event| {
            let _ = write_notice(&mut io::stdout().lock(), event, &prompt);
        })
    }

    /// Hands every event to `sink` on the listener thread.
    pub fn start_with<S>(mut sink: S) -> Result<Self, ShellError>
    where
        S: FnMut(SignalEvent) + Send + 'static,
    {
        let mut signals = Signals::new(SignalEvent::SIGNALS)
            .map_err(|e| ShellError::SignalError(e.to_string()))?;
        let handle = signals.handle();

        let thread = thread::Builder::new()
            .name("signals".to_string())
            .spawn(move || {
                for raw in signals.forever() {
                    if let Some(event) = SignalEvent::from_raw(raw) {
                        tracing::debug!(?event, "received signal {}", raw);
                        sink(event);
                    }
                }
            })
            .map_err(|e| ShellError::SignalError(e.to_string()))?;

        Ok(SignalDispatcher {
            handle,
            thread: Some(thread),
        })
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn write_notice<P>(out: &mut dyn Write, event: SignalEvent, prompt: P) -> io::Result<()>
where
    P: Fn() -> String,
{
    writeln!(out, "\n{}", event.notice())?;
    if event.reprompts() {
        write!(out, "{}", prompt())?;
    }
    out.flush()
}

impl Drop for SignalDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
