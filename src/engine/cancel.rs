use crate::error::CancelledError;
use std::sync::{Arc, OnceLock};
#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
#[cfg(unix)]
use tracing::warn;

/// Run-wide cancellation: a token every worker observes plus the first reason given
///
/// Cancellation is one-way. A cancelled run cannot resume; start a fresh one.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelledError>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger cancellation. Returns true only for the call whose reason was recorded.
    pub fn cancel(&self, reason: CancelledError) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.token.cancel();
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<&CancelledError> {
        self.reason.get()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Cancel with [`CancelledError::Interrupted`] on Ctrl-C (and SIGTERM on unix)
    ///
    /// Signal handlers are registered before this returns, so an interrupt
    /// arriving right after the call is never lost to the default disposition.
    /// The listener exits on its own once the run is cancelled for any reason.
    pub fn watch_interrupt(&self) -> JoinHandle<()> {
        let mut interrupts = InterruptListener::install();
        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = interrupts.recv() => {
                    eprintln!("\nInterrupt received, shutting down...");
                    info!("Interrupt received");
                    this.cancel(CancelledError::Interrupted);
                }
                _ = this.cancelled() => {}
            }
        })
    }
}

#[cfg(unix)]
struct InterruptListener {
    interrupt: Option<Signal>,
    terminate: Option<Signal>,
}

#[cfg(unix)]
impl InterruptListener {
    fn install() -> Self {
        Self {
            interrupt: register(SignalKind::interrupt(), "SIGINT"),
            terminate: register(SignalKind::terminate(), "SIGTERM"),
        }
    }

    async fn recv(&mut self) {
        tokio::select! {
            Some(()) = next(&mut self.interrupt) => {}
            Some(()) = next(&mut self.terminate) => {}
            else => std::future::pending::<()>().await,
        }
    }
}

#[cfg(unix)]
fn register(kind: SignalKind, name: &str) -> Option<Signal> {
    match signal(kind) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(error = %e, signal = name, "Failed to install signal handler");
            None
        }
    }
}

#[cfg(unix)]
async fn next(stream: &mut Option<Signal>) -> Option<()> {
    match stream {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(not(unix))]
struct InterruptListener;

#[cfg(not(unix))]
impl InterruptListener {
    fn install() -> Self {
        Self
    }

    async fn recv(&mut self) {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_first_reason_wins() {
        let cancellation = Cancellation::new();
        assert!(!cancellation.is_cancelled());
        assert!(cancellation.reason().is_none());

        let failure = CancelledError::FailurePolicy {
            path: PathBuf::from("/a"),
        };
        assert!(cancellation.cancel(failure.clone()));
        assert!(!cancellation.cancel(CancelledError::Interrupted));

        assert!(cancellation.is_cancelled());
        assert_eq!(cancellation.reason(), Some(&failure));
    }

    #[test]
    fn test_clones_share_state() {
        let cancellation = Cancellation::new();
        let worker_view = cancellation.clone();
        let token = cancellation.token().clone();

        cancellation.cancel(CancelledError::Interrupted);
        assert!(worker_view.is_cancelled());
        assert!(token.is_cancelled());
        assert_eq!(worker_view.reason(), Some(&CancelledError::Interrupted));
    }

    #[tokio::test]
    async fn test_interrupt_listener_stops_after_cancel() {
        let cancellation = Cancellation::new();
        let listener = cancellation.watch_interrupt();

        cancellation.cancel(CancelledError::Interrupted);
        listener.await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_interrupt_right_after_install_cancels() {
        let cancellation = Cancellation::new();
        let listener = cancellation.watch_interrupt();

        // Sent before the listener task has had a chance to run
        let status = std::process::Command::new("kill")
            .args(["-INT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(std::time::Duration::from_secs(5), listener)
            .await
            .expect("interrupt was not observed")
            .unwrap();
        assert_eq!(cancellation.reason(), Some(&CancelledError::Interrupted));
    }
}
