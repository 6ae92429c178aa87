//! Interrupt handling.
//!
//! A watcher owns the only code path that cancels the shared token in
//! response to a signal. Everything that can block on the network takes the
//! token and races it.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use tokio_util::sync::CancellationToken;

/// Result of a call that the user may abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool { matches!(self, Self::Cancelled) }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Background task that cancels a token when its signal fires.
///
/// Dropping the watcher stops watching; the token keeps whatever state it
/// reached.
pub struct SignalWatcher {
    token:  CancellationToken,
    handle: JoinHandle<()>,
}

impl SignalWatcher {
    /// Cancel `token` once `signal` resolves, unless the token is cancelled
    /// some other way first.
    pub fn spawn<S>(token: CancellationToken, signal: S) -> Self
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let watched = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = watched.cancelled() => {}
                _ = signal => {
                    debug!("interrupt received, cancelling");
                    watched.cancel();
                }
            }
        });
        Self { token, handle }
    }

    /// Watch for Ctrl-C.
    pub fn interrupt(token: CancellationToken) -> Self {
        Self::spawn(token, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for interrupts");
                std::future::pending::<()>().await;
            }
        })
    }

    pub fn token(&self) -> &CancellationToken { &self.token }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) { self.handle.abort(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn signal_cancels_token_once() {
        let (fire, signal) = oneshot::channel::<()>();
        let watcher = SignalWatcher::spawn(CancellationToken::new(), async move {
            let _ = signal.await;
        });
        assert!(!watcher.token().is_cancelled());

        fire.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), watcher.token().cancelled())
            .await
            .unwrap();
        assert!(watcher.token().is_cancelled());
    }

    #[tokio::test]
    async fn dropping_watcher_leaves_token_armed() {
        let token = CancellationToken::new();
        let (_fire, signal) = oneshot::channel::<()>();
        let watcher = SignalWatcher::spawn(token.clone(), async move {
            let _ = signal.await;
        });
        drop(watcher);
        tokio::task::yield_now().await;

        assert!(!token.is_cancelled());
    }

    #[test]
    fn outcome_helpers() {
        assert_eq!(Outcome::Completed(2).map(|v| v * 2).completed(), Some(4));
        assert!(Outcome::<u8>::Cancelled.is_cancelled());
        assert_eq!(Outcome::<u8>::Cancelled.completed(), None);
    }
}
