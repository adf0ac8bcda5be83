//! Shutdown signalling for relay tasks.
//!
//! A [`Shutdown`] is created once per relay; each task receives a cloned
//! [`ShutdownSignal`] and checks it before starting another loop iteration.

use std::fmt;

use tokio::signal;
use tokio::sync::watch;

/// Reason for shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT signal received (Ctrl+C).
    SigInt,
    /// SIGTERM signal received.
    SigTerm,
    /// Programmatic shutdown.
    Programmatic(String),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SigInt => write!(f, "SIGINT (Ctrl+C)"),
            Self::SigTerm => write!(f, "SIGTERM"),
            Self::Programmatic(reason) => write!(f, "programmatic: {reason}"),
        }
    }
}

/// Trigger side of the shutdown signal.
pub struct Shutdown {
    tx: watch::Sender<Option<ShutdownReason>>,
}

impl Shutdown {
    /// Create an untriggered shutdown.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Get a listener for this shutdown.
    #[must_use]
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger shutdown. Only the first reason is kept.
    pub fn trigger(&self, reason: ShutdownReason) {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            tracing::info!(%reason, "triggering shutdown");
            *current = Some(reason);
            true
        });
    }

    /// Reason recorded by the first [`trigger`](Self::trigger), if any.
    #[must_use]
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.tx.borrow().clone()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener side of the shutdown signal.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownSignal {
    /// Whether shutdown has been triggered.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait until shutdown is triggered.
    ///
    /// Also resolves if the [`Shutdown`] was dropped, since nothing can trigger it
    /// any more.
    pub async fn triggered(&mut self) {
        while self.rx.borrow_and_update().is_none() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Wait for SIGINT or (on unix) SIGTERM.
pub async fn wait_for_termination() -> ShutdownReason {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to register ctrl-c handler: {}", e);
            std::future::pending::<()>().await;
        }
        ShutdownReason::SigInt
    };

    #[cfg(unix)]
    let term = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                ShutdownReason::SigTerm
            }
            Err(e) => {
                tracing::error!("failed to register SIGTERM handler: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let term = std::future::pending::<ShutdownReason>();

    tokio::select! {
        reason = ctrl_c => reason,
        reason = term => reason,
    }
}
