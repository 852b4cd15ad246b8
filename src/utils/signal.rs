//! Termination signals
//!
//! Registration is split from waiting so a listener can report that it is
//! armed before the first signal can arrive.

use std::fmt;
use std::io;
use tracing::warn;

/// The termination request that was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM
    Terminate,
    /// SIGINT
    Interrupt,
    /// Ctrl+C on platforms without Unix signals
    CtrlC,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::CtrlC => write!(f, "Ctrl+C"),
        }
    }
}

/// Registered termination signal handlers
///
/// Must be created inside a tokio runtime. Once registered, the signals no
/// longer terminate the process on their own.
pub struct ShutdownSignals {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    /// Install handlers for SIGTERM and SIGINT (Ctrl+C elsewhere)
    pub fn register() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            Ok(Self {
                sigterm: signal(SignalKind::terminate())?,
                sigint: signal(SignalKind::interrupt())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next termination request
    pub async fn recv(&mut self) -> ShutdownSignal {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.sigterm.recv() => ShutdownSignal::Terminate,
                _ = self.sigint.recv() => ShutdownSignal::Interrupt,
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            ShutdownSignal::CtrlC
        }
    }
}

/// Wait for a termination signal
///
/// Returns `None` if no handler could be installed; the caller then never
/// hears about termination.
pub async fn wait_for_shutdown_signal() -> Option<ShutdownSignal> {
    match ShutdownSignals::register() {
        Ok(mut signals) => Some(signals.recv().await),
        Err(e) => {
            warn!("Failed to register shutdown signal handlers: {}", e);
            None
        }
    }
}
