//! Process-level stop request shared with the signal handler.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use signal_hook::consts::signal::{SIGINT, SIGTERM};

/// Signals that request a graceful shutdown.
pub const TERM_SIGNALS: [i32; 2] = [SIGINT, SIGTERM];

/// Lock-free flag raised from signal context and polled by the dispatch loop.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag raised by SIGINT and SIGTERM.
    pub fn install() -> Result<Self> {
        let flag = Self::new();
        for signal in TERM_SIGNALS {
            signal_hook::flag::register(signal, Arc::clone(&flag.0))
                .with_context(|| format!("Failed to register handler for signal {signal}"))?;
        }
        Ok(flag)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = StopFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_raised());

        handle.raise();
        assert!(flag.is_raised());
    }

    #[test]
    fn installed_flag_observes_sigterm() {
        let flag = StopFlag::install().unwrap();
        assert!(!flag.is_raised());

        signal_hook::low_level::raise(SIGTERM).unwrap();
        assert!(flag.is_raised());
    }
}
