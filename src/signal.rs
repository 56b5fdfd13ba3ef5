//! SIGINT/SIGTERM to a cooperative cancellation flag.
//!
//! The original keeps a single `volatile sig_atomic_t g_stop_signal`
//! written from a raw handler installed in `MST.cpp`'s `main`. Installing
//! an `extern "C"` signal handler is `unsafe` and not demonstrated
//! anywhere in the pack; `signal-hook`'s `flag::register` is the
//! documented, audited equivalent (see DESIGN.md's Open Question entry).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Registers SIGINT and SIGTERM handlers that flip a shared flag.
    /// Cheap to call once at startup; the returned handle is `Clone`-free
    /// by design since the only thing that reads it is the cooperative
    /// check in star contraction and local search.
    pub fn install() -> std::io::Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag))?;
        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&flag))?;
        Ok(StopSignal(flag))
    }

    /// A handle that never trips, for tests and library-style callers that
    /// don't want signal handling installed process-wide.
    pub fn never() -> Self {
        StopSignal(Arc::new(AtomicBool::new(false)))
    }

    pub fn triggered(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
