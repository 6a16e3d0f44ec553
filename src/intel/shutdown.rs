//! Ctrl-C / SIGTERM handling for long-running sessions.
//!
//! The handler only raises a flag. Callers poll it and return normally, so
//! `SessionScope` still drops and clears the session marker.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

const SLICE: Duration = Duration::from_millis(100);

static FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    /// Install the process-wide handler once; later calls share the same flag.
    pub fn install() -> Result<Self> {
        if let Some(flag) = FLAG.get() {
            return Ok(Self {
                requested: flag.clone(),
            });
        }

        let flag = Arc::new(AtomicBool::new(false));
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
            .context("failed to install Ctrl-C handler")?;
        let flag = FLAG.get_or_init(|| flag).clone();
        Ok(Self { requested: flag })
    }

    #[cfg(test)]
    fn detached() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Sleep up to `total`, waking early on shutdown. Returns `true` if
    /// shutdown was requested.
    pub fn sleep(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.requested() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(SLICE.min(deadline - now));
        }
    }
}
