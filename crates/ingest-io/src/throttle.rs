//! Memory-based backpressure (`spec.md` §5 "memory throttling"). A
//! background task samples this process's RSS via `sysinfo` and flips a
//! shared gate the source loop checks between reads: pause once RSS
//! crosses `throttle_pause_mb`, resume only once it falls back to
//! `throttle_resume_mb` (hysteresis avoids pause/resume flapping right at
//! one threshold).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ingest_core::JobState;
use sysinfo::System;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
const POLL_WHILE_PAUSED: Duration = Duration::from_millis(50);

pub struct ThrottleGate {
    paused: AtomicBool,
}

impl ThrottleGate {
    pub fn new() -> Arc<Self> {
        Arc::new(ThrottleGate {
            paused: AtomicBool::new(false),
        })
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    fn set_paused(&self, value: bool) {
        self.paused.store(value, Ordering::Relaxed);
    }

    /// Cooperative pause point for the source loop: spins at a short
    /// interval while paused, so a sudden resume is picked up quickly
    /// without the source needing its own wakeup channel.
    pub async fn wait_while_paused(&self, cancel: &CancellationToken) {
        while self.is_paused() && !cancel.is_cancelled() {
            tokio::time::sleep(POLL_WHILE_PAUSED).await;
        }
    }
}

/// Runs until `cancel` fires. A no-op loop (returns immediately) when the
/// job's throttle config is incomplete (`spec.md` §6: both bounds must be
/// set for throttling to engage).
pub async fn run(state: Arc<JobState>, gate: Arc<ThrottleGate>, cancel: CancellationToken) {
    if !state.config.throttle.enabled() {
        return;
    }
    let pause_at = state.config.throttle.throttle_pause_mb.unwrap();
    let resume_at = state.config.throttle.throttle_resume_mb.unwrap();

    let mut sys = System::new();
    let Some(pid) = sysinfo::get_current_pid().ok() else {
        warn!("memory throttle: could not determine current pid, disabling");
        return;
    };

    loop {
        if cancel.is_cancelled() {
            break;
        }
        sys.refresh_process(pid);
        if let Some(process) = sys.process(pid) {
            let rss_bytes = process.memory();
            state.record_memory_sample(rss_bytes);
            let rss_mb = rss_bytes / (1024 * 1024);
            if rss_mb >= pause_at {
                debug!(rss_mb, pause_at, "memory throttle: pausing source");
                gate.set_paused(true);
            } else if rss_mb <= resume_at {
                gate.set_paused(false);
            }
        }
        tokio::time::sleep(SAMPLE_INTERVAL).await;
    }
}
