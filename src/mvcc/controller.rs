use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use tracing::warn;
use crate::core::config::ClockConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::mvcc::hlc::{Hlc, LOGICAL_BITS};

/// Source of wall-clock time for the controller.
pub trait WallClock: Send + Sync {
    fn now(&self) -> Hlc;
}

pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> Hlc {
        Hlc::now()
    }
}

/// Wall clock pinned to a settable millisecond value.
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(millis: u64) -> Self {
        ManualClock {
            millis: AtomicU64::new(millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> Hlc {
        Hlc::new(self.millis.load(Ordering::SeqCst), 0)
    }
}

/// Owns the one clock of a storage backend.
///
/// All advances go through the mutex, so every stamp handed out is greater
/// than the one before. Readers can peek at the last stamp without taking
/// the lock.
pub struct ClockController {
    last: Mutex<Hlc>,
    published: AtomicU64,
    wall_clock: Arc<dyn WallClock>,
    max_forward_drift_ms: Option<u64>,
}

impl ClockController {
    pub fn new(config: &ClockConfig) -> Self {
        Self::with_wall_clock(config, Arc::new(SystemClock))
    }

    pub fn with_wall_clock(config: &ClockConfig, wall_clock: Arc<dyn WallClock>) -> Self {
        ClockController {
            last: Mutex::new(Hlc::from_timestamp(0)),
            published: AtomicU64::new(0),
            wall_clock,
            max_forward_drift_ms: config.max_forward_drift_ms,
        }
    }

    /// Resume from the highest stamp a backend found on disk.
    pub fn resume_from(&self, persisted: Hlc) {
        let mut last = self.last.lock();
        if persisted > *last {
            *last = persisted;
            self.published.store(persisted.timestamp, Ordering::Release);
        }
    }

    /// Stamp for a local write. Fails once the clock has reached the last
    /// representable value; the stored stamp is left untouched then.
    pub fn next_timestamp(&self) -> Result<Hlc> {
        let mut last = self.last.lock();
        let wall = self.wall_clock.as_ref();
        let next = last.calculate_max_timestamp(None, || wall.now())?;
        *last = next;
        self.published.store(next.timestamp, Ordering::Release);
        Ok(next)
    }

    /// Merge a clock received from another node and return the stamp to use.
    pub fn observe(&self, remote: Hlc) -> Result<Hlc> {
        let wall_now = self.wall_clock.now();
        if let Some(max_drift) = self.max_forward_drift_ms {
            let limit = wall_now.to_physical_unix_time().saturating_add(max_drift);
            if remote.to_physical_unix_time() > limit {
                warn!(
                    target: "clock",
                    remote = %remote,
                    wall = %wall_now,
                    max_drift_ms = max_drift,
                    "rejecting remote clock ahead of local wall time"
                );
                return Err(Error::new(
                    ErrorKind::Clock,
                    format!(
                        "remote clock {} is more than {}ms ahead of local time {}",
                        remote, max_drift, wall_now
                    ),
                ));
            }
        }

        let mut last = self.last.lock();
        let next = last.calculate_max_timestamp(Some(remote), || wall_now).inspect_err(|err| {
            warn!(target: "clock", remote = %remote, error = %err, "remote clock cannot be merged");
        })?;
        *last = next;
        self.published.store(next.timestamp, Ordering::Release);
        Ok(next)
    }

    /// Last stamp handed out, readable concurrently with writers.
    pub fn last(&self) -> Hlc {
        Hlc::from_timestamp(self.published.load(Ordering::Acquire))
    }

    /// Logical counter headroom left in the current millisecond.
    pub fn logical_headroom(&self) -> u64 {
        (1u64 << LOGICAL_BITS) - 1 - self.last().to_logical_time() as u64
    }
}
