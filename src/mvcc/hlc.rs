use std::fmt;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};

/// Bits reserved for the logical counter.
pub const LOGICAL_BITS: u32 = 20;
pub const LOGICAL_MASK: u64 = (1 << LOGICAL_BITS) - 1;

/// Hybrid logical clock value: 44 bits of Unix milliseconds, 20 bits of
/// logical counter. Ordering is the plain ordering of the packed `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hlc {
    pub timestamp: u64,
}

impl Hlc {
    pub fn new(physical_ms: u64, logical: u32) -> Self {
        Hlc {
            timestamp: (physical_ms << LOGICAL_BITS) | (logical as u64 & LOGICAL_MASK),
        }
    }

    pub fn from_timestamp(timestamp: u64) -> Self {
        Hlc { timestamp }
    }

    /// Current wall clock with a zero logical part.
    pub fn now() -> Self {
        Hlc::new(Utc::now().timestamp_millis().max(0) as u64, 0)
    }

    /// Next value. Overflow of the logical part carries into physical time;
    /// the last representable value has no successor.
    pub fn increment(&self) -> Result<Self> {
        self.timestamp
            .checked_add(1)
            .map(Hlc::from_timestamp)
            .ok_or_else(|| exhausted(*self))
    }

    /// Strictly greater than both `self` and `other`, and never behind the
    /// wall clock supplied by `wall_clock_now`.
    pub fn calculate_max_timestamp(&self, other: Option<Hlc>, wall_clock_now: impl FnOnce() -> Hlc) -> Result<Hlc> {
        let highest = match other {
            Some(other) => (*self).max(other),
            None => *self,
        };
        let next = highest.increment()?;
        Ok(next.max(wall_clock_now()))
    }

    pub fn to_physical_unix_time(&self) -> u64 {
        self.timestamp >> LOGICAL_BITS
    }

    pub fn to_logical_time(&self) -> u32 {
        (self.timestamp & LOGICAL_MASK) as u32
    }

    /// On-disk form: big-endian, so byte order equals clock order.
    pub fn to_bytes(&self) -> [u8; 8] {
        self.timestamp.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Hlc {
            timestamp: u64::from_be_bytes(bytes),
        }
    }
}

fn exhausted(at: Hlc) -> Error {
    Error::new(ErrorKind::Clock, format!("clock value {} has no successor", at))
}

impl fmt::Display for Hlc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.to_physical_unix_time(), self.to_logical_time())
    }
}
