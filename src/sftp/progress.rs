//! Byte-level progress of one upload run

use serde::{Deserialize, Serialize};

/// Byte counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    /// Estimated bytes to transfer
    pub total_bytes: u64,
    /// Bytes reported by the transport so far (may exceed the estimate)
    pub transferred_bytes: u64,
}

impl TransferProgress {
    /// Completion percentage, floored and clamped to 0-100; `None` when the
    /// total is unknown (zero).
    pub fn percentage(&self) -> Option<u8> {
        if self.total_bytes == 0 {
            return None;
        }
        let pct = (self.transferred_bytes as u128 * 100) / self.total_bytes as u128;
        Some(pct.min(100) as u8)
    }
}

/// Turns raw byte callbacks into a non-decreasing percentage.
///
/// The total is only an estimate, so overshoot is clamped rather than
/// treated as an error.
#[derive(Debug)]
pub struct ProgressAggregator {
    progress: TransferProgress,
    last_emitted: Option<u8>,
}

impl ProgressAggregator {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            progress: TransferProgress {
                total_bytes,
                transferred_bytes: 0,
            },
            last_emitted: None,
        }
    }

    pub fn progress(&self) -> TransferProgress {
        self.progress
    }

    /// Account for `bytes` more transferred bytes.
    ///
    /// Returns the percentage to display, or `None` when the total is zero.
    pub fn record(&mut self, bytes: u64) -> Option<u8> {
        self.progress.transferred_bytes = self.progress.transferred_bytes.saturating_add(bytes);
        let pct = self.progress.percentage()?;
        let pct = match self.last_emitted {
            Some(last) if last > pct => last,
            _ => pct,
        };
        self.last_emitted = Some(pct);
        Some(pct)
    }
}
