//! Fixed one-window rate counter
//!
//! A window opens at the first event after the previous one has been open
//! for more than `window_ms`. Events are counted, and the detector trips
//! once the count exceeds the threshold. A burst straddling two windows is
//! split between them and may go unnoticed.

use serde::Serialize;

/// Result of feeding one event into a [`RateWindow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowCheck {
    /// Count exceeded the threshold
    pub triggered: bool,
    /// Events counted in the current window, including this one
    pub count: u32,
}

#[derive(Debug, Clone)]
pub struct RateWindow {
    threshold: u32,
    window_ms: u64,
    window_start: u64,
    count: u32,
}

impl RateWindow {
    /// Empty counter whose first window starts at time zero
    pub fn new(threshold: u32, window_ms: u64) -> Self {
        Self {
            threshold,
            window_ms,
            window_start: 0,
            count: 0,
        }
    }

    /// Counter that has already seen one event at `now`
    pub fn started_at(threshold: u32, window_ms: u64, now: u64) -> Self {
        Self {
            threshold,
            window_ms,
            window_start: now,
            count: 1,
        }
    }

    /// Record one event at `now`.
    ///
    /// Resets first if the window is older than `window_ms`, then increments
    /// and compares, so the (threshold + 1)-th event in a window is the first
    /// one to trigger.
    pub fn check(&mut self, now: u64) -> WindowCheck {
        if now.saturating_sub(self.window_start) > self.window_ms {
            self.count = 0;
            self.window_start = now;
        }

        self.count = self.count.saturating_add(1);

        WindowCheck {
            triggered: self.count > self.threshold,
            count: self.count,
        }
    }

    pub fn window_start(&self) -> u64 {
        self.window_start
    }
}
