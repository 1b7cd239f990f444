//! Elapsed-time scaling and countdown timers.
//!
//! The simulation advances one logical tick per frame, but every rate and
//! timer is multiplied by a [`TimeScale`] derived from the frame's elapsed
//! time. A scale of one corresponds to one tick at the target rate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// Elapsed-time factor applied to movement and timer decay for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeScale(#[serde(with = "fixed_serde")] Fixed);

impl TimeScale {
    /// Exactly one logical tick.
    pub const ONE: Self = Self(Fixed::ONE);

    /// Derive the scale from a frame's elapsed time.
    ///
    /// Elapsed time is clamped to `max_frame_ms` first, so a long stall
    /// cannot produce a step large enough to tunnel through a wall.
    #[must_use]
    pub fn from_elapsed(elapsed: Duration, max_frame_ms: u32, tick_rate: u32) -> Self {
        let cap_micros = u64::from(max_frame_ms) * 1000;
        let micros = u64::try_from(elapsed.as_micros())
            .unwrap_or(u64::MAX)
            .min(cap_micros);
        // micros * rate / 1e6, split to keep the intermediate in range.
        let scaled = Fixed::from_num(micros) * Fixed::from_num(tick_rate) / 1_000_000;
        Self(scaled)
    }

    /// Build a scale from a raw fixed-point factor, clamping negatives to zero.
    #[must_use]
    pub fn from_fixed(value: Fixed) -> Self {
        Self(value.max(Fixed::ZERO))
    }

    /// Raw factor.
    #[must_use]
    pub const fn get(self) -> Fixed {
        self.0
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::ONE
    }
}

/// Decrementing timer measured in logical ticks.
///
/// Never goes negative: the tick that crosses zero leaves it at exactly
/// zero and reports the expiry once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Countdown(#[serde(with = "fixed_serde")] Fixed);

impl Countdown {
    /// An already-expired timer.
    pub const ZERO: Self = Self(Fixed::ZERO);

    /// Timer with `ticks` remaining.
    #[must_use]
    pub fn from_ticks(ticks: u32) -> Self {
        Self(Fixed::from_num(ticks))
    }

    /// Reset to `ticks` remaining.
    pub fn set(&mut self, ticks: u32) {
        self.0 = Fixed::from_num(ticks);
    }

    /// Expire immediately.
    pub fn clear(&mut self) {
        self.0 = Fixed::ZERO;
    }

    /// Remaining ticks (fractional).
    #[must_use]
    pub const fn remaining(self) -> Fixed {
        self.0
    }

    /// True while time remains.
    #[must_use]
    pub fn is_active(self) -> bool {
        self.0 > Fixed::ZERO
    }

    /// True once the timer has run out.
    #[must_use]
    pub fn is_expired(self) -> bool {
        !self.is_active()
    }

    /// Advance by `scale`. Returns `true` only on the tick that expires it.
    pub fn tick(&mut self, scale: TimeScale) -> bool {
        if !self.is_active() {
            return false;
        }
        self.0 = (self.0 - scale.get()).max(Fixed::ZERO);
        self.0 == Fixed::ZERO
    }
}
