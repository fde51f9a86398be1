//! Simulated light driver.
//!
//! Real firmware fades PWM channels here; the emulator renders the bulb as
//! a log line instead.  [`SimulatedLight`] converts each state change to
//! display units with [`display_levels`] and remembers the last applied
//! result so tests and diagnostics can inspect what the "bulb" is showing.

use std::sync::Mutex;

use lumen_core::{display_levels, DisplayLevels, Hsbk, LightDriver};
use tracing::info;

/// [`LightDriver`] implementation that logs the visible output.
#[derive(Default)]
pub struct SimulatedLight {
    last: Mutex<Option<AppliedLight>>,
}

/// The most recent output the simulated bulb applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedLight {
    pub levels: DisplayLevels,
    pub power: u16,
}

impl SimulatedLight {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last applied output, if any change has arrived yet.
    pub fn last_applied(&self) -> Option<AppliedLight> {
        *self.last.lock().unwrap()
    }
}

impl LightDriver for SimulatedLight {
    fn light_changed(&self, color: Hsbk, power: u16) {
        let levels = display_levels(&color, power);
        info!(
            "light: power={} hue={}° saturation={} brightness={}",
            power, levels.hue_degrees, levels.saturation, levels.brightness
        );
        *self.last.lock().unwrap() = Some(AppliedLight { levels, power });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
