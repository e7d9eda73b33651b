//! Default escalation timing and feedback patterns
//!
//! Runtime overrides go through [`crate::AlertConfig`].

/// Strobe toggle period (milliseconds)
///
/// **Value**: 300ms
///
/// **Rationale**: ~1.7 Hz full on/off cycle. Fast enough to read as an
/// alarm in peripheral vision, slow enough to stay below the 3 Hz
/// photosensitivity guideline for flashing content.
///
/// **Used in**: engine.rs (strobe loop)
pub const STROBE_INTERVAL_MS: u64 = 300;

/// Warning vibration: off/on timings in milliseconds, played once
///
/// **Value**: `[0, 250, 250, 250]`, two short pulses
///
/// **Used in**: engine.rs (Warning trigger)
pub const WARNING_VIBRATION_MS: [u64; 4] = [0, 250, 250, 250];

/// Critical vibration: off/on timings in milliseconds, looped
///
/// **Value**: `[0, 1000, 500, 1000, 500, 1000, 500]`, three long pulses
///
/// **Rationale**: Long pulses with short gaps are distinguishable from a
/// notification buzz even through a pocket. Looped from
/// [`CRITICAL_VIBRATION_REPEAT`] until the alert is stopped.
///
/// **Used in**: engine.rs (Critical trigger)
pub const CRITICAL_VIBRATION_MS: [u64; 7] = [0, 1000, 500, 1000, 500, 1000, 500];

/// Index the critical waveform loops back to
pub const CRITICAL_VIBRATION_REPEAT: usize = 0;

/// Looping audio played while a critical alert is active
///
/// The console host maps this to the terminal bell; other hosts resolve it
/// to their default alarm sound.
pub const DEFAULT_AUDIO_SOURCE: &str = "alarm";
