#![no_std]

use serde::{Deserialize, Serialize};

#[cfg(feature = "use-defmt")]
use defmt::Format;

// ----------------------------------------------------------------------
// Datatypes

/// Version number for datatypes
pub const DATATYPES_VERSION: u16 = 3; // Increment this if you change definitions here

/// A JSON + newline representation of the TriggerSerial version response
pub const VERSION_RESPONSE_JSON_NEWLINE: &[u8] = b"{\"VersionResponse\":3}\n";

/// Wire protocol spoken to the PWM trigger device over a JSON-lines stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TriggerSerial {
    Set(ChannelCommand),
    VersionRequest,
    VersionResponse(u16),
}

/// Drive one PWM channel to a pulse width.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(Format))]
pub struct ChannelCommand {
    pub channel: u8,
    pub pulse: PwmDuration,
}

/// newtype wrapper of u16 to specify duration of PWM pulse, in microseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(Format))]
#[serde(transparent)]
pub struct PwmDuration {
    pub duration_usec: u16,
}

impl PwmDuration {
    pub fn new(duration_usec: u16) -> Self {
        Self { duration_usec }
    }
}

impl Default for PwmDuration {
    fn default() -> Self {
        Self {
            duration_usec: 1500,
        }
    }
}

// ----------------------------------------------------------------------

/// The pulse-width range the physical receiver accepts.
///
/// Values outside this range can damage or mis-trigger attached hardware, so
/// every write is clamped through [PwmLimits::clamp] before transmission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(Format))]
#[serde(deny_unknown_fields)]
pub struct PwmLimits {
    pub low: PwmDuration,
    pub high: PwmDuration,
}

impl PwmLimits {
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
    pub fn clamp(&self, pulse: PwmDuration) -> PwmDuration {
        PwmDuration::new(
            pulse
                .duration_usec
                .clamp(self.low.duration_usec, self.high.duration_usec),
        )
    }
}

impl Default for PwmLimits {
    fn default() -> Self {
        Self {
            low: PwmDuration::new(1000),
            high: PwmDuration::new(2000),
        }
    }
}

/// The five semantic pulse levels of the camera trigger protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(Format))]
pub enum PulseLevel {
    /// Safe level held whenever actuation is not permitted.
    Disarmed,
    /// Powered and idle, shutter released.
    Neutral,
    /// Energize the camera power rail.
    On,
    /// De-energize the camera power rail.
    Off,
    /// Fire the shutter.
    InstantShoot,
}

/// Pulse width of each named level.
///
/// The disarmed default sits below the clamp floor on purpose: it rails to
/// the lowest pulse the receiver accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(Format))]
#[serde(deny_unknown_fields)]
pub struct TriggerLevels {
    pub disarmed: PwmDuration,
    pub neutral: PwmDuration,
    pub on: PwmDuration,
    pub off: PwmDuration,
    pub instant_shoot: PwmDuration,
}

impl TriggerLevels {
    pub fn get(&self, level: PulseLevel) -> PwmDuration {
        match level {
            PulseLevel::Disarmed => self.disarmed,
            PulseLevel::Neutral => self.neutral,
            PulseLevel::On => self.on,
            PulseLevel::Off => self.off,
            PulseLevel::InstantShoot => self.instant_shoot,
        }
    }
}

impl Default for TriggerLevels {
    fn default() -> Self {
        Self {
            disarmed: PwmDuration::new(900),
            neutral: PwmDuration::new(1500),
            on: PwmDuration::new(2000),
            off: PwmDuration::new(1000),
            instant_shoot: PwmDuration::new(1800),
        }
    }
}

#[test]
fn test_json_newline_version() -> eyre::Result<()> {
    // This ensures that `VERSION_RESPONSE_JSON_NEWLINE` stays up to date with
    // `DATATYPES_VERSION` and also that it ends with newline.
    assert!(VERSION_RESPONSE_JSON_NEWLINE.ends_with(b"\n"));
    let decoded: TriggerSerial = serde_json::from_slice(VERSION_RESPONSE_JSON_NEWLINE)?;
    assert_eq!(TriggerSerial::VersionResponse(DATATYPES_VERSION), decoded);
    Ok(())
}

#[test]
fn test_clamp_rails_out_of_range_values() {
    let limits = PwmLimits::default();
    assert_eq!(limits.clamp(PwmDuration::new(900)).duration_usec, 1000);
    assert_eq!(limits.clamp(PwmDuration::new(2500)).duration_usec, 2000);
    assert_eq!(limits.clamp(PwmDuration::new(1500)).duration_usec, 1500);
    assert_eq!(limits.clamp(PwmDuration::new(1000)).duration_usec, 1000);
    assert_eq!(limits.clamp(PwmDuration::new(2000)).duration_usec, 2000);
}

#[test]
fn test_default_levels() {
    let levels = TriggerLevels::default();
    // The disarmed nominal is intentionally below the default clamp floor.
    assert!(levels.disarmed < PwmLimits::default().low);
    assert_eq!(levels.get(PulseLevel::InstantShoot), PwmDuration::new(1800));
    assert_eq!(levels.get(PulseLevel::Neutral), PwmDuration::new(1500));
}
