use serde::{Deserialize, Serialize};

pub mod arming;
pub use arming::{ArmingSnapshot, ArmingState, ArmingTelemetry};
#[cfg(feature = "tokio")]
pub use arming::WatchTelemetry;

pub mod pins;
pub use pins::{TriggerPins, MAX_TRIGGER_PINS};

pub mod trigger;
pub use trigger::{CameraTriggerPwm, PwmSink};

pub mod utils;
pub use utils::{elapsed, now, MyTimestamp};

pub use pwm_trigger_types::{
    ChannelCommand, PulseLevel, PwmDuration, PwmLimits, TriggerLevels, TriggerSerial,
    DATATYPES_VERSION, VERSION_RESPONSE_JSON_NEWLINE,
};

// --------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("pwm limits are inverted: low {low}us > high {high}us")]
    InvertedLimits { low: u16, high: u16 },
    #[error("poll_hz must be positive, got {0}")]
    BadPollRate(f64),
    #[error("activation_time {activation_time}s exceeds trigger_interval {trigger_interval}s")]
    ActivationLongerThanInterval {
        activation_time: f64,
        trigger_interval: f64,
    },
}

/// Camera trigger configuration
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CamtrigConfig {
    /// Digit-encoded pin assignment, least-significant digit first; digit d
    /// assigns channel d-1, 0 terminates (see [TriggerPins::decode]).
    #[serde(default = "default_trig_pins")]
    pub trig_pins: u32,
    #[serde(default, skip_serializing_if = "PwmLimits::is_default")]
    pub pwm_limits: PwmLimits,
    #[serde(default)]
    pub levels: TriggerLevels,
    /// When true, all camera PWM actuation is suppressed regardless of
    /// arming state. For airframes that forbid PWM on the trigger rail.
    #[serde(default)]
    pub pwm_outputs_suppressed: bool,
    /// Seconds between intervalometer shots; 0 disables interval shooting.
    #[serde(default)]
    pub trigger_interval: f64,
    /// Seconds the shoot level is held per shot.
    #[serde(default = "default_activation_time")]
    pub activation_time: f64,
    /// Control loop cadence. This also sets the camera warm-up latency:
    /// the first trigger after power-off is consumed by the power-on
    /// transition and the shot lands one poll cycle later.
    #[serde(default = "default_poll_hz")]
    pub poll_hz: f64,
    #[serde(default)]
    pub mavlink: MavlinkConfig,
}

fn default_trig_pins() -> u32 {
    56 // channels 5 and 4
}

fn default_activation_time() -> f64 {
    0.5
}

fn default_poll_hz() -> f64 {
    20.0
}

impl Default for CamtrigConfig {
    fn default() -> Self {
        Self {
            trig_pins: default_trig_pins(),
            pwm_limits: Default::default(),
            levels: Default::default(),
            pwm_outputs_suppressed: false,
            trigger_interval: 0.0,
            activation_time: default_activation_time(),
            poll_hz: default_poll_hz(),
            mavlink: Default::default(),
        }
    }
}

impl CamtrigConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pwm_limits.low > self.pwm_limits.high {
            return Err(ConfigError::InvertedLimits {
                low: self.pwm_limits.low.duration_usec,
                high: self.pwm_limits.high.duration_usec,
            });
        }
        if !(self.poll_hz > 0.0) {
            return Err(ConfigError::BadPollRate(self.poll_hz));
        }
        if self.trigger_interval > 0.0 && self.activation_time >= self.trigger_interval {
            return Err(ConfigError::ActivationLongerThanInterval {
                activation_time: self.activation_time,
                trigger_interval: self.trigger_interval,
            });
        }
        Ok(())
    }
}

/// MAVLink arming feed configuration
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MavlinkConfig {
    /// source of MAVLink data
    /// (tcpout|tcpin|udpout|udpin|udpbcast|serial|file):(ip|dev|path):(port|baud)
    pub port_path: String,
    #[serde(default = "default_mavlink_system_id")]
    pub system_id: u8,
    /// Seconds of heartbeat silence after which arming telemetry is
    /// considered lost and actuation is forced safe.
    #[serde(default = "default_mavlink_loss_timeout")]
    pub loss_timeout: f64,
}

fn default_mavlink_system_id() -> u8 {
    1 // default autopilot
}

fn default_mavlink_loss_timeout() -> f64 {
    1.0
}

impl Default for MavlinkConfig {
    fn default() -> Self {
        Self {
            port_path: "".to_string(),
            system_id: default_mavlink_system_id(),
            loss_timeout: default_mavlink_loss_timeout(),
        }
    }
}
