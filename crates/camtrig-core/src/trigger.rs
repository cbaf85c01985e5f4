use pwm_trigger_types::{PulseLevel, PwmDuration, PwmLimits, TriggerLevels};
use tracing as log;

use crate::arming::ArmingTelemetry;
use crate::pins::TriggerPins;

/// Hardware output sink: one idempotent "set channel to pulse width"
/// operation. A test double can record all writes for assertion.
pub trait PwmSink {
    fn set_channel(&mut self, channel: u8, pulse: PwmDuration) -> eyre::Result<()>;
}

/// PWM camera trigger controller.
///
/// Owns the decoded pin set, the cached camera power state, and an injected
/// arming telemetry provider. Every safety-relevant operation reads a fresh
/// snapshot and, when the vehicle is not armed with PWM permitted, forces
/// all assigned pins to the disarmed level instead of honoring the request.
///
/// Single-threaded by design: callers invoke it from one control loop and
/// must serialize access externally if that ever changes.
pub struct CameraTriggerPwm<S, T> {
    pins: TriggerPins,
    levels: TriggerLevels,
    limits: PwmLimits,
    camera_is_on: bool,
    write_faults: u64,
    sink: S,
    telemetry: T,
}

impl<S, T> CameraTriggerPwm<S, T>
where
    S: PwmSink,
    T: ArmingTelemetry,
{
    /// `telemetry` must already be connected; the controller never performs
    /// subscription setup itself.
    pub fn new(pins: TriggerPins, levels: TriggerLevels, limits: PwmLimits, sink: S, telemetry: T) -> Self {
        Self {
            pins,
            levels,
            limits,
            camera_is_on: false,
            write_faults: 0,
            sink,
            telemetry,
        }
    }

    /// Drive all assigned pins to the disarmed level, establishing the
    /// baseline safe state before any trigger request can occur.
    ///
    /// Unlike the per-call writes, a failure here propagates: a sink that
    /// cannot be written at boot is a hard dependency failure and the
    /// process should not continue with unknown hardware state.
    pub fn setup(&mut self) -> eyre::Result<()> {
        let pulse = self.limits.clamp(self.levels.get(PulseLevel::Disarmed));
        for channel in self.pins.assigned() {
            self.sink.set_channel(channel, pulse)?;
        }
        Ok(())
    }

    /// Request a shutter pulse (`enable` true) or the neutral level.
    ///
    /// When the camera power rail is off, the call is consumed by the
    /// power-on transition and no pulse is issued; the caller's next poll
    /// cycle delivers the shot. That single-step latency models the
    /// camera's warm-up delay.
    pub fn trigger(&mut self, enable: bool) {
        if !self.safe_to_actuate() {
            self.drive_all(PulseLevel::Disarmed);
            return;
        }

        if !self.camera_is_on {
            // Turn camera on and give it time to start up.
            self.power_on();
            return;
        }

        if enable {
            self.drive_all(PulseLevel::InstantShoot);
        } else {
            self.drive_all(PulseLevel::Neutral);
        }
    }

    /// Energize the camera power rail.
    pub fn power_on(&mut self) {
        if !self.safe_to_actuate() {
            self.drive_all(PulseLevel::Disarmed);
            return;
        }
        self.drive_all(PulseLevel::On);
        self.camera_is_on = true;
    }

    /// De-energize the camera power rail.
    pub fn power_off(&mut self) {
        if !self.safe_to_actuate() {
            self.drive_all(PulseLevel::Disarmed);
            return;
        }
        self.drive_all(PulseLevel::Off);
        self.camera_is_on = false;
    }

    /// Force all assigned pins to the disarmed level regardless of
    /// telemetry. For shutdown paths.
    pub fn drive_safe(&mut self) {
        self.drive_all(PulseLevel::Disarmed);
    }

    pub fn camera_is_on(&self) -> bool {
        self.camera_is_on
    }

    /// Count of per-pin write failures since construction.
    pub fn write_faults(&self) -> u64 {
        self.write_faults
    }

    /// Reads a fresh snapshot. Absent telemetry counts as not safe; it
    /// self-heals once the feed starts flowing.
    fn safe_to_actuate(&self) -> bool {
        match self.telemetry.latest() {
            Some(snapshot) => snapshot.safe_to_actuate(),
            None => false,
        }
    }

    /// Write one level to every assigned pin, clamped into the receiver's
    /// accepted range. A failed pin is logged and counted; the remaining
    /// pins are still driven.
    fn drive_all(&mut self, level: PulseLevel) {
        let pulse = self.limits.clamp(self.levels.get(level));
        for channel in self.pins.assigned() {
            if let Err(e) = self.sink.set_channel(channel, pulse) {
                self.write_faults += 1;
                log::warn!("failed to set channel {channel} to {}us: {e}", pulse.duration_usec);
            }
        }
    }
}
