use serde::{Deserialize, Serialize};

use crate::utils::{elapsed, MyTimestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ArmingState {
    #[default]
    Disarmed,
    Armed,
}

/// The slice of vehicle telemetry the trigger controller acts on.
///
/// Read fresh on every safety-relevant operation; never cached across calls,
/// because arming can change asynchronously at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ArmingSnapshot {
    pub state: ArmingState,
    /// When true, all camera PWM actuation is suppressed regardless of
    /// arming state. Set for airframes whose configuration forbids PWM
    /// outputs on the trigger rail.
    pub pwm_outputs_suppressed: bool,
}

impl ArmingSnapshot {
    /// True iff the trigger pins may carry a non-neutral signal.
    pub fn safe_to_actuate(&self) -> bool {
        self.state == ArmingState::Armed && !self.pwm_outputs_suppressed
    }
}

/// Read-only source of the latest [ArmingSnapshot].
///
/// `None` means telemetry is not (yet) available, which the controller
/// treats as not safe.
pub trait ArmingTelemetry {
    fn latest(&self) -> Option<ArmingSnapshot>;
}

/// Telemetry provider over a watch channel fed by a background feed.
///
/// A snapshot older than `loss_timeout` seconds reads as absent, so a dead
/// feed degrades to the disarmed-safe behavior rather than acting on stale
/// arming state.
#[cfg(feature = "tokio")]
pub struct WatchTelemetry {
    rx: tokio::sync::watch::Receiver<Option<(ArmingSnapshot, MyTimestamp)>>,
    loss_timeout: f64,
}

#[cfg(feature = "tokio")]
impl WatchTelemetry {
    pub fn new(
        rx: tokio::sync::watch::Receiver<Option<(ArmingSnapshot, MyTimestamp)>>,
        loss_timeout: f64,
    ) -> Self {
        Self { rx, loss_timeout }
    }
}

#[cfg(feature = "tokio")]
impl ArmingTelemetry for WatchTelemetry {
    fn latest(&self) -> Option<ArmingSnapshot> {
        let (snapshot, timestamp) = (*self.rx.borrow())?;
        if elapsed(timestamp) < self.loss_timeout {
            Some(snapshot)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_to_actuate_polarity() {
        let armed = ArmingSnapshot {
            state: ArmingState::Armed,
            pwm_outputs_suppressed: false,
        };
        assert!(armed.safe_to_actuate());

        let suppressed = ArmingSnapshot {
            pwm_outputs_suppressed: true,
            ..armed
        };
        assert!(!suppressed.safe_to_actuate());

        let disarmed = ArmingSnapshot {
            state: ArmingState::Disarmed,
            ..armed
        };
        assert!(!disarmed.safe_to_actuate());
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn test_watch_telemetry_staleness() {
        use crate::utils::now;

        let armed = ArmingSnapshot {
            state: ArmingState::Armed,
            pwm_outputs_suppressed: false,
        };
        let (tx, rx) = tokio::sync::watch::channel(None);
        let telemetry = WatchTelemetry::new(rx, 1.0);

        // No feed yet.
        assert_eq!(telemetry.latest(), None);

        tx.send(Some((armed, now()))).unwrap();
        assert_eq!(telemetry.latest(), Some(armed));

        // A snapshot from two seconds ago is past the loss timeout.
        let stale = now() - chrono::Duration::milliseconds(2000);
        tx.send(Some((armed, stale))).unwrap();
        assert_eq!(telemetry.latest(), None);
    }
}
