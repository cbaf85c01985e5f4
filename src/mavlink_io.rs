use color_eyre::eyre::{Result, WrapErr};
use mavlink::ardupilotmega::{MavMessage, MavModeFlag};
use tokio::sync::watch;
use tracing as log;

use camtrig_core::{now, ArmingSnapshot, ArmingState, MavlinkConfig, MyTimestamp};

pub(crate) type ArmingFeed = watch::Receiver<Option<(ArmingSnapshot, MyTimestamp)>>;

/// Connect to the autopilot and publish an [ArmingSnapshot] into a watch
/// channel on every heartbeat.
///
/// The connection is established here, before the controller is built, so
/// a bad MAVLink address fails startup instead of surfacing later. Once
/// running, heartbeat loss is not an error: the snapshot goes stale and
/// the controller's loss timeout forces the safe output state.
pub(crate) fn spawn_arming_feed(
    cfg: &MavlinkConfig,
    pwm_outputs_suppressed: bool,
) -> Result<ArmingFeed> {
    let conn = mavlink::connect::<MavMessage>(&cfg.port_path)
        .with_context(|| format!("Opening mavlink connection {}", cfg.port_path))?;

    let (tx, rx) = watch::channel(None);
    let system_id = cfg.system_id;
    std::thread::spawn(move || arming_feed_loop(conn, tx, system_id, pwm_outputs_suppressed));
    Ok(rx)
}

fn arming_feed_loop(
    conn: Box<dyn mavlink::MavConnection<MavMessage> + Sync + Send>,
    tx: watch::Sender<Option<(ArmingSnapshot, MyTimestamp)>>,
    system_id: u8,
    pwm_outputs_suppressed: bool,
) {
    loop {
        match conn.recv() {
            Ok((header, MavMessage::HEARTBEAT(hb))) => {
                if header.system_id != system_id {
                    continue;
                }
                let armed = hb
                    .base_mode
                    .contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED);
                let snapshot = ArmingSnapshot {
                    state: if armed {
                        ArmingState::Armed
                    } else {
                        ArmingState::Disarmed
                    },
                    pwm_outputs_suppressed,
                };
                if tx.send(Some((snapshot, now()))).is_err() {
                    // Receiver gone, the process is shutting down.
                    return;
                }
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("mavlink recv error: {e}");
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
        }
    }
}
