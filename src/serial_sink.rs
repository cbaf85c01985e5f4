use std::io::{BufRead, BufReader, Write};

use color_eyre::eyre::{self as anyhow, Result, WrapErr};
use tracing as log;

use camtrig_core::{ChannelCommand, PwmDuration, PwmSink, TriggerSerial, DATATYPES_VERSION};

#[derive(thiserror::Error, Debug)]
pub(crate) enum SinkError {
    #[error("serde JSON error {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("io error {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON representation contained newline")]
    NewlineInData,
}

/// PWM output sink speaking [TriggerSerial] as JSON lines over a writer.
pub(crate) struct JsonLinesSink<W> {
    wtr: W,
}

impl<W> JsonLinesSink<W>
where
    W: Write,
{
    pub(crate) fn from_writer(wtr: W) -> Self {
        Self { wtr }
    }

    pub(crate) fn send(&mut self, msg: &TriggerSerial) -> Result<(), SinkError> {
        let buf = serde_json::to_vec(msg)?;
        if buf.contains(&b'\n') {
            return Err(SinkError::NewlineInData);
        }
        self.wtr.write_all(&buf)?;
        self.wtr.write_all(b"\n")?;
        self.wtr.flush()?;
        Ok(())
    }
}

impl<W> PwmSink for JsonLinesSink<W>
where
    W: Write,
{
    fn set_channel(&mut self, channel: u8, pulse: PwmDuration) -> eyre::Result<()> {
        self.send(&TriggerSerial::Set(ChannelCommand { channel, pulse }))?;
        Ok(())
    }
}

/// How many lines of chatter to tolerate before deciding the device will
/// never answer the version request.
const MAX_HANDSHAKE_LINES: usize = 50;

/// Open the trigger device and check its firmware speaks our datatypes
/// version. Any failure here is fatal: the process must not run with
/// unknown hardware state.
pub(crate) fn connect(
    path: &str,
    baud_rate: u32,
) -> Result<JsonLinesSink<Box<dyn serialport::SerialPort>>> {
    let write_port = serialport::new(path, baud_rate)
        .timeout(std::time::Duration::from_secs(2))
        .open()
        .with_context(|| format!("Opening PWM trigger device {path}"))?;
    let read_port = write_port.try_clone()?;

    let mut sink = JsonLinesSink::from_writer(write_port);
    sink.send(&TriggerSerial::VersionRequest)?;
    check_version(BufReader::new(read_port), path)?;
    Ok(sink)
}

/// Wait for the device's version response and check it against ours.
///
/// Each read is bounded by the port timeout, and the whole handshake is
/// bounded by [MAX_HANDSHAKE_LINES]: a device streaming junk (or the wrong
/// protocol entirely) fails startup instead of holding it open.
fn check_version<R: BufRead>(reader: R, path: &str) -> Result<()> {
    let mut lines = reader.lines();
    for _ in 0..MAX_HANDSHAKE_LINES {
        let line = match lines.next() {
            Some(line) => line.with_context(|| format!("Reading from {path}"))?,
            None => anyhow::bail!("PWM trigger device {path} closed during version handshake"),
        };
        match serde_json::from_str(&line) {
            Ok(TriggerSerial::VersionResponse(version)) => {
                if version != DATATYPES_VERSION {
                    anyhow::bail!(
                        "PWM trigger device {path} speaks datatypes version \
                         {version}, expected {DATATYPES_VERSION}"
                    );
                }
                log::info!("PWM trigger device {path} verified, datatypes version {version}");
                return Ok(());
            }
            Ok(other) => {
                log::warn!("unexpected message during version handshake: {other:?}");
            }
            Err(e) => {
                log::warn!("ignoring undecodable line during version handshake: {e}");
            }
        }
    }
    anyhow::bail!(
        "PWM trigger device {path} sent {MAX_HANDSHAKE_LINES} lines without a version response"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use camtrig_core::VERSION_RESPONSE_JSON_NEWLINE;
    use std::io::Cursor;

    #[test]
    fn test_handshake_accepts_version_after_noise() -> eyre::Result<()> {
        let mut input = b"not json\n{\"VersionRequest\":null}\n".to_vec();
        input.extend_from_slice(VERSION_RESPONSE_JSON_NEWLINE);
        check_version(Cursor::new(input), "test-device")?;
        Ok(())
    }

    #[test]
    fn test_handshake_rejects_version_mismatch() {
        let input = b"{\"VersionResponse\":999}\n".to_vec();
        let r = check_version(Cursor::new(input), "test-device");
        assert!(r.is_err());
    }

    #[test]
    fn test_handshake_gives_up_on_endless_noise() {
        // A device streaming junk must fail the handshake after a bounded
        // number of lines, not hold startup open.
        let input = "garbage\n".repeat(MAX_HANDSHAKE_LINES + 10);
        let r = check_version(Cursor::new(input.into_bytes()), "test-device");
        let msg = r.unwrap_err().to_string();
        assert!(msg.contains("without a version response"), "{msg}");
    }

    #[test]
    fn test_set_channel_writes_one_json_line() -> eyre::Result<()> {
        let mut sink = JsonLinesSink::from_writer(Vec::new());
        sink.set_channel(3, PwmDuration::new(1800))?;
        let buf = String::from_utf8(sink.wtr)?;
        assert_eq!(buf, "{\"Set\":{\"channel\":3,\"pulse\":1800}}\n");
        Ok(())
    }

    #[test]
    fn test_lines_roundtrip() -> eyre::Result<()> {
        let mut sink = JsonLinesSink::from_writer(Vec::new());
        for msg in [
            TriggerSerial::VersionRequest,
            TriggerSerial::Set(ChannelCommand {
                channel: 0,
                pulse: PwmDuration::new(1000),
            }),
        ] {
            sink.send(&msg)?;
        }
        let decoded: Vec<TriggerSerial> = sink
            .wtr
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line))
            .collect::<Result<_, _>>()?;
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0], TriggerSerial::VersionRequest);
        Ok(())
    }
}
