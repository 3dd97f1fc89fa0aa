//! Replay provider - streams recorded readings from a CSV file
//!
//! Stands in for a live device: each row is emitted at the configured poll
//! rate, and the end of the recording is reported as a disconnect so the
//! main loop exercises the same release path as an unplugged device.
//!
//! ```text
//! x,y,z,roll,pitch,yaw,buttons
//! 0.0,0.0,0.0,0.62,0.10,0.0,00
//! 0.0,0.0,-0.8,0.0,0.0,0.0,10
//! ```
//!
//! `buttons` is optional; each character is one button (`1` pressed, `0` not).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{DeviceEvent, DeviceProvider, DeviceState};
use crate::error::{GatewayError, GatewayResult};

/// Columns every recording must have
const REQUIRED_COLUMNS: [&str; 6] = ["x", "y", "z", "roll", "pitch", "yaw"];

/// Reference polling cadence
pub const DEFAULT_POLL_HZ: u32 = 200;
const MAX_POLL_HZ: u32 = 1000;

#[derive(Debug, Deserialize)]
struct SampleRecord {
    x: f64,
    y: f64,
    z: f64,
    roll: f64,
    pitch: f64,
    yaw: f64,
    #[serde(default)]
    buttons: String,
}

/// Decode a button column such as `"0110"`
pub fn parse_buttons(field: &str) -> std::result::Result<Vec<bool>, String> {
    field
        .trim()
        .chars()
        .map(|c| match c {
            '1' => Ok(true),
            '0' => Ok(false),
            other => Err(format!("invalid button state '{}'", other)),
        })
        .collect()
}

fn record_to_state(record: SampleRecord, line: u64) -> GatewayResult<DeviceState> {
    let buttons = parse_buttons(&record.buttons)
        .map_err(|message| GatewayError::InvalidSampleRecord { line, message })?;

    Ok(DeviceState {
        x: record.x,
        y: record.y,
        z: record.z,
        roll: record.roll,
        pitch: record.pitch,
        yaw: record.yaw,
        buttons,
    })
}

/// Parse a whole recording. A missing column is an error; bad rows are skipped.
pub fn parse_recording(data: &[u8]) -> Result<Vec<DeviceState>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader
        .headers()
        .context("Failed to read recording header")?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            anyhow::bail!("Recording is missing required column '{}'", column);
        }
    }

    let mut states = Vec::new();
    for (idx, result) in reader.deserialize::<SampleRecord>().enumerate() {
        // Header is line 1
        let line = idx as u64 + 2;
        let decoded = result
            .map_err(|e| GatewayError::InvalidSampleRecord {
                line,
                message: e.to_string(),
            })
            .and_then(|record| record_to_state(record, line));

        match decoded {
            Ok(state) => states.push(state),
            Err(e) => warn!("Skipping row: {}", e),
        }
    }

    Ok(states)
}

enum ReplaySource {
    File(PathBuf),
    Memory(Vec<DeviceState>),
}

/// Replays a recording at a fixed poll rate
pub struct ReplayProvider {
    source: ReplaySource,
    poll_interval: Duration,
}

impl ReplayProvider {
    /// Replay the CSV recording at `path`
    pub fn from_file(path: impl Into<PathBuf>, poll_hz: u32) -> Self {
        Self {
            source: ReplaySource::File(path.into()),
            poll_interval: poll_interval(poll_hz),
        }
    }

    /// Replay readings already in memory
    pub fn from_states(states: Vec<DeviceState>, poll_hz: u32) -> Self {
        Self {
            source: ReplaySource::Memory(states),
            poll_interval: poll_interval(poll_hz),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn load(&self) -> Result<Vec<DeviceState>> {
        match &self.source {
            ReplaySource::File(path) => {
                let data = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read recording: {}", path.display()))?;
                parse_recording(&data)
                    .with_context(|| format!("Failed to parse recording: {}", path.display()))
            }
            ReplaySource::Memory(states) => Ok(states.clone()),
        }
    }
}

/// Tick length for a poll rate, clamped to 1..=1000 Hz
fn poll_interval(poll_hz: u32) -> Duration {
    let hz = poll_hz.clamp(1, MAX_POLL_HZ);
    Duration::from_secs_f64(1.0 / f64::from(hz))
}

#[async_trait]
impl DeviceProvider for ReplayProvider {
    fn name(&self) -> &str {
        "replay"
    }

    async fn run(&self, tx: mpsc::Sender<DeviceEvent>) -> Result<()> {
        let states = match self.load().await {
            Ok(states) => states,
            Err(e) => {
                let _ = tx
                    .send(DeviceEvent::Disconnected {
                        reason: format!("{:#}", e),
                    })
                    .await;
                return Err(e);
            }
        };

        info!(
            "Replaying {} readings every {:?}",
            states.len(),
            self.poll_interval
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for state in states {
            ticker.tick().await;
            if tx.send(DeviceEvent::Sample(state)).await.is_err() {
                debug!("Replay receiver closed, stopping");
                return Ok(());
            }
        }

        info!("Replay finished");
        let _ = tx
            .send(DeviceEvent::Disconnected {
                reason: "end of recording".to_string(),
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RECORDING: &str = "\
x,y,z,roll,pitch,yaw,buttons
0.0,0.0,0.0,0.62,0.10,0.0,00
0.0,0.0,-0.8,0.0,0.0,0.0,10
0.1,oops,0.0,0.0,0.0,0.0,0
0.0,0.0,0.0,0.0,0.0,0.0,2
0.0,0.0,0.5,0.0,0.0,0.0,
";

    #[test]
    fn test_parse_recording_skips_bad_rows() {
        let states = parse_recording(RECORDING.as_bytes()).unwrap();

        assert_eq!(states.len(), 3);
        assert_eq!(states[0].roll, 0.62);
        assert_eq!(states[1].buttons, vec![true, false]);
        assert_eq!(states[2].z, 0.5);
        assert!(states[2].buttons.is_empty());
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let err = parse_recording(b"x,y,z,roll,pitch\n0,0,0,0,0\n").unwrap_err();
        assert!(err.to_string().contains("yaw"));
    }

    #[test]
    fn test_parse_buttons() {
        assert_eq!(parse_buttons(" 101 ").unwrap(), vec![true, false, true]);
        assert!(parse_buttons("").unwrap().is_empty());
        assert!(parse_buttons("1x").is_err());
    }

    #[test]
    fn test_poll_interval_is_clamped() {
        assert_eq!(poll_interval(200), Duration::from_millis(5));
        assert_eq!(poll_interval(0), Duration::from_secs(1));
        assert_eq!(poll_interval(50_000), Duration::from_millis(1));
        assert_eq!(
            ReplayProvider::from_states(Vec::new(), 0).poll_interval(),
            Duration::from_secs(1)
        );
    }

    #[tokio::test]
    async fn test_replay_ends_with_single_disconnect() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(RECORDING.as_bytes())?;

        let provider = ReplayProvider::from_file(file.path(), 1000);
        let (tx, mut rx) = mpsc::channel(16);
        provider.run(tx).await?;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], DeviceEvent::Sample(_)));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, DeviceEvent::Disconnected { .. }))
                .count(),
            1
        );
        assert!(matches!(events[3], DeviceEvent::Disconnected { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_file_reports_disconnect() {
        let provider = ReplayProvider::from_file("/nonexistent/recording.csv", 200);
        let (tx, mut rx) = mpsc::channel(4);

        assert!(provider.run(tx).await.is_err());
        assert!(matches!(
            rx.recv().await,
            Some(DeviceEvent::Disconnected { .. })
        ));
        assert!(rx.recv().await.is_none());
    }
}
