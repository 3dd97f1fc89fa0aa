//! Device stream: six-axis readings and the providers that produce them
//!
//! A provider owns the read loop for one device and pushes [`DeviceEvent`]s
//! into a channel. The main loop projects each reading onto the engine's
//! three axes with an [`AxisMapping`] and feeds the result to the engine.

pub mod analog;
pub mod replay;

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::engine::Sample;

pub use analog::{process_axis, AnalogSettings};
pub use replay::ReplayProvider;

/// One raw reading from a 6DOF device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    #[serde(default)]
    pub buttons: Vec<bool>,
}

/// Which device axes drive movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AxisMapping {
    /// Tilt the cap: roll drives left/right, pitch drives forward/backward
    #[default]
    Rotation,
    /// Slide the cap: x drives left/right, y drives forward/backward
    Translation,
}

impl DeviceState {
    /// Condition every axis and project onto the engine's `(x, y, z)`.
    /// Jump/crouch always read translation z.
    pub fn to_sample(&self, mapping: AxisMapping, analog: &AnalogSettings) -> Sample {
        let (x, y) = match mapping {
            AxisMapping::Rotation => (self.roll, self.pitch),
            AxisMapping::Translation => (self.x, self.y),
        };

        Sample {
            x: process_axis(x, analog),
            y: process_axis(y, analog),
            z: process_axis(self.z, analog),
            buttons: self.buttons.clone(),
        }
    }
}

/// Event produced by a device provider
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Sample(DeviceState),
    /// The stream is gone for good. Sent at most once per provider run.
    Disconnected { reason: String },
}

/// Device provider trait - every device stream implements this
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    /// Provider name for logs (e.g., "replay")
    fn name(&self) -> &str;

    /// Stream events into `tx` until the device is lost or `tx` is closed.
    ///
    /// On an irrecoverable failure the provider sends
    /// [`DeviceEvent::Disconnected`] exactly once and returns.
    async fn run(&self, tx: mpsc::Sender<DeviceEvent>) -> Result<()>;
}
