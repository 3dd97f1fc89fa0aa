//! SpaceMouse GW - turns 6DOF controller input into game key presses
//!
//! The [`engine`] maps each device sample onto held movement keys, sprint,
//! jump, a timed crouch/prone gesture and button hot-keys, emitting key
//! transitions to a [`sink::KeySink`]. The remaining modules wire it to a
//! device stream, a YAML config with hot reload, JSON profiles and an
//! interactive console.

pub mod cli;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod paths;
pub mod profile;
pub mod sink;

pub use engine::{Engine, Sample};
pub use error::{GatewayError, GatewayResult};
pub use sink::KeySink;
