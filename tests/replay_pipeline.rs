//! Replay provider feeding the engine through the same path the binary uses

use spacemouse_gw::device::{AnalogSettings, AxisMapping, DeviceEvent, DeviceProvider, ReplayProvider};
use spacemouse_gw::engine::Engine;
use spacemouse_gw::sink::{KeyEvent, RecordingSink};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

const RECORDING: &str = "\
x,y,z,roll,pitch,yaw,buttons
0.0,0.0,0.0,0.0,0.8,0.0,0
0.0,0.0,0.0,0.0,0.8,0.0,1
0.0,0.0,0.0,0.0,0.8,0.0,0
0.0,0.0,0.0,-0.8,0.05,0.0,0
";

/// Run the provider to completion and drive the engine like the main loop does
async fn drive(engine: &Engine, provider: ReplayProvider, mapping: AxisMapping) -> usize {
    let (tx, mut rx) = mpsc::channel(64);
    let task = tokio::spawn(async move { provider.run(tx).await });

    let analog = AnalogSettings::default();
    let mut disconnects = 0;
    while let Some(event) = rx.recv().await {
        match event {
            DeviceEvent::Sample(state) => engine.update(&state.to_sample(mapping, &analog)),
            DeviceEvent::Disconnected { .. } => {
                disconnects += 1;
                engine.release_all();
            }
        }
    }

    task.await.expect("provider task").expect("provider run");
    disconnects
}

#[tokio::test]
async fn test_recording_drives_keys_and_releases_at_end() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(RECORDING.as_bytes()).unwrap();

    let sink = Arc::new(RecordingSink::new());
    let engine = Engine::new(sink.clone());

    let disconnects = drive(&engine, ReplayProvider::from_file(file.path(), 1000), AxisMapping::Rotation).await;

    assert_eq!(disconnects, 1);
    assert_eq!(
        sink.take(),
        vec![
            KeyEvent::Hold("w".into()),
            KeyEvent::Tap("1".into()),
            KeyEvent::Release("1".into()),
            KeyEvent::Release("w".into()),
            KeyEvent::Hold("a".into()),
            // end of recording
            KeyEvent::Release("a".into()),
        ]
    );
    assert!(engine.active_keys().is_empty());
}

#[tokio::test]
async fn test_translation_mapping_ignores_tilt() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(RECORDING.as_bytes()).unwrap();

    let sink = Arc::new(RecordingSink::new());
    let engine = Engine::new(sink.clone());

    drive(&engine, ReplayProvider::from_file(file.path(), 1000), AxisMapping::Translation).await;

    assert_eq!(
        sink.take(),
        vec![KeyEvent::Tap("1".into()), KeyEvent::Release("1".into())]
    );
}

#[tokio::test]
async fn test_missing_recording_disconnects_once() {
    let sink = Arc::new(RecordingSink::new());
    let engine = Engine::new(sink.clone());
    let provider = ReplayProvider::from_file("/nonexistent/recording.csv", 200);

    let (tx, mut rx) = mpsc::channel(4);
    assert!(provider.run(tx).await.is_err());

    let mut disconnects = 0;
    while let Some(event) = rx.recv().await {
        if matches!(event, DeviceEvent::Disconnected { .. }) {
            disconnects += 1;
            engine.release_all();
        }
    }
    assert_eq!(disconnects, 1);
    assert!(sink.is_empty());
}
