// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end scanning over the virtual platform and the QR decode engine

mod common;

use camera_scanner::backends::virtual_camera::{VirtualDevice, VirtualPlatform};
use camera_scanner::decoder::{QrDecodeEngine, QrDetector, SymbolFormat};
use camera_scanner::{CameraMode, CameraSession, ScannerConfig, SessionEvent};
use common::qr_frame;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_virtual_camera_scan_delivers_result() {
    let platform = VirtualPlatform::new(VirtualDevice::three_lens_phone())
        .with_frame(qr_frame("scanner end to end", 4))
        .with_frame_interval(Duration::from_millis(10));
    let engine = QrDecodeEngine::new(QrDetector::new(), Duration::from_millis(10));
    let (session, mut events) = CameraSession::new(platform, engine, ScannerConfig::default());

    session.initialize().await.unwrap();
    let snapshot = session.snapshot();
    assert!(snapshot.is_running);
    assert_eq!(snapshot.mode, CameraMode::BackMain);
    assert_eq!(snapshot.selected_device_id.as_deref(), Some("back-main"));

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no result within 5s");
    match event {
        Some(SessionEvent::Result(result)) => {
            assert_eq!(result.text, "scanner end to end");
            assert_eq!(result.raw.format, SymbolFormat::QrCode);
            assert_eq!(result.raw.corners.len(), 4);
        }
        other => panic!("unexpected event {:?}", other),
    }

    session.teardown();
    assert_eq!(session.platform().open_streams(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hidden_session_holds_results() {
    let platform = VirtualPlatform::new(VirtualDevice::three_lens_phone())
        .with_frame(qr_frame("not yet", 4))
        .with_frame_interval(Duration::from_millis(10));
    let engine = QrDecodeEngine::new(QrDetector::new(), Duration::from_millis(10));
    let config = ScannerConfig {
        auto_start: false,
        ..ScannerConfig::default()
    };
    let (session, mut events) = CameraSession::new(platform, engine, config);
    session.initialize().await.unwrap();

    session.set_visibility(true);
    session.start(CameraMode::Front).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(events.try_recv().is_err());

    session.set_visibility(false);
    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no result after becoming visible");
    assert!(matches!(event, Some(SessionEvent::Result(r)) if r.text == "not yet"));

    session.teardown();
    assert_eq!(session.platform().open_streams(), 0);
}
