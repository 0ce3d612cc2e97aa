//! Integration tests for the capture flow
//!
//! These tests drive `SessionController::capture` end to end and verify that:
//! - the widget (and its camera) is torn down exactly once on every exit path,
//!   including a panic inside the decode loop
//! - cancellation and timeouts resolve to `None`
//! - permission, device and layout failures surface the right way
//! - platforms without a camera read the text buffer verbatim

mod common;

use common::{MockFrameDecoder, ScriptedBackend, blank_frame, camera, new_controller, qr_frame};
use qrlink::models::{Settings, SessionOutcome};
use qrlink::services::{DecodeError, Decoder, MemoryTextBuffer, Platform, StaticAuthority};
use qrlink::session::SessionError;
use qrlink::ui::{CaptureLayout, FixedStepClock, SessionController};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn android() -> StaticAuthority {
    StaticAuthority::granted(Platform::Android)
}

#[tokio::test]
async fn test_capture_decodes_and_destroys_widget_once() {
    let (factory, log) = camera(ScriptedBackend::new(blank_frame()), CaptureLayout::standard());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut decoder = MockFrameDecoder::new();
    decoder.expect_decode().returning(move |_, _, _| {
        if counter.fetch_add(1, Ordering::SeqCst) == 2 {
            Ok(Some("hello".to_string()))
        } else {
            Ok(None)
        }
    });

    let mut controller = new_controller(android(), Settings::default()).with_decoder(decoder);
    let text = controller.capture(Some(&factory)).await.unwrap();

    assert_eq!(text.as_deref(), Some("hello"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(log.opens(), 1);
    assert_eq!(log.stops(), 1);
    // Two settle frames, then one frame after each pending decode
    assert_eq!(controller.clock().ticks(), 4);

    let state = controller.monitor().snapshot();
    assert_eq!(state.live_widgets, 0);
    assert_eq!(state.completed, 1);
    assert!(state.active.is_empty());
    assert_eq!(state.last_outcome, Some(SessionOutcome::Decoded));
}

#[tokio::test]
async fn test_capture_reads_real_qr_frame() {
    let (factory, log) = camera(ScriptedBackend::new(qr_frame("hello")), CaptureLayout::standard());
    let mut controller = new_controller(android(), Settings::default());

    let text = controller.capture(Some(&factory)).await.unwrap();

    assert_eq!(text.as_deref(), Some("hello"));
    assert_eq!(controller.clock().ticks(), 2);
    assert_eq!(log.stops(), 1);
}

#[tokio::test]
async fn test_cancel_handle_resolves_none_on_next_frame() {
    let (factory, log) = camera(ScriptedBackend::new(blank_frame()), CaptureLayout::standard());
    let controller = new_controller(android(), Settings::default());
    let cancel = controller.cancel_handle();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut decoder = MockFrameDecoder::new();
    decoder.expect_decode().returning(move |_, _, _| {
        if counter.fetch_add(1, Ordering::SeqCst) == 2 {
            cancel.cancel();
        }
        Ok(None)
    });
    let mut controller = controller.with_decoder(decoder);

    let text = controller.capture(Some(&factory)).await.unwrap();

    assert_eq!(text, None);
    // The decode in flight finished; the loop exited at the next frame boundary
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(controller.clock().ticks(), 2 + 3);
    assert_eq!(log.stops(), 1);
    assert_eq!(
        controller.monitor().snapshot().last_outcome,
        Some(SessionOutcome::Cancelled)
    );
}

#[tokio::test]
async fn test_cancel_button_resolves_none() {
    let (factory, log) = camera(ScriptedBackend::new(blank_frame()), CaptureLayout::standard());
    let buttons = factory.buttons();

    let mut decoder = MockFrameDecoder::new();
    decoder.expect_decode().times(1).returning(move |_, _, _| {
        buttons.press_cancel();
        Ok(None)
    });
    let mut controller = new_controller(android(), Settings::default()).with_decoder(decoder);

    let text = controller.capture(Some(&factory)).await.unwrap();

    assert_eq!(text, None);
    assert_eq!(log.stops(), 1);
    assert_eq!(controller.monitor().read(|s| s.live_widgets), 0);
}

#[tokio::test]
async fn test_cancel_before_session_is_reset() {
    let (factory, _log) = camera(ScriptedBackend::new(qr_frame("fresh")), CaptureLayout::standard());
    let mut controller = new_controller(android(), Settings::default());

    // A stale cancel from an earlier session does not leak into the next one
    controller.cancel_handle().cancel();
    let text = controller.capture(Some(&factory)).await.unwrap();

    assert_eq!(text.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_timeout_resolves_none() {
    let (factory, log) = camera(ScriptedBackend::new(blank_frame()), CaptureLayout::standard());
    let mut settings = Settings::default();
    settings.capture.cancel_timeout_seconds = 1.0;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut decoder = MockFrameDecoder::new();
    decoder.expect_decode().returning(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    });
    let mut controller = new_controller(android(), settings).with_decoder(decoder);

    let text = controller.capture(Some(&factory)).await.unwrap();

    assert_eq!(text, None);
    // 62 * 16ms < 1s <= 63 * 16ms
    assert_eq!(calls.load(Ordering::SeqCst), 63);
    assert_eq!(controller.clock().ticks(), 2 + 63);
    assert_eq!(log.stops(), 1);

    let monitor = controller.monitor();
    assert_eq!(monitor.snapshot().last_outcome, Some(SessionOutcome::TimedOut));
    assert_eq!(monitor.metrics().captures_timed_out.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_zero_timeout_never_auto_resolves() {
    let (factory, _log) = camera(ScriptedBackend::new(blank_frame()), CaptureLayout::standard());
    let controller = SessionController::new(
        Settings::default(),
        android(),
        MemoryTextBuffer::default(),
        // A full second per frame: any enabled timeout would have fired long before
        FixedStepClock::new(Duration::from_secs(1)),
    );
    let cancel = controller.cancel_handle();

    let mut decoder = MockFrameDecoder::new();
    let mut calls = 0;
    decoder.expect_decode().returning(move |_, _, _| {
        calls += 1;
        if calls == 500 {
            cancel.cancel();
        }
        Ok(None)
    });
    let mut controller = controller.with_decoder(decoder);

    let text = controller.capture(Some(&factory)).await.unwrap();

    assert_eq!(text, None);
    assert_eq!(
        controller.monitor().snapshot().last_outcome,
        Some(SessionOutcome::Cancelled)
    );
}

#[tokio::test]
async fn test_decode_errors_are_swallowed() {
    let (factory, _log) = camera(ScriptedBackend::new(blank_frame()), CaptureLayout::standard());

    let mut decoder = MockFrameDecoder::new();
    let mut calls = 0;
    decoder.expect_decode().returning(move |_, _, _| {
        calls += 1;
        if calls <= 5 {
            Err(DecodeError::Unreadable("blurry".to_string()))
        } else {
            Ok(Some("sharp".to_string()))
        }
    });
    let mut controller = new_controller(android(), Settings::default()).with_decoder(decoder);

    let text = controller.capture(Some(&factory)).await.unwrap();

    assert_eq!(text.as_deref(), Some("sharp"));
    let metrics = controller.monitor().metrics();
    assert_eq!(metrics.decode_failures.load(Ordering::Relaxed), 5);
    assert_eq!(metrics.frames_polled.load(Ordering::Relaxed), 6);
}

#[tokio::test]
async fn test_permission_denied_twice_fails_before_widget() {
    let (factory, log) = camera(ScriptedBackend::new(blank_frame()), CaptureLayout::standard());
    let mut controller = new_controller(
        StaticAuthority::new(Platform::Ios, false, false),
        Settings::default(),
    );

    let result = controller.capture(Some(&factory)).await;

    assert_eq!(result, Err(SessionError::PermissionDenied));
    assert_eq!(controller.authority().requests(), 1);
    assert_eq!(log.opens(), 0);

    let state = controller.monitor().snapshot();
    assert_eq!(state.live_widgets, 0);
    assert_eq!(state.completed, 0);
}

#[tokio::test]
async fn test_permission_granted_on_request() {
    let (factory, _log) = camera(ScriptedBackend::new(qr_frame("granted")), CaptureLayout::standard());
    let mut controller = new_controller(
        StaticAuthority::new(Platform::Android, false, true),
        Settings::default(),
    );

    let text = controller.capture(Some(&factory)).await.unwrap();

    assert_eq!(text.as_deref(), Some("granted"));
    assert_eq!(controller.authority().requests(), 1);
}

#[tokio::test]
async fn test_no_camera_platform_returns_buffer_verbatim() {
    let (factory, log) = camera(ScriptedBackend::new(qr_frame("camera")), CaptureLayout::standard());
    let contents = "  first line\nsecond line\t";

    for platform in [Platform::Desktop, Platform::Console] {
        let mut controller = SessionController::new(
            Settings::default(),
            StaticAuthority::granted(platform),
            MemoryTextBuffer::new(contents),
            FixedStepClock::new(Duration::from_millis(16)),
        );

        let text = controller.capture(Some(&factory)).await.unwrap();

        assert_eq!(text.as_deref(), Some(contents));
        assert_eq!(controller.monitor().metrics().fallback_reads.load(Ordering::Relaxed), 1);
    }
    assert_eq!(log.opens(), 0);
}

#[tokio::test]
async fn test_console_ignores_desktop_camera_setting() {
    let (factory, log) = camera(ScriptedBackend::new(qr_frame("camera")), CaptureLayout::standard());
    let mut settings = Settings::default();
    settings.capture.desktop_camera = true;

    let mut controller = new_controller(StaticAuthority::granted(Platform::Console), settings.clone());
    let text = controller.capture(Some(&factory)).await.unwrap();
    assert_eq!(text.as_deref(), Some("clipboard text"));
    assert_eq!(log.opens(), 0);

    let mut controller = new_controller(StaticAuthority::granted(Platform::Desktop), settings);
    let text = controller.capture(Some(&factory)).await.unwrap();
    assert_eq!(text.as_deref(), Some("camera"));
    assert_eq!(log.opens(), 1);
}

#[tokio::test]
async fn test_no_rear_camera_resolves_none() {
    let (factory, log) = camera(ScriptedBackend::front_only(blank_frame()), CaptureLayout::standard());
    let mut controller = new_controller(android(), Settings::default());

    let text = controller.capture(Some(&factory)).await.unwrap();

    assert_eq!(text, None);
    assert_eq!(log.opens(), 0);
    assert_eq!(controller.clock().ticks(), 0);

    let state = controller.monitor().snapshot();
    assert_eq!(state.live_widgets, 0);
    assert_eq!(state.last_outcome, Some(SessionOutcome::NoDevice));
}

#[tokio::test]
async fn test_bad_layout_is_configuration_error() {
    let layout = CaptureLayout {
        capture_target: None,
        ..CaptureLayout::standard()
    };
    let (factory, log) = camera(ScriptedBackend::new(blank_frame()), layout);
    let mut controller = new_controller(android(), Settings::default());

    let result = controller.capture(Some(&factory)).await;

    assert!(matches!(result, Err(SessionError::Configuration(_))));
    assert_eq!(log.opens(), 0);

    let state = controller.monitor().snapshot();
    assert_eq!(state.live_widgets, 0);
    assert!(matches!(state.last_outcome, Some(SessionOutcome::Failed(_))));
}

#[tokio::test]
async fn test_scan_button_mode_decodes_only_after_press() {
    let (factory, _log) = camera(
        ScriptedBackend::new(blank_frame()),
        CaptureLayout::standard().with_scan_button(),
    );
    let buttons = factory.buttons();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut decoder = MockFrameDecoder::new();
    decoder.expect_decode().returning(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some("scanned".to_string()))
    });
    let mut controller = new_controller(android(), Settings::default()).with_decoder(decoder);

    let presser = async {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(buttons.press_scan());
    };
    let (text, ()) = tokio::join!(controller.capture(Some(&factory)), presser);

    assert_eq!(text.unwrap().as_deref(), Some("scanned"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Decoder that panics on its `panic_on`th call
struct PanickingDecoder {
    calls: AtomicUsize,
    panic_on: usize,
}

impl Decoder for PanickingDecoder {
    fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Option<String>, DecodeError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.panic_on {
            panic!("decoder crashed");
        }
        Ok(None)
    }
}

#[test]
fn test_panic_mid_session_still_destroys_widget_once() {
    let (factory, log) = camera(ScriptedBackend::new(blank_frame()), CaptureLayout::standard());
    let mut controller = new_controller(android(), Settings::default()).with_decoder(PanickingDecoder {
        calls: AtomicUsize::new(0),
        panic_on: 3,
    });
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        runtime.block_on(controller.capture(Some(&factory)))
    }));

    assert!(result.is_err());
    assert_eq!(log.opens(), 1);
    assert_eq!(log.stops(), 1);
    assert_eq!(controller.monitor().snapshot().live_widgets, 0);
}
