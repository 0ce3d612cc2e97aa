// Session metrics module
//
// Lightweight counters for capture and display sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Session metrics
///
/// Uses atomic operations so the counters can be read from any thread while
/// sessions run on the host loop. Logged on shutdown via [`Metrics::log_summary`].
#[derive(Debug)]
pub struct Metrics {
    /// Capture sessions that reached the widget stage
    pub captures_started: AtomicU64,

    /// Capture sessions that returned text
    pub captures_decoded: AtomicU64,

    /// Capture sessions cancelled by the user or caller
    pub captures_cancelled: AtomicU64,

    /// Capture sessions that hit the auto-cancel timeout
    pub captures_timed_out: AtomicU64,

    /// Captures answered from the fallback text buffer
    pub fallback_reads: AtomicU64,

    /// Frames handed to the decoder
    pub frames_polled: AtomicU64,

    /// Frames the decoder failed on (swallowed)
    pub decode_failures: AtomicU64,

    /// Display sessions started
    pub displays_shown: AtomicU64,

    /// QR bitmaps generated
    pub bitmaps_generated: AtomicU64,

    /// QR bitmaps released
    pub bitmaps_released: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            captures_started: AtomicU64::new(0),
            captures_decoded: AtomicU64::new(0),
            captures_cancelled: AtomicU64::new(0),
            captures_timed_out: AtomicU64::new(0),
            fallback_reads: AtomicU64::new(0),
            frames_polled: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            displays_shown: AtomicU64::new(0),
            bitmaps_generated: AtomicU64::new(0),
            bitmaps_released: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_capture_started(&self) {
        self.captures_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture_decoded(&self) {
        self.captures_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture_cancelled(&self) {
        self.captures_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture_timed_out(&self) {
        self.captures_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_read(&self) {
        self.fallback_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_polled(&self) {
        self.frames_polled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_display_shown(&self) {
        self.displays_shown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bitmap_generated(&self) {
        self.bitmaps_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bitmap_released(&self) {
        self.bitmaps_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Fraction of decoded frames that failed, 0.0 when nothing was decoded
    pub fn decode_failure_rate(&self) -> f64 {
        let polled = self.frames_polled.load(Ordering::Relaxed);
        if polled > 0 {
            self.decode_failures.load(Ordering::Relaxed) as f64 / polled as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Captures: {} started, {} decoded, {} cancelled, {} timed out, {} from fallback",
            self.captures_started.load(Ordering::Relaxed),
            self.captures_decoded.load(Ordering::Relaxed),
            self.captures_cancelled.load(Ordering::Relaxed),
            self.captures_timed_out.load(Ordering::Relaxed),
            self.fallback_reads.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Frames: {} decoded, {} unreadable ({:.1}%)",
            self.frames_polled.load(Ordering::Relaxed),
            self.decode_failures.load(Ordering::Relaxed),
            self.decode_failure_rate() * 100.0
        );
        tracing::info!(
            "Displays: {} shown, bitmaps {} generated / {} released",
            self.displays_shown.load(Ordering::Relaxed),
            self.bitmaps_generated.load(Ordering::Relaxed),
            self.bitmaps_released.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
