//! Waveform sample buffers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Read-only snapshot of a stretch of one channel's samples.
///
/// The first sample lies at `start_sec`; `track_sec` is the length of the
/// whole channel, which a windowed buffer only covers part of.
#[derive(Debug, Clone)]
pub struct WaveformBuffer {
    id: u64,
    samples: Arc<[f32]>,
    sample_rate: u32,
    start_sec: f64,
    track_sec: f64,
}

impl WaveformBuffer {
    /// The whole channel, starting at t = 0.
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        let mut buffer = Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            samples: samples.into(),
            sample_rate,
            start_sec: 0.0,
            track_sec: 0.0,
        };
        buffer.track_sec = buffer.duration_sec();
        buffer
    }

    /// Part of a channel `track_sec` long, first sample at `start_sec`.
    pub fn windowed(samples: impl Into<Arc<[f32]>>, sample_rate: u32, start_sec: f64, track_sec: f64) -> Self {
        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            samples: samples.into(),
            sample_rate,
            start_sec,
            track_sec,
        }
    }

    /// Unique per constructed buffer; a new id means "data replaced".
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time of the first sample.
    pub fn start_sec(&self) -> f64 {
        self.start_sec
    }

    /// Time just past the last sample.
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec()
    }

    /// Length of the whole channel.
    pub fn track_sec(&self) -> f64 {
        self.track_sec
    }

    /// Duration of the samples held, in seconds.
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Whether every sample of the channel inside `[start_sec, end_sec)` is
    /// held. The window is clipped to the track first.
    pub fn covers(&self, start_sec: f64, end_sec: f64) -> bool {
        let start = start_sec.max(0.0);
        let end = end_sec.min(self.track_sec);
        if !(start < end) {
            return true;
        }
        if self.sample_rate == 0 {
            return false;
        }
        let slack = 0.5 / self.sample_rate as f64;
        start >= self.start_sec - slack && end <= self.end_sec() + slack
    }

    /// The samples covering `[start_sec, end_sec)`, clamped to this buffer,
    /// as a buffer of their own.
    pub fn window(&self, start_sec: f64, end_sec: f64) -> WaveformBuffer {
        let sr = self.sample_rate as f64;
        let len = self.samples.len();
        let (first, last) = if self.sample_rate == 0 {
            (0, 0)
        } else {
            let first = (((start_sec - self.start_sec) * sr).floor().max(0.0) as usize).min(len);
            let last = (((end_sec - self.start_sec) * sr).ceil().max(0.0) as usize).clamp(first, len);
            (first, last)
        };
        let start = if self.sample_rate == 0 {
            self.start_sec
        } else {
            self.start_sec + first as f64 / sr
        };
        Self::windowed(&self.samples[first..last], self.sample_rate, start, self.track_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> WaveformBuffer {
        WaveformBuffer::new((0..100).map(|i| i as f32).collect::<Vec<_>>(), 10)
    }

    #[test]
    fn test_duration() {
        let buf = WaveformBuffer::new(vec![0.0; 44100], 44100);
        assert!((buf.duration_sec() - 1.0).abs() < 1e-12);
        assert_eq!(buf.track_sec(), buf.duration_sec());
        assert_eq!(WaveformBuffer::new(vec![0.0; 10], 0).duration_sec(), 0.0);
    }

    #[test]
    fn test_window_keeps_time_origin() {
        let buf = ramp();
        let win = buf.window(1.0, 2.0);
        assert_eq!(win.samples(), &buf.samples()[10..20]);
        assert_eq!(win.start_sec(), 1.0);
        assert_eq!(win.end_sec(), 2.0);
        assert_eq!(win.track_sec(), 10.0);
        assert_ne!(win.id(), buf.id());

        // windows of windows stay on the track's clock
        let inner = win.window(1.5, 1.75);
        assert_eq!(inner.samples(), &[15.0, 16.0, 17.0][..]);
        assert_eq!(inner.start_sec(), 1.5);
    }

    #[test]
    fn test_window_clamps() {
        let buf = ramp();
        assert_eq!(buf.window(-5.0, 0.5).len(), 5);
        assert_eq!(buf.window(-5.0, 0.5).start_sec(), 0.0);
        assert!(buf.window(20.0, 30.0).is_empty());
    }

    #[test]
    fn test_covers() {
        let buf = ramp();
        assert!(buf.covers(0.0, 10.0));
        // outside the track there is nothing to hold
        assert!(buf.covers(-3.0, 12.0));
        assert!(buf.covers(11.0, 12.0));

        let win = buf.window(2.0, 4.0);
        assert!(win.covers(2.0, 4.0));
        assert!(win.covers(2.5, 3.0));
        assert!(!win.covers(1.0, 3.0));
        assert!(!win.covers(3.0, 4.5));
    }
}
