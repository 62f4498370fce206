use std::time::{Duration, Instant};

/// High-level behaviour requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderPolicy {
    /// Run the render loop continuously, optionally capping the frame rate.
    Animate {
        /// Optional requested frames-per-second cap.
        target_fps: Option<f32>,
    },
    /// Render a single frame at a fixed timestamp and scroll progress.
    Still {
        /// Timestamp to evaluate the shaders at (seconds).
        time: f32,
        /// Scroll progress to evaluate the phase table at.
        progress: f32,
    },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate { target_fps: None }
    }
}

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
}

impl FixedTimeSource {
    pub fn new(time: f32) -> Self {
        Self { time }
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {}

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.time, 0)
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds a time source suited to the requested render policy.
pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate { .. } => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time, .. } => Box::new(FixedTimeSource::new(*time)),
    }
}

/// Frame-rate cap driven by an elapsed-time accumulator.
///
/// Callbacks keep arriving at the display rate; the pacer decides which of
/// them should actually render. One interval is subtracted per rendered
/// frame rather than zeroing the accumulator, so long gaps do not burst.
pub struct FramePacer {
    interval: Option<Duration>,
    accumulator: Duration,
    last_tick: Option<Instant>,
}

impl FramePacer {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            accumulator: Duration::ZERO,
            last_tick: None,
        }
    }

    /// Whether the frame arriving at `now` should be rendered.
    pub fn should_render(&mut self, now: Instant) -> bool {
        let Some(interval) = self.interval else {
            return true;
        };
        let delta = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(interval);
        self.last_tick = Some(now);
        self.accumulator = self.accumulator.saturating_add(delta);
        if self.accumulator + Duration::from_micros(250) < interval {
            false
        } else {
            self.accumulator = self.accumulator.saturating_sub(interval);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_source_counts_frames() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        let second = source.sample();
        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
        assert!(second.seconds >= first.seconds);
    }

    #[test]
    fn fixed_source_is_frozen() {
        let mut source = FixedTimeSource::new(4.5);
        assert_eq!(source.sample(), TimeSample::new(4.5, 0));
        assert_eq!(source.sample(), TimeSample::new(4.5, 0));
    }

    #[test]
    fn uncapped_pacer_renders_every_frame() {
        let mut pacer = FramePacer::new(None);
        let now = Instant::now();
        for step in 0..5 {
            assert!(pacer.should_render(now + Duration::from_millis(step * 16)));
        }
    }

    #[test]
    fn capped_pacer_skips_intermediate_frames() {
        // 30 FPS cap fed with 120 Hz callbacks: roughly one in four renders.
        let mut pacer = FramePacer::new(Some(30.0));
        let start = Instant::now();
        let rendered = (0..120)
            .filter(|step| pacer.should_render(start + Duration::from_micros(step * 8_333)))
            .count();
        assert!((25..=35).contains(&rendered), "rendered {rendered} frames");
    }
}
