//! Scroll-driven phase dispatch.
//!
//! A single external scalar (the host's scroll offset) drives every visual
//! parameter in the engine. This crate normalizes the raw offset into a
//! progress value in `[0, 1]`, maps progress onto one of four rendering
//! phases through an explicit ordered band table, derives each phase's
//! re-normalized local progress, and pushes the resulting sample to attached
//! subscribers.
//!
//! Everything here is a pure function of progress: revisiting an offset
//! reproduces the exact sample previously seen there, so scrolling back up
//! is fully supported and nothing keeps history.

/// Progress at which the grid tunnel hands over to the flash transition.
pub const FLASH_START: f32 = 0.60;
/// Progress at which the flash hands over to the galaxy tunnel.
pub const GALAXY_START: f32 = 0.65;
/// Progress at which the galaxy tunnel begins to shatter.
pub const SHATTER_START: f32 = 0.95;

/// Fraction of the galaxy sub-range over which the residual flash fades out.
pub const FLASH_FADE_SPAN: f32 = 0.10;

/// Depth offset fed to the background field at progress 0.
pub const GRID_DEPTH_START: f32 = 0.0;
/// Depth offset fed to the background field when the grid phase completes.
pub const GRID_DEPTH_END: f32 = 40.0;

/// Guard against a zero scrollable range; offsets divide by at least this.
const SCROLL_RANGE_EPSILON: f32 = 1.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PhaseError {
    #[error("phase table is empty")]
    EmptyTable,
    #[error("phase table must start at 0.0, got {0}")]
    BadStart(f32),
    #[error("phase table must end at 1.0, got {0}")]
    BadEnd(f32),
    #[error("band for {phase:?} begins at {start} but the previous band ends at {expected}")]
    Gap {
        phase: ScrollPhase,
        start: f32,
        expected: f32,
    },
    #[error("band for {phase:?} has non-positive width ({start}..{end})")]
    EmptyBand {
        phase: ScrollPhase,
        start: f32,
        end: f32,
    },
    #[error("phase table has no band for {0:?}")]
    MissingPhase(ScrollPhase),
}

/// The four mutually exclusive rendering phases, in scroll order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollPhase {
    GridTunnel,
    FlashTransition,
    GalaxyTunnel,
    Shatter,
}

/// One `[start, end)` slice of the progress axis.
///
/// The final band also claims `progress == end` so that progress 1.0 has an
/// owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseBand {
    pub start: f32,
    pub end: f32,
    pub phase: ScrollPhase,
}

impl PhaseBand {
    /// Progress re-normalized to this band's `[0, 1]` range.
    pub fn local(&self, progress: f32) -> f32 {
        ((progress - self.start) / (self.end - self.start)).clamp(0.0, 1.0)
    }
}

/// Ordered, contiguous cover of `[0, 1]` by phase bands.
///
/// Every threshold lives in this one table and is evaluated by one dispatch
/// function; the constructor rejects tables with gaps or empty bands.
#[derive(Debug, Clone)]
pub struct PhaseTable {
    bands: Vec<PhaseBand>,
}

impl PhaseTable {
    pub fn new(bands: Vec<PhaseBand>) -> Result<Self, PhaseError> {
        let first = bands.first().ok_or(PhaseError::EmptyTable)?;
        if first.start != 0.0 {
            return Err(PhaseError::BadStart(first.start));
        }
        let mut expected = 0.0_f32;
        for band in &bands {
            if band.start != expected {
                return Err(PhaseError::Gap {
                    phase: band.phase,
                    start: band.start,
                    expected,
                });
            }
            if band.end <= band.start {
                return Err(PhaseError::EmptyBand {
                    phase: band.phase,
                    start: band.start,
                    end: band.end,
                });
            }
            expected = band.end;
        }
        if expected != 1.0 {
            return Err(PhaseError::BadEnd(expected));
        }
        for phase in [
            ScrollPhase::GridTunnel,
            ScrollPhase::FlashTransition,
            ScrollPhase::GalaxyTunnel,
            ScrollPhase::Shatter,
        ] {
            if !bands.iter().any(|band| band.phase == phase) {
                return Err(PhaseError::MissingPhase(phase));
            }
        }
        Ok(Self { bands })
    }

    /// The production table with the literal thresholds the site shipped
    /// with. These values are load-bearing; downstream captures were tuned
    /// against them.
    pub fn standard() -> Self {
        Self::new(vec![
            PhaseBand {
                start: 0.0,
                end: FLASH_START,
                phase: ScrollPhase::GridTunnel,
            },
            PhaseBand {
                start: FLASH_START,
                end: GALAXY_START,
                phase: ScrollPhase::FlashTransition,
            },
            PhaseBand {
                start: GALAXY_START,
                end: SHATTER_START,
                phase: ScrollPhase::GalaxyTunnel,
            },
            PhaseBand {
                start: SHATTER_START,
                end: 1.0,
                phase: ScrollPhase::Shatter,
            },
        ])
        .expect("standard band table is well-formed")
    }

    pub fn bands(&self) -> &[PhaseBand] {
        &self.bands
    }

    /// Single dispatch point: which band owns this progress value.
    pub fn band_for(&self, progress: f32) -> &PhaseBand {
        let clamped = progress.clamp(0.0, 1.0);
        self.bands
            .iter()
            .find(|band| clamped >= band.start && clamped < band.end)
            .unwrap_or_else(|| self.bands.last().expect("table is non-empty"))
    }

    pub fn band_of(&self, phase: ScrollPhase) -> Option<&PhaseBand> {
        self.bands.iter().find(|band| band.phase == phase)
    }
}

/// Snapshot of every scroll-derived parameter at one progress value.
///
/// Each local value is total over `[0, 1]` (saturating outside its own
/// band), so subscribers never need to branch on phase to stay continuous
/// across a boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSample {
    pub progress: f32,
    pub phase: ScrollPhase,
    /// Depth offset for the background field; ramps over the grid band.
    pub grid_depth: f32,
    /// Whiteout opacity; ramps up through the flash band, fades out over
    /// the first [`FLASH_FADE_SPAN`] of the galaxy band.
    pub flash_opacity: f32,
    /// Hyperdrive progress; 0 before the galaxy band, 1 after it.
    pub galaxy_progress: f32,
    /// Cubic-eased shard displacement; 0 at the shatter threshold.
    pub shatter_progress: f32,
}

/// Normalizes a pixel offset against the scrollable range.
///
/// A document no taller than the viewport has nothing to scroll; progress
/// is defined as 0 there rather than dividing by zero.
pub fn progress_from_scroll(pixel_offset: f32, document_height: f32, viewport_height: f32) -> f32 {
    let range = document_height - viewport_height;
    if range < SCROLL_RANGE_EPSILON {
        return 0.0;
    }
    (pixel_offset / range).clamp(0.0, 1.0)
}

/// Receives phase samples pushed by the controller.
pub trait PhaseSink {
    fn on_sample(&mut self, sample: &PhaseSample);
}

/// Identifies one attached subscriber for later detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

/// Converts scroll offsets into phase samples and fans them out.
pub struct ScrollPhaseController {
    table: PhaseTable,
    sinks: Vec<(SinkId, Box<dyn PhaseSink>)>,
    next_sink: u64,
    last: Option<PhaseSample>,
}

impl ScrollPhaseController {
    pub fn new() -> Self {
        Self::with_table(PhaseTable::standard())
    }

    pub fn with_table(table: PhaseTable) -> Self {
        Self {
            table,
            sinks: Vec::new(),
            next_sink: 0,
            last: None,
        }
    }

    pub fn table(&self) -> &PhaseTable {
        &self.table
    }

    /// Attaches a subscriber; the returned id detaches it again.
    ///
    /// Hosts register the detach with their unmount scope so a remount can
    /// never accumulate duplicate subscriptions.
    pub fn attach(&mut self, sink: Box<dyn PhaseSink>) -> SinkId {
        let id = SinkId(self.next_sink);
        self.next_sink += 1;
        self.sinks.push((id, sink));
        id
    }

    /// Removes a subscriber; returns whether it was attached.
    pub fn detach(&mut self, id: SinkId) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(sink_id, _)| *sink_id != id);
        self.sinks.len() != before
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn last_sample(&self) -> Option<PhaseSample> {
        self.last
    }

    /// Entry point for host scroll events.
    pub fn on_scroll_position_changed(
        &mut self,
        pixel_offset: f32,
        document_height: f32,
        viewport_height: f32,
    ) -> PhaseSample {
        let progress = progress_from_scroll(pixel_offset, document_height, viewport_height);
        self.push_progress(progress)
    }

    /// Drives the controller from an already-normalized progress value
    /// (used by still-frame rendering and tests).
    pub fn push_progress(&mut self, progress: f32) -> PhaseSample {
        let sample = self.sample(progress);
        for (_, sink) in &mut self.sinks {
            sink.on_sample(&sample);
        }
        self.last = Some(sample);
        sample
    }

    /// Pure sampling: no subscriber push, no state change.
    pub fn sample(&self, progress: f32) -> PhaseSample {
        let progress = progress.clamp(0.0, 1.0);
        let band = self.table.band_for(progress);

        let grid_band = self
            .table
            .band_of(ScrollPhase::GridTunnel)
            .expect("grid band present");
        let flash_band = self
            .table
            .band_of(ScrollPhase::FlashTransition)
            .expect("flash band present");
        let galaxy_band = self
            .table
            .band_of(ScrollPhase::GalaxyTunnel)
            .expect("galaxy band present");
        let shatter_band = self
            .table
            .band_of(ScrollPhase::Shatter)
            .expect("shatter band present");

        let grid_local = grid_band.local(progress);
        let galaxy_progress = galaxy_band.local(progress);
        let shatter_progress = shatter_band.local(progress).powi(3);

        let flash_opacity = if progress < flash_band.start {
            0.0
        } else if progress < flash_band.end {
            flash_band.local(progress)
        } else {
            (1.0 - galaxy_progress / FLASH_FADE_SPAN).clamp(0.0, 1.0)
        };

        PhaseSample {
            progress,
            phase: band.phase,
            grid_depth: GRID_DEPTH_START + (GRID_DEPTH_END - GRID_DEPTH_START) * grid_local,
            flash_opacity,
            galaxy_progress,
            shatter_progress,
        }
    }
}

impl Default for ScrollPhaseController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn controller() -> ScrollPhaseController {
        ScrollPhaseController::new()
    }

    #[test]
    fn progress_is_clamped_and_safe() {
        assert_eq!(progress_from_scroll(0.0, 4000.0, 800.0), 0.0);
        assert_eq!(progress_from_scroll(3200.0, 4000.0, 800.0), 1.0);
        assert_eq!(progress_from_scroll(5000.0, 4000.0, 800.0), 1.0);
        assert_eq!(progress_from_scroll(-50.0, 4000.0, 800.0), 0.0);
        // Degenerate ranges never divide by zero.
        assert_eq!(progress_from_scroll(100.0, 800.0, 800.0), 0.0);
        assert_eq!(progress_from_scroll(100.0, 600.0, 800.0), 0.0);
    }

    #[test]
    fn progress_is_monotonic_in_offset() {
        let mut previous = -1.0_f32;
        for step in 0..=64 {
            let offset = step as f32 * 50.0;
            let progress = progress_from_scroll(offset, 4000.0, 800.0);
            assert!(progress >= previous);
            assert!((0.0..=1.0).contains(&progress));
            previous = progress;
        }
    }

    #[test]
    fn phase_switches_at_literal_thresholds() {
        let ctl = controller();
        assert_eq!(ctl.sample(0.0).phase, ScrollPhase::GridTunnel);
        assert_eq!(ctl.sample(0.5999).phase, ScrollPhase::GridTunnel);
        assert_eq!(ctl.sample(0.60).phase, ScrollPhase::FlashTransition);
        assert_eq!(ctl.sample(0.6499).phase, ScrollPhase::FlashTransition);
        assert_eq!(ctl.sample(0.65).phase, ScrollPhase::GalaxyTunnel);
        assert_eq!(ctl.sample(0.9499).phase, ScrollPhase::GalaxyTunnel);
        assert_eq!(ctl.sample(0.95).phase, ScrollPhase::Shatter);
        assert_eq!(ctl.sample(1.0).phase, ScrollPhase::Shatter);
    }

    #[test]
    fn flash_opacity_ramps_and_fades() {
        let ctl = controller();
        assert_eq!(ctl.sample(0.60).flash_opacity, 0.0);
        assert!((ctl.sample(0.625).flash_opacity - 0.5).abs() < 1e-4);
        // Just below the galaxy threshold the flash is nearly opaque; just
        // above, it begins fading without a jump.
        assert!(ctl.sample(0.6499).flash_opacity > 0.99);
        assert!(ctl.sample(0.6501).flash_opacity > 0.98);
        // Fully faded once a tenth of the galaxy band has elapsed.
        assert_eq!(ctl.sample(0.68).flash_opacity, 0.0);
        assert_eq!(ctl.sample(0.9).flash_opacity, 0.0);
    }

    #[test]
    fn galaxy_progress_spans_its_band() {
        let ctl = controller();
        assert_eq!(ctl.sample(0.60).galaxy_progress, 0.0);
        assert_eq!(ctl.sample(0.65).galaxy_progress, 0.0);
        assert!((ctl.sample(0.80).galaxy_progress - 0.5).abs() < 1e-4);
        assert_eq!(ctl.sample(0.95).galaxy_progress, 1.0);
        assert_eq!(ctl.sample(1.0).galaxy_progress, 1.0);
    }

    #[test]
    fn shatter_uses_cubic_ease_in() {
        let ctl = controller();
        assert_eq!(ctl.sample(0.95).shatter_progress, 0.0);
        assert_eq!(ctl.sample(1.0).shatter_progress, 1.0);
        let halfway = ctl.sample(0.975).shatter_progress;
        assert!((halfway - 0.125).abs() < 1e-4);
        assert_eq!(ctl.sample(0.5).shatter_progress, 0.0);
    }

    #[test]
    fn grid_depth_ramps_then_saturates() {
        let ctl = controller();
        assert_eq!(ctl.sample(0.0).grid_depth, GRID_DEPTH_START);
        let mid = ctl.sample(0.30).grid_depth;
        assert!((mid - (GRID_DEPTH_START + GRID_DEPTH_END) * 0.5).abs() < 1e-3);
        assert_eq!(ctl.sample(0.60).grid_depth, GRID_DEPTH_END);
        assert_eq!(ctl.sample(1.0).grid_depth, GRID_DEPTH_END);
    }

    #[test]
    fn scrolling_back_reproduces_samples_exactly() {
        let mut ctl = controller();
        let offsets = [0.0, 640.0, 1280.0, 2080.0, 2400.0, 3040.0, 3200.0];
        let forward: Vec<PhaseSample> = offsets
            .iter()
            .map(|offset| ctl.on_scroll_position_changed(*offset, 4000.0, 800.0))
            .collect();
        let backward: Vec<PhaseSample> = offsets
            .iter()
            .rev()
            .map(|offset| ctl.on_scroll_position_changed(*offset, 4000.0, 800.0))
            .collect();
        for (fwd, bwd) in forward.iter().zip(backward.iter().rev()) {
            assert_eq!(fwd, bwd);
        }
    }

    #[test]
    fn samples_push_to_attached_sinks() {
        struct Recorder(Rc<RefCell<Vec<PhaseSample>>>);
        impl PhaseSink for Recorder {
            fn on_sample(&mut self, sample: &PhaseSample) {
                self.0.borrow_mut().push(*sample);
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut ctl = controller();
        let id = ctl.attach(Box::new(Recorder(seen.clone())));
        ctl.on_scroll_position_changed(1600.0, 4000.0, 800.0);
        ctl.on_scroll_position_changed(2080.0, 4000.0, 800.0);
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[1].phase, ScrollPhase::FlashTransition);

        assert!(ctl.detach(id));
        assert!(!ctl.detach(id));
        ctl.on_scroll_position_changed(0.0, 4000.0, 800.0);
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(ctl.sink_count(), 0);
    }

    #[test]
    fn malformed_tables_are_rejected() {
        assert_eq!(PhaseTable::new(vec![]).unwrap_err(), PhaseError::EmptyTable);

        let gap = PhaseTable::new(vec![
            PhaseBand {
                start: 0.0,
                end: 0.5,
                phase: ScrollPhase::GridTunnel,
            },
            PhaseBand {
                start: 0.6,
                end: 1.0,
                phase: ScrollPhase::Shatter,
            },
        ]);
        assert!(matches!(gap.unwrap_err(), PhaseError::Gap { .. }));

        let short = PhaseTable::new(vec![PhaseBand {
            start: 0.0,
            end: 0.9,
            phase: ScrollPhase::GridTunnel,
        }]);
        assert!(matches!(short.unwrap_err(), PhaseError::BadEnd(_)));

        // Contiguous cover of [0, 1] is not enough; all four phases must be
        // dispatchable.
        let incomplete = PhaseTable::new(vec![
            PhaseBand {
                start: 0.0,
                end: 0.5,
                phase: ScrollPhase::GridTunnel,
            },
            PhaseBand {
                start: 0.5,
                end: 1.0,
                phase: ScrollPhase::Shatter,
            },
        ]);
        assert!(matches!(
            incomplete.unwrap_err(),
            PhaseError::MissingPhase(ScrollPhase::FlashTransition)
        ));
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        let ctl = controller();
        assert_eq!(ctl.sample(-0.5), ctl.sample(0.0));
        assert_eq!(ctl.sample(1.5), ctl.sample(1.0));
    }
}
