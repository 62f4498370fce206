//! Scoped acquisition of render-loop resources.
//!
//! Every engine in this workspace acquires GPU and host resources (surfaces,
//! pipelines, buffers, event subscriptions) inside its mount path and must
//! give all of them back exactly once at unmount, including when mount bails
//! out halfway. `ResourceScope` makes that contract explicit: each
//! acquisition registers a release action, and `release()` runs the actions
//! in reverse order, exactly once, no matter how often it is called.
//!
//! `FrameLoop` is the companion piece for the render loop itself: instead of
//! a self-rescheduling closure, the loop is an object holding a
//! `CancellationToken`. A cancelled loop refuses to hand out further frame
//! ticks, so tearing down (cancel + release in one step) guarantees that no
//! frame is ever drawn into a disposed surface.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("resource scope '{0}' is already released; cannot acquire '{1}'")]
    ScopeReleased(String, String),
}

/// Shared acquire/release counters, cloneable into tests.
///
/// The counters outlive the scope they observe so a test can assert
/// `acquired() == released()` after repeated mount/unmount cycles.
#[derive(Clone, Default)]
pub struct ScopeCounters {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl ScopeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// True when every acquisition has been matched by a release.
    pub fn balanced(&self) -> bool {
        self.acquired() == self.released()
    }
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

struct Acquisition {
    label: &'static str,
    release: ReleaseFn,
}

/// Ordered registry of release actions for one mounted component.
///
/// Acquisitions are released in LIFO order, mirroring the dependency order
/// in which GPU objects are created (surface before pipeline before
/// buffers). Dropping the scope releases as a backstop, so early-return
/// error paths in mount cannot leak what they already acquired.
pub struct ResourceScope {
    label: String,
    acquisitions: Vec<Acquisition>,
    released: bool,
    counters: ScopeCounters,
}

impl ResourceScope {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_counters(label, ScopeCounters::new())
    }

    /// Creates a scope that reports into externally-owned counters.
    pub fn with_counters(label: impl Into<String>, counters: ScopeCounters) -> Self {
        Self {
            label: label.into(),
            acquisitions: Vec::new(),
            released: false,
            counters,
        }
    }

    pub fn counters(&self) -> ScopeCounters {
        self.counters.clone()
    }

    /// Registers a release action for a resource that was just acquired.
    ///
    /// Fails if the scope has already been released: a released scope must
    /// never silently swallow a fresh acquisition, because nothing would
    /// release it.
    pub fn acquire(
        &mut self,
        label: &'static str,
        release: impl FnOnce() + Send + 'static,
    ) -> Result<(), LifecycleError> {
        if self.released {
            return Err(LifecycleError::ScopeReleased(
                self.label.clone(),
                label.to_string(),
            ));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        self.acquisitions.push(Acquisition {
            label,
            release: Box::new(release),
        });
        Ok(())
    }

    /// Runs every pending release action exactly once, newest first.
    ///
    /// Safe to call repeatedly; later calls are no-ops.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        while let Some(acquisition) = self.acquisitions.pop() {
            tracing::trace!(scope = %self.label, resource = acquisition.label, "releasing");
            (acquisition.release)();
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        self.release();
    }
}

/// Cooperative cancellation flag shared between a frame loop and its owner.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One scheduled frame, handed out by [`FrameLoop::next_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick {
    /// Monotonic index of this frame since the loop started.
    pub frame_index: u64,
}

/// Explicit render-loop scheduler.
///
/// The host asks for a tick each time the platform requests a redraw; once
/// the token is cancelled the loop returns `None` forever, which is what
/// lets unmount cancel the pending frame and release resources in the same
/// teardown step. Tests drive frames by calling `next_frame` directly.
pub struct FrameLoop {
    token: CancellationToken,
    frame_index: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            frame_index: 0,
        }
    }

    /// Token handle for cancelling from teardown code.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Produces the next frame tick, or `None` once cancelled.
    pub fn next_frame(&mut self) -> Option<FrameTick> {
        if self.token.is_cancelled() {
            return None;
        }
        let tick = FrameTick {
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.saturating_add(1);
        Some(tick)
    }

    /// Cancels the loop; subsequent `next_frame` calls return `None`.
    pub fn cancel(&mut self) {
        self.token.cancel();
    }

    pub fn frames_produced(&self) -> u64 {
        self.frame_index
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn releases_in_reverse_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut scope = ResourceScope::new("test");
        for index in 0..3 {
            let order = order.clone();
            scope
                .acquire("numbered", move || order.lock().unwrap().push(index))
                .unwrap();
        }
        scope.release();
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn release_is_idempotent() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scope = ResourceScope::new("test");
        let seen = count.clone();
        scope
            .acquire("resource", move || {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        scope.release();
        scope.release();
        scope.release();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn acquire_after_release_is_rejected() {
        let mut scope = ResourceScope::new("test");
        scope.release();
        let result = scope.acquire("late", || {});
        assert!(matches!(result, Err(LifecycleError::ScopeReleased(_, _))));
    }

    #[test]
    fn counters_balance_across_mount_cycles() {
        let counters = ScopeCounters::new();
        for _ in 0..3 {
            let mut scope = ResourceScope::with_counters("cycle", counters.clone());
            scope.acquire("surface", || {}).unwrap();
            scope.acquire("listener", || {}).unwrap();
            scope.release();
        }
        assert_eq!(counters.acquired(), 6);
        assert!(counters.balanced());
    }

    #[test]
    fn drop_releases_unreleased_scope() {
        let counters = ScopeCounters::new();
        {
            let mut scope = ResourceScope::with_counters("dropped", counters.clone());
            scope.acquire("buffer", || {}).unwrap();
        }
        assert!(counters.balanced());
    }

    #[test]
    fn frame_loop_counts_and_stops_after_cancel() {
        let mut frames = FrameLoop::new();
        assert_eq!(frames.next_frame(), Some(FrameTick { frame_index: 0 }));
        assert_eq!(frames.next_frame(), Some(FrameTick { frame_index: 1 }));
        frames.cancel();
        assert_eq!(frames.next_frame(), None);
        assert_eq!(frames.next_frame(), None);
        assert_eq!(frames.frames_produced(), 2);
    }

    #[test]
    fn cancellation_token_is_shared() {
        let mut frames = FrameLoop::new();
        let token = frames.token();
        token.cancel();
        assert!(frames.next_frame().is_none());
    }
}
