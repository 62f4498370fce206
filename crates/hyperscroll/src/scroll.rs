//! Virtual document model.
//!
//! The native host has no page to scroll, so it synthesizes one: a document
//! `pages` viewport-heights tall. Wheel and trackpad deltas move a clamped
//! pixel offset through it, and the offset/heights triple feeds the phase
//! controller exactly the way a real scroll listener would.

use winit::event::MouseScrollDelta;

/// Pixels per wheel "line"; matches typical host UI scroll steps.
const LINE_HEIGHT: f32 = 52.0;

#[derive(Debug, Clone)]
pub struct VirtualDocument {
    pages: u32,
    viewport_height: f32,
    offset: f32,
}

impl VirtualDocument {
    pub fn new(pages: u32, viewport_height: f32) -> Self {
        Self {
            pages: pages.max(1),
            viewport_height: viewport_height.max(1.0),
            offset: 0.0,
        }
    }

    pub fn document_height(&self) -> f32 {
        self.pages as f32 * self.viewport_height
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    fn max_offset(&self) -> f32 {
        (self.document_height() - self.viewport_height).max(0.0)
    }

    /// Applies a wheel delta; scrolling down moves the offset forward.
    pub fn apply_wheel(&mut self, delta: MouseScrollDelta) {
        let pixels = match delta {
            MouseScrollDelta::LineDelta(_, lines) => -lines * LINE_HEIGHT,
            MouseScrollDelta::PixelDelta(position) => -position.y as f32,
        };
        self.scroll_by(pixels);
    }

    pub fn scroll_by(&mut self, pixels: f32) {
        self.offset = (self.offset + pixels).clamp(0.0, self.max_offset());
    }

    /// Tracks a viewport resize, preserving the reader's relative position.
    pub fn set_viewport_height(&mut self, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let fraction = if self.max_offset() > 0.0 {
            self.offset / self.max_offset()
        } else {
            0.0
        };
        self.viewport_height = viewport_height;
        self.offset = fraction * self.max_offset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollphase::progress_from_scroll;

    #[test]
    fn offset_clamps_to_the_scrollable_range() {
        let mut doc = VirtualDocument::new(5, 800.0);
        doc.scroll_by(-200.0);
        assert_eq!(doc.offset(), 0.0);
        doc.scroll_by(10_000.0);
        assert_eq!(doc.offset(), 3200.0);
        assert_eq!(doc.document_height(), 4000.0);
    }

    #[test]
    fn wheel_lines_scroll_down_the_document() {
        let mut doc = VirtualDocument::new(5, 800.0);
        doc.apply_wheel(MouseScrollDelta::LineDelta(0.0, -2.0));
        assert_eq!(doc.offset(), 104.0);
        doc.apply_wheel(MouseScrollDelta::LineDelta(0.0, 1.0));
        assert_eq!(doc.offset(), 52.0);
    }

    #[test]
    fn full_scroll_reaches_progress_one() {
        let mut doc = VirtualDocument::new(5, 800.0);
        doc.scroll_by(f32::MAX);
        let progress =
            progress_from_scroll(doc.offset(), doc.document_height(), doc.viewport_height());
        assert_eq!(progress, 1.0);
    }

    #[test]
    fn single_page_document_never_scrolls() {
        let mut doc = VirtualDocument::new(1, 800.0);
        doc.scroll_by(500.0);
        assert_eq!(doc.offset(), 0.0);
        let progress =
            progress_from_scroll(doc.offset(), doc.document_height(), doc.viewport_height());
        assert_eq!(progress, 0.0);
    }

    #[test]
    fn viewport_resize_preserves_relative_position() {
        let mut doc = VirtualDocument::new(5, 800.0);
        doc.scroll_by(1600.0);
        doc.set_viewport_height(400.0);
        let fraction = doc.offset() / (doc.document_height() - doc.viewport_height());
        assert!((fraction - 0.5).abs() < 1e-6);
        // Degenerate input keeps the last valid viewport.
        doc.set_viewport_height(0.0);
        assert_eq!(doc.viewport_height(), 400.0);
    }
}
