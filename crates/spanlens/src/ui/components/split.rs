//! Resizable split between the code pane and the annotation pane.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub const MIN_PERCENT: u16 = 20;
pub const MAX_PERCENT: u16 = 80;
pub const STEP_PERCENT: u16 = 5;

/// Vertical split: code on top, annotation below.
#[derive(Debug, Clone)]
pub struct SplitLayout {
    top_percent: u16,
    dragging: Arc<AtomicBool>,
}

impl Default for SplitLayout {
    fn default() -> Self {
        Self::new(70)
    }
}

impl SplitLayout {
    pub fn new(top_percent: u16) -> Self {
        Self {
            top_percent: clamp_percent(top_percent),
            dragging: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn top_percent(&self) -> u16 {
        self.top_percent
    }

    pub fn set_top_percent(&mut self, percent: u16) {
        self.top_percent = clamp_percent(percent);
    }

    pub fn grow(&mut self) {
        self.set_top_percent(self.top_percent.saturating_add(STEP_PERCENT));
    }

    pub fn shrink(&mut self) {
        self.set_top_percent(self.top_percent.saturating_sub(STEP_PERCENT));
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.load(Ordering::Acquire)
    }

    /// Start a drag. The flag stays set for as long as the returned guard lives.
    pub fn begin_drag(&self) -> DragGuard {
        self.dragging.store(true, Ordering::Release);
        DragGuard {
            dragging: Arc::clone(&self.dragging),
        }
    }

    /// Move the divider to `row` while a drag is active. Returns `true` if the split changed.
    pub fn drag_to(&mut self, area: Rect, row: u16) -> bool {
        if !self.is_dragging() || area.height == 0 {
            return false;
        }
        let offset = row.saturating_sub(area.y).min(area.height);
        let percent = (u32::from(offset) * 100 / u32::from(area.height)) as u16;
        let before = self.top_percent;
        self.set_top_percent(percent);
        before != self.top_percent
    }

    /// Code pane and annotation pane areas for `area`.
    pub fn areas(&self, area: Rect) -> (Rect, Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(self.top_percent),
                Constraint::Percentage(100 - self.top_percent),
            ])
            .split(area);
        (chunks[0], chunks[1])
    }

    /// Whether `row` is on the divider, i.e. the top border of the annotation pane.
    pub fn is_divider(&self, area: Rect, row: u16) -> bool {
        let (_, bottom) = self.areas(area);
        bottom.height > 0 && row == bottom.y
    }
}

/// Clears the drag flag when dropped, whatever path ends the drag.
#[derive(Debug)]
pub struct DragGuard {
    dragging: Arc<AtomicBool>,
}

impl Drop for DragGuard {
    fn drop(&mut self) {
        self.dragging.store(false, Ordering::Release);
    }
}

fn clamp_percent(percent: u16) -> u16 {
    percent.clamp(MIN_PERCENT, MAX_PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_clamped() {
        assert_eq!(SplitLayout::new(5).top_percent(), MIN_PERCENT);
        assert_eq!(SplitLayout::new(95).top_percent(), MAX_PERCENT);

        let mut split = SplitLayout::new(78);
        split.grow();
        assert_eq!(split.top_percent(), MAX_PERCENT);
        split.set_top_percent(22);
        split.shrink();
        assert_eq!(split.top_percent(), MIN_PERCENT);
    }

    #[test]
    fn guard_clears_flag_on_drop() {
        let split = SplitLayout::default();
        {
            let _guard = split.begin_drag();
            assert!(split.is_dragging());
        }
        assert!(!split.is_dragging());
    }

    #[test]
    fn guard_clears_flag_on_early_return() {
        fn abort(split: &SplitLayout) -> Result<(), &'static str> {
            let _guard = split.begin_drag();
            Err("pointer left the window")
        }

        let split = SplitLayout::default();
        assert!(abort(&split).is_err());
        assert!(!split.is_dragging());
    }

    #[test]
    fn drag_moves_divider_only_while_dragging() {
        let area = Rect::new(0, 0, 80, 40);
        let mut split = SplitLayout::new(50);
        assert!(!split.drag_to(area, 10));
        assert_eq!(split.top_percent(), 50);

        let guard = split.begin_drag();
        assert!(split.drag_to(area, 24));
        assert_eq!(split.top_percent(), 60);
        assert!(split.drag_to(area, 0));
        assert_eq!(split.top_percent(), MIN_PERCENT);
        drop(guard);

        assert!(!split.drag_to(area, 30));
        assert_eq!(split.top_percent(), MIN_PERCENT);
    }

    #[test]
    fn areas_follow_percent() {
        let area = Rect::new(0, 0, 80, 40);
        let split = SplitLayout::new(75);
        let (top, bottom) = split.areas(area);
        assert_eq!(top.height, 30);
        assert_eq!(bottom.height, 10);
        assert!(split.is_divider(area, 30));
        assert!(!split.is_divider(area, 29));
    }
}
