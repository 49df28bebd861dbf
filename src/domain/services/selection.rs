//! Range selection used to seed new closures.
//!
//! The machine works on one day's classified slots, addressed by index. Only
//! `Empty` slots can be part of a range; an extension that would cross any other
//! slot collapses the preview back to the anchor.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::debug;
use crate::domain::services::availability::ClassifiedSlot;
use crate::domain::services::slots::SLOT_MINUTES;

/// Vertical travel before an idle touch move is read as scrolling.
pub const SCROLL_THRESHOLD_PX: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    #[default]
    Blocking,
    Booking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selecting {
        date: NaiveDate,
        anchor: usize,
        start: usize,
        end: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    Press(usize),
    Move(usize),
    /// Pointer released; `None` when released outside the grid.
    Release(Option<usize>),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedRange {
    pub date: NaiveDate,
    pub start_index: usize,
    pub end_index: usize,
    pub labels: Vec<NaiveTime>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Ignored,
    Started { anchor: usize },
    Preview { start: usize, end: usize, collapsed: bool },
    Confirmed(SelectedRange),
    Cancelled,
    BookingRequested { date: NaiveDate, label: NaiveTime, instant: DateTime<Utc> },
}

#[derive(Debug, Default)]
pub struct SelectionMachine {
    state: SelectionState,
    mode: InteractionMode,
}

fn selectable(slots: &[ClassifiedSlot<'_>], index: usize) -> bool {
    slots.get(index).is_some_and(|s| s.status.is_selectable())
}

fn run_is_valid(slots: &[ClassifiedSlot<'_>], start: usize, end: usize) -> bool {
    end < slots.len() && (start..=end).all(|i| selectable(slots, i))
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

impl SelectionMachine {
    pub fn new(mode: InteractionMode) -> Self {
        Self { state: SelectionState::Idle, mode }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.state, SelectionState::Selecting { .. })
    }

    /// Current preview as an inclusive index range.
    pub fn range(&self) -> Option<(usize, usize)> {
        match self.state {
            SelectionState::Selecting { start, end, .. } => Some((start, end)),
            SelectionState::Idle => None,
        }
    }

    /// Switching mode always drops a selection in progress.
    pub fn set_mode(&mut self, mode: InteractionMode) -> SelectionOutcome {
        self.mode = mode;
        self.cancel()
    }

    pub fn cancel(&mut self) -> SelectionOutcome {
        if self.is_selecting() {
            self.state = SelectionState::Idle;
            SelectionOutcome::Cancelled
        } else {
            SelectionOutcome::Ignored
        }
    }

    pub fn handle(&mut self, event: SelectionEvent, date: NaiveDate, slots: &[ClassifiedSlot<'_>]) -> SelectionOutcome {
        match (self.state, event) {
            (SelectionState::Idle, SelectionEvent::Press(index)) => {
                if !selectable(slots, index) {
                    return SelectionOutcome::Ignored;
                }
                let slot = &slots[index];
                match self.mode {
                    InteractionMode::Booking => SelectionOutcome::BookingRequested {
                        date,
                        label: slot.label,
                        instant: slot.instant,
                    },
                    InteractionMode::Blocking => {
                        self.state = SelectionState::Selecting { date, anchor: index, start: index, end: index };
                        SelectionOutcome::Started { anchor: index }
                    }
                }
            }
            (SelectionState::Idle, _) => SelectionOutcome::Ignored,

            (SelectionState::Selecting { .. }, SelectionEvent::Cancel) => self.cancel(),

            (SelectionState::Selecting { date: anchor_date, anchor, .. }, SelectionEvent::Move(target)) => {
                let (start, end) = ordered(anchor, target);
                let valid = anchor_date == date && run_is_valid(slots, start, end);
                let (start, end) = if valid { (start, end) } else { (anchor, anchor) };
                debug!(anchor, target, valid, "selection preview recomputed");
                self.state = SelectionState::Selecting { date: anchor_date, anchor, start, end };
                SelectionOutcome::Preview { start, end, collapsed: !valid }
            }

            (SelectionState::Selecting { date: anchor_date, anchor, start, end }, SelectionEvent::Release(Some(target)))
                if target == anchor && start == anchor && end == anchor && anchor_date == date =>
            {
                // First half of a click-then-click selection.
                SelectionOutcome::Ignored
            }

            (SelectionState::Selecting { date: anchor_date, anchor, .. }, SelectionEvent::Release(Some(target)))
            | (SelectionState::Selecting { date: anchor_date, anchor, .. }, SelectionEvent::Press(target)) => {
                let (start, end) = ordered(anchor, target);
                if anchor_date != date || !run_is_valid(slots, start, end) {
                    return self.cancel();
                }
                self.state = SelectionState::Idle;
                SelectionOutcome::Confirmed(Self::build_range(date, slots, start, end))
            }

            (SelectionState::Selecting { .. }, SelectionEvent::Release(None)) => self.cancel(),
        }
    }

    fn build_range(date: NaiveDate, slots: &[ClassifiedSlot<'_>], start: usize, end: usize) -> SelectedRange {
        let labels = slots[start..=end].iter().map(|s| s.label).collect();
        SelectedRange {
            date,
            start_index: start,
            end_index: end,
            labels,
            start: slots[start].instant,
            end: slots[end].instant + Duration::minutes(SLOT_MINUTES as i64),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchIntent {
    Scroll,
    Select,
}

/// Separates page scrolling from range extension on touch screens.
///
/// Neither intent asks the host to suppress native scrolling; a scroll intent
/// only means the move is not fed to the selection machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct GestureTracker {
    origin: Option<(f32, f32)>,
}

impl GestureTracker {
    pub fn touch_start(&mut self, x: f32, y: f32) {
        self.origin = Some((x, y));
    }

    pub fn touch_end(&mut self) {
        self.origin = None;
    }

    pub fn classify(&self, x: f32, y: f32, selecting: bool) -> TouchIntent {
        if selecting {
            return TouchIntent::Select;
        }
        let Some((ox, oy)) = self.origin else { return TouchIntent::Select };
        let dx = (x - ox).abs();
        let dy = (y - oy).abs();
        if dy >= SCROLL_THRESHOLD_PX && dx < dy / 2.0 {
            TouchIntent::Scroll
        } else {
            TouchIntent::Select
        }
    }
}
