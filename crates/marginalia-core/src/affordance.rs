//! Placement of the floating "add note" / "view note" affordances.

use serde::{Deserialize, Serialize};

/// Viewport-relative rectangle, as reported by `getBoundingClientRect`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Document-relative position for an absolutely positioned popup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub top: f64,
    pub left: f64,
}

/// Centre a popup of `popup` size horizontally over `anchor`, `gap` px above
/// it, converted to document coordinates using the current `scroll` offset.
pub fn place_above(anchor: Rect, popup: (f64, f64), scroll: (f64, f64), gap: f64) -> Position {
    let (popup_width, popup_height) = popup;
    let (scroll_x, scroll_y) = scroll;
    Position {
        top: anchor.y - (popup_height + gap) + scroll_y,
        left: anchor.center_x() - popup_width / 2.0 + scroll_x,
    }
}
