//! Snapshot rendering: the grid as rows of styled runs.

use crate::screen::{Modes, Screen};
use core_render::{AttrWord, StyledLine};

/// A rendered grid image plus cursor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub rows: Vec<StyledLine>,
    /// `(x, y)` cell coordinates.
    pub cursor: (usize, usize),
    pub cursor_visible: bool,
}

impl Snapshot {
    /// HTML rendition, one line per row, markup-escaped by the run emitter.
    pub fn to_html(&self) -> String {
        self.rows
            .iter()
            .map(StyledLine::to_html)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Resolve the negative style bit into a concrete fg/bg swap where explicit
/// colors exist; cells on default colors keep the bit so emitters invert
/// them.
fn resolve(attr: AttrWord) -> AttrWord {
    if attr.negative() && (attr.fg().is_some() || attr.bg().is_some()) {
        attr.swapped().with_negative(false)
    } else {
        attr
    }
}

/// Inverse video for one cell: concrete swap when colors are explicit,
/// otherwise toggle the negative bit. Applying it twice is the identity.
fn invert(attr: AttrWord) -> AttrWord {
    if attr.fg().is_some() || attr.bg().is_some() {
        attr.swapped()
    } else {
        attr.with_negative(!attr.negative())
    }
}

impl Screen {
    pub fn snapshot(&self) -> Snapshot {
        let reverse = self.modes().contains(Modes::REVERSE);
        let cursor_visible = self.modes().contains(Modes::CURSOR_VISIBLE);
        let (cx, cy) = self.cursor();
        let mut rows = Vec::with_capacity(self.height());
        for y in 0..self.height() {
            let mut line = StyledLine::new();
            for x in 0..self.width() {
                let cell = self.cell(x, y).unwrap_or_default();
                let mut attr = resolve(cell.attr());
                if reverse {
                    attr = invert(attr);
                }
                if cursor_visible && (x, y) == (cx, cy) {
                    // Highlight by inversion; DECSCNM composes on top.
                    attr = invert(attr);
                }
                line.push(attr, cell.ch());
            }
            rows.push(line);
        }
        Snapshot {
            rows,
            cursor: (cx, cy),
            cursor_visible,
        }
    }
}
