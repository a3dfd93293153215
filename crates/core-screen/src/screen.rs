//! The in-memory screen: grid state and every dispatched operation.
//!
//! `Screen` is the single-threaded core. Locking and the dirty condvar live
//! in [`crate::ScreenTerminal`]; the parser feeds this type one operation at
//! a time.

use crate::cell::Cell;
use crate::charset::Charset;
use bitflags::bitflags;
use core_render::AttrWord;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::trace;
use unicode_width::UnicodeWidthChar;

pub const MIN_SIZE: usize = 2;
pub const MAX_SIZE: usize = 256;

const TAB_INTERVAL: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("screen size {width}x{height} outside {MIN_SIZE}..={MAX_SIZE}")]
pub struct SizeError {
    pub width: usize,
    pub height: usize,
}

bitflags! {
    /// Terminal mode word. Names follow the DEC private modes they mirror.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modes: u16 {
        /// IRM: insert instead of replace on echo.
        const INSERT         = 1 << 0;
        /// LNM: line feed implies carriage return; CR from the key filter
        /// gains a trailing LF.
        const NEWLINE        = 1 << 1;
        /// DECCKM: cursor keys send application sequences.
        const APP_CURSOR     = 1 << 2;
        /// DECCOLM state: 132-column mode.
        const WIDE_COLUMN    = 1 << 3;
        /// ?40: DECCOLM changes are honored at all.
        const COLUMN_SWITCH  = 1 << 4;
        /// DECSCNM: whole-screen inverse video at emission.
        const REVERSE        = 1 << 5;
        /// DECOM: cursor addressing relative to the scroll region.
        const ORIGIN         = 1 << 6;
        /// DECAWM: wrap at the right margin.
        const AUTOWRAP       = 1 << 7;
        /// DECTCEM: cursor is shown.
        const CURSOR_VISIBLE = 1 << 8;
        /// DECBKM: the backarrow key sends BS instead of DEL.
        const BACKARROW_BS   = 1 << 9;
        /// ?1049 is active.
        const ALT_SCREEN     = 1 << 10;
    }
}

/// Context captured by DECSC and the alt-screen switch.
#[derive(Debug, Clone, Copy, Default)]
struct SavedCursor {
    cx: usize,
    cy: usize,
    attr: AttrWord,
    g0: Charset,
    g1: Charset,
    use_g1: bool,
    autowrap: bool,
    origin: bool,
}

#[derive(Debug)]
pub struct Screen {
    width: usize,
    height: usize,
    grid: Vec<Vec<Cell>>,
    alt: Vec<Vec<Cell>>,
    history: Vec<Vec<Cell>>,
    cx: usize,
    cy: usize,
    eol: bool,
    attr: AttrWord,
    modes: Modes,
    scroll_top: usize,
    scroll_bottom: usize, // exclusive
    tabs: BTreeSet<usize>,
    g0: Charset,
    g1: Charset,
    use_g1: bool,
    single_shift: Option<Charset>,
    saved_primary: SavedCursor,
    saved_alternate: SavedCursor,
    sco_saved: (usize, usize),
    last_graphic: Option<char>,
    response: Vec<u8>,
    dirty: bool,
}

fn default_tabs(width: usize) -> BTreeSet<usize> {
    (0..width).step_by(TAB_INTERVAL).collect()
}

fn blank_rows(width: usize, height: usize) -> Vec<Vec<Cell>> {
    vec![vec![Cell::default(); width]; height]
}

impl Screen {
    pub fn new(width: usize, height: usize) -> Result<Self, SizeError> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&width) || !(MIN_SIZE..=MAX_SIZE).contains(&height) {
            return Err(SizeError { width, height });
        }
        Ok(Self {
            width,
            height,
            grid: blank_rows(width, height),
            alt: blank_rows(width, height),
            history: Vec::new(),
            cx: 0,
            cy: 0,
            eol: false,
            attr: AttrWord::default(),
            modes: Modes::AUTOWRAP | Modes::CURSOR_VISIBLE,
            scroll_top: 0,
            scroll_bottom: height,
            tabs: default_tabs(width),
            g0: Charset::Ascii,
            g1: Charset::Ascii,
            use_g1: false,
            single_shift: None,
            saved_primary: SavedCursor::default(),
            saved_alternate: SavedCursor::default(),
            sco_saved: (0, 0),
            last_graphic: None,
            response: Vec::new(),
            dirty: true,
        })
    }

    // ---------------------------------------------------------------------
    // Observers
    // ---------------------------------------------------------------------

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cx, self.cy)
    }

    pub fn at_eol(&self) -> bool {
        self.eol
    }

    pub fn modes(&self) -> Modes {
        self.modes
    }

    pub fn attr(&self) -> AttrWord {
        self.attr
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_row(&self, idx: usize) -> Option<&[Cell]> {
        self.history.get(idx).map(|r| r.as_slice())
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        self.grid.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Row text with attributes stripped; used heavily by tests.
    pub fn row_text(&self, y: usize) -> String {
        self.grid
            .get(y)
            .map(|row| row.iter().map(|c| c.ch()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub(crate) fn peek_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn force_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn take_response(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.response)
    }

    fn mark(&mut self) {
        self.dirty = true;
    }

    // ---------------------------------------------------------------------
    // Geometry
    // ---------------------------------------------------------------------

    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), SizeError> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&width) || !(MIN_SIZE..=MAX_SIZE).contains(&height) {
            return Err(SizeError { width, height });
        }
        let full_region = self.scroll_top == 0 && self.scroll_bottom == self.height;
        if width != self.width {
            for row in self
                .grid
                .iter_mut()
                .chain(self.alt.iter_mut())
                .chain(self.history.iter_mut())
            {
                row.resize(width, Cell::default());
            }
            self.tabs = default_tabs(width);
        }
        let alt_active = self.modes.contains(Modes::ALT_SCREEN);
        if height < self.height {
            let excess = self.height - height;
            // The bottom rows survive; the top of the primary image becomes
            // history. The alternate image just loses its top rows.
            if alt_active {
                self.grid.drain(..excess);
                let moved: Vec<Vec<Cell>> = self.alt.drain(..excess).collect();
                self.history.extend(moved);
            } else {
                let moved: Vec<Vec<Cell>> = self.grid.drain(..excess).collect();
                self.history.extend(moved);
                self.alt.drain(..excess);
            }
            self.cy = self.cy.saturating_sub(excess);
        } else if height > self.height {
            let grow = height - self.height;
            let pulled = grow.min(self.history.len());
            let start = self.history.len() - pulled;
            let rows: Vec<Vec<Cell>> = self.history.drain(start..).collect();
            if alt_active {
                self.alt.splice(..0, rows);
            } else {
                self.grid.splice(..0, rows);
                self.cy += pulled;
            }
            while self.grid.len() < height {
                self.grid.push(vec![Cell::default(); width]);
            }
            while self.alt.len() < height {
                self.alt.push(vec![Cell::default(); width]);
            }
        }
        self.width = width;
        self.height = height;
        // A full-screen region keeps tracking the height; an explicit
        // DECSTBM region survives a resize clamped, not reset.
        if full_region {
            self.scroll_top = 0;
            self.scroll_bottom = height;
        } else {
            self.scroll_bottom = self.scroll_bottom.min(height);
            self.scroll_top = self.scroll_top.min(self.scroll_bottom - 1);
        }
        self.cx = self.cx.min(width - 1);
        self.cy = self.cy.min(height - 1);
        self.eol = false;
        self.mark();
        trace!(target = "screen", width, height, "resize");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Cursor motion
    // ---------------------------------------------------------------------

    fn move_cursor(&mut self, cx: usize, cy: usize) {
        self.cx = cx.min(self.width - 1);
        self.cy = cy.min(self.height - 1);
        self.eol = false;
        self.mark();
    }

    /// Top limit for relative vertical motion: the scroll region binds the
    /// cursor only while it is inside.
    fn upper_limit(&self) -> usize {
        if self.cy >= self.scroll_top {
            self.scroll_top
        } else {
            0
        }
    }

    fn lower_limit(&self) -> usize {
        if self.cy < self.scroll_bottom {
            self.scroll_bottom - 1
        } else {
            self.height - 1
        }
    }

    pub fn cursor_up(&mut self, n: usize) {
        let n = n.max(1);
        let limit = self.upper_limit();
        self.move_cursor(self.cx, self.cy.saturating_sub(n).max(limit));
    }

    pub fn cursor_down(&mut self, n: usize) {
        let n = n.max(1);
        let limit = self.lower_limit();
        self.move_cursor(self.cx, (self.cy + n).min(limit));
    }

    pub fn cursor_forward(&mut self, n: usize) {
        let n = n.max(1);
        self.move_cursor((self.cx + n).min(self.width - 1), self.cy);
    }

    pub fn cursor_back(&mut self, n: usize) {
        let n = n.max(1);
        self.move_cursor(self.cx.saturating_sub(n), self.cy);
    }

    pub fn cursor_next_line(&mut self, n: usize) {
        self.cursor_down(n);
        self.cx = 0;
    }

    pub fn cursor_prev_line(&mut self, n: usize) {
        self.cursor_up(n);
        self.cx = 0;
    }

    pub fn cursor_column(&mut self, col: usize) {
        self.move_cursor(col.max(1) - 1, self.cy);
    }

    pub fn cursor_row(&mut self, row: usize) {
        self.move_cursor(self.cx, row.max(1) - 1);
    }

    pub fn cursor_row_relative(&mut self, n: usize) {
        self.move_cursor(self.cx, self.cy + n.max(1));
    }

    /// CUP/HVP. Coordinates are 1-based; under DECOM they are relative to
    /// the scroll region and clamped inside it.
    pub fn cursor_position(&mut self, row: usize, col: usize) {
        let row = row.max(1) - 1;
        let col = col.max(1) - 1;
        if self.modes.contains(Modes::ORIGIN) {
            let y = (self.scroll_top + row).min(self.scroll_bottom.saturating_sub(1));
            self.move_cursor(col, y);
        } else {
            self.move_cursor(col, row);
        }
    }

    pub fn save_cursor_position(&mut self) {
        self.sco_saved = (self.cx, self.cy);
    }

    pub fn restore_cursor_position(&mut self) {
        let (cx, cy) = self.sco_saved;
        self.move_cursor(cx, cy);
    }

    pub fn save_cursor(&mut self) {
        let ctx = SavedCursor {
            cx: self.cx,
            cy: self.cy,
            attr: self.attr,
            g0: self.g0,
            g1: self.g1,
            use_g1: self.use_g1,
            autowrap: self.modes.contains(Modes::AUTOWRAP),
            origin: self.modes.contains(Modes::ORIGIN),
        };
        *self.saved_mut() = ctx;
    }

    pub fn restore_cursor(&mut self) {
        let ctx = *self.saved_mut();
        self.attr = ctx.attr;
        self.g0 = ctx.g0;
        self.g1 = ctx.g1;
        self.use_g1 = ctx.use_g1;
        self.modes.set(Modes::AUTOWRAP, ctx.autowrap);
        self.modes.set(Modes::ORIGIN, ctx.origin);
        self.move_cursor(ctx.cx, ctx.cy);
    }

    fn saved_mut(&mut self) -> &mut SavedCursor {
        if self.modes.contains(Modes::ALT_SCREEN) {
            &mut self.saved_alternate
        } else {
            &mut self.saved_primary
        }
    }

    // ---------------------------------------------------------------------
    // C0 controls
    // ---------------------------------------------------------------------

    pub fn backspace(&mut self) {
        if self.eol {
            self.eol = false;
        } else if self.cx > 0 {
            self.cx -= 1;
        }
        self.mark();
    }

    pub fn carriage_return(&mut self) {
        self.cx = 0;
        self.eol = false;
        self.mark();
    }

    /// LF/VT/FF. Under LNM a line feed also returns the carriage.
    pub fn linefeed(&mut self) {
        if self.modes.contains(Modes::NEWLINE) {
            self.cx = 0;
        }
        self.index();
    }

    /// IND: move down, scrolling at the bottom margin.
    pub fn index(&mut self) {
        self.eol = false;
        if self.cy + 1 == self.scroll_bottom {
            self.scroll_up(1);
        } else if self.cy + 1 < self.height {
            self.cy += 1;
        }
        self.mark();
    }

    /// RI: move up, scrolling at the top margin.
    pub fn reverse_index(&mut self) {
        self.eol = false;
        if self.cy == self.scroll_top {
            self.scroll_down(1);
        } else if self.cy > 0 {
            self.cy -= 1;
        }
        self.mark();
    }

    pub fn next_line(&mut self) {
        self.carriage_return();
        self.index();
    }

    pub fn tab(&mut self) {
        let next = self
            .tabs
            .range(self.cx + 1..)
            .next()
            .copied()
            .unwrap_or(self.width - 1);
        self.move_cursor(next, self.cy);
    }

    pub fn tab_forward(&mut self, n: usize) {
        for _ in 0..n.max(1) {
            self.tab();
        }
    }

    pub fn tab_backward(&mut self, n: usize) {
        for _ in 0..n.max(1) {
            let prev = self.tabs.range(..self.cx).next_back().copied().unwrap_or(0);
            self.move_cursor(prev, self.cy);
        }
    }

    pub fn set_tab_stop(&mut self) {
        self.tabs.insert(self.cx);
    }

    /// CTC: 0 sets at the cursor, 2 clears at the cursor, 5 clears all.
    pub fn cursor_tab_control(&mut self, param: usize) {
        match param {
            0 => {
                self.tabs.insert(self.cx);
            }
            2 => {
                self.tabs.remove(&self.cx);
            }
            5 => self.tabs.clear(),
            _ => {}
        }
    }

    /// TBC: 0 clears at the cursor, 3 clears all.
    pub fn clear_tab_stops(&mut self, param: usize) {
        match param {
            0 => {
                self.tabs.remove(&self.cx);
            }
            3 => self.tabs.clear(),
            _ => {}
        }
    }

    // ---------------------------------------------------------------------
    // Scrolling
    // ---------------------------------------------------------------------

    fn region_scroll_up(&mut self, top: usize, bottom: usize, n: usize, keep_history: bool) {
        let n = n.max(1).min(bottom - top);
        let removed: Vec<Vec<Cell>> = self.grid.drain(top..top + n).collect();
        if keep_history {
            self.history.extend(removed);
        }
        let fill = self.attr;
        for _ in 0..n {
            self.grid
                .insert(bottom - n, vec![Cell::blank(fill); self.width]);
        }
        self.mark();
    }

    fn region_scroll_down(&mut self, top: usize, bottom: usize, n: usize) {
        let n = n.max(1).min(bottom - top);
        self.grid.drain(bottom - n..bottom);
        let fill = self.attr;
        for _ in 0..n {
            self.grid.insert(top, vec![Cell::blank(fill); self.width]);
        }
        self.mark();
    }

    /// SU, and the LF-at-bottom path. Rows scrolled off a full-screen
    /// region on the primary grid land in history.
    pub fn scroll_up(&mut self, n: usize) {
        let full = self.scroll_top == 0 && self.scroll_bottom == self.height;
        let keep = full && !self.modes.contains(Modes::ALT_SCREEN);
        self.region_scroll_up(self.scroll_top, self.scroll_bottom, n, keep);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.region_scroll_down(self.scroll_top, self.scroll_bottom, n);
    }

    /// IL: only effective inside the scroll region.
    pub fn insert_lines(&mut self, n: usize) {
        if self.cy >= self.scroll_top && self.cy < self.scroll_bottom {
            self.region_scroll_down(self.cy, self.scroll_bottom, n);
            self.cx = 0;
            self.eol = false;
        }
    }

    /// DL: only effective inside the scroll region.
    pub fn delete_lines(&mut self, n: usize) {
        if self.cy >= self.scroll_top && self.cy < self.scroll_bottom {
            self.region_scroll_up(self.cy, self.scroll_bottom, n, false);
            self.cx = 0;
            self.eol = false;
        }
    }

    /// DECSTBM. 1-based inclusive parameters; 0/missing mean the margins.
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let top = top.max(1) - 1;
        let bottom = if bottom == 0 {
            self.height
        } else {
            bottom.min(self.height)
        };
        if top < bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
            self.cursor_position(1, 1);
        }
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    // ---------------------------------------------------------------------
    // Line-local edits
    // ---------------------------------------------------------------------

    /// ICH: shift the remainder of the row right.
    pub fn insert_chars(&mut self, n: usize) {
        let n = n.max(1).min(self.width - self.cx);
        let fill = Cell::blank(self.attr);
        let row = &mut self.grid[self.cy];
        row.truncate(self.width - n);
        for _ in 0..n {
            row.insert(self.cx, fill);
        }
        self.mark();
    }

    /// DCH: pull the remainder of the row left.
    pub fn delete_chars(&mut self, n: usize) {
        let n = n.max(1).min(self.width - self.cx);
        let fill = Cell::blank(self.attr);
        let row = &mut self.grid[self.cy];
        row.drain(self.cx..self.cx + n);
        row.resize(self.width, fill);
        self.mark();
    }

    /// ECH: blank n cells forward without moving anything.
    pub fn erase_chars(&mut self, n: usize) {
        let n = n.max(1).min(self.width - self.cx);
        let fill = Cell::blank(self.attr);
        for cell in &mut self.grid[self.cy][self.cx..self.cx + n] {
            *cell = fill;
        }
        self.mark();
    }

    /// REP: repeat the last echoed graphic character.
    pub fn repeat_last(&mut self, n: usize) {
        if let Some(ch) = self.last_graphic {
            for _ in 0..n.max(1) {
                self.write_char_raw(ch);
            }
        }
    }

    /// EL: 0 cursor→end, 1 begin→cursor (inclusive), 2 whole row.
    pub fn erase_line(&mut self, mode: usize) {
        let fill = Cell::blank(self.attr);
        let range = match mode {
            0 => self.cx..self.width,
            1 => 0..(self.cx + 1).min(self.width),
            2 => 0..self.width,
            _ => return,
        };
        for cell in &mut self.grid[self.cy][range] {
            *cell = fill;
        }
        self.mark();
    }

    /// ED: 0 cursor→end of screen, 1 begin→cursor, 2 whole screen.
    pub fn erase_display(&mut self, mode: usize) {
        let fill = Cell::blank(self.attr);
        match mode {
            0 => {
                self.erase_line(0);
                for row in &mut self.grid[self.cy + 1..] {
                    row.fill(fill);
                }
            }
            1 => {
                for row in &mut self.grid[..self.cy] {
                    row.fill(fill);
                }
                self.erase_line(1);
            }
            2 => {
                for row in &mut self.grid {
                    row.fill(fill);
                }
            }
            _ => return,
        }
        self.mark();
    }

    /// DECALN: fill with `E` and reset margins.
    pub fn screen_alignment(&mut self) {
        let fill = Cell::new(AttrWord::default(), 'E');
        for row in &mut self.grid {
            row.fill(fill);
        }
        self.scroll_top = 0;
        self.scroll_bottom = self.height;
        self.move_cursor(0, 0);
    }

    // ---------------------------------------------------------------------
    // Echo
    // ---------------------------------------------------------------------

    /// Printable codepoint insertion after charset resolution.
    pub fn echo(&mut self, ch: char) {
        let ch = if let Some(shift) = self.single_shift.take() {
            shift.map(ch)
        } else {
            self.active_charset().map(ch)
        };
        self.write_char_raw(ch);
        self.last_graphic = Some(ch);
    }

    fn active_charset(&self) -> Charset {
        if self.use_g1 { self.g1 } else { self.g0 }
    }

    fn wrap(&mut self) {
        self.cx = 0;
        self.eol = false;
        if self.cy + 1 == self.scroll_bottom {
            self.scroll_up(1);
        } else if self.cy + 1 < self.height {
            self.cy += 1;
        }
    }

    fn write_char_raw(&mut self, ch: char) {
        let w = ch.width().unwrap_or(0);
        if w == 0 {
            // Combining marks and other zero-width input carry no cell.
            return;
        }
        if self.eol {
            if self.modes.contains(Modes::AUTOWRAP) {
                self.wrap();
            } else {
                self.eol = false;
                self.cx = self.width - 1;
            }
        }
        // A wide glyph that would straddle the right margin wraps first
        // (or collapses onto the final cell when autowrap is off).
        if w == 2 && self.cx + 1 >= self.width {
            if self.modes.contains(Modes::AUTOWRAP) {
                self.wrap();
            } else {
                self.cx = self.width - 1;
            }
        }
        if self.modes.contains(Modes::INSERT) {
            let fill = Cell::blank(self.attr);
            let row = &mut self.grid[self.cy];
            for _ in 0..w.min(self.width - self.cx) {
                row.insert(self.cx, fill);
            }
            row.truncate(self.width);
        }
        self.grid[self.cy][self.cx] = Cell::new(self.attr, ch);
        self.cx += w;
        if self.cx >= self.width {
            self.eol = true;
            self.cx = self.width - 1;
        }
        self.mark();
    }

    // ---------------------------------------------------------------------
    // Attributes, charsets, modes
    // ---------------------------------------------------------------------

    pub fn select_graphic_rendition(&mut self, params: &[u16]) {
        self.attr = self.attr.apply_sgr(params);
    }

    pub fn designate_g0(&mut self, set: Charset) {
        self.g0 = set;
    }

    pub fn designate_g1(&mut self, set: Charset) {
        self.g1 = set;
    }

    pub fn shift_out(&mut self) {
        self.use_g1 = true;
    }

    pub fn shift_in(&mut self) {
        self.use_g1 = false;
    }

    /// SS2/SS3: shift the next character through the inactive set.
    pub fn single_shift(&mut self) {
        self.single_shift = Some(if self.use_g1 { self.g0 } else { self.g1 });
    }

    pub fn set_mode(&mut self, private: bool, param: u16, on: bool) {
        match (private, param) {
            (false, 4) => self.modes.set(Modes::INSERT, on),
            (false, 20) => self.modes.set(Modes::NEWLINE, on),
            (true, 1) => self.modes.set(Modes::APP_CURSOR, on),
            (true, 3) => {
                if self.modes.contains(Modes::COLUMN_SWITCH) {
                    self.modes.set(Modes::WIDE_COLUMN, on);
                    let width = if on { 132 } else { 80 };
                    let height = self.height;
                    let _ = self.resize(width, height);
                    // Column switching is a hard reset of the image: the
                    // margins go back to full screen as well.
                    self.scroll_top = 0;
                    self.scroll_bottom = self.height;
                    self.erase_display(2);
                    self.move_cursor(0, 0);
                }
            }
            (true, 5) => {
                self.modes.set(Modes::REVERSE, on);
                self.mark();
            }
            (true, 6) => {
                self.modes.set(Modes::ORIGIN, on);
                self.cursor_position(1, 1);
            }
            (true, 7) => self.modes.set(Modes::AUTOWRAP, on),
            (true, 25) => {
                self.modes.set(Modes::CURSOR_VISIBLE, on);
                self.mark();
            }
            (true, 40) => self.modes.set(Modes::COLUMN_SWITCH, on),
            (true, 67) => self.modes.set(Modes::BACKARROW_BS, on),
            (true, 1049) => self.switch_screen(on),
            _ => trace!(target = "screen", private, param, on, "unhandled_mode"),
        }
    }

    /// ?1049: swap grids, saving the cursor context on entry and restoring
    /// it on exit. The alternate grid starts cleared.
    fn switch_screen(&mut self, on: bool) {
        if on == self.modes.contains(Modes::ALT_SCREEN) {
            return;
        }
        if on {
            self.save_cursor();
            std::mem::swap(&mut self.grid, &mut self.alt);
            self.modes.insert(Modes::ALT_SCREEN);
            let fill = Cell::default();
            for row in &mut self.grid {
                row.fill(fill);
            }
        } else {
            std::mem::swap(&mut self.grid, &mut self.alt);
            self.modes.remove(Modes::ALT_SCREEN);
            self.restore_cursor();
        }
        self.mark();
    }

    // ---------------------------------------------------------------------
    // Device queries
    // ---------------------------------------------------------------------

    fn reply(&mut self, bytes: &[u8]) {
        self.response.extend_from_slice(bytes);
    }

    /// DA: a VT100 with advanced video option.
    pub fn device_attributes(&mut self, param: u16) {
        if param == 0 {
            self.reply(b"\x1b[?1;2c");
        }
    }

    /// DSR 5 (status) and 6 (cursor position, origin-relative under DECOM).
    pub fn device_status(&mut self, param: u16) {
        match param {
            5 => self.reply(b"\x1b[0n"),
            6 => {
                let row = if self.modes.contains(Modes::ORIGIN) {
                    self.cy - self.scroll_top + 1
                } else {
                    self.cy + 1
                };
                let col = self.cx + 1;
                let s = format!("\x1b[{row};{col}R");
                self.reply(s.as_bytes());
            }
            _ => {}
        }
    }

    /// DECREQTPARM: fixed report, solicited bit echoed back.
    pub fn request_terminal_parameters(&mut self, param: u16) {
        if param <= 1 {
            let s = format!("\x1b[{};1;1;112;112;1;0x", param + 2);
            self.reply(s.as_bytes());
        }
    }

    // ---------------------------------------------------------------------
    // Resets
    // ---------------------------------------------------------------------

    /// DECSTR soft reset: modes and rendition, not the image.
    pub fn soft_reset(&mut self) {
        self.modes.remove(
            Modes::INSERT | Modes::ORIGIN | Modes::APP_CURSOR | Modes::REVERSE,
        );
        self.modes.insert(Modes::AUTOWRAP | Modes::CURSOR_VISIBLE);
        self.attr = AttrWord::default();
        self.g0 = Charset::Ascii;
        self.g1 = Charset::Ascii;
        self.use_g1 = false;
        self.single_shift = None;
        self.scroll_top = 0;
        self.scroll_bottom = self.height;
        *self.saved_mut() = SavedCursor::default();
        self.eol = false;
        self.mark();
    }

    /// RIS hard reset: everything except history.
    pub fn hard_reset(&mut self) {
        self.soft_reset();
        self.modes = Modes::AUTOWRAP | Modes::CURSOR_VISIBLE;
        for row in self.grid.iter_mut().chain(self.alt.iter_mut()) {
            row.fill(Cell::default());
        }
        self.tabs = default_tabs(self.width);
        self.move_cursor(0, 0);
        self.saved_primary = SavedCursor::default();
        self.saved_alternate = SavedCursor::default();
    }
}
