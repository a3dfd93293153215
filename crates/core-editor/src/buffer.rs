//! Text buffer: logical lines, soft-wrap offsets, cursor and viewport.
//!
//! Positions are measured in characters (not bytes): `offset_in_line` is
//! the first character of the current visual row and is always an element
//! of `offsets[line]`; `column` counts characters within that row.
//!
//! Offsets invariants:
//! * `offsets[i][0] == 0`
//! * strictly increasing, last value `<= lines[i].chars().count()`
//! * recomputed whenever width, tab width, numbering, or content changes.

use crate::encoding::LineEnding;
use std::path::PathBuf;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

/// Geometry the wrap computation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapContext {
    /// Visible width minus any line-number gutter.
    pub row_width: usize,
    pub tab_width: usize,
    pub soft_wrap: bool,
}

impl Default for WrapContext {
    fn default() -> Self {
        Self {
            row_width: 80,
            tab_width: 4,
            soft_wrap: true,
        }
    }
}

/// Character indices where words begin, per UAX #29 segmentation.
fn word_starts(line: &str) -> Vec<usize> {
    line.unicode_word_indices()
        .map(|(byte, _)| line[..byte].chars().count())
        .collect()
}

/// Visual width a character contributes at `col`.
pub fn char_width(ch: char, col: usize, tab_width: usize) -> usize {
    if ch == '\t' {
        tab_width - col % tab_width
    } else {
        ch.width().unwrap_or(0)
    }
}

/// Wrap break positions for one line: ascending character indices starting
/// at 0. Breaks prefer the position after the last space in the row; a row
/// with no space breaks at the edge.
pub fn compute_offsets(text: &str, ctx: &WrapContext) -> Vec<usize> {
    let mut offsets = vec![0];
    if !ctx.soft_wrap || ctx.row_width == 0 {
        return offsets;
    }
    let chars: Vec<char> = text.chars().collect();
    let mut row_start = 0usize;
    let mut col = 0usize;
    let mut last_break: Option<usize> = None;
    let mut i = 0usize;
    while i < chars.len() {
        let w = char_width(chars[i], col, ctx.tab_width);
        if col + w > ctx.row_width && i > row_start {
            let brk = match last_break {
                Some(b) if b > row_start => b,
                _ => i,
            };
            offsets.push(brk);
            row_start = brk;
            col = 0;
            last_break = None;
            i = brk;
            continue;
        }
        if chars[i] == ' ' {
            last_break = Some(i + 1);
        }
        col += w;
        i += 1;
    }
    offsets
}

#[derive(Debug, Clone)]
pub struct Buffer {
    pub file: Option<PathBuf>,
    pub charset: &'static encoding_rs::Encoding,
    pub format: LineEnding,
    pub lines: Vec<String>,
    offsets: Vec<Vec<usize>>,
    pub line: usize,
    pub offset_in_line: usize,
    pub column: usize,
    pub wanted_column: Option<usize>,
    pub first_line: usize,
    pub first_offset: usize,
    pub first_column: usize,
    pub dirty: bool,
}

impl Buffer {
    pub fn empty(ctx: &WrapContext) -> Self {
        Self::from_lines(None, vec![String::new()], ctx)
    }

    pub fn from_lines(file: Option<PathBuf>, lines: Vec<String>, ctx: &WrapContext) -> Self {
        let lines = if lines.is_empty() {
            vec![String::new()]
        } else {
            lines
        };
        let offsets = lines.iter().map(|l| compute_offsets(l, ctx)).collect();
        Self {
            file,
            charset: encoding_rs::UTF_8,
            format: LineEnding::Unix,
            lines,
            offsets,
            line: 0,
            offset_in_line: 0,
            column: 0,
            wanted_column: None,
            first_line: 0,
            first_offset: 0,
            first_column: 0,
            dirty: false,
        }
    }

    pub fn name(&self) -> String {
        self.file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "New Buffer".to_string())
    }

    // -----------------------------------------------------------------
    // Offsets bookkeeping
    // -----------------------------------------------------------------

    pub fn offsets(&self, line: usize) -> &[usize] {
        &self.offsets[line]
    }

    /// Recompute every line's wrap offsets (width/tab/numbering change).
    pub fn relayout(&mut self, ctx: &WrapContext) {
        self.offsets = self
            .lines
            .iter()
            .map(|l| compute_offsets(l, ctx))
            .collect();
        self.snap_to_offsets();
        self.first_offset = 0;
        self.first_line = self.first_line.min(self.lines.len() - 1);
    }

    fn relayout_line(&mut self, idx: usize, ctx: &WrapContext) {
        self.offsets[idx] = compute_offsets(&self.lines[idx], ctx);
    }

    /// Re-derive `(offset_in_line, column)` from the absolute position so
    /// the cursor stays on an offsets element.
    fn snap_to_offsets(&mut self) {
        let pos = self.cursor_char();
        let (off, col) = self.locate(self.line, pos);
        self.offset_in_line = off;
        self.column = col;
    }

    /// Map an absolute character index within `line` onto (row start,
    /// column).
    pub fn locate(&self, line: usize, pos: usize) -> (usize, usize) {
        let offs = &self.offsets[line];
        let row = match offs.binary_search(&pos) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (offs[row], pos - offs[row])
    }

    /// Absolute character index of the cursor within the current line.
    pub fn cursor_char(&self) -> usize {
        self.offset_in_line + self.column
    }

    pub fn line_chars(&self, idx: usize) -> usize {
        self.lines[idx].chars().count()
    }

    fn set_cursor_char(&mut self, pos: usize) {
        let pos = pos.min(self.line_chars(self.line));
        let (off, col) = self.locate(self.line, pos);
        self.offset_in_line = off;
        self.column = col;
    }

    // -----------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------

    /// Insert text at the cursor. `\r\n` and `\r` normalize to `\n`; the
    /// first fragment splices into the current line, later fragments
    /// become new lines; the cursor lands at the insertion end.
    pub fn insert(&mut self, text: &str, ctx: &WrapContext) {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let pos = self.cursor_char();
        let current = &self.lines[self.line];
        let head: String = current.chars().take(pos).collect();
        let tail: String = current.chars().skip(pos).collect();
        let mut fragments = normalized.split('\n');
        let first = fragments.next().unwrap_or_default();
        let mut rest: Vec<&str> = fragments.collect();
        if rest.is_empty() {
            self.lines[self.line] = format!("{head}{first}{tail}");
            self.relayout_line(self.line, ctx);
            self.set_cursor_char(pos + first.chars().count());
        } else {
            let last = rest.pop().unwrap();
            self.lines[self.line] = format!("{head}{first}");
            let mut insert_at = self.line + 1;
            for frag in rest {
                self.lines.insert(insert_at, frag.to_string());
                self.offsets.insert(insert_at, vec![0]);
                insert_at += 1;
            }
            let end_col = last.chars().count();
            self.lines.insert(insert_at, format!("{last}{tail}"));
            self.offsets.insert(insert_at, vec![0]);
            for idx in self.line..=insert_at {
                self.relayout_line(idx, ctx);
            }
            self.line = insert_at;
            self.set_cursor_char(end_col);
        }
        self.wanted_column = None;
        self.dirty = true;
    }

    /// Delete `n` characters before the cursor; at a line start the
    /// previous line is joined.
    pub fn backspace(&mut self, n: usize, ctx: &WrapContext) {
        for _ in 0..n {
            let pos = self.cursor_char();
            if pos > 0 {
                let line = &self.lines[self.line];
                let mut chars: Vec<char> = line.chars().collect();
                chars.remove(pos - 1);
                self.lines[self.line] = chars.into_iter().collect();
                self.relayout_line(self.line, ctx);
                self.set_cursor_char(pos - 1);
            } else if self.line > 0 {
                let removed = self.lines.remove(self.line);
                self.offsets.remove(self.line);
                self.line -= 1;
                let join_at = self.line_chars(self.line);
                self.lines[self.line].push_str(&removed);
                self.relayout_line(self.line, ctx);
                self.set_cursor_char(join_at);
            } else {
                break;
            }
            self.dirty = true;
        }
        self.wanted_column = None;
    }

    /// Delete `n` characters at the cursor; at a line end the next line is
    /// joined.
    pub fn delete(&mut self, n: usize, ctx: &WrapContext) {
        for _ in 0..n {
            let pos = self.cursor_char();
            let len = self.line_chars(self.line);
            if pos < len {
                let mut chars: Vec<char> = self.lines[self.line].chars().collect();
                chars.remove(pos);
                self.lines[self.line] = chars.into_iter().collect();
                self.relayout_line(self.line, ctx);
                self.set_cursor_char(pos);
            } else if self.line + 1 < self.lines.len() {
                let next = self.lines.remove(self.line + 1);
                self.offsets.remove(self.line + 1);
                self.lines[self.line].push_str(&next);
                self.relayout_line(self.line, ctx);
                self.set_cursor_char(pos);
            } else {
                break;
            }
            self.dirty = true;
        }
        self.wanted_column = None;
    }

    /// Remove and return the whole current line (cut).
    pub fn cut_line(&mut self, ctx: &WrapContext) -> String {
        let cut = if self.lines.len() == 1 {
            std::mem::take(&mut self.lines[0])
        } else {
            let s = self.lines.remove(self.line);
            self.offsets.remove(self.line);
            if self.line >= self.lines.len() {
                self.line = self.lines.len() - 1;
            }
            s
        };
        self.relayout_line(self.line, ctx);
        self.offset_in_line = 0;
        self.column = 0;
        self.wanted_column = None;
        self.dirty = true;
        cut
    }

    // -----------------------------------------------------------------
    // Motion
    // -----------------------------------------------------------------

    pub fn move_left(&mut self, ctx: &WrapContext) {
        let pos = self.cursor_char();
        if pos > 0 {
            self.set_cursor_char(pos - 1);
        } else if self.line > 0 {
            self.line -= 1;
            self.set_cursor_char(self.line_chars(self.line));
        }
        let _ = ctx;
        self.wanted_column = None;
    }

    pub fn move_right(&mut self, ctx: &WrapContext) {
        let pos = self.cursor_char();
        if pos < self.line_chars(self.line) {
            self.set_cursor_char(pos + 1);
        } else if self.line + 1 < self.lines.len() {
            self.line += 1;
            self.set_cursor_char(0);
        }
        let _ = ctx;
        self.wanted_column = None;
    }

    /// Current visual row index within the line's offsets.
    fn row_index(&self) -> usize {
        self.offsets[self.line]
            .iter()
            .position(|&o| o == self.offset_in_line)
            .unwrap_or(0)
    }

    fn row_len(&self, line: usize, row: usize) -> usize {
        let offs = &self.offsets[line];
        let start = offs[row];
        let end = offs
            .get(row + 1)
            .copied()
            .unwrap_or_else(|| self.line_chars(line));
        end - start
    }

    /// Vertical motion steps by visual rows while soft wrap is active and
    /// no horizontal scroll is in effect, otherwise by logical lines.
    pub fn move_up(&mut self, ctx: &WrapContext) -> bool {
        let wanted = *self.wanted_column.get_or_insert(self.column);
        if ctx.soft_wrap && self.first_column == 0 {
            let row = self.row_index();
            if row > 0 {
                self.offset_in_line = self.offsets[self.line][row - 1];
                self.column = wanted.min(self.row_len(self.line, row - 1));
                return true;
            }
            if self.line == 0 {
                return false;
            }
            self.line -= 1;
            let last = self.offsets[self.line].len() - 1;
            self.offset_in_line = self.offsets[self.line][last];
            self.column = wanted.min(self.row_len(self.line, last));
            true
        } else {
            if self.line == 0 {
                return false;
            }
            self.line -= 1;
            self.offset_in_line = 0;
            self.column = wanted.min(self.line_chars(self.line));
            self.snap_to_offsets();
            true
        }
    }

    pub fn move_down(&mut self, ctx: &WrapContext) -> bool {
        let wanted = *self.wanted_column.get_or_insert(self.column);
        if ctx.soft_wrap && self.first_column == 0 {
            let row = self.row_index();
            if row + 1 < self.offsets[self.line].len() {
                self.offset_in_line = self.offsets[self.line][row + 1];
                self.column = wanted.min(self.row_len(self.line, row + 1));
                return true;
            }
            if self.line + 1 >= self.lines.len() {
                return false;
            }
            self.line += 1;
            self.offset_in_line = 0;
            self.column = wanted.min(self.row_len(self.line, 0));
            true
        } else {
            if self.line + 1 >= self.lines.len() {
                return false;
            }
            self.line += 1;
            self.offset_in_line = 0;
            self.column = wanted.min(self.line_chars(self.line));
            self.snap_to_offsets();
            true
        }
    }

    pub fn beginning_of_line(&mut self) {
        self.offset_in_line = 0;
        self.column = 0;
        self.wanted_column = None;
    }

    pub fn end_of_line(&mut self) {
        self.set_cursor_char(self.line_chars(self.line));
        self.wanted_column = None;
    }

    pub fn first_line(&mut self) {
        self.line = 0;
        self.beginning_of_line();
    }

    pub fn last_line(&mut self) {
        self.line = self.lines.len() - 1;
        self.set_cursor_char(self.line_chars(self.line));
        self.wanted_column = None;
    }

    /// Word boundaries follow UAX #29 segmentation.
    pub fn next_word(&mut self) {
        let pos = self.cursor_char();
        let target = word_starts(&self.lines[self.line])
            .into_iter()
            .find(|&c| c > pos)
            .map(|c| (self.line, c))
            .or_else(|| {
                (self.line + 1..self.lines.len()).find_map(|l| {
                    word_starts(&self.lines[l]).first().map(|&c| (l, c))
                })
            });
        if let Some((line, pos)) = target {
            self.line = line;
            self.set_cursor_char(pos);
        }
        self.wanted_column = None;
    }

    pub fn prev_word(&mut self) {
        let pos = self.cursor_char();
        let target = word_starts(&self.lines[self.line])
            .into_iter()
            .rev()
            .find(|&c| c < pos)
            .map(|c| (self.line, c))
            .or_else(|| {
                (0..self.line).rev().find_map(|l| {
                    word_starts(&self.lines[l]).last().map(|&c| (l, c))
                })
            });
        let (line, pos) = target.unwrap_or((0, 0));
        self.line = line;
        self.set_cursor_char(pos);
        self.wanted_column = None;
    }

    /// Move the cursor to an absolute `(line, char)` position, clamping.
    pub fn goto(&mut self, line: usize, pos: usize) {
        self.line = line.min(self.lines.len() - 1);
        self.set_cursor_char(pos);
        self.wanted_column = None;
    }

    /// Total visual rows of a line under current offsets.
    pub fn visual_rows(&self, line: usize) -> usize {
        self.offsets[line].len()
    }

    /// Text of one visual row.
    pub fn row_text(&self, line: usize, row: usize) -> String {
        let offs = &self.offsets[line];
        let start = offs[row];
        let end = offs
            .get(row + 1)
            .copied()
            .unwrap_or_else(|| self.line_chars(line));
        self.lines[line]
            .chars()
            .skip(start)
            .take(end - start)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(width: usize) -> WrapContext {
        WrapContext {
            row_width: width,
            tab_width: 4,
            soft_wrap: true,
        }
    }

    fn buffer(text: &str, width: usize) -> Buffer {
        let lines: Vec<String> = text.split('\n').map(|s| s.to_string()).collect();
        Buffer::from_lines(None, lines, &ctx(width))
    }

    #[test]
    fn offsets_start_at_zero_and_increase() {
        let c = ctx(10);
        for text in ["", "short", "a line that certainly wraps around", "nospacesatallinthisverylongline"] {
            let offs = compute_offsets(text, &c);
            assert_eq!(offs[0], 0);
            assert!(offs.windows(2).all(|w| w[0] < w[1]), "{offs:?}");
            assert!(*offs.last().unwrap() <= text.chars().count());
        }
    }

    #[test]
    fn wrap_breaks_after_last_space() {
        let offs = compute_offsets("hello world again", &ctx(10));
        assert_eq!(offs, vec![0, 6, 12]);
    }

    #[test]
    fn wrap_hard_breaks_without_spaces() {
        let offs = compute_offsets("abcdefghijklmno", &ctx(5));
        assert_eq!(offs, vec![0, 5, 10]);
    }

    #[test]
    fn wrap_accounts_for_tabs() {
        // Tab at col 0 advances to 4; "ab\tcd" is a,b,tab(2),c,d = 6 cols.
        let offs = compute_offsets("ab\tcdef", &ctx(6));
        assert_eq!(offs, vec![0, 5]);
    }

    #[test]
    fn no_wrap_when_disabled() {
        let mut c = ctx(5);
        c.soft_wrap = false;
        assert_eq!(compute_offsets("a very long line here", &c), vec![0]);
    }

    #[test]
    fn insert_single_fragment() {
        let mut b = buffer("hello", 80);
        b.goto(0, 5);
        b.insert(" world", &ctx(80));
        assert_eq!(b.lines, vec!["hello world"]);
        assert_eq!(b.cursor_char(), 11);
        assert!(b.dirty);
    }

    #[test]
    fn insert_with_newlines_splits() {
        let mut b = buffer("headtail", 80);
        b.goto(0, 4);
        b.insert("A\nB\nC", &ctx(80));
        assert_eq!(b.lines, vec!["headA", "B", "Ctail"]);
        assert_eq!(b.line, 2);
        assert_eq!(b.cursor_char(), 1);
    }

    #[test]
    fn insert_normalizes_line_endings() {
        let mut b = buffer("", 80);
        b.insert("a\r\nb\rc", &ctx(80));
        assert_eq!(b.lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn insert_backspace_identity() {
        let c = ctx(80);
        let mut b = buffer("base", 80);
        b.goto(0, 2);
        let text = "one\ntwo three";
        b.insert(text, &c);
        b.backspace(text.chars().count(), &c);
        assert_eq!(b.lines, vec!["base"]);
        assert_eq!(b.cursor_char(), 2);
        assert_eq!(b.line, 0);
    }

    #[test]
    fn backspace_joins_lines() {
        let c = ctx(80);
        let mut b = buffer("ab\ncd", 80);
        b.goto(1, 0);
        b.backspace(1, &c);
        assert_eq!(b.lines, vec!["abcd"]);
        assert_eq!(b.cursor_char(), 2);
    }

    #[test]
    fn delete_joins_at_line_end() {
        let c = ctx(80);
        let mut b = buffer("ab\ncd", 80);
        b.goto(0, 2);
        b.delete(1, &c);
        assert_eq!(b.lines, vec!["abcd"]);
        b.delete(1, &c);
        assert_eq!(b.lines, vec!["abd"]);
    }

    #[test]
    fn vertical_motion_by_visual_rows() {
        let c = ctx(10);
        let mut b = buffer("hello world again\nnext", 10);
        // offsets: [0, 6, 12]
        assert_eq!(b.offsets(0), &[0, 6, 12]);
        b.goto(0, 2);
        b.move_down(&c);
        assert_eq!((b.line, b.offset_in_line, b.column), (0, 6, 2));
        b.move_down(&c);
        assert_eq!((b.line, b.offset_in_line, b.column), (0, 12, 2));
        b.move_down(&c);
        assert_eq!((b.line, b.offset_in_line, b.column), (1, 0, 2));
        assert!(!{
            b.goto(1, 0);
            b.move_down(&c)
        });
    }

    #[test]
    fn wanted_column_sticks_across_short_lines() {
        let c = ctx(20);
        let mut b = buffer("abcdefgh\nhi\nabcdefgh", 20);
        b.goto(0, 6);
        b.move_down(&c); // "hi" clamps to 2, wanted stays 6
        assert_eq!((b.line, b.column), (1, 2));
        b.move_down(&c); // wanted column restored
        assert_eq!((b.line, b.column), (2, 6));
        b.move_left(&c); // horizontal motion resets the stickiness
        assert_eq!(b.wanted_column, None);
    }

    #[test]
    fn word_motion_skips_separators() {
        let mut b = buffer("one  two3 four", 80);
        b.goto(0, 0);
        b.next_word();
        assert_eq!(b.cursor_char(), 5); // "two3"
        b.next_word();
        assert_eq!(b.cursor_char(), 10); // "four"
        b.prev_word();
        assert_eq!(b.cursor_char(), 5);
        b.prev_word();
        assert_eq!(b.cursor_char(), 0);
    }

    #[test]
    fn word_motion_counts_multibyte_in_chars() {
        let mut b = buffer("héllo wörld", 80);
        b.goto(0, 0);
        b.next_word();
        assert_eq!(b.cursor_char(), 6); // "wörld" starts after 6 chars
        b.prev_word();
        assert_eq!(b.cursor_char(), 0);
    }

    #[test]
    fn word_motion_from_inside_a_word() {
        let mut b = buffer("alpha beta", 80);
        b.goto(0, 8); // inside "beta"
        b.prev_word();
        assert_eq!(b.cursor_char(), 6);
        b.goto(0, 2); // inside "alpha"
        b.next_word();
        assert_eq!(b.cursor_char(), 6);
    }

    #[test]
    fn word_motion_crosses_lines() {
        let mut b = buffer("end\nstart", 80);
        b.goto(0, 0);
        b.next_word();
        assert_eq!((b.line, b.cursor_char()), (1, 0));
        b.prev_word();
        assert_eq!((b.line, b.cursor_char()), (0, 0));
    }

    #[test]
    fn relayout_preserves_cursor_position() {
        let mut b = buffer("hello world again", 10);
        b.goto(0, 13);
        assert_eq!(b.offset_in_line, 12);
        b.relayout(&ctx(40));
        assert_eq!(b.offset_in_line, 0);
        assert_eq!(b.cursor_char(), 13);
    }

    #[test]
    fn cut_line_removes_and_returns() {
        let c = ctx(80);
        let mut b = buffer("one\ntwo\nthree", 80);
        b.goto(1, 2);
        let cut = b.cut_line(&c);
        assert_eq!(cut, "two");
        assert_eq!(b.lines, vec!["one", "three"]);
        assert_eq!(b.cursor_char(), 0);
    }

    #[test]
    fn cut_last_line_leaves_empty_buffer_line() {
        let c = ctx(80);
        let mut b = buffer("only", 80);
        let cut = b.cut_line(&c);
        assert_eq!(cut, "only");
        assert_eq!(b.lines, vec![""]);
    }
}
