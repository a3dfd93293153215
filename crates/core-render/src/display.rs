//! Frame differ.
//!
//! Cold start policy mirrors the viewport differ lineage: an empty previous
//! frame, a `clear()`, or a `resize()` repaints every row. Warm frames only
//! forward rows whose run list differs from the last submission.

use crate::styled::StyledLine;
use tracing::trace;

/// Receives the rows the differ decides to repaint.
pub trait RowSink {
    fn put_row(&mut self, row: usize, line: &StyledLine);
    fn set_cursor(&mut self, row: usize, col: usize);
    fn clear(&mut self);
}

/// Diff-rendering front end over a [`RowSink`].
#[derive(Debug)]
pub struct Display {
    rows: usize,
    cols: usize,
    last: Vec<StyledLine>,
    last_cursor: (usize, usize),
    cold: bool,
}

impl Display {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            last: Vec::new(),
            last_cursor: (0, 0),
            cold: true,
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Forget the previous frame; the next update repaints everything.
    pub fn clear(&mut self) {
        self.last.clear();
        self.cold = true;
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        if rows != self.rows || cols != self.cols {
            self.rows = rows;
            self.cols = cols;
            self.clear();
        }
    }

    /// Submit a frame. Rows beyond `self.rows` are ignored; a short frame
    /// leaves the remaining rows untouched.
    pub fn update(&mut self, frame: &[StyledLine], cursor: (usize, usize), sink: &mut impl RowSink) {
        if self.cold {
            sink.clear();
        }
        let mut repainted = 0usize;
        for (row, line) in frame.iter().take(self.rows).enumerate() {
            let changed = self.cold || self.last.get(row) != Some(line);
            if changed {
                sink.put_row(row, line);
                repainted += 1;
            }
        }
        trace!(
            target = "render.diff",
            rows = frame.len().min(self.rows),
            repainted,
            cold = self.cold,
            "frame"
        );
        self.last = frame[..frame.len().min(self.rows)].to_vec();
        if self.cold || cursor != self.last_cursor || repainted > 0 {
            sink.set_cursor(cursor.0, cursor.1);
            self.last_cursor = cursor;
        }
        self.cold = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttrWord;

    #[derive(Default)]
    struct RecordingSink {
        rows: Vec<usize>,
        clears: usize,
        cursor: Option<(usize, usize)>,
    }

    impl RowSink for RecordingSink {
        fn put_row(&mut self, row: usize, _line: &StyledLine) {
            self.rows.push(row);
        }
        fn set_cursor(&mut self, row: usize, col: usize) {
            self.cursor = Some((row, col));
        }
        fn clear(&mut self) {
            self.clears += 1;
        }
    }

    fn frame(texts: &[&str]) -> Vec<StyledLine> {
        texts
            .iter()
            .map(|t| {
                let mut l = StyledLine::new();
                l.push_str(AttrWord::default(), t);
                l
            })
            .collect()
    }

    #[test]
    fn first_frame_paints_all() {
        let mut d = Display::new(3, 10);
        let mut sink = RecordingSink::default();
        d.update(&frame(&["a", "b", "c"]), (0, 0), &mut sink);
        assert_eq!(sink.rows, vec![0, 1, 2]);
        assert_eq!(sink.clears, 1);
    }

    #[test]
    fn identical_second_frame_paints_nothing() {
        let mut d = Display::new(3, 10);
        let mut sink = RecordingSink::default();
        let f = frame(&["a", "b", "c"]);
        d.update(&f, (0, 0), &mut sink);
        sink.rows.clear();
        d.update(&f, (0, 0), &mut sink);
        assert!(sink.rows.is_empty());
    }

    #[test]
    fn single_row_change_detected() {
        let mut d = Display::new(3, 10);
        let mut sink = RecordingSink::default();
        d.update(&frame(&["a", "b", "c"]), (0, 0), &mut sink);
        sink.rows.clear();
        d.update(&frame(&["a", "B", "c"]), (1, 1), &mut sink);
        assert_eq!(sink.rows, vec![1]);
        assert_eq!(sink.cursor, Some((1, 1)));
    }

    #[test]
    fn resize_forces_full_repaint() {
        let mut d = Display::new(3, 10);
        let mut sink = RecordingSink::default();
        let f = frame(&["a", "b", "c"]);
        d.update(&f, (0, 0), &mut sink);
        d.resize(3, 20);
        sink.rows.clear();
        d.update(&f, (0, 0), &mut sink);
        assert_eq!(sink.rows, vec![0, 1, 2]);
    }
}
