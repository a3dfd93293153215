//! Screen partitioning: header, body, footer.
//!
//! The footer is one message/prompt row plus two shortcut rows. The header
//! takes two rows when the terminal is tall enough to spare them. The
//! line-number gutter consumes a fixed eight columns when enabled.

pub const GUTTER_WIDTH: usize = 8;
pub const FOOTER_ROWS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub columns: usize,
    pub rows: usize,
    pub header_rows: usize,
    pub body_rows: usize,
    pub footer_rows: usize,
    pub gutter: usize,
}

impl Layout {
    pub fn compute(columns: usize, rows: usize, linenumbers: bool) -> Self {
        let header_rows = if rows >= 8 { 2 } else { 1 };
        let footer_rows = FOOTER_ROWS.min(rows.saturating_sub(header_rows + 1));
        let body_rows = rows.saturating_sub(header_rows + footer_rows).max(1);
        let gutter = if linenumbers { GUTTER_WIDTH } else { 0 };
        Self {
            columns,
            rows,
            header_rows,
            body_rows,
            footer_rows,
            gutter,
        }
    }

    /// Width available to buffer text.
    pub fn row_width(&self) -> usize {
        self.columns.saturating_sub(self.gutter).max(1)
    }

    pub fn body_start(&self) -> usize {
        self.header_rows
    }

    /// Screen row of the message/prompt line.
    pub fn message_row(&self) -> usize {
        self.header_rows + self.body_rows
    }

    pub fn shortcut_rows(&self) -> (usize, usize) {
        (self.message_row() + 1, self.message_row() + 2)
    }
}
