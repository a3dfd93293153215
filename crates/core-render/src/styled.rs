//! Runs of equally-attributed text and their emission formats.

use crate::attr::AttrWord;

/// A maximal run of consecutive characters sharing one attribute word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyledRun {
    pub attr: AttrWord,
    pub text: String,
}

/// One screen row as a sequence of runs.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct StyledLine {
    pub runs: Vec<StyledRun>,
}

impl StyledLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a character, merging into the trailing run when the attribute
    /// matches.
    pub fn push(&mut self, attr: AttrWord, ch: char) {
        match self.runs.last_mut() {
            Some(run) if run.attr == attr => run.text.push(ch),
            _ => self.runs.push(StyledRun {
                attr,
                text: ch.to_string(),
            }),
        }
    }

    /// Append a string fragment under one attribute.
    pub fn push_str(&mut self, attr: AttrWord, s: &str) {
        if s.is_empty() {
            return;
        }
        match self.runs.last_mut() {
            Some(run) if run.attr == attr => run.text.push_str(s),
            _ => self.runs.push(StyledRun {
                attr,
                text: s.to_string(),
            }),
        }
    }

    /// The row text with attributes stripped.
    pub fn plain(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    /// Emit as HTML, escaping `<`, `>` and `&`.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            let mut style = String::new();
            if let Some(fg) = run.attr.fg() {
                let (r, g, b) = AttrWord::expand(fg);
                style.push_str(&format!("color:#{r:02x}{g:02x}{b:02x};"));
            }
            if let Some(bg) = run.attr.bg() {
                let (r, g, b) = AttrWord::expand(bg);
                style.push_str(&format!("background:#{r:02x}{g:02x}{b:02x};"));
            }
            if run.attr.bold() {
                style.push_str("font-weight:bold;");
            }
            if run.attr.underline() {
                style.push_str("text-decoration:underline;");
            }
            if run.attr.negative() {
                style.push_str("filter:invert(100%);");
            }
            if style.is_empty() {
                escape_into(&run.text, &mut out);
            } else {
                out.push_str(&format!("<span style=\"{style}\">"));
                escape_into(&run.text, &mut out);
                out.push_str("</span>");
            }
        }
        out
    }

    /// Emit as an ANSI byte string terminated by a reset.
    pub fn to_ansi(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            let mut params: Vec<String> = vec!["0".into()];
            if run.attr.bold() {
                params.push("1".into());
            }
            if run.attr.underline() {
                params.push("4".into());
            }
            if run.attr.negative() {
                params.push("7".into());
            }
            if run.attr.concealed() {
                params.push("8".into());
            }
            if let Some(fg) = run.attr.fg() {
                let (r, g, b) = AttrWord::expand(fg);
                params.push(format!("38;2;{r};{g};{b}"));
            }
            if let Some(bg) = run.attr.bg() {
                let (r, g, b) = AttrWord::expand(bg);
                params.push(format!("48;2;{r};{g};{b}"));
            }
            out.push_str(&format!("\x1b[{}m", params.join(";")));
            out.push_str(&run.text);
        }
        out.push_str("\x1b[0m");
        out
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_merges_equal_attrs() {
        let mut line = StyledLine::new();
        let a = AttrWord::default();
        line.push(a, 'h');
        line.push(a, 'i');
        line.push(a.with_bold(true), '!');
        assert_eq!(line.runs.len(), 2);
        assert_eq!(line.runs[0].text, "hi");
        assert_eq!(line.plain(), "hi!");
    }

    #[test]
    fn html_escapes_markup() {
        let mut line = StyledLine::new();
        line.push_str(AttrWord::default(), "a<b>&c");
        assert_eq!(line.to_html(), "a&lt;b&gt;&amp;c");
    }

    #[test]
    fn html_styles_colored_run() {
        let mut line = StyledLine::new();
        line.push_str(AttrWord::default().with_fg(0xf00), "x");
        let html = line.to_html();
        assert!(html.contains("color:#ff0000"), "{html}");
    }

    #[test]
    fn ansi_round_starts_with_reset() {
        let mut line = StyledLine::new();
        line.push_str(AttrWord::default().with_bold(true), "x");
        let ansi = line.to_ansi();
        assert!(ansi.starts_with("\x1b[0;1m"));
        assert!(ansi.ends_with("\x1b[0m"));
    }
}
