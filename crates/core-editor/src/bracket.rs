//! Bracket matching with nesting.

/// Opener/closer pairs; index-aligned.
const OPENERS: &str = "(<[{";
const CLOSERS: &str = ")>]}";

/// If the character at `(line, column)` is a bracket, scan to its partner
/// (forward for openers, backward for closers) honoring nesting depth.
/// Returns the partner's position.
pub fn match_bracket(lines: &[String], line: usize, column: usize) -> Option<(usize, usize)> {
    let chars: Vec<char> = lines.get(line)?.chars().collect();
    let ch = *chars.get(column)?;
    if let Some(idx) = OPENERS.find(ch) {
        let closer = CLOSERS.chars().nth(idx).unwrap();
        scan_forward(lines, line, column, ch, closer)
    } else if let Some(idx) = CLOSERS.find(ch) {
        let opener = OPENERS.chars().nth(idx).unwrap();
        scan_backward(lines, line, column, opener, ch)
    } else {
        None
    }
}

fn scan_forward(
    lines: &[String],
    line: usize,
    column: usize,
    opener: char,
    closer: char,
) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    for l in line..lines.len() {
        let start = if l == line { column } else { 0 };
        for (c, ch) in lines[l].chars().enumerate().skip(start) {
            if ch == opener {
                depth += 1;
            } else if ch == closer {
                depth -= 1;
                if depth == 0 {
                    return Some((l, c));
                }
            }
        }
    }
    None
}

fn scan_backward(
    lines: &[String],
    line: usize,
    column: usize,
    opener: char,
    closer: char,
) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    for l in (0..=line).rev() {
        let chars: Vec<char> = lines[l].chars().collect();
        let start = if l == line {
            column
        } else {
            chars.len().saturating_sub(1)
        };
        if chars.is_empty() {
            continue;
        }
        for c in (0..=start.min(chars.len() - 1)).rev() {
            let ch = chars[c];
            if ch == closer {
                depth += 1;
            } else if ch == opener {
                depth -= 1;
                if depth == 0 {
                    return Some((l, c));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matches_nested_forward() {
        let ls = lines(&["a(b{c}d)e"]);
        assert_eq!(match_bracket(&ls, 0, 1), Some((0, 7)));
    }

    #[test]
    fn matches_nested_backward() {
        let ls = lines(&["a(b{c}d)e"]);
        assert_eq!(match_bracket(&ls, 0, 5), Some((0, 3)));
        assert_eq!(match_bracket(&ls, 0, 7), Some((0, 1)));
    }

    #[test]
    fn crosses_lines() {
        let ls = lines(&["fn main() {", "    body();", "}"]);
        assert_eq!(match_bracket(&ls, 0, 10), Some((2, 0)));
        assert_eq!(match_bracket(&ls, 2, 0), Some((0, 10)));
    }

    #[test]
    fn non_bracket_is_none() {
        let ls = lines(&["abc"]);
        assert_eq!(match_bracket(&ls, 0, 1), None);
    }

    #[test]
    fn unbalanced_is_none() {
        let ls = lines(&["(((", ""]);
        assert_eq!(match_bracket(&ls, 0, 0), None);
    }

    #[test]
    fn angle_brackets_pair() {
        let ls = lines(&["Vec<Box<T>>"]);
        assert_eq!(match_bracket(&ls, 0, 3), Some((0, 10)));
        assert_eq!(match_bracket(&ls, 0, 7), Some((0, 9)));
    }

    #[test]
    fn ignores_other_pair_kinds_for_depth() {
        let ls = lines(&["( [ ) ]"]);
        // The paren match skips the bracket entirely.
        assert_eq!(match_bracket(&ls, 0, 0), Some((0, 4)));
    }
}
