//! The bindable command vocabulary and default key maps.

use core_keymap::KeyMap;
use core_terminal::MOUSE_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Editing
    Insert,
    Enter,
    Backspace,
    Delete,
    Cut,
    Uncut,
    // Motion
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    PrevWord,
    NextWord,
    BeginningOfLine,
    EndOfLine,
    FirstLine,
    LastLine,
    PrevPage,
    NextPage,
    ScrollUp,
    ScrollDown,
    MatchBracket,
    // Dialogs and buffers
    Search,
    SearchNext,
    WriteOut,
    ReadFile,
    PrevBuffer,
    NextBuffer,
    CursorPos,
    Help,
    Quit,
    Refresh,
    Mouse,
    // Prompt-only
    Accept,
    Cancel,
    ToggleCase,
    ToggleBackwards,
    ToggleRegex,
    ToggleAppend,
    TogglePrepend,
    ToggleFormatDos,
    ToggleFormatMac,
    ToggleBackup,
    ToggleNewBuffer,
    // Yes/No/Cancel
    Yes,
    No,
}

fn bind_motion(map: &mut KeyMap<Op>) {
    map.bind("\u{10}", Op::MoveUp); // ^P
    map.bind("\u{0e}", Op::MoveDown); // ^N
    map.bind("\u{06}", Op::MoveRight); // ^F
    map.bind("\u{02}", Op::MoveLeft); // ^B
    map.bind("\u{1b}[A", Op::MoveUp);
    map.bind("\u{1b}[B", Op::MoveDown);
    map.bind("\u{1b}[C", Op::MoveRight);
    map.bind("\u{1b}[D", Op::MoveLeft);
    map.bind("\u{1b}OA", Op::MoveUp);
    map.bind("\u{1b}OB", Op::MoveDown);
    map.bind("\u{1b}OC", Op::MoveRight);
    map.bind("\u{1b}OD", Op::MoveLeft);
    map.bind("\u{01}", Op::BeginningOfLine); // ^A
    map.bind("\u{05}", Op::EndOfLine); // ^E
    map.bind("\u{1b}[H", Op::BeginningOfLine);
    map.bind("\u{1b}[F", Op::EndOfLine);
    map.bind("\u{1b}OH", Op::BeginningOfLine);
    map.bind("\u{1b}OF", Op::EndOfLine);
    map.bind("\u{19}", Op::PrevPage); // ^Y
    map.bind("\u{16}", Op::NextPage); // ^V
    map.bind("\u{1b}[5~", Op::PrevPage);
    map.bind("\u{1b}[6~", Op::NextPage);
}

/// Key bindings for the main editing mode (and, with most of them
/// disabled at dispatch, the help viewer).
pub fn main_keymap() -> KeyMap<Op> {
    let mut map = KeyMap::new();
    bind_motion(&mut map);
    map.bind("\u{00}", Op::NextWord); // ^Space
    map.bind("\u{1b} ", Op::PrevWord);
    map.bind("\u{1b}<", Op::FirstLine);
    map.bind("\u{1b}>", Op::LastLine);
    map.bind("\u{1b}-", Op::ScrollUp);
    map.bind("\u{1b}+", Op::ScrollDown);
    map.bind("\u{1b}=", Op::ScrollDown);
    map.bind("\u{1b}]", Op::MatchBracket);
    map.bind("\u{17}", Op::Search); // ^W
    map.bind("\u{1b}w", Op::SearchNext);
    map.bind("\u{0f}", Op::WriteOut); // ^O
    map.bind("\u{12}", Op::ReadFile); // ^R
    map.bind("\u{0b}", Op::Cut); // ^K
    map.bind("\u{15}", Op::Uncut); // ^U
    map.bind("\u{03}", Op::CursorPos); // ^C
    map.bind("\u{07}", Op::Help); // ^G
    map.bind("\u{18}", Op::Quit); // ^X
    map.bind("\u{0c}", Op::Refresh); // ^L
    map.bind("\u{1b},", Op::PrevBuffer);
    map.bind("\u{1b}.", Op::NextBuffer);
    map.bind("\u{04}", Op::Delete); // ^D
    map.bind("\u{08}", Op::Backspace); // ^H
    map.bind("\u{7f}", Op::Backspace);
    map.bind("\u{1b}[3~", Op::Delete);
    map.bind("\r", Op::Enter);
    map.bind("\n", Op::Enter);
    map.bind("\t", Op::Insert);
    map.bind(MOUSE_PREFIX, Op::Mouse);
    map.bind_unicode(Op::Insert);
    map
}

/// Bindings shared by the line-editing prompts; dialog-specific toggles
/// are layered on by the callers below.
fn prompt_base() -> KeyMap<Op> {
    let mut map = KeyMap::new();
    map.bind("\r", Op::Accept);
    map.bind("\n", Op::Accept);
    map.bind("\u{03}", Op::Cancel); // ^C
    map.bind("\u{07}", Op::Cancel); // ^G
    map.bind("\u{08}", Op::Backspace);
    map.bind("\u{7f}", Op::Backspace);
    map.bind("\u{1b}[3~", Op::Delete);
    map.bind("\u{1b}[C", Op::MoveRight);
    map.bind("\u{1b}[D", Op::MoveLeft);
    map.bind("\u{01}", Op::BeginningOfLine);
    map.bind("\u{05}", Op::EndOfLine);
    map.bind_unicode(Op::Insert);
    map
}

pub fn search_keymap() -> KeyMap<Op> {
    let mut map = prompt_base();
    map.bind("\u{1b}c", Op::ToggleCase);
    map.bind("\u{1b}b", Op::ToggleBackwards);
    map.bind("\u{1b}r", Op::ToggleRegex);
    map
}

pub fn write_keymap() -> KeyMap<Op> {
    let mut map = prompt_base();
    map.bind("\u{1b}a", Op::ToggleAppend);
    map.bind("\u{1b}p", Op::TogglePrepend);
    map.bind("\u{1b}d", Op::ToggleFormatDos);
    map.bind("\u{1b}m", Op::ToggleFormatMac);
    map.bind("\u{1b}k", Op::ToggleBackup);
    map
}

pub fn read_keymap() -> KeyMap<Op> {
    let mut map = prompt_base();
    map.bind("\u{1b}f", Op::ToggleNewBuffer);
    map
}

pub fn ync_keymap() -> KeyMap<Op> {
    let mut map = KeyMap::new();
    for k in ["y", "Y"] {
        map.bind(k, Op::Yes);
    }
    for k in ["n", "N"] {
        map.bind(k, Op::No);
    }
    for k in ["c", "C", "\u{03}", "\u{07}"] {
        map.bind(k, Op::Cancel);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_keymap::Resolution;

    #[test]
    fn control_keys_resolve() {
        let map = main_keymap();
        let chars: Vec<char> = "\u{18}".chars().collect();
        assert!(matches!(
            map.resolve(&chars),
            Resolution::Matched { op: Op::Quit, .. }
        ));
    }

    #[test]
    fn printable_falls_through_to_insert() {
        let map = main_keymap();
        assert!(matches!(map.resolve(&['q']), Resolution::Fallback('q')));
        assert_eq!(map.fallthrough(), Some(&Op::Insert));
    }

    #[test]
    fn alt_shift_collapses_onto_lowercase_binding() {
        let map = search_keymap();
        let chars: Vec<char> = vec!['\u{1b}', 'C'];
        assert!(matches!(
            map.resolve(&chars),
            Resolution::Matched {
                op: Op::ToggleCase,
                ..
            }
        ));
    }

    #[test]
    fn ync_accepts_both_cases() {
        let map = ync_keymap();
        assert!(matches!(
            map.resolve(&['Y']),
            Resolution::Matched { op: Op::Yes, .. }
        ));
        assert!(matches!(
            map.resolve(&['n']),
            Resolution::Matched { op: Op::No, .. }
        ));
    }
}
