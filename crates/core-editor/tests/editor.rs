//! Editor scenarios driven through a scripted terminal.

use core_editor::{Editor, EditorConfig};
use core_terminal::{MouseEvent, MouseKind, ScriptTerminal};
use std::fs;
use tempfile::tempdir;

fn editor() -> Editor {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    Editor::new(EditorConfig::default())
}

fn run_script(ed: &mut Editor, script: &str) -> ScriptTerminal {
    let mut term = ScriptTerminal::new(80, 24);
    term.type_str(script);
    ed.run(&mut term).unwrap();
    term
}

#[test]
fn typed_text_lands_in_buffer_and_frame() {
    let mut ed = editor();
    let term = run_script(&mut ed, "hello\rworld");
    assert_eq!(ed.buffer().lines, vec!["hello", "world"]);
    assert_eq!(ed.buffer().line, 1);
    assert_eq!(ed.buffer().cursor_char(), 5);
    // Body starts after the two header rows.
    assert!(term.row_text(2).unwrap().starts_with("hello"));
    assert!(term.row_text(3).unwrap().starts_with("world"));
}

#[test]
fn header_shows_modified_flag() {
    let mut ed = editor();
    let term = run_script(&mut ed, "x");
    let header = term.row_text(0).unwrap();
    assert!(header.contains("Modified"), "{header}");
    assert!(header.contains("New Buffer"));
}

#[test]
fn write_unix_buffer_as_dos_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let mut ed = editor();
    // Type a, Enter, b, Enter; then ^O, toggle DOS, enter the file name.
    let script = format!("a\rb\r\u{0f}\u{1b}d{}\r", path.display());
    run_script(&mut ed, &script);
    assert_eq!(
        fs::read(&path).unwrap(),
        [0x61, 0x0d, 0x0a, 0x62, 0x0d, 0x0a]
    );
    assert!(!ed.buffer().dirty);
    assert_eq!(ed.message(), Some("Wrote 3 lines"));
}

#[test]
fn regex_search_wraps_with_message() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("in.txt");
    fs::write(&path, "foo\nbar\nfoo").unwrap();
    let mut ed = editor();
    ed.open(path).unwrap();
    // ^W, toggle regex, search "fo+": cursor skips the match under the
    // cursor and lands on line 2.
    run_script(&mut ed, "\u{17}\u{1b}rfo+\r");
    assert_eq!((ed.buffer().line, ed.buffer().cursor_char()), (2, 0));
    // Search again: wraps back to the top and says so.
    run_script(&mut ed, "\u{1b}w");
    assert_eq!((ed.buffer().line, ed.buffer().cursor_char()), (0, 0));
    assert_eq!(ed.message(), Some("Search Wrapped"));
}

#[test]
fn search_not_found_reports_term() {
    let mut ed = editor();
    run_script(&mut ed, "abc\u{17}zzz\r");
    assert_eq!(ed.message(), Some("\"zzz\" not found"));
}

#[test]
fn quit_with_save_round_trips_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("saved.txt");
    let mut ed = editor();
    // Type text, ^X, answer Yes, accept the typed file name.
    let script = format!("data\u{18}y{}\r", path.display());
    run_script(&mut ed, &script);
    assert_eq!(fs::read_to_string(&path).unwrap(), "data");
}

#[test]
fn quit_discarding_changes_exits_without_file() {
    let mut ed = editor();
    run_script(&mut ed, "data\u{18}n");
    // Buffer list is empty; a fresh run exits immediately.
    let mut term = ScriptTerminal::new(80, 24);
    term.type_str("should never be inserted");
    ed.run(&mut term).unwrap();
    assert!(term.frame.is_empty());
}

#[test]
fn quit_cancel_keeps_editing() {
    let mut ed = editor();
    run_script(&mut ed, "data\u{18}cmore");
    assert_eq!(ed.buffer().lines, vec!["datamore"]);
}

#[test]
fn overwrite_prompt_guards_existing_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("exists.txt");
    fs::write(&path, "precious").unwrap();
    let mut ed = editor();
    // Decline the overwrite: the file keeps its content.
    let script = format!("new\u{0f}{}\rn\u{03}", path.display());
    run_script(&mut ed, &script);
    assert_eq!(fs::read_to_string(&path).unwrap(), "precious");
    // Accept it: the file is replaced.
    let script = format!("\u{0f}{}\ry", path.display());
    run_script(&mut ed, &script);
    assert_eq!(fs::read_to_string(&path).unwrap(), "new");
}

#[test]
fn read_file_inserts_at_cursor() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("insert.txt");
    fs::write(&path, "X\nY").unwrap();
    let mut ed = editor();
    let script = format!("ab\u{01}\u{12}{}\r", path.display());
    run_script(&mut ed, &script);
    assert_eq!(ed.buffer().lines, vec!["X", "Yab"]);
    assert_eq!(ed.message(), Some("Read 2 lines"));
}

#[test]
fn read_rejects_directory_with_message() {
    let dir = tempdir().unwrap();
    let mut ed = editor();
    let script = format!("\u{12}{}\r", dir.path().display());
    run_script(&mut ed, &script);
    assert!(ed.message().unwrap().contains("is a directory"));
}

#[test]
fn read_into_new_buffer_and_cycle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("second.txt");
    fs::write(&path, "second").unwrap();
    let mut ed = editor();
    // ^R with the new-buffer toggle, then M-. to cycle forward and back.
    let script = format!("first\u{12}\u{1b}f{}\r", path.display());
    run_script(&mut ed, &script);
    assert_eq!(ed.buffer().lines, vec!["second"]);
    run_script(&mut ed, "\u{1b}.");
    assert_eq!(ed.buffer().lines, vec!["first"]);
    run_script(&mut ed, "\u{1b},");
    assert_eq!(ed.buffer().lines, vec!["second"]);
}

#[test]
fn bracket_matching_jumps_both_ways() {
    let mut ed = editor();
    run_script(&mut ed, "a(b{c}d)e\u{01}\u{06}");
    assert_eq!(ed.buffer().cursor_char(), 1); // on '('
    run_script(&mut ed, "\u{1b}]");
    assert_eq!(ed.buffer().cursor_char(), 7); // on ')'
    run_script(&mut ed, "\u{1b}]");
    assert_eq!(ed.buffer().cursor_char(), 1); // back on '('
}

#[test]
fn cut_uncut_round_trips_lines() {
    let mut ed = editor();
    // Three lines; cut two consecutive lines from the top, then paste at
    // the end.
    run_script(&mut ed, "one\rtwo\rthree\u{1b}<\u{0b}\u{0b}");
    assert_eq!(ed.buffer().lines, vec!["three"]);
    run_script(&mut ed, "\u{1b}>\u{15}");
    assert_eq!(ed.buffer().lines, vec!["threeone", "two", ""]);
}

#[test]
fn cursor_position_report() {
    let mut ed = editor();
    run_script(&mut ed, "hello\rworld\u{03}");
    let msg = ed.message().unwrap();
    assert!(msg.starts_with("line 2/2"), "{msg}");
}

#[test]
fn help_mode_shows_text_and_closes() {
    let mut ed = editor();
    let term = run_script(&mut ed, "\u{07}");
    assert!(term.row_text(2).unwrap().starts_with("Main help"));
    // ^X closes help; typing then inserts normally.
    run_script(&mut ed, "\u{18}ok");
    assert_eq!(ed.buffer().lines, vec!["ok"]);
}

#[test]
fn mouse_click_moves_cursor() {
    let mut ed = editor();
    let mut term = ScriptTerminal::new(80, 24);
    term.type_str("hello\rworld");
    term.queue_mouse(MouseEvent {
        x: 3,
        y: 2, // first body row
        kind: MouseKind::Press,
    });
    ed.run(&mut term).unwrap();
    assert_eq!((ed.buffer().line, ed.buffer().cursor_char()), (0, 3));
}

#[test]
fn wheel_scrolls_one_visual_row() {
    let mut ed = editor();
    let mut term = ScriptTerminal::new(80, 10);
    let text: String = (0..30).map(|i| format!("line{i}\r")).collect();
    term.type_str(&text);
    term.queue_mouse(MouseEvent {
        x: 0,
        y: 3,
        kind: MouseKind::WheelUp,
    });
    ed.run(&mut term).unwrap();
    let anchor = ed.buffer().first_line;
    let mut term2 = ScriptTerminal::new(80, 10);
    term2.queue_mouse(MouseEvent {
        x: 0,
        y: 3,
        kind: MouseKind::WheelDown,
    });
    ed.run(&mut term2).unwrap();
    assert_eq!(ed.buffer().first_line, anchor + 1);
}

#[test]
fn resize_recomputes_wrap_offsets() {
    let mut ed = editor();
    let long = "word ".repeat(30); // 150 chars
    let mut term = ScriptTerminal::new(80, 24);
    term.type_str(&long);
    ed.run(&mut term).unwrap();
    assert_eq!(ed.buffer().offsets(0).len(), 2);
    let mut term = ScriptTerminal::new(40, 24);
    term.resize = Some((40, 24));
    term.type_str(" "); // one key so the loop observes the resize
    ed.run(&mut term).unwrap();
    assert!(ed.buffer().offsets(0).len() >= 4);
}

#[test]
fn open_missing_file_starts_new_named_buffer() {
    let dir = tempdir().unwrap();
    let mut ed = editor();
    ed.open(dir.path().join("fresh.txt")).unwrap();
    assert_eq!(ed.message(), Some("New File"));
    assert_eq!(ed.buffer().lines, vec![""]);
    assert!(ed.buffer().file.is_some());
}

#[test]
fn open_preserves_dos_format_on_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dos.txt");
    fs::write(&path, b"one\r\ntwo\r\n").unwrap();
    let mut ed = editor();
    ed.open(path.clone()).unwrap();
    assert_eq!(ed.buffer().format, core_editor::LineEnding::Dos);
    // Append a line and save under the same name: format sticks.
    run_script(&mut ed, "\u{1b}>three\u{0f}\r");
    assert_eq!(fs::read_to_string(&path).unwrap(), "one\r\ntwo\r\nthree");
}
