//! End-to-end emulator scenarios driven through the public byte interface.

use core_render::indexed_rgb444;
use core_screen::ScreenTerminal;

fn term(w: usize, h: usize) -> ScreenTerminal {
    ScreenTerminal::new(w, h).unwrap()
}

#[test]
fn sgr_text_lands_with_color() {
    let t = term(20, 4);
    t.write(b"\x1b[31mHELLO\x1b[0m");
    let snap = t.dump(0, true).unwrap();
    assert_eq!(&snap.rows[0].plain()[..5], "HELLO");
    let red = indexed_rgb444(1);
    // The cursor cell sits at column 5; the first run is the colored text.
    let first = &snap.rows[0].runs[0];
    assert_eq!(first.text, "HELLO");
    assert_eq!(first.attr.fg(), Some(red));
    assert!(!first.attr.bold() && !first.attr.underline());
    assert_eq!(snap.cursor, (5, 0));
}

#[test]
fn printable_writes_advance_cursor_by_width() {
    let t = term(40, 4);
    t.write(b"abc def");
    let snap = t.dump(0, true).unwrap();
    assert_eq!(&snap.rows[0].plain()[..7], "abc def");
    assert_eq!(snap.cursor, (7, 0));
}

#[test]
fn autowrap_spills_sixth_char() {
    let t = term(5, 4);
    t.write(b"ABCDEF");
    let snap = t.dump(0, true).unwrap();
    assert_eq!(snap.rows[0].plain(), "ABCDE");
    assert_eq!(&snap.rows[1].plain()[..1], "F");
    assert_eq!(snap.cursor, (1, 1));
    t.with_screen(|s| assert!(!s.at_eol()));
}

#[test]
fn autowrap_off_pins_cursor_to_margin() {
    let t = term(5, 4);
    t.write(b"\x1b[?7l");
    t.write(b"ABCDEFGH");
    let snap = t.dump(0, true).unwrap();
    assert_eq!(snap.rows[0].plain(), "ABCDH");
    assert_eq!(snap.cursor, (4, 0));
    t.with_screen(|s| assert!(s.at_eol()));
}

#[test]
fn save_restore_context_round_trip() {
    let t = term(20, 6);
    t.write(b"\x1b[1;4m\x1b[3;5H\x1b7");
    t.write(b"\x1b[0m\x1b[1;1Hnoise\x1b[?7l");
    t.write(b"\x1b8");
    t.with_screen(|s| {
        assert_eq!(s.cursor(), (4, 2));
        assert!(s.attr().bold() && s.attr().underline());
        assert!(s.modes().contains(core_screen::Modes::AUTOWRAP));
    });
}

#[test]
fn scroll_region_never_touches_outside_rows() {
    let t = term(10, 6);
    for y in 0..6 {
        t.write(format!("\x1b[{};1Hline{y}", y + 1).as_bytes());
    }
    t.write(b"\x1b[2;5r");
    // Push the region hard: ten scrolls.
    t.write(b"\x1b[5;1H");
    for _ in 0..10 {
        t.write(b"\x1bD");
    }
    let snap = t.dump(0, true).unwrap();
    assert_eq!(&snap.rows[0].plain()[..5], "line0");
    assert_eq!(&snap.rows[5].plain()[..5], "line5");
    for y in 1..5 {
        assert_eq!(snap.rows[y].plain().trim(), "");
    }
}

#[test]
fn alt_screen_restores_primary_byte_for_byte() {
    let t = term(12, 4);
    t.write(b"primary rows");
    let before = t.dump(0, true).unwrap();
    t.write(b"\x1b[?1049h");
    t.write(b"\x1b[2Jalt content");
    t.write(b"\x1b[?1049l");
    let after = t.dump(0, true).unwrap();
    assert_eq!(before.rows, after.rows);
    assert_eq!(before.cursor, after.cursor);
}

#[test]
fn resize_shrink_pushes_top_rows_to_history() {
    let t = term(80, 24);
    for y in 0..24 {
        t.write(format!("\x1b[{};1HA", y + 1).as_bytes());
    }
    t.resize(80, 10).unwrap();
    t.with_screen(|s| assert_eq!(s.history_len(), 14));
    // Row 0 is now the 15th original row; it still carries its 'A'.
    let snap = t.dump(0, true).unwrap();
    assert_eq!(&snap.rows[0].plain()[..1], "A");
    assert_eq!(snap.rows.len(), 10);
}

#[test]
fn cursor_key_filter_follows_decckm() {
    let t = term(10, 4);
    for (alias, x) in [("~A", b'A'), ("~B", b'B'), ("~C", b'C'), ("~D", b'D'), ("~F", b'F'), ("~H", b'H')] {
        assert_eq!(t.pipe(alias), vec![0x1b, b'[', x]);
    }
    t.write(b"\x1b[?1h");
    for (alias, x) in [("~A", b'A'), ("~B", b'B'), ("~C", b'C'), ("~D", b'D'), ("~F", b'F'), ("~H", b'H')] {
        assert_eq!(t.pipe(alias), vec![0x1b, b'O', x]);
    }
}

#[test]
fn pipe_honors_backarrow_and_newline_modes() {
    let t = term(10, 4);
    assert_eq!(t.pipe("\u{7f}"), vec![0x7f]);
    t.write(b"\x1b[?67h");
    assert_eq!(t.pipe("\u{7f}"), vec![0x08]);
    assert_eq!(t.pipe("\r"), b"\r");
    t.write(b"\x1b[20h");
    assert_eq!(t.pipe("\r"), b"\r\n");
}

#[test]
fn device_attribute_query_answers_vt100_avo() {
    let t = term(10, 4);
    t.write(b"\x1b[c");
    assert_eq!(t.read(), b"\x1b[?1;2c");
}

#[test]
fn cursor_position_report_respects_origin_mode() {
    let t = term(20, 10);
    t.write(b"\x1b[3;8r\x1b[?6h\x1b[2;4H\x1b[6n");
    assert_eq!(t.read(), b"\x1b[2;4R");
    t.with_screen(|s| assert_eq!(s.cursor(), (3, 3)));
}

#[test]
fn insert_mode_shifts_instead_of_overwriting() {
    let t = term(10, 2);
    t.write(b"world\x1b[1;1H\x1b[4h\x1b[31mhello \x1b[0m");
    let snap = t.dump(0, true).unwrap();
    assert_eq!(&snap.rows[0].plain()[..10], "hello worl");
}

#[test]
fn history_accumulates_from_full_screen_scroll() {
    let t = term(8, 3);
    t.write(b"a\r\nb\r\nc\r\nd\r\ne");
    t.with_screen(|s| {
        assert_eq!(s.history_len(), 2);
        let first: String = s.history_row(0).unwrap().iter().map(|c| c.ch()).collect();
        assert_eq!(first.trim_end(), "a");
    });
}

#[test]
fn wide_characters_occupy_two_columns() {
    let t = term(10, 2);
    t.write("漢字".as_bytes());
    let snap = t.dump(0, true).unwrap();
    assert_eq!(snap.cursor, (4, 0));
    // No continuation cell is stored: the second column of each wide
    // glyph stays blank in the grid.
    let plain = snap.rows[0].plain();
    assert!(plain.starts_with("漢 字 "), "{plain:?}");
}
