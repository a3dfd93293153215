//! Control-sequence parser.
//!
//! Four states: `Ground`, `Esc`, `Csi`, `Str`. Malformed sequences reset
//! the parser silently once the 32-byte accumulation cap trips; unknown
//! finals are ignored. Nothing here can fail outward.

use crate::charset::Charset;
use crate::screen::Screen;
use tracing::trace;

const ESC: u8 = 0x1b;
const ACCUM_CAP: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Ground,
    Esc,
    Csi,
    Str,
}

#[derive(Debug, Default)]
pub struct Parser {
    state: State,
    intermediates: Vec<u8>,
    params: Vec<u8>,
    prefix: Option<u8>,
    str_pending_esc: bool,
    // UTF-8 assembly
    utf8_acc: u32,
    utf8_need: u8,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.state = State::Ground;
        self.intermediates.clear();
        self.params.clear();
        self.prefix = None;
        self.str_pending_esc = false;
    }

    pub fn advance(&mut self, screen: &mut Screen, byte: u8) {
        match self.state {
            State::Ground => self.ground(screen, byte),
            State::Esc => self.esc(screen, byte),
            State::Csi => self.csi(screen, byte),
            State::Str => self.str_state(screen, byte),
        }
    }

    // -----------------------------------------------------------------
    // Ground: C0 dispatch, C1 folding, UTF-8 assembly, echo
    // -----------------------------------------------------------------

    fn ground(&mut self, screen: &mut Screen, byte: u8) {
        if self.utf8_need > 0 {
            if byte & 0xc0 == 0x80 {
                self.utf8_acc = (self.utf8_acc << 6) | (byte & 0x3f) as u32;
                self.utf8_need -= 1;
                if self.utf8_need == 0
                    && let Some(ch) = char::from_u32(self.utf8_acc)
                {
                    screen.echo(ch);
                }
                return;
            }
            // Broken sequence: drop it and reprocess this byte.
            self.utf8_need = 0;
        }
        match byte {
            0x00..=0x1f => self.c0(screen, byte),
            0x20..=0x7e => screen.echo(byte as char),
            0x7f => {}
            0x80..=0x9f => {
                // C1: fold onto the 7-bit ESC+letter equivalent.
                self.state = State::Esc;
                self.esc(screen, byte - 0x40);
            }
            0xc2..=0xdf => {
                self.utf8_acc = (byte & 0x1f) as u32;
                self.utf8_need = 1;
            }
            0xe0..=0xef => {
                self.utf8_acc = (byte & 0x0f) as u32;
                self.utf8_need = 2;
            }
            0xf0..=0xf4 => {
                self.utf8_acc = (byte & 0x07) as u32;
                self.utf8_need = 3;
            }
            _ => {}
        }
    }

    fn c0(&mut self, screen: &mut Screen, byte: u8) {
        match byte {
            0x08 => screen.backspace(),
            0x09 => screen.tab(),
            0x0a | 0x0b | 0x0c => screen.linefeed(),
            0x0d => screen.carriage_return(),
            0x0e => screen.shift_out(),
            0x0f => screen.shift_in(),
            ESC => {
                self.reset();
                self.state = State::Esc;
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------
    // Esc: intermediates accumulate, a final in 0x30..=0x7E dispatches
    // -----------------------------------------------------------------

    fn esc(&mut self, screen: &mut Screen, byte: u8) {
        match byte {
            b'[' => {
                self.intermediates.clear();
                self.params.clear();
                self.prefix = None;
                self.state = State::Csi;
            }
            b'P' | b'X' | b']' | b'^' | b'_' => {
                self.state = State::Str;
                self.str_pending_esc = false;
            }
            0x20..=0x2f => {
                self.intermediates.push(byte);
                if self.intermediates.len() > ACCUM_CAP {
                    self.reset();
                }
            }
            0x30..=0x7e => {
                let intermediate = self.intermediates.first().copied();
                self.reset();
                self.dispatch_esc(screen, intermediate, byte);
            }
            0x00..=0x1f => {
                // C0 aborts the sequence and is handled in Ground.
                self.reset();
                self.c0(screen, byte);
            }
            _ => self.reset(),
        }
    }

    fn dispatch_esc(&mut self, screen: &mut Screen, intermediate: Option<u8>, final_byte: u8) {
        match (intermediate, final_byte) {
            (None, b'7') => screen.save_cursor(),
            (None, b'8') => screen.restore_cursor(),
            (None, b'c') => screen.hard_reset(),
            (None, b'D') => screen.index(),
            (None, b'E') => screen.next_line(),
            (None, b'H') => screen.set_tab_stop(),
            (None, b'M') => screen.reverse_index(),
            (None, b'N') | (None, b'O') => screen.single_shift(),
            (None, b'Z') => screen.device_attributes(0),
            (None, b'=') | (None, b'>') => {} // keypad modes: no grid effect
            (Some(b'#'), b'8') => screen.screen_alignment(),
            (Some(b'#'), _) => {} // DECDHL/DECDWL line attributes: unsupported
            (Some(b'('), d) => {
                if let Some(set) = Charset::from_designator(d) {
                    screen.designate_g0(set);
                }
            }
            (Some(b')'), d) => {
                if let Some(set) = Charset::from_designator(d) {
                    screen.designate_g1(set);
                }
            }
            _ => trace!(target = "parser", final_byte, "unknown_escape"),
        }
    }

    // -----------------------------------------------------------------
    // Csi
    // -----------------------------------------------------------------

    fn csi(&mut self, screen: &mut Screen, byte: u8) {
        match byte {
            b'<'..=b'?' if self.params.is_empty() && self.prefix.is_none() => {
                self.prefix = Some(byte);
            }
            0x30..=0x3f => {
                self.params.push(byte);
                if self.params.len() > ACCUM_CAP {
                    self.reset();
                }
            }
            0x20..=0x2f => {
                self.intermediates.push(byte);
                if self.intermediates.len() > ACCUM_CAP {
                    self.reset();
                }
            }
            0x40..=0x7e => {
                let private = self.prefix == Some(b'?');
                let params = parse_params(&self.params);
                let intermediate = self.intermediates.first().copied();
                self.reset();
                self.dispatch_csi(screen, private, intermediate, &params, byte);
            }
            ESC => {
                self.reset();
                self.state = State::Esc;
            }
            0x18 | 0x1a => self.reset(), // CAN / SUB abort
            0x00..=0x17 | 0x19 | 0x1b..=0x1f => {
                // Other C0 controls act immediately without aborting.
                self.c0(screen, byte);
            }
            _ => self.reset(),
        }
    }

    fn dispatch_csi(
        &mut self,
        screen: &mut Screen,
        private: bool,
        intermediate: Option<u8>,
        params: &[Option<u16>],
        final_byte: u8,
    ) {
        let p = |i: usize, default: u16| params.get(i).copied().flatten().unwrap_or(default);
        let n = |i: usize| p(i, 1).max(1) as usize;
        match (intermediate, final_byte) {
            (Some(b'!'), b'p') => screen.soft_reset(),
            (Some(_), _) => {}
            (None, b'@') => screen.insert_chars(n(0)),
            (None, b'A') => screen.cursor_up(n(0)),
            (None, b'B') => screen.cursor_down(n(0)),
            (None, b'C') => screen.cursor_forward(n(0)),
            (None, b'D') => screen.cursor_back(n(0)),
            (None, b'E') => screen.cursor_next_line(n(0)),
            (None, b'F') => screen.cursor_prev_line(n(0)),
            (None, b'G') => screen.cursor_column(n(0)),
            (None, b'H') | (None, b'f') => screen.cursor_position(n(0), n(1)),
            (None, b'I') => screen.tab_forward(n(0)),
            (None, b'J') => screen.erase_display(p(0, 0) as usize),
            (None, b'K') => screen.erase_line(p(0, 0) as usize),
            (None, b'L') => screen.insert_lines(n(0)),
            (None, b'M') => screen.delete_lines(n(0)),
            (None, b'P') => screen.delete_chars(n(0)),
            (None, b'S') => screen.scroll_up(n(0)),
            (None, b'T') => screen.scroll_down(n(0)),
            (None, b'U') | (None, b'V') => {} // NP/PP page controls: no pages
            (None, b'W') => screen.cursor_tab_control(p(0, 0) as usize),
            (None, b'X') => screen.erase_chars(n(0)),
            (None, b'Z') => screen.tab_backward(n(0)),
            (None, b'`') => screen.cursor_column(n(0)),
            (None, b'a') => screen.cursor_forward(n(0)),
            (None, b'b') => screen.repeat_last(n(0)),
            (None, b'c') => screen.device_attributes(p(0, 0)),
            (None, b'd') => screen.cursor_row(n(0)),
            (None, b'e') => screen.cursor_row_relative(n(0)),
            (None, b'g') => screen.clear_tab_stops(p(0, 0) as usize),
            (None, b'h') | (None, b'l') => {
                let on = final_byte == b'h';
                if params.is_empty() {
                    return;
                }
                for param in params {
                    if let Some(mode) = param {
                        screen.set_mode(private, *mode, on);
                    }
                }
            }
            (None, b'i') => {} // MC media copy: no printer
            (None, b'm') => {
                let flat: Vec<u16> = if params.is_empty() {
                    Vec::new()
                } else {
                    params.iter().map(|p| p.unwrap_or(0)).collect()
                };
                screen.select_graphic_rendition(&flat);
            }
            (None, b'n') => screen.device_status(p(0, 0)),
            (None, b'r') => screen.set_scroll_region(p(0, 0) as usize, p(1, 0) as usize),
            (None, b's') => screen.save_cursor_position(),
            (None, b'u') => screen.restore_cursor_position(),
            (None, b'x') => screen.request_terminal_parameters(p(0, 0)),
            _ => trace!(target = "parser", final_byte, "unknown_csi"),
        }
    }

    // -----------------------------------------------------------------
    // Str: swallow until ST; any C0 resets
    // -----------------------------------------------------------------

    fn str_state(&mut self, screen: &mut Screen, byte: u8) {
        if self.str_pending_esc {
            self.str_pending_esc = false;
            if byte == b'\\' {
                self.reset();
                return;
            }
            // Not ST: stay in the string, the ESC was data.
        }
        match byte {
            ESC => self.str_pending_esc = true,
            0x00..=0x1a | 0x1c..=0x1f => {
                self.reset();
                self.c0(screen, byte);
            }
            _ => {}
        }
    }
}

/// Semicolon-separated decimal integers; empty slots are `None` so call
/// sites can apply their own defaults.
fn parse_params(raw: &[u8]) -> Vec<Option<u16>> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';')
        .map(|part| {
            let digits: Vec<u8> = part
                .iter()
                .copied()
                .filter(|b| b.is_ascii_digit())
                .collect();
            if digits.is_empty() {
                None
            } else {
                std::str::from_utf8(&digits)
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok())
                    .map(|v| v.min(u16::MAX as u32) as u16)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(bytes: &[u8]) -> Screen {
        let mut screen = Screen::new(20, 6).unwrap();
        let mut parser = Parser::new();
        for &b in bytes {
            parser.advance(&mut screen, b);
        }
        screen
    }

    #[test]
    fn plain_text_echoes() {
        let s = run(b"hello");
        assert_eq!(&s.row_text(0)[..5], "hello");
        assert_eq!(s.cursor(), (5, 0));
    }

    #[test]
    fn utf8_assembles() {
        let s = run("héllo".as_bytes());
        assert_eq!(s.cell(1, 0).unwrap().ch(), 'é');
        assert_eq!(s.cursor(), (5, 0));
    }

    #[test]
    fn cup_moves_cursor() {
        let s = run(b"\x1b[3;4H");
        assert_eq!(s.cursor(), (3, 2));
    }

    #[test]
    fn missing_params_take_defaults() {
        let s = run(b"\x1b[;5H");
        assert_eq!(s.cursor(), (4, 0));
    }

    #[test]
    fn sgr_applies_color() {
        let s = run(b"\x1b[31mx");
        assert!(s.cell(0, 0).unwrap().attr().fg().is_some());
    }

    #[test]
    fn private_mode_set() {
        let s = run(b"\x1b[?6h");
        assert!(s.modes().contains(crate::screen::Modes::ORIGIN));
    }

    #[test]
    fn c1_csi_folds() {
        let s = run(&[0x9b, b'3', b'C']);
        assert_eq!(s.cursor(), (3, 0));
    }

    #[test]
    fn osc_string_swallowed() {
        let s = run(b"\x1b]0;title\x1b\\after");
        assert_eq!(&s.row_text(0)[..5], "after");
    }

    #[test]
    fn string_aborted_by_c0() {
        let s = run(b"\x1b]0;title\nx");
        assert_eq!(s.cursor(), (1, 1));
    }

    #[test]
    fn overlong_sequence_resets_silently() {
        let mut bytes = b"\x1b[".to_vec();
        bytes.extend(std::iter::repeat_n(b'1', 40));
        bytes.extend(b"Hok");
        let s = run(&bytes);
        // The malformed CSI is dropped; the trailing text still echoes.
        assert!(s.row_text(0).contains("ok"));
    }

    #[test]
    fn decsc_decrc_sequences() {
        let s = run(b"ab\x1b7cd\x1b8X");
        assert_eq!(s.cell(2, 0).unwrap().ch(), 'X');
    }

    #[test]
    fn soft_reset_sequence() {
        let s = run(b"\x1b[4h\x1b[!p");
        assert!(!s.modes().contains(crate::screen::Modes::INSERT));
    }

    #[test]
    fn charset_designation_sequences() {
        let s = run(b"\x1b(0qr\x1b(Bq");
        assert_eq!(s.cell(0, 0).unwrap().ch(), '─');
        assert_eq!(s.cell(2, 0).unwrap().ch(), 'q');
    }

    #[test]
    fn decaln_sequence() {
        let s = run(b"\x1b#8");
        assert_eq!(s.row_text(0), "E".repeat(20));
    }

    #[test]
    fn hard_reset_clears_image_and_modes() {
        let s = run(b"abc\x1b[4h\x1bc");
        assert_eq!(s.row_text(0).trim(), "");
        assert_eq!(s.cursor(), (0, 0));
        assert!(!s.modes().contains(crate::screen::Modes::INSERT));
    }

    #[test]
    fn multiple_modes_in_one_list() {
        let s = run(b"\x1b[4;20h");
        assert!(s.modes().contains(crate::screen::Modes::INSERT));
        assert!(s.modes().contains(crate::screen::Modes::NEWLINE));
    }
}
