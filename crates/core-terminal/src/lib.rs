//! Host-facing terminal abstractions and the crossterm implementation.
//!
//! The editor and emulator consume abstract key/row streams; everything
//! that touches a real TTY lives behind the traits here. `CrosstermBackend`
//! is the one concrete implementation; tests substitute in-memory fakes.

use anyhow::Result;
use core_keymap::KeySource;
use core_render::{RowSink, StyledLine};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};
use std::collections::VecDeque;
use std::io::{Write, stdout};
use std::time::Duration;
use tracing::debug;

pub mod options;
pub use options::{ConfigPath, ConsoleOption, DirsConfigPath, EnvConsoleOption};

/// A pointer event queued behind the `ESC [ M` key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub x: u16,
    pub y: u16,
    pub kind: MouseKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseKind {
    Press,
    Release,
    WheelUp,
    WheelDown,
}

/// The sequence injected into the key stream when a mouse event is queued.
/// Callers bind it to their mouse operation and then drain `read_mouse`.
pub const MOUSE_PREFIX: &str = "\u{1b}[M";

/// Everything a full-screen program needs from its host terminal.
///
/// `KeySource` supplies the decoded character stream, `RowSink` receives
/// diffed row repaints. The extras cover geometry, resize delivery, and the
/// mouse queue.
pub trait Terminal: KeySource + RowSink {
    /// Current size as `(columns, rows)`.
    fn size(&self) -> (u16, u16);
    /// A resize since the last call, if any.
    fn take_resize(&mut self) -> Option<(u16, u16)>;
    /// The mouse event behind the most recent [`MOUSE_PREFIX`] injection.
    fn read_mouse(&mut self) -> Option<MouseEvent>;
    /// Push buffered output to the device.
    fn flush(&mut self) -> Result<()>;
}

/// Crossterm-backed [`Terminal`].
pub struct CrosstermBackend {
    entered: bool,
    mouse_capture: bool,
    pending: VecDeque<char>,
    mouse_events: VecDeque<MouseEvent>,
    resize: Option<(u16, u16)>,
}

/// RAII guard ensuring terminal state restoration even if the caller
/// early-returns or panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
    active: bool,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self {
            entered: false,
            mouse_capture: false,
            pending: VecDeque::new(),
            mouse_events: VecDeque::new(),
            resize: None,
        }
    }

    pub fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.entered = true;
        }
        Ok(())
    }

    pub fn leave(&mut self) -> Result<()> {
        if self.entered {
            if self.mouse_capture {
                let _ = execute!(stdout(), DisableMouseCapture);
                self.mouse_capture = false;
            }
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    /// Enter and return a guard that will leave on drop.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard {
            backend: self,
            active: true,
        })
    }

    pub fn track_mouse(&mut self, on: bool) -> Result<()> {
        if on != self.mouse_capture {
            if on {
                execute!(stdout(), EnableMouseCapture)?;
            } else {
                execute!(stdout(), DisableMouseCapture)?;
            }
            self.mouse_capture = on;
        }
        Ok(())
    }

    /// Translate one crossterm event into pending characters / queues.
    fn absorb(&mut self, ev: Event) {
        match ev {
            Event::Key(key) => {
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                let alt = key.modifiers.contains(KeyModifiers::ALT);
                match key.code {
                    KeyCode::Char(c) => {
                        if alt {
                            self.pending.push_back('\u{1b}');
                        }
                        if ctrl {
                            let upper = c.to_ascii_uppercase();
                            if upper.is_ascii_uppercase() || upper == '@' {
                                self.pending.push_back(((upper as u8) & 0x1f) as char);
                            }
                        } else {
                            self.pending.push_back(c);
                        }
                    }
                    KeyCode::Enter => self.pending.push_back('\r'),
                    KeyCode::Tab => self.pending.push_back('\t'),
                    KeyCode::Backspace => self.pending.push_back('\u{7f}'),
                    KeyCode::Esc => self.pending.push_back('\u{1b}'),
                    KeyCode::Up => self.push_seq("\u{1b}[A"),
                    KeyCode::Down => self.push_seq("\u{1b}[B"),
                    KeyCode::Right => self.push_seq("\u{1b}[C"),
                    KeyCode::Left => self.push_seq("\u{1b}[D"),
                    KeyCode::Home => self.push_seq("\u{1b}[H"),
                    KeyCode::End => self.push_seq("\u{1b}[F"),
                    KeyCode::PageUp => self.push_seq("\u{1b}[5~"),
                    KeyCode::PageDown => self.push_seq("\u{1b}[6~"),
                    KeyCode::Insert => self.push_seq("\u{1b}[2~"),
                    KeyCode::Delete => self.push_seq("\u{1b}[3~"),
                    KeyCode::F(n @ 1..=12) => {
                        // VT220 numbering with the usual gaps.
                        const CODES: [u8; 12] = [11, 12, 13, 14, 15, 17, 18, 19, 20, 21, 23, 24];
                        let code = CODES[(n - 1) as usize];
                        self.push_seq(&format!("\u{1b}[{code}~"));
                    }
                    _ => {}
                }
            }
            Event::Mouse(m) => {
                use crossterm::event::MouseEventKind;
                let kind = match m.kind {
                    MouseEventKind::Down(_) => MouseKind::Press,
                    MouseEventKind::Up(_) => MouseKind::Release,
                    MouseEventKind::ScrollUp => MouseKind::WheelUp,
                    MouseEventKind::ScrollDown => MouseKind::WheelDown,
                    _ => return,
                };
                self.mouse_events.push_back(MouseEvent {
                    x: m.column,
                    y: m.row,
                    kind,
                });
                self.push_seq(MOUSE_PREFIX);
            }
            Event::Resize(w, h) => {
                debug!(target = "terminal", w, h, "resize");
                self.resize = Some((w, h));
                // Inject a refresh keystroke so a blocked reader returns
                // and the caller observes the new geometry.
                self.pending.push_back('\u{0c}');
            }
            _ => {}
        }
    }

    fn push_seq(&mut self, seq: &str) {
        self.pending.extend(seq.chars());
    }

    fn pump(&mut self, timeout: Option<Duration>) -> bool {
        if !self.pending.is_empty() {
            return true;
        }
        let deadline = timeout.unwrap_or(Duration::MAX);
        while self.pending.is_empty() {
            match event::poll(deadline) {
                Ok(true) => {
                    if let Ok(ev) = event::read() {
                        self.absorb(ev);
                    }
                }
                _ => return false,
            }
            if timeout.is_some() {
                break;
            }
        }
        !self.pending.is_empty()
    }
}

impl KeySource for CrosstermBackend {
    fn read_char(&mut self) -> Option<char> {
        if self.pump(None) {
            self.pending.pop_front()
        } else {
            None
        }
    }

    fn peek_char(&mut self, timeout_ms: u64) -> Option<char> {
        if self.pump(Some(Duration::from_millis(timeout_ms))) {
            self.pending.pop_front()
        } else {
            None
        }
    }

    fn unread(&mut self, ch: char) {
        self.pending.push_front(ch);
    }
}

impl RowSink for CrosstermBackend {
    fn put_row(&mut self, row: usize, line: &StyledLine) {
        let _ = queue!(
            stdout(),
            MoveTo(0, row as u16),
            Clear(ClearType::CurrentLine),
            Print(line.to_ansi())
        );
    }

    fn set_cursor(&mut self, row: usize, col: usize) {
        let _ = queue!(stdout(), MoveTo(col as u16, row as u16));
    }

    fn clear(&mut self) {
        let _ = queue!(stdout(), Clear(ClearType::All));
    }
}

impl Terminal for CrosstermBackend {
    fn size(&self) -> (u16, u16) {
        crossterm::terminal::size().unwrap_or((80, 24))
    }

    fn take_resize(&mut self) -> Option<(u16, u16)> {
        self.resize.take()
    }

    fn read_mouse(&mut self) -> Option<MouseEvent> {
        self.mouse_events.pop_front()
    }

    fn flush(&mut self) -> Result<()> {
        stdout().flush()?;
        Ok(())
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl<'a> TerminalGuard<'a> {
    pub fn backend(&mut self) -> &mut CrosstermBackend {
        self.backend
    }
}

impl<'a> Drop for TerminalGuard<'a> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.backend.leave();
        }
    }
}

/// In-memory [`Terminal`] for driving full-screen programs in tests.
#[derive(Default)]
pub struct ScriptTerminal {
    pub cols: u16,
    pub rows: u16,
    pub input: VecDeque<char>,
    pub mouse_events: VecDeque<MouseEvent>,
    pub frame: Vec<(usize, StyledLine)>,
    pub cursor: (usize, usize),
    pub cleared: usize,
    pub resize: Option<(u16, u16)>,
}

impl ScriptTerminal {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            ..Default::default()
        }
    }

    pub fn type_str(&mut self, s: &str) {
        self.input.extend(s.chars());
    }

    pub fn queue_mouse(&mut self, ev: MouseEvent) {
        self.mouse_events.push_back(ev);
        self.input.extend(MOUSE_PREFIX.chars());
    }

    /// Text of the last repaint of `row`, if any.
    pub fn row_text(&self, row: usize) -> Option<String> {
        self.frame
            .iter()
            .rev()
            .find(|(r, _)| *r == row)
            .map(|(_, l)| l.plain())
    }
}

impl KeySource for ScriptTerminal {
    fn read_char(&mut self) -> Option<char> {
        self.input.pop_front()
    }
    fn peek_char(&mut self, _timeout_ms: u64) -> Option<char> {
        self.input.pop_front()
    }
    fn unread(&mut self, ch: char) {
        self.input.push_front(ch);
    }
}

impl RowSink for ScriptTerminal {
    fn put_row(&mut self, row: usize, line: &StyledLine) {
        self.frame.push((row, line.clone()));
    }
    fn set_cursor(&mut self, row: usize, col: usize) {
        self.cursor = (row, col);
    }
    fn clear(&mut self) {
        self.cleared += 1;
    }
}

impl Terminal for ScriptTerminal {
    fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }
    fn take_resize(&mut self) -> Option<(u16, u16)> {
        self.resize.take()
    }
    fn read_mouse(&mut self) -> Option<MouseEvent> {
        self.mouse_events.pop_front()
    }
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
