//! The interactive editor: buffers, modal dialogs, layout and painting.
//!
//! Modal sub-dialogs are an explicit state machine over
//! `{Main, Write, Read, Search, Ync, Help}`. Each mode owns its prompt
//! line and shortcut rows; returning to `Main` restores the normal
//! footer. Dialogs never raise to the main loop and the main loop never
//! raises to the host: every failure lands in the message line.

use crate::bracket;
use crate::buffer::{Buffer, WrapContext, char_width};
use crate::config::EditorConfig;
use crate::encoding::LineEnding;
use crate::io::{self, WriteMode, WriteRequest};
use crate::layout::Layout;
use crate::ops::{self, Op};
use crate::search::{SearchError, SearchOutcome, SearchSpec, search};
use anyhow::Result;
use core_keymap::{KeyMap, read_binding};
use core_render::{AttrWord, Display, StyledLine};
use core_terminal::{MouseEvent, MouseKind, Terminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

const HELP_TEXT: &str = include_str!("help.txt");
const TITLE: &str = concat!("edit ", env!("CARGO_PKG_VERSION"));
const SHORTCUT_ITEM_WIDTH: usize = 16;

#[derive(Debug, Clone)]
enum Mode {
    Main,
    Help {
        scroll: usize,
    },
    Search {
        value: String,
    },
    Write {
        value: String,
        mode: WriteMode,
        format: LineEnding,
        backup: bool,
        then_quit: bool,
    },
    Read {
        value: String,
        new_buffer: bool,
    },
    Ync {
        question: String,
        pending: Pending,
    },
}

#[derive(Debug, Clone)]
enum Pending {
    QuitSave,
    Overwrite {
        value: String,
        mode: WriteMode,
        format: LineEnding,
        backup: bool,
        then_quit: bool,
    },
}

struct Maps {
    main: KeyMap<Op>,
    search: KeyMap<Op>,
    write: KeyMap<Op>,
    read: KeyMap<Op>,
    ync: KeyMap<Op>,
}

pub struct Editor {
    buffers: Vec<Buffer>,
    current: usize,
    config: EditorConfig,
    layout: Layout,
    display: Display,
    mode: Mode,
    message: Option<String>,
    cut_buffer: Vec<String>,
    cutting: bool,
    search_spec: SearchSpec,
    interrupted: Arc<AtomicBool>,
    maps: Maps,
    running: bool,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let layout = Layout::compute(80, 24, config.linenumbers);
        let ctx = WrapContext {
            row_width: layout.row_width(),
            tab_width: config.tabsize,
            soft_wrap: config.softwrap,
        };
        let search_spec = SearchSpec {
            case_sensitive: config.casesensitive,
            ..SearchSpec::default()
        };
        Self {
            buffers: vec![Buffer::empty(&ctx)],
            current: 0,
            config,
            layout,
            display: Display::new(24, 80),
            mode: Mode::Main,
            message: None,
            cut_buffer: Vec::new(),
            cutting: false,
            search_spec,
            interrupted: Arc::new(AtomicBool::new(false)),
            maps: Maps {
                main: ops::main_keymap(),
                search: ops::search_keymap(),
                write: ops::write_keymap(),
                read: ops::read_keymap(),
                ync: ops::ync_keymap(),
            },
            running: true,
        }
    }

    /// Flag a host signal handler can set; long scans poll it.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffers[self.current]
    }

    fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffers[self.current]
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn wrap_ctx(&self) -> WrapContext {
        WrapContext {
            row_width: self.layout.row_width(),
            tab_width: self.config.tabsize,
            soft_wrap: self.config.softwrap,
        }
    }

    /// Open a file into a fresh buffer and switch to it. The initial
    /// scratch buffer is replaced when still pristine.
    pub fn open(&mut self, path: PathBuf) -> Result<()> {
        let ctx = self.wrap_ctx();
        match io::read_file(&path) {
            Ok(read) => {
                let mut buffer = Buffer::from_lines(Some(path), read.lines, &ctx);
                buffer.charset = read.charset;
                buffer.format = read.format;
                let pristine = self.buffers.len() == 1
                    && !self.buffers[0].dirty
                    && self.buffers[0].file.is_none();
                if pristine {
                    self.buffers[0] = buffer;
                } else {
                    self.buffers.push(buffer);
                    self.current = self.buffers.len() - 1;
                }
            }
            Err(io::ReadError::Io { ref source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                // A new file: empty buffer carrying the name.
                let mut buffer = Buffer::empty(&ctx);
                buffer.file = Some(path);
                self.buffers.push(buffer);
                self.current = self.buffers.len() - 1;
                self.message = Some("New File".to_string());
            }
            Err(e) => {
                self.message = Some(e.to_string());
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------

    pub fn run(&mut self, term: &mut impl Terminal) -> Result<()> {
        self.sync_geometry(term);
        while self.running {
            self.render(term);
            term.flush()?;
            let map = match &self.mode {
                Mode::Main | Mode::Help { .. } => &self.maps.main,
                Mode::Search { .. } => &self.maps.search,
                Mode::Write { .. } => &self.maps.write,
                Mode::Read { .. } => &self.maps.read,
                Mode::Ync { .. } => &self.maps.ync,
            };
            let Some((op, seq)) = read_binding(map, term) else {
                break;
            };
            if let Some((w, h)) = term.take_resize() {
                self.resized(w as usize, h as usize);
            }
            self.dispatch(term, op, &seq);
        }
        Ok(())
    }

    fn sync_geometry(&mut self, term: &impl Terminal) {
        let (w, h) = term.size();
        self.resized(w as usize, h as usize);
    }

    /// Resize: recompute the layout, every buffer's wrap offsets, and
    /// force a full repaint.
    fn resized(&mut self, columns: usize, rows: usize) {
        self.layout = Layout::compute(columns, rows, self.config.linenumbers);
        let ctx = self.wrap_ctx();
        for buffer in &mut self.buffers {
            buffer.relayout(&ctx);
        }
        self.display.resize(rows, columns);
        debug!(target = "editor", columns, rows, "resized");
    }

    fn dispatch(&mut self, term: &mut impl Terminal, op: Op, seq: &[char]) {
        if op != Op::Cut {
            self.cutting = false;
        }
        if self.config.quickblank && !matches!(self.mode, Mode::Main) {
            // Prompts own the message line; leave it alone.
        } else if self.config.quickblank {
            self.message = None;
        }
        let mode = self.mode.clone();
        match mode {
            Mode::Main => self.dispatch_main(term, op, seq),
            Mode::Help { scroll } => self.dispatch_help(op, scroll),
            Mode::Search { value } => self.dispatch_search(op, seq, value),
            Mode::Write {
                value,
                mode,
                format,
                backup,
                then_quit,
            } => self.dispatch_write(op, seq, value, mode, format, backup, then_quit),
            Mode::Read { value, new_buffer } => self.dispatch_read(op, seq, value, new_buffer),
            Mode::Ync { question, pending } => self.dispatch_ync(op, question, pending),
        }
    }

    // -----------------------------------------------------------------
    // Main mode
    // -----------------------------------------------------------------

    fn dispatch_main(&mut self, term: &mut impl Terminal, op: Op, seq: &[char]) {
        let ctx = self.wrap_ctx();
        match op {
            Op::Insert => {
                // Unbound control sequences fall through here; only
                // printable text (and tabs) goes into the buffer.
                let text: String = seq
                    .iter()
                    .filter(|c| !c.is_control() || **c == '\t')
                    .collect();
                if !text.is_empty() {
                    self.buffer_mut().insert(&text, &ctx);
                }
            }
            Op::Enter => self.buffer_mut().insert("\n", &ctx),
            Op::Backspace => self.buffer_mut().backspace(1, &ctx),
            Op::Delete => self.buffer_mut().delete(1, &ctx),
            Op::MoveLeft => self.buffer_mut().move_left(&ctx),
            Op::MoveRight => self.buffer_mut().move_right(&ctx),
            Op::MoveUp => {
                self.buffer_mut().move_up(&ctx);
            }
            Op::MoveDown => {
                self.buffer_mut().move_down(&ctx);
            }
            Op::PrevWord => self.buffer_mut().prev_word(),
            Op::NextWord => self.buffer_mut().next_word(),
            Op::BeginningOfLine => self.buffer_mut().beginning_of_line(),
            Op::EndOfLine => self.buffer_mut().end_of_line(),
            Op::FirstLine => self.buffer_mut().first_line(),
            Op::LastLine => self.buffer_mut().last_line(),
            Op::PrevPage => {
                for _ in 0..self.layout.body_rows {
                    if !self.buffer_mut().move_up(&ctx) {
                        break;
                    }
                }
            }
            Op::NextPage => {
                for _ in 0..self.layout.body_rows {
                    if !self.buffer_mut().move_down(&ctx) {
                        break;
                    }
                }
            }
            Op::ScrollUp => self.scroll_view(-1),
            Op::ScrollDown => self.scroll_view(1),
            Op::MatchBracket => self.do_match_bracket(),
            Op::Cut => {
                if !self.cutting {
                    self.cut_buffer.clear();
                }
                let line = self.buffer_mut().cut_line(&ctx);
                self.cut_buffer.push(line);
                self.cutting = true;
            }
            Op::Uncut => {
                if !self.cut_buffer.is_empty() {
                    let mut text = self.cut_buffer.join("\n");
                    text.push('\n');
                    self.buffer_mut().insert(&text, &ctx);
                }
            }
            Op::CursorPos => self.report_cursor_position(),
            Op::Search => {
                self.mode = Mode::Search {
                    value: String::new(),
                };
            }
            Op::SearchNext => self.do_search(),
            Op::WriteOut => {
                self.mode = Mode::Write {
                    value: self
                        .buffer()
                        .file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    mode: WriteMode::Write,
                    format: self.buffer().format,
                    backup: self.config.backup,
                    then_quit: false,
                };
            }
            Op::ReadFile => {
                self.mode = Mode::Read {
                    value: String::new(),
                    new_buffer: false,
                };
            }
            Op::PrevBuffer => self.switch_buffer(self.buffers.len() - 1),
            Op::NextBuffer => self.switch_buffer(1),
            Op::Help => self.mode = Mode::Help { scroll: 0 },
            Op::Quit => {
                if self.buffer().dirty {
                    self.mode = Mode::Ync {
                        question: "Save modified buffer?".to_string(),
                        pending: Pending::QuitSave,
                    };
                } else {
                    self.close_buffer();
                }
            }
            Op::Refresh => self.display.clear(),
            Op::Mouse => {
                if let Some(ev) = term.read_mouse() {
                    self.handle_mouse(ev);
                }
            }
            _ => {}
        }
    }

    fn switch_buffer(&mut self, delta: usize) {
        if self.buffers.len() > 1 {
            self.current = (self.current + delta) % self.buffers.len();
            self.message = Some(format!("Switched to {}", self.buffer().name()));
        }
    }

    fn close_buffer(&mut self) {
        self.buffers.remove(self.current);
        if self.buffers.is_empty() {
            self.running = false;
        } else {
            self.current %= self.buffers.len();
        }
        self.mode = Mode::Main;
    }

    fn scroll_view(&mut self, dir: isize) {
        let ctx = self.wrap_ctx();
        let (line, off) = (self.buffer().first_line, self.buffer().first_offset);
        let next = if dir < 0 {
            self.prev_visual(line, off)
        } else {
            self.next_visual(line, off)
        };
        if let Some((l, o)) = next {
            let b = self.buffer_mut();
            b.first_line = l;
            b.first_offset = o;
            // Keep the cursor inside the window by dragging it along.
            if dir < 0 {
                b.move_up(&ctx);
            } else {
                b.move_down(&ctx);
            }
        }
    }

    fn do_match_bracket(&mut self) {
        let b = self.buffer();
        match bracket::match_bracket(&b.lines, b.line, b.cursor_char()) {
            Some((line, column)) => self.buffer_mut().goto(line, column),
            None => self.message = Some("No matching bracket".to_string()),
        }
    }

    fn report_cursor_position(&mut self) {
        let b = self.buffer();
        let line = b.line + 1;
        let lines = b.lines.len();
        let col = b.cursor_char() + 1;
        let cols = b.line_chars(b.line) + 1;
        let chars_before: usize = b.lines[..b.line]
            .iter()
            .map(|l| l.chars().count() + 1)
            .sum::<usize>()
            + b.cursor_char();
        let total: usize = b.lines.iter().map(|l| l.chars().count() + 1).sum::<usize>() - 1;
        let pct = |a: usize, b: usize| if b == 0 { 0 } else { a * 100 / b };
        self.message = Some(format!(
            "line {line}/{lines} ({}%), col {col}/{cols} ({}%), char {chars_before}/{total} ({}%)",
            pct(line, lines),
            pct(col, cols),
            pct(chars_before, total.max(1)),
        ));
    }

    fn do_search(&mut self) {
        if self.search_spec.term.is_empty() {
            self.message = Some("No search term".to_string());
            return;
        }
        let b = self.buffer();
        let result = search(
            &b.lines,
            b.line,
            b.cursor_char(),
            &self.search_spec,
            &self.interrupted,
        );
        match result {
            Ok(SearchOutcome::Found {
                line,
                column,
                wrapped,
            }) => {
                self.buffer_mut().goto(line, column);
                if wrapped {
                    self.message = Some("Search Wrapped".to_string());
                }
            }
            Ok(SearchOutcome::OnlyOccurrence) => {
                self.message = Some("This is the only occurrence".to_string());
            }
            Ok(SearchOutcome::NotFound) => {
                self.message = Some(format!("\"{}\" not found", self.search_spec.term));
            }
            Err(SearchError::Interrupted) => {
                self.interrupted.store(false, Ordering::Relaxed);
                self.message = Some("Cancelled".to_string());
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    // -----------------------------------------------------------------
    // Help mode
    // -----------------------------------------------------------------

    fn help_lines(&self) -> Vec<String> {
        let ctx = self.wrap_ctx();
        HELP_TEXT
            .lines()
            .flat_map(|l| {
                let offs = crate::buffer::compute_offsets(l, &ctx);
                let chars: Vec<char> = l.chars().collect();
                let mut rows = Vec::new();
                for (i, &start) in offs.iter().enumerate() {
                    let end = offs.get(i + 1).copied().unwrap_or(chars.len());
                    rows.push(chars[start..end].iter().collect::<String>());
                }
                rows
            })
            .collect()
    }

    fn dispatch_help(&mut self, op: Op, scroll: usize) {
        let total = self.help_lines().len();
        let max = total.saturating_sub(self.layout.body_rows);
        match op {
            Op::MoveUp | Op::ScrollUp => {
                self.mode = Mode::Help {
                    scroll: scroll.saturating_sub(1),
                };
            }
            Op::MoveDown | Op::ScrollDown => {
                self.mode = Mode::Help {
                    scroll: (scroll + 1).min(max),
                };
            }
            Op::PrevPage => {
                self.mode = Mode::Help {
                    scroll: scroll.saturating_sub(self.layout.body_rows),
                };
            }
            Op::NextPage => {
                self.mode = Mode::Help {
                    scroll: (scroll + self.layout.body_rows).min(max),
                };
            }
            Op::FirstLine => self.mode = Mode::Help { scroll: 0 },
            Op::LastLine => self.mode = Mode::Help { scroll: max },
            Op::Quit | Op::Help => self.mode = Mode::Main,
            _ => {}
        }
    }

    // -----------------------------------------------------------------
    // Prompt modes
    // -----------------------------------------------------------------

    fn dispatch_search(&mut self, op: Op, seq: &[char], mut value: String) {
        match op {
            Op::Insert => {
                value.extend(seq.iter().filter(|c| !c.is_control()));
                self.mode = Mode::Search { value };
            }
            Op::Backspace => {
                value.pop();
                self.mode = Mode::Search { value };
            }
            Op::ToggleCase => {
                self.search_spec.case_sensitive = !self.search_spec.case_sensitive;
                self.mode = Mode::Search { value };
            }
            Op::ToggleBackwards => {
                self.search_spec.backwards = !self.search_spec.backwards;
                self.mode = Mode::Search { value };
            }
            Op::ToggleRegex => {
                self.search_spec.regex = !self.search_spec.regex;
                self.mode = Mode::Search { value };
            }
            Op::Accept => {
                if !value.is_empty() {
                    self.search_spec.term = value;
                }
                self.mode = Mode::Main;
                self.do_search();
            }
            Op::Cancel => {
                self.mode = Mode::Main;
                self.message = Some("Cancelled".to_string());
            }
            _ => self.mode = Mode::Search { value },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_write(
        &mut self,
        op: Op,
        seq: &[char],
        mut value: String,
        mode: WriteMode,
        format: LineEnding,
        backup: bool,
        then_quit: bool,
    ) {
        let again = |value, mode, format, backup| Mode::Write {
            value,
            mode,
            format,
            backup,
            then_quit,
        };
        match op {
            Op::Insert => {
                value.extend(seq.iter().filter(|c| !c.is_control()));
                self.mode = again(value, mode, format, backup);
            }
            Op::Backspace => {
                value.pop();
                self.mode = again(value, mode, format, backup);
            }
            Op::ToggleAppend => {
                let mode = if mode == WriteMode::Append {
                    WriteMode::Write
                } else {
                    WriteMode::Append
                };
                self.mode = again(value, mode, format, backup);
            }
            Op::TogglePrepend => {
                let mode = if mode == WriteMode::Prepend {
                    WriteMode::Write
                } else {
                    WriteMode::Prepend
                };
                self.mode = again(value, mode, format, backup);
            }
            Op::ToggleFormatDos => {
                let format = if format == LineEnding::Dos {
                    LineEnding::Unix
                } else {
                    LineEnding::Dos
                };
                self.mode = again(value, mode, format, backup);
            }
            Op::ToggleFormatMac => {
                let format = if format == LineEnding::Mac {
                    LineEnding::Unix
                } else {
                    LineEnding::Mac
                };
                self.mode = again(value, mode, format, backup);
            }
            Op::ToggleBackup => {
                self.mode = again(value, mode, format, !backup);
            }
            Op::Accept => {
                if value.is_empty() {
                    self.mode = Mode::Main;
                    self.message = Some("Cancelled".to_string());
                    return;
                }
                let target = PathBuf::from(&value);
                let differs = self.buffer().file.as_deref() != Some(target.as_path());
                if mode == WriteMode::Write && differs && target.exists() {
                    self.mode = Mode::Ync {
                        question: format!("File \"{value}\" exists, OVERWRITE ?"),
                        pending: Pending::Overwrite {
                            value,
                            mode,
                            format,
                            backup,
                            then_quit,
                        },
                    };
                    return;
                }
                self.perform_write(value, mode, format, backup, then_quit);
            }
            Op::Cancel => {
                self.mode = Mode::Main;
                self.message = Some("Cancelled".to_string());
            }
            _ => self.mode = again(value, mode, format, backup),
        }
    }

    fn perform_write(
        &mut self,
        value: String,
        mode: WriteMode,
        format: LineEnding,
        backup: bool,
        then_quit: bool,
    ) {
        let target = PathBuf::from(&value);
        let request = WriteRequest {
            path: &target,
            lines: &self.buffers[self.current].lines,
            format,
            charset: self.buffer().charset,
            mode,
            backup,
        };
        match io::write_file(&request) {
            Ok(count) => {
                self.mode = Mode::Main;
                if mode == WriteMode::Write {
                    let b = self.buffer_mut();
                    b.file = Some(target);
                    b.format = format;
                    b.dirty = false;
                }
                self.message = Some(format!("Wrote {count} lines"));
                if then_quit {
                    self.close_buffer();
                }
            }
            Err(e) => {
                // A failed write leaves the buffer untouched and the
                // prompt open.
                self.mode = Mode::Write {
                    value,
                    mode,
                    format,
                    backup,
                    then_quit,
                };
                self.message = Some(e.to_string());
            }
        }
    }

    fn dispatch_read(&mut self, op: Op, seq: &[char], mut value: String, new_buffer: bool) {
        match op {
            Op::Insert => {
                value.extend(seq.iter().filter(|c| !c.is_control()));
                self.mode = Mode::Read { value, new_buffer };
            }
            Op::Backspace => {
                value.pop();
                self.mode = Mode::Read { value, new_buffer };
            }
            Op::ToggleNewBuffer => {
                self.mode = Mode::Read {
                    value,
                    new_buffer: !new_buffer,
                };
            }
            Op::Accept => {
                self.mode = Mode::Main;
                if value.is_empty() {
                    self.message = Some("Cancelled".to_string());
                    return;
                }
                self.perform_read(PathBuf::from(value), new_buffer);
            }
            Op::Cancel => {
                self.mode = Mode::Main;
                self.message = Some("Cancelled".to_string());
            }
            _ => self.mode = Mode::Read { value, new_buffer },
        }
    }

    fn perform_read(&mut self, path: PathBuf, new_buffer: bool) {
        let ctx = self.wrap_ctx();
        match io::read_file(&path) {
            Ok(read) => {
                let count = read.lines.len();
                if new_buffer {
                    let mut buffer = Buffer::from_lines(Some(path), read.lines, &ctx);
                    buffer.charset = read.charset;
                    buffer.format = read.format;
                    self.buffers.insert(self.current + 1, buffer);
                    self.current += 1;
                } else {
                    let text = read.lines.join("\n");
                    self.buffer_mut().insert(&text, &ctx);
                }
                self.message = Some(format!("Read {count} lines"));
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    fn dispatch_ync(&mut self, op: Op, question: String, pending: Pending) {
        match (op, pending) {
            (Op::Yes, Pending::QuitSave) => {
                self.mode = Mode::Write {
                    value: self
                        .buffer()
                        .file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    mode: WriteMode::Write,
                    format: self.buffer().format,
                    backup: self.config.backup,
                    then_quit: true,
                };
            }
            (Op::No, Pending::QuitSave) => self.close_buffer(),
            (
                Op::Yes,
                Pending::Overwrite {
                    value,
                    mode,
                    format,
                    backup,
                    then_quit,
                },
            ) => {
                self.perform_write(value, mode, format, backup, then_quit);
            }
            (
                Op::No,
                Pending::Overwrite {
                    value,
                    mode,
                    format,
                    backup,
                    then_quit,
                },
            ) => {
                // Back to the prompt to pick another name.
                self.mode = Mode::Write {
                    value,
                    mode,
                    format,
                    backup,
                    then_quit,
                };
            }
            (Op::Cancel, _) => {
                self.mode = Mode::Main;
                self.message = Some("Cancelled".to_string());
            }
            (_, pending) => self.mode = Mode::Ync { question, pending },
        }
    }

    // -----------------------------------------------------------------
    // Mouse
    // -----------------------------------------------------------------

    fn handle_mouse(&mut self, ev: MouseEvent) {
        if !self.config.mouse {
            return;
        }
        let ctx = self.wrap_ctx();
        match ev.kind {
            MouseKind::WheelUp => self.scroll_view(-1),
            MouseKind::WheelDown => self.scroll_view(1),
            MouseKind::Press => {
                let y = ev.y as usize;
                let x = ev.x as usize;
                let body = self.layout.body_start()..self.layout.message_row();
                let (row1, row2) = self.layout.shortcut_rows();
                if body.contains(&y) {
                    self.click_body(y - self.layout.body_start(), x, &ctx);
                } else if y == row1 || y == row2 {
                    let idx = (x / SHORTCUT_ITEM_WIDTH) * 2 + (y - row1);
                    if let Some(&(_, _, op)) = self.main_shortcuts().get(idx) {
                        // Re-enter dispatch as if the shortcut was typed.
                        let seq: Vec<char> = Vec::new();
                        let mode = self.mode.clone();
                        if let Mode::Main = mode {
                            // Mouse shortcuts only act in the main mode.
                            let mut term = NullTerminal;
                            self.dispatch(&mut term, op, &seq);
                        }
                    }
                }
            }
            MouseKind::Release => {}
        }
    }

    /// Move the cursor to the clicked body cell, translating through the
    /// viewport anchor, wrap offsets and gutter.
    fn click_body(&mut self, body_row: usize, x: usize, ctx: &WrapContext) {
        let mut pos = (self.buffer().first_line, self.buffer().first_offset);
        for _ in 0..body_row {
            match self.next_visual(pos.0, pos.1) {
                Some(next) => pos = next,
                None => break,
            }
        }
        let (line, offset) = pos;
        let text = self.row_chars(line, offset);
        let target = x.saturating_sub(self.layout.gutter) + self.buffer().first_column;
        let mut col = 0usize;
        let mut width = 0usize;
        for ch in text {
            let w = char_width(ch, width, ctx.tab_width);
            if width + w > target {
                break;
            }
            width += w;
            col += 1;
        }
        self.buffer_mut().goto(line, offset + col);
    }

    // -----------------------------------------------------------------
    // Viewport arithmetic
    // -----------------------------------------------------------------

    fn next_visual(&self, line: usize, offset: usize) -> Option<(usize, usize)> {
        let b = self.buffer();
        let offs = b.offsets(line);
        if let Some(next) = offs.iter().find(|&&o| o > offset) {
            return Some((line, *next));
        }
        if line + 1 < b.lines.len() {
            return Some((line + 1, 0));
        }
        None
    }

    fn prev_visual(&self, line: usize, offset: usize) -> Option<(usize, usize)> {
        let b = self.buffer();
        let offs = b.offsets(line);
        if let Some(prev) = offs.iter().rev().find(|&&o| o < offset) {
            return Some((line, *prev));
        }
        if line > 0 {
            let prev_offs = b.offsets(line - 1);
            return Some((line - 1, *prev_offs.last().unwrap()));
        }
        None
    }

    fn row_chars(&self, line: usize, offset: usize) -> Vec<char> {
        let b = self.buffer();
        let offs = b.offsets(line);
        let end = offs
            .iter()
            .find(|&&o| o > offset)
            .copied()
            .unwrap_or_else(|| b.line_chars(line));
        b.lines[line]
            .chars()
            .skip(offset)
            .take(end - offset)
            .collect()
    }

    /// Scroll the anchor so the cursor row is inside the body.
    fn ensure_cursor_visible(&mut self) {
        // Edits can leave the anchor past the end of the buffer or on a
        // wrap offset that no longer exists; snap it back first.
        {
            let b = self.buffer_mut();
            if b.first_line >= b.lines.len() {
                b.first_line = b.lines.len() - 1;
                b.first_offset = 0;
            }
            let clamped = b.first_offset.min(b.line_chars(b.first_line));
            b.first_offset = b.locate(b.first_line, clamped).0;
        }
        let target = (self.buffer().line, self.buffer().offset_in_line);
        let anchor = (self.buffer().first_line, self.buffer().first_offset);
        if target < anchor {
            let b = self.buffer_mut();
            b.first_line = target.0;
            b.first_offset = target.1;
            return;
        }
        // Walk forward: if the cursor is past the last body row, pull the
        // anchor down until it fits.
        let mut pos = anchor;
        let mut found = None;
        for row in 0..self.layout.body_rows {
            if pos == target {
                found = Some(row);
                break;
            }
            match self.next_visual(pos.0, pos.1) {
                Some(next) => pos = next,
                None => break,
            }
        }
        if found.is_none() {
            // Place the cursor on the last body row.
            let mut anchor = target;
            for _ in 0..self.layout.body_rows.saturating_sub(1) {
                match self.prev_visual(anchor.0, anchor.1) {
                    Some(prev) => anchor = prev,
                    None => break,
                }
            }
            let b = self.buffer_mut();
            b.first_line = anchor.0;
            b.first_offset = anchor.1;
        }
        // Horizontal scroll only applies when wrapping is off.
        if !self.config.softwrap {
            let column = self.buffer().column;
            let width = self.layout.row_width();
            let b = self.buffer_mut();
            if column < b.first_column {
                b.first_column = column;
            } else if column >= b.first_column + width {
                b.first_column = column + 1 - width;
            }
        }
    }

    // -----------------------------------------------------------------
    // Painting
    // -----------------------------------------------------------------

    fn main_shortcuts(&self) -> Vec<(&'static str, &'static str, Op)> {
        vec![
            ("^G", "Help", Op::Help),
            ("^X", "Exit", Op::Quit),
            ("^O", "Write", Op::WriteOut),
            ("^R", "Read", Op::ReadFile),
            ("^W", "Search", Op::Search),
            ("^K", "Cut", Op::Cut),
            ("^U", "Uncut", Op::Uncut),
            ("^C", "Location", Op::CursorPos),
            ("^Y", "Prev Page", Op::PrevPage),
            ("^V", "Next Page", Op::NextPage),
        ]
    }

    fn mode_shortcuts(&self) -> Vec<(&'static str, &'static str, Op)> {
        match &self.mode {
            Mode::Main => self.main_shortcuts(),
            Mode::Help { .. } => vec![
                ("^X", "Close", Op::Quit),
                ("^Y", "Prev Page", Op::PrevPage),
                ("^V", "Next Page", Op::NextPage),
            ],
            Mode::Search { .. } => vec![
                ("^C", "Cancel", Op::Cancel),
                ("M-C", "Case Sens", Op::ToggleCase),
                ("M-B", "Backwards", Op::ToggleBackwards),
                ("M-R", "Regexp", Op::ToggleRegex),
            ],
            Mode::Write { .. } => vec![
                ("^C", "Cancel", Op::Cancel),
                ("M-A", "Append", Op::ToggleAppend),
                ("M-P", "Prepend", Op::TogglePrepend),
                ("M-D", "DOS Format", Op::ToggleFormatDos),
                ("M-M", "Mac Format", Op::ToggleFormatMac),
                ("M-K", "Backup", Op::ToggleBackup),
            ],
            Mode::Read { .. } => vec![
                ("^C", "Cancel", Op::Cancel),
                ("M-F", "New Buffer", Op::ToggleNewBuffer),
            ],
            Mode::Ync { .. } => vec![
                ("Y", "Yes", Op::Yes),
                ("N", "No", Op::No),
                ("C", "Cancel", Op::Cancel),
            ],
        }
    }

    fn prompt_line(&self) -> Option<String> {
        match &self.mode {
            Mode::Main | Mode::Help { .. } => None,
            Mode::Search { value } => {
                let spec = &self.search_spec;
                let mut flags = String::new();
                if spec.case_sensitive {
                    flags.push_str(" [Case Sensitive]");
                }
                if spec.backwards {
                    flags.push_str(" [Backwards]");
                }
                if spec.regex {
                    flags.push_str(" [Regexp]");
                }
                let last = if spec.term.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", spec.term)
                };
                Some(format!("Search{flags}{last}: {value}"))
            }
            Mode::Write {
                value,
                mode,
                format,
                backup,
                ..
            } => {
                let mut flags = String::new();
                match format {
                    LineEnding::Dos => flags.push_str(" [DOS Format]"),
                    LineEnding::Mac => flags.push_str(" [Mac Format]"),
                    LineEnding::Unix => {}
                }
                match mode {
                    WriteMode::Append => flags.push_str(" [Append]"),
                    WriteMode::Prepend => flags.push_str(" [Prepend]"),
                    WriteMode::Write => {}
                }
                if *backup {
                    flags.push_str(" [Backup]");
                }
                Some(format!("File Name to Write{flags}: {value}"))
            }
            Mode::Read { value, new_buffer } => {
                let flag = if *new_buffer { " [New Buffer]" } else { "" };
                Some(format!("File to insert{flag}: {value}"))
            }
            Mode::Ync { question, .. } => Some(format!("{question} (Y/N/C)")),
        }
    }

    fn pad(&self, mut line: StyledLine, attr: AttrWord) -> StyledLine {
        let width: usize = line.plain().chars().count();
        if width < self.layout.columns {
            line.push_str(attr, &" ".repeat(self.layout.columns - width));
        }
        line
    }

    fn header_line(&self) -> StyledLine {
        let inverse = AttrWord::default().with_negative(true);
        let b = self.buffer();
        let modified = if b.dirty { "Modified" } else { "" };
        let name = b.name();
        let pad_between = self
            .layout
            .columns
            .saturating_sub(TITLE.chars().count() + name.chars().count() + modified.len() + 6);
        let text = format!(
            "  {TITLE}  {name}{}{modified}",
            " ".repeat(pad_between.max(2))
        );
        let mut line = StyledLine::new();
        line.push_str(inverse, &text);
        self.pad(line, inverse)
    }

    fn body_line(&self, line: usize, offset: usize, ctx: &WrapContext) -> StyledLine {
        let attr = AttrWord::default();
        let gutter_attr = AttrWord::default().with_fg(0x888);
        let mut out = StyledLine::new();
        if self.layout.gutter > 0 {
            if offset == 0 {
                out.push_str(gutter_attr, &format!("{:>7} ", line + 1));
            } else {
                out.push_str(gutter_attr, &" ".repeat(self.layout.gutter));
            }
        }
        let skip = self.buffer().first_column;
        let mut width = 0usize;
        for ch in self.row_chars(line, offset).into_iter().skip(skip) {
            let w = char_width(ch, width, ctx.tab_width);
            if width + w > self.layout.row_width() {
                break;
            }
            if ch == '\t' {
                out.push_str(attr, &" ".repeat(w));
            } else {
                out.push(attr, ch);
            }
            width += w;
        }
        out
    }

    fn shortcut_line(&self, row: usize) -> StyledLine {
        let inverse = AttrWord::default().with_negative(true);
        let plain = AttrWord::default();
        let mut line = StyledLine::new();
        let items = self.mode_shortcuts();
        let mut idx = row;
        while idx < items.len() {
            let (key, label, _) = items[idx];
            let cell = format!("{label} ");
            line.push_str(inverse, key);
            line.push_str(plain, &format!(" {cell:<width$}", width = SHORTCUT_ITEM_WIDTH.saturating_sub(key.len() + 1)));
            idx += 2;
        }
        line
    }

    fn render(&mut self, term: &mut impl Terminal) {
        self.ensure_cursor_visible();
        let ctx = self.wrap_ctx();
        let mut frame: Vec<StyledLine> = Vec::with_capacity(self.layout.rows);
        frame.push(self.header_line());
        if self.layout.header_rows == 2 {
            frame.push(StyledLine::new());
        }
        let mut cursor_row = self.layout.body_start();
        let mut cursor_col = 0usize;
        match &self.mode {
            Mode::Help { scroll } => {
                let lines = self.help_lines();
                for i in 0..self.layout.body_rows {
                    let mut line = StyledLine::new();
                    if let Some(text) = lines.get(scroll + i) {
                        line.push_str(AttrWord::default(), text);
                    }
                    frame.push(line);
                }
            }
            _ => {
                let mut pos = (self.buffer().first_line, self.buffer().first_offset);
                let mut done = false;
                for row in 0..self.layout.body_rows {
                    if !done {
                        if pos == (self.buffer().line, self.buffer().offset_in_line) {
                            cursor_row = self.layout.body_start() + row;
                            cursor_col = self.cursor_screen_column(&ctx);
                        }
                        frame.push(self.body_line(pos.0, pos.1, &ctx));
                        match self.next_visual(pos.0, pos.1) {
                            Some(next) => pos = next,
                            None => done = true,
                        }
                    } else {
                        frame.push(StyledLine::new());
                    }
                }
            }
        }
        // Footer: message/prompt plus two shortcut rows.
        let mut message_line = StyledLine::new();
        if let Some(prompt) = self.prompt_line() {
            cursor_row = self.layout.message_row();
            cursor_col = prompt.chars().count();
            message_line.push_str(AttrWord::default().with_negative(true), &prompt);
        } else if let Some(msg) = &self.message {
            message_line.push_str(AttrWord::default().with_negative(true), &format!("[ {msg} ]"));
        }
        frame.push(message_line);
        if self.layout.footer_rows >= 3 {
            frame.push(self.shortcut_line(0));
            frame.push(self.shortcut_line(1));
        }
        self.display.update(&frame, (cursor_row, cursor_col), term);
    }

    fn cursor_screen_column(&self, ctx: &WrapContext) -> usize {
        let b = self.buffer();
        let chars = self.row_chars(b.line, b.offset_in_line);
        let mut width = 0usize;
        for ch in chars.iter().take(b.column).skip(b.first_column) {
            width += char_width(*ch, width, ctx.tab_width);
        }
        self.layout.gutter + width
    }
}

/// Sink for re-dispatched shortcut clicks; they never read keys.
struct NullTerminal;

impl core_keymap::KeySource for NullTerminal {
    fn read_char(&mut self) -> Option<char> {
        None
    }
    fn peek_char(&mut self, _timeout_ms: u64) -> Option<char> {
        None
    }
    fn unread(&mut self, _ch: char) {}
}

impl core_render::RowSink for NullTerminal {
    fn put_row(&mut self, _row: usize, _line: &StyledLine) {}
    fn set_cursor(&mut self, _row: usize, _col: usize) {}
    fn clear(&mut self) {}
}

impl Terminal for NullTerminal {
    fn size(&self) -> (u16, u16) {
        (80, 24)
    }
    fn take_resize(&mut self) -> Option<(u16, u16)> {
        None
    }
    fn read_mouse(&mut self) -> Option<MouseEvent> {
        None
    }
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
