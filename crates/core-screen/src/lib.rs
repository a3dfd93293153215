//! core-screen: a VT100/ANSI/ECMA-48 terminal emulator over an in-memory
//! cell grid.
//!
//! [`ScreenTerminal`] is the concurrent front end: it owns the screen and
//! parser behind one mutex and exposes a dirty flag with a condition
//! variable so a renderer thread can block in [`ScreenTerminal::dump`]
//! while a feeder thread calls [`ScreenTerminal::write`]. No method holds
//! the lock across I/O; `dump` only ever parks on the condvar.
//!
//! The single-threaded grid logic lives in [`screen::Screen`]; byte-stream
//! decoding in [`parser::Parser`]; keystroke translation in
//! [`keyfilter::filter_keys`].

use std::sync::{Condvar, Mutex};
use std::time::Duration;

pub mod cell;
pub mod charset;
pub mod keyfilter;
pub mod parser;
pub mod render;
pub mod screen;

pub use cell::Cell;
pub use charset::Charset;
pub use render::Snapshot;
pub use screen::{Modes, Screen, SizeError};

struct Inner {
    screen: Screen,
    parser: parser::Parser,
    dirty: bool,
}

/// Thread-safe terminal emulator instance.
pub struct ScreenTerminal {
    inner: Mutex<Inner>,
    cond: Condvar,
}

impl ScreenTerminal {
    pub fn new(width: usize, height: usize) -> Result<Self, SizeError> {
        let mut screen = Screen::new(width, height)?;
        screen.take_dirty();
        Ok(Self {
            inner: Mutex::new(Inner {
                screen,
                parser: parser::Parser::new(),
                dirty: true,
            }),
            cond: Condvar::new(),
        })
    }

    /// Consume a byte stream. Returns when the input is exhausted; never
    /// blocks and never fails (malformed sequences reset the parser).
    pub fn write(&self, bytes: &[u8]) {
        let mut g = self.inner.lock().unwrap();
        let inner = &mut *g;
        for &b in bytes {
            inner.parser.advance(&mut inner.screen, b);
        }
        if inner.screen.take_dirty() {
            inner.dirty = true;
            self.cond.notify_one();
        }
    }

    /// Drain pending response bytes (DSR, DA, DECREQTPARM replies).
    pub fn read(&self) -> Vec<u8> {
        self.inner.lock().unwrap().screen.take_response()
    }

    /// Translate a keystroke sequence through the alias scheme under the
    /// terminal's current input modes.
    pub fn pipe(&self, keys: &str) -> Vec<u8> {
        let modes = self.inner.lock().unwrap().screen.modes();
        keyfilter::filter_keys(modes, keys)
    }

    pub fn resize(&self, width: usize, height: usize) -> Result<(), SizeError> {
        let mut g = self.inner.lock().unwrap();
        g.screen.resize(width, height)?;
        g.screen.take_dirty();
        g.dirty = true;
        self.cond.notify_one();
        Ok(())
    }

    pub fn size(&self) -> (usize, usize) {
        let g = self.inner.lock().unwrap();
        (g.screen.width(), g.screen.height())
    }

    /// Wait up to `timeout_ms` for the screen to become dirty, then return
    /// a full snapshot and clear the flag. `force` returns a snapshot even
    /// when nothing changed.
    pub fn dump(&self, timeout_ms: u64, force: bool) -> Option<Snapshot> {
        let mut g = self.inner.lock().unwrap();
        if !g.dirty && timeout_ms > 0 {
            let (guard, _timeout) = self
                .cond
                .wait_timeout_while(g, Duration::from_millis(timeout_ms), |inner| !inner.dirty)
                .unwrap();
            g = guard;
        }
        if g.dirty || force {
            g.dirty = false;
            g.screen.take_dirty();
            Some(g.screen.snapshot())
        } else {
            None
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.lock().unwrap().dirty
    }

    /// Block up to `timeout_ms` for the dirty flag. Returns whether it is
    /// set on exit.
    pub fn wait_dirty(&self, timeout_ms: u64) -> bool {
        let g = self.inner.lock().unwrap();
        if g.dirty {
            return true;
        }
        let (guard, _timeout) = self
            .cond
            .wait_timeout_while(g, Duration::from_millis(timeout_ms), |inner| !inner.dirty)
            .unwrap();
        guard.dirty
    }

    /// Mark dirty and wake one waiter.
    pub fn set_dirty(&self) {
        let mut g = self.inner.lock().unwrap();
        g.dirty = true;
        g.screen.force_dirty();
        self.cond.notify_one();
    }

    /// Run a closure against the locked screen. Test and host hook.
    pub fn with_screen<R>(&self, f: impl FnOnce(&Screen) -> R) -> R {
        f(&self.inner.lock().unwrap().screen)
    }
}
