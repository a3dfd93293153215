//! Attributed text primitives shared by the screen emulator and the editor.
//!
//! Three layers live here:
//! * `attr` — the packed 32-bit attribute word (indexed colors reduced to
//!   4 bits per channel, style bits, explicit-color bits) plus SGR
//!   application.
//! * `styled` — runs of equally-attributed text and their HTML/ANSI
//!   emission.
//! * `display` — a frame differ that forwards only changed rows to a sink.
//!
//! Design invariants:
//! * An `AttrWord` is plain data; combining it with text never allocates
//!   beyond the run it lands in.
//! * `Display` owns the previous frame; callers submit whole frames and the
//!   differ decides what reaches the sink.

pub mod attr;
pub mod display;
pub mod styled;

pub use attr::{AttrWord, indexed_rgb444};
pub use display::{Display, RowSink};
pub use styled::{StyledLine, StyledRun};
