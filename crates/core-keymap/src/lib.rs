//! core-keymap: key-sequence to operation mapping.
//!
//! A `KeyMap<Op>` compiles bound character sequences into a trie and
//! resolves input incrementally:
//! - Pure and deterministic: resolution depends only on the accumulated
//!   input slice.
//! - Ambiguity surfaced by `NeedMore` when a strict prefix of one or more
//!   bindings matches but no terminal binding is confirmed yet.
//! - Unicode fall-through: any character that matches no binding resolves
//!   to the map's fall-through operation when one is set (editors bind it
//!   to self-insert).
//! - Alt+uppercase canonicalization: a character immediately following ESC
//!   is lowercased before edge matching, so `ESC a` bindings also cover
//!   `ESC A`.
//! - No side effects: logging only at TRACE for traversal steps.

use smallvec::SmallVec;
use tracing::trace;

const ESC: char = '\u{1b}';

#[derive(Debug, Clone)]
struct Edge {
    ch: char,
    next: usize,
}

#[derive(Debug, Clone)]
struct Node {
    terminal: Option<usize>, // index into ops vec
    edges: SmallVec<[Edge; 4]>,
}

impl Node {
    fn new() -> Self {
        Self {
            terminal: None,
            edges: SmallVec::new(),
        }
    }
}

/// Result of resolving an input slice against the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<Op> {
    /// A binding matched; `consumed` characters were used.
    Matched {
        consumed: usize,
        op: Op,
        ambiguous: bool,
    },
    /// Input so far is a strict prefix of one or more bindings.
    NeedMore,
    /// No binding starts with the first character; the map's fall-through
    /// applies (or the caller discards the character).
    Fallback(char),
}

/// Compiled key bindings.
#[derive(Debug, Clone)]
pub struct KeyMap<Op> {
    nodes: Vec<Node>,
    ops: Vec<Op>,
    fallthrough: Option<Op>,
}

impl<Op: Clone> Default for KeyMap<Op> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Op: Clone> KeyMap<Op> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
            ops: Vec::new(),
            fallthrough: None,
        }
    }

    /// Bind a character sequence to an operation. A later binding for the
    /// same sequence overrides the earlier one.
    pub fn bind(&mut self, seq: &str, op: Op) {
        let mut cur = 0usize;
        let mut prev = '\0';
        for ch in seq.chars() {
            let ch = canonical(prev, ch);
            let next = if let Some(e) = self.nodes[cur].edges.iter().find(|e| e.ch == ch) {
                e.next
            } else {
                let idx = self.nodes.len();
                self.nodes.push(Node::new());
                self.nodes[cur].edges.push(Edge { ch, next: idx });
                idx
            };
            cur = next;
            prev = ch;
        }
        if self.nodes[cur].terminal.is_some() {
            trace!(target = "keymap", node = cur, "terminal_override");
        }
        let op_idx = self.ops.len();
        self.ops.push(op);
        self.nodes[cur].terminal = Some(op_idx);
    }

    /// Bind every otherwise-unbound character to `op` (self-insert).
    pub fn bind_unicode(&mut self, op: Op) {
        self.fallthrough = Some(op);
    }

    pub fn fallthrough(&self) -> Option<&Op> {
        self.fallthrough.as_ref()
    }

    /// Resolve the accumulated input. Longest match wins; a shorter match
    /// with pending longer candidates is reported with `ambiguous = true`.
    pub fn resolve(&self, input: &[char]) -> Resolution<Op> {
        let mut node_idx = 0usize;
        let mut walked = 0usize;
        let mut last_terminal: Option<(usize, usize)> = None; // (consumed, op index)
        let mut prev = '\0';
        for (i, &raw) in input.iter().enumerate() {
            let ch = canonical(prev, raw);
            let Some(edge) = self.nodes[node_idx].edges.iter().find(|e| e.ch == ch) else {
                break;
            };
            node_idx = edge.next;
            walked = i + 1;
            trace!(target = "keymap", step = i, ch = %ch.escape_debug(), node = node_idx, "advance");
            if let Some(op) = self.nodes[node_idx].terminal {
                last_terminal = Some((i + 1, op));
            }
            prev = ch;
        }
        if let Some((consumed, op_idx)) = last_terminal {
            Resolution::Matched {
                consumed,
                op: self.ops[op_idx].clone(),
                ambiguous: consumed < input.len() || !self.nodes[node_idx].edges.is_empty(),
            }
        } else if input.is_empty()
            || (walked == input.len() && !self.nodes[node_idx].edges.is_empty())
        {
            // The whole input is a strict prefix of at least one binding.
            Resolution::NeedMore
        } else {
            // The walk got stuck: nothing bound can match this input.
            Resolution::Fallback(input[0])
        }
    }
}

/// A character following ESC is lowercased so Alt+Shift+letter collapses
/// onto the Alt+letter binding.
fn canonical(prev: char, ch: char) -> char {
    if prev == ESC && ch.is_ascii_uppercase() {
        ch.to_ascii_lowercase()
    } else {
        ch
    }
}

/// Blocking character source the binding reader drains.
pub trait KeySource {
    /// Next character; `None` means the input is closed.
    fn read_char(&mut self) -> Option<char>;
    /// Look at the next character without a hard block, waiting at most
    /// `timeout_ms`. Used to settle ESC-prefix ambiguity.
    fn peek_char(&mut self, timeout_ms: u64) -> Option<char>;
    /// Push a character back so the next `read_char` returns it. Invoked
    /// for input consumed past the end of a matched binding.
    fn unread(&mut self, ch: char);
}

/// How long an ambiguous ESC prefix waits for a continuation before the
/// shorter binding fires.
pub const AMBIGUOUS_TIMEOUT_MS: u64 = 50;

/// Drive a [`KeySource`] against a map until an operation resolves.
///
/// Returns `None` when the source closes. Characters that resolve to
/// `Fallback` yield the map's fall-through operation when one is bound and
/// are otherwise discarded.
pub fn read_binding<Op: Clone>(
    map: &KeyMap<Op>,
    source: &mut impl KeySource,
) -> Option<(Op, Vec<char>)> {
    let mut pending: Vec<char> = Vec::new();
    loop {
        match map.resolve(&pending) {
            Resolution::Matched {
                consumed,
                op,
                ambiguous,
            } => {
                if ambiguous
                    && consumed == pending.len()
                    && let Some(ch) = source.peek_char(AMBIGUOUS_TIMEOUT_MS)
                {
                    pending.push(ch);
                    continue;
                }
                for &ch in pending[consumed..].iter().rev() {
                    source.unread(ch);
                }
                let seq = pending[..consumed].to_vec();
                return Some((op, seq));
            }
            Resolution::NeedMore => {
                let ch = source.read_char()?;
                pending.push(ch);
            }
            Resolution::Fallback(ch) => {
                // Only the first character is unmatched; anything read past
                // it goes back to the source.
                for &c in pending.iter().skip(1).rev() {
                    source.unread(c);
                }
                pending.clear();
                if let Some(op) = map.fallthrough() {
                    return Some((op.clone(), vec![ch]));
                }
                // No fall-through bound: the unmatched character is dropped.
            }
        }
    }
}
