//! core-nfa: grammar-shaped argument matching.
//!
//! A regex-like syntax over *named tokens* compiles (lazily, once) into a
//! Thompson NFA. Two queries drive completion backends:
//! * [`NfaMatcher::matches`] — does a token sequence end in the accept state?
//! * [`NfaMatcher::match_partial`] — which token names could legally come
//!   next?
//!
//! Token identity is decided by a caller-supplied predicate receiving
//! `(input_token, state_label)`, which keeps the matcher decoupled from
//! whatever the completion backend considers a "match".
//!
//! States live in an arena (`Vec<State>`) and edges are indices, so the
//! cyclic fragments produced by `*` and `+` need no shared ownership;
//! patching a dangling fragment is a list of index-typed stores.

use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::trace;

/// Deterministic compilation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("operator `{0}` has nothing to apply to")]
    MisplacedOperator(char),
    #[error("empty alternative branch")]
    EmptyAlternative,
}

// -------------------------------------------------------------------------------------------------
// Postfix conversion
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Post {
    Name(String),
    Concat,
    Alt,
    Star,
    Plus,
    Quest,
}

/// Shunting-yard conversion with explicit concatenation markers, tracking
/// atom/alternative counts per group so malformed input fails here rather
/// than during construction.
fn to_postfix(syntax: &str) -> Result<Vec<Post>, GrammarError> {
    struct Level {
        natom: u32,
        nalt: u32,
    }
    let mut out = Vec::new();
    let mut stack: Vec<Level> = Vec::new();
    let mut natom = 0u32;
    let mut nalt = 0u32;
    let mut chars = syntax.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            c if is_ident(c) => {
                let mut name = String::new();
                name.push(c);
                while let Some(&n) = chars.peek() {
                    if is_ident(n) {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if natom > 1 {
                    out.push(Post::Concat);
                    natom -= 1;
                }
                out.push(Post::Name(name));
                natom += 1;
            }
            '(' => {
                if natom > 1 {
                    out.push(Post::Concat);
                    natom -= 1;
                }
                stack.push(Level { natom, nalt });
                natom = 0;
                nalt = 0;
            }
            ')' => {
                let level = stack.pop().ok_or(GrammarError::UnbalancedParens)?;
                if natom == 0 {
                    return Err(if nalt > 0 {
                        GrammarError::EmptyAlternative
                    } else {
                        GrammarError::UnbalancedParens
                    });
                }
                while natom > 1 {
                    out.push(Post::Concat);
                    natom -= 1;
                }
                for _ in 0..nalt {
                    out.push(Post::Alt);
                }
                natom = level.natom + 1;
                nalt = level.nalt;
            }
            '|' => {
                if natom == 0 {
                    return Err(GrammarError::EmptyAlternative);
                }
                while natom > 1 {
                    out.push(Post::Concat);
                    natom -= 1;
                }
                natom = 0;
                nalt += 1;
            }
            '*' | '+' | '?' => {
                if natom == 0 {
                    return Err(GrammarError::MisplacedOperator(ch));
                }
                out.push(match ch {
                    '*' => Post::Star,
                    '+' => Post::Plus,
                    _ => Post::Quest,
                });
            }
            other => return Err(GrammarError::MisplacedOperator(other)),
        }
    }
    if !stack.is_empty() {
        return Err(GrammarError::UnbalancedParens);
    }
    if natom == 0 {
        return Err(if nalt > 0 {
            GrammarError::EmptyAlternative
        } else {
            GrammarError::UnbalancedParens
        });
    }
    while natom > 1 {
        out.push(Post::Concat);
        natom -= 1;
    }
    for _ in 0..nalt {
        out.push(Post::Alt);
    }
    Ok(out)
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// -------------------------------------------------------------------------------------------------
// Thompson construction
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Label {
    /// Consumes one input token the predicate accepts.
    Token(String),
    /// ε-fork with up to two successors.
    Split,
    /// Terminal accept state.
    Match,
}

#[derive(Debug, Clone)]
struct State {
    label: Label,
    out: [Option<usize>; 2],
}

/// A partially built automaton: a start state and the dangling out-slots
/// still waiting for a target.
struct Fragment {
    start: usize,
    dangling: Vec<(usize, usize)>, // (state, slot)
}

#[derive(Debug)]
struct Nfa {
    states: Vec<State>,
    start: usize,
}

fn compile(syntax: &str) -> Result<Nfa, GrammarError> {
    let postfix = to_postfix(syntax)?;
    let mut states: Vec<State> = Vec::new();
    let mut stack: Vec<Fragment> = Vec::new();

    let mut push_state = |states: &mut Vec<State>, label: Label| -> usize {
        states.push(State {
            label,
            out: [None, None],
        });
        states.len() - 1
    };
    let patch = |states: &mut Vec<State>, dangling: &[(usize, usize)], target: usize| {
        for &(s, slot) in dangling {
            states[s].out[slot] = Some(target);
        }
    };

    for op in postfix {
        match op {
            Post::Name(name) => {
                let s = push_state(&mut states, Label::Token(name));
                stack.push(Fragment {
                    start: s,
                    dangling: vec![(s, 0)],
                });
            }
            Post::Concat => {
                let e2 = stack.pop().expect("postfix arity checked in parser");
                let e1 = stack.pop().expect("postfix arity checked in parser");
                patch(&mut states, &e1.dangling, e2.start);
                stack.push(Fragment {
                    start: e1.start,
                    dangling: e2.dangling,
                });
            }
            Post::Alt => {
                let e2 = stack.pop().expect("postfix arity checked in parser");
                let e1 = stack.pop().expect("postfix arity checked in parser");
                let s = push_state(&mut states, Label::Split);
                states[s].out = [Some(e1.start), Some(e2.start)];
                let mut dangling = e1.dangling;
                dangling.extend(e2.dangling);
                stack.push(Fragment { start: s, dangling });
            }
            Post::Quest => {
                let e = stack.pop().expect("postfix arity checked in parser");
                let s = push_state(&mut states, Label::Split);
                states[s].out[0] = Some(e.start);
                let mut dangling = e.dangling;
                dangling.push((s, 1));
                stack.push(Fragment { start: s, dangling });
            }
            Post::Star => {
                let e = stack.pop().expect("postfix arity checked in parser");
                let s = push_state(&mut states, Label::Split);
                states[s].out[0] = Some(e.start);
                patch(&mut states, &e.dangling, s);
                stack.push(Fragment {
                    start: s,
                    dangling: vec![(s, 1)],
                });
            }
            Post::Plus => {
                let e = stack.pop().expect("postfix arity checked in parser");
                let s = push_state(&mut states, Label::Split);
                states[s].out[0] = Some(e.start);
                patch(&mut states, &e.dangling, s);
                stack.push(Fragment {
                    start: e.start,
                    dangling: vec![(s, 1)],
                });
            }
        }
    }

    let e = stack.pop().expect("parser guarantees one result fragment");
    debug_assert!(stack.is_empty());
    let m = push_state(&mut states, Label::Match);
    patch(&mut states, &e.dangling, m);
    trace!(target = "nfa", states = states.len(), "compiled");
    Ok(Nfa {
        states,
        start: e.start,
    })
}

// -------------------------------------------------------------------------------------------------
// Matching
// -------------------------------------------------------------------------------------------------

impl Nfa {
    /// Add a state and everything ε-reachable from it.
    fn add_state(&self, idx: usize, set: &mut SmallVec<[usize; 8]>, seen: &mut [bool]) {
        if seen[idx] {
            return;
        }
        seen[idx] = true;
        if self.states[idx].label == Label::Split {
            for slot in self.states[idx].out.iter().flatten() {
                self.add_state(*slot, set, seen);
            }
        } else {
            set.push(idx);
        }
    }

    fn start_set(&self) -> SmallVec<[usize; 8]> {
        let mut seen = vec![false; self.states.len()];
        let mut set = SmallVec::new();
        self.add_state(self.start, &mut set, &mut seen);
        set
    }

    fn step(
        &self,
        current: &[usize],
        token: &str,
        predicate: &dyn Fn(&str, &str) -> bool,
    ) -> SmallVec<[usize; 8]> {
        let mut seen = vec![false; self.states.len()];
        let mut next = SmallVec::new();
        for &idx in current {
            if let Label::Token(name) = &self.states[idx].label
                && predicate(token, name)
                && let Some(out) = self.states[idx].out[0]
            {
                self.add_state(out, &mut next, &mut seen);
            }
        }
        next
    }
}

/// A compiled grammar plus the predicate that decides token identity.
///
/// Compilation happens on first use and is cached; the compiled graph is
/// immutable and the matcher may be shared across threads. Matching state
/// is per-call.
pub struct NfaMatcher<P>
where
    P: Fn(&str, &str) -> bool,
{
    syntax: String,
    predicate: P,
    compiled: OnceLock<Result<Nfa, GrammarError>>,
}

impl<P> NfaMatcher<P>
where
    P: Fn(&str, &str) -> bool,
{
    pub fn new(syntax: impl Into<String>, predicate: P) -> Self {
        Self {
            syntax: syntax.into(),
            predicate,
            compiled: OnceLock::new(),
        }
    }

    pub fn syntax(&self) -> &str {
        &self.syntax
    }

    fn nfa(&self) -> Result<&Nfa, GrammarError> {
        self.compiled
            .get_or_init(|| compile(&self.syntax))
            .as_ref()
            .map_err(|e| e.clone())
    }

    /// Force compilation, surfacing grammar errors eagerly.
    pub fn compile(&self) -> Result<(), GrammarError> {
        self.nfa().map(|_| ())
    }

    /// Does the whole token sequence end in the accept state?
    pub fn matches(&self, tokens: &[&str]) -> Result<bool, GrammarError> {
        let nfa = self.nfa()?;
        let mut current = nfa.start_set();
        for token in tokens {
            current = nfa.step(&current, token, &self.predicate);
            if current.is_empty() {
                return Ok(false);
            }
        }
        Ok(current
            .iter()
            .any(|&idx| nfa.states[idx].label == Label::Match))
    }

    /// The set of token names that could legally follow the sequence.
    pub fn match_partial(&self, tokens: &[&str]) -> Result<BTreeSet<String>, GrammarError> {
        let nfa = self.nfa()?;
        let mut current = nfa.start_set();
        for token in tokens {
            current = nfa.step(&current, token, &self.predicate);
            if current.is_empty() {
                break;
            }
        }
        Ok(current
            .iter()
            .filter_map(|&idx| match &nfa.states[idx].label {
                Label::Token(name) => Some(name.clone()),
                _ => None,
            })
            .collect())
    }
}

/// Matcher whose predicate is plain string equality.
pub fn identity_matcher(syntax: impl Into<String>) -> NfaMatcher<fn(&str, &str) -> bool> {
    NfaMatcher::new(syntax, |token, label| token == label)
}
