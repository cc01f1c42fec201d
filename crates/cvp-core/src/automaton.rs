//! Minimized DFA recognition of canonical message shape.
//!
//! The recognizer accepts a flat object of `"name": "value"` pairs separated
//! by `,` and enclosed in `{...}`, with names from `[a-z0-9_]+` (case-folded
//! input; upper case is tolerated ahead of folding) and quoted values whose
//! content is printable ASCII excluding unescaped `"` and `\`. The quote is
//! a genuine delimiter: an unescaped `"` inside a value closes it, so an
//! embedded quote or an unquoted value rejects.
//!
//! The transition table is total: every unspecified `(state, byte)` pair
//! leads to the absorbing reject state. At construction the grammar machine
//! is minimized by partition refinement and re-emitted as a dense
//! `states × 256` table of class indices, read-only and shareable
//! afterwards. While running, every consumed byte feeds the pattern hasher;
//! acceptance yields the canonical fingerprint.

use crate::error::{Error, Result};
use crate::hash::PatternHasher;

/// Maximum number of recognizer states.
pub const MAX_DFA_STATES: usize = 256;

const ALPHABET: usize = 256;

// Grammar state indices before minimization.
const INITIAL: usize = 0;
const OBJECT_OPEN: usize = 1;
const FIELD_NAME: usize = 2;
const NAME_CLOSED: usize = 3;
const VALUE_OPEN: usize = 4;
const FIELD_VALUE: usize = 5;
const VALUE_CLOSED: usize = 6;
const ACCEPT: usize = 7;
const REJECT: usize = 8;
const GRAMMAR_STATES: usize = 9;

/// Build the grammar transition table, total over the byte alphabet.
fn build_grammar() -> Vec<[u16; ALPHABET]> {
    let mut table = vec![[REJECT as u16; ALPHABET]; GRAMMAR_STATES];

    // Leading whitespace is tolerated before the object opens.
    table[INITIAL][b'{' as usize] = OBJECT_OPEN as u16;
    for ws in [b' ', b'\t', b'\n', b'\r'] {
        table[INITIAL][ws as usize] = INITIAL as u16;
    }

    table[OBJECT_OPEN][b'"' as usize] = FIELD_NAME as u16;
    table[OBJECT_OPEN][b' ' as usize] = OBJECT_OPEN as u16;
    table[OBJECT_OPEN][b'}' as usize] = ACCEPT as u16; // empty object

    // Field names: [a-z0-9_], upper case tolerated ahead of folding.
    for byte in b'a'..=b'z' {
        table[FIELD_NAME][byte as usize] = FIELD_NAME as u16;
    }
    for byte in b'A'..=b'Z' {
        table[FIELD_NAME][byte as usize] = FIELD_NAME as u16;
    }
    for byte in b'0'..=b'9' {
        table[FIELD_NAME][byte as usize] = FIELD_NAME as u16;
    }
    table[FIELD_NAME][b'_' as usize] = FIELD_NAME as u16;
    table[FIELD_NAME][b'"' as usize] = NAME_CLOSED as u16;

    // Exactly one colon between name and value, spaces tolerated around it.
    table[NAME_CLOSED][b' ' as usize] = NAME_CLOSED as u16;
    table[NAME_CLOSED][b':' as usize] = VALUE_OPEN as u16;
    table[VALUE_OPEN][b' ' as usize] = VALUE_OPEN as u16;
    table[VALUE_OPEN][b'"' as usize] = FIELD_VALUE as u16;

    // Value content: printable ASCII minus unescaped `"` and `\`. The
    // closing quote is the only way out of the value.
    for byte in 0x20..=0x7Eu8 {
        if byte != b'"' && byte != b'\\' {
            table[FIELD_VALUE][byte as usize] = FIELD_VALUE as u16;
        }
    }
    table[FIELD_VALUE][b'"' as usize] = VALUE_CLOSED as u16;

    table[VALUE_CLOSED][b' ' as usize] = VALUE_CLOSED as u16;
    table[VALUE_CLOSED][b',' as usize] = OBJECT_OPEN as u16;
    table[VALUE_CLOSED][b'}' as usize] = ACCEPT as u16;

    // ACCEPT has no out-edges; REJECT absorbs.
    table
}

/// The minimized deterministic recognizer.
#[derive(Debug, Clone)]
pub struct Dfa {
    table: Vec<[u16; ALPHABET]>,
    accepting: Vec<bool>,
    initial: u16,
    reject: u16,
}

impl Dfa {
    /// Construct and minimize the canonical-shape recognizer.
    pub fn new() -> Self {
        let grammar = build_grammar();
        let mut accepting = vec![false; GRAMMAR_STATES];
        accepting[ACCEPT] = true;
        minimize(&grammar, &accepting, INITIAL, REJECT)
    }

    /// Number of states after minimization.
    ///
    /// An invariant of the grammar, not of the construction order.
    pub fn state_count(&self) -> usize {
        self.table.len()
    }

    /// Run the recognizer over a canonical payload.
    ///
    /// Feeds every consumed byte through the pattern hasher. Entering the
    /// reject state aborts immediately with `DFA_TRANSITION_FAILED`; running
    /// out of input anywhere but an accepting state is `VALIDATION_FAILED`.
    /// Acceptance returns the 32-bit canonical fingerprint.
    pub fn run(&self, input: &[u8]) -> Result<u32> {
        let mut state = self.initial;
        let mut hasher = PatternHasher::new();

        for (offset, &byte) in input.iter().enumerate() {
            hasher.update(&[byte]);
            let next = self.table[state as usize][byte as usize];
            if next == self.reject {
                return Err(Error::DfaTransitionFailed {
                    state: state as usize,
                    offset,
                });
            }
            state = next;
        }

        if self.accepting[state as usize] {
            Ok(hasher.finish32())
        } else {
            Err(Error::ValidationFailed(
                "input ended before the recognizer reached an accepting state".to_string(),
            ))
        }
    }

    /// Whether a payload is accepted, discarding the fingerprint.
    pub fn accepts(&self, input: &[u8]) -> bool {
        self.run(input).is_ok()
    }
}

impl Default for Dfa {
    fn default() -> Self {
        Self::new()
    }
}

/// Partition-refinement minimization.
///
/// The initial partition separates accepting from non-accepting states; a
/// block splits whenever two members disagree on the block of some
/// transition target. The loop terminates when a full pass makes no split,
/// which is a fixed point: re-running it on its own output changes nothing.
fn minimize(
    table: &[[u16; ALPHABET]],
    accepting: &[bool],
    initial: usize,
    reject: usize,
) -> Dfa {
    let n = table.len();
    let mut class: Vec<u16> = accepting.iter().map(|&a| u16::from(a)).collect();
    let mut class_count = 2;

    loop {
        // Signature of a state: its class plus the classes of all targets.
        // New class ids are assigned in order of first appearance by state
        // index, keeping the construction deterministic.
        let mut signatures: Vec<(u16, Vec<u16>)> = Vec::with_capacity(class_count);
        let mut next_class = vec![0u16; n];

        for state in 0..n {
            let targets: Vec<u16> = (0..ALPHABET)
                .map(|byte| class[table[state][byte] as usize])
                .collect();
            let key = (class[state], targets);
            let id = match signatures.iter().position(|sig| *sig == key) {
                Some(found) => found as u16,
                None => {
                    signatures.push(key);
                    (signatures.len() - 1) as u16
                }
            };
            next_class[state] = id;
        }

        let next_count = signatures.len();
        let stable = next_count == class_count && next_class == class;
        class = next_class;
        class_count = next_count;
        if stable {
            break;
        }
    }

    // Re-emit the dense table over equivalence classes, taking the first
    // member of each class as its representative.
    let mut representative = vec![usize::MAX; class_count];
    for state in 0..n {
        let c = class[state] as usize;
        if representative[c] == usize::MAX {
            representative[c] = state;
        }
    }

    let mut min_table = vec![[0u16; ALPHABET]; class_count];
    let mut min_accepting = vec![false; class_count];
    for (c, &rep) in representative.iter().enumerate() {
        for byte in 0..ALPHABET {
            min_table[c][byte] = class[table[rep][byte] as usize];
        }
        min_accepting[c] = accepting[rep];
    }

    Dfa {
        table: min_table,
        accepting: min_accepting,
        initial: class[initial],
        reject: class[reject],
    }
}
