//! Core admission engine for the CVP canonical validation protocol.
//!
//! Every message crossing a protocol boundary runs a single forward pipeline:
//! - Canonical-form reduction, so encoding-equivalent inputs become
//!   bit-identical before any decision is made (`normalize`)
//! - A minimized DFA that recognizes canonical message shape and fingerprints
//!   it (`automaton`)
//! - Schema-directed field checks (`validate`, descriptors from `cvp-schema`)
//! - An information-theoretic admission cost discretized into governance
//!   zones (`cost`)
//! - One audit entry per terminating path (`cvp-audit`)
//!
//! The normalization stage is mandatory and non-bypassable: with zero-trust
//! enforcement (the default), no payload reaches the recognizer or the field
//! checks in its raw form.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod automaton;
pub mod buffer;
pub mod cost;
pub mod error;
pub mod hash;
pub mod normalize;
pub mod validate;

pub use automaton::Dfa;
pub use buffer::{Buffer, SecurityLevel, HASH_SIZE, MAX_BUFFER_SIZE};
pub use cost::{CostEvaluator, GovernanceZone, ALPHA_DEFAULT, BETA_DEFAULT};
pub use error::{Error, Result, ResultCode};
pub use normalize::Normalizer;
pub use validate::{UnnormalizedInput, Validator, ValidatorConfig};
