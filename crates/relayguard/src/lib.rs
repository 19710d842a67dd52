//! Relayguard is an anti-abuse policy engine for Nostr-style event relays.
//!
//! # Evaluators
//!
//! - per-kind rate limiting by network address and/or public key
//! - emergency throttling of never-seen public keys
//! - repost ratio enforcement
//! - chat flood heuristics with a proof-of-work override
//! - language allow-listing through a pluggable classifier
//!
//! Each evaluator answers one event at a time with a [`Verdict`]. Building them
//! from one [`PolicyConfig`] is what [`PolicySetBuilder`] is for; chaining the
//! verdicts into a final decision is left to the caller.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub use relayguard_core as engine;
pub use relayguard_types as types;

pub use relayguard_types::{
	kind, ConfigWarning, Error, Evaluator, Event, RequestMeta, RgResult, Verdict,
};

pub mod config;
pub mod policy_set;
pub mod prelude;

pub use crate::config::PolicyConfig;
pub use crate::policy_set::{PolicySet, PolicySetBuilder};

// vim: ts=4
