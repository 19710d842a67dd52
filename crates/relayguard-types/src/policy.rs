//! Evaluator Contract
//!
//! Every policy consumes an event plus request metadata and returns a verdict.
//! Evaluators own their state and never call each other.

use std::collections::HashMap;
use std::fmt;

use crate::event::Event;
use crate::prelude::*;

/// Metadata key under which the detected content language is published
pub const META_LANGUAGE: &str = "language";

/// Outcome of evaluating one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
	Allow,
	/// Rejected, with a human-readable reason
	Deny(String),
}

impl Verdict {
	pub fn deny(reason: impl Into<String>) -> Self {
		Verdict::Deny(reason.into())
	}

	pub fn is_allowed(&self) -> bool {
		matches!(self, Verdict::Allow)
	}

	pub fn is_denied(&self) -> bool {
		!self.is_allowed()
	}

	/// Rejection reason, present iff denied
	pub fn reason(&self) -> Option<&str> {
		match self {
			Verdict::Allow => None,
			Verdict::Deny(reason) => Some(reason),
		}
	}
}

impl fmt::Display for Verdict {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Verdict::Allow => f.write_str("allowed"),
			Verdict::Deny(reason) => f.write_str(reason),
		}
	}
}

/// Per-request side channel.
///
/// Carries the caller's network address in, and lets evaluators publish derived
/// facts (such as the detected language) for downstream consumers.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
	remote_ip: Option<String>,
	facts: HashMap<String, String>,
}

impl RequestMeta {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_remote_ip(remote_ip: impl Into<String>) -> Self {
		Self { remote_ip: Some(remote_ip.into()), facts: HashMap::new() }
	}

	/// Caller address, if known and non-empty
	pub fn remote_ip(&self) -> Option<&str> {
		self.remote_ip.as_deref().filter(|ip| !ip.is_empty())
	}

	pub fn set_remote_ip(&mut self, remote_ip: impl Into<String>) {
		self.remote_ip = Some(remote_ip.into());
	}

	pub fn publish(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.facts.insert(key.into(), value.into());
	}

	pub fn fact(&self, key: &str) -> Option<&str> {
		self.facts.get(key).map(String::as_str)
	}
}

/// A single composable policy.
///
/// `Ok(Verdict::Deny(..))` is an expected outcome. `Err(..)` signals an
/// operational failure; the caller decides whether that fails open or closed.
pub trait Evaluator: Send + Sync {
	/// Short stable name used in logs
	fn name(&self) -> &'static str;

	fn evaluate(&self, event: &Event, meta: &mut RequestMeta) -> RgResult<Verdict>;
}


// vim: ts=4
