//! Event Shape
//!
//! The subset of a signed network event that policies inspect. Signature and id
//! validation happen before an event reaches any evaluator.

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Event kind numbers used by the built-in policies
pub mod kind {
	/// Short text note
	pub const TEXT_NOTE: u32 = 1;
	/// Repost of a text note
	pub const REPOST: u32 = 6;
	/// Repost of any other kind
	pub const GENERIC_REPOST: u32 = 16;
	/// Ephemeral geohash chat message
	pub const EPHEMERAL_CHAT: u32 = 20000;
	/// Ephemeral channel chat message
	pub const EPHEMERAL_CHANNEL_CHAT: u32 = 23333;
}

/// A network event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
	/// Lowercase hex event id
	#[serde(default)]
	pub id: String,
	/// Lowercase hex public key of the author
	#[serde(default)]
	pub pubkey: String,
	/// Creation time in unix seconds
	#[serde(default)]
	pub created_at: i64,
	pub kind: u32,
	#[serde(default)]
	pub tags: Vec<Vec<String>>,
	#[serde(default)]
	pub content: String,
	#[serde(default)]
	pub sig: String,
}

impl Event {
	/// Parse an event from its JSON wire form
	pub fn from_json(json: &str) -> RgResult<Self> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn to_json(&self) -> RgResult<String> {
		Ok(serde_json::to_string(self)?)
	}

	/// Whether any tag has the given name (ASCII case-insensitive)
	pub fn has_tag(&self, name: &str) -> bool {
		self.find_tag(name).is_some()
	}

	/// First tag with the given name (ASCII case-insensitive)
	pub fn find_tag(&self, name: &str) -> Option<&[String]> {
		self.tags
			.iter()
			.find(|t| t.first().is_some_and(|n| n.eq_ignore_ascii_case(name)))
			.map(Vec::as_slice)
	}
}


// vim: ts=4
