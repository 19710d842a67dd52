//! NIP-13 Proof-of-Work
//!
//! The work of an event is the number of leading zero bits of its hex id.
//! Events may commit to a target difficulty in their `nonce` tag
//! (`["nonce", "<nonce>", "<target>"]`); a committed target below the required
//! difficulty does not count, even if the id happens to be lucky.

use relayguard_types::PowValidator;
use tracing::debug;

use crate::prelude::*;

/// Leading zero bits of a hex string. Non-hex input counts as no work.
pub fn leading_zero_bits(hex_id: &str) -> u32 {
	let mut bits = 0;
	for c in hex_id.chars() {
		let Some(nibble) = c.to_digit(16) else {
			return 0;
		};
		if nibble == 0 {
			bits += 4;
		} else {
			// nibble is 1..=15, so 28..=31 leading zeros in a u32
			return bits + nibble.leading_zeros() - 28;
		}
	}
	bits
}

/// Target difficulty committed in the `nonce` tag, if any
pub fn committed_target(event: &Event) -> Option<u32> {
	event.find_tag("nonce").and_then(|tag| tag.get(2)).and_then(|t| t.trim().parse().ok())
}

/// Validator implementing NIP-13 difficulty checks
#[derive(Debug, Clone, Copy, Default)]
pub struct Nip13Pow;

impl Nip13Pow {
	pub fn new() -> Self {
		Self
	}
}

impl PowValidator for Nip13Pow {
	fn is_valid(&self, event: &Event, difficulty: u32) -> bool {
		if difficulty == 0 {
			return true;
		}
		if let Some(target) = committed_target(event) {
			if target < difficulty {
				debug!("event {} commits to target {} < {}", event.id, target, difficulty);
				return false;
			}
		}
		leading_zero_bits(&event.id) >= difficulty
	}
}


// vim: ts=4
