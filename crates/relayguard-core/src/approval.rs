//! Approval Cache
//!
//! Remembers identities whose content already passed an expensive classification,
//! so later events from them skip the classifier until the entry expires.

use std::time::Duration;

use crate::cache::TimedCache;
use crate::keying::IdentityKey;
use crate::prelude::*;

/// Per-identity approval memo. A zero size or TTL disables it entirely.
pub struct ApprovalCache {
	approved: Option<TimedCache<IdentityKey, ()>>,
}

impl ApprovalCache {
	pub fn new(size: usize, ttl: Duration, clock: SharedClock) -> Self {
		let approved = (size > 0 && !ttl.is_zero()).then(|| TimedCache::new(size, ttl, clock));
		Self { approved }
	}

	pub fn disabled() -> Self {
		Self { approved: None }
	}

	pub fn is_enabled(&self) -> bool {
		self.approved.is_some()
	}

	pub fn is_approved(&self, pubkey: &str) -> bool {
		self.approved.as_ref().is_some_and(|c| c.contains(&IdentityKey::bare_pubkey(pubkey)))
	}

	/// Record a successful classification. The entry's TTL restarts.
	pub fn approve(&self, pubkey: &str) {
		if let Some(cache) = &self.approved {
			cache.put(IdentityKey::bare_pubkey(pubkey), ());
		}
	}

	pub fn len(&self) -> usize {
		self.approved.as_ref().map_or(0, TimedCache::len)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relayguard_types::MockClock;

	#[test]
	fn test_approve_and_expire() {
		let clock = MockClock::starting_now();
		let cache = ApprovalCache::new(10, Duration::from_secs(60), clock.shared());
		assert!(cache.is_enabled());
		assert!(!cache.is_approved("abc"));

		cache.approve("ABC");
		assert!(cache.is_approved("abc"));
		assert_eq!(cache.len(), 1);

		clock.advance(Duration::from_secs(61));
		assert!(!cache.is_approved("abc"));
	}

	#[test]
	fn test_zero_size_or_ttl_disables() {
		let clock = MockClock::starting_now();
		for cache in [
			ApprovalCache::new(0, Duration::from_secs(60), clock.shared()),
			ApprovalCache::new(10, Duration::ZERO, clock.shared()),
			ApprovalCache::disabled(),
		] {
			assert!(!cache.is_enabled());
			cache.approve("abc");
			assert!(!cache.is_approved("abc"));
			assert!(cache.is_empty());
		}
	}
}

// vim: ts=4
