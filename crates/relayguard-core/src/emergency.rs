//! Emergency Guard
//!
//! Volumetric defense that bounds the rate of *new* public keys admitted,
//! independently of per-identity throttling. Identities that passed recently
//! sit in a "recently seen" cache and bypass the throttle until that entry
//! expires; afterwards they are evaluated as new again. This keeps state bounded
//! without any persistent memory of past identities.
//!
//! Check order for an unseen identity: per-address limiter (when enabled and the
//! caller address is known), then the global new-identity limiter. A per-address
//! rejection does not charge the global limiter.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::TimedCache;
use crate::config::{validate_rate, EmergencyConfig, PerAddressConfig};
use crate::keying::{normalize_address, AddressPrefixes, IdentityKey};
use crate::limiter::TokenBucketLimiter;
use crate::prelude::*;

struct PerAddressThrottle {
	limiters: TimedCache<String, Arc<TokenBucketLimiter>>,
	rate: f64,
	burst: u32,
	prefixes: AddressPrefixes,
}

impl PerAddressThrottle {
	fn new(config: &PerAddressConfig, clock: SharedClock) -> Self {
		Self {
			limiters: TimedCache::new(config.cache_size, config.ttl, clock),
			rate: config.rate,
			burst: config.burst,
			prefixes: config.prefixes(),
		}
	}

	fn allow(&self, remote_ip: &str, clock: &SharedClock) -> bool {
		if self.rate <= 0.0 {
			return true;
		}
		let key = normalize_address(remote_ip, self.prefixes.v4, self.prefixes.v6);
		let limiter = self.limiters.get_or_insert_with(key, || {
			Arc::new(TokenBucketLimiter::new(self.rate, self.burst, clock.clone()))
		});
		limiter.allow()
	}
}

struct GuardState {
	new_key_limiter: TokenBucketLimiter,
	recently_seen: TimedCache<IdentityKey, ()>,
	per_address: Option<PerAddressThrottle>,
	clock: SharedClock,
}

impl GuardState {
	/// Per-address limiter first (when enabled and the address is known), then
	/// the global bucket. A per-address rejection leaves the global bucket alone.
	fn admit(&self, identity: &IdentityKey, meta: &RequestMeta) -> Verdict {
		if let (Some(per_address), Some(remote_ip)) = (&self.per_address, meta.remote_ip()) {
			if !per_address.allow(remote_ip, &self.clock) {
				debug!("emergency per-ip limit hit for {} from {}", identity, remote_ip);
				return Verdict::deny("blocked: emergency per-ip limit for new pubkeys exceeded");
			}
		}

		if !self.new_key_limiter.allow() {
			debug!("emergency global limit hit for {}", identity);
			return Verdict::deny("blocked: emergency global limit for new pubkeys exceeded");
		}
		Verdict::Allow
	}
}

pub struct EmergencyGuard {
	state: Option<GuardState>,
}

impl EmergencyGuard {
	pub fn new(config: &EmergencyConfig) -> RgResult<Self> {
		Self::with_clock(config, SystemClock::shared())
	}

	pub fn with_clock(config: &EmergencyConfig, clock: SharedClock) -> RgResult<Self> {
		if !config.enabled {
			return Ok(Self { state: None });
		}

		validate_rate("emergency new key rate", config.new_keys_rate)?;
		validate_rate("emergency per-ip rate", config.per_ip.rate)?;

		let per_address = config
			.per_ip
			.enabled
			.then(|| PerAddressThrottle::new(&config.per_ip, clock.clone()));

		info!(
			"emergency guard: new keys {}/s burst {}, per-ip {}",
			config.new_keys_rate,
			config.new_keys_burst,
			if per_address.is_some() { "on" } else { "off" }
		);

		Ok(Self {
			state: Some(GuardState {
				new_key_limiter: TokenBucketLimiter::new(
					config.new_keys_rate,
					config.new_keys_burst,
					clock.clone(),
				),
				recently_seen: TimedCache::new(config.cache_size, config.ttl, clock.clone()),
				per_address,
				clock,
			}),
		})
	}

	pub fn is_enabled(&self) -> bool {
		self.state.is_some()
	}

	pub fn check(&self, event: &Event, meta: &RequestMeta) -> Verdict {
		let Some(state) = &self.state else {
			return Verdict::Allow;
		};
		if event.pubkey.is_empty() {
			return Verdict::Allow;
		}

		// The seen cache stays locked while a new identity is charged, so
		// concurrent first sightings of one identity are charged once
		let identity = IdentityKey::bare_pubkey(&event.pubkey);
		state.recently_seen.decide_with(identity.clone(), |seen| {
			if seen.is_some() {
				return (None, Verdict::Allow);
			}
			let verdict = state.admit(&identity, meta);
			(verdict.is_allowed().then_some(()), verdict)
		})
	}

	/// Whether `pubkey` currently bypasses the new-identity throttle
	pub fn is_recently_seen(&self, pubkey: &str) -> bool {
		self.state
			.as_ref()
			.is_some_and(|s| s.recently_seen.contains(&IdentityKey::bare_pubkey(pubkey)))
	}

}

impl Evaluator for EmergencyGuard {
	fn name(&self) -> &'static str {
		"emergency"
	}

	fn evaluate(&self, event: &Event, meta: &mut RequestMeta) -> RgResult<Verdict> {
		Ok(self.check(event, meta))
	}
}


// vim: ts=4
