//! Rate Limiter Engine
//!
//! Per-kind, per-identity token-bucket throttling. Each event kind resolves to
//! an explicit rule or the default rule once, at construction. Limiters live in
//! a bounded timed cache keyed by `(rule id, dimension key)`.
//!
//! Key evaluation order is part of the contract: with [`RateDimension::Both`]
//! the address key is checked before the public-key key, and evaluation stops at
//! the first rejecting key. Keys after the rejecting one are not charged.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::TimedCache;
use crate::config::{validate_rate, RateDimension, RateLimiterConfig};
use crate::keying::{AddressPrefixes, IdentityKey};
use crate::limiter::TokenBucketLimiter;
use crate::prelude::*;

const DEFAULT_RULE_ID: &str = "default";

/// A rule with its identifier, ready for per-event lookup
#[derive(Debug)]
struct ResolvedRule {
	id: Box<str>,
	description: Box<str>,
	rate: f64,
	burst: u32,
}

pub struct RateLimiterEngine {
	enabled: bool,
	by: RateDimension,
	prefixes: AddressPrefixes,
	default_rule: Arc<ResolvedRule>,
	kind_rules: HashMap<u32, Arc<ResolvedRule>>,
	limiters: TimedCache<IdentityKey, Arc<TokenBucketLimiter>>,
	clock: SharedClock,
}

impl RateLimiterEngine {
	pub fn new(config: &RateLimiterConfig) -> RgResult<(Self, Vec<ConfigWarning>)> {
		Self::with_clock(config, SystemClock::shared())
	}

	pub fn with_clock(
		config: &RateLimiterConfig,
		clock: SharedClock,
	) -> RgResult<(Self, Vec<ConfigWarning>)> {
		validate_rate("rate limiter default rate", config.default_rate)?;

		let mut warnings = Vec::new();
		let mut kind_rules: HashMap<u32, Arc<ResolvedRule>> = HashMap::new();

		for (idx, rule) in config.rules.iter().enumerate() {
			let id = format!("rule-{}", idx);
			validate_rate(&format!("rate of {}", id), rule.rate)?;

			if rule.kinds.is_empty() {
				warnings.push(ConfigWarning::new(format!(
					"Rate limit rule {} ({}) lists no kinds and never applies",
					id, rule.description
				)));
				continue;
			}

			let description =
				if rule.description.is_empty() { id.clone() } else { rule.description.clone() };
			let resolved = Arc::new(ResolvedRule {
				id: id.clone().into_boxed_str(),
				description: description.into_boxed_str(),
				rate: rule.rate,
				burst: rule.burst,
			});

			for kind in &rule.kinds {
				if let Some(prev) = kind_rules.insert(*kind, resolved.clone()) {
					warnings.push(ConfigWarning::new(format!(
						"Kind {} is claimed by both {} and {}; {} wins",
						kind, prev.id, id, id
					)));
				}
			}
		}

		let default_rule = Arc::new(ResolvedRule {
			id: DEFAULT_RULE_ID.into(),
			description: DEFAULT_RULE_ID.into(),
			rate: config.default_rate,
			burst: config.default_burst,
		});

		info!(
			"rate limiter: {} kind rules, default rate {}/s burst {}, by {:?}",
			kind_rules.len(),
			config.default_rate,
			config.default_burst,
			config.by
		);

		let engine = Self {
			enabled: config.enabled,
			by: config.by,
			prefixes: config.prefixes(),
			default_rule,
			kind_rules,
			limiters: TimedCache::new(config.cache_size, config.ttl, clock.clone()),
			clock,
		};
		Ok((engine, warnings))
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	fn rule_for(&self, kind: u32) -> &ResolvedRule {
		self.kind_rules.get(&kind).unwrap_or(&self.default_rule)
	}

	/// Identity keys to charge, in evaluation order (address, then public key)
	pub fn identity_keys(&self, event: &Event, meta: &RequestMeta) -> Vec<IdentityKey> {
		let address = || meta.remote_ip().map(|ip| IdentityKey::address(ip, self.prefixes));
		let pubkey = || {
			if event.pubkey.is_empty() { None } else { Some(IdentityKey::pubkey(&event.pubkey)) }
		};

		match self.by {
			RateDimension::Address => address().into_iter().collect(),
			RateDimension::Identity => pubkey().into_iter().collect(),
			RateDimension::Both => address().into_iter().chain(pubkey()).collect(),
		}
	}

	fn limiter_for(&self, key: IdentityKey, rule: &ResolvedRule) -> Arc<TokenBucketLimiter> {
		self.limiters.get_or_insert_with(key, || {
			Arc::new(TokenBucketLimiter::new(rule.rate, rule.burst, self.clock.clone()))
		})
	}

	pub fn check(&self, event: &Event, meta: &RequestMeta) -> Verdict {
		if !self.enabled {
			return Verdict::Allow;
		}

		let rule = self.rule_for(event.kind);
		if rule.rate <= 0.0 {
			return Verdict::Allow;
		}

		for key in self.identity_keys(event, meta) {
			let limiter = self.limiter_for(key.scoped(&rule.id), rule);
			if !limiter.allow() {
				debug!("rate limit hit for {} under {}", key, rule.id);
				return Verdict::deny(format!(
					"blocked: rate limit exceeded for {}",
					rule.description
				));
			}
		}

		Verdict::Allow
	}

	/// Number of limiter entries currently held
	pub fn tracked_limiters(&self) -> usize {
		self.limiters.len()
	}
}

impl Evaluator for RateLimiterEngine {
	fn name(&self) -> &'static str {
		"rate_limiter"
	}

	fn evaluate(&self, event: &Event, meta: &mut RequestMeta) -> RgResult<Verdict> {
		Ok(self.check(event, meta))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::RateLimitRule;
	use relayguard_types::MockClock;
	use std::time::Duration;

	fn event(kind: u32, pubkey: &str) -> Event {
		Event { kind, pubkey: pubkey.into(), ..Default::default() }
	}

	fn config(by: RateDimension) -> RateLimiterConfig {
		RateLimiterConfig {
			enabled: true,
			default_rate: 1.0,
			default_burst: 2,
			rules: vec![RateLimitRule {
				description: "reactions".into(),
				kinds: vec![7],
				rate: 1.0,
				burst: 1,
			}],
			by,
			..Default::default()
		}
	}

	fn engine(cfg: &RateLimiterConfig) -> (RateLimiterEngine, MockClock) {
		let clock = MockClock::starting_now();
		let (engine, warnings) = RateLimiterEngine::with_clock(cfg, clock.shared()).unwrap();
		assert!(warnings.is_empty());
		(engine, clock)
	}

	#[test]
	fn test_default_rule_burst_then_refill() {
		let (engine, clock) = engine(&config(RateDimension::Identity));
		let meta = RequestMeta::new();
		let ev = event(1, "alice");

		assert!(engine.check(&ev, &meta).is_allowed());
		assert!(engine.check(&ev, &meta).is_allowed());
		let verdict = engine.check(&ev, &meta);
		assert_eq!(verdict.reason(), Some("blocked: rate limit exceeded for default"));

		clock.advance(Duration::from_secs(1));
		assert!(engine.check(&ev, &meta).is_allowed());
	}

	#[test]
	fn test_kind_rule_used_and_separate_from_default() {
		let (engine, _) = engine(&config(RateDimension::Identity));
		let meta = RequestMeta::new();

		assert!(engine.check(&event(7, "alice"), &meta).is_allowed());
		let verdict = engine.check(&event(7, "alice"), &meta);
		assert_eq!(verdict.reason(), Some("blocked: rate limit exceeded for reactions"));

		// Default bucket for the same identity is untouched
		assert!(engine.check(&event(1, "alice"), &meta).is_allowed());
	}

	#[test]
	fn test_zero_rate_allows_unconditionally() {
		let mut cfg = config(RateDimension::Both);
		cfg.rules[0].rate = 0.0;
		let (engine, _) = engine(&cfg);
		let meta = RequestMeta::with_remote_ip("192.0.2.1");

		for _ in 0..100 {
			assert!(engine.check(&event(7, "alice"), &meta).is_allowed());
		}
		assert_eq!(engine.tracked_limiters(), 0);
	}

	#[test]
	fn test_disabled_allows_everything() {
		let mut cfg = config(RateDimension::Both);
		cfg.enabled = false;
		cfg.default_burst = 0;
		let (engine, _) = engine(&cfg);
		assert!(engine.check(&event(1, "alice"), &RequestMeta::new()).is_allowed());
	}

	#[test]
	fn test_identity_keys_order() {
		let (both, _) = engine(&config(RateDimension::Both));
		let meta = RequestMeta::with_remote_ip("192.0.2.1");
		let keys: Vec<String> =
			both.identity_keys(&event(1, "AB"), &meta).iter().map(ToString::to_string).collect();
		assert_eq!(keys, vec!["ip:192.0.2.1", "pk:ab"]);

		let (address_only, _) = engine(&config(RateDimension::Address));
		assert!(address_only.identity_keys(&event(1, "ab"), &RequestMeta::new()).is_empty());
	}

	#[test]
	fn test_both_short_circuits_on_address() {
		let (engine, _) = engine(&config(RateDimension::Both));
		let shared_ip = RequestMeta::with_remote_ip("192.0.2.1");

		// Two different identities exhaust the shared address bucket (burst 2)
		assert!(engine.check(&event(1, "alice"), &shared_ip).is_allowed());
		assert!(engine.check(&event(1, "bob"), &shared_ip).is_allowed());

		// Address rejects first; bob's pubkey bucket is not charged
		assert!(engine.check(&event(1, "bob"), &shared_ip).is_denied());

		let other_ip = RequestMeta::with_remote_ip("198.51.100.1");
		assert!(engine.check(&event(1, "bob"), &other_ip).is_allowed());
		// bob has now spent exactly 2 tokens: one on 192.0.2.1, one here
		assert!(engine.check(&event(1, "bob"), &RequestMeta::with_remote_ip("203.0.113.9")).is_denied());
	}

	#[test]
	fn test_address_prefix_shares_bucket() {
		let mut cfg = config(RateDimension::Address);
		cfg.ipv4_prefix = 24;
		let (engine, _) = engine(&cfg);

		assert!(engine.check(&event(1, "a"), &RequestMeta::with_remote_ip("203.0.113.77")).is_allowed());
		assert!(engine.check(&event(1, "b"), &RequestMeta::with_remote_ip("203.0.113.5")).is_allowed());
		assert!(engine.check(&event(1, "c"), &RequestMeta::with_remote_ip("203.0.113.200")).is_denied());
		assert!(engine.check(&event(1, "c"), &RequestMeta::with_remote_ip("203.0.114.1")).is_allowed());
	}

	#[test]
	fn test_missing_identity_is_not_limited() {
		let (engine, _) = engine(&config(RateDimension::Address));
		for _ in 0..10 {
			assert!(engine.check(&event(1, "alice"), &RequestMeta::new()).is_allowed());
		}
	}

	#[test]
	fn test_limiter_expires_with_cache_ttl() {
		let mut cfg = config(RateDimension::Identity);
		cfg.default_rate = 0.001;
		cfg.default_burst = 1;
		cfg.ttl = Duration::from_secs(60);
		let (engine, clock) = engine(&cfg);
		let meta = RequestMeta::new();

		assert!(engine.check(&event(1, "alice"), &meta).is_allowed());
		assert!(engine.check(&event(1, "alice"), &meta).is_denied());

		clock.advance(Duration::from_secs(61));
		assert!(engine.check(&event(1, "alice"), &meta).is_allowed());
	}

	#[test]
	fn test_warnings_for_unusable_rules() {
		let cfg = RateLimiterConfig {
			enabled: true,
			rules: vec![
				RateLimitRule { description: "empty".into(), kinds: vec![], rate: 1.0, burst: 1 },
				RateLimitRule { description: "a".into(), kinds: vec![1], rate: 1.0, burst: 1 },
				RateLimitRule { description: "b".into(), kinds: vec![1], rate: 2.0, burst: 1 },
			],
			..Default::default()
		};
		let (engine, warnings) = RateLimiterEngine::new(&cfg).unwrap();
		assert_eq!(warnings.len(), 2);
		assert_eq!(&*engine.rule_for(1).description, "b");
	}

	#[test]
	fn test_nan_rate_is_fatal() {
		let mut cfg = config(RateDimension::Both);
		cfg.rules[0].rate = f64::NAN;
		assert!(matches!(RateLimiterEngine::new(&cfg), Err(Error::ConfigError(_))));
	}
}

// vim: ts=4
