//! Chat Flood Guard
//!
//! Spam heuristics for ephemeral chat kinds. Checks run in a fixed order and the
//! first failure wins:
//!
//! 1. minimum delay between posts of one identity
//! 2. uppercase ratio among letters
//! 3. runs of one repeated character
//! 4. over-long whitespace-delimited words
//! 5. combining marks ("zalgo")
//! 6. per-identity token bucket, which valid proof-of-work can override

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use relayguard_types::SharedPowValidator;
use tracing::debug;

use crate::cache::TimedCache;
use crate::config::{validate_rate, CharRange, FloodConfig};
use crate::keying::IdentityKey;
use crate::limiter::TokenBucketLimiter;
use crate::prelude::*;

const DEFAULT_MIN_LETTERS: usize = 20;
const DEFAULT_CACHE_SIZE: usize = 10_000;

pub struct FloodGuard {
	config: FloodConfig,
	kinds: HashSet<u32>,
	min_letters: usize,
	last_seen: TimedCache<IdentityKey, Instant>,
	limiters: TimedCache<IdentityKey, Arc<TokenBucketLimiter>>,
	pow: SharedPowValidator,
	clock: SharedClock,
}

impl FloodGuard {
	pub fn new(config: &FloodConfig, pow: SharedPowValidator) -> RgResult<Self> {
		Self::with_clock(config, pow, SystemClock::shared())
	}

	pub fn with_clock(
		config: &FloodConfig,
		pow: SharedPowValidator,
		clock: SharedClock,
	) -> RgResult<Self> {
		validate_rate("flood rate limit", config.rate_limit_rate)?;
		if config.max_caps_ratio.is_nan() {
			return Err(Error::ConfigError("flood max caps ratio is not a number".into()));
		}
		if let Some(range) = config.zalgo_ranges.iter().find(|r| r.start > r.end) {
			return Err(Error::ConfigError(format!(
				"inverted zalgo range U+{:04X}..U+{:04X}",
				u32::from(range.start),
				u32::from(range.end)
			)));
		}

		let cache_size =
			if config.cache_size == 0 { DEFAULT_CACHE_SIZE } else { config.cache_size };
		let min_letters = if config.min_letters_for_caps_check == 0 {
			DEFAULT_MIN_LETTERS
		} else {
			config.min_letters_for_caps_check
		};

		Ok(Self {
			config: config.clone(),
			kinds: config.kinds.iter().copied().collect(),
			min_letters,
			last_seen: TimedCache::new(cache_size, config.last_seen_ttl, clock.clone()),
			limiters: TimedCache::new(cache_size, config.limiter_ttl, clock.clone()),
			pow,
			clock,
		})
	}

	pub fn is_enabled(&self) -> bool {
		self.config.enabled
	}

	pub fn applies_to(&self, kind: u32) -> bool {
		self.config.enabled && self.kinds.contains(&kind)
	}

	pub fn check(&self, event: &Event) -> Verdict {
		if !self.applies_to(event.kind) {
			return Verdict::Allow;
		}
		let identity = IdentityKey::bare_pubkey(&event.pubkey);

		let verdict = self
			.check_delay(&identity)
			.or_else(|| self.check_caps(&event.content))
			.or_else(|| self.check_repeats(&event.content))
			.or_else(|| self.check_word_length(&event.content))
			.or_else(|| self.check_zalgo(&event.content))
			.or_else(|| self.check_rate(&identity, event))
			.map_or(Verdict::Allow, Verdict::Deny);

		if let Verdict::Deny(reason) = &verdict {
			debug!("chat flood rejection for {}: {}", event.pubkey, reason);
		}
		verdict
	}

	/// A rejected attempt leaves the last-seen time alone; a passing one records
	/// it, under the same lock, before any later check runs.
	fn check_delay(&self, identity: &IdentityKey) -> Option<String> {
		let min_delay = self.config.min_delay;
		if min_delay.is_zero() {
			return None;
		}

		let now = self.clock.now();
		let too_soon = self.last_seen.decide_with(identity.clone(), |last| {
			match last.map(|&last| now.saturating_duration_since(last)) {
				Some(delay) if delay < min_delay => (None, Some(delay)),
				_ => (Some(now), None),
			}
		});
		too_soon.map(|delay| {
			format!(
				"blocked: posting too frequently in chat (delay: {:?}, limit: {:?})",
				round_to_millis(delay),
				min_delay
			)
		})
	}

	fn check_caps(&self, content: &str) -> Option<String> {
		let max_ratio = self.config.max_caps_ratio;
		if max_ratio <= 0.0 {
			return None;
		}

		let (letters, caps) = content
			.chars()
			.filter(|c| c.is_alphabetic())
			.fold((0usize, 0usize), |(l, u), c| (l + 1, u + usize::from(c.is_uppercase())));
		if letters < self.min_letters {
			return None;
		}

		#[allow(clippy::cast_precision_loss)]
		let ratio = caps as f64 / letters as f64;
		(ratio > max_ratio).then(|| {
			format!(
				"blocked: excessive use of capital letters (ratio: {:.2}, limit: {:.2})",
				ratio, max_ratio
			)
		})
	}

	fn check_repeats(&self, content: &str) -> Option<String> {
		let max = self.config.max_repeat_chars;
		if max == 0 {
			return None;
		}

		let mut run = 0;
		let mut prev = None;
		for c in content.chars() {
			run = if prev == Some(c) { run + 1 } else { 1 };
			prev = Some(c);
			if run >= max {
				return Some(format!(
					"blocked: excessive character repetition (count: {}, limit: {})",
					run, max
				));
			}
		}
		None
	}

	fn check_word_length(&self, content: &str) -> Option<String> {
		let max = self.config.max_word_length;
		if max == 0 {
			return None;
		}

		content.split_whitespace().any(|word| word.chars().count() >= max).then(|| {
			format!("blocked: message contains words that are too long (limit: {})", max)
		})
	}

	fn check_zalgo(&self, content: &str) -> Option<String> {
		if !self.config.block_zalgo {
			return None;
		}

		let ranges: &[CharRange] = &self.config.zalgo_ranges;
		content
			.chars()
			.any(|c| ranges.iter().any(|r| r.contains(c)))
			.then(|| "blocked: message contains Zalgo text".to_string())
	}

	fn check_rate(&self, identity: &IdentityKey, event: &Event) -> Option<String> {
		let rate = self.config.rate_limit_rate;
		if rate <= 0.0 {
			return None;
		}

		let limiter = self.limiters.get_or_insert_with(identity.clone(), || {
			Arc::new(TokenBucketLimiter::new(rate, self.config.rate_limit_burst, self.clock.clone()))
		});
		if limiter.allow() {
			return None;
		}

		let required = self.config.required_pow_on_limit;
		if self.pow.is_valid(event, required) {
			debug!("chat rate limit for {} overridden by proof-of-work", event.pubkey);
			return None;
		}
		Some(format!(
			"blocked: chat rate limit exceeded. Attach PoW of difficulty {} to send",
			required
		))
	}

	/// Identities with a recorded last post
	pub fn tracked_identities(&self) -> usize {
		self.last_seen.len()
	}
}

/// Nearest millisecond, halves rounded up
fn round_to_millis(d: Duration) -> Duration {
	let millis = (d.as_nanos() + 500_000) / 1_000_000;
	Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

impl Evaluator for FloodGuard {
	fn name(&self) -> &'static str {
		"flood"
	}

	fn evaluate(&self, event: &Event, _meta: &mut RequestMeta) -> RgResult<Verdict> {
		Ok(self.check(event))
	}
}


// vim: ts=4
