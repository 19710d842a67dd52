//! Evaluator Configuration
//!
//! One struct per evaluator, deserializable from camelCase JSON. Missing fields
//! fall back to the `Default` impls. Durations are given in seconds, except the
//! flood guard's minimum inter-post delay which is in milliseconds.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};

use crate::keying::AddressPrefixes;
use crate::prelude::*;

/// Which identity facets the rate limiter charges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateDimension {
	/// Caller network address only
	#[serde(alias = "ip")]
	Address,
	/// Event public key only
	#[serde(alias = "pubkey")]
	Identity,
	/// Address first, then public key
	#[default]
	Both,
}

/// Per-kind rate override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitRule {
	pub description: String,
	pub kinds: Vec<u32>,
	/// Tokens per second; `<= 0` disables limiting for these kinds
	pub rate: f64,
	pub burst: u32,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimiterConfig {
	pub enabled: bool,
	pub default_rate: f64,
	pub default_burst: u32,
	pub rules: Vec<RateLimitRule>,
	pub by: RateDimension,
	pub cache_size: usize,
	/// Limiter entry lifetime (seconds)
	#[serde_as(as = "DurationSeconds<u64>")]
	pub ttl: Duration,
	pub ipv4_prefix: u8,
	pub ipv6_prefix: u8,
}

impl RateLimiterConfig {
	pub fn prefixes(&self) -> AddressPrefixes {
		AddressPrefixes::new(self.ipv4_prefix, self.ipv6_prefix)
	}
}

impl Default for RateLimiterConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			default_rate: 0.0,
			default_burst: 0,
			rules: Vec::new(),
			by: RateDimension::Both,
			cache_size: 65_536,
			ttl: Duration::from_secs(600),
			ipv4_prefix: 0,
			ipv6_prefix: 0,
		}
	}
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerAddressConfig {
	pub enabled: bool,
	pub rate: f64,
	pub burst: u32,
	pub cache_size: usize,
	/// Seconds
	#[serde_as(as = "DurationSeconds<u64>")]
	pub ttl: Duration,
	pub ipv4_prefix: u8,
	pub ipv6_prefix: u8,
}

impl PerAddressConfig {
	pub fn prefixes(&self) -> AddressPrefixes {
		AddressPrefixes::new(self.ipv4_prefix, self.ipv6_prefix)
	}
}

impl Default for PerAddressConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			rate: 1.0,
			burst: 5,
			cache_size: 10_000,
			ttl: Duration::from_secs(600),
			ipv4_prefix: 24,
			ipv6_prefix: 48,
		}
	}
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmergencyConfig {
	pub enabled: bool,
	/// Global admission rate for unseen public keys
	pub new_keys_rate: f64,
	pub new_keys_burst: u32,
	/// "Recently seen" cache size
	pub cache_size: usize,
	/// "Recently seen" lifetime (seconds)
	#[serde_as(as = "DurationSeconds<u64>")]
	pub ttl: Duration,
	pub per_ip: PerAddressConfig,
}

impl Default for EmergencyConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			new_keys_rate: 5.0,
			new_keys_burst: 20,
			cache_size: 50_000,
			ttl: Duration::from_secs(600),
			per_ip: PerAddressConfig::default(),
		}
	}
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepostAbuseConfig {
	pub enabled: bool,
	/// Activity sample size below which no identity is judged
	pub min_events: u32,
	/// Clamped to `0.0..=1.0` at construction
	pub max_ratio: f64,
	/// Inactivity after which counters restart (seconds, 0 = never)
	#[serde_as(as = "DurationSeconds<u64>")]
	pub reset_duration: Duration,
	pub count_reject_as_activity: bool,
	/// Quote reposts must also reference an event in their content
	pub require_quote_reference: bool,
	pub cache_size: usize,
	/// Seconds
	#[serde_as(as = "DurationSeconds<u64>")]
	pub cache_ttl: Duration,
}

impl Default for RepostAbuseConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			min_events: 10,
			max_ratio: 0.8,
			reset_duration: Duration::from_secs(3600),
			count_reject_as_activity: false,
			require_quote_reference: false,
			cache_size: 65_536,
			cache_ttl: Duration::from_secs(24 * 3600),
		}
	}
}

/// Inclusive range of code points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharRange {
	pub start: char,
	pub end: char,
}

impl CharRange {
	pub const fn new(start: char, end: char) -> Self {
		Self { start, end }
	}

	pub fn contains(&self, c: char) -> bool {
		(self.start..=self.end).contains(&c)
	}
}

/// Combining-mark blocks abused for "zalgo" text
pub const COMBINING_MARK_RANGES: [CharRange; 5] = [
	CharRange::new('\u{0300}', '\u{036F}'),
	CharRange::new('\u{1AB0}', '\u{1AFF}'),
	CharRange::new('\u{1DC0}', '\u{1DFF}'),
	CharRange::new('\u{20D0}', '\u{20FF}'),
	CharRange::new('\u{FE20}', '\u{FE2F}'),
];

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FloodConfig {
	pub enabled: bool,
	/// Kinds treated as ephemeral chat; everything else passes
	pub kinds: Vec<u32>,
	/// Minimum time between posts (milliseconds, 0 = off)
	#[serde_as(as = "DurationMilliSeconds<u64>")]
	pub min_delay: Duration,
	/// Maximum uppercase fraction among letters (0 = off)
	pub max_caps_ratio: f64,
	/// Messages with fewer letters skip the caps check (0 = 20)
	pub min_letters_for_caps_check: usize,
	/// Longest allowed run of one character, exclusive (0 = off)
	pub max_repeat_chars: usize,
	/// Longest allowed whitespace-delimited token, exclusive (0 = off)
	pub max_word_length: usize,
	pub block_zalgo: bool,
	pub zalgo_ranges: Vec<CharRange>,
	pub rate_limit_rate: f64,
	pub rate_limit_burst: u32,
	/// PoW difficulty that overrides an exhausted rate limit
	pub required_pow_on_limit: u32,
	pub cache_size: usize,
	/// Seconds
	#[serde_as(as = "DurationSeconds<u64>")]
	pub last_seen_ttl: Duration,
	/// Seconds
	#[serde_as(as = "DurationSeconds<u64>")]
	pub limiter_ttl: Duration,
}

impl Default for FloodConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			kinds: vec![kind::EPHEMERAL_CHAT, kind::EPHEMERAL_CHANNEL_CHAT],
			min_delay: Duration::ZERO,
			max_caps_ratio: 0.0,
			min_letters_for_caps_check: 20,
			max_repeat_chars: 0,
			max_word_length: 0,
			block_zalgo: true,
			zalgo_ranges: COMBINING_MARK_RANGES.to_vec(),
			rate_limit_rate: 0.5,
			rate_limit_burst: 5,
			required_pow_on_limit: 0,
			cache_size: 10_000,
			last_seen_ttl: Duration::from_secs(5 * 60),
			limiter_ttl: Duration::from_secs(15 * 60),
		}
	}
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LanguageConfig {
	pub enabled: bool,
	/// Language names or ISO codes, resolved through the classifier
	pub allowed_languages: Vec<String>,
	pub kinds_to_check: Vec<u32>,
	/// Shorter content (in characters) is not classified
	pub min_length_for_check: usize,
	/// primary language → (similar language or `"default"` → confidence threshold)
	pub primary_accept_threshold: BTreeMap<String, BTreeMap<String, f64>>,
	pub approved_cache_size: usize,
	/// Seconds (0 disables the approval cache)
	#[serde_as(as = "DurationSeconds<u64>")]
	pub approved_cache_ttl: Duration,
}

impl Default for LanguageConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			allowed_languages: Vec::new(),
			kinds_to_check: vec![kind::TEXT_NOTE],
			min_length_for_check: 0,
			primary_accept_threshold: BTreeMap::new(),
			approved_cache_size: 0,
			approved_cache_ttl: Duration::ZERO,
		}
	}
}

/// Reject rates that would poison token arithmetic
pub(crate) fn validate_rate(what: &str, rate: f64) -> RgResult<()> {
	if rate.is_finite() {
		Ok(())
	} else {
		Err(Error::ConfigError(format!("{} must be a finite number, got {}", what, rate)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rate_limiter_from_json() {
		let json = r#"{
			"enabled": true,
			"defaultRate": 2.5,
			"defaultBurst": 10,
			"by": "ip",
			"ttl": 120,
			"ipv4Prefix": 24,
			"rules": [{"description": "reactions", "kinds": [7], "rate": 1, "burst": 3}]
		}"#;
		let cfg: RateLimiterConfig = serde_json::from_str(json).unwrap();

		assert!(cfg.enabled);
		assert_eq!(cfg.default_rate, 2.5);
		assert_eq!(cfg.by, RateDimension::Address);
		assert_eq!(cfg.ttl, Duration::from_secs(120));
		assert_eq!(cfg.prefixes(), AddressPrefixes::new(24, 0));
		assert_eq!(cfg.rules[0].kinds, vec![7]);
		// Unspecified fields keep defaults
		assert_eq!(cfg.cache_size, 65_536);
	}

	#[test]
	fn test_dimension_names() {
		let parse = |s: &str| serde_json::from_str::<RateDimension>(s).unwrap();
		assert_eq!(parse("\"address\""), RateDimension::Address);
		assert_eq!(parse("\"pubkey\""), RateDimension::Identity);
		assert_eq!(parse("\"identity\""), RateDimension::Identity);
		assert_eq!(parse("\"both\""), RateDimension::Both);
	}

	#[test]
	fn test_flood_defaults_and_millis() {
		let cfg: FloodConfig = serde_json::from_str(r#"{"minDelay": 1500}"#).unwrap();
		assert_eq!(cfg.min_delay, Duration::from_millis(1500));
		assert_eq!(cfg.zalgo_ranges.len(), 5);
		assert_eq!(cfg.min_letters_for_caps_check, 20);
	}

	#[test]
	fn test_char_range() {
		let range = CharRange::new('\u{0300}', '\u{036F}');
		assert!(range.contains('\u{0301}'));
		assert!(!range.contains('a'));

		let parsed: CharRange = serde_json::from_str(r#"{"start":"\u0300","end":"\u036f"}"#).unwrap();
		assert_eq!(parsed, range);
	}

	#[test]
	fn test_language_thresholds_from_json() {
		let json = r#"{"enabled": true, "allowedLanguages": ["en"],
			"primaryAcceptThreshold": {"english": {"default": 0.3, "dutch": 0.5}}}"#;
		let cfg: LanguageConfig = serde_json::from_str(json).unwrap();
		assert_eq!(cfg.primary_accept_threshold["english"]["dutch"], 0.5);
		assert_eq!(cfg.kinds_to_check, vec![kind::TEXT_NOTE]);
	}

	#[test]
	fn test_validate_rate() {
		assert!(validate_rate("rate", 1.0).is_ok());
		assert!(validate_rate("rate", -1.0).is_ok());
		assert!(matches!(validate_rate("rate", f64::NAN), Err(Error::ConfigError(_))));
		assert!(validate_rate("rate", f64::INFINITY).is_err());
	}
}

// vim: ts=4
