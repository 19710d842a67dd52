//! Aggregate policy configuration
//!
//! One JSON document with a section per evaluator. Missing sections take the
//! evaluator defaults, which leave everything disabled.

use serde::{Deserialize, Serialize};

use relayguard_core::config::{
	EmergencyConfig, FloodConfig, LanguageConfig, RateLimiterConfig, RepostAbuseConfig,
};

use crate::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyConfig {
	pub rate_limiter: RateLimiterConfig,
	pub emergency: EmergencyConfig,
	pub repost_abuse: RepostAbuseConfig,
	pub flood: FloodConfig,
	pub language: LanguageConfig,
}

impl PolicyConfig {
	pub fn from_json(json: &str) -> RgResult<Self> {
		serde_json::from_str(json)
			.map_err(|e| Error::ConfigError(format!("policy configuration: {}", e)))
	}

	pub fn to_json(&self) -> RgResult<String> {
		Ok(serde_json::to_string_pretty(self)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn test_empty_document_is_all_defaults() {
		let config = PolicyConfig::from_json("{}").unwrap();
		assert_eq!(config, PolicyConfig::default());
		assert!(!config.rate_limiter.enabled);
		assert!(!config.flood.enabled);
	}

	#[test]
	fn test_sections() {
		let config = PolicyConfig::from_json(
			r#"{
				"rateLimiter": {
					"enabled": true,
					"by": "ip",
					"ipv4Prefix": 24,
					"rules": [{ "description": "reactions", "kinds": [7], "rate": 2.0, "burst": 5 }]
				},
				"repostAbuse": { "enabled": true, "minEvents": 5, "maxRatio": 0.5 },
				"flood": { "enabled": true, "minDelay": 1500 }
			}"#,
		)
		.unwrap();

		assert!(config.rate_limiter.enabled);
		assert_eq!(config.rate_limiter.ipv4_prefix, 24);
		assert_eq!(config.rate_limiter.rules[0].kinds, [7]);
		assert_eq!(config.repost_abuse.min_events, 5);
		assert_eq!(config.flood.min_delay, Duration::from_millis(1500));
		assert!(!config.emergency.enabled);
	}

	#[test]
	fn test_malformed_document() {
		let err = PolicyConfig::from_json(r#"{"flood": {"minDelay": "soon"}}"#).unwrap_err();
		assert!(matches!(err, Error::ConfigError(_)));
	}

	#[test]
	fn test_serializes_back() {
		let config = PolicyConfig::default();
		let json = config.to_json().unwrap();
		assert_eq!(PolicyConfig::from_json(&json).unwrap(), config);
	}
}

// vim: ts=4
