//! Language Policy
//!
//! Accepts notes written in an allow-listed language. Text is stripped of URLs,
//! e-mail addresses, `nostr:` references, hashtags and digit-bearing tokens
//! before it reaches the classifier. A detected language outside the allow-list
//! can still pass when the classifier is confident enough that the text is in an
//! allowed *primary* language; thresholds are configured per primary language,
//! per similar language or with a `default` fallback.
//!
//! Identities that passed once are remembered in an [`ApprovalCache`] and skip
//! classification until the entry expires.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;
use relayguard_types::{SharedClassifier, META_LANGUAGE};
use tracing::{debug, info};

use crate::approval::ApprovalCache;
use crate::config::LanguageConfig;
use crate::prelude::*;

const CLEANER_PATTERN: &str = concat!(
	r"((https?|wss?)://|www\.|ww\.)[^\s/?.#-]+\S*",
	r"|[a-zA-Z0-9.!$%&’+_`\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,64}",
	r"|nostr:[a-z0-9]+",
	r"|#\S+",
	r"|[a-zA-Z]*[0-9]+[a-zA-Z0-9]*",
);

const DEFAULT_THRESHOLD_KEY: &str = "default";

#[derive(Debug, Default)]
struct ThresholdRule {
	similar: HashMap<String, f64>,
	default: Option<f64>,
}

impl ThresholdRule {
	fn threshold_for(&self, detected: &str) -> Option<f64> {
		self.similar.get(detected).copied().or(self.default)
	}
}

struct PolicyState {
	classifier: SharedClassifier,
	allowed: HashSet<String>,
	kinds: HashSet<u32>,
	min_length: usize,
	/// Keyed by canonical primary language, iterated in order
	thresholds: BTreeMap<String, ThresholdRule>,
	cleaner: Regex,
	approvals: ApprovalCache,
}

pub struct LanguagePolicy {
	state: Option<PolicyState>,
}

impl LanguagePolicy {
	pub fn new(
		config: &LanguageConfig,
		classifier: Option<SharedClassifier>,
	) -> RgResult<(Self, Vec<ConfigWarning>)> {
		Self::with_clock(config, classifier, SystemClock::shared())
	}

	pub fn with_clock(
		config: &LanguageConfig,
		classifier: Option<SharedClassifier>,
		clock: SharedClock,
	) -> RgResult<(Self, Vec<ConfigWarning>)> {
		if !config.enabled {
			return Ok((Self { state: None }, Vec::new()));
		}
		let Some(classifier) = classifier else {
			return Err(Error::ConfigError(
				"language policy enabled but no classifier configured".into(),
			));
		};

		let mut warnings = Vec::new();

		let mut allowed = HashSet::new();
		for name in &config.allowed_languages {
			match classifier.resolve(name) {
				Some(language) => {
					allowed.insert(language);
				}
				None => warnings.push(ConfigWarning::new(format!(
					"Unsupported language name or ISO code ignored: {}",
					name
				))),
			}
		}

		let mut thresholds = BTreeMap::new();
		for (primary_name, similar) in &config.primary_accept_threshold {
			let Some(primary) = classifier.resolve(primary_name) else {
				warnings.push(ConfigWarning::new(format!(
					"Primary language in threshold rules not found, rule skipped: {}",
					primary_name
				)));
				continue;
			};

			let mut rule = ThresholdRule::default();
			for (similar_name, &confidence) in similar {
				if similar_name.eq_ignore_ascii_case(DEFAULT_THRESHOLD_KEY) {
					rule.default = Some(confidence);
				} else if let Some(language) = classifier.resolve(similar_name) {
					rule.similar.insert(language, confidence);
				} else {
					warnings.push(ConfigWarning::new(format!(
						"Unsupported similar language ignored: primary={}, similar={}",
						primary_name, similar_name
					)));
				}
			}
			thresholds.insert(primary, rule);
		}

		let cleaner = Regex::new(CLEANER_PATTERN)
			.map_err(|e| Error::ConfigError(format!("content cleaner pattern: {}", e)))?;

		info!(
			"language policy: {} allowed languages, {} threshold rules",
			allowed.len(),
			thresholds.len()
		);

		let state = PolicyState {
			classifier,
			allowed,
			kinds: config.kinds_to_check.iter().copied().collect(),
			min_length: config.min_length_for_check,
			thresholds,
			cleaner,
			approvals: ApprovalCache::new(
				config.approved_cache_size,
				config.approved_cache_ttl,
				clock,
			),
		};
		Ok((Self { state: Some(state) }, warnings))
	}

	pub fn is_enabled(&self) -> bool {
		self.state.is_some()
	}

	/// Content with links, references, hashtags and numeric tokens removed
	pub fn clean_content(&self, content: &str) -> Option<String> {
		self.state.as_ref().map(|s| s.cleaner.replace_all(content, "").into_owned())
	}

	pub fn check(&self, event: &Event, meta: &mut RequestMeta) -> RgResult<Verdict> {
		let Some(state) = &self.state else {
			return Ok(Verdict::Allow);
		};
		if state.allowed.is_empty() || !state.kinds.contains(&event.kind) {
			return Ok(Verdict::Allow);
		}
		if state.min_length > 0 && event.content.chars().count() < state.min_length {
			return Ok(Verdict::Allow);
		}
		if state.approvals.is_approved(&event.pubkey) {
			return Ok(Verdict::Allow);
		}

		let cleaned = state.cleaner.replace_all(&event.content, "");
		if cleaned.chars().count() < state.min_length {
			return Ok(Verdict::Allow);
		}

		let Some(detection) = state.classifier.detect(&cleaned)? else {
			debug!("language of event {} from {} undetermined", event.id, event.pubkey);
			return Ok(Verdict::deny("blocked: language could not be determined"));
		};
		let detected = detection.language;

		if state.allowed.contains(&detected) {
			state.approvals.approve(&event.pubkey);
			meta.publish(META_LANGUAGE, detected);
			return Ok(Verdict::Allow);
		}

		for (primary, rule) in &state.thresholds {
			let Some(threshold) = rule.threshold_for(&detected) else {
				continue;
			};
			let confidence = state.classifier.confidence(&cleaned, primary)?;
			if confidence > threshold {
				debug!(
					"accepting {} as {} (confidence {:.3} > {:.3})",
					detected, primary, confidence, threshold
				);
				state.approvals.approve(&event.pubkey);
				meta.publish(META_LANGUAGE, detected);
				return Ok(Verdict::Allow);
			}
		}

		debug!("language {} rejected for {}", detected, event.pubkey);
		Ok(Verdict::Deny(format!("blocked: language '{}' is not allowed", detected)))
	}

	pub fn approved_identities(&self) -> usize {
		self.state.as_ref().map_or(0, |s| s.approvals.len())
	}
}

impl Evaluator for LanguagePolicy {
	fn name(&self) -> &'static str {
		"language"
	}

	fn evaluate(&self, event: &Event, meta: &mut RequestMeta) -> RgResult<Verdict> {
		self.check(event, meta)
	}
}


// vim: ts=4
