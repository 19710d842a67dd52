//! Policy Set
//!
//! Builds every evaluator from one [`PolicyConfig`], sharing a clock and the
//! external collaborators. Fatal configuration errors abort the build; non-fatal
//! warnings are logged and handed back to the caller.

use std::sync::Arc;

use relayguard_core::{
	AbuseRatioTracker, EmergencyGuard, FloodGuard, LanguagePolicy, Nip13Pow, RateLimiterEngine,
};
use tracing::{info, warn};

use crate::config::PolicyConfig;
use crate::prelude::*;

pub struct PolicySetBuilder {
	pow: Option<SharedPowValidator>,
	classifier: Option<SharedClassifier>,
	clock: Option<SharedClock>,
}

impl PolicySetBuilder {
	pub fn new() -> Self {
		Self { pow: None, classifier: None, clock: None }
	}

	/// Proof-of-work check used by the flood guard (default: NIP-13)
	pub fn pow_validator(&mut self, pow: SharedPowValidator) -> &mut Self {
		self.pow = Some(pow);
		self
	}

	/// Required when the language policy is enabled
	pub fn classifier(&mut self, classifier: SharedClassifier) -> &mut Self {
		self.classifier = Some(classifier);
		self
	}

	pub fn clock(&mut self, clock: SharedClock) -> &mut Self {
		self.clock = Some(clock);
		self
	}

	pub fn build(&self, config: &PolicyConfig) -> RgResult<(PolicySet, Vec<ConfigWarning>)> {
		let clock = self.clock.clone().unwrap_or_else(SystemClock::shared);
		let pow = self.pow.clone().unwrap_or_else(|| Arc::new(Nip13Pow::new()));
		let mut warnings = Vec::new();

		let (rate_limiter, rate_warnings) =
			RateLimiterEngine::with_clock(&config.rate_limiter, clock.clone())?;
		warnings.extend(rate_warnings);

		let emergency = EmergencyGuard::with_clock(&config.emergency, clock.clone())?;
		let repost_abuse = AbuseRatioTracker::with_clock(&config.repost_abuse, clock.clone())?;
		let flood = FloodGuard::with_clock(&config.flood, pow, clock.clone())?;

		let (language, language_warnings) =
			LanguagePolicy::with_clock(&config.language, self.classifier.clone(), clock)?;
		warnings.extend(language_warnings);

		for warning in &warnings {
			warn!("policy configuration: {}", warning);
		}

		let set = PolicySet { rate_limiter, emergency, repost_abuse, flood, language };
		info!(
			"policy set ready: {} of {} evaluators enabled",
			set.enabled_names().len(),
			set.evaluators().len()
		);
		Ok((set, warnings))
	}
}

impl Default for PolicySetBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// The stateful evaluators, constructed together
pub struct PolicySet {
	pub rate_limiter: RateLimiterEngine,
	pub emergency: EmergencyGuard,
	pub repost_abuse: AbuseRatioTracker,
	pub flood: FloodGuard,
	pub language: LanguagePolicy,
}

impl PolicySet {
	pub fn builder() -> PolicySetBuilder {
		PolicySetBuilder::new()
	}

	/// All evaluators, in the order a caller would typically consult them
	pub fn evaluators(&self) -> [&dyn Evaluator; 5] {
		[&self.emergency, &self.rate_limiter, &self.flood, &self.repost_abuse, &self.language]
	}

	pub fn get(&self, name: &str) -> Option<&dyn Evaluator> {
		self.evaluators().into_iter().find(|e| e.name() == name)
	}

	pub fn enabled_names(&self) -> Vec<&'static str> {
		let flags = [
			("emergency", self.emergency.is_enabled()),
			("rate_limiter", self.rate_limiter.is_enabled()),
			("flood", self.flood.is_enabled()),
			("repost_abuse", self.repost_abuse.is_enabled()),
			("language", self.language.is_enabled()),
		];
		flags.into_iter().filter_map(|(name, on)| on.then_some(name)).collect()
	}
}


// vim: ts=4
