use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use relayguard::types::{Detection, LanguageClassifier, MockClock, SharedClassifier};
use relayguard::{kind, Error, Event, PolicyConfig, PolicySet, RgResult};
use tracing_subscriber::EnvFilter;

/// Event id with 21 leading zero bits
pub const WORKED_ID: &str = "000006d8c378af1779d2feebc7603a125d99eca0ccf1085959b307f64e5dd358";

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

pub fn event(kind: u32, pubkey: &str, content: &str) -> Event {
	Event {
		id: "ff".into(),
		kind,
		pubkey: pubkey.into(),
		content: content.into(),
		created_at: 1_700_000_000,
		..Default::default()
	}
}

pub fn note(pubkey: &str, content: &str) -> Event {
	event(kind::TEXT_NOTE, pubkey, content)
}

pub fn repost(pubkey: &str) -> Event {
	event(kind::REPOST, pubkey, "")
}

pub fn chat(pubkey: &str, content: &str) -> Event {
	event(kind::EPHEMERAL_CHAT, pubkey, content)
}

/// Detects the language named by the first word of the text
#[derive(Default)]
pub struct FirstWordClassifier {
	pub calls: AtomicUsize,
	pub unavailable: bool,
}

impl FirstWordClassifier {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl LanguageClassifier for FirstWordClassifier {
	fn resolve(&self, name: &str) -> Option<String> {
		match name.to_ascii_lowercase().as_str() {
			"en" | "english" => Some("English".into()),
			"fr" | "french" => Some("French".into()),
			"es" | "spanish" => Some("Spanish".into()),
			_ => None,
		}
	}

	fn detect(&self, text: &str) -> RgResult<Option<Detection>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if self.unavailable {
			return Err(Error::ClassifierUnavailable("classifier offline".into()));
		}
		let language = text.split_whitespace().next().and_then(|w| self.resolve(w));
		Ok(language.map(|language| Detection { language, confidence: 0.8 }))
	}

	fn confidence(&self, _text: &str, _language: &str) -> RgResult<f64> {
		Ok(0.0)
	}
}

/// Build a policy set from JSON on a mock clock
pub fn build(json: &str) -> (PolicySet, MockClock) {
	build_with(json, None)
}

pub fn build_with(json: &str, classifier: Option<Arc<FirstWordClassifier>>) -> (PolicySet, MockClock) {
	init_tracing();
	let config = PolicyConfig::from_json(json).unwrap();
	let clock = MockClock::starting_now();
	let mut builder = PolicySet::builder();
	builder.clock(clock.shared());
	if let Some(classifier) = classifier {
		let shared: SharedClassifier = classifier;
		builder.classifier(shared);
	}
	let (set, _) = builder.build(&config).unwrap();
	(set, clock)
}

// vim: ts=4
