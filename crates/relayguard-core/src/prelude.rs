pub use relayguard_types::prelude::*;
pub use relayguard_types::{
	kind, Clock, Evaluator, Event, RequestMeta, SharedClock, SystemClock, Verdict,
};

// vim: ts=4
