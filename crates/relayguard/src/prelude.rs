pub use relayguard_core::prelude::*;
pub use relayguard_types::{SharedClassifier, SharedPowValidator};

// vim: ts=4
