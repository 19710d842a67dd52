//! Time Source
//!
//! Every expiry, decay and refill computation reads time through [`Clock`], so
//! production code runs on [`SystemClock`] while tests drive a [`MockClock`].

use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Monotonic time source
pub trait Clock: Debug + Send + Sync {
	fn now(&self) -> Instant;
}

/// Shared clock handle passed to caches, limiters and evaluators
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by `Instant::now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
	pub fn new() -> Self {
		Self
	}

	pub fn shared() -> SharedClock {
		Arc::new(Self)
	}
}

impl Clock for SystemClock {
	fn now(&self) -> Instant {
		Instant::now()
	}
}

/// Manually driven clock.
///
/// Clones share the same underlying instant, so advancing one handle advances
/// every cache and limiter built on it.
///
/// ```
/// use relayguard_types::clock::{Clock, MockClock};
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), start + Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
	current: Arc<Mutex<Instant>>,
}

impl MockClock {
	pub fn new(start: Instant) -> Self {
		Self { current: Arc::new(Mutex::new(start)) }
	}

	/// Mock clock starting at the current wall-clock instant
	pub fn starting_now() -> Self {
		Self::new(Instant::now())
	}

	pub fn advance(&self, duration: Duration) {
		*self.current.lock() += duration;
	}

	pub fn set(&self, instant: Instant) {
		*self.current.lock() = instant;
	}

	pub fn shared(&self) -> SharedClock {
		Arc::new(self.clone())
	}
}

impl Clock for MockClock {
	fn now(&self) -> Instant {
		*self.current.lock()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_system_clock_monotonic() {
		let clock = SystemClock::new();
		let t1 = clock.now();
		let t2 = clock.now();
		assert!(t2 >= t1);
	}

	#[test]
	fn test_mock_clock_shared_between_clones() {
		let start = Instant::now();
		let clock = MockClock::new(start);
		let shared = clock.shared();

		clock.advance(Duration::from_secs(5));
		assert_eq!(shared.now(), start + Duration::from_secs(5));

		clock.set(start + Duration::from_secs(100));
		assert_eq!(shared.now(), start + Duration::from_secs(100));
	}
}

// vim: ts=4
