//! Bounded Timed Cache
//!
//! Fixed-capacity, recency-ordered key/value store with per-entry expiry.
//!
//! - Expiry is absolute, set from a fixed TTL whenever an entry is inserted or
//!   updated. Reads do not extend it.
//! - An expired entry is reported absent even before it is physically removed.
//! - Under capacity pressure, expired entries at the cold end are dropped first,
//!   then the least-recently-used live entry is evicted.
//!
//! A zero TTL disables expiry.

use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::prelude::*;

/// Value plus the instant after which it is logically absent
#[derive(Debug, Clone)]
struct CacheEntry<V> {
	value: V,
	expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|exp| now > exp)
	}
}

/// Thread-safe LRU cache with absolute per-entry TTL
pub struct TimedCache<K: Hash + Eq, V> {
	entries: Mutex<LruCache<K, CacheEntry<V>>>,
	ttl: Duration,
	clock: SharedClock,
}

impl<K: Hash + Eq, V: Clone> TimedCache<K, V> {
	/// Create a cache holding at most `capacity` entries (minimum 1)
	pub fn new(capacity: usize, ttl: Duration, clock: SharedClock) -> Self {
		let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
		Self { entries: Mutex::new(LruCache::new(capacity)), ttl, clock }
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	pub fn capacity(&self) -> usize {
		self.entries.lock().cap().get()
	}

	fn expiry_from(&self, now: Instant) -> Option<Instant> {
		if self.ttl.is_zero() { None } else { now.checked_add(self.ttl) }
	}

	/// Look up a live entry, marking it most recently used.
	/// Expired entries are removed and reported absent.
	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let now = self.clock.now();
		let mut entries = self.entries.lock();

		let expired = match entries.get(key) {
			Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
			Some(_) => true,
			None => false,
		};
		if expired {
			entries.pop(key);
		}
		None
	}

	pub fn contains<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.get(key).is_some()
	}

	/// Insert or replace an entry, resetting its expiry
	pub fn put(&self, key: K, value: V) {
		let now = self.clock.now();
		let mut entries = self.entries.lock();
		self.insert_locked(&mut entries, key, value, now);
	}

	/// Return the live value for `key`, or install the one produced by `init`.
	///
	/// Lookup and insertion happen under one lock, so concurrent callers for the
	/// same key always observe a single winning value.
	pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
	where
		F: FnOnce() -> V,
	{
		let now = self.clock.now();
		let mut entries = self.entries.lock();

		if let Some(entry) = entries.get(&key) {
			if !entry.is_expired(now) {
				return entry.value.clone();
			}
		}

		let value = init();
		self.insert_locked(&mut entries, key, value.clone(), now);
		value
	}

	/// Atomically read the live value (if any), compute a replacement and store it.
	/// The stored entry gets a fresh expiry.
	pub fn upsert<F>(&self, key: K, update: F) -> V
	where
		F: FnOnce(Option<V>) -> V,
	{
		let now = self.clock.now();
		let mut entries = self.entries.lock();

		let current = match entries.peek(&key) {
			Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
			_ => None,
		};
		let value = update(current);
		self.insert_locked(&mut entries, key, value.clone(), now);
		value
	}

	/// Let `decide` look at the live value (if any) and optionally replace it,
	/// all under one lock. `(Some(v), r)` stores `v` with a fresh expiry,
	/// `(None, r)` leaves the entry as it was. Either way `r` is returned.
	pub fn decide_with<F, R>(&self, key: K, decide: F) -> R
	where
		F: FnOnce(Option<&V>) -> (Option<V>, R),
	{
		let now = self.clock.now();
		let mut entries = self.entries.lock();

		let current = entries.peek(&key).filter(|e| !e.is_expired(now)).map(|e| &e.value);
		let (replacement, outcome) = decide(current);
		if let Some(value) = replacement {
			self.insert_locked(&mut entries, key, value, now);
		}
		outcome
	}

	pub fn remove<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let now = self.clock.now();
		self.entries.lock().pop(key).filter(|e| !e.is_expired(now)).map(|e| e.value)
	}

	/// Number of physically stored entries, including expired ones not yet purged
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	fn insert_locked(&self, entries: &mut LruCache<K, CacheEntry<V>>, key: K, value: V, now: Instant) {
		let at_capacity = !entries.contains(&key) && entries.len() >= entries.cap().get();
		if at_capacity {
			// Reclaim expired cold entries before evicting a live one
			while entries.peek_lru().is_some_and(|(_, e)| e.is_expired(now)) {
				entries.pop_lru();
			}
		}

		let expires_at = self.expiry_from(now);
		let displaced = entries.push(key, CacheEntry { value, expires_at });
		if at_capacity && displaced.is_some_and(|(_, e)| !e.is_expired(now)) {
			debug!("timed cache at capacity {}, evicted least recently used entry", entries.cap());
		}
	}
}


// vim: ts=4
