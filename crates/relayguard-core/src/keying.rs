//! Identity Keying
//!
//! Derives stable lookup keys from public keys and network addresses. Addresses
//! can optionally be aggregated to a network prefix so whole ranges share one
//! bucket (e.g. IPv4 /24, IPv6 /48).

use std::borrow::Borrow;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Prefix lengths used to aggregate addresses. Zero keeps the exact address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressPrefixes {
	pub v4: u8,
	pub v6: u8,
}

impl AddressPrefixes {
	/// No aggregation
	pub const EXACT: Self = Self { v4: 0, v6: 0 };

	pub fn new(v4: u8, v6: u8) -> Self {
		Self { v4, v6 }
	}
}

/// Normalize an address, masking it to the configured prefix.
///
/// - IPv4 (including IPv4-mapped IPv6) with `v4_prefix > 0` → `a.b.c.0/NN`
/// - IPv6 with `v6_prefix > 0` → `xxxx:yyyy::/NN`
/// - prefix 0 → canonical exact address
/// - unparsable input is returned unchanged, never widened
pub fn normalize_address(address: &str, v4_prefix: u8, v6_prefix: u8) -> String {
	let Ok(ip) = address.trim().parse::<IpAddr>() else {
		return address.to_string();
	};

	let v4 = match ip {
		IpAddr::V4(v4) => Some(v4),
		IpAddr::V6(v6) => v6.to_ipv4_mapped(),
	};

	match (v4, ip) {
		(Some(v4), _) => {
			if v4_prefix == 0 {
				return v4.to_string();
			}
			let prefix = v4_prefix.min(32);
			let mask = u32::MAX << (32 - u32::from(prefix));
			let masked = u32::from(v4) & mask;
			format!("{}/{}", Ipv4Addr::from(masked), prefix)
		}
		(None, IpAddr::V6(v6)) => {
			if v6_prefix == 0 {
				return v6.to_string();
			}
			let prefix = v6_prefix.min(128);
			let mask = u128::MAX << (128 - u32::from(prefix));
			let masked = u128::from(v6) & mask;
			format!("{}/{}", Ipv6Addr::from(masked), prefix)
		}
		(None, IpAddr::V4(v4)) => v4.to_string(),
	}
}

/// Canonical form of a hex public key
pub fn normalize_pubkey(pubkey: &str) -> String {
	pubkey.trim().to_ascii_lowercase()
}

/// Which facet of a request identifies the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
	Address,
	PublicKey,
}

impl Dimension {
	pub fn tag(self) -> &'static str {
		match self {
			Dimension::Address => "ip",
			Dimension::PublicKey => "pk",
		}
	}
}

/// Opaque, normalized identity key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(Box<str>);

impl IdentityKey {
	/// `ip:<normalized address>`
	pub fn address(address: &str, prefixes: AddressPrefixes) -> Self {
		let normalized = normalize_address(address, prefixes.v4, prefixes.v6);
		Self::tagged(Dimension::Address, &normalized)
	}

	/// `pk:<normalized public key>`
	pub fn pubkey(pubkey: &str) -> Self {
		Self::tagged(Dimension::PublicKey, &normalize_pubkey(pubkey))
	}

	/// Bare normalized public key, for caches that only ever hold public keys
	pub fn bare_pubkey(pubkey: &str) -> Self {
		Self(normalize_pubkey(pubkey).into_boxed_str())
	}

	fn tagged(dimension: Dimension, value: &str) -> Self {
		Self(format!("{}:{}", dimension.tag(), value).into_boxed_str())
	}

	/// Composite key `<scope>:<self>`, e.g. a rate-limit rule id plus identity
	pub fn scoped(&self, scope: &str) -> Self {
		Self(format!("{}:{}", scope, self.0).into_boxed_str())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Borrow<str> for IdentityKey {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for IdentityKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for IdentityKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ipv4_prefix_aggregation() {
		assert_eq!(normalize_address("203.0.113.77", 24, 0), "203.0.113.0/24");
		assert_eq!(normalize_address("203.0.113.200", 24, 0), "203.0.113.0/24");
		assert_eq!(normalize_address("10.1.2.3", 8, 0), "10.0.0.0/8");
		assert_eq!(normalize_address("10.1.2.3", 32, 0), "10.1.2.3/32");
	}

	#[test]
	fn test_ipv4_exact_without_prefix() {
		assert_eq!(normalize_address("203.0.113.77", 0, 48), "203.0.113.77");
	}

	#[test]
	fn test_ipv6_prefix_aggregation() {
		assert_eq!(normalize_address("2001:db8:abcd:12::1", 0, 48), "2001:db8:abcd::/48");
		assert_eq!(normalize_address("2001:db8:abcd:12::1", 0, 64), "2001:db8:abcd:12::/64");
	}

	#[test]
	fn test_ipv6_exact_is_canonical() {
		assert_eq!(normalize_address("2001:DB8:0:0::1", 24, 0), "2001:db8::1");
		assert_eq!(
			normalize_address("2001:db8::1", 0, 0),
			normalize_address("2001:0db8:0000::0001", 0, 0)
		);
	}

	#[test]
	fn test_ipv4_mapped_treated_as_ipv4() {
		assert_eq!(normalize_address("::ffff:198.51.100.9", 24, 64), "198.51.100.0/24");
		assert_eq!(normalize_address("::ffff:198.51.100.9", 0, 64), "198.51.100.9");
	}

	#[test]
	fn test_prefix_clamped() {
		assert_eq!(normalize_address("192.0.2.1", 99, 0), "192.0.2.1/32");
		assert_eq!(normalize_address("2001:db8::1", 0, 200), "2001:db8::1/128");
	}

	#[test]
	fn test_unparsable_returned_unchanged() {
		assert_eq!(normalize_address("not-an-ip", 24, 48), "not-an-ip");
		assert_eq!(normalize_address("203.0.113.7:443", 24, 48), "203.0.113.7:443");
		assert_eq!(normalize_address("", 24, 48), "");
	}

	#[test]
	fn test_identity_keys() {
		let prefixes = AddressPrefixes::new(24, 0);
		assert_eq!(IdentityKey::address("203.0.113.77", prefixes).as_str(), "ip:203.0.113.0/24");
		assert_eq!(
			IdentityKey::address("203.0.113.77", prefixes),
			IdentityKey::address("203.0.113.1", prefixes)
		);

		let pk = IdentityKey::pubkey(" ABCDEF ");
		assert_eq!(pk.as_str(), "pk:abcdef");
		assert_eq!(pk.scoped("rule-0").as_str(), "rule-0:pk:abcdef");
		assert_eq!(IdentityKey::bare_pubkey("ABC").to_string(), "abc");
	}
}

// vim: ts=4
