//! Deterministic `(project, environment)` to `10.x.0.0/16` allocation.
//!
//! - [`digest`] - stable Keccak digest of the key
//! - [`probe`] - walking to a free bucket when a registry reports collisions
//!
//! The allocator itself is pure. Two keys may land in the same bucket: there
//! are only 200 of them, and with ~17 distinct keys the chance of at least one
//! shared octet passes 50% (see [`collision_probability`]). Collision checks
//! live in [`crate::registry`].

pub mod digest;
pub mod probe;

use crate::config::{self, DIGEST_WEIGHT, ENVIRONMENT_WEIGHT, OCTET_BASE, OCTET_SPAN, PROJECT_WEIGHT};
use crate::error::AllocError;
use crate::models::{AddressRange, AllocationKey, Ipv4, OverrideRange, RangeSource};
use serde::{Deserialize, Serialize};

pub use digest::{digest_hex, key_digest, unique_string};
pub use probe::{collision_probability, next_free, probe_sequence, ProbeStrategy};

/// What the 17-weighted term of the hash value is built from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum HashScheme {
    /// First 64 bits of the digest. Depends on the key contents.
    #[default]
    Digest,
    /// Length of the unique string, which is constant. Matches the ranges
    /// produced by the inline template expression, where only the key lengths
    /// discriminate.
    Template,
}

/// Maps allocation keys to address ranges. Holds no state besides the scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicRangeAllocator {
    scheme: HashScheme,
}

impl DeterministicRangeAllocator {
    pub fn new(scheme: HashScheme) -> DeterministicRangeAllocator {
        DeterministicRangeAllocator { scheme }
    }

    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    /// Weighted sum of the digest term and the key lengths.
    pub fn hash_value(&self, project: &str, environment: &str) -> u128 {
        let digest_term = match self.scheme {
            HashScheme::Digest => digest::digest_prefix(&key_digest(project, environment)) as u128,
            HashScheme::Template => unique_string(project, environment).chars().count() as u128,
        };
        digest_term * DIGEST_WEIGHT
            + project.chars().count() as u128 * PROJECT_WEIGHT
            + environment.chars().count() as u128 * ENVIRONMENT_WEIGHT
    }

    /// Bucket octet in `[50, 249]`. Does not reject empty keys.
    pub fn network_octet(&self, project: &str, environment: &str) -> u8 {
        let bucket = self.hash_value(project, environment) % OCTET_SPAN as u128;
        OCTET_BASE + bucket as u8
    }

    /// Allocate a range for `project`/`environment`.
    ///
    /// Both overrides present and non-empty: they are validated and returned
    /// unchanged. Exactly one present: [`AllocError::MalformedOverride`].
    /// Neither present and both key fields empty: [`AllocError::InvalidInput`].
    pub fn allocate(
        &self,
        project: &str,
        environment: &str,
        explicit_vnet_prefix: Option<&str>,
        explicit_subnet_prefix: Option<&str>,
    ) -> Result<AddressRange, AllocError> {
        let overrides = resolve_override(explicit_vnet_prefix, explicit_subnet_prefix)?;
        self.allocate_key(&AllocationKey::new(project, environment), overrides.as_ref())
    }

    pub fn allocate_key(
        &self,
        key: &AllocationKey,
        overrides: Option<&OverrideRange>,
    ) -> Result<AddressRange, AllocError> {
        if let Some(overrides) = overrides {
            validate_override(overrides)?;
            log::debug!("{key}: using override {}", overrides.vnet_prefix);
            return Ok(AddressRange::from_override(overrides));
        }
        if key.is_empty() {
            return Err(AllocError::InvalidInput(
                "project and environment are both empty and no override was given".to_string(),
            ));
        }

        let octet = self.network_octet(&key.project, &key.environment);
        log::debug!(
            "{key}: scheme={:?} octet={octet} digest={}",
            self.scheme,
            digest_hex(&key.project, &key.environment)
        );
        Ok(AddressRange::from_octet(octet, RangeSource::Computed))
    }
}

/// Allocate with the default scheme.
pub fn allocate(
    project: &str,
    environment: &str,
    explicit_vnet_prefix: Option<&str>,
    explicit_subnet_prefix: Option<&str>,
) -> Result<AddressRange, AllocError> {
    DeterministicRangeAllocator::default().allocate(
        project,
        environment,
        explicit_vnet_prefix,
        explicit_subnet_prefix,
    )
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Turn the two optional override strings into an [`OverrideRange`].
///
/// The strings are kept exactly as given.
pub fn resolve_override(
    vnet_prefix: Option<&str>,
    subnet_prefix: Option<&str>,
) -> Result<Option<OverrideRange>, AllocError> {
    match (present(vnet_prefix), present(subnet_prefix)) {
        (None, None) => Ok(None),
        (Some(vnet), Some(subnet)) => Ok(Some(OverrideRange {
            vnet_prefix: vnet.to_string(),
            app_subnet_prefix: subnet.to_string(),
        })),
        (Some(_), None) => Err(AllocError::MalformedOverride(
            "VNet prefix given without a subnet prefix".to_string(),
        )),
        (None, Some(_)) => Err(AllocError::MalformedOverride(
            "subnet prefix given without a VNet prefix".to_string(),
        )),
    }
}

/// Parse both prefixes and check they are network addresses and nested.
pub fn validate_override(overrides: &OverrideRange) -> Result<(Ipv4, Ipv4), AllocError> {
    let parse = |label: &str, value: &str| -> Result<Ipv4, AllocError> {
        let cidr = Ipv4::new(value)
            .map_err(|e| AllocError::MalformedOverride(format!("{label} '{value}': {e}")))?;
        // the string is returned verbatim, so it must already be canonical
        if cidr.to_string() != value {
            return Err(AllocError::MalformedOverride(format!(
                "{label} '{value}' is not in canonical form, expected '{cidr}'"
            )));
        }
        if !cidr.is_network_address() {
            return Err(AllocError::MalformedOverride(format!(
                "{label} '{value}' has host bits set, expected {}/{}",
                cidr.lo(),
                cidr.mask
            )));
        }
        Ok(cidr)
    };
    let vnet = parse("VNet prefix", &overrides.vnet_prefix)?;
    let subnet = parse("subnet prefix", &overrides.app_subnet_prefix)?;
    if !vnet.contains(&subnet) {
        return Err(AllocError::MalformedOverride(format!(
            "subnet {subnet} is not inside VNet {vnet}"
        )));
    }
    Ok((vnet, subnet))
}

/// Octets in `[50, 249]` whose `10.x.0.0/16` block overlaps `cidr`.
pub fn covered_octets(cidr: &Ipv4) -> Vec<u8> {
    (OCTET_BASE..=config::octet_max())
        .filter(|octet| Ipv4::vnet_block(config::VNET_FIRST_OCTET, *octet).overlaps(cidr))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_octets() {
        let allocator = DeterministicRangeAllocator::default();
        assert_eq!(allocator.network_octet("cloudpi", "dev"), 72);
        assert_eq!(allocator.network_octet("myapp", "dev"), 223);
        assert_eq!(allocator.network_octet("cloudpi", "prod"), 174);
        assert_eq!(allocator.network_octet("app155", "dev"), 87);
    }

    #[test]
    fn test_template_scheme_only_sees_lengths() {
        let allocator = DeterministicRangeAllocator::new(HashScheme::Template);
        // (13*17 + 7*13 + 3*7) % 200 + 50
        assert_eq!(allocator.hash_value("cloudpi", "dev"), 333);
        assert_eq!(allocator.network_octet("cloudpi", "dev"), 183);
        assert_eq!(
            allocator.network_octet("cloudpi", "dev"),
            allocator.network_octet("abcdefg", "xyz")
        );
    }

    #[test]
    fn test_deterministic() {
        for scheme in [HashScheme::Digest, HashScheme::Template] {
            let allocator = DeterministicRangeAllocator::new(scheme);
            let first = allocator.allocate("cloudpi", "dev", None, None).unwrap();
            let second = allocator.allocate("cloudpi", "dev", None, None).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_range_bound_and_format() {
        let allocator = DeterministicRangeAllocator::default();
        let long = "x".repeat(500);
        let keys = [
            ("cloudpi", "dev"),
            ("a", ""),
            ("", "prod"),
            (long.as_str(), "test"),
            ("ünïcödé", "ß"),
        ];
        for (project, environment) in keys {
            let range = allocator.allocate(project, environment, None, None).unwrap();
            let octet = range.network_octet.unwrap();
            assert!((50..=249).contains(&octet), "{octet} out of range");
            assert_eq!(range.vnet_prefix, format!("10.{octet}.0.0/16"));
            assert_eq!(range.app_subnet_prefix, format!("10.{octet}.1.0/24"));
            assert_eq!(range.source, RangeSource::Computed);
        }
    }

    #[test]
    fn test_empty_key_is_invalid_input() {
        let err = allocate("", "", None, None).unwrap_err();
        assert!(matches!(err, AllocError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_key_with_override_is_fine() {
        let range = allocate("", "", Some("10.200.0.0/16"), Some("10.200.1.0/24")).unwrap();
        assert_eq!(range.vnet_prefix, "10.200.0.0/16");
    }

    #[test]
    fn test_override_precedence() {
        let range = allocate("cloudpi", "prod", Some("10.200.0.0/16"), Some("10.200.1.0/24")).unwrap();
        assert_eq!(range.vnet_prefix, "10.200.0.0/16");
        assert_eq!(range.app_subnet_prefix, "10.200.1.0/24");
        assert_eq!(range.network_octet, None);
        assert_eq!(range.source, RangeSource::Override);
    }

    #[test]
    fn test_blank_overrides_are_absent() {
        let range = allocate("cloudpi", "dev", Some(""), Some("  ")).unwrap();
        assert_eq!(range.network_octet, Some(72));
    }

    #[test]
    fn test_partial_override_rejected() {
        let err = allocate("cloudpi", "dev", Some("10.200.0.0/16"), None).unwrap_err();
        assert!(matches!(err, AllocError::MalformedOverride(_)));
        let err = allocate("cloudpi", "dev", None, Some("10.200.1.0/24")).unwrap_err();
        assert!(matches!(err, AllocError::MalformedOverride(_)));
    }

    #[test]
    fn test_malformed_overrides_rejected() {
        let cases = [
            ("10.200.0.0", "10.200.1.0/24"),
            ("10.200.0.0/16", "not-a-cidr"),
            ("10.200.5.0/16", "10.200.5.0/24"),
            ("10.200.0.0/16", "10.201.1.0/24"),
            ("10.200.0.0/24", "10.200.0.0/16"),
            ("10.200.0.0/+16", "10.200.1.0/+24"),
            (" 10.200.0.0/16", "10.200.1.0/24"),
            ("10.200.0.0/16", "10.200.1.0/24 "),
            ("10.200.0.0/016", "10.200.1.0/24"),
            ("10.200.000.0/16", "10.200.1.0/24"),
        ];
        for (vnet, subnet) in cases {
            let err = allocate("cloudpi", "dev", Some(vnet), Some(subnet)).unwrap_err();
            assert!(
                matches!(err, AllocError::MalformedOverride(_)),
                "{vnet} {subnet} -> {err}"
            );
        }
    }

    #[test]
    fn test_covered_octets() {
        assert_eq!(covered_octets(&Ipv4::new("10.87.4.0/24").unwrap()), vec![87]);
        assert_eq!(
            covered_octets(&Ipv4::new("10.86.0.0/15").unwrap()),
            vec![86, 87]
        );
        assert!(covered_octets(&Ipv4::new("10.10.0.0/16").unwrap()).is_empty());
        assert!(covered_octets(&Ipv4::new("192.168.0.0/16").unwrap()).is_empty());
        assert_eq!(covered_octets(&Ipv4::new("10.0.0.0/8").unwrap()).len(), 200);
    }
}
