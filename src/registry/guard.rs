//! Collision checks between a fresh allocation and the registry.

use super::{AllocationRecord, OctetRegistry, Owner};
use crate::allocator::{
    covered_octets, next_free, validate_override, DeterministicRangeAllocator, ProbeStrategy,
};
use crate::config;
use crate::error::AllocError;
use crate::models::{AddressRange, AllocationKey, Ipv4, OverrideRange, RangeSource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do when the hashed octet is already held by someone else.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Move to the next free bucket.
    #[default]
    Probe,
    /// Keep the hashed octet and report the prior holder.
    Warn,
    /// Fail with [`AllocError::Collision`].
    Reject,
}

/// Advisory result of a collision under [`CollisionPolicy::Warn`], or of an
/// override overlapping a recorded range.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CollisionWarning {
    pub octet: u8,
    pub requested_by: AllocationKey,
    pub prior: AllocationRecord,
}

impl fmt::Display for CollisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} shares octet {} ({}) with {} recorded {}",
            self.requested_by,
            self.octet,
            self.prior.vnet_prefix,
            self.prior.owner,
            self.prior.recorded_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// A checked allocation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Allocation {
    pub range: AddressRange,
    pub warning: Option<CollisionWarning>,
}

fn foreign_owner<'a>(
    registry: &'a OctetRegistry,
    key: &AllocationKey,
    octet: u8,
) -> Option<&'a AllocationRecord> {
    registry
        .owner_of(octet)
        .filter(|r| !matches!(&r.owner, Owner::Key(k) if k == key))
}

/// Allocate `key` and check the result against `registry`.
///
/// Does not modify the registry; see [`record_allocation`].
/// A key already present in the registry gets its recorded octet back.
pub fn allocate_checked(
    allocator: &DeterministicRangeAllocator,
    registry: &OctetRegistry,
    key: &AllocationKey,
    overrides: Option<&OverrideRange>,
    policy: CollisionPolicy,
    strategy: ProbeStrategy,
) -> Result<Allocation, AllocError> {
    let range = allocator.allocate_key(key, overrides)?;

    if let Some(overrides) = overrides {
        return check_override(registry, key, overrides, range, policy);
    }

    let computed = range
        .network_octet
        .ok_or_else(|| AllocError::Registry("computed range without octet".to_string()))?;

    if let Some(existing) = registry.find_key(key).first().copied() {
        log::info!("{key}: reusing recorded octet {existing}");
        let source = if existing == computed {
            RangeSource::Computed
        } else {
            RangeSource::Probed
        };
        return Ok(Allocation {
            range: AddressRange::from_octet(existing, source),
            warning: None,
        });
    }

    let Some(prior) = foreign_owner(registry, key, computed) else {
        return Ok(Allocation { range, warning: None });
    };

    match policy {
        CollisionPolicy::Probe => {
            let octet = next_free(computed, &registry.in_use(), strategy).ok_or(
                AllocError::RangeExhausted {
                    lo: config::OCTET_BASE,
                    hi: config::octet_max(),
                },
            )?;
            log::info!(
                "{key}: octet {computed} held by {}, probed to {octet}",
                prior.owner
            );
            Ok(Allocation {
                range: AddressRange::from_octet(octet, RangeSource::Probed),
                warning: None,
            })
        }
        CollisionPolicy::Warn => {
            let warning = CollisionWarning {
                octet: computed,
                requested_by: key.clone(),
                prior: prior.clone(),
            };
            log::warn!("{warning}");
            Ok(Allocation {
                range,
                warning: Some(warning),
            })
        }
        CollisionPolicy::Reject => Err(AllocError::Collision {
            octet: computed,
            owner: prior.owner.to_string(),
        }),
    }
}

fn check_override(
    registry: &OctetRegistry,
    key: &AllocationKey,
    overrides: &OverrideRange,
    range: AddressRange,
    policy: CollisionPolicy,
) -> Result<Allocation, AllocError> {
    let (vnet, _) = validate_override(overrides)?;
    let clash = covered_octets(&vnet)
        .into_iter()
        .find_map(|octet| foreign_owner(registry, key, octet).map(|prior| (octet, prior)));

    let Some((octet, prior)) = clash else {
        return Ok(Allocation { range, warning: None });
    };
    if policy == CollisionPolicy::Reject {
        return Err(AllocError::Collision {
            octet,
            owner: prior.owner.to_string(),
        });
    }
    // overrides are never moved, so probe degrades to a warning
    let warning = CollisionWarning {
        octet,
        requested_by: key.clone(),
        prior: prior.clone(),
    };
    log::warn!("override {}: {warning}", overrides.vnet_prefix);
    Ok(Allocation {
        range,
        warning: Some(warning),
    })
}

/// Record the octets of `allocation` for `key`.
///
/// Octets held by another owner are skipped; they are the ones reported in
/// the allocation's warning. Returns the number of octets recorded.
pub fn record_allocation(
    registry: &mut OctetRegistry,
    key: &AllocationKey,
    allocation: &Allocation,
) -> Result<usize, AllocError> {
    let octets = match allocation.range.network_octet {
        Some(octet) => vec![octet],
        None => {
            let vnet = Ipv4::new(&allocation.range.vnet_prefix)
                .map_err(|e| AllocError::MalformedOverride(e.to_string()))?;
            covered_octets(&vnet)
        }
    };

    let mut recorded = 0;
    for octet in octets {
        if foreign_owner(registry, key, octet).is_some() {
            continue;
        }
        let mut record = AllocationRecord::new(octet, Owner::Key(key.clone()));
        if allocation.range.network_octet.is_none() {
            record.vnet_prefix = allocation.range.vnet_prefix.clone();
        }
        registry.record(record)?;
        recorded += 1;
    }
    Ok(recorded)
}
