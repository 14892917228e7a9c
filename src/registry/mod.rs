//! Record of octets already handed out.
//!
//! Optional companion to the pure allocator:
//! - [`guard`] - collision checks and policies on top of an allocation
//! - [`shared`] - in-process mutual exclusion for allocate-and-record
//! - [`file`] - JSON persistence with a lock file across processes

pub mod file;
pub mod guard;
pub mod shared;

use crate::allocator::covered_octets;
use crate::error::AllocError;
use crate::models::{vnet_prefix, AllocationKey, Ipv4};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub use file::{RegistryFile, RegistryLock};
pub use guard::{allocate_checked, record_allocation, Allocation, CollisionPolicy, CollisionWarning};
pub use shared::SharedRegistry;

/// Who holds an octet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Owner {
    /// Handed out by this allocator.
    Key(AllocationKey),
    /// Seen in a VNet inventory; not managed here.
    External { name: String },
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Key(key) => write!(f, "{key}"),
            Owner::External { name } => write!(f, "external:{name}"),
        }
    }
}

/// One octet in use.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AllocationRecord {
    pub octet: u8,
    pub owner: Owner,
    pub vnet_prefix: String,
    pub recorded_at: DateTime<Utc>,
}

impl AllocationRecord {
    pub fn new(octet: u8, owner: Owner) -> AllocationRecord {
        AllocationRecord {
            octet,
            owner,
            vnet_prefix: vnet_prefix(octet),
            recorded_at: Utc::now(),
        }
    }
}

/// Octets in use, sorted by octet. `revision` increases on every change.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct OctetRegistry {
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub records: Vec<AllocationRecord>,
}

impl OctetRegistry {
    pub fn new() -> OctetRegistry {
        OctetRegistry::default()
    }

    pub fn in_use(&self) -> BTreeSet<u8> {
        self.records.iter().map(|r| r.octet).collect()
    }

    pub fn is_in_use(&self, octet: u8) -> bool {
        self.owner_of(octet).is_some()
    }

    pub fn owner_of(&self, octet: u8) -> Option<&AllocationRecord> {
        self.records.iter().find(|r| r.octet == octet)
    }

    /// Octets recorded for `key`, lowest first.
    pub fn find_key(&self, key: &AllocationKey) -> Vec<u8> {
        self.records
            .iter()
            .filter(|r| matches!(&r.owner, Owner::Key(k) if k == key))
            .map(|r| r.octet)
            .collect()
    }

    /// Add a record. Re-recording the same owner is a no-op.
    pub fn record(&mut self, record: AllocationRecord) -> Result<(), AllocError> {
        if let Some(existing) = self.owner_of(record.octet) {
            if existing.owner == record.owner {
                return Ok(());
            }
            return Err(AllocError::Collision {
                octet: record.octet,
                owner: existing.owner.to_string(),
            });
        }
        log::debug!("record octet {} for {}", record.octet, record.owner);
        self.records.push(record);
        self.records.sort_by_key(|r| r.octet);
        self.revision += 1;
        Ok(())
    }

    /// Drop every record held by `key`.
    pub fn release(&mut self, key: &AllocationKey) -> Vec<AllocationRecord> {
        let (released, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| matches!(&r.owner, Owner::Key(k) if k == key));
        self.records = kept;
        if !released.is_empty() {
            self.revision += 1;
        }
        released
    }

    /// Mark every bucket overlapped by `cidr` as held by an external VNet.
    ///
    /// Buckets that already have an owner are left alone. Returns the number added.
    pub fn import_cidr(&mut self, name: &str, cidr: &Ipv4) -> usize {
        let mut added = 0;
        for octet in covered_octets(cidr) {
            if let Some(existing) = self.owner_of(octet) {
                log::debug!("import {name} {cidr}: octet {octet} already held by {}", existing.owner);
                continue;
            }
            let owner = Owner::External {
                name: name.to_string(),
            };
            if self.record(AllocationRecord::new(octet, owner)).is_ok() {
                added += 1;
            }
        }
        added
    }
}
