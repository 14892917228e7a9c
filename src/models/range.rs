//! Allocation input and output types.

use crate::config;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The `(project, environment)` pair that identifies a deployment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationKey {
    pub project: String,
    pub environment: String,
}

impl AllocationKey {
    pub fn new(project: &str, environment: &str) -> AllocationKey {
        AllocationKey {
            project: project.to_string(),
            environment: environment.to_string(),
        }
    }

    /// True when there is nothing to hash.
    pub fn is_empty(&self) -> bool {
        self.project.is_empty() && self.environment.is_empty()
    }
}

impl fmt::Display for AllocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.environment)
    }
}

/// How an [`AddressRange`] was produced.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RangeSource {
    /// Straight from the hash.
    Computed,
    /// Moved off the hashed bucket because it was already in use.
    Probed,
    /// Caller supplied both prefixes.
    Override,
}

impl fmt::Display for RangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RangeSource::Computed => "computed",
            RangeSource::Probed => "probed",
            RangeSource::Override => "override",
        };
        f.write_str(s)
    }
}

/// Caller supplied VNet and subnet prefixes. Always wins over computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRange {
    pub vnet_prefix: String,
    pub app_subnet_prefix: String,
}

/// Result of an allocation: the VNet `/16` and the application `/24`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    /// Second octet of `10.x.0.0/16`. `None` when the range came from an override.
    pub network_octet: Option<u8>,
    pub vnet_prefix: String,
    pub app_subnet_prefix: String,
    pub source: RangeSource,
}

impl AddressRange {
    /// Format both prefixes for a bucket octet.
    pub fn from_octet(octet: u8, source: RangeSource) -> AddressRange {
        AddressRange {
            network_octet: Some(octet),
            vnet_prefix: vnet_prefix(octet),
            app_subnet_prefix: app_subnet_prefix(octet),
            source,
        }
    }

    pub fn from_override(overrides: &OverrideRange) -> AddressRange {
        AddressRange {
            network_octet: None,
            vnet_prefix: overrides.vnet_prefix.clone(),
            app_subnet_prefix: overrides.app_subnet_prefix.clone(),
            source: RangeSource::Override,
        }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vnet={} subnet={} ({})",
            self.vnet_prefix, self.app_subnet_prefix, self.source
        )
    }
}

/// `10.{octet}.0.0/16`
pub fn vnet_prefix(octet: u8) -> String {
    format!("{}.{octet}.0.0/16", config::VNET_FIRST_OCTET)
}

/// `10.{octet}.1.0/24`
pub fn app_subnet_prefix(octet: u8) -> String {
    format!(
        "{}.{octet}.{}.0/24",
        config::VNET_FIRST_OCTET,
        config::APP_SUBNET_THIRD_OCTET
    )
}
