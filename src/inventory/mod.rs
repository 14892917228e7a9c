//! Ranges already taken by deployed VNets.
//!
//! The deployed VNets are the durable record of which `/16` blocks are in use.
//! An inventory comes from an exported JSON file or from `az graph query`:
//! - [`cli`] - running the Azure CLI
//! - [`graph`] - the paginated Resource Graph query

mod cli;
mod graph;

use crate::allocator::covered_octets;
use crate::models::Ipv4;
use crate::registry::OctetRegistry;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

pub use graph::query_inventory;

/// A deployed VNet and its address space.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VnetRecord {
    pub vnet_name: String,
    #[serde(default)]
    pub vnet_cidr: Vec<Ipv4>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub subscription_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Resource Graph response shape, also used for exported files.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Inventory {
    pub data: Vec<VnetRecord>,
    #[serde(default)]
    pub skip_token: Option<String>,
    #[serde(default)]
    pub total_records: Option<u32>,
    #[serde(default)]
    pub count: i32,
}

impl Inventory {
    /// VNets with duplicates (same name and subscription) removed.
    ///
    /// Graph pages and subnet level exports repeat the same VNet.
    pub fn unique_vnets(&self) -> Vec<&VnetRecord> {
        self.data
            .iter()
            .unique_by(|v| (v.vnet_name.as_str(), v.subscription_id.as_deref()))
            .collect()
    }

    /// Allocation buckets overlapped by any VNet, with the VNets overlapping each.
    pub fn in_use_octets(&self) -> BTreeMap<u8, Vec<&VnetRecord>> {
        let mut octets: BTreeMap<u8, Vec<&VnetRecord>> = BTreeMap::new();
        for vnet in self.unique_vnets() {
            let covered = vnet.vnet_cidr.iter().flat_map(covered_octets).unique();
            for octet in covered {
                octets.entry(octet).or_default().push(vnet);
            }
        }
        octets
    }

    /// Record every overlapped bucket in `registry` as externally held.
    ///
    /// `own_vnet` names a VNet to leave out, typically the one the key being
    /// allocated already deployed. Returns the number of buckets added.
    pub fn import_into(&self, registry: &mut OctetRegistry, own_vnet: Option<&str>) -> usize {
        let mut added = 0;
        let vnets = self
            .unique_vnets()
            .into_iter()
            .filter(|v| Some(v.vnet_name.as_str()) != own_vnet);
        for vnet in vnets {
            for cidr in &vnet.vnet_cidr {
                added += registry.import_cidr(&vnet.vnet_name, cidr);
            }
        }
        log::info!(
            "Imported {added} in-use octet(s) from {} VNet(s)",
            self.unique_vnets().len()
        );
        added
    }
}

/// Read an inventory export.
pub fn read_inventory<P: AsRef<Path>>(path: P) -> Result<Inventory, Box<dyn Error>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(format!("Inventory file does not exist: {}", path.display()).into());
    }
    log::info!("Reading VNet inventory: {}", path.display());
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading inventory {}: {e}", path.display()))?;
    let mut deserializer = serde_json::Deserializer::from_str(&json);
    let inventory: Inventory = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| format!("Error parsing inventory JSON: path={} error={}", e.path(), e))?;
    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Owner;

    const TEST_INVENTORY: &str = "src/tests/test_data/vnet_inventory_01.json";

    #[test]
    fn test_read_inventory() {
        let inventory = read_inventory(TEST_INVENTORY).expect("Error reading inventory");
        assert_eq!(inventory.data.len(), 6);
        assert_eq!(inventory.data[0].vnet_name, "vnet-cloudpi-dev");
        assert_eq!(inventory.total_records, Some(6));
    }

    #[test]
    fn test_missing_inventory() {
        assert!(read_inventory("src/tests/test_data/missing.json").is_err());
    }

    #[test]
    fn test_unique_vnets() {
        let inventory = read_inventory(TEST_INVENTORY).unwrap();
        assert_eq!(inventory.unique_vnets().len(), 5);
    }

    #[test]
    fn test_in_use_octets() {
        let inventory = read_inventory(TEST_INVENTORY).unwrap();
        let octets = inventory.in_use_octets();
        assert_eq!(octets.keys().copied().collect::<Vec<u8>>(), vec![72, 86, 87, 200]);
        assert_eq!(octets[&87][0].vnet_name, "vnet-hub");
        assert_eq!(octets[&200].len(), 1);
    }

    #[test]
    fn test_import_into_registry() {
        let inventory = read_inventory(TEST_INVENTORY).unwrap();
        let mut registry = OctetRegistry::new();
        assert_eq!(inventory.import_into(&mut registry, None), 4);
        assert_eq!(
            registry.owner_of(72).unwrap().owner,
            Owner::External {
                name: "vnet-cloudpi-dev".to_string()
            }
        );
        // second import adds nothing
        assert_eq!(inventory.import_into(&mut registry, None), 0);
    }

    #[test]
    fn test_import_skips_own_vnet() {
        let inventory = read_inventory(TEST_INVENTORY).unwrap();
        let mut registry = OctetRegistry::new();
        assert_eq!(inventory.import_into(&mut registry, Some("vnet-cloudpi-dev")), 3);
        assert!(!registry.is_in_use(72));
    }

    #[test]
    fn test_bad_cidr_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(
            &path,
            r#"{"data": [{"vnet_name": "x", "vnet_cidr": ["10.1.0.0"]}], "count": 1}"#,
        )
        .unwrap();
        let err = read_inventory(&path).unwrap_err().to_string();
        assert!(err.contains("data[0].vnet_cidr[0]"), "{err}");
    }
}
