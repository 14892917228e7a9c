//! Output formatting for allocation results.
//!
//! This module turns allocations and registries into text for stdout:
//! - [`terminal`] - aligned, colored text
//! - [`kv`] - `key=value` lines for scripts and template parameters
//!
//! JSON goes straight through serde.

mod kv;
mod terminal;

use crate::models::{AllocationKey, RangeSource};
use crate::naming::ResourceType;
use crate::registry::{Allocation, OctetRegistry};
use serde::Serialize;
use std::error::Error;

pub use terminal::format_field;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Kv,
    Json,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ResourceNameEntry {
    pub resource_type: ResourceType,
    pub name: String,
}

/// Flat view of one allocation, shared by every format.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AllocationReport {
    pub project: String,
    pub environment: String,
    pub network_octet: Option<u8>,
    pub vnet_prefix: String,
    pub app_subnet_prefix: String,
    pub source: RangeSource,
    pub digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<ResourceNameEntry>,
    pub recorded: bool,
}

impl AllocationReport {
    pub fn new(key: &AllocationKey, allocation: &Allocation) -> AllocationReport {
        AllocationReport {
            project: key.project.clone(),
            environment: key.environment.clone(),
            network_octet: allocation.range.network_octet,
            vnet_prefix: allocation.range.vnet_prefix.clone(),
            app_subnet_prefix: allocation.range.app_subnet_prefix.clone(),
            source: allocation.range.source,
            digest: crate::allocator::digest_hex(&key.project, &key.environment),
            warning: allocation.warning.as_ref().map(|w| w.to_string()),
            names: Vec::new(),
            recorded: false,
        }
    }

    pub fn with_names(mut self, names: Vec<(ResourceType, String)>) -> AllocationReport {
        self.names = names
            .into_iter()
            .map(|(resource_type, name)| ResourceNameEntry {
                resource_type,
                name,
            })
            .collect();
        self
    }
}

pub fn render_allocation(
    report: &AllocationReport,
    format: OutputFormat,
) -> Result<String, Box<dyn Error>> {
    match format {
        OutputFormat::Text => Ok(terminal::allocation_text(report)),
        OutputFormat::Kv => Ok(kv::allocation_kv(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)
            .map_err(|e| format!("Error serializing report: {e}"))?),
    }
}

pub fn render_registry(
    registry: &OctetRegistry,
    format: OutputFormat,
) -> Result<String, Box<dyn Error>> {
    match format {
        OutputFormat::Text => Ok(terminal::registry_text(registry)),
        OutputFormat::Kv => Ok(kv::registry_kv(registry)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(registry)
            .map_err(|e| format!("Error serializing registry: {e}"))?),
    }
}

pub fn render_names(
    names: &[(ResourceType, String)],
    format: OutputFormat,
) -> Result<String, Box<dyn Error>> {
    match format {
        OutputFormat::Text => Ok(terminal::names_text(names)),
        OutputFormat::Kv => Ok(kv::names_kv(names)),
        OutputFormat::Json => {
            let entries: Vec<ResourceNameEntry> = names
                .iter()
                .map(|(resource_type, name)| ResourceNameEntry {
                    resource_type: *resource_type,
                    name: name.clone(),
                })
                .collect();
            Ok(serde_json::to_string_pretty(&entries)
                .map_err(|e| format!("Error serializing names: {e}"))?)
        }
    }
}

/// snake_case label of a resource type, e.g. `key_vault`.
pub fn resource_label(resource_type: ResourceType) -> String {
    serde_json::to_value(resource_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{resource_type:?}"))
}
