//! `key=value` output, one pair per line.

use super::{resource_label, AllocationReport};
use crate::naming::ResourceType;
use crate::registry::OctetRegistry;

pub fn allocation_kv(report: &AllocationReport) -> String {
    let mut lines = vec![
        format!("project={}", report.project),
        format!("environment={}", report.environment),
        format!(
            "network_octet={}",
            report
                .network_octet
                .map(|o| o.to_string())
                .unwrap_or_default()
        ),
        format!("vnet_prefix={}", report.vnet_prefix),
        format!("app_subnet_prefix={}", report.app_subnet_prefix),
        format!("source={}", report.source),
        format!("recorded={}", report.recorded),
    ];
    if let Some(warning) = &report.warning {
        lines.push(format!("warning={warning}"));
    }
    for entry in &report.names {
        lines.push(format!(
            "name.{}={}",
            resource_label(entry.resource_type),
            entry.name
        ));
    }
    lines.join("\n")
}

pub fn registry_kv(registry: &OctetRegistry) -> String {
    registry
        .records
        .iter()
        .map(|r| format!("{}={}", r.octet, r.owner))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn names_kv(names: &[(ResourceType, String)]) -> String {
    names
        .iter()
        .map(|(t, name)| format!("{}={name}", resource_label(*t)))
        .collect::<Vec<_>>()
        .join("\n")
}
