//! Terminal output utilities.

use super::{resource_label, AllocationReport};
use crate::models::RangeSource;
use crate::naming::ResourceType;
use crate::registry::{OctetRegistry, Owner};
use colored::Colorize;

/// Format a value as a quoted, right-aligned field.
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let quoted = format!("\"{}\"", value.to_string());
    if quoted.len() >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

fn row(label: &str, value: impl ToString) -> String {
    format!("{:<18} {}", label.bold(), format_field(value, 18))
}

pub fn allocation_text(report: &AllocationReport) -> String {
    let source = match report.source {
        RangeSource::Computed => report.source.to_string().green(),
        RangeSource::Probed => report.source.to_string().yellow(),
        RangeSource::Override => report.source.to_string().cyan(),
    };
    let mut lines = vec![
        row("project", &report.project),
        row("environment", &report.environment),
        row(
            "network_octet",
            report
                .network_octet
                .map(|o| o.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        row("vnet_prefix", &report.vnet_prefix),
        row("app_subnet_prefix", &report.app_subnet_prefix),
        format!("{:<18} {source}", "source".bold()),
    ];
    if report.recorded {
        lines.push(format!("{:<18} {}", "registry".bold(), "recorded".green()));
    }
    if let Some(warning) = &report.warning {
        lines.push(format!("{} {warning}", "WARNING".on_red()));
    }
    if !report.names.is_empty() {
        lines.push(String::new());
        for entry in &report.names {
            lines.push(row(&resource_label(entry.resource_type), &entry.name));
        }
    }
    lines.join("\n")
}

pub fn registry_text(registry: &OctetRegistry) -> String {
    if registry.records.is_empty() {
        return "registry is empty".to_string();
    }
    let mut lines = vec![format!(
        "{} record(s), revision {}",
        registry.records.len(),
        registry.revision
    )];
    for record in &registry.records {
        let owner = match &record.owner {
            Owner::Key(_) => record.owner.to_string().normal(),
            Owner::External { .. } => record.owner.to_string().dimmed(),
        };
        lines.push(format!(
            "{} {} {owner} {}",
            format_field(record.octet, 6),
            format_field(&record.vnet_prefix, 18),
            record.recorded_at.format("%Y-%m-%d")
        ));
    }
    lines.join("\n")
}

pub fn names_text(names: &[(ResourceType, String)]) -> String {
    names
        .iter()
        .map(|(t, name)| row(&resource_label(*t), name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_field_short() {
        assert_eq!(format_field("test", 10), "    \"test\"");
    }

    #[test]
    fn test_format_field_exact() {
        assert_eq!(format_field("test", 6), "\"test\"");
    }

    #[test]
    fn test_format_field_long() {
        assert_eq!(format_field("10.72.0.0/16", 5), "\"10.72.0.0/16\"");
    }

    #[test]
    fn test_format_field_number() {
        assert_eq!(format_field(72, 6), "  \"72\"");
    }

    #[test]
    fn test_empty_registry_text() {
        assert_eq!(registry_text(&OctetRegistry::new()), "registry is empty");
    }
}
