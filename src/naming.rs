//! Resource naming policy.
//!
//! One pure function, [`resource_name`], turns a resource type and an explicit
//! [`NamingConfig`] into a name. Globally scoped resources (key vault, storage
//! account) carry a suffix derived from the key digest.

use crate::allocator::unique_string;
use crate::config;
use crate::error::AllocError;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Characters of the unique string appended to global names.
pub const NAME_SUFFIX_LEN: usize = 6;

static PROJECT_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_project_name_regex() -> &'static Regex {
    PROJECT_NAME_REGEX.get_or_init(|| {
        Regex::new(&format!(
            "^[a-z0-9]{{{},{}}}$",
            config::PROJECT_NAME_MIN_LEN,
            config::PROJECT_NAME_MAX_LEN
        ))
        .expect("Invalid Regex")
    })
}

/// Caller side check: 3 to 10 lowercase alphanumeric characters.
///
/// The allocator itself accepts any string.
pub fn validate_project_name(name: &str) -> Result<(), AllocError> {
    if get_project_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(AllocError::InvalidInput(format!(
            "project name '{name}' must be {}-{} lowercase letters or digits",
            config::PROJECT_NAME_MIN_LEN,
            config::PROJECT_NAME_MAX_LEN
        )))
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    ResourceGroup,
    VirtualNetwork,
    Subnet,
    NetworkSecurityGroup,
    PublicIp,
    NetworkInterface,
    VirtualMachine,
    KeyVault,
    StorageAccount,
    LogAnalyticsWorkspace,
    RecoveryServicesVault,
}

impl ResourceType {
    pub const ALL: [ResourceType; 11] = [
        ResourceType::ResourceGroup,
        ResourceType::VirtualNetwork,
        ResourceType::Subnet,
        ResourceType::NetworkSecurityGroup,
        ResourceType::PublicIp,
        ResourceType::NetworkInterface,
        ResourceType::VirtualMachine,
        ResourceType::KeyVault,
        ResourceType::StorageAccount,
        ResourceType::LogAnalyticsWorkspace,
        ResourceType::RecoveryServicesVault,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            ResourceType::ResourceGroup => "rg",
            ResourceType::VirtualNetwork => "vnet",
            ResourceType::Subnet => "snet",
            ResourceType::NetworkSecurityGroup => "nsg",
            ResourceType::PublicIp => "pip",
            ResourceType::NetworkInterface => "nic",
            ResourceType::VirtualMachine => "vm",
            ResourceType::KeyVault => "kv",
            ResourceType::StorageAccount => "st",
            ResourceType::LogAnalyticsWorkspace => "log",
            ResourceType::RecoveryServicesVault => "rsv",
        }
    }

    /// Longest name Azure accepts for the type.
    pub fn max_len(&self) -> usize {
        match self {
            ResourceType::ResourceGroup => 90,
            ResourceType::VirtualNetwork | ResourceType::VirtualMachine => 64,
            ResourceType::Subnet
            | ResourceType::NetworkSecurityGroup
            | ResourceType::PublicIp
            | ResourceType::NetworkInterface => 80,
            ResourceType::KeyVault | ResourceType::StorageAccount => 24,
            ResourceType::LogAnalyticsWorkspace => 63,
            ResourceType::RecoveryServicesVault => 50,
        }
    }

    /// Name must be unique across all of Azure.
    pub fn is_global(&self) -> bool {
        matches!(self, ResourceType::KeyVault | ResourceType::StorageAccount)
    }

    fn allows_separator(&self) -> bool {
        !matches!(self, ResourceType::StorageAccount)
    }
}

/// Everything a name depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConfig {
    pub project: String,
    pub environment: String,
    pub separator: char,
    /// Appended to global names when set.
    pub unique_suffix: Option<String>,
}

impl NamingConfig {
    pub fn new(project: &str, environment: &str) -> NamingConfig {
        NamingConfig {
            project: project.to_string(),
            environment: environment.to_string(),
            separator: '-',
            unique_suffix: None,
        }
    }

    /// Derive the global suffix from the key digest.
    pub fn with_unique_suffix(mut self) -> NamingConfig {
        let suffix: String = unique_string(&self.project, &self.environment)
            .chars()
            .take(NAME_SUFFIX_LEN)
            .collect();
        self.unique_suffix = Some(suffix);
        self
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Name for `resource_type` under `config`.
pub fn resource_name(resource_type: ResourceType, config: &NamingConfig) -> String {
    let mut parts = vec![
        resource_type.abbreviation().to_string(),
        sanitize(&config.project),
        sanitize(&config.environment),
    ];
    if resource_type == ResourceType::Subnet {
        parts.push("app".to_string());
    }
    if resource_type.is_global() {
        if let Some(suffix) = &config.unique_suffix {
            parts.push(sanitize(suffix));
        }
    }

    let separator = if resource_type.allows_separator() {
        config.separator.to_string()
    } else {
        String::new()
    };
    let name: String = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(&separator)
        .chars()
        .take(resource_type.max_len())
        .collect();
    name.trim_end_matches(config.separator).to_string()
}

/// Names for every resource type, in [`ResourceType::ALL`] order.
pub fn all_names(config: &NamingConfig) -> Vec<(ResourceType, String)> {
    ResourceType::ALL
        .iter()
        .map(|t| (*t, resource_name(*t, config)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_name() {
        assert!(validate_project_name("cloudpi").is_ok());
        assert!(validate_project_name("abc").is_ok());
        assert!(validate_project_name("abcdefghij").is_ok());
        assert!(validate_project_name("ab").is_err());
        assert!(validate_project_name("abcdefghijk").is_err());
        assert!(validate_project_name("Cloudpi").is_err());
        assert!(validate_project_name("cloud-pi").is_err());
        assert!(validate_project_name("").is_err());
    }

    #[test]
    fn test_plain_names() {
        let config = NamingConfig::new("cloudpi", "dev");
        assert_eq!(resource_name(ResourceType::ResourceGroup, &config), "rg-cloudpi-dev");
        assert_eq!(resource_name(ResourceType::VirtualNetwork, &config), "vnet-cloudpi-dev");
        assert_eq!(resource_name(ResourceType::Subnet, &config), "snet-cloudpi-dev-app");
        assert_eq!(resource_name(ResourceType::VirtualMachine, &config), "vm-cloudpi-dev");
        assert_eq!(resource_name(ResourceType::KeyVault, &config), "kv-cloudpi-dev");
    }

    #[test]
    fn test_global_names_carry_suffix() {
        // unique string for cloudpi/dev starts "mvcp67"
        let config = NamingConfig::new("cloudpi", "dev").with_unique_suffix();
        assert_eq!(resource_name(ResourceType::KeyVault, &config), "kv-cloudpi-dev-mvcp67");
        assert_eq!(resource_name(ResourceType::StorageAccount, &config), "stcloudpidevmvcp67");
        assert_eq!(resource_name(ResourceType::ResourceGroup, &config), "rg-cloudpi-dev");
    }

    #[test]
    fn test_names_respect_limits() {
        let config = NamingConfig::new("abcdefghij", "production").with_unique_suffix();
        for (resource_type, name) in all_names(&config) {
            assert!(name.len() <= resource_type.max_len(), "{name}");
            assert!(!name.ends_with('-'), "{name}");
            assert!(!name.contains("--"), "{name}");
        }
        let storage = resource_name(ResourceType::StorageAccount, &config);
        assert_eq!(storage.len(), 24);
        assert!(storage.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_truncation_does_not_leave_separator() {
        let config = NamingConfig::new("abcdefghij", "abcdefghi-x");
        let name = resource_name(ResourceType::KeyVault, &config);
        assert_eq!(name, "kv-abcdefghij-abcdefghix");

        // cut at 24 lands right after the separator before "zz"
        let mut config = NamingConfig::new("abcdefghij", "abcdefghi");
        config.unique_suffix = Some("zz".to_string());
        assert_eq!(
            resource_name(ResourceType::KeyVault, &config),
            "kv-abcdefghij-abcdefghi"
        );
    }

    #[test]
    fn test_sanitize() {
        let config = NamingConfig::new("Cloud_Pi", "Dev 1");
        assert_eq!(resource_name(ResourceType::ResourceGroup, &config), "rg-cloudpi-dev1");
        let config = NamingConfig::new("cloudpi", "");
        assert_eq!(resource_name(ResourceType::ResourceGroup, &config), "rg-cloudpi");
    }
}
