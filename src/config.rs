//! Allocation constants and runtime settings.

/// First octet of every allocated VNet.
pub const VNET_FIRST_OCTET: u8 = 10;
/// Third octet of the application subnet inside the VNet.
pub const APP_SUBNET_THIRD_OCTET: u8 = 1;

/// Lowest bucket octet handed out.
pub const OCTET_BASE: u8 = 50;
/// Number of buckets, so the highest octet is `OCTET_BASE + OCTET_SPAN - 1` (249).
pub const OCTET_SPAN: u16 = 200;

/// Weight applied to the digest term.
pub const DIGEST_WEIGHT: u128 = 17;
/// Weight applied to the project name length.
pub const PROJECT_WEIGHT: u128 = 13;
/// Weight applied to the environment length.
pub const ENVIRONMENT_WEIGHT: u128 = 7;

/// Length of the base32 unique string rendered from the digest.
pub const UNIQUE_STRING_LEN: usize = 13;

/// Project names accepted by caller side validation.
pub const PROJECT_NAME_MIN_LEN: usize = 3;
pub const PROJECT_NAME_MAX_LEN: usize = 10;

/// Default log4rs config file; overridden by `RANGE_ALLOCATOR_LOG_CONFIG`.
pub const LOG_CONFIG_FILE: &str = "log4rs.yml";
pub const ENV_LOG_CONFIG: &str = "RANGE_ALLOCATOR_LOG_CONFIG";

pub const ENV_REGISTRY: &str = "RANGE_ALLOCATOR_REGISTRY";
pub const ENV_SCHEME: &str = "RANGE_ALLOCATOR_SCHEME";
pub const ENV_POLICY: &str = "RANGE_ALLOCATOR_POLICY";
pub const ENV_PROBE: &str = "RANGE_ALLOCATOR_PROBE";

/// Pause between paginated `az graph query` calls.
pub const SLEEP_MSEC: u64 = 200;
/// Page size for `az graph query`.
pub const GRAPH_PAGE_SIZE: u32 = 100;
/// Largest `az` output accepted from a single call.
pub const MAX_CLI_OUTPUT: usize = 500_000;

/// Highest octet handed out.
pub fn octet_max() -> u8 {
    (OCTET_BASE as u16 + OCTET_SPAN - 1) as u8
}

/// Path of the log4rs config file, honouring the environment override.
pub fn log_config_path() -> String {
    std::env::var(ENV_LOG_CONFIG).unwrap_or_else(|_| LOG_CONFIG_FILE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octet_bounds() {
        assert_eq!(OCTET_BASE, 50);
        assert_eq!(octet_max(), 249);
    }
}
