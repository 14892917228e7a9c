//! Azure Resource Graph query for deployed VNets.

use super::{cli, Inventory};
use crate::config;
use std::error::Error;

/// One row per VNet with its address space.
const VNET_QUERY: &str = r#"resources
        | where type == "microsoft.network/virtualnetworks"
        | project subscription_id=subscriptionId
                ,vnet_name=name
                ,vnet_cidr=properties.addressSpace.addressPrefixes
                ,location=location
        | join kind=leftouter (
            resourcecontainers
                | where type == "microsoft.resources/subscriptions"
                | project subscription_id=subscriptionId, subscription_name=name
            ) on subscription_id
        | project subscription_id, subscription_name, vnet_name, vnet_cidr, location
        | sort by vnet_name asc"#;

/// Fetch every VNet visible to the logged-in `az` account.
///
/// Follows skip tokens until the last page.
pub fn query_inventory() -> Result<Inventory, Box<dyn Error>> {
    let mut inventory = Inventory::default();
    let mut skip_token: Option<String> = None;
    let mut page = 0;

    loop {
        let skip_param = skip_token
            .as_ref()
            .map(|t| format!("--skip-token {t} "))
            .unwrap_or_default();
        let cmd = format!(
            "az graph query --first {} {skip_param}-q '{VNET_QUERY}' --output json",
            config::GRAPH_PAGE_SIZE
        );
        let output = cli::run(&cmd)?;

        let mut deserializer = serde_json::Deserializer::from_str(&output);
        let parsed: Inventory = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
            log::error!("OUTPUT START:\n\n{output}\n\nOUTPUT END\n");
            format!(
                "Error parsing graph page {page}: path={} error={}",
                e.path(),
                e
            )
        })?;

        inventory.count += parsed.count;
        if parsed.total_records.is_some() {
            inventory.total_records = parsed.total_records;
        }
        inventory.data.extend(parsed.data);
        log::info!(
            "got page#{page:2} record_count=+{:3} => {:3}",
            parsed.count,
            inventory.count
        );

        match parsed.skip_token {
            Some(next) if Some(&next) == skip_token.as_ref() => {
                return Err("Skip token not unique - possible infinite loop".into());
            }
            Some(next) => skip_token = Some(next),
            None => break,
        }

        std::thread::sleep(std::time::Duration::from_millis(config::SLEEP_MSEC));
        page += 1;
    }

    log::info!("Got {} VNets from az graph query", inventory.data.len());
    Ok(inventory)
}
