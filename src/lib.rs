//! Deterministic, conflict-aware `10.x.0.0/16` allocation for project environments.
//!
//! - [`allocator`] - the pure `(project, environment)` to range function
//! - [`registry`] - optional record of octets in use, with collision policies
//! - [`inventory`] - in-use ranges taken from deployed VNets
//! - [`naming`] - resource names for the same key
//! - [`output`] - text, `key=value` and JSON rendering

pub mod allocator;
pub mod cli;
pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod naming;
pub mod output;
pub mod registry;

use allocator::{resolve_override, DeterministicRangeAllocator};
use cli::{AllocateArgs, Cli, Command, ImportArgs, ListArgs, NamesArgs, ReleaseArgs};
use error::AllocError;
use inventory::Inventory;
use log::LevelFilter;
use models::AllocationKey;
use naming::{all_names, resource_name, validate_project_name, NamingConfig, ResourceType};
use output::{render_allocation, render_names, render_registry, AllocationReport};
use registry::{allocate_checked, record_allocation, Allocation, OctetRegistry, RegistryFile};
use std::error::Error;

pub use allocator::allocate;

/// Start log4rs from the config file, or log warnings to stderr without one.
pub fn init_logging() -> Result<(), Box<dyn Error>> {
    let path = config::log_config_path();
    if std::path::Path::new(&path).exists() {
        log4rs::init_file(&path, Default::default())
            .map_err(|e| format!("Error initializing log4rs from {path}: {e}"))?;
        return Ok(());
    }

    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn))?;
    log4rs::init_config(config)?;
    Ok(())
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Allocate(args) => run_allocate(&args),
        Command::Release(args) => run_release(&args),
        Command::List(args) => run_list(&args),
        Command::Import(args) => run_import(&args),
        Command::Names(args) => run_names(&args),
    }
}

fn load_inventory(args: &AllocateArgs) -> Result<Option<Inventory>, Box<dyn Error>> {
    args.inventory
        .as_ref()
        .map(|path| inventory::read_inventory(path))
        .transpose()
}

/// Registry plus the inventory's ranges, used only for the collision check.
///
/// The key's own VNet (by naming policy) is not counted against it.
fn check_view(
    registry: &OctetRegistry,
    inventory: Option<&Inventory>,
    key: &AllocationKey,
) -> OctetRegistry {
    let mut view = registry.clone();
    if let Some(inventory) = inventory {
        let own_vnet = resource_name(
            ResourceType::VirtualNetwork,
            &NamingConfig::new(&key.project, &key.environment),
        );
        inventory.import_into(&mut view, Some(&own_vnet));
    }
    view
}

pub fn run_allocate(args: &AllocateArgs) -> Result<(), Box<dyn Error>> {
    let report = allocation_report(args)?;
    println!("{}", render_allocation(&report, args.format)?);
    Ok(())
}

/// Allocate (and record, with a registry) and build the report to print.
///
/// `recorded` is set only when the registry gained a record for the key.
pub fn allocation_report(args: &AllocateArgs) -> Result<AllocationReport, Box<dyn Error>> {
    if !args.lenient {
        validate_project_name(&args.project)?;
    }
    let allocator = DeterministicRangeAllocator::new(args.scheme);
    let key = AllocationKey::new(&args.project, &args.environment);
    let overrides = resolve_override(args.vnet_prefix.as_deref(), args.subnet_prefix.as_deref())?;
    let inventory = load_inventory(args)?;

    let check = |registry: &OctetRegistry| -> Result<Allocation, AllocError> {
        let view = check_view(registry, inventory.as_ref(), &key);
        allocate_checked(
            &allocator,
            &view,
            &key,
            overrides.as_ref(),
            args.policy,
            args.probe,
        )
    };

    let (allocation, recorded) = match &args.registry {
        Some(path) if !args.dry_run => {
            let file = RegistryFile::new(path);
            let (allocation, count) = file.transaction(|registry| {
                let allocation = check(&*registry)?;
                let count = record_allocation(registry, &key, &allocation)?;
                Ok((allocation, count))
            })?;
            if count == 0 {
                log::warn!("{key}: nothing recorded in {}", path.display());
            }
            (allocation, count > 0)
        }
        Some(path) => (check(&RegistryFile::new(path).load()?)?, false),
        None if inventory.is_some() => (check(&OctetRegistry::new())?, false),
        None => {
            let range = allocator.allocate_key(&key, overrides.as_ref())?;
            (Allocation { range, warning: None }, false)
        }
    };

    log::info!("{key}: {}", allocation.range);
    let mut report = AllocationReport::new(&key, &allocation);
    report.recorded = recorded;
    if args.names {
        let naming = NamingConfig::new(&args.project, &args.environment).with_unique_suffix();
        report = report.with_names(all_names(&naming));
    }
    Ok(report)
}

pub fn run_release(args: &ReleaseArgs) -> Result<(), Box<dyn Error>> {
    let key = AllocationKey::new(&args.project, &args.environment);
    let released = RegistryFile::new(&args.registry)
        .transaction(|registry| Ok(registry.release(&key)))?;
    if released.is_empty() {
        log::warn!("{key}: nothing recorded in {}", args.registry.display());
    }
    for record in &released {
        println!("released {} {}", record.octet, record.vnet_prefix);
    }
    Ok(())
}

pub fn run_list(args: &ListArgs) -> Result<(), Box<dyn Error>> {
    let registry = RegistryFile::new(&args.registry).load()?;
    println!("{}", render_registry(&registry, args.format)?);
    Ok(())
}

pub fn run_import(args: &ImportArgs) -> Result<(), Box<dyn Error>> {
    let inventory = match &args.inventory {
        Some(path) => inventory::read_inventory(path)?,
        None => inventory::query_inventory()?,
    };
    let added = RegistryFile::new(&args.registry)
        .transaction(|registry| Ok(inventory.import_into(registry, None)))?;
    println!("imported {added} octet(s)");
    Ok(())
}

pub fn run_names(args: &NamesArgs) -> Result<(), Box<dyn Error>> {
    let mut naming = NamingConfig::new(&args.project, &args.environment);
    if !args.no_suffix {
        naming = naming.with_unique_suffix();
    }
    println!("{}", render_names(&all_names(&naming), args.format)?);
    Ok(())
}
