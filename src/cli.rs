//! Command line definition.

use crate::allocator::{HashScheme, ProbeStrategy};
use crate::config;
use crate::output::OutputFormat;
use crate::registry::CollisionPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vnet-range-allocator", version)]
#[command(about = "Deterministic 10.x.0.0/16 ranges for project environments")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute (and optionally record) the range for a project environment
    Allocate(AllocateArgs),
    /// Drop the registry entries of a project environment
    Release(ReleaseArgs),
    /// Show the registry
    List(ListArgs),
    /// Mark ranges of deployed VNets as in use
    Import(ImportArgs),
    /// Resource names for a project environment
    Names(NamesArgs),
}

#[derive(Args, Debug)]
pub struct AllocateArgs {
    pub project: String,
    pub environment: String,

    /// Explicit VNet prefix; requires --subnet-prefix
    #[arg(long)]
    pub vnet_prefix: Option<String>,

    /// Explicit application subnet prefix; requires --vnet-prefix
    #[arg(long)]
    pub subnet_prefix: Option<String>,

    #[arg(long, value_enum, env = config::ENV_SCHEME, default_value_t = HashScheme::Digest)]
    pub scheme: HashScheme,

    /// Registry file to check against and record into
    #[arg(long, env = config::ENV_REGISTRY)]
    pub registry: Option<PathBuf>,

    /// VNet export whose ranges count as in use for this check
    #[arg(long)]
    pub inventory: Option<PathBuf>,

    #[arg(long, value_enum, env = config::ENV_POLICY, default_value_t = CollisionPolicy::Probe)]
    pub policy: CollisionPolicy,

    #[arg(long, value_enum, env = config::ENV_PROBE, default_value_t = ProbeStrategy::Linear)]
    pub probe: ProbeStrategy,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also print resource names
    #[arg(long)]
    pub names: bool,

    /// Check against the registry without recording
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the project name format check
    #[arg(long)]
    pub lenient: bool,
}

#[derive(Args, Debug)]
pub struct ReleaseArgs {
    pub project: String,
    pub environment: String,

    #[arg(long, env = config::ENV_REGISTRY)]
    pub registry: PathBuf,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, env = config::ENV_REGISTRY)]
    pub registry: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[arg(long, env = config::ENV_REGISTRY)]
    pub registry: PathBuf,

    /// VNet export file (Resource Graph JSON)
    #[arg(long, conflicts_with = "from_azure", required_unless_present = "from_azure")]
    pub inventory: Option<PathBuf>,

    /// Query VNets with `az graph query`
    #[arg(long)]
    pub from_azure: bool,
}

#[derive(Args, Debug)]
pub struct NamesArgs {
    pub project: String,
    pub environment: String,

    /// Leave the digest suffix off global names
    #[arg(long)]
    pub no_suffix: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
