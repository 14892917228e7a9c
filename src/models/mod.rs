//! Domain models for the range allocator.
//!
//! This module contains the core data structures used throughout the application:
//! - [`Ipv4`] - IPv4 address with CIDR notation support
//! - [`AllocationKey`], [`AddressRange`] and [`OverrideRange`] - allocator input and output

mod ipv4;
mod range;

// Re-export public types
pub use ipv4::{broadcast_addr, cut_addr, get_cidr_mask, Ipv4, MAX_LENGTH};
pub use range::{
    app_subnet_prefix, vnet_prefix, AddressRange, AllocationKey, OverrideRange, RangeSource,
};
