//! Registry shared between threads.
//!
//! Check and record happen under one lock, so two callers can never both
//! see a bucket as free and take it.

use super::{allocate_checked, record_allocation, Allocation, CollisionPolicy, OctetRegistry};
use crate::allocator::{DeterministicRangeAllocator, ProbeStrategy};
use crate::error::AllocError;
use crate::models::{AllocationKey, OverrideRange};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct SharedRegistry {
    inner: Mutex<OctetRegistry>,
}

impl SharedRegistry {
    pub fn new(registry: OctetRegistry) -> SharedRegistry {
        SharedRegistry {
            inner: Mutex::new(registry),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, OctetRegistry>, AllocError> {
        self.inner
            .lock()
            .map_err(|e| AllocError::Registry(format!("registry lock poisoned: {e}")))
    }

    /// Allocate `key` and record the result in one critical section.
    pub fn allocate(
        &self,
        allocator: &DeterministicRangeAllocator,
        key: &AllocationKey,
        overrides: Option<&OverrideRange>,
        policy: CollisionPolicy,
        strategy: ProbeStrategy,
    ) -> Result<Allocation, AllocError> {
        let mut registry = self.lock()?;
        let allocation = allocate_checked(allocator, &registry, key, overrides, policy, strategy)?;
        record_allocation(&mut registry, key, &allocation)?;
        Ok(allocation)
    }

    /// Release every octet held by `key`. Returns how many were released.
    pub fn release(&self, key: &AllocationKey) -> Result<usize, AllocError> {
        Ok(self.lock()?.release(key).len())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Result<OctetRegistry, AllocError> {
        Ok(self.lock()?.clone())
    }

    pub fn into_inner(self) -> Result<OctetRegistry, AllocError> {
        self.inner
            .into_inner()
            .map_err(|e| AllocError::Registry(format!("registry lock poisoned: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_concurrent_allocations_never_share_an_octet() {
        let shared = SharedRegistry::default();
        let allocator = DeterministicRangeAllocator::default();
        let projects: Vec<String> = (0..60).map(|i| format!("svc{i}")).collect();

        std::thread::scope(|scope| {
            for project in &projects {
                let shared = &shared;
                let allocator = &allocator;
                scope.spawn(move || {
                    shared
                        .allocate(
                            allocator,
                            &AllocationKey::new(project, "dev"),
                            None,
                            CollisionPolicy::Probe,
                            ProbeStrategy::Quadratic,
                        )
                        .unwrap();
                });
            }
        });

        let registry = shared.into_inner().unwrap();
        let octets: BTreeSet<u8> = registry.in_use();
        assert_eq!(registry.records.len(), 60);
        assert_eq!(octets.len(), 60);
    }

    #[test]
    fn test_release() {
        let shared = SharedRegistry::default();
        let allocator = DeterministicRangeAllocator::default();
        let key = AllocationKey::new("cloudpi", "dev");
        let allocation = shared
            .allocate(&allocator, &key, None, CollisionPolicy::Reject, ProbeStrategy::Linear)
            .unwrap();
        assert_eq!(allocation.range.network_octet, Some(72));
        assert_eq!(shared.release(&key).unwrap(), 1);
        assert!(shared.snapshot().unwrap().records.is_empty());
    }
}
