//! Allocation error taxonomy.

use thiserror::Error;

/// Failures surfaced by the allocator and the collision registry.
///
/// A hash collision on its own is never an error; it only becomes
/// [`AllocError::Collision`] when a registry check runs with the reject policy.
#[derive(Debug, Error)]
pub enum AllocError {
    /// Both project and environment empty, and no override given.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Override prefixes that would be passed downstream as garbage.
    #[error("malformed override: {0}")]
    MalformedOverride(String),

    /// The octet is already recorded for another owner.
    #[error("octet {octet} already allocated to {owner}")]
    Collision { octet: u8, owner: String },

    /// Every bucket in the range is in use.
    #[error("no free octet left in range {lo}..={hi}")]
    RangeExhausted { lo: u8, hi: u8 },

    /// Registry inconsistency or persistence failure.
    #[error("registry: {0}")]
    Registry(String),
}

impl AllocError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            AllocError::InvalidInput(_) => 2,
            AllocError::MalformedOverride(_) => 3,
            AllocError::Collision { .. } | AllocError::RangeExhausted { .. } => 4,
            AllocError::Registry(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_eq!(AllocError::InvalidInput("x".into()).exit_code(), 2);
        assert_eq!(AllocError::MalformedOverride("x".into()).exit_code(), 3);
        assert_eq!(AllocError::RangeExhausted { lo: 50, hi: 249 }.exit_code(), 4);
    }

    #[test]
    fn test_collision_message() {
        let e = AllocError::Collision {
            octet: 87,
            owner: "myapp/dev".to_string(),
        };
        assert_eq!(e.to_string(), "octet 87 already allocated to myapp/dev");
    }
}
