//! Database configuration

use crate::codec::ReadPolicy;

/// Tunables for one database registry
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Read-path behavior for fields failing post-coercion validation
    pub read_policy: ReadPolicy,
}

impl DatabaseConfig {
    /// Defaults: lenient reads
    pub fn new() -> Self {
        Self {
            read_policy: ReadPolicy::Lenient,
        }
    }

    /// Set the read-path validation policy
    pub fn read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new()
    }
}
