//! Thread provider
//!
//! Creates conversation threads for a slot. The session backend owns thread
//! storage; the slot only needs ids.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// Creates conversation threads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThreadProvider: Send + Sync {
    /// Create a new, empty thread for `agent_id` and return its id
    async fn create_thread(&self, agent_id: &str) -> Result<String>;
}

/// In-process provider that mints thread ids locally
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalThreadProvider;

#[async_trait]
impl ThreadProvider for LocalThreadProvider {
    async fn create_thread(&self, agent_id: &str) -> Result<String> {
        Ok(format!("{agent_id}-{}", Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_provider_unique_ids() {
        let provider = LocalThreadProvider;
        let a = provider.create_thread("doctorAgent").await.unwrap();
        let b = provider.create_thread("doctorAgent").await.unwrap();
        assert!(a.starts_with("doctorAgent-"));
        assert_ne!(a, b);
    }
}
