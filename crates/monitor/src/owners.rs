//! Owner Directory: hive → owning user, user → hives.

use std::collections::HashMap;

use async_trait::async_trait;

use hivewatch_core::{HiveId, Owner, UserId};

use crate::store::StoreError;

#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn owner_of_hive(&self, hive_id: &str) -> Result<Option<Owner>, StoreError>;

    async fn hives_of_user(&self, user_id: &str) -> Result<Vec<HiveId>, StoreError>;
}

/// Fixed ownership table, for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemoryOwnerDirectory {
    owners: HashMap<UserId, Owner>,
    hive_owner: HashMap<HiveId, UserId>,
}

impl MemoryOwnerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hive_id` as owned by `owner`.
    pub fn with_hive(mut self, hive_id: impl Into<HiveId>, owner: Owner) -> Self {
        self.hive_owner.insert(hive_id.into(), owner.user_id.clone());
        self.owners.insert(owner.user_id.clone(), owner);
        self
    }
}

#[async_trait]
impl OwnerDirectory for MemoryOwnerDirectory {
    async fn owner_of_hive(&self, hive_id: &str) -> Result<Option<Owner>, StoreError> {
        Ok(self
            .hive_owner
            .get(hive_id)
            .and_then(|user_id| self.owners.get(user_id))
            .cloned())
    }

    async fn hives_of_user(&self, user_id: &str) -> Result<Vec<HiveId>, StoreError> {
        let mut hives: Vec<HiveId> = self
            .hive_owner
            .iter()
            .filter(|(_, owner)| owner.as_str() == user_id)
            .map(|(hive, _)| hive.clone())
            .collect();
        hives.sort();
        Ok(hives)
    }
}
