use async_trait::async_trait;

use super::domain::{Location, LocationPatch, NewLocation};
use super::store::LocationStore;
use crate::errors::ServiceError;

/// Trait abstraction for saved-location storage.
/// Implementations can be file-backed, database-backed, or remote.
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn list_all(&self) -> Vec<Location>;
    async fn get_by_id(&self, id: u64) -> Option<Location>;
    async fn add(&self, new: NewLocation) -> Result<Location, ServiceError>;
    async fn update(&self, id: u64, patch: LocationPatch) -> Result<Option<Location>, ServiceError>;
    async fn delete(&self, id: u64) -> Result<bool, ServiceError>;
    async fn list_favorites(&self) -> Vec<Location>;
    async fn search(&self, query: &str) -> Vec<Location>;
}

#[async_trait]
impl LocationRepository for LocationStore {
    async fn list_all(&self) -> Vec<Location> { self.list_all().await }
    async fn get_by_id(&self, id: u64) -> Option<Location> { self.get_by_id(id).await }
    async fn add(&self, new: NewLocation) -> Result<Location, ServiceError> { self.add(new).await }
    async fn update(&self, id: u64, patch: LocationPatch) -> Result<Option<Location>, ServiceError> { self.update(id, patch).await }
    async fn delete(&self, id: u64) -> Result<bool, ServiceError> { self.delete(id).await }
    async fn list_favorites(&self) -> Vec<Location> { self.list_favorites().await }
    async fn search(&self, query: &str) -> Vec<Location> { self.search(query).await }
}
