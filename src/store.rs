use crate::error::StoreError;
use crate::models::{FileRecord, TaskDraft, TaskPatch, TaskRow, User};
use async_trait::async_trait;

/// Persistence and auth as seen by the app. Rows come back unvalidated and
/// go through `ingest` before anything else looks at them.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_tasks(&self, owner_id: Option<&str>) -> Result<Vec<TaskRow>, StoreError>;
    async fn create_task(
        &self,
        draft: &TaskDraft,
        owner_id: Option<&str>,
    ) -> Result<TaskRow, StoreError>;
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<TaskRow, StoreError>;
    async fn delete_task(&self, id: &str) -> Result<(), StoreError>;

    async fn list_files(&self, owner_id: Option<&str>) -> Result<Vec<FileRecord>, StoreError>;
    async fn upload_file(
        &self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        owner_id: Option<&str>,
    ) -> Result<FileRecord, StoreError>;
    async fn delete_file(&self, id: &str, path: Option<&str>) -> Result<(), StoreError>;

    async fn current_user(&self) -> Result<Option<User>, StoreError>;
    async fn sign_out(&self) -> Result<(), StoreError>;
}
