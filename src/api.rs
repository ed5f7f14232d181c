use crate::error::StoreError;
use crate::files::{key_from_public_url, storage_key};
use crate::models::{FileRecord, TaskDraft, TaskPatch, TaskRow, User};
use crate::store::RemoteStore;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

const FILES_BUCKET: &str = "files";

#[derive(Deserialize, Debug)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

/// HTTP client for the hosted backend: PostgREST tables under `/rest/v1`,
/// auth under `/auth/v1` and object storage under `/storage/v1`.
pub struct StoreClient {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

impl StoreClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<StoreClient, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(StoreClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: RwLock::new(None),
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().ok().and_then(|t| t.clone())
    }

    fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.access_token.write() {
            *slot = token;
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse, StoreError> {
        let res = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = check(res).await?.json().await?;
        self.set_access_token(Some(auth.access_token.clone()));
        debug!(user = %auth.user.id, "signed in");
        Ok(auth)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, FILES_BUCKET, key
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn list_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        owner_id: Option<&str>,
        order: &str,
    ) -> Result<Vec<T>, StoreError> {
        let mut query = vec![("select", "*".to_string()), ("order", order.to_string())];
        if let Some(owner) = owner_id {
            query.push(("user_id", format!("eq.{}", owner)));
        }
        let res = self
            .request(Method::GET, &format!("/rest/v1/{}", table))
            .query(&query)
            .send()
            .await?;
        let rows: Vec<T> = check(res).await?.json().await?;
        debug!(table, count = rows.len(), "listed rows");
        Ok(rows)
    }

    async fn insert_row<T: DeserializeOwned>(
        &self,
        table: &str,
        body: serde_json::Value,
    ) -> Result<T, StoreError> {
        let res = self
            .request(Method::POST, &format!("/rest/v1/{}", table))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        first_row(check(res).await?, table).await
    }

    async fn delete_row(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let res = self
            .request(Method::DELETE, &format!("/rest/v1/{}", table))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        check(res).await?;
        debug!(table, id, "deleted row");
        Ok(())
    }
}

async fn check(res: Response) -> Result<Response, StoreError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(StoreError::Unauthorized);
    }
    let message = res.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn first_row<T: DeserializeOwned>(res: Response, what: &str) -> Result<T, StoreError> {
    let mut rows: Vec<T> = res.json().await?;
    if rows.is_empty() {
        return Err(StoreError::Decode(format!("{} returned no rows", what)));
    }
    Ok(rows.swap_remove(0))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteStore for StoreClient {
    async fn list_tasks(&self, owner_id: Option<&str>) -> Result<Vec<TaskRow>, StoreError> {
        self.list_rows("tasks", owner_id, "due_date.asc").await
    }

    async fn create_task(
        &self,
        draft: &TaskDraft,
        owner_id: Option<&str>,
    ) -> Result<TaskRow, StoreError> {
        let mut body = to_json(draft)?;
        body["completed"] = json!(false);
        if let Some(owner) = owner_id {
            body["user_id"] = json!(owner);
        }
        self.insert_row("tasks", body).await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<TaskRow, StoreError> {
        let res = self
            .request(Method::PATCH, "/rest/v1/tasks")
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&to_json(patch)?)
            .send()
            .await?;
        let mut rows: Vec<TaskRow> = check(res).await?.json().await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(format!("task {}", id)));
        }
        Ok(rows.swap_remove(0))
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.delete_row("tasks", id).await
    }

    async fn list_files(&self, owner_id: Option<&str>) -> Result<Vec<FileRecord>, StoreError> {
        self.list_rows("files", owner_id, "created_at.desc").await
    }

    async fn upload_file(
        &self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        owner_id: Option<&str>,
    ) -> Result<FileRecord, StoreError> {
        let key = storage_key(chrono::Utc::now().timestamp_millis(), name);
        let size = bytes.len() as u64;
        let res = self
            .request(
                Method::POST,
                &format!("/storage/v1/object/{}/{}", FILES_BUCKET, key),
            )
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()
            .await?;
        check(res).await?;
        debug!(key = %key, size, "uploaded object");

        let mut body = json!({
            "name": name,
            "path": self.public_url(&key),
            "size": size,
            "type": mime_type,
        });
        if let Some(owner) = owner_id {
            body["user_id"] = json!(owner);
        }
        self.insert_row("files", body).await
    }

    async fn delete_file(&self, id: &str, path: Option<&str>) -> Result<(), StoreError> {
        self.delete_row("files", id).await?;

        let Some(key) = path.and_then(key_from_public_url) else {
            return Ok(());
        };
        let result = self
            .request(
                Method::DELETE,
                &format!("/storage/v1/object/{}/{}", FILES_BUCKET, key),
            )
            .send()
            .await;
        // the row is gone already, a stray object is only worth a warning
        match result {
            Ok(res) => {
                if let Err(err) = check(res).await {
                    warn!(key, "failed to delete stored object: {}", err);
                }
            }
            Err(err) => warn!(key, "failed to delete stored object: {}", err),
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, StoreError> {
        if self.access_token().is_none() {
            return Ok(None);
        }
        let res = self.request(Method::GET, "/auth/v1/user").send().await?;
        match check(res).await {
            Ok(res) => Ok(Some(res.json().await?)),
            Err(StoreError::Unauthorized) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        if self.access_token().is_none() {
            return Ok(());
        }
        let res = self.request(Method::POST, "/auth/v1/logout").send().await;
        self.set_access_token(None);
        check(res?).await?;
        Ok(())
    }
}
