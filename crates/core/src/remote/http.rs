//! REST implementation of the API traits

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::api::{AuthApi, BoardApi, Credentials, TaskApi};
use crate::board::{Board, BoardName};
use crate::error::Error;
use crate::session::{Credential, SessionHandle};
use crate::task::{Task, TaskDraft, TaskPatch};
use crate::Result;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// Thin HTTP wrapper that attaches the session's bearer credential to
/// every request. Failures are returned as-is; nothing is retried.
pub struct HttpRemoteClient {
    client: Client,
    base_url: String,
    session: SessionHandle,
}

impl HttpRemoteClient {
    pub fn new(base_url: impl Into<String>, session: SessionHandle) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized + Sync,
    {
        let credential = self.session.credential().await;

        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(credential) = &credential {
            request = request.bearer_auth(credential.expose());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("{} {}", method, path);
        let resp = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} {} failed: {}", method, path, e)))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response for {}: {}", path, e)))?;

        if status.is_success() {
            return Ok(bytes.to_vec());
        }

        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|body| body.message);
        warn!("{} {} rejected: HTTP {}", method, path, status);

        // A rejected login is not a session expiry.
        if status == StatusCode::UNAUTHORIZED && credential.is_some() {
            self.session.report_unauthorized();
        }

        Err(Error::http(status.as_u16(), message))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let bytes = self.send::<()>(Method::GET, path, None).await?;
        Self::decode(&bytes)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let bytes = self.send(Method::POST, path, Some(body)).await?;
        Self::decode(&bytes)
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let bytes = self.send(Method::PUT, path, Some(body)).await?;
        Self::decode(&bytes)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthApi for HttpRemoteClient {
    async fn login(&self, credentials: &Credentials) -> Result<Credential> {
        let resp: LoginResponse = self.post("/auth/login", credentials).await?;
        Ok(Credential::new(resp.token))
    }

    async fn signup(&self, credentials: &Credentials) -> Result<()> {
        let _: IgnoredAny = self.post("/auth/signup", credentials).await?;
        Ok(())
    }

    fn google_auth_url(&self) -> String {
        self.url("/auth/google")
    }
}

#[async_trait]
impl BoardApi for HttpRemoteClient {
    async fn list_boards(&self) -> Result<Vec<Board>> {
        self.get("/boards").await
    }

    async fn create_board(&self, name: &str) -> Result<()> {
        let _: IgnoredAny = self.post("/boards", &BoardName { name }).await?;
        Ok(())
    }

    async fn rename_board(&self, id: &str, name: &str) -> Result<()> {
        let path = format!("/boards/{}", urlencoding::encode(id));
        let _: IgnoredAny = self.put(&path, &BoardName { name }).await?;
        Ok(())
    }

    async fn delete_board(&self, id: &str) -> Result<()> {
        self.delete(&format!("/boards/{}", urlencoding::encode(id))).await
    }
}

#[async_trait]
impl TaskApi for HttpRemoteClient {
    async fn list_tasks(&self, board_id: &str) -> Result<Vec<Task>> {
        self.get(&format!("/boards/{}/tasks", urlencoding::encode(board_id)))
            .await
    }

    async fn create_task(&self, board_id: &str, draft: &TaskDraft) -> Result<()> {
        let path = format!("/boards/{}/tasks", urlencoding::encode(board_id));
        let _: IgnoredAny = self.post(&path, draft).await?;
        Ok(())
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()> {
        let path = format!("/tasks/{}", urlencoding::encode(id));
        let _: IgnoredAny = self.put(&path, patch).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.delete(&format!("/tasks/{}", urlencoding::encode(id))).await
    }
}
