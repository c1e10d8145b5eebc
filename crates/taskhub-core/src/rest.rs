//! Endpoint shapes and response decoding for the backend's HTTP APIs.
//! Transport-free so the browser and native clients share it.

use serde_json::Value;
use taskhub_shared::{Session, Task, TaskId};
use tracing::debug;
use url::Url;

use crate::config::ConnectionParams;
use crate::error::BackendError;

pub const APIKEY_HEADER: &str = "apikey";
pub const PREFER_HEADER: &str = "Prefer";
pub const RETURN_REPRESENTATION: &str = "return=representation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
    api_key: String,
}

impl Endpoints {
    pub fn new(params: &ConnectionParams) -> Self {
        Self {
            base: params.url.clone(),
            api_key: params.api_key.clone(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Value for `Authorization`: the user's token when signed in, else the
    /// service key.
    pub fn bearer(&self, access_token: Option<&str>) -> String {
        format!("Bearer {}", access_token.unwrap_or(&self.api_key))
    }

    fn at(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn sign_up(&self) -> Url {
        self.at(&["auth", "v1", "signup"])
    }

    pub fn token(&self) -> Url {
        let mut url = self.at(&["auth", "v1", "token"]);
        url.query_pairs_mut().append_pair("grant_type", "password");
        url
    }

    pub fn logout(&self) -> Url {
        self.at(&["auth", "v1", "logout"])
    }

    pub fn table(&self, table: &str) -> Url {
        self.at(&["rest", "v1", table])
    }

    pub fn select_ordered(&self, table: &str) -> Url {
        let mut url = self.table(table);
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "created_at.asc");
        url
    }

    pub fn row(&self, table: &str, id: TaskId) -> Url {
        let mut url = self.table(table);
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        url
    }

    pub fn object(&self, bucket: &str, key: &str) -> Url {
        self.at(&["storage", "v1", "object", bucket, key])
    }

    pub fn public_object(&self, bucket: &str, key: &str) -> Url {
        self.at(&["storage", "v1", "object", "public", bucket, key])
    }

    pub fn realtime(&self) -> Url {
        let mut url = self.at(&["realtime", "v1", "websocket"]);
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        if url.set_scheme(scheme).is_err() {
            debug!(scheme, "could not switch realtime URL scheme");
        }
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .append_pair("vsn", "1.0.0");
        url
    }
}

/// Human-readable message from a failed response body. The auth, table and
/// storage services each use a different field.
pub fn error_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(Value::String(text)) = map.get(key)
                && !text.trim().is_empty()
            {
                return text.clone();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("request failed with status {status}")
    } else {
        trimmed.to_string()
    }
}

/// Maps a non-success response to `BackendError::Rejected`.
pub fn check_status(status: u16, body: &str) -> Result<(), BackendError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let message = error_message(status, body);
    debug!(status, message = %message, "backend rejected request");
    Err(BackendError::rejected(status, message))
}

/// Sign-up answers with a full session when the project auto-confirms
/// accounts, and with the bare user otherwise.
pub fn decode_sign_up(body: &str) -> Result<Option<Session>, BackendError> {
    let value: Value = serde_json::from_str(body)?;
    if value.get("access_token").is_some() {
        Ok(Some(serde_json::from_value(value)?))
    } else {
        Ok(None)
    }
}

pub fn decode_session(body: &str) -> Result<Session, BackendError> {
    Ok(serde_json::from_str(body)?)
}

pub fn decode_tasks(body: &str) -> Result<Vec<Task>, BackendError> {
    Ok(serde_json::from_str(body)?)
}

/// Inserts come back as a one-element array.
pub fn decode_inserted(body: &str) -> Result<Task, BackendError> {
    let mut rows: Vec<Task> = serde_json::from_str(body)?;
    if rows.is_empty() {
        return Err(BackendError::decode("insert returned no row"));
    }
    Ok(rows.swap_remove(0))
}
