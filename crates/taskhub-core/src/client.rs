use std::time::Duration;

use anyhow::Context;
use reqwest::{Method, RequestBuilder, header};
use taskhub_shared::{Credentials, DescriptionPatch, NewTask, Session, Task, TaskId};
use tracing::{debug, instrument};

use crate::backend::{AuthApi, ChangeFeed, ImageFile, ObjectStore, TaskTable};
use crate::config::{ConnectionParams, TASKS_TABLE};
use crate::error::BackendError;
use crate::realtime::FeedTopic;
use crate::rest::{self, APIKEY_HEADER, Endpoints, PREFER_HEADER, RETURN_REPRESENTATION};
use crate::socket::{self, LiveSubscription};

/// Native handle to the hosted backend. Requests carry the signed-in
/// user's token when a session is attached, the service key otherwise.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    session: Option<Session>,
}

impl SupabaseClient {
    pub fn new(params: &ConnectionParams) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed building HTTP client for the backend")?;

        Ok(Self {
            http,
            endpoints: Endpoints::new(params),
            session: None,
        })
    }

    pub fn with_session(mut self, session: Option<Session>) -> Self {
        self.session = session;
        self
    }

    fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    fn request(&self, method: Method, url: &url::Url, access_token: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url.as_str())
            .header(APIKEY_HEADER, self.endpoints.api_key())
            .header(header::AUTHORIZATION, self.endpoints.bearer(access_token))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String, BackendError> {
        let response = builder.send().await.map_err(BackendError::transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(BackendError::transport)?;
        debug!(status, bytes = body.len(), "backend response");
        rest::check_status(status, &body)?;
        Ok(body)
    }
}

impl AuthApi for SupabaseClient {
    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, BackendError> {
        let builder = self
            .request(Method::POST, &self.endpoints.sign_up(), None)
            .json(credentials);
        let body = self.send(builder).await?;
        rest::decode_sign_up(&body)
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, BackendError> {
        let builder = self
            .request(Method::POST, &self.endpoints.token(), None)
            .json(credentials);
        let body = self.send(builder).await?;
        rest::decode_session(&body)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, session: &Session) -> Result<(), BackendError> {
        let builder = self.request(Method::POST, &self.endpoints.logout(), Some(&session.access_token));
        self.send(builder).await.map(|_| ())
    }
}

impl TaskTable for SupabaseClient {
    #[instrument(skip_all)]
    async fn select_tasks(&self) -> Result<Vec<Task>, BackendError> {
        let url = self.endpoints.select_ordered(TASKS_TABLE);
        let body = self.send(self.request(Method::GET, &url, self.access_token())).await?;
        rest::decode_tasks(&body)
    }

    #[instrument(skip_all, fields(title = %row.title))]
    async fn insert_task(&self, row: &NewTask) -> Result<Task, BackendError> {
        let url = self.endpoints.table(TASKS_TABLE);
        let builder = self
            .request(Method::POST, &url, self.access_token())
            .header(PREFER_HEADER, RETURN_REPRESENTATION)
            .json(row);
        let body = self.send(builder).await?;
        rest::decode_inserted(&body)
    }

    #[instrument(skip(self, patch))]
    async fn update_task(&self, id: TaskId, patch: &DescriptionPatch) -> Result<(), BackendError> {
        let url = self.endpoints.row(TASKS_TABLE, id);
        let builder = self.request(Method::PATCH, &url, self.access_token()).json(patch);
        self.send(builder).await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: TaskId) -> Result<(), BackendError> {
        let url = self.endpoints.row(TASKS_TABLE, id);
        self.send(self.request(Method::DELETE, &url, self.access_token()))
            .await
            .map(|_| ())
    }
}

impl ObjectStore for SupabaseClient {
    type Body = Vec<u8>;

    #[instrument(skip(self, file), fields(bytes = file.body.len()))]
    async fn upload(&self, bucket: &str, key: &str, file: &ImageFile<Vec<u8>>) -> Result<(), BackendError> {
        let url = self.endpoints.object(bucket, key);
        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let builder = self
            .request(Method::POST, &url, self.access_token())
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(file.body.clone());
        self.send(builder).await.map(|_| ())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.endpoints.public_object(bucket, key).to_string()
    }
}

impl ChangeFeed for SupabaseClient {
    type Subscription = LiveSubscription;

    async fn subscribe(&self, topic: &FeedTopic) -> Result<LiveSubscription, BackendError> {
        socket::open(&self.endpoints, self.access_token(), topic).await
    }
}
