//! Browser transport for the backend: `fetch` through gloo-net for the HTTP
//! APIs and a gloo-net websocket for the realtime channel.

use std::collections::VecDeque;
use std::pin::pin;

use futures::future::{Either, select};
use futures::{SinkExt, StreamExt};
use gloo::net::http::{Request, RequestBuilder};
use gloo::net::websocket::Message;
use gloo::net::websocket::futures::WebSocket;
use gloo::timers::future::{IntervalStream, TimeoutFuture};
use taskhub_core::backend::{AuthApi, ChangeFeed, FeedSubscription, ImageFile, ObjectStore, TaskTable};
use taskhub_core::config::{ConnectionParams, TASKS_TABLE};
use taskhub_core::error::BackendError;
use taskhub_core::realtime::{Channel, FeedFrame, FeedTopic, Frame, HEARTBEAT_INTERVAL};
use taskhub_core::rest::{self, APIKEY_HEADER, Endpoints, PREFER_HEADER, RETURN_REPRESENTATION};
use taskhub_shared::{Credentials, DescriptionPatch, NewTask, Session, Task, TaskChange, TaskId};
use web_sys::File;

const JOIN_TIMEOUT_MS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct WebBackend {
    endpoints: Endpoints,
    session: Option<Session>,
}

impl WebBackend {
    pub fn new(params: &ConnectionParams) -> Self {
        Self {
            endpoints: Endpoints::new(params),
            session: None,
        }
    }

    pub fn with_session(mut self, session: Option<Session>) -> Self {
        self.session = session;
        self
    }

    fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    fn authorize(&self, builder: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        builder
            .header(APIKEY_HEADER, self.endpoints.api_key())
            .header("Authorization", &self.endpoints.bearer(access_token))
    }
}

async fn send(request: Request) -> Result<String, BackendError> {
    let response = request.send().await.map_err(BackendError::transport)?;
    let status = response.status();
    let body = response.text().await.map_err(BackendError::transport)?;
    rest::check_status(status, &body)?;
    Ok(body)
}

fn build(result: Result<Request, gloo::net::Error>) -> Result<Request, BackendError> {
    result.map_err(|err| BackendError::transport(format!("failed to build request: {err}")))
}

impl AuthApi for WebBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, BackendError> {
        let url = self.endpoints.sign_up();
        let request = build(self.authorize(Request::post(url.as_str()), None).json(credentials))?;
        rest::decode_sign_up(&send(request).await?)
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, BackendError> {
        let url = self.endpoints.token();
        let request = build(self.authorize(Request::post(url.as_str()), None).json(credentials))?;
        rest::decode_session(&send(request).await?)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), BackendError> {
        let url = self.endpoints.logout();
        let request = build(self.authorize(Request::post(url.as_str()), Some(&session.access_token)).build())?;
        send(request).await.map(|_| ())
    }
}

impl TaskTable for WebBackend {
    async fn select_tasks(&self) -> Result<Vec<Task>, BackendError> {
        let url = self.endpoints.select_ordered(TASKS_TABLE);
        let request = build(self.authorize(Request::get(url.as_str()), self.access_token()).build())?;
        rest::decode_tasks(&send(request).await?)
    }

    async fn insert_task(&self, row: &NewTask) -> Result<Task, BackendError> {
        let url = self.endpoints.table(TASKS_TABLE);
        let builder = self
            .authorize(Request::post(url.as_str()), self.access_token())
            .header(PREFER_HEADER, RETURN_REPRESENTATION);
        let request = build(builder.json(row))?;
        rest::decode_inserted(&send(request).await?)
    }

    async fn update_task(&self, id: TaskId, patch: &DescriptionPatch) -> Result<(), BackendError> {
        let url = self.endpoints.row(TASKS_TABLE, id);
        let request = build(self.authorize(Request::patch(url.as_str()), self.access_token()).json(patch))?;
        send(request).await.map(|_| ())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), BackendError> {
        let url = self.endpoints.row(TASKS_TABLE, id);
        let request = build(self.authorize(Request::delete(url.as_str()), self.access_token()).build())?;
        send(request).await.map(|_| ())
    }
}

impl ObjectStore for WebBackend {
    type Body = File;

    async fn upload(&self, bucket: &str, key: &str, file: &ImageFile<File>) -> Result<(), BackendError> {
        let url = self.endpoints.object(bucket, key);
        let content_type = file.content_type.as_deref().unwrap_or("application/octet-stream");
        let builder = self
            .authorize(Request::post(url.as_str()), self.access_token())
            .header("Content-Type", content_type)
            .header("x-upsert", "false");
        let request = build(builder.body(file.body.clone()))?;
        send(request).await.map(|_| ())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.endpoints.public_object(bucket, key).to_string()
    }
}

impl ChangeFeed for WebBackend {
    type Subscription = WebSubscription;

    async fn subscribe(&self, topic: &FeedTopic) -> Result<WebSubscription, BackendError> {
        let url = self.endpoints.realtime();
        let ws = WebSocket::open(url.as_str()).map_err(BackendError::transport)?;

        let mut sub = WebSubscription {
            ws,
            channel: Channel::new(topic.clone()),
            heartbeat: IntervalStream::new(HEARTBEAT_INTERVAL.as_millis() as u32),
            pending: VecDeque::new(),
        };

        let join = sub.channel.join_frame(self.access_token());
        sub.send(&join).await?;

        match select(pin!(sub.await_join()), TimeoutFuture::new(JOIN_TIMEOUT_MS)).await {
            Either::Left((joined, _)) => joined?,
            Either::Right(_) => return Err(BackendError::transport("timed out joining realtime channel")),
        }
        tracing::info!(status = "SUBSCRIBED", "subscription status");
        Ok(sub)
    }
}

pub struct WebSubscription {
    ws: WebSocket,
    channel: Channel,
    heartbeat: IntervalStream,
    pending: VecDeque<TaskChange>,
}

impl WebSubscription {
    async fn send(&mut self, frame: &Frame) -> Result<(), BackendError> {
        let text = Channel::encode(frame)?;
        self.ws
            .send(Message::Text(text))
            .await
            .map_err(BackendError::transport)
    }

    async fn await_join(&mut self) -> Result<(), BackendError> {
        loop {
            let Some(message) = self.ws.next().await else {
                return Err(BackendError::transport("socket closed before join reply"));
            };
            let Message::Text(text) = message.map_err(BackendError::transport)? else {
                continue;
            };

            match self.channel.decode(&text)? {
                FeedFrame::Joined => return Ok(()),
                FeedFrame::JoinRejected(reason) | FeedFrame::Closed(reason) => {
                    return Err(BackendError::transport(format!("channel join rejected: {reason}")));
                }
                FeedFrame::Change(change) => self.pending.push_back(change),
                FeedFrame::Ignored => {}
            }
        }
    }
}

impl FeedSubscription for WebSubscription {
    async fn next_change(&mut self) -> Option<Result<TaskChange, BackendError>> {
        if let Some(change) = self.pending.pop_front() {
            return Some(Ok(change));
        }

        loop {
            let message = match select(pin!(self.ws.next()), pin!(self.heartbeat.next())).await {
                Either::Left((message, _)) => message,
                Either::Right(_) => {
                    let beat = self.channel.heartbeat_frame();
                    if let Err(err) = self.send(&beat).await {
                        tracing::warn!(error = %err, "heartbeat failed; change feed lost");
                        return None;
                    }
                    continue;
                }
            };

            let text = match message {
                None => {
                    tracing::warn!("realtime socket ended");
                    return None;
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "realtime socket failed");
                    return None;
                }
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Bytes(_))) => continue,
            };

            match self.channel.decode(&text) {
                Ok(FeedFrame::Change(change)) => return Some(Ok(change)),
                Ok(FeedFrame::Closed(reason)) => {
                    tracing::warn!(reason = %reason, "channel closed");
                    return None;
                }
                Ok(FeedFrame::JoinRejected(reason)) => {
                    tracing::error!(reason = %reason, "subscription error");
                    return None;
                }
                Ok(FeedFrame::Joined | FeedFrame::Ignored) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }

    async fn unsubscribe(mut self) {
        let leave = self.channel.leave_frame();
        if let Err(err) = self.send(&leave).await {
            tracing::debug!(error = %err, "leave frame not delivered");
        }
        if let Err(err) = self.ws.close(None, None) {
            tracing::debug!(error = ?err, "socket close failed");
        }
    }
}
