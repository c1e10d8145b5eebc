//! Seams to the hosted backend. Each surface (browser, CLI, tests)
//! supplies its own transport; the view models only see these traits.
//!
//! Futures are not `Send`; every surface drives them from a
//! single-threaded executor.
#![allow(async_fn_in_trait)]

use taskhub_shared::{Credentials, DescriptionPatch, NewTask, Session, Task, TaskChange, TaskId};

use crate::error::BackendError;
use crate::realtime::FeedTopic;

pub trait AuthApi {
    /// `Ok(None)` when the account was created but must be confirmed first.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, BackendError>;

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, BackendError>;

    async fn sign_out(&self, session: &Session) -> Result<(), BackendError>;
}

pub trait TaskTable {
    /// All rows, ascending by `created_at`.
    async fn select_tasks(&self) -> Result<Vec<Task>, BackendError>;

    async fn insert_task(&self, row: &NewTask) -> Result<Task, BackendError>;

    async fn update_task(&self, id: TaskId, patch: &DescriptionPatch) -> Result<(), BackendError>;

    async fn delete_task(&self, id: TaskId) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile<B> {
    pub name: String,
    pub content_type: Option<String>,
    pub body: B,
}

pub trait ObjectStore {
    /// Whatever the surface holds a picked file as (bytes, a browser `File`).
    type Body;

    async fn upload(&self, bucket: &str, key: &str, file: &ImageFile<Self::Body>) -> Result<(), BackendError>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

pub trait ChangeFeed {
    type Subscription: FeedSubscription;

    async fn subscribe(&self, topic: &FeedTopic) -> Result<Self::Subscription, BackendError>;
}

pub trait FeedSubscription {
    /// `None` once the feed is gone; an `Err` is a single bad push.
    async fn next_change(&mut self) -> Option<Result<TaskChange, BackendError>>;

    async fn unsubscribe(self);
}

/// Key an upload is stored under: original file name plus the current
/// time in milliseconds. Two uploads of one name in one millisecond collide.
pub fn object_key(file_name: &str, now_ms: i64) -> String {
    format!("{file_name}-{now_ms}")
}
