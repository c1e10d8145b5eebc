#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use serde_json::json;
use taskhub_core::backend::{AuthApi, ChangeFeed, FeedSubscription, ImageFile, ObjectStore, TaskTable};
use taskhub_core::error::BackendError;
use taskhub_core::realtime::FeedTopic;
use taskhub_shared::{Credentials, DescriptionPatch, NewTask, Session, Task, TaskChange, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SignUp(String),
    SignIn(String),
    SignOut,
    Select,
    Insert(NewTask),
    Update(TaskId, String),
    Delete(TaskId),
    Upload { bucket: String, key: String },
}

/// In-memory stand-in for the hosted backend. Any operation can be told to
/// fail once through `fail`.
#[derive(Default)]
pub struct FakeBackend {
    pub calls: RefCell<Vec<Call>>,
    pub rows: RefCell<Vec<Task>>,
    failures: RefCell<HashMap<&'static str, BackendError>>,
    next_id: Cell<TaskId>,
}

impl FakeBackend {
    pub fn with_rows(rows: Vec<Task>) -> Self {
        let fake = Self::default();
        *fake.rows.borrow_mut() = rows;
        fake
    }

    pub fn fail(&self, op: &'static str, err: BackendError) {
        self.failures.borrow_mut().insert(op, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, op: &'static str, call: Call) -> Result<(), BackendError> {
        self.calls.borrow_mut().push(call);
        match self.failures.borrow_mut().remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AuthApi for FakeBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, BackendError> {
        self.record("sign_up", Call::SignUp(credentials.email.clone()))?;
        Ok(None)
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, BackendError> {
        self.record("sign_in", Call::SignIn(credentials.email.clone()))?;
        Ok(session(&credentials.email))
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), BackendError> {
        self.record("sign_out", Call::SignOut)
    }
}

impl TaskTable for FakeBackend {
    async fn select_tasks(&self) -> Result<Vec<Task>, BackendError> {
        self.record("select", Call::Select)?;
        Ok(self.rows.borrow().clone())
    }

    async fn insert_task(&self, row: &NewTask) -> Result<Task, BackendError> {
        self.record("insert", Call::Insert(row.clone()))?;
        let id = self.next_id.get() + 100;
        self.next_id.set(self.next_id.get() + 1);
        Ok(Task {
            id,
            title: row.title.clone(),
            description: row.description.clone(),
            email: row.email.clone(),
            image_url: row.image_url.clone(),
            created_at: at(59),
        })
    }

    async fn update_task(&self, id: TaskId, patch: &DescriptionPatch) -> Result<(), BackendError> {
        self.record("update", Call::Update(id, patch.description.clone()))
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), BackendError> {
        self.record("delete", Call::Delete(id))
    }
}

impl ObjectStore for FakeBackend {
    type Body = Vec<u8>;

    async fn upload(&self, bucket: &str, key: &str, _file: &ImageFile<Vec<u8>>) -> Result<(), BackendError> {
        self.record(
            "upload",
            Call::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
        )
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("https://cdn.test/{bucket}/{key}")
    }
}

#[derive(Debug, Default)]
pub struct FeedLog {
    pub subscribed: usize,
    pub unsubscribed: usize,
    pub topics: Vec<String>,
}

/// Change feed that replays a fixed script of pushes. With `hang` set the
/// subscription never ends on its own once the script runs out.
pub struct FakeFeed {
    pub log: Rc<RefCell<FeedLog>>,
    script: Vec<Result<TaskChange, BackendError>>,
    hang: bool,
    refuse: Option<BackendError>,
}

impl FakeFeed {
    pub fn new(script: Vec<Result<TaskChange, BackendError>>) -> Self {
        Self {
            log: Rc::default(),
            script,
            hang: false,
            refuse: None,
        }
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn refusing(mut self, err: BackendError) -> Self {
        self.refuse = Some(err);
        self
    }
}

pub struct FakeSubscription {
    log: Rc<RefCell<FeedLog>>,
    pending: VecDeque<Result<TaskChange, BackendError>>,
    hang: bool,
}

impl ChangeFeed for FakeFeed {
    type Subscription = FakeSubscription;

    async fn subscribe(&self, topic: &FeedTopic) -> Result<FakeSubscription, BackendError> {
        if let Some(err) = &self.refuse {
            return Err(err.clone());
        }
        let mut log = self.log.borrow_mut();
        log.subscribed += 1;
        log.topics.push(topic.topic());
        Ok(FakeSubscription {
            log: Rc::clone(&self.log),
            pending: self.script.iter().cloned().collect(),
            hang: self.hang,
        })
    }
}

impl FeedSubscription for FakeSubscription {
    async fn next_change(&mut self) -> Option<Result<TaskChange, BackendError>> {
        match self.pending.pop_front() {
            Some(next) => Some(next),
            None if self.hang => std::future::pending().await,
            None => None,
        }
    }

    async fn unsubscribe(self) {
        self.log.borrow_mut().unsubscribed += 1;
    }
}

pub fn at(second: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, second)
        .single()
        .expect("valid timestamp")
}

pub fn task(id: TaskId, title: &str, second: u32) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: String::new(),
        email: "ana@example.com".to_string(),
        image_url: None,
        created_at: at(second),
    }
}

pub fn session(email: &str) -> Session {
    serde_json::from_value(json!({
        "access_token": "token-abc",
        "refresh_token": "refresh-abc",
        "expires_in": 3600,
        "user": {
            "id": "00000000-0000-0000-0000-000000000001",
            "email": email
        }
    }))
    .expect("valid session")
}

pub fn image(name: &str) -> ImageFile<Vec<u8>> {
    ImageFile {
        name: name.to_string(),
        content_type: Some("image/png".to_string()),
        body: vec![0x89, b'P', b'N', b'G'],
    }
}
