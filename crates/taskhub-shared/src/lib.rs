use std::fmt;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Deserializer,
  Serialize
};
use uuid::Uuid;

pub mod timestamp;

pub type TaskId = i64;

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Task {
  pub id:          TaskId,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub title:       String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub description: String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub email:       String,
  #[serde(default)]
  pub image_url:   Option<String>,
  #[serde(with = "timestamp")]
  pub created_at:  DateTime<Utc>
}

/// Text columns are nullable in the
/// table; `null` reads as empty.
fn null_as_default<'de, D, T>(
  deserializer: D
) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>
{
  Option::<T>::deserialize(deserializer)
    .map(Option::unwrap_or_default)
}

/// Row sent on insert; the backend
/// assigns `id` and `created_at`.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct NewTask {
  pub title:       String,
  pub description: String,
  pub email:       String,
  pub image_url:   Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct DescriptionPatch {
  pub description: String
}

#[derive(
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct Credentials {
  pub email:    String,
  pub password: String
}

impl fmt::Debug for Credentials {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("email", &self.email)
      .field("password", &"<redacted>")
      .finish()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct User {
  pub id:    Uuid,
  #[serde(default)]
  pub email: Option<String>
}

#[derive(
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct Session {
  pub access_token:  String,
  #[serde(default)]
  pub refresh_token: String,
  #[serde(default = "default_token_type")]
  pub token_type:    String,
  #[serde(default)]
  pub expires_in:    u64,
  pub user:          User
}

impl Session {
  pub fn email(&self) -> &str {
    self
      .user
      .email
      .as_deref()
      .unwrap_or_default()
  }
}

impl fmt::Debug for Session {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("Session")
      .field("token_type", &self.token_type)
      .field("expires_in", &self.expires_in)
      .field("user", &self.user)
      .finish_non_exhaustive()
  }
}

fn default_token_type() -> String {
  "bearer".to_string()
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
  Insert,
  Update,
  Delete
}

impl ChangeKind {
  pub const ALL: [ChangeKind; 3] = [
    ChangeKind::Insert,
    ChangeKind::Update,
    ChangeKind::Delete
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | ChangeKind::Insert => "INSERT",
      | ChangeKind::Update => "UPDATE",
      | ChangeKind::Delete => "DELETE"
    }
  }
}

/// One row-level notification from
/// the change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskChange {
  Inserted(Task),
  Updated(Task),
  Deleted { id: TaskId }
}

impl TaskChange {
  pub fn kind(&self) -> ChangeKind {
    match self {
      | TaskChange::Inserted(_) => {
        ChangeKind::Insert
      }
      | TaskChange::Updated(_) => {
        ChangeKind::Update
      }
      | TaskChange::Deleted {
        ..
      } => ChangeKind::Delete
    }
  }

  pub fn task_id(&self) -> TaskId {
    match self {
      | TaskChange::Inserted(task)
      | TaskChange::Updated(task) => {
        task.id
      }
      | TaskChange::Deleted { id } => *id
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{
    ChangeKind,
    Credentials,
    Session,
    Task
  };

  #[test]
  fn decodes_task_row_with_null_image() {
    let raw = r#"{
      "id": 7,
      "title": "Buy milk",
      "description": "2 litres",
      "email": "ana@example.com",
      "image_url": null,
      "created_at": "2024-05-01T10:00:00.123456+00:00"
    }"#;
    let task: Task =
      serde_json::from_str(raw)
        .expect("decode task");
    assert_eq!(task.id, 7);
    assert_eq!(task.image_url, None);
    assert_eq!(
      task
        .created_at
        .format("%H:%M:%S%.3f")
        .to_string(),
      "10:00:00.123"
    );
  }

  #[test]
  fn null_text_columns_read_as_empty() {
    let raw = r#"{
      "id": 8,
      "title": "Untitled",
      "description": null,
      "email": null,
      "created_at": "2024-05-01T10:00:00.123456"
    }"#;
    let task: Task =
      serde_json::from_str(raw)
        .expect("decode task");
    assert_eq!(task.title, "Untitled");
    assert_eq!(task.description, "");
    assert_eq!(task.email, "");
    assert_eq!(task.image_url, None);
  }

  #[test]
  fn credentials_debug_hides_password() {
    let creds = Credentials {
      email:    "ana@example.com"
        .to_string(),
      password: "hunter2".to_string()
    };
    let printed = format!("{creds:?}");
    assert!(
      printed.contains("ana@example.com")
    );
    assert!(!printed.contains("hunter2"));
  }

  #[test]
  fn session_without_optional_fields_decodes() {
    let raw = r#"{
      "access_token": "jwt",
      "user": {
        "id": "6b1b3c9e-8f0a-4c55-9d0f-2a8f4d2b7e11",
        "email": "ana@example.com"
      }
    }"#;
    let session: Session =
      serde_json::from_str(raw)
        .expect("decode session");
    assert_eq!(
      session.email(),
      "ana@example.com"
    );
    assert_eq!(
      session.token_type,
      "bearer"
    );
    assert!(
      !format!("{session:?}")
        .contains("jwt")
    );
  }

  #[test]
  fn change_kind_uses_wire_names() {
    let encoded = serde_json::to_string(
      &ChangeKind::Delete
    )
    .expect("encode kind");
    assert_eq!(encoded, "\"DELETE\"");
  }
}
