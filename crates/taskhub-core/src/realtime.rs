//! Phoenix channel framing used by the
//! backend's realtime endpoint (JSON
//! serializer, protocol `vsn=1.0.0`).

use std::time::Duration;

use serde::{
  Deserialize,
  Serialize
};
use serde_json::{
  Value,
  json
};
use taskhub_shared::{
  ChangeKind,
  Task,
  TaskChange,
  TaskId
};
use tracing::{
  debug,
  trace
};

use crate::error::BackendError;

pub const HEARTBEAT_INTERVAL: Duration =
  Duration::from_secs(25);

const PHOENIX_TOPIC: &str = "phoenix";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTopic {
  pub channel: String,
  pub schema:  String,
  pub table:   String,
  pub events:  Vec<ChangeKind>
}

impl FeedTopic {
  pub fn topic(&self) -> String {
    format!("realtime:{}", self.channel)
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Frame {
  pub topic:    String,
  pub event:    String,
  #[serde(default)]
  pub payload:  Value,
  #[serde(
    rename = "ref",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub msg_ref:  Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub join_ref: Option<String>
}

/// What a decoded server frame means
/// for the subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
  Change(TaskChange),
  Joined,
  JoinRejected(String),
  Closed(String),
  Ignored
}

#[derive(Debug, Deserialize)]
struct ChangeEnvelope {
  data: ChangeData
}

#[derive(Debug, Deserialize)]
struct ChangeData {
  #[serde(rename = "type")]
  kind:       ChangeKind,
  #[serde(default)]
  record:     Option<Value>,
  #[serde(default)]
  old_record: Option<Value>
}

#[derive(Debug, Deserialize)]
struct OldRow {
  id: TaskId
}

/// Client side of one channel on the
/// realtime socket. Tracks the message
/// and join references Phoenix needs.
#[derive(Debug, Clone)]
pub struct Channel {
  topic:    FeedTopic,
  join_ref: Option<String>,
  next_ref: u64
}

impl Channel {
  pub fn new(topic: FeedTopic) -> Self {
    Self {
      topic,
      join_ref: None,
      next_ref: 0
    }
  }

  fn bump_ref(&mut self) -> String {
    self.next_ref += 1;
    self.next_ref.to_string()
  }

  pub fn join_frame(
    &mut self,
    access_token: Option<&str>
  ) -> Frame {
    let msg_ref = self.bump_ref();
    self.join_ref = Some(msg_ref.clone());

    let changes: Vec<Value> = self
      .topic
      .events
      .iter()
      .map(|kind| {
        json!({
          "event": kind.as_str(),
          "schema": self.topic.schema,
          "table": self.topic.table,
        })
      })
      .collect();

    let mut payload = json!({
      "config": {
        "broadcast": { "ack": false, "self": false },
        "presence": { "key": "" },
        "postgres_changes": changes,
        "private": false,
      }
    });
    if let Some(token) = access_token {
      payload["access_token"] =
        Value::String(token.to_string());
    }

    Frame {
      topic: self.topic.topic(),
      event: "phx_join".to_string(),
      payload,
      msg_ref: Some(msg_ref.clone()),
      join_ref: Some(msg_ref)
    }
  }

  pub fn heartbeat_frame(
    &mut self
  ) -> Frame {
    Frame {
      topic:    PHOENIX_TOPIC.to_string(),
      event:    "heartbeat".to_string(),
      payload:  json!({}),
      msg_ref:  Some(self.bump_ref()),
      join_ref: None
    }
  }

  pub fn leave_frame(&mut self) -> Frame {
    Frame {
      topic:    self.topic.topic(),
      event:    "phx_leave".to_string(),
      payload:  json!({}),
      msg_ref:  Some(self.bump_ref()),
      join_ref: self.join_ref.clone()
    }
  }

  pub fn encode(
    frame: &Frame
  ) -> Result<String, BackendError> {
    Ok(serde_json::to_string(frame)?)
  }

  pub fn decode(
    &self,
    text: &str
  ) -> Result<FeedFrame, BackendError> {
    let frame: Frame =
      serde_json::from_str(text)?;
    trace!(topic = %frame.topic, event = %frame.event, "realtime frame");

    if frame.topic == PHOENIX_TOPIC {
      return Ok(FeedFrame::Ignored);
    }
    if frame.topic != self.topic.topic() {
      debug!(topic = %frame.topic, "frame for another topic");
      return Ok(FeedFrame::Ignored);
    }

    match frame.event.as_str() {
      | "postgres_changes" => {
        decode_change(frame.payload)
          .map(FeedFrame::Change)
      }
      | "phx_reply"
        if frame.msg_ref.is_some()
          && frame.msg_ref
            == self.join_ref =>
      {
        Ok(join_reply(&frame.payload))
      }
      | "phx_error" => {
        Ok(FeedFrame::Closed(
          "channel errored".to_string()
        ))
      }
      | "phx_close" => {
        Ok(FeedFrame::Closed(
          "channel closed by server"
            .to_string()
        ))
      }
      | "system" => {
        match frame.payload["status"]
          .as_str()
        {
          | Some("error") => {
            Ok(FeedFrame::JoinRejected(
              frame.payload["message"]
                .as_str()
                .unwrap_or("subscription error")
                .to_string()
            ))
          }
          | _ => Ok(FeedFrame::Ignored)
        }
      }
      | _ => Ok(FeedFrame::Ignored)
    }
  }
}

fn join_reply(payload: &Value) -> FeedFrame {
  match payload["status"].as_str() {
    | Some("ok") => FeedFrame::Joined,
    | _ => {
      let reason = payload["response"]
        ["reason"]
        .as_str()
        .or_else(|| {
          payload["response"]["message"]
            .as_str()
        })
        .unwrap_or("join refused");
      FeedFrame::JoinRejected(
        reason.to_string()
      )
    }
  }
}

fn decode_change(
  payload: Value
) -> Result<TaskChange, BackendError> {
  let envelope: ChangeEnvelope =
    serde_json::from_value(payload)?;
  let data = envelope.data;

  let row = |value: Option<Value>| {
    value.ok_or_else(|| {
      BackendError::decode(format!(
        "{} change without a row",
        data.kind.as_str()
      ))
    })
  };

  match data.kind {
    | ChangeKind::Insert => {
      let task: Task = serde_json::from_value(
        row(data.record)?
      )?;
      Ok(TaskChange::Inserted(task))
    }
    | ChangeKind::Update => {
      let task: Task = serde_json::from_value(
        row(data.record)?
      )?;
      Ok(TaskChange::Updated(task))
    }
    | ChangeKind::Delete => {
      let old: OldRow =
        serde_json::from_value(row(
          data.old_record
        )?)?;
      Ok(TaskChange::Deleted {
        id: old.id
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use taskhub_shared::{
    ChangeKind,
    TaskChange
  };

  use super::{
    Channel,
    FeedFrame,
    FeedTopic
  };

  fn channel() -> Channel {
    Channel::new(FeedTopic {
      channel: "tasks-channel"
        .to_string(),
      schema:  "public".to_string(),
      table:   "tasks".to_string(),
      events:  ChangeKind::ALL.to_vec()
    })
  }

  #[test]
  fn join_frame_lists_every_event_kind() {
    let mut ch = channel();
    let frame = ch.join_frame(Some("jwt"));
    assert_eq!(
      frame.topic,
      "realtime:tasks-channel"
    );
    assert_eq!(frame.event, "phx_join");
    assert_eq!(
      frame.msg_ref.as_deref(),
      Some("1")
    );
    assert_eq!(
      frame.payload["access_token"],
      "jwt"
    );
    let events: Vec<&str> = frame.payload
      ["config"]["postgres_changes"]
      .as_array()
      .expect("changes array")
      .iter()
      .filter_map(|c| c["event"].as_str())
      .collect();
    assert_eq!(events, vec![
      "INSERT", "UPDATE", "DELETE"
    ]);

    let leave = ch.leave_frame();
    assert_eq!(
      leave.join_ref.as_deref(),
      Some("1")
    );
    assert_eq!(
      leave.msg_ref.as_deref(),
      Some("2")
    );
  }

  #[test]
  fn decodes_insert_and_delete_pushes() {
    let ch = channel();
    let insert = json!({
      "topic": "realtime:tasks-channel",
      "event": "postgres_changes",
      "ref": null,
      "payload": {
        "ids": [1],
        "data": {
          "schema": "public",
          "table": "tasks",
          "type": "INSERT",
          "commit_timestamp": "2024-05-01T10:00:00Z",
          "record": {
            "id": 10,
            "title": "A",
            "description": "",
            "email": "ana@example.com",
            "image_url": null,
            "created_at": "2024-05-01 10:00:00.1+00"
          },
          "old_record": {}
        }
      }
    })
    .to_string();
    match ch.decode(&insert).expect("decode") {
      | FeedFrame::Change(
        TaskChange::Inserted(task)
      ) => {
        assert_eq!(task.id, 10);
        assert_eq!(task.title, "A");
      }
      | other => {
        panic!("unexpected frame {other:?}")
      }
    }

    let delete = json!({
      "topic": "realtime:tasks-channel",
      "event": "postgres_changes",
      "payload": {
        "data": {
          "type": "DELETE",
          "record": null,
          "old_record": { "id": 10 }
        }
      }
    })
    .to_string();
    assert_eq!(
      ch.decode(&delete).expect("decode"),
      FeedFrame::Change(
        TaskChange::Deleted { id: 10 }
      )
    );
  }

  #[test]
  fn join_reply_and_heartbeat_ack() {
    let mut ch = channel();
    ch.join_frame(None);
    let ok = json!({
      "topic": "realtime:tasks-channel",
      "event": "phx_reply",
      "ref": "1",
      "payload": { "status": "ok", "response": {} }
    })
    .to_string();
    assert_eq!(
      ch.decode(&ok).expect("decode"),
      FeedFrame::Joined
    );

    let refused = json!({
      "topic": "realtime:tasks-channel",
      "event": "phx_reply",
      "ref": "1",
      "join_ref": "1",
      "payload": {
        "status": "error",
        "response": { "reason": "unauthorized" }
      }
    })
    .to_string();
    assert_eq!(
      ch.decode(&refused).expect("decode"),
      FeedFrame::JoinRejected(
        "unauthorized".to_string()
      )
    );

    let ack = json!({
      "topic": "phoenix",
      "event": "phx_reply",
      "ref": "2",
      "payload": { "status": "ok", "response": {} }
    })
    .to_string();
    assert_eq!(
      ch.decode(&ack).expect("decode"),
      FeedFrame::Ignored
    );
  }

  #[test]
  fn tolerates_null_text_and_offsetless_timestamp() {
    let ch = channel();
    let update = json!({
      "topic": "realtime:tasks-channel",
      "event": "postgres_changes",
      "payload": {
        "data": {
          "type": "UPDATE",
          "record": {
            "id": 11,
            "title": "B",
            "description": null,
            "email": "ana@example.com",
            "image_url": null,
            "created_at": "2024-05-01T10:00:00.123456"
          },
          "old_record": { "id": 11 }
        }
      }
    })
    .to_string();
    match ch.decode(&update).expect("decode") {
      | FeedFrame::Change(
        TaskChange::Updated(task)
      ) => {
        assert_eq!(task.id, 11);
        assert_eq!(task.description, "");
        assert_eq!(
          task.created_at.to_rfc3339(),
          "2024-05-01T10:00:00.123456+00:00"
        );
      }
      | other => {
        panic!("unexpected frame {other:?}")
      }
    }
  }

  #[test]
  fn update_without_record_is_a_decode_error() {
    let ch = channel();
    let raw = json!({
      "topic": "realtime:tasks-channel",
      "event": "postgres_changes",
      "payload": { "data": { "type": "UPDATE" } }
    })
    .to_string();
    assert!(ch.decode(&raw).is_err());
  }
}
