use gloo::storage::errors::StorageError;
use gloo::storage::{
  LocalStorage,
  Storage
};
use taskhub_shared::Session;

const SESSION_STORAGE_KEY: &str =
  "taskhub.session";

pub(super) fn load_session()
-> Option<Session> {
  match LocalStorage::get::<Session>(
    SESSION_STORAGE_KEY
  ) {
    | Ok(session) => Some(session),
    | Err(StorageError::KeyNotFound(
      _
    )) => None,
    | Err(err) => {
      tracing::warn!(error = %err, "ignoring stored session");
      None
    }
  }
}

pub(super) fn save_session(
  session: &Session
) {
  if let Err(err) = LocalStorage::set(
    SESSION_STORAGE_KEY,
    session
  ) {
    tracing::warn!(error = %err, "failed to persist session");
  }
}

pub(super) fn clear_session() {
  LocalStorage::delete(
    SESSION_STORAGE_KEY
  );
}
