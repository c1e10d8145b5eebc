use taskhub_shared::{DescriptionPatch, NewTask, Task, TaskChange, TaskId};
use tracing::{debug, error, info, instrument};

use crate::backend::{ImageFile, ObjectStore, TaskTable, object_key};
use crate::error::BackendError;
use crate::feed;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    pub title: String,
    pub description: String,
}

/// State behind the task list screen.
///
/// `edit_buffer` is one value shared by every row: typing in one row's box
/// and pressing Edit on another row sends that text to the other row.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskBoard<B> {
    pub draft: Draft,
    pub edit_buffer: String,
    pub error: Option<String>,
    pub image: Option<ImageFile<B>>,
    tasks: Vec<Task>,
    loaded: bool,
}

impl<B> Default for TaskBoard<B> {
    fn default() -> Self {
        Self {
            draft: Draft::default(),
            edit_buffer: String::new(),
            error: None,
            image: None,
            tasks: Vec::new(),
            loaded: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest<B> {
    pub row: NewTask,
    pub image: Option<ImageFile<B>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub id: TaskId,
    pub patch: DescriptionPatch,
}

impl<B> TaskBoard<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    pub fn set_edit_buffer(&mut self, text: impl Into<String>) {
        self.edit_buffer = text.into();
    }

    pub fn attach_image(&mut self, image: Option<ImageFile<B>>) {
        self.image = image;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Replaces the whole list. A failed read is logged and leaves the
    /// previous list in place without touching `error`.
    pub fn finish_load(&mut self, result: Result<Vec<Task>, BackendError>) {
        match result {
            Ok(mut tasks) => {
                tasks.sort_by_key(|t| t.created_at);
                info!(count = tasks.len(), "loaded tasks");
                self.tasks = tasks;
                self.loaded = true;
            }
            Err(err) => error!(error = %err, "error reading tasks"),
        }
    }

    pub fn create_request(&self, creator_email: &str) -> CreateRequest<B>
    where
        B: Clone,
    {
        CreateRequest {
            row: NewTask {
                title: self.draft.title.clone(),
                description: self.draft.description.clone(),
                email: creator_email.to_string(),
                image_url: None,
            },
            image: self.image.clone(),
        }
    }

    /// The new row is not added here; it shows up through the change feed.
    pub fn finish_create(&mut self, result: Result<Task, BackendError>) {
        match result {
            Ok(task) => {
                info!(id = task.id, "task created");
                self.draft = Draft::default();
                self.image = None;
            }
            Err(err) => {
                error!(error = %err, "error adding task");
                self.error = Some(err.to_string());
            }
        }
    }

    pub fn update_request(&self, id: TaskId) -> UpdateRequest {
        UpdateRequest {
            id,
            patch: DescriptionPatch {
                description: self.edit_buffer.clone(),
            },
        }
    }

    pub fn finish_update(&mut self, id: TaskId, result: Result<(), BackendError>) {
        self.finish_mutation("updating", id, result);
    }

    /// The row stays in the list until the delete echo arrives.
    pub fn finish_delete(&mut self, id: TaskId, result: Result<(), BackendError>) {
        self.finish_mutation("deleting", id, result);
    }

    fn finish_mutation(&mut self, verb: &str, id: TaskId, result: Result<(), BackendError>) {
        match result {
            Ok(()) => debug!(id, "{verb} task acknowledged"),
            Err(err) => {
                error!(id, error = %err, "error {verb} task");
                self.error = Some(err.to_string());
            }
        }
    }

    pub fn apply_change(&mut self, change: TaskChange) {
        feed::apply_in_place(&mut self.tasks, change);
    }

    pub async fn load<T: TaskTable>(&mut self, table: &T) {
        let result = fetch_tasks(table).await;
        self.finish_load(result);
    }

    pub async fn create<S>(&mut self, backend: &S, bucket: &str, creator_email: &str, now_ms: i64)
    where
        S: TaskTable + ObjectStore<Body = B>,
        B: Clone,
    {
        self.clear_error();
        let request = self.create_request(creator_email);
        let result = submit_task(backend, bucket, request, now_ms).await;
        self.finish_create(result);
    }

    pub async fn update<T: TaskTable>(&mut self, table: &T, id: TaskId) {
        self.clear_error();
        let request = self.update_request(id);
        let result = save_description(table, &request).await;
        self.finish_update(id, result);
    }

    pub async fn delete<T: TaskTable>(&mut self, table: &T, id: TaskId) {
        self.clear_error();
        let result = remove_task(table, id).await;
        self.finish_delete(id, result);
    }
}

#[instrument(skip_all)]
pub async fn fetch_tasks<T: TaskTable>(table: &T) -> Result<Vec<Task>, BackendError> {
    table.select_tasks().await
}

/// Uploads the attached image (if any) and inserts the row. A failed upload
/// aborts before any insert is sent.
#[instrument(skip_all, fields(has_image = request.image.is_some()))]
pub async fn submit_task<S>(
    backend: &S,
    bucket: &str,
    request: CreateRequest<S::Body>,
    now_ms: i64,
) -> Result<Task, BackendError>
where
    S: TaskTable + ObjectStore,
{
    let CreateRequest { mut row, image } = request;

    if let Some(file) = image {
        let key = object_key(&file.name, now_ms);
        backend.upload(bucket, &key, &file).await.inspect_err(|err| {
            error!(key = %key, error = %err, "error uploading image");
        })?;
        let url = backend.public_url(bucket, &key);
        debug!(key = %key, url = %url, "image uploaded");
        row.image_url = Some(url);
    }

    backend.insert_task(&row).await
}

#[instrument(skip_all, fields(id = request.id))]
pub async fn save_description<T: TaskTable>(table: &T, request: &UpdateRequest) -> Result<(), BackendError> {
    table.update_task(request.id, &request.patch).await
}

#[instrument(skip(table))]
pub async fn remove_task<T: TaskTable>(table: &T, id: TaskId) -> Result<(), BackendError> {
    table.delete_task(id).await
}
