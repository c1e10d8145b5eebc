mod support;

use futures::executor::block_on;
use taskhub_core::board::TaskBoard;
use taskhub_core::error::BackendError;
use taskhub_shared::{NewTask, TaskChange};

use support::{Call, FakeBackend, image, task};

const BUCKET: &str = "tasks-images";
const NOW_MS: i64 = 1_700_000_000_000;

fn ids(board: &TaskBoard<Vec<u8>>) -> Vec<i64> {
    board.tasks().iter().map(|t| t.id).collect()
}

#[test]
fn load_orders_by_creation_time() {
    let backend = FakeBackend::with_rows(vec![task(2, "later", 30), task(1, "earlier", 10)]);
    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();

    block_on(board.load(&backend));

    assert!(board.is_loaded());
    assert_eq!(ids(&board), vec![1, 2]);
}

#[test]
fn failed_load_keeps_previous_list_silently() {
    let backend = FakeBackend::with_rows(vec![task(1, "one", 1)]);
    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    block_on(board.load(&backend));

    backend.fail("select", BackendError::transport("offline"));
    backend.rows.borrow_mut().clear();
    block_on(board.load(&backend));

    assert_eq!(ids(&board), vec![1]);
    assert_eq!(board.error, None);
}

#[test]
fn failed_upload_aborts_before_insert() {
    let backend = FakeBackend::default();
    backend.fail("upload", BackendError::rejected(413, "Payload too large"));
    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    board.set_title("Photo");
    board.attach_image(Some(image("cat.png")));

    block_on(board.create(&backend, BUCKET, "ana@example.com", NOW_MS));

    assert_eq!(board.error.as_deref(), Some("Payload too large"));
    assert!(!backend.calls().iter().any(|c| matches!(c, Call::Insert(_))));
    assert_eq!(board.draft.title, "Photo");
    assert!(board.image.is_some());
}

#[test]
fn failed_insert_keeps_draft_and_image() {
    let backend = FakeBackend::default();
    backend.fail(
        "insert",
        BackendError::rejected(403, "new row violates row-level security policy"),
    );
    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    board.set_title("Photo");
    board.set_description("a cat");
    board.attach_image(Some(image("cat.png")));

    block_on(board.create(&backend, BUCKET, "ana@example.com", NOW_MS));

    assert_eq!(
        board.error.as_deref(),
        Some("new row violates row-level security policy")
    );
    assert!(matches!(
        backend.calls().as_slice(),
        [Call::Upload { .. }, Call::Insert(_)]
    ));
    assert_eq!(board.draft.title, "Photo");
    assert_eq!(board.draft.description, "a cat");
    assert!(board.image.is_some());
    assert!(board.tasks().is_empty());
}

#[test]
fn create_with_image_links_public_url_and_waits_for_echo() {
    let backend = FakeBackend::default();
    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    board.set_title("Photo");
    board.set_description("a cat");
    board.attach_image(Some(image("cat.png")));

    block_on(board.create(&backend, BUCKET, "ana@example.com", NOW_MS));

    let key = "cat.png-1700000000000".to_string();
    assert_eq!(
        backend.calls(),
        vec![
            Call::Upload {
                bucket: BUCKET.to_string(),
                key: key.clone(),
            },
            Call::Insert(NewTask {
                title: "Photo".to_string(),
                description: "a cat".to_string(),
                email: "ana@example.com".to_string(),
                image_url: Some(format!("https://cdn.test/{BUCKET}/{key}")),
            }),
        ]
    );
    assert_eq!(board.error, None);
    assert_eq!(board.draft.title, "");
    assert_eq!(board.draft.description, "");
    assert!(board.image.is_none());
    assert!(board.tasks().is_empty());
}

#[test]
fn create_without_image_inserts_null_url() {
    let backend = FakeBackend::default();
    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    board.set_title("Plain");

    block_on(board.create(&backend, BUCKET, "ana@example.com", NOW_MS));

    match backend.calls().as_slice() {
        [Call::Insert(row)] => assert_eq!(row.image_url, None),
        other => panic!("unexpected calls: {other:?}"),
    }
}

#[test]
fn every_row_shares_one_edit_buffer() {
    let backend = FakeBackend::with_rows(vec![task(1, "one", 1), task(2, "two", 2)]);
    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    block_on(board.load(&backend));

    board.set_edit_buffer("typed in row one");
    block_on(board.update(&backend, 2));

    assert_eq!(
        backend.calls().last(),
        Some(&Call::Update(2, "typed in row one".to_string()))
    );
    assert_eq!(board.edit_buffer, "typed in row one");
}

#[test]
fn failed_update_reports_and_keeps_row() {
    let backend = FakeBackend::with_rows(vec![task(3, "three", 3)]);
    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    block_on(board.load(&backend));
    backend.fail("update", BackendError::rejected(400, "invalid input syntax"));

    board.set_edit_buffer("new text");
    block_on(board.update(&backend, 3));

    assert_eq!(board.error.as_deref(), Some("invalid input syntax"));
    assert_eq!(board.edit_buffer, "new text");
    assert_eq!(board.tasks()[0].description, task(3, "three", 3).description);
}

#[test]
fn delete_waits_for_change_feed() {
    let backend = FakeBackend::with_rows(vec![task(5, "five", 5)]);
    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    block_on(board.load(&backend));

    block_on(board.delete(&backend, 5));

    assert_eq!(backend.calls().last(), Some(&Call::Delete(5)));
    assert_eq!(ids(&board), vec![5]);

    board.apply_change(TaskChange::Deleted { id: 5 });
    assert!(board.tasks().is_empty());
}

#[test]
fn next_operation_clears_stale_error() {
    let backend = FakeBackend::default();
    backend.fail("delete", BackendError::rejected(404, "not found"));
    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();

    block_on(board.delete(&backend, 9));
    assert_eq!(board.error.as_deref(), Some("not found"));

    block_on(board.update(&backend, 9));
    assert_eq!(board.error, None);
}
