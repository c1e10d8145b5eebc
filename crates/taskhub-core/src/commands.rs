use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow, bail};
use taskhub_shared::{Session, TaskId};
use tracing::{info, warn};

use crate::auth::{AuthForm, AuthMode, SIGN_UP_NOTICE, SubmitOutcome};
use crate::backend::{AuthApi, ImageFile};
use crate::board::{self, TaskBoard};
use crate::cli::{Command, CredentialArgs};
use crate::client::SupabaseClient;
use crate::config::Settings;
use crate::datastore::SessionStore;
use crate::feed;
use crate::render::Renderer;

/// Everything a command needs besides its own arguments.
#[derive(Debug)]
pub struct Workspace {
    pub settings: Settings,
    pub store: SessionStore,
    pub renderer: Renderer,
}

#[tracing::instrument(skip(ws, command))]
pub async fn dispatch(ws: &Workspace, command: Command) -> anyhow::Result<()> {
    info!(command = command_name(&command), "dispatching command");

    match command {
        Command::Signup(args) => cmd_authenticate(ws, AuthMode::SignUp, args).await,
        Command::Signin(args) => cmd_authenticate(ws, AuthMode::SignIn, args).await,
        Command::Signout => cmd_signout(ws).await,
        Command::List => cmd_list(ws).await,
        Command::Add {
            title,
            description,
            image,
        } => cmd_add(ws, title, description, image.as_deref()).await,
        Command::Edit { id, description } => cmd_edit(ws, id, description).await,
        Command::Delete { id } => cmd_delete(ws, id).await,
        Command::Watch => cmd_watch(ws).await,
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Signup(_) => "signup",
        Command::Signin(_) => "signin",
        Command::Signout => "signout",
        Command::List => "list",
        Command::Add { .. } => "add",
        Command::Edit { .. } => "edit",
        Command::Delete { .. } => "delete",
        Command::Watch => "watch",
    }
}

async fn cmd_authenticate(ws: &Workspace, mode: AuthMode, args: CredentialArgs) -> anyhow::Result<()> {
    let client = SupabaseClient::new(&ws.settings.connection)?;

    let mut form = AuthForm {
        mode,
        ..AuthForm::default()
    };
    form.set_email(args.email);
    form.set_password(args.password);

    match form.submit(&client).await {
        SubmitOutcome::SignedIn(session) => {
            ws.store.save(&session)?;
            ws.renderer.print_session(&session)
        }
        SubmitOutcome::SignedUp { session, .. } => {
            if let Some(session) = session {
                ws.store.save(&session)?;
            }
            ws.renderer.print_notice(SIGN_UP_NOTICE)
        }
        SubmitOutcome::Rejected => {
            let message = form.error.unwrap_or_else(|| "authentication failed".to_string());
            Err(anyhow!(message))
        }
    }
}

async fn cmd_signout(ws: &Workspace) -> anyhow::Result<()> {
    if let Some(session) = ws.store.load()? {
        let client = SupabaseClient::new(&ws.settings.connection)?.with_session(Some(session.clone()));
        if let Err(err) = client.sign_out(&session).await {
            warn!(error = %err, "backend sign-out failed; clearing local session anyway");
        }
    }
    ws.store.clear()?;
    ws.renderer.print_notice("Signed out.")
}

async fn cmd_list(ws: &Workspace) -> anyhow::Result<()> {
    let (client, _) = signed_in_client(ws)?;

    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    board.finish_load(Ok(board::fetch_tasks(&client).await?));
    ws.renderer.print_task_table(board.tasks())
}

async fn cmd_add(ws: &Workspace, title: String, description: String, image: Option<&Path>) -> anyhow::Result<()> {
    let (client, session) = signed_in_client(ws)?;

    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    board.set_title(title);
    board.set_description(description);
    if let Some(path) = image {
        board.attach_image(Some(read_image(path)?));
    }

    let request = board.create_request(session.email());
    let task = board::submit_task(&client, &ws.settings.bucket, request, now_ms()).await?;
    board.finish_create(Ok(task.clone()));

    ws.renderer.print_notice(&format!("Created task {}.", task.id))
}

async fn cmd_edit(ws: &Workspace, id: TaskId, description: String) -> anyhow::Result<()> {
    let (client, _) = signed_in_client(ws)?;

    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    board.set_edit_buffer(description);
    board.update(&client, id).await;
    check_board(&board)?;

    ws.renderer.print_notice(&format!("Updated task {id}."))
}

async fn cmd_delete(ws: &Workspace, id: TaskId) -> anyhow::Result<()> {
    let (client, _) = signed_in_client(ws)?;

    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    board.delete(&client, id).await;
    check_board(&board)?;

    ws.renderer.print_notice(&format!("Deleted task {id}."))
}

async fn cmd_watch(ws: &Workspace) -> anyhow::Result<()> {
    let (client, _) = signed_in_client(ws)?;

    let mut board: TaskBoard<Vec<u8>> = TaskBoard::new();
    board.load(&client).await;
    ws.renderer.print_task_table(board.tasks())?;

    let stop = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let renderer = &ws.renderer;
    feed::follow(&client, &ws.settings.feed_topic(), stop, |change| {
        if let Err(err) = renderer.print_change(&change) {
            warn!(error = %err, "failed printing change");
        }
        board.apply_change(change);
        if let Err(err) = renderer.print_task_table(board.tasks()) {
            warn!(error = %err, "failed printing task list");
        }
    })
    .await?;

    Ok(())
}

fn signed_in_client(ws: &Workspace) -> anyhow::Result<(SupabaseClient, Session)> {
    let session = ws
        .store
        .load()?
        .ok_or_else(|| anyhow!("not signed in; run `taskhub signin` first"))?;
    let client = SupabaseClient::new(&ws.settings.connection)?.with_session(Some(session.clone()));
    Ok((client, session))
}

fn check_board<B>(board: &TaskBoard<B>) -> anyhow::Result<()> {
    match &board.error {
        Some(message) => bail!("{message}"),
        None => Ok(()),
    }
}

#[tracing::instrument(skip(path), fields(path = %path.display()))]
fn read_image(path: &Path) -> anyhow::Result<ImageFile<Vec<u8>>> {
    let body = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("image path has no file name: {}", path.display()))?;
    let content_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string());

    Ok(ImageFile {
        name,
        content_type,
        body,
    })
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::read_image;

    #[test]
    fn read_image_guesses_content_type() {
        let mut file = tempfile::Builder::new()
            .prefix("cat")
            .suffix(".png")
            .tempfile()
            .expect("temp file");
        file.write_all(b"\x89PNG").expect("write");

        let image = read_image(file.path()).expect("reads");
        assert!(image.name.ends_with(".png"));
        assert_eq!(image.content_type.as_deref(), Some("image/png"));
        assert_eq!(image.body, b"\x89PNG".to_vec());
    }

    #[test]
    fn read_image_without_known_extension_has_no_type() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"raw").expect("write");

        let image = read_image(file.path()).expect("reads");
        assert_eq!(image.content_type, None);
    }
}
