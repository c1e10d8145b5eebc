use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use taskhub_shared::Session;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const SESSION_FILE: &str = "session.json";

/// Keeps the signed-in session between CLI runs.
#[derive(Debug)]
pub struct SessionStore {
    pub data_dir: PathBuf,
    pub session_path: PathBuf,
}

impl SessionStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let session_path = data_dir.join(SESSION_FILE);
        info!(
            data_dir = %data_dir.display(),
            session = %session_path.display(),
            "opened session store"
        );

        Ok(Self {
            data_dir,
            session_path,
        })
    }

    /// Returns `None` when nobody is signed in. A file that no longer parses
    /// is treated the same way so a stale format never blocks signing in.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Option<Session>> {
        if !self.session_path.exists() {
            debug!("no stored session");
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.session_path)
            .with_context(|| format!("failed reading {}", self.session_path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                debug!(user = %session.user.id, "restored session");
                Ok(Some(session))
            }
            Err(err) => {
                warn!(file = %self.session_path.display(), error = %err, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self, session), fields(user = %session.user.id))]
    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        let serialized = serde_json::to_string_pretty(session)?;
        write_atomic(&self.session_path, &serialized).context("failed to save session.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.session_path) {
            Ok(()) => {
                info!("cleared stored session");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed removing {}", self.session_path.display())),
        }
    }
}

#[tracing::instrument(skip(path, contents))]
fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    debug!(file = %path.display(), bytes = contents.len(), "saving atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    writeln!(temp, "{contents}")?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
