use std::collections::HashMap;
use std::fmt;
#[cfg(feature = "native")]
use std::fs;
#[cfg(feature = "native")]
use std::path::{
  Path,
  PathBuf
};

#[cfg(feature = "native")]
use anyhow::{
  Context,
  anyhow
};
use taskhub_shared::ChangeKind;
use tracing::{
  debug,
  error
};
#[cfg(feature = "native")]
use tracing::{
  info,
  trace,
  warn
};
use url::Url;

use crate::error::ConfigError;
use crate::realtime::FeedTopic;

pub const URL_KEY: &str = "supabase.url";
pub const ANON_KEY_KEY: &str =
  "supabase.anon_key";
pub const BUCKET_KEY: &str =
  "storage.bucket";
pub const CHANNEL_KEY: &str =
  "feed.channel";
pub const DATA_KEY: &str =
  "data.location";

pub const URL_ENV: &str =
  "TASKHUB_SUPABASE_URL";
pub const ANON_KEY_ENV: &str =
  "TASKHUB_SUPABASE_ANON_KEY";

pub const TASKS_TABLE: &str = "tasks";
pub const TASKS_SCHEMA: &str = "public";
pub const DEFAULT_BUCKET: &str =
  "tasks-images";
pub const DEFAULT_CHANNEL: &str =
  "tasks-channel";

/// Validated handle parameters for the
/// hosted backend. Built once at
/// startup; a missing value is fatal.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
  pub url:     Url,
  pub api_key: String
}

impl fmt::Debug for ConnectionParams {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("ConnectionParams")
      .field("url", &self.url.as_str())
      .field("api_key", &"<redacted>")
      .finish()
  }
}

impl ConnectionParams {
  pub fn from_values(
    url: Option<&str>,
    api_key: Option<&str>
  ) -> Result<Self, ConfigError> {
    let url = url
      .map(str::trim)
      .filter(|v| !v.is_empty());
    let api_key = api_key
      .map(str::trim)
      .filter(|v| !v.is_empty());

    let mut missing = Vec::new();
    if url.is_none() {
      error!(
        key = URL_KEY,
        "service URL is not set"
      );
      missing.push(URL_KEY);
    }
    if api_key.is_none() {
      error!(
        key = ANON_KEY_KEY,
        "service key is not set"
      );
      missing.push(ANON_KEY_KEY);
    }

    let (Some(url), Some(api_key)) =
      (url, api_key)
    else {
      return Err(ConfigError::Missing(
        missing
      ));
    };

    Ok(Self {
      url:     parse_service_url(url)?,
      api_key: api_key.to_string()
    })
  }
}

fn parse_service_url(
  raw: &str
) -> Result<Url, ConfigError> {
  let invalid = |reason: String| {
    ConfigError::InvalidUrl {
      value: raw.to_string(),
      reason
    }
  };

  let mut url = Url::parse(raw)
    .map_err(|e| invalid(e.to_string()))?;
  if !matches!(
    url.scheme(),
    "http" | "https"
  ) {
    return Err(invalid(format!(
      "unsupported scheme {}",
      url.scheme()
    )));
  }

  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  url.set_query(None);
  url.set_fragment(None);
  Ok(url)
}

/// Everything the views need to reach
/// the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  pub connection: ConnectionParams,
  pub bucket:     String,
  pub channel:    String
}

impl Settings {
  pub fn new(
    connection: ConnectionParams
  ) -> Self {
    Self {
      connection,
      bucket: DEFAULT_BUCKET.to_string(),
      channel: DEFAULT_CHANNEL
        .to_string()
    }
  }

  pub fn from_config(
    cfg: &Config
  ) -> Result<Self, ConfigError> {
    let connection =
      ConnectionParams::from_values(
        cfg.get(URL_KEY).as_deref(),
        cfg.get(ANON_KEY_KEY).as_deref()
      )?;

    let mut settings =
      Self::new(connection);
    if let Some(bucket) =
      cfg.get(BUCKET_KEY)
    {
      settings.bucket = bucket;
    }
    if let Some(channel) =
      cfg.get(CHANNEL_KEY)
    {
      settings.channel = channel;
    }
    debug!(
      url = %settings.connection.url,
      bucket = %settings.bucket,
      channel = %settings.channel,
      "resolved backend settings"
    );
    Ok(settings)
  }

  pub fn feed_topic(&self) -> FeedTopic {
    FeedTopic {
      channel: self.channel.clone(),
      schema:  TASKS_SCHEMA.to_string(),
      table:   TASKS_TABLE.to_string(),
      events:  ChangeKind::ALL.to_vec()
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
  map: HashMap<String, String>,
  #[cfg(feature = "native")]
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  pub fn with_defaults() -> Self {
    let mut cfg = Config::default();
    cfg.map.insert(
      BUCKET_KEY.to_string(),
      DEFAULT_BUCKET.to_string()
    );
    cfg.map.insert(
      CHANNEL_KEY.to_string(),
      DEFAULT_CHANNEL.to_string()
    );
    cfg.map.insert(
      DATA_KEY.to_string(),
      "~/.taskhub".to_string()
    );
    cfg
  }

  #[cfg(feature = "native")]
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::with_defaults();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading taskhubrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no taskhubrc found; using \
         defaults and environment"
      );
    }

    cfg.apply_env(|name| {
      std::env::var(name).ok()
    });
    Ok(cfg)
  }

  /// Environment variables win over
  /// the rc file.
  pub fn apply_env<F>(
    &mut self,
    lookup: F
  ) where
    F: Fn(&str) -> Option<String>
  {
    for (env, key) in [
      (URL_ENV, URL_KEY),
      (ANON_KEY_ENV, ANON_KEY_KEY)
    ] {
      if let Some(value) = lookup(env) {
        debug!(env, key, "applying environment override");
        self
          .map
          .insert(key.to_string(), value);
      }
    }
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      if key == ANON_KEY_KEY {
        debug!(key = %key, "applying override");
      } else {
        debug!(key = %key, value = %v, "applying override");
      }
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// Parses `key = value` lines; `#`
  /// starts a comment. Includes are
  /// handed back to the caller.
  pub fn parse_lines(
    &mut self,
    origin: &str,
    text: &str
  ) -> Result<Vec<String>, String> {
    let mut includes = Vec::new();

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }
      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        includes.push(
          include_rest.trim().to_string()
        );
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          format!(
            "invalid config line \
             {}:{}: {}",
            origin,
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      if key != ANON_KEY_KEY {
        tracing::trace!(key = %key, value = %value, "loaded config key");
      }
      self.map.insert(key, value);
    }

    Ok(includes)
  }

  #[cfg(feature = "native")]
  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    let includes = self
      .parse_lines(
        &path.display().to_string(),
        &text
      )
      .map_err(|e| anyhow!(e))?;

    for include in includes {
      let include_path =
        resolve_include_path(
          &base_dir, &include
        )?;
      if self
        .loaded_files
        .contains(&include_path)
      {
        warn!(include = %include_path.display(), "include already loaded; skipping");
        continue;
      }
      if include_path.exists() {
        trace!(include = %include_path.display(), "processing include");
        self.load_file(&include_path)?;
      } else {
        warn!(include = %include_path.display(), "include file does not exist; skipping");
      }
    }

    Ok(())
  }
}

#[cfg(feature = "native")]
#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get(DATA_KEY)
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    home_dir()?.join(".taskhub")
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[cfg(feature = "native")]
#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("TASKHUBRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let candidate =
    home_dir()?.join(".taskhubrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

#[cfg(feature = "native")]
fn home_dir() -> anyhow::Result<PathBuf> {
  dirs::home_dir().ok_or_else(|| {
    anyhow!(
      "cannot determine home \
       directory"
    )
  })
}

#[cfg(feature = "native")]
fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let expanded =
    expand_tilde(Path::new(include));
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

#[cfg(feature = "native")]
fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
