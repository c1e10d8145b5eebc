use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use taskhub_shared::TaskId;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskhub",
    version,
    about = "TaskHub: shared task list on a hosted backend",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "taskhubrc", global = true)]
    pub taskhubrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Register a new account; a verification email is sent.
    Signup(CredentialArgs),
    /// Sign in and remember the session.
    Signin(CredentialArgs),
    /// Forget the stored session.
    Signout,
    /// Print every task, oldest first.
    List,
    /// Create a task, optionally with an image.
    Add {
        title: String,
        #[arg(short = 'd', long = "description", default_value = "")]
        description: String,
        #[arg(long = "image")]
        image: Option<PathBuf>,
    },
    /// Replace a task's description.
    Edit {
        id: TaskId,
        #[arg(short = 'd', long = "description")]
        description: String,
    },
    /// Delete a task.
    Delete { id: TaskId },
    /// Print the list, then follow live changes until Ctrl-C.
    Watch,
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct CredentialArgs {
    #[arg(long = "email")]
    pub email: String,

    #[arg(long = "password", env = "TASKHUB_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` (or `rc.key:value`) overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> PreprocessedArgs {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest.split_once('=').or_else(|| rest.split_once(':'));
            if let Some((k, v)) = parsed {
                debug!(key = %k, "captured positional rc override");
                overrides.push((format!("rc.{k}"), v.to_string()));
                continue;
            }
        }

        cleaned.push(arg);
    }

    PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{Command, GlobalCli, preprocess_args};

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_removed() {
        let pre = preprocess_args(&args(&["taskhub", "rc.storage.bucket=pics", "list", "rc.color:off"]));
        assert_eq!(pre.cleaned_args, args(&["taskhub", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.storage.bucket".to_string(), "pics".to_string()),
                ("rc.color".to_string(), "off".to_string()),
            ]
        );
    }

    #[test]
    fn parses_edit_with_global_flags() {
        let cli = GlobalCli::try_parse_from(args(&[
            "taskhub", "-vv", "edit", "7", "--description", "new text", "--rc", "color=off",
        ]))
        .expect("parses");

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "color");
        assert_eq!(
            cli.command,
            Command::Edit {
                id: 7,
                description: "new text".to_string()
            }
        );
    }

    #[test]
    fn add_defaults_to_empty_description() {
        let cli = GlobalCli::try_parse_from(args(&["taskhub", "add", "Buy milk"])).expect("parses");
        assert_eq!(
            cli.command,
            Command::Add {
                title: "Buy milk".to_string(),
                description: String::new(),
                image: None,
            }
        );
    }
}
