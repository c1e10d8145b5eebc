//! Client-side logic for the TaskHub
//! task list: auth form, task board,
//! change feed and the backend wire
//! contract. The `native` feature adds
//! the reqwest/tokio client and the CLI.

pub mod auth;
pub mod backend;
pub mod board;
pub mod config;
pub mod error;
pub mod feed;
pub mod realtime;
pub mod rest;

#[cfg(feature = "native")]
pub mod cli;
#[cfg(feature = "native")]
pub mod client;
#[cfg(feature = "native")]
pub mod commands;
#[cfg(feature = "native")]
pub mod datastore;
#[cfg(feature = "native")]
pub mod render;
#[cfg(feature = "native")]
pub mod socket;

#[cfg(feature = "native")]
pub use native::run;

#[cfg(feature = "native")]
mod native {
  use std::ffi::OsString;

  use anyhow::Context;
  use clap::Parser;
  use tracing::{
    debug,
    info
  };

  use crate::{
    cli,
    commands,
    config,
    datastore,
    render
  };

  #[tracing::instrument(skip_all)]
  pub fn run(
    raw_args: Vec<OsString>
  ) -> anyhow::Result<()> {
    let pre =
      cli::preprocess_args(&raw_args);
    let cli = cli::GlobalCli::parse_from(
      pre.cleaned_args
    );

    cli::init_tracing(
      cli.verbose,
      cli.quiet
    )?;

    info!(
      verbose = cli.verbose,
      quiet = cli.quiet,
      "starting taskhub CLI"
    );
    debug!(
      count = pre.rc_overrides.len(),
      "preprocessed rc overrides"
    );

    let mut cfg = config::Config::load(
      cli.taskhubrc.as_deref()
    )?;
    cfg.apply_overrides(
      pre.rc_overrides.into_iter().chain(
        cli
          .rc_overrides
          .into_iter()
          .map(|kv| (kv.key, kv.value))
      )
    );

    let settings =
      config::Settings::from_config(
        &cfg
      )?;

    let data_dir =
      config::resolve_data_dir(
        &cfg,
        cli.data.as_deref()
      )
      .context(
        "failed to resolve data \
         directory"
      )?;

    let store =
      datastore::SessionStore::open(
        &data_dir
      )
      .with_context(|| {
        format!(
          "failed to open session \
           store at {}",
          data_dir.display()
        )
      })?;

    let workspace = commands::Workspace {
      settings,
      store,
      renderer: render::Renderer::new(
        &cfg
      )?
    };

    let runtime =
      tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context(
          "failed to start async \
           runtime"
        )?;

    runtime.block_on(
      commands::dispatch(
        &workspace,
        cli.command
      )
    )?;

    info!("done");
    Ok(())
  }
}
