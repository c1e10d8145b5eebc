mod api;
mod app;
mod components;

use taskhub_core::config::{
  ConnectionParams,
  Settings
};

fn main() {
  console_error_panic_hook::set_once();
  wasm_tracing::set_as_global_default();

  tracing::info!(
    "starting TaskHub frontend"
  );

  let Some(mount) = web_sys::window()
    .and_then(|window| {
      window.document()
    })
    .and_then(|document| {
      document.get_element_by_id("app")
    })
  else {
    tracing::error!(
      "missing #app mount element"
    );
    return;
  };

  // Connection parameters are baked in
  // at build time.
  match ConnectionParams::from_values(
    option_env!("TASKHUB_SUPABASE_URL"),
    option_env!(
      "TASKHUB_SUPABASE_ANON_KEY"
    )
  ) {
    | Ok(params) => {
      yew::Renderer::<app::App>::with_root_and_props(
        mount,
        app::AppProps {
          settings: Settings::new(params)
        }
      )
      .render();
    }
    | Err(err) => {
      tracing::error!(error = %err, "cannot start without backend settings");
      yew::Renderer::<components::FatalScreen>::with_root_and_props(
        mount,
        components::FatalScreenProps {
          message: err.to_string()
        }
      )
      .render();
    }
  }
}
