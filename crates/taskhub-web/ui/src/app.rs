mod auth_view;
mod state;
mod storage;
mod task_view;

use taskhub_core::backend::AuthApi;
use taskhub_core::config::Settings;
use taskhub_shared::Session;
use yew::{
  Callback,
  Html,
  Properties,
  function_component,
  html,
  use_state
};

use crate::api::WebBackend;
use auth_view::AuthView;
use task_view::TaskView;

#[derive(Properties, PartialEq)]
pub struct AppProps {
  pub settings: Settings
}

/// Root view: the auth form until a
/// session exists, then the task list.
#[function_component(App)]
pub fn app(props: &AppProps) -> Html {
  let session =
    use_state(storage::load_session);
  let backend = WebBackend::new(
    &props.settings.connection
  );

  let on_session = {
    let session = session.clone();
    Callback::from(
      move |next: Session| {
        tracing::info!(user = %next.user.id, "session established");
        storage::save_session(&next);
        session.set(Some(next));
      }
    )
  };

  let on_sign_out = {
    let session = session.clone();
    let backend = backend.clone();
    Callback::from(move |_: ()| {
      let Some(current) =
        (*session).clone()
      else {
        return;
      };
      let backend = backend
        .clone()
        .with_session(Some(
          current.clone()
        ));
      wasm_bindgen_futures::spawn_local(
        async move {
          if let Err(err) = backend
            .sign_out(&current)
            .await
          {
            tracing::error!(error = %err, "error signing out");
          }
        }
      );
      storage::clear_session();
      session.set(None);
    })
  };

  match (*session).clone() {
    | None => html! {
        <AuthView backend={backend} on_session={on_session} />
    },
    | Some(current) => {
      let key =
        current.user.id.to_string();
      html! {
          <TaskView
              key={key}
              backend={backend.with_session(Some(current.clone()))}
              settings={props.settings.clone()}
              session={current}
              on_sign_out={on_sign_out}
          />
      }
    }
  }
}
