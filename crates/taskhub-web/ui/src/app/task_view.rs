use futures::FutureExt;
use futures::channel::oneshot;
use taskhub_core::backend::ImageFile;
use taskhub_core::board;
use taskhub_core::config::Settings;
use taskhub_core::feed;
use taskhub_shared::{
  Session,
  TaskId
};
use web_sys::File;
use yew::{
  Callback,
  Html,
  Properties,
  function_component,
  html,
  use_effect_with,
  use_reducer
};

use super::state::{
  BoardAction,
  BoardState
};
use crate::api::WebBackend;
use crate::components::{
  TaskForm,
  TaskList
};

#[derive(Properties, PartialEq)]
pub struct TaskViewProps {
  pub backend:     WebBackend,
  pub settings:    Settings,
  pub session:     Session,
  pub on_sign_out: Callback<()>
}

#[function_component(TaskView)]
pub fn task_view(
  props: &TaskViewProps
) -> Html {
  let state =
    use_reducer(BoardState::default);

  {
    let state = state.clone();
    let backend = props.backend.clone();
    let topic =
      props.settings.feed_topic();

    use_effect_with((), move |_| {
      let loader = state.dispatcher();
      let load_backend = backend.clone();
      wasm_bindgen_futures::spawn_local(
        async move {
          let result =
            board::fetch_tasks(
              &load_backend
            )
            .await;
          loader.dispatch(
            BoardAction::Loaded(result)
          );
        }
      );

      let (stop_tx, stop_rx) =
        oneshot::channel::<()>();
      let feed_sink = state.dispatcher();
      wasm_bindgen_futures::spawn_local(
        async move {
          let stop =
            stop_rx.map(|_| ());
          let followed = feed::follow(
            &backend,
            &topic,
            stop,
            |change| {
              feed_sink.dispatch(
                BoardAction::Changed(
                  change
                )
              )
            }
          )
          .await;
          if let Err(err) = followed {
            tracing::error!(error = %err, "subscription error");
          }
        }
      );

      move || {
        if stop_tx.send(()).is_err() {
          tracing::debug!(
            "change feed already \
             finished"
          );
        }
      }
    });
  }

  let on_title = {
    let state = state.clone();
    Callback::from(
      move |title: String| {
        state.dispatch(
          BoardAction::SetTitle(title)
        )
      }
    )
  };

  let on_description = {
    let state = state.clone();
    Callback::from(
      move |text: String| {
        state.dispatch(
          BoardAction::SetDescription(
            text
          )
        )
      }
    )
  };

  let on_image = {
    let state = state.clone();
    Callback::from(
      move |file: Option<File>| {
        let image =
          file.map(|file| ImageFile {
            name:         file.name(),
            content_type: Some(
              file.type_()
            )
            .filter(|t| !t.is_empty()),
            body:         file
          });
        state.dispatch(
          BoardAction::AttachImage(image)
        )
      }
    )
  };

  let on_create = {
    let state = state.clone();
    let backend = props.backend.clone();
    let bucket =
      props.settings.bucket.clone();
    let email =
      props.session.email().to_string();

    Callback::from(move |_: ()| {
      let request = state
        .board
        .create_request(&email);
      state.dispatch(BoardAction::Started);

      let state = state.clone();
      let backend = backend.clone();
      let bucket = bucket.clone();
      wasm_bindgen_futures::spawn_local(
        async move {
          let now_ms =
            js_sys::Date::now() as i64;
          let result = board::submit_task(
            &backend, &bucket, request,
            now_ms
          )
          .await;
          state.dispatch(
            BoardAction::Created(result)
          );
        }
      );
    })
  };

  let on_edit_buffer = {
    let state = state.clone();
    Callback::from(
      move |text: String| {
        state.dispatch(
          BoardAction::SetEditBuffer(
            text
          )
        )
      }
    )
  };

  let on_edit = {
    let state = state.clone();
    let backend = props.backend.clone();
    Callback::from(
      move |id: TaskId| {
        let request =
          state.board.update_request(id);
        state
          .dispatch(BoardAction::Started);

        let state = state.clone();
        let backend = backend.clone();
        wasm_bindgen_futures::spawn_local(
          async move {
            let result =
              board::save_description(
                &backend, &request
              )
              .await;
            state.dispatch(
              BoardAction::Updated(
                id, result
              )
            );
          }
        );
      }
    )
  };

  let on_delete = {
    let state = state.clone();
    let backend = props.backend.clone();
    Callback::from(
      move |id: TaskId| {
        state
          .dispatch(BoardAction::Started);

        let state = state.clone();
        let backend = backend.clone();
        wasm_bindgen_futures::spawn_local(
          async move {
            let result =
              board::remove_task(
                &backend, id
              )
              .await;
            state.dispatch(
              BoardAction::Deleted(
                id, result
              )
            );
          }
        );
      }
    )
  };

  let on_sign_out = {
    let on_sign_out =
      props.on_sign_out.clone();
    Callback::from(
      move |_: yew::MouseEvent| {
        on_sign_out.emit(())
      }
    )
  };

  let board = &state.board;

  html! {
      <div class="panel tasks">
          <div class="header">
              <h2>{ "Task Manager CRUD" }</h2>
              <span class="who">{ props.session.email() }</span>
              <button class="link" onclick={on_sign_out}>{ "Sign Out" }</button>
          </div>
          <TaskForm
              draft={board.draft.clone()}
              has_image={board.image.is_some()}
              error={board.error.clone()}
              on_title={on_title}
              on_description={on_description}
              on_image={on_image}
              on_submit={on_create}
          />
          <TaskList
              tasks={board.tasks().to_vec()}
              on_edit_buffer={on_edit_buffer}
              on_edit={on_edit}
              on_delete={on_delete}
          />
      </div>
  }
}
