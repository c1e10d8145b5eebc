use std::cell::RefCell;
use std::rc::Rc;

use gloo::timers::callback::Timeout;
use taskhub_core::auth::{
  self,
  AuthReply
};
use taskhub_shared::Session;
use web_sys::HtmlInputElement;
use yew::{
  Callback,
  Html,
  Properties,
  SubmitEvent,
  TargetCast,
  function_component,
  html,
  use_mut_ref,
  use_reducer
};

use super::state::{
  AuthAction,
  AuthState
};
use crate::api::WebBackend;

#[derive(Properties, PartialEq)]
pub struct AuthViewProps {
  pub backend:    WebBackend,
  pub on_session: Callback<Session>
}

#[function_component(AuthView)]
pub fn auth_view(
  props: &AuthViewProps
) -> Html {
  let state =
    use_reducer(AuthState::default);
  // Dropped with the view, which
  // cancels a pending clear.
  let notice_timer: Rc<
    RefCell<Option<Timeout>>
  > = use_mut_ref(|| None);

  let on_submit = {
    let state = state.clone();
    let backend = props.backend.clone();
    let on_session =
      props.on_session.clone();
    let notice_timer =
      notice_timer.clone();

    Callback::from(
      move |e: SubmitEvent| {
        e.prevent_default();

        let request =
          state.form.clone().begin_submit();
        state
          .dispatch(AuthAction::Submitting);

        let state = state.clone();
        let backend = backend.clone();
        let on_session =
          on_session.clone();
        let notice_timer =
          notice_timer.clone();

        wasm_bindgen_futures::spawn_local(
          async move {
            let result = auth::perform(
              &backend, &request
            )
            .await;
            state.dispatch(
              AuthAction::Finished(
                request.mode,
                result.clone()
              )
            );

            if let Some(ttl) = result
              .as_ref()
              .ok()
              .and_then(AuthReply::notice_ttl)
            {
              let dispatcher =
                state.dispatcher();
              let millis = u32::try_from(
                ttl.as_millis()
              )
              .unwrap_or(u32::MAX);
              *notice_timer.borrow_mut() =
                Some(Timeout::new(
                  millis,
                  move || {
                    dispatcher.dispatch(
                      AuthAction::ExpireNotice
                    )
                  }
                ));
            }

            match result {
              | Ok(AuthReply::SignedUp(
                session
              )) => {
                if let Some(session) =
                  session
                {
                  on_session.emit(session);
                }
              }
              | Ok(AuthReply::SignedIn(
                session
              )) => on_session.emit(session),
              | Err(_) => {}
            }
          }
        );
      }
    )
  };

  let on_email = {
    let state = state.clone();
    Callback::from(
      move |e: yew::InputEvent| {
        let input: HtmlInputElement =
          e.target_unchecked_into();
        state.dispatch(
          AuthAction::SetEmail(
            input.value()
          )
        );
      }
    )
  };

  let on_password = {
    let state = state.clone();
    Callback::from(
      move |e: yew::InputEvent| {
        let input: HtmlInputElement =
          e.target_unchecked_into();
        state.dispatch(
          AuthAction::SetPassword(
            input.value()
          )
        );
      }
    )
  };

  let on_toggle = {
    let state = state.clone();
    Callback::from(
      move |_: yew::MouseEvent| {
        state
          .dispatch(AuthAction::ToggleMode)
      }
    )
  };

  let form = &state.form;

  html! {
      <div class="panel auth">
          <h2>{ form.mode.title() }</h2>
          <form onsubmit={on_submit}>
              <input
                  type="email"
                  placeholder="Email"
                  value={form.email.clone()}
                  oninput={on_email}
              />
              <input
                  type="password"
                  placeholder="Password"
                  value={form.password.clone()}
                  oninput={on_password}
              />
              {
                  if let Some(error) = &form.error {
                      html! { <div class="error">{ error }</div> }
                  } else {
                      html! {}
                  }
              }
              {
                  if let Some(notice) = &form.notice {
                      html! { <div class="notice">{ notice }</div> }
                  } else {
                      html! {}
                  }
              }
              <button type="submit">{ form.mode.title() }</button>
          </form>
          <button class="link" onclick={on_toggle}>{ form.mode.switch_label() }</button>
      </div>
  }
}
