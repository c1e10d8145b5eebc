use taskhub_shared::{
  Task,
  TaskId
};
use web_sys::HtmlTextAreaElement;
use yew::{
  Callback,
  Html,
  Properties,
  TargetCast,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct TaskListRowProps {
  pub task:           Task,
  pub on_edit_buffer: Callback<String>,
  pub on_edit:        Callback<TaskId>,
  pub on_delete:      Callback<TaskId>
}

/// One task. The textarea is not bound
/// to state: whatever was typed last, in
/// any row, is what Edit sends.
#[function_component(TaskListRow)]
pub fn task_list_row(
  props: &TaskListRowProps
) -> Html {
  let id = props.task.id;

  let on_input = {
    let on_edit_buffer =
      props.on_edit_buffer.clone();
    Callback::from(
      move |e: yew::InputEvent| {
        let input: HtmlTextAreaElement =
          e.target_unchecked_into();
        on_edit_buffer.emit(input.value());
      }
    )
  };
  let on_edit = {
    let on_edit = props.on_edit.clone();
    Callback::from(
      move |_: yew::MouseEvent| {
        on_edit.emit(id)
      }
    )
  };
  let on_delete = {
    let on_delete =
      props.on_delete.clone();
    Callback::from(
      move |_: yew::MouseEvent| {
        on_delete.emit(id)
      }
    )
  };

  html! {
      <li class="row">
          <div>
              <h3>{ &props.task.title }</h3>
              <p>{ &props.task.description }</p>
              {
                  match &props.task.image_url {
                      | Some(url) => html! {
                          <img class="thumb" src={url.clone()} alt={props.task.title.clone()} />
                      },
                      | None => html! {}
                  }
              }
              <div class="row-actions">
                  <textarea placeholder="Updated description..." oninput={on_input} />
                  <button onclick={on_edit}>{ "Edit" }</button>
                  <button onclick={on_delete}>{ "Delete" }</button>
              </div>
          </div>
      </li>
  }
}
