use taskhub_core::board::Draft;
use web_sys::{
  File,
  HtmlInputElement,
  HtmlTextAreaElement
};
use yew::{
  Callback,
  Html,
  Properties,
  SubmitEvent,
  TargetCast,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct TaskFormProps {
  pub draft:          Draft,
  pub has_image:      bool,
  pub error:          Option<String>,
  pub on_title:       Callback<String>,
  pub on_description: Callback<String>,
  pub on_image:       Callback<Option<File>>,
  pub on_submit:      Callback<()>
}

#[function_component(TaskForm)]
pub fn task_form(
  props: &TaskFormProps
) -> Html {
  let on_title = {
    let on_title = props.on_title.clone();
    Callback::from(
      move |e: yew::InputEvent| {
        let input: HtmlInputElement =
          e.target_unchecked_into();
        on_title.emit(input.value());
      }
    )
  };

  let on_description = {
    let on_description =
      props.on_description.clone();
    Callback::from(
      move |e: yew::InputEvent| {
        let input: HtmlTextAreaElement =
          e.target_unchecked_into();
        on_description.emit(input.value());
      }
    )
  };

  let on_file = {
    let on_image = props.on_image.clone();
    Callback::from(
      move |e: yew::Event| {
        let input: HtmlInputElement =
          e.target_unchecked_into();
        let file = input
          .files()
          .and_then(|files| files.get(0));
        on_image.emit(file);
      }
    )
  };

  let on_submit = {
    let on_submit =
      props.on_submit.clone();
    Callback::from(
      move |e: SubmitEvent| {
        e.prevent_default();
        on_submit.emit(());
      }
    )
  };

  // Remounting the file input is the
  // only way to clear its selection.
  let file_key = if props.has_image {
    "file-picked"
  } else {
    "file-empty"
  };

  html! {
      <form class="task-form" onsubmit={on_submit}>
          <input
              type="text"
              placeholder="Task Title"
              value={props.draft.title.clone()}
              oninput={on_title}
          />
          <textarea
              placeholder="Task Description"
              value={props.draft.description.clone()}
              oninput={on_description}
          />
          <input key={file_key} type="file" accept="image/*" onchange={on_file} />
          <button type="submit">{ "Add Task" }</button>
          {
              if let Some(error) = &props.error {
                  html! { <div class="error">{ error }</div> }
              } else {
                  html! {}
              }
          }
      </form>
  }
}
