mod task_form;
mod task_list;
mod task_list_row;

pub use task_form::TaskForm;
pub use task_list::TaskList;
pub use task_list_row::TaskListRow;
use yew::{
    Html,
    Properties,
    function_component,
    html,
};

#[derive(Properties, PartialEq)]
pub struct FatalScreenProps {
    pub message: String,
}

/// Shown instead of the app when the backend connection settings are missing.
#[function_component(FatalScreen)]
pub fn fatal_screen(props: &FatalScreenProps) -> Html {
    html! {
        <div class="panel fatal">
            <h2>{ "TaskHub cannot start" }</h2>
            <p>{ &props.message }</p>
            <p>{ "Rebuild with TASKHUB_SUPABASE_URL and TASKHUB_SUPABASE_ANON_KEY set." }</p>
        </div>
    }
}
