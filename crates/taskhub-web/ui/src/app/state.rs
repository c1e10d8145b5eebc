use std::rc::Rc;

use taskhub_core::auth::{
  AuthForm,
  AuthMode,
  AuthReply
};
use taskhub_core::backend::ImageFile;
use taskhub_core::board::TaskBoard;
use taskhub_core::error::BackendError;
use taskhub_shared::{
  Task,
  TaskChange,
  TaskId
};
use web_sys::File;
use yew::Reducible;

#[derive(Debug, Clone, PartialEq, Default)]
pub(super) struct AuthState {
  pub form: AuthForm
}

pub(super) enum AuthAction {
  ToggleMode,
  SetEmail(String),
  SetPassword(String),
  Submitting,
  Finished(
    AuthMode,
    Result<AuthReply, BackendError>
  ),
  ExpireNotice
}

impl Reducible for AuthState {
  type Action = AuthAction;

  fn reduce(
    self: Rc<Self>,
    action: AuthAction
  ) -> Rc<Self> {
    let mut next =
      Rc::unwrap_or_clone(self);
    let form = &mut next.form;

    match action {
      | AuthAction::ToggleMode => {
        form.toggle_mode()
      }
      | AuthAction::SetEmail(email) => {
        form.set_email(email)
      }
      | AuthAction::SetPassword(
        password
      ) => form.set_password(password),
      | AuthAction::Submitting => {
        form.begin_submit();
      }
      | AuthAction::Finished(
        mode,
        result
      ) => {
        form.finish_submit(mode, result);
      }
      | AuthAction::ExpireNotice => {
        form.expire_notice()
      }
    }

    Rc::new(next)
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(super) struct BoardState {
  pub board: TaskBoard<File>
}

pub(super) enum BoardAction {
  SetTitle(String),
  SetDescription(String),
  SetEditBuffer(String),
  AttachImage(Option<ImageFile<File>>),
  /// A create, edit or delete was sent.
  Started,
  Loaded(Result<Vec<Task>, BackendError>),
  Created(Result<Task, BackendError>),
  Updated(
    TaskId,
    Result<(), BackendError>
  ),
  Deleted(
    TaskId,
    Result<(), BackendError>
  ),
  Changed(TaskChange)
}

impl Reducible for BoardState {
  type Action = BoardAction;

  fn reduce(
    self: Rc<Self>,
    action: BoardAction
  ) -> Rc<Self> {
    let mut next =
      Rc::unwrap_or_clone(self);
    let board = &mut next.board;

    match action {
      | BoardAction::SetTitle(title) => {
        board.set_title(title)
      }
      | BoardAction::SetDescription(
        description
      ) => board.set_description(description),
      | BoardAction::SetEditBuffer(
        text
      ) => board.set_edit_buffer(text),
      | BoardAction::AttachImage(
        image
      ) => board.attach_image(image),
      | BoardAction::Started => {
        board.clear_error()
      }
      | BoardAction::Loaded(result) => {
        board.finish_load(result)
      }
      | BoardAction::Created(result) => {
        board.finish_create(result)
      }
      | BoardAction::Updated(
        id,
        result
      ) => board.finish_update(id, result),
      | BoardAction::Deleted(
        id,
        result
      ) => board.finish_delete(id, result),
      | BoardAction::Changed(change) => {
        board.apply_change(change)
      }
    }

    Rc::new(next)
  }
}
