use std::time::Duration;

use taskhub_shared::{
  Credentials,
  Session
};
use tracing::{
  error,
  info
};

use crate::backend::AuthApi;
use crate::error::BackendError;

pub const SIGN_UP_NOTICE: &str =
  "Email sent for verification. \
   Please check your inbox.";

/// How long the sign-up notice stays
/// up before it clears itself.
pub const NOTICE_TTL: Duration =
  Duration::from_millis(5_000);

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum AuthMode {
  SignUp,
  #[default]
  SignIn
}

impl AuthMode {
  pub fn toggled(self) -> Self {
    match self {
      | AuthMode::SignUp => {
        AuthMode::SignIn
      }
      | AuthMode::SignIn => {
        AuthMode::SignUp
      }
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      | AuthMode::SignUp => "Sign Up",
      | AuthMode::SignIn => "Sign In"
    }
  }

  pub fn switch_label(
    self
  ) -> &'static str {
    match self {
      | AuthMode::SignUp => {
        "Switch to Sign In"
      }
      | AuthMode::SignIn => {
        "Switch to Sign Up"
      }
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Default,
)]
pub struct AuthForm {
  pub mode:     AuthMode,
  pub email:    String,
  pub password: String,
  pub error:    Option<String>,
  pub notice:   Option<String>
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthRequest {
  pub mode:        AuthMode,
  pub credentials: Credentials
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthReply {
  SignedUp(Option<Session>),
  SignedIn(Session)
}

impl AuthReply {
  /// How long the notice raised by
  /// this reply stays up, if it raises
  /// one.
  pub fn notice_ttl(
    &self
  ) -> Option<Duration> {
    match self {
      | AuthReply::SignedUp(_) => {
        Some(NOTICE_TTL)
      }
      | AuthReply::SignedIn(_) => None
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
  SignedIn(Session),
  /// The notice is up and should be
  /// cleared after `clear_after`.
  SignedUp {
    session:     Option<Session>,
    clear_after: Duration
  },
  Rejected
}

impl AuthForm {
  pub fn new() -> Self {
    Self::default()
  }

  /// Clears both fields. Error and
  /// notice text stay until the next
  /// submit.
  pub fn toggle_mode(&mut self) {
    self.mode = self.mode.toggled();
    self.email.clear();
    self.password.clear();
  }

  pub fn set_email(
    &mut self,
    email: impl Into<String>
  ) {
    self.email = email.into();
  }

  pub fn set_password(
    &mut self,
    password: impl Into<String>
  ) {
    self.password = password.into();
  }

  pub fn begin_submit(
    &mut self
  ) -> AuthRequest {
    self.error = None;
    AuthRequest {
      mode:        self.mode,
      credentials: Credentials {
        email:    self.email.clone(),
        password: self.password.clone()
      }
    }
  }

  pub fn finish_submit(
    &mut self,
    mode: AuthMode,
    result: Result<AuthReply, BackendError>
  ) -> SubmitOutcome {
    match result {
      | Err(err) => {
        error!(
          mode = mode.title(),
          error = %err,
          "authentication failed"
        );
        self.error = Some(err.to_string());
        SubmitOutcome::Rejected
      }
      | Ok(AuthReply::SignedUp(
        session
      )) => {
        info!(
          confirmed = session.is_some(),
          "sign-up accepted"
        );
        self.mode = AuthMode::SignIn;
        self.email.clear();
        self.password.clear();
        self.notice =
          Some(SIGN_UP_NOTICE.to_string());
        SubmitOutcome::SignedUp {
          session,
          clear_after: NOTICE_TTL
        }
      }
      | Ok(AuthReply::SignedIn(
        session
      )) => {
        info!(user = %session.user.id, "signed in");
        SubmitOutcome::SignedIn(session)
      }
    }
  }

  pub fn expire_notice(&mut self) {
    self.notice = None;
  }

  pub async fn submit<A: AuthApi>(
    &mut self,
    api: &A
  ) -> SubmitOutcome {
    let request = self.begin_submit();
    let result =
      perform(api, &request).await;
    self.finish_submit(
      request.mode,
      result
    )
  }
}

#[tracing::instrument(skip_all, fields(mode = request.mode.title()))]
pub async fn perform<A: AuthApi>(
  api: &A,
  request: &AuthRequest
) -> Result<AuthReply, BackendError> {
  match request.mode {
    | AuthMode::SignUp => {
      api
        .sign_up(&request.credentials)
        .await
        .map(AuthReply::SignedUp)
    }
    | AuthMode::SignIn => {
      api
        .sign_in_with_password(
          &request.credentials
        )
        .await
        .map(AuthReply::SignedIn)
    }
  }
}
