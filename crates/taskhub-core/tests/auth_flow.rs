mod support;

use std::time::Duration;

use futures::executor::block_on;
use taskhub_core::auth::{AuthForm, AuthMode, AuthReply, NOTICE_TTL, SIGN_UP_NOTICE, SubmitOutcome};
use taskhub_core::error::BackendError;

use support::{Call, FakeBackend};

fn filled(mode: AuthMode) -> AuthForm {
    let mut form = AuthForm {
        mode,
        ..AuthForm::default()
    };
    form.set_email("ana@example.com");
    form.set_password("hunter22");
    form
}

#[test]
fn sign_up_switches_to_sign_in_and_raises_notice() {
    let backend = FakeBackend::default();
    let mut form = filled(AuthMode::SignUp);

    let outcome = block_on(form.submit(&backend));

    assert_eq!(
        outcome,
        SubmitOutcome::SignedUp {
            session: None,
            clear_after: Duration::from_millis(5000),
        }
    );
    assert_eq!(form.mode, AuthMode::SignIn);
    assert_eq!(form.email, "");
    assert_eq!(form.password, "");
    assert_eq!(form.notice.as_deref(), Some(SIGN_UP_NOTICE));
    assert_eq!(backend.calls(), vec![Call::SignUp("ana@example.com".to_string())]);

    form.expire_notice();
    assert_eq!(form.notice, None);
}

#[test]
fn rejected_sign_in_keeps_fields_and_shows_backend_message() {
    let backend = FakeBackend::default();
    backend.fail("sign_in", BackendError::rejected(400, "Invalid login credentials"));
    let mut form = filled(AuthMode::SignIn);

    let outcome = block_on(form.submit(&backend));

    assert_eq!(outcome, SubmitOutcome::Rejected);
    assert_eq!(form.error.as_deref(), Some("Invalid login credentials"));
    assert_eq!(form.email, "ana@example.com");
    assert_eq!(form.password, "hunter22");
    assert_eq!(form.mode, AuthMode::SignIn);
}

#[test]
fn rejected_sign_up_stays_in_sign_up_mode() {
    let backend = FakeBackend::default();
    backend.fail("sign_up", BackendError::rejected(422, "User already registered"));
    let mut form = filled(AuthMode::SignUp);

    let outcome = block_on(form.submit(&backend));

    assert_eq!(outcome, SubmitOutcome::Rejected);
    assert_eq!(form.mode, AuthMode::SignUp);
    assert_eq!(form.error.as_deref(), Some("User already registered"));
    assert_eq!(form.email, "ana@example.com");
    assert_eq!(form.password, "hunter22");
    assert_eq!(form.notice, None);
}

#[test]
fn notice_lifetime_follows_the_reply() {
    let sign_up = AuthReply::SignedUp(None);
    assert_eq!(sign_up.notice_ttl(), Some(NOTICE_TTL));
    assert_eq!(
        AuthReply::SignedIn(support::session("ana@example.com")).notice_ttl(),
        None
    );

    let mut form = filled(AuthMode::SignUp);
    let request = form.begin_submit();
    let outcome = form.finish_submit(request.mode, Ok(sign_up.clone()));

    match outcome {
        SubmitOutcome::SignedUp { clear_after, .. } => {
            assert_eq!(Some(clear_after), sign_up.notice_ttl());
            assert_eq!(clear_after.as_millis(), 5000);
        }
        other => panic!("expected sign-up, got {other:?}"),
    }
    assert!(form.notice.is_some());

    // The timer firing is the only thing that clears it.
    form.toggle_mode();
    assert_eq!(form.notice.as_deref(), Some(SIGN_UP_NOTICE));
    form.expire_notice();
    assert_eq!(form.notice, None);
}

#[test]
fn toggling_clears_fields_but_not_messages() {
    let backend = FakeBackend::default();
    backend.fail("sign_in", BackendError::rejected(400, "Email not confirmed"));
    let mut form = filled(AuthMode::SignIn);
    block_on(form.submit(&backend));

    form.toggle_mode();

    assert_eq!(form.mode, AuthMode::SignUp);
    assert_eq!(form.email, "");
    assert_eq!(form.password, "");
    assert_eq!(form.error.as_deref(), Some("Email not confirmed"));
}

#[test]
fn successful_sign_in_clears_previous_error() {
    let backend = FakeBackend::default();
    backend.fail("sign_in", BackendError::transport("connection refused"));
    let mut form = filled(AuthMode::SignIn);

    assert_eq!(block_on(form.submit(&backend)), SubmitOutcome::Rejected);
    assert_eq!(form.error.as_deref(), Some("network error: connection refused"));

    match block_on(form.submit(&backend)) {
        SubmitOutcome::SignedIn(session) => assert_eq!(session.email(), "ana@example.com"),
        other => panic!("expected sign-in, got {other:?}"),
    }
    assert_eq!(form.error, None);
}

#[test]
fn mode_labels() {
    assert_eq!(AuthMode::default(), AuthMode::SignIn);
    assert_eq!(AuthMode::SignIn.title(), "Sign In");
    assert_eq!(AuthMode::SignIn.switch_label(), "Switch to Sign Up");
    assert_eq!(AuthMode::SignUp.switch_label(), "Switch to Sign In");
}
