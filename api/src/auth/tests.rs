use store::{Gateway, LocalGateway, MemoryStore};

use super::{Auth, AuthSession};
use crate::guard::Route;
use crate::notify::{MemoryNotifier, Severity};
use crate::provider::PasswordVault;

type TestAuth =
    Auth<LocalGateway<MemoryStore>, MemoryStore, MemoryNotifier, PasswordVault<LocalGateway<MemoryStore>>>;

struct Harness {
    auth: TestAuth,
    gateway: LocalGateway<MemoryStore>,
    session_kv: MemoryStore,
    notifier: MemoryNotifier,
}

fn harness() -> Harness {
    let gateway = LocalGateway::new(MemoryStore::new());
    let session_kv = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let auth = Auth::new(
        gateway.clone(),
        AuthSession::new(session_kv.clone()),
        notifier.clone(),
        PasswordVault::new(gateway.clone()),
    );
    Harness {
        auth,
        gateway,
        session_kv,
        notifier,
    }
}

/// A fresh machine over the same stores, like a new process.
fn reopen(h: &Harness) -> TestAuth {
    Auth::new(
        h.gateway.clone(),
        AuthSession::new(h.session_kv.clone()),
        h.notifier.clone(),
        PasswordVault::new(h.gateway.clone()),
    )
}

#[tokio::test]
async fn test_signup_creates_default_family() {
    let mut h = harness();

    assert!(
        h.auth
            .signup_with_password("Sam Ortiz", "Sam@Example.com", "hunter2hunter2")
            .await
    );

    let state = h.auth.state();
    let user = state.user.as_ref().unwrap();
    assert_eq!(user.email, "sam@example.com");
    assert!(!user.families.is_empty());
    let current = user.current_family_id.as_ref().unwrap();
    assert!(user.families.contains(current));

    assert_eq!(state.families.len(), 1);
    assert_eq!(state.families[0].name, "Sam Ortiz's Family");
    assert_eq!(state.families[0].members.len(), 1);
    assert_eq!(state.current_family.as_ref().unwrap().id, *current);

    let stored = h.gateway.get_families().await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_signup_validation_rejects_before_any_write() {
    let mut h = harness();

    assert!(!h.auth.signup_with_password("Sam", "not-an-email", "hunter2hunter2").await);
    assert!(!h.auth.signup_with_password("", "sam@example.com", "hunter2hunter2").await);
    assert!(!h.auth.signup_with_password("Sam", "sam@example.com", "short").await);

    assert!(h.gateway.get_users().await.unwrap().is_empty());
    assert!(h.gateway.get_families().await.unwrap().is_empty());
    assert!(h.auth.state().user.is_none());
}

#[tokio::test]
async fn test_login_with_password() {
    let h = harness();
    let mut signup = reopen(&h);
    assert!(
        signup
            .signup_with_password("Sam Ortiz", "sam@example.com", "hunter2hunter2")
            .await
    );
    h.notifier.take();

    let mut login = reopen(&h);
    assert!(!login.login_with_password("sam@example.com", "wrong-password").await);
    assert!(login.state().user.is_none());
    let sent = h.notifier.take();
    assert!(sent.iter().any(|n| n.severity == Severity::Error));

    assert!(login.login_with_password("sam@example.com", "hunter2hunter2").await);
    let state = login.state();
    assert_eq!(state.user.as_ref().unwrap().email, "sam@example.com");
    assert_eq!(state.families.len(), 1);
    assert!(state.current_family.is_some());
}

#[tokio::test]
async fn test_verify_otp_accept_and_reject() {
    let mut h = harness();
    let session = AuthSession::new(h.session_kv.clone());
    session.set_pending_email("sam@example.com").await.unwrap();
    session.set_pending_name("Sam Ortiz").await.unwrap();
    session.set_verification_code("482913").await.unwrap();

    // Rejections change nothing and can be retried indefinitely.
    assert!(h.auth.verify_otp("000000").await.is_none());
    assert!(h.auth.verify_otp("000000").await.is_none());
    assert_eq!(
        session.pending_email().await.unwrap().as_deref(),
        Some("sam@example.com")
    );
    assert_eq!(
        session.verification_code().await.unwrap().as_deref(),
        Some("482913")
    );
    assert!(h.auth.state().user.is_none());

    let route = h.auth.verify_otp("482913").await;
    assert_eq!(route, Some(Route::To("/".to_string())));

    assert!(session.pending_email().await.unwrap().is_none());
    assert!(session.pending_name().await.unwrap().is_none());
    assert!(session.verification_code().await.unwrap().is_none());

    let state = h.auth.state();
    let user = state.user.as_ref().unwrap();
    assert_eq!(user.email, "sam@example.com");
    assert_eq!(user.name, "Sam Ortiz");
    assert_eq!(state.families.len(), 1);
    assert_eq!(state.families[0].name, "Sam Ortiz's Family");
}

#[tokio::test]
async fn test_fallback_code_bypasses_stored_code() {
    let mut h = harness();
    let session = AuthSession::new(h.session_kv.clone());
    session.set_pending_email("sam@example.com").await.unwrap();
    session.set_verification_code("482913").await.unwrap();

    assert!(h.auth.verify_otp("123456").await.is_some());
    assert!(h.auth.state().user.is_some());
}

#[tokio::test]
async fn test_verify_consumes_redirect_once() {
    let mut h = harness();
    let session = AuthSession::new(h.session_kv.clone());
    session.set_pending_email("sam@example.com").await.unwrap();
    session.set_verification_code("482913").await.unwrap();
    session.set_redirect("/chat").await.unwrap();

    let route = h.auth.verify_otp("482913").await;
    assert_eq!(route, Some(Route::To("/chat".to_string())));
    assert!(session.take_redirect().await.unwrap().is_none());
}

#[tokio::test]
async fn test_full_otp_login_flow() {
    let mut h = harness();

    let route = h.auth.login("Sam@Example.com").await;
    assert_eq!(route, Some(Route::Verify));
    // Starting the flow must not touch the signed-in state.
    assert!(h.auth.state().user.is_none());
    assert!(h.auth.state().families.is_empty());

    // The "email" arrives as a notification carrying the code.
    let sent = h.notifier.take();
    let code = sent
        .iter()
        .find_map(|n| n.title.strip_prefix("Verification Code: "))
        .unwrap()
        .to_string();

    assert!(h.auth.verify_otp(&code).await.is_some());
    assert_eq!(
        h.auth.state().user.as_ref().unwrap().email,
        "sam@example.com"
    );
}

#[tokio::test]
async fn test_bootstrap_restores_identity_and_is_idempotent() {
    let h = harness();
    let mut signup = reopen(&h);
    assert!(
        signup
            .signup_with_password("Sam Ortiz", "sam@example.com", "hunter2hunter2")
            .await
    );

    let mut fresh = reopen(&h);
    assert!(fresh.state().loading);

    fresh.bootstrap().await;
    let first = fresh.state().clone();
    assert!(!first.loading);
    assert_eq!(first.user.as_ref().unwrap().email, "sam@example.com");
    assert_eq!(first.families.len(), 1);
    assert!(first.current_family.is_some());

    fresh.bootstrap().await;
    assert_eq!(fresh.state(), &first);
}

#[tokio::test]
async fn test_bootstrap_without_identity_is_anonymous() {
    let mut h = harness();
    h.auth.bootstrap().await;

    let state = h.auth.state();
    assert!(!state.loading);
    assert!(state.user.is_none());
    assert!(state.families.is_empty());
}

#[tokio::test]
async fn test_switch_family() {
    let mut h = harness();
    assert!(
        h.auth
            .signup_with_password("Sam Ortiz", "sam@example.com", "hunter2hunter2")
            .await
    );
    let default_id = h.auth.state().families[0].id.clone();
    let lake = h.auth.create_family("Lake House").await.unwrap().unwrap();
    assert_eq!(h.auth.state().current_family.as_ref().unwrap().id, lake.id);

    // Unknown ids are a silent no-op.
    h.auth.switch_family("missing").await;
    assert_eq!(h.auth.state().current_family.as_ref().unwrap().id, lake.id);

    h.auth.switch_family(&default_id).await;
    assert_eq!(
        h.auth.state().current_family.as_ref().unwrap().id,
        default_id
    );

    // The selection is persisted on the user record.
    let user_id = h.auth.state().user.as_ref().unwrap().id.clone();
    let stored = h.gateway.get_user_by_id(&user_id).await.unwrap().unwrap();
    assert_eq!(stored.current_family_id.as_deref(), Some(default_id.as_str()));
}

#[tokio::test]
async fn test_rename_fans_out_to_every_membership_copy() {
    let mut h = harness();
    assert!(
        h.auth
            .signup_with_password("Sam Ortiz", "sam@example.com", "hunter2hunter2")
            .await
    );
    h.auth.create_family("Lake House").await.unwrap().unwrap();
    let user_id = h.auth.state().user.as_ref().unwrap().id.clone();

    h.auth.update_user_name("Samuel Ortiz Vega").await;

    let state = h.auth.state();
    assert_eq!(state.user.as_ref().unwrap().name, "Samuel Ortiz Vega");
    assert_eq!(state.user.as_ref().unwrap().initials, "SOV");

    let stored = h.gateway.get_families().await.unwrap();
    assert_eq!(stored.len(), 2);
    for family in &stored {
        let member = family.members.iter().find(|m| m.user_id == user_id).unwrap();
        assert_eq!(member.name, "Samuel Ortiz Vega");
        assert_eq!(member.initials, "SOV");
    }
    let current = state.current_family.as_ref().unwrap();
    assert_eq!(current.members[0].name, "Samuel Ortiz Vega");
}

#[tokio::test]
async fn test_logout_clears_only_auth_state() {
    let mut h = harness();
    assert!(
        h.auth
            .signup_with_password("Sam Ortiz", "sam@example.com", "hunter2hunter2")
            .await
    );

    let route = h.auth.logout().await;
    assert_eq!(route, Some(Route::Login));

    let state = h.auth.state();
    assert!(state.user.is_none());
    assert!(state.families.is_empty());
    assert!(state.current_family.is_none());

    // Gateway contents are untouched.
    assert_eq!(h.gateway.get_users().await.unwrap().len(), 1);
    assert_eq!(h.gateway.get_families().await.unwrap().len(), 1);

    // And the saved identity pointer is gone.
    let session = AuthSession::new(h.session_kv.clone());
    assert!(session.current_user_id().await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_family_requires_a_user() {
    let mut h = harness();
    let created = h.auth.create_family("Flat 12").await.unwrap();
    assert!(created.is_none());
    assert!(h.gateway.get_families().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_join_family_is_idempotent() {
    let h = harness();
    let mut sam = reopen(&h);
    assert!(
        sam.signup_with_password("Sam Ortiz", "sam@example.com", "hunter2hunter2")
            .await
    );
    let shared_id = sam.state().families[0].id.clone();

    let mut kim = reopen(&h);
    assert!(
        kim.signup_with_password("Kim Park", "kim@example.com", "hunter2hunter2")
            .await
    );

    let joined = kim.join_family(&shared_id).await.unwrap();
    assert_eq!(joined.members.len(), 2);
    assert_eq!(kim.state().current_family.as_ref().unwrap().id, shared_id);
    assert_eq!(kim.state().families.len(), 2);

    // Joining again changes nothing.
    let again = kim.join_family(&shared_id).await.unwrap();
    assert_eq!(again.members.len(), 2);
    assert_eq!(
        kim.state().user.as_ref().unwrap().families.iter().filter(|f| **f == shared_id).count(),
        1
    );

    assert!(kim.join_family("missing").await.is_none());
}

#[tokio::test]
async fn test_subscribers_observe_state_changes() {
    let mut h = harness();
    let mut rx = h.auth.subscribe();

    assert!(
        h.auth
            .signup_with_password("Sam Ortiz", "sam@example.com", "hunter2hunter2")
            .await
    );

    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert!(snapshot.user.is_some());
    assert_eq!(snapshot.families.len(), 1);
}
