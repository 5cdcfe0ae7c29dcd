//! Cart identity and synchronization scenarios.

mod common;

use common::{line, Storefront};
use kickstore_commerce::events::CommerceEvent;
use kickstore_commerce::ids::{SneakerId, UserId};
use kickstore_commerce::sync::{CartApi, MergeOutcome};
use kickstore_commerce::{CommerceError, ErrorKind, Money};

#[tokio::test]
async fn anonymous_cart_moves_to_server_on_login() {
    let store = Storefront::new();
    let user = UserId::new("user_a");

    store.session.add_item(&line("air-max-90", 1, 10000)).await.unwrap();
    assert_eq!(store.local().load().unwrap().len(), 1);
    assert!(store.server.stored(&user).is_none());

    let outcome = store.session.login(user.clone()).await.unwrap();
    assert!(matches!(outcome, MergeOutcome::Merged(ref r) if r.transferred == 1));

    let server_cart = store.server.stored(&user).unwrap();
    assert_eq!(server_cart.items().len(), 1);
    assert_eq!(server_cart.items()[0].quantity, 1);
    assert_eq!(server_cart.total_price(), Money::brl(10000));
    assert!(store.local().load().unwrap().is_empty());
    assert_eq!(store.session.cart(), server_cart);
}

#[tokio::test]
async fn repeated_login_triggers_merge_once() {
    let store = Storefront::new();
    let user = UserId::new("user_a");

    store.session.add_item(&line("dunk-low", 1, 12000)).await.unwrap();
    store.session.login(user.clone()).await.unwrap();
    for _ in 0..3 {
        assert_eq!(
            store.session.login(user.clone()).await.unwrap(),
            MergeOutcome::Skipped
        );
    }
    assert_eq!(store.server.stored(&user).unwrap().items()[0].quantity, 1);

    // After logout a new anonymous cart merges again, into the same line.
    store.session.logout();
    store.session.add_item(&line("dunk-low", 2, 12000)).await.unwrap();
    store.session.login(user.clone()).await.unwrap();

    let cart = store.server.stored(&user).unwrap();
    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].quantity, 3);
}

#[tokio::test]
async fn logout_never_touches_the_server_cart() {
    let store = Storefront::new();
    let user = UserId::new("user_a");
    let mut events = store.events.subscribe();

    store.session.login(user.clone()).await.unwrap();
    store.session.add_item(&line("dunk-low", 1, 12000)).await.unwrap();
    store.session.logout();

    assert!(store.session.cart().is_empty());
    assert!(!store.session.is_authenticated());
    assert_eq!(store.server.stored(&user).unwrap().items().len(), 1);

    let mut saw_logout = false;
    while let Ok(event) = events.try_recv() {
        saw_logout |= event == CommerceEvent::LoggedOut;
    }
    assert!(saw_logout);
}

#[tokio::test]
async fn partial_merge_drops_rejected_lines() {
    let store = Storefront::new();
    let user = UserId::new("user_a");
    store.server.reject_sneaker(SneakerId::new("jordan-1"));
    let mut events = store.events.subscribe();

    store.session.add_item(&line("air-max-90", 1, 10000)).await.unwrap();
    store.session.add_item(&line("jordan-1", 1, 99000)).await.unwrap();
    let outcome = store.session.login(user.clone()).await.unwrap();

    let MergeOutcome::Merged(report) = outcome else {
        panic!("expected a merge, got {outcome:?}");
    };
    assert_eq!(report.transferred, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(store.server.stored(&user).unwrap().items().len(), 1);
    assert!(store.local().load().unwrap().is_empty());

    let mut dropped = None;
    while let Ok(event) = events.try_recv() {
        if let CommerceEvent::MergeItemsDropped { sneakers, .. } = event {
            dropped = Some(sneakers);
        }
    }
    assert_eq!(dropped, Some(vec![SneakerId::new("jordan-1")]));
}

#[tokio::test]
async fn failed_merge_keeps_local_cart_for_next_session() {
    let store = Storefront::new();
    let user = UserId::new("user_a");

    store.session.add_item(&line("air-max-90", 1, 10000)).await.unwrap();
    store.server.set_offline(true);

    let err = store.session.login(user.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Synchronization);
    assert_eq!(store.local().load().unwrap().len(), 1);

    // Same session: no retry.
    store.server.set_offline(false);
    assert_eq!(
        store.session.login(user.clone()).await.unwrap(),
        MergeOutcome::Skipped
    );

    // Next session picks the preserved lines up.
    store.session.logout();
    let outcome = store.session.login(user.clone()).await.unwrap();
    assert!(matches!(outcome, MergeOutcome::Merged(_)));
    assert_eq!(store.server.stored(&user).unwrap().items().len(), 1);
}

#[tokio::test]
async fn unmerged_lines_stay_with_their_user_after_logout() {
    let store = Storefront::new();
    let user_a = UserId::new("user_a");
    let user_b = UserId::new("user_b");

    store.session.add_item(&line("air-max-90", 1, 10000)).await.unwrap();
    store.server.set_offline(true);
    assert!(store.session.login(user_a.clone()).await.is_err());
    store.server.set_offline(false);

    store.session.logout();
    assert!(store.session.cart().is_empty());
    assert!(store.local().load().unwrap().is_empty());
    assert_eq!(store.local().parked(&user_a).unwrap().len(), 1);

    // Someone else signing in on the device does not inherit them.
    store.session.login(user_b.clone()).await.unwrap();
    assert!(store
        .server
        .stored(&user_b)
        .map_or(true, |cart| cart.items().is_empty()));
    store.session.logout();

    store.session.add_item(&line("dunk-low", 1, 12000)).await.unwrap();
    let outcome = store.session.login(user_a.clone()).await.unwrap();
    assert!(matches!(outcome, MergeOutcome::Merged(ref r) if r.transferred == 2));

    let cart = store.server.stored(&user_a).unwrap();
    let mut sneakers: Vec<_> = cart.items().iter().map(|i| i.sneaker_id.clone()).collect();
    sneakers.sort();
    assert_eq!(
        sneakers,
        vec![SneakerId::new("air-max-90"), SneakerId::new("dunk-low")]
    );
    assert!(store.local().parked(&user_a).unwrap().is_empty());
}

#[tokio::test]
async fn anonymous_cart_works_without_server() {
    let store = Storefront::new();
    store.server.set_offline(true);

    store.session.add_item(&line("air-max-90", 2, 10000)).await.unwrap();
    assert_eq!(store.session.cart().total_price(), Money::brl(20000));
}

#[tokio::test]
async fn authenticated_failure_keeps_cart_and_is_retryable() {
    let store = Storefront::new();
    store.session.login(UserId::new("user_a")).await.unwrap();
    store.session.add_item(&line("air-max-90", 1, 10000)).await.unwrap();
    let before = store.session.cart();

    store.server.set_offline(true);
    let err = store
        .session
        .add_item(&line("dunk-low", 1, 12000))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(err.is_recoverable());
    assert_eq!(store.session.cart(), before);

    store.server.set_offline(false);
    let cart = store.session.add_item(&line("dunk-low", 1, 12000)).await.unwrap();
    assert_eq!(cart.items().len(), 2);
}

#[tokio::test]
async fn malformed_request_is_rejected_before_persistence() {
    let store = Storefront::new();
    store.session.login(UserId::new("user_a")).await.unwrap();

    let mut request = line("air-max-90", 1, 10000);
    request.sneaker_id = Some("  ".into());
    let err = store.session.add_item(&request).await.unwrap_err();
    assert!(matches!(err, CommerceError::MissingIdentity(_)));
    assert!(store
        .server
        .stored(&UserId::new("user_a"))
        .map_or(true, |cart| cart.is_empty()));
}

/// Two tabs of the same account mutate the server cart at once. There is no
/// version check on the cart document, so one write silently wins.
#[tokio::test]
async fn concurrent_tabs_can_lose_a_write() {
    let store = Storefront::new();
    let user = UserId::new("user_a");
    let tab = store.another_tab();
    store.session.login(user.clone()).await.unwrap();
    tab.login(user.clone()).await.unwrap();

    let (a, b) = (line("air-max-90", 1, 10000), line("dunk-low", 1, 12000));
    let (first, second) = tokio::join!(store.session.add_item(&a), tab.add_item(&b));
    assert_eq!(first.unwrap().items().len(), 1);
    assert_eq!(second.unwrap().items().len(), 1);

    let stored = store.server.stored(&user).unwrap();
    assert_eq!(stored.items().len(), 1);
    assert_eq!(store.server.fetch_cart(&user).await.unwrap(), stored);
}
