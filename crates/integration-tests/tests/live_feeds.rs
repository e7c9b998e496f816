//! Integration tests for the live item and member views.

use splitlist_core::Price;
use splitlist_engine::models::ListRules;
use splitlist_engine::services::NewItem;
use splitlist_integration_tests::{TestContext, uid};

fn item(name: &str) -> NewItem {
    NewItem {
        name: name.to_owned(),
        quantity: None,
        estimated_price: None,
    }
}

// =============================================================================
// Item Feed
// =============================================================================

#[tokio::test]
async fn test_added_item_appears_in_next_snapshot() {
    let ctx = TestContext::new();
    ctx.sign_in("a", "Ann").await;
    let list_id = ctx
        .lists
        .create_list("Groceries", ListRules::default())
        .await
        .expect("create list");

    let mut feed = ctx.items.watch_items(&list_id).await.expect("subscribe");
    let initial = feed.next().await.expect("snapshot").expect("decode");
    assert!(initial.is_empty());

    ctx.items
        .add_item(
            &list_id,
            NewItem {
                name: "Milk".to_owned(),
                quantity: Some(2),
                estimated_price: Some(Price::parse_lenient("3.50")),
            },
        )
        .await
        .expect("add item");

    let snapshot = feed.next().await.expect("snapshot").expect("decode");
    assert_eq!(snapshot.len(), 1);
    let milk = snapshot.first().expect("one item");
    assert_eq!(milk.name, "Milk");
    assert_eq!(milk.quantity, 2);
    assert!(!milk.is_bought);
    assert!(milk.assigned_to.is_none());
}

#[tokio::test]
async fn test_items_ordered_unbought_then_alphabetical() {
    let ctx = TestContext::new();
    ctx.sign_in("a", "Ann").await;
    let list_id = ctx
        .lists
        .create_list("Groceries", ListRules::default())
        .await
        .expect("create list");

    let mut ids = Vec::new();
    for name in ["zucchini", "Apples", "milk", "Bread"] {
        ids.push(
            ctx.items
                .add_item(&list_id, item(name))
                .await
                .expect("add item"),
        );
    }
    // Buy "zucchini" and "Apples".
    for id in ids.iter().take(2) {
        ctx.items.set_bought(id, true).await.expect("set bought");
    }

    let mut feed = ctx.items.watch_items(&list_id).await.expect("subscribe");
    let snapshot = feed.next().await.expect("snapshot").expect("decode");
    let names: Vec<&str> = snapshot.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Bread", "milk", "Apples", "zucchini"]);
}

#[tokio::test]
async fn test_dropping_feed_detaches_listener() {
    let ctx = TestContext::new();
    ctx.sign_in("a", "Ann").await;
    let list_id = ctx
        .lists
        .create_list("Groceries", ListRules::default())
        .await
        .expect("create list");

    let feed = ctx.items.watch_items(&list_id).await.expect("subscribe");
    assert_eq!(ctx.store.listener_count(), 1);
    drop(feed);
    assert_eq!(ctx.store.listener_count(), 0);
}

#[tokio::test]
async fn test_feeds_are_independent() {
    let ctx = TestContext::new();
    ctx.sign_in("a", "Ann").await;
    let list_id = ctx
        .lists
        .create_list("Groceries", ListRules::default())
        .await
        .expect("create list");

    let mut first = ctx.items.watch_items(&list_id).await.expect("subscribe");
    let mut second = ctx.items.watch_items(&list_id).await.expect("subscribe");
    first.next().await.expect("snapshot").expect("decode");
    second.next().await.expect("snapshot").expect("decode");

    drop(first);
    ctx.items
        .add_item(&list_id, item("Milk"))
        .await
        .expect("add item");

    // The surviving feed still gets the change.
    let snapshot = second.next().await.expect("snapshot").expect("decode");
    assert_eq!(snapshot.len(), 1);
}

// =============================================================================
// Member Feed
// =============================================================================

#[tokio::test]
async fn test_members_resolve_owner_and_joiners() {
    let ctx = TestContext::new();
    ctx.sign_in("a", "Ann").await;
    let list_id = ctx
        .lists
        .create_list("Groceries", ListRules::default())
        .await
        .expect("create list");
    let token = ctx
        .lists
        .get_list(&list_id)
        .await
        .expect("get list")
        .invite_token;

    let mut feed = ctx.items.watch_members(&list_id).await.expect("subscribe");
    let initial = feed.next().await.expect("snapshot").expect("decode");
    assert_eq!(initial.len(), 1);
    assert_eq!(initial.first().expect("owner").uid, uid("a"));

    let member = ctx.fork();
    member.sign_in("b", "Bea").await;
    member
        .lists
        .join_by_token(&list_id, token.as_str())
        .await
        .expect("join");

    let snapshot = feed.next().await.expect("snapshot").expect("decode");
    let names: Vec<&str> = snapshot.iter().map(|u| u.display_name.as_str()).collect();
    assert_eq!(names, vec!["Ann", "Bea"]);
}

#[tokio::test]
async fn test_member_without_profile_is_omitted() {
    let ctx = TestContext::new();
    ctx.sign_in("a", "Ann").await;
    let list_id = ctx
        .lists
        .create_list("Groceries", ListRules::default())
        .await
        .expect("create list");
    let token = ctx
        .lists
        .get_list(&list_id)
        .await
        .expect("get list")
        .invite_token;

    // "b" joins without ever mirroring a profile.
    let member = ctx.fork();
    member.sign_in_unmirrored("b", "Bea");
    member
        .lists
        .join_by_token(&list_id, token.as_str())
        .await
        .expect("join");

    let mut feed = ctx.items.watch_members(&list_id).await.expect("subscribe");
    let snapshot = feed.next().await.expect("snapshot").expect("decode");
    assert_eq!(snapshot.len(), 1, "unresolvable member must be omitted");
    assert_eq!(snapshot.first().expect("owner").uid, uid("a"));
}

#[tokio::test]
async fn test_deleted_list_yields_empty_member_snapshot() {
    let ctx = TestContext::new();
    ctx.sign_in("a", "Ann").await;
    let list_id = ctx
        .lists
        .create_list("Groceries", ListRules::default())
        .await
        .expect("create list");

    let mut feed = ctx.items.watch_members(&list_id).await.expect("subscribe");
    feed.next().await.expect("snapshot").expect("decode");

    ctx.lists.delete_list(&list_id).await.expect("delete");
    let snapshot = feed.next().await.expect("snapshot").expect("decode");
    assert!(snapshot.is_empty());
}
