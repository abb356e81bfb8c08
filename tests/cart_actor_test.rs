use rust_decimal::Decimal;
use std::sync::Arc;
use storefront_sync::cart_actor::{CartContext, CartError};
use storefront_sync::clients::actor_client::ActorClient;
use storefront_sync::gateway::mock::FakeBackend;
use storefront_sync::gateway::AuthGateway;
use storefront_sync::model::{CartMode, Credentials, Product, ProductId, User};
use storefront_sync::storage::{DurableStore, MemoryStore, ACCESS_TOKEN_KEY, CART_KEY};

/// Real Cart actor against the in-memory backend, with no session actor in the loop.
/// The test drives the mode switches a session change would normally cause.
#[tokio::test]
async fn test_cart_actor_follows_mode_switches() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(FakeBackend::new(store.clone()));
    backend.add_product(Product::new(1, "Round Frame", Decimal::from(500)));
    backend.add_product(Product::new(9, "Aviator", Decimal::from(1200)));
    backend.add_user(User::new(1, "alice", "alice@example.com"), "secret");
    backend.seed_line("alice", ProductId(9), 2);

    let (cart_actor, cart_client) = storefront_sync::cart_actor::new();
    let actor_handle = tokio::spawn(cart_actor.run(CartContext::new(store.clone(), backend.clone())));

    // Nothing is reachable until a mode is chosen.
    let err = cart_client
        .add_item(Product::new(1, "Round Frame", Decimal::from(500)), 1, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Detached));

    // Guest: lands in durable storage only.
    cart_client.switch_mode(CartMode::Guest).await.unwrap();
    let state = cart_client
        .add_item(Product::new(1, "Round Frame", Decimal::from(500)), 1, None, None)
        .await
        .unwrap();
    assert_eq!(state.item_count(), 1);
    assert!(store.snapshot(CART_KEY).is_some());
    assert!(backend.calls().is_empty());

    // Remote: the server cart replaces the guest copy in memory.
    let auth = backend
        .login(&Credentials {
            username: "alice".into(),
            password: "secret".into(),
        })
        .await
        .unwrap();
    store.set(ACCESS_TOKEN_KEY, &auth.tokens.access).await.unwrap();
    backend.clear_calls();

    let state = cart_client.switch_mode(CartMode::Remote).await.unwrap();
    assert_eq!(state.mode, CartMode::Remote);
    assert!(state.is_in_cart(ProductId(9)));
    assert!(!state.is_in_cart(ProductId(1)));
    assert_eq!(state.total(), Decimal::from(2400));
    assert_eq!(backend.calls(), vec!["GET cart".to_string()]);

    let line = cart_client.get_cart_item(ProductId(9)).unwrap();
    let state = cart_client.update_item(line.id.clone(), 3).await.unwrap();
    assert_eq!(state.item_count(), 3);
    assert_eq!(backend.server_cart("alice")[0].quantity, 3);

    // Back to guest: the durable copy was never touched.
    let state = cart_client.switch_mode(CartMode::Guest).await.unwrap();
    assert!(state.is_in_cart(ProductId(1)));
    assert!(!state.is_in_cart(ProductId(9)));

    drop(cart_client);
    actor_handle.await.unwrap();
}

/// A second actor over the same store picks up the guest cart the first one wrote.
#[tokio::test]
async fn test_guest_cart_survives_actor_restart() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(FakeBackend::new(store.clone()));

    let (cart_actor, cart_client) = storefront_sync::cart_actor::new();
    let handle = tokio::spawn(cart_actor.run(CartContext::new(store.clone(), backend.clone())));
    cart_client.switch_mode(CartMode::Guest).await.unwrap();
    cart_client
        .add_item(
            Product::new(9, "Aviator", Decimal::from(1200)),
            2,
            Some("M".into()),
            None,
        )
        .await
        .unwrap();
    drop(cart_client);
    handle.await.unwrap();

    let (cart_actor, cart_client) = storefront_sync::cart_actor::new();
    let handle = tokio::spawn(cart_actor.run(CartContext::new(store, backend)));
    let state = cart_client.switch_mode(CartMode::Guest).await.unwrap();
    assert_eq!(state.item_count(), 2);
    let line = cart_client.get_cart_item(ProductId(9)).unwrap();
    assert_eq!(line.selected_size.as_deref(), Some("M"));
    assert!(!cart_client.state().loading);

    drop(cart_client);
    handle.await.unwrap();
}
