#![allow(non_snake_case)]

mod common;

use common::*;
use presale_sync::{
    Amount,
    KeyValueStore,
    PresaleClient,
    PresalePhase,
    Snapshot,
    SyncTrigger,
    config::SESSION_KEY,
};
use session_store::SessionFileStore;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn restart__remembered_provider__reconnects_without_prompt() {
    // given
    let ctx = TestContext::new();
    let (first, _events) = ctx.start_connected().await;
    first.shutdown().await;

    // when
    let (second, mut events) = ctx.start().await;
    wait_for_sync(&mut events, SyncTrigger::Startup).await;

    // then
    let attempt = second.reconnect_attempt().unwrap();
    assert_eq!(attempt.label, PROVIDER);
    assert_eq!(second.wallet().unwrap().address, ALICE);
    assert_eq!(second.snapshot().wallet_balance, Amount::from_whole(100));
    second.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn restart__provider_declines__starts_disconnected_without_error() {
    // given
    let ctx = TestContext::new();
    let (first, _events) = ctx.start_connected().await;
    first.shutdown().await;
    ctx.chain.decline_silent(true);

    // when
    let (second, mut events) = ctx.start().await;
    wait_for_sync(&mut events, SyncTrigger::Startup).await;

    // then
    let attempt = second.reconnect_attempt().unwrap();
    assert_eq!(attempt.label, PROVIDER);
    assert_eq!(attempt.session, None);
    assert_eq!(second.wallet(), None);
    assert_eq!(
        second.snapshot(),
        Snapshot::disconnected(PresalePhase::Presale, 600, false)
    );
    assert_eq!(second.status(), None);
    second.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn restart__after_disconnect__still_remembers_last_provider() {
    // given
    let ctx = TestContext::new();
    let (first, mut events) = ctx.start_connected().await;
    first.disconnect().await;
    wait_for_sync(&mut events, SyncTrigger::WalletChanged).await;
    first.shutdown().await;

    // when
    let (second, _events) = ctx.start().await;

    // then
    assert_eq!(second.reconnect_attempt().unwrap().label, PROVIDER);
    second.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn start__nothing_remembered__skips_reconnect() {
    // given
    let ctx = TestContext::new();

    // when
    let (client, _events) = ctx.start().await;

    // then
    assert!(client.reconnect_attempt().is_none());
    assert!(client.wallet().is_none());
    client.shutdown().await;
}

#[tokio::test]
async fn connect__file_store__writes_the_label_list() {
    // given
    let dir = tempdir::TempDir::new("presale-session").unwrap();
    let path = dir.path().join("session.json");
    let ctx = TestContext::new();
    let client = PresaleClient::start(
        ctx.config.clone(),
        Arc::clone(&ctx.chain),
        Arc::clone(&ctx.chain),
        Arc::clone(&ctx.chain),
        SessionFileStore::new(&path).unwrap(),
    )
    .await;

    // when
    client.connect(PROVIDER).await.unwrap();

    // then
    let stored = SessionFileStore::new(&path).unwrap();
    let raw = KeyValueStore::get(&stored, SESSION_KEY).await.unwrap();
    assert_eq!(raw.as_deref(), Some(r#"["ProviderX"]"#));
    client.shutdown().await;
}
