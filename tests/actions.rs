#![allow(non_snake_case)]

mod common;

use common::*;
use presale_sync::{
    ActionKind,
    ActionOutcome,
    Amount,
    PresalePhase,
    SyncTrigger,
    TransactionExecutor,
    ValidationError,
    amount::NATIVE_DECIMALS,
    phase::MARKETPLACE_URL,
    simulated::TxCall,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig { cases: 10, .. ProptestConfig::default() })]
    #[test]
    fn deposit__below_minimum__never_reaches_the_chain(
        units in 0u128..10u128.pow(NATIVE_DECIMALS),
        phase in prop::sample::select(PresalePhase::ALL.to_vec()),
        connected in any::<bool>(),
    ) {
        block_on_paused(_deposit__below_minimum__never_reaches_the_chain(units, phase, connected));
    }
}

async fn _deposit__below_minimum__never_reaches_the_chain(
    units: u128,
    phase: PresalePhase,
    connected: bool,
) {
    // given
    let ctx = TestContext::new();
    ctx.chain.set_phase(phase);
    let (client, _events) = if connected {
        ctx.start_connected().await
    } else {
        let (client, mut events) = ctx.start().await;
        wait_for_sync(&mut events, SyncTrigger::Startup).await;
        (client, events)
    };
    let amount = Amount::from_base_units(units).to_string();

    // when
    let result = client.deposit(&amount).await;

    // then
    assert!(result.is_err(), "{amount} in {phase:?}");
    assert!(ctx.chain.calls().is_empty());
    let status = client.status().unwrap();
    assert!(!status.success && !status.in_progress);
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn deposit__below_minimum__shows_minimum_message() {
    // given
    let ctx = TestContext::new();
    let (client, _events) = ctx.start_connected().await;

    // when
    let result = client.deposit("0.5").await;

    // then
    assert!(matches!(result, Err(ValidationError::BelowMinimum { .. })));
    assert_eq!(
        client.status(),
        Some(ActionOutcome::failed("Minimum 1 AVAX required."))
    );
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn deposit__no_wallet__asks_to_connect() {
    // given
    let ctx = TestContext::new();
    let (client, mut events) = ctx.start().await;
    wait_for_sync(&mut events, SyncTrigger::Startup).await;

    // when
    let result = client.deposit("3").await;

    // then
    assert_eq!(result, Err(ValidationError::WalletNotConnected));
    assert_eq!(
        client.status(),
        Some(ActionOutcome::failed("Connect your wallet first."))
    );
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn deposit__end_to_end__updates_totals_and_keeps_message_until_next_tick() {
    // given
    let ctx = TestContext::new();
    let (client, mut events) = ctx.start_connected().await;

    // when
    let outcome = client.deposit("2").await.unwrap();
    wait_for_sync(&mut events, SyncTrigger::Action).await;

    // then
    assert_eq!(outcome, ActionOutcome::succeeded("Deposited 2 AVAX"));
    let snapshot = client.snapshot();
    assert_eq!(snapshot.user_deposited, Amount::from_whole(2));
    assert_eq!(snapshot.contract_total_deposited, Amount::from_whole(2));
    assert_eq!(snapshot.wallet_balance, Amount::from_whole(98));
    assert_eq!(client.status(), Some(outcome));
    assert_eq!(
        ctx.chain.calls(),
        vec![TxCall::Deposit {
            address: ALICE.to_string(),
            amount: Amount::from_whole(2),
        }]
    );

    // when
    wait_for_sync(&mut events, SyncTrigger::Periodic).await;

    // then
    assert_eq!(client.status(), None);
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn action__triggers_exactly_one_resync_and_keeps_outcome() {
    // given
    let ctx = TestContext::new();
    let (client, mut events) = ctx.start_connected().await;
    let reads = ctx.chain.phase_reads();

    // when
    let outcome = client.deposit("1").await.unwrap();
    wait_for_sync(&mut events, SyncTrigger::Action).await;

    // then
    assert_eq!(ctx.chain.phase_reads(), reads + 1);
    assert!(events.try_recv().is_err());
    assert_eq!(client.status(), Some(outcome));
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn withdraw__transport_error__is_reported_with_operation_prefix() {
    // given
    let ctx = TestContext::new();
    ctx.chain.deposit_directly(ALICE, Amount::from_whole(4));
    let (client, mut events) = ctx.start_connected().await;
    ctx.chain.fail_transactions(Some("user rejected the request"));

    // when
    let outcome = client.withdraw_all().await.unwrap();
    wait_for_sync(&mut events, SyncTrigger::Action).await;

    // then
    let expected = ActionOutcome::failed("Withdraw failed: user rejected the request");
    assert_eq!(outcome, expected);
    assert_eq!(client.status(), Some(expected));
    assert_eq!(client.snapshot().user_deposited, Amount::from_whole(4));
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn deposit__reverted_by_contract__keeps_receipt_message() {
    // given
    let ctx = TestContext::new();
    let (client, mut events) = ctx.start_connected().await;

    // when
    let outcome = client.deposit("500").await.unwrap();
    wait_for_sync(&mut events, SyncTrigger::Action).await;

    // then
    assert_eq!(outcome, ActionOutcome::failed("Insufficient AVAX balance"));
    assert_eq!(client.snapshot().user_deposited, Amount::ZERO);
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn claim__after_airdrop_completed__is_rejected_locally() {
    // given
    let ctx = TestContext::new();
    ctx.chain.deposit_directly(ALICE, Amount::from_whole(1));
    ctx.chain.set_phase(PresalePhase::Airdrop);
    ctx.chain.airdrop_all().await.unwrap();
    let (client, _events) = ctx.start_connected().await;
    let calls = ctx.chain.calls().len();

    // when
    let claim = client.claim_tokens().await;
    let airdrop = client.airdrop_all().await;

    // then
    assert!(client.snapshot().airdrop_completed);
    assert_eq!(claim, Err(ValidationError::AirdropCompleted));
    assert_eq!(airdrop, Err(ValidationError::AirdropCompleted));
    assert_eq!(ctx.chain.calls().len(), calls);
    assert!(client.available_actions().is_empty());
    assert_eq!(
        client.status(),
        Some(ActionOutcome::failed("All tokens have been airdropped!"))
    );
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn claim__credits_tokens_once() {
    // given
    let ctx = TestContext::new();
    ctx.chain.deposit_directly(ALICE, Amount::from_whole(2));
    ctx.chain.set_phase(PresalePhase::Airdrop);
    let (client, mut events) = ctx.start_connected().await;

    // when
    let outcome = client.claim_tokens().await.unwrap();
    wait_for_sync(&mut events, SyncTrigger::Action).await;

    // then
    assert!(outcome.success);
    let snapshot = client.snapshot();
    assert!(snapshot.user_claimed);
    assert_eq!(snapshot.user_token_balance, Amount::from_whole(2_000));
    assert_eq!(client.available_actions(), vec![ActionKind::AirdropAll]);

    // when
    let again = client.claim_tokens().await;

    // then
    assert_eq!(again, Err(ValidationError::AlreadyClaimed));
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn seed_liquidity__phase_advance_is_observed_not_assumed() {
    // given
    let ctx = TestContext::new();
    ctx.chain.set_phase(PresalePhase::SeedLiquidity);
    let (client, mut events) = ctx.start_connected().await;

    // when
    let outcome = client.seed_liquidity().await.unwrap();

    // then
    assert!(outcome.success);
    assert_eq!(client.snapshot().phase, PresalePhase::SeedLiquidity);

    // when
    wait_for_sync(&mut events, SyncTrigger::Action).await;

    // then
    assert_eq!(client.snapshot().phase, PresalePhase::Airdrop);
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn public_sale__offers_no_actions() {
    // given
    let ctx = TestContext::new();
    ctx.chain.set_phase(PresalePhase::PublicSale);
    let (client, _events) = ctx.start_connected().await;

    // when
    let deposit = client.deposit("5").await;
    let refresh = client.refresh();

    // then
    assert!(client.available_actions().is_empty());
    assert_eq!(client.marketplace_url(), Some(MARKETPLACE_URL));
    assert!(matches!(deposit, Err(ValidationError::NotAvailable { .. })));
    assert!(matches!(refresh, Err(ValidationError::NotAvailable { .. })));
    assert!(ctx.chain.calls().is_empty());
    client.shutdown().await;
}
