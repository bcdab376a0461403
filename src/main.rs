use clap::Parser;
use color_eyre::eyre::{
    Result,
    bail,
    eyre,
};
use presale_sync::{
    ActionOutcome,
    Amount,
    PresaleClient,
    PresalePhase,
    SyncConfig,
    SyncEvent,
    ValidationError,
    logging,
    simulated::SimulatedPresale,
};
use session_store::SessionFileStore;
use std::{
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio::sync::broadcast;

const DEMO_ADDRESS: &str = "0x5eed00000000000000000000000000000000b40b";

type SimClient = PresaleClient<SimulatedPresale, SimulatedPresale, SessionFileStore>;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Runs a scripted presale session against an in-memory contract",
    long_about = None
)]
struct Args {
    /// Where the remembered wallet list is kept.
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Write logs to a daily rolling file in this directory instead of stdout.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    #[arg(long, default_value = "MetaMask")]
    provider: String,

    #[arg(long, default_value = "2")]
    deposit: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let _guard = match &args.log_dir {
        Some(dir) => Some(logging::init_file_tracing(dir)),
        None => {
            logging::init_tracing();
            None
        }
    };

    let mut config = SyncConfig::from_env()?;
    if let Some(path) = &args.session_file {
        config.session_path = path.clone();
    }
    if args.poll_ms == 0 {
        bail!("--poll-ms must be positive");
    }
    config.poll_interval = Duration::from_millis(args.poll_ms);

    let chain = Arc::new(SimulatedPresale::new());
    chain.register_provider(&args.provider, DEMO_ADDRESS);
    chain.fund(DEMO_ADDRESS, Amount::from_whole(25));
    chain.set_countdown(3_600);

    println!("session file: {}", config.session_path.display());

    // first run: connect interactively unless the last session comes back
    let client = start(&config, &chain).await?;
    let mut events = client.subscribe();
    if client.wallet().is_none() {
        match client.connect(&args.provider).await? {
            Some(session) => println!("connected {} ({})", session.label, session.short_address()),
            None => bail!("wallet connection was dismissed"),
        }
    }
    next_sync(&mut events).await?;
    print_snapshot("connected", &client);

    report("deposit", client.deposit(&args.deposit).await);
    next_sync(&mut events).await?;
    print_snapshot("after deposit", &client);
    client.shutdown().await;

    // second run against the same session file
    let client = start(&config, &chain).await?;
    let mut events = client.subscribe();
    next_sync(&mut events).await?;
    print_snapshot("restarted", &client);

    chain.set_phase(PresalePhase::SeedLiquidity);
    next_sync(&mut events).await?;
    report("seed liquidity", client.seed_liquidity().await);
    next_sync(&mut events).await?;
    report("claim", client.claim_tokens().await);
    next_sync(&mut events).await?;
    report("airdrop all", client.airdrop_all().await);
    next_sync(&mut events).await?;
    print_snapshot("finished", &client);

    client.disconnect().await;
    next_sync(&mut events).await?;
    print_snapshot("disconnected", &client);
    client.shutdown().await;
    Ok(())
}

async fn start(config: &SyncConfig, chain: &Arc<SimulatedPresale>) -> Result<SimClient> {
    let store = SessionFileStore::new(&config.session_path)
        .map_err(|e| eyre!("opening session file: {e:#}"))?;
    let client = PresaleClient::start(
        config.clone(),
        Arc::clone(chain),
        Arc::clone(chain),
        Arc::clone(chain),
        store,
    )
    .await;
    match client.reconnect_attempt() {
        Some(attempt) => match &attempt.session {
            Some(session) => println!("silently reconnected {}", session.label),
            None => println!("{} declined a silent reconnect", attempt.label),
        },
        None => println!("no remembered wallet"),
    }
    Ok(client)
}

async fn next_sync(events: &mut broadcast::Receiver<SyncEvent>) -> Result<()> {
    loop {
        match events.recv().await {
            Ok(SyncEvent::Synced { .. }) => return Ok(()),
            Ok(SyncEvent::Failed { error, .. }) => println!("sync failed: {error}"),
            Ok(SyncEvent::Discarded { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => bail!("synchronizer stopped"),
        }
    }
}

fn report(action: &str, result: Result<ActionOutcome, ValidationError>) {
    match result {
        Ok(outcome) if outcome.success => println!("{action}: {}", outcome.message),
        Ok(outcome) => println!("{action} rejected: {}", outcome.message),
        Err(err) => println!("{action} not sent: {err}"),
    }
}

fn print_snapshot(title: &str, client: &SimClient) {
    let snapshot = client.snapshot();
    println!("-- {title}: {} --", client.phase_label());
    println!("  wallet balance   {} AVAX", client.wallet_balance_display());
    println!("  total deposited  {} AVAX", snapshot.contract_total_deposited);
    println!("  your deposit     {} AVAX", snapshot.user_deposited);
    println!("  your tokens      {} BRO", snapshot.user_token_balance);
    println!("  claimed          {}", snapshot.user_claimed);
    if let Some(status) = client.status() {
        println!("  status           {}", status.message);
    }
    let actions: Vec<String> = client
        .available_actions()
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("  actions          {}", actions.join(", "));
}
