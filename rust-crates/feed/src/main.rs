use anyhow::{
    Context,
    anyhow,
};
use clap::{
    ArgGroup,
    Parser,
};
use deployments::{
    DeploymentEnv,
    DeploymentStore,
};
use ethers::types::Address;
use feed::app::{
    App,
    RunState,
    init_tracing,
    ws_event_source::WsEventSource,
};
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["local", "dev", "test"])
            .required(true)
    )
)]
struct Args {
    #[arg(short, long)]
    contract_address: Option<String>,

    #[arg(long)]
    ws_url: Option<String>,

    #[arg(short, long, default_value = "false")]
    tracing: bool,

    #[arg(long)]
    local: bool,

    #[arg(long)]
    dev: bool,

    #[arg(long)]
    test: bool,
}

async fn handle_interupt() {
    let res = tokio::signal::ctrl_c().await;
    match res {
        Ok(_) => {
            tracing::info!("Received interrupt, exiting");
        }
        Err(_) => {
            tracing::warn!("Received interrupt error, exiting anyway");
        }
    }
}

fn parse_contract_address(raw: &str) -> anyhow::Result<Address> {
    Address::from_str(raw.trim())
        .map_err(|e| anyhow!("Failed to parse contract address '{raw}': {e:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.tracing {
        init_tracing();
    }
    let (deployment_env, network_label) = if args.local {
        (DeploymentEnv::Local, "local")
    } else if args.dev {
        (DeploymentEnv::Dev, "dev")
    } else {
        (DeploymentEnv::Test, "test")
    };
    let store =
        DeploymentStore::new(deployment_env).context("opening deployments store")?;
    let record = store.load().context("loading deployment")?;

    let contract_address = match (&args.contract_address, &record) {
        (Some(raw), _) => parse_contract_address(raw)?,
        (None, Some(record)) => parse_contract_address(&record.contract_address)
            .context("parsing contract address from deployment record")?,
        (None, None) => {
            return Err(anyhow!(
                "No deployment record found for {network_label}; provide --contract-address"
            ));
        }
    };
    let ws_url = args
        .ws_url
        .or_else(|| record.as_ref().map(|record| record.ws_url.clone()))
        .ok_or_else(|| {
            anyhow!("No deployment record found for {network_label}; provide --ws-url")
        })?;

    let events = WsEventSource::connect(&ws_url, contract_address).await?;
    let mut app = App::new(events);

    tracing::info!("Starting live feed for contract {contract_address:?}");
    loop {
        let interrupt = handle_interupt();
        match app.run(interrupt).await {
            RunState::Continue => continue,
            RunState::Exit => {
                if let Some(error) = &app.status().error {
                    tracing::warn!("live feed stopped: {error}");
                }
                tracing::info!("Exiting live feed");
                return Ok(());
            }
        }
    }
}
