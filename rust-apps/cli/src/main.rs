use anyhow::{
    Context,
    Result,
    anyhow,
};
use clap::{
    ArgGroup,
    Parser,
    Subcommand,
};
use deployments::{
    DeploymentEnv,
    DeploymentRecord,
    DeploymentStore,
};
use ethers::{
    middleware::SignerMiddleware,
    providers::{
        Http,
        Middleware,
        Provider,
    },
    signers::{
        LocalWallet,
        Signer,
    },
    types::Address,
};
use feed::app::{
    App,
    RunState,
    init_tracing,
    ws_event_source::WsEventSource,
};
use game_wallet::{
    funding::{
        fund_game_wallet,
        recommended_funding_amount,
    },
    identity::{
        DEFAULT_IDENTITY_URL,
        IdentityClient,
        IdentityProfile,
    },
    keystore::GameWalletKeystore,
    store::{
        SledWalletStore,
        default_store_dir,
    },
    transactions::roll_the_dice,
};
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(
    name = "lucky6",
    about = "Watch the dice table and manage the local game wallet",
    version,
    group(
        ArgGroup::new("network")
            .args(["local", "dev", "test"])
            .required(true)
    )
)]
struct Args {
    /// Target a local node
    #[arg(long)]
    local: bool,

    /// Target the devnet deployment
    #[arg(long)]
    dev: bool,

    /// Target the testnet deployment
    #[arg(long)]
    test: bool,

    /// Override the dice contract address from the deployment record
    #[arg(short, long)]
    contract_address: Option<String>,

    /// Override the HTTP RPC url from the deployment record
    #[arg(long)]
    rpc_url: Option<String>,

    /// Override the websocket url from the deployment record
    #[arg(long)]
    ws_url: Option<String>,

    /// Override the chain id from the deployment record
    #[arg(long)]
    chain_id: Option<u64>,

    /// Override the game wallet store directory (defaults to ~/.lucky6/game-wallets)
    #[arg(long)]
    wallet_dir: Option<String>,

    /// Override the identity service url
    #[arg(long, default_value = DEFAULT_IDENTITY_URL)]
    identity_url: String,

    #[arg(short, long, default_value = "false")]
    tracing: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream live roll and winner events from the dice contract
    Watch,
    /// Show (creating if necessary) the game wallet for an owner address
    Wallet {
        #[arg(long)]
        owner: String,
    },
    /// Fund the owner's game wallet, tipping the identity wallet its share
    Fund {
        #[arg(long)]
        owner: String,

        /// Amount in whole coins (defaults to 20% of the funder balance)
        #[arg(long)]
        amount: Option<String>,
    },
    /// Roll the dice with the owner's game wallet
    Roll {
        #[arg(long)]
        owner: String,
    },
    /// Look up the owner's cross-game username
    Whoami {
        #[arg(long)]
        owner: String,
    },
    /// Record a deployment so the other commands can resolve the network
    Record {
        #[arg(long)]
        contract_address: String,

        #[arg(long)]
        chain_id: u64,

        #[arg(long)]
        rpc_url: String,

        #[arg(long)]
        ws_url: String,
    },
}

struct Network {
    env: DeploymentEnv,
    label: &'static str,
    record: Option<DeploymentRecord>,
}

impl Network {
    fn resolve(args: &Args) -> Result<Self> {
        let (env, label) = if args.local {
            (DeploymentEnv::Local, "local")
        } else if args.dev {
            (DeploymentEnv::Dev, "dev")
        } else {
            (DeploymentEnv::Test, "test")
        };
        let store = DeploymentStore::new(env).context("opening deployments store")?;
        let record = store.load().context("loading deployment")?;
        Ok(Self { env, label, record })
    }

    fn contract_address(&self, args: &Args) -> Result<Address> {
        match (&args.contract_address, &self.record) {
            (Some(raw), _) => parse_address(raw),
            (None, Some(record)) => parse_address(&record.contract_address)
                .context("parsing contract address from deployment record"),
            (None, None) => Err(self.missing("--contract-address")),
        }
    }

    fn rpc_url(&self, args: &Args) -> Result<String> {
        args.rpc_url
            .clone()
            .or_else(|| self.record.as_ref().map(|record| record.rpc_url.clone()))
            .ok_or_else(|| self.missing("--rpc-url"))
    }

    fn ws_url(&self, args: &Args) -> Result<String> {
        args.ws_url
            .clone()
            .or_else(|| self.record.as_ref().map(|record| record.ws_url.clone()))
            .ok_or_else(|| self.missing("--ws-url"))
    }

    fn chain_id(&self, args: &Args) -> Result<u64> {
        args.chain_id
            .or_else(|| self.record.as_ref().map(|record| record.chain_id))
            .ok_or_else(|| self.missing("--chain-id"))
    }

    fn missing(&self, flag: &str) -> anyhow::Error {
        anyhow!(
            "No deployment record found for {}; provide {flag}",
            self.label
        )
    }
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

fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw.trim())
        .map_err(|e| anyhow!("Failed to parse address '{raw}': {e:?}"))
}

fn open_keystore(args: &Args) -> Result<GameWalletKeystore<SledWalletStore>> {
    let dir = match &args.wallet_dir {
        Some(dir) => dir.into(),
        None => default_store_dir()?,
    };
    let store = SledWalletStore::open(&dir)
        .with_context(|| format!("opening wallet store at {}", dir.display()))?;
    Ok(GameWalletKeystore::new(store))
}

async fn lookup_profile(args: &Args, owner: Address) -> Result<Option<IdentityProfile>> {
    let client = IdentityClient::new(&args.identity_url);
    let response = client.check_wallet(owner).await?;
    Ok(response.into_profile())
}

async fn watch(args: &Args, network: &Network) -> Result<()> {
    let contract_address = network.contract_address(args)?;
    let ws_url = network.ws_url(args)?;

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

async fn fund(args: &Args, network: &Network, owner: &str, amount: &Option<String>) -> Result<()> {
    let owner = parse_address(owner)?;
    let game_wallet = open_keystore(args)?.initialize(owner)?;
    let profile = lookup_profile(args, owner).await?.ok_or_else(|| {
        anyhow!(
            "owner has no registered username; claim one at {}",
            args.identity_url
        )
    })?;
    let identity_wallet = parse_address(&profile.wallet_address)
        .context("parsing identity wallet address from identity service")?;

    let raw_key = rpassword::prompt_password("Funder private key: ")
        .context("reading funder private key")?;
    let funder: LocalWallet = raw_key
        .trim()
        .trim_start_matches("0x")
        .parse()
        .map_err(|_| anyhow!("funder private key is not a valid private key"))?;
    let connected = funder.address();

    let rpc_url = network.rpc_url(args)?;
    let chain_id = network.chain_id(args)?;
    let provider = Provider::<Http>::try_from(rpc_url.as_str()).context("invalid RPC url")?;
    let client = SignerMiddleware::new(provider, funder.with_chain_id(chain_id));

    let amount = match amount {
        Some(amount) => amount.clone(),
        None => {
            let balance = client
                .get_balance(connected, None)
                .await
                .context("fetching funder balance")?;
            recommended_funding_amount(balance)
        }
    };

    fund_game_wallet(
        &client,
        connected,
        game_wallet.address(),
        identity_wallet,
        &amount,
    )
    .await?;
    println!(
        "Sent {amount} coins split between game wallet {:?} and identity wallet {identity_wallet:?}",
        game_wallet.address()
    );
    Ok(())
}

async fn roll(args: &Args, network: &Network, owner: &str) -> Result<()> {
    let owner = parse_address(owner)?;
    let game_wallet = open_keystore(args)?.initialize(owner)?;
    let rpc_url = network.rpc_url(args)?;
    let chain_id = network.chain_id(args)?;
    let contract_address = network.contract_address(args)?;

    let tx_hash = roll_the_dice(&rpc_url, chain_id, &game_wallet, contract_address).await?;
    println!("Dice roll submitted: {tx_hash:?}");
    Ok(())
}

async fn whoami(args: &Args, owner: &str) -> Result<()> {
    let owner = parse_address(owner)?;
    let client = IdentityClient::new(&args.identity_url);
    match client.check_wallet(owner).await?.into_profile() {
        Some(profile) => {
            println!("Username: {}", profile.username);
            println!("Identity wallet: {}", profile.wallet_address);
        }
        None => {
            println!(
                "No username registered; claim one at {}",
                client.register_url()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.tracing {
        init_tracing();
    }
    deployments::ensure_structure().context("initializing deployment directories")?;
    let network = Network::resolve(&args)?;

    match &args.command {
        Command::Watch => watch(&args, &network).await,
        Command::Wallet { owner } => {
            let owner = parse_address(owner)?;
            let wallet = open_keystore(&args)?.initialize(owner)?;
            println!("Game wallet for {owner:?}: {:?}", wallet.address());
            Ok(())
        }
        Command::Fund { owner, amount } => fund(&args, &network, owner, amount).await,
        Command::Roll { owner } => roll(&args, &network, owner).await,
        Command::Whoami { owner } => whoami(&args, owner).await,
        Command::Record {
            contract_address,
            chain_id,
            rpc_url,
            ws_url,
        } => {
            parse_address(contract_address)?;
            deployments::record_deployment(
                network.env,
                contract_address,
                *chain_id,
                rpc_url,
                ws_url,
            )
            .context("recording deployment")?;
            println!("Recorded {} deployment of {contract_address}", network.label);
            Ok(())
        }
    }
}
