use crate::{
    app::event_source::EventSource,
    events::{
        FeedEvent,
        RollEvent,
        WinnerEvent,
    },
};
use anyhow::{
    Context,
    Result,
    anyhow,
};
use ethers::{
    abi::RawLog,
    contract::EthEvent,
    providers::{
        Middleware,
        Provider,
        Ws,
    },
    types::{
        Address,
        Filter,
        Log,
        TransactionReceipt,
        TxHash,
        U256,
    },
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
};


const EVENT_CHANNEL_CAPACITY: usize = 32;

/// `Roll(address indexed player, uint256 amount, uint256 roll)`
#[derive(Clone, Debug, EthEvent)]
#[ethevent(name = "Roll")]
pub struct RollLog {
    #[ethevent(indexed)]
    pub player: Address,
    pub amount: U256,
    pub roll: U256,
}

/// `Winner(address winner, uint256 amount)`
#[derive(Clone, Debug, EthEvent)]
#[ethevent(name = "Winner")]
pub struct WinnerLog {
    pub winner: Address,
    pub amount: U256,
}

/// Receipt and block-timestamp lookups used to enrich a raw log.
pub trait ChainLookup {
    fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>>>;

    fn block_timestamp(
        &self,
        block_number: u64,
    ) -> impl Future<Output = Result<Option<U256>>>;
}

impl ChainLookup for Provider<Ws> {
    async fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TransactionReceipt>> {
        self.get_transaction_receipt(tx_hash)
            .await
            .context("transaction receipt lookup failed")
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<Option<U256>> {
        let block = self
            .get_block(block_number)
            .await
            .context("block lookup failed")?;
        Ok(block.map(|block| block.timestamp))
    }
}

/// Production event source: one websocket subscription per event type against
/// the Lucky6 contract. Each subscription is driven by its own task and
/// processes its logs sequentially; the two streams have no relative ordering
/// guarantee. Dropping the source aborts both tasks. There is no automatic
/// resubscription when the transport drops.
pub struct WsEventSource {
    events: mpsc::Receiver<FeedEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl WsEventSource {
    pub async fn connect(ws_url: &str, contract_address: Address) -> Result<Self> {
        let provider = Arc::new(
            Provider::<Ws>::connect(ws_url)
                .await
                .with_context(|| format!("failed to connect to {ws_url}"))?,
        );
        provider
            .get_block_number()
            .await
            .context("liveness probe against the websocket endpoint failed")?;
        tracing::info!("watching contract {contract_address:?} via {ws_url}");

        let (sender, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let rolls = tokio::spawn(watch_roll_logs(
            provider.clone(),
            contract_address,
            sender.clone(),
        ));
        let winners = tokio::spawn(watch_winner_logs(provider, contract_address, sender));

        Ok(Self {
            events,
            tasks: vec![rolls, winners],
        })
    }
}

impl EventSource for WsEventSource {
    async fn next_event(&mut self) -> Result<FeedEvent> {
        self.events
            .recv()
            .await
            .ok_or_else(|| anyhow!("event subscriptions ended"))
    }
}

impl Drop for WsEventSource {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn watch_roll_logs(
    provider: Arc<Provider<Ws>>,
    contract_address: Address,
    sender: mpsc::Sender<FeedEvent>,
) {
    let filter = Filter::new()
        .address(contract_address)
        .event(&RollLog::abi_signature());
    let mut stream = match provider.subscribe_logs(&filter).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Roll subscription failed: {e:#}");
            return;
        }
    };
    while let Some(log) = stream.next().await {
        match process_roll_log(provider.as_ref(), log).await {
            Ok(roll) => {
                if sender.send(FeedEvent::Roll(roll)).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("dropping Roll log: {e:#}"),
        }
    }
    tracing::warn!("Roll subscription ended");
}

async fn watch_winner_logs(
    provider: Arc<Provider<Ws>>,
    contract_address: Address,
    sender: mpsc::Sender<FeedEvent>,
) {
    let filter = Filter::new()
        .address(contract_address)
        .event(&WinnerLog::abi_signature());
    let mut stream = match provider.subscribe_logs(&filter).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Winner subscription failed: {e:#}");
            return;
        }
    };
    while let Some(log) = stream.next().await {
        match process_winner_log(provider.as_ref(), log).await {
            Ok(winner) => {
                if sender.send(FeedEvent::Winner(winner)).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("dropping Winner log: {e:#}"),
        }
    }
    tracing::warn!("Winner subscription ended");
}

pub(crate) async fn process_roll_log<C: ChainLookup>(
    chain: &C,
    log: Log,
) -> Result<RollEvent> {
    let payload = decode_roll_log(&log)?;
    let (block_number, tx_hash) = log_provenance(&log)?;
    let receipt = chain
        .transaction_receipt(tx_hash)
        .await?
        .ok_or_else(|| anyhow!("no receipt available yet for {tx_hash:?}"))?;
    let timestamp = chain.block_timestamp(block_number).await?;
    tracing::debug!(status = ?receipt.status, "enriched Roll log {tx_hash:?}");
    Ok(RollEvent::new(
        payload.player,
        payload.amount,
        payload.roll,
        block_number,
        tx_hash,
        timestamp,
    ))
}

pub(crate) async fn process_winner_log<C: ChainLookup>(
    chain: &C,
    log: Log,
) -> Result<WinnerEvent> {
    let payload = decode_winner_log(&log)?;
    let (block_number, tx_hash) = log_provenance(&log)?;
    let receipt = chain
        .transaction_receipt(tx_hash)
        .await?
        .ok_or_else(|| anyhow!("no receipt available yet for {tx_hash:?}"))?;
    let timestamp = chain.block_timestamp(block_number).await?;
    tracing::debug!(status = ?receipt.status, "enriched Winner log {tx_hash:?}");
    Ok(WinnerEvent::new(
        payload.winner,
        payload.amount,
        block_number,
        tx_hash,
        timestamp,
    ))
}

pub fn decode_roll_log(log: &Log) -> Result<RollLog> {
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    <RollLog as EthEvent>::decode_log(&raw).context("failed to decode Roll log payload")
}

pub fn decode_winner_log(log: &Log) -> Result<WinnerLog> {
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    <WinnerLog as EthEvent>::decode_log(&raw).context("failed to decode Winner log payload")
}

fn log_provenance(log: &Log) -> Result<(u64, TxHash)> {
    let block_number = log
        .block_number
        .ok_or_else(|| anyhow!("log is missing a block number"))?
        .as_u64();
    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| anyhow!("log is missing a transaction hash"))?;
    Ok((block_number, tx_hash))
}
