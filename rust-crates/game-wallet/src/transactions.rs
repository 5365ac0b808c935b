use crate::keystore::GameWallet;
use anyhow::{
    Context,
    Result,
    anyhow,
};
use ethers::{
    middleware::SignerMiddleware,
    providers::{
        Http,
        Middleware,
        Provider,
    },
    signers::Signer,
    types::{
        Address,
        Bytes,
        TransactionRequest,
        TxHash,
        transaction::eip2718::TypedTransaction,
    },
    utils::{
        id,
        parse_ether,
    },
};

/// Stake attached to every roll, in whole coins.
pub const ROLL_STAKE_COINS: &str = "0.002";
pub const ROLL_FUNCTION_SIGNATURE: &str = "rollTheDice()";

/// Submit a dice roll signed by the game wallet. The transaction is simulated
/// first so a revert surfaces as an error instead of a burned stake.
pub async fn roll_the_dice(
    rpc_url: &str,
    chain_id: u64,
    game_wallet: &GameWallet,
    contract_address: Address,
) -> Result<TxHash> {
    let provider =
        Provider::<Http>::try_from(rpc_url).context("invalid RPC url")?;
    let stake = parse_ether(ROLL_STAKE_COINS).context("invalid roll stake")?;
    let calldata = Bytes::from(id(ROLL_FUNCTION_SIGNATURE).to_vec());

    let simulation: TypedTransaction = TransactionRequest::new()
        .from(game_wallet.address())
        .to(contract_address)
        .data(calldata.clone())
        .value(stake)
        .into();
    provider
        .call(&simulation, None)
        .await
        .context("dice roll simulation reverted")?;

    let signer = game_wallet.signer().clone().with_chain_id(chain_id);
    let client = SignerMiddleware::new(provider, signer);
    let tx = TransactionRequest::new()
        .to(contract_address)
        .data(calldata)
        .value(stake);
    let pending = client
        .send_transaction(tx, None)
        .await
        .map_err(|e| anyhow!("failed to submit dice roll: {e}"))?;
    let tx_hash = *pending;
    tracing::info!("submitted dice roll {tx_hash:?}");
    Ok(tx_hash)
}
