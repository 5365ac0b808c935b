use anyhow::{
    Context,
    Result,
    anyhow,
};
use ethers::{
    providers::Middleware,
    types::{
        Address,
        TransactionRequest,
        U256,
    },
    utils::{
        format_ether,
        parse_ether,
    },
};

pub const GAME_WALLET_SHARE_PERCENT: u64 = 90;

/// 90% of the funding goes to the game wallet, 10% to the identity wallet.
pub fn split_funding(total: U256) -> (U256, U256) {
    let game_wallet_amount =
        total * U256::from(GAME_WALLET_SHARE_PERCENT) / U256::from(100u64);
    let identity_amount =
        total * U256::from(100 - GAME_WALLET_SHARE_PERCENT) / U256::from(100u64);
    (game_wallet_amount, identity_amount)
}

/// 20% of the available balance, floor 0.01 coins, rendered to three
/// decimals.
pub fn recommended_funding_amount(balance: U256) -> String {
    let balance: f64 = format_ether(balance).parse().unwrap_or_default();
    let recommended = (balance * 0.2).max(0.01);
    format!("{recommended:.3}")
}

pub async fn fund_game_wallet<M: Middleware>(
    client: &M,
    connected: Address,
    game_wallet: Address,
    identity_wallet: Address,
    amount_coins: &str,
) -> Result<()> {
    let total = parse_ether(amount_coins).context("invalid funding amount")?;
    let (game_wallet_amount, identity_amount) = split_funding(total);

    send_value(client, game_wallet, game_wallet_amount).await?;
    if identity_wallet != connected {
        send_value(client, identity_wallet, identity_amount).await?;
    }
    tracing::info!(
        "funded game wallet {game_wallet:?} with {} coins",
        format_ether(game_wallet_amount)
    );
    Ok(())
}

async fn send_value<M: Middleware>(client: &M, to: Address, value: U256) -> Result<()> {
    let tx = TransactionRequest::new().to(to).value(value);
    let pending = client
        .send_transaction(tx, None)
        .await
        .map_err(|e| anyhow!("failed to submit transfer to {to:?}: {e}"))?;
    let _receipt = pending
        .await
        .context("transfer was dropped before confirmation")?;
    Ok(())
}
