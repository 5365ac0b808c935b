use crate::{
    encryption::{
        decrypt_data,
        encrypt_data,
    },
    store::WalletStore,
};
use anyhow::{
    Context,
    Result,
    anyhow,
};
use ethers::{
    signers::{
        LocalWallet,
        Signer,
    },
    types::Address,
};
use rand::RngCore;


/// Auxiliary signing key held locally so the player can transact without
/// approving every transaction from their primary wallet. The private key is
/// only ever persisted encrypted.
#[derive(Clone, Debug)]
pub struct GameWallet {
    signer: LocalWallet,
}

impl GameWallet {
    fn from_private_key(private_key: &str) -> Result<Self> {
        let signer: LocalWallet = private_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|_| anyhow!("stored game wallet key is not a valid private key"))?;
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &LocalWallet {
        &self.signer
    }
}

pub struct GameWalletKeystore<S> {
    store: S,
}

impl<S: WalletStore> GameWalletKeystore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Restore the owner's game wallet, generating a fresh one when no record
    /// exists yet.
    pub fn initialize(&mut self, owner: Address) -> Result<GameWallet> {
        if let Some(wallet) = self.restore(owner)? {
            return Ok(wallet);
        }
        self.generate(owner)
    }

    pub fn restore(&self, owner: Address) -> Result<Option<GameWallet>> {
        let Some(encrypted) = self.store.load(owner)? else {
            return Ok(None);
        };
        let private_key =
            decrypt_data(&encrypted).context("failed to decrypt stored game wallet")?;
        let wallet = GameWallet::from_private_key(&private_key)?;
        tracing::info!("restored game wallet {:?}", wallet.address());
        Ok(Some(wallet))
    }

    pub fn generate(&mut self, owner: Address) -> Result<GameWallet> {
        let mut key_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        let signer = LocalWallet::from_bytes(&key_bytes)
            .context("generated key bytes were rejected")?;
        let private_key = format!("0x{}", hex::encode(key_bytes));
        let encrypted = encrypt_data(&private_key)?;
        self.store.save(owner, &encrypted)?;
        let wallet = GameWallet { signer };
        tracing::info!("generated game wallet {:?}", wallet.address());
        Ok(wallet)
    }
}
