use anyhow::{
    Context,
    Result,
    anyhow,
};
use ethers::{
    types::Address,
    utils::to_checksum,
};
use sled::{
    Config,
    Tree,
};
use std::{
    collections::HashMap,
    path::{
        Path,
        PathBuf,
    },
    sync::{
        Arc,
        Mutex,
    },
};

/// One record per owning address. No locking across processes; if two
/// instances race to create a wallet for the same owner, the last writer wins.
pub trait WalletStore {
    fn load(&self, owner: Address) -> Result<Option<String>>;
    fn save(&mut self, owner: Address, encrypted: &str) -> Result<()>;
}

pub fn storage_key(owner: Address) -> String {
    format!("gameWallet_{}", to_checksum(&owner, None))
}

pub fn default_store_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".lucky6").join("game-wallets"))
}

#[derive(Clone)]
pub struct SledWalletStore {
    tree: Tree,
}

impl SledWalletStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::default().path(path);
        let db = config.open().context("open sled database")?;
        let tree = db
            .open_tree("game_wallets")
            .context("open game_wallets tree")?;
        Ok(Self { tree })
    }
}

impl WalletStore for SledWalletStore {
    fn load(&self, owner: Address) -> Result<Option<String>> {
        let value = self
            .tree
            .get(storage_key(owner))
            .context("read game wallet record")?;
        value
            .map(|raw| {
                String::from_utf8(raw.to_vec())
                    .context("game wallet record is not valid UTF-8")
            })
            .transpose()
    }

    fn save(&mut self, owner: Address, encrypted: &str) -> Result<()> {
        self.tree
            .insert(storage_key(owner), encrypted.as_bytes())
            .context("write game wallet record")?;
        self.tree.flush().context("flush game wallet record")?;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryWalletStore {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Arc<Mutex<HashMap<String, String>>> {
        self.records.clone()
    }
}

impl WalletStore for InMemoryWalletStore {
    fn load(&self, owner: Address) -> Result<Option<String>> {
        let guard = self
            .records
            .lock()
            .map_err(|_| anyhow!("wallet store lock poisoned"))?;
        Ok(guard.get(&storage_key(owner)).cloned())
    }

    fn save(&mut self, owner: Address, encrypted: &str) -> Result<()> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| anyhow!("wallet store lock poisoned"))?;
        guard.insert(storage_key(owner), encrypted.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use tempdir::TempDir;

    #[test]
    fn storage_key__owner_address__is_namespaced_and_checksummed() {
        let owner = Address::repeat_byte(0xaa);

        let key = storage_key(owner);

        assert!(key.starts_with("gameWallet_0x"));
        assert_eq!(key.len(), "gameWallet_".len() + 42);
    }

    #[test]
    fn sled_store__save_then_load__roundtrips() {
        let dir = TempDir::new("lucky6-wallet-store").unwrap();
        let mut store = SledWalletStore::open(dir.path()).unwrap();
        let owner = Address::repeat_byte(0xaa);

        store.save(owner, "00ff:aabb").unwrap();
        let loaded = store.load(owner).unwrap();

        assert_eq!(loaded.as_deref(), Some("00ff:aabb"));
    }

    #[test]
    fn sled_store__unknown_owner__is_none() {
        let dir = TempDir::new("lucky6-wallet-store-empty").unwrap();
        let store = SledWalletStore::open(dir.path()).unwrap();

        let loaded = store.load(Address::repeat_byte(0xbb)).unwrap();

        assert!(loaded.is_none());
    }

    #[test]
    fn in_memory_store__two_owners__independent_records() {
        let mut store = InMemoryWalletStore::new();
        let first = Address::repeat_byte(0xaa);
        let second = Address::repeat_byte(0xbb);

        store.save(first, "record-one").unwrap();
        store.save(second, "record-two").unwrap();

        assert_eq!(store.load(first).unwrap().as_deref(), Some("record-one"));
        assert_eq!(store.load(second).unwrap().as_deref(), Some("record-two"));
    }

    #[test]
    fn in_memory_store__poisoned_lock__is_error() {
        let mut store = InMemoryWalletStore::new();
        let records = store.records();
        let _ = std::thread::spawn(move || {
            let _guard = records.lock().unwrap();
            panic!("poisoning the store lock");
        })
        .join();

        assert!(store.load(Address::repeat_byte(0xaa)).is_err());
        assert!(store.save(Address::repeat_byte(0xaa), "record").is_err());
    }

    #[test]
    fn in_memory_store__second_save__overwrites() {
        let mut store = InMemoryWalletStore::new();
        let owner = Address::repeat_byte(0xaa);

        store.save(owner, "first").unwrap();
        store.save(owner, "second").unwrap();

        assert_eq!(store.load(owner).unwrap().as_deref(), Some("second"));
    }
}
