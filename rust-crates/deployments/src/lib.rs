use anyhow::{
    Context,
    Result,
    anyhow,
};
use chrono::Utc;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Dev,
    Test,
    Local,
}

impl DeploymentEnv {
    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Dev => "dev",
            DeploymentEnv::Test => "test",
            DeploymentEnv::Local => "local",
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Dev => "Devnet",
            DeploymentEnv::Test => "Testnet",
            DeploymentEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployed_at: String,
    pub contract_address: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub ws_url: String,
    #[serde(default)]
    pub deployment_block: Option<u64>,
}

#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(env: DeploymentEnv) -> Result<Self> {
        let path = ensure_store(env)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<DeploymentRecord>> {
        read_record(&self.path)
    }

    pub fn save(&self, record: DeploymentRecord) -> Result<()> {
        write_record(&self.path, &record)
    }
}

pub fn ensure_structure() -> Result<()> {
    for env in [
        DeploymentEnv::Dev,
        DeploymentEnv::Test,
        DeploymentEnv::Local,
    ] {
        let _ = ensure_store(env)?;
    }
    Ok(())
}

fn ensure_store(env: DeploymentEnv) -> Result<PathBuf> {
    let root = Path::new(DEPLOYMENTS_ROOT);
    if !root.exists() {
        fs::create_dir_all(root).context("Failed to create .deployments directory")?;
    }

    let env_dir = root.join(env.dir_name());
    if !env_dir.exists() {
        fs::create_dir_all(&env_dir).with_context(|| {
            format!("Failed to create .deployments/{} directory", env.dir_name())
        })?;
    }

    let file_path = env_dir.join(DEPLOYMENTS_FILE);
    if !file_path.exists() {
        let mut file = fs::File::create(&file_path).with_context(|| {
            format!(
                "Failed to create deployment record file for {} at {:?}",
                env, file_path
            )
        })?;
        file.write_all(b"").with_context(|| {
            format!("Failed to initialize deployment record file for {}", env)
        })?;
    }

    Ok(file_path)
}

fn read_record(path: impl AsRef<Path>) -> Result<Option<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).context("Failed to read deployment records")?;
    if data.iter().all(u8::is_ascii_whitespace) || data.is_empty() {
        return Ok(None);
    }
    if let Ok(record) = serde_json::from_slice::<DeploymentRecord>(&data) {
        return Ok(Some(record));
    }
    if let Ok(mut records) = serde_json::from_slice::<Vec<DeploymentRecord>>(&data) {
        return Ok(records.pop());
    }
    Err(anyhow!(
        "Failed to parse deployment record JSON; expected a single deployment object"
    ))
}

fn write_record(path: impl AsRef<Path>, record: &DeploymentRecord) -> Result<()> {
    let json = serde_json::to_vec_pretty(record)
        .context("Failed to serialize deployment record")?;
    fs::write(path.as_ref(), json).context("Failed to write deployment record")?;
    Ok(())
}

pub fn record_deployment(
    env: DeploymentEnv,
    contract_address: impl AsRef<str>,
    chain_id: u64,
    rpc_url: impl AsRef<str>,
    ws_url: impl AsRef<str>,
) -> Result<()> {
    let store = DeploymentStore::new(env)?;
    let record = DeploymentRecord {
        deployed_at: Utc::now().to_rfc3339(),
        contract_address: contract_address.as_ref().to_string(),
        chain_id,
        rpc_url: rpc_url.as_ref().to_string(),
        ws_url: ws_url.as_ref().to_string(),
        deployment_block: None,
    };
    store.save(record)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use tempdir::TempDir;

    #[test]
    fn read_record__empty_payload__is_none() {
        let dir = TempDir::new("lucky6-deployments-empty").unwrap();
        let path = dir.path().join(DEPLOYMENTS_FILE);
        fs::write(&path, b"  \n").unwrap();

        let record = read_record(&path).unwrap();

        assert!(record.is_none());
    }

    #[test]
    fn read_record__roundtrips_saved_record() {
        let dir = TempDir::new("lucky6-deployments-roundtrip").unwrap();
        let path = dir.path().join(DEPLOYMENTS_FILE);

        let record = DeploymentRecord {
            deployed_at: Utc::now().to_rfc3339(),
            contract_address: "0x9b9a5c3e2b61d54b8c8e0f3f8e8b3c2a1d0e9f88".to_string(),
            chain_id: 10143,
            rpc_url: "https://testnet-rpc.monad.xyz".to_string(),
            ws_url: "wss://testnet-rpc.monad.xyz".to_string(),
            deployment_block: Some(100),
        };
        write_record(&path, &record).unwrap();

        let loaded = read_record(&path).unwrap().unwrap();

        assert_eq!(loaded.contract_address, record.contract_address);
        assert_eq!(loaded.chain_id, record.chain_id);
        assert_eq!(loaded.deployment_block, record.deployment_block);
    }
}
