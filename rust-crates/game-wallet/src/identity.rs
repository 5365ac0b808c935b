use anyhow::{
    Context,
    Result,
    anyhow,
};
use ethers::{
    types::Address,
    utils::to_checksum,
};
use serde::Deserialize;
use std::fmt;

pub const DEFAULT_IDENTITY_URL: &str = "https://monad-games-id-site.vercel.app";

/// Client for the cross-game identity service that maps player wallets to
/// registered usernames.
pub struct IdentityClient {
    base_url: String,
    http: reqwest::Client,
}

impl IdentityClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn check_wallet(&self, wallet: Address) -> Result<CheckWalletDto> {
        let url = format!(
            "{}/api/check-wallet?wallet={}",
            self.base_url,
            to_checksum(&wallet, None)
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("identity service is unreachable")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("identity lookup failed with {status}: {body}"));
        }
        response
            .json()
            .await
            .context("identity service returned an unexpected payload")
    }

    /// Where a player without a username goes to claim one.
    pub fn register_url(&self) -> String {
        self.base_url.clone()
    }
}

impl fmt::Display for IdentityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckWalletDto {
    pub has_username: bool,
    pub user: Option<UserDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: u64,
    pub username: String,
    pub wallet_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    pub id: u64,
    pub username: String,
    pub wallet_address: String,
}

impl CheckWalletDto {
    pub fn into_profile(self) -> Option<IdentityProfile> {
        if !self.has_username {
            return None;
        }
        self.user.map(|user| IdentityProfile {
            id: user.id,
            username: user.username,
            wallet_address: user.wallet_address,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn check_wallet_dto__registered_payload__parses_into_profile() {
        let payload = r#"{
            "hasUsername": true,
            "user": {
                "id": 42,
                "username": "dicey",
                "walletAddress": "0x20c4EF21b1697353Fe3BAc5bCd28a95a0E0A2AE9"
            }
        }"#;

        let dto: CheckWalletDto = serde_json::from_str(payload).unwrap();
        let profile = dto.into_profile().unwrap();

        assert_eq!(profile.id, 42);
        assert_eq!(profile.username, "dicey");
        assert_eq!(
            profile.wallet_address,
            "0x20c4EF21b1697353Fe3BAc5bCd28a95a0E0A2AE9"
        );
    }

    #[test]
    fn check_wallet_dto__unregistered_payload__has_no_profile() {
        let payload = r#"{"hasUsername": false}"#;

        let dto: CheckWalletDto = serde_json::from_str(payload).unwrap();

        assert!(dto.into_profile().is_none());
    }

    #[test]
    fn identity_client__base_url__trailing_slash_is_trimmed() {
        let client = IdentityClient::new("https://identity.example.com/");

        assert_eq!(client.to_string(), "https://identity.example.com");
    }
}
