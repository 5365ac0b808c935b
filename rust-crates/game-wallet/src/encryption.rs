use aes::cipher::{
    BlockDecryptMut,
    BlockEncryptMut,
    KeyIvInit,
    block_padding::Pkcs7,
};
use anyhow::{
    Context,
    Result,
    anyhow,
};
use rand::RngCore;
use sha2::{
    Digest,
    Sha256,
};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

// Fixed passphrase: anyone holding the binary can derive the key. Kept for
// compatibility with existing stored records.
const ENCRYPTION_PASSPHRASE: &str = "monad-games-secure-key-2024";
const IV_LEN: usize = 16;

pub fn derive_encryption_key() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(ENCRYPTION_PASSPHRASE.as_bytes());
    hasher.finalize().into()
}

/// AES-256-CBC with a fresh random IV per call; the IV is hex-prepended so
/// the output is self-contained: `"<ivHex>:<ciphertextHex>"`.
pub fn encrypt_data(data: &str) -> Result<String> {
    let key = derive_encryption_key();
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let cipher = Aes256CbcEnc::new_from_slices(&key, &iv)
        .map_err(|e| anyhow!("invalid AES key or IV length: {e}"))?;
    let encrypted = cipher.encrypt_padded_vec_mut::<Pkcs7>(data.as_bytes());
    Ok(format!("{}:{}", hex::encode(iv), hex::encode(encrypted)))
}

pub fn decrypt_data(encrypted_data: &str) -> Result<String> {
    let key = derive_encryption_key();
    let (iv_hex, encrypted_hex) = encrypted_data
        .split_once(':')
        .ok_or_else(|| anyhow!("malformed encrypted payload; expected iv:ciphertext"))?;
    let iv = hex::decode(iv_hex).context("invalid IV hex in encrypted payload")?;
    let encrypted =
        hex::decode(encrypted_hex).context("invalid ciphertext hex in encrypted payload")?;
    if iv.len() != IV_LEN {
        return Err(anyhow!(
            "invalid IV length {}; expected {IV_LEN} bytes",
            iv.len()
        ));
    }
    let cipher = Aes256CbcDec::new_from_slices(&key, &iv)
        .map_err(|e| anyhow!("invalid AES key or IV length: {e}"))?;
    let decrypted = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&encrypted)
        .map_err(|_| anyhow!("decryption failed; ciphertext is corrupted or foreign"))?;
    String::from_utf8(decrypted).context("decrypted payload is not valid UTF-8")
}
