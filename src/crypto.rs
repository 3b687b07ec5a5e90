use crate::config::{Config, EncConfig, KdfParams};
use anyhow::anyhow;
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{Engine as _, engine::general_purpose};
use chacha20poly1305::{
    KeyInit, XChaCha20Poly1305, XNonce,
    aead::{Aead, AeadCore, OsRng},
};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

/// Ключ, которым запечатан файл аккаунтов. Обнуляется при сбросе.
pub type MasterKey = Zeroizing<[u8; 32]>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid master password")]
    InvalidMasterPassword,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Новый keyring: случайный master key, завёрнутый KEK'ом из
/// мастер-пароля. Смена пароля потребует перешифровать только
/// обёртку, а не файл аккаунтов.
pub fn generate_new_config(master_password: &str) -> anyhow::Result<Config> {
    let mut mk = Zeroizing::new([0u8; 32]);
    rand::thread_rng().fill_bytes(mk.as_mut());

    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);

    let kdf = KdfParams {
        algo: "argon2id".to_string(),
        memory_mib: 32,
        iterations: 3,
        parallelism: 1,
        salt: general_purpose::STANDARD.encode(salt_bytes),
    };

    let kek = derive_kek(master_password, &kdf)?;
    let (nonce_b64, ct_b64) = seal(&kek, mk.as_ref())?;

    Ok(Config {
        version: 1,
        kdf,
        enc: EncConfig {
            algo: "xchacha20-poly1305".to_string(),
            master_key_nonce: nonce_b64,
            encrypted_master_key: ct_b64,
        },
    })
}

/// Разворачивает master key по мастер-паролю. Неверный пароль
/// проявляется как ошибка аутентификации AEAD.
pub fn unlock_master_key(master_password: &str, cfg: &Config) -> Result<MasterKey, CryptoError> {
    let kek = derive_kek(master_password, &cfg.kdf)?;
    let plaintext = Zeroizing::new(
        open(&kek, &cfg.enc.master_key_nonce, &cfg.enc.encrypted_master_key)
            .map_err(|_| CryptoError::InvalidMasterPassword)?,
    );

    if plaintext.len() != 32 {
        return Err(CryptoError::Other(anyhow!("invalid master key length")));
    }

    let mut mk = Zeroizing::new([0u8; 32]);
    mk.copy_from_slice(&plaintext);
    Ok(mk)
}

/// KEK из мастер-пароля по Argon2id-параметрам конфига.
fn derive_kek(master_password: &str, kdf: &KdfParams) -> anyhow::Result<Zeroizing<[u8; 32]>> {
    let salt_bytes = general_purpose::STANDARD.decode(&kdf.salt)?;

    let params = Params::new(
        kdf.memory_mib * 1024, // m_cost в KiB
        kdf.iterations,
        kdf.parallelism,
        Some(32),
    )
    .map_err(|e| anyhow!("argon2 params error: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut kek = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(master_password.as_bytes(), &salt_bytes, kek.as_mut())
        .map_err(|e| anyhow!("argon2 error: {e}"))?;

    Ok(kek)
}

/// XChaCha20-Poly1305 с 24-байтовым случайным nonce.
/// Возвращает (nonce_b64, ciphertext_b64).
fn seal(key_bytes: &[u8; 32], plaintext: &[u8]) -> anyhow::Result<(String, String)> {
    let cipher = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key_bytes));
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| anyhow!("encrypt error: {e}"))?;

    Ok((
        general_purpose::STANDARD.encode(nonce),
        general_purpose::STANDARD.encode(ciphertext),
    ))
}

fn open(key_bytes: &[u8; 32], nonce_b64: &str, ct_b64: &str) -> anyhow::Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key_bytes));

    let nonce_bytes = general_purpose::STANDARD.decode(nonce_b64)?;
    let ciphertext = general_purpose::STANDARD.decode(ct_b64)?;

    cipher
        .decrypt(XNonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| anyhow!("decrypt error: bad key or corrupted data"))
}

/// Запечатать JSON со списком аккаунтов master key'ом.
pub fn seal_accounts(master_key: &MasterKey, data: &[u8]) -> anyhow::Result<(String, String)> {
    seal(master_key, data)
}

/// Распечатать файл аккаунтов.
pub fn open_accounts(
    master_key: &MasterKey,
    nonce_b64: &str,
    ct_b64: &str,
) -> anyhow::Result<Vec<u8>> {
    open(master_key, nonce_b64, ct_b64)
}
