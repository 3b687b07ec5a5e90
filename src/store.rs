use crate::account::Account;
use crate::crypto::{MasterKey, open_accounts, seal_accounts};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Корневая директория хранилища (например, ~/.local/share/otpm)
pub fn store_root() -> anyhow::Result<PathBuf> {
    let mut dir = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("cannot get data dir"))?;
    dir.push("otpm");
    Ok(dir)
}

fn accounts_path() -> anyhow::Result<PathBuf> {
    Ok(store_root()?.join("accounts.enc"))
}

/// Весь список аккаунтов лежит одним запечатанным файлом:
/// {version, nonce, ciphertext}, внутри — JSON-массив Account.
#[derive(Serialize, Deserialize)]
struct AccountsFile {
    version: u32,
    nonce: String,
    ciphertext: String,
}

/// Загрузить и расшифровать список аккаунтов.
/// Файла ещё нет — значит аккаунтов ещё не добавляли.
pub fn load_accounts(master_key: &MasterKey) -> anyhow::Result<Vec<Account>> {
    let path = accounts_path()?;
    if !path.exists() {
        return Ok(Vec::new());
    }

    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("cannot read accounts file {}", path.display()))?;
    let file: AccountsFile = serde_json::from_str(&data)?;

    let json = open_accounts(master_key, &file.nonce, &file.ciphertext)?;
    let accounts: Vec<Account> = serde_json::from_slice(&json)?;
    Ok(accounts)
}

/// Сохранить список аккаунтов в зашифрованном виде.
pub fn save_accounts(accounts: &[Account], master_key: &MasterKey) -> anyhow::Result<()> {
    let path = accounts_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec(accounts)?;
    let (nonce_b64, ct_b64) = seal_accounts(master_key, &json)?;

    let file = AccountsFile {
        version: 1,
        nonce: nonce_b64,
        ciphertext: ct_b64,
    };

    let s = serde_json::to_string_pretty(&file)?;
    std::fs::write(path, s)?;
    Ok(())
}
