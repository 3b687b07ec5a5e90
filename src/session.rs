use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

use crate::config::Config;
use crate::crypto::{MasterKey, unlock_master_key};
use crate::prompt::prompt_password_hidden;
use crate::store::store_root;

const SESSION_TTL_SECS: u64 = 5 * 60;

#[derive(Serialize, Deserialize)]
struct SessionFile {
    expires_at: u64,
    master_key: String, // base64
}

pub fn session_path() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        Ok(PathBuf::from(dir).join("otpm-session.json"))
    } else {
        Ok(store_root()?.join("session.json"))
    }
}

/// Текущее время в секундах Unix. Единственные «часы» в программе:
/// TOTP-движку время всегда передаётся отсюда как аргумент.
pub fn now_unix() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow!("system time error: {e}"))?
        .as_secs())
}

#[cfg(unix)]
fn set_perms_restrictive(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_perms_restrictive(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Кэш развёрнутого master key: `otpm ls` дёргают раз в полминуты,
/// запрашивать мастер-пароль на каждый тик нельзя.
fn read_cached(path: &Path, now: u64) -> Option<MasterKey> {
    let data = fs::read_to_string(path).ok()?;
    let sess: SessionFile = serde_json::from_str(&data).ok()?;

    if now > sess.expires_at {
        let _ = fs::remove_file(path);
        return None;
    }

    let bytes = Zeroizing::new(general_purpose::STANDARD.decode(&sess.master_key).ok()?);
    if bytes.len() != 32 {
        return None;
    }

    let mut mk = Zeroizing::new([0u8; 32]);
    mk.copy_from_slice(&bytes);
    Some(mk)
}

fn write_cache(path: &Path, mk: &MasterKey, now: u64) {
    let sess = SessionFile {
        expires_at: now + SESSION_TTL_SECS,
        master_key: general_purpose::STANDARD.encode(&mk[..]),
    };

    // кэш — всего лишь удобство: ошибки записи не фатальны
    if let Ok(json) = serde_json::to_string(&sess) {
        if fs::write(path, json).is_ok() {
            let _ = set_perms_restrictive(path);
        }
    }
}

pub fn get_master_key_with_cache(cfg: &Config) -> Result<MasterKey> {
    let path = session_path()?;
    let now = now_unix()?;

    if let Some(mk) = read_cached(&path, now) {
        return Ok(mk);
    }

    let master_password = Zeroizing::new(prompt_password_hidden("Master password: ")?);
    let mk = unlock_master_key(&master_password, cfg)?;

    write_cache(&path, &mk, now);
    Ok(mk)
}
