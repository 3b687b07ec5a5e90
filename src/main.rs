mod account;
mod base32;
mod clipboard;
mod config;
mod crypto;
mod otp;
mod prompt;
mod session;
mod store;
mod uri;

use crate::account::Account;
use crate::clipboard::copy_to_clipboard;
use crate::config::Config;
use crate::crypto::generate_new_config;
use crate::otp::{OtpParams, OtpResult};
use crate::prompt::{prompt_confirm, prompt_password_hidden, prompt_string};
use crate::session::{get_master_key_with_cache, now_unix};
use crate::store::{load_accounts, save_accounts, store_root};
use anyhow::anyhow;
use clap::{Parser, Subcommand};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use time::OffsetDateTime;

#[derive(Parser, Debug)]
#[command(name = "otpm", version, about = "Minimal TOTP authenticator in Rust")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize account store
    Init,

    /// Add an account (base32 secret or scanned otpauth:// URL)
    ///
    /// Примеры:
    ///   otpm add work/github
    ///   otpm add            # label берётся из otpauth-URL
    Add {
        /// Account label, e.g. work/github
        label: Option<String>,
    },

    /// Show current code for an account
    Show {
        /// Account label
        label: String,
        /// Print only the code
        #[arg(long)]
        code_only: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List accounts with their current codes
    ///
    /// Примеры:
    ///   otpm ls
    Ls,

    /// Copy current code to clipboard
    Clip {
        /// Account label
        label: String,
    },

    /// Remove an account
    Rm {
        /// Account label
        label: String,
    },

    /// Print account as an otpauth:// URL (for migration)
    Uri {
        /// Account label
        label: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cmd_init()?,
        Commands::Add { label } => cmd_add(label.as_deref())?,
        Commands::Show {
            label,
            code_only,
            json,
        } => cmd_show(&label, code_only, json)?,
        Commands::Ls => cmd_ls()?,
        Commands::Clip { label } => cmd_clip(&label)?,
        Commands::Rm { label } => cmd_rm(&label)?,
        Commands::Uri { label } => cmd_uri(&label)?,
    }

    Ok(())
}

fn cmd_init() -> anyhow::Result<()> {
    let root = store_root()?;
    if root.exists() {
        println!("Store already exists at: {}", root.display());
        return Ok(());
    }

    std::fs::create_dir_all(&root)?;
    let master_password = prompt_password_hidden("New master password: ")?;
    let confirm = prompt_password_hidden("Confirm master password: ")?;
    if master_password != confirm {
        anyhow::bail!("Passwords do not match");
    }

    let config = generate_new_config(&master_password)?;
    let config_path = crate::config::config_path()?;
    crate::config::save_config(&config, &config_path)?;

    println!("Initialized store at {}", root.display());
    Ok(())
}

/// otpm add [LABEL]
fn cmd_add(label: Option<&str>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mk = get_master_key_with_cache(&config)?;
    let mut accounts = load_accounts(&mk)?;

    let raw = prompt_string("Secret (base32) OR otpauth:// URL: ")?;
    let raw = raw.trim();
    if raw.is_empty() {
        anyhow::bail!("OTP secret cannot be empty");
    }

    let (uri_label, secret, params) = parse_secret_input(raw)?;

    // Явный LABEL важнее имени из URL; если нет ни того, ни другого — спросим
    let label = match (label, uri_label) {
        (Some(l), _) => l.to_string(),
        (None, Some(l)) => l,
        (None, None) => {
            let l = prompt_string("Account name: ")?;
            let l = l.trim().to_string();
            if l.is_empty() {
                anyhow::bail!("Account label cannot be empty");
            }
            l
        }
    };

    if accounts.iter().any(|a| a.label == label) {
        anyhow::bail!("Account '{}' already exists", label);
    }

    // Проверяем секрет и параметры одним пробным вычислением: кривой
    // скан должен падать здесь, а не на каждом последующем `ls`
    let key = base32::decode(&secret).map_err(|_| anyhow!("Invalid OTP secret (base32)"))?;
    let _ = otp::totp(&key, now_unix()?, &params)?;

    let now =
        OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339)?;

    accounts.push(Account {
        label: label.clone(),
        // храним в каноническом виде: верхний регистр, без пробелов и '='
        secret: base32::encode(&key),
        period: params.period,
        digits: params.digits,
        algo: params.algorithm.as_str().to_string(),
        created_at: now,
    });

    save_accounts(&accounts, &mk)?;
    println!("Saved account {}", label);
    Ok(())
}

/// Ввод в `otpm add`:
/// - URL → парсим provisioning-URI, достаём label/secret/параметры
/// - просто строка → base32-секрет с дефолтами (SHA1, 6, 30)
fn parse_secret_input(raw: &str) -> anyhow::Result<(Option<String>, String, OtpParams)> {
    if raw.contains("://") {
        let parsed = uri::parse(raw)?;
        Ok((Some(parsed.label), parsed.secret, parsed.params))
    } else {
        Ok((None, raw.to_string(), OtpParams::default()))
    }
}

/// otpm show LABEL
fn cmd_show(label: &str, code_only: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mk = get_master_key_with_cache(&config)?;
    let accounts = load_accounts(&mk)?;

    let account = find_account(&accounts, label)?;
    let result = account_code(account)?;

    if json {
        #[derive(serde::Serialize)]
        struct ShowJson<'a> {
            label: &'a str,
            code: &'a str,
            counter: u64,
            seconds_remaining: u32,
        }

        let s = serde_json::to_string_pretty(&ShowJson {
            label: &account.label,
            code: &result.code,
            counter: result.counter,
            seconds_remaining: result.seconds_remaining,
        })?;
        println!("{s}");
        return Ok(());
    }

    if code_only {
        println!("{}", result.code);
        return Ok(());
    }

    println!("{}  (valid for {}s)", result.code, result.seconds_remaining);
    Ok(())
}

/// otpm ls
fn cmd_ls() -> anyhow::Result<()> {
    let config = Config::load()?;
    let mk = get_master_key_with_cache(&config)?;
    let accounts = load_accounts(&mk)?;

    if accounts.is_empty() {
        println!("No accounts saved yet.");
        return Ok(());
    }

    // Сломанный аккаунт не должен ронять вывод остальных:
    // вместо кода печатаем ERR и идём дальше
    for account in &accounts {
        match account_code(account) {
            Ok(r) => println!(
                "{:<24} {:>8}  (valid for {}s)",
                account.label, r.code, r.seconds_remaining
            ),
            Err(_) => println!("{:<24} {:>8}", account.label, "ERR"),
        }
    }

    Ok(())
}

/// otpm clip LABEL
fn cmd_clip(label: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mk = get_master_key_with_cache(&config)?;
    let accounts = load_accounts(&mk)?;

    let account = find_account(&accounts, label)?;
    let result = account_code(account)?;

    copy_to_clipboard(&result.code)?;
    println!("OTP code copied to clipboard.");
    Ok(())
}

/// otpm rm LABEL
fn cmd_rm(label: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mk = get_master_key_with_cache(&config)?;
    let mut accounts = load_accounts(&mk)?;

    let index = accounts
        .iter()
        .position(|a| a.label == label)
        .ok_or_else(|| anyhow!("No account named '{}'", label))?;

    if !prompt_confirm(&format!("Delete account '{}'? [y/N] ", label))? {
        println!("Aborted.");
        return Ok(());
    }

    accounts.remove(index);
    save_accounts(&accounts, &mk)?;
    println!("Deleted account {}", label);
    Ok(())
}

/// otpm uri LABEL — для переноса аккаунта в другое приложение
fn cmd_uri(label: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mk = get_master_key_with_cache(&config)?;
    let accounts = load_accounts(&mk)?;

    let account = find_account(&accounts, label)?;
    println!(
        "otpauth://totp/{}?secret={}&algorithm={}&digits={}&period={}",
        utf8_percent_encode(&account.label, NON_ALPHANUMERIC),
        account.secret,
        account.algo,
        account.digits,
        account.period,
    );
    Ok(())
}

fn find_account<'a>(accounts: &'a [Account], label: &str) -> anyhow::Result<&'a Account> {
    accounts
        .iter()
        .find(|a| a.label == label)
        .ok_or_else(|| anyhow!("No account named '{}'", label))
}

/// Текущий код аккаунта: секрет через кодек, параметры из записи,
/// время — единственный внешний вход.
fn account_code(account: &Account) -> anyhow::Result<OtpResult> {
    let key = base32::decode(&account.secret).map_err(otp::OtpError::from)?;
    let params = account.params()?;
    let result = otp::totp(&key, now_unix()?, &params)?;
    Ok(result)
}
