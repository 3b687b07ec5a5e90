use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

use crate::otp::{Algorithm, OtpParams};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("not a syntactically valid URI")]
    MalformedUri,
    #[error("URI is missing the 'secret' param")]
    MissingSecret,
    #[error("invalid '{0}' param in URI")]
    InvalidParameter(&'static str),
}

/// Что удалось вытащить из QR-кода: имя аккаунта, base32-секрет как есть
/// (декодирует его кодек, не парсер) и параметры генерации.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    pub label: String,
    pub secret: String,
    pub params: OtpParams,
}

/// Разбирает provisioning-URL вида
/// `otpauth://totp/Issuer:alice?secret=...&algorithm=...&digits=...&period=...`.
///
/// Реальные QR-коды бывают неаккуратными, поэтому схему и тип
/// (`totp`-маркер) не проверяем — обязателен только параметр `secret`.
/// А вот кривые значения algorithm/digits/period — это ошибка, а не
/// повод молча подставить дефолт: молча неверный алгоритм даст
/// правдоподобный, но чужой код.
pub fn parse(uri: &str) -> Result<ParsedUri, UriError> {
    let url = Url::parse(uri.trim()).map_err(|_| UriError::MalformedUri)?;

    let mut secret: Option<String> = None;
    let mut params = OtpParams::default();

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "secret" => secret = Some(value.to_string()),
            "algorithm" => {
                params.algorithm = Algorithm::parse(&value)
                    .map_err(|_| UriError::InvalidParameter("algorithm"))?;
            }
            "digits" => {
                // выход за [6,8] отлавливает уже движок, здесь — только синтаксис
                params.digits = value
                    .parse::<u8>()
                    .map_err(|_| UriError::InvalidParameter("digits"))?;
            }
            "period" => {
                let period = value
                    .parse::<u32>()
                    .map_err(|_| UriError::InvalidParameter("period"))?;
                if period == 0 {
                    return Err(UriError::InvalidParameter("period"));
                }
                params.period = period;
            }
            // issuer и прочие параметры нам не нужны
            _ => {}
        }
    }

    let secret = match secret {
        Some(s) if !s.is_empty() => s,
        _ => return Err(UriError::MissingSecret),
    };

    Ok(ParsedUri {
        label: derive_label(&url),
        secret,
        params,
    })
}

/// Имя аккаунта: последний непустой сегмент пути после типа
/// (`otpauth://totp/<label>`). Сегмент вида `Issuer:alice` усекается
/// до части после двоеточия. Если пути нет — "Unknown".
fn derive_label(url: &Url) -> String {
    let segment = url
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .next_back();

    let Some(segment) = segment else {
        return "Unknown".to_string();
    };

    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    let name = match decoded.rsplit_once(':') {
        Some((_, after)) => after.trim(),
        None => decoded.trim(),
    };

    if name.is_empty() {
        "Unknown".to_string()
    } else {
        name.to_string()
    }
}
