use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use thiserror::Error;

use crate::base32;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error(transparent)]
    InvalidEncoding(#[from] base32::InvalidEncoding),
    #[error("OTP secret decoded to empty byte string")]
    EmptySecret,
    #[error("unsupported OTP algorithm '{0}', expected SHA1/SHA256/SHA512")]
    UnsupportedAlgorithm(String),
    #[error("unsupported OTP digits '{0}', expected 6-8")]
    InvalidDigits(u8),
    #[error("OTP period must be a positive number of seconds")]
    InvalidPeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    /// Разбор строковой формы из otpauth-URL или файла аккаунтов.
    pub fn parse(s: &str) -> Result<Self, OtpError> {
        match s.to_uppercase().as_str() {
            "SHA1" => Ok(Algorithm::Sha1),
            "SHA256" => Ok(Algorithm::Sha256),
            "SHA512" => Ok(Algorithm::Sha512),
            other => Err(OtpError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Sha512 => "SHA512",
        }
    }
}

/// Параметры генерации: дефолты SHA1/6/30 — то, что подразумевает
/// большинство провайдеров, если QR-код не говорит иного.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpParams {
    pub algorithm: Algorithm,
    pub digits: u8,
    pub period: u32,
}

impl Default for OtpParams {
    fn default() -> Self {
        OtpParams {
            algorithm: Algorithm::Sha1,
            digits: 6,
            period: 30,
        }
    }
}

/// Результат одного тика: код, номер окна и сколько секунд окно ещё живо.
/// Нигде не сохраняется — пересчитывается на каждый запрос.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpResult {
    pub code: String,
    pub counter: u64,
    pub seconds_remaining: u32,
}

/// HOTP по RFC 4226: HMAC от 8-байтового big-endian счётчика,
/// динамическое усечение, остаток по модулю 10^digits.
pub fn hotp(secret: &[u8], counter: u64, algorithm: Algorithm, digits: u8) -> Result<String, OtpError> {
    if secret.is_empty() {
        return Err(OtpError::EmptySecret);
    }
    if !(6..=8).contains(&digits) {
        return Err(OtpError::InvalidDigits(digits));
    }

    let digest = hmac_digest(algorithm, secret, &counter.to_be_bytes());

    // Динамическое усечение (RFC 4226 §5.3): младший ниббл последнего
    // байта выбирает 4-байтовое окно, старший бит окна гасится,
    // чтобы получить неотрицательное 31-битное число.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    let code = binary % 10u32.pow(digits as u32);
    Ok(format!("{code:0>width$}", width = digits as usize))
}

/// TOTP по RFC 6238: счётчик — номер окна от эпохи Unix.
///
/// Время всегда передаётся снаружи, движок часы не читает — поэтому
/// результат полностью детерминирован по входам. Когда `now` попадает
/// ровно на границу окна, остаток равен полному периоду, а не нулю:
/// обратный отсчёт на экране никогда не показывает 0.
pub fn totp(secret: &[u8], now: u64, params: &OtpParams) -> Result<OtpResult, OtpError> {
    if params.period == 0 {
        return Err(OtpError::InvalidPeriod);
    }
    let period = params.period as u64;

    let counter = now / period;
    let code = hotp(secret, counter, params.algorithm, params.digits)?;
    let seconds_remaining = (period - now % period) as u32;

    Ok(OtpResult {
        code,
        counter,
        seconds_remaining,
    })
}

fn hmac_digest(algorithm: Algorithm, key: &[u8], message: &[u8]) -> Vec<u8> {
    match algorithm {
        Algorithm::Sha1 => mac_bytes::<HmacSha1>(key, message),
        Algorithm::Sha256 => mac_bytes::<HmacSha256>(key, message),
        Algorithm::Sha512 => mac_bytes::<HmacSha512>(key, message),
    }
}

fn mac_bytes<M: Mac + hmac::digest::KeyInit>(key: &[u8], message: &[u8]) -> Vec<u8> {
    // HMAC принимает ключ любой длины, new_from_slice не падает
    let mut mac = <M as Mac>::new_from_slice(key).expect("HMAC can take a key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Ключи из приложений RFC 4226 / RFC 6238
    const RFC_KEY_SHA1: &[u8] = b"12345678901234567890";
    const RFC_KEY_SHA256: &[u8] = b"12345678901234567890123456789012";
    const RFC_KEY_SHA512: &[u8] =
        b"1234567890123456789012345678901234567890123456789012345678901234";

    #[test]
    fn hotp_matches_rfc4226_appendix_d() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        for (counter, want) in expected.iter().enumerate() {
            let got = hotp(RFC_KEY_SHA1, counter as u64, Algorithm::Sha1, 6).unwrap();
            assert_eq!(&got, want, "counter {counter}");
        }
    }

    #[test]
    fn totp_matches_rfc6238_appendix_b() {
        // 8-значные вектора для T = 59 (счётчик 1) по всем трём алгоритмам
        let cases = [
            (RFC_KEY_SHA1, Algorithm::Sha1, "94287082"),
            (RFC_KEY_SHA256, Algorithm::Sha256, "46119246"),
            (RFC_KEY_SHA512, Algorithm::Sha512, "90693936"),
        ];
        for (key, algorithm, want) in cases {
            let params = OtpParams {
                algorithm,
                digits: 8,
                period: 30,
            };
            let result = totp(key, 59, &params).unwrap();
            assert_eq!(result.code, want, "{algorithm:?}");
            assert_eq!(result.counter, 1);
            assert_eq!(result.seconds_remaining, 1);
        }
    }

    #[test]
    fn totp_matches_rfc6238_at_t_1234567890() {
        let params = OtpParams {
            algorithm: Algorithm::Sha1,
            digits: 8,
            period: 30,
        };
        assert_eq!(totp(RFC_KEY_SHA1, 1_234_567_890, &params).unwrap().code, "89005924");
    }

    #[test]
    fn known_base32_secret_at_t_59() {
        // secret=JBSWY3DPEHPK3PXP, SHA1/6/30 — выведено по методологии RFC 6238
        let secret = crate::base32::decode("JBSWY3DPEHPK3PXP").unwrap();
        let result = totp(&secret, 59, &OtpParams::default()).unwrap();
        assert_eq!(result.code, "996554");
        assert_eq!(result.counter, 1);
    }

    #[test]
    fn codes_keep_leading_zeros() {
        let secret = crate::base32::decode("JBSWY3DPEHPK3PXP").unwrap();
        // счётчик 29 даёт значение < 10^5, строка обязана остаться 6-значной
        let code = hotp(&secret, 29, Algorithm::Sha1, 6).unwrap();
        assert_eq!(code, "067820");
        assert_eq!(code.len(), 6);
    }

    #[test]
    fn all_digit_widths_render_fixed_length() {
        let secret = crate::base32::decode("JBSWY3DPEHPK3PXP").unwrap();
        for digits in 6..=8u8 {
            for counter in [0u64, 1, 29, 1_000_000] {
                let code = hotp(&secret, counter, Algorithm::Sha1, digits).unwrap();
                assert_eq!(code.len(), digits as usize);
                assert!(code.chars().all(|c| c.is_ascii_digit()));
            }
        }
    }

    #[test]
    fn totp_is_deterministic() {
        let secret = crate::base32::decode("JBSWY3DPEHPK3PXP").unwrap();
        let params = OtpParams::default();
        assert_eq!(totp(&secret, 1_111_111_109, &params).unwrap(), totp(&secret, 1_111_111_109, &params).unwrap());
        // внутри одного окна код не меняется
        assert_eq!(
            totp(&secret, 30, &params).unwrap().code,
            totp(&secret, 59, &params).unwrap().code
        );
    }

    #[test]
    fn seconds_remaining_stays_in_window() {
        let secret = crate::base32::decode("JBSWY3DPEHPK3PXP").unwrap();
        let params = OtpParams::default();
        for now in 0..=120u64 {
            let r = totp(&secret, now, &params).unwrap();
            assert!(r.seconds_remaining >= 1 && r.seconds_remaining <= 30, "now={now}");
        }
        // на границе окна — полный период, не ноль
        assert_eq!(totp(&secret, 0, &params).unwrap().seconds_remaining, 30);
        assert_eq!(totp(&secret, 60, &params).unwrap().seconds_remaining, 30);
        assert_eq!(totp(&secret, 61, &params).unwrap().seconds_remaining, 29);
        assert_eq!(totp(&secret, 89, &params).unwrap().seconds_remaining, 1);
    }

    #[test]
    fn counter_is_floor_of_time_steps() {
        let secret = crate::base32::decode("JBSWY3DPEHPK3PXP").unwrap();
        let params = OtpParams::default();
        assert_eq!(totp(&secret, 29, &params).unwrap().counter, 0);
        assert_eq!(totp(&secret, 30, &params).unwrap().counter, 1);
        let r = totp(&secret, 1_111_111_109, &params).unwrap();
        assert_eq!(r.counter, 37_037_036);
        assert_eq!(r.code, "071271");
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert_eq!(hotp(b"", 0, Algorithm::Sha1, 6), Err(OtpError::EmptySecret));
        assert_eq!(hotp(b"", 12345, Algorithm::Sha512, 8), Err(OtpError::EmptySecret));
        assert_eq!(
            totp(b"", 59, &OtpParams::default()),
            Err(OtpError::EmptySecret)
        );
    }

    #[test]
    fn digits_outside_range_are_rejected() {
        assert_eq!(
            hotp(RFC_KEY_SHA1, 0, Algorithm::Sha1, 5),
            Err(OtpError::InvalidDigits(5))
        );
        assert_eq!(
            hotp(RFC_KEY_SHA1, 0, Algorithm::Sha1, 9),
            Err(OtpError::InvalidDigits(9))
        );
    }

    #[test]
    fn zero_period_is_rejected() {
        let params = OtpParams {
            period: 0,
            ..OtpParams::default()
        };
        assert_eq!(totp(RFC_KEY_SHA1, 59, &params), Err(OtpError::InvalidPeriod));
    }

    #[test]
    fn algorithm_parsing() {
        assert_eq!(Algorithm::parse("sha1").unwrap(), Algorithm::Sha1);
        assert_eq!(Algorithm::parse("SHA256").unwrap(), Algorithm::Sha256);
        assert_eq!(Algorithm::parse("Sha512").unwrap(), Algorithm::Sha512);
        assert_eq!(
            Algorithm::parse("MD5"),
            Err(OtpError::UnsupportedAlgorithm("MD5".to_string()))
        );
    }
}
