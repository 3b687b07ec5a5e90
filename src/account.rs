use serde::{Deserialize, Serialize};

use crate::otp::{Algorithm, OtpError, OtpParams};

/// Единица хранения и отображения: имя + base32-секрет + параметры
/// генерации. Движок OTP видит аккаунт как неизменяемое значение.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Account {
    pub label: String,
    pub secret: String, // base32, канонизированный при добавлении
    pub period: u32,
    pub digits: u8,
    pub algo: String, // "SHA1"
    pub created_at: String,
}

impl Account {
    /// Типизированные параметры из строковой формы файла аккаунтов.
    pub fn params(&self) -> Result<OtpParams, OtpError> {
        Ok(OtpParams {
            algorithm: Algorithm::parse(&self.algo)?,
            digits: self.digits,
            period: self.period,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(algo: &str) -> Account {
        Account {
            label: "work/github".to_string(),
            secret: "JBSWY3DPEHPK3PXP".to_string(),
            period: 30,
            digits: 6,
            algo: algo.to_string(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn params_round_trip_the_stored_strings() {
        let params = account("sha256").params().unwrap();
        assert_eq!(params.algorithm, Algorithm::Sha256);
        assert_eq!(params.digits, 6);
        assert_eq!(params.period, 30);
    }

    #[test]
    fn unknown_algo_string_is_rejected() {
        assert_eq!(
            account("MD5").params(),
            Err(OtpError::UnsupportedAlgorithm("MD5".to_string()))
        );
    }
}
