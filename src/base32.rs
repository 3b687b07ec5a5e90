use thiserror::Error;

/// Алфавит RFC 4648: A–Z, 2–7 (5 бит на символ).
const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid base32 encoding")]
pub struct InvalidEncoding;

/// Декодирует base32-строку в байты.
///
/// Секреты из QR-кодов приходят в разном виде: с пробелами, в нижнем
/// регистре, с паддингом `=` или без него. Всё это допускаем:
/// пробелы пропускаем, регистр не важен, `=` отбрасываем.
/// Неполный хвост (<8 бит) отбрасывается как в RFC 4648.
/// Пустой вход декодируется в пустой вектор — пустоту отвергает
/// уже HOTP-движок, не кодек.
pub fn decode(input: &str) -> Result<Vec<u8>, InvalidEncoding> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity(input.len() * 5 / 8);

    for ch in input.chars() {
        if ch.is_whitespace() || ch == '=' {
            continue;
        }
        let value = match ch.to_ascii_uppercase() {
            c @ 'A'..='Z' => c as u32 - 'A' as u32,
            c @ '2'..='7' => c as u32 - '2' as u32 + 26,
            _ => return Err(InvalidEncoding),
        };
        acc = (acc << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }

    Ok(out)
}

/// Кодирует байты в канонический base32: верхний регистр, без паддинга.
pub fn encode(data: &[u8]) -> String {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);

    for &byte in data {
        acc = (acc << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((acc >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(ALPHABET[((acc << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_rfc4648_vectors() {
        assert_eq!(decode("").unwrap(), b"");
        assert_eq!(decode("MY======").unwrap(), b"f");
        assert_eq!(decode("MZXQ====").unwrap(), b"fo");
        assert_eq!(decode("MZXW6===").unwrap(), b"foo");
        assert_eq!(decode("MZXW6YQ=").unwrap(), b"foob");
        assert_eq!(decode("MZXW6YTB").unwrap(), b"fooba");
        assert_eq!(decode("MZXW6YTBOI======").unwrap(), b"foobar");
    }

    #[test]
    fn padding_is_optional() {
        assert_eq!(decode("MZXW6").unwrap(), b"foo");
        assert_eq!(decode("MZXW6YQ").unwrap(), b"foob");
    }

    #[test]
    fn tolerates_case_and_whitespace() {
        assert_eq!(decode("mzxw6ytb").unwrap(), b"fooba");
        assert_eq!(decode("  jbsw y3dp ehpk 3pxp  ").unwrap(), decode("JBSWY3DPEHPK3PXP").unwrap());
    }

    #[test]
    fn known_secret_decodes() {
        assert_eq!(
            decode("JBSWY3DPEHPK3PXP").unwrap(),
            b"Hello!\xde\xad\xbe\xef"
        );
    }

    #[test]
    fn incomplete_trailing_bits_are_discarded() {
        // один символ — 5 бит, целого байта не набирается
        assert_eq!(decode("A").unwrap(), b"");
        // 10 бит — один байт, два лишних бита отброшены
        assert_eq!(decode("AA").unwrap(), &[0u8][..]);
        assert_eq!(decode("7777").unwrap(), &[0xff, 0xff][..]);
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        assert_eq!(decode("MZXW61TB"), Err(InvalidEncoding));
        assert_eq!(decode("0000"), Err(InvalidEncoding));
        assert_eq!(decode("ABC!"), Err(InvalidEncoding));
        assert_eq!(decode("ABC-DEF"), Err(InvalidEncoding));
    }

    #[test]
    fn encode_is_canonical() {
        assert_eq!(encode(b""), "");
        assert_eq!(encode(b"f"), "MY");
        assert_eq!(encode(b"foo"), "MZXW6");
        assert_eq!(encode(b"fooba"), "MZXW6YTB");
        assert_eq!(encode(b"Hello!\xde\xad\xbe\xef"), "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn decode_encode_round_trip() {
        for s in ["JBSWY3DPEHPK3PXP", "mzxw6===", "GEZDGNBVGY3TQOJQ"] {
            let bytes = decode(s).unwrap();
            assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
        }
    }
}
