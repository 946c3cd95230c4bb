//! Type1 charstring encryption.
//!
//! See section 7 "Encryption" of the Adobe Type 1 Font Format.

/// Initial key for charstring encryption.
pub const CHARSTRING_KEY: u16 = 4330;

/// Number of leading random bytes when the Private dictionary has no
/// `lenIV` entry.
pub const DEFAULT_LEN_IV: i32 = 4;

const C1: u16 = 52845;
const C2: u16 = 22719;

/// Decrypts a Type1 charstring and drops the leading `len_iv` bytes.
///
/// A negative `len_iv` means the charstring is not encrypted.
pub fn decrypt_charstring(data: &[u8], len_iv: i32) -> Vec<u8> {
    let Ok(skip) = usize::try_from(len_iv) else {
        return data.to_vec();
    };
    let mut r = CHARSTRING_KEY;
    data.iter()
        .map(|&cipher| {
            let plain = cipher ^ (r >> 8) as u8;
            r = (cipher as u16)
                .wrapping_add(r)
                .wrapping_mul(C1)
                .wrapping_add(C2);
            plain
        })
        .skip(skip)
        .collect()
}

/// Encrypts a Type1 charstring, prefixed with `len_iv` zero bytes.
///
/// A negative `len_iv` returns the data unchanged.
pub fn encrypt_charstring(data: &[u8], len_iv: i32) -> Vec<u8> {
    let Ok(prefix) = usize::try_from(len_iv) else {
        return data.to_vec();
    };
    let mut r = CHARSTRING_KEY;
    std::iter::repeat(0u8)
        .take(prefix)
        .chain(data.iter().copied())
        .map(|plain| {
            let cipher = plain ^ (r >> 8) as u8;
            r = (cipher as u16)
                .wrapping_add(r)
                .wrapping_mul(C1)
                .wrapping_add(C2);
            cipher
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ciphertext() {
        // four zero bytes followed by "0 500 hsbw" (139 247 136 13)
        let encrypted = encrypt_charstring(&[139, 247, 136, 13], 4);
        assert_eq!(encrypted.len(), 8);
        // first byte is always key >> 8 for a zero plaintext byte
        assert_eq!(encrypted[0], (CHARSTRING_KEY >> 8) as u8);
        assert_eq!(decrypt_charstring(&encrypted, 4), [139, 247, 136, 13]);
    }

    #[test]
    fn unencrypted() {
        let data = [139, 14];
        assert_eq!(encrypt_charstring(&data, -1), data);
        assert_eq!(decrypt_charstring(&data, -1), data);
    }

    #[test]
    fn decrypt_keeps_all_bytes_without_prefix() {
        let encrypted = encrypt_charstring(&[1, 2, 3], 0);
        assert_eq!(decrypt_charstring(&encrypted, 0), [1, 2, 3]);
    }
}
