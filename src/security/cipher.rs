use crate::error::CipherError;
use chacha20poly1305::{
    ChaCha20Poly1305, Key, KeyInit, Nonce, Tag,
    aead::{AeadInPlace, OsRng, rand_core::RngCore},
};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const FIELD_SEPARATOR: char = ':';
const KDF_SALT: &[u8] = b"software-architect/content-cipher/v1";

/// PBKDF2-HMAC-SHA256 rounds used for installation keys.
pub const KDF_ROUNDS: u32 = 100_000;

/// ChaCha20-Poly1305 content cipher with a key fixed at construction.
///
/// Records are `hex(nonce):hex(tag):hex(ciphertext)`. Every field is lowercase
/// hex, so the separator can never occur inside a field.
pub struct ContentCipher {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl fmt::Debug for ContentCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentCipher")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl ContentCipher {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Derive the key for this installation (host, user, home directory).
    ///
    /// The same installation always derives the same key; nothing is written to disk.
    pub fn from_installation() -> Self {
        let secret = installation_secret();
        Self::derive(secret.as_bytes(), KDF_ROUNDS)
    }

    pub fn derive(secret: &[u8], rounds: u32) -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2::pbkdf2_hmac::<Sha256>(secret, KDF_SALT, rounds, key.as_mut_slice());
        Self { key }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(self.key.as_slice()));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(nonce, b"", &mut buffer)
            .map_err(|_| CipherError::Format("plaintext rejected by cipher".into()))?;

        Ok(format!(
            "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
            hex::encode(nonce_bytes),
            hex::encode(tag),
            hex::encode(buffer)
        ))
    }

    pub fn decrypt(&self, record: &str) -> Result<Vec<u8>, CipherError> {
        let fields: Vec<&str> = record.trim_end().split(FIELD_SEPARATOR).collect();
        let [nonce_hex, tag_hex, body_hex] = fields.as_slice() else {
            return Err(CipherError::Format(format!(
                "expected 3 fields, found {}",
                fields.len()
            )));
        };

        let nonce_bytes = decode_field("nonce", nonce_hex, Some(NONCE_LEN))?;
        let tag_bytes = decode_field("tag", tag_hex, Some(TAG_LEN))?;
        let mut body = decode_field("ciphertext", body_hex, None)?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(self.key.as_slice()));
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&nonce_bytes),
                b"",
                &mut body,
                Tag::from_slice(&tag_bytes),
            )
            .map_err(|_| CipherError::Integrity)?;

        Ok(body)
    }
}

fn decode_field(name: &str, field: &str, width: Option<usize>) -> Result<Vec<u8>, CipherError> {
    if let Some(width) = width
        && field.len() != width * 2
    {
        return Err(CipherError::Format(format!(
            "{name} field has {} hex chars, expected {}",
            field.len(),
            width * 2
        )));
    }
    hex::decode(field).map_err(|e| CipherError::Format(format!("{name} field: {e}")))
}

fn installation_secret() -> Zeroizing<String> {
    let host = hostname::get().map_or_else(
        |_| "unknown-host".to_string(),
        |h| h.to_string_lossy().into_owned(),
    );
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".to_string());
    let home = directories::UserDirs::new()
        .map(|u| u.home_dir().display().to_string())
        .unwrap_or_default();
    Zeroizing::new(format!("{host}\0{user}\0{home}"))
}

/// How blobs are represented on disk.
#[derive(Debug, Clone)]
pub enum AtRest {
    Plaintext,
    Encrypted(Arc<ContentCipher>),
}

impl AtRest {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }

    pub fn seal(&self, text: &str) -> Result<Vec<u8>, CipherError> {
        match self {
            Self::Plaintext => Ok(text.as_bytes().to_vec()),
            Self::Encrypted(cipher) => cipher.encrypt(text.as_bytes()).map(String::into_bytes),
        }
    }

    pub fn open(&self, raw: Vec<u8>) -> Result<String, CipherError> {
        let bytes = match self {
            Self::Plaintext => raw,
            Self::Encrypted(cipher) => {
                let record = std::str::from_utf8(&raw)
                    .map_err(|_| CipherError::Format("record is not valid UTF-8".into()))?;
                cipher.decrypt(record)?
            }
        };
        String::from_utf8(bytes)
            .map_err(|_| CipherError::Format("decrypted content is not valid UTF-8".into()))
    }
}

#[cfg(test)]
#[path = "cipher_tests.rs"]
mod tests;
