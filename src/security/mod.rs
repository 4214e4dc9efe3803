pub mod cipher;

pub use cipher::{AtRest, ContentCipher, KDF_ROUNDS};
