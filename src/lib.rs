//! Mnemonic phrase to secp256k1 key pair.
//!
//! Runs the three BIP steps in order: mnemonic -> seed (BIP-39), seed ->
//! master key (BIP-32), master key -> child key along a derivation path
//! (`m/44'/0'/0'/0/0` by default, BIP-44).

pub mod derivation;
pub mod error;
pub mod mnemonic;
pub mod path;

pub use derivation::{ExtendedKey, Network};
pub use error::{Error, Result};
pub use mnemonic::{Mnemonic, MnemonicLen, Seed};
pub use path::{ChildNumber, DerivationPath, DEFAULT_PATH};

/// Mnemonic -> seed. With `validate` unset the phrase is stretched as-is,
/// without word list or checksum checks.
pub fn seed_from_input(phrase: &str, passphrase: &str, validate: bool) -> Result<Seed> {
    if validate {
        let mnemonic = Mnemonic::from_phrase(phrase)?;
        tracing::info!(words = mnemonic.word_count(), "mnemonic validated");
        mnemonic.to_seed(passphrase)
    } else {
        tracing::warn!("skipping mnemonic validation");
        Seed::from_phrase_unchecked(phrase, passphrase)
    }
}

/// Seed -> master key -> child key at `path`.
pub fn derive_key_pair(seed: &Seed, path: &DerivationPath) -> Result<ExtendedKey> {
    let key = ExtendedKey::derive_from_path(seed, path)?;
    tracing::info!(%path, "derived key pair");
    Ok(key)
}
