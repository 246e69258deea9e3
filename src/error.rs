use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Wrong word count or malformed phrase
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("unknown word {word:?} at position {position}")]
    UnknownWord { word: String, position: usize },

    #[error("mnemonic checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid entropy length: {0} bytes")]
    InvalidEntropy(usize),

    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    /// Master IL is zero or >= n; the seed cannot be used
    #[error("seed yields an invalid master key")]
    InvalidMasterKey,

    /// IL >= n or a zero child key, see BIP-32 "Private parent key -> private child key"
    #[error("derived key at index {0} is invalid")]
    InvalidChildKey(u32),

    #[error("derivation depth exceeds 255")]
    DepthOverflow,

    #[error("cryptographic error: {0}")]
    Crypto(String),
}

impl From<secp256k1::Error> for Error {
    fn from(err: secp256k1::Error) -> Self {
        Error::Crypto(err.to_string())
    }
}

impl From<hmac::digest::InvalidLength> for Error {
    fn from(err: hmac::digest::InvalidLength) -> Self {
        Error::Crypto(err.to_string())
    }
}
