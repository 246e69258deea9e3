use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub const HARDENED_BIT: u32 = 1 << 31;
const MAX_DEPTH: usize = u8::MAX as usize;

/// BIP-44 path for the first Bitcoin receiving key.
pub const DEFAULT_PATH: &str = "m/44'/0'/0'/0/0";

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ChildNumber(u32);

impl ChildNumber {
    pub fn hardened(index: u32) -> Result<Self> {
        Self::check_index(index)?;
        Ok(ChildNumber(index | HARDENED_BIT))
    }

    pub fn normal(index: u32) -> Result<Self> {
        Self::check_index(index)?;
        Ok(ChildNumber(index))
    }

    pub fn is_hardened(&self) -> bool {
        self.0 & HARDENED_BIT == HARDENED_BIT
    }

    /// Index without the hardened bit.
    pub fn index(&self) -> u32 {
        self.0 & !HARDENED_BIT
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    fn check_index(index: u32) -> Result<()> {
        if index >= HARDENED_BIT {
            return Err(Error::InvalidPath(format!("index {index} out of range")));
        }
        Ok(())
    }
}

impl From<ChildNumber> for u32 {
    fn from(child: ChildNumber) -> u32 {
        child.0
    }
}

impl FromStr for ChildNumber {
    type Err = Error;

    fn from_str(input: &str) -> Result<ChildNumber> {
        let (digits, hardened) = match input.strip_suffix(['\'', 'h', 'H']) {
            Some(stripped) => (stripped, true),
            None => (input, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPath(format!("bad component {input:?}")));
        }
        let index: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidPath(format!("index {digits} out of range")))?;

        if hardened {
            ChildNumber::hardened(index)
        } else {
            ChildNumber::normal(index)
        }
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hardened() {
            write!(f, "{}'", self.index())
        } else {
            write!(f, "{}", self.index())
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DerivationPath {
    path: Vec<ChildNumber>,
}

impl DerivationPath {
    pub fn default_bip44() -> Self {
        DerivationPath {
            path: vec![
                ChildNumber(44 | HARDENED_BIT),
                ChildNumber(HARDENED_BIT),
                ChildNumber(HARDENED_BIT),
                ChildNumber(0),
                ChildNumber(0),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChildNumber> {
        self.path.iter()
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(path: &str) -> Result<DerivationPath> {
        let mut parts = path.trim().split('/');

        if parts.next() != Some("m") {
            return Err(Error::InvalidPath("path must start with 'm'".into()));
        }

        let path = parts.map(str::parse).collect::<Result<Vec<ChildNumber>>>()?;
        if path.len() > MAX_DEPTH {
            return Err(Error::DepthOverflow);
        }

        Ok(DerivationPath { path })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for child in &self.path {
            write!(f, "/{child}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_matches_constant() {
        let parsed: DerivationPath = DEFAULT_PATH.parse().unwrap();
        assert_eq!(parsed, DerivationPath::default_bip44());
        assert_eq!(parsed.to_string(), DEFAULT_PATH);
    }

    #[test]
    fn hardened_markers() {
        let a: DerivationPath = "m/44'/0h/1H".parse().unwrap();
        let children: Vec<u32> = a.iter().map(|c| u32::from(*c)).collect();
        assert_eq!(children, vec![44 | HARDENED_BIT, HARDENED_BIT, 1 | HARDENED_BIT]);
        assert_eq!(a.to_string(), "m/44'/0'/1'");
    }

    #[test]
    fn master_only() {
        let path: DerivationPath = "m".parse().unwrap();
        assert!(path.is_empty());
        assert_eq!(path.to_string(), "m");
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "44'/0'", "M/0", "m/", "m//0", "m/-1", "m/+1", "m/0''", "m/x", "m/2147483648"] {
            assert!(bad.parse::<DerivationPath>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn index_boundary() {
        let c: ChildNumber = "2147483647'".parse().unwrap();
        assert!(c.is_hardened());
        assert_eq!(c.index(), HARDENED_BIT - 1);
        assert!(ChildNumber::normal(HARDENED_BIT).is_err());
    }

    #[test]
    fn depth_limit() {
        let long = format!("m{}", "/0".repeat(256));
        assert!(matches!(long.parse::<DerivationPath>(), Err(Error::DepthOverflow)));
        let max = format!("m{}", "/0".repeat(255));
        assert_eq!(max.parse::<DerivationPath>().unwrap().len(), 255);
    }
}
