use bip39::Language;
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::Rng;
use sha2::{Digest, Sha256, Sha512};
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

const PBKDF2_ROUNDS: u32 = 2048;
const SEED_LEN: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mnemonic {
    words: Vec<&'static str>,
}

/// BIP-39 seed. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SEED_LEN]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MnemonicLen {
    M12,
    M15,
    M18,
    M21,
    M24,
}

impl MnemonicLen {
    pub fn from_word_count(count: usize) -> Result<Self> {
        match count {
            12 => Ok(MnemonicLen::M12),
            15 => Ok(MnemonicLen::M15),
            18 => Ok(MnemonicLen::M18),
            21 => Ok(MnemonicLen::M21),
            24 => Ok(MnemonicLen::M24),
            n => Err(Error::InvalidMnemonic(format!(
                "expected 12, 15, 18, 21 or 24 words, got {n}"
            ))),
        }
    }

    pub fn entropy_bits(self) -> usize {
        match self {
            MnemonicLen::M12 => 128,
            MnemonicLen::M15 => 160,
            MnemonicLen::M18 => 192,
            MnemonicLen::M21 => 224,
            MnemonicLen::M24 => 256,
        }
    }
}

impl Mnemonic {
    /// Fresh mnemonic from thread RNG entropy.
    pub fn new(word_len: MnemonicLen) -> Result<Mnemonic> {
        let mut entropy = vec![0u8; word_len.entropy_bits() / 8];
        rand::thread_rng().fill(entropy.as_mut_slice());
        let mnemonic = Self::from_entropy(&entropy);
        entropy.zeroize();
        mnemonic
    }

    pub fn from_entropy(entropy: &[u8]) -> Result<Mnemonic> {
        if !(16..=32).contains(&entropy.len()) || entropy.len() % 4 != 0 {
            return Err(Error::InvalidEntropy(entropy.len()));
        }

        let entropy_bits = entropy.len() * 8;
        let checksum_bits = entropy_bits / 32;
        let checksum = Self::calculate_checksum(entropy, entropy_bits);

        let mut bits: String = entropy.iter().map(|byte| format!("{byte:08b}")).collect();
        bits.push_str(&format!("{:0width$b}", checksum, width = checksum_bits));

        let word_list = Language::English.word_list();
        let mut words = Vec::with_capacity(bits.len() / 11);
        for i in (0..bits.len()).step_by(11) {
            let index = u16::from_str_radix(&bits[i..i + 11], 2)
                .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
            words.push(word_list[index as usize]);
        }
        bits.zeroize();

        Ok(Mnemonic { words })
    }

    /// Parses and validates a phrase against the English word list and its checksum.
    pub fn from_phrase(phrase: &str) -> Result<Mnemonic> {
        let normalized = phrase.nfkd().collect::<String>().to_lowercase();
        let input: Vec<&str> = normalized.split_whitespace().collect();
        let word_len = MnemonicLen::from_word_count(input.len())?;

        let word_list = Language::English.word_list();
        let mut words = Vec::with_capacity(input.len());
        let mut bits = String::with_capacity(input.len() * 11);
        for (position, word) in input.iter().enumerate() {
            let index = word_list
                .iter()
                .position(|w| w == word)
                .ok_or_else(|| Error::UnknownWord {
                    word: word.to_string(),
                    position: position + 1,
                })?;
            words.push(word_list[index]);
            bits.push_str(&format!("{index:011b}"));
        }

        let entropy_bits = word_len.entropy_bits();
        let mut entropy = bits[..entropy_bits]
            .as_bytes()
            .chunks(8)
            .map(|chunk| {
                chunk
                    .iter()
                    .fold(0u8, |acc, bit| (acc << 1) | u8::from(*bit == b'1'))
            })
            .collect::<Vec<u8>>();
        let checksum = u8::from_str_radix(&bits[entropy_bits..], 2)
            .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
        let expected = Self::calculate_checksum(&entropy, entropy_bits);
        entropy.zeroize();
        bits.zeroize();

        if checksum != expected {
            return Err(Error::ChecksumMismatch);
        }

        Ok(Mnemonic { words })
    }

    pub fn words(&self) -> &[&'static str] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn phrase(&self) -> String {
        self.words.join(" ")
    }

    fn calculate_checksum(entropy: &[u8], entropy_bits: usize) -> u8 {
        let hash = Sha256::digest(entropy);
        let checksum_bits = entropy_bits / 32;
        hash[0] >> (8 - checksum_bits)
    }

    pub fn to_seed(&self, passphrase: &str) -> Result<Seed> {
        let mut phrase = self.phrase();
        let seed = Seed::stretch(&phrase, passphrase);
        phrase.zeroize();
        seed
    }
}

impl Seed {
    /// PBKDF2 over the whitespace-normalized phrase, with no word list or
    /// checksum validation.
    pub fn from_phrase_unchecked(phrase: &str, passphrase: &str) -> Result<Seed> {
        let mut normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(Error::InvalidMnemonic("empty phrase".into()));
        }
        let seed = Self::stretch(&normalized, passphrase);
        normalized.zeroize();
        seed
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    /// Phrase and salt are NFKD-normalized before PBKDF2.
    fn stretch(phrase: &str, passphrase: &str) -> Result<Seed> {
        let mut password: String = phrase.nfkd().collect();
        let mut salt: String = "mnemonic".chars().chain(passphrase.nfkd()).collect();
        let mut seed = [0u8; SEED_LEN];
        let result = pbkdf2::<Hmac<Sha512>>(password.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut seed);
        password.zeroize();
        salt.zeroize();
        result?;
        Ok(Seed(seed))
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed(..)")
    }
}
