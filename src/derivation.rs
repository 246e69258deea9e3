use base58::ToBase58;
use hmac::{Hmac, Mac};
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, Scalar};
use ripemd::Ripemd160;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::mnemonic::Seed;
use crate::path::{ChildNumber, DerivationPath};

pub type PrivateKey = [u8; 32];
pub type ChainCode = [u8; 32];
pub type KeyFingerprint = [u8; 4];
type HmacSha512 = Hmac<Sha512>;

const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Network {
    #[default]
    Bitcoin,
    Testnet,
}

impl Network {
    fn xprv_version(self) -> [u8; 4] {
        match self {
            Network::Bitcoin => [0x04, 0x88, 0xAD, 0xE4],
            Network::Testnet => [0x04, 0x35, 0x83, 0x94],
        }
    }

    fn xpub_version(self) -> [u8; 4] {
        match self {
            Network::Bitcoin => [0x04, 0x88, 0xB2, 0x1E],
            Network::Testnet => [0x04, 0x35, 0x87, 0xCF],
        }
    }

    fn p2pkh_version(self) -> u8 {
        match self {
            Network::Bitcoin => 0x00,
            Network::Testnet => 0x6f,
        }
    }
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedKey {
    private_key: PrivateKey,
    attrs: ExtendedKeyAttrs,
}

#[derive(Clone, Debug, Zeroize)]
pub struct ExtendedKeyAttrs {
    pub depth: u8,
    pub parent_fingerprint: KeyFingerprint,
    pub child_number: u32,
    pub chain_code: ChainCode,
}

impl ExtendedKey {
    pub fn master(seed: &Seed) -> Result<ExtendedKey> {
        let mut mac = HmacSha512::new_from_slice(MASTER_HMAC_KEY)?;
        mac.update(seed.as_bytes());
        let (private_key, chain_code) = split_hmac(mac);

        if !is_valid_secret(&private_key) {
            return Err(Error::InvalidMasterKey);
        }

        Ok(ExtendedKey {
            private_key,
            attrs: ExtendedKeyAttrs {
                depth: 0,
                parent_fingerprint: KeyFingerprint::default(),
                child_number: 0,
                chain_code,
            },
        })
    }

    pub fn derive_from_path(seed: &Seed, path: &DerivationPath) -> Result<ExtendedKey> {
        let mut extended_key = Self::master(seed)?;
        for child in path.iter() {
            extended_key = extended_key.derive_child(*child)?;
        }
        tracing::debug!(%path, depth = extended_key.attrs.depth, "derived key from path");
        Ok(extended_key)
    }

    pub fn derive_child(&self, child: ChildNumber) -> Result<ExtendedKey> {
        let depth = self.attrs.depth.checked_add(1).ok_or(Error::DepthOverflow)?;

        let mut mac = HmacSha512::new_from_slice(&self.attrs.chain_code)?;
        if child.is_hardened() {
            mac.update(&[0]);
            mac.update(&self.private_key);
        } else {
            mac.update(&self.public_key()?.serialize());
        }
        mac.update(&child.to_bytes());
        let (mut left, chain_code) = split_hmac(mac);

        let left_scalar = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(&left)));
        left.zeroize();
        let left_scalar = left_scalar.ok_or(Error::InvalidChildKey(child.into()))?;
        let parent_scalar = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(
            &self.private_key,
        )))
        .ok_or_else(|| Error::Crypto("parent key out of range".into()))?;

        let child_scalar = left_scalar + parent_scalar;
        if bool::from(child_scalar.is_zero()) {
            return Err(Error::InvalidChildKey(child.into()));
        }

        tracing::debug!(%child, depth, "derived child key");

        Ok(ExtendedKey {
            private_key: child_scalar.to_bytes().into(),
            attrs: ExtendedKeyAttrs {
                depth,
                parent_fingerprint: self.fingerprint()?,
                child_number: child.into(),
                chain_code,
            },
        })
    }

    pub fn attrs(&self) -> &ExtendedKeyAttrs {
        &self.attrs
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        let secp = Secp256k1::signing_only();
        let secret_key = SecretKey::from_slice(&self.private_key)?;
        Ok(PublicKey::from_secret_key(&secp, &secret_key))
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key)
    }

    /// Compressed SEC1 encoding.
    pub fn public_key_hex(&self) -> Result<String> {
        Ok(hex::encode(self.public_key()?.serialize()))
    }

    pub fn fingerprint(&self) -> Result<KeyFingerprint> {
        let hash = hash160(&self.public_key()?.serialize());
        let mut fingerprint = KeyFingerprint::default();
        fingerprint.copy_from_slice(&hash[..4]);
        Ok(fingerprint)
    }

    pub fn to_xprv(&self, network: Network) -> String {
        let mut key_data = Vec::with_capacity(33);
        key_data.push(0x00);
        key_data.extend_from_slice(&self.private_key);
        let encoded = self.serialize(network.xprv_version(), &key_data);
        key_data.zeroize();
        encoded
    }

    pub fn to_xpub(&self, network: Network) -> Result<String> {
        let public_key = self.public_key()?.serialize();
        Ok(self.serialize(network.xpub_version(), &public_key))
    }

    /// P2PKH address of the compressed public key.
    pub fn address(&self, network: Network) -> Result<String> {
        let mut payload = Vec::with_capacity(21);
        payload.push(network.p2pkh_version());
        payload.extend_from_slice(&hash160(&self.public_key()?.serialize()));
        Ok(base58check(payload))
    }

    fn serialize(&self, version: [u8; 4], key_data: &[u8]) -> String {
        let mut data = Vec::with_capacity(78);
        data.extend_from_slice(&version);
        data.push(self.attrs.depth);
        data.extend_from_slice(&self.attrs.parent_fingerprint);
        data.extend_from_slice(&self.attrs.child_number.to_be_bytes());
        data.extend_from_slice(&self.attrs.chain_code);
        data.extend_from_slice(key_data);
        base58check(data)
    }
}

impl std::fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("depth", &self.attrs.depth)
            .field("child_number", &self.attrs.child_number)
            .finish_non_exhaustive()
    }
}

fn split_hmac(mac: HmacSha512) -> (PrivateKey, ChainCode) {
    let result = mac.finalize().into_bytes();
    let mut left = PrivateKey::default();
    let mut right = ChainCode::default();
    left.copy_from_slice(&result[..32]);
    right.copy_from_slice(&result[32..]);
    (left, right)
}

fn is_valid_secret(key: &PrivateKey) -> bool {
    let scalar = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(key)));
    scalar.is_some_and(|s| !bool::from(s.is_zero()))
}

fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

fn base58check(mut data: Vec<u8>) -> String {
    let checksum = Sha256::digest(Sha256::digest(&data));
    data.extend_from_slice(&checksum[..4]);
    let encoded = data.to_base58();
    data.zeroize();
    encoded
}
