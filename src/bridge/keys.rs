//! Key exchange and payload encryption
//!
//! The app holds one X25519 keypair per bridge channel. Once the wallet
//! returns its own public key, both sides derive the same NaCl box key and
//! every payload in either direction is sealed with a fresh 24-byte nonce.

use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::{Aead, OsRng};
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BridgeError, BridgeResult};
use crate::utils::crypto::random_bytes;
use crate::utils::encoding::{decode_base58, encode_base58};

pub const KEY_LENGTH: usize = 32;
pub const NONCE_LENGTH: usize = 24;

/// Ephemeral keypair generated when the channel is created
pub struct KeyExchangeSession {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyExchangeSession {
    pub fn generate() -> Self {
        let secret = SecretKey::generate(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn public_key(&self) -> [u8; KEY_LENGTH] {
        *self.public.as_bytes()
    }

    pub fn public_key_base58(&self) -> String {
        encode_base58(self.public.as_bytes())
    }

    /// Derive the shared box from the wallet's public key.
    ///
    /// Fails with a protocol error when the key is not 32 bytes or is the
    /// all-zero point.
    pub fn derive_shared(&self, peer_public_key: &[u8]) -> BridgeResult<SharedSecret> {
        let peer: [u8; KEY_LENGTH] = peer_public_key.try_into().map_err(|_| {
            BridgeError::protocol(format!(
                "Malformed wallet public key: expected {} bytes, got {}",
                KEY_LENGTH,
                peer_public_key.len()
            ))
        })?;
        if peer.iter().all(|b| *b == 0) {
            return Err(BridgeError::protocol("Malformed wallet public key: zero point"));
        }

        let peer_key = PublicKey::from(peer);
        Ok(SharedSecret {
            cipher: SalsaBox::new(&peer_key, &self.secret),
            peer,
        })
    }

    /// Same as [`derive_shared`](Self::derive_shared) for a base58 key from a callback
    pub fn derive_shared_base58(&self, peer_public_key: &str) -> BridgeResult<SharedSecret> {
        let bytes = decode_base58(peer_public_key)
            .map_err(|e| BridgeError::protocol(format!("Malformed wallet public key: {}", e.message)))?;
        self.derive_shared(&bytes)
    }
}

/// Base58 nonce and ciphertext as they travel in a URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub nonce: String,
    pub payload: String,
}

/// Symmetric box shared with the connected wallet
pub struct SharedSecret {
    cipher: SalsaBox,
    peer: [u8; KEY_LENGTH],
}

impl SharedSecret {
    pub fn peer_public_key(&self) -> [u8; KEY_LENGTH] {
        self.peer
    }

    /// Seal with a fresh random nonce
    pub fn encrypt(&self, plaintext: &[u8]) -> BridgeResult<([u8; NONCE_LENGTH], Vec<u8>)> {
        let nonce = random_bytes::<NONCE_LENGTH>();
        let ciphertext = self.encrypt_with_nonce(&nonce, plaintext)?;
        Ok((nonce, ciphertext))
    }

    pub fn encrypt_with_nonce(&self, nonce: &[u8; NONCE_LENGTH], plaintext: &[u8]) -> BridgeResult<Vec<u8>> {
        self.cipher
            .encrypt(GenericArray::from_slice(nonce), plaintext)
            .map_err(|_| BridgeError::internal("Payload encryption failed"))
    }

    /// Open a box. Any authentication failure is a protocol error.
    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8]) -> BridgeResult<Vec<u8>> {
        if nonce.len() != NONCE_LENGTH {
            return Err(BridgeError::protocol(format!(
                "Invalid nonce length: expected {}, got {}",
                NONCE_LENGTH,
                nonce.len()
            )));
        }
        self.cipher
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| BridgeError::protocol("Unable to decrypt data"))
    }

    pub fn encrypt_json<T: Serialize>(&self, payload: &T) -> BridgeResult<EncryptedPayload> {
        let plaintext = serde_json::to_vec(payload)?;
        let (nonce, ciphertext) = self.encrypt(&plaintext)?;
        Ok(EncryptedPayload {
            nonce: encode_base58(&nonce),
            payload: encode_base58(&ciphertext),
        })
    }

    /// Decode base58 nonce and data from a callback, open, and parse as JSON
    pub fn decrypt_json<T: DeserializeOwned>(&self, nonce: &str, data: &str) -> BridgeResult<T> {
        let nonce = decode_base58(nonce).map_err(|e| BridgeError::protocol(e.message))?;
        let data = decode_base58(data).map_err(|e| BridgeError::protocol(e.message))?;
        let plaintext = self.decrypt(&nonce, &data)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| BridgeError::protocol(format!("Malformed wallet payload: {}", e)))
    }
}
