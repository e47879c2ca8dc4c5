//! Collateral program account decoding
//!
//! Anchor accounts start with the first 8 bytes of
//! `sha256("account:<Name>")`. Only the leading fields this client reads
//! are decoded; trailing data is ignored.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::{BridgeError, BridgeResult};
use crate::utils::crypto::sha256;

pub const COLLATERAL_ACCOUNT: &str = "Collateral";
pub const ADMIN_SIGNATURES_ACCOUNT: &str = "CollateralAdminSignatures";

pub fn account_discriminator(name: &str) -> [u8; 8] {
    let hash = sha256(format!("account:{}", name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

fn account_body<'a>(name: &str, data: &'a [u8]) -> BridgeResult<&'a [u8]> {
    if data.len() < 8 || data[..8] != account_discriminator(name) {
        return Err(BridgeError::chain(format!("Account is not a {} account", name)));
    }
    Ok(&data[8..])
}

fn with_discriminator<T: BorshSerialize>(name: &str, value: &T) -> BridgeResult<Vec<u8>> {
    let mut data = account_discriminator(name).to_vec();
    data.extend(borsh::to_vec(value)?);
    Ok(data)
}

#[derive(BorshSerialize, BorshDeserialize)]
struct CollateralLayout {
    coordinator: [u8; 32],
    admin_funds_nonce: u32,
}

/// Fields of the collateral account the withdrawal needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollateralAccount {
    /// Verifying address of the coordinator domain
    pub coordinator: Pubkey,
    /// Nonce admin signatures must target
    pub admin_funds_nonce: u32,
}

impl CollateralAccount {
    pub fn decode(data: &[u8]) -> BridgeResult<Self> {
        let mut body = account_body(COLLATERAL_ACCOUNT, data)?;
        let layout = CollateralLayout::deserialize(&mut body)
            .map_err(|e| BridgeError::chain(format!("Malformed Collateral account: {}", e)))?;
        Ok(Self {
            coordinator: Pubkey::new_from_array(layout.coordinator),
            admin_funds_nonce: layout.admin_funds_nonce,
        })
    }

    pub fn encode(&self) -> BridgeResult<Vec<u8>> {
        with_discriminator(
            COLLATERAL_ACCOUNT,
            &CollateralLayout {
                coordinator: self.coordinator.to_bytes(),
                admin_funds_nonce: self.admin_funds_nonce,
            },
        )
    }
}

#[derive(BorshSerialize, BorshDeserialize)]
struct AdminSignaturesLayout {
    signers: Vec<[u8; 32]>,
}

/// Admin signature record: who has already signed this withdraw message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminSignaturesAccount {
    pub signers: Vec<Pubkey>,
}

impl AdminSignaturesAccount {
    pub fn decode(data: &[u8]) -> BridgeResult<Self> {
        let mut body = account_body(ADMIN_SIGNATURES_ACCOUNT, data)?;
        let layout = AdminSignaturesLayout::deserialize(&mut body).map_err(|e| {
            BridgeError::chain(format!("Malformed CollateralAdminSignatures account: {}", e))
        })?;
        Ok(Self {
            signers: layout.signers.into_iter().map(Pubkey::new_from_array).collect(),
        })
    }

    pub fn encode(&self) -> BridgeResult<Vec<u8>> {
        with_discriminator(
            ADMIN_SIGNATURES_ACCOUNT,
            &AdminSignaturesLayout {
                signers: self.signers.iter().map(|k| k.to_bytes()).collect(),
            },
        )
    }

    pub fn has_signer(&self, signer: &Pubkey) -> bool {
        self.signers.contains(signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collateral_decode_ignores_trailing_fields() {
        let account = CollateralAccount {
            coordinator: Pubkey::new_unique(),
            admin_funds_nonce: 7,
        };
        let mut data = account.encode().unwrap();
        data.extend_from_slice(&[0xaa; 64]);

        assert_eq!(CollateralAccount::decode(&data).unwrap(), account);
    }

    #[test]
    fn test_wrong_discriminator() {
        let record = AdminSignaturesAccount::default().encode().unwrap();
        let err = CollateralAccount::decode(&record).unwrap_err();
        assert!(err.is_chain());

        assert!(CollateralAccount::decode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_admin_signers() {
        let signer = Pubkey::new_unique();
        let record = AdminSignaturesAccount {
            signers: vec![Pubkey::new_unique(), signer],
        };
        let decoded = AdminSignaturesAccount::decode(&record.encode().unwrap()).unwrap();
        assert!(decoded.has_signer(&signer));
        assert!(!decoded.has_signer(&Pubkey::new_unique()));
    }

    #[test]
    fn test_truncated_record() {
        let mut data = account_discriminator(ADMIN_SIGNATURES_ACCOUNT).to_vec();
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[1u8; 32]);
        assert!(AdminSignaturesAccount::decode(&data).is_err());
    }
}
