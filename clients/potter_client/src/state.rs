use anchor_lang::prelude::*;
use rust_decimal::Decimal;

use crate::amount;
use crate::errors::ClientError;

/// Anchor account discriminator length.
pub const DISCRIMINATOR_LEN: usize = 8;

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_SYMBOL_LEN: usize = 10;
pub const MAX_URI_LEN: usize = 200;

/// One factory per authority.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenFactory {
    pub authority: Pubkey,  // 32 bytes
    pub token_count: u64,   // 8 bytes
}

impl TokenFactory {
    /// `sha256("account:TokenFactory")[..8]`
    pub const DISCRIMINATOR: [u8; 8] = [141, 137, 182, 40, 200, 4, 141, 180];

    pub const SIZE: usize = DISCRIMINATOR_LEN +
        32 +                              // authority
        8;                                // token_count
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenData {
    pub authority: Pubkey,                // 32 bytes
    pub mint: Pubkey,                     // 32 bytes
    pub total_supply: u64,                // 8 bytes, raw units
    pub decimals: u8,                     // 1 byte
    pub name: String,                     // 4 + up to 32 bytes
    pub symbol: String,                   // 4 + up to 10 bytes
    pub uri: String,                      // 4 + up to 200 bytes
    pub is_paused: bool,                  // 1 byte - blocks transfers
    pub is_minting_paused: bool,          // 1 byte - blocks mint/burn
}

impl TokenData {
    /// `sha256("account:TokenData")[..8]`
    pub const DISCRIMINATOR: [u8; 8] = [10, 136, 199, 13, 59, 103, 129, 70];

    pub const SIZE: usize = DISCRIMINATOR_LEN +
        32 +                              // authority
        32 +                              // mint
        8 +                               // total_supply
        1 +                               // decimals
        4 + MAX_NAME_LEN +                // name
        4 + MAX_SYMBOL_LEN +              // symbol
        4 + MAX_URI_LEN +                 // uri
        1 +                               // is_paused
        1;                                // is_minting_paused

    /// Total supply as an exact human amount.
    pub fn human_supply(&self) -> std::result::Result<Decimal, ClientError> {
        amount::to_human(self.total_supply, self.decimals)
    }
}

/// Permitted transfer destinations, kept in insertion order for display.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Whitelist {
    pub addresses: Vec<Pubkey>,
}

impl Whitelist {
    /// `sha256("account:Whitelist")[..8]`
    pub const DISCRIMINATOR: [u8; 8] = [204, 176, 52, 79, 146, 121, 54, 247];

    /// Space the program allocates for a list of `capacity` entries.
    pub const fn size_for(capacity: usize) -> usize {
        DISCRIMINATOR_LEN + 4 + 32 * capacity
    }

    pub fn contains(&self, address: &Pubkey) -> bool {
        self.addresses.contains(address)
    }
}

/// Anchor account layout: discriminator followed by the Borsh body.
pub trait LedgerAccount: AnchorSerialize + AnchorDeserialize {
    const NAME: &'static str;
    const ACCOUNT_DISCRIMINATOR: [u8; 8];

    /// Decodes account data. Trailing bytes (unused allocated space) are ignored.
    fn decode(data: &[u8]) -> std::result::Result<Self, ClientError> {
        let decode_err = |reason: String| ClientError::AccountDecode { account: Self::NAME, reason };
        if data.len() < DISCRIMINATOR_LEN {
            return Err(decode_err(format!("{} bytes is shorter than the discriminator", data.len())));
        }
        let (discriminator, mut body) = data.split_at(DISCRIMINATOR_LEN);
        if discriminator != Self::ACCOUNT_DISCRIMINATOR {
            return Err(decode_err("discriminator mismatch".to_string()));
        }
        Self::deserialize(&mut body).map_err(|e| decode_err(e.to_string()))
    }

    /// Encodes the account the way the program stores it.
    fn encode(&self) -> std::result::Result<Vec<u8>, ClientError> {
        let mut data = Self::ACCOUNT_DISCRIMINATOR.to_vec();
        self.serialize(&mut data)
            .map_err(|e| ClientError::AccountDecode { account: Self::NAME, reason: e.to_string() })?;
        Ok(data)
    }
}

impl LedgerAccount for TokenFactory {
    const NAME: &'static str = "TokenFactory";
    const ACCOUNT_DISCRIMINATOR: [u8; 8] = Self::DISCRIMINATOR;
}

impl LedgerAccount for TokenData {
    const NAME: &'static str = "TokenData";
    const ACCOUNT_DISCRIMINATOR: [u8; 8] = Self::DISCRIMINATOR;
}

impl LedgerAccount for Whitelist {
    const NAME: &'static str = "Whitelist";
    const ACCOUNT_DISCRIMINATOR: [u8; 8] = Self::DISCRIMINATOR;
}

/// A token record together with where it lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenView {
    pub index: u64,
    pub address: Pubkey,
    pub data: TokenData,
}
