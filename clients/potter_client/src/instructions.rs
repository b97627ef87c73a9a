//! Instruction encoding for every factory/token lifecycle operation.
//!
//! Data is the Anchor layout: `sha256("global:<name>")[..8]` followed by the
//! Borsh-encoded arguments. Account order mirrors each instruction's
//! `#[derive(Accounts)]` struct in the program.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::solana_program::sysvar;
use rust_decimal::Decimal;

use crate::amount;
use crate::errors::ClientError;
use crate::pda::Deriver;
use crate::state::{TokenData, MAX_NAME_LEN, MAX_SYMBOL_LEN, MAX_URI_LEN};

/// Instruction arguments with their Anchor discriminator.
pub trait ProgramInstruction: AnchorSerialize {
    const NAME: &'static str;
    const DISCRIMINATOR: [u8; 8];

    fn data(&self) -> std::result::Result<Vec<u8>, ClientError> {
        let mut data = Self::DISCRIMINATOR.to_vec();
        self.serialize(&mut data)
            .map_err(|e| ClientError::Encode { instruction: Self::NAME, reason: e.to_string() })?;
        Ok(data)
    }
}

macro_rules! program_instruction {
    ($args:ty, $name:literal, $disc:expr) => {
        impl ProgramInstruction for $args {
            const NAME: &'static str = $name;
            const DISCRIMINATOR: [u8; 8] = $disc;
        }
    };
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateFactory {}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateToken {
    pub total_supply: u64,
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub default_address: Pubkey,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct MintTokens {
    pub token_count: u64,
    pub amount: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct BurnTokens {
    pub token_count: u64,
    pub amount: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransferToken {
    pub token_count: u64,
    pub amount: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct AddToWhitelist {
    pub token_count: u64,
    pub addresses: Vec<Pubkey>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RemoveFromWhitelist {
    pub token_count: u64,
    pub addresses: Vec<Pubkey>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct PauseMinting {
    pub token_count: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct PauseToken {
    pub token_count: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransferAuthority {
    pub token_count: u64,
    pub new_authority: Pubkey,
}

program_instruction!(CreateFactory, "create_factory", [11, 88, 70, 244, 56, 177, 41, 170]);
program_instruction!(CreateToken, "create_token", [84, 52, 204, 228, 24, 140, 234, 75]);
program_instruction!(MintTokens, "mint_tokens", [59, 132, 24, 246, 122, 39, 8, 243]);
program_instruction!(BurnTokens, "burn_tokens", [76, 15, 51, 254, 229, 215, 121, 66]);
program_instruction!(TransferToken, "transfer_token", [219, 17, 122, 53, 237, 171, 232, 222]);
program_instruction!(AddToWhitelist, "add_to_whitelist", [157, 211, 52, 54, 144, 81, 5, 55]);
program_instruction!(RemoveFromWhitelist, "remove_from_whitelist", [7, 144, 216, 239, 243, 236, 193, 235]);
program_instruction!(PauseMinting, "pause_minting", [15, 247, 181, 3, 81, 145, 229, 68]);
program_instruction!(PauseToken, "pause_token", [226, 150, 72, 211, 159, 51, 226, 39]);
program_instruction!(TransferAuthority, "transfer_authority", [48, 169, 76, 72, 229, 180, 55, 161]);

/// Identifies a token record: the authority whose factory created it and its index.
///
/// `authority` is the creating authority and only ever seeds addresses. The
/// record's current authority, which signs gated instructions, lives in
/// [`TokenData::authority`] and moves with `transfer_authority`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TokenRef {
    pub authority: Pubkey,
    pub index: u64,
}

impl TokenRef {
    pub fn new(authority: Pubkey, index: u64) -> Self {
        Self { authority, index }
    }
}

/// Validated `create_token` input. Lengths are checked in bytes, as the program does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateTokenParams {
    pub raw_supply: u64,
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub initial_whitelisted: Pubkey,
    /// Fresh mint keypair's public key; it co-signs the transaction.
    pub mint: Pubkey,
}

impl CreateTokenParams {
    pub fn new(
        total_supply: Decimal,
        decimals: u8,
        name: impl Into<String>,
        symbol: impl Into<String>,
        uri: impl Into<String>,
        initial_whitelisted: Pubkey,
        mint: Pubkey,
    ) -> std::result::Result<Self, ClientError> {
        let (name, symbol, uri) = (name.into(), symbol.into(), uri.into());
        if name.len() > MAX_NAME_LEN {
            return Err(ClientError::NameTooLong { len: name.len(), max: MAX_NAME_LEN });
        }
        if symbol.len() > MAX_SYMBOL_LEN {
            return Err(ClientError::SymbolTooLong { len: symbol.len(), max: MAX_SYMBOL_LEN });
        }
        if uri.len() > MAX_URI_LEN {
            return Err(ClientError::UriTooLong { len: uri.len(), max: MAX_URI_LEN });
        }
        let raw_supply = amount::to_raw(total_supply, decimals)?;
        Ok(Self { raw_supply, decimals, name, symbol, uri, initial_whitelisted, mint })
    }
}

/// Amount-carrying operation input (mint, burn, transfer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmountParams {
    pub token: TokenRef,
    pub amount: Decimal,
}

impl AmountParams {
    pub fn new(token: TokenRef, amount: Decimal) -> std::result::Result<Self, ClientError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ClientError::AmountOverflow);
        }
        Ok(Self { token, amount })
    }

    /// Scales to raw units; zero is rejected since it would only fail on-chain.
    pub fn raw(&self, decimals: u8) -> std::result::Result<u64, ClientError> {
        match amount::to_raw(self.amount, decimals)? {
            0 => Err(ClientError::InvalidAmount(format!("{} scales to zero", self.amount))),
            raw => Ok(raw),
        }
    }
}

/// Builds fully-addressed instructions. Pure: no ledger access.
#[derive(Clone, Copy, Debug, Default)]
pub struct InstructionBuilder {
    deriver: Deriver,
}

impl InstructionBuilder {
    pub fn new(deriver: Deriver) -> Self {
        Self { deriver }
    }

    pub fn deriver(&self) -> &Deriver {
        &self.deriver
    }

    fn instruction<A: ProgramInstruction>(
        &self,
        args: &A,
        accounts: Vec<AccountMeta>,
    ) -> std::result::Result<Instruction, ClientError> {
        Ok(Instruction { program_id: self.deriver.config().program_id, accounts, data: args.data()? })
    }

    pub fn create_factory(&self, authority: &Pubkey) -> std::result::Result<Instruction, ClientError> {
        let factory = self.deriver.factory(authority).address;
        self.instruction(
            &CreateFactory {},
            vec![
                AccountMeta::new(factory, false),
                AccountMeta::new(*authority, true),
                AccountMeta::new_readonly(anchor_lang::system_program::ID, false),
            ],
        )
    }

    /// `token_count` must be the factory's count as freshly read from the ledger.
    pub fn create_token(
        &self,
        authority: &Pubkey,
        token_count: u64,
        params: &CreateTokenParams,
    ) -> std::result::Result<Instruction, ClientError> {
        let config = self.deriver.config();
        let accounts = vec![
            AccountMeta::new(self.deriver.factory(authority).address, false),
            AccountMeta::new(self.deriver.token(authority, token_count).address, false),
            AccountMeta::new(self.deriver.whitelist(authority, token_count).address, false),
            AccountMeta::new(params.mint, true),
            AccountMeta::new_readonly(self.deriver.mint_authority(authority).address, false),
            AccountMeta::new(self.deriver.associated_token(authority, &params.mint).address, false),
            AccountMeta::new(self.deriver.metadata(&params.mint).address, false),
            AccountMeta::new(*authority, true),
            AccountMeta::new_readonly(anchor_lang::system_program::ID, false),
            AccountMeta::new_readonly(config.token_program, false),
            AccountMeta::new_readonly(config.associated_token_program, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(config.metadata_program, false),
        ];
        let args = CreateToken {
            total_supply: params.raw_supply,
            decimals: params.decimals,
            name: params.name.clone(),
            symbol: params.symbol.clone(),
            uri: params.uri.clone(),
            default_address: params.initial_whitelisted,
        };
        self.instruction(&args, accounts)
    }

    pub fn mint_tokens(
        &self,
        token: &TokenRef,
        data: &TokenData,
        raw_amount: u64,
        destination_owner: &Pubkey,
    ) -> std::result::Result<Instruction, ClientError> {
        let accounts = vec![
            AccountMeta::new(self.deriver.token(&token.authority, token.index).address, false),
            AccountMeta::new(data.mint, false),
            AccountMeta::new_readonly(self.deriver.mint_authority(&token.authority).address, false),
            AccountMeta::new(self.deriver.associated_token(destination_owner, &data.mint).address, false),
            AccountMeta::new_readonly(data.authority, true),
            AccountMeta::new_readonly(self.deriver.config().token_program, false),
        ];
        self.instruction(&MintTokens { token_count: token.index, amount: raw_amount }, accounts)
    }

    pub fn burn_tokens(
        &self,
        token: &TokenRef,
        data: &TokenData,
        raw_amount: u64,
        source_owner: &Pubkey,
    ) -> std::result::Result<Instruction, ClientError> {
        let accounts = vec![
            AccountMeta::new(self.deriver.token(&token.authority, token.index).address, false),
            AccountMeta::new(data.mint, false),
            AccountMeta::new(self.deriver.associated_token(source_owner, &data.mint).address, false),
            AccountMeta::new_readonly(data.authority, true),
            AccountMeta::new_readonly(self.deriver.config().token_program, false),
        ];
        self.instruction(&BurnTokens { token_count: token.index, amount: raw_amount }, accounts)
    }

    /// Whitelist membership of `to_owner` is enforced by the program, not here.
    pub fn transfer_token(
        &self,
        token: &TokenRef,
        data: &TokenData,
        raw_amount: u64,
        from_owner: &Pubkey,
        to_owner: &Pubkey,
    ) -> std::result::Result<Instruction, ClientError> {
        let accounts = vec![
            AccountMeta::new_readonly(token.authority, false),
            AccountMeta::new_readonly(self.deriver.token(&token.authority, token.index).address, false),
            AccountMeta::new_readonly(self.deriver.whitelist(&token.authority, token.index).address, false),
            AccountMeta::new(self.deriver.associated_token(from_owner, &data.mint).address, false),
            AccountMeta::new(self.deriver.associated_token(to_owner, &data.mint).address, false),
            AccountMeta::new_readonly(*from_owner, true),
            AccountMeta::new_readonly(self.deriver.config().token_program, false),
        ];
        self.instruction(&TransferToken { token_count: token.index, amount: raw_amount }, accounts)
    }

    fn whitelist_accounts(&self, token: &TokenRef, authority: &Pubkey) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.deriver.token(&token.authority, token.index).address, false),
            AccountMeta::new(self.deriver.whitelist(&token.authority, token.index).address, false),
            AccountMeta::new(*authority, true),
            AccountMeta::new_readonly(anchor_lang::system_program::ID, false),
        ]
    }

    /// `None` for an empty batch: there is nothing to send.
    pub fn add_to_whitelist(
        &self,
        token: &TokenRef,
        authority: &Pubkey,
        addresses: &[Pubkey],
    ) -> std::result::Result<Option<Instruction>, ClientError> {
        let addresses = dedup(addresses);
        if addresses.is_empty() {
            return Ok(None);
        }
        let args = AddToWhitelist { token_count: token.index, addresses };
        self.instruction(&args, self.whitelist_accounts(token, authority)).map(Some)
    }

    /// `None` for an empty batch: there is nothing to send.
    pub fn remove_from_whitelist(
        &self,
        token: &TokenRef,
        authority: &Pubkey,
        addresses: &[Pubkey],
    ) -> std::result::Result<Option<Instruction>, ClientError> {
        let addresses = dedup(addresses);
        if addresses.is_empty() {
            return Ok(None);
        }
        let args = RemoveFromWhitelist { token_count: token.index, addresses };
        self.instruction(&args, self.whitelist_accounts(token, authority)).map(Some)
    }

    fn flag_accounts(&self, token: &TokenRef, authority: &Pubkey) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.deriver.token(&token.authority, token.index).address, false),
            AccountMeta::new_readonly(*authority, true),
        ]
    }

    /// Flips `is_minting_paused`.
    pub fn pause_minting(&self, token: &TokenRef, authority: &Pubkey) -> std::result::Result<Instruction, ClientError> {
        self.instruction(&PauseMinting { token_count: token.index }, self.flag_accounts(token, authority))
    }

    /// Flips `is_paused`.
    pub fn pause_token(&self, token: &TokenRef, authority: &Pubkey) -> std::result::Result<Instruction, ClientError> {
        self.instruction(&PauseToken { token_count: token.index }, self.flag_accounts(token, authority))
    }

    pub fn transfer_authority(
        &self,
        token: &TokenRef,
        authority: &Pubkey,
        new_authority: &Pubkey,
    ) -> std::result::Result<Instruction, ClientError> {
        let args = TransferAuthority { token_count: token.index, new_authority: *new_authority };
        self.instruction(&args, self.flag_accounts(token, authority))
    }
}

/// Drops repeated addresses, keeping first occurrences in order.
fn dedup(addresses: &[Pubkey]) -> Vec<Pubkey> {
    let mut unique = Vec::with_capacity(addresses.len());
    for address in addresses {
        if !unique.contains(address) {
            unique.push(*address);
        }
    }
    unique
}
