//! Program-derived addresses.
//!
//! Every seed tag the factory program uses is defined here and nowhere else.
//! Token indices are encoded as 8-byte little-endian `u64`, exactly as the
//! program's `token_count.to_le_bytes()` seeds.

use anchor_lang::prelude::Pubkey;

use crate::config::ClientConfig;
use crate::errors::ClientError;

pub const FACTORY_SEED: &[u8] = b"factory";
pub const TOKEN_SEED: &[u8] = b"token";
pub const WHITELIST_SEED: &[u8] = b"whitelist";
pub const MINT_AUTHORITY_SEED: &[u8] = b"mint_authority";
pub const METADATA_SEED: &[u8] = b"metadata";

/// Per-seed byte limit enforced by the runtime.
pub const MAX_SEED_LEN: usize = 32;
/// Seed count limit, including the bump seed appended during the search.
pub const MAX_SEEDS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Derived {
    pub address: Pubkey,
    pub bump: u8,
}

/// Generic derivation with seed validation.
pub fn derive(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Derived, ClientError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(ClientError::TooManySeeds { count: seeds.len(), max: MAX_SEEDS - 1 });
    }
    if let Some((index, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(ClientError::SeedTooLong { index, len: seed.len(), max: MAX_SEED_LEN });
    }
    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, bump)| Derived { address, bump })
        .ok_or(ClientError::NoViableBump)
}

/// Seeds below are fixed-size and always valid, so the lookups are infallible.
fn find(seeds: &[&[u8]], program_id: &Pubkey) -> Derived {
    let (address, bump) = Pubkey::find_program_address(seeds, program_id);
    Derived { address, bump }
}

/// Address derivation bound to one set of program ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deriver {
    config: ClientConfig,
}

impl Deriver {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn factory(&self, authority: &Pubkey) -> Derived {
        find(&[FACTORY_SEED, authority.as_ref()], &self.config.program_id)
    }

    pub fn token(&self, authority: &Pubkey, index: u64) -> Derived {
        find(&[TOKEN_SEED, authority.as_ref(), &index.to_le_bytes()], &self.config.program_id)
    }

    pub fn whitelist(&self, authority: &Pubkey, index: u64) -> Derived {
        find(&[WHITELIST_SEED, authority.as_ref(), &index.to_le_bytes()], &self.config.program_id)
    }

    pub fn mint_authority(&self, authority: &Pubkey) -> Derived {
        find(&[MINT_AUTHORITY_SEED, authority.as_ref()], &self.config.program_id)
    }

    /// Metaplex metadata account, derived under the metadata program.
    pub fn metadata(&self, mint: &Pubkey) -> Derived {
        let program = self.config.metadata_program;
        find(&[METADATA_SEED, program.as_ref(), mint.as_ref()], &program)
    }

    /// Associated token account for `(owner, mint)` under the configured token program.
    pub fn associated_token(&self, owner: &Pubkey, mint: &Pubkey) -> Derived {
        find(
            &[owner.as_ref(), self.config.token_program.as_ref(), mint.as_ref()],
            &self.config.associated_token_program,
        )
    }
}

impl Default for Deriver {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}
