use std::str::FromStr;

use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};

use crate::errors::ClientError;

/// Overrides the factory program id (base58).
pub const PROGRAM_ID_ENV: &str = "POTTER_PROGRAM_ID";
/// Overrides the SPL token program id (base58).
pub const TOKEN_PROGRAM_ENV: &str = "POTTER_TOKEN_PROGRAM_ID";

/// Program ids the client derives addresses under and sends instructions to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(with = "pubkey_string")]
    pub program_id: Pubkey,
    #[serde(with = "pubkey_string")]
    pub token_program: Pubkey,
    #[serde(with = "pubkey_string")]
    pub associated_token_program: Pubkey,
    #[serde(with = "pubkey_string")]
    pub metadata_program: Pubkey,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program_id: crate::ID,
            token_program: anchor_spl::token::ID,
            associated_token_program: anchor_spl::associated_token::ID,
            metadata_program: metadata_program_id(),
        }
    }
}

impl ClientConfig {
    /// Defaults, with program ids overridden from the environment when set.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(id) = env_pubkey(PROGRAM_ID_ENV)? {
            config.program_id = id;
        }
        if let Some(id) = env_pubkey(TOKEN_PROGRAM_ENV)? {
            config.token_program = id;
        }
        tracing::debug!(program_id = %config.program_id, token_program = %config.token_program, "loaded client config");
        Ok(config)
    }
}

/// Metaplex Token Metadata program id in this crate's `Pubkey` type.
pub fn metadata_program_id() -> Pubkey {
    Pubkey::new_from_array(mpl_token_metadata::ID.to_bytes())
}

fn env_pubkey(var: &str) -> Result<Option<Pubkey>, ClientError> {
    match std::env::var(var) {
        Ok(value) => parse_pubkey(&value).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ClientError::InvalidConfig(format!("{var}: {e}"))),
    }
}

pub fn parse_pubkey(value: &str) -> Result<Pubkey, ClientError> {
    Pubkey::from_str(value.trim()).map_err(|e| ClientError::InvalidConfig(format!("{value:?}: {e}")))
}

mod pubkey_string {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse_pubkey(&value).map_err(serde::de::Error::custom)
    }
}
