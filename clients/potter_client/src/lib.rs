#![allow(unexpected_cfgs)]

//! Client for the Potter token factory program.
//!
//! Derives the program's addresses, encodes its instructions, converts
//! between human and raw amounts, creates associated token accounts on
//! demand and classifies failures. Ledger reads and wallet signing are
//! supplied by the caller through [`ledger::LedgerReader`] and
//! [`ledger::TransactionSubmitter`].

use anchor_lang::prelude::*;

pub mod amount;
pub mod config;
pub mod ensure;
pub mod errors;
pub mod instructions;
pub mod ledger;
pub mod orchestrator;
pub mod pda;
pub mod state;

pub use config::ClientConfig;
pub use errors::{ClientError, ErrorKind, OperationFailure, Rejection};
pub use instructions::{AmountParams, CreateTokenParams, TokenRef};
pub use orchestrator::{Confirmed, CreatedToken, EnsureOutcome, Orchestrator};

declare_id!("A3jca3XyW52j1aMdpE75affvCtgyN4UwNc1Sn2ahLzo6");
