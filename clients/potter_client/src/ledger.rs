//! Capabilities the client consumes: reading account bytes and signing +
//! submitting transactions. Transport and wallet live behind these traits.

use std::sync::Arc;

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use async_trait::async_trait;

use crate::errors::Rejection;

/// Base58 transaction signature as returned by the ledger.
pub type Signature = String;

#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Raw account data, or `None` when no account exists at `address`.
    async fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, Rejection>;
}

#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Signs, submits and waits for a definitive outcome. Must not retry.
    async fn sign_and_submit(&self, transaction: &PreparedTransaction) -> Result<Signature, Rejection>;
}

#[async_trait]
impl<T: LedgerReader + ?Sized> LedgerReader for Arc<T> {
    async fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, Rejection> {
        (**self).read_account(address).await
    }
}

#[async_trait]
impl<T: TransactionSubmitter + ?Sized> TransactionSubmitter for Arc<T> {
    async fn sign_and_submit(&self, transaction: &PreparedTransaction) -> Result<Signature, Rejection> {
        (**self).sign_and_submit(transaction).await
    }
}

/// Instructions executed atomically in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    pub fee_payer: Pubkey,
    pub instructions: Vec<Instruction>,
    /// Signers other than the fee payer, e.g. a freshly generated mint keypair.
    pub co_signers: Vec<Pubkey>,
}

impl PreparedTransaction {
    pub fn new(fee_payer: Pubkey, instructions: Vec<Instruction>) -> Self {
        Self { fee_payer, instructions, co_signers: Vec::new() }
    }

    pub fn with_co_signer(mut self, signer: Pubkey) -> Self {
        if signer != self.fee_payer && !self.co_signers.contains(&signer) {
            self.co_signers.push(signer);
        }
        self
    }

    /// Every account flagged as signer across all instructions.
    pub fn required_signers(&self) -> Vec<Pubkey> {
        let mut signers = vec![self.fee_payer];
        for meta in self.instructions.iter().flat_map(|ix| ix.accounts.iter()) {
            if meta.is_signer && !signers.contains(&meta.pubkey) {
                signers.push(meta.pubkey);
            }
        }
        signers
    }
}
