//! Lazy, idempotent creation of associated token accounts.
//!
//! `ensure` never creates anything on its own. It reads the ledger and, when
//! the account is missing, appends a creation instruction to the transaction
//! being built, ahead of the instruction that needs the account.
//!
//! The instruction is the associated token program's `CreateIdempotent`, so a
//! concurrent creator landing first leaves the transaction intact.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use tracing::debug;

use crate::errors::Rejection;
use crate::ledger::LedgerReader;
use crate::pda::Deriver;

/// `AssociatedTokenAccountInstruction::CreateIdempotent`. A no-op on the
/// ledger when the account already exists with the same owner and mint.
pub const CREATE_IDEMPOTENT: u8 = 1;

/// Instruction list of a transaction under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingInstructions {
    instructions: Vec<Instruction>,
    created_accounts: Vec<Pubkey>,
}

impl PendingInstructions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn extend(&mut self, instructions: impl IntoIterator<Item = Instruction>) {
        self.instructions.extend(instructions);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Associated token accounts this transaction will create.
    pub fn created_accounts(&self) -> &[Pubkey] {
        &self.created_accounts
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Instruction>, Vec<Pubkey>) {
        (self.instructions, self.created_accounts)
    }
}

pub struct AccountEnsurer<'a, R: ?Sized> {
    reader: &'a R,
    deriver: &'a Deriver,
}

impl<'a, R: LedgerReader + ?Sized> AccountEnsurer<'a, R> {
    pub fn new(reader: &'a R, deriver: &'a Deriver) -> Self {
        Self { reader, deriver }
    }

    /// Returns the associated token account of `(owner, mint)`, queueing its
    /// creation (paid by `payer`) when it does not exist yet. A pair already
    /// queued in `pending` is not queued twice.
    pub async fn ensure(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
        pending: &mut PendingInstructions,
    ) -> Result<Pubkey, Rejection> {
        let address = self.deriver.associated_token(owner, mint).address;

        if pending.created_accounts.contains(&address) {
            debug!(%address, "token account creation already queued");
            return Ok(address);
        }
        if self.reader.read_account(&address).await?.is_some() {
            debug!(%address, %owner, "token account exists");
            return Ok(address);
        }

        debug!(%address, %owner, %mint, "queueing token account creation");
        pending.push(create_associated_token_account(self.deriver, payer, owner, mint));
        pending.created_accounts.push(address);
        Ok(address)
    }
}

/// Associated Token Account program `CreateIdempotent` instruction.
pub fn create_associated_token_account(
    deriver: &Deriver,
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    let config = deriver.config();
    let address = deriver.associated_token(owner, mint).address;
    Instruction {
        program_id: config.associated_token_program,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(address, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(anchor_lang::system_program::ID, false),
            AccountMeta::new_readonly(config.token_program, false),
        ],
        data: vec![CREATE_IDEMPOTENT],
    }
}
