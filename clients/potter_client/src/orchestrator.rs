//! Runs each lifecycle operation as one atomic transaction.
//!
//! Every operation moves through `Building -> Submitted -> Confirmed | Failed`
//! exactly once. Nothing is retried here; re-submission is the caller's call.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::ensure::{AccountEnsurer, PendingInstructions};
use crate::errors::{ClientError, OperationFailure};
use crate::instructions::{AmountParams, CreateTokenParams, InstructionBuilder, TokenRef};
use crate::ledger::{LedgerReader, PreparedTransaction, Signature, TransactionSubmitter};
use crate::pda::Deriver;
use crate::state::{LedgerAccount, TokenData, TokenFactory, TokenView, Whitelist};

pub type OperationResult<T> = Result<T, OperationFailure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Building,
    Submitted,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed {
    /// `None` when the operation had nothing to submit (e.g. an empty whitelist batch).
    pub signature: Option<Signature>,
    /// Associated token accounts this transaction created if missing. A
    /// concurrent creator may have landed first; the account exists either way.
    pub created_accounts: Vec<Pubkey>,
}

impl Confirmed {
    fn nothing_submitted() -> Self {
        Self { signature: None, created_accounts: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedToken {
    pub confirmed: Confirmed,
    pub token: TokenRef,
    pub address: Pubkey,
    pub mint: Pubkey,
    pub raw_supply: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The account was already on the ledger; nothing was sent.
    Existed(Pubkey),
    /// An idempotent creation landed. If another caller created the account
    /// in the meantime the creation was a no-op.
    Created { address: Pubkey, signature: Signature },
}

impl EnsureOutcome {
    pub fn address(&self) -> Pubkey {
        match self {
            EnsureOutcome::Existed(address) => *address,
            EnsureOutcome::Created { address, .. } => *address,
        }
    }
}

pub struct Orchestrator<R, S> {
    builder: InstructionBuilder,
    reader: R,
    submitter: S,
}

impl<R: LedgerReader, S: TransactionSubmitter> Orchestrator<R, S> {
    pub fn new(config: ClientConfig, reader: R, submitter: S) -> Self {
        Self { builder: InstructionBuilder::new(Deriver::new(config)), reader, submitter }
    }

    pub fn builder(&self) -> &InstructionBuilder {
        &self.builder
    }

    pub fn deriver(&self) -> &Deriver {
        self.builder.deriver()
    }

    async fn read<T: LedgerAccount>(&self, address: &Pubkey) -> OperationResult<T> {
        let data = self
            .reader
            .read_account(address)
            .await?
            .ok_or(ClientError::AccountNotFound(*address))?;
        Ok(T::decode(&data)?)
    }

    pub async fn fetch_factory(&self, authority: &Pubkey) -> OperationResult<TokenFactory> {
        self.read(&self.deriver().factory(authority).address).await
    }

    pub async fn fetch_token(&self, token: &TokenRef) -> OperationResult<TokenView> {
        let address = self.deriver().token(&token.authority, token.index).address;
        let data: TokenData = self.read(&address).await?;
        Ok(TokenView { index: token.index, address, data })
    }

    /// Every token record the authority's factory has created, in index order.
    pub async fn fetch_tokens(&self, authority: &Pubkey) -> OperationResult<Vec<TokenView>> {
        let factory = self.fetch_factory(authority).await?;
        let mut tokens = Vec::new();
        for index in 0..factory.token_count {
            tokens.push(self.fetch_token(&TokenRef::new(*authority, index)).await?);
        }
        Ok(tokens)
    }

    pub async fn fetch_whitelist(&self, token: &TokenRef) -> OperationResult<Whitelist> {
        self.read(&self.deriver().whitelist(&token.authority, token.index).address).await
    }

    /// Advisory only; the program performs the authoritative check on transfer.
    pub async fn is_whitelisted(&self, token: &TokenRef, address: &Pubkey) -> OperationResult<bool> {
        Ok(self.fetch_whitelist(token).await?.contains(address))
    }

    pub async fn create_factory(&self, authority: &Pubkey) -> OperationResult<Confirmed> {
        let mut pending = PendingInstructions::new();
        pending.push(self.builder.create_factory(authority)?);
        self.submit("create_factory", PreparedTransaction::new(*authority, Vec::new()), pending).await
    }

    /// Reads the factory's current `token_count` immediately before deriving
    /// the new record's addresses. A concurrent creation from the same
    /// authority surfaces as `AccountAlreadyExists`; the index is never bumped
    /// and retried here.
    pub async fn create_token(
        &self,
        authority: &Pubkey,
        params: &CreateTokenParams,
    ) -> OperationResult<CreatedToken> {
        let index = self.fetch_factory(authority).await?.token_count;
        let token = TokenRef::new(*authority, index);
        debug!(%authority, index, mint = %params.mint, "deriving new token record");

        let mut pending = PendingInstructions::new();
        pending.push(self.builder.create_token(authority, index, params)?);
        let tx = PreparedTransaction::new(*authority, Vec::new()).with_co_signer(params.mint);
        let confirmed = self.submit("create_token", tx, pending).await?;

        Ok(CreatedToken {
            confirmed,
            token,
            address: self.deriver().token(authority, index).address,
            mint: params.mint,
            raw_supply: params.raw_supply,
        })
    }

    pub async fn mint_tokens(
        &self,
        params: &AmountParams,
        destination_owner: &Pubkey,
    ) -> OperationResult<Confirmed> {
        let token = &params.token;
        let view = self.fetch_token(token).await?;
        let raw = params.raw(view.data.decimals)?;

        let authority = view.data.authority;
        let mut pending = PendingInstructions::new();
        AccountEnsurer::new(&self.reader, self.deriver())
            .ensure(&authority, destination_owner, &view.data.mint, &mut pending)
            .await?;
        pending.push(self.builder.mint_tokens(token, &view.data, raw, destination_owner)?);
        self.submit("mint_tokens", PreparedTransaction::new(authority, Vec::new()), pending).await
    }

    pub async fn burn_tokens(
        &self,
        params: &AmountParams,
        source_owner: &Pubkey,
    ) -> OperationResult<Confirmed> {
        let token = &params.token;
        let view = self.fetch_token(token).await?;
        let raw = params.raw(view.data.decimals)?;

        let mut pending = PendingInstructions::new();
        pending.push(self.builder.burn_tokens(token, &view.data, raw, source_owner)?);
        self.submit("burn_tokens", PreparedTransaction::new(view.data.authority, Vec::new()), pending).await
    }

    /// Both token accounts are ensured first. A destination that is not
    /// whitelisted fails on-chain with `AddressNotWhitelisted`.
    pub async fn transfer_token(
        &self,
        params: &AmountParams,
        from_owner: &Pubkey,
        to_owner: &Pubkey,
    ) -> OperationResult<Confirmed> {
        let token = &params.token;
        let view = self.fetch_token(token).await?;
        let raw = params.raw(view.data.decimals)?;

        let mut pending = PendingInstructions::new();
        let ensurer = AccountEnsurer::new(&self.reader, self.deriver());
        ensurer.ensure(from_owner, from_owner, &view.data.mint, &mut pending).await?;
        ensurer.ensure(from_owner, to_owner, &view.data.mint, &mut pending).await?;
        pending.push(self.builder.transfer_token(token, &view.data, raw, from_owner, to_owner)?);
        self.submit("transfer_token", PreparedTransaction::new(*from_owner, Vec::new()), pending).await
    }

    /// The record's current authority, read fresh. It signs and pays for
    /// every gated instruction.
    async fn current_authority(&self, token: &TokenRef) -> OperationResult<Pubkey> {
        Ok(self.fetch_token(token).await?.data.authority)
    }

    pub async fn add_to_whitelist(&self, token: &TokenRef, addresses: &[Pubkey]) -> OperationResult<Confirmed> {
        if addresses.is_empty() {
            return Ok(Confirmed::nothing_submitted());
        }
        let authority = self.current_authority(token).await?;
        match self.builder.add_to_whitelist(token, &authority, addresses)? {
            Some(ix) => self.submit_one("add_to_whitelist", authority, ix).await,
            None => Ok(Confirmed::nothing_submitted()),
        }
    }

    pub async fn remove_from_whitelist(&self, token: &TokenRef, addresses: &[Pubkey]) -> OperationResult<Confirmed> {
        if addresses.is_empty() {
            return Ok(Confirmed::nothing_submitted());
        }
        let authority = self.current_authority(token).await?;
        match self.builder.remove_from_whitelist(token, &authority, addresses)? {
            Some(ix) => self.submit_one("remove_from_whitelist", authority, ix).await,
            None => Ok(Confirmed::nothing_submitted()),
        }
    }

    /// Toggles minting. The resulting direction is whatever the ledger flips to;
    /// re-read the token to learn it.
    pub async fn pause_minting(&self, token: &TokenRef) -> OperationResult<Confirmed> {
        let authority = self.current_authority(token).await?;
        let ix = self.builder.pause_minting(token, &authority)?;
        self.submit_one("pause_minting", authority, ix).await
    }

    /// Toggles transfers.
    pub async fn pause_token(&self, token: &TokenRef) -> OperationResult<Confirmed> {
        let authority = self.current_authority(token).await?;
        let ix = self.builder.pause_token(token, &authority)?;
        self.submit_one("pause_token", authority, ix).await
    }

    /// Irreversible from this client's side; confirmation is up to the caller.
    pub async fn transfer_authority(&self, token: &TokenRef, new_authority: &Pubkey) -> OperationResult<Confirmed> {
        let authority = self.current_authority(token).await?;
        let ix = self.builder.transfer_authority(token, &authority, new_authority)?;
        self.submit_one("transfer_authority", authority, ix).await
    }

    /// Creates the associated token account of `(owner, mint)` on its own.
    /// Safe to race: a concurrent creation landing first makes this one a no-op.
    pub async fn ensure_token_account(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> OperationResult<EnsureOutcome> {
        let mut pending = PendingInstructions::new();
        let address = AccountEnsurer::new(&self.reader, self.deriver())
            .ensure(payer, owner, mint, &mut pending)
            .await?;
        if pending.is_empty() {
            return Ok(EnsureOutcome::Existed(address));
        }
        let confirmed = self
            .submit("ensure_token_account", PreparedTransaction::new(*payer, Vec::new()), pending)
            .await?;
        Ok(EnsureOutcome::Created { address, signature: confirmed.signature.unwrap_or_default() })
    }

    async fn submit_one(
        &self,
        operation: &'static str,
        fee_payer: Pubkey,
        instruction: Instruction,
    ) -> OperationResult<Confirmed> {
        let mut pending = PendingInstructions::new();
        pending.push(instruction);
        self.submit(operation, PreparedTransaction::new(fee_payer, Vec::new()), pending).await
    }

    async fn submit(
        &self,
        operation: &'static str,
        mut tx: PreparedTransaction,
        pending: PendingInstructions,
    ) -> OperationResult<Confirmed> {
        let (instructions, created_accounts) = pending.into_parts();
        tx.instructions = instructions;
        debug!(
            operation,
            stage = ?Stage::Building,
            instructions = tx.instructions.len(),
            creates = created_accounts.len(),
            "transaction assembled"
        );

        info!(operation, stage = ?Stage::Submitted, fee_payer = %tx.fee_payer, "submitting transaction");
        match self.submitter.sign_and_submit(&tx).await {
            Ok(signature) => {
                info!(operation, stage = ?Stage::Confirmed, %signature, "transaction confirmed");
                Ok(Confirmed { signature: Some(signature), created_accounts })
            }
            Err(rejection) => {
                let failure = OperationFailure::from(rejection);
                warn!(operation, stage = ?Stage::Failed, kind = ?failure.kind, detail = %failure.detail, "transaction failed");
                Err(failure)
            }
        }
    }
}
