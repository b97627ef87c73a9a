//! In-memory ledger double that executes the factory program's instruction
//! semantics, atomically per transaction.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use async_trait::async_trait;

use potter_client::ensure::CREATE_IDEMPOTENT;
use potter_client::errors::{PotterError, Rejection};
use potter_client::instructions::{
    AddToWhitelist, BurnTokens, CreateFactory, CreateToken, MintTokens, PauseMinting, PauseToken,
    ProgramInstruction, RemoveFromWhitelist, TransferAuthority, TransferToken,
};
use potter_client::ledger::{LedgerReader, PreparedTransaction, Signature, TransactionSubmitter};
use potter_client::pda::Deriver;
use potter_client::state::{LedgerAccount, TokenData, TokenFactory, Whitelist};
use potter_client::ClientConfig;

/// Anchor `ConstraintSeeds`.
const CONSTRAINT_SEEDS: u32 = 2006;
/// Anchor `AccountNotInitialized`.
const ACCOUNT_NOT_INITIALIZED: u32 = 3012;
/// SPL Token `InsufficientFunds` and `OwnerMismatch`.
const SPL_INSUFFICIENT_FUNDS: u32 = 0x1;
const SPL_OWNER_MISMATCH: u32 = 0x4;
/// Associated token program `InvalidOwner`.
const ATA_INVALID_OWNER: u32 = 0x0;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn key(byte: u8) -> Pubkey {
    Pubkey::new_from_array([byte; 32])
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

#[derive(Clone, Default)]
struct World {
    program_accounts: HashMap<Pubkey, Vec<u8>>,
    token_accounts: HashMap<Pubkey, TokenAccount>,
    mints: HashMap<Pubkey, u8>,
}

impl World {
    fn exists(&self, address: &Pubkey) -> bool {
        self.program_accounts.contains_key(address)
            || self.token_accounts.contains_key(address)
            || self.mints.contains_key(address)
    }
}

type Exec<T> = std::result::Result<T, Rejection>;

#[derive(Clone)]
pub struct MockLedger {
    config: ClientConfig,
    deriver: Deriver,
    world: Arc<Mutex<World>>,
    submissions: Arc<Mutex<Vec<PreparedTransaction>>>,
    decline_next: Arc<AtomicBool>,
    signatures: Arc<AtomicU64>,
}

impl MockLedger {
    pub fn new() -> Self {
        let config = ClientConfig::default();
        Self {
            config,
            deriver: Deriver::new(config),
            world: Arc::default(),
            submissions: Arc::default(),
            decline_next: Arc::default(),
            signatures: Arc::default(),
        }
    }

    pub fn config(&self) -> ClientConfig {
        self.config
    }

    /// Writes raw program account data, bypassing instruction execution.
    pub fn put_account(&self, address: Pubkey, data: Vec<u8>) {
        self.world.lock().unwrap().program_accounts.insert(address, data);
    }

    pub fn decline_next(&self) {
        self.decline_next.store(true, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<PreparedTransaction> {
        self.submissions.lock().unwrap().clone()
    }

    /// Instructions sent to the associated token program so far.
    pub fn account_creations(&self) -> usize {
        self.submissions()
            .iter()
            .flat_map(|tx| tx.instructions.iter())
            .filter(|ix| ix.program_id == self.config.associated_token_program)
            .count()
    }

    pub fn token_account(&self, owner: &Pubkey, mint: &Pubkey) -> Option<TokenAccount> {
        let address = self.deriver.associated_token(owner, mint).address;
        self.world.lock().unwrap().token_accounts.get(&address).copied()
    }

    pub fn balance(&self, owner: &Pubkey, mint: &Pubkey) -> u64 {
        self.token_account(owner, mint).map(|a| a.amount).unwrap_or(0)
    }

    fn execute(&self, world: &mut World, index: usize, ix: &Instruction) -> Exec<()> {
        if ix.program_id == self.config.associated_token_program {
            return self.create_associated_account(world, index, ix);
        }
        if ix.program_id != self.config.program_id || ix.data.len() < 8 {
            return Err(custom(index, 101));
        }
        let (discriminator, mut body) = ix.data.split_at(8);
        let body = &mut body;
        let keys: Vec<Pubkey> = ix.accounts.iter().map(|m| m.pubkey).collect();

        match discriminator {
            d if d == CreateFactory::DISCRIMINATOR => {
                CreateFactory::deserialize(body).map_err(|_| custom(index, 102))?;
                init(world, index, &keys[0])?;
                let factory = TokenFactory { authority: keys[1], token_count: 0 };
                world.program_accounts.insert(keys[0], factory.encode().unwrap());
                Ok(())
            }
            d if d == CreateToken::DISCRIMINATOR => {
                let args = CreateToken::deserialize(body).map_err(|_| custom(index, 102))?;
                self.create_token(world, index, &keys, args)
            }
            d if d == MintTokens::DISCRIMINATOR => {
                let args = MintTokens::deserialize(body).map_err(|_| custom(index, 102))?;
                let mut token: TokenData = load(world, index, &keys[0])?;
                require_authority(index, &token, &keys[4])?;
                check(!token.is_minting_paused, index, PotterError::MintingPaused)?;
                check(args.amount > 0, index, PotterError::InvalidAmount)?;
                let to = token_account(world, index, &keys[3], &token.mint)?;
                token.total_supply = token
                    .total_supply
                    .checked_add(args.amount)
                    .ok_or_else(|| program(index, PotterError::MaxSupplyExceeded))?;
                to.amount += args.amount;
                store(world, keys[0], &token);
                Ok(())
            }
            d if d == BurnTokens::DISCRIMINATOR => {
                let args = BurnTokens::deserialize(body).map_err(|_| custom(index, 102))?;
                let mut token: TokenData = load(world, index, &keys[0])?;
                require_authority(index, &token, &keys[3])?;
                check(!token.is_minting_paused, index, PotterError::MintingPaused)?;
                check(args.amount > 0, index, PotterError::InvalidAmount)?;
                let from = token_account(world, index, &keys[2], &token.mint)?;
                from.amount = from.amount.checked_sub(args.amount).ok_or_else(|| custom(index, SPL_INSUFFICIENT_FUNDS))?;
                token.total_supply -= args.amount;
                store(world, keys[0], &token);
                Ok(())
            }
            d if d == TransferToken::DISCRIMINATOR => {
                let args = TransferToken::deserialize(body).map_err(|_| custom(index, 102))?;
                let token: TokenData = load(world, index, &keys[1])?;
                if keys[1] != self.deriver.token(&keys[0], args.token_count).address {
                    return Err(custom(index, CONSTRAINT_SEEDS));
                }
                let whitelist: Whitelist = load(world, index, &keys[2])?;
                check(!token.is_paused, index, PotterError::TokenPaused)?;
                check(args.amount > 0, index, PotterError::InvalidAmount)?;
                let to_owner = token_account(world, index, &keys[4], &token.mint)?.owner;
                check(whitelist.contains(&to_owner), index, PotterError::AddressNotWhitelisted)?;

                let from = token_account(world, index, &keys[3], &token.mint)?;
                if from.owner != keys[5] {
                    return Err(custom(index, SPL_OWNER_MISMATCH));
                }
                from.amount = from.amount.checked_sub(args.amount).ok_or_else(|| custom(index, SPL_INSUFFICIENT_FUNDS))?;
                token_account(world, index, &keys[4], &token.mint)?.amount += args.amount;
                Ok(())
            }
            d if d == AddToWhitelist::DISCRIMINATOR => {
                let args = AddToWhitelist::deserialize(body).map_err(|_| custom(index, 102))?;
                let token: TokenData = load(world, index, &keys[0])?;
                require_authority(index, &token, &keys[2])?;
                let mut whitelist: Whitelist = load(world, index, &keys[1])?;
                for address in args.addresses {
                    if !whitelist.contains(&address) {
                        whitelist.addresses.push(address);
                    }
                }
                store(world, keys[1], &whitelist);
                Ok(())
            }
            d if d == RemoveFromWhitelist::DISCRIMINATOR => {
                let args = RemoveFromWhitelist::deserialize(body).map_err(|_| custom(index, 102))?;
                let token: TokenData = load(world, index, &keys[0])?;
                require_authority(index, &token, &keys[2])?;
                let mut whitelist: Whitelist = load(world, index, &keys[1])?;
                whitelist.addresses.retain(|a| !args.addresses.contains(a));
                store(world, keys[1], &whitelist);
                Ok(())
            }
            d if d == PauseMinting::DISCRIMINATOR => {
                PauseMinting::deserialize(body).map_err(|_| custom(index, 102))?;
                let mut token: TokenData = load(world, index, &keys[0])?;
                require_authority(index, &token, &keys[1])?;
                token.is_minting_paused = !token.is_minting_paused;
                store(world, keys[0], &token);
                Ok(())
            }
            d if d == PauseToken::DISCRIMINATOR => {
                PauseToken::deserialize(body).map_err(|_| custom(index, 102))?;
                let mut token: TokenData = load(world, index, &keys[0])?;
                require_authority(index, &token, &keys[1])?;
                token.is_paused = !token.is_paused;
                store(world, keys[0], &token);
                Ok(())
            }
            d if d == TransferAuthority::DISCRIMINATOR => {
                let args = TransferAuthority::deserialize(body).map_err(|_| custom(index, 102))?;
                let mut token: TokenData = load(world, index, &keys[0])?;
                require_authority(index, &token, &keys[1])?;
                token.authority = args.new_authority;
                store(world, keys[0], &token);
                Ok(())
            }
            _ => Err(custom(index, 101)),
        }
    }

    fn create_token(&self, world: &mut World, index: usize, keys: &[Pubkey], args: CreateToken) -> Exec<()> {
        let authority = keys[7];
        let mut factory: TokenFactory = load(world, index, &keys[0])?;
        check(factory.authority == authority, index, PotterError::Unauthorized)?;

        init(world, index, &keys[1])?;
        init(world, index, &keys[2])?;
        if keys[1] != self.deriver.token(&authority, factory.token_count).address
            || keys[2] != self.deriver.whitelist(&authority, factory.token_count).address
        {
            return Err(custom(index, CONSTRAINT_SEEDS));
        }
        check(args.name.len() <= 32, index, PotterError::NameTooLong)?;
        check(args.symbol.len() <= 10, index, PotterError::SymbolTooLong)?;
        check(args.uri.len() <= 200, index, PotterError::UriTooLong)?;
        check(args.decimals <= 9, index, PotterError::InvalidAmount)?;
        if keys[6] != self.deriver.metadata(&keys[3]).address {
            return Err(program(index, PotterError::InvalidMetadataAccount));
        }

        let mint = keys[3];
        init(world, index, &mint)?;
        world.mints.insert(mint, args.decimals);

        let ata = self.deriver.associated_token(&authority, &mint).address;
        if keys[5] != ata {
            return Err(custom(index, CONSTRAINT_SEEDS));
        }
        init(world, index, &ata)?;
        world.token_accounts.insert(ata, TokenAccount { mint, owner: authority, amount: args.total_supply });

        let token = TokenData {
            authority,
            mint,
            total_supply: args.total_supply,
            decimals: args.decimals,
            name: args.name,
            symbol: args.symbol,
            uri: args.uri,
            is_paused: false,
            is_minting_paused: false,
        };
        store(world, keys[1], &token);
        store(world, keys[2], &Whitelist { addresses: vec![args.default_address] });

        factory.token_count += 1;
        store(world, keys[0], &factory);
        Ok(())
    }

    /// `Create` (`[0]`) fails on an existing account; `CreateIdempotent` (`[1]`)
    /// accepts one with the same owner and mint.
    fn create_associated_account(&self, world: &mut World, index: usize, ix: &Instruction) -> Exec<()> {
        let (address, owner, mint) = (ix.accounts[1].pubkey, ix.accounts[2].pubkey, ix.accounts[3].pubkey);
        if ix.data.first() == Some(&CREATE_IDEMPOTENT) {
            if let Some(existing) = world.token_accounts.get(&address) {
                if existing.owner == owner && existing.mint == mint {
                    return Ok(());
                }
                return Err(custom(index, ATA_INVALID_OWNER));
            }
        }
        init(world, index, &address)?;
        if address != self.deriver.associated_token(&owner, &mint).address || !world.mints.contains_key(&mint) {
            return Err(Rejection::new(format!(
                "Transaction simulation failed: Error processing Instruction {index}: invalid seeds for program address"
            )));
        }
        world.token_accounts.insert(address, TokenAccount { mint, owner, amount: 0 });
        Ok(())
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn read_account(&self, address: &Pubkey) -> std::result::Result<Option<Vec<u8>>, Rejection> {
        let world = self.world.lock().unwrap();
        if let Some(data) = world.program_accounts.get(address) {
            return Ok(Some(data.clone()));
        }
        Ok(world.exists(address).then(|| vec![0; 165]))
    }
}

#[async_trait]
impl TransactionSubmitter for MockLedger {
    async fn sign_and_submit(&self, tx: &PreparedTransaction) -> std::result::Result<Signature, Rejection> {
        if self.decline_next.swap(false, Ordering::SeqCst) {
            return Err(Rejection::new("WalletSignTransactionError: User rejected the request."));
        }
        // Let concurrently built transactions reach this point before any lands.
        tokio::task::yield_now().await;
        self.submissions.lock().unwrap().push(tx.clone());

        for signer in tx.required_signers() {
            if signer != tx.fee_payer && !tx.co_signers.contains(&signer) {
                return Err(Rejection::new(format!("Transaction signature verification failure: missing {signer}")));
            }
        }

        let mut world = self.world.lock().unwrap();
        let mut staged = world.clone();
        for (index, ix) in tx.instructions.iter().enumerate() {
            self.execute(&mut staged, index, ix)?;
        }
        *world = staged;

        let n = self.signatures.fetch_add(1, Ordering::SeqCst);
        Ok(format!("sig-{n}"))
    }
}

fn custom(index: usize, code: u32) -> Rejection {
    Rejection::new(format!(
        "Transaction simulation failed: Error processing Instruction {index}: custom program error: {code:#x}"
    ))
}

fn program(index: usize, err: PotterError) -> Rejection {
    let code = u32::from(err);
    custom(index, code).with_logs(vec![format!(
        "Program log: AnchorError occurred. Error Code: {}. Error Number: {code}. Error Message: {err}.",
        err.name()
    )])
}

fn check(condition: bool, index: usize, err: PotterError) -> Exec<()> {
    if condition {
        Ok(())
    } else {
        Err(program(index, err))
    }
}

fn require_authority(index: usize, token: &TokenData, signer: &Pubkey) -> Exec<()> {
    check(token.authority == *signer, index, PotterError::Unauthorized)
}

fn init(world: &World, index: usize, address: &Pubkey) -> Exec<()> {
    if world.exists(address) {
        return Err(custom(index, 0).with_logs(vec![format!(
            "Allocate: account Address {{ address: {address}, base: None }} already in use"
        )]));
    }
    Ok(())
}

fn load<T: LedgerAccount>(world: &World, index: usize, address: &Pubkey) -> Exec<T> {
    let data = world
        .program_accounts
        .get(address)
        .ok_or_else(|| custom(index, ACCOUNT_NOT_INITIALIZED))?;
    T::decode(data).map_err(|e| Rejection::new(e.to_string()))
}

fn store<T: LedgerAccount>(world: &mut World, address: Pubkey, account: &T) {
    world.program_accounts.insert(address, account.encode().unwrap());
}

fn token_account<'w>(world: &'w mut World, index: usize, address: &Pubkey, mint: &Pubkey) -> Exec<&'w mut TokenAccount> {
    match world.token_accounts.get_mut(address) {
        Some(account) if account.mint == *mint => Ok(account),
        _ => Err(custom(index, ACCOUNT_NOT_INITIALIZED)),
    }
}
