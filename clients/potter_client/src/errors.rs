use anchor_lang::prelude::*;
use thiserror::Error;

/// Custom errors of the on-chain factory program, in ordinal order.
/// Anchor numbers them from `ERROR_CODE_OFFSET` (6000 / 0x1770).
#[error_code]
pub enum PotterError {
    #[msg("Token transfers are paused")]
    TokenPaused,

    #[msg("Invalid amount")]
    InvalidAmount,

    #[msg("Unauthorized")]
    Unauthorized,

    #[msg("Maximum supply exceeded")]
    MaxSupplyExceeded,

    #[msg("Symbol is too long (max 10 characters)")]
    SymbolTooLong,

    #[msg("Name is too long (max 32 characters)")]
    NameTooLong,

    #[msg("Address is not whitelisted")]
    AddressNotWhitelisted,

    #[msg("Token minting is paused")]
    MintingPaused,

    #[msg("Invalid metadata account")]
    InvalidMetadataAccount,

    #[msg("URI is too long (max 200 characters)")]
    UriTooLong,

    #[msg("Transfer hook error: not currently transferring")]
    NotCurrentlyTransferring,
}

/// First custom program error code (`ordinal = code - PROGRAM_ERROR_BASE`).
pub const PROGRAM_ERROR_BASE: u32 = 0x1770;

/// Ordinal table; index is `code - PROGRAM_ERROR_BASE`.
const PROGRAM_ERRORS: [ErrorKind; 11] = [
    ErrorKind::TokenPaused,
    ErrorKind::InvalidAmount,
    ErrorKind::Unauthorized,
    ErrorKind::MaxSupplyExceeded,
    ErrorKind::SymbolTooLong,
    ErrorKind::NameTooLong,
    ErrorKind::AddressNotWhitelisted,
    ErrorKind::MintingPaused,
    ErrorKind::InvalidMetadataAccount,
    ErrorKind::UriTooLong,
    ErrorKind::NotCurrentlyTransferring,
];

/// Closed failure taxonomy surfaced to callers.
///
/// The `Display` text of each kind is the fixed user-facing sentence; raw
/// diagnostics travel separately in [`OperationFailure::detail`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("Token transfers are paused.")]
    TokenPaused,
    #[error("The amount is invalid.")]
    InvalidAmount,
    #[error("You are not authorized to perform this action.")]
    Unauthorized,
    #[error("The maximum supply would be exceeded.")]
    MaxSupplyExceeded,
    #[error("The symbol is too long (max 10 characters).")]
    SymbolTooLong,
    #[error("The name is too long (max 32 characters).")]
    NameTooLong,
    #[error("The destination address is not whitelisted.")]
    AddressNotWhitelisted,
    #[error("Minting is paused for this token.")]
    MintingPaused,
    #[error("The metadata account is invalid.")]
    InvalidMetadataAccount,
    #[error("The URI is too long (max 200 characters).")]
    UriTooLong,
    #[error("The token is not currently transferring.")]
    NotCurrentlyTransferring,

    #[error("The request was declined in the wallet.")]
    UserDeclined,
    #[error("Insufficient funds to pay network fees.")]
    InsufficientFunds,
    #[error("Transaction simulation failed.")]
    SimulationFailed,
    #[error("The account already exists.")]
    AccountAlreadyExists,
    /// Ordinal (`code - PROGRAM_ERROR_BASE`) for codes in the program's
    /// range; the raw code for anything below it.
    #[error("The program returned an unknown error ({0}).")]
    UnknownProgramError(u32),
    #[error("The transaction failed.")]
    UnknownFailure(String),

    /// Rejected locally before anything was sent to the ledger.
    #[error("The request is invalid.")]
    InvalidRequest(ClientError),
}

impl ErrorKind {
    /// Maps a custom program error code to its kind.
    ///
    /// An ordinal past the end of the table becomes `UnknownProgramError`
    /// carrying the ordinal. Codes below [`PROGRAM_ERROR_BASE`] come from
    /// other programs (SPL Token, the runtime) and keep the raw code.
    pub fn from_program_code(code: u32) -> Self {
        match code.checked_sub(PROGRAM_ERROR_BASE) {
            Some(ordinal) => PROGRAM_ERRORS
                .get(ordinal as usize)
                .cloned()
                .unwrap_or(ErrorKind::UnknownProgramError(ordinal)),
            None => ErrorKind::UnknownProgramError(code),
        }
    }

    /// Custom program error code for kinds that originate on-chain.
    pub fn program_code(&self) -> Option<u32> {
        let err = match self {
            ErrorKind::TokenPaused => PotterError::TokenPaused,
            ErrorKind::InvalidAmount => PotterError::InvalidAmount,
            ErrorKind::Unauthorized => PotterError::Unauthorized,
            ErrorKind::MaxSupplyExceeded => PotterError::MaxSupplyExceeded,
            ErrorKind::SymbolTooLong => PotterError::SymbolTooLong,
            ErrorKind::NameTooLong => PotterError::NameTooLong,
            ErrorKind::AddressNotWhitelisted => PotterError::AddressNotWhitelisted,
            ErrorKind::MintingPaused => PotterError::MintingPaused,
            ErrorKind::InvalidMetadataAccount => PotterError::InvalidMetadataAccount,
            ErrorKind::UriTooLong => PotterError::UriTooLong,
            ErrorKind::NotCurrentlyTransferring => PotterError::NotCurrentlyTransferring,
            _ => return None,
        };
        Some(u32::from(err))
    }
}

/// Failures detected on the client, before any network round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("seed {index} is {len} bytes, limit is {max}")]
    SeedTooLong { index: usize, len: usize, max: usize },

    #[error("{count} seeds given, limit is {max}")]
    TooManySeeds { count: usize, max: usize },

    #[error("no viable bump seed for the given seeds")]
    NoViableBump,

    #[error("amount does not fit in an unsigned 64-bit integer")]
    AmountOverflow,

    #[error("decimals must be between 0 and 9, got {0}")]
    InvalidDecimals(u8),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("name is {len} bytes, max {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("symbol is {len} bytes, max {max}")]
    SymbolTooLong { len: usize, max: usize },

    #[error("uri is {len} bytes, max {max}")]
    UriTooLong { len: usize, max: usize },

    #[error("account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("failed to decode {account}: {reason}")]
    AccountDecode { account: &'static str, reason: String },

    #[error("failed to encode instruction {instruction}: {reason}")]
    Encode { instruction: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Raw rejection returned by the sign-and-submit capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rejection {
    pub message: String,
    pub logs: Vec<String>,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), logs: Vec::new() }
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    fn lines(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.message.as_str()).chain(self.logs.iter().map(String::as_str))
    }
}

/// Structured failure handed back across the presentation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct OperationFailure {
    pub kind: ErrorKind,
    /// Raw diagnostics (wallet message, program logs) for inspection.
    pub detail: String,
}

impl OperationFailure {
    /// Short fixed sentence for the kind.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl From<ClientError> for OperationFailure {
    fn from(err: ClientError) -> Self {
        let kind = match &err {
            ClientError::NameTooLong { .. } => ErrorKind::NameTooLong,
            ClientError::SymbolTooLong { .. } => ErrorKind::SymbolTooLong,
            ClientError::UriTooLong { .. } => ErrorKind::UriTooLong,
            ClientError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            _ => ErrorKind::InvalidRequest(err.clone()),
        };
        OperationFailure { kind, detail: err.to_string() }
    }
}

impl From<Rejection> for OperationFailure {
    fn from(rejection: Rejection) -> Self {
        let kind = translate(&rejection);
        let detail = rejection.lines().collect::<Vec<_>>().join("\n");
        OperationFailure { kind, detail }
    }
}

/// Transport matchers, checked in order before any program code parsing.
/// Patterns are matched against the lowercased message and logs.
const TRANSPORT_PATTERNS: &[(&str, ErrorKind)] = &[
    ("user rejected", ErrorKind::UserDeclined),
    ("user declined", ErrorKind::UserDeclined),
    ("user denied", ErrorKind::UserDeclined),
    ("insufficient funds for fee", ErrorKind::InsufficientFunds),
    ("insufficient lamports", ErrorKind::InsufficientFunds),
    ("no record of a prior credit", ErrorKind::InsufficientFunds),
    ("already in use", ErrorKind::AccountAlreadyExists),
];

const SIMULATION_PATTERN: &str = "simulation failed";

/// Classifies a rejection. Never fails: anything unrecognised becomes
/// `UnknownFailure` carrying the original message.
///
/// Order: transport patterns, then a custom program error code, then the
/// generic simulation failure.
pub fn translate(rejection: &Rejection) -> ErrorKind {
    let lowered: Vec<String> = rejection.lines().map(str::to_lowercase).collect();

    for (pattern, kind) in TRANSPORT_PATTERNS {
        if lowered.iter().any(|line| line.contains(pattern)) {
            return kind.clone();
        }
    }

    if let Some(code) = rejection.lines().find_map(parse_program_code) {
        return ErrorKind::from_program_code(code);
    }

    // A failed simulation with no program code is a generic preflight failure.
    if lowered.iter().any(|line| line.contains(SIMULATION_PATTERN)) {
        return ErrorKind::SimulationFailed;
    }

    ErrorKind::UnknownFailure(rejection.message.clone())
}

/// Extracts a custom program error code from one log or message line.
///
/// Understands `custom program error: 0x1776`, Anchor's
/// `Error Number: 6006.` and the JSON form `{"Custom":6006}`.
pub fn parse_program_code(line: &str) -> Option<u32> {
    if let Some(rest) = after(line, "custom program error: 0x") {
        let digits: String = rest.chars().take_while(|c| c.is_ascii_hexdigit()).collect();
        return u32::from_str_radix(&digits, 16).ok();
    }
    if let Some(rest) = after(line, "Error Number: ") {
        return leading_decimal(rest);
    }
    if let Some(rest) = after(line, "\"Custom\":") {
        return leading_decimal(rest.trim_start());
    }
    None
}

fn after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker).map(|at| &line[at + marker.len()..])
}

fn leading_decimal(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
