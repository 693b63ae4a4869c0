//! # CLI Interface
//!
//! Defines the command-line argument structure for `remit-node` using
//! `clap` derive. Every ledger command runs against the sled store in
//! `--data-dir` and prints its result as JSON on stdout.

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use remit_protocol::config::{CLAIM_BACK_WINDOW_SECS, OWNER_TAX};
use remit_protocol::{
    ClaimRequest, Commitment, CurrencyId, ExchangeRate, LookupKey, PartyId, Value,
};

/// Remit escrow and exchange ledger.
///
/// Operator tool for a persistent escrow/exchange ledger pair. Each
/// invocation loads the ledgers, performs one operation, and commits the
/// new state together with the payouts it produced.
#[derive(Parser, Debug)]
#[command(
    name = "remit-node",
    about = "Remit escrow and exchange ledger",
    version,
    propagate_version = true
)]
pub struct RemitNodeCli {
    /// Directory holding the ledger database.
    #[arg(
        long,
        short = 'd',
        global = true,
        env = "REMIT_DATA_DIR",
        default_value = "./remit-data"
    )]
    pub data_dir: PathBuf,

    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "REMIT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the remit binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a fresh ledger pair in the data directory.
    Init(InitArgs),
    /// Print the commitment for a plaintext password.
    HashPassword(HashPasswordArgs),
    /// Print the escrow lookup key for two passwords and two parties.
    DeriveKey(KeyArgs),
    /// Lock native value under a lookup key.
    Deposit(DepositArgs),
    /// Claim an escrow as its receiver.
    Claim(ClaimArgs),
    /// Return an expired escrow to its depositor.
    ClaimBack(ClaimBackArgs),
    /// Set the exchange rate for a currency (owner only).
    SetRate(SetRateArgs),
    /// Claim an escrow through the exchange and convert it.
    Convert(ConvertArgs),
    /// Withdraw a whole currency balance.
    Withdraw(WithdrawArgs),
    /// Show the funds held under a lookup key.
    Funds(FundsArgs),
    /// Show a party's balance in a currency.
    Balance(BalanceArgs),
    /// List every payout committed so far.
    Payouts,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Owner of both ledgers. Receives the escrow tax and sets rates.
    #[arg(long)]
    pub owner: PartyId,

    /// The exchange's own native-value account.
    #[arg(long, default_value = "exchange")]
    pub account: PartyId,

    /// Flat tax withheld on every claim.
    #[arg(long, env = "REMIT_OWNER_TAX", default_value_t = OWNER_TAX)]
    pub owner_tax: Value,

    /// Seconds after a deposit before the depositor may claim it back.
    #[arg(long, env = "REMIT_CLAIM_BACK_WINDOW_SECS", default_value_t = CLAIM_BACK_WINDOW_SECS)]
    pub claim_back_window_secs: i64,
}

/// Arguments for the `hash-password` subcommand.
#[derive(Args, Debug)]
pub struct HashPasswordArgs {
    /// The plaintext password.
    pub password: String,
}

/// The four inputs that identify an escrow.
///
/// Each side may be given as a plaintext password or as an already
/// computed commitment.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Party that made the deposit.
    #[arg(long)]
    pub sender: PartyId,

    /// Party entitled to claim.
    #[arg(long)]
    pub receiver: PartyId,

    /// The sender's plaintext password.
    #[arg(long, conflicts_with = "sender_commitment")]
    pub sender_password: Option<String>,

    /// The receiver's plaintext password.
    #[arg(long, conflicts_with = "receiver_commitment")]
    pub receiver_password: Option<String>,

    /// Hex commitment to the sender's password.
    #[arg(long)]
    pub sender_commitment: Option<Commitment>,

    /// Hex commitment to the receiver's password.
    #[arg(long)]
    pub receiver_commitment: Option<Commitment>,
}

impl KeyArgs {
    /// Resolves passwords into commitments and builds the claim request.
    pub fn to_request(&self) -> Result<ClaimRequest> {
        let sender_commitment = resolve_commitment(
            "sender",
            self.sender_password.as_deref(),
            self.sender_commitment,
        )?;
        let receiver_commitment = resolve_commitment(
            "receiver",
            self.receiver_password.as_deref(),
            self.receiver_commitment,
        )?;
        Ok(ClaimRequest {
            sender_commitment,
            receiver_commitment,
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
        })
    }
}

fn resolve_commitment(
    side: &str,
    password: Option<&str>,
    commitment: Option<Commitment>,
) -> Result<Commitment> {
    match (password, commitment) {
        (Some(pw), None) => Ok(remit_protocol::hash_password(pw)),
        (None, Some(c)) => Ok(c),
        _ => bail!("provide exactly one of --{side}-password or --{side}-commitment"),
    }
}

/// Arguments for the `deposit` subcommand.
#[derive(Args, Debug)]
pub struct DepositArgs {
    /// Hex lookup key, as printed by `derive-key`.
    #[arg(long)]
    pub key: LookupKey,

    /// Native value to lock.
    #[arg(long)]
    pub amount: Value,

    #[arg(long)]
    pub depositor: PartyId,
}

/// Arguments for the `claim` subcommand.
#[derive(Args, Debug)]
pub struct ClaimArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Identity performing the claim. Must be the receiver.
    #[arg(long)]
    pub caller: PartyId,
}

/// Arguments for the `claim-back` subcommand.
#[derive(Args, Debug)]
pub struct ClaimBackArgs {
    #[arg(long)]
    pub key: LookupKey,

    /// Identity performing the claim-back. Must be the depositor.
    #[arg(long)]
    pub caller: PartyId,
}

/// Arguments for the `set-rate` subcommand.
#[derive(Args, Debug)]
pub struct SetRateArgs {
    #[arg(long)]
    pub currency: CurrencyId,

    /// Currency units per native unit, as a decimal (e.g. `2` or `0.5`).
    #[arg(long)]
    pub rate: ExchangeRate,

    #[arg(long)]
    pub caller: PartyId,
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    #[arg(long)]
    pub currency: CurrencyId,

    /// Identity performing the conversion. Must be the receiver.
    #[arg(long)]
    pub caller: PartyId,
}

/// Arguments for the `withdraw` subcommand.
#[derive(Args, Debug)]
pub struct WithdrawArgs {
    #[arg(long)]
    pub currency: CurrencyId,

    #[arg(long)]
    pub caller: PartyId,
}

/// Arguments for the `funds` subcommand.
#[derive(Args, Debug)]
pub struct FundsArgs {
    #[arg(long)]
    pub key: LookupKey,
}

/// Arguments for the `balance` subcommand.
#[derive(Args, Debug)]
pub struct BalanceArgs {
    #[arg(long)]
    pub party: PartyId,

    #[arg(long)]
    pub currency: CurrencyId,
}
