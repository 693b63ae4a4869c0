// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Remit Operator Node
//!
//! Entry point for the `remit-node` binary. Parses CLI arguments,
//! initializes logging, runs one ledger command against the store in the
//! data directory, and prints the result as JSON.
//!
//! Read-only commands (`funds`, `balance`, `payouts`) never commit.
//! `hash-password`, `derive-key` and `version` do not touch the store.

mod cli;
mod logging;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value as Json};

use remit_contracts::EscrowRecord;
use remit_protocol::config::EscrowConfig;
use remit_protocol::{hash_password, LookupKey, Value};

use cli::{Commands, RemitNodeCli};
use logging::LogFormat;
use session::{CommitReport, Session};

fn main() -> Result<()> {
    let cli = RemitNodeCli::parse();
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&cli.log_format),
    );

    run(cli)
}

/// Output of `funds`.
#[derive(Serialize)]
struct FundsOutput {
    key: LookupKey,
    funds: Value,
    record: Option<EscrowRecord>,
}

/// Output of every committing command: its own result plus the events and
/// payouts the commit produced.
#[derive(Serialize)]
struct Committed {
    result: Json,
    #[serde(flatten)]
    report: CommitReport,
}

/// Writes `value` to stdout as pretty JSON.
///
/// Serializes directly rather than through `serde_json::Value`, which
/// cannot hold amounts above `u64::MAX`.
fn emit<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

/// Executes one command and prints its JSON result.
fn run(cli: RemitNodeCli) -> Result<()> {
    let data_dir = cli.data_dir;

    match cli.command {
        Commands::Init(args) => {
            let config = EscrowConfig {
                owner_tax: args.owner_tax,
                claim_back_window_secs: args.claim_back_window_secs,
            };
            tracing::info!(
                data_dir = %data_dir.display(),
                owner = %args.owner,
                account = %args.account,
                "initializing ledger"
            );
            let session =
                Session::init(&data_dir, args.owner.clone(), args.account.clone(), config)?;
            session.commit()?;
            emit(&json!({
                "data_dir": data_dir.display().to_string(),
                "owner": args.owner,
                "account": args.account,
                "owner_tax": config.owner_tax.to_string(),
                "claim_back_window_secs": config.claim_back_window_secs,
            }))
        }

        Commands::HashPassword(args) => emit(&json!({
            "commitment": hash_password(&args.password),
        })),

        Commands::DeriveKey(args) => {
            let request = args.to_request()?;
            emit(&json!({
                "sender_commitment": request.sender_commitment,
                "receiver_commitment": request.receiver_commitment,
                "key": request.lookup_key(),
            }))
        }

        Commands::Deposit(args) => {
            let session = Session::open(&data_dir)?;
            session
                .escrow()
                .deposit(args.key, args.amount, &args.depositor)
                .context("deposit failed")?;
            committed(json!({ "key": args.key, "amount": args.amount.to_string() }), session)
        }

        Commands::Claim(args) => {
            let request = args.key.to_request()?;
            let session = Session::open(&data_dir)?;
            let payout = session
                .escrow()
                .claim(&request, &args.caller)
                .context("claim failed")?;
            committed(
                json!({ "key": request.lookup_key(), "payout": payout.to_string() }),
                session,
            )
        }

        Commands::ClaimBack(args) => {
            let session = Session::open(&data_dir)?;
            let amount = session
                .escrow()
                .claim_back(&args.key, &args.caller)
                .context("claim-back failed")?;
            committed(json!({ "key": args.key, "amount": amount.to_string() }), session)
        }

        Commands::SetRate(args) => {
            let session = Session::open(&data_dir)?;
            session
                .exchange()
                .set_exchange_rate(&args.currency, args.rate, &args.caller)
                .context("set-rate failed")?;
            committed(
                json!({ "currency": args.currency, "rate": args.rate.to_string() }),
                session,
            )
        }

        Commands::Convert(args) => {
            let request = args.key.to_request()?;
            let session = Session::open(&data_dir)?;
            let converted = session
                .exchange()
                .convert_funds(&request, &args.currency, &args.caller)
                .context("convert failed")?;
            committed(
                json!({ "currency": args.currency, "converted": converted.to_string() }),
                session,
            )
        }

        Commands::Withdraw(args) => {
            let session = Session::open(&data_dir)?;
            let amount = session
                .exchange()
                .withdraw_funds(&args.currency, &args.caller)
                .context("withdraw failed")?;
            committed(
                json!({ "currency": args.currency, "amount": amount.to_string() }),
                session,
            )
        }

        Commands::Funds(args) => {
            let session = Session::open(&data_dir)?;
            emit(&FundsOutput {
                key: args.key,
                funds: session.escrow().query_funds(&args.key),
                record: session.escrow().query_record(&args.key),
            })
        }

        Commands::Balance(args) => {
            let session = Session::open(&data_dir)?;
            let balance = session
                .exchange()
                .query_currency_balance(&args.party, &args.currency);
            emit(&json!({
                "party": args.party,
                "currency": args.currency,
                "balance": balance.to_string(),
                "rate": session.exchange().exchange_rate(&args.currency).map(|r| r.to_string()),
            }))
        }

        Commands::Payouts => {
            let session = Session::open(&data_dir)?;
            emit(&session.db().payouts()?)
        }

        Commands::Version => emit(&json!({
            "remit-node": env!("CARGO_PKG_VERSION"),
            "protocol": remit_protocol::config::PROTOCOL_VERSION,
        })),
    }
}

/// Commits the session and prints `result` alongside what the commit
/// produced.
fn committed(result: Json, session: Session) -> Result<()> {
    let report = session.commit()?;
    tracing::info!(
        events = report.remittance_events.len() + report.exchange_events.len(),
        payouts = report.payouts.len(),
        "command committed"
    );
    emit(&Committed { result, report })
}
