// Escrow and exchange ledger benchmarks.
//
// Covers the deposit/claim round trip on a warm ledger and the full
// deposit/convert path through the exchange, both against the in-memory
// bank.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use remit_contracts::{EscrowLedger, ExchangeLedger};
use remit_protocol::clock::SystemClock;
use remit_protocol::config::EscrowConfig;
use remit_protocol::transfer::InMemoryBank;
use remit_protocol::{ClaimRequest, CurrencyId, ExchangeRate, PartyId};

fn party(s: &str) -> PartyId {
    PartyId::new(s).unwrap()
}

fn escrow(bank: Arc<InMemoryBank>) -> Arc<EscrowLedger> {
    Arc::new(
        EscrowLedger::new(
            party("owner"),
            EscrowConfig::default(),
            Arc::new(SystemClock),
            bank,
        )
        .unwrap(),
    )
}

/// Distinct requests so every iteration works on a fresh key.
fn requests(n: usize) -> Vec<ClaimRequest> {
    (0..n)
        .map(|i| {
            ClaimRequest::from_passwords(
                &format!("sender-{i}"),
                &format!("receiver-{i}"),
                party("alice"),
                party("bob"),
            )
        })
        .collect()
}

fn bench_deposit_claim(c: &mut Criterion) {
    let bank = Arc::new(InMemoryBank::new());
    let ledger = escrow(bank.clone());
    let mut pool = requests(1_024).into_iter().cycle();

    c.bench_function("escrow/deposit_claim", |b| {
        b.iter_batched(
            || pool.next().unwrap(),
            |req| {
                ledger.deposit(req.lookup_key(), 10_100, &party("alice")).unwrap();
                ledger.claim(&req, &party("bob")).unwrap();
                bank.drain_journal();
                ledger.drain_events();
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_deposit_convert(c: &mut Criterion) {
    let bank = Arc::new(InMemoryBank::new());
    let exchange = ExchangeLedger::builder()
        .owner(party("owner"))
        .account(party("exchange"))
        .escrow(escrow(bank.clone()))
        .currency_bank(bank.clone())
        .build()
        .unwrap();
    let eur = CurrencyId::new("EUR").unwrap();
    exchange
        .set_exchange_rate(&eur, ExchangeRate::from_units(2).unwrap(), &party("owner"))
        .unwrap();
    let mut pool = requests(1_024).into_iter().cycle();

    c.bench_function("exchange/deposit_convert", |b| {
        b.iter_batched(
            || pool.next().unwrap(),
            |req| {
                exchange
                    .escrow()
                    .deposit(req.lookup_key(), 10_100, &party("alice"))
                    .unwrap();
                exchange.convert_funds(&req, &eur, &party("bob")).unwrap();
                bank.drain_journal();
                exchange.escrow().drain_events();
                exchange.drain_events();
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_deposit_claim, bench_deposit_convert);
criterion_main!(benches);
