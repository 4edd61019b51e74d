//! # Safe-Sync Benchmarks
//!
//! | Component | Operation |
//! |-----------|-----------|
//! | ss-01 Entity Store | load a repository of N proposals |
//! | ss-02 Nonce Resolution | parse + evaluate a nonce formula, schedule N proposals |
//! | ss-04 Hash Verifier | EIP-712 safeTxHash, MultiSend packing |

use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::{Address, Bytes, FunctionCall, Operation, Proposal, ProposalAction, Safe, U256};
use ss_01_entity_store::{safe_path, EntityStore, MemoryBackend};
use ss_02_nonce_resolution::{Bindings, Expr, NonceCandidate, NonceConfig, NonceResolver};
use ss_04_hash_verifier::abi::multi_send;
use ss_04_hash_verifier::eip712::{safe_tx_hash, SafeDomain};
use ss_04_hash_verifier::{PlannedCall, SafeTxData};

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

fn repository(proposals: usize) -> MemoryBackend {
    let mut files = vec![(
        safe_path("treasury"),
        serde_json::to_string_pretty(&Safe::bare(addr(1), "treasury")).unwrap(),
    )];
    for i in 0..proposals {
        let proposal = Proposal {
            safe: addr(1),
            delegate: addr(2),
            nonce: None,
            safe_tx_hash: None,
            description: None,
            create_child_proposals: false,
            notifications: Vec::new(),
            action: ProposalAction::Call(FunctionCall {
                contract: addr(3),
                function: "transfer(address,uint256)".to_string(),
                args: vec![format!("{:#x}", addr(4)), i.to_string()],
                value: U256::zero(),
            }),
        };
        files.push((
            PathBuf::from(format!("proposals/p{i:05}.json")),
            serde_json::to_string_pretty(&proposal).unwrap(),
        ));
    }
    MemoryBackend::with_files(files)
}

// ============================================================================
// SS-01 / SS-02: load and schedule
// ============================================================================

fn bench_load_and_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("ss-01-02-load-schedule");

    for size in [10usize, 100, 1000] {
        let backend = repository(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("load", size), &backend, |b, backend| {
            b.iter(|| {
                let mut store = EntityStore::new(Box::new(backend.clone()));
                black_box(store.load().unwrap())
            })
        });

        let mut store = EntityStore::new(Box::new(backend.clone()));
        store.load().unwrap();
        let candidates: Vec<NonceCandidate> = store
            .proposals()
            .map(|e| NonceCandidate {
                index: e.index,
                label: e.path.display().to_string(),
                safe: e.entity.safe,
                nonce: e.entity.nonce.clone(),
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("schedule", size), &candidates, |b, candidates| {
            b.iter(|| {
                let mut resolver = NonceResolver::new();
                black_box(resolver.schedule(&store, candidates.clone()).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_nonce_expression(c: &mut Criterion) {
    let config = NonceConfig::default();
    let bindings = Bindings {
        auto: 12,
        nonce: 10,
        pending_nonce: 15,
    };

    c.bench_function("ss-02-expression-parse-eval", |b| {
        b.iter(|| {
            let expr = Expr::parse(black_box("(pn - n) * 2 + a % 3"), &config).unwrap();
            black_box(expr.evaluate(&bindings).unwrap())
        })
    });
}

// ============================================================================
// SS-04: hashing
// ============================================================================

fn bench_safe_tx_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("ss-04-hash");
    let domain = SafeDomain::new(1, addr(1), Some("1.3.0")).unwrap();
    let tx = SafeTxData::new(addr(3), U256::zero(), Bytes(vec![0xab; 68]), Operation::Call, 42);

    group.bench_function("safe_tx_hash", |b| b.iter(|| black_box(safe_tx_hash(&domain, &tx))));

    for size in [2usize, 10, 50] {
        let calls: Vec<PlannedCall> = (0..size)
            .map(|i| PlannedCall {
                to: addr(i as u64 + 10),
                value: U256::zero(),
                data: Bytes(vec![0xcd; 68]),
                operation: Operation::Call,
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("multi_send", size), &calls, |b, calls| {
            b.iter(|| black_box(multi_send(addr(0x40), calls)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_load_and_schedule, bench_nonce_expression, bench_safe_tx_hash);
criterion_main!(benches);
