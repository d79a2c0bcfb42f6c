use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use instproof_merkle::MerkleTree;

/// Instruction-shaped leaves (type tag, shard, token, amount, tx id, height).
fn det_leaves(n: usize) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| {
            format!(
                "2401{:064x}{:040x}{}{:064x}{}",
                i,
                i.wrapping_mul(0x9E37_79B9),
                1_000 + i,
                i ^ 0x5555,
                10_000 + i
            )
            .into_bytes()
        })
        .collect()
}

fn bench_merkle(c: &mut Criterion) {
    let mut group = c.benchmark_group("instruction_merkle");
    for &n in &[64usize, 1_000, 4_097] {
        group.throughput(Throughput::Elements(n as u64));
        let data = det_leaves(n);

        group.bench_function(BenchmarkId::new("build", n), |b| {
            b.iter(|| black_box(MerkleTree::from_data(black_box(&data)).root()));
        });

        let tree = MerkleTree::from_data(&data);
        group.bench_function(BenchmarkId::new("prove_last", n), |b| {
            b.iter(|| black_box(tree.prove(black_box(n - 1))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_merkle);
criterion_main!(benches);
