use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dewpoint_mlp::{dewpoint, CancelToken, Discard, Network, TrainConfig};

fn network_forward_bench(c: &mut Criterion) {
    let net = Network::new_with_seed(0);
    let mut trainer = net.trainer();
    let input = [0.3_f32, 0.6, 0.5];

    c.bench_function("network_forward", |b| {
        b.iter(|| {
            let out = net.forward(black_box(&input), &mut trainer.scratch);
            black_box(out);
        })
    });
}

fn network_backward_bench(c: &mut Criterion) {
    let net = Network::new_with_seed(0);
    let mut trainer = net.trainer();
    let input = [0.3_f32, 0.6, 0.5];
    net.forward(&input, &mut trainer.scratch);

    c.bench_function("network_backward_accumulate", |b| {
        b.iter(|| {
            net.backward(black_box(&trainer.scratch), 0.4, &mut trainer.deltas);
            trainer
                .grads
                .accumulate(&input, &trainer.scratch, &trainer.deltas);
        })
    });
}

fn epoch_bench(c: &mut Criterion) {
    let corpus = dewpoint::generate_with_seed(10_000, 0).expect("corpus generation failed");
    let cfg = TrainConfig {
        epochs: 1,
        ..TrainConfig::default()
    };
    let cancel = CancelToken::new();

    c.bench_function("fit_one_epoch_10k_batch_25", |b| {
        b.iter_batched(
            || Network::new_with_seed(1),
            |mut net| {
                let report = net.fit(&corpus.dataset, &cfg, &mut Discard, &cancel);
                black_box(report).ok();
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, network_forward_bench, network_backward_bench, epoch_bench);
criterion_main!(benches);
