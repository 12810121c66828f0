//! Chain extension cost should not grow with history length.

use bilateral_core::{Channel, ChannelId, PartyId};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_record_send(c: &mut Criterion) {
    let local = PartyId::from("alice");
    let mut group = c.benchmark_group("record_send");

    for history_len in [0u64, 1_000, 10_000] {
        let mut channel = Channel::open(ChannelId::from("bench"), &local, PartyId::from("bob"));
        for _ in 0..history_len {
            channel.record_send(&local, "USD", 1).unwrap();
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(history_len),
            &history_len,
            |b, _| {
                b.iter_batched(
                    || channel.clone(),
                    |mut ch| ch.record_send(&local, black_box("USD"), black_box(1)),
                    criterion::BatchSize::LargeInput,
                )
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_record_send);
criterion_main!(benches);
