use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for &(label, n) in &[
        ("spawn_1k", ENTITIES_SMALL),
        ("spawn_10k", ENTITIES_MED),
    ] {
        group.bench_function(label, |b| {
            b.iter_batched(
                make_world,
                |mut world| {
                    let entities = populate(&mut world, n);
                    black_box(entities);
                    black_box(world);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.bench_function("spawn_destroy_churn_1k", |b| {
        b.iter_batched(
            || {
                let mut world = make_world();
                let entities = populate(&mut world, ENTITIES_SMALL);
                (world, entities)
            },
            |(mut world, entities)| {
                for entity in &entities {
                    world.ecs.destroy_entity(entity.id());
                }
                let respawned = populate(&mut world, ENTITIES_SMALL);
                black_box(respawned);
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
