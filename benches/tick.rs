use criterion::*;
use std::hint::black_box;

use ecs_runtime::{FnSystem, Manager};

mod common;
use common::*;

fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    let mut world = make_world();
    world.ecs.register_tuple_query(&[world.position, world.velocity]);
    let _entities = populate(&mut world, ENTITIES_MED);

    let (position, velocity) = (world.position, world.velocity);
    let query = [position, velocity];
    world.ecs.register_system(FnSystem::new("integrate", 0, move |ecs: &mut Manager| {
        let pairs: Vec<_> = ecs
            .components_tuple(&query)
            .iter()
            .map(|row| (row.handle_of(position), row.handle_of(velocity)))
            .collect();
        for (position_handle, velocity_handle) in pairs {
            let delta = ecs
                .get_component::<Velocity>(velocity_handle)
                .map(|v| (v.dx, v.dy))
                .unwrap_or((0.0, 0.0));
            if let Some(pos) = ecs.get_component_mut::<Position>(position_handle) {
                pos.x += delta.0;
                pos.y += delta.1;
            }
        }
    }));

    group.bench_function("integrate_10k", |b| {
        b.iter(|| {
            world.ecs.update();
            black_box(&world.ecs);
        });
    });

    group.finish();
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
