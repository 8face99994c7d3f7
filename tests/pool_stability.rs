// Run:
//   cargo test --test pool_stability -- --nocapture

use ecs_runtime::{Pool, POOL_CHUNK_CAP};

#[derive(Clone, Copy, Default, PartialEq, Debug)]
struct StaticMesh {
    color_a: f32,
    color_x: f32,
    color_y: f32,
    color_z: f32,
}

#[test]
fn slots_survive_chunk_growth() {
    let mut pool: Pool<StaticMesh> = Pool::new();

    // Fill past two chunk boundaries.
    let mut indices = Vec::new();
    for _ in 0..2050 {
        indices.push(pool.insert(StaticMesh::default()).unwrap());
    }
    assert!(2050 > POOL_CHUNK_CAP * 2);

    let fifth = indices[5];
    let generation = pool.generation(fifth).unwrap();
    *pool.get_mut(fifth, generation).unwrap() = StaticMesh {
        color_a: 25.0,
        color_x: 35.0,
        color_y: 45.0,
        color_z: 56.0,
    };

    let old_generation = pool.generation(indices[1500]).unwrap();
    pool.free(indices[1500]);

    let reallocated = pool.insert(StaticMesh::default()).unwrap();
    // The freed slot is the free-list head, so it comes back first, one
    // generation later.
    assert_eq!(reallocated, indices[1500]);
    assert_eq!(pool.generation(reallocated).unwrap(), old_generation + 1);

    let mesh = pool.get(fifth, generation).unwrap();
    assert_eq!(
        *mesh,
        StaticMesh {
            color_a: 25.0,
            color_x: 35.0,
            color_y: 45.0,
            color_z: 56.0,
        }
    );
}

#[test]
fn freed_slot_reads_null_through_old_generation() {
    let mut pool: Pool<u64> = Pool::new();
    let index = pool.insert(77).unwrap();
    let generation = pool.generation(index).unwrap();

    assert_eq!(pool.get(index, generation), Some(&77));

    pool.free(index);
    assert_eq!(pool.get(index, generation), None);

    // Reallocation may hand the same index back; the old pairing must
    // still read as absent.
    let reused = pool.insert(88).unwrap();
    assert_eq!(reused, index);
    assert_eq!(pool.get(index, generation), None);
    let fresh = pool.generation(reused).unwrap();
    assert_eq!(pool.get(reused, fresh), Some(&88));
}

#[test]
fn interleaved_churn_preserves_survivors() {
    let mut pool: Pool<usize> = Pool::new();
    let mut live: Vec<(u32, u32, usize)> = Vec::new();

    for round in 0..20 {
        for value in 0..300 {
            let payload = round * 1000 + value;
            let index = pool.insert(payload).unwrap();
            live.push((index, pool.generation(index).unwrap(), payload));
        }
        // Free every third survivor.
        let mut position = 0;
        live.retain(|&(index, _, _)| {
            position += 1;
            if position % 3 == 0 {
                pool.free(index);
                false
            } else {
                true
            }
        });
    }

    for &(index, generation, payload) in &live {
        assert_eq!(pool.get(index, generation), Some(&payload));
    }
    assert_eq!(pool.len(), live.len());
}
