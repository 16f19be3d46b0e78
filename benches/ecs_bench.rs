//! Core operation benchmarks
//!
//! Run with: cargo bench
//!
//! - entity creation (single and batched)
//! - add/remove churn through cached archetype edges
//! - query iteration and mutating `for_each`
//! - cascading delete of a widely used key

use cascade_ecs::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

#[derive(Debug, Copy, Clone, PartialEq)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

struct Keys {
    pos: Component<Position>,
    vel: Component<Velocity>,
    tag: Flag,
}

fn setup() -> (World, Keys) {
    let mut world = World::with_config(Config {
        entity_name_default: false,
        ..Config::default()
    });
    let keys = Keys {
        pos: world.component("Position").unwrap(),
        vel: world.component("Velocity").unwrap(),
        tag: world.flag("Tag").unwrap(),
    };
    (world, keys)
}

fn populated(n: usize) -> (World, Keys) {
    let (mut world, keys) = setup();
    for i in 0..n {
        world
            .create_entity(None, |b| {
                b.set(keys.pos, Position { x: i as f32, y: 0.0, z: 0.0 })
                    .set(keys.vel, Velocity { x: 1.0, y: 0.0, z: 0.0 });
                if i % 2 == 0 {
                    b.add(keys.tag);
                }
                Ok(())
            })
            .unwrap();
    }
    (world, keys)
}

fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");

    group.bench_function("set_one_by_one_1k", |b| {
        b.iter(|| {
            let (mut world, keys) = setup();
            for i in 0..1_000 {
                let e = world.entity(None).unwrap();
                world
                    .set(e, keys.pos, Position { x: i as f32, y: 0.0, z: 0.0 })
                    .unwrap();
                world
                    .set(e, keys.vel, Velocity { x: 1.0, y: 0.0, z: 0.0 })
                    .unwrap();
            }
            black_box(world.entity_count())
        });
    });

    group.bench_function("create_entity_batched_1k", |b| {
        b.iter(|| {
            let (world, _) = populated(1_000);
            black_box(world.entity_count())
        });
    });

    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    for &auto_delete in &[false, true] {
        group.bench_with_input(
            BenchmarkId::new("add_remove_tag_1k", auto_delete),
            &auto_delete,
            |b, &auto_delete| {
                let (mut world, keys) = populated(1_000);
                world.config_mut().auto_delete_empty_archetypes = auto_delete;
                let entities = Query::new(keys.pos).without([keys.tag]).entities(&world);
                b.iter(|| {
                    for &e in &entities {
                        world.add(e, keys.tag).unwrap();
                    }
                    for &e in &entities {
                        world.remove(e, keys.tag).unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for &n in &[1_000usize, 10_000] {
        let (world, keys) = populated(n);
        group.bench_with_input(BenchmarkId::new("iter_pos_vel", n), &n, |b, _| {
            let query = Query::new((keys.pos, keys.vel));
            b.iter(|| {
                let mut sum = 0.0f32;
                for (_, (pos, vel)) in query.iter(&world) {
                    if let (Some(pos), Some(vel)) = (pos, vel) {
                        sum += pos.x * vel.x;
                    }
                }
                black_box(sum)
            });
        });
    }

    let (mut world, keys) = populated(1_000);
    group.bench_function("for_each_integrate_1k", |b| {
        let query = Query::new((keys.pos, keys.vel));
        b.iter(|| {
            query
                .for_each(&mut world, |world, entity, (pos, vel)| {
                    let (Some(pos), Some(vel)) = (pos, vel) else {
                        return Ok(());
                    };
                    let next = Position {
                        x: pos.x + vel.x,
                        y: pos.y + vel.y,
                        z: pos.z + vel.z,
                    };
                    world.set(entity, keys.pos, next)
                })
                .unwrap();
        });
    });

    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    c.bench_function("delete_key_held_by_1k", |b| {
        b.iter_with_setup(
            || populated(1_000),
            |(mut world, keys)| {
                world.delete(keys.tag).unwrap();
                black_box(world.archetype_count())
            },
        );
    });
}

criterion_group!(benches, bench_create, bench_churn, bench_query, bench_delete);
criterion_main!(benches);
