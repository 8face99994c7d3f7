#![allow(dead_code)]

use ecs_runtime::{ComponentTypeId, Entity, Manager};

pub const ENTITIES_SMALL: usize = 1_000;
pub const ENTITIES_MED: usize = 10_000;
pub const ENTITIES_LARGE: usize = 50_000;

#[derive(Clone, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Default)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

pub struct World {
    pub ecs: Manager,
    pub position: ComponentTypeId,
    pub velocity: ComponentTypeId,
}

pub fn make_world() -> World {
    let mut ecs = Manager::new();
    let position = ecs.register_component_type::<Position>("Position").unwrap();
    let velocity = ecs.register_component_type::<Velocity>("Velocity").unwrap();
    World {
        ecs,
        position,
        velocity,
    }
}

/// Spawns `count` entities carrying both components.
pub fn populate(world: &mut World, count: usize) -> Vec<Entity> {
    let mut entities = Vec::with_capacity(count);
    for i in 0..count {
        let entity = world.ecs.create_entity().unwrap();
        let position = world.ecs.create_component::<Position>().unwrap();
        let velocity = world.ecs.create_component::<Velocity>().unwrap();
        world.ecs.add_component(&entity, position).unwrap();
        world.ecs.add_component(&entity, velocity).unwrap();
        world
            .ecs
            .get_component_mut::<Velocity>(velocity)
            .unwrap()
            .dx = (i % 7) as f32;
        entities.push(entity);
    }
    entities
}
