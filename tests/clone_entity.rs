// Deep cloning, and the separation of attachment from payload ownership.
//
// Run:
//   cargo test --test clone_entity -- --nocapture

use ecs_runtime::{Entity, Manager};

#[derive(Clone, Default, PartialEq, Debug)]
struct Transform {
    x: f32,
    y: f32,
}

#[derive(Clone, Default, PartialEq, Debug)]
struct Label {
    text: String,
}

fn world() -> Manager {
    let mut ecs = Manager::new();
    ecs.register_component_type::<Transform>("Transform").unwrap();
    ecs.register_component_type::<Label>("Label").unwrap();
    ecs
}

fn transform_of(ecs: &Manager, entity: &Entity) -> Transform {
    ecs.entity_component::<Transform>(entity).unwrap().clone()
}

#[test]
fn clone_copies_components_and_children() {
    let mut ecs = world();

    let source = ecs.create_entity().unwrap();
    let transform = ecs.create_component::<Transform>().unwrap();
    let label = ecs.create_component::<Label>().unwrap();
    ecs.add_component(&source, transform).unwrap();
    ecs.add_component(&source, label).unwrap();
    *ecs.get_component_mut::<Transform>(transform).unwrap() = Transform { x: 1.0, y: 2.0 };
    ecs.get_component_mut::<Label>(label).unwrap().text = "root".to_string();

    let child = ecs.create_entity().unwrap();
    let child_transform = ecs.create_component::<Transform>().unwrap();
    ecs.add_component(&child, child_transform).unwrap();
    *ecs.get_component_mut::<Transform>(child_transform).unwrap() = Transform { x: 9.0, y: 9.0 };
    ecs.add_child(&source, &child).unwrap();

    let copy = ecs.clone_entity(&source).unwrap();
    assert!(copy.is_valid());
    assert_ne!(copy.id(), source.id());

    // Payloads are value-equal but live in distinct slots.
    assert_eq!(transform_of(&ecs, &copy), Transform { x: 1.0, y: 2.0 });
    assert_eq!(
        ecs.entity_component::<Label>(&copy).unwrap().text,
        "root"
    );
    let copy_transform = ecs.component_handle(&copy, ecs.component_type_id_of::<Transform>());
    assert_ne!(copy_transform, transform);

    ecs.entity_component_mut::<Transform>(&copy).unwrap().x = 100.0;
    assert_eq!(transform_of(&ecs, &source).x, 1.0);

    // The child came along, recursively, with its own payload copy.
    assert_eq!(ecs.children_count(&copy), 1);
    let cloned_child = ecs.entity_by_id(ecs.child_by_index(&copy, 0));
    assert_ne!(cloned_child.id(), child.id());
    assert_eq!(transform_of(&ecs, &cloned_child), Transform { x: 9.0, y: 9.0 });
}

#[test]
fn clone_of_clone_matches_original() {
    let mut ecs = world();

    let original = ecs.create_entity().unwrap();
    let transform = ecs.create_component::<Transform>().unwrap();
    ecs.add_component(&original, transform).unwrap();
    *ecs.get_component_mut::<Transform>(transform).unwrap() = Transform { x: 5.0, y: -3.0 };

    let once = ecs.clone_entity(&original).unwrap();
    let twice = ecs.clone_entity(&once).unwrap();

    assert_eq!(transform_of(&ecs, &twice), transform_of(&ecs, &original));
    let ids = [original.id(), once.id(), twice.id()];
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert_ne!(ids[0], ids[2]);
}

#[test]
fn clone_preserves_inactive_intent() {
    let mut ecs = world();

    let source = ecs.create_entity().unwrap();
    ecs.activate_entity(&source, false);

    let copy = ecs.clone_entity(&source).unwrap();
    assert!(!ecs.is_entity_activated(&copy));
}

#[test]
fn clone_of_dead_entity_is_invalid() {
    let mut ecs = world();
    let entity = ecs.create_entity().unwrap();
    ecs.destroy_entity(entity.id());
    let copy = ecs.clone_entity(&entity).unwrap();
    assert!(!copy.is_valid());
}

#[test]
fn detach_leaves_the_payload_alive() {
    let mut ecs = world();

    let entity = ecs.create_entity().unwrap();
    let label = ecs.create_component::<Label>().unwrap();
    ecs.add_component(&entity, label).unwrap();
    ecs.get_component_mut::<Label>(label).unwrap().text = "kept".to_string();

    ecs.remove_component(&entity, label);
    let type_id = ecs.component_type_id_of::<Label>();
    assert!(!ecs.has_component(&entity, type_id));

    // Ownership is independent of attachment.
    assert_eq!(ecs.get_component::<Label>(label).unwrap().text, "kept");

    ecs.destroy_component(label);
    assert!(ecs.get_component::<Label>(label).is_none());
}

#[test]
fn destroying_an_entity_destroys_attached_payloads() {
    let mut ecs = world();

    let entity = ecs.create_entity().unwrap();
    let transform = ecs.create_component::<Transform>().unwrap();
    ecs.add_component(&entity, transform).unwrap();

    ecs.destroy_entity(entity.id());
    assert!(ecs.get_component::<Transform>(transform).is_none());
}

#[test]
fn duplicate_component_type_is_rejected() {
    let mut ecs = world();

    let entity = ecs.create_entity().unwrap();
    let first = ecs.create_component::<Transform>().unwrap();
    let second = ecs.create_component::<Transform>().unwrap();
    ecs.add_component(&entity, first).unwrap();
    ecs.add_component(&entity, second).unwrap();

    // The second attach was a no-op; the list still holds the first.
    let type_id = ecs.component_type_id_of::<Transform>();
    assert_eq!(ecs.component_handle(&entity, type_id), first);
    assert_eq!(ecs.components(&entity).count(), 1);
}
