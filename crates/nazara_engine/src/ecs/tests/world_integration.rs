//! World lifecycle: membership hooks, kills, enable state and system updates

use super::{test_registry, Hook, HookRecorder};
use crate::ecs::components::{NodeComponent, VelocityComponent};
use crate::ecs::systems::VelocitySystem;
use crate::ecs::{EcsError, EntityList, System, World};
use crate::foundation::math::Vec3;
use approx::assert_relative_eq;

fn world_with_recorder() -> World {
    let registry = test_registry();
    let mut world = World::new(registry.clone());
    world.add_system(HookRecorder::new(&registry).unwrap()).unwrap();
    world
}

fn hooks(world: &World) -> &[Hook] {
    &world.system::<HookRecorder>().unwrap().hooks
}

#[test]
fn test_component_bits_follow_components() {
    let mut world = world_with_recorder();
    let node_index = world.registry().component_index::<NodeComponent>().unwrap();

    let entity = world.create_entity();
    world.add_component(entity, NodeComponent::new()).unwrap();
    assert!(world.entity(entity).unwrap().has_component_index(node_index));

    assert_eq!(world.remove_component::<NodeComponent>(entity), Ok(true));
    assert_eq!(world.remove_component::<NodeComponent>(entity), Ok(false));
    assert!(!world.entity(entity).unwrap().has_component_index(node_index));
}

#[test]
fn test_membership_hooks() {
    let mut world = world_with_recorder();
    let recorder_index = world.registry().system_index::<HookRecorder>().unwrap();

    let entity = world.create_entity();
    world.add_component(entity, NodeComponent::new()).unwrap();
    let id = world.entity(entity).unwrap().id();

    world.refresh();
    assert_eq!(hooks(&world), &[Hook::Added(id), Hook::Validated(id, true)]);
    assert!(world.entity(entity).unwrap().system_bits().unbounded_test(recorder_index));

    // Still matching after an unrelated change
    world.add_component(entity, VelocityComponent::default()).unwrap();
    world.refresh();
    assert_eq!(hooks(&world).last(), Some(&Hook::Validated(id, false)));

    world.remove_component::<NodeComponent>(entity).unwrap();
    world.refresh();
    assert_eq!(hooks(&world).last(), Some(&Hook::Removed(id)));
    assert!(!world.entity(entity).unwrap().system_bits().unbounded_test(recorder_index));
    assert!(world.system::<HookRecorder>().unwrap().base().entities().is_empty());
}

#[test]
fn test_untouched_entities_are_not_revalidated() {
    let mut world = world_with_recorder();
    let entity = world.create_entity();
    world.add_component(entity, NodeComponent::new()).unwrap();
    world.refresh();

    let count = hooks(&world).len();
    world.refresh();
    world.update(0.016);
    assert_eq!(hooks(&world).len(), count);
}

#[test]
fn test_disabled_entity_leaves_systems() {
    let mut world = world_with_recorder();
    let entity = world.create_entity();
    world.add_component(entity, NodeComponent::new()).unwrap();
    world.refresh();

    world.enable_entity(entity, false).unwrap();
    world.refresh();
    let recorder = world.system::<HookRecorder>().unwrap();
    assert!(recorder.base().entities().is_empty());
    // Components are kept
    assert!(world.entity(entity).unwrap().has_component::<NodeComponent>());

    world.enable_entity(entity, true).unwrap();
    world.refresh();
    assert_eq!(world.system::<HookRecorder>().unwrap().base().entities().len(), 1);
}

#[test]
fn test_killed_handle_stops_resolving() {
    let mut world = world_with_recorder();
    let entity = world.create_entity();
    world.add_component(entity, NodeComponent::new()).unwrap();
    world.refresh();
    let id = world.entity(entity).unwrap().id();

    world.kill_entity(entity).unwrap();
    // Destruction happens on the next refresh
    assert!(world.is_entity_valid(entity));

    world.refresh();
    assert!(!world.is_entity_valid(entity));
    assert!(world.entity(entity).is_none());
    assert_eq!(hooks(&world).last(), Some(&Hook::Removed(id)));
    assert_eq!(world.kill_entity(entity), Err(EcsError::InvalidEntity));

    // The id is recycled, the old handle still does not resolve
    let recycled = world.create_entity();
    assert_eq!(world.entity(recycled).unwrap().id(), id);
    assert!(world.entity(entity).is_none());
    assert!(world.is_entity_id_valid(id));
}

#[test]
fn test_remove_system_clears_tracking_bits() {
    let mut world = world_with_recorder();
    let recorder_index = world.registry().system_index::<HookRecorder>().unwrap();

    let entity = world.create_entity();
    world.add_component(entity, NodeComponent::new()).unwrap();
    world.refresh();

    world.remove_system::<HookRecorder>().unwrap();
    assert!(!world.has_system::<HookRecorder>());
    assert!(!world.entity(entity).unwrap().system_bits().unbounded_test(recorder_index));
    assert!(matches!(world.remove_system::<HookRecorder>(), Err(EcsError::SystemNotFound(_))));
}

#[test]
fn test_adding_a_system_twice_fails() {
    let mut world = world_with_recorder();
    let recorder = HookRecorder::new(world.registry()).unwrap();
    assert!(matches!(world.add_system(recorder), Err(EcsError::SystemAlreadyPresent(_))));
}

#[test]
fn test_update_rate() {
    let mut world = world_with_recorder();
    world
        .system_mut::<HookRecorder>()
        .unwrap()
        .base_mut()
        .set_update_rate(10.0);

    world.update(0.25);
    let recorder = world.system::<HookRecorder>().unwrap();
    assert_eq!(recorder.updates.len(), 2);
    assert_relative_eq!(recorder.updates[0], 0.1);
}

#[test]
fn test_velocity_moves_nodes() {
    let registry = test_registry();
    let mut world = World::new(registry.clone());
    world.add_system(VelocitySystem::new(&registry).unwrap()).unwrap();

    let moving = world.create_entity();
    world.add_component(moving, NodeComponent::new()).unwrap();
    world
        .add_component(moving, VelocityComponent::new(Vec3::new(2.0, 0.0, 0.0)))
        .unwrap();

    let still = world.create_entity();
    world.add_component(still, NodeComponent::from_position(Vec3::new(0.0, 1.0, 0.0))).unwrap();

    world.update(0.5);
    world.update(0.5);

    let position = world.entity(moving).unwrap().component::<NodeComponent>().position();
    assert_relative_eq!(position, Vec3::new(2.0, 0.0, 0.0));
    let position = world.entity(still).unwrap().component::<NodeComponent>().position();
    assert_relative_eq!(position, Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn test_clear_keeps_systems() {
    let mut world = world_with_recorder();
    for _ in 0..3 {
        let entity = world.create_entity();
        world.add_component(entity, NodeComponent::new()).unwrap();
    }
    world.refresh();

    world.clear();
    assert_eq!(world.entity_count(), 0);
    assert!(world.has_system::<HookRecorder>());
    assert!(world.system::<HookRecorder>().unwrap().base().entities().is_empty());

    // Ids start over
    let entity = world.create_entity();
    assert_eq!(world.entity(entity).unwrap().id(), 0);
}

#[test]
fn test_has_component_matches_bits() {
    let mut world = world_with_recorder();
    let registry = world.registry().clone();
    let node_index = registry.component_index::<NodeComponent>().unwrap();
    let velocity_index = registry.component_index::<VelocityComponent>().unwrap();
    let entity = world.create_entity();

    let check = |world: &World| {
        let entity = world.entity(entity).unwrap();
        assert_eq!(entity.has_component::<NodeComponent>(), entity.component_bits().unbounded_test(node_index));
        assert_eq!(
            entity.has_component::<VelocityComponent>(),
            entity.component_bits().unbounded_test(velocity_index)
        );
    };

    check(&world);
    world.add_component(entity, VelocityComponent::default()).unwrap();
    check(&world);
    world.add_component(entity, NodeComponent::new()).unwrap();
    check(&world);
    world.remove_component::<VelocityComponent>(entity).unwrap();
    check(&world);
    // Adding again replaces the existing component
    world
        .add_component(entity, NodeComponent::from_position(Vec3::new(1.0, 0.0, 0.0)))
        .unwrap();
    check(&world);
    assert_relative_eq!(
        world.entity(entity).unwrap().component::<NodeComponent>().position(),
        Vec3::new(1.0, 0.0, 0.0)
    );
    world.entity_mut(entity).unwrap().remove_all_components();
    check(&world);
    assert!(world.entity(entity).unwrap().component_bits().test_none());
}

#[test]
fn test_entity_list_keeps_order() {
    let mut world = world_with_recorder();
    let handles: Vec<_> = (0..4).map(|_| world.create_entity()).collect();

    let mut list = EntityList::new();
    for &handle in &handles {
        assert!(list.insert(world.entity(handle).unwrap()));
    }
    assert!(!list.insert(world.entity(handles[0]).unwrap()));

    assert!(list.remove(world.entity(handles[1]).unwrap()));
    assert!(!list.remove_id(1));
    assert_eq!(list.ids().collect::<Vec<_>>(), vec![0, 2, 3]);

    // Stable: 0 and 3 share a key
    list.sort_by_key(|id| if id == 2 { 0 } else { 1 });
    assert_eq!(list.ids().collect::<Vec<_>>(), vec![2, 0, 3]);
    assert_eq!(list.iter().next(), Some(handles[2]));
}
