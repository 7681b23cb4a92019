//! Render system driven through a world and a recording backend

use super::test_registry;
use crate::core::config::{RenderConfig, TechniqueKind};
use crate::ecs::components::{
    CameraComponent, GraphicsComponent, LightComponent, LightFactory, NodeComponent, Renderable,
};
use crate::ecs::systems::RenderSystem;
use crate::ecs::{EntityHandle, EntityId, System, World};
use crate::foundation::color::Color;
use crate::foundation::math::{Vec3, Vec4};
use crate::render::backend::{RenderTargetInfo, UniformValue};
use crate::render::material::Material;
use crate::render::mesh::Mesh;
use crate::render::recording::{GpuCommand, RecordingBackend};
use crate::render::states::{ClearBuffers, RenderStates};
use crate::render::technique::light_type;
use approx::assert_relative_eq;

fn render_world(config: &RenderConfig) -> (World, RenderTargetInfo) {
    let registry = test_registry();
    let mut backend = RecordingBackend::with_standard_shaders(config.max_lights_per_pass);
    let target = backend.add_window_target(800, 600);

    let mut world = World::new(registry.clone());
    world
        .add_system(RenderSystem::new(&registry, Box::new(backend), config).unwrap())
        .unwrap();

    (world, target)
}

fn spawn_camera(world: &mut World, target: Option<RenderTargetInfo>, layer: u32) -> (EntityHandle, EntityId) {
    let mut camera = CameraComponent::new().with_layer(layer);
    camera.set_target(target);

    let entity = world.create_entity();
    world.add_component(entity, NodeComponent::from_position(Vec3::new(0.0, 0.0, 10.0))).unwrap();
    world.add_component(entity, camera).unwrap();
    (entity, world.entity(entity).unwrap().id())
}

fn spawn_cube(world: &mut World, position: Vec3) -> EntityHandle {
    let mesh = world
        .system_mut::<RenderSystem>()
        .unwrap()
        .render_backend_mut()
        .create_mesh(&Mesh::cube())
        .unwrap();

    let entity = world.create_entity();
    world.add_component(entity, NodeComponent::from_position(position)).unwrap();
    world
        .add_component(entity, GraphicsComponent::new().with(Renderable::new(mesh, Material::default())))
        .unwrap();
    entity
}

fn spawn_light(world: &mut World, light: LightComponent, position: Vec3) -> EntityHandle {
    let entity = world.create_entity();
    world.add_component(entity, NodeComponent::from_position(position)).unwrap();
    world.add_component(entity, light).unwrap();
    entity
}

fn take_commands(world: &mut World) -> Vec<GpuCommand> {
    world
        .system_mut::<RenderSystem>()
        .unwrap()
        .backend_mut::<RecordingBackend>()
        .unwrap()
        .take_commands()
}

fn system(world: &World) -> &RenderSystem {
    world.system::<RenderSystem>().unwrap()
}

#[test]
fn test_cameras_draw_by_ascending_layer() {
    let (mut world, target) = render_world(&RenderConfig::default());

    let (a, id_a) = spawn_camera(&mut world, Some(target), 3);
    let (_, id_b) = spawn_camera(&mut world, Some(target), 1);
    let (_, id_c) = spawn_camera(&mut world, Some(target), 2);
    let (_, id_d) = spawn_camera(&mut world, Some(target), 1);
    world.refresh();

    // Equal layers keep their insertion order
    assert_eq!(system(&world).camera_order(), vec![id_b, id_d, id_c, id_a]);

    world
        .entity_mut(a)
        .unwrap()
        .component_mut::<CameraComponent>()
        .set_layer(0);
    world.refresh();
    assert_eq!(system(&world).camera_order(), vec![id_a, id_b, id_d, id_c]);
}

#[test]
fn test_entities_land_in_matching_buckets() {
    let (mut world, target) = render_world(&RenderConfig::default());

    let light = spawn_light(&mut world, LightFactory::point(Color::WHITE, 5.0), Vec3::zeros());
    let cube = spawn_cube(&mut world, Vec3::zeros());
    let (camera, _) = spawn_camera(&mut world, Some(target), 0);

    // Graphics without a node is not tracked at all
    let orphan = world.create_entity();
    world.add_component(orphan, GraphicsComponent::new()).unwrap();
    world.refresh();

    let render = system(&world);
    let light_entity = world.entity(light).unwrap();
    assert!(render.lights().contains(light_entity));
    assert!(!render.drawables().contains(light_entity));
    assert!(!render.cameras().contains(light_entity));
    assert!(render.drawables().contains(world.entity(cube).unwrap()));
    assert!(render.cameras().contains(world.entity(camera).unwrap()));
    assert!(!render.base().entities().contains(world.entity(orphan).unwrap()));
    assert_eq!(render.base().entities().len(), 3);

    world.remove_component::<NodeComponent>(light).unwrap();
    world.refresh();
    assert!(system(&world).lights().is_empty());

    world.kill_entity(camera).unwrap();
    world.refresh();
    assert!(system(&world).cameras().is_empty());
}

#[test]
fn test_forward_frame() {
    let (mut world, target) = render_world(&RenderConfig::default());
    let cube = spawn_cube(&mut world, Vec3::zeros());
    let mesh = world.entity(cube).unwrap().component::<GraphicsComponent>().renderables()[0].mesh;
    spawn_light(&mut world, LightFactory::point(Color::WHITE, 5.0), Vec3::new(0.0, 0.0, 2.0));
    spawn_camera(&mut world, Some(target), 0);

    world.update(0.016);
    let commands = take_commands(&mut world);

    let position = |wanted: &GpuCommand| commands.iter().position(|command| command == wanted);
    let bind_target = position(&GpuCommand::SetTarget(target.id)).unwrap();
    let clear = position(&GpuCommand::Clear(ClearBuffers::COLOR | ClearBuffers::DEPTH, Color::BLACK)).unwrap();
    let draw = position(&GpuCommand::DrawIndexed(mesh)).unwrap();
    assert!(bind_target < clear && clear < draw);

    assert_eq!(commands.iter().filter(|command| command.is_draw()).count(), 1);
    assert!(commands.contains(&GpuCommand::SetShader("ForwardPhong".to_string())));
    assert!(commands.contains(&GpuCommand::SendUniform(
        "Lights[0].type".to_string(),
        UniformValue::Int(light_type::POINT)
    )));
    assert!(commands.contains(&GpuCommand::SendUniform(
        "SceneAmbient".to_string(),
        UniformValue::Vec4(Color::rgb(25, 25, 25).to_vec4())
    )));
}

#[test]
fn test_camera_without_target_is_skipped() {
    let (mut world, target) = render_world(&RenderConfig::default());
    spawn_cube(&mut world, Vec3::zeros());
    spawn_camera(&mut world, None, 0);
    spawn_camera(&mut world, Some(target), 1);

    world.update(0.016);
    let commands = take_commands(&mut world);

    assert_eq!(commands.iter().filter(|command| command.is_draw()).count(), 1);
    assert_eq!(
        commands
            .iter()
            .filter(|command| matches!(command, GpuCommand::SetTarget(_)))
            .count(),
        1
    );
}

#[test]
fn test_coordinate_system_change_moves_drawables() {
    let (mut world, target) = render_world(&RenderConfig::default());
    let cube = spawn_cube(&mut world, Vec3::new(0.0, 0.0, -3.0));
    spawn_camera(&mut world, Some(target), 0);

    world.update(0.016);
    let models = system(&world).technique().render_queue().models();
    assert_relative_eq!(models[0].transform[(2, 3)], -3.0);

    world
        .system_mut::<RenderSystem>()
        .unwrap()
        .set_global_forward(Vec3::new(0.0, 0.0, 1.0));
    world.update(0.016);

    let models = system(&world).technique().render_queue().models();
    assert_relative_eq!(models[0].transform[(2, 3)], 3.0);
    assert!(world
        .entity(cube)
        .unwrap()
        .component::<GraphicsComponent>()
        .is_transform_matrix_cached());
    assert!(!system(&world).is_coordinate_system_invalidated());
}

#[test]
fn test_deferred_overlapping_point_lights_accumulate() {
    let config = RenderConfig::default().with_technique(TechniqueKind::Deferred);
    let (mut world, target) = render_world(&config);

    spawn_light(&mut world, LightFactory::point(Color::rgb(255, 0, 0), 5.0), Vec3::new(0.0, 0.0, 0.5));
    spawn_light(&mut world, LightFactory::point(Color::rgb(0, 255, 0), 5.0), Vec3::new(0.0, 0.0, -0.5));
    spawn_camera(&mut world, Some(target), 0);

    world.update(0.016);
    let commands = take_commands(&mut world);

    let mut states = RenderStates::default();
    let mut additive_draws = 0;
    let mut light_color = Vec4::zeros();
    for command in &commands {
        match command {
            GpuCommand::SetRenderStates(next) => states = *next,
            GpuCommand::SendUniform(name, UniformValue::Vec4(color)) if name == "LightColor" => light_color += color,
            GpuCommand::DrawIndexed(_) if states.is_additive() => additive_draws += 1,
            _ => {}
        }
    }

    // One shading draw per light, both blended additively into the work buffer
    assert_eq!(additive_draws, 2);
    assert_relative_eq!(light_color, Vec4::new(1.0, 1.0, 0.0, 2.0));

    // The final pass lands on the camera target
    let last_target = commands
        .iter()
        .rev()
        .find_map(|command| match command {
            GpuCommand::SetTarget(id) => Some(*id),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_target, target.id);
    assert_eq!(commands.last(), Some(&GpuCommand::DrawFullscreenQuad));
}

#[test]
fn test_empty_target_skips_only_its_camera() {
    let (mut world, target) = render_world(&RenderConfig::default());
    let empty = world
        .system_mut::<RenderSystem>()
        .unwrap()
        .backend_mut::<RecordingBackend>()
        .unwrap()
        .add_window_target(0, 600);

    spawn_cube(&mut world, Vec3::zeros());
    spawn_camera(&mut world, Some(empty), 0);
    spawn_camera(&mut world, Some(target), 1);

    world.update(0.016);
    let commands = take_commands(&mut world);

    assert_eq!(commands.iter().filter(|command| command.is_draw()).count(), 1);
    assert!(!commands.contains(&GpuCommand::SetTarget(empty.id)));
    assert!(commands.contains(&GpuCommand::SetTarget(target.id)));
}

#[test]
fn test_deferred_buffers_are_stable_across_frames() {
    let config = RenderConfig::default().with_technique(TechniqueKind::Deferred);
    let (mut world, target) = render_world(&config);
    let thumbnail = world
        .system_mut::<RenderSystem>()
        .unwrap()
        .backend_mut::<RecordingBackend>()
        .unwrap()
        .add_window_target(320, 240);

    spawn_cube(&mut world, Vec3::zeros());
    spawn_camera(&mut world, Some(target), 0);
    spawn_camera(&mut world, Some(thumbnail), 1);

    let highest_target = |commands: &[GpuCommand]| {
        commands
            .iter()
            .filter_map(|command| match command {
                GpuCommand::SetTarget(id) => Some(id.0),
                _ => None,
            })
            .max()
    };

    let mut highest = Vec::new();
    for _ in 0..5 {
        world.update(0.016);
        highest.push(highest_target(&take_commands(&mut world)));
    }

    assert!(highest.iter().all(|id| *id == highest[0]));
    let backend = system(&world).backend::<RecordingBackend>().unwrap();
    // Two windows plus a G-buffer and a work texture per camera target
    assert_eq!(backend.target_count(), 6);
}

#[test]
fn test_target_notifications_reach_bound_cameras() {
    let config = RenderConfig::default().with_technique(TechniqueKind::Deferred);
    let (mut world, target) = render_world(&config);
    let other = world
        .system_mut::<RenderSystem>()
        .unwrap()
        .backend_mut::<RecordingBackend>()
        .unwrap()
        .add_window_target(320, 240);

    spawn_cube(&mut world, Vec3::zeros());
    let (main, _) = spawn_camera(&mut world, Some(target), 0);
    let (overlay, _) = spawn_camera(&mut world, Some(target), 1);
    let (side, _) = spawn_camera(&mut world, Some(other), 2);
    world.update(0.016);

    let viewport = |world: &mut World, camera: EntityHandle| {
        world
            .entity_mut(camera)
            .unwrap()
            .component_mut::<CameraComponent>()
            .viewport()
    };

    let (render, entities) = world.system_with_entities_mut::<RenderSystem>().unwrap();
    let resized = render
        .backend_mut::<RecordingBackend>()
        .unwrap()
        .resize_target(target.id, 1024, 768)
        .unwrap();
    assert_eq!(render.notify_target_resized(entities, resized), 2);

    for camera in [main, overlay] {
        assert_eq!(viewport(&mut world, camera).unwrap().width, 1024);
    }
    assert_eq!(viewport(&mut world, side).unwrap().width, 320);

    let (render, entities) = world.system_with_entities_mut::<RenderSystem>().unwrap();
    let before = render.backend::<RecordingBackend>().unwrap().target_count();
    render
        .backend_mut::<RecordingBackend>()
        .unwrap()
        .release_target(target.id)
        .unwrap();
    assert_eq!(render.notify_target_released(entities, target.id), 2);
    // The window and the deferred buffers drawn for it are gone
    assert_eq!(render.backend::<RecordingBackend>().unwrap().target_count(), before - 3);

    for camera in [main, overlay] {
        assert!(world.entity(camera).unwrap().component::<CameraComponent>().target().is_none());
    }
    assert_eq!(
        world.entity(side).unwrap().component::<CameraComponent>().target().map(|bound| bound.id),
        Some(other.id)
    );

    // Only the camera still bound draws
    world.update(0.016);
    let commands = take_commands(&mut world);
    assert!(!commands.contains(&GpuCommand::SetTarget(target.id)));
    assert!(commands.contains(&GpuCommand::SetTarget(other.id)));
}
