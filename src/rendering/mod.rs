use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;
use bevy::window::WindowResized;

pub mod material;
pub mod matcap;
pub mod texture_loader;

use material::MatcapMaterial;
use texture_loader::*;
use crate::controller::OrbitController;
use crate::renderer::FrameSet;
use crate::state::RendererState;
use crate::surface::DisplacedSurface;

pub const CAMERA_START: Vec3 = Vec3::new(0.0, 1.0, 10.0);
pub const CAMERA_FOV_DEGREES: f32 = 45.0;
pub const CAMERA_NEAR: f32 = 1.0;
pub const CAMERA_FAR: f32 = 50.0;

pub struct RenderingPlugin;

impl Plugin for RenderingPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(MaterialPlugin::<MatcapMaterial>::default())
            .add_systems(Startup, (setup_camera, setup_light_marker, start_matcap_loading))
            .add_systems(
                Update,
                (
                    apply_viewport_resize.in_set(FrameSet::Input),
                    (poll_matcap_assets, poll_thumbnail_tasks, apply_initial_selection)
                        .chain()
                        .in_set(FrameSet::Input),
                    (sync_matcap_material, update_light_marker).in_set(FrameSet::Upload),
                ),
            );
    }
}

/// 标记光源位置的小球
#[derive(Component)]
pub struct LightMarker;

fn setup_camera(mut commands: Commands, state: Res<RendererState>) {
    let controller = OrbitController::looking_from(CAMERA_START, Vec3::ZERO);
    commands.spawn((
        Camera3dBundle {
            projection: Projection::Perspective(PerspectiveProjection {
                fov: CAMERA_FOV_DEGREES.to_radians(),
                near: CAMERA_NEAR,
                far: CAMERA_FAR,
                aspect_ratio: state.viewport().aspect_ratio,
            }),
            transform: controller.transform(),
            tonemapping: Tonemapping::None,
            ..default()
        },
        controller,
    ));
}

fn setup_light_marker(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    state: Res<RendererState>,
) {
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Mesh::from(shape::UVSphere {
                radius: 0.2,
                sectors: 16,
                stacks: 16,
            })),
            material: materials.add(StandardMaterial {
                base_color: Color::WHITE,
                unlit: true,
                ..default()
            }),
            transform: Transform::from_translation(state.light_position()),
            ..default()
        },
        LightMarker,
    ));
}

/// 窗口尺寸变化时更新视口与投影的宽高比，不触碰网格几何。
pub fn apply_viewport_resize(
    mut resized: EventReader<WindowResized>,
    mut state: ResMut<RendererState>,
    mut projections: Query<&mut Projection, With<Camera3d>>,
) {
    // most recent size wins
    let Some(latest) = resized.read().last() else {
        return;
    };
    if !state.resize(latest.width, latest.height) {
        return;
    }

    let aspect_ratio = state.viewport().aspect_ratio;
    for mut projection in projections.iter_mut() {
        if let Projection::Perspective(ref mut perspective) = *projection {
            perspective.aspect_ratio = aspect_ratio;
        }
    }
    debug!("Viewport resized to {}x{}", latest.width, latest.height);
}

/// Pushes the current parameters and active matcap into the surface material.
/// The surface stays hidden until a matcap has been selected.
fn sync_matcap_material(
    state: Res<RendererState>,
    library: Res<MatcapLibrary>,
    mut materials: ResMut<Assets<MatcapMaterial>>,
    mut surfaces: Query<(&Handle<MatcapMaterial>, &mut Visibility), With<DisplacedSurface>>,
) {
    if !state.is_changed() && !library.is_changed() {
        return;
    }

    for (handle, mut visibility) in surfaces.iter_mut() {
        let Some(material) = materials.get_mut(handle) else {
            continue;
        };
        material.set_light_position(state.light_position());
        material.set_shading_mode(state.shading_mode());
        if let Some(texture) = library.active_texture() {
            if material.matcap_texture.as_ref() != Some(texture) {
                material.set_matcap_texture(texture.clone());
            }
        }

        let wanted = if material.has_texture() {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        if *visibility != wanted {
            *visibility = wanted;
        }
    }
}

fn update_light_marker(
    state: Res<RendererState>,
    mut markers: Query<&mut Transform, With<LightMarker>>,
) {
    if !state.is_changed() {
        return;
    }
    for mut transform in markers.iter_mut() {
        transform.translation = state.light_position();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::grid::PlaneGrid;

    fn resize_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_event::<WindowResized>()
            .insert_resource(RendererState::default())
            .add_systems(Update, apply_viewport_resize);
        app
    }

    fn send_resize(app: &mut App, width: f32, height: f32) {
        app.world.send_event(WindowResized {
            window: Entity::PLACEHOLDER,
            width,
            height,
        });
        app.update();
    }

    #[test]
    fn resize_updates_camera_aspect_and_leaves_mesh_alone() {
        let mut app = resize_app();
        let camera = app
            .world
            .spawn((Camera3d::default(), Projection::default()))
            .id();
        let grid = PlaneGrid::from_resolution(5.0, 4.0, 12);
        let surface = app
            .world
            .spawn(DisplacedSurface {
                grid: grid.clone(),
                mesh: Handle::default(),
            })
            .id();

        send_resize(&mut app, 800.0, 600.0);
        send_resize(&mut app, 400.0, 300.0);

        let Some(Projection::Perspective(perspective)) = app.world.get::<Projection>(camera) else {
            panic!("camera lost its perspective projection");
        };
        assert_eq!(perspective.aspect_ratio, 400.0 / 300.0);
        assert_eq!(
            app.world.resource::<RendererState>().viewport().aspect_ratio,
            400.0 / 300.0
        );
        let after = app.world.get::<DisplacedSurface>(surface).map(|s| &s.grid);
        assert_eq!(after, Some(&grid));
    }

    #[test]
    fn minimized_window_keeps_previous_aspect() {
        let mut app = resize_app();
        let camera = app
            .world
            .spawn((Camera3d::default(), Projection::default()))
            .id();

        send_resize(&mut app, 1000.0, 500.0);
        send_resize(&mut app, 0.0, 0.0);

        let Some(Projection::Perspective(perspective)) = app.world.get::<Projection>(camera) else {
            panic!("camera lost its perspective projection");
        };
        assert_eq!(perspective.aspect_ratio, 2.0);
    }
}
