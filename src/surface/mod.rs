use std::f32::consts::{FRAC_PI_2, PI};

use bevy::prelude::*;
use bevy::render::primitives::Aabb;

use self::displacement::DisplacementGenerator;
use self::grid::PlaneGrid;
use crate::config::DemoConfig;
use crate::renderer::{advance_frame, frame_time_ms, FrameSet};
use crate::rendering::material::MatcapMaterial;
use crate::state::RendererState;

pub mod displacement;
pub mod grid;

pub struct SurfacePlugin;

impl Plugin for SurfacePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_surface).add_systems(
            Update,
            (
                displace_surface.in_set(FrameSet::Displace),
                upload_surface_mesh.in_set(FrameSet::Upload),
            ),
        );
    }
}

/// 动画平面：CPU 侧网格与对应的 GPU 网格句柄。
#[derive(Component)]
pub struct DisplacedSurface {
    pub grid: PlaneGrid,
    pub mesh: Handle<Mesh>,
}

#[derive(Resource)]
pub struct SurfaceNoise(pub DisplacementGenerator);

pub fn plane_rotation() -> Quat {
    Quat::from_euler(EulerRot::XYZ, -FRAC_PI_2, 0.0, 0.15 * PI)
}

fn setup_surface(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<MatcapMaterial>>,
    config: Res<DemoConfig>,
    state: Res<RendererState>,
) {
    let surface = &config.surface;
    let grid = PlaneGrid::from_resolution(surface.width, surface.height, state.resolution());
    info!(
        "Plane grid {}x{} segments, {} vertices",
        grid.segments().x,
        grid.segments().y,
        grid.vertex_count()
    );

    let bounds = grid.bounds();
    let mesh = meshes.add(grid.build_mesh());
    let material = materials.add(MatcapMaterial::new(
        state.light_position(),
        state.shading_mode(),
        state.rim_power(),
    ));

    commands.insert_resource(SurfaceNoise(DisplacementGenerator::new(surface.noise_seed)));
    commands.spawn((
        MaterialMeshBundle {
            mesh: mesh.clone(),
            material,
            transform: Transform::from_rotation(plane_rotation()),
            // 纹理选中之前不绘制
            visibility: Visibility::Hidden,
            ..default()
        },
        DisplacedSurface { grid, mesh },
        bounds,
    ));
}

fn displace_surface(
    time: Res<Time>,
    state: Res<RendererState>,
    noise: Res<SurfaceNoise>,
    mut surfaces: Query<&mut DisplacedSurface>,
) {
    let time_ms = frame_time_ms(&time);
    for mut surface in &mut surfaces {
        advance_frame(&state, &mut surface.grid, &noise.0, time_ms);
    }
}

/// Pushes the displaced grid into its mesh and refreshes the culling bounds.
/// Bevy only computes an `Aabb` for entities that have none.
pub fn upload_surface_mesh(
    mut meshes: ResMut<Assets<Mesh>>,
    mut surfaces: Query<(&DisplacedSurface, &mut Aabb)>,
) {
    for (surface, mut bounds) in &mut surfaces {
        if let Some(mesh) = meshes.get_mut(&surface.mesh) {
            surface.grid.write_to_mesh(mesh);
        }
        *bounds = surface.grid.bounds();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_refreshes_culling_bounds() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<Assets<Mesh>>()
            .add_systems(Update, upload_surface_mesh);

        let mut grid = PlaneGrid::new(5.0, 4.0, 5, 4);
        let stale = grid.bounds();
        DisplacementGenerator::new(12345).displace(&mut grid, 2500.0, 1.5);
        let expected = grid.bounds();
        assert!(!grid.is_flat());

        let surface = app
            .world
            .spawn((
                DisplacedSurface {
                    grid,
                    mesh: Handle::default(),
                },
                stale,
            ))
            .id();
        app.update();

        let bounds = app.world.get::<Aabb>(surface).cloned();
        assert_eq!(bounds.map(|b| b.half_extents), Some(expected.half_extents));
        assert_eq!(bounds.map(|b| b.center), Some(expected.center));
    }
}
