use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use matcap_plane::renderer::advance_frame;
use matcap_plane::rendering::matcap::{matcap_uv, shading_direction, ShadingMode};
use matcap_plane::state::RendererState;
use matcap_plane::surface::displacement::DisplacementGenerator;
use matcap_plane::surface::grid::PlaneGrid;
use matcap_plane::surface::plane_rotation;

fn default_grid(state: &RendererState) -> PlaneGrid {
    PlaneGrid::from_resolution(5.0, 4.0, state.resolution())
}

#[test]
fn zero_amplitude_stays_flat_across_frames() {
    let mut state = RendererState::default();
    state.set_amplitude(0.0);
    let generator = DisplacementGenerator::new(12345);
    let mut grid = default_grid(&state);

    let mut t = 0.0;
    for _ in 0..120 {
        advance_frame(&state, &mut grid, &generator, t);
        assert!(grid.is_flat(), "surface moved at t={t}");
        t += 16.6;
    }
    assert!(grid.normals().iter().all(|n| (*n - Vec3::Z).length() < 1e-6));
}

#[test]
fn amplitude_change_takes_effect_next_frame() {
    let mut state = RendererState::default();
    let generator = DisplacementGenerator::new(12345);
    let mut grid = default_grid(&state);

    advance_frame(&state, &mut grid, &generator, 4000.0);
    assert!(!grid.is_flat());

    state.set_amplitude(0.0);
    advance_frame(&state, &mut grid, &generator, 4016.0);
    assert!(grid.is_flat());
}

#[test]
fn switching_shading_mode_moves_the_lookup() {
    let mut state = RendererState::default();
    state.set_light_theta(0.0);
    state.set_light_phi(FRAC_PI_2);
    let view = Transform::from_xyz(0.0, 1.0, 10.0)
        .looking_at(Vec3::ZERO, Vec3::Y)
        .compute_matrix()
        .inverse();

    let world_position = Vec3::new(0.5, 0.0, 0.2);
    let normal = view
        .transform_vector3(plane_rotation() * Vec3::new(0.1, 0.2, 1.0).normalize())
        .normalize();

    let light_dir = shading_direction(
        state.shading_mode(),
        world_position,
        view,
        state.light_position(),
    );
    state.set_use_light(false);
    let view_dir = shading_direction(
        state.shading_mode(),
        world_position,
        view,
        state.light_position(),
    );

    assert_eq!(state.shading_mode(), ShadingMode::View);
    let lit = matcap_uv(normal, light_dir);
    let viewed = matcap_uv(normal, view_dir);
    assert!((lit - viewed).length() > 1e-3, "{lit:?} vs {viewed:?}");
}

#[test]
fn light_slider_values_place_the_light() {
    let mut state = RendererState::default();
    state.set_light_distance(2.0);
    state.set_light_theta(FRAC_PI_2);
    state.set_light_phi(FRAC_PI_2);
    assert!((state.light_position() - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
}

#[test]
fn resize_never_rebuilds_the_grid() {
    let mut state = RendererState::default();
    let grid = default_grid(&state);
    let topology = (grid.segments(), grid.indices().to_vec());

    assert!(state.resize(640.0, 480.0));
    let rebuilt = default_grid(&state);
    assert_eq!((rebuilt.segments(), rebuilt.indices().to_vec()), topology);
    assert_eq!(state.viewport().aspect_ratio, 640.0 / 480.0);
}
