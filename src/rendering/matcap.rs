//! Matcap lookup math, mirrored by `assets/shaders/matcap.wgsl`.
//!
//! All vectors are in view space unless stated otherwise.

use bevy::prelude::*;

/// Slightly under 0.5 so the lookup never reaches the texture border.
pub const UV_SCALE: f32 = 0.495;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadingMode {
    /// 以光源方向作为 matcap 的基准方向
    #[default]
    Light,
    /// 以视线方向作为基准方向
    View,
}

/// 与 `direction` 垂直的正交基 (x̂, ŷ)。
///
/// `direction` 平行于 ±Y 时 `(d.z, 0, -d.x)` 退化为零向量，此时 x̂ 取 +X。
pub fn matcap_basis(direction: Vec3) -> (Vec3, Vec3) {
    let direction = direction.normalize_or_zero();
    let x = Vec3::new(direction.z, 0.0, -direction.x)
        .try_normalize()
        .unwrap_or(Vec3::X);
    let y = direction.cross(x);
    (x, y)
}

pub fn matcap_uv(normal: Vec3, direction: Vec3) -> Vec2 {
    let normal = normal.normalize_or_zero();
    let (x, y) = matcap_basis(direction);
    Vec2::new(x.dot(normal), y.dot(normal)) * UV_SCALE + Vec2::splat(0.5)
}

/// `1 - (1 - c)^2` per channel.
pub fn contrast_lift(color: Vec4) -> Vec4 {
    let inverse = Vec4::ONE - color;
    Vec4::ONE - inverse * inverse
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// 边缘光：法线与视线越接近垂直越亮，与所选的 matcap 方向无关。
pub fn rim_term(normal: Vec3, eye: Vec3, rim_power: f32) -> f32 {
    let facing = normal.dot(eye.normalize_or_zero()).abs();
    (1.0 - smoothstep(0.0, 1.0, facing)) * rim_power
}

/// Inverse sRGB transfer function for one channel in [0, 1].
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Final fragment colour for a raw (non-linearized) matcap texel.
///
/// Lift and rim are applied to the stored texel values, which are the values
/// meant to reach the screen. The view target sRGB-encodes whatever the
/// fragment returns, so the displayed rgb is decoded here first.
pub fn shade(sample: Vec4, normal: Vec3, eye: Vec3, rim_power: f32) -> Vec4 {
    let lifted = contrast_lift(sample);
    let rim = rim_term(normal, eye, rim_power);
    let displayed = (lifted.truncate() + Vec3::splat(rim)).clamp(Vec3::ZERO, Vec3::ONE);
    Vec4::new(
        srgb_to_linear(displayed.x),
        srgb_to_linear(displayed.y),
        srgb_to_linear(displayed.z),
        lifted.w,
    )
}

/// Shading basis for one fragment.
///
/// `view_from_world` is the camera's view matrix (inverse of its global
/// transform). In light mode the direction points from the fragment to the
/// light, rotated into view space; in view mode it points from the fragment
/// to the camera.
pub fn shading_direction(
    mode: ShadingMode,
    world_position: Vec3,
    view_from_world: Mat4,
    light_position: Vec3,
) -> Vec3 {
    match mode {
        ShadingMode::Light => {
            let light_dir = (light_position - world_position).normalize_or_zero();
            view_from_world.transform_vector3(light_dir).normalize_or_zero()
        }
        ShadingMode::View => {
            let eye = view_from_world.transform_point3(world_position);
            (-eye).normalize_or_zero()
        }
    }
}
