use std::f32::consts::{PI, TAU};

use bevy::input::mouse::MouseMotion;
use bevy::input::Input;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;

use crate::renderer::FrameSet;

pub struct ControllerPlugin;

impl Plugin for ControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (handle_orbit_drag, apply_orbit)
                .chain()
                .in_set(FrameSet::Input),
        );
    }
}

/// 轨道相机：只允许旋转（无缩放、无平移），带阻尼，极角限制在 [0.4π, 0.6π]。
#[derive(Component, Debug, Clone, PartialEq)]
pub struct OrbitController {
    pub target: Vec3,
    pub radius: f32,
    /// 绕 Y 轴的水平角，从 +Z 量起
    pub azimuth: f32,
    /// 从 +Y 量起的极角
    pub polar: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    pub damping: f32,
    pub rotate_speed: f32,
    pending: Vec2,
}

impl OrbitController {
    pub fn looking_from(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let radius = offset.length();
        let azimuth = offset.x.atan2(offset.z);
        let polar = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };
        Self {
            target,
            radius,
            azimuth,
            polar,
            min_polar: 0.4 * PI,
            max_polar: 0.6 * PI,
            damping: 0.05,
            rotate_speed: 1.0,
            pending: Vec2::ZERO,
        }
    }

    /// Queues a pointer drag, in pixels, against a viewport of the given height.
    pub fn drag(&mut self, delta: Vec2, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let scale = TAU * self.rotate_speed / viewport_height;
        self.pending.x -= delta.x * scale;
        self.pending.y -= delta.y * scale;
    }

    /// 每帧消耗一部分累积的旋转量，剩余部分按阻尼衰减。
    pub fn update(&mut self) {
        self.azimuth += self.pending.x * self.damping;
        self.polar = (self.polar + self.pending.y * self.damping).clamp(self.min_polar, self.max_polar);
        self.pending *= 1.0 - self.damping;
        if self.pending.length_squared() < 1e-12 {
            self.pending = Vec2::ZERO;
        }
    }

    pub fn is_settled(&self) -> bool {
        self.pending == Vec2::ZERO
    }

    pub fn position(&self) -> Vec3 {
        let sin_polar = self.polar.sin();
        self.target
            + self.radius
                * Vec3::new(
                    sin_polar * self.azimuth.sin(),
                    self.polar.cos(),
                    sin_polar * self.azimuth.cos(),
                )
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position()).looking_at(self.target, Vec3::Y)
    }
}

fn handle_orbit_drag(
    mut mouse_motion: EventReader<MouseMotion>,
    mouse_buttons: Res<Input<MouseButton>>,
    mut contexts: EguiContexts,
    primary_window: Query<&Window, With<PrimaryWindow>>,
    mut controllers: Query<&mut OrbitController>,
) {
    let delta: Vec2 = mouse_motion.read().map(|motion| motion.delta).sum();

    if !mouse_buttons.pressed(MouseButton::Left) || delta == Vec2::ZERO {
        return;
    }
    // 鼠标在 UI 上时不旋转相机
    if contexts.ctx_mut().wants_pointer_input() {
        return;
    }
    let Ok(window) = primary_window.get_single() else {
        return;
    };

    for mut controller in controllers.iter_mut() {
        controller.drag(delta, window.height());
    }
}

fn apply_orbit(mut cameras: Query<(&mut OrbitController, &mut Transform)>) {
    for (mut controller, mut transform) in cameras.iter_mut() {
        // clamp runs even when idle so a fresh controller settles into range
        controller.update();
        *transform = controller.transform();
    }
}
