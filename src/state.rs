use std::f32::consts::{FRAC_PI_4, PI};
use std::ops::RangeInclusive;

use bevy::prelude::*;

use crate::config::DemoConfig;
use crate::rendering::matcap::ShadingMode;

pub const AMPLITUDE_RANGE: RangeInclusive<f32> = 0.0..=1.5;
pub const LIGHT_DISTANCE_RANGE: RangeInclusive<f32> = 1.0..=10.0;
pub const LIGHT_THETA_RANGE: RangeInclusive<f32> = -PI..=PI;
pub const LIGHT_PHI_RANGE: RangeInclusive<f32> = 0.1..=(PI - 0.1);

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    value.clamp(*range.start(), *range.end())
}

/// 球坐标转笛卡尔坐标：`theta` 为水平角（经度），`phi` 为从 +Y 量起的极角（纬度）。
pub fn spherical_to_cartesian(distance: f32, theta: f32, phi: f32) -> Vec3 {
    Vec3::new(
        distance * phi.sin() * theta.cos(),
        distance * phi.cos(),
        distance * phi.sin() * theta.sin(),
    )
}

/// Point light placed on a sphere around the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRig {
    pub distance: f32,
    pub theta: f32,
    pub phi: f32,
}

impl LightRig {
    pub fn position(&self) -> Vec3 {
        spherical_to_cartesian(self.distance, self.theta, self.phi)
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            distance: 3.0,
            theta: FRAC_PI_4,
            phi: FRAC_PI_4,
        }
    }
}

/// Everything the UI may change about shading in one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingParams {
    pub amplitude: f32,
    pub light: LightRig,
    pub use_light: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub aspect_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            aspect_ratio: width / height,
        }
    }
}

/// 渲染状态：UI 通过 setter 写入，渲染系统每帧读取一次。
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct RendererState {
    amplitude: f32,
    light: LightRig,
    light_position: Vec3,
    use_light: bool,
    resolution: u32,
    rim_power: f32,
    viewport: Viewport,
}

impl Default for RendererState {
    fn default() -> Self {
        Self::from_config(&DemoConfig::default())
    }
}

impl RendererState {
    pub fn from_config(config: &DemoConfig) -> Self {
        let shading = &config.shading;
        let mut state = Self {
            amplitude: 0.0,
            light: LightRig::default(),
            light_position: Vec3::ZERO,
            use_light: shading.use_light,
            resolution: config.surface.resolution,
            rim_power: shading.rim_power,
            viewport: Viewport::new(config.window.width, config.window.height),
        };
        state.set_shading_params(ShadingParams {
            amplitude: shading.amplitude,
            light: LightRig {
                distance: shading.light_distance,
                theta: shading.light_theta,
                phi: shading.light_phi,
            },
            use_light: shading.use_light,
        });
        state
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn light(&self) -> LightRig {
        self.light
    }

    /// Cached Cartesian light position, refreshed by the light setters.
    pub fn light_position(&self) -> Vec3 {
        self.light_position
    }

    pub fn use_light(&self) -> bool {
        self.use_light
    }

    pub fn shading_mode(&self) -> ShadingMode {
        if self.use_light {
            ShadingMode::Light
        } else {
            ShadingMode::View
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn rim_power(&self) -> f32 {
        self.rim_power
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn shading_params(&self) -> ShadingParams {
        ShadingParams {
            amplitude: self.amplitude,
            light: self.light,
            use_light: self.use_light,
        }
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = clamp_to(amplitude, &AMPLITUDE_RANGE);
    }

    pub fn set_light_distance(&mut self, distance: f32) {
        self.light.distance = clamp_to(distance, &LIGHT_DISTANCE_RANGE);
        self.refresh_light_position();
    }

    pub fn set_light_theta(&mut self, theta: f32) {
        self.light.theta = clamp_to(theta, &LIGHT_THETA_RANGE);
        self.refresh_light_position();
    }

    pub fn set_light_phi(&mut self, phi: f32) {
        self.light.phi = clamp_to(phi, &LIGHT_PHI_RANGE);
        self.refresh_light_position();
    }

    pub fn set_use_light(&mut self, use_light: bool) {
        self.use_light = use_light;
    }

    pub fn set_shading_params(&mut self, params: ShadingParams) {
        self.set_amplitude(params.amplitude);
        self.light = LightRig {
            distance: clamp_to(params.light.distance, &LIGHT_DISTANCE_RANGE),
            theta: clamp_to(params.light.theta, &LIGHT_THETA_RANGE),
            phi: clamp_to(params.light.phi, &LIGHT_PHI_RANGE),
        };
        self.refresh_light_position();
        self.use_light = params.use_light;
    }

    /// 更新视口尺寸与宽高比。最小化时窗口尺寸为 0，此时忽略。
    pub fn resize(&mut self, width: f32, height: f32) -> bool {
        if width <= 0.0 || height <= 0.0 {
            return false;
        }
        self.viewport = Viewport::new(width, height);
        true
    }

    fn refresh_light_position(&mut self) {
        self.light_position = self.light.position();
    }
}
