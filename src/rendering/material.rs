use bevy::pbr::{MaterialPipeline, MaterialPipelineKey};
use bevy::prelude::*;
use bevy::reflect::TypePath;
use bevy::render::mesh::MeshVertexBufferLayout;
use bevy::render::render_resource::{
    AsBindGroup, RenderPipelineDescriptor, ShaderRef, ShaderType, SpecializedMeshPipelineError,
};

use super::matcap::ShadingMode;

pub const MATCAP_SHADER_PATH: &str = "shaders/matcap.wgsl";

#[derive(ShaderType, Debug, Clone, Copy, PartialEq)]
pub struct MatcapUniform {
    pub light_position: Vec3,
    /// 0 = 视线方向, 1 = 光源方向
    pub use_light: u32,
    pub rim_power: f32,
}

impl Default for MatcapUniform {
    fn default() -> Self {
        Self {
            light_position: Vec3::ZERO,
            use_light: 1,
            rim_power: 0.15,
        }
    }
}

/// 自定义 matcap 材质，双面渲染。
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone, Default)]
pub struct MatcapMaterial {
    #[uniform(0)]
    pub uniform: MatcapUniform,
    #[texture(1)]
    #[sampler(2)]
    pub matcap_texture: Option<Handle<Image>>,
}

impl MatcapMaterial {
    pub fn new(light_position: Vec3, mode: ShadingMode, rim_power: f32) -> Self {
        let mut material = Self::default();
        material.uniform.rim_power = rim_power;
        material.set_light_position(light_position);
        material.set_shading_mode(mode);
        material
    }

    /// Swaps the sampled matcap. One handle assignment, so the renderer
    /// never observes a half-updated texture.
    pub fn set_matcap_texture(&mut self, texture: Handle<Image>) {
        self.matcap_texture = Some(texture);
    }

    pub fn has_texture(&self) -> bool {
        self.matcap_texture.is_some()
    }

    pub fn set_light_position(&mut self, position: Vec3) {
        self.uniform.light_position = position;
    }

    pub fn set_shading_mode(&mut self, mode: ShadingMode) {
        self.uniform.use_light = match mode {
            ShadingMode::Light => 1,
            ShadingMode::View => 0,
        };
    }
}

impl Material for MatcapMaterial {
    fn fragment_shader() -> ShaderRef {
        MATCAP_SHADER_PATH.into()
    }

    fn specialize(
        _pipeline: &MaterialPipeline<Self>,
        descriptor: &mut RenderPipelineDescriptor,
        _layout: &MeshVertexBufferLayout,
        _key: MaterialPipelineKey<Self>,
    ) -> Result<(), SpecializedMeshPipelineError> {
        descriptor.primitive.cull_mode = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_material_has_no_texture_until_set() {
        let mut material = MatcapMaterial::new(Vec3::ONE, ShadingMode::View, 0.15);
        assert!(!material.has_texture());
        material.set_matcap_texture(Handle::default());
        assert!(material.has_texture());
    }

    #[test]
    fn shading_mode_sets_use_light_flag() {
        let mut material = MatcapMaterial::new(Vec3::ZERO, ShadingMode::Light, 0.15);
        assert_eq!(material.uniform.use_light, 1);
        material.set_shading_mode(ShadingMode::View);
        assert_eq!(material.uniform.use_light, 0);
    }
}
