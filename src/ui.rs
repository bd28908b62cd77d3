use std::collections::HashMap;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::{egui, EguiContexts, EguiPlugin};

use crate::config::DemoConfig;
use crate::renderer::FrameSet;
use crate::rendering::texture_loader::MatcapLibrary;
use crate::state::{
    RendererState, AMPLITUDE_RANGE, LIGHT_DISTANCE_RANGE, LIGHT_PHI_RANGE, LIGHT_THETA_RANGE,
};
use crate::ui_strings::UiStringManager;

pub const MIN_THUMBNAIL_EDGE: f32 = 32.0;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .init_resource::<MatcapPreviews>()
            .add_systems(
                Update,
                (register_matcap_previews, controls_ui, matcap_picker_ui)
                    .chain()
                    .in_set(FrameSet::Ui),
            );
    }
}

/// 已注册到 egui 的缩略图纹理
#[derive(Resource, Default)]
pub struct MatcapPreviews {
    textures: HashMap<usize, egui::TextureId>,
}

/// Thumbnail edge for the picker: 80% of the shorter window side, minus
/// padding, shared between the visible thumbnails.
pub fn thumbnail_edge(window: Vec2, padding: f32, count: usize, max_edge: f32) -> f32 {
    let available = 0.8 * window.x.min(window.y) - 4.0 * padding;
    let per_item = available / count.max(1) as f32;
    per_item.clamp(MIN_THUMBNAIL_EDGE, max_edge.max(MIN_THUMBNAIL_EDGE))
}

fn register_matcap_previews(
    mut contexts: EguiContexts,
    library: Res<MatcapLibrary>,
    mut previews: ResMut<MatcapPreviews>,
) {
    if !library.is_changed() {
        return;
    }
    for (index, loaded) in library.ready() {
        if !previews.textures.contains_key(&index) {
            let id = contexts.add_image(loaded.thumbnail.clone());
            previews.textures.insert(index, id);
        }
    }
}

fn controls_ui(
    mut contexts: EguiContexts,
    mut state: ResMut<RendererState>,
    strings: Res<UiStringManager>,
) {
    let labels = &strings.strings.controls;
    let before = state.shading_params();
    let mut params = before;

    egui::Window::new(labels.window_title.as_str())
        .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
        .resizable(false)
        .show(contexts.ctx_mut(), |ui| {
            ui.add(egui::Slider::new(&mut params.amplitude, AMPLITUDE_RANGE).text(labels.amplitude.as_str()));

            egui::CollapsingHeader::new(labels.light_section.as_str())
                .default_open(true)
                .show(ui, |ui| {
                    ui.add(
                        egui::Slider::new(&mut params.light.distance, LIGHT_DISTANCE_RANGE)
                            .text(labels.distance.as_str()),
                    );
                    ui.add(
                        egui::Slider::new(&mut params.light.theta, LIGHT_THETA_RANGE)
                            .text(labels.longitude.as_str()),
                    );
                    ui.add(
                        egui::Slider::new(&mut params.light.phi, LIGHT_PHI_RANGE)
                            .text(labels.latitude.as_str()),
                    );
                });

            ui.checkbox(&mut params.use_light, labels.use_light.as_str());
        });

    // 只有参数真的变化时才写入，避免每帧触发变更检测
    if params != before {
        state.set_shading_params(params);
    }
}

fn matcap_picker_ui(
    mut contexts: EguiContexts,
    mut library: ResMut<MatcapLibrary>,
    previews: Res<MatcapPreviews>,
    config: Res<DemoConfig>,
    strings: Res<UiStringManager>,
    primary_window: Query<&Window, With<PrimaryWindow>>,
) {
    let labels = &strings.strings.matcaps;
    let padding = config.matcaps.preview_padding;
    let window_size = primary_window
        .get_single()
        .map(|w| Vec2::new(w.width(), w.height()))
        .unwrap_or(Vec2::new(config.window.width, config.window.height));

    let visible = library.ready().count();
    let edge = thumbnail_edge(
        window_size,
        padding,
        visible,
        config.matcaps.thumbnail_size as f32,
    );
    let active = library.active();
    let mut clicked = None;

    egui::SidePanel::left("matcap_previews")
        .resizable(false)
        .show(contexts.ctx_mut(), |ui| {
            ui.heading(labels.title.as_str());

            if visible == 0 {
                let text = if library.is_settled() {
                    labels.empty.as_str()
                } else {
                    labels.loading.as_str()
                };
                ui.label(text);
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                for (index, _) in library.ready() {
                    let Some(&texture_id) = previews.textures.get(&index) else {
                        continue;
                    };
                    let button = egui::ImageButton::new(egui::load::SizedTexture::new(
                        texture_id,
                        [edge, edge],
                    ))
                    .selected(active == Some(index));

                    egui::Frame::none().inner_margin(padding).show(ui, |ui| {
                        if ui.add(button).clicked() {
                            clicked = Some(index);
                        }
                    });
                }
            });

            let failed = library.failed_count();
            if failed > 0 {
                ui.weak(format!("{failed} {}", labels.failed));
            }
        });

    if let Some(index) = clicked {
        if active != Some(index) && library.select(index).is_some() {
            info!("Selected matcap {index}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnails_share_the_shorter_side() {
        let edge = thumbnail_edge(Vec2::new(1280.0, 720.0), 3.0, 7, 96.0);
        let expected = (0.8 * 720.0 - 12.0) / 7.0;
        assert!((edge - expected).abs() < 1e-4);
    }

    #[test]
    fn thumbnail_edge_is_clamped() {
        assert_eq!(thumbnail_edge(Vec2::new(4000.0, 4000.0), 3.0, 1, 96.0), 96.0);
        assert_eq!(thumbnail_edge(Vec2::new(100.0, 100.0), 3.0, 7, 96.0), MIN_THUMBNAIL_EDGE);
        assert_eq!(thumbnail_edge(Vec2::new(800.0, 600.0), 3.0, 0, 96.0), 96.0);
    }
}
