use bevy::diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin};
use bevy::log::LogPlugin;
use bevy::prelude::*;

use matcap_plane::config::DemoConfig;
use matcap_plane::controller::ControllerPlugin;
use matcap_plane::renderer::configure_frame_sets;
use matcap_plane::rendering::texture_loader::MatcapLibrary;
use matcap_plane::rendering::RenderingPlugin;
use matcap_plane::state::RendererState;
use matcap_plane::surface::SurfacePlugin;
use matcap_plane::ui::UiPlugin;
use matcap_plane::ui_strings::UiStringManager;

/// 配置在日志插件初始化之前读取，读取失败的原因留到启动后再记录
#[derive(Resource)]
struct ConfigWarning(Option<String>);

fn report_config(
    warning: Res<ConfigWarning>,
    config: Res<DemoConfig>,
    state: Res<RendererState>,
) {
    if let Some(message) = &warning.0 {
        warn!("{message}, using default configuration");
    }
    info!(
        "Matcap plane: {} textures, resolution {}, amplitude {:.2}",
        config.matcaps.textures.len(),
        state.resolution(),
        state.amplitude()
    );
}

fn main() {
    let (config, config_error) = DemoConfig::load_with_fallback(DemoConfig::resolve_path());

    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: config.window.title.clone(),
                    resolution: (config.window.width, config.window.height).into(),
                    resizable: true,
                    ..default()
                }),
                ..default()
            })
            .set(LogPlugin {
                filter: config.diagnostics.log_filter.clone(),
                ..default()
            }),
    );

    if config.diagnostics.frame_time {
        app.add_plugins(LogDiagnosticsPlugin::default())
            .add_plugins(FrameTimeDiagnosticsPlugin::default());
    }

    configure_frame_sets(&mut app);
    app.insert_resource(ClearColor(Color::BLACK))
        .insert_resource(config.msaa())
        .insert_resource(ConfigWarning(config_error.map(|e| e.to_string())))
        .insert_resource(RendererState::from_config(&config))
        .insert_resource(MatcapLibrary::from_config(&config))
        .insert_resource(UiStringManager::new())
        .insert_resource(config)
        .add_plugins(UiPlugin)
        .add_plugins(ControllerPlugin)
        .add_plugins(RenderingPlugin)
        .add_plugins(SurfacePlugin)
        .add_systems(Startup, report_config)
        .run();
}
