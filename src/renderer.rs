use bevy::prelude::*;

use crate::state::RendererState;
use crate::surface::displacement::DisplacementGenerator;
use crate::surface::grid::PlaneGrid;

/// Per-frame ordering: UI edits, then input and resize, then displacement,
/// then pushing results to the GPU-facing assets.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSet {
    Ui,
    Input,
    Displace,
    Upload,
}

pub fn configure_frame_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            FrameSet::Ui,
            FrameSet::Input,
            FrameSet::Displace,
            FrameSet::Upload,
        )
            .chain(),
    );
}

/// 动画时间（毫秒），位移噪声的漂移速度以毫秒为单位。
pub fn frame_time_ms(time: &Time) -> f64 {
    time.elapsed_seconds_f64() * 1000.0
}

/// 推进一帧：按当前参数重写网格深度并重算法线。
pub fn advance_frame(
    state: &RendererState,
    grid: &mut PlaneGrid,
    generator: &DisplacementGenerator,
    time_ms: f64,
) {
    generator.displace(grid, time_ms, state.amplitude());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_uses_current_amplitude() {
        let generator = DisplacementGenerator::new(2);
        let mut state = RendererState::default();
        let mut grid = PlaneGrid::from_resolution(5.0, 4.0, 2);

        advance_frame(&state, &mut grid, &generator, 800.0);
        let full: Vec<f32> = grid.positions().iter().map(|p| p.z).collect();

        state.set_amplitude(0.5);
        advance_frame(&state, &mut grid, &generator, 800.0);
        for (half, full) in grid.positions().iter().map(|p| p.z).zip(full) {
            assert!((half - full * 0.5).abs() < 1e-5);
        }
    }
}
