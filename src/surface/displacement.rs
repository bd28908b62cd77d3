use noise::{NoiseFn, Perlin};

use super::grid::PlaneGrid;

/// 单层噪声：空间频率、每个轴上的时间漂移速度（每毫秒）以及权重。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseOctave {
    pub spatial_scale: f64,
    pub drift: [f64; 2],
    pub weight: f64,
}

impl NoiseOctave {
    fn sample_point(&self, x: f64, y: f64, time_ms: f64) -> [f64; 3] {
        [
            self.spatial_scale * x + self.drift[0] * time_ms,
            self.spatial_scale * y + self.drift[1] * time_ms,
            0.0,
        ]
    }
}

/// Two octaves drifting in different directions at different rates; the
/// second one is 2.5x wider and subtracted at 1.5x weight.
pub const DISPLACEMENT_OCTAVES: [NoiseOctave; 2] = [
    NoiseOctave {
        spatial_scale: 0.5,
        drift: [0.0005, 0.0005],
        weight: 1.0,
    },
    NoiseOctave {
        spatial_scale: 0.2,
        drift: [-0.0002, 0.0002],
        weight: -1.5,
    },
];

/// 位移生成器：用两层梯度噪声计算每个顶点的深度。
pub struct DisplacementGenerator {
    noise: Perlin,
}

impl DisplacementGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            noise: Perlin::new(seed),
        }
    }

    /// 计算 (x, y) 在 `time_ms` 时刻的深度值
    pub fn height(&self, x: f32, y: f32, time_ms: f64, amplitude: f32) -> f32 {
        let (x, y) = (x as f64, y as f64);
        let layered: f64 = DISPLACEMENT_OCTAVES
            .iter()
            .map(|octave| octave.weight * self.noise.get(octave.sample_point(x, y, time_ms)))
            .sum();
        (layered * amplitude as f64) as f32
    }

    /// Rewrites the depth of every vertex, then recomputes normals from the
    /// new positions.
    pub fn displace(&self, grid: &mut PlaneGrid, time_ms: f64, amplitude: f32) {
        for i in 0..grid.vertex_count() {
            let base = grid.positions()[i];
            let z = self.height(base.x, base.y, time_ms, amplitude);
            grid.set_depth(i, z);
        }
        grid.recompute_normals();
    }
}
