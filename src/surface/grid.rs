use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::render::primitives::Aabb;

/// 平面网格：顶点按行排列，从 +y（顶部）到 -y，每行从 -x 到 +x。
///
/// 拓扑（索引）和每个顶点的 x/y 在创建后固定，只有深度（z）和法线会每帧变化。
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneGrid {
    segments_x: u32,
    segments_y: u32,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
}

impl PlaneGrid {
    pub fn new(width: f32, height: f32, segments_x: u32, segments_y: u32) -> Self {
        let segments_x = segments_x.max(1);
        let segments_y = segments_y.max(1);
        let columns = segments_x + 1;
        let rows = segments_y + 1;
        let vertex_count = (columns * rows) as usize;

        let segment_width = width / segments_x as f32;
        let segment_height = height / segments_y as f32;

        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);

        for iy in 0..rows {
            let y = height * 0.5 - iy as f32 * segment_height;
            for ix in 0..columns {
                let x = ix as f32 * segment_width - width * 0.5;
                positions.push(Vec3::new(x, y, 0.0));
                normals.push(Vec3::Z);
                uvs.push([
                    ix as f32 / segments_x as f32,
                    iy as f32 / segments_y as f32,
                ]);
            }
        }

        let mut indices = Vec::with_capacity((segments_x * segments_y * 6) as usize);
        for iy in 0..segments_y {
            for ix in 0..segments_x {
                let a = ix + columns * iy;
                let b = ix + columns * (iy + 1);
                let c = (ix + 1) + columns * (iy + 1);
                let d = (ix + 1) + columns * iy;
                // 两个三角形都以 +Z 为正面（逆时针）
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            segments_x,
            segments_y,
            positions,
            normals,
            uvs,
            indices,
        }
    }

    /// `resolution` segments per world unit on both axes.
    pub fn from_resolution(width: f32, height: f32, resolution: u32) -> Self {
        let segments_x = (width * resolution as f32).round() as u32;
        let segments_y = (height * resolution as f32).round() as u32;
        Self::new(width, height, segments_x, segments_y)
    }

    pub fn segments(&self) -> UVec2 {
        UVec2::new(self.segments_x, self.segments_y)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn set_depth(&mut self, index: usize, z: f32) {
        if let Some(position) = self.positions.get_mut(index) {
            position.z = z;
        }
    }

    /// 重新计算顶点法线：累加相邻三角形的面法线（按面积加权）后归一化。
    pub fn recompute_normals(&mut self) {
        for normal in self.normals.iter_mut() {
            *normal = Vec3::ZERO;
        }

        for triangle in self.indices.chunks_exact(3) {
            let (ia, ib, ic) = (
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            );
            let a = self.positions[ia];
            let b = self.positions[ib];
            let c = self.positions[ic];
            // 未归一化的叉积，长度即为面积的两倍
            let face_normal = (b - a).cross(c - a);
            self.normals[ia] += face_normal;
            self.normals[ib] += face_normal;
            self.normals[ic] += face_normal;
        }

        for normal in self.normals.iter_mut() {
            *normal = normal.try_normalize().unwrap_or(Vec3::Z);
        }
    }

    /// Local-space bounds of the current (displaced) positions.
    pub fn bounds(&self) -> Aabb {
        Aabb::enclosing(self.positions.iter().copied()).unwrap_or_default()
    }

    pub fn is_flat(&self) -> bool {
        self.positions.iter().all(|p| p.z == 0.0)
    }

    pub fn build_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList);
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.position_array());
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normal_array());
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs.clone());
        mesh.set_indices(Some(Indices::U32(self.indices.clone())));
        mesh
    }

    /// Refreshes positions and normals of a mesh built by [`PlaneGrid::build_mesh`].
    pub fn write_to_mesh(&self, mesh: &mut Mesh) {
        match mesh.attribute_mut(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(values)) if values.len() == self.positions.len() => {
                for (dst, src) in values.iter_mut().zip(&self.positions) {
                    *dst = src.to_array();
                }
            }
            _ => mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.position_array()),
        }

        match mesh.attribute_mut(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(values)) if values.len() == self.normals.len() => {
                for (dst, src) in values.iter_mut().zip(&self.normals) {
                    *dst = src.to_array();
                }
            }
            _ => mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normal_array()),
        }
    }

    fn position_array(&self) -> Vec<[f32; 3]> {
        self.positions.iter().map(|v| v.to_array()).collect()
    }

    fn normal_array(&self) -> Vec<[f32; 3]> {
        self.normals.iter().map(|v| v.to_array()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plane_has_expected_topology() {
        let grid = PlaneGrid::from_resolution(5.0, 4.0, 12);
        assert_eq!(grid.segments(), UVec2::new(60, 48));
        assert_eq!(grid.vertex_count(), 61 * 49);
        assert_eq!(grid.indices().len(), 60 * 48 * 6);
        assert!(grid.indices().iter().all(|&i| (i as usize) < grid.vertex_count()));
    }

    #[test]
    fn vertices_span_the_plane_top_left_first() {
        let grid = PlaneGrid::new(5.0, 4.0, 5, 4);
        let first = grid.positions()[0];
        let last = *grid.positions().last().unwrap();
        assert_eq!(first, Vec3::new(-2.5, 2.0, 0.0));
        assert_eq!(last, Vec3::new(2.5, -2.0, 0.0));
    }

    #[test]
    fn flat_grid_normals_face_positive_z() {
        let mut grid = PlaneGrid::new(2.0, 2.0, 4, 4);
        grid.recompute_normals();
        assert!(grid.is_flat());
        for n in grid.normals() {
            assert!((*n - Vec3::Z).length() < 1e-6, "normal {n:?}");
        }
    }

    #[test]
    fn tilted_grid_normals_follow_the_slope() {
        let mut grid = PlaneGrid::new(2.0, 2.0, 4, 4);
        for i in 0..grid.vertex_count() {
            let x = grid.positions()[i].x;
            grid.set_depth(i, x);
        }
        grid.recompute_normals();
        let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
        for n in grid.normals() {
            assert!((*n - expected).length() < 1e-5, "normal {n:?}");
        }
    }

    #[test]
    fn set_depth_only_touches_z() {
        let mut grid = PlaneGrid::new(1.0, 1.0, 2, 2);
        let before = grid.positions()[4];
        grid.set_depth(4, 0.75);
        grid.set_depth(999, 1.0);
        let after = grid.positions()[4];
        assert_eq!(before.truncate(), after.truncate());
        assert_eq!(after.z, 0.75);
    }

    #[test]
    fn bounds_follow_displaced_depth() {
        let mut grid = PlaneGrid::new(5.0, 4.0, 5, 4);
        let flat = grid.bounds();
        assert_eq!(flat.half_extents.z, 0.0);

        grid.set_depth(0, 2.0);
        grid.set_depth(7, -1.0);
        let bounds = grid.bounds();
        assert!((bounds.min().z - -1.0).abs() < 1e-6);
        assert!((bounds.max().z - 2.0).abs() < 1e-6);
        assert!((bounds.max().x - 2.5).abs() < 1e-6);
        assert!((bounds.min().y - -2.0).abs() < 1e-6);
    }

    #[test]
    fn write_to_mesh_updates_attributes_in_place() {
        let mut grid = PlaneGrid::new(1.0, 1.0, 2, 2);
        let mut mesh = grid.build_mesh();
        grid.set_depth(0, 0.5);
        grid.recompute_normals();
        grid.write_to_mesh(&mut mesh);

        let Some(VertexAttributeValues::Float32x3(positions)) =
            mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("positions missing");
        };
        assert_eq!(positions[0][2], 0.5);
        assert_eq!(positions.len(), grid.vertex_count());
    }
}
