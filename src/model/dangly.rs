//! Cloth/hair physics data attached to a dangly trimesh node.

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DanglyData {
    /// Per-vertex displacement weight (0 = rigid, 1 = fully free).
    pub displacement: Vec<f32>,
    pub displacement_max: f32,
    pub tightness: f32,
    pub period: f32,
}
