//! CPU-side model geometry and STL parsing.
//!
//! Models are loaded through the [`AssetProvider`](crate::AssetProvider) and
//! placed in scene graphs as solid nodes. The renderer uploads them lazily.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

use crate::mesh::Vertex3d;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a loaded model, used by the renderer's mesh cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelId(u64);

/// Errors that can occur when loading geometry.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown geometry format: '{0}'")]
    UnknownFormat(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Triangle geometry before GPU upload.
#[derive(Clone, Debug)]
pub struct Model {
    id: ModelId,
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl Model {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self {
            id: ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed)),
            vertices,
            indices,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Load a model from a file, picking the parser from the extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GeometryError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "stl" => {
                let file = std::fs::File::open(path)?;
                let mut reader = std::io::BufReader::new(file);
                Self::parse_stl(&mut reader)
            }
            _ => Err(GeometryError::UnknownFormat(ext)),
        }
    }

    /// Parse binary or ASCII STL data.
    pub fn from_stl_bytes(bytes: &[u8]) -> Result<Self, GeometryError> {
        let mut cursor = std::io::Cursor::new(bytes);
        Self::parse_stl(&mut cursor)
    }

    fn parse_stl<R: std::io::Read + std::io::Seek>(reader: &mut R) -> Result<Self, GeometryError> {
        let stl = stl_io::read_stl(reader).map_err(|e| GeometryError::Parse(e.to_string()))?;

        let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
        let mut indices = Vec::with_capacity(stl.faces.len() * 3);

        for (i, face) in stl.faces.iter().enumerate() {
            let normal: [f32; 3] = face.normal.into();
            for &vertex_idx in &face.vertices {
                let position: [f32; 3] = stl.vertices[vertex_idx].into();
                vertices.push(Vertex3d::new(position, normal, [0.0, 0.0]));
            }
            let base = (i * 3) as u32;
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        }

        Ok(Self::new(vertices, indices))
    }

    /// Unit cube centered at the origin, one quad per face.
    pub fn cube() -> Self {
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in FACES {
            let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
            let base = vertices.len() as u32;
            for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                let p = n * 0.5 + u * su + v * sv;
                vertices.push(Vertex3d::new(p.into(), normal, [su + 0.5, sv + 0.5]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        Self::new(vertices, indices)
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }
        (min, max)
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        let (min, max) = self.bounds();
        max - min
    }

    /// Center the geometry at the origin.
    pub fn recenter(&mut self) {
        let center = self.center();
        for v in &mut self.vertices {
            let p = Vec3::from(v.position) - center;
            v.position = p.into();
        }
    }

    /// Scale the geometry to fit within a unit cube.
    pub fn normalize(&mut self) {
        let size = self.size();
        let max_dim = size.x.max(size.y).max(size.z);
        if max_dim > 0.0 {
            for v in &mut self.vertices {
                let p = Vec3::from(v.position) / max_dim;
                v.position = p.into();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_spans_unit_bounds() {
        let cube = Model::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        let (min, max) = cube.bounds();
        assert_eq!(min, Vec3::splat(-0.5));
        assert_eq!(max, Vec3::splat(0.5));
    }

    #[test]
    fn recenter_and_normalize() {
        let vertices = vec![
            Vertex3d::new([2.0, 2.0, 2.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([6.0, 4.0, 4.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let mut model = Model::new(vertices, vec![0, 1, 0]);
        model.recenter();
        assert!(model.center().length() < 1e-5);
        model.normalize();
        assert!((model.size().x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = Model::from_file("gallery/statue.obj").unwrap_err();
        assert!(matches!(err, GeometryError::UnknownFormat(ext) if ext == "obj"));
    }

    #[test]
    fn garbage_stl_is_a_parse_error() {
        let err = Model::from_stl_bytes(b"not an stl file").unwrap_err();
        assert!(matches!(err, GeometryError::Parse(_)));
    }
}
