use glam::{Mat4, Vec3};
use serde::Serialize;

use crate::error::EditError;
use crate::influence::InfluenceMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

/// Named per-vertex offsets from the base shape.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphTarget {
    pub name: String,
    deltas: Vec<[f32; 3]>,
}

impl MorphTarget {
    pub fn deltas(&self) -> &[[f32; 3]] {
        &self.deltas
    }

    /// True when every delta is exactly zero.
    pub fn is_neutral(&self) -> bool {
        self.deltas.iter().all(|d| *d == [0.0, 0.0, 0.0])
    }
}

/// Triangle mesh with a fixed vertex count and an optional set of morph
/// targets.
///
/// Every target holds exactly one delta per base vertex and target names are
/// unique; both are checked in [`Mesh::add_target`], so the accessors can
/// rely on them. A mesh without targets is valid and simply has nothing to
/// edit.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub local_to_world: Mat4,
    targets: Vec<MorphTarget>,
    influences: Vec<f32>,
    default_weights: Vec<f32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positions_indices(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            normals: None,
            uvs: None,
            local_to_world: Mat4::IDENTITY,
            targets: Vec::new(),
            influences: Vec::new(),
            default_weights: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn base_position(&self, index: usize) -> Result<Vec3, EditError> {
        self.positions
            .get(index)
            .copied()
            .map(Vec3::from)
            .ok_or(EditError::IndexOutOfRange {
                index,
                count: self.positions.len(),
            })
    }

    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    pub fn targets(&self) -> &[MorphTarget] {
        &self.targets
    }

    /// Target names in source order.
    pub fn target_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.targets.iter().map(|target| target.name.as_str())
    }

    pub fn target_index(&self, name: &str) -> Option<usize> {
        self.targets.iter().position(|target| target.name == name)
    }

    pub fn target(&self, name: &str) -> Option<&MorphTarget> {
        self.targets.iter().find(|target| target.name == name)
    }

    /// Appends a morph target; `weight` is its default influence.
    pub fn add_target(
        &mut self,
        name: impl Into<String>,
        deltas: Vec<[f32; 3]>,
        weight: f32,
    ) -> Result<usize, EditError> {
        let name = name.into();
        if self.target_index(&name).is_some() {
            return Err(EditError::DuplicateTarget(name));
        }
        if deltas.len() != self.positions.len() {
            return Err(EditError::DeltaLengthMismatch {
                name,
                expected: self.positions.len(),
                actual: deltas.len(),
            });
        }
        self.targets.push(MorphTarget { name, deltas });
        self.default_weights.push(weight);
        self.influences.push(weight);
        Ok(self.targets.len() - 1)
    }

    pub fn delta(&self, target: &str, index: usize) -> Result<Vec3, EditError> {
        let target = self
            .target(target)
            .ok_or_else(|| EditError::UnknownTarget(target.to_string()))?;
        target
            .deltas
            .get(index)
            .copied()
            .map(Vec3::from)
            .ok_or(EditError::IndexOutOfRange {
                index,
                count: self.positions.len(),
            })
    }

    pub fn set_delta(&mut self, target: &str, index: usize, delta: Vec3) -> Result<(), EditError> {
        let count = self.positions.len();
        let target = self
            .targets
            .iter_mut()
            .find(|t| t.name == target)
            .ok_or_else(|| EditError::UnknownTarget(target.to_string()))?;
        let slot = target
            .deltas
            .get_mut(index)
            .ok_or(EditError::IndexOutOfRange { index, count })?;
        *slot = delta.to_array();
        Ok(())
    }

    /// Render-facing influence buffer, one weight per target in target order.
    pub fn influences(&self) -> &[f32] {
        &self.influences
    }

    /// Weights the model file shipped with, one per target.
    pub fn default_weights(&self) -> &[f32] {
        &self.default_weights
    }

    /// Copies the weight of every target from `map` into the influence buffer.
    /// Targets missing from the map get 0, names the mesh does not know are
    /// ignored.
    pub fn write_influences(&mut self, map: &InfluenceMap) {
        for (slot, target) in self.influences.iter_mut().zip(&self.targets) {
            *slot = map.weight(&target.name);
        }
    }

    /// Base shape plus every target scaled by its current influence.
    pub fn blended_positions(&self) -> Vec<Vec3> {
        let mut positions: Vec<Vec3> = self.positions.iter().copied().map(Vec3::from).collect();
        for (target, &weight) in self.targets.iter().zip(&self.influences) {
            if weight == 0.0 {
                continue;
            }
            for (pos, delta) in positions.iter_mut().zip(&target.deltas) {
                *pos += Vec3::from(*delta) * weight;
            }
        }
        positions
    }

    /// Maps a world-space point into the mesh's local frame. Fails when the
    /// node transform cannot be inverted (zero scale on some axis).
    pub fn world_to_local(&self, point: Vec3) -> Result<Vec3, EditError> {
        if self.local_to_world == Mat4::IDENTITY {
            return Ok(point);
        }
        let det = self.local_to_world.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(EditError::SingularTransform);
        }
        Ok(self.local_to_world.inverse().transform_point3(point))
    }

    pub fn local_to_world_point(&self, point: Vec3) -> Vec3 {
        if self.local_to_world == Mat4::IDENTITY {
            return point;
        }
        self.local_to_world.transform_point3(point)
    }

    /// Local-space box around the base shape, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        let (first, rest) = self.positions.split_first()?;
        let first = Vec3::from(*first);
        let (min, max) = rest.iter().fold((first, first), |(min, max), p| {
            let p = Vec3::from(*p);
            (min.min(p), max.max(p))
        });
        Some(Aabb {
            min: min.to_array(),
            max: max.to_array(),
        })
    }

    pub fn compute_normals(&mut self) -> bool {
        if !self.indices.len().is_multiple_of(3) || self.positions.is_empty() {
            return false;
        }

        let mut accum = vec![Vec3::ZERO; self.positions.len()];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0 >= self.positions.len()
                || i1 >= self.positions.len()
                || i2 >= self.positions.len()
            {
                continue;
            }

            let p0 = Vec3::from(self.positions[i0]);
            let p1 = Vec3::from(self.positions[i1]);
            let p2 = Vec3::from(self.positions[i2]);
            let normal = (p1 - p0).cross(p2 - p0);
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }

        let normals = accum
            .into_iter()
            .map(|n| {
                let len = n.length();
                if len > 0.0 {
                    (n / len).to_array()
                } else {
                    [0.0, 1.0, 0.0]
                }
            })
            .collect();

        self.normals = Some(normals);
        true
    }
}
