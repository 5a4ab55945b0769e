use std::collections::HashMap;

use crate::mesh::Mesh;

/// Morph target weights keyed by target name.
///
/// Names are kept even if the current mesh has no such target, so slider
/// state survives a model reload; [`Mesh::write_influences`] ignores them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfluenceMap {
    weights: HashMap<String, f32>,
}

impl InfluenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the map from the default weights stored in the model file.
    pub fn from_mesh_defaults(mesh: &Mesh) -> Self {
        let mut map = Self::new();
        for (name, &weight) in mesh.target_names().zip(mesh.default_weights()) {
            map.set_weight(name, weight);
        }
        map
    }

    /// Stores `value` clamped to `[0, 1]`; NaN counts as 0.
    pub fn set_weight(&mut self, target: impl Into<String>, value: f32) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        self.weights.insert(target.into(), value);
    }

    pub fn weight(&self, target: &str) -> f32 {
        self.weights.get(target).copied().unwrap_or(0.0)
    }

    pub fn reset_all(&mut self) {
        for weight in self.weights.values_mut() {
            *weight = 0.0;
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.weights.iter().map(|(name, &weight)| (name.as_str(), weight))
    }

    /// Pushes the current weights into the mesh's influence buffer. The host
    /// calls this once per frame.
    pub fn tick(&self, mesh: &mut Mesh) {
        mesh.write_influences(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_weight_clamps() {
        let mut map = InfluenceMap::new();
        map.set_weight("jawOpen", 1.5);
        map.set_weight("smile", -0.2);
        map.set_weight("blink", f32::NAN);
        map.set_weight("pucker", f32::INFINITY);
        assert_eq!(map.weight("jawOpen"), 1.0);
        assert_eq!(map.weight("smile"), 0.0);
        assert_eq!(map.weight("blink"), 0.0);
        assert_eq!(map.weight("pucker"), 1.0);
    }

    #[test]
    fn absent_weight_is_zero() {
        let map = InfluenceMap::new();
        assert_eq!(map.weight("cheekPuff"), 0.0);
    }

    #[test]
    fn reset_all_zeroes_every_entry() {
        let mut map = InfluenceMap::new();
        map.set_weight("jawOpen", 0.3);
        map.set_weight("smile", 0.9);
        map.reset_all();
        assert_eq!(map.len(), 2);
        assert!(map.iter().all(|(_, weight)| weight == 0.0));
    }

    #[test]
    fn tick_writes_into_mesh() {
        let mut mesh = Mesh::with_positions_indices(vec![[0.0; 3]; 3], vec![0, 1, 2]);
        mesh.add_target("jawOpen", vec![[0.0; 3]; 3], 0.0).unwrap();
        let mut map = InfluenceMap::new();
        map.set_weight("jawOpen", 0.5);
        map.tick(&mut mesh);
        assert_eq!(mesh.influences(), &[0.5]);
    }

    #[test]
    fn defaults_come_from_mesh() {
        let mut mesh = Mesh::with_positions_indices(vec![[0.0; 3]; 3], vec![0, 1, 2]);
        mesh.add_target("smile", vec![[0.0; 3]; 3], 0.4).unwrap();
        let map = InfluenceMap::from_mesh_defaults(&mesh);
        assert_eq!(map.weight("smile"), 0.4);
    }
}
