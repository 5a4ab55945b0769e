use glam::Vec3;

use crate::error::EditError;
use crate::mesh::Mesh;

/// Resolves a ray hit on triangle `face` to one of its three corners.
///
/// The world-space hit is moved into mesh-local space and compared against
/// the base positions of the face corners; the closest corner wins and ties
/// go to the earliest corner in `face` order. This is a nearest-of-three
/// heuristic, not a search over the whole mesh, and can favour the "wrong"
/// corner on very obtuse triangles.
pub fn pick_vertex(mesh: &Mesh, face: [u32; 3], world_hit: Vec3) -> Result<usize, EditError> {
    let local_hit = mesh.world_to_local(world_hit)?;
    let mut best = None;
    let mut best_dist = f32::INFINITY;
    for corner in face {
        let index = corner as usize;
        let position = mesh.base_position(index)?;
        let dist = position.distance(local_hit);
        if best.is_none() || dist < best_dist {
            best_dist = dist;
            best = Some(index);
        }
    }
    best.ok_or(EditError::NoSelection)
}
