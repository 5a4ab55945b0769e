use glam::Vec3;

use crate::mesh::Mesh;

/// One committed vertex edit on a morph target.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub target: String,
    pub vertex: usize,
    pub old_delta: Vec3,
    pub new_delta: Vec3,
}

/// Linear undo/redo over vertex-delta edits.
///
/// Undo and redo write the stored deltas back verbatim, so cycling through
/// the history any number of times lands on bit-identical buffers.
#[derive(Debug, Clone, Default)]
pub struct History {
    past: Vec<HistoryEntry>,
    future: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        self.past.push(entry);
        self.future.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.past.len()
    }

    pub fn redo_len(&self) -> usize {
        self.future.len()
    }

    pub fn undo(&mut self, mesh: &mut Mesh) -> bool {
        let Some(entry) = self.past.pop() else {
            return false;
        };
        if let Err(err) = mesh.set_delta(&entry.target, entry.vertex, entry.old_delta) {
            tracing::warn!("undo skipped: {err}");
            self.past.push(entry);
            return false;
        }
        tracing::debug!(target_name = %entry.target, vertex = entry.vertex, "undo");
        self.future.push(entry);
        true
    }

    pub fn redo(&mut self, mesh: &mut Mesh) -> bool {
        let Some(entry) = self.future.pop() else {
            return false;
        };
        if let Err(err) = mesh.set_delta(&entry.target, entry.vertex, entry.new_delta) {
            tracing::warn!("redo skipped: {err}");
            self.future.push(entry);
            return false;
        }
        tracing::debug!(target_name = %entry.target, vertex = entry.vertex, "redo");
        self.past.push(entry);
        true
    }

    /// Most recent entry that undo would revert.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.past.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh() -> Mesh {
        let mut mesh = Mesh::with_positions_indices(vec![[0.0; 3]; 3], vec![0, 1, 2]);
        mesh.add_target("jawOpen", vec![[0.0; 3]; 3], 0.0).unwrap();
        mesh
    }

    fn entry(vertex: usize, old: Vec3, new: Vec3) -> HistoryEntry {
        HistoryEntry {
            target: "jawOpen".to_string(),
            vertex,
            old_delta: old,
            new_delta: new,
        }
    }

    #[test]
    fn undo_and_redo_restore_exact_deltas() {
        let mut mesh = mesh();
        let mut history = History::new();
        let new = Vec3::new(0.1, 0.2, 0.3);
        history.record(entry(1, Vec3::ZERO, new));
        mesh.set_delta("jawOpen", 1, new).unwrap();

        assert!(history.undo(&mut mesh));
        assert_eq!(mesh.delta("jawOpen", 1).unwrap(), Vec3::ZERO);
        assert!(history.redo(&mut mesh));
        assert_eq!(mesh.delta("jawOpen", 1).unwrap(), new);

        for _ in 0..100 {
            assert!(history.undo(&mut mesh));
            assert!(history.redo(&mut mesh));
        }
        assert_eq!(mesh.delta("jawOpen", 1).unwrap(), new);
    }

    #[test]
    fn empty_history_is_a_no_op() {
        let mut mesh = mesh();
        let mut history = History::new();
        assert!(!history.undo(&mut mesh));
        assert!(!history.redo(&mut mesh));
    }

    #[test]
    fn record_after_undo_drops_redo_chain() {
        let mut mesh = mesh();
        let mut history = History::new();
        history.record(entry(0, Vec3::ZERO, Vec3::X));
        assert!(history.undo(&mut mesh));
        assert!(history.can_redo());
        history.record(entry(2, Vec3::ZERO, Vec3::Y));
        assert!(!history.redo(&mut mesh));
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn undo_order_is_last_in_first_out() {
        let mut mesh = mesh();
        let mut history = History::new();
        history.record(entry(0, Vec3::ZERO, Vec3::X));
        mesh.set_delta("jawOpen", 0, Vec3::X).unwrap();
        history.record(entry(0, Vec3::X, Vec3::Y));
        mesh.set_delta("jawOpen", 0, Vec3::Y).unwrap();

        assert!(history.undo(&mut mesh));
        assert_eq!(mesh.delta("jawOpen", 0).unwrap(), Vec3::X);
        assert!(history.undo(&mut mesh));
        assert_eq!(mesh.delta("jawOpen", 0).unwrap(), Vec3::ZERO);
    }

    #[test]
    fn failed_restore_keeps_entry() {
        let mut mesh = mesh();
        let mut history = History::new();
        history.record(HistoryEntry {
            target: "gone".to_string(),
            vertex: 0,
            old_delta: Vec3::ZERO,
            new_delta: Vec3::X,
        });
        assert!(!history.undo(&mut mesh));
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 0);
    }
}
