use crate::editor::{DeltaEditor, EditEffect, EditorEvent, EditorSettings};
use crate::history::History;
use crate::influence::InfluenceMap;
use crate::mesh::Mesh;

/// Everything the editing UI mutates besides the mesh itself: weights,
/// editor state and undo history. Replaced wholesale when a new mesh loads.
#[derive(Debug, Clone, Default)]
pub struct EditingSession {
    pub influences: InfluenceMap,
    editor: DeltaEditor,
    history: History,
}

impl EditingSession {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            influences: InfluenceMap::new(),
            editor: DeltaEditor::new(settings),
            history: History::new(),
        }
    }

    /// Fresh session state for a newly loaded mesh. Editor settings carry
    /// over; selection, weights and history do not.
    pub fn load(&mut self, mesh: &Mesh) {
        let settings = self.editor.settings;
        self.influences = InfluenceMap::from_mesh_defaults(mesh);
        self.editor = DeltaEditor::new(settings);
        self.history.clear();
        tracing::info!(
            vertices = mesh.vertex_count(),
            targets = mesh.targets().len(),
            "editing session reset for new mesh"
        );
    }

    pub fn editor(&self) -> &DeltaEditor {
        &self.editor
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Feeds one input event through the editor and applies its effects.
    ///
    /// Returns false when the event was rejected (no active target, nothing
    /// selected, bad index); the session and mesh are then unchanged.
    pub fn handle(&mut self, mesh: &mut Mesh, event: &EditorEvent) -> bool {
        let step = match self.editor.step(mesh, event) {
            Ok(step) => step,
            Err(err) => {
                tracing::debug!("ignored {event:?}: {err}");
                return false;
            }
        };
        for effect in &step.effects {
            self.apply_effect(mesh, effect);
        }
        self.editor = step.next;
        true
    }

    fn apply_effect(&mut self, mesh: &mut Mesh, effect: &EditEffect) {
        match effect {
            EditEffect::WriteDelta {
                target,
                vertex,
                delta,
            } => {
                if let Err(err) = mesh.set_delta(target, *vertex, *delta) {
                    tracing::warn!("delta write failed: {err}");
                }
            }
            EditEffect::Record(entry) => {
                tracing::debug!(
                    target_name = %entry.target,
                    vertex = entry.vertex,
                    "recorded vertex edit"
                );
                self.history.record(entry.clone());
            }
            EditEffect::PreviewWeight { target, weight } => {
                self.influences.set_weight(target.clone(), *weight);
            }
        }
    }

    pub fn set_weight(&mut self, target: &str, value: f32) {
        self.influences.set_weight(target, value);
    }

    pub fn reset_weights(&mut self) {
        self.influences.reset_all();
    }

    pub fn undo(&mut self, mesh: &mut Mesh) -> bool {
        self.finish(mesh);
        let undone = self.history.undo(mesh);
        self.editor.resync(mesh);
        undone
    }

    pub fn redo(&mut self, mesh: &mut Mesh) -> bool {
        self.finish(mesh);
        let redone = self.history.redo(mesh);
        self.editor.resync(mesh);
        redone
    }

    /// Ends a drag in progress so its edit lands in the history. Hosts call
    /// this when the input stream stops without a pointer-up. Returns true
    /// if a drag was open.
    pub fn finish(&mut self, mesh: &mut Mesh) -> bool {
        if !self.editor.is_dragging() {
            return false;
        }
        self.handle(mesh, &EditorEvent::Cancel)
    }

    pub fn tick(&self, mesh: &mut Mesh) {
        self.influences.tick(mesh);
    }
}

/// Per-frame update: pushes the session's weights into the mesh's influence
/// buffer.
pub fn tick(session: &EditingSession, mesh: &mut Mesh) {
    session.tick(mesh);
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn jaw_mesh() -> Mesh {
        let mut mesh = Mesh::with_positions_indices(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![0, 1, 2, 0, 2, 3],
        );
        mesh.add_target("jawOpen", vec![[0.0; 3]; 4], 0.0).unwrap();
        mesh
    }

    fn editing_session(mesh: &mut Mesh) -> EditingSession {
        let mut session = EditingSession::new(EditorSettings {
            edit_mode: true,
            auto_preview: false,
        });
        session.load(mesh);
        assert!(session.handle(
            mesh,
            &EditorEvent::SetActiveTarget(Some("jawOpen".to_string()))
        ));
        session
    }

    fn drag_vertex(session: &mut EditingSession, mesh: &mut Mesh, hit: Vec3, to: Vec3) {
        assert!(session.handle(
            mesh,
            &EditorEvent::Pick {
                face: [0, 1, 2],
                hit,
            }
        ));
        assert!(session.handle(mesh, &EditorEvent::Grab));
        assert!(session.handle(mesh, &EditorEvent::Move(to)));
        assert!(session.handle(mesh, &EditorEvent::Release));
    }

    #[test]
    fn jaw_open_walkthrough() {
        let mut mesh = jaw_mesh();
        let mut session = editing_session(&mut mesh);
        let base = mesh.base_position(2).unwrap();

        assert!(session.handle(
            &mut mesh,
            &EditorEvent::Pick {
                face: [0, 1, 2],
                hit: base,
            }
        ));
        assert_eq!(session.editor().gizmo_position(), Some(base));

        assert!(session.handle(&mut mesh, &EditorEvent::Grab));
        assert!(session.handle(&mut mesh, &EditorEvent::Move(base + Vec3::new(0.0, 0.1, 0.0))));
        let delta = mesh.delta("jawOpen", 2).unwrap();
        assert!((delta - Vec3::new(0.0, 0.1, 0.0)).length() < 1.0e-6);
        assert!(session.handle(&mut mesh, &EditorEvent::Release));
        assert_eq!(session.history().undo_len(), 1);

        session.set_weight("jawOpen", 0.5);
        tick(&session, &mut mesh);
        assert_eq!(mesh.influences(), &[0.5]);
    }

    #[test]
    fn undo_redo_through_session() {
        let mut mesh = jaw_mesh();
        let mut session = editing_session(&mut mesh);
        drag_vertex(&mut session, &mut mesh, Vec3::X, Vec3::new(1.0, 0.0, 0.3));
        let edited = mesh.delta("jawOpen", 1).unwrap();

        assert!(session.undo(&mut mesh));
        assert_eq!(mesh.delta("jawOpen", 1).unwrap(), Vec3::ZERO);
        assert_eq!(session.editor().gizmo_position(), Some(Vec3::X));
        assert!(!session.undo(&mut mesh));

        assert!(session.redo(&mut mesh));
        assert_eq!(mesh.delta("jawOpen", 1).unwrap(), edited);
        assert!(!session.redo(&mut mesh));
    }

    #[test]
    fn new_edit_after_undo_clears_redo() {
        let mut mesh = jaw_mesh();
        let mut session = editing_session(&mut mesh);
        drag_vertex(&mut session, &mut mesh, Vec3::X, Vec3::new(1.0, 0.2, 0.0));
        assert!(session.undo(&mut mesh));
        drag_vertex(&mut session, &mut mesh, Vec3::ZERO, Vec3::new(0.0, 0.0, 0.1));
        assert!(!session.redo(&mut mesh));
    }

    #[test]
    fn undo_mid_drag_commits_the_drag_first() {
        let mut mesh = jaw_mesh();
        let mut session = editing_session(&mut mesh);
        assert!(session.handle(
            &mut mesh,
            &EditorEvent::Pick {
                face: [0, 1, 2],
                hit: Vec3::X,
            }
        ));
        assert!(session.handle(&mut mesh, &EditorEvent::Move(Vec3::new(1.0, 0.4, 0.0))));

        assert!(session.undo(&mut mesh));
        assert_eq!(mesh.delta("jawOpen", 1).unwrap(), Vec3::ZERO);
        assert!(!session.editor().is_dragging());
        assert_eq!(session.history().redo_len(), 1);
    }

    #[test]
    fn finish_records_an_open_drag() {
        let mut mesh = jaw_mesh();
        let mut session = editing_session(&mut mesh);
        assert!(!session.finish(&mut mesh));
        assert!(session.handle(
            &mut mesh,
            &EditorEvent::Pick {
                face: [0, 1, 2],
                hit: Vec3::X,
            }
        ));
        assert!(session.handle(&mut mesh, &EditorEvent::Move(Vec3::new(1.0, 0.5, 0.0))));
        assert_eq!(session.history().undo_len(), 0);

        assert!(session.finish(&mut mesh));
        assert!(!session.editor().is_dragging());
        assert_eq!(session.history().undo_len(), 1);
        assert_eq!(
            session.history().last().map(|entry| entry.new_delta),
            Some(Vec3::new(0.0, 0.5, 0.0))
        );
    }

    #[test]
    fn rejected_events_change_nothing() {
        let mut mesh = jaw_mesh();
        let mut session = EditingSession::new(EditorSettings {
            edit_mode: true,
            auto_preview: false,
        });
        session.load(&mesh);
        let before = mesh.targets().to_vec();

        assert!(!session.handle(&mut mesh, &EditorEvent::Move(Vec3::ONE)));
        assert!(!session.handle(&mut mesh, &EditorEvent::Grab));
        assert!(!session.handle(
            &mut mesh,
            &EditorEvent::Pick {
                face: [0, 1, 2],
                hit: Vec3::ZERO,
            }
        ));
        assert!(!session.handle(
            &mut mesh,
            &EditorEvent::SetActiveTarget(Some("browInnerUp".to_string()))
        ));
        assert_eq!(mesh.targets(), before.as_slice());
        assert_eq!(session.history().undo_len(), 0);
    }

    #[test]
    fn mesh_without_targets_has_nothing_to_edit() {
        let mut mesh = Mesh::with_positions_indices(vec![[0.0; 3]; 3], vec![0, 1, 2]);
        let mut session = EditingSession::new(EditorSettings {
            edit_mode: true,
            auto_preview: true,
        });
        session.load(&mesh);
        assert!(!session.handle(
            &mut mesh,
            &EditorEvent::Pick {
                face: [0, 1, 2],
                hit: Vec3::ZERO,
            }
        ));
        tick(&session, &mut mesh);
        assert!(mesh.influences().is_empty());
    }

    #[test]
    fn auto_preview_sets_weight_and_load_resets() {
        let mut mesh = jaw_mesh();
        let mut session = EditingSession::new(EditorSettings::default());
        session.load(&mesh);
        assert!(session.handle(
            &mut mesh,
            &EditorEvent::SetActiveTarget(Some("jawOpen".to_string()))
        ));
        assert_eq!(session.influences.weight("jawOpen"), 1.0);

        session.load(&mesh);
        assert_eq!(session.influences.weight("jawOpen"), 0.0);
        assert_eq!(session.editor().active_target(), None);
    }
}
