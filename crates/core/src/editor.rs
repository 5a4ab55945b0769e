use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::history::HistoryEntry;
use crate::mesh::Mesh;
use crate::picker::pick_vertex;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Picking only selects vertices while this is on.
    pub edit_mode: bool,
    /// Activating a target for editing pushes its weight to 1.0 so the
    /// sculpted shape is visible.
    pub auto_preview: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            edit_mode: false,
            auto_preview: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub vertex: usize,
    /// Gizmo position when the drag started.
    pub seed: Vec3,
    pub gizmo: Vec3,
    pub old_delta: Vec3,
    pub new_delta: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorState {
    /// Nothing editable. A previously picked vertex is kept so it can be
    /// re-seeded once a target is active again.
    Idle { vertex: Option<usize> },
    Selected { vertex: usize, gizmo: Vec3 },
    Dragging(DragState),
}

impl Default for EditorState {
    fn default() -> Self {
        EditorState::Idle { vertex: None }
    }
}

impl EditorState {
    pub fn vertex(&self) -> Option<usize> {
        match self {
            EditorState::Idle { vertex } => *vertex,
            EditorState::Selected { vertex, .. } => Some(*vertex),
            EditorState::Dragging(drag) => Some(drag.vertex),
        }
    }

    pub fn gizmo(&self) -> Option<Vec3> {
        match self {
            EditorState::Idle { .. } => None,
            EditorState::Selected { gizmo, .. } => Some(*gizmo),
            EditorState::Dragging(drag) => Some(drag.gizmo),
        }
    }
}

/// Pointer and panel input understood by the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    SetEditMode(bool),
    SetActiveTarget(Option<String>),
    /// Ray hit supplied by the renderer: triangle corners plus world hit.
    Pick { face: [u32; 3], hit: Vec3 },
    Grab,
    /// New world-space gizmo position.
    Move(Vec3),
    Release,
    /// Pointer lost mid-drag (left the viewport, pointercancel).
    Cancel,
}

/// Side effects produced by a transition, applied by the session in order.
#[derive(Debug, Clone, PartialEq)]
pub enum EditEffect {
    WriteDelta {
        target: String,
        vertex: usize,
        delta: Vec3,
    },
    Record(HistoryEntry),
    PreviewWeight { target: String, weight: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub next: DeltaEditor,
    pub effects: Vec<EditEffect>,
}

/// Single-vertex morph target sculpting as an explicit state machine.
///
/// The gizmo shows a vertex as it looks with the active target at full
/// influence: `base + delta(active)`, ignoring other targets' weights.
/// Moving the gizmo stores `gizmo - base` as the new delta of the active
/// target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaEditor {
    pub settings: EditorSettings,
    active_target: Option<String>,
    state: EditorState,
}

impl DeltaEditor {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            settings,
            active_target: None,
            state: EditorState::default(),
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn active_target(&self) -> Option<&str> {
        self.active_target.as_deref()
    }

    pub fn selected_vertex(&self) -> Option<usize> {
        self.state.vertex()
    }

    pub fn gizmo_position(&self) -> Option<Vec3> {
        self.state.gizmo()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, EditorState::Dragging(_))
    }

    /// Computes the transition for `event` without touching `self` or the
    /// mesh. On error the caller keeps the current editor unchanged.
    pub fn step(&self, mesh: &Mesh, event: &EditorEvent) -> Result<Step, EditError> {
        let mut next = self.clone();
        let mut effects = Vec::new();

        match event {
            EditorEvent::SetEditMode(enabled) => {
                next.finish_drag(&mut effects);
                next.settings.edit_mode = *enabled;
                next.reseed(mesh);
            }
            EditorEvent::SetActiveTarget(Some(name)) => {
                if mesh.target(name).is_none() {
                    return Err(EditError::UnknownTarget(name.clone()));
                }
                next.finish_drag(&mut effects);
                next.active_target = Some(name.clone());
                next.reseed(mesh);
                if next.settings.auto_preview {
                    effects.push(EditEffect::PreviewWeight {
                        target: name.clone(),
                        weight: 1.0,
                    });
                }
            }
            EditorEvent::SetActiveTarget(None) => {
                next.finish_drag(&mut effects);
                next.active_target = None;
                next.state = EditorState::Idle {
                    vertex: next.state.vertex(),
                };
            }
            EditorEvent::Pick { face, hit } => {
                let target = self.require_editing()?;
                let vertex = pick_vertex(mesh, *face, *hit)?;
                let gizmo = seed_position(mesh, target, vertex)?;
                next.finish_drag(&mut effects);
                next.state = EditorState::Selected { vertex, gizmo };
            }
            EditorEvent::Grab => {
                let target = self.require_editing()?;
                if let EditorState::Selected { vertex, gizmo } = self.state {
                    next.state = EditorState::Dragging(begin_drag(mesh, target, vertex, gizmo)?);
                } else if !self.is_dragging() {
                    return Err(EditError::NoSelection);
                }
            }
            EditorEvent::Move(position) => {
                let target = self.require_editing()?;
                let mut drag = match self.state {
                    EditorState::Idle { .. } => return Err(EditError::NoSelection),
                    EditorState::Selected { vertex, gizmo } => {
                        begin_drag(mesh, target, vertex, gizmo)?
                    }
                    EditorState::Dragging(drag) => drag,
                };
                let delta = if *position == drag.seed {
                    drag.old_delta
                } else {
                    mesh.world_to_local(*position)? - mesh.base_position(drag.vertex)?
                };
                drag.gizmo = *position;
                drag.new_delta = delta;
                effects.push(EditEffect::WriteDelta {
                    target: target.to_string(),
                    vertex: drag.vertex,
                    delta,
                });
                next.state = EditorState::Dragging(drag);
            }
            EditorEvent::Release | EditorEvent::Cancel => {
                next.finish_drag(&mut effects);
            }
        }

        Ok(Step { next, effects })
    }

    /// Runs [`DeltaEditor::step`] and adopts the next state.
    pub fn apply(&mut self, mesh: &Mesh, event: &EditorEvent) -> Result<Vec<EditEffect>, EditError> {
        let Step { next, effects } = self.step(mesh, event)?;
        *self = next;
        Ok(effects)
    }

    /// Re-reads the gizmo position from the mesh, e.g. after undo changed
    /// the selected vertex's delta. A drag in progress is left alone.
    pub fn resync(&mut self, mesh: &Mesh) {
        if !self.is_dragging() {
            self.reseed(mesh);
        }
    }

    fn require_editing(&self) -> Result<&str, EditError> {
        if !self.settings.edit_mode {
            return Err(EditError::EditModeDisabled);
        }
        self.active_target().ok_or(EditError::NoActiveTarget)
    }

    fn finish_drag(&mut self, effects: &mut Vec<EditEffect>) {
        let EditorState::Dragging(drag) = self.state else {
            return;
        };
        if drag.new_delta != drag.old_delta {
            if let Some(target) = &self.active_target {
                effects.push(EditEffect::Record(HistoryEntry {
                    target: target.clone(),
                    vertex: drag.vertex,
                    old_delta: drag.old_delta,
                    new_delta: drag.new_delta,
                }));
            }
        }
        self.state = EditorState::Selected {
            vertex: drag.vertex,
            gizmo: drag.gizmo,
        };
    }

    fn reseed(&mut self, mesh: &Mesh) {
        let vertex = self.state.vertex();
        self.state = match (vertex, self.active_target.as_deref(), self.settings.edit_mode) {
            (Some(vertex), Some(target), true) => match seed_position(mesh, target, vertex) {
                Ok(gizmo) => EditorState::Selected { vertex, gizmo },
                Err(err) => {
                    tracing::debug!("dropping selection: {err}");
                    EditorState::Idle { vertex: None }
                }
            },
            _ => EditorState::Idle { vertex },
        };
    }
}

fn seed_position(mesh: &Mesh, target: &str, vertex: usize) -> Result<Vec3, EditError> {
    let base = mesh.base_position(vertex)?;
    let delta = mesh.delta(target, vertex)?;
    Ok(mesh.local_to_world_point(base + delta))
}

fn begin_drag(mesh: &Mesh, target: &str, vertex: usize, gizmo: Vec3) -> Result<DragState, EditError> {
    let old_delta = mesh.delta(target, vertex)?;
    Ok(DragState {
        vertex,
        seed: gizmo,
        gizmo,
        old_delta,
        new_delta: old_delta,
    })
}
