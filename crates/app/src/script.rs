use std::path::Path;

use glam::Vec3;
use morphsculpt_core::{Aabb, EditingSession, EditorEvent, EditorSettings, Mesh};
use serde::{Deserialize, Serialize};

/// A recorded editing session: optional editor settings plus the ordered
/// input events to replay.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct EditScript {
    #[serde(default)]
    pub(crate) settings: Option<EditorSettings>,
    #[serde(default)]
    pub(crate) steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum ScriptStep {
    EditMode { enabled: bool },
    SelectTarget { target: String },
    ClearTarget,
    SetWeight { target: String, value: f32 },
    ResetWeights,
    Pick { face: [u32; 3], hit: [f32; 3] },
    Grab,
    Move { position: [f32; 3] },
    Release,
    Cancel,
    Undo,
    Redo,
    Tick,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct ScriptReport {
    pub(crate) applied: usize,
    pub(crate) rejected: usize,
}

pub(crate) fn load_script(path: &Path) -> Result<EditScript, String> {
    let data = std::fs::read(path).map_err(|err| format!("{path:?}: {err}"))?;
    parse_script(&data)
}

pub(crate) fn parse_script(data: &[u8]) -> Result<EditScript, String> {
    serde_json::from_slice(data).map_err(|err| format!("invalid edit script: {err}"))
}

pub(crate) fn run_script(
    script: &EditScript,
    session: &mut EditingSession,
    mesh: &mut Mesh,
) -> ScriptReport {
    let mut report = ScriptReport::default();
    for (index, step) in script.steps.iter().enumerate() {
        let accepted = run_step(step, session, mesh);
        if accepted {
            report.applied += 1;
        } else {
            report.rejected += 1;
            tracing::debug!("step {index} ({step:?}) had no effect");
        }
    }
    if session.finish(mesh) {
        tracing::debug!("script ended mid-drag, edit committed");
    }
    report
}

fn run_step(step: &ScriptStep, session: &mut EditingSession, mesh: &mut Mesh) -> bool {
    match step {
        ScriptStep::EditMode { enabled } => {
            session.handle(mesh, &EditorEvent::SetEditMode(*enabled))
        }
        ScriptStep::SelectTarget { target } => {
            session.handle(mesh, &EditorEvent::SetActiveTarget(Some(target.clone())))
        }
        ScriptStep::ClearTarget => session.handle(mesh, &EditorEvent::SetActiveTarget(None)),
        ScriptStep::SetWeight { target, value } => {
            session.set_weight(target, *value);
            true
        }
        ScriptStep::ResetWeights => {
            session.reset_weights();
            true
        }
        ScriptStep::Pick { face, hit } => session.handle(
            mesh,
            &EditorEvent::Pick {
                face: *face,
                hit: Vec3::from(*hit),
            },
        ),
        ScriptStep::Grab => session.handle(mesh, &EditorEvent::Grab),
        ScriptStep::Move { position } => {
            session.handle(mesh, &EditorEvent::Move(Vec3::from(*position)))
        }
        ScriptStep::Release => session.handle(mesh, &EditorEvent::Release),
        ScriptStep::Cancel => session.handle(mesh, &EditorEvent::Cancel),
        ScriptStep::Undo => session.undo(mesh),
        ScriptStep::Redo => session.redo(mesh),
        ScriptStep::Tick => {
            session.tick(mesh);
            true
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TargetSummary {
    name: String,
    weight: f32,
    edited_vertices: usize,
}

/// State printed by `--print` once the script has run.
#[derive(Debug, Serialize)]
pub(crate) struct SessionSummary {
    vertices: usize,
    bounds: Option<Aabb>,
    targets: Vec<TargetSummary>,
    active_target: Option<String>,
    selected_vertex: Option<usize>,
    undo_depth: usize,
    redo_depth: usize,
    steps: ScriptReport,
}

impl SessionSummary {
    pub(crate) fn new(session: &EditingSession, mesh: &Mesh, report: &ScriptReport) -> Self {
        let targets = mesh
            .targets()
            .iter()
            .zip(mesh.influences())
            .map(|(target, &weight)| TargetSummary {
                name: target.name.clone(),
                weight,
                edited_vertices: target
                    .deltas()
                    .iter()
                    .filter(|delta| **delta != [0.0, 0.0, 0.0])
                    .count(),
            })
            .collect();
        Self {
            vertices: mesh.vertex_count(),
            bounds: mesh.bounds(),
            targets,
            active_target: session.editor().active_target().map(str::to_string),
            selected_vertex: session.editor().selected_vertex(),
            undo_depth: session.history().undo_len(),
            redo_depth: session.history().redo_len(),
            steps: *report,
        }
    }
}
