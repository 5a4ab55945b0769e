use thiserror::Error;

/// Recoverable conditions raised while inspecting or editing a mesh.
///
/// These come from ordinary UI sequencing (dragging before picking, picking
/// with no target active) and never leave the mesh partially modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("vertex index {index} out of range (vertex count {count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("unknown morph target '{0}'")]
    UnknownTarget(String),
    #[error("no morph target is active for editing")]
    NoActiveTarget,
    #[error("no vertex is selected")]
    NoSelection,
    #[error("edit mode is disabled")]
    EditModeDisabled,
    #[error("mesh transform is singular, world positions cannot be mapped back")]
    SingularTransform,
    #[error("morph target '{0}' already exists")]
    DuplicateTarget(String),
    #[error("morph target '{name}' has {actual} deltas, expected {expected}")]
    DeltaLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Failures while decoding or encoding a model file.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("glTF load failed: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

impl From<EditError> for CodecError {
    fn from(err: EditError) -> Self {
        CodecError::Invalid(err.to_string())
    }
}
