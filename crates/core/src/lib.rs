mod editor;
mod error;
mod gltf_io;
mod history;
mod influence;
mod mesh;
mod picker;
mod session;

pub use editor::{
    DeltaEditor, DragState, EditEffect, EditorEvent, EditorSettings, EditorState, Step,
};
pub use error::{CodecError, EditError};
pub use gltf_io::{encode_glb, load_gltf_mesh, load_gltf_mesh_bytes, write_gltf};
pub use history::{History, HistoryEntry};
pub use influence::InfluenceMap;
pub use mesh::{Aabb, Mesh, MorphTarget};
pub use picker::pick_vertex;
pub use session::{tick, EditingSession};
