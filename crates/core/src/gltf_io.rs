use std::path::Path;

use glam::Mat4;
use serde::Deserialize;

use crate::error::CodecError;
use crate::mesh::Mesh;

const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const FLOAT: u32 = 5126;
const UNSIGNED_SHORT: u32 = 5123;
const UNSIGNED_INT: u32 = 5125;

pub fn load_gltf_mesh(path: impl AsRef<Path>) -> Result<Mesh, CodecError> {
    let path = path.as_ref();
    let (document, buffers, _) = gltf::import(path)?;
    let mesh = build_mesh_from_gltf(&document, &buffers)?;
    tracing::info!(
        "loaded {:?}: {} vertices, {} morph targets",
        path,
        mesh.vertex_count(),
        mesh.targets().len()
    );
    Ok(mesh)
}

pub fn load_gltf_mesh_bytes(data: &[u8]) -> Result<Mesh, CodecError> {
    let (document, buffers, _) = gltf::import_slice(data)?;
    build_mesh_from_gltf(&document, &buffers)
}

#[derive(Debug, Default, Deserialize)]
struct MeshExtras {
    #[serde(rename = "targetNames", default)]
    target_names: Vec<String>,
}

/// Picks the first mesh that carries morph targets (else the first mesh) and
/// returns it with its world transform.
fn select_mesh(document: &gltf::Document) -> Option<(gltf::Mesh<'_>, Mat4)> {
    let mut placed = Vec::new();
    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        for node in scene.nodes() {
            collect_mesh_nodes(node, Mat4::IDENTITY, &mut placed);
        }
    }
    for mesh in document.meshes() {
        if !placed.iter().any(|(placed_mesh, _)| placed_mesh.index() == mesh.index()) {
            placed.push((mesh, Mat4::IDENTITY));
        }
    }
    let with_targets = placed.iter().position(|(mesh, _)| {
        mesh.primitives()
            .any(|primitive| primitive.morph_targets().next().is_some())
    });
    placed.into_iter().nth(with_targets.unwrap_or(0))
}

fn collect_mesh_nodes<'a>(
    node: gltf::Node<'a>,
    parent: Mat4,
    out: &mut Vec<(gltf::Mesh<'a>, Mat4)>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        out.push((mesh, world));
    }
    for child in node.children() {
        collect_mesh_nodes(child, world, out);
    }
}

fn target_names(mesh: &gltf::Mesh<'_>) -> Vec<String> {
    let Some(raw) = mesh.extras().as_ref() else {
        return Vec::new();
    };
    match serde_json::from_str::<MeshExtras>(raw.get()) {
        Ok(extras) => extras.target_names,
        Err(err) => {
            tracing::warn!("ignoring unreadable mesh extras: {err}");
            Vec::new()
        }
    }
}

/// Builds a [`Mesh`] from a decoded document. Nothing is returned unless the
/// whole mesh, every target included, passed validation.
fn build_mesh_from_gltf(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Mesh, CodecError> {
    let (source, local_to_world) = select_mesh(document)
        .ok_or_else(|| CodecError::Invalid("glTF has no meshes".to_string()))?;

    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut include_normals = true;
    let mut include_uvs = true;
    let mut target_deltas: Option<Vec<Vec<[f32; 3]>>> = None;

    for primitive in source.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            tracing::warn!("skipping non-triangle primitive {}", primitive.index());
            continue;
        }
        let reader =
            primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let prim_positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| {
                CodecError::Invalid("glTF primitive missing POSITION attribute".to_string())
            })?
            .collect();
        if prim_positions.is_empty() {
            continue;
        }
        let count = prim_positions.len();
        let base = positions.len() as u32;
        positions.extend(prim_positions);

        if let Some(iter) = reader.read_normals() {
            normals.extend(iter);
        } else {
            include_normals = false;
        }

        if let Some(iter) = reader.read_tex_coords(0) {
            uvs.extend(iter.into_f32());
        } else {
            include_uvs = false;
        }

        let prim_indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..count as u32).collect(),
        };
        if let Some(&bad) = prim_indices.iter().find(|&&idx| idx as usize >= count) {
            return Err(CodecError::Invalid(format!(
                "primitive {} references vertex {bad} of {count}",
                primitive.index()
            )));
        }
        indices.extend(prim_indices.into_iter().map(|idx| idx + base));

        let morphs: Vec<_> = reader.read_morph_targets().collect();
        let deltas = target_deltas.get_or_insert_with(|| vec![Vec::new(); morphs.len()]);
        if deltas.len() != morphs.len() {
            return Err(CodecError::Invalid(format!(
                "primitives disagree on morph target count ({} vs {})",
                deltas.len(),
                morphs.len()
            )));
        }
        for (slot, (morph_positions, _, _)) in deltas.iter_mut().zip(morphs) {
            match morph_positions {
                Some(iter) => {
                    let before = slot.len();
                    slot.extend(iter);
                    if slot.len() - before != count {
                        return Err(CodecError::Invalid(format!(
                            "morph target on primitive {} has {} deltas, expected {count}",
                            primitive.index(),
                            slot.len() - before
                        )));
                    }
                }
                None => slot.extend(std::iter::repeat_n([0.0, 0.0, 0.0], count)),
            }
        }
    }

    if positions.is_empty() {
        return Err(CodecError::Invalid("glTF has no triangle geometry".to_string()));
    }

    let mut mesh = Mesh::with_positions_indices(positions, indices);
    mesh.local_to_world = local_to_world;
    if include_normals && normals.len() == mesh.vertex_count() {
        mesh.normals = Some(normals);
    }
    if include_uvs && uvs.len() == mesh.vertex_count() {
        mesh.uvs = Some(uvs);
    }
    if mesh.normals.is_none() {
        mesh.compute_normals();
    }

    let names = target_names(&source);
    let weights = source.weights().unwrap_or(&[]);
    for (index, deltas) in target_deltas.unwrap_or_default().into_iter().enumerate() {
        let name = names
            .get(index)
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("target_{index}"));
        let weight = weights.get(index).copied().unwrap_or(0.0);
        mesh.add_target(name, deltas, weight)?;
    }
    Ok(mesh)
}

/// Writes `mesh` as `.gltf` + sibling `.bin` when the path ends in `.gltf`,
/// and as a single GLB otherwise.
pub fn write_gltf(path: impl AsRef<Path>, mesh: &Mesh) -> Result<(), CodecError> {
    let path = path.as_ref();
    let is_gltf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gltf"));
    if is_gltf {
        let bin_name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(|stem| format!("{stem}.bin"))
            .unwrap_or_else(|| "buffer.bin".to_string());
        let (json, bin) = build_gltf_payload(mesh, Some(bin_name.clone()))?;
        let json_bytes = serde_json::to_vec(&json)?;
        std::fs::write(path, &json_bytes)?;
        std::fs::write(path.with_file_name(bin_name), bin)?;
    } else {
        std::fs::write(path, encode_glb(mesh)?)?;
    }
    tracing::info!("exported {:?}", path);
    Ok(())
}

pub fn encode_glb(mesh: &Mesh) -> Result<Vec<u8>, CodecError> {
    let (json, bin) = build_gltf_payload(mesh, None)?;
    pack_glb(&json, bin)
}

fn pack_glb(json: &serde_json::Value, bin: Vec<u8>) -> Result<Vec<u8>, CodecError> {
    let json_bytes = serde_json::to_vec(json)?;
    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: 0,
        },
        json: std::borrow::Cow::Owned(json_bytes),
        bin: Some(std::borrow::Cow::Owned(bin)),
    };
    Ok(glb.to_vec()?)
}

fn export_indices(mesh: &Mesh) -> Result<Vec<u32>, CodecError> {
    if mesh.indices.is_empty() {
        if !mesh.vertex_count().is_multiple_of(3) {
            return Err(CodecError::Invalid(
                "Mesh has no indices and non-triangular vertex count".to_string(),
            ));
        }
        return Ok((0..mesh.vertex_count() as u32).collect());
    }
    if !mesh.indices.len().is_multiple_of(3) {
        return Err(CodecError::Invalid(
            "Mesh index count is not a multiple of 3".to_string(),
        ));
    }
    if let Some(&bad) = mesh
        .indices
        .iter()
        .find(|&&idx| idx as usize >= mesh.vertex_count())
    {
        return Err(CodecError::Invalid(format!(
            "index {bad} is out of range for {} vertices",
            mesh.vertex_count()
        )));
    }
    Ok(mesh.indices.clone())
}

fn build_gltf_payload(
    mesh: &Mesh,
    bin_uri: Option<String>,
) -> Result<(serde_json::Value, Vec<u8>), CodecError> {
    if mesh.vertex_count() == 0 {
        return Err(CodecError::Invalid("Mesh has no vertices to export".to_string()));
    }
    let indices = export_indices(mesh)?;

    let mut buffer = Vec::new();
    let mut buffer_views = Vec::new();
    let mut accessors = Vec::new();
    let mut attributes = serde_json::Map::new();

    let pos_accessor = push_vec3_accessor(&mut buffer, &mut buffer_views, &mut accessors, mesh.positions(), true);
    attributes.insert("POSITION".to_string(), serde_json::json!(pos_accessor));

    if let Some(normals) = &mesh.normals {
        let normal_accessor =
            push_vec3_accessor(&mut buffer, &mut buffer_views, &mut accessors, normals, false);
        attributes.insert("NORMAL".to_string(), serde_json::json!(normal_accessor));
    }
    if let Some(uvs) = &mesh.uvs {
        let mut flat = Vec::with_capacity(uvs.len() * 2);
        for uv in uvs {
            flat.extend_from_slice(uv);
        }
        let uv_view = push_f32(&mut buffer, &mut buffer_views, &flat, ARRAY_BUFFER);
        let uv_accessor =
            push_accessor(&mut accessors, uv_view, FLOAT, uvs.len(), "VEC2", None, None);
        attributes.insert("TEXCOORD_0".to_string(), serde_json::json!(uv_accessor));
    }

    let (index_bytes, index_component_type) = encode_indices(&indices, mesh.vertex_count());
    let index_view = push_bytes(&mut buffer, &mut buffer_views, &index_bytes, ELEMENT_ARRAY_BUFFER);
    let index_accessor = push_accessor(
        &mut accessors,
        index_view,
        index_component_type,
        indices.len(),
        "SCALAR",
        None,
        None,
    );

    let mut primitive = serde_json::json!({
        "attributes": attributes,
        "indices": index_accessor,
        "mode": 4
    });
    let mut gltf_mesh = serde_json::Map::new();
    if mesh.has_targets() {
        let targets: Vec<serde_json::Value> = mesh
            .targets()
            .iter()
            .map(|target| {
                let accessor = push_vec3_accessor(
                    &mut buffer,
                    &mut buffer_views,
                    &mut accessors,
                    target.deltas(),
                    true,
                );
                serde_json::json!({ "POSITION": accessor })
            })
            .collect();
        primitive["targets"] = serde_json::Value::Array(targets);
        gltf_mesh.insert("weights".to_string(), serde_json::json!(mesh.influences()));
        gltf_mesh.insert(
            "extras".to_string(),
            serde_json::json!({ "targetNames": mesh.target_names().collect::<Vec<_>>() }),
        );
    }
    gltf_mesh.insert("primitives".to_string(), serde_json::json!([primitive]));

    let mut node = serde_json::json!({ "mesh": 0 });
    if mesh.local_to_world != Mat4::IDENTITY {
        node["matrix"] = serde_json::json!(mesh.local_to_world.to_cols_array());
    }

    let buffer_obj = match bin_uri {
        Some(uri) => serde_json::json!({ "byteLength": buffer.len(), "uri": uri }),
        None => serde_json::json!({ "byteLength": buffer.len() }),
    };

    let gltf = serde_json::json!({
        "asset": {
            "version": "2.0",
            "generator": "morphsculpt"
        },
        "scenes": [
            { "nodes": [0] }
        ],
        "scene": 0,
        "nodes": [node],
        "meshes": [serde_json::Value::Object(gltf_mesh)],
        "buffers": [buffer_obj],
        "bufferViews": buffer_views,
        "accessors": accessors
    });

    Ok((gltf, buffer))
}

fn push_vec3_accessor(
    buffer: &mut Vec<u8>,
    buffer_views: &mut Vec<serde_json::Value>,
    accessors: &mut Vec<serde_json::Value>,
    data: &[[f32; 3]],
    with_bounds: bool,
) -> usize {
    let mut flat = Vec::with_capacity(data.len() * 3);
    for item in data {
        flat.extend_from_slice(item);
    }
    let view = push_f32(buffer, buffer_views, &flat, ARRAY_BUFFER);
    let (min, max) = if with_bounds {
        let (min, max) = min_max_vec3(data);
        (Some(min), Some(max))
    } else {
        (None, None)
    };
    push_accessor(accessors, view, FLOAT, data.len(), "VEC3", min, max)
}

fn push_f32(
    buffer: &mut Vec<u8>,
    buffer_views: &mut Vec<serde_json::Value>,
    data: &[f32],
    target: u32,
) -> usize {
    let mut bytes = Vec::with_capacity(data.len() * 4);
    for value in data {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    push_bytes(buffer, buffer_views, &bytes, target)
}

fn push_bytes(
    buffer: &mut Vec<u8>,
    buffer_views: &mut Vec<serde_json::Value>,
    data: &[u8],
    target: u32,
) -> usize {
    align_to_four(buffer);
    let offset = buffer.len();
    buffer.extend_from_slice(data);
    let view = serde_json::json!({
        "buffer": 0,
        "byteOffset": offset,
        "byteLength": data.len(),
        "target": target
    });
    buffer_views.push(view);
    buffer_views.len() - 1
}

fn push_accessor(
    accessors: &mut Vec<serde_json::Value>,
    view: usize,
    component_type: u32,
    count: usize,
    ty: &str,
    min: Option<Vec<f32>>,
    max: Option<Vec<f32>>,
) -> usize {
    let mut obj = serde_json::Map::new();
    obj.insert("bufferView".to_string(), serde_json::json!(view));
    obj.insert("componentType".to_string(), serde_json::json!(component_type));
    obj.insert("count".to_string(), serde_json::json!(count));
    obj.insert("type".to_string(), serde_json::json!(ty));
    if let Some(min) = min {
        obj.insert("min".to_string(), serde_json::json!(min));
    }
    if let Some(max) = max {
        obj.insert("max".to_string(), serde_json::json!(max));
    }
    accessors.push(serde_json::Value::Object(obj));
    accessors.len() - 1
}

fn encode_indices(indices: &[u32], vertex_count: usize) -> (Vec<u8>, u32) {
    if vertex_count <= u16::MAX as usize {
        let mut bytes = Vec::with_capacity(indices.len() * 2);
        for &idx in indices {
            bytes.extend_from_slice(&(idx as u16).to_le_bytes());
        }
        (bytes, UNSIGNED_SHORT)
    } else {
        let mut bytes = Vec::with_capacity(indices.len() * 4);
        for &idx in indices {
            bytes.extend_from_slice(&idx.to_le_bytes());
        }
        (bytes, UNSIGNED_INT)
    }
}

fn min_max_vec3(data: &[[f32; 3]]) -> (Vec<f32>, Vec<f32>) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for value in data {
        for i in 0..3 {
            min[i] = min[i].min(value[i]);
            max[i] = max[i].max(value[i]);
        }
    }
    (min.to_vec(), max.to_vec())
}

fn align_to_four(buffer: &mut Vec<u8>) {
    let padding = (4 - (buffer.len() % 4)) % 4;
    buffer.extend(std::iter::repeat_n(0u8, padding));
}
