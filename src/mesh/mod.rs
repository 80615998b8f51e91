//! VEM ("VULP") mesh container decoding.

use ahash::HashMap;
use bitflags::bitflags;

use crate::{error::DecodeError, handle::ResourceHandle, reader::ByteReader};

const MAGIC: &[u8] = b"VULP";

bitflags! {
    /// Optional vertex streams present in a VEM container.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct MeshFlags: u8 {
        const NORMALS = 1 << 0;
        const UV_COORDINATES = 1 << 1;
        /// Tangents and bitangents are stored together or not at all.
        const TANGENTS = 1 << 2;
        /// Per-vertex bone influences; version 6 containers only.
        const BONE_INFLUENCES = 1 << 3;
    }
}

/// Decoded contents of a VEM mesh container.
///
/// Vertex streams are flat component arrays: three floats per vertex for
/// positions, normals, tangents and bitangents, two per vertex for texture
/// coordinates, four bone indices and four weights per vertex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub normals: Option<Vec<f32>>,
    pub tangents: Option<Vec<f32>>,
    pub bitangents: Option<Vec<f32>>,
    pub uv_coordinates: Option<Vec<f32>>,
    pub vertex_bone_indices: Option<Vec<u8>>,
    pub vertex_bone_weights: Option<Vec<f32>>,
    pub bone_name_to_index: HashMap<String, u8>,
}

impl MeshData {
    /* VEM container layout:
        magic(4): "VULP"
        version(2): u16, 5 or 6
        flags(1): MeshFlags
        vertex count(4): u32
        index count(4): u32
        bone count(1): u8, version 6 only
        vertex positions: 3 x f32 per vertex
        indices: u32 each
        normals: 3 x f32 per vertex, if NORMALS
        tangents then bitangents: 3 x f32 per vertex each, if TANGENTS
        uv coordinates: 2 x f32 per vertex, if UV_COORDINATES
        bone data, version 6 with BONE_INFLUENCES:
            per bone: bone index(1), name length(1), name bytes
            per-vertex bone indices: 4 x u8 per vertex
            per-vertex bone weights: 4 x f32 per vertex
    */
    pub fn from_memory(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::new(data);
        r.expect_magic(MAGIC, "mesh container")?;

        let version = r.read_u16_le()?;
        if version != 5 && version != 6 {
            return Err(DecodeError::Format(format!(
                "unsupported mesh version {version}"
            )));
        }

        let flags = MeshFlags::from_bits_truncate(r.read_u8()?);

        let vertex_count = r.read_u32_le()? as usize;
        if vertex_count == 0 {
            return Err(DecodeError::Dimension("no vertices".into()));
        }
        let index_count = r.read_u32_le()? as usize;
        if index_count == 0 {
            return Err(DecodeError::Dimension("no indices".into()));
        }

        let bone_count = if version == 6 { r.read_u8()? } else { 0 };

        let mut mesh = MeshData {
            vertices: r.read_f32_array(vertex_count * 3)?,
            indices: r.read_u32_array(index_count)?,
            ..Default::default()
        };

        if flags.contains(MeshFlags::NORMALS) {
            mesh.normals = Some(r.read_f32_array(vertex_count * 3)?);
        }
        if flags.contains(MeshFlags::TANGENTS) {
            mesh.tangents = Some(r.read_f32_array(vertex_count * 3)?);
            mesh.bitangents = Some(r.read_f32_array(vertex_count * 3)?);
        }
        if flags.contains(MeshFlags::UV_COORDINATES) {
            mesh.uv_coordinates = Some(r.read_f32_array(vertex_count * 2)?);
        }

        if version == 6 && flags.contains(MeshFlags::BONE_INFLUENCES) {
            for _ in 0..bone_count {
                let bone_index = r.read_u8()?;
                let name = r.read_short_string()?;
                mesh.bone_name_to_index.insert(name, bone_index);
            }

            mesh.vertex_bone_indices = Some(r.take(vertex_count * 4)?.to_vec());
            mesh.vertex_bone_weights = Some(r.read_f32_array(vertex_count * 4)?);
        }

        Ok(mesh)
    }

    /// Number of vertices in the position stream.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// True when the mesh carries per-vertex bone influences.
    pub fn has_bone_influences(&self) -> bool {
        self.vertex_bone_indices.is_some()
    }
}

/// Decode a VEM buffer and wrap the result in a loaded resource handle.
pub fn decode_mesh(data: &[u8]) -> Result<ResourceHandle<MeshData>, DecodeError> {
    let mesh = MeshData::from_memory(data)?;
    let handle = ResourceHandle::new(mesh);
    handle.set_loaded();
    Ok(handle)
}
