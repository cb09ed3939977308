//! Flattens a decoded BSE into per-corner vertex arrays a renderer can upload
//! directly. Each triangle gets three unshared vertices carrying its face
//! normal, so flat shading falls out without an index buffer.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::Serialize;

use crate::bse::{Bse, BseTriangle, BseTriangleUv, BseVertex, FLAG_TRANSPARENT};
use crate::error::{FormatError, Result};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Vertex color in 0.0..=1.0.
    pub color: [f32; 3],
}

/// A run of consecutive triangles sharing the same flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrawBatch {
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub flags: u32,
}

/// Per-frame vertex streams, `frame_count * vertices_per_frame` entries each,
/// laid out in the same corner order as [`MeshBuffers::vertices`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshAnimation {
    pub frame_count: u32,
    pub vertices_per_frame: u32,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
}

impl MeshAnimation {
    pub fn frame_positions(&self, frame: usize) -> Option<&[[f32; 3]]> {
        let size = self.vertices_per_frame as usize;
        self.positions.get(frame * size..(frame + 1) * size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshBuffers {
    pub vertices: Vec<MeshVertex>,
    pub opaque: Vec<DrawBatch>,
    pub transparent: Vec<DrawBatch>,
    /// Largest absolute coordinate of the static pose; used to frame the
    /// model.
    pub extent: f32,
    pub scale: f32,
    pub animation: Option<MeshAnimation>,
}

/// Game space is Z-up; the buffers are Y-up.
fn swizzle(vertex: BseVertex) -> Vec3 {
    Vec3::new(vertex.x, -vertex.z, vertex.y)
}

fn face_normal([p1, p2, p3]: [Vec3; 3]) -> Vec3 {
    (p2 - p1).cross(p3 - p1).normalize_or_zero()
}

fn triangle_positions(
    vertices: &[BseVertex],
    triangle: &BseTriangle,
    poly: usize,
) -> Result<[Vec3; 3]> {
    let [a, b, c] = triangle.vertex_indices();
    let lookup = |index: usize| {
        vertices.get(index).copied().map(swizzle).ok_or_else(|| {
            FormatError::UnsupportedVariant(format!(
                "triangle {poly} references vertex {index} but only {} exist",
                vertices.len()
            ))
        })
    };
    Ok([lookup(a)?, lookup(b)?, lookup(c)?])
}

fn uv_array(uvs: &BseTriangleUv) -> [[f32; 2]; 3] {
    uvs.map(|uv| [uv.u, uv.v])
}

fn entry<'a, T>(values: &'a [T], index: usize, what: &str) -> Result<&'a T> {
    values.get(index).ok_or_else(|| {
        FormatError::UnsupportedVariant(format!(
            "BSE has {} {what} entries, needed entry {index}",
            values.len()
        ))
    })
}

fn count_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        FormatError::UnsupportedVariant(format!("{len} {what} do not fit a 32-bit count"))
    })
}

struct BatchBuilder {
    opaque: Vec<DrawBatch>,
    transparent: Vec<DrawBatch>,
    start: u32,
    flags: u32,
}

impl BatchBuilder {
    fn flush(&mut self, end: u32) {
        if end > self.start {
            let batch = DrawBatch {
                first_vertex: self.start,
                vertex_count: end - self.start,
                flags: self.flags,
            };
            if self.flags & FLAG_TRANSPARENT != 0 {
                self.transparent.push(batch);
            } else {
                self.opaque.push(batch);
            }
        }
        self.start = end;
    }
}

impl MeshBuffers {
    pub fn from_bse(bse: &Bse) -> Result<Self> {
        let mut vertices = Vec::with_capacity(bse.triangles.len() * 3);
        let mut extent = 0.0f32;
        let mut batches = BatchBuilder {
            opaque: Vec::new(),
            transparent: Vec::new(),
            start: 0,
            flags: 0,
        };

        for (poly, triangle) in bse.triangles.iter().enumerate() {
            let positions = triangle_positions(&bse.vertices, triangle, poly)?;
            let normal = face_normal(positions).to_array();
            let uvs = uv_array(entry(&bse.uvs, poly, "UV")?);
            let colors = entry(&bse.colors, poly, "color")?;
            let flags = *entry(&bse.flags, poly, "flag")?;

            if flags != batches.flags {
                batches.flush(count_u32(vertices.len(), "vertices")?);
                batches.flags = flags;
            }

            for corner in 0..3 {
                let rgb = colors[corner];
                extent = extent.max(positions[corner].abs().max_element());
                vertices.push(MeshVertex {
                    position: positions[corner].to_array(),
                    normal,
                    uv: uvs[corner],
                    color: [rgb.r, rgb.g, rgb.b].map(|value| f32::from(value) / 255.0),
                });
            }
        }
        batches.flush(count_u32(vertices.len(), "vertices")?);

        let animation = build_animation(bse)?;
        log::debug!(
            "expanded BSE into {} vertices ({} opaque, {} transparent batches)",
            vertices.len(),
            batches.opaque.len(),
            batches.transparent.len()
        );

        Ok(MeshBuffers {
            vertices,
            opaque: batches.opaque,
            transparent: batches.transparent,
            extent,
            scale: bse.scale.unwrap_or(1.0),
            animation,
        })
    }
}

fn build_animation(bse: &Bse) -> Result<Option<MeshAnimation>> {
    let Some(frames) = bse.frames.as_deref().filter(|frames| !frames.is_empty()) else {
        return Ok(None);
    };

    let per_frame = bse.triangles.len() * 3;
    let total = frames.len() * per_frame;
    let mut animation = MeshAnimation {
        frame_count: count_u32(frames.len(), "animation frames")?,
        vertices_per_frame: count_u32(per_frame, "vertices per frame")?,
        positions: Vec::with_capacity(total),
        normals: Vec::with_capacity(total),
        uvs: Vec::with_capacity(total),
    };

    for (frame_index, frame) in frames.iter().enumerate() {
        let frame_uvs = match &bse.uv_frames {
            Some(uv_frames) => entry(uv_frames, frame_index, "UV frame")?.as_slice(),
            None => bse.uvs.as_slice(),
        };
        for (poly, triangle) in bse.triangles.iter().enumerate() {
            let positions = triangle_positions(frame, triangle, poly)?;
            let normal = face_normal(positions).to_array();
            let uvs = uv_array(entry(frame_uvs, poly, "UV")?);
            for corner in 0..3 {
                animation.positions.push(positions[corner].to_array());
                animation.normals.push(normal);
                animation.uvs.push(uvs[corner]);
            }
        }
    }
    Ok(Some(animation))
}
