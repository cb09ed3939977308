//! BSE animated meshes.
//!
//! A BSE file is a fixed sequence of tagged sections:
//!
//! ```text
//! BSE1  u32 poly count, u32 vertex count, u32 frame count
//! VERT  vertex positions
//! POLY  8 x u32 per triangle
//! COLR  3 x RGB8 per triangle
//! UVS0  3 x (u, v) per triangle
//! FLAG  u32 per triangle
//! FRMS  frame count x vertex positions        (only when frames > 0)
//! SCAL  f32 uniform scale                     (optional)
//! AUVS  frame count x per-triangle UVs        (optional)
//! ```

use serde::Serialize;

use crate::error::{FormatError, Result};
use crate::reader::ByteReader;

pub const TAG_BSE1: &[u8; 4] = b"BSE1";
pub const TAG_VERT: &[u8; 4] = b"VERT";
pub const TAG_POLY: &[u8; 4] = b"POLY";
pub const TAG_COLR: &[u8; 4] = b"COLR";
pub const TAG_UVS0: &[u8; 4] = b"UVS0";
pub const TAG_FLAG: &[u8; 4] = b"FLAG";
pub const TAG_FRMS: &[u8; 4] = b"FRMS";
pub const TAG_SCAL: &[u8; 4] = b"SCAL";
pub const TAG_AUVS: &[u8; 4] = b"AUVS";

/// Triangle samples the bound texture.
pub const FLAG_TEXTURED: u32 = 0x1;
/// Triangle has partially transparent texels and is drawn after opaque ones.
pub const FLAG_TRANSPARENT: u32 = 0x2;

const VERTEX_SIZE: usize = 12;
const TRIANGLE_SIZE: usize = 32;
const COLOR_SIZE: usize = 9;
const TRIANGLE_UV_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BseVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BseTriangle {
    /// Vertex indices as stored, i.e. multiplied by three.
    pub raw_indices: [u32; 3],
    /// Groups triangles into logical parts of the model.
    pub object_id: u32,
    pub bse_index: u32,
    pub poly_index: u32,
    /// Nearly always `0xFFFFFFFF`.
    pub unk7: u32,
    /// Nearly always zero.
    pub unk8: u32,
}

impl BseTriangle {
    /// Indices into the vertex array.
    pub fn vertex_indices(&self) -> [usize; 3] {
        self.raw_indices.map(|raw| raw as usize / 3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BseUv {
    pub u: f32,
    pub v: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BseRgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Per-corner UVs of one triangle.
pub type BseTriangleUv = [BseUv; 3];
/// Per-corner colors of one triangle.
pub type BseTriangleColor = [BseRgb; 3];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bse {
    pub poly_count: u32,
    pub vertex_count: u32,
    pub frame_count: u32,
    pub vertices: Vec<BseVertex>,
    pub triangles: Vec<BseTriangle>,
    pub colors: Vec<BseTriangleColor>,
    pub uvs: Vec<BseTriangleUv>,
    pub flags: Vec<u32>,
    /// One full vertex set per animation frame.
    pub frames: Option<Vec<Vec<BseVertex>>>,
    pub scale: Option<f32>,
    /// Per-frame UV overrides, one set per frame.
    pub uv_frames: Option<Vec<Vec<BseTriangleUv>>>,
}

impl Bse {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);

        reader.expect_tag(TAG_BSE1)?;
        let poly_count = reader.read_u32("BSE poly count")?;
        let vertex_count = reader.read_u32("BSE vertex count")?;
        let frame_count = reader.read_u32("BSE frame count")?;
        let polys = poly_count as usize;
        let verts = vertex_count as usize;
        let frames_len = frame_count as usize;

        reader.expect_tag(TAG_VERT)?;
        let vertices = read_vertices(&mut reader, verts, "BSE vertices")?;

        reader.expect_tag(TAG_POLY)?;
        let triangles_offset = reader.position();
        let triangles = read_triangles(&mut reader, polys)?;
        for (index, triangle) in triangles.iter().enumerate() {
            if let Some(&bad) = triangle
                .vertex_indices()
                .iter()
                .find(|&&vertex| vertex >= verts)
            {
                return Err(FormatError::corrupt(
                    triangles_offset + index * TRIANGLE_SIZE,
                    format!("triangle {index} references vertex {bad} of {verts}"),
                ));
            }
        }

        reader.expect_tag(TAG_COLR)?;
        let colors = read_colors(&mut reader, polys)?;

        reader.expect_tag(TAG_UVS0)?;
        let uvs = read_triangle_uvs(&mut reader, polys, "BSE UVs")?;

        reader.expect_tag(TAG_FLAG)?;
        let flags = reader.read_u32_array(polys, "BSE flags")?;

        let frames = if frame_count > 0 {
            reader.expect_tag(TAG_FRMS)?;
            reader.ensure_records(
                frames_len,
                verts.saturating_mul(VERTEX_SIZE),
                "BSE animation frames",
            )?;
            let mut frames = Vec::with_capacity(frames_len);
            for _ in 0..frames_len {
                frames.push(read_vertices(&mut reader, verts, "BSE animation frames")?);
            }
            Some(frames)
        } else {
            None
        };

        let scale = if reader.remaining() > 4 && reader.consume_tag_if(TAG_SCAL) {
            Some(reader.read_f32("BSE scale")?)
        } else {
            None
        };

        let uv_frames = if reader.remaining() > 4 && reader.consume_tag_if(TAG_AUVS) {
            reader.ensure_records(
                frames_len,
                polys.saturating_mul(TRIANGLE_UV_SIZE),
                "BSE animated UVs",
            )?;
            let mut uv_frames = Vec::with_capacity(frames_len);
            for _ in 0..frames_len {
                uv_frames.push(read_triangle_uvs(&mut reader, polys, "BSE animated UVs")?);
            }
            Some(uv_frames)
        } else {
            None
        };

        if reader.remaining() > 0 {
            log::debug!(
                "BSE has {} unparsed trailing bytes at {:#x}",
                reader.remaining(),
                reader.position()
            );
        }

        Ok(Bse {
            poly_count,
            vertex_count,
            frame_count,
            vertices,
            triangles,
            colors,
            uvs,
            flags,
            frames,
            scale,
            uv_frames,
        })
    }

    pub fn is_animated(&self) -> bool {
        self.frames.is_some()
    }
}

fn read_vertex(reader: &mut ByteReader<'_>, what: &'static str) -> Result<BseVertex> {
    Ok(BseVertex {
        x: reader.read_f32(what)?,
        y: reader.read_f32(what)?,
        z: reader.read_f32(what)?,
    })
}

fn read_vertices(
    reader: &mut ByteReader<'_>,
    count: usize,
    what: &'static str,
) -> Result<Vec<BseVertex>> {
    reader.ensure_records(count, VERTEX_SIZE, what)?;
    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        vertices.push(read_vertex(reader, what)?);
    }
    Ok(vertices)
}

fn read_triangles(reader: &mut ByteReader<'_>, count: usize) -> Result<Vec<BseTriangle>> {
    const WHAT: &str = "BSE triangles";
    reader.ensure_records(count, TRIANGLE_SIZE, WHAT)?;
    let mut triangles = Vec::with_capacity(count);
    for _ in 0..count {
        let raw_indices = [
            reader.read_u32(WHAT)?,
            reader.read_u32(WHAT)?,
            reader.read_u32(WHAT)?,
        ];
        triangles.push(BseTriangle {
            raw_indices,
            object_id: reader.read_u32(WHAT)?,
            bse_index: reader.read_u32(WHAT)?,
            poly_index: reader.read_u32(WHAT)?,
            unk7: reader.read_u32(WHAT)?,
            unk8: reader.read_u32(WHAT)?,
        });
    }
    Ok(triangles)
}

fn read_colors(reader: &mut ByteReader<'_>, count: usize) -> Result<Vec<BseTriangleColor>> {
    let table_len = count
        .checked_mul(COLOR_SIZE)
        .ok_or_else(|| FormatError::corrupt(reader.position(), "BSE color table overflows"))?;
    let bytes = reader.read_bytes(table_len, "BSE colors")?;
    Ok(bytes
        .chunks_exact(COLOR_SIZE)
        .map(|chunk| {
            [0, 3, 6].map(|at| BseRgb {
                r: chunk[at],
                g: chunk[at + 1],
                b: chunk[at + 2],
            })
        })
        .collect())
}

fn read_triangle_uvs(
    reader: &mut ByteReader<'_>,
    count: usize,
    what: &'static str,
) -> Result<Vec<BseTriangleUv>> {
    reader.ensure_records(count, TRIANGLE_UV_SIZE, what)?;
    let mut uvs = Vec::with_capacity(count);
    for _ in 0..count {
        let mut corners = [BseUv { u: 0.0, v: 0.0 }; 3];
        for corner in &mut corners {
            corner.u = reader.read_f32(what)?;
            corner.v = reader.read_f32(what)?;
        }
        uvs.push(corners);
    }
    Ok(uvs)
}


#[cfg(test)]
mod tests {
    use super::test_support::BseBuilder;
    use super::*;

    #[test]
    fn decodes_static_mesh() {
        let bse = Bse::from_bytes(&BseBuilder::triangle().build()).unwrap();
        assert_eq!(bse.poly_count, 1);
        assert_eq!(bse.vertex_count, 3);
        assert_eq!(bse.frame_count, 0);
        assert_eq!(bse.vertices[1], BseVertex { x: 1.0, y: 0.0, z: 0.0 });
        let triangle = bse.triangles[0];
        assert_eq!(triangle.raw_indices, [0, 3, 6]);
        assert_eq!(triangle.vertex_indices(), [0, 1, 2]);
        assert_eq!(triangle.object_id, 7);
        assert_eq!(triangle.unk7, 0xFFFF_FFFF);
        assert_eq!(bse.colors[0][2], BseRgb { r: 0, g: 2, b: 200 });
        assert_eq!(bse.uvs[0][1], BseUv { u: 1.0, v: 0.0 });
        assert_eq!(bse.flags, vec![FLAG_TEXTURED]);
        assert!(bse.frames.is_none());
        assert!(bse.scale.is_none());
        assert!(bse.uv_frames.is_none());
    }

    #[test]
    fn decodes_frames_scale_and_animated_uvs() {
        let mut builder = BseBuilder::triangle();
        builder.frames = vec![builder.vertices.clone(), vec![[2.0, 2.0, 2.0]; 3]];
        builder.scale = Some(0.5);
        builder.uv_frames = Some(vec![
            vec![[0.0, 0.0, 0.5, 0.0, 0.0, 0.5]],
            vec![[0.25, 0.25, 0.75, 0.25, 0.25, 0.75]],
        ]);

        let bse = Bse::from_bytes(&builder.build()).unwrap();
        assert!(bse.is_animated());
        assert_eq!(bse.frame_count, 2);
        let frames = bse.frames.as_ref().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1][2], BseVertex { x: 2.0, y: 2.0, z: 2.0 });
        assert_eq!(bse.scale, Some(0.5));
        let uv_frames = bse.uv_frames.as_ref().unwrap();
        assert_eq!(uv_frames.len(), 2);
        assert_eq!(uv_frames[1][0][2], BseUv { u: 0.25, v: 0.75 });
    }

    #[test]
    fn animated_uvs_without_scale_are_probed() {
        let mut builder = BseBuilder::triangle();
        builder.frames = vec![builder.vertices.clone()];
        builder.uv_frames = Some(vec![vec![[0.0; 6]]]);
        let bse = Bse::from_bytes(&builder.build()).unwrap();
        assert!(bse.scale.is_none());
        assert_eq!(bse.uv_frames.unwrap().len(), 1);
    }

    #[test]
    fn unknown_trailing_tag_is_left_alone() {
        let mut data = BseBuilder::triangle().build();
        data.extend_from_slice(b"JUNK\0\0\0\0");
        let bse = Bse::from_bytes(&data).unwrap();
        assert!(bse.scale.is_none());
        assert!(bse.uv_frames.is_none());
    }

    #[test]
    fn wrong_section_tag_reports_offset() {
        let mut data = Vec::new();
        data.extend_from_slice(TAG_BSE1);
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(TAG_POLY);

        match Bse::from_bytes(&data).unwrap_err() {
            FormatError::MalformedHeader {
                expected,
                actual,
                offset,
            } => {
                assert_eq!(&expected, TAG_VERT);
                assert_eq!(&actual, TAG_POLY);
                // The VERT tag sits right after the 12 bytes of header fields.
                assert_eq!(offset, 16);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut data = BseBuilder::triangle().build();
        data[..4].copy_from_slice(b"BSE2");
        assert!(matches!(
            Bse::from_bytes(&data),
            Err(FormatError::MalformedHeader { offset: 0, .. })
        ));
    }

    #[test]
    fn out_of_range_vertex_index_is_corrupt() {
        let mut builder = BseBuilder::triangle();
        builder.triangles[0][2] = 9;
        let err = Bse::from_bytes(&builder.build()).unwrap_err();
        assert!(matches!(err, FormatError::CorruptData { .. }));
    }

    #[test]
    fn missing_frames_section_is_truncated() {
        let mut builder = BseBuilder::triangle();
        builder.frames = vec![builder.vertices.clone()];
        let mut data = builder.build();
        data.truncate(data.len() - 4);
        assert!(matches!(
            Bse::from_bytes(&data),
            Err(FormatError::TruncatedData { .. })
        ));
    }
}
