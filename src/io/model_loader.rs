//! Binary model files: meshes, line grids and named mount points.
//!
//! Layout, all little-endian:
//!
//! ```text
//! header   8 bytes  signature "CCmodel\x1A"
//!          u16      version (1)
//!          u16      element count (<= 1000)
//! index    element count x { u32 type, u32 byte size (<= 10 MiB) }
//! payloads in index order, each an array of i16
//! ```
//!
//! Positions and normals are 2.14 fixed point, colors 6.10 (0..1023 maps to
//! 0..255). Counts and indices are stored as i16 but read as u16.

use crate::core::renderer::{LineRenderer, TriangleRenderer};
use crate::geometry::position_list::PositionList;
use crate::geometry::vec_math::Vec3f;
use crate::material_system::color::Color;
use crate::material_system::color_transformation::ColorTransformation;
use log::{debug, warn};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

pub const SIGNATURE: &[u8; 8] = b"CCmodel\x1A";
pub const VERSION: u16 = 1;
pub const MAX_ELEMENTS: usize = 1000;
pub const MAX_BLOCK_SIZE: u32 = 10 * 1024 * 1024;

pub const BLOCK_MESH: u32 = 1;
pub const BLOCK_GRID: u32 = 2;
pub const BLOCK_POSITIONS: u32 = 3;

/// 2.14 fixed point scale.
pub const POSITION_SCALE: f32 = 16384.0;

/// A malformed model stream. Loading stops at the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct FileFormatError {
    /// File name or other identity of the stream.
    pub source_name: String,
    pub message: String,
}

impl FileFormatError {
    pub(crate) fn new(source_name: &str, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FileFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source_name, self.message)
    }
}

impl std::error::Error for FileFormatError {}

/// Failure to load a model file.
#[derive(Debug)]
pub enum ModelError {
    /// The file could not be opened.
    Io { path: PathBuf, source: io::Error },
    Format(FileFormatError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Io { path, source } => {
                write!(f, "cannot open model {}: {}", path.display(), source)
            }
            ModelError::Format(e) => write!(f, "invalid model {}", e),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Io { source, .. } => Some(source),
            ModelError::Format(e) => Some(e),
        }
    }
}

impl From<FileFormatError> for ModelError {
    fn from(e: FileFormatError) -> Self {
        ModelError::Format(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: Vec3f,
    pub normal: Vec3f,
    pub color: Color,
}

/// Indexed triangle mesh. Indices are always in range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    vertices: Vec<MeshVertex>,
    triangles: Vec<[u16; 3]>,
}

impl Mesh {
    /// Panics when an index is out of range or there are more vertices than
    /// 16-bit indices can address.
    pub fn new(vertices: Vec<MeshVertex>, triangles: Vec<[u16; 3]>) -> Self {
        assert!(
            vertices.len() <= u16::MAX as usize,
            "mesh has {} vertices, at most {} are addressable",
            vertices.len(),
            u16::MAX
        );
        for tri in &triangles {
            for &i in tri {
                assert!(
                    (i as usize) < vertices.len(),
                    "mesh index {} out of range ({} vertices)",
                    i,
                    vertices.len()
                );
            }
        }
        Mesh {
            vertices,
            triangles,
        }
    }

    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u16; 3]] {
        &self.triangles
    }
}

/// Set of independent line segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    lines: Vec<(Vec3f, Vec3f)>,
}

impl Grid {
    pub fn new(lines: Vec<(Vec3f, Vec3f)>) -> Self {
        assert!(
            lines.len() <= u16::MAX as usize,
            "grid has {} lines, at most {} fit a block",
            lines.len(),
            u16::MAX
        );
        Grid { lines }
    }

    pub fn lines(&self) -> &[(Vec3f, Vec3f)] {
        &self.lines
    }
}

/// Parsed model file. Contents only change through [`Model::load`], which
/// either replaces everything or leaves the model empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    meshes: Vec<Mesh>,
    grids: Vec<Grid>,
    positions: PositionList,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(meshes: Vec<Mesh>, grids: Vec<Grid>, positions: PositionList) -> Self {
        Model {
            meshes,
            grids,
            positions,
        }
    }

    /// Opens and parses a model file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Model, ModelError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut model = Model::new();
        model.load(&path.display().to_string(), BufReader::new(file))?;
        Ok(model)
    }

    /// Replaces the contents with the model read from `reader`. On error the
    /// model is left empty.
    pub fn load<R: Read>(&mut self, source_name: &str, reader: R) -> Result<(), FileFormatError> {
        *self = Model::new();
        let parsed = ModelParser {
            source_name,
            reader,
        }
        .parse()?;
        debug!(
            "{}: {} meshes, {} grids, {} mount points",
            source_name,
            parsed.meshes.len(),
            parsed.grids.len(),
            parsed.positions.len()
        );
        *self = parsed;
        Ok(())
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn grids(&self) -> &[Grid] {
        &self.grids
    }

    pub fn positions(&self) -> &PositionList {
        &self.positions
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty() && self.grids.is_empty() && self.positions.is_empty()
    }

    /// Adds every mesh to `renderer`, vertex colors passed through `colors`.
    pub fn feed_triangles(&self, renderer: &mut dyn TriangleRenderer, colors: &ColorTransformation) {
        for mesh in &self.meshes {
            let base: Vec<u32> = mesh
                .vertices
                .iter()
                .map(|v| renderer.add_vertex(v.position, v.normal, colors.transform(v.color)))
                .collect();
            for &[a, b, c] in &mesh.triangles {
                renderer.add_triangle(base[a as usize], base[b as usize], base[c as usize]);
            }
        }
    }

    /// Adds every grid line to `renderer` in one color.
    pub fn feed_lines(&self, renderer: &mut dyn LineRenderer, color: Color) {
        for grid in &self.grids {
            for &(from, to) in &grid.lines {
                renderer.add_line(from, to, color);
            }
        }
    }
}

/// Decodes a 2.14 fixed-point value.
pub fn fixed_to_f32(v: i16) -> f32 {
    v as f32 / POSITION_SCALE
}

/// Decodes a 6.10 color channel to 0..255.
pub fn fixed_to_channel(v: i16) -> u8 {
    (v.clamp(0, 1023) >> 2) as u8
}

struct ModelParser<'a, R> {
    source_name: &'a str,
    reader: R,
}

impl<R: Read> ModelParser<'_, R> {
    fn error(&self, message: impl Into<String>) -> FileFormatError {
        FileFormatError::new(self.source_name, message)
    }

    fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<(), FileFormatError> {
        self.reader.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => self.error(format!("unexpected end of file in {}", what)),
            _ => self.error(format!("read error in {}: {}", what, e)),
        })
    }

    fn parse(mut self) -> Result<Model, FileFormatError> {
        let mut header = [0u8; 12];
        self.read_exact(&mut header, "header")?;
        if &header[..8] != SIGNATURE {
            return Err(self.error("bad signature"));
        }
        let version = u16::from_le_bytes([header[8], header[9]]);
        if version != VERSION {
            return Err(self.error(format!("unsupported version {}", version)));
        }
        let count = u16::from_le_bytes([header[10], header[11]]) as usize;
        if count > MAX_ELEMENTS {
            return Err(self.error(format!(
                "too many elements ({}, at most {})",
                count, MAX_ELEMENTS
            )));
        }

        let mut index = vec![0u8; count * 8];
        self.read_exact(&mut index, "element index")?;
        let entries: Vec<(u32, u32)> = index
            .chunks_exact(8)
            .map(|e| {
                (
                    u32::from_le_bytes([e[0], e[1], e[2], e[3]]),
                    u32::from_le_bytes([e[4], e[5], e[6], e[7]]),
                )
            })
            .collect();
        for (i, &(_, size)) in entries.iter().enumerate() {
            if size > MAX_BLOCK_SIZE {
                return Err(self.error(format!("element {} too large ({} bytes)", i, size)));
            }
        }

        let mut model = Model::new();
        for (i, &(kind, size)) in entries.iter().enumerate() {
            match kind {
                BLOCK_MESH => {
                    let values = self.read_values(i, size)?;
                    model.meshes.push(self.parse_mesh(i, &values)?);
                }
                BLOCK_GRID => {
                    let values = self.read_values(i, size)?;
                    model.grids.push(self.parse_grid(i, &values)?);
                }
                BLOCK_POSITIONS => {
                    let values = self.read_values(i, size)?;
                    self.parse_positions(i, &values, &mut model.positions)?;
                }
                _ => {
                    warn!("{}: skipping element {} of unknown type {}", self.source_name, i, kind);
                    self.skip(i, size)?;
                }
            }
        }
        Ok(model)
    }

    fn read_values(&mut self, element: usize, size: u32) -> Result<Vec<i16>, FileFormatError> {
        if size % 2 != 0 {
            return Err(self.error(format!("element {}: odd payload size {}", element, size)));
        }
        let mut bytes = vec![0u8; size as usize];
        self.read_exact(&mut bytes, &format!("element {}", element))?;
        Ok(bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect())
    }

    fn skip(&mut self, element: usize, size: u32) -> Result<(), FileFormatError> {
        let mut payload = (&mut self.reader).take(size as u64);
        let copied = io::copy(&mut payload, &mut io::sink());
        let skipped =
            copied.map_err(|e| self.error(format!("read error in element {}: {}", element, e)))?;
        if skipped != size as u64 {
            return Err(self.error(format!("unexpected end of file in element {}", element)));
        }
        Ok(())
    }

    fn expect_len(&self, element: usize, what: &str, values: &[i16], expected: usize) -> Result<(), FileFormatError> {
        if values.len() != expected {
            return Err(self.error(format!(
                "element {}: {} block expects {} values, found {}",
                element,
                what,
                expected,
                values.len()
            )));
        }
        Ok(())
    }

    fn parse_mesh(&self, element: usize, values: &[i16]) -> Result<Mesh, FileFormatError> {
        if values.len() < 2 {
            return Err(self.error(format!("element {}: mesh block without counts", element)));
        }
        let vertex_count = values[0] as u16 as usize;
        let triangle_count = values[1] as u16 as usize;
        self.expect_len(element, "mesh", values, 2 + 9 * vertex_count + 3 * triangle_count)?;

        let column = |c: usize| &values[2 + c * vertex_count..2 + (c + 1) * vertex_count];
        let (x, y, z) = (column(0), column(1), column(2));
        let (nx, ny, nz) = (column(3), column(4), column(5));
        let (r, g, b) = (column(6), column(7), column(8));
        let vertices = (0..vertex_count)
            .map(|i| MeshVertex {
                position: Vec3f::new(fixed_to_f32(x[i]), fixed_to_f32(y[i]), fixed_to_f32(z[i])),
                normal: Vec3f::new(fixed_to_f32(nx[i]), fixed_to_f32(ny[i]), fixed_to_f32(nz[i])),
                color: Color::rgb(
                    fixed_to_channel(r[i]),
                    fixed_to_channel(g[i]),
                    fixed_to_channel(b[i]),
                ),
            })
            .collect();

        let indices = &values[2 + 9 * vertex_count..];
        let mut triangles = Vec::with_capacity(triangle_count);
        for (t, tri) in indices.chunks_exact(3).enumerate() {
            let tri = [tri[0] as u16, tri[1] as u16, tri[2] as u16];
            if let Some(&bad) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(self.error(format!(
                    "element {}: triangle {} index {} out of range ({} vertices)",
                    element, t, bad, vertex_count
                )));
            }
            triangles.push(tri);
        }

        Ok(Mesh {
            vertices,
            triangles,
        })
    }

    fn parse_grid(&self, element: usize, values: &[i16]) -> Result<Grid, FileFormatError> {
        let Some(&count) = values.first() else {
            return Err(self.error(format!("element {}: grid block without count", element)));
        };
        let points = 2 * (count as u16 as usize);
        self.expect_len(element, "grid", values, 1 + 3 * points)?;

        let x = &values[1..1 + points];
        let y = &values[1 + points..1 + 2 * points];
        let z = &values[1 + 2 * points..];
        let point = |i: usize| Vec3f::new(fixed_to_f32(x[i]), fixed_to_f32(y[i]), fixed_to_f32(z[i]));
        let lines = (0..points / 2).map(|l| (point(2 * l), point(2 * l + 1))).collect();
        Ok(Grid { lines })
    }

    fn parse_positions(
        &self,
        element: usize,
        values: &[i16],
        positions: &mut PositionList,
    ) -> Result<(), FileFormatError> {
        let Some(&count) = values.first() else {
            return Err(self.error(format!("element {}: position block without count", element)));
        };
        let n = count as u16 as usize;
        self.expect_len(element, "position", values, 1 + 4 * n)?;

        let column = |c: usize| &values[1 + c * n..1 + (c + 1) * n];
        let (ids, x, y, z) = (column(0), column(1), column(2), column(3));
        for i in 0..n {
            positions.push(
                ids[i] as u16,
                Vec3f::new(fixed_to_f32(x[i]), fixed_to_f32(y[i]), fixed_to_f32(z[i])),
            );
        }
        Ok(())
    }
}
