use crate::io::model_loader::{
    BLOCK_GRID, BLOCK_MESH, BLOCK_POSITIONS, MAX_BLOCK_SIZE, MAX_ELEMENTS, MeshVertex, Model,
    POSITION_SCALE, SIGNATURE, VERSION,
};
use std::io::{self, Write};

/// Encodes a [`Model`] in the format [`Model::load`] reads.
pub struct ModelWriter;

impl ModelWriter {
    pub fn to_bytes(model: &Model) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        Self::write(model, &mut out)?;
        Ok(out)
    }

    /// One block per mesh and grid; mount points go into as many position
    /// blocks as their 16-bit count needs.
    pub fn write<W: Write>(model: &Model, mut out: W) -> io::Result<()> {
        let blocks = Self::encode_blocks(model);
        if blocks.len() > MAX_ELEMENTS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} blocks, the format holds at most {}", blocks.len(), MAX_ELEMENTS),
            ));
        }

        out.write_all(SIGNATURE)?;
        out.write_all(&VERSION.to_le_bytes())?;
        out.write_all(&(blocks.len() as u16).to_le_bytes())?;
        for (kind, values) in &blocks {
            let size = values.len() * 2;
            if size > MAX_BLOCK_SIZE as usize {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("block of {} bytes exceeds the size limit", size),
                ));
            }
            out.write_all(&kind.to_le_bytes())?;
            out.write_all(&(size as u32).to_le_bytes())?;
        }
        for (_, values) in &blocks {
            let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            out.write_all(&bytes)?;
        }
        out.flush()
    }

    fn encode_blocks(model: &Model) -> Vec<(u32, Vec<i16>)> {
        let mut blocks = Vec::new();

        for mesh in model.meshes() {
            let vertices = mesh.vertices();
            let mut values = vec![vertices.len() as u16 as i16, mesh.triangles().len() as u16 as i16];
            let columns: [fn(&MeshVertex) -> i16; 9] = [
                |v| to_fixed(v.position.x),
                |v| to_fixed(v.position.y),
                |v| to_fixed(v.position.z),
                |v| to_fixed(v.normal.x),
                |v| to_fixed(v.normal.y),
                |v| to_fixed(v.normal.z),
                |v| to_channel(v.color.r),
                |v| to_channel(v.color.g),
                |v| to_channel(v.color.b),
            ];
            for column in columns {
                values.extend(vertices.iter().map(column));
            }
            for tri in mesh.triangles() {
                values.extend(tri.iter().map(|&i| i as i16));
            }
            blocks.push((BLOCK_MESH, values));
        }

        for grid in model.grids() {
            let lines = grid.lines();
            let mut values = vec![lines.len() as u16 as i16];
            for axis in 0..3 {
                for (from, to) in lines {
                    values.push(to_fixed(from[axis]));
                    values.push(to_fixed(to[axis]));
                }
            }
            blocks.push((BLOCK_GRID, values));
        }

        let points: Vec<_> = model.positions().iter().collect();
        for chunk in points.chunks(u16::MAX as usize) {
            let mut values = vec![chunk.len() as u16 as i16];
            values.extend(chunk.iter().map(|p| p.id as i16));
            for axis in 0..3 {
                values.extend(chunk.iter().map(|p| to_fixed(p.position[axis])));
            }
            blocks.push((BLOCK_POSITIONS, values));
        }

        blocks
    }
}

/// 2.14 fixed point, saturating at the i16 range.
pub fn to_fixed(v: f32) -> i16 {
    (v * POSITION_SCALE)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// 0..255 channel to 6.10.
pub fn to_channel(c: u8) -> i16 {
    (c as i16) << 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::position_list::PositionList;
    use crate::geometry::vec_math::Vec3f;
    use crate::io::model_loader::{Grid, Mesh};
    use crate::material_system::color::Color;

    fn sample() -> Model {
        let vertex = |x: f32, y: f32, color: Color| MeshVertex {
            position: Vec3f::new(x, y, -0.25),
            normal: Vec3f::z(),
            color,
        };
        let mesh = Mesh::new(
            vec![
                vertex(0.0, 0.0, Color::rgb(255, 0, 0)),
                vertex(1.0, 0.0, Color::rgb(0, 128, 0)),
                vertex(0.0, 1.5, Color::rgb(0, 0, 7)),
            ],
            vec![[0, 1, 2], [2, 1, 0]],
        );
        let grid = Grid::new(vec![
            (Vec3f::new(-1.0, 0.0, 0.0), Vec3f::new(1.0, 0.0, 0.0)),
            (Vec3f::new(0.0, -1.0, 0.5), Vec3f::new(0.0, 1.0, 0.5)),
        ]);
        let mut positions = PositionList::new();
        positions.push(3, Vec3f::new(0.5, 0.5, 0.0));
        positions.push(9, Vec3f::new(-0.5, 0.25, 1.0));
        Model::from_parts(vec![mesh], vec![grid], positions)
    }

    #[test]
    fn written_model_loads_back_identically() {
        let model = sample();
        let bytes = ModelWriter::to_bytes(&model).unwrap();
        let mut loaded = Model::new();
        loaded.load("memory", bytes.as_slice()).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn out_of_range_values_saturate() {
        assert_eq!(to_fixed(5.0), i16::MAX);
        assert_eq!(to_fixed(-5.0), i16::MIN);
        assert_eq!(to_fixed(-0.5), -8192);
        assert_eq!(to_channel(255), 1020);
    }
}
