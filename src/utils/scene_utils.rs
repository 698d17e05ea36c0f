use crate::core::particle_processor::Particle;
use crate::geometry::position_list::PositionList;
use crate::geometry::vec_math::{Mat4f, Vec3f};
use crate::io::model_loader::{Grid, Mesh, MeshVertex, Model};
use crate::material_system::color::get_face_color;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Position-list id of the mount points along the demo cube's top front edge.
pub const DEMO_MOUNT_EDGE: u16 = 1;
/// Position-list id of the single point on top of the demo cube.
pub const DEMO_MOUNT_TOP: u16 = 2;

const CUBE_HALF: f32 = 0.5;
const GRID_HALF: f32 = 1.5;
const GRID_STEP: f32 = 0.25;

/// Built-in model: a unit cube, a floor grid under it and a few mount points.
///
/// Each face gets its own four vertices so normals stay flat. With
/// `colorize` the faces get distinct colors instead of neutral gray.
/// Coordinates are multiples of 1/64 so the model file stores them exactly.
pub fn demo_model(colorize: bool) -> Model {
    Model::from_parts(vec![cube_mesh(colorize)], vec![floor_grid()], mount_points())
}

fn cube_mesh(colorize: bool) -> Mesh {
    // (normal, u, v) with u x v = normal so corners run counter-clockwise
    // seen from outside.
    let faces = [
        (Vec3f::x(), Vec3f::y(), Vec3f::z()),
        (-Vec3f::x(), Vec3f::z(), Vec3f::y()),
        (Vec3f::y(), Vec3f::z(), Vec3f::x()),
        (-Vec3f::y(), Vec3f::x(), Vec3f::z()),
        (Vec3f::z(), Vec3f::x(), Vec3f::y()),
        (-Vec3f::z(), Vec3f::y(), Vec3f::x()),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut triangles = Vec::with_capacity(12);
    for (face, (normal, u, v)) in faces.iter().enumerate() {
        let color = get_face_color(face, colorize);
        let center = normal * CUBE_HALF;
        let base = vertices.len() as u16;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            vertices.push(MeshVertex {
                position: center + u * (su * CUBE_HALF) + v * (sv * CUBE_HALF),
                normal: *normal,
                color,
            });
        }
        triangles.push([base, base + 1, base + 2]);
        triangles.push([base, base + 2, base + 3]);
    }
    Mesh::new(vertices, triangles)
}

fn floor_grid() -> Grid {
    let y = -CUBE_HALF - 1.0 / 64.0;
    let steps = (2.0 * GRID_HALF / GRID_STEP).round() as usize;
    let mut lines = Vec::with_capacity(2 * (steps + 1));
    for i in 0..=steps {
        let t = -GRID_HALF + i as f32 * GRID_STEP;
        lines.push((Vec3f::new(t, y, -GRID_HALF), Vec3f::new(t, y, GRID_HALF)));
        lines.push((Vec3f::new(-GRID_HALF, y, t), Vec3f::new(GRID_HALF, y, t)));
    }
    Grid::new(lines)
}

fn mount_points() -> PositionList {
    let mut positions = PositionList::new();
    let lift = CUBE_HALF + 0.125;
    positions.push(DEMO_MOUNT_EDGE, Vec3f::new(-CUBE_HALF, lift, CUBE_HALF));
    positions.push(DEMO_MOUNT_EDGE, Vec3f::new(0.0, lift + 0.125, CUBE_HALF));
    positions.push(DEMO_MOUNT_EDGE, Vec3f::new(CUBE_HALF, lift, CUBE_HALF));
    positions.push(DEMO_MOUNT_TOP, Vec3f::new(0.0, lift, 0.0));
    positions
}

/// Seeded cloud of particles in a shell around the origin. The same seed
/// always gives the same cloud.
pub fn particle_cloud(count: usize, seed: u64, size: f32, alpha: u8) -> Vec<Particle> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let theta = rng.random::<f32>() * std::f32::consts::TAU;
            let height = rng.random::<f32>() * 2.0 - 1.0;
            let distance = 1.2 + rng.random::<f32>() * 0.8;
            let ring = (1.0 - height * height).sqrt();
            Particle {
                position: Vec3f::new(ring * theta.cos(), height, ring * theta.sin()) * distance,
                size: size * (0.5 + rng.random::<f32>()),
                alpha: (alpha as f32 * (0.4 + 0.6 * rng.random::<f32>())).round() as u8,
            }
        })
        .collect()
}

/// Billboard axes facing the viewer, expressed in the space `model_view`
/// maps from. Falls back to the plain X/Y axes for a singular matrix.
pub fn billboard_axes(model_view: &Mat4f) -> (Vec3f, Vec3f) {
    let Some(inverse) = model_view.inverse() else {
        return (Vec3f::x(), Vec3f::y());
    };
    let origin = inverse.transform(&Vec3f::zeros());
    let x_axis = inverse.transform(&Vec3f::x()) - origin;
    let y_axis = inverse.transform(&Vec3f::y()) - origin;
    (x_axis, y_axis)
}
