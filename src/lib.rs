//! Painter's-algorithm software renderer.
//!
//! Geometry is pushed into renderers obtained from a
//! [`Context`](core::renderer::Context). Between `start` and `finish` each
//! `render` call projects its geometry into screen-space primitives;
//! `finish` sorts them back to front and draws them onto a
//! [`Canvas`](core::canvas::Canvas).

pub mod core;
pub mod geometry;
pub mod io;
pub mod material_system;
pub mod utils;
