pub mod color;
pub mod color_transformation;
pub mod light;
