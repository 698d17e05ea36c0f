pub mod canvas;
pub mod frame_buffer;
pub mod line_processor;
pub mod particle_processor;
pub mod primitive;
pub mod projection;
pub mod renderer;
pub mod software_context;
pub mod triangle_processor;
