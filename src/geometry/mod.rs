pub mod camera;
pub mod position_list;
pub mod vec_math;
