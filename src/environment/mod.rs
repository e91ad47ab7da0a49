pub mod context;
pub mod frame_tree;
pub mod probe;
