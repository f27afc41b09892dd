mod mesh_view;

pub use mesh_view::*;
