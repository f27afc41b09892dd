pub use voxmesh_core::model::{AudioState, PeerId};

pub mod model {
    pub use voxmesh_core::model::*;
}

#[cfg(feature = "engine")]
pub mod engine {
    pub use voxmesh_engine::*;
}
