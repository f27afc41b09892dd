mod context;
mod data_channel;
mod membership_impl;
mod mesh;
mod mesh_command;
mod mesh_handle;
mod negotiation;
mod negotiation_impl;
mod peer;
mod transport_event_impl;

pub use context::*;
pub use data_channel::*;
pub use mesh::*;
pub use mesh_command::*;
pub use mesh_handle::*;
pub use negotiation::*;
pub(crate) use peer::*;
