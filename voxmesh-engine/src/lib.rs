mod config;
mod error;
mod mesh;
mod signaling;
mod transport;

pub use config::*;
pub use error::*;
pub use mesh::*;
pub use signaling::*;
pub use transport::*;
