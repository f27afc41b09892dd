use serde::{Deserialize, Serialize};
use voxmesh_core::IceServerConfig;
use voxmesh_core::utils::DEFAULT_STUN_ADDR;

/// ICE configuration handed to every new link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl TransportConfig {
    /// Adds a server unless one with the same urls is already configured.
    pub fn add_ice_server(&mut self, server: IceServerConfig) -> bool {
        if self.ice_servers.iter().any(|s| s.urls == server.urls) {
            return false;
        }
        self.ice_servers.push(server);
        true
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
        }
    }
}
