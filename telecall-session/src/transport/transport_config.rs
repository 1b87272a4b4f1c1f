use telecall_core::IceServerConfig;

/// ICE servers (STUN/TURN) handed to every peer connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Use the servers the signaling relay advertises instead of
    /// `ice_servers` when it advertises any.
    pub prefer_advertised: bool,
}

impl TransportConfig {
    /// Host candidates only. Enough for two peers on the same network.
    pub fn local_only() -> Self {
        Self {
            ice_servers: Vec::new(),
            prefer_advertised: false,
        }
    }

    /// The servers a peer connection should use given what the relay
    /// advertised.
    pub fn resolve(&self, advertised: Option<Vec<IceServerConfig>>) -> Vec<IceServerConfig> {
        match advertised {
            Some(servers) if self.prefer_advertised => servers,
            _ => self.ice_servers.clone(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: IceServerConfig::default_servers(),
            prefer_advertised: true,
        }
    }
}
