//! Server and lobby configuration.

use std::time::Duration;

use broadside_match::MatchConfig;
use broadside_protocol::FrameCodec;
use broadside_transport::DEFAULT_SEND_TIMEOUT;

/// How the lobby treats connections that are not yet in a match.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// How long a new connection has to say who it is.
    pub classify_timeout: Duration,

    /// Whether spectators are offered a seat when a match ends.
    pub recruit_spectators: bool,

    /// How long a spectator has to answer the offer.
    pub recruit_timeout: Duration,

    /// Whether both players are asked for another game when a match ends.
    pub rematch: bool,

    /// How long a player has to answer each rematch prompt.
    pub rematch_timeout: Duration,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            classify_timeout: Duration::from_secs(60),
            recruit_spectators: true,
            recruit_timeout: Duration::from_secs(15),
            rematch: true,
            rematch_timeout: Duration::from_secs(30),
        }
    }
}

/// Everything a [`BroadsideServer`](crate::BroadsideServer) is built from.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub codec: FrameCodec,
    /// Deadline for a single outbound frame on any connection.
    pub send_timeout: Duration,
    pub lobby: LobbyConfig,
    pub match_config: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5005".to_string(),
            codec: FrameCodec::default(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            lobby: LobbyConfig::default(),
            match_config: MatchConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_config_default() {
        let config = LobbyConfig::default();
        assert_eq!(config.classify_timeout, Duration::from_secs(60));
        assert!(config.recruit_spectators);
        assert_eq!(config.recruit_timeout, Duration::from_secs(15));
        assert!(config.rematch);
        assert_eq!(config.rematch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:5005");
        assert_eq!(config.send_timeout, Duration::from_secs(2));
        assert_eq!(config.match_config.turn_timeout, Duration::from_secs(10));
    }
}
