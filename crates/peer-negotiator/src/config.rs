use std::env;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::media::MediaStream;

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_MAX_PENDING_CANDIDATES: usize = 256;

pub const ICE_SERVERS_ENV: &str = "NEGOTIATOR_ICE_SERVERS";
pub const LOCALHOST_ONLY_ENV: &str = "NEGOTIATOR_LOCALHOST_ONLY";
pub const RELAY_ONLY_ENV: &str = "NEGOTIATOR_RELAY_ONLY";

/// Which side of the pair this negotiator plays. Only the initiator ever
/// creates offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    pub fn is_initiator(self) -> bool {
        matches!(self, Role::Initiator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credential: String,
}

impl IceServer {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            ..Default::default()
        }
    }

    pub fn with_credentials(
        urls: Vec<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            urls,
            username: username.into(),
            credential: credential.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceTransportPolicy {
    #[default]
    All,
    Relay,
}

/// Configuration handed verbatim to the binding that builds the peer
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub ice_servers: Vec<IceServer>,
    #[serde(default)]
    pub ice_transport_policy: IceTransportPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServer::new(vec![DEFAULT_STUN_SERVER.to_string()])],
            ice_transport_policy: IceTransportPolicy::All,
        }
    }
}

impl ConnectionConfig {
    /// No STUN/TURN servers; host candidates only.
    pub fn localhost() -> Self {
        Self {
            ice_servers: vec![],
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = if lookup(LOCALHOST_ONLY_ENV).is_some() {
            Self::localhost()
        } else {
            Self::default()
        };

        if let Some(raw) = lookup(ICE_SERVERS_ENV) {
            let servers: Vec<IceServer> = raw
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(|url| IceServer::new(vec![url.to_string()]))
                .collect();
            if !servers.is_empty() {
                config.ice_servers = servers;
            }
        }

        if lookup(RELAY_ONLY_ENV).is_some_and(|value| is_truthy(&value)) {
            config.ice_transport_policy = IceTransportPolicy::Relay;
        }

        config
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Options for the data channel opened by the initiator (or by both sides
/// when `negotiated` is set).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub ordered: Option<bool>,
    #[serde(default)]
    pub max_packet_life_time: Option<u16>,
    #[serde(default)]
    pub max_retransmits: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub negotiated: bool,
    #[serde(default)]
    pub id: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferOptions {
    #[serde(default)]
    pub ice_restart: bool,
    #[serde(default = "default_voice_activity_detection")]
    pub voice_activity_detection: bool,
}

impl Default for OfferOptions {
    fn default() -> Self {
        Self {
            ice_restart: false,
            voice_activity_detection: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOptions {
    #[serde(default = "default_voice_activity_detection")]
    pub voice_activity_detection: bool,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            voice_activity_detection: true,
        }
    }
}

fn default_voice_activity_detection() -> bool {
    true
}

/// Everything a [`Negotiator`](crate::Negotiator) needs at construction.
#[derive(Debug, Clone)]
pub struct NegotiatorOptions {
    pub role: Role,
    /// Local streams whose tracks are added once the negotiator starts.
    pub streams: Vec<Arc<MediaStream>>,
    pub connection_config: ConnectionConfig,
    pub channel_config: ChannelConfig,
    pub offer_options: OfferOptions,
    pub answer_options: AnswerOptions,
    /// Label for the data channel; a random UUID is used when absent.
    pub channel_name: Option<String>,
    pub max_pending_candidates: usize,
}

impl NegotiatorOptions {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            streams: Vec::new(),
            connection_config: ConnectionConfig::default(),
            channel_config: ChannelConfig::default(),
            offer_options: OfferOptions::default(),
            answer_options: AnswerOptions::default(),
            channel_name: None,
            max_pending_candidates: DEFAULT_MAX_PENDING_CANDIDATES,
        }
    }

    pub fn initiator() -> Self {
        Self::new(Role::Initiator)
    }

    pub fn responder() -> Self {
        Self::new(Role::Responder)
    }

    pub fn builder() -> NegotiatorOptionsBuilder {
        NegotiatorOptionsBuilder::new()
    }

    /// Single-stream shorthand; appended to `streams`.
    pub fn stream(mut self, stream: Arc<MediaStream>) -> Self {
        self.streams.push(stream);
        self
    }

    pub fn channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = Some(name.into());
        self
    }

    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }
}

pub struct NegotiatorOptionsBuilder {
    role: Option<Role>,
    streams: Vec<Arc<MediaStream>>,
    ice_servers: Vec<IceServer>,
    ice_transport_policy: Option<IceTransportPolicy>,
    channel_config: Option<ChannelConfig>,
    offer_options: Option<OfferOptions>,
    answer_options: Option<AnswerOptions>,
    channel_name: Option<String>,
    max_pending_candidates: Option<usize>,
}

impl NegotiatorOptionsBuilder {
    pub fn new() -> Self {
        Self {
            role: None,
            streams: Vec::new(),
            ice_servers: Vec::new(),
            ice_transport_policy: None,
            channel_config: None,
            offer_options: None,
            answer_options: None,
            channel_name: None,
            max_pending_candidates: None,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn stream(mut self, stream: Arc<MediaStream>) -> Self {
        self.streams.push(stream);
        self
    }

    pub fn streams(mut self, streams: impl IntoIterator<Item = Arc<MediaStream>>) -> Self {
        self.streams.extend(streams);
        self
    }

    pub fn add_ice_server(mut self, urls: Vec<String>) -> Self {
        self.ice_servers.push(IceServer::new(urls));
        self
    }

    pub fn add_ice_server_with_credentials(
        mut self,
        urls: Vec<String>,
        username: String,
        credential: String,
    ) -> Self {
        self.ice_servers
            .push(IceServer::with_credentials(urls, username, credential));
        self
    }

    pub fn ice_transport_policy(mut self, policy: IceTransportPolicy) -> Self {
        self.ice_transport_policy = Some(policy);
        self
    }

    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = Some(config);
        self
    }

    pub fn offer_options(mut self, options: OfferOptions) -> Self {
        self.offer_options = Some(options);
        self
    }

    pub fn answer_options(mut self, options: AnswerOptions) -> Self {
        self.answer_options = Some(options);
        self
    }

    pub fn channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = Some(name.into());
        self
    }

    pub fn max_pending_candidates(mut self, limit: usize) -> Self {
        self.max_pending_candidates = Some(limit);
        self
    }

    pub fn build(self) -> Result<NegotiatorOptions, String> {
        let role = self.role.ok_or("negotiator role is required")?;
        let mut options = NegotiatorOptions::new(role);
        options.streams = self.streams;

        if !self.ice_servers.is_empty() {
            options.connection_config.ice_servers = self.ice_servers;
        }
        if let Some(policy) = self.ice_transport_policy {
            options.connection_config.ice_transport_policy = policy;
        }
        if let Some(config) = self.channel_config {
            options.channel_config = config;
        }
        if let Some(offer) = self.offer_options {
            options.offer_options = offer;
        }
        if let Some(answer) = self.answer_options {
            options.answer_options = answer;
        }
        if let Some(name) = self.channel_name {
            if name.is_empty() {
                return Err("channel name must not be empty".to_string());
            }
            options.channel_name = Some(name);
        }
        if let Some(limit) = self.max_pending_candidates {
            if limit == 0 {
                return Err("max_pending_candidates must be at least 1".to_string());
            }
            options.max_pending_candidates = limit;
        }

        Ok(options)
    }
}

impl Default for NegotiatorOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
