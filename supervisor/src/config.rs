//! Fleet configuration model
//!
//! `FleetSettings` holds the deployment-wide values every channel derives its
//! endpoints from. `ChannelSpec` is the persisted per-channel record. The two
//! are stored together as a `FleetConfig` document.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use shared::{ChannelId, ChannelMode};

use crate::error::{SupervisorError, SupervisorResult};

pub const INGRESS_URL_PLACEHOLDER: &str = "{ingress_url}";
pub const EGRESS_URL_PLACEHOLDER: &str = "{egress_url}";
pub const CHANNEL_NAME_PLACEHOLDER: &str = "{channel_name}";
pub const SERVICE_ID_PLACEHOLDER: &str = "{service_id}";

/// Durations that drive supervision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorTimings {
    /// Period of the fleet health sweep
    #[serde(with = "duration_secs")]
    pub sweep_interval: Duration,
    /// Pause between crash detection and the restart attempt
    #[serde(with = "duration_secs")]
    pub crash_restart_delay: Duration,
    /// Inactivity after which an active stream falls back to listening
    #[serde(with = "duration_secs")]
    pub stall_timeout: Duration,
    /// Time a worker gets to exit after the graceful stop signal
    #[serde(with = "duration_secs")]
    pub termination_grace: Duration,
    /// Upper bound on one observer delivery during a broadcast round
    #[serde(with = "duration_secs")]
    pub broadcast_timeout: Duration,
    /// Delay between `start_all` and the first sweep
    #[serde(with = "duration_secs")]
    pub initial_settle: Duration,
}

impl Default for SupervisorTimings {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(5),
            crash_restart_delay: Duration::from_secs(5),
            stall_timeout: Duration::from_secs(15),
            termination_grace: Duration::from_secs(5),
            broadcast_timeout: Duration::from_secs(5),
            initial_settle: Duration::from_secs(1),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_enabled() -> bool {
    true
}

/// Deployment-wide values shared by every channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSettings {
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    pub ingress_base_port: u16,
    #[serde(default)]
    pub ingress_options: String,
    pub multicast_base_address: Ipv4Addr,
    pub multicast_base_port: u16,
    pub multicast_interface: String,
    #[serde(default)]
    pub multicast_options: String,
    pub service_id_base: u32,
    pub command_template: Vec<String>,
    #[serde(default)]
    pub timings: SupervisorTimings,
}

impl FleetSettings {
    /// Port a listener-mode channel binds
    pub fn listener_port(&self, spec: &ChannelSpec) -> SupervisorResult<u16> {
        if let Some(port) = spec.local_port {
            return Ok(port);
        }
        u16::try_from(u64::from(self.ingress_base_port) + u64::from(spec.id.get()))
            .map_err(|_| SupervisorError::config(format!("ingress port for channel {} exceeds 65535", spec.id)))
    }

    /// Ingress URL, annotated with the mode flag
    pub fn ingress_url(&self, spec: &ChannelSpec) -> SupervisorResult<String> {
        let mut url = match spec.mode {
            ChannelMode::Listener => {
                format!("srt://0.0.0.0:{}?mode={}", self.listener_port(spec)?, spec.mode)
            }
            ChannelMode::Caller => {
                let (address, port) = spec.remote_target()?;
                format!("srt://{}:{}?mode={}", address, port, spec.mode)
            }
        };
        if !self.ingress_options.is_empty() {
            url.push('&');
            url.push_str(self.ingress_options.trim_start_matches(['?', '&']));
        }
        Ok(url)
    }

    /// Multicast group and port for a channel
    pub fn multicast_target(&self, id: ChannelId) -> SupervisorResult<(Ipv4Addr, u16)> {
        let mut octets = self.multicast_base_address.octets();
        let last = u64::from(octets[3]) + u64::from(id.offset());
        octets[3] = u8::try_from(last).map_err(|_| {
            SupervisorError::config(format!(
                "multicast address for channel {id} overflows the last octet of {}",
                self.multicast_base_address
            ))
        })?;

        let port = u64::from(self.multicast_base_port) + u64::from(id.offset()) * 2;
        let port = u16::try_from(port)
            .map_err(|_| SupervisorError::config(format!("multicast port for channel {id} exceeds 65535")))?;

        Ok((Ipv4Addr::from(octets), port))
    }

    pub fn egress_url(&self, id: ChannelId) -> SupervisorResult<String> {
        let (address, port) = self.multicast_target(id)?;
        let mut url = format!("udp://{}:{}?localaddr={}", address, port, self.multicast_interface);
        if !self.multicast_options.is_empty() {
            url.push('&');
            url.push_str(self.multicast_options.trim_start_matches(['?', '&']));
        }
        Ok(url)
    }

    pub fn service_id(&self, id: ChannelId) -> SupervisorResult<u32> {
        self.service_id_base
            .checked_add(id.get())
            .ok_or_else(|| SupervisorError::config(format!("service id for channel {id} exceeds {}", u32::MAX)))
    }

    /// Substitute a channel's derived values into the command template
    pub fn build_command(&self, spec: &ChannelSpec) -> SupervisorResult<Vec<String>> {
        if self.command_template.is_empty() {
            return Err(SupervisorError::config("command_template is empty"));
        }

        let ingress_url = self.ingress_url(spec)?;
        let egress_url = self.egress_url(spec.id)?;
        let service_id = self.service_id(spec.id)?.to_string();

        Ok(self
            .command_template
            .iter()
            .map(|arg| {
                arg.replace(INGRESS_URL_PLACEHOLDER, &ingress_url)
                    .replace(EGRESS_URL_PLACEHOLDER, &egress_url)
                    .replace(CHANNEL_NAME_PLACEHOLDER, &spec.name)
                    .replace(SERVICE_ID_PLACEHOLDER, &service_id)
            })
            .collect())
    }

    /// Location of a channel's captured output
    pub fn log_path(&self, spec: &ChannelSpec) -> PathBuf {
        let name: String = spec
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.log_directory.join(format!("channel_{}_{}.log", spec.id, name))
    }
}

/// Persisted record of one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub id: ChannelId,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub mode: ChannelMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_port: Option<u16>,
}

impl ChannelSpec {
    pub fn listener(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            mode: ChannelMode::Listener,
            remote_address: None,
            remote_port: None,
            local_port: None,
        }
    }

    pub fn caller(id: ChannelId, name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            mode: ChannelMode::Caller,
            remote_address: Some(address.into()),
            remote_port: Some(port),
            local_port: None,
        }
    }

    /// Remote endpoint of a caller-mode channel
    pub fn remote_target(&self) -> SupervisorResult<(&str, u16)> {
        let address = self
            .remote_address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .ok_or_else(|| SupervisorError::config(format!("channel {} in caller mode needs remote_address", self.id)))?;
        let port = self
            .remote_port
            .filter(|port| *port != 0)
            .ok_or_else(|| SupervisorError::config(format!("channel {} in caller mode needs remote_port", self.id)))?;
        Ok((address, port))
    }

    /// Check the mode-dependent fields against the fleet settings
    pub fn validate(&self, settings: &FleetSettings) -> SupervisorResult<()> {
        if self.name.trim().is_empty() {
            return Err(SupervisorError::config(format!("channel {} needs a name", self.id)));
        }
        // A record is only valid if a worker command can be derived from it
        settings.build_command(self).map(|_| ())
    }
}

/// Request to create a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChannel {
    #[serde(default)]
    pub id: Option<ChannelId>,
    pub name: String,
    #[serde(default)]
    pub mode: ChannelMode,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub local_port: Option<u16>,
    #[serde(default)]
    pub remote_address: Option<String>,
    #[serde(default)]
    pub remote_port: Option<u16>,
}

impl NewChannel {
    pub fn into_spec(self, id: ChannelId) -> ChannelSpec {
        let caller = self.mode == ChannelMode::Caller;
        ChannelSpec {
            id,
            name: self.name,
            enabled: self.enabled,
            mode: self.mode,
            remote_address: if caller { self.remote_address } else { None },
            remote_port: if caller { self.remote_port } else { None },
            local_port: self.local_port,
        }
    }
}

/// Request to change an existing channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelUpdate {
    #[serde(default)]
    pub name: Option<String>,
    pub mode: ChannelMode,
    #[serde(default)]
    pub remote_address: Option<String>,
    #[serde(default)]
    pub remote_port: Option<u16>,
}

impl ChannelUpdate {
    /// Produce the updated record; remote fields only survive in caller mode
    pub fn apply(&self, current: &ChannelSpec) -> ChannelSpec {
        let caller = self.mode == ChannelMode::Caller;
        ChannelSpec {
            id: current.id,
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            enabled: current.enabled,
            mode: self.mode,
            remote_address: if caller { self.remote_address.clone() } else { None },
            remote_port: if caller { self.remote_port } else { None },
            local_port: current.local_port,
        }
    }
}

/// The persisted document: fleet settings plus the channel list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(flatten)]
    pub settings: FleetSettings,
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,
}

impl FleetConfig {
    /// Reject duplicate ids and invalid channel records
    pub fn validate(&self) -> SupervisorResult<()> {
        let mut seen = std::collections::BTreeSet::new();
        for spec in &self.channels {
            if !seen.insert(spec.id) {
                return Err(SupervisorError::config(format!("duplicate channel id {}", spec.id)));
            }
            spec.validate(&self.settings)?;
        }
        Ok(())
    }

    /// Next free id: one past the highest in use
    pub fn next_channel_id(&self) -> SupervisorResult<ChannelId> {
        match self.channels.iter().map(|spec| spec.id).max() {
            Some(highest) => Ok(highest.next()?),
            None => Ok(ChannelId::FIRST),
        }
    }
}
