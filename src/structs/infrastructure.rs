use serde_json::Value;

use super::{HealthCheck, VolumeSpec};

/// Infrastructure record of a service
///
/// Everything the container unit needs: image, naming, networking,
/// dependencies and enablement.
///
/// ```yaml
/// infrastructure:
///   image: docker.io/searxng/searxng:latest
///   container_name: searxng
///   port: 8080
///   requires: [redis]
///   enabled_by:
///   - "openwebui.configuration.web_search == true"
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Infrastructure {
    /// Short description used in the unit file and documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Image to run
    #[serde(default)]
    pub image: String,

    /// Container name, unique across the topology
    #[serde(default)]
    pub container_name: String,

    /// Port the service listens on inside the network
    #[serde(default)]
    pub port: u32,

    /// Hostname inside the network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Host port to publish, unique across the topology when set
    #[serde(default)]
    pub published_port: Option<u32>,

    /// Address to bind the published port to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Names of services that must be started first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    /// Unconditional enablement flag
    #[serde(default)]
    pub enabled: bool,

    /// Enablement conditions; any true condition enables the service
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_by: Vec<String>,

    /// Subdomain for external ingress (opaque to the engine)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_subdomain: Option<String>,

    /// Websocket options (opaque to the engine)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket: Option<Value>,

    /// Volumes mounted into the container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeSpec>,

    /// Health check rendered into the container unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthCheck>,
}

impl Infrastructure {
    /// Whether enablement depends on configuration values
    pub fn is_conditional(&self) -> bool {
        !self.enabled_by.is_empty()
    }
}
