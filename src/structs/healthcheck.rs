/// Container health check
///
/// Rendered as the `Health*` keys of the container unit. Interval style
/// durations are passed through to the container runtime untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HealthCheck {
    /// Command run inside the container
    pub cmd: String,
    /// How often to run the command
    #[serde(default = "health_interval_default")]
    pub interval: String,
    /// How long a single run may take
    #[serde(default = "health_timeout_default")]
    pub timeout: String,
    /// Consecutive failures before the container counts as unhealthy
    #[serde(default = "health_retries_default")]
    pub retries: u32,
    /// Grace period after boot
    #[serde(default = "health_start_period_default")]
    pub start_period: String,
}
fn health_interval_default() -> String {
    "30s".into()
}
fn health_timeout_default() -> String {
    "5s".into()
}
fn health_retries_default() -> u32 {
    3
}
fn health_start_period_default() -> String {
    "10s".into()
}
