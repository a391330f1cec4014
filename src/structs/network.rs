/// Container network definition
///
/// Backs the generated `.network` unit and the per container `Network=`
/// attachment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Network {
    /// Network name, also the stem of the generated unit file
    #[serde(default = "network_name_default")]
    pub name: String,
    /// Subnet CIDR handed to the network backend
    #[serde(default = "network_subnet_default")]
    pub subnet: String,
    /// Gateway address inside the subnet
    #[serde(default = "network_gateway_default")]
    pub gateway: String,
}
fn network_name_default() -> String {
    "llm".into()
}
fn network_subnet_default() -> String {
    "10.89.0.0/24".into()
}
fn network_gateway_default() -> String {
    "10.89.0.1".into()
}

impl Default for Network {
    fn default() -> Network {
        Network {
            name: network_name_default(),
            subnet: network_subnet_default(),
            gateway: network_gateway_default(),
        }
    }
}
