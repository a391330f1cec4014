use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde_json::Value;

use super::resolver;
use super::structs::{HealthCheck, Network, VolumeKind, VolumeSpec};
use super::topology::{Service, Topology};
use super::Result;

/// Everything the container unit needs for one service
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ContainerUnit {
    /// Service name, also the unit file stem
    pub service: String,
    pub description: String,
    pub image: String,
    pub container_name: String,
    /// Network name; attachments are rendered as `<network>.network`
    pub network: String,
    pub hostname: Option<String>,
    /// `(bind, published, port)` when the service publishes a port
    pub publish: Option<(String, u32, u32)>,
    pub volumes: Vec<VolumeSpec>,
    /// Environment assignments keyed by variable name
    pub env: BTreeMap<String, String>,
    /// `<dependency>.service` entries for the `Wants=` line
    pub wants: Vec<String>,
    pub healthcheck: Option<HealthCheck>,
}

/// Network unit payload
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct NetworkData {
    pub name: String,
    pub subnet: String,
    pub gateway: String,
    pub labels: BTreeMap<String, String>,
}

/// Full render plan: network, ordered container units, named volumes
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DeploymentPlan {
    pub network: NetworkData,
    /// Enabled services in startup order
    pub units: Vec<ContainerUnit>,
    /// Named volumes needing a `.volume` unit, deduplicated and sorted
    pub volumes: Vec<String>,
}

/// Build the render plan for all enabled services in startup order
pub fn plan(tp: &Topology) -> Result<DeploymentPlan> {
    let enabled = tp.enabled_services();
    let order = resolver::dependency_order(tp, &enabled)?;

    let network = network_data(tp.network());
    let mut units = Vec::with_capacity(order.len());
    let mut volumes = BTreeSet::new();
    for name in &order {
        let svc = &tp.services()[name];
        units.push(container_unit(name, svc, &network.name));
        for vol in &svc.infrastructure.volumes {
            if vol.kind == VolumeKind::Volume {
                volumes.insert(vol.name.clone());
            }
        }
    }
    Ok(DeploymentPlan {
        network,
        units,
        volumes: volumes.into_iter().collect(),
    })
}

fn network_data(net: &Network) -> NetworkData {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), "scroll".to_string());
    NetworkData {
        name: net.name.clone(),
        subnet: net.subnet.clone(),
        gateway: net.gateway.clone(),
        labels,
    }
}

fn container_unit(name: &str, svc: &Service, network: &str) -> ContainerUnit {
    let infra = &svc.infrastructure;
    let publish = infra.published_port.map(|published| {
        let bind = infra.bind.clone().unwrap_or_else(|| "0.0.0.0".into());
        (bind, published, infra.port)
    });

    let mut env = BTreeMap::new();
    for field in svc.configuration.properties.values() {
        if let Some(ref var) = field.env_var {
            if let Some(ref default) = field.default {
                env.insert(var.clone(), env_value(default));
            }
        }
    }

    ContainerUnit {
        service: name.to_string(),
        description: infra.description.clone().unwrap_or_else(|| name.to_string()),
        image: infra.image.clone(),
        container_name: infra.container_name.clone(),
        network: network.to_string(),
        hostname: infra.hostname.clone(),
        publish,
        volumes: infra.volumes.clone(),
        env,
        wants: infra.requires.iter().map(|r| format!("{}.service", r)).collect(),
        healthcheck: infra.healthcheck.clone(),
    }
}

/// Project a json value into an `Environment=` assignment
///
/// Booleans become lowercase `true`/`false`; strings lose their quotes.
fn env_value(v: &Value) -> String {
    match v {
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render the `.container` unit text
///
/// Section and key order is fixed, so the output for a given topology is byte
/// stable across runs.
pub fn render_container(unit: &ContainerUnit) -> String {
    let mut lines = Vec::new();
    lines.push("[Unit]".to_string());
    lines.push(format!("Description={}", unit.description));
    lines.push("After=network-online.target".to_string());
    lines.push(format!("After={}.network.service", unit.network));
    lines.push(format!("Requires={}.network.service", unit.network));
    if !unit.wants.is_empty() {
        lines.push(format!("Wants={}", unit.wants.join(" ")));
    }
    lines.push(String::new());

    lines.push("[Container]".to_string());
    lines.push(format!("Image={}", unit.image));
    lines.push("AutoUpdate=registry".to_string());
    lines.push(format!("ContainerName={}", unit.container_name));
    if let Some(ref hostname) = unit.hostname {
        lines.push(format!("HostName={}", hostname));
    }
    lines.push(format!("Network={}.network", unit.network));
    if let Some((ref bind, published, port)) = unit.publish {
        lines.push(format!("PublishPort={}:{}:{}", bind, published, port));
    }
    for vol in &unit.volumes {
        lines.push(format!("Volume={}", vol.mount_arg()));
    }
    for (var, value) in &unit.env {
        lines.push(format!("Environment={}={}", var, value));
    }
    if let Some(ref hc) = unit.healthcheck {
        lines.push(format!("HealthCmd={}", hc.cmd));
        lines.push(format!("HealthInterval={}", hc.interval));
        lines.push(format!("HealthTimeout={}", hc.timeout));
        lines.push(format!("HealthRetries={}", hc.retries));
        lines.push(format!("HealthStartPeriod={}", hc.start_period));
    }
    lines.push(String::new());

    lines.push("[Service]".to_string());
    lines.push(format!("Slice={}.slice", unit.network));
    lines.push("TimeoutStartSec=900".to_string());
    lines.push("Restart=on-failure".to_string());
    lines.push("RestartSec=10".to_string());
    lines.push(String::new());

    lines.push("[Install]".to_string());
    lines.push("WantedBy=scroll-session.target".to_string());
    lines.push("PartOf=scroll-session.target".to_string());
    lines.join("\n")
}

/// Render the `.network` unit text
pub fn render_network(net: &NetworkData) -> String {
    let mut lines = Vec::new();
    lines.push("[Network]".to_string());
    lines.push(format!("Subnet={}", net.subnet));
    lines.push(format!("Gateway={}", net.gateway));
    for (key, value) in &net.labels {
        lines.push(format!("Label={}={}", key, value));
    }
    lines.push(String::new());
    lines.push("[Install]".to_string());
    lines.push("WantedBy=scroll-session.target".to_string());
    lines.join("\n")
}

/// Render a `.volume` unit text
pub fn render_volume() -> String {
    ["[Volume]", "Label=app=scroll"].join("\n")
}

/// Generate all unit files for the enabled services into a directory
pub fn generate(tp: &Topology, output_dir: &Path) -> Result<()> {
    let p = plan(tp)?;
    fs::create_dir_all(output_dir)?;

    let order: Vec<&str> = p.units.iter().map(|u| u.service.as_str()).collect();
    info!("enabled services: {}", order.join(", "));
    info!("startup order: {}", order.join(" -> "));

    write_unit(
        &output_dir.join(format!("{}.network", p.network.name)),
        &render_network(&p.network),
    )?;
    for unit in &p.units {
        write_unit(
            &output_dir.join(format!("{}.container", unit.service)),
            &render_container(unit),
        )?;
    }
    for name in &p.volumes {
        write_unit(&output_dir.join(format!("{}.volume", name)), &render_volume())?;
    }
    info!("generated {} service unit(s) + network", p.units.len());
    Ok(())
}

fn write_unit(path: &Path, content: &str) -> Result<()> {
    debug!("writing {}", path.display());
    let mut f = File::create(path)?;
    writeln!(f, "{}", content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::topology::Topology;
    use super::{plan, render_container, render_network};

    fn fixture() -> Topology {
        Topology::parse(
            r#"
topology:
  network:
    name: llm
    subnet: 10.89.0.0/24
    gateway: 10.89.0.1
  services:
    ui:
      infrastructure:
        description: Web frontend
        image: nginx
        container_name: ui
        port: 8080
        published_port: 3000
        bind: 127.0.0.1
        hostname: ui
        requires: [db]
        enabled: true
        volumes:
          - name: ui-data
            mount_path: /data
          - name: ui-config
            mount_path: /etc/ui
            type: bind
        healthcheck:
          cmd: curl -f http://localhost:8080/health
      configuration:
        type: object
        properties:
          web_search:
            type: boolean
            default: true
            x-env-var: ENABLE_WEB_SEARCH
          theme:
            type: string
            default: dark
            x-env-var: THEME
          unset_key:
            type: string
            x-env-var: NEVER_EMITTED
    db:
      infrastructure:
        image: postgres
        container_name: db
        port: 5432
        enabled: true
"#,
        )
        .unwrap()
    }

    #[test]
    fn plan_orders_and_projects() {
        let p = plan(&fixture()).unwrap();
        let order: Vec<&str> = p.units.iter().map(|u| u.service.as_str()).collect();
        assert_eq!(order, vec!["db", "ui"]);

        let ui = &p.units[1];
        assert_eq!(ui.publish, Some(("127.0.0.1".to_string(), 3000, 8080)));
        assert_eq!(ui.env["ENABLE_WEB_SEARCH"], "true");
        assert_eq!(ui.env["THEME"], "dark");
        assert!(!ui.env.contains_key("NEVER_EMITTED"));
        assert_eq!(ui.wants, vec!["db.service"]);
        assert_eq!(p.volumes, vec!["ui-data"]);
    }

    #[test]
    fn container_unit_renders_byte_stable() {
        let p = plan(&fixture()).unwrap();
        let ui = &p.units[1];
        let expected = "\
[Unit]
Description=Web frontend
After=network-online.target
After=llm.network.service
Requires=llm.network.service
Wants=db.service

[Container]
Image=nginx
AutoUpdate=registry
ContainerName=ui
HostName=ui
Network=llm.network
PublishPort=127.0.0.1:3000:8080
Volume=ui-data:/data:Z
Volume=%h/.config/containers/ui-config:/etc/ui:Z
Environment=ENABLE_WEB_SEARCH=true
Environment=THEME=dark
HealthCmd=curl -f http://localhost:8080/health
HealthInterval=30s
HealthTimeout=5s
HealthRetries=3
HealthStartPeriod=10s

[Service]
Slice=llm.slice
TimeoutStartSec=900
Restart=on-failure
RestartSec=10

[Install]
WantedBy=scroll-session.target
PartOf=scroll-session.target";
        assert_eq!(render_container(ui), expected);
        // byte stable across runs
        let again = plan(&fixture()).unwrap();
        assert_eq!(render_container(&again.units[1]), expected);
    }

    #[test]
    fn network_unit_renders() {
        let p = plan(&fixture()).unwrap();
        let expected = "\
[Network]
Subnet=10.89.0.0/24
Gateway=10.89.0.1
Label=app=scroll

[Install]
WantedBy=scroll-session.target";
        assert_eq!(render_network(&p.network), expected);
    }
}
