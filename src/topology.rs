use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::condition::Condition;
use super::structs::{FieldDef, Infrastructure, Network, Release};
use super::{ErrorKind, Result, ResultExt};

/// Configuration schema of a service
///
/// A constrained object schema: the required field names plus the per field
/// definitions.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Configuration {
    /// Schema type, always "object"
    #[serde(rename = "type", default = "object_default")]
    pub schema_type: String,
    /// Names of fields that must be set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Field definitions
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, FieldDef>,
}
fn object_default() -> String {
    "object".into()
}

impl Configuration {
    pub fn is_required(&self, field: &str) -> bool {
        self.required.iter().any(|r| r == field)
    }
}

/// A service: infrastructure record plus configuration schema
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Service {
    pub infrastructure: Infrastructure,
    #[serde(default)]
    pub configuration: Configuration,
}

impl Service {
    /// Current value of a configuration field
    ///
    /// The document is the as-configured state, so the value of a field is its
    /// default. A field that exists without a default reads as null.
    pub fn field_value(&self, field: &str) -> Option<Value> {
        self.configuration
            .properties
            .get(field)
            .map(|f| f.default.clone().unwrap_or(Value::Null))
    }
}

/// Network and services region of the document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TopologySpec {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

/// The topology document
///
/// Created once by the loader and never mutated; every downstream engine is a
/// pure function over it, so it is safe to share across threads once built.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Topology {
    /// Version of the document schema
    #[serde(default)]
    pub schema_version: String,

    /// Release metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<Release>,

    /// Network and service definitions
    #[serde(default)]
    pub topology: TopologySpec,

    /// Opaque nested secret references (lookup target only, never material)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub secrets: Value,
}

impl Topology {
    /// Read and parse a topology document from a file
    ///
    /// Structural schema validation is an external concern; this projects the
    /// document into the typed model and normalises absent fields to their
    /// documented defaults.
    pub fn read(path: &Path) -> Result<Topology> {
        if !path.exists() {
            bail!(ErrorKind::InputNotFound(path.display().to_string()));
        }
        let mut f = File::open(path)?;
        let mut data = String::new();
        f.read_to_string(&mut data)?;
        Topology::parse(&data).chain_err(|| format!("failed to parse {}", path.display()))
    }

    /// Parse a topology from document text (yaml, and therefore also json)
    pub fn parse(data: &str) -> Result<Topology> {
        let tp: Topology = serde_yaml::from_str(data)?;
        if let Some(ref rel) = tp.release {
            rel.verify()?;
        }
        Ok(tp)
    }

    pub fn services(&self) -> &BTreeMap<String, Service> {
        &self.topology.services
    }

    pub fn network(&self) -> &Network {
        &self.topology.network
    }

    /// Compute the set of enabled services
    ///
    /// A service is enabled when its `enabled` flag is set, or when any of its
    /// `enabled_by` conditions evaluates to true (logical OR). Malformed
    /// conditions evaluate to false; the validator reports them properly.
    pub fn enabled_services(&self) -> BTreeSet<String> {
        let mut enabled = BTreeSet::new();
        for (name, svc) in &self.topology.services {
            if svc.infrastructure.enabled {
                enabled.insert(name.clone());
                continue;
            }
            for expr in &svc.infrastructure.enabled_by {
                match Condition::parse(expr) {
                    Ok(cond) => {
                        if cond.evaluate(&self.topology.services) {
                            enabled.insert(name.clone());
                            break;
                        }
                    }
                    Err(e) => warn!("ignoring condition on {}: {}", name, e),
                }
            }
        }
        enabled
    }

    /// Whether a dotted path (minus the leading `secrets` segment) resolves
    /// inside the secrets region
    pub fn secret_exists(&self, segments: &[&str]) -> bool {
        let mut obj = &self.secrets;
        for seg in segments {
            match obj.get(seg) {
                Some(v) => obj = v,
                None => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::Topology;

    const MINIMAL: &str = r#"
schema_version: "2.0.0"
topology:
  services:
    db:
      infrastructure:
        image: docker.io/library/postgres:16
        container_name: db
        port: 5432
        enabled: true
    ui:
      infrastructure:
        image: nginx
        container_name: ui
        port: 8080
        requires: [db]
        enabled: true
"#;

    #[test]
    fn loader_normalises_defaults() {
        let tp = Topology::parse(MINIMAL).unwrap();
        let db = &tp.services()["db"];
        assert!(db.infrastructure.requires.is_empty());
        assert!(db.infrastructure.enabled_by.is_empty());
        assert_eq!(db.infrastructure.published_port, None);
        assert_eq!(tp.network().name, "llm");
        assert_eq!(tp.network().subnet, "10.89.0.0/24");
        assert_eq!(tp.network().gateway, "10.89.0.1");
    }

    #[test]
    fn enabled_set_includes_unconditional_services() {
        let tp = Topology::parse(MINIMAL).unwrap();
        let enabled = tp.enabled_services();
        assert!(enabled.contains("db"));
        assert!(enabled.contains("ui"));
        assert_eq!(enabled.len(), 2);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(Topology::parse("topology: [not, a, mapping]").is_err());
    }
}
