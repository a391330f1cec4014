use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use super::structs::{DefaultHandling, FieldDef, Visibility};
use super::topology::Topology;

/// Lifecycle state of a configuration field
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FieldStateKind {
    /// Running on the preloaded default
    Default,
    /// The operator chose the value
    Configured,
    /// Required but nothing set
    Unset,
    /// Optional and nothing set
    OptionalUnset,
}

/// Per field entry of a snapshot
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldState {
    pub state: FieldStateKind,
    /// Current value; a literal null is legitimate
    pub value: Value,
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: String,
    pub sensitive: bool,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,
}

impl FieldState {
    fn derive(field: &FieldDef, required: bool) -> FieldState {
        let state = match field.default_handling {
            DefaultHandling::UserConfigured => FieldStateKind::Configured,
            DefaultHandling::Unset if required => FieldStateKind::Unset,
            DefaultHandling::Unset => FieldStateKind::OptionalUnset,
            DefaultHandling::Preloaded => FieldStateKind::Default,
        };
        FieldState {
            state,
            value: field.default.clone().unwrap_or(Value::Null),
            required,
            field_type: field.type_name().to_string(),
            sensitive: field.sensitive,
            visibility: field.visibility,
            template_path: field.template_path.clone(),
            secret_ref: field.secret_ref.clone(),
        }
    }
}

/// Per service tallies
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StateSummary {
    pub total: usize,
    pub using_defaults: usize,
    pub user_configured: usize,
    pub unset_required: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ServiceState {
    pub fields: BTreeMap<String, FieldState>,
    pub summary: StateSummary,
}

/// A timestamped projection of the topology's per field configuration state
///
/// Snapshots are derived artifacts owned by the caller; nothing is cached on
/// the topology itself.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// UTC, RFC 3339 with trailing Z
    pub timestamp: String,
    pub schema_version: String,
    /// Services with at least one configurable field
    pub services: BTreeMap<String, ServiceState>,
}

impl Snapshot {
    /// Compute the state snapshot for a topology
    pub fn compute(tp: &Topology) -> Snapshot {
        let mut services = BTreeMap::new();
        for (name, svc) in tp.services() {
            let config = &svc.configuration;
            if config.properties.is_empty() {
                continue;
            }
            let mut fields = BTreeMap::new();
            let mut summary = StateSummary {
                total: config.properties.len(),
                ..Default::default()
            };
            for (field_name, field) in &config.properties {
                let fs = FieldState::derive(field, config.is_required(field_name));
                match fs.state {
                    FieldStateKind::Default => summary.using_defaults += 1,
                    FieldStateKind::Configured => summary.user_configured += 1,
                    FieldStateKind::Unset => summary.unset_required += 1,
                    FieldStateKind::OptionalUnset => {}
                }
                fields.insert(field_name.clone(), fs);
            }
            services.insert(name.clone(), ServiceState { fields, summary });
        }
        Snapshot {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            schema_version: tp.schema_version.clone(),
            services,
        }
    }

    /// Compare two snapshots, oldest first
    pub fn diff(old: &Snapshot, new: &Snapshot) -> StateDiff {
        let mut changes = Changes::default();
        for name in new.services.keys() {
            if !old.services.contains_key(name) {
                changes.services_added.push(name.clone());
            }
        }
        for name in old.services.keys() {
            if !new.services.contains_key(name) {
                changes.services_removed.push(name.clone());
            }
        }
        for (name, old_svc) in &old.services {
            if let Some(new_svc) = new.services.get(name) {
                let svc_changes = compare_service(old_svc, new_svc);
                if !svc_changes.is_empty() {
                    changes.services_modified.insert(name.clone(), svc_changes);
                }
            }
        }
        StateDiff {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            old_version: old.schema_version.clone(),
            new_version: new.schema_version.clone(),
            changes,
        }
    }

    /// Human readable markdown report of a snapshot
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        lines.push("# Configuration State Report".to_string());
        lines.push(String::new());
        lines.push(format!("Generated: {}", self.timestamp));
        lines.push(format!("Schema Version: {}", self.schema_version));
        lines.push(String::new());

        let total_fields: usize = self.services.values().map(|s| s.summary.total).sum();
        let total_defaults: usize = self.services.values().map(|s| s.summary.using_defaults).sum();
        let total_configured: usize = self.services.values().map(|s| s.summary.user_configured).sum();
        let total_unset: usize = self.services.values().map(|s| s.summary.unset_required).sum();
        let pct = if total_fields > 0 { total_defaults * 100 / total_fields } else { 0 };

        lines.push("## Overall Summary".to_string());
        lines.push(String::new());
        lines.push(format!("- **Services**: {}", self.services.len()));
        lines.push(format!("- **Total Fields**: {}", total_fields));
        lines.push(format!("- **Using Defaults**: {} ({}%)", total_defaults, pct));
        lines.push(format!("- **User Configured**: {}", total_configured));
        lines.push(format!("- **Unset Required**: {}", total_unset));
        lines.push(String::new());

        lines.push("## Service Details".to_string());
        lines.push(String::new());
        for (name, svc) in &self.services {
            lines.push(format!("### {}", name));
            lines.push(String::new());
            lines.push(format!("- Total Fields: {}", svc.summary.total));
            lines.push(format!("- Using Defaults: {}", svc.summary.using_defaults));
            lines.push(format!("- User Configured: {}", svc.summary.user_configured));
            if svc.summary.unset_required > 0 {
                lines.push(format!("- **Unset Required**: {}", svc.summary.unset_required));
            }

            let unset: Vec<&String> = svc
                .fields
                .iter()
                .filter(|(_, f)| f.state == FieldStateKind::Unset)
                .map(|(n, _)| n)
                .collect();
            if !unset.is_empty() {
                lines.push(String::new());
                lines.push("  **Unset Required Fields**:".to_string());
                for field in unset {
                    lines.push(format!("  - `{}`", field));
                }
            }

            let configured: Vec<(&String, &FieldState)> = svc
                .fields
                .iter()
                .filter(|(_, f)| f.state == FieldStateKind::Configured)
                .collect();
            if !configured.is_empty() {
                lines.push(String::new());
                lines.push("  **User-Configured Fields**:".to_string());
                for (field, fs) in configured {
                    if fs.sensitive {
                        lines.push(format!("  - `{}`: `<sensitive>`", field));
                    } else {
                        lines.push(format!("  - `{}`: `{}`", field, display_value(&fs.value)));
                    }
                }
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }
}

fn compare_service(old: &ServiceState, new: &ServiceState) -> ServiceChanges {
    let mut changes = ServiceChanges::default();
    for name in new.fields.keys() {
        if !old.fields.contains_key(name) {
            changes.fields_added.push(name.clone());
        }
    }
    for name in old.fields.keys() {
        if !new.fields.contains_key(name) {
            changes.fields_removed.push(name.clone());
        }
    }
    for (name, old_field) in &old.fields {
        if let Some(new_field) = new.fields.get(name) {
            let mut change = FieldChange::default();
            if old_field.value != new_field.value {
                change.value = Some(ValueChange {
                    old: old_field.value.clone(),
                    new: new_field.value.clone(),
                });
            }
            if old_field.state != new_field.state {
                change.state = Some(StateChange {
                    old: old_field.state,
                    new: new_field.state,
                });
            }
            if change.value.is_some() || change.state.is_some() {
                changes.fields_changed.insert(name.clone(), change);
            }
        }
    }
    changes
}

/// Old and new value of a changed field
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ValueChange {
    pub old: Value,
    pub new: Value,
}

/// Old and new lifecycle state of a changed field
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct StateChange {
    pub old: FieldStateKind,
    pub new: FieldStateKind,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FieldChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateChange>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ServiceChanges {
    pub fields_added: Vec<String>,
    pub fields_removed: Vec<String>,
    pub fields_changed: BTreeMap<String, FieldChange>,
}

impl ServiceChanges {
    pub fn is_empty(&self) -> bool {
        self.fields_added.is_empty() && self.fields_removed.is_empty() && self.fields_changed.is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Changes {
    /// Sorted lexicographically
    pub services_added: Vec<String>,
    /// Sorted lexicographically
    pub services_removed: Vec<String>,
    pub services_modified: BTreeMap<String, ServiceChanges>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.services_added.is_empty()
            && self.services_removed.is_empty()
            && self.services_modified.is_empty()
    }
}

/// Difference record between two snapshots
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StateDiff {
    pub timestamp: String,
    pub old_version: String,
    pub new_version: String,
    pub changes: Changes,
}

impl StateDiff {
    /// Human readable markdown report of a diff
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        lines.push("# Configuration Change Report".to_string());
        lines.push(String::new());
        lines.push(format!("Generated: {}", self.timestamp));
        lines.push(format!("Old Version: {}", self.old_version));
        lines.push(format!("New Version: {}", self.new_version));
        lines.push(String::new());

        if !self.changes.services_added.is_empty() {
            lines.push("## Services Added".to_string());
            lines.push(String::new());
            for svc in &self.changes.services_added {
                lines.push(format!("- `{}`", svc));
            }
            lines.push(String::new());
        }
        if !self.changes.services_removed.is_empty() {
            lines.push("## Services Removed".to_string());
            lines.push(String::new());
            for svc in &self.changes.services_removed {
                lines.push(format!("- `{}`", svc));
            }
            lines.push(String::new());
        }
        if !self.changes.services_modified.is_empty() {
            lines.push("## Services Modified".to_string());
            lines.push(String::new());
            for (name, svc_changes) in &self.changes.services_modified {
                lines.push(format!("### {}", name));
                lines.push(String::new());
                if !svc_changes.fields_added.is_empty() {
                    lines.push("**Fields Added**:".to_string());
                    for field in &svc_changes.fields_added {
                        lines.push(format!("- `{}`", field));
                    }
                    lines.push(String::new());
                }
                if !svc_changes.fields_removed.is_empty() {
                    lines.push("**Fields Removed**:".to_string());
                    for field in &svc_changes.fields_removed {
                        lines.push(format!("- `{}`", field));
                    }
                    lines.push(String::new());
                }
                if !svc_changes.fields_changed.is_empty() {
                    lines.push("**Fields Changed**:".to_string());
                    for (field, change) in &svc_changes.fields_changed {
                        lines.push(format!("- `{}`:", field));
                        if let Some(ref vc) = change.value {
                            lines.push(format!(
                                "  - Value: `{}` -> `{}`",
                                display_value(&vc.old),
                                display_value(&vc.new)
                            ));
                        }
                        if let Some(ref sc) = change.state {
                            lines.push(format!(
                                "  - State: `{}` -> `{}`",
                                state_name(sc.old),
                                state_name(sc.new)
                            ));
                        }
                    }
                    lines.push(String::new());
                }
            }
        }
        if self.changes.is_empty() {
            lines.push("*No changes detected*".to_string());
        }
        lines.join("\n")
    }
}

fn state_name(state: FieldStateKind) -> &'static str {
    match state {
        FieldStateKind::Default => "default",
        FieldStateKind::Configured => "configured",
        FieldStateKind::Unset => "unset",
        FieldStateKind::OptionalUnset => "optional_unset",
    }
}

/// Render a json value without the quotes strings would otherwise carry
fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::topology::Topology;
    use super::{FieldStateKind, Snapshot};
    use serde_json::json;

    fn fixture() -> Topology {
        Topology::parse(
            r#"
schema_version: "2.0.0"
topology:
  services:
    svc:
      infrastructure:
        image: img
        container_name: svc
        port: 80
        enabled: true
      configuration:
        type: object
        required: [api_key]
        properties:
          api_key:
            type: string
            x-sensitive: true
            x-secret-ref: secrets.keys.api
            x-default-handling: unset
          port:
            type: integer
            default: 80
          theme:
            type: string
            default: dark
            x-default-handling: user-configured
          accent:
            type: string
            x-default-handling: unset
    empty:
      infrastructure:
        image: img
        container_name: empty
        port: 81
secrets:
  keys:
    api: vault:keys/api
"#,
        )
        .unwrap()
    }

    #[test]
    fn field_states_derive_from_default_handling() {
        let snap = Snapshot::compute(&fixture());
        let fields = &snap.services["svc"].fields;
        assert_eq!(fields["api_key"].state, FieldStateKind::Unset);
        assert_eq!(fields["port"].state, FieldStateKind::Default);
        assert_eq!(fields["theme"].state, FieldStateKind::Configured);
        assert_eq!(fields["accent"].state, FieldStateKind::OptionalUnset);
        assert_eq!(fields["port"].value, json!(80));
        assert_eq!(fields["api_key"].value, serde_json::Value::Null);
        assert!(fields["api_key"].required);
        assert_eq!(fields["api_key"].secret_ref.as_deref(), Some("secrets.keys.api"));

        let summary = &snap.services["svc"].summary;
        assert_eq!(summary.total, 4);
        assert_eq!(summary.using_defaults, 1);
        assert_eq!(summary.user_configured, 1);
        assert_eq!(summary.unset_required, 1);
    }

    #[test]
    fn services_without_fields_are_omitted() {
        let snap = Snapshot::compute(&fixture());
        assert!(snap.services.contains_key("svc"));
        assert!(!snap.services.contains_key("empty"));
    }

    #[test]
    fn self_diff_is_empty() {
        let snap = Snapshot::compute(&fixture());
        let diff = Snapshot::diff(&snap, &snap);
        assert!(diff.changes.is_empty());
        assert!(diff.report().contains("*No changes detected*"));
    }

    #[test]
    fn value_changes_carry_old_and_new() {
        let old = Snapshot::compute(&fixture());
        let mut changed = fixture();
        {
            let svc = changed.topology.services.get_mut("svc").unwrap();
            let field = svc.configuration.properties.get_mut("port").unwrap();
            field.default = Some(json!(8080));
        }
        let new = Snapshot::compute(&changed);
        let diff = Snapshot::diff(&old, &new);
        let change = &diff.changes.services_modified["svc"].fields_changed["port"];
        let vc = change.value.as_ref().unwrap();
        assert_eq!(vc.old, json!(80));
        assert_eq!(vc.new, json!(8080));
        assert!(change.state.is_none());
    }

    #[test]
    fn added_and_removed_invert() {
        let full = Snapshot::compute(&fixture());
        let mut reduced_tp = fixture();
        {
            let svc = reduced_tp.topology.services.get_mut("svc").unwrap();
            svc.configuration.properties.remove("accent");
            svc.configuration.properties.remove("theme");
        }
        let reduced = Snapshot::compute(&reduced_tp);

        // superset on the left: only removals, no changes
        let shrink = Snapshot::diff(&full, &reduced);
        let changes = &shrink.changes.services_modified["svc"];
        assert_eq!(changes.fields_removed, vec!["accent", "theme"]);
        assert!(changes.fields_added.is_empty());
        assert!(changes.fields_changed.is_empty());

        // and the reverse direction inverts added/removed
        let grow = Snapshot::diff(&reduced, &full);
        let changes = &grow.changes.services_modified["svc"];
        assert_eq!(changes.fields_added, vec!["accent", "theme"]);
        assert!(changes.fields_removed.is_empty());
        assert!(changes.fields_changed.is_empty());
    }
}
