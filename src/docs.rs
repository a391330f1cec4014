use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use super::graph::NodeCategory;
use super::structs::{FieldDef, Visibility};
use super::topology::{Service, Topology};
use super::Result;

/// One row of the provider table for a single enum option
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ProviderRow {
    pub option: String,
    /// Service backing the option, if choosing it brings one up
    pub enabled_service: Option<String>,
    /// Fields that must be set once the option is chosen
    pub required_fields: Vec<String>,
}

/// Provider rows for a field carrying provider metadata
pub fn provider_table(field: &FieldDef) -> Vec<ProviderRow> {
    let mut rows = Vec::new();
    if let Some(ref options) = field.enum_values {
        for opt in options {
            let option = display_value(opt);
            rows.push(ProviderRow {
                enabled_service: field.affects_services.get(&option).cloned().unwrap_or(None),
                required_fields: field.provider_fields.get(&option).cloned().unwrap_or_default(),
                option,
            });
        }
    }
    rows
}

/// Generate all documentation pages into a directory
pub fn generate(tp: &Topology, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    write_page(&output_dir.join("SERVICE-CATALOG.md"), &service_catalog(tp))?;
    write_page(
        &output_dir.join("CONFIGURATION-REFERENCE.md"),
        &configuration_reference(tp),
    )?;
    write_page(&output_dir.join("DEPENDENCY-GRAPH.md"), &dependency_graph(tp))?;
    write_page(&output_dir.join("PROVIDER-GUIDE.md"), &provider_guide(tp))?;
    info!("generated documentation in {}", output_dir.display());
    Ok(())
}

fn write_page(path: &Path, content: &str) -> Result<()> {
    debug!("writing {}", path.display());
    let mut f = File::create(path)?;
    writeln!(f, "{}", content)?;
    Ok(())
}

/// Service catalog grouped by node category
pub fn service_catalog(tp: &Topology) -> String {
    let mut lines = vec![
        "# Service Catalog".to_string(),
        String::new(),
        "Complete catalog of all services in the topology.".to_string(),
        String::new(),
    ];

    let groups = [
        (NodeCategory::Core, "## Core Services", None),
        (
            NodeCategory::Conditional,
            "## Conditional Services",
            Some("These services are enabled based on configuration choices."),
        ),
        (NodeCategory::Support, "## Support Services", None),
    ];
    for (category, header, blurb) in &groups {
        let members: Vec<(&String, &Service)> = tp
            .services()
            .iter()
            .filter(|(_, svc)| NodeCategory::classify(svc) == *category)
            .collect();
        if members.is_empty() {
            continue;
        }
        lines.push(header.to_string());
        lines.push(String::new());
        if let Some(text) = blurb {
            lines.push(text.to_string());
            lines.push(String::new());
        }
        for (name, svc) in members {
            lines.extend(service_entry(name, svc));
        }
    }
    lines.join("\n")
}

fn service_entry(name: &str, svc: &Service) -> Vec<String> {
    let infra = &svc.infrastructure;
    let mut lines = Vec::new();
    lines.push(format!("### {}", name));
    lines.push(String::new());
    lines.push(format!(
        "**Description**: {}",
        infra.description.as_deref().unwrap_or("No description")
    ));
    lines.push(String::new());
    lines.push(format!("- **Image**: `{}`", infra.image));
    lines.push(format!("- **Container Name**: `{}`", infra.container_name));
    match infra.published_port {
        Some(published) => lines.push(format!("- **Published Port**: {} -> {}", published, infra.port)),
        None => lines.push(format!("- **Internal Port**: {} (not published)", infra.port)),
    }
    if !infra.requires.is_empty() {
        let deps: Vec<String> = infra.requires.iter().map(|r| format!("`{}`", r)).collect();
        lines.push(format!("- **Dependencies**: {}", deps.join(", ")));
    }
    if infra.enabled {
        lines.push("- **Enabled**: Unconditionally".to_string());
    } else if !infra.enabled_by.is_empty() {
        lines.push("- **Enabled When**:".to_string());
        for condition in &infra.enabled_by {
            lines.push(format!("  - `{}`", condition));
        }
    }
    if let Some(ref subdomain) = infra.external_subdomain {
        lines.push(format!("- **External Access**: `{}.*.ts.net`", subdomain));
    }
    lines.push(String::new());
    lines
}

/// Configuration field reference grouped by category and display order
pub fn configuration_reference(tp: &Topology) -> String {
    let mut lines = vec![
        "# Configuration Reference".to_string(),
        String::new(),
        "Complete reference of all configuration fields organized by service and category.".to_string(),
        String::new(),
    ];

    for (name, svc) in tp.services() {
        let properties = &svc.configuration.properties;
        if properties.is_empty() {
            continue;
        }
        lines.push(format!("## {}", name));
        lines.push(String::new());

        let mut by_category: BTreeMap<&str, Vec<(&String, &FieldDef)>> = BTreeMap::new();
        for (field_name, field) in properties {
            let category = field.category.as_deref().unwrap_or("General");
            by_category.entry(category).or_insert_with(Vec::new).push((field_name, field));
        }
        for fields in by_category.values_mut() {
            fields.sort_by(|a, b| a.1.display_order.cmp(&b.1.display_order).then(a.0.cmp(b.0)));
        }
        for (category, fields) in &by_category {
            lines.push(format!("### {}", category));
            lines.push(String::new());
            for (field_name, field) in fields {
                lines.extend(field_entry(field_name, field));
            }
        }
    }
    lines.join("\n")
}

fn field_entry(name: &str, field: &FieldDef) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("#### `{}`", name));
    lines.push(String::new());
    lines.push(field.description.clone().unwrap_or_else(|| "No description".into()));
    lines.push(String::new());
    lines.push(format!("- **Type**: `{}`", field.type_name()));
    if let Some(ref default) = field.default {
        if field.sensitive {
            lines.push("- **Default**: `<sensitive>`".to_string());
        } else {
            lines.push(format!("- **Default**: `{}`", display_value(default)));
        }
    }
    if let Some(ref options) = field.enum_values {
        let values: Vec<String> = options.iter().map(|v| format!("`{}`", display_value(v))).collect();
        lines.push(format!("- **Allowed Values**: {}", values.join(", ")));
    }
    if field.visibility != Visibility::Exposed {
        let vis = match field.visibility {
            Visibility::Exposed => "exposed",
            Visibility::Advanced => "advanced",
            Visibility::Expert => "expert",
            Visibility::Hidden => "hidden",
        };
        lines.push(format!("- **Visibility**: {}", vis));
    }
    if !field.depends_on.is_empty() {
        let conditions: Vec<String> = field
            .depends_on
            .iter()
            .map(|(k, v)| format!("{}={}", k, display_value(v)))
            .collect();
        lines.push(format!("- **Shown When**: {}", conditions.join(", ")));
    }
    if let Some(ref var) = field.env_var {
        lines.push(format!("- **Environment Variable**: `{}`", var));
    }
    if let Some(ref rationale) = field.rationale {
        lines.push(format!("- **Rationale**: {}", rationale));
    }
    lines.push(String::new());
    lines
}

/// Dependency graph page with a mermaid diagram
pub fn dependency_graph(tp: &Topology) -> String {
    let mut lines = vec![
        "# Service Dependency Graph".to_string(),
        String::new(),
        "Visual representation of service dependencies.".to_string(),
        String::new(),
    ];

    lines.push("```mermaid".to_string());
    lines.push("graph TD".to_string());
    for (name, svc) in tp.services() {
        let description = svc.infrastructure.description.as_deref().unwrap_or(name);
        match NodeCategory::classify(svc) {
            NodeCategory::Core => lines.push(format!("    {}[\"{}\"]", name, description)),
            NodeCategory::Conditional => {
                lines.push(format!("    {}[\"{}\"]:::conditional", name, description))
            }
            NodeCategory::Support => lines.push(format!("    {}[\"{}\"]:::support", name, description)),
        }
    }
    for (name, svc) in tp.services() {
        for dep in &svc.infrastructure.requires {
            lines.push(format!("    {} --> {}", name, dep));
        }
    }
    lines.push(String::new());
    lines.push("    classDef conditional fill:#fff3cd,stroke:#856404".to_string());
    lines.push("    classDef support fill:#d1ecf1,stroke:#0c5460".to_string());
    lines.push("```".to_string());
    lines.push(String::new());

    lines.push("## Legend".to_string());
    lines.push(String::new());
    lines.push("- **Default**: Core services (always enabled)".to_string());
    lines.push("- **Yellow**: Conditional services (enabled based on configuration)".to_string());
    lines.push("- **Blue**: Support services (databases, caches)".to_string());
    lines.push(String::new());

    lines.push("## Dependency Details".to_string());
    lines.push(String::new());
    for (name, svc) in tp.services() {
        if !svc.infrastructure.requires.is_empty() {
            let deps: Vec<String> = svc.infrastructure.requires.iter().map(|d| format!("`{}`", d)).collect();
            lines.push(format!("- **{}**: Requires {}", name, deps.join(", ")));
        }
    }
    lines.join("\n")
}

/// Provider selection guide
pub fn provider_guide(tp: &Topology) -> String {
    let mut lines = vec![
        "# Provider Selection Guide".to_string(),
        String::new(),
        "Guide to provider-based service enablement and configuration.".to_string(),
        String::new(),
    ];

    let mut providers = Vec::new();
    for (name, svc) in tp.services() {
        for (field_name, field) in &svc.configuration.properties {
            if !field.affects_services.is_empty() || !field.enables_services.is_empty() {
                providers.push((name, field_name, field));
            }
        }
    }

    if providers.is_empty() {
        lines.push("No provider-based services found.".to_string());
        return lines.join("\n");
    }

    for (service_name, field_name, field) in providers {
        lines.push(format!("## {}.{}", service_name, field_name));
        lines.push(String::new());
        lines.push(field.description.clone().unwrap_or_else(|| "No description".into()));
        lines.push(String::new());

        let rows = provider_table(field);
        if !rows.is_empty() {
            lines.push("### Available Options".to_string());
            lines.push(String::new());
            for row in rows {
                lines.push(format!("#### `{}`", row.option));
                lines.push(String::new());
                if field.affects_services.contains_key(&row.option) {
                    match row.enabled_service {
                        Some(ref backing) => lines.push(format!("- **Enables Service**: `{}`", backing)),
                        None => lines.push("- **Enables Service**: None (uses existing service)".to_string()),
                    }
                }
                if !row.required_fields.is_empty() {
                    let fields: Vec<String> =
                        row.required_fields.iter().map(|f| format!("`{}`", f)).collect();
                    lines.push(format!("- **Required Fields**: {}", fields.join(", ")));
                }
                lines.push(String::new());
            }
        }
        if !field.enables_services.is_empty() {
            let services: Vec<String> =
                field.enables_services.iter().map(|s| format!("`{}`", s)).collect();
            lines.push(format!("**Enables Services**: {}", services.join(", ")));
            lines.push(String::new());
        }
    }
    lines.join("\n")
}

/// Render a json value without the quotes strings would otherwise carry
fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
