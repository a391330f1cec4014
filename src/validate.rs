use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::condition::Condition;
use super::structs::Visibility;
use super::topology::{Service, Topology};

/// Diagnostic severity
///
/// Warnings are never promoted to errors.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Stable identifier for a class of diagnostic
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum DiagnosticKind {
    /// Dangling service name, unknown field or unknown secret path
    Reference,
    /// Duplicate published port or container name
    Uniqueness,
    /// Dependency cycle
    Cycle,
    /// Malformed enablement expression
    Expression,
    /// Provider metadata refers to a non-existent field or service
    ProviderConsistency,
    /// Structural shape the schema engine should have rejected
    SchemaViolation,
    /// Enabled service without a healthcheck
    HealthcheckMissing,
    /// Exposed field without an environment variable
    EnvVarMissing,
    /// Sensitive field without a secret reference
    SecretRefMissing,
    /// Cross service reference that cannot be statically confirmed
    UntypedReference,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::HealthcheckMissing
            | DiagnosticKind::EnvVarMissing
            | DiagnosticKind::SecretRefMissing
            | DiagnosticKind::UntypedReference => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A single validation finding
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Contextual path, `service` or `service.field` (or `topology` for
    /// findings that span services)
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\u{2022} {}: {}", self.path, self.message)
    }
}

/// Accumulated result of a validation run
///
/// Diagnostics come out in a fixed order (field pass, service pass, topology
/// pass; lexicographic within each) so repeated runs are byte identical.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Validation {
    pub diagnostics: Vec<Diagnostic>,
}

impl Validation {
    fn push(&mut self, kind: DiagnosticKind, path: &str, message: String) {
        self.diagnostics.push(Diagnostic {
            kind,
            severity: kind.severity(),
            path: path.into(),
            message,
        });
    }

    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error).collect()
    }

    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning).collect()
    }

    /// Valid iff no errors were produced
    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Print findings the way the CLI reports them
    pub fn print_results(&self) {
        let errors = self.errors();
        let warnings = self.warnings();
        if !errors.is_empty() {
            println!("topology validation FAILED\n");
            println!("Errors:");
            for e in &errors {
                println!("  {}", e);
            }
        }
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in &warnings {
                println!("  {}", w);
            }
        }
        if errors.is_empty() {
            if warnings.is_empty() {
                println!("topology validation passed");
            } else {
                println!("\ntopology validation passed with {} warnings", warnings.len());
            }
        }
    }
}

/// Validate a topology at field, service and topology level
///
/// Every finding is accumulated; nothing short-circuits on the first error.
pub fn validate(topology: &Topology) -> Validation {
    let mut v = Validation::default();
    field_pass(topology, &mut v);
    service_pass(topology, &mut v);
    topology_pass(topology, &mut v);
    v
}

// ---------------------------------------------------------------------------
// field level

fn field_pass(tp: &Topology, v: &mut Validation) {
    for (svc_name, svc) in tp.services() {
        for (field_name, field) in &svc.configuration.properties {
            let path = format!("{}.{}", svc_name, field_name);
            if field.sensitive && field.secret_ref.is_none() {
                v.push(
                    DiagnosticKind::SecretRefMissing,
                    &path,
                    "sensitive field lacks a secret reference".into(),
                );
            }
            let exposed = field.visibility == Visibility::Exposed || field.visibility == Visibility::Advanced;
            if exposed && field.env_var.is_none() {
                v.push(
                    DiagnosticKind::EnvVarMissing,
                    &path,
                    "exposed field lacks an environment variable".into(),
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// service level

fn service_pass(tp: &Topology, v: &mut Validation) {
    for (name, svc) in tp.services() {
        let infra = &svc.infrastructure;
        if infra.image == "" {
            v.push(DiagnosticKind::SchemaViolation, name, "service has an empty image".into());
        }
        if infra.container_name == "" {
            v.push(
                DiagnosticKind::SchemaViolation,
                name,
                "service has an empty container name".into(),
            );
        }
        if infra.port < 1 || infra.port > 65535 {
            v.push(
                DiagnosticKind::SchemaViolation,
                name,
                format!("port {} is outside 1-65535", infra.port),
            );
        }
        if let Some(published) = infra.published_port {
            if published < 1 || published > 65535 {
                v.push(
                    DiagnosticKind::SchemaViolation,
                    name,
                    format!("published port {} is outside 1-65535", published),
                );
            }
        }
        for dep in &infra.requires {
            if !tp.services().contains_key(dep) {
                v.push(
                    DiagnosticKind::Reference,
                    name,
                    format!("requires non-existent service '{}'", dep),
                );
            }
        }
        if (infra.enabled || infra.is_conditional()) && infra.healthcheck.is_none() {
            v.push(
                DiagnosticKind::HealthcheckMissing,
                name,
                "enabled service lacks a healthcheck".into(),
            );
        }
    }

    // uniqueness is global: one finding per conflict, naming every service
    let mut port_map: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    let mut name_map: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, svc) in tp.services() {
        if let Some(published) = svc.infrastructure.published_port {
            port_map.entry(published).or_insert_with(Vec::new).push(name);
        }
        if svc.infrastructure.container_name != "" {
            name_map
                .entry(svc.infrastructure.container_name.as_str())
                .or_insert_with(Vec::new)
                .push(name);
        }
    }
    for (port, services) in &port_map {
        if services.len() > 1 {
            v.push(
                DiagnosticKind::Uniqueness,
                "topology",
                format!("port {} is published by multiple services: {}", port, services.join(", ")),
            );
        }
    }
    for (container, services) in &name_map {
        if services.len() > 1 {
            v.push(
                DiagnosticKind::Uniqueness,
                "topology",
                format!(
                    "container name '{}' is used by multiple services: {}",
                    container,
                    services.join(", ")
                ),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// topology level

fn topology_pass(tp: &Topology, v: &mut Validation) {
    check_cycles(tp, v);
    check_expressions(tp, v);
    check_field_references(tp, v);
    check_secret_references(tp, v);
    check_provider_consistency(tp, v);
    check_enablement_references(tp, v);
}

/// DFS with a recursion stack; a back edge is a cycle and the full traversal
/// path goes into the finding
fn check_cycles(tp: &Topology, v: &mut Validation) {
    fn dfs<'a>(
        tp: &'a Topology,
        node: &'a str,
        visited: &mut BTreeSet<&'a str>,
        rec: &mut BTreeSet<&'a str>,
        path: &mut Vec<&'a str>,
        v: &mut Validation,
    ) -> bool {
        visited.insert(node);
        rec.insert(node);
        path.push(node);
        if let Some(svc) = tp.services().get(node) {
            for dep in &svc.infrastructure.requires {
                let dep = dep.as_str();
                if !tp.services().contains_key(dep) {
                    continue; // dangling requires are a service pass finding
                }
                if !visited.contains(dep) {
                    if dfs(tp, dep, visited, rec, path, v) {
                        return true;
                    }
                } else if rec.contains(dep) {
                    let mut cycle: Vec<&str> = path.clone();
                    cycle.push(dep);
                    v.push(
                        DiagnosticKind::Cycle,
                        "topology",
                        format!("circular dependency detected: {}", cycle.join(" -> ")),
                    );
                    return true;
                }
            }
        }
        rec.remove(node);
        path.pop();
        false
    }

    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut rec: BTreeSet<&str> = BTreeSet::new();
    for name in tp.services().keys() {
        if !visited.contains(name.as_str()) {
            let mut path = Vec::new();
            dfs(tp, name, &mut visited, &mut rec, &mut path, v);
        }
    }
}

fn check_expressions(tp: &Topology, v: &mut Validation) {
    for (name, svc) in tp.services() {
        for expr in &svc.infrastructure.enabled_by {
            let cond = match Condition::parse(expr) {
                Ok(c) => c,
                Err(_) => {
                    v.push(
                        DiagnosticKind::Expression,
                        name,
                        format!("invalid expression format '{}'", expr),
                    );
                    continue;
                }
            };
            let (ref_service, ref_field) = cond.target();
            match tp.services().get(ref_service) {
                None => v.push(
                    DiagnosticKind::Reference,
                    name,
                    format!("expression references non-existent service '{}'", ref_service),
                ),
                Some(target) => {
                    if !target.configuration.properties.contains_key(ref_field) {
                        v.push(
                            DiagnosticKind::Reference,
                            name,
                            format!(
                                "expression references non-existent field '{}.{}'",
                                ref_service, ref_field
                            ),
                        );
                    }
                }
            }
        }
    }
}

fn check_field_references(tp: &Topology, v: &mut Validation) {
    for (name, svc) in tp.services() {
        for (field_name, field) in &svc.configuration.properties {
            let reference = match field.requires_field {
                Some(ref r) => r,
                None => continue,
            };
            let path = format!("{}.{}", name, field_name);
            let segments: Vec<&str> = reference.split('.').collect();
            if segments.len() < 2 {
                v.push(
                    DiagnosticKind::Reference,
                    &path,
                    format!("invalid reference format '{}'", reference),
                );
                continue;
            }
            let target = match tp.services().get(segments[0]) {
                None => {
                    v.push(
                        DiagnosticKind::Reference,
                        &path,
                        format!("references non-existent service '{}'", segments[0]),
                    );
                    continue;
                }
                Some(t) => t,
            };
            if !reference_resolves(target, &segments[1..]) {
                v.push(
                    DiagnosticKind::UntypedReference,
                    &path,
                    format!("reference '{}' may not exist at runtime", reference),
                );
            }
        }
    }
}

/// Best effort static resolution of a dotted reference inside a service
///
/// `configuration.<field>` resolves through the properties map; anything else
/// navigates the serialised document shape.
fn reference_resolves(svc: &Service, segments: &[&str]) -> bool {
    if segments[0] == "configuration" {
        return match segments.get(1) {
            Some(field) => svc.configuration.properties.contains_key(*field),
            None => true,
        };
    }
    let doc = match serde_json::to_value(svc) {
        Ok(d) => d,
        Err(_) => return false,
    };
    let mut cur = &doc;
    for seg in segments {
        match cur.get(seg) {
            Some(next) => cur = next,
            None => return false,
        }
    }
    !cur.is_null()
}

fn check_secret_references(tp: &Topology, v: &mut Validation) {
    for (name, svc) in tp.services() {
        for (field_name, field) in &svc.configuration.properties {
            let reference = match field.secret_ref {
                Some(ref r) => r,
                None => continue,
            };
            let path = format!("{}.{}", name, field_name);
            let segments: Vec<&str> = reference.split('.').collect();
            if segments[0] != "secrets" {
                v.push(
                    DiagnosticKind::Reference,
                    &path,
                    "secret reference must start with 'secrets.'".into(),
                );
                continue;
            }
            if !tp.secret_exists(&segments[1..]) {
                v.push(
                    DiagnosticKind::Reference,
                    &path,
                    format!("secret '{}' does not exist", reference),
                );
            }
        }
    }
}

fn check_provider_consistency(tp: &Topology, v: &mut Validation) {
    for (name, svc) in tp.services() {
        for (field_name, field) in &svc.configuration.properties {
            let path = format!("{}.{}", name, field_name);
            for (provider, fields) in &field.provider_fields {
                for required in fields {
                    if !svc.configuration.properties.contains_key(required) {
                        v.push(
                            DiagnosticKind::ProviderConsistency,
                            &path,
                            format!(
                                "provider '{}' requires non-existent field '{}'",
                                provider, required
                            ),
                        );
                    }
                }
            }
        }
    }
}

fn check_enablement_references(tp: &Topology, v: &mut Validation) {
    for (name, svc) in tp.services() {
        for (field_name, field) in &svc.configuration.properties {
            let path = format!("{}.{}", name, field_name);
            for enabled in &field.enables_services {
                if !tp.services().contains_key(enabled) {
                    v.push(
                        DiagnosticKind::ProviderConsistency,
                        &path,
                        format!("enables non-existent service '{}'", enabled),
                    );
                }
            }
            for backing in field.affects_services.values() {
                if let Some(ref affected) = backing {
                    if !tp.services().contains_key(affected) {
                        v.push(
                            DiagnosticKind::ProviderConsistency,
                            &path,
                            format!("affects non-existent service '{}'", affected),
                        );
                    }
                }
            }
        }
    }
}
