use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use super::topology::Service;
use super::{ErrorKind, Result};

/// A parsed enablement expression
///
/// The grammar is deliberately tiny:
///
/// ```text
/// <service> "." "configuration" "." <field> ("==" | "!=") <literal>
/// ```
///
/// where the literal is `true`, `false`, a single quoted string or a bare
/// integer. This is a tagged pair of path and literal, not a general
/// expression language.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Field value must equal the literal
    Equals { service: String, field: String, literal: Value },
    /// Field value must differ from the literal
    NotEquals { service: String, field: String, literal: Value },
}

impl Condition {
    /// Parse an expression string
    ///
    /// Whitespace around the operator is insignificant.
    pub fn parse(expr: &str) -> Result<Condition> {
        let re = Regex::new(r"^(\w+)\.configuration\.(\w+)\s*(==|!=)\s*(.+)$").unwrap();
        let caps = match re.captures(expr.trim()) {
            Some(c) => c,
            None => bail!(ErrorKind::InvalidExpression(expr.into())),
        };
        let service = caps[1].to_string();
        let field = caps[2].to_string();
        let literal = match parse_literal(caps[4].trim()) {
            Some(l) => l,
            None => bail!(ErrorKind::InvalidExpression(expr.into())),
        };
        Ok(match &caps[3] {
            "==" => Condition::Equals { service, field, literal },
            _ => Condition::NotEquals { service, field, literal },
        })
    }

    /// The referenced (service, field) pair
    pub fn target(&self) -> (&str, &str) {
        match self {
            Condition::Equals { service, field, .. } | Condition::NotEquals { service, field, .. } => {
                (service, field)
            }
        }
    }

    /// Evaluate against the current field defaults
    ///
    /// Equality is structural and type exact: `"1" != 1` and `true != "true"`.
    /// Missing services or fields evaluate to false rather than erroring;
    /// dangling references are the validator's concern.
    pub fn evaluate(&self, services: &BTreeMap<String, Service>) -> bool {
        let (svc, field) = self.target();
        let actual = match services.get(svc).and_then(|s| s.field_value(field)) {
            Some(v) => v,
            None => return false,
        };
        match self {
            Condition::Equals { literal, .. } => actual == *literal,
            Condition::NotEquals { literal, .. } => actual != *literal,
        }
    }
}

fn parse_literal(raw: &str) -> Option<Value> {
    if raw == "true" {
        return Some(Value::Bool(true));
    }
    if raw == "false" {
        return Some(Value::Bool(false));
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Some(Value::String(raw[1..raw.len() - 1].to_string()));
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::super::topology::Service;
    use super::Condition;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn service_with_field(field: &str, default: Value) -> BTreeMap<String, Service> {
        let mut props = serde_json::Map::new();
        props.insert(field.to_string(), json!({ "type": "string", "default": default }));
        let svc: Service = serde_json::from_value(json!({
            "infrastructure": {
                "image": "nginx",
                "container_name": "web",
                "port": 80
            },
            "configuration": {
                "type": "object",
                "properties": Value::Object(props)
            }
        }))
        .unwrap();
        let mut services = BTreeMap::new();
        services.insert("web".to_string(), svc);
        services
    }

    #[test]
    fn parses_operators_and_literals() {
        let c = Condition::parse("web.configuration.search == true").unwrap();
        assert_eq!(c.target(), ("web", "search"));
        match c {
            Condition::Equals { literal, .. } => assert_eq!(literal, Value::Bool(true)),
            _ => panic!("expected equals"),
        }

        let c = Condition::parse("web.configuration.engine != 'brave'").unwrap();
        match c {
            Condition::NotEquals { literal, .. } => assert_eq!(literal, json!("brave")),
            _ => panic!("expected not equals"),
        }

        // whitespace around the operator is insignificant
        assert_eq!(
            Condition::parse("web.configuration.port==8080").unwrap(),
            Condition::parse("web.configuration.port  ==  8080").unwrap()
        );
        match Condition::parse("web.configuration.port == -1").unwrap() {
            Condition::Equals { literal, .. } => assert_eq!(literal, json!(-1)),
            _ => panic!("expected equals"),
        }
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(Condition::parse("just nonsense").is_err());
        assert!(Condition::parse("web.infrastructure.port == 80").is_err());
        assert!(Condition::parse("web.configuration.engine >= 2").is_err());
        assert!(Condition::parse("web.configuration.engine == bare_word").is_err());
        assert!(Condition::parse("web.configuration.engine == 'unterminated").is_err());
    }

    #[test]
    fn evaluates_against_field_defaults() {
        let services = service_with_field("search", json!(true));
        let on = Condition::parse("web.configuration.search == true").unwrap();
        assert!(on.evaluate(&services));
        let off = Condition::parse("web.configuration.search == false").unwrap();
        assert!(!off.evaluate(&services));
        let not_off = Condition::parse("web.configuration.search != false").unwrap();
        assert!(not_off.evaluate(&services));
    }

    #[test]
    fn equality_is_type_exact() {
        let services = service_with_field("port", json!(8080));
        let as_string = Condition::parse("web.configuration.port == '8080'").unwrap();
        assert!(!as_string.evaluate(&services));
        let as_int = Condition::parse("web.configuration.port == 8080").unwrap();
        assert!(as_int.evaluate(&services));

        let services = service_with_field("flag", json!("true"));
        let as_bool = Condition::parse("web.configuration.flag == true").unwrap();
        assert!(!as_bool.evaluate(&services));
    }

    #[test]
    fn missing_references_evaluate_to_false() {
        let services = service_with_field("search", json!(true));
        let no_svc = Condition::parse("ghost.configuration.search == true").unwrap();
        assert!(!no_svc.evaluate(&services));
        let no_field = Condition::parse("web.configuration.ghost == true").unwrap();
        assert!(!no_field.evaluate(&services));
        // a missing field stays false even for != (field lookup fails first)
        let no_field_ne = Condition::parse("web.configuration.ghost != true").unwrap();
        assert!(!no_field_ne.evaluate(&services));
    }

    #[test]
    fn absent_default_reads_as_null() {
        let services = service_with_field("key", Value::Null);
        let eq = Condition::parse("web.configuration.key == 'x'").unwrap();
        assert!(!eq.evaluate(&services));
        let ne = Condition::parse("web.configuration.key != 'x'").unwrap();
        assert!(ne.evaluate(&services));
    }
}
