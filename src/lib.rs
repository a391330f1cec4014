#![recursion_limit = "1024"]

#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate serde_yaml;

extern crate chrono;
extern crate petgraph;
extern crate regex;
extern crate semver;

#[macro_use]
extern crate log;

#[macro_use]
extern crate error_chain;
error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }
    links {}
    foreign_links {
        Fmt(::std::fmt::Error);
        Io(::std::io::Error) #[cfg(unix)];
        Int(::std::num::ParseIntError);
        SerdeY(serde_yaml::Error);
        SerdeJ(serde_json::Error);
        Semver(semver::SemVerError);
    }
    errors {
        InputNotFound(path: String) {
            description("input file not found")
            display("input file not found: {}", &path)
        }
        SchemaViolation(path: String, msg: String) {
            description("document violates the topology schema")
            display("schema violation at {}: {}", &path, &msg)
        }
        CircularDependency(cycle: String) {
            description("dependency cycle detected")
            display("circular dependency detected: {}", &cycle)
        }
        InvalidExpression(expr: String) {
            description("malformed enablement expression")
            display("invalid expression format '{}'", &expr)
        }
        InvalidTopology(errors: usize) {
            description("topology does not validate")
            display("topology has {} validation errors", errors)
        }
    }
}

/// Typed topology document, loader and enablement
pub mod topology;
pub use crate::topology::Topology;

/// Structs for the topology document
pub mod structs;

/// Enablement expression micro language
pub mod condition;
pub use crate::condition::Condition;

/// Deterministic dependency ordering
pub mod resolver;

/// Field, service and topology level validation
pub mod validate;
pub use crate::validate::{Diagnostic, Severity, Validation};

/// Configuration state snapshots and diffs
pub mod state;
pub use crate::state::{Snapshot, StateDiff};

/// Quadlet unit data and rendering
pub mod quadlet;

/// A graph generator for topologies using `petgraph`
pub mod graph;

/// Markdown reference documentation
pub mod docs;
