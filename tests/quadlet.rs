extern crate quadcat;
mod common;

use common::fixture;

use quadcat::quadlet::{generate, plan, render_container, render_network};
use quadcat::Topology;
use std::collections::BTreeSet;
use std::fs;

#[test]
fn enabled_set_follows_flags_and_conditions() {
    let tp = fixture();
    let enabled: BTreeSet<String> = tp.enabled_services();
    let expected: BTreeSet<String> = ["litellm", "openwebui", "postgres", "searxng"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(enabled, expected);
}

#[test]
fn flipping_a_condition_disables_the_service() {
    let mut tp = fixture();
    {
        let ui = tp.topology.services.get_mut("openwebui").unwrap();
        let field = ui.configuration.properties.get_mut("web_search").unwrap();
        field.default = Some(serde_json::Value::Bool(false));
    }
    let enabled = tp.enabled_services();
    assert!(!enabled.contains("searxng"));
    assert_eq!(enabled.len(), 3);
}

#[test]
fn plan_is_in_startup_order() {
    let p = plan(&fixture()).unwrap();
    let order: Vec<&str> = p.units.iter().map(|u| u.service.as_str()).collect();
    assert_eq!(order, vec!["postgres", "litellm", "openwebui", "searxng"]);
    assert_eq!(p.volumes, vec!["openwebui-data", "postgres-data"]);
}

#[test]
fn environment_assignments_project_defaults() {
    let p = plan(&fixture()).unwrap();
    let ui = p.units.iter().find(|u| u.service == "openwebui").unwrap();
    assert_eq!(ui.env["ENABLE_RAG_WEB_SEARCH"], "true");
    assert_eq!(ui.env["RAG_WEB_SEARCH_ENGINE"], "searxng");
    assert_eq!(ui.env["SEARXNG_QUERY_URL"], "http://searxng:8080");
    // fields without a default are not surfaced
    assert!(!ui.env.contains_key("WEBUI_SECRET_KEY"));
    assert!(!ui.env.contains_key("BRAVE_SEARCH_API_KEY"));

    assert_eq!(ui.publish, Some(("127.0.0.1".to_string(), 3000, 8080)));
    assert_eq!(ui.wants, vec!["litellm.service", "postgres.service"]);
}

#[test]
fn rendered_units_are_byte_stable() {
    let first = plan(&fixture()).unwrap();
    let second = plan(&fixture()).unwrap();
    assert_eq!(first, second);
    for (a, b) in first.units.iter().zip(second.units.iter()) {
        assert_eq!(render_container(a), render_container(b));
    }
    assert_eq!(render_network(&first.network), render_network(&second.network));
}

#[test]
fn network_unit_contains_subnet_and_label() {
    let p = plan(&fixture()).unwrap();
    let text = render_network(&p.network);
    assert!(text.starts_with("[Network]\n"));
    assert!(text.contains("Subnet=10.89.0.0/24"));
    assert!(text.contains("Gateway=10.89.0.1"));
    assert!(text.contains("Label=app=scroll"));
    assert!(text.ends_with("WantedBy=scroll-session.target"));
}

#[test]
fn container_unit_sections_are_ordered() {
    let p = plan(&fixture()).unwrap();
    let ui = p.units.iter().find(|u| u.service == "openwebui").unwrap();
    let text = render_container(ui);
    let unit_pos = text.find("[Unit]").unwrap();
    let container_pos = text.find("[Container]").unwrap();
    let service_pos = text.find("[Service]").unwrap();
    let install_pos = text.find("[Install]").unwrap();
    assert!(unit_pos < container_pos && container_pos < service_pos && service_pos < install_pos);

    assert!(text.contains("Wants=litellm.service postgres.service"));
    assert!(text.contains("Requires=llm.network.service"));
    assert!(text.contains("Network=llm.network"));
    assert!(text.contains("PublishPort=127.0.0.1:3000:8080"));
    assert!(text.contains("Volume=openwebui-data:/app/backend/data:Z"));
    assert!(text.contains("HealthCmd=curl -f http://localhost:8080/health"));
}

#[test]
fn generate_writes_units_to_disk() {
    let outdir = std::env::temp_dir().join(format!("quadcat-test-{}", std::process::id()));
    generate(&fixture(), &outdir).unwrap();

    let mut entries: Vec<String> = fs::read_dir(&outdir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    entries.sort();
    assert_eq!(
        entries,
        vec![
            "litellm.container",
            "llm.network",
            "openwebui-data.volume",
            "openwebui.container",
            "postgres-data.volume",
            "postgres.container",
            "searxng.container",
        ]
    );

    let network = fs::read_to_string(outdir.join("llm.network")).unwrap();
    assert!(network.contains("Subnet=10.89.0.0/24"));
    let volume = fs::read_to_string(outdir.join("postgres-data.volume")).unwrap();
    assert_eq!(volume, "[Volume]\nLabel=app=scroll\n");

    fs::remove_dir_all(&outdir).unwrap();
}

#[test]
fn generation_fails_on_cycles() {
    let tp = Topology::parse(
        r#"
topology:
  services:
    a:
      infrastructure: {image: img, container_name: a, port: 1, requires: [b], enabled: true}
    b:
      infrastructure: {image: img, container_name: b, port: 2, requires: [a], enabled: true}
"#,
    )
    .unwrap();
    let err = plan(&tp).unwrap_err();
    assert!(format!("{}", err).contains("circular dependency"));
}
