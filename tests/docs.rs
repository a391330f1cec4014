extern crate quadcat;
mod common;

use common::fixture;

use quadcat::docs::{
    configuration_reference, dependency_graph, provider_guide, provider_table, service_catalog,
};

#[test]
fn catalog_groups_by_category() {
    let page = service_catalog(&fixture());
    assert!(page.contains("## Core Services"));
    assert!(page.contains("## Conditional Services"));
    assert!(page.contains("## Support Services"));

    // searxng is conditional, watchtower is support
    let conditional_pos = page.find("## Conditional Services").unwrap();
    let support_pos = page.find("## Support Services").unwrap();
    let searxng_pos = page.find("### searxng").unwrap();
    let watchtower_pos = page.find("### watchtower").unwrap();
    assert!(conditional_pos < searxng_pos && searxng_pos < support_pos);
    assert!(support_pos < watchtower_pos);

    assert!(page.contains("- **Published Port**: 3000 -> 8080"));
    assert!(page.contains("- **Internal Port**: 5432 (not published)"));
    assert!(page.contains("- **External Access**: `chat.*.ts.net`"));
}

#[test]
fn reference_orders_fields_and_masks_secrets() {
    let page = configuration_reference(&fixture());
    assert!(page.contains("## openwebui"));
    assert!(page.contains("### Features"));
    // display order within the Features category
    let search_pos = page.find("#### `web_search`").unwrap();
    let engine_pos = page.find("#### `search_engine`").unwrap();
    let url_pos = page.find("#### `searxng_url`").unwrap();
    assert!(search_pos < engine_pos && engine_pos < url_pos);

    // sensitive defaults are masked
    assert!(page.contains("- **Default**: `<sensitive>`"));
    assert!(!page.contains("sk-fixture"));

    assert!(page.contains("- **Allowed Values**: `searxng`, `brave`"));
    assert!(page.contains("- **Visibility**: advanced"));
    assert!(page.contains("- **Shown When**: search_engine=brave"));
    assert!(page.contains("- **Environment Variable**: `RAG_WEB_SEARCH_ENGINE`"));
    assert!(page.contains("- **Rationale**: SearXNG runs locally and needs no API key"));
}

#[test]
fn dependency_page_styles_nodes() {
    let page = dependency_graph(&fixture());
    assert!(page.contains("```mermaid"));
    assert!(page.contains("    searxng[\"SearXNG metasearch\"]:::conditional"));
    assert!(page.contains("    watchtower[\"Unattended image updates\"]:::support"));
    assert!(page.contains("    openwebui --> litellm"));
    assert!(page.contains("    openwebui --> postgres"));
    assert!(page.contains("- **openwebui**: Requires `litellm`, `postgres`"));
}

#[test]
fn provider_rows_pair_options_with_requirements() {
    let tp = fixture();
    let field = &tp.services()["openwebui"].configuration.properties["search_engine"];
    let rows = provider_table(field);
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].option, "searxng");
    assert_eq!(rows[0].enabled_service.as_deref(), Some("searxng"));
    assert_eq!(rows[0].required_fields, vec!["searxng_url"]);

    assert_eq!(rows[1].option, "brave");
    assert_eq!(rows[1].enabled_service, None);
    assert_eq!(rows[1].required_fields, vec!["brave_api_key"]);
}

#[test]
fn provider_guide_lists_options() {
    let page = provider_guide(&fixture());
    assert!(page.contains("## openwebui.search_engine"));
    assert!(page.contains("#### `searxng`"));
    assert!(page.contains("- **Enables Service**: `searxng`"));
    assert!(page.contains("- **Enables Service**: None (uses existing service)"));
    assert!(page.contains("- **Required Fields**: `searxng_url`"));
}
