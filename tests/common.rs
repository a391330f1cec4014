extern crate quadcat;

use quadcat::Topology;

/// Shared fixture topology for integration tests
///
/// A small but fully featured deployment: three core services, one
/// conditionally enabled search backend and one disabled extra.
pub fn fixture() -> Topology {
    Topology::parse(include_str!("fixtures/topology.yml")).expect("fixture topology parses")
}

#[test]
fn fixture_parses_and_validates() {
    let tp = fixture();
    let res = quadcat::validate::validate(&tp);
    res.print_results();
    assert!(res.is_valid());
    assert!(res.warnings().is_empty());
}
