//! Version dispatch across every capability

mod common;

use common::*;
use eyre::Result;
use kibana_provisioner::kibana::{SavedObjectClient, WireFormat, role, search, space};

#[tokio::test]
async fn test_wire_format_per_version() -> Result<()> {
    let server = MockServer::start().await;
    let cases = [
        ("5.5.3", WireFormat::Legacy),
        ("6.0.0", WireFormat::Modern),
        ("7.3.1", WireFormat::Modern),
        ("8.15.0", WireFormat::Modern),
        ("not-a-version", WireFormat::Modern),
    ];

    for (version, expected) in cases {
        let client = vanilla_client(&server, version);
        assert_eq!(client.search().wire_format(), expected, "search {}", version);
        assert_eq!(
            client.visualization().wire_format(),
            expected,
            "visualization {}",
            version
        );
        assert_eq!(client.dashboard().wire_format(), expected, "dashboard {}", version);
        assert_eq!(
            client.index_pattern().wire_format(),
            expected,
            "index pattern {}",
            version
        );
        assert_eq!(
            client.saved_objects().wire_format(),
            expected,
            "saved objects {}",
            version
        );
    }
    Ok(())
}

#[test]
fn test_unknown_versions_resolve_to_latest() {
    for version in ["", "5.6.0", "6.8.2", "9.0.0"] {
        assert_eq!(search::CLIENTS.resolved_version(version), "7.3.1");
        assert_eq!(role::CLIENTS.resolved_version(version), "7.3.1");
        assert_eq!(space::CLIENTS.resolved_version(version), "7.3.1");
    }
    assert_eq!(role::CLIENTS.resolved_version("6.0.0"), "6.0.0");
    assert_eq!(
        search::CLIENTS.known_versions().collect::<Vec<_>>(),
        vec!["5.5.3", "6.0.0", "7.3.1"]
    );
}
