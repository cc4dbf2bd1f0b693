//! Configuration to rendered path tests
//!
//! Loads configuration from files the way the binary does and renders
//! the configured path requests.

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use sfc_renderer::chain::RenderedPathBuilder;
use sfc_renderer::config::{create_default_config, load_config, load_config_str};
use sfc_renderer::selection::SchedulerType;
use sfc_renderer::store::{MemoryDefinitions, MemoryStateStore};
use sfc_renderer::ConfigError;

const CONFIG: &str = r#"{
    "allocator": { "algorithm": "sequential" },
    "scheduler": {
        "policy": "weighted_shortest_path",
        "starting_index": 100,
        "home_forwarder": "sff-a"
    },
    "topology": {
        "forwarders": [
            {
                "name": "sff-a",
                "links": [{ "to": "sff-b", "weight": 5 }, { "to": "sff-c", "weight": 1 }],
                "locators": [{ "ip": "192.0.2.1", "port": 4790 }]
            },
            { "name": "sff-b", "locators": [{ "ip": "192.0.2.2", "port": 4790 }] },
            { "name": "sff-c", "locators": [{ "ip": "192.0.2.3", "port": 4790 }] }
        ],
        "service_functions": [
            { "name": "fw-a", "type": "firewall", "forwarder": "sff-a" },
            { "name": "dpi-b", "type": "dpi", "forwarder": "sff-b" },
            { "name": "dpi-c", "type": "dpi", "forwarder": "sff-c", "one_chain_only": true }
        ],
        "chains": [
            {
                "name": "inspect",
                "elements": [{ "type": "firewall" }, { "type": "dpi" }],
                "symmetric": true
            }
        ]
    },
    "paths": [
        { "name": "first", "chain": "inspect" },
        { "name": "second", "chain": "inspect" }
    ],
    "log": { "level": "debug", "format": "text" }
}"#;

fn builder_for(config: &sfc_renderer::Config) -> RenderedPathBuilder {
    RenderedPathBuilder::from_config(
        config,
        Arc::new(MemoryDefinitions::from_config(&config.topology)),
        Arc::new(MemoryStateStore::new()),
    )
}

#[test]
fn test_render_configured_paths() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.scheduler.policy, SchedulerType::WeightedShortestPath);
    let builder = builder_for(&config);

    let first = builder.render(&config.paths[0]).unwrap();
    assert_eq!(first.forward.path_id, 1);
    assert_eq!(first.forward.starting_index, 100);
    assert_eq!(
        first.forward.service_functions().collect::<Vec<_>>(),
        vec!["fw-a", "dpi-c"]
    );
    let reverse = first.reverse.unwrap();
    assert_eq!(reverse.path_id, 2);

    let hop = builder.read_first_hop("first-Reverse").unwrap();
    assert_eq!(hop.ip, Some("192.0.2.3".parse().unwrap()));
    assert_eq!(hop.port, 4790);
    assert_eq!(hop.starting_index, 100);

    // dpi-c is exclusive to the first path and its mirror
    assert!(builder.render(&config.paths[1]).is_err());
    assert_eq!(builder.allocator().allocated_ids(), vec![1, 2]);
}

#[test]
fn test_default_config_renders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sfc.json");
    create_default_config(&path).unwrap();

    let config = load_config(&path).unwrap();
    let builder = builder_for(&config);
    for request in &config.paths {
        let paths = builder.render(request).unwrap();
        assert!(paths.reverse.is_some());
        assert!(!builder.read_first_hop(&paths.forward.name).unwrap().is_empty());
    }
}

#[test]
fn test_invalid_topology_rejected() {
    let json = r#"{
        "topology": {
            "forwarders": [{ "name": "sff-a", "links": [{ "to": "sff-z" }] }]
        }
    }"#;
    assert!(matches!(
        load_config_str(json),
        Err(ConfigError::ValidationError(_))
    ));
}
