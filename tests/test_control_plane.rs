use std::fs;
use std::path::PathBuf;

use backhaul_placement::build_control_plane;
use backhaul_placement::domain::utils::id::{ContentId, NodeId, UserId};
use backhaul_placement::error::Error;

const NODES: &str = "id type\n0 server\n1 router\n2 router\n3 ap\n";
const LINKS: &str = "src dst rate delay loss buffer\n0 1 8000000 0.002 0 100\n1 2 10000000 0.002 0 100\n2 3 10000000 0.002 0 100\n";

/// Writes the line topology plus the given configuration and trace into a
/// fresh directory and returns the configuration path.
fn create_workspace(config: &str, trace: Option<&str>) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("control-plane-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("nodes.txt"), NODES).unwrap();
    fs::write(dir.join("links.txt"), LINKS).unwrap();
    if let Some(trace) = trace {
        fs::write(dir.join("trace.json"), trace).unwrap();
    }

    let config_path = dir.join("config.json");
    fs::write(&config_path, config).unwrap();
    config_path
}

fn cleanup(config_path: &PathBuf) {
    if let Some(dir) = config_path.parent() {
        fs::remove_dir_all(dir).unwrap();
    }
}

#[tokio::test]
async fn test_second_viewer_triggers_provisioning_on_the_router() {
    let config_path = create_workspace(
        r#"{
            "topology": { "nodesFile": "nodes.txt", "linksFile": "links.txt" },
            "originServer": 0,
            "clientsPerAp": 2,
            "stopTimeS": 6.0,
            "trace": "trace.json"
        }"#,
        Some(
            r#"{ "events": [
                { "type": "viewerArrival", "atS": 0.5, "user": 0, "content": 1 },
                { "type": "viewerArrival", "atS": 1.0, "user": 1, "content": 1 }
            ] }"#,
        ),
    );

    let mut plane = build_control_plane(&config_path).unwrap();
    let summary = plane.run().await.unwrap();

    assert_eq!(summary.groups, 1, "Both viewers watch the same content behind the same AP");
    assert_eq!(summary.users, 2);
    assert_eq!(summary.controller.admissions_accepted, 1);
    assert_eq!(summary.controller.admissions_rejected, 1);
    assert!(summary.controller.relocations >= 1);
    assert!(summary.simulated_time_s <= 6.0);

    let controller = plane.controller();
    let group = &controller.registry().groups()[0];
    assert_eq!(group.serving_node, NodeId::new(1));

    let node_one_ip = controller.addresses().node_address(NodeId::new(1)).unwrap();
    assert_eq!(controller.lookup_server(UserId::new(0), ContentId::new(1)), Some(node_one_ip.as_str()));
    assert!(controller.servers().has_content(NodeId::new(0), ContentId::new(1)));
    assert_eq!(summary.controller.servers_activated, 1);

    cleanup(&config_path);
}

#[tokio::test]
async fn test_provisioning_disabled_leaves_group_on_origin() {
    let config_path = create_workspace(
        r#"{
            "topology": { "nodesFile": "nodes.txt", "linksFile": "links.txt" },
            "originServer": 0,
            "clientsPerAp": 2,
            "stopTimeS": 1.5,
            "provisionOnAdmissionFailure": false,
            "trace": "trace.json"
        }"#,
        Some(
            r#"{ "events": [
                { "type": "viewerArrival", "atS": 0.5, "user": 0, "content": 1 },
                { "type": "viewerArrival", "atS": 1.0, "user": 1, "content": 1 }
            ] }"#,
        ),
    );

    let mut plane = build_control_plane(&config_path).unwrap();
    let summary = plane.run().await.unwrap();

    // The first monitor tick is at 2s, after the stop time.
    assert_eq!(summary.events_processed, 2);
    assert_eq!(summary.controller.admissions_rejected, 1);
    assert_eq!(summary.controller.relocations, 0);
    assert_eq!(plane.controller().registry().groups()[0].serving_node, NodeId::new(0));

    cleanup(&config_path);
}

#[tokio::test]
async fn test_generated_scenario_attaches_every_viewer() {
    let config_path = create_workspace(
        r#"{
            "topology": { "nodesFile": "nodes.txt", "linksFile": "links.txt" },
            "originServer": 0,
            "clientsPerAp": 3,
            "stopTimeS": 20.0,
            "scenario": { "seed": 11, "startWindowS": 5.0, "contents": 2 }
        }"#,
        None,
    );

    let mut plane = build_control_plane(&config_path).unwrap();
    let summary = plane.run().await.unwrap();

    assert_eq!(summary.users, 3);
    assert!(summary.groups >= 1 && summary.groups <= 2);
    assert_eq!(summary.controller.admissions_accepted + summary.controller.admissions_rejected, 3);

    cleanup(&config_path);
}

#[tokio::test]
async fn test_unknown_origin_is_rejected() {
    let config_path = create_workspace(
        r#"{ "topology": { "nodesFile": "nodes.txt", "linksFile": "links.txt" }, "originServer": 9 }"#,
        None,
    );

    assert!(matches!(build_control_plane(&config_path), Err(Error::ConfigError(_))));

    cleanup(&config_path);
}
