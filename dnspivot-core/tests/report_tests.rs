// Tests for tree rendering and report generation

mod common;

use chrono::{TimeZone, Utc};
use common::addrs;
use dnspivot_core::engine::{Discovery, DiscoveryStats};
use dnspivot_core::graph::DiscoveryGraph;
use dnspivot_core::report::{
    ReportFormat, ReportMeta, generate_json_report, generate_report, generate_text_report,
    render_tree, save_report,
};
use tempfile::TempDir;

fn sample_graph() -> DiscoveryGraph {
    let mut graph = DiscoveryGraph::new();
    graph
        .record("www.example.com", &addrs(&["203.0.113.10"]), None)
        .unwrap();
    graph
        .record(
            "edge-1.example.net",
            &addrs(&["198.51.100.1"]),
            Some("www.example.com"),
        )
        .unwrap();
    graph
        .record(
            "origin.example.org",
            &addrs(&["192.0.2.1"]),
            Some("edge-1.example.net"),
        )
        .unwrap();
    graph
        .record(
            "edge-2.example.net",
            &addrs(&["203.0.113.10", "198.51.100.2"]),
            Some("www.example.com"),
        )
        .unwrap();
    graph
        .record("api.example.com", &addrs(&["203.0.113.20"]), None)
        .unwrap();
    graph
}

fn sample_discovery(graph: DiscoveryGraph, cancelled: bool) -> Discovery {
    Discovery {
        graph,
        stats: DiscoveryStats {
            root_candidates: 22,
            forward_queries: 26,
            reverse_queries: 6,
            abandoned: 20,
            pivots: 3,
        },
        cancelled,
        started_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        finished_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 3).unwrap(),
    }
}

fn meta() -> ReportMeta {
    ReportMeta {
        domain: "example.com".to_string(),
        nameserver: "192.0.2.53:53".to_string(),
    }
}

// ============================================================================
// Report Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str() {
    assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("txt"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("csv"), None);
}

// ============================================================================
// Tree Rendering Tests
// ============================================================================

#[test]
fn test_render_tree_pre_order_with_connectors() {
    let tree = render_tree(&sample_graph());

    let expected = "\
www.example.com  [203.0.113.10]
├── edge-1.example.net  [198.51.100.1]
│   └── origin.example.org  [192.0.2.1]
└── edge-2.example.net  [198.51.100.2, 203.0.113.10]
api.example.com  [203.0.113.20]
";
    assert_eq!(tree, expected);
}

#[test]
fn test_render_tree_every_node_once() {
    let graph = sample_graph();
    let tree = render_tree(&graph);

    assert_eq!(tree.lines().count(), graph.len());
    for node in graph.nodes() {
        assert_eq!(tree.matches(&format!("{}  [", node.hostname)).count(), 1);
    }
}

#[test]
fn test_render_tree_empty_graph() {
    let tree = render_tree(&DiscoveryGraph::new());
    assert_eq!(tree, "  (no hosts discovered)\n");
}

// ============================================================================
// Text Report Tests
// ============================================================================

#[test]
fn test_text_report_summary() {
    let report = generate_text_report(&sample_discovery(sample_graph(), false), &meta());

    assert!(report.contains("DISCOVERY RESULTS"));
    assert!(report.contains("Domain: example.com"));
    assert!(report.contains("Nameserver: 192.0.2.53:53"));
    assert!(report.contains("Hosts discovered: 5"));
    assert!(report.contains("Distinct addresses: 5"));
    assert!(report.contains("Wordlist hits: 2"));
    assert!(report.contains("Found via PTR pivot: 3"));
    assert!(report.contains("Queries: 26 forward, 6 reverse"));
    assert!(report.contains("Candidates tried: 22 (20 abandoned)"));
    assert!(report.contains("Duration: 3.0s"));
    assert!(!report.contains("Status: cancelled"));
    assert!(report.contains("End of Report"));
}

#[test]
fn test_text_report_lists_shared_addresses() {
    let report = generate_text_report(&sample_discovery(sample_graph(), false), &meta());

    assert!(report.contains("# Shared addresses:"));
    assert!(report.contains("203.0.113.10 <- www.example.com, edge-2.example.net"));
}

#[test]
fn test_text_report_marks_partial_results() {
    let report = generate_text_report(&sample_discovery(sample_graph(), true), &meta());
    assert!(report.contains("Status: cancelled (partial results)"));
}

#[test]
fn test_text_report_empty_discovery() {
    let report = generate_text_report(&sample_discovery(DiscoveryGraph::new(), false), &meta());

    assert!(report.contains("Hosts discovered: 0"));
    assert!(report.contains("(no hosts discovered)"));
    assert!(!report.contains("# Shared addresses:"));
}

// ============================================================================
// JSON Report Tests
// ============================================================================

#[test]
fn test_json_report_structure() {
    let json = generate_json_report(&sample_discovery(sample_graph(), false), &meta()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["domain"], "example.com");
    assert_eq!(value["cancelled"], false);
    assert_eq!(value["stats"]["pivots"], 3);

    let nodes = value["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 5);
    assert_eq!(nodes[0]["hostname"], "www.example.com");
    assert!(nodes[0]["parent"].is_null());
    assert_eq!(nodes[2]["hostname"], "origin.example.org");
    assert_eq!(nodes[2]["parent"], "edge-1.example.net");
    assert_eq!(nodes[2]["addresses"][0], "192.0.2.1");

    let shared = value["shared_addresses"].as_array().unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0]["address"], "203.0.113.10");
}

#[test]
fn test_generate_report_dispatches_on_format() {
    let discovery = sample_discovery(sample_graph(), false);

    let text = generate_report(&discovery, &meta(), ReportFormat::Text).unwrap();
    let json = generate_report(&discovery, &meta(), ReportFormat::Json).unwrap();

    assert!(text.contains("# Hosts:"));
    assert!(json.trim_start().starts_with('{'));
}

#[test]
fn test_save_report() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.txt");

    save_report("hello report", &path).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello report");
}
