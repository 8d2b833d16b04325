// Tree rendering and report generation from a finished discovery

use crate::engine::Discovery;
use crate::graph::{DiscoveryGraph, DiscoveryNode};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "═══════════════════════════════════════════════════════════════════════════════";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// Run details that are not part of the graph itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub domain: String,
    pub nameserver: String,
}

/// Depth-first, pre-order view of the provenance graph.
///
/// Roots and children appear in the order they were discovered.
pub fn render_tree(graph: &DiscoveryGraph) -> String {
    if graph.is_empty() {
        return "  (no hosts discovered)\n".to_string();
    }

    let mut out = String::new();
    for root in graph.roots() {
        out.push_str(&format_node(root));
        out.push('\n');

        let mut stack = child_frames(graph, root, "");
        while let Some((node, prefix, is_last)) = stack.pop() {
            let connector = if is_last { "└── " } else { "├── " };
            out.push_str(&format!("{}{}{}\n", prefix, connector, format_node(node)));

            let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
            stack.extend(child_frames(graph, node, &child_prefix));
        }
    }
    out
}

// Reversed so the first child is popped first.
fn child_frames<'a>(
    graph: &'a DiscoveryGraph,
    node: &DiscoveryNode,
    prefix: &str,
) -> Vec<(&'a DiscoveryNode, String, bool)> {
    let children = graph.children(&node.hostname);
    let count = children.len();
    children
        .into_iter()
        .enumerate()
        .rev()
        .map(|(i, child)| (child, prefix.to_string(), i + 1 == count))
        .collect()
}

fn format_node(node: &DiscoveryNode) -> String {
    let addresses: Vec<String> = node.addresses.iter().map(|a| a.to_string()).collect();
    format!("{}  [{}]", node.hostname, addresses.join(", "))
}

pub fn generate_text_report(discovery: &Discovery, meta: &ReportMeta) -> String {
    let graph = &discovery.graph;
    let stats = &discovery.stats;
    let mut report = String::new();

    report.push_str(&format!("\n{}\n", RULE));
    report.push_str("                            DISCOVERY RESULTS\n");
    report.push_str(&format!("{}\n\n", RULE));

    report.push_str("# Summary:\n");
    report.push_str(&format!("  Domain: {}\n", meta.domain));
    report.push_str(&format!("  Nameserver: {}\n", meta.nameserver));
    report.push_str(&format!("  Hosts discovered: {}\n", graph.len()));
    report.push_str(&format!("  Distinct addresses: {}\n", graph.address_count()));
    report.push_str(&format!("  Wordlist hits: {}\n", graph.roots().count()));
    report.push_str(&format!(
        "  Found via PTR pivot: {}\n",
        graph.nodes().filter(|n| !n.is_root()).count()
    ));
    report.push_str(&format!(
        "  Queries: {} forward, {} reverse\n",
        stats.forward_queries, stats.reverse_queries
    ));
    report.push_str(&format!(
        "  Candidates tried: {} ({} abandoned)\n",
        stats.root_candidates, stats.abandoned
    ));
    let elapsed = discovery.finished_at - discovery.started_at;
    report.push_str(&format!(
        "  Duration: {:.1}s\n",
        elapsed.num_milliseconds() as f64 / 1000.0
    ));
    if discovery.cancelled {
        report.push_str("  Status: cancelled (partial results)\n");
    }

    report.push_str("\n# Hosts:\n");
    report.push_str(&render_tree(graph));

    let shared = graph.shared_addresses();
    if !shared.is_empty() {
        report.push_str("\n# Shared addresses:\n");
        for (address, hostnames) in shared {
            report.push_str(&format!("  {} <- {}\n", address, hostnames.join(", ")));
        }
    }

    report.push_str(&format!("\n{}\n", RULE));
    report.push_str("                            End of Report\n");
    report.push_str(&format!("{}\n", RULE));

    report
}

pub fn generate_json_report(
    discovery: &Discovery,
    meta: &ReportMeta,
) -> Result<String, serde_json::Error> {
    let shared: Vec<serde_json::Value> = discovery
        .graph
        .shared_addresses()
        .into_iter()
        .map(|(address, hostnames)| {
            serde_json::json!({
                "address": address,
                "hostnames": hostnames,
            })
        })
        .collect();

    let report = serde_json::json!({
        "domain": meta.domain,
        "nameserver": meta.nameserver,
        "started_at": discovery.started_at.to_rfc3339(),
        "finished_at": discovery.finished_at.to_rfc3339(),
        "cancelled": discovery.cancelled,
        "stats": discovery.stats,
        "nodes": discovery.graph,
        "shared_addresses": shared,
    });

    serde_json::to_string_pretty(&report)
}

pub fn generate_report(
    discovery: &Discovery,
    meta: &ReportMeta,
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(discovery, meta)),
        ReportFormat::Json => generate_json_report(discovery, meta),
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
