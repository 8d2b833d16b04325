// Tests for the discovery entry point

mod common;

use common::{TableResolver, addrs};
use dnspivot_core::discover::{DiscoveryOptions, execute_discovery, execute_discovery_with};
use dnspivot_core::{CancelSignal, DiscoveryError, EngineConfig};
use dnspivot_resolver::ResolverSettings;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn options(domain: &str, words: &[&str]) -> DiscoveryOptions {
    DiscoveryOptions {
        domain: domain.to_string(),
        words: words.iter().map(|w| w.to_string()).collect(),
        resolver: ResolverSettings::default(),
        engine: EngineConfig::default().with_workers(4),
        suffixes: false,
        show_progress_bars: false,
    }
}

#[tokio::test]
async fn test_discovery_finds_wordlist_hits_and_pivots() {
    let resolver = Arc::new(
        TableResolver::new()
            .host("www.example.com", &["203.0.113.10"])
            .ptr("203.0.113.10", "internal-host.example.net")
            .host("internal-host.example.net", &["10.1.2.3"]),
    );

    let discovery = execute_discovery_with(resolver, options("example.com", &["www", "mail"]), None, None)
        .await
        .unwrap();

    assert_eq!(discovery.graph.len(), 2);
    let pivoted = discovery.graph.get("internal-host.example.net").unwrap();
    assert_eq!(pivoted.addresses, addrs(&["10.1.2.3"]));
    assert_eq!(pivoted.parent.as_deref(), Some("www.example.com"));
    assert_eq!(discovery.stats.root_candidates, 2);
}

#[tokio::test]
async fn test_discovery_trims_trailing_dot_on_domain() {
    let resolver = Arc::new(TableResolver::new().host("www.example.com", &["203.0.113.10"]));

    let discovery = execute_discovery_with(resolver, options("example.com.", &["www"]), None, None)
        .await
        .unwrap();

    assert!(discovery.graph.contains("www.example.com"));
}

#[tokio::test]
async fn test_discovery_reports_progress() {
    let resolver = Arc::new(
        TableResolver::new()
            .host("www.example.com", &["203.0.113.10"])
            .ptr("203.0.113.10", "edge.example.net")
            .host("edge.example.net", &["198.51.100.7"]),
    );
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();

    execute_discovery_with(
        resolver,
        options("example.com", &["www"]),
        None,
        Some(Arc::new(move |msg: String| sink.lock().unwrap().push(msg))),
    )
    .await
    .unwrap();

    let messages = messages.lock().unwrap();
    assert!(messages[0].contains("Probing 1 candidates under example.com"));
    assert!(messages.contains(&"[+] www.example.com".to_string()));
    assert!(messages.contains(&"[+] edge.example.net (via www.example.com)".to_string()));
}

#[tokio::test]
async fn test_discovery_rejects_empty_wordlist() {
    let resolver = Arc::new(TableResolver::new());

    let result = execute_discovery_with(resolver, options("example.com", &[]), None, None).await;

    assert!(matches!(result, Err(DiscoveryError::Wordlist(_))));
}

#[tokio::test]
async fn test_discovery_rejects_empty_domain() {
    let resolver = Arc::new(TableResolver::new());

    let result = execute_discovery_with(resolver, options(" . ", &["www"]), None, None).await;

    assert!(matches!(result, Err(DiscoveryError::InvalidDomain(_))));
}

#[tokio::test]
async fn test_discovery_honours_external_cancel() {
    let resolver = Arc::new(TableResolver::new().host("www.example.com", &["203.0.113.10"]));
    let cancel = CancelSignal::new();
    cancel.cancel();

    let discovery = execute_discovery_with(resolver, options("example.com", &["www"]), Some(cancel), None)
        .await
        .unwrap();

    assert!(discovery.cancelled);
    assert!(discovery.graph.is_empty());
}

#[tokio::test]
async fn test_execute_discovery_rejects_bad_resolver_settings() {
    let mut opts = options("example.com", &["www"]);
    opts.resolver = ResolverSettings::default().with_timeout(Duration::ZERO);

    let result = execute_discovery(opts, None, None).await;

    assert!(matches!(result, Err(DiscoveryError::Resolver(_))));
}
