use crate::candidates::{CandidateGenerator, candidate_count};
use crate::engine::{
    CancelSignal, Discovery, DiscoveryEngine, DiscoveryEvent, EngineConfig, EventCallback,
};
use crate::error::{DiscoveryError, Result};
use dnspivot_resolver::{DnsClient, Resolver, ResolverSettings};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Options for configuring a discovery run
#[derive(Debug)]
pub struct DiscoveryOptions {
    pub domain: String,
    pub words: Vec<String>,
    pub resolver: ResolverSettings,
    pub engine: EngineConfig,
    /// Also try `w0` .. `w9` for every word.
    pub suffixes: bool,
    pub show_progress_bars: bool,
}

/// Callback for reporting discovery progress
pub type DiscoveryProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Execute a discovery run against the configured nameserver
pub async fn execute_discovery(
    options: DiscoveryOptions,
    cancel: Option<CancelSignal>,
    progress_callback: Option<DiscoveryProgressCallback>,
) -> Result<Discovery> {
    let client = DnsClient::new(options.resolver.clone())?;
    execute_discovery_with(Arc::new(client), options, cancel, progress_callback).await
}

/// Same as `execute_discovery`, with the resolver supplied by the caller.
pub async fn execute_discovery_with(
    resolver: Arc<dyn Resolver>,
    options: DiscoveryOptions,
    cancel: Option<CancelSignal>,
    progress_callback: Option<DiscoveryProgressCallback>,
) -> Result<Discovery> {
    let DiscoveryOptions {
        domain,
        words,
        resolver: _,
        engine,
        suffixes,
        show_progress_bars,
    } = options;

    if domain.trim().trim_end_matches('.').is_empty() {
        return Err(DiscoveryError::InvalidDomain(
            "no base domain provided".to_string(),
        ));
    }
    if words.is_empty() {
        return Err(DiscoveryError::Wordlist("Wordlist is empty".to_string()));
    }

    let total = candidate_count(words.len(), suffixes);
    info!(domain = %domain, candidates = total, "Generating candidates");
    if let Some(ref callback) = progress_callback {
        callback(format!("Probing {} candidates under {}", total, domain));
    }

    // Set up single progress bar for overall progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Starting discovery...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let found = Arc::new(AtomicUsize::new(0));
    let abandoned = Arc::new(AtomicUsize::new(0));

    let event_callback: EventCallback = {
        let pb = progress_bar.clone();
        let found = found.clone();
        let abandoned = abandoned.clone();
        let progress_callback = progress_callback.clone();
        Arc::new(move |event: &DiscoveryEvent| {
            match event {
                DiscoveryEvent::Resolved {
                    hostname, parent, ..
                } => {
                    found.fetch_add(1, Ordering::Relaxed);
                    if let Some(ref callback) = progress_callback {
                        match parent {
                            Some(parent) => callback(format!("[+] {} (via {})", hostname, parent)),
                            None => callback(format!("[+] {}", hostname)),
                        }
                    }
                }
                DiscoveryEvent::Abandoned { .. } => {
                    abandoned.fetch_add(1, Ordering::Relaxed);
                }
                _ => {}
            }

            if let Some(ref pb) = pb {
                pb.set_message(format!(
                    "Discovering... {} hosts found, {} candidates dead",
                    found.load(Ordering::Relaxed),
                    abandoned.load(Ordering::Relaxed)
                ));
                pb.tick();
            }
        })
    };

    let mut engine = DiscoveryEngine::with_config(resolver, engine).with_event_callback(event_callback);
    if let Some(cancel) = cancel {
        engine = engine.with_cancel_signal(cancel);
    }

    let candidates = CandidateGenerator::new(&domain, words).with_suffixes(suffixes);
    let result = engine.run(candidates).await;

    // Finish progress bar (only if enabled)
    if let Some(ref pb) = progress_bar {
        match &result {
            Ok(discovery) if discovery.cancelled => pb.finish_with_message(format!(
                "Discovery cancelled, {} hosts found",
                discovery.graph.len()
            )),
            Ok(discovery) => pb.finish_with_message(format!(
                "Discovery complete! {} hosts found",
                discovery.graph.len()
            )),
            Err(_) => pb.abandon_with_message("Discovery aborted"),
        }
    }

    result
}
