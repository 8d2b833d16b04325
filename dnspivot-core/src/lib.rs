pub mod candidates;
pub mod discover;
pub mod engine;
pub mod error;
pub mod graph;
pub mod report;
pub mod wordlist;

pub use candidates::{Candidate, CandidateGenerator, Origin};
pub use engine::{CancelSignal, Discovery, DiscoveryEngine, DiscoveryEvent, DiscoveryStats, EngineConfig};
pub use error::{DiscoveryError, GraphError};
pub use graph::{DiscoveryGraph, DiscoveryNode, Recorded};

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
     _                   _            _
  __| |_ __  ___ _ __ (_)_   _____ | |_
 / _` | '_ \/ __| '_ \| \ \ / / _ \| __|
| (_| | | | \__ \ |_) | |\ V / (_) | |_
 \__,_|_| |_|___/ .__/|_| \_/ \___/ \__|
                |_|"#;
    eprintln!("{}", banner.bright_cyan().bold());
    eprintln!(
        "  {} {}\n",
        "forward / reverse DNS pivoting".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
