use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use dnspivot_core::discover::{DiscoveryOptions, execute_discovery};
use dnspivot_core::report::{ReportFormat, ReportMeta, generate_report, save_report};
use dnspivot_core::wordlist::{DEFAULT_WORDLIST, default_wordlist, load_wordlist};
use dnspivot_core::{CancelSignal, Discovery, DiscoveryError, EngineConfig};
use dnspivot_resolver::{ResolverSettings, Transport};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::DEFAULT_CONFIG_DIR;

/// Where the subdomain labels for a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordlistSource {
    File(PathBuf),
    Bundled,
}

/// Install a `fmt` subscriber on stderr.
///
/// `RUST_LOG` wins, then `DNSPIVOT_LOG`, then `debug` when verbose or `warn`.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("DNSPIVOT_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second call (tests, repeated runs in one process) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Path of the wordlist `dnspivot init` installs under `config_dir`.
pub fn installed_wordlist_path(config_dir: &Path) -> PathBuf {
    config_dir.join("wordlists").join("default.txt")
}

/// `--wordlist` if given, then the installed default, then the bundled list.
pub fn resolve_wordlist_source(explicit: Option<&PathBuf>, config_dir: &Path) -> WordlistSource {
    if let Some(path) = explicit {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        return WordlistSource::File(PathBuf::from(expanded));
    }

    let installed = installed_wordlist_path(config_dir);
    if installed.is_file() {
        WordlistSource::File(installed)
    } else {
        WordlistSource::Bundled
    }
}

pub fn load_words_from_source(source: &WordlistSource) -> Result<Vec<String>> {
    match source {
        WordlistSource::File(path) => load_wordlist(path)
            .with_context(|| format!("Could not load wordlist {}", path.display())),
        WordlistSource::Bundled => Ok(default_wordlist()),
    }
}

pub fn expand_config_dir(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Build the run options from `discover` arguments and an already loaded wordlist.
pub fn discovery_options_from_args(args: &ArgMatches, words: Vec<String>) -> Result<DiscoveryOptions> {
    let domain = args
        .get_one::<String>("domain")
        .context("--domain is required")?
        .trim()
        .trim_end_matches('.')
        .to_lowercase();
    if domain.is_empty() {
        bail!("--domain must not be empty");
    }

    let nameserver = args
        .get_one::<String>("nameserver")
        .map(String::as_str)
        .unwrap_or("8.8.8.8");
    let mut resolver = ResolverSettings::from_nameserver(nameserver)
        .with_context(|| format!("Invalid --nameserver '{}'", nameserver))?;
    if let Some(&port) = args.get_one::<u16>("port") {
        resolver = resolver.with_port(port);
    }
    if args.get_flag("tcp") {
        resolver = resolver.with_transport(Transport::Tcp);
    }
    if let Some(&timeout) = args.get_one::<u64>("timeout") {
        resolver = resolver.with_timeout(Duration::from_secs(timeout));
    }
    resolver = resolver.with_ipv6(!args.get_flag("no-ipv6"));
    resolver.validate().context("Invalid resolver settings")?;

    let mut engine = EngineConfig::default();
    if let Some(&threads) = args.get_one::<usize>("threads") {
        engine = engine.with_workers(threads);
    }
    if let Some(&max_depth) = args.get_one::<usize>("max-depth") {
        engine = engine.with_max_depth(max_depth);
    }
    engine = engine.with_deadline(args.get_one::<u64>("deadline").map(|s| Duration::from_secs(*s)));

    Ok(DiscoveryOptions {
        domain,
        words,
        resolver,
        engine,
        suffixes: !args.get_flag("no-suffixes"),
        show_progress_bars: true,
    })
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read response")?;
    Ok(response.trim().to_lowercase())
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  DNSPIVOT INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_arg = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_DIR);
    let force = args.get_flag("force");
    let config_dir = expand_config_dir(config_arg);
    let wordlist_path = installed_wordlist_path(&config_dir);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if wordlist_path.exists() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("A wordlist is already installed:");
        println!(
            "  {} {}",
            "•".yellow(),
            wordlist_path.display().to_string().bright_white()
        );
        println!();
        println!("{}", "This operation will overwrite it.".yellow());

        let response = print_prompt("Do you want to continue? [y/N]:")?;
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
    }

    println!("{} Installing default wordlist...", "→".blue());
    let installed = create_configuration_assets(&config_dir)?;
    let entries = default_wordlist().len();
    println!(
        "  {} {} ({} entries, {} bytes)",
        "✓".green().bold(),
        installed.display().to_string().bright_white(),
        entries.to_string().cyan(),
        DEFAULT_WORDLIST.len().to_string().cyan()
    );

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    Ok(())
}

/// Create `config_dir/wordlists/` and write the bundled wordlist into it.
pub fn create_configuration_assets(config_dir: &Path) -> Result<PathBuf> {
    let wordlist_path = installed_wordlist_path(config_dir);
    let wordlist_dir = config_dir.join("wordlists");

    fs::create_dir_all(&wordlist_dir)
        .with_context(|| format!("Failed to create {}", wordlist_dir.display()))?;
    fs::write(&wordlist_path, DEFAULT_WORDLIST)
        .with_context(|| format!("Failed to write {}", wordlist_path.display()))?;
    debug!(path = %wordlist_path.display(), "Installed default wordlist");

    Ok(wordlist_path)
}

/// Render `discovery` and write it to `output`, or to stdout when no path is given.
fn emit_report(
    discovery: &Discovery,
    meta: &ReportMeta,
    format: ReportFormat,
    output: Option<&PathBuf>,
    quiet: bool,
) -> Result<()> {
    let report = generate_report(discovery, meta, format).context("Failed to render report")?;
    match output {
        Some(path) => {
            save_report(&report, path)
                .with_context(|| format!("Failed to save report to {}", path.display()))?;
            if !quiet {
                eprintln!(
                    "\n{} Report saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", report),
    }
    Ok(())
}

pub async fn handle_discover(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config_dir = expand_config_dir(DEFAULT_CONFIG_DIR);
    let source = resolve_wordlist_source(args.get_one::<PathBuf>("wordlist"), &config_dir);
    let words = load_words_from_source(&source)?;
    let mut options = discovery_options_from_args(args, words)?;
    options.show_progress_bars = !quiet;

    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = args.get_one::<PathBuf>("output");
    let meta = ReportMeta {
        domain: options.domain.clone(),
        nameserver: format!("{} ({})", options.resolver.socket_addr(), options.resolver.transport),
    };

    if !quiet {
        let wordlist = match &source {
            WordlistSource::File(path) => path.display().to_string(),
            WordlistSource::Bundled => "bundled".to_string(),
        };
        eprintln!("{} Domain: {}", "→".blue(), meta.domain.bright_white());
        eprintln!("{} Nameserver: {}", "→".blue(), meta.nameserver.bright_white());
        eprintln!(
            "{} Wordlist: {} ({} words)",
            "→".blue(),
            wordlist.bright_white(),
            options.words.len()
        );
        eprintln!(
            "{} Workers: {}, max depth: {}\n",
            "→".blue(),
            options.engine.workers,
            options.engine.max_depth
        );
    }
    info!(domain = %meta.domain, nameserver = %meta.nameserver, "Starting discovery");

    let cancel = CancelSignal::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing with partial results");
                cancel.cancel();
            }
        })
    };

    let result = execute_discovery(options, Some(cancel), None).await;
    ctrl_c.abort();

    let discovery = match result {
        Ok(discovery) => discovery,
        Err(DiscoveryError::ResolverUnreachable {
            failures,
            last_error,
            partial,
        }) => {
            if !partial.graph.is_empty() {
                emit_report(&partial, &meta, format, output, quiet)?;
                eprintln!(
                    "{} Run aborted; the report holds {} hosts found before the nameserver stopped answering.",
                    "⚠".yellow().bold(),
                    partial.graph.len()
                );
            }
            bail!(
                "Nameserver {} is unreachable ({} consecutive failures, last: {})",
                meta.nameserver,
                failures,
                last_error
            );
        }
        Err(e) => return Err(e).context("Discovery failed"),
    };

    emit_report(&discovery, &meta, format, output, quiet)?;

    if discovery.cancelled && !quiet {
        eprintln!(
            "{} Run was cut short; the report holds partial results.",
            "⚠".yellow().bold()
        );
    }

    Ok(())
}
