use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{arg, command};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/dnspivot/";

pub const CLAP_STYLING: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
    .valid(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .invalid(AnsiColor::Yellow.on_default().effects(Effects::BOLD));

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("dnspivot")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("dnspivot")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Log debug output to stderr")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Creates the dnspivot config directory and installs the default wordlist")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location of the dnspivot config directory")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing installation without prompting")
                        .required(false),
                ),
        )
        .subcommand(
            command!("discover")
                .about(
                    "Brute force subdomains of a domain, then pivot through PTR records of every \
                address found to reach hosts outside the wordlist.",
                )
                .arg(
                    arg!(-d --"domain" <DOMAIN>)
                        .required(true)
                        .help("Base domain to enumerate, e.g. example.com"),
                )
                .arg(
                    arg!(-w --"wordlist" <PATH>)
                        .required(false)
                        .help(
                            "Path to a subdomain wordlist (default: \
                        ~/.config/dnspivot/wordlists/default.txt, then the bundled list)",
                        )
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-n --"nameserver" <ADDR>)
                        .required(false)
                        .help("Nameserver to query, as IP or IP:PORT")
                        .default_value("8.8.8.8"),
                )
                .arg(
                    arg!(-p --"port" <PORT>)
                        .required(false)
                        .help("Nameserver port (overrides a port given with --nameserver)")
                        .value_parser(clap::value_parser!(u16).range(1..)),
                )
                .arg(
                    arg!(--"tcp")
                        .required(false)
                        .help("Query the nameserver over TCP instead of UDP")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-query timeout in seconds")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("5"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Number of candidates expanded at once, and the cap on in-flight queries")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"max-depth" <N>)
                        .required(false)
                        .help("Maximum PTR hops away from a wordlist hit")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("8"),
                )
                .arg(
                    arg!(--"deadline" <SECONDS>)
                        .required(false)
                        .help("Stop after this many seconds and report what was found")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"no-suffixes")
                        .required(false)
                        .help("Do not try numeric suffixes (www0 .. www9) for each word")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"no-ipv6")
                        .required(false)
                        .help("Only query A records")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}

/// True when `-v` was given before or after the subcommand name.
pub fn verbose_requested(matches: &clap::ArgMatches) -> bool {
    matches.get_flag("verbose")
        || matches
            .subcommand()
            .is_some_and(|(_, sub)| sub.get_flag("verbose"))
}
