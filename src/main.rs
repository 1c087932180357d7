use chrono::Utc;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

use macven::state::DEFAULT_STATE_PATH;
use macven::{
    init_logging, lookup, output, refresh, HttpFetcher, JsonStateFile, LogLevel, MacvenError,
    StateStore, UpdateGate,
};

/// Resolve MAC address prefixes to vendor names using the IEEE OUI registry.
#[derive(Parser, Debug)]
#[command(name = "macven", version)]
struct Cli {
    /// Download the registry into the local store (at most once every 24 hours)
    #[arg(short = 'u', long = "update")]
    update: bool,

    /// State file holding last_updated and csv_path
    #[arg(long, env = "MACVEN_CONFIG", default_value = DEFAULT_STATE_PATH)]
    config: PathBuf,

    /// Log level (logs go to stderr)
    #[arg(short = 'l', long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// MAC address to look up: MM:MM:MM:SS:SS:SS, MM-MM-MM-SS-SS-SS, MMM.MMM.SSS.SSS or MMMMMMSSSSSS
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

/// What a single invocation does; decided by the first action on the line
#[derive(Debug, PartialEq, Eq)]
enum Mode<'a> {
    Help,
    Refresh,
    Lookup(&'a str),
}

impl Cli {
    /// `-u` only counts when it precedes the MAC; anything after the
    /// first positional is collected into `args` verbatim
    fn mode(&self) -> Mode<'_> {
        if self.update {
            return Mode::Refresh;
        }
        match self.args.first() {
            Some(mac) => Mode::Lookup(mac),
            None => Mode::Help,
        }
    }

    /// Anything beyond the first action is ignored with a warning
    fn has_extraneous_args(&self) -> bool {
        self.args.len() + usize::from(self.update) > 1
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_level) {
        eprintln!("❌ {:#}", e);
    }

    let code = run(&cli);

    if cli.has_extraneous_args() {
        println!("{}", output::extraneous_warning());
    }

    code
}

fn run(cli: &Cli) -> ExitCode {
    let states = JsonStateFile::new(&cli.config);
    let gate = UpdateGate::default();
    let now = Utc::now();

    match cli.mode() {
        Mode::Refresh => {
            let result =
                HttpFetcher::new().and_then(|fetcher| refresh(&states, &fetcher, &gate, now));
            match result {
                Ok(outcome) => {
                    println!("{}", output::refresh_success(&outcome));
                    ExitCode::SUCCESS
                }
                Err(e) => report(&e, None, &states),
            }
        }
        Mode::Lookup(mac) => match lookup(&states, &gate, mac, now) {
            Ok(outcome) => {
                println!("{}", output::lookup_success(&outcome));
                ExitCode::SUCCESS
            }
            Err(e) => report(&e, Some(mac), &states),
        },
        Mode::Help => {
            println!("{}", output::help_text());
            // Flag reference below the usage summary
            println!("{}", Cli::command().render_help());
            ExitCode::SUCCESS
        }
    }
}

/// Expected outcomes exit 0; anything else is a real failure
fn report(err: &MacvenError, input: Option<&str>, states: &JsonStateFile) -> ExitCode {
    let store_path = states
        .load()
        .map(|s| s.csv_path)
        .unwrap_or_else(|_| PathBuf::from(macven::state::DEFAULT_STORE_PATH));

    println!("{}", output::error_message(err, input, &store_path));

    if err.is_user_facing() {
        tracing::debug!(error = %err, retryable = err.is_retryable(), "command finished without result");
        ExitCode::SUCCESS
    } else {
        tracing::error!(error = %err, "command failed");
        ExitCode::FAILURE
    }
}
