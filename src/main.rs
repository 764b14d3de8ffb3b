//!
//! medrec terminal client
//! ----------------------
//! Interactive interpreter over the patient-records service: log in or register, list and
//! search records, and add patients when the account's role allows it.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use medrec::cli::{parse_command, prompt, Command, TerminalSurface, HELP};
use medrec::config::{parse_api_base, ClientConfig};
use medrec::gateway::RemoteGateway;
use medrec::portal::Portal;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--connect <url>] [--origin <url>] [--timeout <secs>]\n\nFlags:\n  --connect <url>     API base URL (default: $MEDREC_API_URL or http://127.0.0.1:5000)\n  --origin <url>      derive the API base from the page origin the client is served from\n  --timeout <secs>    per-request timeout (default: $MEDREC_TIMEOUT_SECS or 10)\n  -h, --help          show this help\n\nEnvironment:\n  MEDREC_API_URL, MEDREC_TIMEOUT_SECS, MEDREC_NOTICE_MS, RUST_LOG\n\n{HELP}"
    );
}

fn value_or_exit(args: &[String], i: usize, flag: &str, program: &str) -> String {
    match args.get(i + 1) {
        Some(v) => v.clone(),
        None => {
            eprintln!("{} requires a value", flag);
            print_usage(program);
            std::process::exit(2);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Default to warnings so log lines do not interleave with REPL output
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut config = ClientConfig::from_env().context("reading MEDREC_* environment")?;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--connect" => {
                let raw = value_or_exit(&args, i, "--connect", &program);
                config.api_base = parse_api_base(&raw)?;
                i += 2;
            }
            "--origin" => {
                let raw = value_or_exit(&args, i, "--origin", &program);
                config.api_base = ClientConfig::api_base_for_origin(&raw)?;
                i += 2;
            }
            "--timeout" => {
                let raw = value_or_exit(&args, i, "--timeout", &program);
                let secs: u64 = raw.parse().with_context(|| format!("invalid --timeout '{}'", raw))?;
                config.request_timeout = Duration::from_secs(secs.max(1));
                i += 2;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            unk => {
                eprintln!("Unrecognized argument: {}", unk);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }

    info!(
        target: "medrec::startup",
        "medrec starting: api_base={}, timeout={:?}, notice_ttl={:?}",
        config.api_base, config.request_timeout, config.notice_ttl
    );

    let gateway = RemoteGateway::new(config.api_base.clone(), config.request_timeout)?;
    let surface = Arc::new(TerminalSurface::new());
    println!("medrec client for {}. Type 'help' for commands.", config.api_base);
    let portal = Portal::new(gateway, surface.clone(), config);

    let mut rl = DefaultEditor::new().context("failed to initialise line editor")?;
    loop {
        let p = prompt(portal.current_view(), portal.current_identity().as_ref());
        let line = match rl.readline(&p) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let trimmed = line.trim();
        let lower = trimmed.to_ascii_lowercase();
        // Never keep passwords in history
        if !trimmed.is_empty() && !lower.starts_with("login") && !lower.starts_with("register") {
            let _ = rl.add_history_entry(trimmed);
        }
        match parse_command(trimmed) {
            Ok(Command::Empty) => {}
            Ok(Command::Quit) => break,
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Status) => {
                println!("screen: {}", portal.current_view().label());
                match portal.current_identity() {
                    Some(id) => println!("user: {} (role {})", id.username(), id.role()),
                    None => println!("not logged in"),
                }
                println!("can add patients: {}", portal.capabilities().can_append_records);
                for n in surface.active_notices() {
                    println!("notice: {}", n.text);
                }
            }
            Ok(Command::Run(intent)) => {
                // Failures are already on screen via the surface
                if let Err(e) = portal.handle(intent).await {
                    debug!(target: "medrec::cli", "command failed: {}", e);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}
