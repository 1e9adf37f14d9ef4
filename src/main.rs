//!
//! medledger CLI binary
//! --------------------
//! Interactive front end for the MedLedger portal session layer: sign in against the
//! backend token endpoint, inspect the (unverified) identity, resolve dashboard
//! paths through the role guard and issue authorized GETs.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use medledger::api::ApiClient;
use medledger::cli::{run_repl, Command, Interpreter, Reply};
use medledger::config::PortalConfig;
use medledger::identity::{HttpAuthProvider, SessionStore};
use medledger::storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--token-dir <path>] [--memory] [--user <u> --password <p>]\n\nFlags:\n  --api <url>          Backend base URL (env MEDLEDGER_API_URL, default http://localhost:5000)\n  --token-dir <path>   Directory holding the persisted session (env MEDLEDGER_TOKEN_DIR, default .medledger)\n  --memory             Keep the session in memory only; nothing survives the process\n  --user <u>           Sign in at startup (requires --password)\n  --password <p>       Password for --user\n  -h, --help           Show this help\n\n{}",
        medledger::cli::HELP
    );
}

struct Args {
    api: Option<String>,
    token_dir: Option<String>,
    memory: bool,
    user: Option<String>,
    password: Option<String>,
}

fn parse_args(program: &str, args: &[String]) -> Args {
    let mut out = Args { api: None, token_dir: None, memory: false, user: None, password: None };
    let mut i = 0;
    while i < args.len() {
        let needs_value = |i: usize, flag: &str| {
            if i + 1 >= args.len() {
                eprintln!("{} requires a value", flag);
                print_usage(program);
                std::process::exit(2);
            }
        };
        match args[i].as_str() {
            "--api" => { needs_value(i, "--api"); out.api = Some(args[i + 1].clone()); i += 2; }
            "--token-dir" => { needs_value(i, "--token-dir"); out.token_dir = Some(args[i + 1].clone()); i += 2; }
            "--user" => { needs_value(i, "--user"); out.user = Some(args[i + 1].clone()); i += 2; }
            "--password" => { needs_value(i, "--password"); out.password = Some(args[i + 1].clone()); i += 2; }
            "--memory" => { out.memory = true; i += 1; }
            "-h" | "--help" => { print_usage(program); std::process::exit(0); }
            other => {
                eprintln!("unknown argument: {}", other);
                print_usage(program);
                std::process::exit(2);
            }
        }
    }
    if out.user.is_some() != out.password.is_some() {
        eprintln!("--user and --password must be given together");
        print_usage(program);
        std::process::exit(2);
    }
    out
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid RUST_LOG filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut argv: Vec<String> = env::args().collect();
    let program = argv.remove(0);
    let args = parse_args(&program, &argv);

    let env_cfg = PortalConfig::from_env()?;
    let cfg = PortalConfig::new(
        args.api.as_deref().unwrap_or(env_cfg.api_url.as_str()),
        args.token_dir.as_ref().map(PathBuf::from).unwrap_or_else(|| env_cfg.token_dir.clone()),
        env_cfg.timeout,
    )?;
    info!(
        target: "medledger",
        "medledger starting: api='{}', token_dir='{}', memory={}, timeout_secs={}",
        cfg.api_url, cfg.token_dir.display(), args.memory, cfg.timeout.as_secs()
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;

    if args.memory {
        run(&rt, &cfg, MemoryTokenStorage::new(), &args)
    } else {
        run(&rt, &cfg, FileTokenStorage::new(&cfg.token_dir), &args)
    }
}

fn run<S: TokenStorage>(rt: &tokio::runtime::Runtime, cfg: &PortalConfig, storage: S, args: &Args) -> Result<()> {
    let api = ApiClient::new(cfg)?;
    let provider = HttpAuthProvider::new(api.clone());
    let store = SessionStore::open(storage, provider, api);
    let mut interp = Interpreter::new(store);

    if let Some(s) = interp.store().current() {
        println!("restored session for {} ({})", s.subject(), s.role());
    }

    if let (Some(u), Some(p)) = (&args.user, &args.password) {
        let cmd = Command::Login { username: u.clone(), password: p.clone() };
        match rt.block_on(interp.execute(cmd)) {
            Reply::Text(t) => println!("{}", t),
            Reply::Error(e) => eprintln!("error: {}", e),
            Reply::Quit => {}
        }
    }

    run_repl(rt, &mut interp).context("terminal I/O failed")?;
    Ok(())
}
