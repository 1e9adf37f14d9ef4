//! Line-oriented interpreter over the session layer.
//!
//! Commands are parsed into [`Command`] and executed against a [`SessionStore`];
//! the result is a [`Reply`] so the terminal loop stays a thin shell.

use std::io::{self, BufRead, Write};

use crate::identity::{AuthProvider, SessionStore};
use crate::navigation::{self, Navigation};
use crate::storage::TokenStorage;

pub const HELP: &str = "Commands:
  login <user> <password>   sign in (credentials are form-posted to the token endpoint)
  logout                    forget the local session
  whoami                    show the signed-in identity (claims are not verified locally)
  open <path>               resolve a portal path, e.g. open /dashboard/doctor
  get <path>                authorized GET against the backend, e.g. get /patients/me/allergies
  status                    backend URL and session state
  help                      show this help
  quit | exit               leave the interpreter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Whoami,
    Open(String),
    Get(String),
    Status,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(head) = parts.first() else { return Command::Empty; };
    match (head.to_ascii_lowercase().as_str(), parts.len()) {
        ("login", 3) => Command::Login { username: parts[1].to_string(), password: parts[2].to_string() },
        ("login", _) => Command::Invalid("usage: login <user> <password>".into()),
        ("logout", 1) => Command::Logout,
        ("whoami", 1) => Command::Whoami,
        ("open", 2) => Command::Open(parts[1].to_string()),
        ("open", _) => Command::Invalid("usage: open <path>".into()),
        ("get", 2) => Command::Get(parts[1].to_string()),
        ("get", _) => Command::Invalid("usage: get <path>".into()),
        ("status", 1) => Command::Status,
        ("help", _) => Command::Help,
        ("quit", _) | ("exit", _) => Command::Quit,
        _ => Command::Invalid(format!("unknown command '{}'; type 'help'", head)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Error(String),
    Quit,
}

pub struct Interpreter<S: TokenStorage, P: AuthProvider> {
    store: SessionStore<S, P>,
    /// Destination remembered from the last redirect to the login screen.
    return_to: Option<String>,
}

impl<S: TokenStorage, P: AuthProvider> Interpreter<S, P> {
    pub fn new(store: SessionStore<S, P>) -> Self { Self { store, return_to: None } }

    pub fn store(&self) -> &SessionStore<S, P> { &self.store }

    pub async fn execute(&mut self, cmd: Command) -> Reply {
        match cmd {
            Command::Empty => Reply::Text(String::new()),
            Command::Help => Reply::Text(HELP.to_string()),
            Command::Quit => Reply::Quit,
            Command::Invalid(msg) => Reply::Error(msg),
            Command::Login { username, password } => match self.store.login(&username, &password).await {
                Ok(s) => {
                    let dest = navigation::after_login(&s, self.return_to.take().as_deref());
                    Reply::Text(format!("signed in as {} ({}); continue at {}", s.subject(), s.role(), dest))
                }
                Err(e) => {
                    tracing::debug!(target: "medledger::cli", "login error code={} err={}", e.code(), e);
                    Reply::Error(e.user_message())
                }
            },
            Command::Logout => {
                self.store.logout();
                self.return_to = None;
                Reply::Text("signed out".into())
            }
            Command::Whoami => match self.store.current() {
                Some(s) => Reply::Text(format!("{} ({}) [claims not verified locally]", s.subject(), s.role())),
                None => Reply::Text("not signed in".into()),
            },
            Command::Status => {
                let state = match self.store.current() {
                    Some(s) => format!("signed in as {}", s.subject()),
                    None => "signed out".to_string(),
                };
                Reply::Text(format!("backend: {}\nsession: {}", self.store.api().config().api_url, state))
            }
            Command::Open(path) => {
                let current = self.store.current();
                match navigation::navigate(&path, current.as_ref()) {
                    Navigation::Render(p) => Reply::Text(format!("render {}", p)),
                    Navigation::Redirect { to, return_to } => {
                        let msg = match &return_to {
                            Some(from) => format!("redirect {} (sign in to continue to {})", to, from),
                            None => format!("redirect {}", to),
                        };
                        // a redirect that does not remember a destination abandons the old one
                        self.return_to = return_to;
                        Reply::Text(msg)
                    }
                }
            }
            Command::Get(path) => match self.store.api().get_json(&path).await {
                Ok(v) => Reply::Text(serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string())),
                Err(e) => Reply::Error(e.to_string()),
            },
        }
    }
}

/// Read commands from stdin until `quit` or end of input.
pub fn run_repl<S: TokenStorage, P: AuthProvider>(
    rt: &tokio::runtime::Runtime,
    interp: &mut Interpreter<S, P>,
) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input = String::new();
    println!("medledger interpreter. Type 'help' for commands.");
    loop {
        input.clear();
        print!("> ");
        stdout.flush()?;
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let cmd = parse_command(input.trim());
        match rt.block_on(interp.execute(cmd)) {
            Reply::Quit => break,
            Reply::Text(t) if t.is_empty() => {}
            Reply::Text(t) => println!("{}", t),
            Reply::Error(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}
