//! Session CLI
//!
//! Logs into a credential server, keeps the session verified in the
//! background, and prints every session change until told to stop.
//!
//! ```text
//! TOLLGATE_BASE_URL=http://127.0.0.1:3000/api \
//!   cargo run -p session-cli -- login alice --watch 30 --logout
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tollgate::prelude::*;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "session-cli", version, about = "Tollgate session lifecycle demo")]
struct Cli {
    /// Credential server origin, including any path prefix.
    #[arg(long, env = "TOLLGATE_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Directory for the persisted profile snapshot.
    #[arg(long, env = "TOLLGATE_STATE_DIR", default_value = ".tollgate")]
    state_dir: PathBuf,

    /// Seconds between background verifications.
    #[arg(long, env = "TOLLGATE_POLL_SECS", default_value_t = 5)]
    poll_secs: u64,

    /// Per-request timeout in seconds.
    #[arg(long, env = "TOLLGATE_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Fallback log filter when RUST_LOG is unset.
    #[arg(long, default_value = "info,tollgate=debug")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in, then optionally watch the session.
    Login {
        username: String,
        #[arg(long, env = "TOLLGATE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Keep verifying for this many seconds.
        #[arg(long)]
        watch: Option<u64>,
        /// Log out before exiting.
        #[arg(long)]
        logout: bool,
    },
    /// Create an account.
    Register {
        username: String,
        email: String,
        #[arg(long, env = "TOLLGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the remembered profile and ask the server whether it is valid.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), TollgateError> {
    let cli = Cli::parse();
    tollgate::telemetry::init(&cli.log);

    let mut config = AuthConfig::with_base_url(cli.base_url.clone());
    config.poll = PollConfig::with_interval(Duration::from_secs(cli.poll_secs));
    config.http.timeout = Duration::from_secs(cli.timeout_secs);

    let auth = AuthContextBuilder::new()
        .config(config)
        .state_dir(&cli.state_dir)
        .build_http()?;

    match cli.command {
        Command::Login {
            username,
            password,
            watch,
            logout,
        } => {
            match auth.login(LoginRequest::new(username, password)).await {
                Ok(ok) => println!("logged in as {} ({})", ok.identity.username, ok.message),
                Err(failure) => {
                    println!("login failed [{}]: {}", failure.code, failure.message);
                    return Ok(());
                }
            }
            if let Some(secs) = watch {
                watch_session(&auth, Duration::from_secs(secs)).await;
            }
            if logout {
                match auth.logout().await {
                    Ok(()) => println!("logged out"),
                    Err(failure) => {
                        println!("logout failed [{}]: {}", failure.code, failure.message)
                    }
                }
            }
        }
        Command::Register {
            username,
            email,
            password,
        } => match auth
            .register(RegisterRequest::new(username, email, password))
            .await
        {
            Ok(ok) => println!("registered {}: {}", ok.identity.username, ok.message),
            Err(failure) => println!("registration failed [{}]: {}", failure.code, failure.message),
        },
        Command::Status => {
            let valid = auth.restore().await;
            print_session(&auth.session());
            println!("verified: {valid}");
        }
    }

    auth.shutdown();
    Ok(())
}

/// Prints each session change until `duration` passes, Ctrl-C, or the
/// session stops being valid.
async fn watch_session<T: CredentialTransport>(auth: &AuthContext<T>, duration: Duration) {
    let mut rx = auth.subscribe();
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    info!(secs = duration.as_secs(), "watching session");

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = rx.borrow_and_update().clone();
                print_session(&session);
                if matches!(session.auth, AuthState::Invalid(_)) {
                    break;
                }
            }
        }
    }
}

fn print_session(session: &Session) {
    println!(
        "state={} user={} email={} subscribed={}{}",
        session.auth.name(),
        session.profile.username.as_deref().unwrap_or("-"),
        session.profile.email.as_deref().unwrap_or("-"),
        session.subscribed,
        session
            .error
            .as_deref()
            .map(|e| format!(" error={e:?}"))
            .unwrap_or_default(),
    );
}
