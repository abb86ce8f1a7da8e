//! carbon - command-line client for the carbon service.
//!
//! Signs in, remembers the session in local storage and prints the user's
//! schools and colour theme.

mod cli;
mod config;
mod session;

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use carbon_core::api::{ApiClient, HttpTransport, Transport};
use carbon_core::models::User;
use carbon_core::{Entity, Storage};

use cli::{Args, Commands};
use config::Config;
use session::{Session, SessionData};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level (e.g. RUST_LOG=carbon_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let args = Args::parse();

    let mut config = Config::load()?;
    let base_url = config.base_url(args.url.as_deref());
    debug!(base_url = %base_url, "Using server");

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
    let client = Arc::new(ApiClient::new(Arc::clone(&transport), &base_url));
    let mut session = Session::new(Storage::new(config.data_dir()?, config.storage_key()));

    match args.command {
        Commands::Login { email, password } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => bail!("No email given and none remembered"),
            };
            let password = read_password(password, "Password: ")?;

            let mut user = User::new(client);
            report_errors(&user);
            if !user.login(&email, &password).await {
                bail!("Login failed");
            }
            let data = SessionData::from_user(&user).context("Server returned no session")?;
            session.save(&data)?;

            config.last_email = Some(email);
            config.save()?;
            info!(user = %user, "Session stored");
            println!("Logged in as {}", user);
        }

        Commands::Logout => {
            session.clear()?;
            println!("Logged out");
        }

        Commands::Register { email, password } => {
            let password = read_password(password, "New password: ")?;
            if !User::register(transport.as_ref(), &base_url, &email, &password).await {
                bail!("Registration failed");
            }
            println!("Registered {}", email);
        }

        Commands::Whoami => {
            let mut user = restore(client, &mut session)?;
            user.fetch().await;
            if args.json {
                print_json(&user.to_json())?;
            } else {
                println!("{}", user);
            }
        }

        Commands::Schools { force } => {
            let user = restore(client, &mut session)?;
            let schools = user.schools.fetch_all(force).await?;
            if args.json {
                print_json(&user.schools.to_json())?;
            } else if schools.is_empty() {
                println!("No schools");
            } else {
                for school in schools.values() {
                    match &school.info {
                        Some(info) => println!("{}  v{}", school, info.server_version),
                        None => println!("{}", school),
                    }
                }
            }
        }

        Commands::School { usid } => {
            let user = restore(client, &mut session)?;
            let school = user.schools.fetch_one(&usid, false).await?;
            if args.json {
                print_json(&school.to_json())?;
            } else {
                println!("{}", school);
                if let Some(info) = &school.info {
                    println!("  server version: {}", info.server_version);
                    println!("  self-hosted:    {}", info.selfhosted);
                }
            }
        }

        Commands::Theme => {
            let mut user = restore(client, &mut session)?;
            user.color_theme.fetch().await;
            if args.json {
                print_json(&user.color_theme.to_json())?;
            } else {
                for color in &user.color_theme.colors {
                    println!("{}  {}", color, color.to_rgba());
                }
            }
        }

        Commands::Passwd { password } => {
            let user = restore(client, &mut session)?;
            let password = read_password(password, "New password: ")?;
            if !user.change_password(&password).await {
                bail!("Password change failed");
            }
            println!("Password changed");
        }
    }

    Ok(())
}

/// Rebuild the signed-in user from the stored session.
fn restore(client: Arc<ApiClient>, session: &mut Session) -> Result<User> {
    let data = session
        .load()
        .ok_or_else(|| anyhow::anyhow!("Not logged in. Run `carbon login` first."))?;
    let user = User::from_session(client, data.uuid, data.verification_key);
    report_errors(&user);
    Ok(user)
}

fn report_errors(user: &User) {
    user.events().on_error(|e| {
        eprintln!("error: {} failed ({}): {}", e.origin, e.code, e.message);
    });
}

fn read_password(given: Option<String>, prompt: &str) -> Result<String> {
    match given {
        Some(password) => Ok(password),
        None => rpassword::prompt_password(prompt).context("Failed to read password"),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
