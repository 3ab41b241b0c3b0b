use crate::app::App;
use crate::output::print_json;
use anyhow::Context as _;
use clap::Subcommand;
use ictl_core::platform::{Identity, PlatformClient};
use ictl_core::session::Cookie;
use ictl_core::transport::Credentials;
use serde_json::json;

// ---------------------------------------------------------------------------
// Subcommand tree
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum AuthSubcommand {
    /// Save session cookies from a browser login
    ///
    /// The cookies are checked against the platform before they are saved.
    Login {
        /// Session cookie as NAME=VALUE (repeatable)
        #[arg(long = "cookie", required = true, value_parser = parse_cookie)]
        cookies: Vec<(String, String)>,
        /// Cookie domain to record with the session
        #[arg(long)]
        domain: Option<String>,
    },
    /// Remove the saved session
    Logout,
    /// Show how requests are authenticated
    Status,
}

fn parse_cookie(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, _)) if name.trim().is_empty() => Err(format!("cookie name cannot be empty in: {s}")),
        Some((name, value)) => Ok((name.trim().to_string(), value.trim().to_string())),
        None => Err(format!("expected NAME=VALUE, got: {s}")),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(app: &App, subcommand: AuthSubcommand) -> anyhow::Result<()> {
    match subcommand {
        AuthSubcommand::Login { cookies, domain } => login(app, cookies, domain),
        AuthSubcommand::Logout => logout(app),
        AuthSubcommand::Status => status(app),
    }
}

fn login(app: &App, pairs: Vec<(String, String)>, domain: Option<String>) -> anyhow::Result<()> {
    let cookies: Vec<Cookie> = pairs
        .into_iter()
        .map(|(name, value)| Cookie {
            domain: domain.clone().unwrap_or_default(),
            ..Cookie::new(name, value)
        })
        .collect();

    let transport = app.transport_with(Credentials::cookies(cookies.clone()))?;
    let platform = PlatformClient::connect(transport)?;
    let orgs = platform
        .list_organizations()
        .context("session cookies were not accepted")?;

    let store = app.session();
    store.save(&cookies)?;
    tracing::info!(path = %store.path().display(), "session saved");

    if app.json {
        print_json(&json!({ "loggedIn": true, "organizations": orgs.len() }))?;
    } else {
        println!("logged in ({} organization(s) visible)", orgs.len());
    }
    Ok(())
}

fn logout(app: &App) -> anyhow::Result<()> {
    let removed = app.session().clear()?;
    if app.json {
        print_json(&json!({ "removed": removed }))?;
    } else if removed {
        println!("logged out");
    } else {
        println!("no saved session");
    }
    Ok(())
}

fn status(app: &App) -> anyhow::Result<()> {
    let identity = app.platform()?.whoami()?;
    if app.json {
        return print_json(&identity);
    }
    match identity {
        Identity::ApiKey { scope } => {
            println!("authenticated with API key");
            println!("organization: {} ({})", scope.org_label(), scope.org_id);
            println!("project:      {} ({})", scope.project_label(), scope.project_id);
        }
        Identity::Session { organizations } => {
            println!("authenticated with session cookies");
            for org in organizations {
                println!("  {} ({})", org.name, org.id);
            }
        }
    }
    Ok(())
}
