//! Per-invocation state shared by every command: global flags, the config
//! directory, and the clients built from the stored credentials.

use anyhow::Context as _;
use clap::Args;
use ictl_core::cancel::CancelToken;
use ictl_core::context::{resolve_organization, resolve_project, Context};
use ictl_core::deploy::DeployClient;
use ictl_core::paths;
use ictl_core::platform::PlatformClient;
use ictl_core::preferences::Preferences;
use ictl_core::session::SessionStore;
use ictl_core::transport::{Credentials, Transport};
use ictl_core::IctlError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// API key as publicKey:secretKey (overrides the login session)
    #[arg(long, global = true, env = "INTERACTIVE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Organization name (default: the selected organization)
    #[arg(long, global = true)]
    pub org: Option<String>,

    /// Project name (default: the selected project)
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    pub json: bool,
}

/// A resolved project plus the client that acts on it.
pub struct Connected {
    pub deploy: DeployClient,
    pub ctx: Context,
}

pub struct App {
    pub json: bool,
    api_key: Option<String>,
    org: Option<String>,
    project: Option<String>,
    config_dir: PathBuf,
    cancel: CancelToken,
}

impl App {
    pub fn new(globals: GlobalArgs, cancel: CancelToken) -> anyhow::Result<Self> {
        let config_dir = paths::config_dir()?;
        Ok(App {
            json: globals.json,
            api_key: globals.api_key,
            org: globals.org,
            project: globals.project,
            config_dir,
            cancel,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn cancel(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn flag_org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    pub fn flag_project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn preferences(&self) -> anyhow::Result<Preferences> {
        Preferences::load(&self.config_dir).context("failed to read preferences")
    }

    pub fn session(&self) -> SessionStore {
        SessionStore::new(&self.config_dir)
    }

    /// API key when given, else the saved login session.
    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(Credentials::api_key(key));
        }
        let cookies = self.session().load().context("failed to read session")?;
        if cookies.is_empty() {
            return Err(IctlError::Unauthenticated.into());
        }
        Ok(Credentials::cookies(cookies))
    }

    pub fn transport_with(&self, credentials: Credentials) -> anyhow::Result<Arc<Transport>> {
        let base = paths::api_base_url();
        let transport = Transport::new(&base, credentials)?.with_cancel(self.cancel.clone());
        Ok(Arc::new(transport))
    }

    pub fn transport(&self) -> anyhow::Result<Arc<Transport>> {
        self.transport_with(self.credentials()?)
    }

    pub fn platform(&self) -> anyhow::Result<PlatformClient> {
        Ok(PlatformClient::connect(self.transport()?)?)
    }

    /// Resolve the target project once and build the deployment client for it.
    ///
    /// Manifest values win over `--org`/`--project`, which win over the
    /// saved selection.
    pub fn connect(
        &self,
        manifest_org: Option<&str>,
        manifest_project: Option<&str>,
    ) -> anyhow::Result<Connected> {
        let prefs = self.preferences()?;
        let org = resolve_organization(manifest_org, self.flag_org(), &prefs)?;
        let project = resolve_project(manifest_project, self.flag_project(), &prefs)?;

        let transport = self.transport()?;
        let platform = PlatformClient::connect(Arc::clone(&transport))?;
        let ctx = platform
            .get_project_id(&org, &project)
            .with_context(|| format!("cannot resolve project '{project}' in organization '{org}'"))?;
        tracing::debug!(org_id = %ctx.org_id, project_id = %ctx.project_id, "context resolved");

        Ok(Connected {
            deploy: DeployClient::new(transport),
            ctx,
        })
    }
}
