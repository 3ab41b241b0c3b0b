use clap::{Parser, Subcommand};
use ictl_cli::app::{App, GlobalArgs};
use ictl_cli::cmd::{
    self, auth::AuthSubcommand, image::ImageSubcommand, org::OrgSubcommand,
    project::ProjectSubcommand, replica::ReplicaSubcommand, secret::SecretSubcommand,
    service::ServiceSubcommand, stack::StackSubcommand,
};
use ictl_core::cancel::CancelToken;

#[derive(Parser)]
#[command(
    name = "ictl",
    about = "Deploy and manage container services on the Interactive platform",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    globals: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, log out, and show the active credentials
    Auth {
        #[command(subcommand)]
        subcommand: AuthSubcommand,
    },

    /// List and select organizations
    Org {
        #[command(subcommand)]
        subcommand: OrgSubcommand,
    },

    /// List and select projects
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Apply or preview a stack manifest
    Stack {
        #[command(subcommand)]
        subcommand: StackSubcommand,
    },

    /// Inspect and manage services
    Service {
        #[command(subcommand)]
        subcommand: ServiceSubcommand,
    },

    /// Inspect replicas and read their logs
    Replica {
        #[command(subcommand)]
        subcommand: ReplicaSubcommand,
    },

    /// Manage project secrets
    Secret {
        #[command(subcommand)]
        subcommand: SecretSubcommand,
    },

    /// List and upload container images
    Image {
        #[command(subcommand)]
        subcommand: ImageSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancelToken::new();
    watch_interrupts(cancel.clone());

    let result = App::new(cli.globals, cancel).and_then(|app| match cli.command {
        Commands::Auth { subcommand } => cmd::auth::run(&app, subcommand),
        Commands::Org { subcommand } => cmd::org::run(&app, subcommand),
        Commands::Project { subcommand } => cmd::project::run(&app, subcommand),
        Commands::Stack { subcommand } => cmd::stack::run(&app, subcommand),
        Commands::Service { subcommand } => cmd::service::run(&app, subcommand),
        Commands::Replica { subcommand } => cmd::replica::run(&app, subcommand),
        Commands::Secret { subcommand } => cmd::secret::run(&app, subcommand),
        Commands::Image { subcommand } => cmd::image::run(&app, subcommand),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// First Ctrl-C cancels the running operation at its next checkpoint; a
/// second one exits immediately.
fn watch_interrupts(cancel: CancelToken) {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::warn!("cannot install Ctrl-C handler: {e}");
                return;
            }
        };
        rt.block_on(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            eprintln!("\ninterrupted: stopping after the current request (Ctrl-C again to quit)");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    });
}
