use crate::app::App;
use crate::output::print_json;
use anyhow::Context as _;
use clap::Subcommand;
use ictl_core::IctlError;
use std::io::{Read, Write};

#[derive(Subcommand)]
pub enum ReplicaSubcommand {
    /// Print a replica's full description as JSON
    Describe { replica: String },
    /// Print a replica's logs
    Logs {
        replica: String,
        /// Keep streaming new lines until interrupted
        #[arg(long, short = 'f')]
        follow: bool,
    },
}

pub fn run(app: &App, subcommand: ReplicaSubcommand) -> anyhow::Result<()> {
    let conn = app.connect(None, None)?;
    match subcommand {
        ReplicaSubcommand::Describe { replica } => {
            let detail = conn.deploy.describe_replica(&conn.ctx, &replica)?;
            print_json(&detail)
        }
        ReplicaSubcommand::Logs { replica, follow } => {
            let mut stream = conn.deploy.get_logs(&conn.ctx, &replica, follow)?;
            let stdout = std::io::stdout();
            let copied = pump(&mut stream, &mut stdout.lock(), app);
            stream.close();
            copied.context("log stream interrupted")
        }
    }
}

/// Copy the stream to `out` until EOF or cancellation.
fn pump(stream: &mut impl Read, out: &mut impl Write, app: &App) -> anyhow::Result<()> {
    let mut buf = [0u8; 8 * 1024];
    loop {
        app.cancel().check()?;
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) if app.cancel().is_cancelled() => return Err(IctlError::Cancelled.into()),
            Err(e) => return Err(e.into()),
        };
        out.write_all(&buf[..n])?;
        out.flush()?;
    }
    Ok(())
}
