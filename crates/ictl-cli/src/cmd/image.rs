use crate::app::App;
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context as _;
use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);

#[derive(Subcommand)]
pub enum ImageSubcommand {
    /// List images stored in the project
    List,
    /// Upload an image tarball (as written by `docker save`)
    Upload {
        /// Image name
        #[arg(long)]
        name: String,
        /// Image tag
        #[arg(long)]
        tag: String,
        /// Path to the image tar file
        file: PathBuf,
    },
}

pub fn run(app: &App, subcommand: ImageSubcommand) -> anyhow::Result<()> {
    match subcommand {
        ImageSubcommand::List => list(app),
        ImageSubcommand::Upload { name, tag, file } => upload(app, &name, &tag, file),
    }
}

fn list(app: &App) -> anyhow::Result<()> {
    let conn = app.connect(None, None)?;
    let images = conn.deploy.list_images(&conn.ctx)?;
    if app.json {
        return print_json(&images);
    }
    print_table(
        &["NAME", "TAGS", "SIZE", "CREATED"],
        images
            .iter()
            .map(|i| {
                vec![
                    i.name.clone(),
                    or_dash(&i.all_tags().join(",")),
                    i.size.map_or_else(|| "-".to_string(), human_size),
                    or_dash(&i.created),
                ]
            })
            .collect(),
        "no images",
    );
    Ok(())
}

fn upload(app: &App, name: &str, tag: &str, file: PathBuf) -> anyhow::Result<()> {
    let tar = std::fs::File::open(&file)
        .with_context(|| format!("cannot open image tarball {}", file.display()))?;
    let size = tar.metadata().map(|m| m.len()).unwrap_or(0);

    let conn = app.connect(None, None)?;
    let label = format!("uploading {name}:{tag} ({})", human_size(size));
    with_ticker(&label, || conn.deploy.upload_image(&conn.ctx, name, tag, tar))?;

    if app.json {
        print_json(&json!({ "image": name, "tag": tag, "bytes": size }))?;
    } else {
        println!("uploaded {name}:{tag}");
    }
    Ok(())
}

/// Print `label` then one dot per second on stderr while `work` runs.
fn with_ticker<T>(label: &str, work: impl FnOnce() -> T) -> T {
    eprint!("{label}");
    let (stop, ticks) = mpsc::channel::<()>();
    let ticker = std::thread::spawn(move || {
        while let Err(RecvTimeoutError::Timeout) = ticks.recv_timeout(TICK) {
            eprint!(".");
        }
    });

    let out = work();
    drop(stop);
    let _ = ticker.join();
    eprintln!();
    out
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
