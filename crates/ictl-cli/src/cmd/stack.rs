use crate::app::App;
use crate::output::print_json;
use anyhow::Context as _;
use clap::Subcommand;
use ictl_core::manifest::StackManifest;
use ictl_core::reconcile::{self, Action, Plan, ReconcileResult};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum StackSubcommand {
    /// Converge the project's services for the manifest's stack id
    ///
    /// Creates missing services, updates existing ones, and deletes services
    /// of the same stack that the manifest no longer declares.
    Apply {
        /// Stack manifest (YAML)
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
    /// Show what `stack apply` would do without changing anything
    Plan {
        /// Stack manifest (YAML)
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
}

pub fn run(app: &App, subcommand: StackSubcommand) -> anyhow::Result<()> {
    match subcommand {
        StackSubcommand::Apply { file } => apply(app, &file),
        StackSubcommand::Plan { file } => plan(app, &file),
    }
}

fn load(path: &Path) -> anyhow::Result<StackManifest> {
    StackManifest::load(path).with_context(|| format!("failed to load manifest {}", path.display()))
}

fn apply(app: &App, path: &Path) -> anyhow::Result<()> {
    let manifest = load(path)?;
    let conn = app.connect(Some(&manifest.organization), Some(&manifest.project))?;
    let result = reconcile::reconcile(&conn.deploy, &conn.ctx, &manifest, app.cancel())
        .with_context(|| format!("stack '{}' not fully applied", manifest.stack_id))?;

    if app.json {
        return print_json(&result);
    }
    print_result(&manifest.stack_id, &result);
    Ok(())
}

fn plan(app: &App, path: &Path) -> anyhow::Result<()> {
    let manifest = load(path)?;
    let conn = app.connect(Some(&manifest.organization), Some(&manifest.project))?;
    let plan = reconcile::dry_run(&conn.deploy, &conn.ctx, &manifest, app.cancel())?;

    if app.json {
        return print_json(&plan);
    }
    print_plan(&plan);
    Ok(())
}

fn print_result(stack_id: &str, result: &ReconcileResult) {
    for name in &result.created {
        println!("created  {name}");
    }
    for name in &result.updated {
        println!("updated  {name}");
    }
    for name in &result.deleted {
        println!("deleted  {name}");
    }
    println!(
        "stack '{stack_id}': {} created, {} updated, {} deleted",
        result.created.len(),
        result.updated.len(),
        result.deleted.len()
    );
}

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("stack '{}': nothing to do", plan.stack_id);
        return;
    }
    for step in &plan.steps {
        let mark = match step.action {
            Action::Create => '+',
            Action::Update => '~',
            Action::Delete => '-',
        };
        println!("{mark} {}", step.service);
    }
    println!(
        "stack '{}': {} to create, {} to update, {} to delete",
        plan.stack_id,
        plan.services(Action::Create).len(),
        plan.services(Action::Update).len(),
        plan.services(Action::Delete).len()
    );
}
