use crate::app::App;
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use ictl_core::context::resolve_organization;
use serde_json::json;

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// List projects in an organization (--org or the selected one)
    List,
    /// Make a project the default for later commands
    Select {
        /// Project name (case-insensitive)
        name: String,
    },
}

pub fn run(app: &App, subcommand: ProjectSubcommand) -> anyhow::Result<()> {
    match subcommand {
        ProjectSubcommand::List => list(app),
        ProjectSubcommand::Select { name } => select(app, &name),
    }
}

fn list(app: &App) -> anyhow::Result<()> {
    let prefs = app.preferences()?;
    let org = resolve_organization(None, app.flag_org(), &prefs)?;
    let platform = app.platform()?;
    let org_id = platform.get_org_id_by_name(&org)?;
    let projects = platform.list_projects(&org_id)?;
    if app.json {
        return print_json(&projects);
    }
    print_table(
        &["NAME", "ID", "ROLE"],
        projects
            .iter()
            .map(|p| vec![p.name.clone(), p.id.clone(), or_dash(&p.role)])
            .collect(),
        &format!("no projects in organization '{org}'"),
    );
    Ok(())
}

/// The saved organization is left alone, even when `--org` named another
/// one for the lookup.
fn select(app: &App, name: &str) -> anyhow::Result<()> {
    let mut prefs = app.preferences()?;
    let org = resolve_organization(None, app.flag_org(), &prefs)?;
    let platform = app.platform()?;
    let org_id = platform.get_org_id_by_name(&org)?;
    let project = platform.get_project_by_name(&org_id, name)?;

    prefs.select_project(project.name.clone());
    prefs.save(app.config_dir())?;

    if app.json {
        print_json(&json!({ "organization": org, "project": project.name, "id": project.id }))?;
    } else {
        println!("selected project '{}' in organization '{org}'", project.name);
    }
    Ok(())
}
