use crate::app::App;
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use serde_json::json;

#[derive(Subcommand)]
pub enum OrgSubcommand {
    /// List organizations visible to the current credentials
    List,
    /// Make an organization the default for later commands
    ///
    /// Clears the selected project.
    Select {
        /// Organization name (case-insensitive)
        name: String,
    },
}

pub fn run(app: &App, subcommand: OrgSubcommand) -> anyhow::Result<()> {
    match subcommand {
        OrgSubcommand::List => list(app),
        OrgSubcommand::Select { name } => select(app, &name),
    }
}

fn list(app: &App) -> anyhow::Result<()> {
    let orgs = app.platform()?.list_organizations()?;
    if app.json {
        return print_json(&orgs);
    }
    let prefs = app.preferences()?;
    let selected = prefs.organization().map(str::to_lowercase);
    print_table(
        &["", "NAME", "ID", "PROJECTS", "ROLE"],
        orgs.iter()
            .map(|o| {
                let mark = if selected.as_deref() == Some(o.name.to_lowercase().as_str()) {
                    "*"
                } else {
                    ""
                };
                vec![
                    mark.to_string(),
                    o.name.clone(),
                    o.id.clone(),
                    o.project_count.to_string(),
                    or_dash(&o.role),
                ]
            })
            .collect(),
        "no organizations",
    );
    Ok(())
}

fn select(app: &App, name: &str) -> anyhow::Result<()> {
    let id = app.platform()?.get_org_id_by_name(name)?;
    let mut prefs = app.preferences()?;
    prefs.select_organization(name.trim());
    prefs.save(app.config_dir())?;

    if app.json {
        print_json(&json!({ "organization": name.trim(), "id": id }))?;
    } else {
        println!("selected organization '{}'", name.trim());
    }
    Ok(())
}
