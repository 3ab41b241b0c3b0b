use crate::app::App;
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use ictl_core::deploy::ServiceApi;
use serde_json::json;

#[derive(Subcommand)]
pub enum ServiceSubcommand {
    /// List services in the project
    List {
        /// Only services belonging to this stack
        #[arg(long)]
        stack_id: Option<String>,
    },
    /// Restart every replica of a service
    Restart { name: String },
    /// Delete a service
    Delete { name: String },
    /// List a service's replicas
    Replicas { name: String },
}

pub fn run(app: &App, subcommand: ServiceSubcommand) -> anyhow::Result<()> {
    let conn = app.connect(None, None)?;
    let (deploy, ctx) = (&conn.deploy, &conn.ctx);

    match subcommand {
        ServiceSubcommand::List { stack_id } => {
            let services = deploy.list_services(ctx, stack_id.as_deref())?;
            if app.json {
                return print_json(&services);
            }
            print_table(
                &["NAME", "STATUS", "REVISION", "ENDPOINT", "UPDATED"],
                services
                    .iter()
                    .map(|s| {
                        vec![
                            s.name.clone(),
                            or_dash(&s.status),
                            or_dash(&s.revision),
                            or_dash(&s.endpoint),
                            or_dash(&s.updated),
                        ]
                    })
                    .collect(),
                "no services",
            );
        }
        ServiceSubcommand::Restart { name } => {
            deploy.restart_service(ctx, &name)?;
            done(app, "restarted", &name)?;
        }
        ServiceSubcommand::Delete { name } => {
            deploy.delete_service(ctx, &name)?;
            done(app, "deleted", &name)?;
        }
        ServiceSubcommand::Replicas { name } => {
            let replicas = deploy.list_replicas(ctx, &name)?;
            if app.json {
                return print_json(&replicas);
            }
            print_table(
                &["NAME", "STATUS", "READY", "RESTARTS", "CREATED"],
                replicas
                    .iter()
                    .map(|r| {
                        vec![
                            r.name.clone(),
                            or_dash(&r.status),
                            r.ready.map_or_else(|| "-".to_string(), |b| b.to_string()),
                            r.restarts.map_or_else(|| "-".to_string(), |n| n.to_string()),
                            or_dash(&r.created),
                        ]
                    })
                    .collect(),
                &format!("no replicas for service '{name}'"),
            );
        }
    }
    Ok(())
}

fn done(app: &App, verb: &str, name: &str) -> anyhow::Result<()> {
    if app.json {
        print_json(&json!({ "service": name, "result": verb }))
    } else {
        println!("{verb} service '{name}'");
        Ok(())
    }
}
