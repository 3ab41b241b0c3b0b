use crate::app::App;
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use serde_json::json;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Subcommand tree
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum SecretSubcommand {
    /// List secrets in the project (names and keys only)
    List,
    /// Show one secret
    Get {
        name: String,
        /// Print values as well as key names
        #[arg(long)]
        reveal: bool,
    },
    /// Create a secret from KEY=VALUE pairs
    Create {
        name: String,
        #[arg(required = true, value_parser = parse_kv)]
        pairs: Vec<(String, String)>,
    },
    /// Replace every key of an existing secret
    Replace {
        name: String,
        #[arg(required = true, value_parser = parse_kv)]
        pairs: Vec<(String, String)>,
    },
    /// Set a single key, leaving the others as they are
    SetKey {
        name: String,
        key: String,
        value: String,
    },
    /// Delete a secret
    Delete { name: String },
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_kv(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, _)) if k.trim().is_empty() => Err(format!("key cannot be empty in: {s}")),
        Some((k, v)) => Ok((k.trim().to_string(), v.to_string())),
        None => Err(format!("expected KEY=VALUE, got: {s}")),
    }
}

fn to_data(pairs: Vec<(String, String)>) -> BTreeMap<String, String> {
    pairs.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(app: &App, subcommand: SecretSubcommand) -> anyhow::Result<()> {
    let conn = app.connect(None, None)?;
    let (deploy, ctx) = (&conn.deploy, &conn.ctx);

    match subcommand {
        SecretSubcommand::List => {
            let secrets = deploy.list_secrets(ctx)?;
            if app.json {
                return print_json(&secrets);
            }
            print_table(
                &["NAME", "KEYS", "UPDATED"],
                secrets
                    .iter()
                    .map(|s| vec![s.name.clone(), or_dash(&s.keys.join(",")), or_dash(&s.updated)])
                    .collect(),
                "no secrets",
            );
        }
        SecretSubcommand::Get { name, reveal } => {
            let mut secret = deploy.get_secret(ctx, &name)?;
            if !reveal {
                secret.data = None;
            }
            if app.json {
                return print_json(&secret);
            }
            println!("{}", secret.name);
            for key in &secret.keys {
                match secret.data.as_ref().and_then(|d| d.get(key)) {
                    Some(value) => println!("  {key}={value}"),
                    None => println!("  {key}"),
                }
            }
        }
        SecretSubcommand::Create { name, pairs } => {
            let data = to_data(pairs);
            deploy.create_secret(ctx, &name, &data)?;
            done(app, "created", &name, data.len())?;
        }
        SecretSubcommand::Replace { name, pairs } => {
            let data = to_data(pairs);
            deploy.replace_secret(ctx, &name, &data)?;
            done(app, "replaced", &name, data.len())?;
        }
        SecretSubcommand::SetKey { name, key, value } => {
            deploy.update_secret_key(ctx, &name, &key, &value)?;
            if app.json {
                print_json(&json!({ "secret": name, "key": key, "result": "set" }))?;
            } else {
                println!("set key '{key}' in secret '{name}'");
            }
        }
        SecretSubcommand::Delete { name } => {
            deploy.delete_secret(ctx, &name)?;
            done(app, "deleted", &name, 0)?;
        }
    }
    Ok(())
}

fn done(app: &App, verb: &str, name: &str, keys: usize) -> anyhow::Result<()> {
    if app.json {
        return print_json(&json!({ "secret": name, "result": verb, "keys": keys }));
    }
    if keys > 0 {
        println!("{verb} secret '{name}' ({keys} key(s))");
    } else {
        println!("{verb} secret '{name}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_pairs_win_for_repeated_keys() {
        let pairs = vec![
            parse_kv("A=1").unwrap(),
            parse_kv("B= spaced ").unwrap(),
            parse_kv("A=2").unwrap(),
        ];
        let data = to_data(pairs);
        assert_eq!(data["A"], "2");
        assert_eq!(data["B"], " spaced ");
        assert!(parse_kv("=x").is_err());
    }
}
