//! Stack reconciler: converge a project's services for one stack id to the
//! services a manifest declares.
//!
//! One pass over the desired services decides create or update, then one
//! pass over the existing services decides delete. Creates and updates run
//! in manifest order; deletes run only after every desired service was
//! submitted. The first failing call stops the run. Nothing already applied
//! is rolled back.

use crate::cancel::CancelToken;
use crate::context::Context;
use crate::deploy::{RemoteService, ServiceApi};
use crate::error::{IctlError, Result};
use crate::manifest::StackManifest;
use serde::Serialize;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub action: Action,
    pub service: String,
}

/// Ordered operations a reconcile would issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub stack_id: String,
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn services(&self, action: Action) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.action == action)
            .map(|s| s.service.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Diff desired against existing. Service names compare exactly.
pub fn plan(manifest: &StackManifest, existing: &[RemoteService]) -> Plan {
    let existing_names: HashSet<&str> = existing.iter().map(|s| s.name.as_str()).collect();

    let mut steps: Vec<Step> = manifest
        .services
        .names()
        .map(|name| Step {
            action: if existing_names.contains(name) {
                Action::Update
            } else {
                Action::Create
            },
            service: name.to_string(),
        })
        .collect();

    let mut seen = HashSet::new();
    for remote in existing {
        let name = remote.name.as_str();
        if manifest.services.contains(name) || !seen.insert(name) {
            continue;
        }
        steps.push(Step {
            action: Action::Delete,
            service: name.to_string(),
        });
    }

    Plan {
        stack_id: manifest.stack_id.clone(),
        steps,
    }
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl ReconcileResult {
    fn record(&mut self, action: Action, service: &str) {
        let list = match action {
            Action::Create => &mut self.created,
            Action::Update => &mut self.updated,
            Action::Delete => &mut self.deleted,
        };
        list.push(service.to_string());
    }
}

/// Fetch the stack's current services and compute the plan without
/// changing anything.
pub fn dry_run<A: ServiceApi>(
    api: &A,
    ctx: &Context,
    manifest: &StackManifest,
    cancel: &CancelToken,
) -> Result<Plan> {
    let existing = list_stack(api, ctx, manifest, cancel)?;
    Ok(plan(manifest, &existing))
}

pub fn reconcile<A: ServiceApi>(
    api: &A,
    ctx: &Context,
    manifest: &StackManifest,
    cancel: &CancelToken,
) -> Result<ReconcileResult> {
    let existing = list_stack(api, ctx, manifest, cancel)?;
    let plan = plan(manifest, &existing);
    let stack_id = manifest.stack_id.as_str();

    let mut result = ReconcileResult::default();
    for step in &plan.steps {
        cancel.check()?;
        let name = step.service.as_str();
        let outcome = match step.action {
            Action::Create | Action::Update => {
                // Every desired step names a service from the manifest.
                let Some(spec) = manifest.services.get(name) else {
                    continue;
                };
                let body = spec.to_request(stack_id);
                if step.action == Action::Create {
                    api.create_service(ctx, name, &body)
                } else {
                    api.update_service(ctx, name, &body)
                }
            }
            Action::Delete => api.delete_service(ctx, name),
        };
        outcome.map_err(|cause| IctlError::Reconcile {
            action: step.action.as_str(),
            service: name.to_string(),
            cause: Box::new(cause),
        })?;
        tracing::info!(action = step.action.as_str(), service = name, stack_id, "applied");
        result.record(step.action, name);
    }
    Ok(result)
}

fn list_stack<A: ServiceApi>(
    api: &A,
    ctx: &Context,
    manifest: &StackManifest,
    cancel: &CancelToken,
) -> Result<Vec<RemoteService>> {
    // Without a stack id the listing would cover the whole project and
    // every service in it would be a delete candidate.
    if manifest.stack_id.trim().is_empty() {
        return Err(IctlError::validation("manifest", "stack-id", "must not be empty"));
    }
    cancel.check()?;
    let existing = api.list_services(ctx, Some(&manifest.stack_id))?;
    tracing::debug!(stack_id = %manifest.stack_id, count = existing.len(), "listed stack services");
    Ok(existing)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
