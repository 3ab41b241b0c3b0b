//! Which organization and project a command targets.
//!
//! Names come from three places, highest precedence first: the stack
//! manifest, an explicit `--org`/`--project` flag, and the selection saved
//! by `ictl org select` / `ictl project select`. Resolution here is pure;
//! turning names into ids is [`PlatformClient::get_project_id`].
//!
//! [`PlatformClient::get_project_id`]: crate::platform::PlatformClient::get_project_id

use crate::error::{IctlError, Result};
use crate::preferences::Preferences;
use serde::Serialize;

/// Server-assigned identifiers used on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub org_id: String,
    pub project_id: String,
}

impl Context {
    pub fn new(org_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Context {
            org_id: org_id.into(),
            project_id: project_id.into(),
        }
    }
}

pub fn resolve_organization(
    manifest_org: Option<&str>,
    flag_org: Option<&str>,
    prefs: &Preferences,
) -> Result<String> {
    first_present([manifest_org, flag_org, prefs.organization()])
        .ok_or(IctlError::MissingContext("organization"))
}

pub fn resolve_project(
    manifest_project: Option<&str>,
    flag_project: Option<&str>,
    prefs: &Preferences,
) -> Result<String> {
    first_present([manifest_project, flag_project, prefs.project()])
        .ok_or(IctlError::MissingContext("project"))
}

fn first_present<const N: usize>(candidates: [Option<&str>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(org: Option<&str>, project: Option<&str>) -> Preferences {
        Preferences {
            selected_organization: org.map(String::from),
            selected_project: project.map(String::from),
        }
    }

    #[test]
    fn manifest_beats_flag_beats_selection() {
        let p = prefs(Some("saved"), Some("saved-proj"));
        assert_eq!(
            resolve_organization(Some("from-manifest"), Some("from-flag"), &p).unwrap(),
            "from-manifest"
        );
        assert_eq!(resolve_organization(None, Some("from-flag"), &p).unwrap(), "from-flag");
        assert_eq!(resolve_organization(None, None, &p).unwrap(), "saved");
        assert_eq!(resolve_project(None, None, &p).unwrap(), "saved-proj");
    }

    #[test]
    fn whitespace_counts_as_absent() {
        let p = prefs(Some("saved"), None);
        assert_eq!(resolve_organization(Some("   "), Some(""), &p).unwrap(), "saved");
        assert_eq!(resolve_project(Some("  web  "), None, &p).unwrap(), "web");
    }

    #[test]
    fn missing_everywhere_names_the_concept() {
        let p = Preferences::default();
        let org = resolve_organization(None, Some(" "), &p).unwrap_err();
        assert!(matches!(org, IctlError::MissingContext("organization")));
        let project = resolve_project(None, None, &p).unwrap_err();
        assert!(matches!(project, IctlError::MissingContext("project")));
        assert!(project.to_string().contains("project"));
    }
}
