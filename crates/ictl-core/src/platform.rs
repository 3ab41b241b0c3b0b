//! Organization and project lookup.
//!
//! With cookie auth the client lists what the session can see. With an API
//! key the scope is fixed when the key is validated, so lookups are answered
//! from that scope without listing calls.

use crate::context::Context;
use crate::error::{IctlError, Result};
use crate::transport::{lenient_string, ApiRequest, Response, Transport, COLLECTION_BODY_LIMIT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project_count: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
}

/// Organization and project an API key is bound to, from the headers of
/// `GET /api/v1/validate-api-key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyScope {
    pub org_id: String,
    pub org_name: String,
    pub project_id: String,
    pub project_name: String,
}

impl ApiKeyScope {
    fn from_response(resp: &Response) -> Result<Self> {
        let get = |name: &str| -> Result<String> {
            resp.headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .ok_or_else(|| IctlError::AuthRejected(format!("API key validation did not return {name}")))
        };
        let scope = ApiKeyScope {
            org_id: get("x-org-id")?,
            org_name: get("x-org-name")?,
            project_id: get("x-project-id")?,
            project_name: get("x-project-name")?,
        };
        if scope.org_id.is_empty() || scope.project_id.is_empty() {
            return Err(IctlError::AuthRejected(
                "API key validation returned an empty scope".to_string(),
            ));
        }
        Ok(scope)
    }

    /// Name shown for the scoped organization; the id when the name is blank.
    pub fn org_label(&self) -> &str {
        label(&self.org_name, &self.org_id)
    }

    pub fn project_label(&self) -> &str {
        label(&self.project_name, &self.project_id)
    }
}

fn label<'a>(name: &'a str, id: &'a str) -> &'a str {
    if name.is_empty() {
        id
    } else {
        name
    }
}

/// Who the client is acting as.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Identity {
    ApiKey { scope: ApiKeyScope },
    Session { organizations: Vec<Organization> },
}

// ---------------------------------------------------------------------------
// PlatformClient
// ---------------------------------------------------------------------------

pub struct PlatformClient {
    transport: Arc<Transport>,
    scope: Option<ApiKeyScope>,
}

impl PlatformClient {
    /// Build the client. In API-key mode this validates the key once and
    /// fixes the scope for the rest of the invocation.
    pub fn connect(transport: Arc<Transport>) -> Result<Self> {
        let scope = if transport.credentials().uses_api_key() {
            let resp = transport.request(ApiRequest::get(["api", "v1", "validate-api-key"]))?;
            let scope = ApiKeyScope::from_response(&resp)?;
            tracing::debug!(org = %scope.org_id, project = %scope.project_id, "api key validated");
            Some(scope)
        } else {
            None
        };
        Ok(PlatformClient { transport, scope })
    }

    pub fn scope(&self) -> Option<&ApiKeyScope> {
        self.scope.as_ref()
    }

    pub fn whoami(&self) -> Result<Identity> {
        match &self.scope {
            Some(scope) => Ok(Identity::ApiKey {
                scope: scope.clone(),
            }),
            None => Ok(Identity::Session {
                organizations: self.list_organizations()?,
            }),
        }
    }

    pub fn list_organizations(&self) -> Result<Vec<Organization>> {
        if let Some(scope) = &self.scope {
            return Ok(vec![Organization {
                id: scope.org_id.clone(),
                name: scope.org_name.clone(),
                project_count: 1,
                role: String::new(),
            }]);
        }
        let req = ApiRequest::get(["api", "v1", "organizations"]).body_limit(COLLECTION_BODY_LIMIT);
        self.transport.request(req)?.json_list("organizations")
    }

    pub fn list_projects(&self, org_id: &str) -> Result<Vec<Project>> {
        if let Some(scope) = &self.scope {
            if scope.org_id != org_id {
                return Ok(Vec::new());
            }
            return Ok(vec![Project {
                id: scope.project_id.clone(),
                name: scope.project_name.clone(),
                role: String::new(),
            }]);
        }
        let req = ApiRequest::get(["api", "v1", "organizations", org_id, "projects"])
            .body_limit(COLLECTION_BODY_LIMIT);
        self.transport.request(req)?.json_list("projects")
    }

    pub fn get_org_id_by_name(&self, name: &str) -> Result<String> {
        if let Some(scope) = &self.scope {
            if scoped_match(name, &scope.org_name, &scope.org_id) {
                return Ok(scope.org_id.clone());
            }
            return Err(IctlError::NotFoundInScope {
                kind: "organization",
                name: name.trim().to_string(),
                scoped: scope.org_label().to_string(),
            });
        }
        let orgs = self.list_organizations()?;
        let org = unique_by_name("organization", name, &orgs, |o| &o.name)?;
        Ok(org.id.clone())
    }

    pub fn get_project_by_name(&self, org_id: &str, name: &str) -> Result<Project> {
        if let Some(scope) = &self.scope {
            if scope.org_id == org_id && scoped_match(name, &scope.project_name, &scope.project_id) {
                return Ok(Project {
                    id: scope.project_id.clone(),
                    name: scope.project_name.clone(),
                    role: String::new(),
                });
            }
            return Err(IctlError::NotFoundInScope {
                kind: "project",
                name: name.trim().to_string(),
                scoped: scope.project_label().to_string(),
            });
        }
        let projects = self.list_projects(org_id)?;
        unique_by_name("project", name, &projects, |p| &p.name).cloned()
    }

    /// Resolve organization and project names to wire ids.
    pub fn get_project_id(&self, org_name: &str, project_name: &str) -> Result<Context> {
        let org_id = self.get_org_id_by_name(org_name)?;
        let project = self.get_project_by_name(&org_id, project_name)?;
        Ok(Context::new(org_id, project.id))
    }
}

/// Case-insensitive match against the scoped name, or the scoped id when
/// the name is blank.
fn scoped_match(wanted: &str, scoped_name: &str, scoped_id: &str) -> bool {
    let wanted = wanted.trim().to_lowercase();
    let target = label(scoped_name, scoped_id).trim().to_lowercase();
    !wanted.is_empty() && wanted == target
}

fn unique_by_name<'a, T>(
    kind: &'static str,
    name: &str,
    items: &'a [T],
    name_of: impl Fn(&T) -> &String,
) -> Result<&'a T> {
    let wanted = name.trim().to_lowercase();
    let matches: Vec<&T> = items
        .iter()
        .filter(|item| name_of(item).trim().to_lowercase() == wanted)
        .collect();
    match matches.as_slice() {
        [] => Err(IctlError::NotFound {
            kind,
            name: name.trim().to_string(),
        }),
        [one] => Ok(one),
        many => Err(IctlError::Ambiguous {
            kind,
            name: name.trim().to_string(),
            count: many.len(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Cookie;
    use crate::transport::Credentials;

    fn session_client(server: &mockito::Server) -> PlatformClient {
        let creds = Credentials::cookies(vec![Cookie::new("session", "abc")]);
        let transport = Transport::new(&server.url(), creds).unwrap();
        PlatformClient::connect(Arc::new(transport)).unwrap()
    }

    fn api_key_server(server: &mut mockito::Server) -> mockito::Mock {
        server
            .mock("GET", "/api/v1/validate-api-key")
            .match_header("authorization", mockito::Matcher::Regex("^Basic ".into()))
            .with_status(200)
            .with_header("x-org-id", "O")
            .with_header("x-org-name", "Acme")
            .with_header("x-project-id", "P")
            .with_header("x-project-name", "Web")
            .create()
    }

    fn api_key_client(server: &mockito::Server) -> PlatformClient {
        let transport = Transport::new(&server.url(), Credentials::api_key("pk:sk")).unwrap();
        PlatformClient::connect(Arc::new(transport)).unwrap()
    }

    #[test]
    fn api_key_scope_resolves_names_case_insensitively() {
        let mut server = mockito::Server::new();
        let validate = api_key_server(&mut server);
        let client = api_key_client(&server);
        validate.assert();

        assert_eq!(client.get_project_id("acme", "web").unwrap(), Context::new("O", "P"));
        assert_eq!(client.list_organizations().unwrap()[0].name, "Acme");
        assert_eq!(client.list_projects("O").unwrap()[0].id, "P");
        assert!(client.list_projects("other").unwrap().is_empty());
    }

    #[test]
    fn api_key_scope_rejects_other_org_naming_scope() {
        let mut server = mockito::Server::new();
        api_key_server(&mut server);
        let client = api_key_client(&server);

        let err = client.get_project_id("other", "web").unwrap_err();
        assert!(matches!(err, IctlError::NotFoundInScope { kind: "organization", .. }));
        assert!(err.to_string().contains("Acme"), "got: {err}");

        let err = client.get_project_id("acme", "api").unwrap_err();
        assert!(err.to_string().contains("Web"), "got: {err}");
    }

    #[test]
    fn api_key_scope_matches_id_when_name_blank() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/v1/validate-api-key")
            .with_status(200)
            .with_header("x-org-id", "org_123")
            .with_header("x-org-name", "")
            .with_header("x-project-id", "P")
            .with_header("x-project-name", "Web")
            .create();
        let client = api_key_client(&server);

        assert_eq!(client.get_org_id_by_name("ORG_123").unwrap(), "org_123");
        let err = client.get_org_id_by_name("acme").unwrap_err();
        assert!(err.to_string().contains("org_123"), "got: {err}");
    }

    #[test]
    fn api_key_validation_requires_all_headers() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/v1/validate-api-key")
            .with_status(200)
            .with_header("x-org-id", "O")
            .with_header("x-org-name", "Acme")
            .with_header("x-project-id", "P")
            .create();
        let transport = Transport::new(&server.url(), Credentials::api_key("pk:sk")).unwrap();
        let err = PlatformClient::connect(Arc::new(transport)).err().unwrap();
        assert!(err.to_string().contains("x-project-name"), "got: {err}");
    }

    #[test]
    fn api_key_rejected_by_server() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/v1/validate-api-key")
            .with_status(401)
            .with_body(r#"{"message":"invalid API key"}"#)
            .create();
        let transport = Transport::new(&server.url(), Credentials::api_key("pk:sk")).unwrap();
        let err = PlatformClient::connect(Arc::new(transport)).err().unwrap();
        assert!(matches!(err, IctlError::AuthRejected(ref m) if m == "invalid API key"));
    }

    #[test]
    fn session_lookup_by_name() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/v1/organizations")
            .match_header("cookie", "session=abc")
            .with_status(200)
            .with_body(r#"{"organizations":[{"id":"o1","name":"Acme","projectCount":2,"role":"owner"},{"id":"o2","name":"Globex","projectCount":1,"role":"member"}]}"#)
            .create();
        server
            .mock("GET", "/api/v1/organizations/o1/projects")
            .with_status(200)
            .with_body(r#"[{"id":"p1","name":"Web","role":"admin"},{"id":"p2","name":"Batch","role":"admin"}]"#)
            .create();

        let client = session_client(&server);
        assert!(client.scope().is_none());
        assert_eq!(client.get_project_id(" ACME ", "web").unwrap(), Context::new("o1", "p1"));
    }

    #[test]
    fn session_lookup_not_found_and_ambiguous() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/v1/organizations")
            .with_status(200)
            .with_body(r#"[{"id":"o1","name":"Acme"},{"id":"o2","name":"acme"}]"#)
            .expect_at_least(1)
            .create();

        let client = session_client(&server);
        assert!(matches!(
            client.get_org_id_by_name("acme"),
            Err(IctlError::Ambiguous { count: 2, .. })
        ));
        assert!(matches!(
            client.get_org_id_by_name("initech"),
            Err(IctlError::NotFound { kind: "organization", .. })
        ));
    }

    #[test]
    fn whoami_in_session_mode_lists_orgs() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/v1/organizations")
            .with_status(200)
            .with_body(r#"{"organizations":[{"id":"o1","name":"Acme"}]}"#)
            .create();

        match session_client(&server).whoami().unwrap() {
            Identity::Session { organizations } => assert_eq!(organizations.len(), 1),
            other => panic!("expected session identity, got {other:?}"),
        }
    }
}
