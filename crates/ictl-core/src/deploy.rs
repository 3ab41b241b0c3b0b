//! Typed operations against the deployment API: services, replicas, logs,
//! secrets, and images, all scoped to one resolved [`Context`].

use crate::cancel::CancelToken;
use crate::context::Context;
use crate::error::{IctlError, Result};
use crate::manifest::{EnvVar, ImageType, Resources, SecretRef};
use crate::transport::{
    lenient_string, ApiRequest, Transport, CANCEL_POLL, COLLECTION_BODY_LIMIT, UPLOAD_TIMEOUT,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;

/// Log chunks buffered ahead of the reader.
const LOG_CHUNKS_IN_FLIGHT: usize = 16;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of a service create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    pub service_port: u32,
    pub image: ImageBody,
    pub resources: Resources,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secret_refs: Vec<SecretRef>,
    #[serde(skip_serializing_if = "is_false")]
    pub endpoint: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<AutoscalingBody>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stack_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageBody {
    #[serde(rename = "type")]
    pub image_type: ImageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    pub name: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingBody {
    pub enabled: bool,
    pub min_replicas: u32,
    pub max_replicas: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percentage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_percentage: Option<u32>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Serialize)]
struct SecretBody<'a> {
    data: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SecretKeyBody<'a> {
    value: &'a str,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteService {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub project_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub revision: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replica {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub restarts: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub name: String,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tag: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created: String,
}

impl Image {
    /// Every tag the server reported, single `tag` first.
    pub fn all_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        if !self.tag.is_empty() {
            tags.push(&self.tag);
        }
        for t in &self.tags {
            if !tags.contains(&t.as_str()) {
                tags.push(t);
            }
        }
        tags
    }
}

/// `GET …/secrets/{name}` may wrap the object as `{"secret": {...}}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SecretReply {
    Wrapped { secret: Secret },
    Bare(Secret),
}

// ---------------------------------------------------------------------------
// ServiceApi: the subset the reconciler drives
// ---------------------------------------------------------------------------

pub trait ServiceApi {
    fn list_services(&self, ctx: &Context, stack_id: Option<&str>) -> Result<Vec<RemoteService>>;
    fn create_service(&self, ctx: &Context, name: &str, body: &ServiceRequest) -> Result<()>;
    fn update_service(&self, ctx: &Context, name: &str, body: &ServiceRequest) -> Result<()>;
    fn delete_service(&self, ctx: &Context, name: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// LogStream
// ---------------------------------------------------------------------------

/// An open log response. Reading yields raw log bytes until the server
/// ends the stream or the cancel token is set; dropping or
/// [`close`](LogStream::close) releases the connection.
///
/// The response is read on a helper thread so a read waiting for the next
/// line can still notice cancellation.
pub struct LogStream {
    chunks: Receiver<std::io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    pos: usize,
    cancel: CancelToken,
}

impl LogStream {
    fn spawn(mut inner: reqwest::blocking::Response, cancel: CancelToken) -> Self {
        let (tx, chunks) = mpsc::sync_channel(LOG_CHUNKS_IN_FLIGHT);
        std::thread::spawn(move || {
            let mut buf = vec![0u8; 8 * 1024];
            loop {
                let chunk = match inner.read(&mut buf) {
                    Ok(0) => return,
                    Ok(n) => Ok(buf[..n].to_vec()),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => Err(e),
                };
                let failed = chunk.is_err();
                // A closed receiver means the stream was dropped.
                if tx.send(chunk).is_err() || failed {
                    return;
                }
            }
        });
        LogStream {
            chunks,
            pending: Vec::new(),
            pos: 0,
            cancel,
        }
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Read for LogStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            if self.pos < self.pending.len() {
                let n = buf.len().min(self.pending.len() - self.pos);
                buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            match self.chunks.recv_timeout(CANCEL_POLL) {
                Ok(Ok(chunk)) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Ok(Err(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => {
                    if self.cancel.is_cancelled() {
                        return Err(std::io::Error::other(IctlError::Cancelled));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DeployClient
// ---------------------------------------------------------------------------

pub struct DeployClient {
    transport: Arc<Transport>,
}

fn project_path(ctx: &Context, rest: &[&str]) -> Vec<String> {
    let mut segments: Vec<String> = vec![
        "v1".into(),
        "organizations".into(),
        ctx.org_id.clone(),
        "projects".into(),
        ctx.project_id.clone(),
    ];
    segments.extend(rest.iter().map(|s| s.to_string()));
    segments
}

impl DeployClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        DeployClient { transport }
    }

    // -- services -----------------------------------------------------------

    pub fn restart_service(&self, ctx: &Context, name: &str) -> Result<()> {
        let req = ApiRequest::new(Method::POST, project_path(ctx, &["services", name, "restart"]));
        self.transport.request(req)?;
        Ok(())
    }

    pub fn list_replicas(&self, ctx: &Context, service: &str) -> Result<Vec<Replica>> {
        let req = ApiRequest::get(project_path(ctx, &["services", service, "replicas"]))
            .body_limit(COLLECTION_BODY_LIMIT);
        self.transport.request(req)?.json_list("replicas")
    }

    /// Full replica description; the shape is server-defined.
    pub fn describe_replica(&self, ctx: &Context, replica: &str) -> Result<serde_json::Value> {
        let req = ApiRequest::get(project_path(ctx, &["services", "replicas", replica]))
            .body_limit(COLLECTION_BODY_LIMIT);
        self.transport.request_json(req)
    }

    pub fn get_logs(&self, ctx: &Context, replica: &str, follow: bool) -> Result<LogStream> {
        let mut req = ApiRequest::get(project_path(ctx, &["services", "replicas", replica, "logs"]));
        if follow {
            req = req.query("follow", "true");
        }
        let inner = self.transport.open_stream(req)?;
        Ok(LogStream::spawn(inner, self.transport.cancel_token().clone()))
    }

    // -- secrets ------------------------------------------------------------

    pub fn create_secret(&self, ctx: &Context, name: &str, data: &BTreeMap<String, String>) -> Result<()> {
        let req = ApiRequest::new(Method::POST, project_path(ctx, &["secrets", name]))
            .json(&SecretBody { data })?;
        self.transport.request(req)?;
        Ok(())
    }

    pub fn replace_secret(&self, ctx: &Context, name: &str, data: &BTreeMap<String, String>) -> Result<()> {
        let req = ApiRequest::new(Method::PUT, project_path(ctx, &["secrets", name]))
            .json(&SecretBody { data })?;
        self.transport.request(req)?;
        Ok(())
    }

    pub fn update_secret_key(&self, ctx: &Context, name: &str, key: &str, value: &str) -> Result<()> {
        let req = ApiRequest::new(Method::PUT, project_path(ctx, &["secrets", name, "keys", key]))
            .json(&SecretKeyBody { value })?;
        self.transport.request(req)?;
        Ok(())
    }

    pub fn delete_secret(&self, ctx: &Context, name: &str) -> Result<()> {
        let req = ApiRequest::new(Method::DELETE, project_path(ctx, &["secrets", name]));
        self.transport.request(req)?;
        Ok(())
    }

    /// Fetch one secret. When the server omits `keys` but sends `data`,
    /// `keys` is filled with the sorted data keys.
    pub fn get_secret(&self, ctx: &Context, name: &str) -> Result<Secret> {
        let req = ApiRequest::get(project_path(ctx, &["secrets", name]));
        let reply: SecretReply = self.transport.request_json(req)?;
        let mut secret = match reply {
            SecretReply::Wrapped { secret } => secret,
            SecretReply::Bare(secret) => secret,
        };
        if secret.keys.is_empty() {
            if let Some(data) = &secret.data {
                // BTreeMap keys iterate sorted.
                secret.keys = data.keys().cloned().collect();
            }
        }
        Ok(secret)
    }

    pub fn list_secrets(&self, ctx: &Context) -> Result<Vec<Secret>> {
        let req = ApiRequest::get(project_path(ctx, &["secrets"])).body_limit(COLLECTION_BODY_LIMIT);
        self.transport.request(req)?.json_list("secrets")
    }

    // -- images -------------------------------------------------------------

    pub fn list_images(&self, ctx: &Context) -> Result<Vec<Image>> {
        let req = ApiRequest::get(project_path(ctx, &["images"])).body_limit(COLLECTION_BODY_LIMIT);
        self.transport.request(req)?.json_list("images")
    }

    /// Upload an image tarball. Uses the long upload deadline.
    pub fn upload_image(
        &self,
        ctx: &Context,
        name: &str,
        tag: &str,
        tar: impl Into<reqwest::blocking::Body>,
    ) -> Result<()> {
        let req = ApiRequest::new(Method::POST, project_path(ctx, &["images"]))
            .query("imageName", name)
            .query("tag", tag)
            .raw("application/x-tar", tar)
            .timeout(UPLOAD_TIMEOUT);
        self.transport.request(req)?;
        Ok(())
    }
}

impl ServiceApi for DeployClient {
    fn list_services(&self, ctx: &Context, stack_id: Option<&str>) -> Result<Vec<RemoteService>> {
        let mut req = ApiRequest::get(project_path(ctx, &["services"])).body_limit(COLLECTION_BODY_LIMIT);
        if let Some(id) = stack_id.map(str::trim).filter(|s| !s.is_empty()) {
            req = req.query("stackId", id);
        }
        self.transport.request(req)?.json_list("services")
    }

    fn create_service(&self, ctx: &Context, name: &str, body: &ServiceRequest) -> Result<()> {
        let req = ApiRequest::new(Method::POST, project_path(ctx, &["services", name])).json(body)?;
        self.transport.request(req)?;
        Ok(())
    }

    fn update_service(&self, ctx: &Context, name: &str, body: &ServiceRequest) -> Result<()> {
        let req = ApiRequest::new(Method::PUT, project_path(ctx, &["services", name])).json(body)?;
        self.transport.request(req)?;
        Ok(())
    }

    fn delete_service(&self, ctx: &Context, name: &str) -> Result<()> {
        let req = ApiRequest::new(Method::DELETE, project_path(ctx, &["services", name]));
        self.transport.request(req)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IctlError;
    use crate::transport::Credentials;
    use mockito::Matcher;
    use serde_json::json;
    use std::io::Write;

    const SERVICES: &str = "/v1/organizations/O/projects/P/services";

    fn client(server: &mockito::Server) -> DeployClient {
        let transport = Transport::new(&server.url(), Credentials::api_key("pk:sk")).unwrap();
        DeployClient::new(Arc::new(transport))
    }

    fn ctx() -> Context {
        Context::new("O", "P")
    }

    fn body() -> ServiceRequest {
        ServiceRequest {
            service_port: 80,
            image: ImageBody {
                image_type: ImageType::Internal,
                repository: None,
                name: "web".into(),
                tag: "v1".into(),
            },
            resources: Resources {
                memory: "128M".into(),
                cpu: "100m".into(),
            },
            env: vec![],
            secret_refs: vec![],
            endpoint: false,
            replicas: Some(1),
            autoscaling: None,
            stack_id: "s1".into(),
        }
    }

    #[test]
    fn list_services_filters_by_stack() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", SERVICES)
            .match_query(Matcher::UrlEncoded("stackId".into(), "s1".into()))
            .with_status(200)
            .with_body(
                r#"{"services":[{"name":"web","projectId":"P","revision":3,"status":"Ready","updated":"2026-01-02T03:04:05Z","endpoint":"web.acme.app"}]}"#,
            )
            .create();

        let services = client(&server).list_services(&ctx(), Some("s1")).unwrap();
        mock.assert();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "web");
        assert_eq!(services[0].revision, "3");
        assert_eq!(services[0].endpoint, "web.acme.app");
    }

    #[test]
    fn list_services_without_stack_has_no_query() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", SERVICES)
            .with_status(200)
            .with_body(r#"{"services":null}"#)
            .create();

        assert!(client(&server).list_services(&ctx(), None).unwrap().is_empty());
        mock.assert();
    }

    #[test]
    fn service_crud_paths() {
        let mut server = mockito::Server::new();
        let path = format!("{SERVICES}/web");
        let create = server
            .mock("POST", path.as_str())
            .match_body(Matcher::PartialJson(json!({"servicePort": 80, "stackId": "s1", "replicas": 1})))
            .with_status(201)
            .create();
        let update = server.mock("PUT", path.as_str()).with_status(200).create();
        let delete = server.mock("DELETE", path.as_str()).with_status(204).create();
        let restart = server
            .mock("POST", format!("{path}/restart").as_str())
            .with_status(202)
            .create();

        let c = client(&server);
        c.create_service(&ctx(), "web", &body()).unwrap();
        c.update_service(&ctx(), "web", &body()).unwrap();
        c.delete_service(&ctx(), "web").unwrap();
        c.restart_service(&ctx(), "web").unwrap();
        create.assert();
        update.assert();
        delete.assert();
        restart.assert();
    }

    #[test]
    fn service_error_surfaces_server_message() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", format!("{SERVICES}/web").as_str())
            .with_status(409)
            .with_body(r#"{"message":"service already exists"}"#)
            .create();

        let err = client(&server).create_service(&ctx(), "web", &body()).unwrap_err();
        assert!(matches!(err, IctlError::Remote { status: 409, .. }));
        assert_eq!(err.to_string(), "service already exists");
    }

    #[test]
    fn replicas_and_describe() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", format!("{SERVICES}/web/replicas").as_str())
            .with_status(200)
            .with_body(r#"[{"name":"web-7f9c","status":"Running","ready":true,"restarts":0}]"#)
            .create();
        server
            .mock("GET", format!("{SERVICES}/replicas/web-7f9c").as_str())
            .with_status(200)
            .with_body(r#"{"name":"web-7f9c","node":"n1"}"#)
            .create();

        let c = client(&server);
        let replicas = c.list_replicas(&ctx(), "web").unwrap();
        assert_eq!(replicas[0].name, "web-7f9c");
        assert_eq!(replicas[0].ready, Some(true));
        let detail = c.describe_replica(&ctx(), "web-7f9c").unwrap();
        assert_eq!(detail["node"], "n1");
    }

    #[test]
    fn logs_stream_reads_to_eof() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", format!("{SERVICES}/replicas/web-1/logs").as_str())
            .match_query(Matcher::UrlEncoded("follow".into(), "true".into()))
            .with_status(200)
            .with_body("line one\nline two\n")
            .create();

        let mut stream = client(&server).get_logs(&ctx(), "web-1", true).unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        stream.close();
        assert_eq!(out, "line one\nline two\n");
        mock.assert();
    }

    #[test]
    fn logs_error_is_reported() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", format!("{SERVICES}/replicas/gone/logs").as_str())
            .with_status(404)
            .with_body(r#"{"detail":"replica not found"}"#)
            .create();

        let err = client(&server).get_logs(&ctx(), "gone", false).err().unwrap();
        assert_eq!(err.to_string(), "replica not found");
    }

    #[test]
    fn following_logs_stops_when_cancelled() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", format!("{SERVICES}/replicas/web-1/logs").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(std::time::Duration::from_secs(4));
                w.write_all(b"late line\n")
            })
            .create();

        let cancel = CancelToken::new();
        let transport = Transport::new(&server.url(), Credentials::api_key("pk:sk"))
            .unwrap()
            .with_cancel(cancel.clone());
        let mut stream = DeployClient::new(Arc::new(transport))
            .get_logs(&ctx(), "web-1", true)
            .unwrap();

        let trigger = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(200));
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let mut buf = [0u8; 64];
        let err = stream.read(&mut buf).unwrap_err();
        assert!(err.to_string().contains("cancelled"), "got: {err}");
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn secret_writes() {
        let mut server = mockito::Server::new();
        let data: BTreeMap<String, String> =
            [("USER".to_string(), "app".to_string())].into_iter().collect();
        let create = server
            .mock("POST", "/v1/organizations/O/projects/P/secrets/db")
            .match_body(Matcher::Json(json!({"data": {"USER": "app"}})))
            .with_status(201)
            .create();
        let replace = server
            .mock("PUT", "/v1/organizations/O/projects/P/secrets/db")
            .match_body(Matcher::Json(json!({"data": {"USER": "app"}})))
            .with_status(200)
            .create();
        let key = server
            .mock("PUT", "/v1/organizations/O/projects/P/secrets/db/keys/PASSWORD")
            .match_body(Matcher::Json(json!({"value": "hunter2"})))
            .with_status(200)
            .create();
        let delete = server
            .mock("DELETE", "/v1/organizations/O/projects/P/secrets/db")
            .with_status(204)
            .create();

        let c = client(&server);
        c.create_secret(&ctx(), "db", &data).unwrap();
        c.replace_secret(&ctx(), "db", &data).unwrap();
        c.update_secret_key(&ctx(), "db", "PASSWORD", "hunter2").unwrap();
        c.delete_secret(&ctx(), "db").unwrap();
        create.assert();
        replace.assert();
        key.assert();
        delete.assert();
    }

    #[test]
    fn get_secret_accepts_wrapped_and_derives_keys() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v1/organizations/O/projects/P/secrets/db")
            .with_status(200)
            .with_body(r#"{"secret":{"name":"db","data":{"ZED":"1","ALPHA":"2"}}}"#)
            .create();

        let secret = client(&server).get_secret(&ctx(), "db").unwrap();
        assert_eq!(secret.name, "db");
        assert_eq!(secret.keys, vec!["ALPHA", "ZED"]);
    }

    #[test]
    fn get_secret_accepts_bare_object() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v1/organizations/O/projects/P/secrets/db")
            .with_status(200)
            .with_body(r#"{"name":"db","keys":["B","A"]}"#)
            .create();

        let secret = client(&server).get_secret(&ctx(), "db").unwrap();
        assert_eq!(secret.keys, vec!["B", "A"]);
        assert!(secret.data.is_none());
    }

    #[test]
    fn list_secrets_and_images() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v1/organizations/O/projects/P/secrets")
            .with_status(200)
            .with_body(r#"{"secrets":[{"name":"db","keys":["USER"]}]}"#)
            .create();
        server
            .mock("GET", "/v1/organizations/O/projects/P/images")
            .with_status(200)
            .with_body(r#"[{"name":"web","tag":"v1","tags":["v1","latest"]}]"#)
            .create();

        let c = client(&server);
        assert_eq!(c.list_secrets(&ctx()).unwrap()[0].keys, vec!["USER"]);
        let images = c.list_images(&ctx()).unwrap();
        assert_eq!(images[0].all_tags(), vec!["v1", "latest"]);
    }

    #[test]
    fn upload_sends_tar_with_query() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/organizations/O/projects/P/images")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("imageName".into(), "web".into()),
                Matcher::UrlEncoded("tag".into(), "v2".into()),
            ]))
            .match_header("content-type", "application/x-tar")
            .match_body("TARBYTES")
            .with_status(201)
            .create();

        client(&server)
            .upload_image(&ctx(), "web", "v2", b"TARBYTES".to_vec())
            .unwrap();
        mock.assert();
    }

    #[test]
    fn user_strings_are_path_encoded() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("DELETE", "/v1/organizations/O/projects/P/services/a%2Fb%20c")
            .with_status(204)
            .create();

        client(&server).delete_service(&ctx(), "a/b c").unwrap();
        mock.assert();
    }
}
