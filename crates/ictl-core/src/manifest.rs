//! Stack manifest: the YAML file declaring a stack's services.
//!
//! ```yaml
//! organization: acme
//! project: web
//! stack-id: storefront
//! services:
//!   web:
//!     servicePort: 8080
//!     image: {type: internal, name: web, tag: v3}
//!     resources: {memory: 512M, cpu: 250m}
//!     replicas: 2
//! ```

use crate::deploy::{AutoscalingBody, ImageBody, ServiceRequest};
use crate::error::{IctlError, Result};
use regex::Regex;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct StackManifest {
    pub organization: String,
    pub project: String,
    pub stack_id: String,
    pub services: ServiceSet,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default, rename = "stack-id")]
    stack_id: Option<String>,
    #[serde(default)]
    services: Option<ServiceSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceSpec {
    #[serde(default)]
    pub service_port: u32,
    #[serde(default)]
    pub image: ImageSpec,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub secret_refs: Vec<SecretRef>,
    #[serde(default)]
    pub endpoint: bool,
    #[serde(default)]
    pub replicas: Option<u32>,
    #[serde(default)]
    pub autoscaling: Option<Autoscaling>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Internal,
    External,
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageType::Internal => write!(f, "internal"),
            ImageType::External => write!(f, "external"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageSpec {
    #[serde(default, rename = "type")]
    pub image_type: Option<ImageType>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Resources {
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub cpu: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SecretRef {
    pub secret_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Autoscaling {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub min_replicas: u32,
    #[serde(default)]
    pub max_replicas: u32,
    #[serde(default)]
    pub cpu_percentage: Option<u32>,
    #[serde(default)]
    pub memory_percentage: Option<u32>,
}

/// How a validated service scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling<'a> {
    Fixed(u32),
    Auto(&'a Autoscaling),
}

// ---------------------------------------------------------------------------
// ServiceSet: services in declaration order
// ---------------------------------------------------------------------------

/// Desired services keyed by name, iterated in the order the manifest
/// declares them.
#[derive(Debug, Clone, Default)]
pub struct ServiceSet(Vec<(String, ServiceSpec)>);

impl ServiceSet {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceSpec)> {
        self.0.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&ServiceSpec> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, spec)| spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ServiceSpec)> for ServiceSet {
    fn from_iter<I: IntoIterator<Item = (String, ServiceSpec)>>(iter: I) -> Self {
        ServiceSet(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for ServiceSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = ServiceSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of service name to service definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<ServiceSet, A::Error> {
                let mut services: Vec<(String, ServiceSpec)> = Vec::new();
                while let Some(name) = map.next_key::<String>()? {
                    let raw: serde_yaml::Value = map.next_value()?;
                    if services.iter().any(|(n, _)| *n == name) {
                        return Err(de::Error::custom(format!("duplicate service \"{name}\"")));
                    }
                    let spec = serde_yaml::from_value(raw)
                        .map_err(|e| de::Error::custom(format!("service \"{name}\": {e}")))?;
                    services.push((name, spec));
                }
                Ok(ServiceSet(services))
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl StackManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate manifest YAML.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawManifest = serde_yaml::from_str(content)?;
        let manifest = StackManifest {
            organization: raw.organization.unwrap_or_default().trim().to_string(),
            project: raw.project.unwrap_or_default().trim().to_string(),
            stack_id: raw.stack_id.unwrap_or_default().trim().to_string(),
            services: raw.services.unwrap_or_default(),
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check every manifest and service invariant, failing on the first
    /// violation.
    pub fn validate(&self) -> Result<()> {
        if !self.services.is_empty() && self.stack_id.is_empty() {
            return Err(IctlError::validation(
                "manifest",
                "stack-id",
                "required when services are declared",
            ));
        }
        for (name, spec) in self.services.iter() {
            if name.trim().is_empty() {
                return Err(IctlError::validation("manifest", "services", "service name must not be empty"));
            }
            spec.validate(name)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

static MEMORY_RE: OnceLock<Regex> = OnceLock::new();
static CPU_RE: OnceLock<Regex> = OnceLock::new();

fn memory_re() -> &'static Regex {
    MEMORY_RE.get_or_init(|| Regex::new(r"^(\d+)[MG]$").unwrap())
}

fn cpu_re() -> &'static Regex {
    CPU_RE.get_or_init(|| Regex::new(r"^(\d+)m?$").unwrap())
}

/// Numeric part of a resource quantity, if it matches `re`.
fn quantity(re: &Regex, value: &str) -> Option<u64> {
    re.captures(value)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl ServiceSpec {
    pub fn validate(&self, name: &str) -> Result<()> {
        let scope = format!("service \"{name}\"");
        let fail = |field: &str, reason: &str| Err(IctlError::validation(&scope, field, reason));

        if self.service_port == 0 || self.service_port > 65535 {
            return fail("servicePort", "must be between 1 and 65535");
        }

        let image = &self.image;
        let repository = image.repository.as_deref().map(str::trim).unwrap_or("");
        match image.image_type {
            None => return fail("image.type", "required (internal or external)"),
            Some(ImageType::External) if repository.is_empty() => {
                return fail("image.repository", "required for external images");
            }
            Some(ImageType::Internal) if !repository.is_empty() => {
                return fail("image.repository", "only allowed for external images");
            }
            _ => {}
        }
        if image.name.trim().is_empty() {
            return fail("image.name", "must not be empty");
        }
        if image.tag.trim().is_empty() {
            return fail("image.tag", "must not be empty");
        }

        match quantity(memory_re(), &self.resources.memory) {
            None => return fail("resources.memory", "must look like 512M or 2G"),
            Some(0) => return fail("resources.memory", "must be greater than zero"),
            Some(_) => {}
        }
        match quantity(cpu_re(), &self.resources.cpu) {
            None => return fail("resources.cpu", "must look like 1 or 500m"),
            Some(0) => return fail("resources.cpu", "must be greater than zero"),
            Some(_) => {}
        }

        for (i, var) in self.env.iter().enumerate() {
            if var.name.trim().is_empty() {
                return fail(&format!("env[{i}].name"), "must not be empty");
            }
        }
        for (i, secret) in self.secret_refs.iter().enumerate() {
            if secret.secret_name.trim().is_empty() {
                return fail(&format!("secretRefs[{i}].secretName"), "must not be empty");
            }
        }

        let autoscaling = self.autoscaling.as_ref().filter(|a| a.enabled);
        match (self.replicas, autoscaling) {
            (Some(_), Some(_)) => fail("replicas", "cannot be combined with enabled autoscaling"),
            (None, None) => fail("replicas", "set replicas or enable autoscaling"),
            (Some(0), None) => fail("replicas", "must be at least 1"),
            (Some(_), None) => Ok(()),
            (None, Some(auto)) => {
                if auto.min_replicas < 1 {
                    return fail("autoscaling.minReplicas", "must be at least 1");
                }
                if auto.max_replicas < auto.min_replicas {
                    return fail("autoscaling.maxReplicas", "must be at least minReplicas");
                }
                let cpu = auto.cpu_percentage.unwrap_or(0);
                let memory = auto.memory_percentage.unwrap_or(0);
                if cpu == 0 && memory == 0 {
                    return fail(
                        "autoscaling",
                        "set cpuPercentage or memoryPercentage above zero",
                    );
                }
                Ok(())
            }
        }
    }

    /// Scaling mode of a validated spec. An enabled autoscaling block wins.
    pub fn scaling(&self) -> Scaling<'_> {
        match self.autoscaling.as_ref().filter(|a| a.enabled) {
            Some(auto) => Scaling::Auto(auto),
            None => Scaling::Fixed(self.replicas.unwrap_or(1)),
        }
    }

    /// Wire body for create/update, tagged with `stack_id`.
    pub fn to_request(&self, stack_id: &str) -> ServiceRequest {
        let (replicas, autoscaling) = match self.scaling() {
            Scaling::Fixed(n) => (Some(n), None),
            Scaling::Auto(auto) => (
                None,
                Some(AutoscalingBody {
                    enabled: true,
                    min_replicas: auto.min_replicas,
                    max_replicas: auto.max_replicas,
                    cpu_percentage: auto.cpu_percentage.filter(|p| *p > 0),
                    memory_percentage: auto.memory_percentage.filter(|p| *p > 0),
                }),
            ),
        };
        let repository = match self.image.image_type {
            Some(ImageType::External) => self.image.repository.clone(),
            _ => None,
        };
        ServiceRequest {
            service_port: self.service_port,
            image: ImageBody {
                image_type: self.image.image_type.unwrap_or(ImageType::Internal),
                repository,
                name: self.image.name.clone(),
                tag: self.image.tag.clone(),
            },
            resources: self.resources.clone(),
            env: self.env.clone(),
            secret_refs: self.secret_refs.clone(),
            endpoint: self.endpoint,
            replicas,
            autoscaling,
            stack_id: stack_id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
