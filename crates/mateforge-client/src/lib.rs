//! `mateforge-client` – blocking client for the Onshape REST API.
//!
//! Fetches the document, element list, assembly definition and assembly
//! feature list the resolver works from. Requests are authenticated with an
//! API access/secret key pair (HTTP Basic). Responses read from a document
//! version can be kept in a [`ResponseCache`] so repeated runs do not hit the
//! network; workspace reads always go to the service.
//!
//! # Example
//!
//! ```rust,no_run
//! use mateforge_client::{OnshapeClient, Wvm};
//!
//! let client = OnshapeClient::new("https://cad.onshape.com", "access", "secret");
//! let document = client.get_document("0123456789abcdef01234567")?;
//! let wvm = Wvm::Workspace(document.default_workspace.id);
//! let element = client.find_assembly(&document.id, &wvm, "robot")?;
//! let assembly = client.get_assembly(&document.id, &wvm, &element.id, "default")?;
//! # Ok::<(), mateforge_client::ClientError>(())
//! ```

pub mod cache;

pub use cache::ResponseCache;

use std::fmt;

use mateforge_types::MateError;
use mateforge_types::api::{AssemblyDefinition, Document, Element, FeatureList};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ClientError {
    /// The HTTP request itself failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Unable to decode the {what} response: {source}")]
    Decode {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("Response cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Mate(#[from] MateError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Workspace / version selector
// ─────────────────────────────────────────────────────────────────────────────

/// Which state of the document to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wvm {
    Workspace(String),
    Version(String),
}

impl Wvm {
    pub fn id(&self) -> &str {
        match self {
            Wvm::Workspace(id) | Wvm::Version(id) => id,
        }
    }
}

/// URL segment: `w/<id>` or `v/<id>`.
impl fmt::Display for Wvm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wvm::Workspace(id) => write!(f, "w/{id}"),
            Wvm::Version(id) => write!(f, "v/{id}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OnshapeClient
// ─────────────────────────────────────────────────────────────────────────────

pub struct OnshapeClient {
    base_url: String,
    access_key: String,
    secret_key: String,
    cache: Option<ResponseCache>,
    client: reqwest::blocking::Client,
}

impl OnshapeClient {
    pub fn new(
        base_url: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            cache: None,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Serve and store responses through `cache`.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn get_document(&self, did: &str) -> Result<Document, ClientError> {
        self.fetch(
            None,
            "get_document",
            &[did],
            &format!("/api/documents/{did}"),
            &[],
            "document",
        )
    }

    pub fn list_assemblies(&self, did: &str, wvm: &Wvm) -> Result<Vec<Element>, ClientError> {
        let wvm_key = wvm.to_string();
        self.fetch(
            Some(wvm),
            "list_assemblies",
            &[did, wvm_key.as_str()],
            &format!("/api/documents/d/{did}/{wvm}/elements"),
            &[("elementType", "ASSEMBLY")],
            "element list",
        )
    }

    /// First assembly of the document named exactly `name`.
    ///
    /// # Errors
    ///
    /// [`MateError::AssemblyNotFound`] when no assembly has that name.
    pub fn find_assembly(&self, did: &str, wvm: &Wvm, name: &str) -> Result<Element, ClientError> {
        self.list_assemblies(did, wvm)?
            .into_iter()
            .find(|e| e.name == name)
            .ok_or_else(|| MateError::AssemblyNotFound(name.to_string()).into())
    }

    /// Assembly definition with mate features, mate connectors and
    /// non-solids included.
    pub fn get_assembly(
        &self,
        did: &str,
        wvm: &Wvm,
        eid: &str,
        configuration: &str,
    ) -> Result<AssemblyDefinition, ClientError> {
        let wvm_key = wvm.to_string();
        self.fetch(
            Some(wvm),
            "get_assembly",
            &[did, wvm_key.as_str(), eid, configuration],
            &format!("/api/assemblies/d/{did}/{wvm}/e/{eid}"),
            &[
                ("includeMateFeatures", "true"),
                ("includeMateConnectors", "true"),
                ("includeNonSolids", "true"),
                ("configuration", configuration),
            ],
            "assembly",
        )
    }

    pub fn get_features(&self, did: &str, wvm: &Wvm, eid: &str) -> Result<FeatureList, ClientError> {
        let wvm_key = wvm.to_string();
        self.fetch(
            Some(wvm),
            "get_features",
            &[did, wvm_key.as_str(), eid],
            &format!("/api/assemblies/d/{did}/{wvm}/e/{eid}/features"),
            &[],
            "feature list",
        )
    }

    /// Only version reads go through the cache: a version never changes,
    /// while a workspace (and the document metadata) may be edited between
    /// runs.
    fn fetch<T: DeserializeOwned>(
        &self,
        wvm: Option<&Wvm>,
        method: &str,
        key: &[&str],
        path: &str,
        query: &[(&str, &str)],
        what: &'static str,
    ) -> Result<T, ClientError> {
        let cache = match (&self.cache, wvm) {
            (Some(cache), Some(Wvm::Version(_))) => Some(cache),
            (Some(_), _) => {
                debug!(method, "mutable state, bypassing the response cache");
                None
            }
            (None, _) => None,
        };

        let cached = match cache {
            Some(cache) => cache.read(method, key)?,
            None => None,
        };
        let body = match cached {
            Some(body) => body,
            None => {
                let body = self.get(path, query)?;
                if let Some(cache) = cache {
                    cache.write(method, key, &body)?;
                }
                body
            }
        };
        serde_json::from_str(&body).map_err(|source| ClientError::Decode { what, source })
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        info!(url = %url, "requesting");
        let response = self
            .client
            .get(&url)
            .query(query)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = response.text()?;
        debug!(url = %url, bytes = body.len(), "response received");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Discard port; requests served from the cache never reach it.
    const OFFLINE: &str = "http://127.0.0.1:9";

    fn cached_client(dir: &std::path::Path) -> OnshapeClient {
        OnshapeClient::new(OFFLINE, "ak", "sk").with_cache(ResponseCache::new(dir))
    }

    #[test]
    fn wvm_url_segment() {
        assert_eq!(Wvm::Workspace("w1".into()).to_string(), "w/w1");
        assert_eq!(Wvm::Version("v1".into()).to_string(), "v/v1");
        assert_eq!(Wvm::Version("v1".into()).id(), "v1");
    }

    #[test]
    fn version_reads_are_served_from_cache() {
        let dir = tempfile::tempdir().expect("tmp dir");
        ResponseCache::new(dir.path())
            .write(
                "get_assembly",
                &["d1", "v/v1", "e1", "len=2 mm"],
                r#"{"rootAssembly":{"instances":[{"id":"A","type":"Part"}]}}"#,
            )
            .unwrap();

        let assembly = cached_client(dir.path())
            .get_assembly("d1", &Wvm::Version("v1".into()), "e1", "len=2 mm")
            .unwrap();
        assert_eq!(assembly.root_assembly.instances[0].id, "A");
    }

    #[test]
    fn workspace_reads_bypass_cache() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cache = ResponseCache::new(dir.path());
        let body = r#"{"features":[],"featureStates":{}}"#;
        cache.write("get_features", &["d1", "w/w1", "e1"], body).unwrap();

        // A stale workspace entry on disk is ignored and the (unreachable)
        // server is asked instead.
        let result = cached_client(dir.path()).get_features("d1", &Wvm::Workspace("w1".into()), "e1");
        assert!(result.is_err());

        // The same key under a version is a cache hit.
        cache.write("get_features", &["d1", "v/w1", "e1"], body).unwrap();
        let list = cached_client(dir.path())
            .get_features("d1", &Wvm::Version("w1".into()), "e1")
            .unwrap();
        assert!(list.features.is_empty());
    }

    #[test]
    fn find_assembly_by_exact_name() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let wvm = Wvm::Version("v1".into());
        ResponseCache::new(dir.path())
            .write(
                "list_assemblies",
                &["d1", "v/v1"],
                r#"[{"id":"e1","name":"robot arm"},{"id":"e2","name":"robot"}]"#,
            )
            .unwrap();
        let client = cached_client(dir.path());

        assert_eq!(client.find_assembly("d1", &wvm, "robot").unwrap().id, "e2");
        let err = client.find_assembly("d1", &wvm, "gripper").unwrap_err();
        assert!(matches!(
            err,
            ClientError::Mate(MateError::AssemblyNotFound(ref name)) if name == "gripper"
        ));
    }

    #[test]
    fn undecodable_cache_entry_is_a_decode_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        ResponseCache::new(dir.path())
            .write("get_features", &["d1", "v/v1", "e1"], "not json")
            .unwrap();
        let err = cached_client(dir.path())
            .get_features("d1", &Wvm::Version("v1".into()), "e1")
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode { what: "feature list", .. }));
    }
}
