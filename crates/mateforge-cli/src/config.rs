//! Robot configuration – reads `<robot_dir>/config.toml`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use mateforge_client::Wvm;
use mateforge_kinematics::ResolveOptions;

/// Name of the configuration file inside a robot directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Settings of one robot export, stored next to its output.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Onshape document id (the 24-character id in the document URL).
    pub document_id: String,

    /// Workspace to read; the document's default workspace when unset.
    #[serde(default)]
    pub workspace_id: Option<String>,

    /// Version to read instead of a workspace.
    #[serde(default)]
    pub version_id: Option<String>,

    /// Name of the assembly element describing the robot.
    pub assembly_name: String,

    /// Keep `frame_*` occurrences inside their anchor link.
    #[serde(default)]
    pub draw_frames: bool,

    #[serde(default)]
    pub ignore_limits: bool,

    /// Configuration string passed to the assembly endpoint, e.g.
    /// `"arm_length=250 mm;gripper=true"`.
    #[serde(default = "default_configuration")]
    pub configuration: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    #[serde(default = "default_use_cache")]
    pub use_cache: bool,

    /// Response cache directory; relative paths are taken from the robot
    /// directory.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Output file name, relative to the robot directory.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("document_id", &self.document_id)
            .field("workspace_id", &self.workspace_id)
            .field("version_id", &self.version_id)
            .field("assembly_name", &self.assembly_name)
            .field("draw_frames", &self.draw_frames)
            .field("ignore_limits", &self.ignore_limits)
            .field("configuration", &self.configuration)
            .field("api_url", &self.api_url)
            .field(
                "access_key",
                if self.access_key.is_empty() { &"<not set>" } else { &"<redacted>" },
            )
            .field(
                "secret_key",
                if self.secret_key.is_empty() { &"<not set>" } else { &"<redacted>" },
            )
            .field("use_cache", &self.use_cache)
            .field("cache_dir", &self.cache_dir)
            .field("output", &self.output)
            .finish()
    }
}

fn default_configuration() -> String {
    "default".to_string()
}
fn default_api_url() -> String {
    "https://cad.onshape.com".to_string()
}
fn default_use_cache() -> bool {
    true
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache")
}
fn default_output() -> PathBuf {
    PathBuf::from("kinematics.json")
}

impl Config {
    /// Workspace or version to read, `None` for the default workspace.
    pub fn wvm(&self) -> Option<Wvm> {
        match (&self.workspace_id, &self.version_id) {
            (Some(w), Some(_)) => {
                warn!(workspace = %w, "both workspace_id and version_id are set, ignoring version_id");
                Some(Wvm::Workspace(w.clone()))
            }
            (Some(w), None) => Some(Wvm::Workspace(w.clone())),
            (None, Some(v)) => Some(Wvm::Version(v.clone())),
            (None, None) => None,
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            draw_frames: self.draw_frames,
            ignore_limits: self.ignore_limits,
        }
    }
}

/// Load `<robot_dir>/config.toml` and apply environment overrides.
pub fn load(robot_dir: &Path) -> Result<Config, String> {
    let path = robot_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Err(format!("Config file not found at {}", path.display()));
    }
    let raw = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg = parse(&raw, robot_dir)?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Parse a config file body; relative paths are anchored at `robot_dir`.
pub(crate) fn parse(raw: &str, robot_dir: &Path) -> Result<Config, String> {
    let mut cfg: Config =
        toml::from_str(raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    if cfg.cache_dir.is_relative() {
        cfg.cache_dir = robot_dir.join(&cfg.cache_dir);
    }
    if cfg.output.is_relative() {
        cfg.output = robot_dir.join(&cfg.output);
    }
    Ok(cfg)
}

/// Apply environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ONSHAPE_API` | `api_url` |
/// | `ONSHAPE_ACCESS_KEY` | `access_key` |
/// | `ONSHAPE_SECRET_KEY` | `secret_key` |
/// | `MATEFORGE_ASSEMBLY` | `assembly_name` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ONSHAPE_API") {
        cfg.api_url = v;
    }
    if let Ok(v) = std::env::var("ONSHAPE_ACCESS_KEY") {
        cfg.access_key = v;
    }
    if let Ok(v) = std::env::var("ONSHAPE_SECRET_KEY") {
        cfg.secret_key = v;
    }
    if let Ok(v) = std::env::var("MATEFORGE_ASSEMBLY")
        && !v.is_empty()
    {
        cfg.assembly_name = v;
    }
}
