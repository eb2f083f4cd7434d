//! `mateforge` – export the kinematics of an Onshape robot assembly.
//!
//! ```text
//! mateforge [ROBOT_DIR]
//! ```
//!
//! 1. Reads `ROBOT_DIR/config.toml` (default: current directory).
//! 2. Fetches the assembly definition and its feature list, through the
//!    response cache when enabled.
//! 3. Resolves links, joints and frames from the `dof_*`, `frame_*` and
//!    `link_*` naming conventions.
//! 4. Prints the kinematic tree and writes it as JSON to the configured
//!    output file.

mod config;
mod report;

use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use mateforge_client::{OnshapeClient, ResponseCache, Wvm};
use mateforge_kinematics::{FeatureLimits, ResolvedRobot, resolve};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the level (defaults to "info"); MATEFORGE_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("MATEFORGE_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    let robot_dir = match parse_args(std::env::args().skip(1)) {
        Some(dir) => dir,
        None => {
            print_usage();
            return;
        }
    };

    match run(&robot_dir) {
        Ok(output) => {
            println!(
                "  {} {}",
                "✓ Kinematics written to".green(),
                output.display().to_string().bold()
            );
        }
        Err(e) => {
            eprintln!("{}: {}", "ERROR".red().bold(), e.red());
            std::process::exit(1);
        }
    }
}

/// Robot directory from the command line, `None` when help was requested.
fn parse_args(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
    match args.next().as_deref() {
        Some("-h") | Some("--help") => None,
        Some(dir) => Some(PathBuf::from(dir)),
        None => Some(PathBuf::from(".")),
    }
}

fn print_usage() {
    println!("{}", "mateforge – Onshape assembly to kinematic tree".bold());
    println!();
    println!("  Usage: mateforge [ROBOT_DIR]");
    println!();
    println!("  ROBOT_DIR must contain a config.toml with at least:");
    println!("    document_id   = \"<24-character document id>\"");
    println!("    assembly_name = \"<assembly element name>\"");
}

// ─────────────────────────────────────────────────────────────────────────────
// Export pipeline
// ─────────────────────────────────────────────────────────────────────────────

fn run(robot_dir: &Path) -> Result<PathBuf, String> {
    let cfg = config::load(robot_dir)?;
    info!(config = ?cfg, "configuration loaded");
    export(&cfg)?;
    Ok(cfg.output)
}

/// Fetch, resolve, report and write the robot described by `cfg`.
fn export(cfg: &config::Config) -> Result<(), String> {
    if cfg.access_key.is_empty() || cfg.secret_key.is_empty() {
        warn!("API keys are not set; requests that are not cached will be rejected");
    }

    let mut client = OnshapeClient::new(&cfg.api_url, &cfg.access_key, &cfg.secret_key);
    if cfg.use_cache {
        client = client.with_cache(ResponseCache::new(&cfg.cache_dir));
    }

    let wvm = match cfg.wvm() {
        Some(wvm) => wvm,
        None => {
            let document = client.get_document(&cfg.document_id).map_err(|e| e.to_string())?;
            info!(document = %document.name, workspace = %document.default_workspace.id, "using the default workspace");
            Wvm::Workspace(document.default_workspace.id)
        }
    };

    let element = client
        .find_assembly(&cfg.document_id, &wvm, &cfg.assembly_name)
        .map_err(|e| e.to_string())?;
    let assembly = client
        .get_assembly(&cfg.document_id, &wvm, &element.id, &cfg.configuration)
        .map_err(|e| e.to_string())?;
    let features = client
        .get_features(&cfg.document_id, &wvm, &element.id)
        .map_err(|e| e.to_string())?;

    let limits = FeatureLimits::new(&features, &cfg.configuration)
        .with_defaults(&assembly.root_assembly.full_configuration);
    let robot = resolve(&assembly, Some(&features), &limits, cfg.resolve_options())
        .map_err(|e| e.to_string())?;

    report::print(&robot);
    write_output(&robot, &cfg.output)
}

fn write_output(robot: &ResolvedRobot, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create output directory: {}", e))?;
    }
    let raw = serde_json::to_string_pretty(robot)
        .map_err(|e| format!("Failed to serialize output: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write output at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mateforge_kinematics::{NoLimits, ResolveOptions};
    use mateforge_types::api::AssemblyDefinition;

    #[test]
    fn args_default_to_current_dir() {
        assert_eq!(parse_args(std::iter::empty()), Some(PathBuf::from(".")));
        assert_eq!(
            parse_args(vec!["robots/arm".to_string()].into_iter()),
            Some(PathBuf::from("robots/arm"))
        );
        assert_eq!(parse_args(vec!["--help".to_string()].into_iter()), None);
    }

    #[test]
    fn output_is_written_as_json() {
        let assembly: AssemblyDefinition = serde_json::from_value(serde_json::json!({
            "rootAssembly": {
                "instances": [ { "id": "A", "type": "Part" } ],
                "occurrences": [ { "path": ["A"],
                    "transform": [1.0,0.0,0.0,0.0, 0.0,1.0,0.0,0.0, 0.0,0.0,1.0,0.0, 0.0,0.0,0.0,1.0] } ]
            }
        }))
        .unwrap();
        let robot = resolve(&assembly, None, &NoLimits, ResolveOptions::default()).unwrap();

        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("out").join("kinematics.json");
        write_output(&robot, &path).expect("write");

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["trunk"], serde_json::json!(["A"]));
    }

    #[test]
    fn export_uses_cached_responses() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cfg = config::parse(
            "document_id = \"d1\"\nversion_id = \"v1\"\nassembly_name = \"robot\"\napi_url = \"http://127.0.0.1:9\"\n",
            dir.path(),
        )
        .unwrap();
        let cache = ResponseCache::new(dir.path().join(".cache"));
        cache
            .write("list_assemblies", &["d1", "v/v1"], r#"[{"id":"e1","name":"robot"}]"#)
            .unwrap();
        cache
            .write(
                "get_assembly",
                &["d1", "v/v1", "e1", "default"],
                r#"{"rootAssembly":{"instances":[{"id":"A","type":"Part"}],
                    "occurrences":[{"path":["A"],"transform":[1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1]}]}}"#,
            )
            .unwrap();
        cache
            .write("get_features", &["d1", "v/v1", "e1"], r#"{"features":[],"featureStates":{}}"#)
            .unwrap();

        export(&cfg).expect("export");
        assert!(dir.path().join("kinematics.json").exists());
    }

    #[test]
    fn configured_limits_use_assembly_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cfg = config::parse(
            "document_id = \"d1\"\nversion_id = \"v1\"\nassembly_name = \"robot\"\napi_url = \"http://127.0.0.1:9\"\n",
            dir.path(),
        )
        .unwrap();
        let cs = serde_json::json!({
            "xAxis": [1.0, 0.0, 0.0], "yAxis": [0.0, 1.0, 0.0],
            "zAxis": [0.0, 0.0, 1.0], "origin": [0.0, 0.0, 0.0]
        });
        let identity = serde_json::json!([1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1]);
        let assembly = serde_json::json!({
            "rootAssembly": {
                "fullConfiguration": "long_arm=true",
                "instances": [ { "id": "A", "type": "Part" }, { "id": "B", "type": "Part" } ],
                "occurrences": [
                    { "path": ["A"], "transform": identity, "fixed": true },
                    { "path": ["B"], "transform": identity }
                ],
                "features": [ {
                    "id": "F1", "featureType": "mate",
                    "featureData": {
                        "name": "dof_arm", "mateType": "REVOLUTE",
                        "matedEntities": [
                            { "matedOccurrence": ["B"], "matedCS": cs },
                            { "matedOccurrence": ["A"], "matedCS": cs }
                        ]
                    }
                } ]
            }
        });
        let quantity = |expression: &str| {
            serde_json::json!({ "typeName": "BTMParameterNullableQuantity",
                                "message": { "expression": expression } })
        };
        let features = serde_json::json!({
            "features": [ { "message": { "name": "dof_arm", "parameters": [
                { "typeName": "BTMParameterBoolean",
                  "message": { "parameterId": "limitsEnabled", "value": true } },
                { "typeName": "BTMParameterNullableQuantity",
                  "message": { "parameterId": "limitAxialZMin", "expression": "0 deg" } },
                { "typeName": "BTMParameterConfigured",
                  "message": {
                      "parameterId": "limitAxialZMax",
                      "configurationParameterId": "long_arm",
                      "values": [
                          { "typeName": "BTMConfiguredValueByBoolean",
                            "message": { "booleanValue": true, "value": quantity("180 deg") } },
                          { "typeName": "BTMConfiguredValueByBoolean",
                            "message": { "booleanValue": false, "value": quantity("90 deg") } }
                      ]
                  } }
            ] } } ],
            "featureStates": {}
        });

        let cache = ResponseCache::new(dir.path().join(".cache"));
        cache
            .write("list_assemblies", &["d1", "v/v1"], r#"[{"id":"e1","name":"robot"}]"#)
            .unwrap();
        cache
            .write("get_assembly", &["d1", "v/v1", "e1", "default"], &assembly.to_string())
            .unwrap();
        cache
            .write("get_features", &["d1", "v/v1", "e1"], &features.to_string())
            .unwrap();

        export(&cfg).expect("export");
        let value: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("kinematics.json")).unwrap(),
        )
        .unwrap();
        let upper = value["tree"]["children"][0]["joint"]["limits"]["upper"]
            .as_f64()
            .expect("joint limits");
        assert!((upper - std::f64::consts::PI).abs() < 1e-9);
    }
}
