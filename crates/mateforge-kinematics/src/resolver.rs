//! End-to-end resolution: assembly definition → [`ResolvedRobot`].
//!
//! Runs the stages in order on one snapshot: occurrence index, link names,
//! DOF classification, link propagation, trunk selection, orphan sweep and
//! tree construction.
//!
//! # Example
//!
//! ```rust
//! use mateforge_kinematics::{NoLimits, ResolveOptions, resolve};
//! use mateforge_types::api::AssemblyDefinition;
//!
//! let assembly: AssemblyDefinition = serde_json::from_str(r#"{
//!     "rootAssembly": {
//!         "instances": [ { "id": "base", "type": "Part" } ],
//!         "occurrences": [ { "path": ["base"], "fixed": true,
//!             "transform": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1] } ]
//!     }
//! }"#).unwrap();
//!
//! let robot = resolve(&assembly, None, &NoLimits, ResolveOptions::default()).unwrap();
//! assert_eq!(robot.tree.node_count(), 1);
//! ```

use mateforge_types::api::{AssemblyDefinition, AssemblyFeature, FeatureList};
use mateforge_types::{MateError, OccurrencePath};
use serde::Serialize;
use tracing::info;

use crate::classifier::classify;
use crate::limits::LimitsSource;
use crate::occurrence::{Assignation, Occurrence, OccurrenceIndex};
use crate::propagation::{Frames, propagate};
use crate::tree::{TreeNode, build_tree, select_trunk, sweep_orphans};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Keep frame occurrences in their anchor's link instead of the
    /// `Frame` pseudo-group.
    pub draw_frames: bool,
    /// Do not look up joint limits.
    pub ignore_limits: bool,
}

/// The kinematic description of an assembly.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRobot {
    pub trunk: OccurrencePath,
    pub tree: TreeNode,
    pub occurrences: OccurrenceIndex,
    pub frames: Frames,
    pub unresolved: Vec<OccurrencePath>,
}

impl ResolvedRobot {
    /// Occurrences merged into the link seeded by `seed`.
    pub fn link_members<'a>(&'a self, seed: &OccurrencePath) -> Vec<&'a Occurrence> {
        let group = Assignation::Link(seed.clone());
        self.occurrences
            .iter()
            .filter(|o| o.assignation.as_ref() == Some(&group))
            .collect()
    }

    /// Display name of the link seeded by `seed`: the explicit `link_` name
    /// of any member, else the seed instance name, else the path.
    pub fn link_name(&self, seed: &OccurrencePath) -> String {
        self.link_members(seed)
            .iter()
            .find_map(|o| o.link_name.clone())
            .or_else(|| {
                self.occurrences
                    .get(seed)
                    .map(|o| o.instance.name.clone())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or_else(|| seed.to_string())
    }
}

/// Features that take part in the resolution: not suppressed in the
/// definition and not inactive in the feature states.
pub fn active_features<'a>(
    assembly: &'a AssemblyDefinition,
    features: Option<&FeatureList>,
) -> Vec<&'a AssemblyFeature> {
    assembly
        .root_assembly
        .features
        .iter()
        .filter(|f| !f.suppressed)
        .filter(|f| !features.is_some_and(|list| list.is_inactive(&f.id)))
        .collect()
}

/// Resolve an assembly into its kinematic tree.
///
/// # Errors
///
/// Any fatal [`MateError`] raised by a stage.
pub fn resolve(
    assembly: &AssemblyDefinition,
    features: Option<&FeatureList>,
    limits: &dyn LimitsSource,
    options: ResolveOptions,
) -> Result<ResolvedRobot, MateError> {
    let mut index = OccurrenceIndex::build(assembly)?;
    let active = active_features(assembly, features);
    index.apply_link_names(&active);

    let classification = classify(
        &mut index,
        &active,
        &assembly.root_assembly.instances,
        limits,
        options.ignore_limits,
    )?;
    let propagation = propagate(&mut index, &active, options.draw_frames);

    let trunk = match select_trunk(&classification.relations)? {
        Some(trunk) => trunk,
        None => classification.trunk.ok_or(MateError::EmptyAssembly)?,
    };
    sweep_orphans(&mut index, &trunk);
    let tree = build_tree(&trunk, &classification.relations);

    info!(
        occurrences = index.len(),
        joints = classification.relations.len(),
        frames = propagation.frames.len(),
        "assembly resolved"
    );
    Ok(ResolvedRobot {
        trunk,
        tree,
        unresolved: index.unresolved().to_vec(),
        occurrences: index,
        frames: propagation.frames,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
