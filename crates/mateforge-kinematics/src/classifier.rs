//! DOF mate classification.
//!
//! A single pass over the active mate features turns every `dof_*` mate into
//! a [`Relation`]: child occurrence → parent occurrence plus the [`Joint`]
//! connecting them, posed in the world frame. Both endpoints of a DOF seed
//! their own link group in the [`OccurrenceIndex`].

use std::collections::HashMap;

use mateforge_types::api::{AssemblyFeature, CoordinateSystem, Instance, MateData};
use mateforge_types::{JointLimits, JointType, MateError, OccurrencePath};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::limits::LimitsSource;
use crate::occurrence::{Assignation, OccurrenceIndex};
use crate::transform::Transform;

/// Mate name prefix marking a joint.
pub const DOF_PREFIX: &str = "dof_";

/// Mate name prefix marking a named reference frame.
pub const FRAME_PREFIX: &str = "frame_";

// ────────────────────────────────────────────────────────────────────────────
// Joint names
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointName {
    pub name: String,
    pub inverted: bool,
}

/// Parse the part of a DOF mate name after `dof_`.
///
/// A trailing `_inv` / `_inverted` token marks the joint as inverted and is
/// dropped from the name.
///
/// # Errors
///
/// [`MateError::EmptyJointName`] when nothing is left of the name.
pub fn parse_joint_name(mate_name: &str) -> Result<JointName, MateError> {
    let remainder = mate_name.strip_prefix(DOF_PREFIX).unwrap_or(mate_name);
    let mut tokens: Vec<&str> = remainder.split('_').collect();
    let inverted = matches!(tokens.last(), Some(&"inv") | Some(&"inverted"));
    if inverted {
        tokens.pop();
    }
    let name = tokens.join("_");
    if name.is_empty() {
        return Err(MateError::EmptyJointName(mate_name.to_string()));
    }
    Ok(JointName { name, inverted })
}

// ────────────────────────────────────────────────────────────────────────────
// Joint & Relation
// ────────────────────────────────────────────────────────────────────────────

/// A joint derived from a DOF mate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Joint {
    pub name: String,
    pub joint_type: JointType,
    /// World-frame pose of the joint; the joint moves along/about its Z.
    pub frame: Transform,
    pub axis: [f64; 3],
    pub limits: Option<JointLimits>,
    pub inverted: bool,
    /// Name of the mate feature the joint comes from.
    pub mate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relation {
    pub child: OccurrencePath,
    pub parent: OccurrencePath,
    pub joint: Joint,
}

/// Relations keyed by child path, in discovery order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Relations {
    relations: Vec<Relation>,
    #[serde(skip)]
    by_child: HashMap<OccurrencePath, usize>,
}

impl Relations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relation.
    ///
    /// # Errors
    ///
    /// [`MateError::AlreadyConnected`] when the child already has a parent.
    pub fn insert(&mut self, relation: Relation) -> Result<(), MateError> {
        if let Some(existing) = self.get(&relation.child) {
            return Err(MateError::AlreadyConnected {
                child: relation.child.clone(),
                existing_parent: existing.parent.clone(),
                existing_joint: existing.joint.name.clone(),
                parent: relation.parent,
                joint: relation.joint.name,
            });
        }
        self.by_child
            .insert(relation.child.clone(), self.relations.len());
        self.relations.push(relation);
        Ok(())
    }

    pub fn get(&self, child: &OccurrencePath) -> Option<&Relation> {
        self.by_child.get(child).map(|&i| &self.relations[i])
    }

    pub fn is_child(&self, path: &OccurrencePath) -> bool {
        self.by_child.contains_key(path)
    }

    /// Relations whose parent is `parent`, in discovery order.
    pub fn children_of<'a>(
        &'a self,
        parent: &'a OccurrencePath,
    ) -> impl Iterator<Item = &'a Relation> {
        self.relations.iter().filter(move |r| &r.parent == parent)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Classification
// ────────────────────────────────────────────────────────────────────────────

/// World pose of a joint: occurrence pose, then the mated CS origin and
/// axes, then the X flip for inverted joints.
pub fn joint_frame(world: &Transform, cs: &CoordinateSystem, inverted: bool) -> Transform {
    let mut local = Transform::from_translation(cs.origin)
        .compose(&Transform::from_axes(cs.x_axis, cs.y_axis, cs.z_axis));
    if inverted {
        local = local.compose(&Transform::flip_x());
    }
    world.compose(&local)
}

/// Output of [`classify`].
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub relations: Relations,
    /// Trunk picked when no DOF produced a relation.
    pub trunk: Option<OccurrencePath>,
}

/// `true` for mates with two entities and a non-empty path on each side.
pub(crate) fn is_well_formed(mate: &MateData) -> bool {
    mate.mated_entities.len() == 2
        && mate
            .mated_entities
            .iter()
            .all(|e| !e.mated_occurrence.is_empty())
}

/// Turn DOF mates into relations and seed their endpoints' link groups.
///
/// `mates` must already be filtered to active features. When no relation
/// comes out of the pass, the first root instance becomes the trunk.
///
/// # Errors
///
/// [`MateError::EmptyJointName`], [`MateError::UnsupportedDofMate`] and
/// [`MateError::AlreadyConnected`] for malformed DOFs,
/// [`MateError::EmptyAssembly`] when there is no DOF and no instance, and
/// whatever the limits source reports.
pub fn classify(
    index: &mut OccurrenceIndex,
    mates: &[&AssemblyFeature],
    root_instances: &[Instance],
    limits: &dyn LimitsSource,
    ignore_limits: bool,
) -> Result<Classification, MateError> {
    let mut relations = Relations::new();

    for mate in mates.iter().filter_map(|f| f.as_mate()) {
        if !is_dof(mate) {
            continue;
        }
        if !is_well_formed(mate) {
            warn!(mate = %mate.name, entities = mate.mated_entities.len(), "DOF mate is not between two occurrences, skipping it");
            continue;
        }

        let JointName { name, inverted } = parse_joint_name(&mate.name)?;
        let joint_type = mate
            .mate_type
            .joint_type()
            .ok_or_else(|| MateError::UnsupportedDofMate {
                name: mate.name.clone(),
                mate_type: mate.mate_type.clone(),
            })?;

        let child_entity = &mate.mated_entities[0];
        let child = OccurrencePath::from(child_entity.mated_occurrence.as_slice());
        let parent = OccurrencePath::from(mate.mated_entities[1].mated_occurrence.as_slice());

        let Some(world) = index.get(&child).map(|o| o.transform) else {
            warn!(joint = %name, occurrence = %child, "DOF on an unresolved occurrence, skipping it");
            continue;
        };
        if !index.contains(&parent) {
            warn!(joint = %name, occurrence = %parent, "DOF on an unresolved occurrence, skipping it");
            continue;
        }

        let mut joint_limits = match joint_type {
            JointType::Revolute | JointType::Prismatic if !ignore_limits => {
                limits.limits(&mate.name, joint_type)?
            }
            _ => None,
        };
        if inverted {
            joint_limits = joint_limits.map(JointLimits::inverted);
        }

        let joint = Joint {
            frame: joint_frame(&world, &child_entity.mated_cs, inverted),
            axis: [0.0, 0.0, 1.0],
            name,
            joint_type,
            limits: joint_limits,
            inverted,
            mate: mate.name.clone(),
        };
        debug!(joint = %joint.name, %joint_type, %child, %parent, inverted, "joint found");

        relations.insert(Relation {
            child: child.clone(),
            parent: parent.clone(),
            joint,
        })?;
        index.assign(&child, Assignation::Link(child.clone()));
        index.assign(&parent, Assignation::Link(parent.clone()));
    }

    let mut trunk = None;
    if relations.is_empty() {
        let first = root_instances.first().ok_or(MateError::EmptyAssembly)?;
        let path = OccurrencePath::root(first.id.clone());
        index.assign(&path, Assignation::Link(path.clone()));
        info!(trunk = %path, "no DOF found, using the first instance as trunk");
        trunk = Some(path);
    }

    info!(dofs = relations.len(), "mates classified");
    Ok(Classification { relations, trunk })
}

pub(crate) fn is_dof(mate: &MateData) -> bool {
    mate.name.starts_with(DOF_PREFIX)
}

impl Joint {
    /// `true` for joints that actually move.
    pub fn is_movable(&self) -> bool {
        self.joint_type != JointType::Fixed
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::NoLimits;
    use mateforge_types::MateType;
    use mateforge_types::api::AssemblyDefinition;
    use serde_json::{Value, json};

    const IDENTITY: [f64; 16] = [
        1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ];

    fn cs(origin: [f64; 3]) -> Value {
        json!({
            "xAxis": [1.0, 0.0, 0.0], "yAxis": [0.0, 1.0, 0.0],
            "zAxis": [0.0, 0.0, 1.0], "origin": origin
        })
    }

    fn mate(name: &str, mate_type: &str, child: &str, parent: &str) -> Value {
        json!({
            "id": name, "featureType": "mate",
            "featureData": {
                "name": name, "mateType": mate_type,
                "matedEntities": [
                    { "matedOccurrence": [child], "matedCS": cs([0.1, 0.0, 0.0]) },
                    { "matedOccurrence": [parent], "matedCS": cs([0.0, 0.0, 0.0]) }
                ]
            }
        })
    }

    fn assembly(features: Vec<Value>) -> AssemblyDefinition {
        serde_json::from_value(json!({
            "rootAssembly": {
                "instances": [
                    { "id": "A", "type": "Part" },
                    { "id": "B", "type": "Part" },
                    { "id": "C", "type": "Part" }
                ],
                "occurrences": [
                    { "path": ["A"], "transform": IDENTITY, "fixed": true },
                    { "path": ["B"], "transform": IDENTITY },
                    { "path": ["C"], "transform": IDENTITY }
                ],
                "features": features
            }
        }))
        .unwrap()
    }

    fn run(
        assembly: &AssemblyDefinition,
        limits: &dyn LimitsSource,
    ) -> Result<(OccurrenceIndex, Classification), MateError> {
        let mut index = OccurrenceIndex::build(assembly)?;
        let features: Vec<&AssemblyFeature> = assembly.root_assembly.features.iter().collect();
        let classification = classify(
            &mut index,
            &features,
            &assembly.root_assembly.instances,
            limits,
            false,
        )?;
        Ok((index, classification))
    }

    #[test]
    fn parses_joint_names() {
        assert_eq!(
            parse_joint_name("dof_left_knee").unwrap(),
            JointName { name: "left_knee".into(), inverted: false }
        );
        assert_eq!(
            parse_joint_name("dof_elbow_inv").unwrap(),
            JointName { name: "elbow".into(), inverted: true }
        );
        assert!(parse_joint_name("dof_wrist_inverted").unwrap().inverted);
        assert!(matches!(
            parse_joint_name("dof_inv"),
            Err(MateError::EmptyJointName(_))
        ));
        assert!(parse_joint_name("dof_").is_err());
    }

    #[test]
    fn shoulder_dof_creates_relation() {
        let assembly = assembly(vec![mate("dof_shoulder", "REVOLUTE", "B", "A")]);
        let (index, classification) = run(&assembly, &NoLimits).unwrap();

        let b = OccurrencePath::root("B");
        let relation = classification.relations.get(&b).expect("B has a parent");
        assert_eq!(relation.parent, OccurrencePath::root("A"));
        assert_eq!(relation.joint.name, "shoulder");
        assert_eq!(relation.joint.joint_type, JointType::Revolute);
        assert!(!relation.joint.inverted);
        assert_eq!(relation.joint.axis, [0.0, 0.0, 1.0]);
        assert!((relation.joint.frame.translation().x - 0.1).abs() < 1e-12);

        assert_eq!(index.assignation(&b), Some(&Assignation::Link(b.clone())));
        assert!(index.assignation(&OccurrencePath::root("C")).is_none());
        assert!(classification.trunk.is_none());
    }

    #[test]
    fn inverted_dof_flips_frame_and_limits() {
        let mut limits = HashMap::new();
        limits.insert("dof_shoulder".to_string(), JointLimits::new(-0.5, 1.5));
        limits.insert("dof_shoulder_inv".to_string(), JointLimits::new(-0.5, 1.5));

        let plain = assembly(vec![mate("dof_shoulder", "REVOLUTE", "B", "A")]);
        let (_, plain) = run(&plain, &limits).unwrap();
        let inv = assembly(vec![mate("dof_shoulder_inv", "REVOLUTE", "B", "A")]);
        let (_, inv) = run(&inv, &limits).unwrap();

        let b = OccurrencePath::root("B");
        let plain = &plain.relations.get(&b).unwrap().joint;
        let inv = &inv.relations.get(&b).unwrap().joint;

        assert_eq!(inv.name, "shoulder");
        assert!(inv.inverted);
        assert_eq!(plain.limits, Some(JointLimits::new(-0.5, 1.5)));
        assert_eq!(inv.limits, Some(JointLimits::new(-1.5, 0.5)));
        assert!(
            inv.frame
                .approx_eq(&plain.frame.compose(&Transform::flip_x()), 1e-12)
        );
        assert_eq!(inv.frame.translation(), plain.frame.translation());
    }

    #[test]
    fn ignore_limits_skips_lookup() {
        let mut limits = HashMap::new();
        limits.insert("dof_shoulder".to_string(), JointLimits::new(-1.0, 1.0));
        let assembly = assembly(vec![mate("dof_shoulder", "REVOLUTE", "B", "A")]);
        let mut index = OccurrenceIndex::build(&assembly).unwrap();
        let features: Vec<&AssemblyFeature> = assembly.root_assembly.features.iter().collect();
        let classification =
            classify(&mut index, &features, &assembly.root_assembly.instances, &limits, true)
                .unwrap();
        let relation = classification.relations.iter().next().unwrap();
        assert_eq!(relation.joint.limits, None);
    }

    #[test]
    fn slider_and_fastened_types() {
        let assembly = assembly(vec![
            mate("dof_lift", "SLIDER", "B", "A"),
            mate("dof_mount", "FASTENED", "C", "A"),
        ]);
        let (_, classification) = run(&assembly, &NoLimits).unwrap();
        let types: Vec<JointType> = classification
            .relations
            .iter()
            .map(|r| r.joint.joint_type)
            .collect();
        assert_eq!(types, vec![JointType::Prismatic, JointType::Fixed]);
    }

    #[test]
    fn second_dof_on_same_child_is_fatal() {
        let assembly = assembly(vec![
            mate("dof_shoulder", "REVOLUTE", "B", "A"),
            mate("dof_elbow", "REVOLUTE", "B", "C"),
        ]);
        let err = run(&assembly, &NoLimits).unwrap_err();
        match err {
            MateError::AlreadyConnected {
                child,
                existing_joint,
                joint,
                ..
            } => {
                assert_eq!(child, OccurrencePath::root("B"));
                assert_eq!(existing_joint, "shoulder");
                assert_eq!(joint, "elbow");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unsupported_dof_type_is_fatal() {
        let assembly = assembly(vec![mate("dof_ball", "BALL", "B", "A")]);
        let err = run(&assembly, &NoLimits).unwrap_err();
        assert!(matches!(
            err,
            MateError::UnsupportedDofMate { mate_type: MateType::Ball, .. }
        ));
    }

    #[test]
    fn empty_joint_name_is_fatal() {
        let assembly = assembly(vec![mate("dof_", "REVOLUTE", "B", "A")]);
        assert!(matches!(
            run(&assembly, &NoLimits),
            Err(MateError::EmptyJointName(_))
        ));
    }

    #[test]
    fn dof_on_unresolved_occurrence_is_skipped() {
        let assembly = assembly(vec![mate("dof_ghost", "REVOLUTE", "Z", "A")]);
        let (_, classification) = run(&assembly, &NoLimits).unwrap();
        assert!(classification.relations.is_empty());
        assert_eq!(classification.trunk, Some(OccurrencePath::root("A")));
    }

    #[test]
    fn no_dof_uses_first_instance_as_trunk() {
        let assembly = assembly(vec![mate("fasten", "FASTENED", "B", "A")]);
        let (index, classification) = run(&assembly, &NoLimits).unwrap();
        let a = OccurrencePath::root("A");
        assert_eq!(classification.trunk, Some(a.clone()));
        assert_eq!(index.assignation(&a), Some(&Assignation::Link(a.clone())));
    }

    #[test]
    fn empty_assembly_is_fatal() {
        let mut index = OccurrenceIndex::default();
        let err = classify(&mut index, &[], &[], &NoLimits, false).unwrap_err();
        assert_eq!(err, MateError::EmptyAssembly);
    }

    #[test]
    fn joint_frame_applies_origin_in_occurrence_frame() {
        let world = Transform::from_axes([0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        let cs = CoordinateSystem {
            origin: [1.0, 0.0, 0.0],
            ..CoordinateSystem::default()
        };
        let frame = joint_frame(&world, &cs, false);
        let p = frame.translation();
        assert!(p.x.abs() < 1e-12 && (p.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_dof_on_rotated_occurrence() {
        // B is turned 90° about Z and moved to (1, 2, 3); its mate
        // connector points Z along -X of the part.
        let world = [
            0.0, -1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 1.0, 3.0, 0.0, 0.0, 0.0, 1.0,
        ];
        let turned = json!({
            "xAxis": [0.0, 0.0, 1.0], "yAxis": [0.0, 1.0, 0.0],
            "zAxis": [-1.0, 0.0, 0.0], "origin": [0.1, 0.0, 0.0]
        });
        let build = |name: &str| -> AssemblyDefinition {
            serde_json::from_value(json!({
                "rootAssembly": {
                    "instances": [ { "id": "A", "type": "Part" }, { "id": "B", "type": "Part" } ],
                    "occurrences": [
                        { "path": ["A"], "transform": IDENTITY, "fixed": true },
                        { "path": ["B"], "transform": world }
                    ],
                    "features": [ {
                        "id": name, "featureType": "mate",
                        "featureData": {
                            "name": name, "mateType": "REVOLUTE",
                            "matedEntities": [
                                { "matedOccurrence": ["B"], "matedCS": turned },
                                { "matedOccurrence": ["A"], "matedCS": cs([0.0, 0.0, 0.0]) }
                            ]
                        }
                    } ]
                }
            }))
            .unwrap()
        };
        let b = OccurrencePath::root("B");

        let (_, plain) = run(&build("dof_hinge"), &NoLimits).unwrap();
        let expected = Transform::from_row_major(&[
            0.0, -1.0, 0.0, 1.0, 0.0, 0.0, -1.0, 2.1, 1.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 1.0,
        ])
        .unwrap();
        assert!(plain.relations.get(&b).unwrap().joint.frame.approx_eq(&expected, 1e-12));

        // Flipping about the local X keeps X and the origin, reverses Y and Z.
        let (_, inv) = run(&build("dof_hinge_inv"), &NoLimits).unwrap();
        let expected = Transform::from_row_major(&[
            0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 2.1, 1.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 1.0,
        ])
        .unwrap();
        let frame = inv.relations.get(&b).unwrap().joint.frame;
        assert!(frame.approx_eq(&expected, 1e-12));
        let z = frame.z_axis();
        assert!(z.x.abs() < 1e-12 && (z.y - 1.0).abs() < 1e-12 && z.z.abs() < 1e-12);
    }
}
