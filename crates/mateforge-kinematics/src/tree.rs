//! Kinematic tree assembly.
//!
//! The trunk is the DOF parent that is never a child. Occurrences that no
//! mate reached are merged into the trunk's link group, then the tree is
//! built depth-first from the trunk following the relations in the order
//! they were discovered.

use std::collections::HashSet;

use mateforge_types::{MateError, OccurrencePath};
use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::{Joint, Relations};
use crate::occurrence::{Assignation, OccurrenceIndex};
use crate::transform::Transform;

// ────────────────────────────────────────────────────────────────────────────
// TreeNode
// ────────────────────────────────────────────────────────────────────────────

/// One link of the kinematic tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    /// Occurrence seeding the link.
    pub id: OccurrencePath,
    /// Joint to the parent link; `None` for the trunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joint: Option<Joint>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(id: OccurrencePath, joint: Option<Joint>) -> Self {
        Self {
            id,
            joint,
            children: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    pub fn find(&self, id: &OccurrencePath) -> Option<&TreeNode> {
        self.iter().find(|node| &node.id == id)
    }

    /// Depth-first, pre-order iteration.
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Joint frames expressed in the parent joint frame (world frame for
    /// the trunk's children), depth-first.
    pub fn relative_joint_frames(&self) -> Vec<(&OccurrencePath, Transform)> {
        fn walk<'a>(
            node: &'a TreeNode,
            parent_frame: Transform,
            out: &mut Vec<(&'a OccurrencePath, Transform)>,
        ) {
            for child in &node.children {
                let frame = child
                    .joint
                    .as_ref()
                    .map(|j| j.frame)
                    .unwrap_or(parent_frame);
                out.push((&child.id, frame.relative_to(&parent_frame)));
                walk(child, frame, out);
            }
        }

        let mut out = Vec::new();
        walk(self, Transform::identity(), &mut out);
        out
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Building
// ────────────────────────────────────────────────────────────────────────────

/// Pick the trunk among the relation parents.
///
/// Returns `Ok(None)` when there is no relation at all.
///
/// # Errors
///
/// [`MateError::AmbiguousTrunk`] when several parents are never a child,
/// [`MateError::NoTrunk`] when every parent is also a child.
pub fn select_trunk(relations: &Relations) -> Result<Option<OccurrencePath>, MateError> {
    if relations.is_empty() {
        return Ok(None);
    }

    let mut candidates: Vec<OccurrencePath> = Vec::new();
    for relation in relations.iter() {
        if !relations.is_child(&relation.parent) && !candidates.contains(&relation.parent) {
            candidates.push(relation.parent.clone());
        }
    }

    match candidates.len() {
        0 => Err(MateError::NoTrunk),
        1 => Ok(candidates.pop()),
        _ => Err(MateError::AmbiguousTrunk(candidates)),
    }
}

/// Merge every unassigned occurrence into the trunk's link group.
///
/// Returns the number of occurrences merged.
pub fn sweep_orphans(index: &mut OccurrenceIndex, trunk: &OccurrencePath) -> usize {
    let group = index
        .assignation(trunk)
        .cloned()
        .unwrap_or_else(|| Assignation::Link(trunk.clone()));

    let orphans = index.unassigned();
    for path in &orphans {
        warn!(occurrence = %path, trunk = %trunk, "occurrence is not connected to any link, merging it with the trunk");
        index.assign(path, group.clone());
    }
    orphans.len()
}

/// Build the tree rooted at `trunk`.
///
/// Relations that cannot be reached from the trunk are logged and left
/// out.
pub fn build_tree(trunk: &OccurrencePath, relations: &Relations) -> TreeNode {
    fn build(
        id: &OccurrencePath,
        joint: Option<Joint>,
        relations: &Relations,
        reached: &mut HashSet<OccurrencePath>,
    ) -> TreeNode {
        let mut node = TreeNode::leaf(id.clone(), joint);
        for relation in relations.children_of(id) {
            if !reached.insert(relation.child.clone()) {
                continue;
            }
            node.children.push(build(
                &relation.child,
                Some(relation.joint.clone()),
                relations,
                reached,
            ));
        }
        node
    }

    let mut reached = HashSet::from([trunk.clone()]);
    let tree = build(trunk, None, relations, &mut reached);

    for relation in relations.iter().filter(|r| !reached.contains(&r.child)) {
        warn!(
            joint = %relation.joint.name,
            child = %relation.child,
            parent = %relation.parent,
            "joint is not reachable from the trunk, ignoring it"
        );
    }
    info!(trunk = %trunk, links = tree.node_count(), "kinematic tree built");
    tree
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
