//! Link assignment propagation.
//!
//! After classification only DOF endpoints belong to a link group. Every
//! other mate rigidly connects two occurrences, so groups spread across
//! those mates until a full scan changes nothing. `frame_*` mates are
//! special: they record a named frame on the already-assigned side.

use mateforge_types::OccurrencePath;
use mateforge_types::api::AssemblyFeature;
use serde::Serialize;
use tracing::debug;

use crate::classifier::{FRAME_PREFIX, is_dof, is_well_formed};
use crate::occurrence::{Assignation, OccurrenceIndex};

/// A named frame attached to an anchor occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameAnnotation {
    pub name: String,
    /// Occurrence whose pose defines the frame.
    pub occurrence: OccurrencePath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorFrames {
    pub anchor: OccurrencePath,
    pub frames: Vec<FrameAnnotation>,
}

/// Frame annotations grouped by anchor, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Frames(Vec<AnchorFrames>);

impl Frames {
    pub fn push(&mut self, anchor: &OccurrencePath, frame: FrameAnnotation) {
        match self.0.iter_mut().find(|a| &a.anchor == anchor) {
            Some(entry) => entry.frames.push(frame),
            None => self.0.push(AnchorFrames {
                anchor: anchor.clone(),
                frames: vec![frame],
            }),
        }
    }

    /// Frames anchored on `anchor`, empty when there are none.
    pub fn get(&self, anchor: &OccurrencePath) -> &[FrameAnnotation] {
        self.0
            .iter()
            .find(|a| &a.anchor == anchor)
            .map(|a| a.frames.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnchorFrames> {
        self.0.iter()
    }

    /// Total number of frames over all anchors.
    pub fn len(&self) -> usize {
        self.0.iter().map(|a| a.frames.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Propagation {
    pub frames: Frames,
    /// Full scans performed, the last one being the scan without change.
    pub passes: usize,
    /// Occurrences that joined a group during propagation.
    pub merged: usize,
}

/// Spread link groups over the non-DOF mates until a fixed point.
///
/// A mate acts only when exactly one side is assigned; mates touching an
/// occurrence missing from the index are ignored.
pub fn propagate(
    index: &mut OccurrenceIndex,
    mates: &[&AssemblyFeature],
    draw_frames: bool,
) -> Propagation {
    let candidates: Vec<_> = mates
        .iter()
        .filter_map(|f| f.as_mate())
        .filter(|m| !is_dof(m) && is_well_formed(m))
        .collect();

    let mut result = Propagation::default();
    loop {
        result.passes += 1;
        let mut changed = false;

        for mate in &candidates {
            let a = OccurrencePath::from(mate.mated_entities[0].mated_occurrence.as_slice());
            let b = OccurrencePath::from(mate.mated_entities[1].mated_occurrence.as_slice());
            if !index.contains(&a) || !index.contains(&b) {
                continue;
            }

            let (anchor, other, group) =
                match (index.assignation(&a).cloned(), index.assignation(&b).cloned()) {
                    (Some(group), None) => (a, b, group),
                    (None, Some(group)) => (b, a, group),
                    _ => continue,
                };

            let group = match mate.name.strip_prefix(FRAME_PREFIX) {
                Some(name) => {
                    result.frames.push(
                        &anchor,
                        FrameAnnotation {
                            name: name.to_string(),
                            occurrence: other.clone(),
                        },
                    );
                    if draw_frames { group } else { Assignation::Frame }
                }
                None => group,
            };

            debug!(occurrence = %other, via = %mate.name, "occurrence merged");
            index.assign(&other, group);
            result.merged += 1;
            changed = true;
        }

        if !changed {
            break;
        }
    }

    debug!(
        passes = result.passes,
        merged = result.merged,
        frames = result.frames.len(),
        "link assignation propagated"
    );
    result
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
