//! [`OccurrenceIndex`] – occurrence path → resolved instance and world pose.
//!
//! The index is built once per assembly snapshot. Each raw occurrence path is
//! resolved against the root instance list, descending into sub-assembly
//! instance lists through a precomputed `(documentId, documentMicroversion,
//! elementId)` table. Occurrences that cannot be resolved are reported and
//! left out; every later stage treats them as absent.
//!
//! The index also owns the mutable per-occurrence state of a resolution run:
//! the link-group [`Assignation`] and the optional explicit link name.

use std::collections::HashMap;

use mateforge_types::api::{AssemblyDefinition, AssemblyFeature, Instance, SubAssemblyKey};
use mateforge_types::{MateError, OccurrencePath};
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::transform::Transform;

/// Mate connector name prefix that gives an occurrence an explicit link name.
pub const LINK_PREFIX: &str = "link_";

// ─────────────────────────────────────────────────────────────────────────────
// Occurrence
// ─────────────────────────────────────────────────────────────────────────────

/// Link group an occurrence belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "seed", rename_all = "lowercase")]
pub enum Assignation {
    /// Rigid link seeded by the given occurrence.
    Link(OccurrencePath),
    /// Reserved pseudo-group for frame occurrences that are not drawn.
    Frame,
}

/// A resolved occurrence and its per-run state.
#[derive(Debug, Clone, Serialize)]
pub struct Occurrence {
    pub path: OccurrencePath,
    pub instance: Instance,
    /// World-frame pose of the occurrence.
    pub transform: Transform,
    pub fixed: bool,
    pub assignation: Option<Assignation>,
    pub link_name: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Instance lookup
// ─────────────────────────────────────────────────────────────────────────────

/// Precomputed instance tables: the root list plus one table per loaded
/// sub-assembly, each keyed by instance id.
struct InstanceLookup<'a> {
    root: HashMap<&'a str, &'a Instance>,
    sub_assemblies: HashMap<SubAssemblyKey, HashMap<&'a str, &'a Instance>>,
}

impl<'a> InstanceLookup<'a> {
    fn new(assembly: &'a AssemblyDefinition) -> Self {
        let table = |instances: &'a [Instance]| {
            instances
                .iter()
                .map(|i| (i.id.as_str(), i))
                .collect::<HashMap<_, _>>()
        };
        Self {
            root: table(&assembly.root_assembly.instances),
            sub_assemblies: assembly
                .sub_assemblies
                .iter()
                .map(|sub| (sub.key(), table(&sub.instances)))
                .collect(),
        }
    }

    /// Walk `path` segment by segment; every segment but the last must name
    /// a sub-assembly instance whose definition was loaded.
    fn resolve(&self, path: &[String]) -> Option<&'a Instance> {
        let (last, heads) = path.split_last()?;
        let mut table = &self.root;
        for segment in heads {
            let instance = table.get(segment.as_str())?;
            if !instance.is_assembly() {
                return None;
            }
            table = self.sub_assemblies.get(&instance.sub_assembly_key())?;
        }
        table.get(last.as_str()).copied()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OccurrenceIndex
// ─────────────────────────────────────────────────────────────────────────────

/// Occurrence path → [`Occurrence`], in the order the service listed them.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceIndex {
    occurrences: Vec<Occurrence>,
    by_path: HashMap<OccurrencePath, usize>,
    unresolved: Vec<OccurrencePath>,
    fixed: Option<OccurrencePath>,
}

impl OccurrenceIndex {
    /// Build the index from an assembly definition.
    ///
    /// # Errors
    ///
    /// Returns [`MateError::MultipleFixedOccurrences`] when more than one
    /// occurrence is flagged as fixed.
    pub fn build(assembly: &AssemblyDefinition) -> Result<Self, MateError> {
        let raw_occurrences = &assembly.root_assembly.occurrences;

        let fixed: Vec<OccurrencePath> = raw_occurrences
            .iter()
            .filter(|o| o.fixed)
            .map(|o| OccurrencePath::from(o.path.as_slice()))
            .collect();
        if fixed.len() > 1 {
            return Err(MateError::MultipleFixedOccurrences(fixed));
        }

        let lookup = InstanceLookup::new(assembly);
        let mut index = Self {
            fixed: fixed.into_iter().next(),
            ..Self::default()
        };

        for raw in raw_occurrences {
            let path = OccurrencePath::from(raw.path.as_slice());
            let Some(instance) = lookup.resolve(&raw.path) else {
                warn!(occurrence = %path, "unable to resolve the instance of this occurrence, ignoring it");
                index.unresolved.push(path);
                continue;
            };
            let Some(transform) = Transform::from_row_major(&raw.transform) else {
                warn!(
                    occurrence = %path,
                    len = raw.transform.len(),
                    "occurrence transform is not a 4x4 matrix, ignoring it"
                );
                index.unresolved.push(path);
                continue;
            };
            index.insert(Occurrence {
                path,
                instance: instance.clone(),
                transform,
                fixed: raw.fixed,
                assignation: None,
                link_name: None,
            });
        }

        debug!(
            resolved = index.len(),
            unresolved = index.unresolved.len(),
            "occurrence index built"
        );
        Ok(index)
    }

    fn insert(&mut self, occurrence: Occurrence) {
        match self.by_path.get(&occurrence.path) {
            Some(&i) => self.occurrences[i] = occurrence,
            None => {
                self.by_path
                    .insert(occurrence.path.clone(), self.occurrences.len());
                self.occurrences.push(occurrence);
            }
        }
    }

    /// Set explicit link names from `link_<name>` mate connectors.
    pub fn apply_link_names(&mut self, features: &[&AssemblyFeature]) {
        for connector in features.iter().filter_map(|f| f.as_mate_connector()) {
            let Some(name) = connector.name.strip_prefix(LINK_PREFIX) else {
                continue;
            };
            let path = OccurrencePath::from(connector.occurrence.as_slice());
            if name.is_empty() {
                warn!(connector = %connector.name, "link connector without a name, ignoring it");
                continue;
            }
            match self.get_mut(&path) {
                Some(occurrence) => occurrence.link_name = Some(name.to_string()),
                None => {
                    warn!(occurrence = %path, connector = %connector.name, "link connector on an unknown occurrence, ignoring it")
                }
            }
        }
    }

    pub fn get(&self, path: &OccurrencePath) -> Option<&Occurrence> {
        self.by_path.get(path).map(|&i| &self.occurrences[i])
    }

    pub fn get_mut(&mut self, path: &OccurrencePath) -> Option<&mut Occurrence> {
        self.by_path.get(path).map(|&i| &mut self.occurrences[i])
    }

    pub fn contains(&self, path: &OccurrencePath) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn assignation(&self, path: &OccurrencePath) -> Option<&Assignation> {
        self.get(path).and_then(|o| o.assignation.as_ref())
    }

    /// Put `path` into `group`.  Returns `false` when the occurrence is not
    /// in the index.
    pub fn assign(&mut self, path: &OccurrencePath, group: Assignation) -> bool {
        match self.get_mut(path) {
            Some(occurrence) => {
                occurrence.assignation = Some(group);
                true
            }
            None => false,
        }
    }

    /// Paths of occurrences that have no link group yet, in index order.
    pub fn unassigned(&self) -> Vec<OccurrencePath> {
        self.occurrences
            .iter()
            .filter(|o| o.assignation.is_none())
            .map(|o| o.path.clone())
            .collect()
    }

    /// Occurrences sharing `group`.
    pub fn members<'a>(&'a self, group: &'a Assignation) -> impl Iterator<Item = &'a Occurrence> {
        self.occurrences
            .iter()
            .filter(move |o| o.assignation.as_ref() == Some(group))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.iter()
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Occurrences left out because their instance or transform could not
    /// be resolved.
    pub fn unresolved(&self) -> &[OccurrencePath] {
        &self.unresolved
    }

    /// The occurrence flagged as fixed, if any.
    pub fn fixed(&self) -> Option<&OccurrencePath> {
        self.fixed.as_ref()
    }
}

impl Serialize for OccurrenceIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.occurrences.serialize(serializer)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
