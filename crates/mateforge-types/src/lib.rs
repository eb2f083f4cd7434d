//! `mateforge-types` – shared vocabulary of the mateforge workspace.
//!
//! Holds the domain types that every other crate speaks (occurrence paths,
//! joint types, joint limits), the fatal error taxonomy of the resolver, and
//! in [`api`] the raw shapes of the CAD-service JSON responses.

pub mod api;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Ordered list of instance ids identifying one occurrence, root to leaf.
///
/// Segments are kept separate: CAD-service ids may themselves contain
/// slashes, so a path is never joined into a single string for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccurrencePath(pub Vec<String>);

impl OccurrencePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Path made of a single top-level instance id.
    pub fn root(id: impl Into<String>) -> Self {
        Self(vec![id.into()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[String]> for OccurrencePath {
    fn from(segments: &[String]) -> Self {
        Self(segments.to_vec())
    }
}

impl From<Vec<&str>> for OccurrencePath {
    fn from(segments: Vec<&str>) -> Self {
        Self(segments.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for OccurrencePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" > "))
    }
}

/// Kind of joint a DOF mate turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    Fixed,
    Revolute,
    Prismatic,
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JointType::Fixed => write!(f, "fixed"),
            JointType::Revolute => write!(f, "revolute"),
            JointType::Prismatic => write!(f, "prismatic"),
        }
    }
}

/// Mate type as declared in the CAD assembly.
///
/// Deserialized from the raw upper-case string; anything unknown is kept
/// verbatim in [`MateType::Other`] so it can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MateType {
    Revolute,
    Cylindrical,
    Slider,
    Fastened,
    Planar,
    Ball,
    Parallel,
    PinSlot,
    Other(String),
}

impl MateType {
    /// The joint a DOF mate of this type produces, or `None` when the type
    /// cannot be expressed as a joint.
    pub fn joint_type(&self) -> Option<JointType> {
        match self {
            MateType::Revolute | MateType::Cylindrical => Some(JointType::Revolute),
            MateType::Slider => Some(JointType::Prismatic),
            MateType::Fastened => Some(JointType::Fixed),
            MateType::Planar
            | MateType::Ball
            | MateType::Parallel
            | MateType::PinSlot
            | MateType::Other(_) => None,
        }
    }
}

impl From<String> for MateType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "REVOLUTE" => MateType::Revolute,
            "CYLINDRICAL" => MateType::Cylindrical,
            "SLIDER" => MateType::Slider,
            "FASTENED" => MateType::Fastened,
            "PLANAR" => MateType::Planar,
            "BALL" => MateType::Ball,
            "PARALLEL" => MateType::Parallel,
            "PIN_SLOT" => MateType::PinSlot,
            _ => MateType::Other(raw),
        }
    }
}

impl From<MateType> for String {
    fn from(mate_type: MateType) -> Self {
        mate_type.to_string()
    }
}

impl fmt::Display for MateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MateType::Revolute => write!(f, "REVOLUTE"),
            MateType::Cylindrical => write!(f, "CYLINDRICAL"),
            MateType::Slider => write!(f, "SLIDER"),
            MateType::Fastened => write!(f, "FASTENED"),
            MateType::Planar => write!(f, "PLANAR"),
            MateType::Ball => write!(f, "BALL"),
            MateType::Parallel => write!(f, "PARALLEL"),
            MateType::PinSlot => write!(f, "PIN_SLOT"),
            MateType::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Joint range in radians (revolute) or meters (prismatic).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub lower: f64,
    pub upper: f64,
}

impl JointLimits {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Limits seen from a joint frame flipped 180° about X: `(lo, hi)`
    /// becomes `(-hi, -lo)`.
    pub fn inverted(self) -> Self {
        Self::new(-self.upper, -self.lower)
    }
}

/// Fatal conditions of the assembly-to-kinematic-tree resolution.
///
/// Any of these aborts the run; recoverable conditions are only logged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MateError {
    #[error("There should be exactly one fixed occurrence, found {}: {}", .0.len(), join_paths(.0))]
    MultipleFixedOccurrences(Vec<OccurrencePath>),

    #[error(
        "\"{name}\" is declared as a DOF but the mate type is {mate_type}; \
         only REVOLUTE, CYLINDRICAL, SLIDER and FASTENED are supported"
    )]
    UnsupportedDofMate { name: String, mate_type: MateType },

    #[error("DOF mate \"{0}\" has no joint name (it should be named \"dof_<name>\")")]
    EmptyJointName(String),

    #[error(
        "Occurrence {child} is already connected to {existing_parent} by joint \"{existing_joint}\" \
         and can't also be connected to {parent} by joint \"{joint}\". \
         Hint: the first entity of a DOF mate is the child, check the order in which the entities were selected"
    )]
    AlreadyConnected {
        child: OccurrencePath,
        existing_parent: OccurrencePath,
        existing_joint: String,
        parent: OccurrencePath,
        joint: String,
    },

    #[error("Unable to find an assembly named \"{0}\" in this document")]
    AssemblyNotFound(String),

    #[error("The assembly has no instances")]
    EmptyAssembly,

    #[error("Several trunk candidates found ({}); the DOF mates don't form a single tree", join_paths(.0))]
    AmbiguousTrunk(Vec<OccurrencePath>),

    #[error("No trunk found: every DOF parent is also the child of another DOF")]
    NoTrunk,

    #[error("Invalid limit expression for \"{mate}\": {reason}")]
    InvalidLimitExpression { mate: String, reason: String },
}

fn join_paths(paths: &[OccurrencePath]) -> String {
    paths
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
