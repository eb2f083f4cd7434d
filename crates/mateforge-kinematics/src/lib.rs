//! `mateforge-kinematics` – assembly mates to kinematic tree.
//!
//! Reads a CAD assembly snapshot and works out which occurrences move
//! together, which mates are joints and how the resulting links hang off
//! each other.
//!
//! # Modules
//!
//! - [`transform`] – [`Transform`][transform::Transform]: 4×4 rigid
//!   transforms over `nalgebra`.
//! - [`occurrence`] – [`OccurrenceIndex`][occurrence::OccurrenceIndex]:
//!   occurrence path → resolved instance, world pose and link group.
//! - [`classifier`] – turns `dof_*` mates into child → parent
//!   [`Relation`][classifier::Relation]s carrying a [`Joint`][classifier::Joint].
//! - [`limits`] – [`LimitsSource`][limits::LimitsSource] and the
//!   feature-list backed [`FeatureLimits`][limits::FeatureLimits].
//! - [`propagation`] – spreads link groups over rigid mates and collects
//!   `frame_*` annotations.
//! - [`tree`] – trunk selection, orphan sweep and
//!   [`TreeNode`][tree::TreeNode] construction.
//! - [`resolver`] – [`resolve`] runs every stage and returns a
//!   [`ResolvedRobot`].

pub mod classifier;
pub mod limits;
pub mod occurrence;
pub mod propagation;
pub mod resolver;
pub mod transform;
pub mod tree;

pub use classifier::{Joint, Relation, Relations};
pub use limits::{FeatureLimits, LimitsSource, NoLimits};
pub use occurrence::{Assignation, Occurrence, OccurrenceIndex};
pub use propagation::{FrameAnnotation, Frames};
pub use resolver::{ResolveOptions, ResolvedRobot, active_features, resolve};
pub use transform::Transform;
pub use tree::TreeNode;
