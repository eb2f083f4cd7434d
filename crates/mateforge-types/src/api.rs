//! Raw shapes of the Onshape REST responses consumed by the resolver.
//!
//! Only the fields the resolver reads are modelled; unknown fields are
//! ignored by serde. Field names follow the service's camelCase JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::MateType;

// ─────────────────────────────────────────────────────────────────────────────
// Documents and elements
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub default_workspace: WorkspaceRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceRef {
    pub id: String,
}

/// One entry of the document element list (part studio, assembly, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,
    pub name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Assembly definition
// ─────────────────────────────────────────────────────────────────────────────

/// Full assembly definition, as returned with mate features, mate
/// connectors and non-solids included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyDefinition {
    pub root_assembly: RootAssembly,
    #[serde(default)]
    pub sub_assemblies: Vec<SubAssembly>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootAssembly {
    #[serde(default)]
    pub occurrences: Vec<RawOccurrence>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub features: Vec<AssemblyFeature>,
    /// Configuration the definition was resolved with, every parameter
    /// spelled out (`"stroke=Long;travel=250+mm"`).
    #[serde(default)]
    pub full_configuration: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubAssembly {
    pub document_id: String,
    pub document_microversion: String,
    pub element_id: String,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

impl SubAssembly {
    /// Key matching an [`Instance`] of type `Assembly` to its definition.
    pub fn key(&self) -> SubAssemblyKey {
        SubAssemblyKey {
            document_id: self.document_id.clone(),
            document_microversion: self.document_microversion.clone(),
            element_id: self.element_id.clone(),
        }
    }
}

/// `(documentId, documentMicroversion, elementId)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubAssemblyKey {
    pub document_id: String,
    pub document_microversion: String,
    pub element_id: String,
}

/// A part or sub-assembly instance inside an assembly's instance list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `"Part"` or `"Assembly"`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub document_microversion: String,
    #[serde(default)]
    pub element_id: String,
}

impl Instance {
    pub fn is_assembly(&self) -> bool {
        self.kind == "Assembly"
    }

    pub fn sub_assembly_key(&self) -> SubAssemblyKey {
        SubAssemblyKey {
            document_id: self.document_id.clone(),
            document_microversion: self.document_microversion.clone(),
            element_id: self.element_id.clone(),
        }
    }
}

/// One placed occurrence: instance path plus flattened row-major 4×4
/// world transform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOccurrence {
    pub path: Vec<String>,
    #[serde(default)]
    pub transform: Vec<f64>,
    #[serde(default)]
    pub fixed: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Assembly features (mates, mate connectors)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyFeature {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub suppressed: bool,
    /// `"mate"`, `"mateConnector"`, `"mateGroup"`, ...
    pub feature_type: String,
    #[serde(default)]
    pub feature_data: FeatureData,
}

impl AssemblyFeature {
    /// Mate payload, when this feature is a mate.
    pub fn as_mate(&self) -> Option<&MateData> {
        match &self.feature_data {
            FeatureData::Mate(mate) if self.feature_type == "mate" => Some(mate),
            _ => None,
        }
    }

    /// Mate connector payload, when this feature is a mate connector.
    pub fn as_mate_connector(&self) -> Option<&MateConnectorData> {
        match &self.feature_data {
            FeatureData::MateConnector(connector) if self.feature_type == "mateConnector" => {
                Some(connector)
            }
            _ => None,
        }
    }
}

/// Feature payload, discriminated by shape rather than by tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureData {
    Mate(MateData),
    MateConnector(MateConnectorData),
    Other(serde_json::Value),
}

impl Default for FeatureData {
    fn default() -> Self {
        FeatureData::Other(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MateData {
    pub name: String,
    pub mate_type: MateType,
    pub mated_entities: Vec<MatedEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatedEntity {
    #[serde(default)]
    pub mated_occurrence: Vec<String>,
    #[serde(rename = "matedCS")]
    pub mated_cs: CoordinateSystem,
}

/// Local coordinate system of a mated entity, expressed in the frame of
/// the occurrence it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateSystem {
    pub x_axis: [f64; 3],
    pub y_axis: [f64; 3],
    pub z_axis: [f64; 3],
    pub origin: [f64; 3],
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self {
            x_axis: [1.0, 0.0, 0.0],
            y_axis: [0.0, 1.0, 0.0],
            z_axis: [0.0, 0.0, 1.0],
            origin: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MateConnectorData {
    pub name: String,
    pub occurrence: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Feature list (feature-tree view of the assembly)
// ─────────────────────────────────────────────────────────────────────────────

/// Response of the assembly feature-list endpoint: the mate features with
/// their full parameter list, plus their current states.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureList {
    #[serde(default)]
    pub features: Vec<FeatureEntry>,
    #[serde(default)]
    pub feature_states: HashMap<String, FeatureState>,
}

impl FeatureList {
    /// `true` when the feature state marks `feature_id` as inactive
    /// (suppressed in the current configuration).
    pub fn is_inactive(&self, feature_id: &str) -> bool {
        self.feature_states
            .get(feature_id)
            .is_some_and(|state| state.inactive)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureState {
    #[serde(default)]
    pub inactive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureEntry {
    pub message: FeatureMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterEntry {
    #[serde(default)]
    pub type_name: String,
    pub message: ParameterMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMessage {
    #[serde(default)]
    pub parameter_id: String,
    /// Boolean/enum parameters carry their value here.
    #[serde(default)]
    pub value: serde_json::Value,
    /// Quantity parameters carry an expression such as `"90 deg"`.
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub is_null: bool,
    #[serde(default)]
    pub configuration_parameter_id: String,
    #[serde(default)]
    pub values: Vec<ConfiguredValueEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfiguredValueEntry {
    #[serde(default)]
    pub type_name: String,
    pub message: ConfiguredValueMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfiguredValueMessage {
    #[serde(default)]
    pub boolean_value: Option<bool>,
    #[serde(default)]
    pub enum_value: Option<String>,
    #[serde(default)]
    pub value: Option<Box<ParameterEntry>>,
}
