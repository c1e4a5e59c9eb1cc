//! SDMX-JSON structure message decoding (1.0 and 2.0 layouts).

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::sdmx::urn::parse_urn;
use crate::sdmx::{
    Code, Codelist, Component, ComponentKind, Concept, ConceptRef, ConceptScheme, DataStructure,
    Dataflow, MaintainableRef, Representation, StructureMessage,
};

/// Localised text: either a plain string or a `{lang: text}` map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Text {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl Text {
    fn best(&self) -> String {
        match self {
            Text::Plain(s) => s.clone(),
            Text::Localized(m) => m
                .get("en")
                .or_else(|| m.values().next())
                .cloned()
                .unwrap_or_default(),
        }
    }
}

pub(crate) fn text(plain: &Option<Text>, localized: &Option<BTreeMap<String, String>>) -> String {
    if let Some(t) = plain {
        return t.best();
    }
    localized
        .as_ref()
        .map(|m| Text::Localized(m.clone()).best())
        .unwrap_or_default()
}

/// A reference may be a URN string or an explicit object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRef {
    Urn(String),
    Object {
        id: String,
        #[serde(default, rename = "agencyID")]
        agency_id: Option<String>,
        #[serde(default, rename = "maintainableParentID")]
        parent_id: Option<String>,
        #[serde(default, rename = "maintainableParentVersion")]
        parent_version: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },
}

impl RawRef {
    fn maintainable(&self) -> Option<MaintainableRef> {
        match self {
            RawRef::Urn(s) => parse_urn(s).map(|(r, _)| r),
            RawRef::Object {
                id,
                agency_id,
                version,
                ..
            } => Some(MaintainableRef::new(
                agency_id.clone().unwrap_or_default(),
                id.clone(),
                version.clone().unwrap_or_default(),
            )),
        }
    }

    fn concept(&self) -> Option<ConceptRef> {
        match self {
            RawRef::Urn(s) => {
                let (scheme, item) = parse_urn(s)?;
                Some(ConceptRef {
                    scheme,
                    concept_id: item?,
                })
            }
            RawRef::Object {
                id,
                agency_id,
                parent_id,
                parent_version,
                ..
            } => Some(ConceptRef {
                scheme: MaintainableRef::new(
                    agency_id.clone().unwrap_or_default(),
                    parent_id.clone()?,
                    parent_version.clone().unwrap_or_default(),
                ),
                concept_id: id.clone(),
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawRepresentation {
    #[serde(default)]
    enumeration: Option<RawRef>,
}

impl RawRepresentation {
    fn into_model(self) -> Representation {
        Representation {
            enumerated: self.enumeration.and_then(|r| r.maintainable()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComponent {
    id: String,
    #[serde(default)]
    position: Option<usize>,
    #[serde(default)]
    concept_identity: Option<RawRef>,
    #[serde(default)]
    local_representation: Option<RawRepresentation>,
}

impl RawComponent {
    fn into_model(self, kind: ComponentKind) -> Component {
        Component {
            id: self.id,
            kind,
            concept_identity: self.concept_identity.and_then(|r| r.concept()),
            local_representation: self.local_representation.map(RawRepresentation::into_model),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDimensionList {
    #[serde(default)]
    dimensions: Vec<RawComponent>,
    #[serde(default)]
    time_dimensions: Vec<RawComponent>,
    // 2.0 carries a single time dimension object in some payloads
    #[serde(default)]
    time_dimension: Option<RawComponent>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAttributeList {
    #[serde(default)]
    attributes: Vec<RawComponent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComponents {
    #[serde(default)]
    dimension_list: RawDimensionList,
    #[serde(default)]
    attribute_list: RawAttributeList,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMaintainable {
    id: String,
    #[serde(default, rename = "agencyID")]
    agency_id: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    name: Option<Text>,
    #[serde(default)]
    names: Option<BTreeMap<String, String>>,
}

impl RawMaintainable {
    fn name(&self) -> String {
        text(&self.name, &self.names)
    }
}

#[derive(Debug, Deserialize)]
struct RawDataflow {
    #[serde(flatten)]
    head: RawMaintainable,
    #[serde(default)]
    structure: Option<RawRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDataStructure {
    #[serde(flatten)]
    head: RawMaintainable,
    #[serde(default)]
    data_structure_components: RawComponents,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConcept {
    id: String,
    #[serde(default)]
    name: Option<Text>,
    #[serde(default)]
    names: Option<BTreeMap<String, String>>,
    #[serde(default)]
    core_representation: Option<RawRepresentation>,
}

#[derive(Debug, Deserialize)]
struct RawConceptScheme {
    #[serde(flatten)]
    head: RawMaintainable,
    #[serde(default)]
    concepts: Vec<RawConcept>,
}

#[derive(Debug, Deserialize)]
struct RawCode {
    id: String,
    #[serde(default)]
    name: Option<Text>,
    #[serde(default)]
    names: Option<BTreeMap<String, String>>,
    #[serde(default)]
    description: Option<Text>,
    #[serde(default)]
    descriptions: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct RawCodelist {
    #[serde(flatten)]
    head: RawMaintainable,
    #[serde(default)]
    codes: Vec<RawCode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStructures {
    #[serde(default)]
    dataflows: Vec<RawDataflow>,
    #[serde(default)]
    data_structures: Vec<RawDataStructure>,
    #[serde(default)]
    concept_schemes: Vec<RawConceptScheme>,
    #[serde(default)]
    codelists: Vec<RawCodelist>,
}

#[derive(Debug, Deserialize)]
struct RawStructureMessage {
    data: RawStructures,
}

impl StructureMessage {
    /// Decodes an SDMX-JSON structure message.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawStructureMessage = serde_json::from_str(text)
            .map_err(|e| Error::parse(format!("structure message: {e}")))?;
        Ok(raw.data.into_model())
    }
}

impl RawStructures {
    fn into_model(self) -> StructureMessage {
        StructureMessage {
            dataflows: self
                .dataflows
                .into_iter()
                .map(|f| Dataflow {
                    name: f.head.name(),
                    structure: f.structure.and_then(|r| r.maintainable()),
                    id: f.head.id,
                    agency_id: f.head.agency_id,
                    version: f.head.version,
                })
                .collect(),
            data_structures: self.data_structures.into_iter().map(dsd_model).collect(),
            concept_schemes: self
                .concept_schemes
                .into_iter()
                .map(|s| ConceptScheme {
                    name: s.head.name(),
                    concepts: s
                        .concepts
                        .into_iter()
                        .map(|c| Concept {
                            name: text(&c.name, &c.names),
                            core_representation: c.core_representation.map(RawRepresentation::into_model),
                            id: c.id,
                        })
                        .collect(),
                    id: s.head.id,
                    agency_id: s.head.agency_id,
                    version: s.head.version,
                })
                .collect(),
            codelists: self
                .codelists
                .into_iter()
                .map(|cl| Codelist {
                    name: cl.head.name(),
                    codes: cl
                        .codes
                        .into_iter()
                        .map(|c| Code {
                            name: text(&c.name, &c.names),
                            description: text(&c.description, &c.descriptions),
                            id: c.id,
                        })
                        .collect(),
                    id: cl.head.id,
                    agency_id: cl.head.agency_id,
                    version: cl.head.version,
                })
                .collect(),
        }
    }
}

fn dsd_model(d: RawDataStructure) -> DataStructure {
    let name = d.head.name();
    let RawComponents {
        dimension_list,
        attribute_list,
    } = d.data_structure_components;

    let mut dims = dimension_list.dimensions;
    // Payloads usually list dimensions in key order already; position is authoritative when present.
    dims.sort_by_key(|c| c.position.unwrap_or(usize::MAX));
    let mut dimensions: Vec<Component> = dims
        .into_iter()
        .map(|c| c.into_model(ComponentKind::Dimension))
        .collect();
    dimensions.extend(
        dimension_list
            .time_dimensions
            .into_iter()
            .chain(dimension_list.time_dimension)
            .map(|c| c.into_model(ComponentKind::TimeDimension)),
    );

    DataStructure {
        id: d.head.id,
        agency_id: d.head.agency_id,
        version: d.head.version,
        name,
        dimensions,
        attributes: attribute_list
            .attributes
            .into_iter()
            .map(|c| c.into_model(ComponentKind::Attribute))
            .collect(),
    }
}
