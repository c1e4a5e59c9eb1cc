//! In-memory SDMX structural and data messages.
//!
//! Messages are decoded from SDMX-JSON (see [`StructureMessage::from_json`] and
//! [`DataMessage::from_json`]) and only read afterwards.

mod data;
mod json;
mod resolve;
mod urn;

pub use data::{DataMessage, Observation};
pub use resolve::resolve_codelist;
pub use urn::parse_urn;

/// Reference to a maintainable artefact such as a codelist or concept scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintainableRef {
    pub agency_id: String,
    pub id: String,
    pub version: String,
}

impl MaintainableRef {
    pub fn new(agency_id: impl Into<String>, id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            agency_id: agency_id.into(),
            id: id.into(),
            version: version.into(),
        }
    }
}

/// Reference to one concept inside a concept scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptRef {
    pub scheme: MaintainableRef,
    pub concept_id: String,
}

/// Representation of a component or concept; only the enumeration matters here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Representation {
    pub enumerated: Option<MaintainableRef>,
}

impl Representation {
    pub fn enumerated(cl: MaintainableRef) -> Self {
        Self {
            enumerated: Some(cl),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Dimension,
    TimeDimension,
    Attribute,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Dimension => "dimension",
            ComponentKind::TimeDimension => "time_dimension",
            ComponentKind::Attribute => "attribute",
        }
    }
}

/// A dimension or attribute of a data structure definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub id: String,
    pub kind: ComponentKind,
    pub concept_identity: Option<ConceptRef>,
    pub local_representation: Option<Representation>,
}

impl Component {
    pub fn new(id: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            id: id.into(),
            kind,
            concept_identity: None,
            local_representation: None,
        }
    }

    pub fn with_concept(mut self, concept: ConceptRef) -> Self {
        self.concept_identity = Some(concept);
        self
    }

    pub fn with_local_codelist(mut self, cl: MaintainableRef) -> Self {
        self.local_representation = Some(Representation::enumerated(cl));
        self
    }
}

/// Data structure definition (DSD).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStructure {
    pub id: String,
    pub agency_id: String,
    pub version: String,
    pub name: String,
    /// Dimensions in key order, time dimension last.
    pub dimensions: Vec<Component>,
    pub attributes: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataflow {
    pub id: String,
    pub agency_id: String,
    pub version: String,
    pub name: String,
    pub structure: Option<MaintainableRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    pub id: String,
    pub name: String,
    pub core_representation: Option<Representation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptScheme {
    pub id: String,
    pub agency_id: String,
    pub version: String,
    pub name: String,
    pub concepts: Vec<Concept>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codelist {
    pub id: String,
    pub agency_id: String,
    pub version: String,
    pub name: String,
    pub codes: Vec<Code>,
}

impl Codelist {
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// A decoded structure message. Collections keep the order of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureMessage {
    pub dataflows: Vec<Dataflow>,
    pub data_structures: Vec<DataStructure>,
    pub concept_schemes: Vec<ConceptScheme>,
    pub codelists: Vec<Codelist>,
}

impl StructureMessage {
    /// Codelist collection lookup by id.
    pub fn codelist(&self, id: &str) -> Option<&Codelist> {
        self.codelists.iter().find(|cl| cl.id == id)
    }

    /// Finds the concept a component identifies. Agency and version are only
    /// compared when the message carries several schemes with the same id.
    pub fn concept(&self, r: &ConceptRef) -> Option<&Concept> {
        let mut schemes = self.concept_schemes.iter().filter(|s| s.id == r.scheme.id);
        let exact = schemes
            .clone()
            .find(|s| s.agency_id == r.scheme.agency_id && s.version == r.scheme.version);
        exact
            .or_else(|| schemes.next())
            .and_then(|s| s.concepts.iter().find(|c| c.id == r.concept_id))
    }

    /// The DSD a dataflow points at, or the only/first DSD in the message.
    pub fn data_structure_for(&self, flow: &Dataflow) -> Option<&DataStructure> {
        flow.structure
            .as_ref()
            .and_then(|r| self.data_structures.iter().find(|d| d.id == r.id))
            .or_else(|| self.data_structures.first())
    }
}
