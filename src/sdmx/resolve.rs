use crate::sdmx::{Codelist, Component, Representation, StructureMessage};

/// Finds the codelist that enumerates `component`, or `None` when the
/// component is not coded.
///
/// Resolution order, first match wins:
/// 1. the component's local representation, if its codelist is in `msg`
/// 2. the core representation of the concept the component identifies
/// 3. a codelist named `CL_<component id>`
pub fn resolve_codelist<'m>(msg: &'m StructureMessage, component: &Component) -> Option<&'m Codelist> {
    let local = enumerated_in(msg, component.local_representation.as_ref());
    if local.is_some() {
        return local;
    }

    let core = component
        .concept_identity
        .as_ref()
        .and_then(|c| msg.concept(c))
        .and_then(|c| enumerated_in(msg, c.core_representation.as_ref()));
    if core.is_some() {
        return core;
    }

    msg.codelist(&format!("CL_{}", component.id))
}

fn enumerated_in<'m>(msg: &'m StructureMessage, repr: Option<&Representation>) -> Option<&'m Codelist> {
    let id = &repr?.enumerated.as_ref()?.id;
    msg.codelist(id)
}
