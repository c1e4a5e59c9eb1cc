use crate::sdmx::MaintainableRef;

/// Splits an SDMX URN or short reference into the maintainable it names and,
/// for item URNs such as concepts, the trailing item id.
///
/// Accepted shapes:
/// - `urn:sdmx:org.sdmx.infomodel.codelist.Codelist=IMF:CL_FREQ(1.0.0)`
/// - `urn:sdmx:org.sdmx.infomodel.conceptscheme.Concept=IMF:CS_MASTER(1.0.0).FREQ`
/// - `IMF:CL_FREQ(1.0.0)`, `IMF:CL_FREQ`, `CL_FREQ`
pub fn parse_urn(s: &str) -> Option<(MaintainableRef, Option<String>)> {
    let s = s.trim();
    let body = match s.rsplit_once('=') {
        Some((_, body)) => body,
        None => s,
    };
    let (agency, rest) = match body.split_once(':') {
        Some((a, r)) => (a, r),
        None => ("", body),
    };

    let (id, version, item) = match rest.split_once('(') {
        Some((id, tail)) => {
            let (version, after) = tail.split_once(')')?;
            let item = after.strip_prefix('.').filter(|i| !i.is_empty());
            (id, version, item)
        }
        None => match rest.split_once('.') {
            Some((id, item)) => (id, "", Some(item).filter(|i| !i.is_empty())),
            None => (rest, "", None),
        },
    };

    if id.is_empty() {
        return None;
    }
    Some((
        MaintainableRef::new(agency, id, version),
        item.map(str::to_string),
    ))
}
