pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Builds an SDMX dimension key: one dot-separated position per group, each
/// group's codes joined with `+`. An empty group selects every value of that
/// dimension. Empty entries and the literal `null` are skipped.
///
/// ```
/// use imfdata::make_key;
///
/// let key = make_key([vec!["Q"], vec!["US", "GB"], vec![]]);
/// assert_eq!(key, "Q.US+GB.");
/// ```
pub fn make_key<G, I, S>(groups: G) -> String
where
    G: IntoIterator<Item = I>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    groups
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .filter_map(|code| {
                    let code = code.as_ref();
                    (!code.is_empty() && !code.eq_ignore_ascii_case("null")).then(|| code.to_string())
                })
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urljoin_handles_slashes() {
        assert_eq!(urljoin("https://a/b/", "c"), "https://a/b/c");
        assert_eq!(urljoin("https://a/b", "/c"), "https://a/b/c");
        assert_eq!(urljoin("https://a/b", "https://x/y"), "https://x/y");
    }

    #[test]
    fn make_key_joins_groups() {
        assert_eq!(make_key([vec!["M"], vec!["US", "GB", "FR"]]), "M.US+GB+FR");
        assert_eq!(make_key([vec![], vec!["US"], vec![]]), ".US.");
        assert_eq!(make_key([vec!["A", "", "null", "NULL"], vec!["Q"]]), "A.Q");
        assert_eq!(make_key(Vec::<Vec<String>>::new()), "");
    }

    #[test]
    fn make_key_passes_codes_through_verbatim() {
        assert_eq!(make_key([vec![" US"], vec!["Nullable"]]), " US.Nullable");
    }

    #[test]
    fn make_key_accepts_single_code_groups() {
        let groups: Vec<Option<&str>> = vec![Some("A"), None, Some("NGDP")];
        assert_eq!(make_key(groups), "A..NGDP");
    }
}
