use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Sort key for display names.
///
/// Names are compared first by their base letters (compatibility
/// decomposition, accents dropped, case folded), so "École" sorts next to
/// "ecole" rather than after "zebra". Ties are broken by the case-folded
/// name and finally by the raw name, which keeps the order total.
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) struct CollationKey {
    base: String,
    folded: String,
    raw: String,
}

impl CollationKey {
    pub(crate) fn new(name: &str) -> Self {
        let base = name
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect();
        Self {
            base,
            folded: name.to_lowercase(),
            raw: name.to_string(),
        }
    }
}
