use std::{fmt, str::FromStr};

use anyhow::{bail, Error, Result};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// The symbol used by listing forms that express price tiers as repeated
/// currency signs.
const PRICE_SYMBOL: char = '₹';

/// A business as it is searched, filtered and sorted by the directory.
///
/// Records are normalized before they reach the directory, so every field
/// is present; unknown values are represented by their lowest-priority
/// default (empty string, zero rating, no price range, no timestamp).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BusinessRecord {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) sub_category: String,
    pub(crate) area: String,
    pub(crate) city: String,
    pub(crate) description: String,
    pub(crate) rating: Rating,
    pub(crate) price_range: Option<PriceRange>,
    pub(crate) created_at: Option<Timestamp>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Rating {
    /// Average star rating in `[0, 5]`.
    pub(crate) average: f64,
    pub(crate) total_reviews: u32,
}

impl Rating {
    pub(crate) const MAX_AVERAGE: f64 = 5.0;

    /// Builds a rating from loosely typed values, clamping anything outside
    /// the valid range instead of rejecting it.
    pub(crate) fn sanitized(average: Option<f64>, total_reviews: Option<i64>) -> Self {
        let average = average
            .filter(|avg| avg.is_finite() && *avg > 0.0)
            .map_or(0.0, |avg| avg.min(Self::MAX_AVERAGE));
        let total_reviews = total_reviews
            .map_or(0, |n| u32::try_from(n.max(0)).unwrap_or(u32::MAX));
        Self {
            average,
            total_reviews,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PriceRange {
    Budget,
    Moderate,
    Premium,
    Luxury,
}

impl PriceRange {
    pub(crate) const ALL: [PriceRange; 4] = [
        PriceRange::Budget,
        PriceRange::Moderate,
        PriceRange::Premium,
        PriceRange::Luxury,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Moderate => "moderate",
            Self::Premium => "premium",
            Self::Luxury => "luxury",
        }
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the named tiers (case-insensitive) and the symbolic form, where
/// the number of currency signs is the tier's position.
impl FromStr for PriceRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(tier) = Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s))
        {
            return Ok(tier);
        }
        if !s.is_empty() && s.chars().all(|c| c == PRICE_SYMBOL) {
            if let Some(tier) = Self::ALL.get(s.chars().count() - 1) {
                return Ok(*tier);
            }
        }
        bail!("unknown price range: {s:?}")
    }
}
