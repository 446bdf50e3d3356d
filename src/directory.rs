//! The directory query engine.
//!
//! [`query`] narrows an already loaded set of business records with the
//! selections a listing view offers (free-text search, category, location
//! and price range) and orders what is left by one of the [`SortBy`] keys.
//! It is a pure function: inputs are never modified and every call returns a
//! fresh vector, so callers can simply re-run it whenever a selection
//! changes.

mod collate;
mod facet;
mod record;

use std::str::FromStr;

use anyhow::{bail, Error, Result};
use serde::Deserialize;

use self::collate::CollationKey;
pub(crate) use self::{
    facet::Facets,
    record::{BusinessRecord, PriceRange, Rating},
};

/// The selector value meaning "no filter".
pub(crate) const ALL: &str = "all";

/// A filter selection: either everything, or exactly one value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Selection<T = String> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T> Selection<T> {
    /// Interprets a selector value, where a missing value or [`ALL`] means
    /// no filter and anything else is handed to `parse`.
    pub(crate) fn parse_with<E>(
        value: Option<&str>,
        parse: impl FnOnce(&str) -> std::result::Result<T, E>,
    ) -> std::result::Result<Self, E> {
        match value {
            None | Some(ALL) => Ok(Self::All),
            Some(value) => parse(value).map(Self::Only),
        }
    }

    pub(crate) fn matches<U>(&self, value: &U) -> bool
    where
        U: ?Sized,
        T: PartialEq<U>,
    {
        match self {
            Self::All => true,
            Self::Only(selected) => selected == value,
        }
    }

    /// Like [`Selection::matches`], but an absent value only passes when
    /// nothing is selected.
    pub(crate) fn matches_some<U>(&self, value: Option<&U>) -> bool
    where
        T: PartialEq<U>,
    {
        match (self, value) {
            (Self::All, _) => true,
            (Self::Only(selected), Some(value)) => selected == value,
            (Self::Only(_), None) => false,
        }
    }
}

impl Selection<String> {
    pub(crate) fn from_param(value: Option<&str>) -> Self {
        match value {
            None | Some(ALL) => Self::All,
            Some(value) => Self::Only(value.to_string()),
        }
    }
}

/// Which location field a location selection is matched against.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LocationField {
    #[default]
    Area,
    City,
}

impl LocationField {
    fn value(self, record: &BusinessRecord) -> &str {
        match self {
            Self::Area => &record.area,
            Self::City => &record.city,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SortBy {
    /// Highest average rating first.
    #[default]
    Rating,
    /// Most reviewed first.
    Reviews,
    /// Alphabetical by name.
    Name,
    /// Most recently created first; records without a creation time last.
    Newest,
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "rating" => Self::Rating,
            "reviews" => Self::Reviews,
            "name" => Self::Name,
            "newest" => Self::Newest,
            _ => bail!("unknown sort key: {s:?}"),
        })
    }
}

/// The selections of a listing view.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct QueryState {
    /// Case-insensitive substring searched in name, category, area and
    /// description. Empty means no search.
    pub(crate) search_term: String,
    pub(crate) category: Selection,
    pub(crate) sub_category: Selection,
    pub(crate) location: Selection,
    pub(crate) location_field: LocationField,
    pub(crate) price_range: Selection<PriceRange>,
    pub(crate) sort_by: SortBy,
}

impl QueryState {
    fn retains(&self, record: &BusinessRecord, term: &str) -> bool {
        (term.is_empty() || matches_search(record, term))
            && self.category.matches(record.category.as_str())
            && self.sub_category.matches(record.sub_category.as_str())
            && self
                .location
                .matches(self.location_field.value(record))
            && self.price_range.matches_some(record.price_range.as_ref())
    }
}

/// Returns the records selected by `state`, in `state.sort_by` order.
///
/// Records that compare equal under the sort key keep their input order.
pub(crate) fn query(records: &[BusinessRecord], state: &QueryState) -> Vec<BusinessRecord> {
    let term = state.search_term.to_lowercase();
    let mut selected: Vec<BusinessRecord> = records
        .iter()
        .filter(|record| state.retains(record, &term))
        .cloned()
        .collect();
    sort(&mut selected, state.sort_by);
    selected
}

fn matches_search(record: &BusinessRecord, term: &str) -> bool {
    [
        &record.name,
        &record.category,
        &record.area,
        &record.description,
    ]
    .into_iter()
    .any(|field| field.to_lowercase().contains(term))
}

fn sort(records: &mut [BusinessRecord], sort_by: SortBy) {
    match sort_by {
        SortBy::Rating => {
            records.sort_by(|a, b| b.rating.average.total_cmp(&a.rating.average));
        }
        SortBy::Reviews => {
            records.sort_by(|a, b| b.rating.total_reviews.cmp(&a.rating.total_reviews));
        }
        SortBy::Name => records.sort_by_cached_key(|record| CollationKey::new(&record.name)),
        SortBy::Newest => records.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::{
        query, BusinessRecord, LocationField, PriceRange, QueryState, Rating, Selection, SortBy,
    };

    fn business(id: &str, name: &str, category: &str, area: &str, rating: (f64, u32)) -> BusinessRecord {
        BusinessRecord {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            area: area.to_string(),
            rating: Rating {
                average: rating.0,
                total_reviews: rating.1,
            },
            ..Default::default()
        }
    }

    fn cafe_and_diner() -> Vec<BusinessRecord> {
        vec![
            business("1", "Blue Cafe", "Food", "Andheri", (4.2, 10)),
            business("2", "Red Diner", "Food", "Bandra", (4.8, 3)),
        ]
    }

    fn sample() -> Vec<BusinessRecord> {
        let mut records = vec![
            business("a", "Zen Spa", "Wellness", "Juhu", (4.5, 40)),
            business("b", "Blue Cafe", "Food", "Andheri", (4.2, 10)),
            business("c", "anchor Gym", "Fitness", "Bandra", (4.5, 7)),
            business("d", "Red Diner", "Food", "Bandra", (4.8, 3)),
            business("e", "Corner Books", "Retail", "Andheri", (3.9, 22)),
        ];
        records[0].price_range = Some(PriceRange::Luxury);
        records[1].price_range = Some(PriceRange::Budget);
        records[3].price_range = Some(PriceRange::Moderate);
        records[1].city = "Mumbai".to_string();
        records[3].city = "Pune".to_string();
        records[2].description = "Open-air CAFE and weights".to_string();
        records[4].sub_category = "Books".to_string();
        records
    }

    fn ids(records: &[BusinessRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    fn sorted_by(sort_by: SortBy) -> QueryState {
        QueryState {
            sort_by,
            ..Default::default()
        }
    }

    #[test]
    fn category_then_rating() {
        let state = QueryState {
            category: Selection::Only("Food".to_string()),
            sort_by: SortBy::Rating,
            ..Default::default()
        };
        let result = query(&cafe_and_diner(), &state);
        assert_eq!(ids(&result), ["2", "1"]);
    }

    #[test]
    fn search_blue() {
        let state = QueryState {
            search_term: "blue".to_string(),
            ..Default::default()
        };
        let result = query(&cafe_and_diner(), &state);
        assert_eq!(ids(&result), ["1"]);
    }

    #[test]
    fn empty_records() {
        let state = QueryState {
            search_term: "anything".to_string(),
            category: Selection::Only("Food".to_string()),
            price_range: Selection::Only(PriceRange::Premium),
            sort_by: SortBy::Newest,
            ..Default::default()
        };
        assert!(query(&[], &state).is_empty());
        assert!(query(&[], &QueryState::default()).is_empty());
    }

    #[test]
    fn no_filters_is_a_permutation() {
        let records = sample();
        for sort_by in [SortBy::Rating, SortBy::Reviews, SortBy::Name, SortBy::Newest] {
            let result = query(&records, &sorted_by(sort_by));
            assert_eq!(result.len(), records.len());
            let mut result_ids = ids(&result);
            result_ids.sort_unstable();
            assert_eq!(result_ids, ["a", "b", "c", "d", "e"]);
        }
    }

    #[test]
    fn inputs_are_not_modified() {
        let records = sample();
        let before = records.clone();
        let _ = query(&records, &sorted_by(SortBy::Name));
        assert_eq!(records, before);
    }

    #[test]
    fn category_is_exact() {
        let records = sample();
        let state = QueryState {
            category: Selection::Only("Food".to_string()),
            ..Default::default()
        };
        let result = query(&records, &state);
        assert!(!result.is_empty());
        assert!(result.iter().all(|r| r.category == "Food"));

        let state = QueryState {
            category: Selection::Only("food".to_string()),
            ..Default::default()
        };
        assert!(query(&records, &state).is_empty());
    }

    #[test]
    fn search_is_case_insensitive() {
        let records = sample();
        let upper = QueryState {
            search_term: "CAFE".to_string(),
            ..Default::default()
        };
        let lower = QueryState {
            search_term: "cafe".to_string(),
            ..Default::default()
        };
        assert_eq!(query(&records, &upper), query(&records, &lower));
        // Name match and description match.
        assert_eq!(ids(&query(&records, &lower)), ["c", "b"]);
    }

    #[test]
    fn search_covers_category_and_area() {
        let records = sample();
        let state = QueryState {
            search_term: "wellness".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&query(&records, &state)), ["a"]);

        let state = QueryState {
            search_term: "andh".to_string(),
            sort_by: SortBy::Name,
            ..Default::default()
        };
        assert_eq!(ids(&query(&records, &state)), ["b", "e"]);
    }

    #[test]
    fn search_does_not_cover_city() {
        let records = sample();
        let state = QueryState {
            search_term: "mumbai".to_string(),
            ..Default::default()
        };
        assert!(query(&records, &state).is_empty());
    }

    #[test]
    fn location_by_area() {
        let records = sample();
        let state = QueryState {
            location: Selection::Only("Bandra".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query(&records, &state)), ["d", "c"]);
    }

    #[test]
    fn location_by_city() {
        let records = sample();
        let state = QueryState {
            location: Selection::Only("Pune".to_string()),
            location_field: LocationField::City,
            ..Default::default()
        };
        assert_eq!(ids(&query(&records, &state)), ["d"]);

        let state = QueryState {
            location: Selection::Only("Bandra".to_string()),
            location_field: LocationField::City,
            ..Default::default()
        };
        assert!(query(&records, &state).is_empty());
    }

    #[test]
    fn sub_category_filter() {
        let records = sample();
        let state = QueryState {
            sub_category: Selection::Only("Books".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query(&records, &state)), ["e"]);
    }

    #[test]
    fn price_range_filter() {
        let records = sample();
        let state = QueryState {
            price_range: Selection::Only(PriceRange::Budget),
            ..Default::default()
        };
        assert_eq!(ids(&query(&records, &state)), ["b"]);

        let state = QueryState {
            price_range: Selection::Only(PriceRange::Premium),
            ..Default::default()
        };
        assert!(query(&records, &state).is_empty());
    }

    #[test]
    fn filters_combine() {
        let records = sample();
        let state = QueryState {
            search_term: "e".to_string(),
            category: Selection::Only("Food".to_string()),
            location: Selection::Only("Bandra".to_string()),
            price_range: Selection::Only(PriceRange::Moderate),
            ..Default::default()
        };
        assert_eq!(ids(&query(&records, &state)), ["d"]);
    }

    #[test]
    fn rating_sort_is_stable() {
        let records = sample();
        let result = query(&records, &sorted_by(SortBy::Rating));
        // "a" and "c" share 4.5 and keep their input order.
        assert_eq!(ids(&result), ["d", "a", "c", "b", "e"]);

        let mut reversed = records;
        reversed.reverse();
        let result = query(&reversed, &sorted_by(SortBy::Rating));
        assert_eq!(ids(&result), ["d", "c", "a", "b", "e"]);
    }

    #[test]
    fn reviews_sort() {
        let mut records = sample();
        records[1].rating.total_reviews = 22;
        let result = query(&records, &sorted_by(SortBy::Reviews));
        assert_eq!(ids(&result), ["a", "b", "e", "c", "d"]);
    }

    #[test]
    fn name_sort_ignores_case() {
        let result = query(&sample(), &sorted_by(SortBy::Name));
        assert_eq!(ids(&result), ["c", "b", "e", "d", "a"]);
    }

    #[test]
    fn newest_sort_uses_creation_time() {
        let mut records = sample();
        records[0].created_at = Some("2024-01-01T00:00:00Z".parse::<Timestamp>().unwrap());
        records[2].created_at = Some("2025-03-01T00:00:00Z".parse::<Timestamp>().unwrap());
        records[4].created_at = Some("2024-06-15T12:00:00Z".parse::<Timestamp>().unwrap());
        let result = query(&records, &sorted_by(SortBy::Newest));
        assert_eq!(ids(&result), ["c", "e", "a", "b", "d"]);
    }

    #[test]
    fn resorting_is_idempotent() {
        let records = sample();
        for sort_by in [SortBy::Rating, SortBy::Reviews, SortBy::Name, SortBy::Newest] {
            let state = QueryState {
                category: Selection::Only("Food".to_string()),
                sort_by,
                ..Default::default()
            };
            let once = query(&records, &state);
            let twice = query(&once, &sorted_by(sort_by));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn selection_from_param() {
        assert_eq!(Selection::from_param(None), Selection::All);
        assert_eq!(Selection::from_param(Some("all")), Selection::All);
        assert_eq!(
            Selection::from_param(Some("All")),
            Selection::Only("All".to_string())
        );
        let price = Selection::parse_with(Some("₹₹₹"), str::parse::<PriceRange>).unwrap();
        assert_eq!(price, Selection::Only(PriceRange::Premium));
        assert!(Selection::parse_with(Some("cheap"), str::parse::<PriceRange>).is_err());
    }

    #[test]
    fn sort_by_from_str() {
        assert_eq!("newest".parse::<SortBy>().unwrap(), SortBy::Newest);
        assert!("popular".parse::<SortBy>().is_err());
    }
}
