use async_graphql::{Context, Object, Result, SimpleObject};

use super::business::{BusinessFilter, PriceRange};
use crate::{
    database::Database,
    directory::{self, Facets, SortBy},
};

#[derive(SimpleObject, Debug)]
struct FacetCount {
    value: String,
    count: usize,
}

#[derive(SimpleObject, Debug)]
struct PriceRangeCount {
    price_range: PriceRange,
    count: usize,
}

/// The option values a listing view can offer in its selectors.
#[derive(SimpleObject, Debug)]
struct DirectoryFacets {
    /// The number of businesses the facets were computed over.
    total_count: usize,
    categories: Vec<FacetCount>,
    areas: Vec<FacetCount>,
    cities: Vec<FacetCount>,
    price_ranges: Vec<PriceRangeCount>,
}

impl DirectoryFacets {
    fn new(total_count: usize, facets: Facets) -> Self {
        let counts = |values: Vec<(String, usize)>| -> Vec<FacetCount> {
            values
                .into_iter()
                .map(|(value, count)| FacetCount { value, count })
                .collect()
        };
        Self {
            total_count,
            categories: counts(facets.categories),
            areas: counts(facets.areas),
            cities: counts(facets.cities),
            price_ranges: facets
                .price_ranges
                .into_iter()
                .map(|(price_range, count)| PriceRangeCount {
                    price_range: price_range.into(),
                    count,
                })
                .collect(),
        }
    }
}

#[derive(Default)]
pub(super) struct FacetQuery;

#[Object]
impl FacetQuery {
    /// Facets over the businesses selected by `filter`, or over the whole
    /// directory.
    #[allow(clippy::unused_async)]
    async fn directory_facets(
        &self,
        ctx: &Context<'_>,
        filter: Option<BusinessFilter>,
    ) -> Result<DirectoryFacets> {
        let db = ctx.data::<Database>()?;
        let businesses = db.load_businesses();
        let state = filter.unwrap_or_default().query_state(SortBy::default())?;
        let selected = directory::query(&businesses, &state);
        Ok(DirectoryFacets::new(
            selected.len(),
            Facets::collect(&selected),
        ))
    }
}
