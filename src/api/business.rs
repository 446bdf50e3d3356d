use std::fmt;

use async_graphql::{
    connection::{query, Connection, EmptyFields},
    Context, Enum, InputObject, Object, Result, SimpleObject,
};

use crate::{
    api::{self, DateTimeUtc},
    database::Database,
    directory::{self, BusinessRecord, QueryState, Selection},
};

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(remote = "crate::directory::PriceRange")]
pub(crate) enum PriceRange {
    Budget,
    Moderate,
    Premium,
    Luxury,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug, Default)]
#[graphql(remote = "crate::directory::SortBy")]
pub(crate) enum SortBy {
    /// Highest average rating first.
    #[default]
    Rating,
    /// Most reviewed first.
    Reviews,
    /// Alphabetical by name.
    Name,
    /// Most recently listed first.
    Newest,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(remote = "crate::directory::LocationField")]
pub(crate) enum LocationField {
    Area,
    City,
}

#[derive(SimpleObject)]
pub(crate) struct Business {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) sub_category: String,
    pub(crate) area: String,
    pub(crate) city: String,
    pub(crate) description: String,
    pub(crate) rating: BusinessRating,
    pub(crate) price_range: Option<PriceRange>,
    pub(crate) created_at: Option<DateTimeUtc>,
}

#[derive(SimpleObject)]
pub(crate) struct BusinessRating {
    pub(crate) average: f64,
    pub(crate) total_reviews: u32,
}

impl From<BusinessRecord> for Business {
    fn from(record: BusinessRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            category: record.category,
            sub_category: record.sub_category,
            area: record.area,
            city: record.city,
            description: record.description,
            rating: BusinessRating {
                average: record.rating.average,
                total_reviews: record.rating.total_reviews,
            },
            price_range: record.price_range.map(PriceRange::from),
            created_at: record.created_at.map(DateTimeUtc),
        }
    }
}

impl fmt::Display for Business {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Selections narrowing the directory. Every selector accepts `"all"`,
/// which is the same as leaving it out.
#[derive(InputObject, Debug, Default)]
pub(crate) struct BusinessFilter {
    /// Case-insensitive text searched in name, category, area and description.
    search: Option<String>,
    /// Exact category.
    category: Option<String>,
    /// Exact sub-category.
    sub_category: Option<String>,
    /// Exact location, matched against `locationField`.
    location: Option<String>,
    /// The field `location` is matched against. Defaults to `AREA`.
    location_field: Option<LocationField>,
    /// Price tier by name ("budget") or symbol ("₹").
    price_range: Option<String>,
}

impl BusinessFilter {
    pub(crate) fn query_state(&self, sort_by: directory::SortBy) -> anyhow::Result<QueryState> {
        Ok(QueryState {
            search_term: self.search.clone().unwrap_or_default(),
            category: Selection::from_param(self.category.as_deref()),
            sub_category: Selection::from_param(self.sub_category.as_deref()),
            location: Selection::from_param(self.location.as_deref()),
            location_field: self.location_field.map(Into::into).unwrap_or_default(),
            price_range: Selection::parse_with(self.price_range.as_deref(), str::parse)?,
            sort_by,
        })
    }
}

#[derive(Default)]
pub(super) struct BusinessQuery;

#[Object]
impl BusinessQuery {
    async fn businesses(
        &self,
        ctx: &Context<'_>,
        filter: Option<BusinessFilter>,
        sort_by: Option<SortBy>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<String, Business, EmptyFields, EmptyFields>> {
        let db = ctx.data::<Database>()?;
        let state = filter
            .unwrap_or_default()
            .query_state(sort_by.unwrap_or_default().into())?;
        let nodes: Vec<Business> = directory::query(&db.load_businesses(), &state)
            .into_iter()
            .map(Business::from)
            .collect();
        query(
            after,
            before,
            first,
            last,
            |after, before, first, last| async move {
                api::load_connection(nodes, after, before, first, last)
            },
        )
        .await
    }

    async fn business(&self, ctx: &Context<'_>, id: String) -> Result<Option<Business>> {
        let db = ctx.data::<Database>()?;
        Ok(db.business(&id)?.map(Business::from))
    }
}
