use std::{convert::Infallible, net::SocketAddr, path::PathBuf};

use async_graphql_warp::{GraphQLBadRequest, GraphQLResponse};
use serde::Deserialize;
use tracing::{info, warn};
use warp::{
    http::StatusCode,
    reject::{InvalidQuery, MethodNotAllowed, Reject},
    Filter, Rejection, Reply,
};

use crate::{
    api::Schema,
    database::Database,
    directory::{self, LocationField, QueryState, Selection, SortBy},
    outbound::DirectoryResponse,
};

/// Query string of `GET /businesses`. Selectors accept `"all"`, which is the
/// same as leaving them out.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingParams {
    #[serde(alias = "searchTerm")]
    search: Option<String>,
    category: Option<String>,
    sub_category: Option<String>,
    location: Option<String>,
    location_field: Option<LocationField>,
    price_range: Option<String>,
    sort_by: Option<SortBy>,
}

impl ListingParams {
    fn query_state(self) -> anyhow::Result<QueryState> {
        Ok(QueryState {
            search_term: self.search.unwrap_or_default(),
            category: Selection::from_param(self.category.as_deref()),
            sub_category: Selection::from_param(self.sub_category.as_deref()),
            location: Selection::from_param(self.location.as_deref()),
            location_field: self.location_field.unwrap_or_default(),
            price_range: Selection::parse_with(self.price_range.as_deref(), str::parse)?,
            sort_by: self.sort_by.unwrap_or_default(),
        })
    }
}

#[derive(Debug)]
struct InvalidParameter(String);

impl Reject for InvalidParameter {}

pub(crate) async fn serve(
    schema: Schema,
    db: Database,
    addr: SocketAddr,
    tls: Option<(PathBuf, PathBuf)>,
) {
    let routes = routes(schema, db);
    if let Some((cert, key)) = tls {
        info!("Serving HTTPS on {addr}");
        warp::serve(routes)
            .tls()
            .cert_path(cert)
            .key_path(key)
            .run(addr)
            .await;
    } else {
        info!("Serving HTTP on {addr}");
        warp::serve(routes).run(addr).await;
    }
}

fn routes(
    schema: Schema,
    db: Database,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let graphql = warp::path("graphql")
        .and(warp::path::end())
        .and(async_graphql_warp::graphql(schema))
        .and_then(
            |(schema, request): (Schema, async_graphql::Request)| async move {
                Ok::<_, Infallible>(GraphQLResponse::from(schema.execute(request).await))
            },
        );

    let businesses = warp::path("businesses")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ListingParams>())
        .and(warp::any().map(move || db.clone()))
        .and_then(list_businesses);

    graphql.or(businesses).recover(handle_rejection)
}

async fn list_businesses(params: ListingParams, db: Database) -> Result<impl Reply, Rejection> {
    let state = params
        .query_state()
        .map_err(|e| warp::reject::custom(InvalidParameter(e.to_string())))?;
    let businesses = directory::query(&db.load_businesses(), &state);
    Ok(warp::reply::json(&DirectoryResponse::listing(businesses)))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(InvalidParameter(message)) = err.find() {
        (StatusCode::BAD_REQUEST, message.clone())
    } else if let Some(e) = err.find::<InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(GraphQLBadRequest(e)) = err.find() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        warn!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error".to_string(),
        )
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&DirectoryResponse::<()>::failure(message)),
        status,
    ))
}
