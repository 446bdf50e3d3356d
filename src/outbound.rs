use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Error, Result};
use jiff::Timestamp;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::{
    database::Database,
    directory::{BusinessRecord, PriceRange, Rating},
};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The envelope the directory backend wraps listings in. Also used for the
/// listings this server returns.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct DirectoryResponse<T> {
    pub(crate) success: bool,
    #[serde(default)]
    pub(crate) businesses: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

impl<T> DirectoryResponse<T> {
    pub(crate) fn listing(businesses: Vec<T>) -> Self {
        Self {
            success: true,
            businesses,
            message: None,
        }
    }

    pub(crate) fn failure(message: String) -> Self {
        Self {
            success: false,
            businesses: Vec::new(),
            message: Some(message),
        }
    }
}

/// A business exactly as the backend sends it. Any field may be missing,
/// null or of the wrong type; each is coerced on its own so a bad field
/// never costs the whole record.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawBusiness {
    #[serde(alias = "_id")]
    id: Option<Value>,
    name: Option<Value>,
    category: Option<Value>,
    sub_category: Option<Value>,
    area: Option<Value>,
    city: Option<Value>,
    description: Option<Value>,
    rating: Option<Value>,
    price_range: Option<Value>,
    created_at: Option<Value>,
}

impl TryFrom<RawBusiness> for BusinessRecord {
    type Error = Error;

    fn try_from(raw: RawBusiness) -> Result<Self> {
        let id = raw
            .id
            .as_ref()
            .and_then(business_id)
            .context("business has no id")?;
        let text = |field: &str, value: Option<Value>| match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => {
                warn!("Business {id}: ignoring {field} {other}");
                String::new()
            }
        };
        let price_range = text("price range", raw.price_range);
        let price_range = (!price_range.is_empty())
            .then(|| {
                price_range
                    .parse::<PriceRange>()
                    .map_err(|e| warn!("Business {id}: {e}"))
                    .ok()
            })
            .flatten();
        let created_at = text("creation time", raw.created_at);
        let created_at = (!created_at.is_empty())
            .then(|| {
                created_at
                    .parse::<Timestamp>()
                    .map_err(|e| warn!("Business {id}: invalid creation time {created_at:?}: {e}"))
                    .ok()
            })
            .flatten();
        let rating = match raw.rating {
            None | Some(Value::Null) => Rating::default(),
            Some(Value::Object(rating)) => Rating::sanitized(
                rating.get("average").and_then(Value::as_f64),
                rating.get("totalReviews").and_then(review_count),
            ),
            Some(other) => {
                warn!("Business {id}: ignoring rating {other}");
                Rating::default()
            }
        };

        Ok(Self {
            name: text("name", raw.name),
            category: text("category", raw.category),
            sub_category: text("sub-category", raw.sub_category),
            area: text("area", raw.area),
            city: text("city", raw.city),
            description: text("description", raw.description),
            id,
            rating,
            price_range,
            created_at,
        })
    }
}

/// Whole-number review counts, whether sent as integers or as floats.
fn review_count(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && n.fract() == 0.0)
            .map(|n| n as i64)
    })
}

/// Accepts string and numeric ids as well as extended-JSON object ids.
fn business_id(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => return map.get("$oid").and_then(business_id),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// Normalizes a backend response. A response flagged as unsuccessful is an
/// error; individual businesses that cannot be read are skipped.
fn into_businesses(response: DirectoryResponse<Value>) -> Result<Vec<BusinessRecord>> {
    if !response.success {
        bail!(
            "directory backend reported failure: {}",
            response.message.as_deref().unwrap_or("no message")
        );
    }
    let businesses = response
        .businesses
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| {
            serde_json::from_value::<RawBusiness>(value)
                .map_err(Error::from)
                .and_then(BusinessRecord::try_from)
                .map_err(|e| warn!("Skipping business at position {i}: {e:#}"))
                .ok()
        })
        .collect();
    Ok(businesses)
}

/// Reads a directory snapshot in the backend's response format from a file.
fn load_seed(path: &Path) -> Result<Vec<BusinessRecord>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let response: DirectoryResponse<Value> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse seed file {}", path.display()))?;
    into_businesses(response)
}

/// Makes the seed file the local snapshot, dropping businesses it no
/// longer lists.
pub(crate) async fn import_seed(path: &Path, db: &Database) -> Result<()> {
    let businesses = load_seed(path)?;
    let count = businesses.len();
    let removed = db.replace_businesses(businesses)?;
    db.flush().await?;
    info!(
        "Loaded {count} businesses from {}, {removed} delisted",
        path.display()
    );
    Ok(())
}

fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(timeout)
        .build()
}

async fn fetch_directory(client: &Client, url: &str) -> Result<Vec<BusinessRecord>> {
    let response: DirectoryResponse<Value> = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    into_businesses(response)
}

pub(crate) async fn fetch_periodically(url: String, period: Duration, retry: Duration, db: Database) {
    let client = match build_client(retry.min(REQUEST_TIMEOUT)) {
        Ok(client) => client,
        Err(error) => {
            error!("Problem while building the directory client. {}", error);
            return;
        }
    };
    let mut itv = time::interval(period);
    itv.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        itv.tick().await;
        let mut re_itv = time::interval(retry);
        loop {
            re_itv.tick().await;
            match fetch_directory(&client, &url).await {
                Ok(businesses) => {
                    let count = businesses.len();
                    match db.replace_businesses(businesses) {
                        Ok(removed) => {
                            info!("Synced {count} businesses from {url}, {removed} delisted");
                            if let Err(error) = db.flush().await {
                                error!("Problem while flushing the database. {}", error);
                            }
                        }
                        Err(error) => {
                            error!("Problem while storing businesses. {}", error);
                        }
                    }
                    break;
                }
                Err(error) => {
                    error!(
                        "Problem while fetching the directory. Retrying in {}s. {:#}",
                        retry.as_secs(),
                        error
                    );
                }
            }
        }
    }
}
