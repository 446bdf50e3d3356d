mod business;
mod facet;

use std::fmt::Display;

use async_graphql::{
    types::connection::{Connection, Edge, EmptyFields},
    EmptyMutation, EmptySubscription, InputValueError, InputValueResult, MergedObject, OutputType,
    Result, Scalar, ScalarType, Value,
};
use base64::{engine::general_purpose, Engine as _};
use jiff::Timestamp;

use crate::database::Database;

/// The default page size for connections when neither `first` nor `last` is provided.
const DEFAULT_PAGE_SIZE: usize = 100;

/// A set of queries defined in the schema.
///
/// This is exposed only for [`Schema`], and not used directly.
#[derive(Default, MergedObject)]
pub(crate) struct Query(business::BusinessQuery, facet::FacetQuery);

pub(crate) type Schema = async_graphql::Schema<Query, EmptyMutation, EmptySubscription>;

#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
pub(crate) struct DateTimeUtc(Timestamp);

#[Scalar]
impl ScalarType for DateTimeUtc {
    fn parse(value: Value) -> InputValueResult<Self> {
        match &value {
            Value::String(s) => Ok(DateTimeUtc(s.parse()?)),
            _ => Err(InputValueError::expected_type(value)),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_string())
    }
}

fn connect_cursor<T>(
    select_vec: Vec<T>,
    prev: bool,
    next: bool,
) -> Connection<String, T, EmptyFields, EmptyFields>
where
    T: OutputType + Display,
{
    let mut connection: Connection<String, T, EmptyFields, EmptyFields> =
        Connection::new(prev, next);
    for output in select_vec {
        connection.edges.push(Edge::new(
            general_purpose::STANDARD.encode(format!("{output}")),
            output,
        ));
    }
    connection
}

pub(crate) fn schema(database: Database) -> Schema {
    Schema::build(Query::default(), EmptyMutation, EmptySubscription)
        .data(database)
        .finish()
}

/// Pages through `nodes`, which are already in their final order. A cursor
/// is the encoded `Display` form of the node it points at.
fn load_connection<N>(
    nodes: Vec<N>,
    after: Option<String>,
    before: Option<String>,
    first: Option<usize>,
    last: Option<usize>,
) -> Result<Connection<String, N, EmptyFields, EmptyFields>>
where
    N: Display + OutputType,
{
    let (nodes, has_previous, has_next) = if let Some(before) = before {
        if after.is_some() {
            return Err("cannot use both `after` and `before`".into());
        }
        if first.is_some() {
            return Err("'before' and 'first' cannot be specified simultaneously".into());
        }
        let last = last.unwrap_or(DEFAULT_PAGE_SIZE);
        let end = cursor_position(&nodes, &before)?;
        let mut nodes = nodes;
        nodes.truncate(end);
        let (mut nodes, has_previous) = collect_nodes(nodes.into_iter().rev(), last);
        nodes.reverse();
        (nodes, has_previous, false)
    } else if let Some(after) = after {
        if last.is_some() {
            return Err("'after' and 'last' cannot be specified simultaneously".into());
        }
        let first = first.unwrap_or(DEFAULT_PAGE_SIZE);
        let start = cursor_position(&nodes, &after)? + 1;
        let (nodes, has_next) = collect_nodes(nodes.into_iter().skip(start), first);
        (nodes, false, has_next)
    } else if let Some(last) = last {
        if first.is_some() {
            return Err("first and last cannot be used together".into());
        }
        let (mut nodes, has_previous) = collect_nodes(nodes.into_iter().rev(), last);
        nodes.reverse();
        (nodes, has_previous, false)
    } else {
        let first = first.unwrap_or(DEFAULT_PAGE_SIZE);
        let (nodes, has_next) = collect_nodes(nodes.into_iter(), first);
        (nodes, false, has_next)
    };
    Ok(connect_cursor(nodes, has_previous, has_next))
}

fn cursor_position<N: Display>(nodes: &[N], cursor: &str) -> Result<usize> {
    let cursor = String::from_utf8(general_purpose::STANDARD.decode(cursor)?)?;
    nodes
        .iter()
        .position(|node| node.to_string() == cursor)
        .ok_or_else(|| format!("cursor {cursor:?} is not in the result set").into())
}

fn collect_nodes<I, T>(mut iter: I, size: usize) -> (Vec<T>, bool)
where
    I: Iterator<Item = T>,
{
    let nodes: Vec<T> = iter.by_ref().take(size).collect();
    let has_more = iter.next().is_some();
    (nodes, has_more)
}

#[cfg(test)]
struct TestSchema {
    _dir: tempfile::TempDir, // to prevent the data directory from being deleted while the test is running
    db: Database,
    schema: Schema,
}

#[cfg(test)]
impl TestSchema {
    fn new() -> Self {
        let db_dir = tempfile::tempdir().unwrap();
        let db = Database::connect(db_dir.path()).unwrap();
        let schema = schema(db.clone());
        Self {
            _dir: db_dir,
            db,
            schema,
        }
    }

    async fn execute(&self, query: &str) -> async_graphql::Response {
        let request: async_graphql::Request = query.into();
        self.schema.execute(request).await
    }
}
