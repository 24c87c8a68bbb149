use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde_json::Value as JsonValue;

use crate::error::{invalid_argument, unsupported_operator, FirestoreError, FirestoreResult};
use crate::model::{FieldPath, IntoFieldPath, ResourcePath};
use crate::remote::structured_query::encode_structured_query;
use crate::value::FirestoreValue;

use super::snapshot::QuerySnapshot;
use super::Firestore;

/// Filter operators accepted by [`Query::where_field`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
}

impl FilterOperator {
    /// Wire name used in `fieldFilter.op`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "EQUAL",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = FirestoreError;

    fn from_str(operator: &str) -> Result<Self, Self::Err> {
        match operator.trim() {
            "=" | "==" => Ok(FilterOperator::Equal),
            other => Err(unsupported_operator(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

impl OrderDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Ascending => "ASCENDING",
            OrderDirection::Descending => "DESCENDING",
        }
    }
}

impl From<&str> for OrderDirection {
    /// `desc`/`descending` in any case is descending; anything else ascends.
    fn from(direction: &str) -> Self {
        let direction = direction.trim();
        if direction.eq_ignore_ascii_case("desc") || direction.eq_ignore_ascii_case("descending") {
            OrderDirection::Descending
        } else {
            OrderDirection::Ascending
        }
    }
}

impl From<String> for OrderDirection {
    fn from(direction: String) -> Self {
        OrderDirection::from(direction.as_str())
    }
}

impl Display for OrderDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: FieldPath,
    operator: FilterOperator,
    value: FirestoreValue,
}

impl FieldFilter {
    pub fn new(field: FieldPath, operator: FilterOperator, value: FirestoreValue) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &FirestoreValue {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    field: FieldPath,
    direction: OrderDirection,
}

impl OrderBy {
    pub fn new(field: FieldPath, direction: OrderDirection) -> Self {
        Self { field, direction }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

/// Everything a backend needs to execute a query, detached from any client.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDefinition {
    collection_path: ResourcePath,
    filters: Vec<FieldFilter>,
    order_by: Vec<OrderBy>,
    limit: Option<i32>,
    projection: Option<Vec<FieldPath>>,
}

impl QueryDefinition {
    pub fn new(collection_path: ResourcePath) -> FirestoreResult<Self> {
        if collection_path.len() % 2 == 0 {
            return Err(invalid_argument(format!(
                "Query target '{collection_path}' must be a collection (odd number of segments)"
            )));
        }
        Ok(Self::for_collection(collection_path))
    }

    pub(crate) fn for_collection(collection_path: ResourcePath) -> Self {
        Self {
            collection_path,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            projection: None,
        }
    }

    pub fn collection_path(&self) -> &ResourcePath {
        &self.collection_path
    }

    pub fn collection_id(&self) -> &str {
        self.collection_path.last_segment().unwrap_or_default()
    }

    /// Path of the document owning the collection; empty for root collections.
    pub fn parent_path(&self) -> ResourcePath {
        self.collection_path.without_last()
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<i32> {
        self.limit
    }

    pub fn projection(&self) -> Option<&[FieldPath]> {
        self.projection.as_deref()
    }
}

/// An immutable query over one collection. Every builder method returns a new
/// query and leaves the receiver untouched.
#[derive(Clone, Debug)]
pub struct Query {
    firestore: Firestore,
    definition: QueryDefinition,
}

impl Query {
    pub(crate) fn new(firestore: Firestore, definition: QueryDefinition) -> Self {
        Self {
            firestore,
            definition,
        }
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn definition(&self) -> &QueryDefinition {
        &self.definition
    }

    pub fn collection_id(&self) -> &str {
        self.definition.collection_id()
    }

    /// Adds an equality filter. `=` and `==` are accepted; any other operator
    /// fails with `UnsupportedOperator`.
    pub fn where_field(
        &self,
        field: impl IntoFieldPath,
        operator: &str,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Query> {
        let operator = FilterOperator::from_str(operator)?;
        let field = field.into_field_path()?;
        let mut next = self.clone();
        next.definition
            .filters
            .push(FieldFilter::new(field, operator, value.into()));
        Ok(next)
    }

    pub fn order_by(
        &self,
        field: impl IntoFieldPath,
        direction: impl Into<OrderDirection>,
    ) -> FirestoreResult<Query> {
        let field = field.into_field_path()?;
        let mut next = self.clone();
        next.definition
            .order_by
            .push(OrderBy::new(field, direction.into()));
        Ok(next)
    }

    /// Caps the number of results; values below 1 are raised to 1.
    pub fn limit(&self, limit: i64) -> Query {
        let mut next = self.clone();
        next.definition.limit = Some(limit.clamp(1, i32::MAX as i64) as i32);
        next
    }

    /// Restricts returned fields. Blank names are dropped; selecting nothing
    /// clears the projection.
    pub fn select<I, S>(&self, fields: I) -> FirestoreResult<Query>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut projection = Vec::new();
        for field in fields {
            let field = field.as_ref().trim();
            if field.is_empty() {
                continue;
            }
            projection.push(FieldPath::from_dot_separated(field)?);
        }
        let mut next = self.clone();
        next.definition.projection = if projection.is_empty() {
            None
        } else {
            Some(projection)
        };
        Ok(next)
    }

    /// The REST `StructuredQuery` this query sends.
    pub fn structured_query(&self) -> JsonValue {
        encode_structured_query(&self.definition)
    }

    /// Runs the query and buffers every result.
    pub async fn documents(&self) -> FirestoreResult<QuerySnapshot> {
        let documents = self
            .firestore
            .datastore()
            .run_query(&self.definition)
            .await?;
        Ok(QuerySnapshot::new(documents))
    }
}
