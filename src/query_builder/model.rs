use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::SqlAccessorError;
use crate::types::RowValues;

use super::DEFAULT_SCHEMA;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Right,
    Inner,
}

impl JoinKind {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Inner => "INNER JOIN",
        }
    }
}

/// One joined table: `<kind> JOIN schema.table AS alias ON alias.on = base.base_column`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub table: String,
    pub schema: String,
    /// Explicit alias; unnamed joins get the next generated alias.
    pub alias: Option<String>,
    /// Join column on the joined table.
    pub on: String,
    /// Join column on the base table; defaults to its primary key.
    pub base_column: Option<String>,
}

impl JoinSpec {
    pub fn new(kind: JoinKind, table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            schema: DEFAULT_SCHEMA.to_string(),
            alias: None,
            on: on.into(),
            base_column: None,
        }
    }

    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn base_column(mut self, column: impl Into<String>) -> Self {
        self.base_column = Some(column.into());
        self
    }
}

/// How a filter attaches to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

impl FromStr for Connector {
    type Err = SqlAccessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("and") {
            Ok(Connector::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(Connector::Or)
        } else {
            Err(SqlAccessorError::ParameterError(format!(
                "unknown filter connector {s:?}"
            )))
        }
    }
}

impl TryFrom<String> for Connector {
    type Error = SqlAccessorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// An equality filter `[alias.]key = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub key: String,
    pub value: RowValues,
    pub alias: Option<String>,
    /// Ignored on the first filter.
    pub connector: Connector,
}

impl FilterClause {
    pub fn new(key: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            alias: None,
            connector: Connector::And,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn connector(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }
}

/// Joins and filters for `find_all` / `find_one`.
///
/// ```rust
/// use pg_crud_accessor::prelude::*;
///
/// let model = FindModel::new()
///     .left_join(JoinSpec::new(JoinKind::Left, "orders", "user_id"))
///     .filter(FilterClause::new("status", "open").alias("b"));
/// assert_eq!(model.joins.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindModel {
    pub joins: Vec<JoinSpec>,
    pub filters: Vec<FilterClause>,
}

impl FindModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `join` as a LEFT JOIN.
    #[must_use]
    pub fn left_join(self, join: JoinSpec) -> Self {
        self.join(JoinSpec {
            kind: JoinKind::Left,
            ..join
        })
    }

    /// Append `join` as a RIGHT JOIN.
    #[must_use]
    pub fn right_join(self, join: JoinSpec) -> Self {
        self.join(JoinSpec {
            kind: JoinKind::Right,
            ..join
        })
    }

    /// Append `join` as an INNER JOIN.
    #[must_use]
    pub fn inner_join(self, join: JoinSpec) -> Self {
        self.join(JoinSpec {
            kind: JoinKind::Inner,
            ..join
        })
    }

    /// Append `join` with its own kind.
    #[must_use]
    pub fn join(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    /// Append a filter with its own connector.
    #[must_use]
    pub fn filter(mut self, filter: FilterClause) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append a filter joined with OR.
    #[must_use]
    pub fn or_filter(self, filter: FilterClause) -> Self {
        self.filter(filter.connector(Connector::Or))
    }

    /// True when some join falls back to the base table's primary key.
    #[must_use]
    pub fn needs_primary_key(&self) -> bool {
        self.joins.iter().any(|j| j.base_column.is_none())
    }

    /// Parse the `{left_join, right_join, inner_join, where}` object form.
    ///
    /// Joins are ordered left, then right, then inner, each in array order.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::ParameterError` if the object does not have that shape.
    pub fn from_json(value: JsonValue) -> Result<Self, SqlAccessorError> {
        let wire: FindModelWire = serde_json::from_value(value)
            .map_err(|e| SqlAccessorError::ParameterError(format!("find model: {e}")))?;

        let joins = [
            (JoinKind::Left, wire.left_join),
            (JoinKind::Right, wire.right_join),
            (JoinKind::Inner, wire.inner_join),
        ]
        .into_iter()
        .flat_map(|(kind, items)| {
            items.into_iter().map(move |item| JoinSpec {
                kind,
                table: item.table,
                schema: item.schema.unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
                alias: item.alias,
                on: item.on,
                base_column: item.id,
            })
        })
        .collect();

        let filters = wire
            .filters
            .into_iter()
            .map(|item| FilterClause {
                key: item.key,
                value: RowValues::from(item.value),
                alias: item.alias,
                connector: item.connector.unwrap_or_default(),
            })
            .collect();

        Ok(Self { joins, filters })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FindModelWire {
    #[serde(default)]
    left_join: Vec<JoinWire>,
    #[serde(default)]
    right_join: Vec<JoinWire>,
    #[serde(default)]
    inner_join: Vec<JoinWire>,
    #[serde(default, rename = "where")]
    filters: Vec<FilterWire>,
}

#[derive(Deserialize)]
struct JoinWire {
    table: String,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default, rename = "as")]
    alias: Option<String>,
    on: String,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct FilterWire {
    key: String,
    value: JsonValue,
    #[serde(default, rename = "as")]
    alias: Option<String>,
    #[serde(default, rename = "type")]
    connector: Option<Connector>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_joins_are_grouped_by_kind() {
        let model = FindModel::from_json(json!({
            "inner_join": [{"table": "c", "on": "c_id"}],
            "left_join": [{"table": "a", "on": "a_id", "as": "x"}, {"table": "b", "on": "b_id", "schema": "s", "id": "ref"}],
        }))
        .unwrap();
        let kinds: Vec<_> = model.joins.iter().map(|j| (j.kind, j.table.as_str())).collect();
        assert_eq!(
            kinds,
            vec![(JoinKind::Left, "a"), (JoinKind::Left, "b"), (JoinKind::Inner, "c")]
        );
        assert_eq!(model.joins[0].alias.as_deref(), Some("x"));
        assert_eq!(model.joins[1].schema, "s");
        assert_eq!(model.joins[1].base_column.as_deref(), Some("ref"));
        assert_eq!(model.joins[2].schema, "public");
        assert!(model.needs_primary_key());
    }

    #[test]
    fn json_filters_keep_order_and_connectors() {
        let model = FindModel::from_json(json!({
            "where": [
                {"key": "name", "value": "Ann"},
                {"key": "age", "value": 30, "type": "or", "as": "a"}
            ]
        }))
        .unwrap();
        assert_eq!(model.filters[0].connector, Connector::And);
        assert_eq!(model.filters[1].connector, Connector::Or);
        assert_eq!(model.filters[1].value, RowValues::Int(30));
        assert_eq!(model.filters[1].alias.as_deref(), Some("a"));
        assert!(!model.needs_primary_key());
    }

    #[test]
    fn json_rejects_unknown_connector() {
        let err = FindModel::from_json(json!({
            "where": [{"key": "a", "value": 1, "type": "XOR"}]
        }))
        .unwrap_err();
        assert!(matches!(err, SqlAccessorError::ParameterError(_)));
    }

    #[test]
    fn builder_sets_join_kind() {
        let model = FindModel::new()
            .inner_join(JoinSpec::new(JoinKind::Left, "t", "id"))
            .or_filter(FilterClause::new("k", 1));
        assert_eq!(model.joins[0].kind, JoinKind::Inner);
        assert_eq!(model.filters[0].connector, Connector::Or);
    }
}
