//! Builds parameterised SELECT, INSERT, UPDATE, DELETE for one entity table.
//! Identifiers come from entity declarations only; every value is a cast parameter.

use crate::capability::OrderClause;
use crate::entity::Property;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    /// SQL column name.
    pub name: String,
    /// Field name in the entity's serde representation.
    pub exposed: String,
    pub sql_type: String,
    pub primary_key: bool,
    pub autogenerated: bool,
}

impl ColumnSpec {
    /// `$n::type`
    fn placeholder(&self, n: usize) -> String {
        format!("${}::{}", n, self.sql_type)
    }

    /// Select expression aliased back to the exposed name. Timestamps are read as text so rows
    /// decode without a per-column type switch.
    fn select_expr(&self) -> String {
        if self.sql_type.starts_with("timestamp") {
            format!("to_char({} AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS\"+00:00\"') AS {}", quoted(&self.name), quoted(&self.exposed))
        } else {
            format!("{} AS {}", quoted(&self.name), quoted(&self.exposed))
        }
    }
}

/// Persisted columns of an entity type and where they live.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSpec {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<ColumnSpec>,
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

impl TableSpec {
    /// Columns of every persisted property, in declaration order.
    pub fn from_properties(table: impl Into<String>, properties: &[Property]) -> Self {
        let columns = properties
            .iter()
            .filter(|p| p.is_persisted())
            .map(|p| ColumnSpec {
                name: p.column_name(),
                exposed: p.exposed_name(),
                sql_type: p.column_type(),
                primary_key: p.is_primary_key(),
                autogenerated: p.is_autogenerated(),
            })
            .collect();
        TableSpec {
            schema: None,
            table: table.into(),
            columns,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quoted(schema), quoted(&self.table)),
            None => quoted(&self.table),
        }
    }

    /// First primary key column, else a column exposed as `id`.
    pub fn primary_key(&self) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .or_else(|| self.columns.iter().find(|c| c.exposed == "id"))
    }

    pub fn column_by_exposed(&self, exposed: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.exposed == exposed)
    }

    fn select_list(&self) -> String {
        self.columns.iter().map(ColumnSpec::select_expr).collect::<Vec<_>>().join(", ")
    }

    /// SELECT by primary key. Caller supplies the id as the sole param.
    pub fn select_by_id(&self, pk: &ColumnSpec, id: Value) -> QueryBuf {
        let mut q = QueryBuf::new();
        let n = q.push_param(id);
        q.sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.select_list(),
            self.qualified(),
            quoted(&pk.name),
            pk.placeholder(n)
        );
        q
    }

    /// SELECT a window ordered by a declared column. Unknown order fields order by the primary key.
    pub fn select_range(&self, offset: u64, count: Option<u64>, order: &OrderClause) -> QueryBuf {
        let mut q = QueryBuf::new();
        let order_col = self
            .column_by_exposed(&order.field)
            .or_else(|| self.primary_key())
            .map(|c| quoted(&c.name));
        let order_clause = order_col
            .map(|c| format!(" ORDER BY {} {}", c, order.direction.as_sql()))
            .unwrap_or_default();
        let limit_clause = count.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
        let offset_clause = if offset > 0 { format!(" OFFSET {}", offset) } else { String::new() };
        q.sql = format!(
            "SELECT {} FROM {}{}{}{}",
            self.select_list(),
            self.qualified(),
            order_clause,
            limit_clause,
            offset_clause
        );
        q
    }

    pub fn count_all(&self) -> QueryBuf {
        let mut q = QueryBuf::new();
        q.sql = format!("SELECT COUNT(*) AS total FROM {}", self.qualified());
        q
    }

    /// INSERT every non-autogenerated column from `values` (keyed by exposed name); missing values bind null.
    pub fn insert(&self, values: &Map<String, Value>) -> QueryBuf {
        let mut q = QueryBuf::new();
        let mut cols = Vec::new();
        let mut placeholders = Vec::new();
        for c in self.columns.iter().filter(|c| !c.autogenerated) {
            let n = q.push_param(values.get(&c.exposed).cloned().unwrap_or(Value::Null));
            cols.push(quoted(&c.name));
            placeholders.push(c.placeholder(n));
        }
        q.sql = if cols.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", self.qualified(), self.select_list())
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                self.qualified(),
                cols.join(", "),
                placeholders.join(", "),
                self.select_list()
            )
        };
        q
    }

    /// UPDATE by primary key: SET every non-key, non-autogenerated column.
    pub fn update(&self, pk: &ColumnSpec, values: &Map<String, Value>) -> QueryBuf {
        let mut q = QueryBuf::new();
        let mut sets = Vec::new();
        for c in self.columns.iter().filter(|c| !c.primary_key && !c.autogenerated) {
            let n = q.push_param(values.get(&c.exposed).cloned().unwrap_or(Value::Null));
            sets.push(format!("{} = {}", quoted(&c.name), c.placeholder(n)));
        }
        let id = q.push_param(values.get(&pk.exposed).cloned().unwrap_or(Value::Null));
        if sets.is_empty() {
            q.sql = format!(
                "SELECT {} FROM {} WHERE {} = {}",
                self.select_list(),
                self.qualified(),
                quoted(&pk.name),
                pk.placeholder(id)
            );
            return q;
        }
        q.sql = format!(
            "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
            self.qualified(),
            sets.join(", "),
            quoted(&pk.name),
            pk.placeholder(id),
            self.select_list()
        );
        q
    }

    /// DELETE by primary key.
    pub fn delete(&self, pk: &ColumnSpec, id: Value) -> QueryBuf {
        let mut q = QueryBuf::new();
        let n = q.push_param(id);
        q.sql = format!("DELETE FROM {} WHERE {} = {}", self.qualified(), quoted(&pk.name), pk.placeholder(n));
        q
    }
}
