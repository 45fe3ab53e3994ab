//! SQL statement AST types.
//!
//! The tree is engine-neutral: limit, offset, ordering and locking are
//! recorded as-is and only turned into dialect syntax by the compiler.

use super::expression::Expr;

/// Order direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Null ordering for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    /// NULLs come first.
    First,
    /// NULLs come last.
    Last,
}

impl NullOrdering {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// An ORDER BY clause entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The expression to order by.
    pub expr: Expr,
    /// The direction (ASC or DESC).
    pub direction: OrderDirection,
    /// Null ordering (optional).
    pub nulls: Option<NullOrdering>,
}

impl OrderBy {
    /// Ascending order on `expr`.
    #[must_use]
    pub const fn asc(expr: Expr) -> Self {
        Self {
            expr,
            direction: OrderDirection::Asc,
            nulls: None,
        }
    }

    /// Descending order on `expr`.
    #[must_use]
    pub const fn desc(expr: Expr) -> Self {
        Self {
            expr,
            direction: OrderDirection::Desc,
            nulls: None,
        }
    }

    /// Sets the null ordering.
    #[must_use]
    pub const fn nulls(mut self, nulls: NullOrdering) -> Self {
        self.nulls = Some(nulls);
        self
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN.
    Inner,
    /// LEFT OUTER JOIN.
    Left,
    /// RIGHT OUTER JOIN.
    Right,
    /// FULL OUTER JOIN.
    Full,
    /// CROSS JOIN.
    Cross,
}

impl JoinType {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT OUTER JOIN",
            Self::Right => "RIGHT OUTER JOIN",
            Self::Full => "FULL OUTER JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// The type of join.
    pub join_type: JoinType,
    /// The table to join.
    pub table: TableRef,
    /// The join condition (for non-CROSS joins).
    pub on: Option<Expr>,
}

impl JoinClause {
    /// Creates a join of `join_type` against `table` on `on`.
    #[must_use]
    pub const fn new(join_type: JoinType, table: TableRef, on: Expr) -> Self {
        Self {
            join_type,
            table,
            on: Some(on),
        }
    }

    /// Creates a CROSS JOIN.
    #[must_use]
    pub const fn cross(table: TableRef) -> Self {
        Self {
            join_type: JoinType::Cross,
            table,
            on: None,
        }
    }
}

/// A table reference in FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    /// A simple table name.
    Table {
        /// Schema name (optional).
        schema: Option<String>,
        /// Table name.
        name: String,
        /// Alias.
        alias: Option<String>,
    },
    /// A derived table.
    Subquery {
        /// The subquery.
        query: Box<SelectStatement>,
        /// Alias (required for subqueries).
        alias: String,
    },
    /// A raw SQL source, used verbatim.
    Sql(String),
}

impl TableRef {
    /// Creates a simple table reference.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    /// Creates a table reference with schema.
    #[must_use]
    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Table {
            schema: Some(schema.into()),
            name: name.into(),
            alias: None,
        }
    }

    /// Creates a derived table.
    #[must_use]
    pub fn subquery(query: SelectStatement, alias: impl Into<String>) -> Self {
        Self::Subquery {
            query: Box::new(query),
            alias: alias.into(),
        }
    }

    /// Adds an alias to this table reference.
    #[must_use]
    pub fn alias(self, alias: impl Into<String>) -> Self {
        match self {
            Self::Table { schema, name, .. } => Self::Table {
                schema,
                name,
                alias: Some(alias.into()),
            },
            Self::Subquery { query, .. } => Self::Subquery {
                query,
                alias: alias.into(),
            },
            Self::Sql(sql) => Self::Sql(sql),
        }
    }

    /// Name under which columns of this source are qualified.
    #[must_use]
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            Self::Table { name, alias, .. } => Some(alias.as_deref().unwrap_or(name)),
            Self::Subquery { alias, .. } => Some(alias),
            Self::Sql(sql) => Some(sql),
        }
    }
}

/// A row lock requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock(pub String);

impl Lock {
    /// The standard `FOR UPDATE` lock.
    #[must_use]
    pub fn for_update() -> Self {
        Self(String::from("FOR UPDATE"))
    }

    /// Whether this lock asks for update locks.
    #[must_use]
    pub fn is_for_update(&self) -> bool {
        self.0.to_ascii_uppercase().contains("FOR UPDATE")
    }
}

/// The FROM side of a select core: a leading source followed by joins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinSource {
    /// Leading table.
    pub left: Option<TableRef>,
    /// Joined tables, in order.
    pub joins: Vec<JoinClause>,
}

/// The projection/filter part of a SELECT.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectCore {
    /// Whether to select DISTINCT values.
    pub distinct: bool,
    /// The columns to select.
    pub projections: Vec<SelectColumn>,
    /// The FROM clause.
    pub source: JoinSource,
    /// WHERE predicates, joined with AND.
    pub wheres: Vec<Expr>,
    /// GROUP BY expressions.
    pub groups: Vec<Expr>,
    /// HAVING predicates, joined with AND.
    pub havings: Vec<Expr>,
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// Projections, sources and filters.
    pub core: SelectCore,
    /// ORDER BY clauses.
    pub orders: Vec<OrderBy>,
    /// Row limit.
    pub limit: Option<Expr>,
    /// Rows to skip.
    pub offset: Option<Expr>,
    /// Row lock.
    pub lock: Option<Lock>,
}

impl SelectStatement {
    /// Starts a SELECT from `table`.
    #[must_use]
    pub fn from_table(table: TableRef) -> Self {
        Self {
            core: SelectCore {
                source: JoinSource {
                    left: Some(table),
                    joins: Vec::new(),
                },
                ..SelectCore::default()
            },
            ..Self::default()
        }
    }

    /// Adds a projection.
    #[must_use]
    pub fn column(mut self, expr: Expr) -> Self {
        self.core.projections.push(SelectColumn::new(expr));
        self
    }

    /// Adds an aliased projection.
    #[must_use]
    pub fn column_as(mut self, expr: Expr, alias: impl Into<String>) -> Self {
        self.core.projections.push(SelectColumn::with_alias(expr, alias));
        self
    }

    /// Sets DISTINCT.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.core.distinct = true;
        self
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, join: JoinClause) -> Self {
        self.core.source.joins.push(join);
        self
    }

    /// Adds a WHERE predicate.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.core.wheres.push(expr);
        self
    }

    /// Adds a GROUP BY expression.
    #[must_use]
    pub fn group(mut self, expr: Expr) -> Self {
        self.core.groups.push(expr);
        self
    }

    /// Adds a HAVING predicate.
    #[must_use]
    pub fn having(mut self, expr: Expr) -> Self {
        self.core.havings.push(expr);
        self
    }

    /// Adds an ORDER BY entry.
    #[must_use]
    pub fn order(mut self, order: OrderBy) -> Self {
        self.orders.push(order);
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub fn limit(mut self, limit: Expr) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset.
    #[must_use]
    pub fn offset(mut self, offset: Expr) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the row lock.
    #[must_use]
    pub fn lock(mut self, lock: Lock) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Whether LIMIT or OFFSET is present.
    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}

/// A column in SELECT clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    /// The expression.
    pub expr: Expr,
    /// Column alias.
    pub alias: Option<String>,
}

impl SelectColumn {
    /// Creates a new select column.
    #[must_use]
    pub const fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    /// Creates a select column with an alias.
    #[must_use]
    pub fn with_alias(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// An INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Column names (optional).
    pub columns: Vec<String>,
    /// Values to insert.
    pub values: InsertSource,
    /// Columns whose inserted values are returned to the caller.
    pub returning: Vec<String>,
}

impl InsertStatement {
    /// Starts an INSERT into `table` with `columns`.
    #[must_use]
    pub fn into_table(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            schema: None,
            table: table.into(),
            columns: columns.iter().map(|c| String::from(*c)).collect(),
            values: InsertSource::Values(Vec::new()),
            returning: Vec::new(),
        }
    }

    /// Appends a row of values.
    #[must_use]
    pub fn row(mut self, row: Vec<Expr>) -> Self {
        match &mut self.values {
            InsertSource::Values(rows) => rows.push(row),
            other => *other = InsertSource::Values(vec![row]),
        }
        self
    }

    /// Requests the inserted values of `columns`.
    #[must_use]
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.returning = columns.iter().map(|c| String::from(*c)).collect();
        self
    }
}

/// Source of data for INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// VALUES (...), (...), ...
    Values(Vec<Vec<Expr>>),
    /// SELECT ...
    Query(Box<SelectStatement>),
    /// DEFAULT VALUES
    DefaultValues,
}

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// SET assignments.
    pub assignments: Vec<UpdateAssignment>,
    /// WHERE predicates, joined with AND.
    pub wheres: Vec<Expr>,
    /// ORDER BY clauses.
    pub orders: Vec<OrderBy>,
    /// Row limit.
    pub limit: Option<Expr>,
    /// Rows to skip.
    pub offset: Option<Expr>,
    /// Key column used to restrict limited or ordered updates.
    pub key: Option<Expr>,
}

impl UpdateStatement {
    /// Starts an UPDATE of `table`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            assignments: Vec::new(),
            wheres: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            key: None,
        }
    }

    /// Adds a SET assignment.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: Expr) -> Self {
        self.assignments.push(UpdateAssignment {
            column: column.into(),
            value,
        });
        self
    }

    /// Adds a WHERE predicate.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.wheres.push(expr);
        self
    }

    /// Adds an ORDER BY entry.
    #[must_use]
    pub fn order(mut self, order: OrderBy) -> Self {
        self.orders.push(order);
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub fn limit(mut self, limit: Expr) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the key column.
    #[must_use]
    pub fn key(mut self, key: Expr) -> Self {
        self.key = Some(key);
        self
    }
}

/// An assignment in UPDATE SET.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAssignment {
    /// Column name.
    pub column: String,
    /// Value expression.
    pub value: Expr,
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// WHERE predicates, joined with AND.
    pub wheres: Vec<Expr>,
    /// ORDER BY clauses.
    pub orders: Vec<OrderBy>,
    /// Row limit.
    pub limit: Option<Expr>,
    /// Rows to skip.
    pub offset: Option<Expr>,
    /// Key column used to restrict limited or ordered deletes.
    pub key: Option<Expr>,
}

impl DeleteStatement {
    /// Starts a DELETE from `table`.
    #[must_use]
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            wheres: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            key: None,
        }
    }

    /// Adds a WHERE predicate.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.wheres.push(expr);
        self
    }

    /// Adds an ORDER BY entry.
    #[must_use]
    pub fn order(mut self, order: OrderBy) -> Self {
        self.orders.push(order);
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub fn limit(mut self, limit: Expr) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the key column.
    #[must_use]
    pub fn key(mut self, key: Expr) -> Self {
        self.key = Some(key);
        self
    }
}

/// A SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT statement.
    Select(SelectStatement),
    /// INSERT statement.
    Insert(InsertStatement),
    /// UPDATE statement.
    Update(UpdateStatement),
    /// DELETE statement.
    Delete(DeleteStatement),
}

impl From<SelectStatement> for Statement {
    fn from(stmt: SelectStatement) -> Self {
        Self::Select(stmt)
    }
}

impl From<InsertStatement> for Statement {
    fn from(stmt: InsertStatement) -> Self {
        Self::Insert(stmt)
    }
}

impl From<UpdateStatement> for Statement {
    fn from(stmt: UpdateStatement) -> Self {
        Self::Update(stmt)
    }
}

impl From<DeleteStatement> for Statement {
    fn from(stmt: DeleteStatement) -> Self {
        Self::Delete(stmt)
    }
}
