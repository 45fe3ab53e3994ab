//! Capability-driven tree rewrites applied before rendering.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::Compiler;
use crate::ast::{
    DeleteStatement, Expr, InsertSource, JoinSource, OrderBy, SelectColumn, SelectCore,
    SelectStatement, Statement, TableRef, UpdateStatement,
};
use crate::dialect::PagingStyle;
use crate::error::CompileError;
use crate::schema::ColumnMetadata;
use crate::value::SqlValue;

/// Projection text used for rewritten EXISTS checks.
const TOP_ONE: &str = "TOP(?) 1";
const EXISTS_ALIAS: &str = "one";

static ORDER_DIRECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:ASC|DESC)\b").expect("ordering patterns are valid"));
static NULLS_ORDERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+NULLS\s+(?:FIRST|LAST)\b").expect("ordering patterns are valid"));

/// Prefix of the aliases given to projected ORDER BY expressions.
const ORDER_ALIAS_PREFIX: &str = "alias_";

impl Compiler<'_> {
    pub(super) fn rewrite_statement(&self, statement: &mut Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Select(select) => self.rewrite_select(select, false),
            Statement::Insert(insert) => match &mut insert.values {
                InsertSource::Values(rows) => rows
                    .iter_mut()
                    .flatten()
                    .for_each(|expr| self.rewrite_expr(expr)),
                InsertSource::Query(query) => self.rewrite_select(query, false),
                InsertSource::DefaultValues => {}
            },
            Statement::Update(update) => self.rewrite_update(update)?,
            Statement::Delete(delete) => self.rewrite_delete(delete)?,
        }
        Ok(())
    }

    /// Rewrites a SELECT. `nested` marks derived tables and subqueries.
    pub(super) fn rewrite_select(&self, select: &mut SelectStatement, nested: bool) {
        let caps = self.dialect.capabilities();

        if nested && !caps.ordered_subqueries && !select.is_paged() && !select.orders.is_empty() {
            debug!("Dropping ORDER BY from unpaged subquery");
            select.orders.clear();
        }

        self.rewrite_core(&mut select.core);
        for order in &mut select.orders {
            self.rewrite_expr(&mut order.expr);
        }

        if caps.top_exists_check && is_exists_check(select) {
            let top = select
                .limit
                .as_ref()
                .and_then(Expr::integer_value)
                .unwrap_or(1);
            select.core.projections = vec![SelectColumn::with_alias(
                Expr::sql_with_binds(TOP_ONE, vec![SqlValue::Int(top)]),
                EXISTS_ALIAS,
            )];
            select.limit = None;
        }

        if select.is_paged() {
            if select.orders.is_empty() && caps.deterministic_paging {
                match self.primary_key_order(&select.core.source) {
                    Some(order) => select.orders.push(order),
                    None => debug!("No primary key for paged select, leaving it unordered"),
                }
            }

            if caps.paging == PagingStyle::OffsetFetch && select.limit.is_some() && select.offset.is_none() {
                select.offset = Some(Expr::integer(0));
            }
        }

        if caps.distinct_order_projections && select.core.distinct && !has_top_projection(select) {
            project_order_columns(select);
        }
    }

    fn rewrite_core(&self, core: &mut SelectCore) {
        for projection in &mut core.projections {
            self.rewrite_expr(&mut projection.expr);
        }
        if let Some(left) = &mut core.source.left {
            self.rewrite_table_ref(left);
        }
        for join in &mut core.source.joins {
            self.rewrite_table_ref(&mut join.table);
            if let Some(on) = &mut join.on {
                self.rewrite_expr(on);
            }
        }
        core.wheres
            .iter_mut()
            .chain(core.groups.iter_mut())
            .chain(core.havings.iter_mut())
            .for_each(|expr| self.rewrite_expr(expr));
    }

    fn rewrite_table_ref(&self, table: &mut TableRef) {
        if let TableRef::Subquery { query, .. } = table {
            self.rewrite_select(query, true);
        }
    }

    fn rewrite_expr(&self, expr: &mut Expr) {
        match expr {
            Expr::Subquery(query) | Expr::Exists { query, .. } => self.rewrite_select(query, true),
            Expr::InSubquery { expr, query, .. } => {
                self.rewrite_expr(expr);
                self.rewrite_select(query, true);
            }
            Expr::Binary { left, right, .. } => {
                self.rewrite_expr(left);
                self.rewrite_expr(right);
            }
            Expr::Unary { operand: inner, .. }
            | Expr::IsNull { expr: inner, .. }
            | Expr::Grouping(inner)
            | Expr::Bin(inner) => self.rewrite_expr(inner),
            Expr::Function(call) => call.args.iter_mut().for_each(|arg| self.rewrite_expr(arg)),
            Expr::In { expr, list, .. } => {
                self.rewrite_expr(expr);
                list.iter_mut().for_each(|item| self.rewrite_expr(item));
            }
            Expr::Between { expr, low, high, .. } => {
                self.rewrite_expr(expr);
                self.rewrite_expr(low);
                self.rewrite_expr(high);
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(operand) = operand {
                    self.rewrite_expr(operand);
                }
                for (when, then) in when_clauses {
                    self.rewrite_expr(when);
                    self.rewrite_expr(then);
                }
                if let Some(other) = else_clause {
                    self.rewrite_expr(other);
                }
            }
            Expr::Value(_)
            | Expr::Bind(_)
            | Expr::Column { .. }
            | Expr::Sql { .. }
            | Expr::Wildcard { .. } => {}
        }
    }

    fn rewrite_update(&self, update: &mut UpdateStatement) -> Result<(), CompileError> {
        for assignment in &mut update.assignments {
            self.rewrite_expr(&mut assignment.value);
        }
        update.wheres.iter_mut().for_each(|expr| self.rewrite_expr(expr));

        let restricted = self.restrict_rows(
            "UPDATE",
            RowRestriction {
                schema: update.schema.as_deref(),
                table: &update.table,
                wheres: &mut update.wheres,
                orders: &mut update.orders,
                limit: &mut update.limit,
                offset: &mut update.offset,
                key: update.key.as_ref(),
            },
        )?;
        if restricted {
            debug!(table = %update.table, "Restricted UPDATE through keyed subselect");
        }
        Ok(())
    }

    fn rewrite_delete(&self, delete: &mut DeleteStatement) -> Result<(), CompileError> {
        delete.wheres.iter_mut().for_each(|expr| self.rewrite_expr(expr));

        let restricted = self.restrict_rows(
            "DELETE",
            RowRestriction {
                schema: delete.schema.as_deref(),
                table: &delete.table,
                wheres: &mut delete.wheres,
                orders: &mut delete.orders,
                limit: &mut delete.limit,
                offset: &mut delete.offset,
                key: delete.key.as_ref(),
            },
        )?;
        if restricted {
            debug!(table = %delete.table, "Restricted DELETE through keyed subselect");
        }
        Ok(())
    }

    /// Turns LIMIT/OFFSET/ORDER BY on UPDATE or DELETE into
    /// `key IN (SELECT key FROM table WHERE ... )`.
    fn restrict_rows(
        &self,
        statement: &'static str,
        target: RowRestriction<'_>,
    ) -> Result<bool, CompileError> {
        let caps = self.dialect.capabilities();

        if !target.orders.is_empty() && target.limit.is_none() && caps.update_order_requires_limit {
            *target.limit = Some(Expr::integer(caps.max_row_limit));
        }
        if target.limit.is_none() && target.offset.is_none() {
            // Ordering rows that are all affected anyway changes nothing.
            target.orders.clear();
            return Ok(false);
        }
        let key = target
            .key
            .cloned()
            .ok_or(CompileError::UnkeyedRowLimit { statement })?;

        let table_name = match target.schema {
            Some(schema) => TableRef::with_schema(schema, target.table),
            None => TableRef::table(target.table),
        };
        let mut subselect = SelectStatement {
            core: SelectCore {
                projections: vec![SelectColumn::new(key.clone())],
                source: JoinSource {
                    left: Some(table_name),
                    joins: Vec::new(),
                },
                wheres: std::mem::take(target.wheres),
                ..SelectCore::default()
            },
            orders: std::mem::take(target.orders),
            limit: target.limit.take(),
            offset: target.offset.take(),
            lock: None,
        };
        self.rewrite_select(&mut subselect, false);
        target.wheres.push(key.in_subquery(subselect));
        Ok(true)
    }

    /// Ascending order on the primary key of the driving table.
    fn primary_key_order(&self, source: &JoinSource) -> Option<OrderBy> {
        let (lookup, qualifier) = match source.left.as_ref()? {
            TableRef::Table {
                schema,
                name,
                alias,
            } => {
                let qualifier = match (alias, schema) {
                    (Some(alias), _) => alias.clone(),
                    (None, Some(schema)) => format!("{schema}.{name}"),
                    (None, None) => name.clone(),
                };
                (name.clone(), qualifier)
            }
            TableRef::Sql(sql) => (sql.clone(), sql.clone()),
            TableRef::Subquery { .. } => return None,
        };
        let column = self.primary_key_column(&lookup)?;
        Some(OrderBy::asc(Expr::qualified_column(qualifier, column)))
    }

    /// Resolves the column paging is ordered by.
    ///
    /// No declared key: the first column. One key: that key. Composite
    /// keys: the identity column among them, else the first of them.
    fn primary_key_column(&self, table: &str) -> Option<String> {
        let keys = self.schema.primary_keys(table);
        match keys.as_slice() {
            [] => self.schema.columns(table).into_iter().next().map(|c| c.name),
            [single] => Some(single.clone()),
            many => {
                let candidates: Vec<ColumnMetadata> = self
                    .schema
                    .columns(table)
                    .into_iter()
                    .filter(|c| many.contains(&c.name))
                    .collect();
                candidates
                    .iter()
                    .find(|c| c.is_identity())
                    .or_else(|| candidates.first())
                    .map(|c| c.name.clone())
            }
        }
    }
}

struct RowRestriction<'s> {
    schema: Option<&'s str>,
    table: &'s str,
    wheres: &'s mut Vec<Expr>,
    orders: &'s mut Vec<OrderBy>,
    limit: &'s mut Option<Expr>,
    offset: &'s mut Option<Expr>,
    key: Option<&'s Expr>,
}

/// Prepends each ORDER BY expression of a DISTINCT select that is not
/// already selected, so the ordering only uses projected columns.
fn project_order_columns(select: &mut SelectStatement) {
    let projections = &select.core.projections;
    if projections
        .iter()
        .any(|column| matches!(column.expr, Expr::Wildcard { table: None }))
    {
        return;
    }
    let missing: Vec<Expr> = select
        .orders
        .iter()
        .map(|order| projected_order_expr(&order.expr))
        .filter(|expr| !projections.iter().any(|column| column.expr == *expr))
        .fold(Vec::new(), |mut unique, expr| {
            if !unique.contains(&expr) {
                unique.push(expr);
            }
            unique
        });
    if missing.is_empty() {
        return;
    }
    debug!(count = missing.len(), "Projecting ORDER BY expressions of DISTINCT select");
    let offset = projections
        .iter()
        .filter(|column| {
            column
                .alias
                .as_deref()
                .is_some_and(|alias| alias.starts_with(ORDER_ALIAS_PREFIX))
        })
        .count();
    let mut projected: Vec<SelectColumn> = missing
        .into_iter()
        .enumerate()
        .map(|(index, expr)| SelectColumn::with_alias(expr, format!("{ORDER_ALIAS_PREFIX}{}", offset + index)))
        .collect();
    projected.append(&mut select.core.projections);
    select.core.projections = projected;
}

fn has_top_projection(select: &SelectStatement) -> bool {
    select
        .core
        .projections
        .iter()
        .any(|column| matches!(&column.expr, Expr::Sql { text, .. } if text == TOP_ONE))
}

/// Raw ORDER BY fragments lose their direction and null ordering.
fn projected_order_expr(expr: &Expr) -> Expr {
    match expr {
        Expr::Sql { text, binds } => {
            let text = ORDER_DIRECTION.replace_all(text, "");
            Expr::sql_with_binds(NULLS_ORDERING.replace_all(&text, "").trim(), binds.clone())
        }
        other => other.clone(),
    }
}

/// `SELECT DISTINCT 1 AS one` with a limit of at most one and no offset.
fn is_exists_check(select: &SelectStatement) -> bool {
    let core = &select.core;
    let one_as_one = !core.projections.is_empty()
        && core.projections.iter().all(|projection| {
            let is_one = match &projection.expr {
                Expr::Value(SqlValue::Int(1)) => true,
                Expr::Sql { text, binds } => binds.is_empty() && text.trim() == "1",
                _ => false,
            };
            is_one
                && projection
                    .alias
                    .as_deref()
                    .is_some_and(|alias| alias.eq_ignore_ascii_case(EXISTS_ALIAS))
        });
    let limit_at_most_one = match &select.limit {
        None => true,
        Some(limit) => matches!(limit.integer_value(), Some(0 | 1)),
    };
    core.distinct && one_as_one && limit_at_most_one && select.offset.is_none()
}
