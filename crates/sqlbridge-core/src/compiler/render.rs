//! SQL text generation for rewritten trees.

use super::Compiler;
use crate::ast::{
    BinaryOp, DeleteStatement, Expr, InsertSource, InsertStatement, Lock, OrderBy, SelectCore,
    SelectStatement, Statement, TableRef, UpdateStatement,
};
use crate::dialect::{LockStyle, PagingStyle, ReturningStyle};
use crate::error::CompileError;
use crate::quoting;
use crate::value::SqlValue;

/// Row number column used by `row_number()` paging.
const ROW_NUMBER: &str = "internal$rownum";

/// Accumulates SQL text and the bind values of its placeholders.
#[derive(Debug)]
pub(super) struct SqlWriter {
    sql: String,
    binds: Vec<SqlValue>,
    placeholder: &'static str,
}

impl SqlWriter {
    pub(super) fn new(placeholder: &'static str) -> Self {
        Self {
            sql: String::new(),
            binds: Vec::new(),
            placeholder,
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: SqlValue) {
        self.sql.push_str(self.placeholder);
        self.binds.push(value);
    }

    /// Appends a raw fragment, replacing each unquoted `?` with the next
    /// entry of `binds`.
    fn raw(&mut self, text: &str, binds: &[SqlValue]) -> Result<(), CompileError> {
        let segments = quoting::split_placeholders(text);
        let expected = segments.len() - 1;
        if expected != binds.len() {
            return Err(CompileError::InvalidTree(format!(
                "SQL fragment `{text}` has {expected} placeholders but {} binds",
                binds.len()
            )));
        }
        let mut segments = segments.into_iter();
        if let Some(first) = segments.next() {
            self.push(first);
        }
        for (segment, value) in segments.zip(binds.iter().cloned()) {
            self.bind(value);
            self.push(segment);
        }
        Ok(())
    }

    pub(super) fn finish(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.binds)
    }
}

impl Compiler<'_> {
    pub(super) fn emit_statement(
        &self,
        statement: &Statement,
        w: &mut SqlWriter,
    ) -> Result<(), CompileError> {
        match statement {
            Statement::Select(select) => self.emit_select(select, w),
            Statement::Insert(insert) => self.emit_insert(insert, w),
            Statement::Update(update) => self.emit_update(update, w),
            Statement::Delete(delete) => self.emit_delete(delete, w),
        }
    }

    fn emit_select(&self, select: &SelectStatement, w: &mut SqlWriter) -> Result<(), CompileError> {
        if self.dialect.capabilities().paging == PagingStyle::FetchFirst {
            if select.offset.is_some() {
                return self.emit_row_number_window(select, w);
            }
            if select.limit.as_ref().and_then(Expr::integer_value) == Some(0) {
                w.push("SELECT A.* FROM (");
                self.emit_select_body(&unpaged(select), w)?;
                w.push(") A WHERE 1 = 0");
                return Ok(());
            }
        }
        self.emit_select_body(select, w)
    }

    /// Offsets for engines that only know `FETCH FIRST`.
    fn emit_row_number_window(
        &self,
        select: &SelectStatement,
        w: &mut SqlWriter,
    ) -> Result<(), CompileError> {
        w.push("SELECT B.* FROM (SELECT A.*, row_number() over () AS ");
        w.push(ROW_NUMBER);
        w.push(" FROM (");
        self.emit_select_body(&unpaged(select), w)?;
        w.push(") A) B WHERE B.");
        w.push(ROW_NUMBER);
        w.push(" > ");

        let offset = select.offset.as_ref();
        let limit = select.limit.as_ref();
        match offset.and_then(Expr::integer_value) {
            Some(n) => w.push(&n.to_string()),
            None => {
                if let Some(offset) = offset {
                    self.emit_operand(offset, w)?;
                }
            }
        }
        if let Some(limit) = limit {
            w.push(" AND B.");
            w.push(ROW_NUMBER);
            w.push(" <= ");
            let upper = limit
                .integer_value()
                .zip(offset.and_then(Expr::integer_value))
                .and_then(|(limit, offset)| limit.checked_add(offset));
            match (upper, offset) {
                (Some(upper), _) => w.push(&upper.to_string()),
                (None, Some(offset)) => {
                    self.emit_operand(limit, w)?;
                    w.push(" + ");
                    self.emit_operand(offset, w)?;
                }
                (None, None) => self.emit_operand(limit, w)?,
            }
        }
        Ok(())
    }

    fn emit_select_body(
        &self,
        select: &SelectStatement,
        w: &mut SqlWriter,
    ) -> Result<(), CompileError> {
        let caps = self.dialect.capabilities();
        self.emit_core(&select.core, select.lock.as_ref(), w)?;
        self.emit_orders(&select.orders, w)?;

        match caps.paging {
            PagingStyle::LimitOffset => {
                if let Some(limit) = &select.limit {
                    w.push(" LIMIT ");
                    self.emit_expr(limit, w)?;
                } else if select.offset.is_some() && caps.offset_requires_limit {
                    w.push(" LIMIT -1");
                }
                if let Some(offset) = &select.offset {
                    w.push(" OFFSET ");
                    self.emit_expr(offset, w)?;
                }
            }
            PagingStyle::OffsetFetch => {
                if let Some(offset) = &select.offset {
                    w.push(" OFFSET ");
                    self.emit_expr(offset, w)?;
                    w.push(" ROWS");
                }
                if let Some(limit) = &select.limit {
                    if limit.integer_value() == Some(0) {
                        w.push(" FETCH FIRST (SELECT 0) ROWS ONLY");
                    } else {
                        w.push(" FETCH NEXT ");
                        self.emit_expr(limit, w)?;
                        w.push(" ROWS ONLY");
                    }
                }
            }
            PagingStyle::FetchFirst => {
                if let Some(limit) = &select.limit {
                    match limit.integer_value() {
                        Some(1) => w.push(" FETCH FIRST 1 ROW ONLY"),
                        Some(n) => w.push(&format!(" FETCH FIRST {n} ROWS ONLY")),
                        None => {
                            w.push(" FETCH FIRST ");
                            self.emit_expr(limit, w)?;
                            w.push(" ROWS ONLY");
                        }
                    }
                }
            }
        }

        if let (LockStyle::Trailing, Some(lock)) = (caps.lock, &select.lock) {
            w.push(" ");
            w.push(&lock.0);
        }
        Ok(())
    }

    fn emit_core(
        &self,
        core: &SelectCore,
        lock: Option<&Lock>,
        w: &mut SqlWriter,
    ) -> Result<(), CompileError> {
        if core.projections.is_empty() {
            return Err(CompileError::InvalidTree(String::from(
                "SELECT needs at least one projection",
            )));
        }
        w.push("SELECT ");
        if core.distinct {
            w.push("DISTINCT ");
        }
        for (i, projection) in core.projections.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            self.emit_expr(&projection.expr, w)?;
            if let Some(alias) = &projection.alias {
                w.push(" AS ");
                w.push(&self.dialect.quote_column_name(alias));
            }
        }

        if let Some(left) = &core.source.left {
            w.push(" FROM ");
            self.emit_table_ref(left, w)?;
            self.emit_lock_hint(lock, w);
        }
        for join in &core.source.joins {
            w.push(" ");
            w.push(join.join_type.as_str());
            w.push(" ");
            self.emit_table_ref(&join.table, w)?;
            self.emit_lock_hint(lock, w);
            if let Some(on) = &join.on {
                w.push(" ON ");
                self.emit_expr(on, w)?;
            }
        }

        self.emit_predicates(" WHERE ", &core.wheres, w)?;
        if !core.groups.is_empty() {
            w.push(" GROUP BY ");
            self.emit_list(&core.groups, w)?;
        }
        self.emit_predicates(" HAVING ", &core.havings, w)
    }

    /// Inline table hint, written after every table reference.
    fn emit_lock_hint(&self, lock: Option<&Lock>, w: &mut SqlWriter) {
        let Some(lock) = lock else { return };
        if self.dialect.capabilities().lock != LockStyle::TableHint {
            return;
        }
        if lock.is_for_update() {
            w.push(" WITH(UPDLOCK)");
        } else {
            w.push(" ");
            w.push(&lock.0);
        }
    }

    fn emit_predicates(
        &self,
        keyword: &str,
        predicates: &[Expr],
        w: &mut SqlWriter,
    ) -> Result<(), CompileError> {
        if predicates.is_empty() {
            return Ok(());
        }
        w.push(keyword);
        for (i, predicate) in predicates.iter().enumerate() {
            if i > 0 {
                w.push(" AND ");
            }
            if matches!(predicate, Expr::Binary { op: BinaryOp::Or, .. }) && predicates.len() > 1 {
                w.push("(");
                self.emit_expr(predicate, w)?;
                w.push(")");
            } else {
                self.emit_expr(predicate, w)?;
            }
        }
        Ok(())
    }

    fn emit_orders(&self, orders: &[OrderBy], w: &mut SqlWriter) -> Result<(), CompileError> {
        if orders.is_empty() {
            return Ok(());
        }
        let nulls_ordering = self.dialect.capabilities().nulls_ordering;
        w.push(" ORDER BY ");
        for (i, order) in orders.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            self.emit_expr(&order.expr, w)?;
            w.push(" ");
            w.push(order.direction.as_str());
            if let (true, Some(nulls)) = (nulls_ordering, order.nulls) {
                w.push(" ");
                w.push(nulls.as_str());
            }
        }
        Ok(())
    }

    fn emit_table_ref(&self, table: &TableRef, w: &mut SqlWriter) -> Result<(), CompileError> {
        match table {
            TableRef::Table {
                schema,
                name,
                alias,
            } => {
                w.push(&self.table_name(schema.as_deref(), name));
                if let Some(alias) = alias {
                    w.push(" ");
                    w.push(&self.dialect.quote_identifier(alias));
                }
            }
            TableRef::Subquery { query, alias } => {
                w.push("(");
                self.emit_select(query, w)?;
                w.push(") ");
                w.push(&self.dialect.quote_identifier(alias));
            }
            TableRef::Sql(sql) => w.push(sql),
        }
        Ok(())
    }

    fn table_name(&self, schema: Option<&str>, name: &str) -> String {
        match schema {
            Some(schema) => self.dialect.quote_table_name(&format!("{schema}.{name}")),
            None => self.dialect.quote_table_name(name),
        }
    }

    fn emit_list(&self, exprs: &[Expr], w: &mut SqlWriter) -> Result<(), CompileError> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            self.emit_expr(expr, w)?;
        }
        Ok(())
    }

    /// Writes `expr`, parenthesizing compound expressions.
    fn emit_operand(&self, expr: &Expr, w: &mut SqlWriter) -> Result<(), CompileError> {
        if matches!(expr, Expr::Binary { .. }) {
            w.push("(");
            self.emit_expr(expr, w)?;
            w.push(")");
            Ok(())
        } else {
            self.emit_expr(expr, w)
        }
    }

    fn emit_binary_side(
        &self,
        expr: &Expr,
        parent: BinaryOp,
        right: bool,
        w: &mut SqlWriter,
    ) -> Result<(), CompileError> {
        let needs_parens = match expr {
            Expr::Binary { op, .. } => {
                op.precedence() < parent.precedence()
                    || (right && op.precedence() == parent.precedence() && !is_associative(parent))
            }
            _ => false,
        };
        if needs_parens {
            w.push("(");
            self.emit_expr(expr, w)?;
            w.push(")");
            Ok(())
        } else {
            self.emit_expr(expr, w)
        }
    }

    fn emit_expr(&self, expr: &Expr, w: &mut SqlWriter) -> Result<(), CompileError> {
        match expr {
            Expr::Value(value) => w.push(&self.dialect.quote(value)),
            Expr::Bind(value) => w.bind(value.clone()),
            Expr::Column { table, name } => {
                if let Some(table) = table {
                    w.push(&self.dialect.quote_table_name(table));
                    w.push(".");
                }
                w.push(&self.dialect.quote_column_name(name));
            }
            Expr::Binary { left, op, right } => {
                self.emit_binary_side(left, *op, false, w)?;
                w.push(" ");
                w.push(match op {
                    BinaryOp::Concat => self.dialect.concat_operator(),
                    other => other.as_str(),
                });
                w.push(" ");
                self.emit_binary_side(right, *op, true, w)?;
            }
            Expr::Unary { op, operand } => {
                w.push(op.as_str());
                self.emit_operand(operand, w)?;
            }
            Expr::Function(call) => {
                w.push(&call.name);
                w.push("(");
                if call.distinct {
                    w.push("DISTINCT ");
                }
                self.emit_list(&call.args, w)?;
                w.push(")");
            }
            Expr::Subquery(query) => {
                w.push("(");
                self.emit_select(query, w)?;
                w.push(")");
            }
            Expr::Exists { query, negated } => {
                w.push(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                self.emit_select(query, w)?;
                w.push(")");
            }
            Expr::InSubquery {
                expr,
                query,
                negated,
            } => {
                self.emit_operand(expr, w)?;
                w.push(if *negated { " NOT IN (" } else { " IN (" });
                self.emit_select(query, w)?;
                w.push(")");
            }
            Expr::IsNull { expr, negated } => {
                self.emit_operand(expr, w)?;
                w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::In {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    // Nothing is a member of the empty set.
                    w.push(if *negated { "1=1" } else { "1=0" });
                } else {
                    self.emit_operand(expr, w)?;
                    w.push(if *negated { " NOT IN (" } else { " IN (" });
                    self.emit_list(list, w)?;
                    w.push(")");
                }
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                self.emit_operand(expr, w)?;
                w.push(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                self.emit_operand(low, w)?;
                w.push(" AND ");
                self.emit_operand(high, w)?;
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                w.push("CASE");
                if let Some(operand) = operand {
                    w.push(" ");
                    self.emit_expr(operand, w)?;
                }
                for (when, then) in when_clauses {
                    w.push(" WHEN ");
                    self.emit_expr(when, w)?;
                    w.push(" THEN ");
                    self.emit_expr(then, w)?;
                }
                if let Some(other) = else_clause {
                    w.push(" ELSE ");
                    self.emit_expr(other, w)?;
                }
                w.push(" END");
            }
            Expr::Grouping(inner) => {
                if matches!(**inner, Expr::Subquery(_) | Expr::Grouping(_)) {
                    self.emit_expr(inner, w)?;
                } else {
                    w.push("(");
                    self.emit_expr(inner, w)?;
                    w.push(")");
                }
            }
            Expr::Bin(inner) => {
                self.emit_operand(inner, w)?;
                if let Some(collation) = self.dialect.case_sensitive_collation() {
                    w.push(" ");
                    w.push(collation);
                }
            }
            Expr::Sql { text, binds } => w.raw(text, binds)?,
            Expr::Wildcard { table } => {
                if let Some(table) = table {
                    w.push(&self.dialect.quote_table_name(table));
                    w.push(".");
                }
                w.push("*");
            }
        }
        Ok(())
    }

    fn emit_insert(&self, insert: &InsertStatement, w: &mut SqlWriter) -> Result<(), CompileError> {
        let returning = if insert.returning.is_empty() {
            ReturningStyle::Unsupported
        } else {
            self.dialect.capabilities().returning
        };
        let returned = |prefix: &str| {
            insert
                .returning
                .iter()
                .map(|column| format!("{prefix}{}", self.dialect.quote_column_name(column)))
                .collect::<Vec<_>>()
                .join(", ")
        };

        if returning == ReturningStyle::FinalTable {
            w.push("SELECT ");
            w.push(&returned(""));
            w.push(" FROM FINAL TABLE (");
        }

        w.push("INSERT INTO ");
        w.push(&self.table_name(insert.schema.as_deref(), &insert.table));
        if !insert.columns.is_empty() {
            let columns: Vec<String> = insert
                .columns
                .iter()
                .map(|column| self.dialect.quote_column_name(column))
                .collect();
            w.push(" (");
            w.push(&columns.join(", "));
            w.push(")");
        }
        if returning == ReturningStyle::Output {
            w.push(" OUTPUT ");
            w.push(&returned("INSERTED."));
        }

        match &insert.values {
            InsertSource::Values(rows) => {
                if rows.is_empty() {
                    return Err(CompileError::InvalidTree(String::from(
                        "INSERT needs at least one row of values",
                    )));
                }
                w.push(" VALUES ");
                for (i, row) in rows.iter().enumerate() {
                    if !insert.columns.is_empty() && row.len() != insert.columns.len() {
                        return Err(CompileError::InvalidTree(format!(
                            "INSERT row {i} has {} values for {} columns",
                            row.len(),
                            insert.columns.len()
                        )));
                    }
                    if i > 0 {
                        w.push(", ");
                    }
                    w.push("(");
                    self.emit_list(row, w)?;
                    w.push(")");
                }
            }
            InsertSource::Query(query) => {
                w.push(" ");
                self.emit_select(query, w)?;
            }
            InsertSource::DefaultValues => w.push(" DEFAULT VALUES"),
        }

        match returning {
            ReturningStyle::Returning => {
                w.push(" RETURNING ");
                w.push(&returned(""));
            }
            ReturningStyle::FinalTable => w.push(")"),
            ReturningStyle::Output | ReturningStyle::Unsupported => {}
        }
        Ok(())
    }

    fn emit_update(&self, update: &UpdateStatement, w: &mut SqlWriter) -> Result<(), CompileError> {
        if update.assignments.is_empty() {
            return Err(CompileError::InvalidTree(String::from(
                "UPDATE needs at least one assignment",
            )));
        }
        w.push("UPDATE ");
        w.push(&self.table_name(update.schema.as_deref(), &update.table));
        w.push(" SET ");
        for (i, assignment) in update.assignments.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push(&self.dialect.quote_column_name(&assignment.column));
            w.push(" = ");
            self.emit_expr(&assignment.value, w)?;
        }
        self.emit_predicates(" WHERE ", &update.wheres, w)
    }

    fn emit_delete(&self, delete: &DeleteStatement, w: &mut SqlWriter) -> Result<(), CompileError> {
        w.push("DELETE FROM ");
        w.push(&self.table_name(delete.schema.as_deref(), &delete.table));
        self.emit_predicates(" WHERE ", &delete.wheres, w)
    }
}

const fn is_associative(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::And | BinaryOp::Or | BinaryOp::Add | BinaryOp::Mul | BinaryOp::Concat
    )
}

fn unpaged(select: &SelectStatement) -> SelectStatement {
    SelectStatement {
        limit: None,
        offset: None,
        ..select.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_fragment_skips_quoted_placeholders() {
        let mut w = SqlWriter::new("@p");
        w.raw("[a?] = ? AND \"b?\" = 'c?'", &[SqlValue::Int(1)])
            .unwrap();
        let (sql, binds) = w.finish();
        assert_eq!(sql, "[a?] = @p AND \"b?\" = 'c?'");
        assert_eq!(binds, vec![SqlValue::Int(1)]);
    }

    #[test]
    fn test_raw_fragment_bind_count_mismatch() {
        let mut w = SqlWriter::new("?");
        let err = w.raw("[a?] = ?", &[SqlValue::Int(1), SqlValue::Int(2)]).unwrap_err();
        assert!(matches!(err, CompileError::InvalidTree(_)));
    }

    #[test]
    fn test_raw_fragment_binds() {
        let mut w = SqlWriter::new("?");
        w.raw("x BETWEEN ? AND ?", &[SqlValue::Int(1), SqlValue::Int(5)])
            .unwrap();
        let (sql, binds) = w.finish();
        assert_eq!(sql, "x BETWEEN ? AND ?");
        assert_eq!(binds, vec![SqlValue::Int(1), SqlValue::Int(5)]);
    }

    #[test]
    fn test_raw_fragment_bind_mismatch() {
        let mut w = SqlWriter::new("?");
        let err = w.raw("a = ? AND b = ?", &[SqlValue::Int(1)]).unwrap_err();
        assert!(matches!(err, CompileError::InvalidTree(_)));
    }
}
