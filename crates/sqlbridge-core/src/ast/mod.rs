//! Abstract Syntax Tree (AST) types for SQL statements.

mod expression;
mod statement;

pub use expression::{BinaryOp, Expr, FunctionCall, UnaryOp};
pub use statement::{
    DeleteStatement, InsertSource, InsertStatement, JoinClause, JoinSource, JoinType, Lock,
    NullOrdering, OrderBy, OrderDirection, SelectColumn, SelectCore, SelectStatement, Statement,
    TableRef, UpdateAssignment, UpdateStatement,
};
