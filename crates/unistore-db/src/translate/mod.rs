//! Condition translators
//!
//! Turn untyped [`Record`](crate::Record) / [`Condition`](crate::Condition)
//! maps into backend-native syntax:
//!
//! - [`sql`]: SQL text plus an ordered parameter list, with placeholder style
//!   and type hints chosen from the [`SqlDialect`]
//! - [`document`]: BSON filter, insert and `$set` update documents
//!
//! Both translators are equality-only: every field becomes `field = value`.

pub mod document;
pub mod sql;

pub use sql::{SqlDialect, SqlTranslator, Statement};
