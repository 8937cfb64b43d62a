//! Shared input checks and query fragments used by the domain services.

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Parse a path or body id; malformed ids are a 400 `Invalid <Entity> ID format`.
pub fn parse_id(raw: &str, entity: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::bad_request(format!("Invalid {} ID format", entity)))
}

/// Like [`parse_id`] but blank input means "not given".
pub fn parse_opt_id(raw: Option<&str>, entity: &str) -> Result<Option<Uuid>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_id(s, entity).map(Some),
    }
}

/// Lenient filter parsing: malformed ids are ignored.
pub fn filter_id(raw: Option<&str>) -> Option<Uuid> {
    raw.and_then(|s| Uuid::parse_str(s.trim()).ok())
}

/// `lower(col) LIKE pattern ESCAPE '\'`; `pattern` is expected lowercase and escaped already.
pub fn ilike<C: IntoColumnRef>(col: C, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(LikeExpr::new(pattern).escape('\\'))
}

/// `lower(col) = value.to_lowercase()`
pub fn lower_eq<C: IntoColumnRef>(col: C, value: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).eq(value.trim().to_lowercase())
}

/// Non-empty after trimming.
pub fn present(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Per-field validation messages reported as `details` of a 422.
#[derive(Debug, Default)]
pub struct FieldErrors(Map<String, Value>);

impl FieldErrors {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| Value::String(message.into()));
    }

    /// Record `message` for `field` unless `ok`.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn finish(self, message: &str) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::validation_with(message, Value::Object(self.0)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_reports_entity() {
        let err = parse_id("nope", "Organization").unwrap_err();
        assert_eq!(err.to_string(), "Invalid Organization ID format");
        assert!(parse_opt_id(Some("  "), "Role").unwrap().is_none());
        assert!(filter_id(Some("bad")).is_none());
    }

    #[test]
    fn field_errors_keep_first_message() {
        let mut errs = FieldErrors::new();
        errs.check(false, "name", "Name is required");
        errs.check(false, "name", "Name is too short");
        errs.check(true, "email", "unused");
        match errs.finish("Invalid input") {
            Err(ServiceError::Validation { message, details: Some(d) }) => {
                assert_eq!(message, "Invalid input");
                assert_eq!(d, serde_json::json!({"name": "Name is required"}));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
