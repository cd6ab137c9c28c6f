//! Error taxonomy and input checks shared by the catalog services.

use serde::Serialize;
use serde_json::json;
use shelf_db::StoreError;
use shelf_http::error::AppError;
use thiserror::Error;

pub const MIN_YEAR: i32 = 1000;
pub const MAX_YEAR: i32 = 9999;

/// What went wrong, as far as a caller is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    HasDependents,
    InvalidReference,
    Validation,
    Unclassified,
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub error: String,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct CatalogError {
    kind: ErrorKind,
    message: String,
    fields: Vec<FieldError>,
    dependents: Vec<i64>,
    cause: Option<anyhow::Error>,
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: Vec::new(),
            dependents: Vec::new(),
            cause: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn has_dependents(message: impl Into<String>, dependents: Vec<i64>) -> Self {
        Self {
            dependents,
            ..Self::new(ErrorKind::HasDependents, message)
        }
    }

    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidReference, message)
    }

    pub fn validation(fields: Vec<FieldError>) -> Self {
        let message = fields
            .iter()
            .map(|f| format!("{}: {}", f.field, f.error))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            fields,
            ..Self::new(ErrorKind::Validation, message)
        }
    }

    pub fn invalid_field(field: &'static str, error: impl Into<String>) -> Self {
        Self::validation(vec![FieldError {
            field,
            error: error.into(),
        }])
    }

    pub fn unclassified(cause: anyhow::Error) -> Self {
        Self {
            cause: Some(cause),
            ..Self::new(ErrorKind::Unclassified, "unclassified storage failure")
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.fields
    }

    /// Ids of the records blocking a delete
    pub fn dependents(&self) -> &[i64] {
        &self.dependents
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => CatalogError::not_found(format!("{what} not found")),
            StoreError::HasDependents { entity, dependents } => CatalogError::has_dependents(
                format!("{entity} still has {} book(s)", dependents.len()),
                dependents,
            ),
            StoreError::InvalidReference(message) => CatalogError::invalid_reference(message),
            StoreError::Unexpected(cause) => CatalogError::unclassified(cause),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err.kind {
            ErrorKind::Validation => AppError::validation(
                err.fields
                    .iter()
                    .map(|f| json!({ "field": f.field, "error": f.error }))
                    .collect(),
                err.message,
            ),
            ErrorKind::NotFound => AppError::not_found(err.message),
            ErrorKind::HasDependents => AppError::bad_request(
                "has_dependents",
                vec![json!({ "dependents": err.dependents })],
                err.message,
            ),
            ErrorKind::InvalidReference => {
                AppError::bad_request("invalid_reference", Vec::new(), err.message)
            }
            ErrorKind::Unclassified => AppError::Internal(
                err.cause
                    .unwrap_or_else(|| anyhow::anyhow!(err.message)),
            ),
        }
    }
}

/// Reject non-positive ids before touching the store.
pub fn ensure_id(id: i64) -> CatalogResult<()> {
    if id > 0 {
        Ok(())
    } else {
        Err(CatalogError::invalid_field("id", "must be a positive integer"))
    }
}

/// Check a required text field.
///
/// Blank-after-trim is rejected; an accepted value is returned as given.
pub fn check_text(
    field: &'static str,
    value: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        None => {
            errors.push(FieldError {
                field,
                error: "required".to_string(),
            });
            None
        }
        Some(text) if text.trim().is_empty() => {
            errors.push(FieldError {
                field,
                error: "must not be empty".to_string(),
            });
            None
        }
        Some(text) => Some(text.to_string()),
    }
}

pub fn check_year(value: i32, errors: &mut Vec<FieldError>) -> Option<i32> {
    if (MIN_YEAR..=MAX_YEAR).contains(&value) {
        Some(value)
    } else {
        errors.push(FieldError {
            field: "year",
            error: format!("must be between {MIN_YEAR} and {MAX_YEAR}"),
        });
        None
    }
}

pub fn check_author_id(value: i64, errors: &mut Vec<FieldError>) -> Option<i64> {
    if value > 0 {
        Some(value)
    } else {
        errors.push(FieldError {
            field: "authorId",
            error: "must be a positive integer".to_string(),
        });
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn store_errors_keep_their_kind() {
        let cases = [
            (StoreError::NotFound("book 1".into()), ErrorKind::NotFound),
            (
                StoreError::HasDependents {
                    entity: "author 1".into(),
                    dependents: vec![1],
                },
                ErrorKind::HasDependents,
            ),
            (
                StoreError::InvalidReference("author 9".into()),
                ErrorKind::InvalidReference,
            ),
            (
                StoreError::Unexpected(anyhow::anyhow!("disk full")),
                ErrorKind::Unclassified,
            ),
        ];
        for (store_error, kind) in cases {
            assert_eq!(CatalogError::from(store_error).kind(), kind);
        }
    }

    #[test]
    fn kinds_map_to_distinct_statuses() {
        let status = |err: CatalogError| AppError::from(err).into_response().status();

        assert_eq!(
            status(CatalogError::not_found("author 1 not found")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(CatalogError::has_dependents("author 1 has books", vec![2])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(CatalogError::invalid_reference("author 9 does not exist")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(CatalogError::invalid_field("name", "required")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(CatalogError::unclassified(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn has_dependents_carries_blocking_ids() {
        let err: CatalogError = StoreError::HasDependents {
            entity: "author 1".into(),
            dependents: vec![4, 5],
        }
        .into();
        assert_eq!(err.dependents(), &[4, 5]);
        assert_eq!(err.message(), "author 1 still has 2 book(s)");
    }

    #[test]
    fn text_check_keeps_input_and_rejects_blank() {
        let mut errors = Vec::new();
        assert_eq!(
            check_text("name", Some("  Ada "), &mut errors),
            Some("  Ada ".to_string())
        );
        assert_eq!(check_text("name", Some("   "), &mut errors), None);
        assert_eq!(check_text("name", None, &mut errors), None);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].error, "required");
    }

    #[test]
    fn year_bounds_are_inclusive() {
        let mut errors = Vec::new();
        assert_eq!(check_year(1000, &mut errors), Some(1000));
        assert_eq!(check_year(9999, &mut errors), Some(9999));
        assert_eq!(check_year(999, &mut errors), None);
        assert_eq!(check_year(10000, &mut errors), None);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn non_positive_ids_are_validation_errors() {
        assert!(ensure_id(1).is_ok());
        assert_eq!(ensure_id(0).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(ensure_id(-7).unwrap_err().kind(), ErrorKind::Validation);
    }
}
