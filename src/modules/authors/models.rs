use serde::Deserialize;

use crate::catalog::{check_text, CatalogError, CatalogResult};

/// Body of `POST /api/authors` and `PUT /api/authors/{id}`.
///
/// Fields are optional so that a missing `name` is reported as a field
/// error instead of a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorPayload {
    pub name: Option<String>,
}

impl AuthorPayload {
    /// Returns the name exactly as sent; blank names are rejected
    pub fn validate(&self) -> CatalogResult<String> {
        let mut errors = Vec::new();
        match check_text("name", self.name.as_deref(), &mut errors) {
            Some(name) => Ok(name),
            None => Err(CatalogError::validation(errors)),
        }
    }
}
