use serde::Deserialize;
use shelf_db::{BookPatch, NewBook};

use crate::catalog::{
    check_author_id, check_text, check_year, CatalogError, CatalogResult, FieldError,
};

/// Body of `POST /api/books`. Every field is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookPayload {
    pub title: Option<String>,
    pub author_id: Option<i64>,
    pub year: Option<i32>,
}

impl CreateBookPayload {
    pub fn validate(&self) -> CatalogResult<NewBook> {
        let mut errors = Vec::new();

        let title = check_text("title", self.title.as_deref(), &mut errors);
        let author_id = match self.author_id {
            Some(value) => check_author_id(value, &mut errors),
            None => missing("authorId", &mut errors),
        };
        let year = match self.year {
            Some(value) => check_year(value, &mut errors),
            None => missing("year", &mut errors),
        };

        match (title, author_id, year) {
            (Some(title), Some(author_id), Some(year)) if errors.is_empty() => Ok(NewBook {
                title,
                author_id,
                year,
            }),
            _ => Err(CatalogError::validation(errors)),
        }
    }
}

/// Body of `PUT /api/books/{id}`. At least one field must be present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookPayload {
    pub title: Option<String>,
    pub author_id: Option<i64>,
    pub year: Option<i32>,
}

impl UpdateBookPayload {
    pub fn validate(&self) -> CatalogResult<BookPatch> {
        let mut errors = Vec::new();

        let patch = BookPatch {
            title: self
                .title
                .as_deref()
                .and_then(|title| check_text("title", Some(title), &mut errors)),
            author_id: self
                .author_id
                .and_then(|value| check_author_id(value, &mut errors)),
            year: self.year.and_then(|value| check_year(value, &mut errors)),
        };

        if !errors.is_empty() {
            return Err(CatalogError::validation(errors));
        }
        if patch.is_empty() {
            return Err(CatalogError::invalid_field(
                "body",
                "at least one of title, authorId, year is required",
            ));
        }
        Ok(patch)
    }
}

fn missing<T>(field: &'static str, errors: &mut Vec<FieldError>) -> Option<T> {
    errors.push(FieldError {
        field,
        error: "required".to_string(),
    });
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_every_field() {
        let payload: CreateBookPayload = serde_json::from_str(r#"{"title": "X"}"#).unwrap();
        let err = payload.validate().unwrap_err();
        let fields: Vec<&str> = err.fields().iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["authorId", "year"]);
    }

    #[test]
    fn create_accepts_camel_case_payload() {
        let payload: CreateBookPayload =
            serde_json::from_str(r#"{"title": " Dune ", "authorId": 3, "year": 1965}"#).unwrap();
        assert_eq!(
            payload.validate().unwrap(),
            NewBook {
                title: " Dune ".into(),
                author_id: 3,
                year: 1965,
            }
        );
    }

    #[test]
    fn create_rejects_out_of_range_year() {
        let payload = CreateBookPayload {
            title: Some("Old".into()),
            author_id: Some(1),
            year: Some(999),
        };
        assert_eq!(payload.validate().unwrap_err().fields()[0].field, "year");
    }

    #[test]
    fn update_requires_at_least_one_field() {
        let err = UpdateBookPayload::default().validate().unwrap_err();
        assert_eq!(err.fields()[0].field, "body");
    }

    #[test]
    fn update_keeps_only_supplied_fields() {
        let payload: UpdateBookPayload = serde_json::from_str(r#"{"year": 1999}"#).unwrap();
        assert_eq!(
            payload.validate().unwrap(),
            BookPatch {
                title: None,
                author_id: None,
                year: Some(1999),
            }
        );
    }

    #[test]
    fn update_rejects_blank_title() {
        let payload = UpdateBookPayload {
            title: Some("".into()),
            ..Default::default()
        };
        assert_eq!(payload.validate().unwrap_err().fields()[0].field, "title");
    }
}
