use serde::Serialize;
use shelf_db::{fold_case, Author, BookWithAuthor, SearchFilter, SharedStore};

use crate::catalog::CatalogResult;

/// Books and authors matching one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub books: Vec<BookWithAuthor>,
    pub authors: Vec<Author>,
}

/// Substring search across titles, author names and years.
#[derive(Clone)]
pub struct SearchService {
    store: SharedStore,
}

impl SearchService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// A blank query returns empty results without touching the store.
    pub async fn search(&self, query: &str) -> CatalogResult<SearchResults> {
        let Some(filter) = build_filter(query) else {
            return Ok(SearchResults::default());
        };

        let books = self.store.search_books(&filter).await?;
        let authors = self.store.search_authors(&filter).await?;

        tracing::debug!(
            query = %filter.text,
            year = ?filter.year,
            books = books.len(),
            authors = authors.len(),
            "search complete"
        );

        Ok(SearchResults { books, authors })
    }
}

/// Trim and case-fold `query`; `None` when nothing is left.
///
/// The year clause is only set for a query made entirely of ASCII digits
/// that fits an `i32`.
pub fn build_filter(query: &str) -> Option<SearchFilter> {
    let text = fold_case(query.trim());
    if text.is_empty() {
        return None;
    }

    let year = if text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse::<i32>().ok()
    } else {
        None
    };

    Some(SearchFilter { text, year })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shelf_db::{
        AuthorWithBookCount, AuthorWithBooks, BookPatch, CatalogStore, MemoryStore, NewBook,
        StoreResult,
    };
    use shelf_kernel::Migration;
    use std::sync::{Arc, Mutex};

    /// Records every search filter; any other store call is a test failure.
    #[derive(Default)]
    struct RecordingStore {
        filters: Mutex<Vec<SearchFilter>>,
    }

    #[async_trait]
    impl CatalogStore for RecordingStore {
        async fn list_authors(&self) -> StoreResult<Vec<AuthorWithBookCount>> {
            unreachable!("search must not list authors")
        }
        async fn get_author(&self, _id: i64) -> StoreResult<AuthorWithBooks> {
            unreachable!()
        }
        async fn create_author(&self, _name: &str) -> StoreResult<Author> {
            unreachable!()
        }
        async fn update_author(&self, _id: i64, _name: &str) -> StoreResult<Author> {
            unreachable!()
        }
        async fn delete_author(&self, _id: i64) -> StoreResult<()> {
            unreachable!()
        }
        async fn list_books(&self) -> StoreResult<Vec<BookWithAuthor>> {
            unreachable!("search must not list books")
        }
        async fn get_book(&self, _id: i64) -> StoreResult<BookWithAuthor> {
            unreachable!()
        }
        async fn create_book(&self, _book: NewBook) -> StoreResult<BookWithAuthor> {
            unreachable!()
        }
        async fn update_book(&self, _id: i64, _patch: BookPatch) -> StoreResult<BookWithAuthor> {
            unreachable!()
        }
        async fn delete_book(&self, _id: i64) -> StoreResult<()> {
            unreachable!()
        }
        async fn search_books(&self, filter: &SearchFilter) -> StoreResult<Vec<BookWithAuthor>> {
            self.filters.lock().unwrap().push(filter.clone());
            Ok(Vec::new())
        }
        async fn search_authors(&self, filter: &SearchFilter) -> StoreResult<Vec<Author>> {
            self.filters.lock().unwrap().push(filter.clone());
            Ok(Vec::new())
        }
        async fn apply_migrations(
            &self,
            _migrations: &[(String, Migration)],
        ) -> StoreResult<usize> {
            unreachable!()
        }
        async fn health_check(&self) -> StoreResult<()> {
            Ok(())
        }
        fn backend_name(&self) -> &'static str {
            "recording"
        }
    }

    #[test]
    fn filter_normalizes_query() {
        assert_eq!(
            build_filter("  Dune "),
            Some(SearchFilter {
                text: "dune".into(),
                year: None,
            })
        );
        assert_eq!(build_filter(" \t "), None);
        assert_eq!(build_filter(" Émile ").unwrap().text, "Émile");
    }

    #[test]
    fn only_whole_numbers_engage_year_matching() {
        assert_eq!(build_filter("2023").unwrap().year, Some(2023));
        assert_eq!(build_filter(" 1965 ").unwrap().year, Some(1965));
        for query in ["abc", "20x3", "-2023", "+2023", "19.5", "99999999999"] {
            assert_eq!(build_filter(query).unwrap().year, None, "{query}");
        }
    }

    #[tokio::test]
    async fn blank_query_never_touches_store() {
        let store = Arc::new(RecordingStore::default());
        let service = SearchService::new(store.clone());

        for query in ["", "   ", "\n"] {
            assert_eq!(service.search(query).await.unwrap(), SearchResults::default());
        }
        assert!(store.filters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn text_query_issues_both_searches_without_year() {
        let store = Arc::new(RecordingStore::default());
        let service = SearchService::new(store.clone());

        service.search("ABC").await.unwrap();

        let filters = store.filters.lock().unwrap();
        assert_eq!(filters.len(), 2);
        assert!(filters
            .iter()
            .all(|f| f.text == "abc" && f.year.is_none()));
    }

    #[tokio::test]
    async fn numeric_query_matches_year_title_and_author() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let ada = store.create_author("Ada").await.unwrap();
        let club = store.create_author("The 2023 Club").await.unwrap();
        for (title, author_id, year) in [
            ("Plain", ada.id, 2023),
            ("Report 2023", ada.id, 1990),
            ("Anthology", club.id, 2001),
            ("Unrelated", ada.id, 1999),
        ] {
            store
                .create_book(NewBook {
                    title: title.into(),
                    author_id,
                    year,
                })
                .await
                .unwrap();
        }

        let results = SearchService::new(store).search("2023").await.unwrap();

        let titles: Vec<&str> = results
            .books
            .iter()
            .map(|b| b.book.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Plain", "Report 2023", "Anthology"]);
        assert_eq!(results.authors.len(), 1);
        assert_eq!(results.authors[0].name, "The 2023 Club");
    }
}
