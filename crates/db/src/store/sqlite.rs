//! SQLite-backed catalog store.
//!
//! Schema is owned by the catalog modules and applied through
//! [`CatalogStore::apply_migrations`]; this file only assumes the `authors`
//! and `books` tables exist. Foreign keys are switched on for every pooled
//! connection so `books.author_id` is enforced by SQLite itself.
//!
//! An in-memory database (`sqlite::memory:`) lives only as long as its
//! connection, so such URLs are pinned to exactly one pooled connection that
//! never expires. Transactions therefore must not touch `self.pool` while they
//! are open.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use shelf_kernel::settings::DatabaseSettings;
use shelf_kernel::Migration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use time::OffsetDateTime;

use super::{is_foreign_key_violation, CatalogStore, StoreError, StoreResult};
use crate::model::{
    Author, AuthorWithBookCount, AuthorWithBooks, Book, BookPatch, BookWithAuthor, NewBook,
    SearchFilter,
};

const AUTHOR_COLUMNS: &str = "id, name, created_at, updated_at";

const BOOK_COLUMNS: &str = "id, title, year, author_id, created_at, updated_at";

const BOOK_WITH_AUTHOR_SELECT: &str = r#"
    SELECT b.id, b.title, b.year, b.author_id, b.created_at, b.updated_at,
           a.name AS author_name,
           a.created_at AS author_created_at,
           a.updated_at AS author_updated_at
    FROM books b
    JOIN authors a ON a.id = b.author_id"#;

const MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL,
        PRIMARY KEY (module, id)
    )"#;

/// Durable catalog store on top of an `sqlx` SQLite pool.
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct DbAuthor {
    id: i64,
    name: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct DbAuthorWithCount {
    id: i64,
    name: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    book_count: i64,
}

#[derive(Debug, FromRow)]
struct DbBook {
    id: i64,
    title: String,
    year: i32,
    author_id: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct DbBookWithAuthor {
    id: i64,
    title: String,
    year: i32,
    author_id: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    author_name: String,
    author_created_at: OffsetDateTime,
    author_updated_at: OffsetDateTime,
}

impl From<DbAuthor> for Author {
    fn from(row: DbAuthor) -> Self {
        Author {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<DbAuthorWithCount> for AuthorWithBookCount {
    fn from(row: DbAuthorWithCount) -> Self {
        AuthorWithBookCount {
            author: Author {
                id: row.id,
                name: row.name,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            book_count: row.book_count,
        }
    }
}

impl From<DbBook> for Book {
    fn from(row: DbBook) -> Self {
        Book {
            id: row.id,
            title: row.title,
            year: row.year,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<DbBookWithAuthor> for BookWithAuthor {
    fn from(row: DbBookWithAuthor) -> Self {
        BookWithAuthor {
            author: Author {
                id: row.author_id,
                name: row.author_name,
                created_at: row.author_created_at,
                updated_at: row.author_updated_at,
            },
            book: Book {
                id: row.id,
                title: row.title,
                year: row.year,
                author_id: row.author_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

impl SqliteStore {
    /// Open a pool for `settings.url`.
    ///
    /// Migrations are not applied here; call
    /// [`CatalogStore::apply_migrations`] with the modules' migrations.
    pub async fn connect(settings: &DatabaseSettings) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&settings.url)?.foreign_keys(true);

        let pool_options =
            SqlitePoolOptions::new().acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms));
        let pool_options = if is_in_memory(&settings.url) {
            pool_options
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(settings.max_connections)
        };

        let pool = pool_options.connect_with(options).await?;

        tracing::info!(
            target: "shelf-db",
            in_memory = is_in_memory(&settings.url),
            max_connections = settings.max_connections,
            "sqlite pool ready"
        );

        Ok(Self { pool })
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect(&DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            ..DatabaseSettings::default()
        })
        .await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn list_authors(&self) -> StoreResult<Vec<AuthorWithBookCount>> {
        let rows = sqlx::query_as::<_, DbAuthorWithCount>(
            r#"SELECT a.id, a.name, a.created_at, a.updated_at, COUNT(b.id) AS book_count
               FROM authors a
               LEFT JOIN books b ON b.author_id = a.id
               GROUP BY a.id
               ORDER BY a.id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_author(&self, id: i64) -> StoreResult<AuthorWithBooks> {
        let mut tx = self.pool.begin().await?;

        let author = sqlx::query_as::<_, DbAuthor>(&format!(
            "SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("author {id}")))?;

        let books = sqlx::query_as::<_, DbBook>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE author_id = ?1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AuthorWithBooks {
            author: author.into(),
            books: books.into_iter().map(Into::into).collect(),
        })
    }

    async fn create_author(&self, name: &str) -> StoreResult<Author> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, DbAuthor>(&format!(
            "INSERT INTO authors (name, created_at, updated_at) VALUES (?1, ?2, ?2) RETURNING {AUTHOR_COLUMNS}"
        ))
        .bind(name)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_author(&self, id: i64, name: &str) -> StoreResult<Author> {
        let row = sqlx::query_as::<_, DbAuthor>(&format!(
            "UPDATE authors SET name = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {AUTHOR_COLUMNS}"
        ))
        .bind(name)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Into::into)
            .ok_or_else(|| StoreError::NotFound(format!("author {id}")))
    }

    async fn delete_author(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM authors WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("author {id}")));
        }

        let book_ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM books WHERE author_id = ?1 ORDER BY id")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        if !book_ids.is_empty() {
            return Err(StoreError::HasDependents {
                entity: format!("author {id}"),
                dependents: book_ids,
            });
        }

        // ON DELETE RESTRICT catches a book inserted by another connection
        // after the check above.
        let deleted = sqlx::query("DELETE FROM authors WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await;
        if let Err(err) = deleted {
            if is_foreign_key_violation(&err) {
                return Err(StoreError::HasDependents {
                    entity: format!("author {id}"),
                    dependents: Vec::new(),
                });
            }
            return Err(err.into());
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_books(&self) -> StoreResult<Vec<BookWithAuthor>> {
        let rows = sqlx::query_as::<_, DbBookWithAuthor>(&format!(
            "{BOOK_WITH_AUTHOR_SELECT} ORDER BY b.id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_book(&self, id: i64) -> StoreResult<BookWithAuthor> {
        sqlx::query_as::<_, DbBookWithAuthor>(&format!(
            "{BOOK_WITH_AUTHOR_SELECT} WHERE b.id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Into::into)
        .ok_or_else(|| StoreError::NotFound(format!("book {id}")))
    }

    async fn create_book(&self, book: NewBook) -> StoreResult<BookWithAuthor> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO books (title, year, author_id, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?4)
               RETURNING id"#,
        )
        .bind(&book.title)
        .bind(book.year)
        .bind(book.author_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let id = match inserted {
            Ok(id) => id,
            Err(err) if is_foreign_key_violation(&err) => {
                return Err(StoreError::InvalidReference(format!(
                    "author {} does not exist",
                    book.author_id
                )));
            }
            Err(err) => return Err(err.into()),
        };

        let created = sqlx::query_as::<_, DbBookWithAuthor>(&format!(
            "{BOOK_WITH_AUTHOR_SELECT} WHERE b.id = ?1"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created.into())
    }

    async fn update_book(&self, id: i64, patch: BookPatch) -> StoreResult<BookWithAuthor> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, DbBook>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("book {id}")))?;

        let author_id = patch.author_id.unwrap_or(current.author_id);
        let updated = sqlx::query(
            r#"UPDATE books SET title = ?1, year = ?2, author_id = ?3, updated_at = ?4
               WHERE id = ?5"#,
        )
        .bind(patch.title.unwrap_or(current.title))
        .bind(patch.year.unwrap_or(current.year))
        .bind(author_id)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .execute(&mut *tx)
        .await;
        if let Err(err) = updated {
            if is_foreign_key_violation(&err) {
                return Err(StoreError::InvalidReference(format!(
                    "author {author_id} does not exist"
                )));
            }
            return Err(err.into());
        }

        let row = sqlx::query_as::<_, DbBookWithAuthor>(&format!(
            "{BOOK_WITH_AUTHOR_SELECT} WHERE b.id = ?1"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn delete_book(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("book {id}")));
        }
        Ok(())
    }

    async fn search_books(&self, filter: &SearchFilter) -> StoreResult<Vec<BookWithAuthor>> {
        let rows = match filter.year {
            Some(year) => {
                sqlx::query_as::<_, DbBookWithAuthor>(&format!(
                    r#"{BOOK_WITH_AUTHOR_SELECT}
                       WHERE instr(lower(b.title), lower(?1)) > 0
                          OR b.year = ?2
                          OR instr(lower(a.name), lower(?1)) > 0
                       ORDER BY b.id"#
                ))
                .bind(&filter.text)
                .bind(year)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DbBookWithAuthor>(&format!(
                    r#"{BOOK_WITH_AUTHOR_SELECT}
                       WHERE instr(lower(b.title), lower(?1)) > 0
                          OR instr(lower(a.name), lower(?1)) > 0
                       ORDER BY b.id"#
                ))
                .bind(&filter.text)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn search_authors(&self, filter: &SearchFilter) -> StoreResult<Vec<Author>> {
        let rows = sqlx::query_as::<_, DbAuthor>(&format!(
            "SELECT {AUTHOR_COLUMNS} FROM authors WHERE instr(lower(name), lower(?1)) > 0 ORDER BY id"
        ))
        .bind(&filter.text)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn apply_migrations(&self, migrations: &[(String, Migration)]) -> StoreResult<usize> {
        sqlx::query(MIGRATIONS_TABLE).execute(&self.pool).await?;

        let mut applied = 0;
        for (module, migration) in migrations {
            let mut tx = self.pool.begin().await?;

            let already: Option<String> =
                sqlx::query_scalar("SELECT id FROM schema_migrations WHERE module = ?1 AND id = ?2")
                    .bind(module)
                    .bind(migration.id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if already.is_some() {
                tracing::debug!(%module, id = migration.id, "migration already applied");
                continue;
            }

            sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(migration.up)).await?;
            sqlx::query("INSERT INTO schema_migrations (module, id, applied_at) VALUES (?1, ?2, ?3)")
                .bind(module)
                .bind(migration.id)
                .bind(OffsetDateTime::now_utc())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            tracing::info!(%module, id = migration.id, "applied migration");
            applied += 1;
        }

        Ok(applied)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_urls_are_detected() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file.db?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://shelf.db?mode=rwc"));
    }

    #[tokio::test]
    async fn migrations_are_applied_once() {
        let store = SqliteStore::in_memory().await.unwrap();
        let migrations = vec![(
            "notes".to_string(),
            Migration {
                id: "001_init",
                up: "CREATE TABLE notes (id INTEGER PRIMARY KEY); CREATE INDEX notes_id ON notes (id);",
            },
        )];

        assert_eq!(store.apply_migrations(&migrations).await.unwrap(), 1);
        assert_eq!(store.apply_migrations(&migrations).await.unwrap(), 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    const CATALOG_SCHEMA: &str = r#"
        CREATE TABLE authors (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE books (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            title      TEXT NOT NULL,
            year       INTEGER NOT NULL,
            author_id  INTEGER NOT NULL REFERENCES authors (id) ON DELETE RESTRICT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE awards (
            id        INTEGER PRIMARY KEY,
            author_id INTEGER NOT NULL REFERENCES authors (id) ON DELETE RESTRICT
        );
    "#;

    async fn catalog_store() -> SqliteStore {
        let store = SqliteStore::in_memory().await.unwrap();
        let migrations = vec![(
            "catalog".to_string(),
            Migration {
                id: "001_init",
                up: CATALOG_SCHEMA,
            },
        )];
        store.apply_migrations(&migrations).await.unwrap();
        store
    }

    #[tokio::test]
    async fn restrict_violation_on_delete_is_has_dependents() {
        let store = catalog_store().await;
        let author = store.create_author("Ada").await.unwrap();

        // A referencing row the book check does not see.
        sqlx::query("INSERT INTO awards (id, author_id) VALUES (1, ?1)")
            .bind(author.id)
            .execute(store.pool())
            .await
            .unwrap();

        match store.delete_author(author.id).await {
            Err(StoreError::HasDependents { entity, dependents }) => {
                assert_eq!(entity, format!("author {}", author.id));
                assert!(dependents.is_empty());
            }
            other => panic!("expected HasDependents, got {other:?}"),
        }
        assert_eq!(store.get_author(author.id).await.unwrap().author.name, "Ada");
    }

    #[tokio::test]
    async fn delete_with_books_lists_them() {
        let store = catalog_store().await;
        let author = store.create_author("Ada").await.unwrap();
        let book = store
            .create_book(NewBook {
                title: "Notes".into(),
                author_id: author.id,
                year: 1843,
            })
            .await
            .unwrap();

        match store.delete_author(author.id).await {
            Err(StoreError::HasDependents { dependents, .. }) => {
                assert_eq!(dependents, vec![book.book.id]);
            }
            other => panic!("expected HasDependents, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_author_on_create_is_invalid_reference() {
        let store = catalog_store().await;
        let err = store
            .create_book(NewBook {
                title: "Orphan".into(),
                author_id: 42,
                year: 2001,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)), "{err:?}");
        assert!(store.list_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_folds_case_like_memory_store() {
        let store = catalog_store().await;
        store.create_author("Émile Zola").await.unwrap();

        for (query, hits) in [("Émile", 1), ("ÉMILE ZOLA", 1), ("zola", 1), ("émile", 0)] {
            let filter = SearchFilter {
                text: crate::model::fold_case(query),
                year: None,
            };
            let authors = store.search_authors(&filter).await.unwrap();
            assert_eq!(authors.len(), hits, "{query}");
            let expected = filter.matches_text("Émile Zola");
            assert_eq!(hits == 1, expected, "{query}");
        }
    }

    #[tokio::test]
    async fn health_check_succeeds_on_open_pool() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.health_check().await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");
    }
}
