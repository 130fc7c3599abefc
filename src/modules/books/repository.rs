//! SQL access to the `books` table.

use goweli_kernel::Migration;
use sqlx::SqlitePool;

use super::models::{Book, BookDraft};

const SELECT_BOOK: &str = r#"
    SELECT id, book_title, author_name, isbn, synopsis, is_checked, cover_url
    FROM books
"#;

/// Schema contributed by the books module
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_create_books",
        up: r#"
            CREATE TABLE IF NOT EXISTS books (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                book_title  TEXT    NOT NULL CHECK (length(trim(book_title)) > 0),
                author_name TEXT    NOT NULL CHECK (length(trim(author_name)) > 0),
                isbn        TEXT,
                synopsis    TEXT,
                is_checked  INTEGER NOT NULL DEFAULT 0,
                cover_url   TEXT
            );
            CREATE INDEX IF NOT EXISTS books_title  ON books(book_title);
            CREATE INDEX IF NOT EXISTS books_author ON books(author_name);
            CREATE INDEX IF NOT EXISTS books_isbn   ON books(isbn);
        "#,
    }]
}

/// Thin CRUD wrapper over the pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> sqlx::Result<Vec<Book>> {
        sqlx::query_as::<_, Book>(&format!("{SELECT_BOOK} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get(&self, id: i64) -> sqlx::Result<Option<Book>> {
        sqlx::query_as::<_, Book>(&format!("{SELECT_BOOK} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn count(&self) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await
    }

    pub async fn insert(&self, draft: &BookDraft) -> sqlx::Result<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (book_title, author_name, isbn, synopsis, is_checked, cover_url)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, book_title, author_name, isbn, synopsis, is_checked, cover_url
            "#,
        )
        .bind(&draft.book_title)
        .bind(&draft.author_name)
        .bind(&draft.isbn)
        .bind(&draft.synopsis)
        .bind(draft.is_checked)
        .bind(&draft.cover_url)
        .fetch_one(&self.pool)
        .await
    }

    /// Replace every field of a row in place. `None` when the row is gone.
    pub async fn update(&self, id: i64, draft: &BookDraft) -> sqlx::Result<Option<Book>> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET book_title = ?, author_name = ?, isbn = ?, synopsis = ?, is_checked = ?, cover_url = ?
            WHERE id = ?
            RETURNING id, book_title, author_name, isbn, synopsis, is_checked, cover_url
            "#,
        )
        .bind(&draft.book_title)
        .bind(&draft.author_name)
        .bind(&draft.isbn)
        .bind(&draft.synopsis)
        .bind(draft.is_checked)
        .bind(&draft.cover_url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Returns true if the row existed
    pub async fn delete(&self, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert every draft whose title and author are not stored yet, in one
    /// transaction. Returns how many rows were added.
    pub async fn insert_missing(&self, drafts: &[BookDraft]) -> sqlx::Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for draft in drafts {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM books WHERE book_title = ? AND author_name = ?)",
            )
            .bind(&draft.book_title)
            .bind(&draft.author_name)
            .fetch_one(&mut *tx)
            .await?;
            if exists {
                tracing::debug!(title = %draft.book_title, "skipping existing book");
                continue;
            }

            sqlx::query(
                r#"
                INSERT INTO books (book_title, author_name, isbn, synopsis, is_checked, cover_url)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&draft.book_title)
            .bind(&draft.author_name)
            .bind(&draft.isbn)
            .bind(&draft.synopsis)
            .bind(draft.is_checked)
            .bind(&draft.cover_url)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }
}
