//! Library operations shared by the CLI and the HTTP handlers.
//!
//! The database is the source of truth: callers holding a list of books
//! refresh it from [`Library::list`] after a successful write rather than
//! patching their copy.

use std::sync::Arc;

use goweli_catalog::{
    CatalogError, CoverCandidate, CoverCatalog, CoverDecider, CoverScan, ScanOptions,
};
use thiserror::Error;

use super::models::{Book, BookDraft, BookPatch, FieldError, SearchField};
use super::repository::BookRepository;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{}", describe_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("book with ID {0} not found")]
    NotFound(i64),

    #[error("please enter search text")]
    EmptyQuery,

    #[error("nothing to change")]
    EmptyPatch,

    #[error("invalid import data: {0}")]
    InvalidImport(String),

    #[error("failed to serialize books: {0}")]
    Export(#[source] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One-line summary of validation failures
pub fn describe_fields(errors: &[FieldError]) -> String {
    let required: Vec<&str> = errors
        .iter()
        .filter(|e| e.error == "required")
        .map(|e| e.field)
        .collect();
    if required.contains(&"bookTitle") || required.contains(&"authorName") {
        return "Author and Title are required.".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.error))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type LibraryResult<T> = Result<T, LibraryError>;

#[derive(Clone)]
pub struct Library {
    repo: BookRepository,
    catalog: Option<Arc<dyn CoverCatalog>>,
    scan: ScanOptions,
}

impl Library {
    pub fn new(repo: BookRepository, catalog: Arc<dyn CoverCatalog>, scan: ScanOptions) -> Self {
        Self {
            repo,
            catalog: Some(catalog),
            scan,
        }
    }

    /// A library that never looks up covers
    pub fn without_catalog(repo: BookRepository) -> Self {
        Self {
            repo,
            catalog: None,
            scan: ScanOptions::default(),
        }
    }

    pub fn repository(&self) -> &BookRepository {
        &self.repo
    }

    pub async fn list(&self) -> LibraryResult<Vec<Book>> {
        Ok(self.repo.list().await?)
    }

    pub async fn get(&self, id: i64) -> LibraryResult<Book> {
        self.repo.get(id).await?.ok_or(LibraryError::NotFound(id))
    }

    /// Validate, resolve a cover when none was given, then store.
    ///
    /// Nothing is written when validation fails. Cover lookup problems are
    /// logged and the book is stored without a cover.
    pub async fn add(&self, draft: BookDraft, decider: &mut dyn CoverDecider) -> LibraryResult<Book> {
        let mut draft = draft.normalized();
        draft.validate().map_err(LibraryError::Validation)?;

        if draft.cover_url.is_none() {
            draft.cover_url = self.resolve_cover(&draft.book_title, decider).await;
        }

        let book = self.repo.insert(&draft).await?;
        tracing::info!(book_id = book.id, title = %book.book_title, "book added");
        Ok(book)
    }

    /// Cover candidates for a title; empty when no catalog is configured
    pub async fn cover_candidates(&self, title: &str) -> LibraryResult<Vec<CoverCandidate>> {
        match self.catalog.as_deref() {
            Some(catalog) => Ok(catalog.cover_candidates(title).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Cover URL chosen by `decider` among the catalog's candidates for `title`
    pub async fn resolve_cover(&self, title: &str, decider: &mut dyn CoverDecider) -> Option<String> {
        let catalog = self.catalog.as_deref()?;

        let candidates = match self.cover_candidates(title).await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!(%title, error = %err, "cover search failed; continuing without a cover");
                return None;
            }
        };

        if candidates.is_empty() {
            tracing::info!(%title, "no cover candidates found");
            return None;
        }

        CoverScan::new(catalog, candidates, self.scan)
            .resolve(decider)
            .await
    }

    /// Apply `patch` to a copy of the stored book and replace the row
    pub async fn edit(&self, id: i64, patch: BookPatch) -> LibraryResult<Book> {
        if patch.is_empty() {
            return Err(LibraryError::EmptyPatch);
        }

        let current = self.get(id).await?;
        let mut draft = current.to_draft();
        patch.apply(&mut draft);
        let draft = draft.normalized();
        draft.validate().map_err(LibraryError::Validation)?;

        let book = self
            .repo
            .update(id, &draft)
            .await?
            .ok_or(LibraryError::NotFound(id))?;
        tracing::info!(book_id = id, "book updated");
        Ok(book)
    }

    /// Replace every field of a stored book
    pub async fn replace(&self, id: i64, draft: BookDraft) -> LibraryResult<Book> {
        let draft = draft.normalized();
        draft.validate().map_err(LibraryError::Validation)?;

        let book = self
            .repo
            .update(id, &draft)
            .await?
            .ok_or(LibraryError::NotFound(id))?;
        tracing::info!(book_id = id, "book replaced");
        Ok(book)
    }

    pub async fn toggle_read(&self, id: i64) -> LibraryResult<Book> {
        let current = self.get(id).await?;
        self.edit(
            id,
            BookPatch {
                is_checked: Some(!current.is_checked),
                ..BookPatch::default()
            },
        )
        .await
    }

    /// Delete one book, returning what was removed
    pub async fn delete(&self, id: i64) -> LibraryResult<Book> {
        let book = self.get(id).await?;
        if !self.repo.delete(id).await? {
            return Err(LibraryError::NotFound(id));
        }
        tracing::info!(book_id = id, title = %book.book_title, "book deleted");
        Ok(book)
    }

    /// Case-insensitive substring search over one column
    pub async fn search(&self, field: SearchField, text: &str) -> LibraryResult<Vec<Book>> {
        if text.trim().is_empty() {
            return Err(LibraryError::EmptyQuery);
        }
        let needle = text.to_lowercase();

        let books = self.repo.list().await?;
        let results: Vec<Book> = books
            .into_iter()
            .filter(|book| field.matches(book, &needle))
            .collect();
        tracing::debug!(?field, %needle, found = results.len(), "library search");
        Ok(results)
    }

    /// Every book as indented JSON
    pub async fn export_json(&self) -> LibraryResult<String> {
        let books = self.repo.list().await?;
        serde_json::to_string_pretty(&books).map_err(LibraryError::Export)
    }

    /// Import books from JSON, skipping any whose title and author are
    /// already present. Ids in the input are ignored. Returns how many were added.
    ///
    /// The import runs in one transaction.
    pub async fn import_json(&self, json: &str) -> LibraryResult<usize> {
        if json.trim().is_empty() {
            return Err(LibraryError::InvalidImport("no JSON data given".to_string()));
        }

        let drafts: Vec<BookDraft> =
            serde_json::from_str(json).map_err(|err| LibraryError::InvalidImport(err.to_string()))?;
        if drafts.is_empty() {
            return Err(LibraryError::InvalidImport(
                "no valid book data found in the import text".to_string(),
            ));
        }

        let valid: Vec<BookDraft> = drafts
            .into_iter()
            .map(BookDraft::normalized)
            .filter(|draft| match draft.validate() {
                Ok(()) => true,
                Err(errors) => {
                    tracing::warn!(title = %draft.book_title, errors = %describe_fields(&errors), "skipping invalid import record");
                    false
                }
            })
            .collect();

        // All or nothing: a database failure rolls back every record of this import
        let imported = self.repo.insert_missing(&valid).await?;

        tracing::info!(imported, "import finished");
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use goweli_catalog::{AcceptFirst, CoverDecision, CoverFetcher, CoverKind, CoverPreview};
    use std::time::Duration;

    struct FakeCatalog {
        /// (url, image size) per candidate
        covers: Vec<(&'static str, usize)>,
        fail_search: bool,
    }

    #[async_trait]
    impl CoverFetcher for FakeCatalog {
        async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
            let size = self
                .covers
                .iter()
                .find(|(candidate, _)| *candidate == url)
                .map(|(_, size)| *size)
                .unwrap_or_default();
            Ok(vec![1; size])
        }
    }

    #[async_trait]
    impl CoverCatalog for FakeCatalog {
        async fn cover_candidates(&self, _title: &str) -> Result<Vec<CoverCandidate>, CatalogError> {
            if self.fail_search {
                return Err(CatalogError::Status {
                    status: 503,
                    url: "search".to_string(),
                });
            }
            Ok(self
                .covers
                .iter()
                .map(|(url, _)| CoverCandidate {
                    kind: CoverKind::Id,
                    key: url.to_string(),
                    url: url.to_string(),
                })
                .collect())
        }
    }

    struct Counting {
        asked: usize,
    }

    #[async_trait]
    impl CoverDecider for Counting {
        async fn decide(&mut self, _preview: &CoverPreview) -> CoverDecision {
            self.asked += 1;
            CoverDecision::Accept
        }
    }

    async fn repository() -> BookRepository {
        let pool = goweli_db::connect_in_memory().await.unwrap();
        let migrations: Vec<_> = crate::modules::books::repository::migrations()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        goweli_db::migrate(&pool, &migrations).await.unwrap();
        BookRepository::new(pool)
    }

    fn scan_options() -> ScanOptions {
        ScanOptions {
            min_cover_bytes: 1000,
            retry_delay: Duration::ZERO,
        }
    }

    async fn library_with(covers: Vec<(&'static str, usize)>, fail_search: bool) -> Library {
        Library::new(
            repository().await,
            Arc::new(FakeCatalog {
                covers,
                fail_search,
            }),
            scan_options(),
        )
    }

    async fn seeded() -> Library {
        let library = Library::without_catalog(repository().await);
        for (title, author, isbn) in [
            ("Dune", "Frank Herbert", Some("978-0441013593")),
            ("Dune Messiah", "Frank Herbert", None),
            ("Emma", "Jane Austen", Some("978-0141439587")),
            ("The Left Hand of Darkness", "Ursula K. Le Guin", Some("978-0441478125")),
        ] {
            let mut draft = BookDraft::new(title, author);
            draft.isbn = isbn.map(str::to_string);
            library.add(draft, &mut AcceptFirst).await.unwrap();
        }
        library
    }

    #[tokio::test]
    async fn add_without_title_or_author_writes_nothing() {
        let library = seeded().await;

        let err = library
            .add(BookDraft::new("", "Someone"), &mut AcceptFirst)
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Validation(_)));
        assert_eq!(err.to_string(), "Author and Title are required.");

        let err = library
            .add(BookDraft::new("Something", "   "), &mut AcceptFirst)
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Validation(_)));

        assert_eq!(library.repository().count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn add_settles_on_first_real_cover() {
        let library = library_with(vec![("tiny-1", 12), ("tiny-2", 800), ("real", 4096)], false).await;
        let mut decider = Counting { asked: 0 };

        let book = library
            .add(BookDraft::new("Dune", "Frank Herbert"), &mut decider)
            .await
            .unwrap();

        assert_eq!(book.cover_url.as_deref(), Some("real"));
        assert_eq!(decider.asked, 1);
    }

    #[tokio::test]
    async fn cover_search_failure_still_stores_book() {
        let library = library_with(vec![("real", 4096)], true).await;
        let book = library
            .add(BookDraft::new("Dune", "Frank Herbert"), &mut AcceptFirst)
            .await
            .unwrap();
        assert_eq!(book.cover_url, None);
        assert_eq!(library.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cover_candidates_surface_catalog_errors() {
        let library = library_with(vec![("real", 4096)], true).await;
        assert!(matches!(
            library.cover_candidates("Dune").await,
            Err(LibraryError::Catalog(_))
        ));
        let offline = Library::without_catalog(repository().await);
        assert!(offline.cover_candidates("Dune").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn given_cover_url_skips_lookup() {
        let library = library_with(vec![("real", 4096)], false).await;
        let mut decider = Counting { asked: 0 };
        let mut draft = BookDraft::new("Dune", "Frank Herbert");
        draft.cover_url = Some("https://example.com/dune.jpg".to_string());

        let book = library.add(draft, &mut decider).await.unwrap();
        assert_eq!(book.cover_url.as_deref(), Some("https://example.com/dune.jpg"));
        assert_eq!(decider.asked, 0);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_row() {
        let library = seeded().await;
        let before = library.list().await.unwrap();
        let target = before[1].clone();

        let removed = library.delete(target.id).await.unwrap();
        assert_eq!(removed, target);

        let after = library.list().await.unwrap();
        let expected: Vec<Book> = before.into_iter().filter(|b| b.id != target.id).collect();
        assert_eq!(after, expected);

        assert!(matches!(
            library.delete(target.id).await,
            Err(LibraryError::NotFound(id)) if id == target.id
        ));
    }

    #[tokio::test]
    async fn edit_persists_changed_fields_only() {
        let library = seeded().await;
        let original = library.list().await.unwrap()[0].clone();

        let edited = library
            .edit(
                original.id,
                BookPatch {
                    synopsis: Some("Spice and sandworms".to_string()),
                    is_checked: Some(true),
                    ..BookPatch::default()
                },
            )
            .await
            .unwrap();

        let stored = library.get(original.id).await.unwrap();
        assert_eq!(stored, edited);
        assert_eq!(stored.synopsis.as_deref(), Some("Spice and sandworms"));
        assert!(stored.is_checked);
        assert_eq!(stored.book_title, original.book_title);
        assert_eq!(stored.author_name, original.author_name);
        assert_eq!(stored.isbn, original.isbn);
        assert_eq!(stored.cover_url, original.cover_url);
    }

    #[tokio::test]
    async fn edit_clearing_title_is_rejected() {
        let library = seeded().await;
        let original = library.list().await.unwrap()[0].clone();

        let err = library
            .edit(
                original.id,
                BookPatch {
                    book_title: Some(String::new()),
                    ..BookPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Validation(_)));
        assert_eq!(library.get(original.id).await.unwrap(), original);
    }

    #[tokio::test]
    async fn edit_with_empty_string_clears_optional_field() {
        let library = seeded().await;
        let original = library.list().await.unwrap()[0].clone();
        assert!(original.isbn.is_some());

        let edited = library
            .edit(
                original.id,
                BookPatch {
                    isbn: Some(String::new()),
                    ..BookPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.isbn, None);
    }

    #[tokio::test]
    async fn toggle_read_flips_flag() {
        let library = seeded().await;
        let id = library.list().await.unwrap()[2].id;

        assert!(library.toggle_read(id).await.unwrap().is_checked);
        assert!(!library.toggle_read(id).await.unwrap().is_checked);
    }

    #[tokio::test]
    async fn search_returns_exact_matching_subset() {
        let library = seeded().await;

        let titles = |books: Vec<Book>| books.into_iter().map(|b| b.book_title).collect::<Vec<_>>();

        assert_eq!(
            titles(library.search(SearchField::Title, "DUNE").await.unwrap()),
            vec!["Dune", "Dune Messiah"]
        );
        assert_eq!(
            titles(library.search(SearchField::Author, "le guin").await.unwrap()),
            vec!["The Left Hand of Darkness"]
        );
        assert_eq!(
            titles(library.search(SearchField::Isbn, "978-0441").await.unwrap()),
            vec!["Dune", "The Left Hand of Darkness"]
        );
        assert!(library
            .search(SearchField::Title, "zzz")
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            library.search(SearchField::Title, "  ").await,
            Err(LibraryError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn search_keeps_surrounding_spaces_in_the_needle() {
        let library = seeded().await;

        let titles = |books: Vec<Book>| books.into_iter().map(|b| b.book_title).collect::<Vec<_>>();

        assert_eq!(
            titles(library.search(SearchField::Title, "Dune ").await.unwrap()),
            vec!["Dune Messiah"]
        );
        assert_eq!(
            titles(library.search(SearchField::Title, " of ").await.unwrap()),
            vec!["The Left Hand of Darkness"]
        );
        assert!(library
            .search(SearchField::Author, " Herbert ")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn export_then_import_skips_existing_books() {
        let library = seeded().await;
        let exported = library.export_json().await.unwrap();

        assert_eq!(library.import_json(&exported).await.unwrap(), 0);

        let fresh = Library::without_catalog(repository().await);
        assert_eq!(fresh.import_json(&exported).await.unwrap(), 4);
        assert_eq!(fresh.import_json(&exported).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn import_accepts_pascal_case_and_dedupes_within_batch() {
        let library = Library::without_catalog(repository().await);
        let json = r#"[
            {"Id": 9, "BookTitle": "Emma", "AuthorName": "Jane Austen", "IsChecked": true},
            {"Id": 10, "BookTitle": "Emma", "AuthorName": "Jane Austen"},
            {"Id": 11, "BookTitle": "", "AuthorName": "Nobody"}
        ]"#;

        assert_eq!(library.import_json(json).await.unwrap(), 1);
        let books = library.list().await.unwrap();
        assert_eq!(books.len(), 1);
        assert!(books[0].is_checked);
    }

    #[tokio::test]
    async fn failed_import_leaves_table_unchanged() {
        let pool = goweli_db::connect_in_memory().await.unwrap();
        let migrations: Vec<_> = crate::modules::books::repository::migrations()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        goweli_db::migrate(&pool, &migrations).await.unwrap();
        sqlx::raw_sql(
            r#"
            CREATE TRIGGER refuse_cursed BEFORE INSERT ON books
            WHEN NEW.book_title = 'Cursed'
            BEGIN SELECT RAISE(ABORT, 'cursed book'); END;
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let library = Library::without_catalog(BookRepository::new(pool));
        library
            .add(BookDraft::new("Emma", "Jane Austen"), &mut AcceptFirst)
            .await
            .unwrap();

        let json = r#"[
            {"bookTitle": "Dune", "authorName": "Frank Herbert"},
            {"bookTitle": "Kindred", "authorName": "Octavia E. Butler"},
            {"bookTitle": "Cursed", "authorName": "Nobody"}
        ]"#;
        assert!(matches!(
            library.import_json(json).await,
            Err(LibraryError::Database(_))
        ));

        let titles: Vec<_> = library
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.book_title)
            .collect();
        assert_eq!(titles, vec!["Emma"]);
    }

    #[tokio::test]
    async fn import_rejects_garbage() {
        let library = Library::without_catalog(repository().await);
        assert!(matches!(
            library.import_json("not json").await,
            Err(LibraryError::InvalidImport(_))
        ));
        assert!(matches!(
            library.import_json("[]").await,
            Err(LibraryError::InvalidImport(_))
        ));
    }
}
