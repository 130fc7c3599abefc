use serde::{Deserialize, Serialize};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_AUTHOR_LEN: usize = 100;
pub const MAX_ISBN_LEN: usize = 20;
pub const MAX_SYNOPSIS_LEN: usize = 2000;
pub const MAX_COVER_URL_LEN: usize = 500;

/// A tracked book as stored in the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Database-generated identifier
    #[serde(alias = "Id")]
    pub id: i64,
    #[serde(alias = "BookTitle")]
    pub book_title: String,
    #[serde(alias = "AuthorName")]
    pub author_name: String,
    #[serde(default, alias = "ISBN")]
    pub isbn: Option<String>,
    #[serde(default, alias = "Synopsis")]
    pub synopsis: Option<String>,
    /// Read flag
    #[serde(default, alias = "IsChecked")]
    pub is_checked: bool,
    #[serde(default, alias = "CoverUrl")]
    pub cover_url: Option<String>,
}

impl Book {
    /// Editable copy of this book's fields
    pub fn to_draft(&self) -> BookDraft {
        BookDraft {
            book_title: self.book_title.clone(),
            author_name: self.author_name.clone(),
            isbn: self.isbn.clone(),
            synopsis: self.synopsis.clone(),
            is_checked: self.is_checked,
            cover_url: self.cover_url.clone(),
        }
    }
}

/// Book fields without an identity: the add form, PUT bodies and import records.
///
/// Missing title or author deserialize as empty strings so that validation,
/// not the JSON parser, reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    #[serde(default, alias = "BookTitle")]
    pub book_title: String,
    #[serde(default, alias = "AuthorName")]
    pub author_name: String,
    #[serde(default, alias = "ISBN")]
    pub isbn: Option<String>,
    #[serde(default, alias = "Synopsis")]
    pub synopsis: Option<String>,
    #[serde(default, alias = "IsChecked")]
    pub is_checked: bool,
    #[serde(default, alias = "CoverUrl")]
    pub cover_url: Option<String>,
}

/// Request body for `PUT /api/books/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBook {
    #[serde(default, alias = "Id")]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub fields: BookDraft,
}

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub error: String,
}

impl FieldError {
    fn new(field: &'static str, error: impl Into<String>) -> Self {
        Self {
            field,
            error: error.into(),
        }
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_len(errors: &mut Vec<FieldError>, field: &'static str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.push(FieldError::new(field, format!("must be at most {max} characters")));
        }
    }
}

impl BookDraft {
    pub fn new(book_title: impl Into<String>, author_name: impl Into<String>) -> Self {
        Self {
            book_title: book_title.into(),
            author_name: author_name.into(),
            ..Self::default()
        }
    }

    /// Trim text fields and turn blank optional fields into `None`
    pub fn normalized(self) -> Self {
        Self {
            book_title: self.book_title.trim().to_string(),
            author_name: self.author_name.trim().to_string(),
            isbn: clean_optional(self.isbn),
            synopsis: clean_optional(self.synopsis),
            is_checked: self.is_checked,
            cover_url: clean_optional(self.cover_url),
        }
    }

    /// Required fields present, every field within its column size
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.book_title.trim().is_empty() {
            errors.push(FieldError::new("bookTitle", "required"));
        }
        if self.author_name.trim().is_empty() {
            errors.push(FieldError::new("authorName", "required"));
        }

        check_len(&mut errors, "bookTitle", Some(&self.book_title), MAX_TITLE_LEN);
        check_len(&mut errors, "authorName", Some(&self.author_name), MAX_AUTHOR_LEN);
        check_len(&mut errors, "isbn", self.isbn.as_deref(), MAX_ISBN_LEN);
        check_len(&mut errors, "synopsis", self.synopsis.as_deref(), MAX_SYNOPSIS_LEN);
        check_len(&mut errors, "coverUrl", self.cover_url.as_deref(), MAX_COVER_URL_LEN);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Field changes for an edit. `None` leaves a field alone; an empty string
/// clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub book_title: Option<String>,
    pub author_name: Option<String>,
    pub isbn: Option<String>,
    pub synopsis: Option<String>,
    pub is_checked: Option<bool>,
    pub cover_url: Option<String>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, draft: &mut BookDraft) {
        if let Some(title) = self.book_title {
            draft.book_title = title;
        }
        if let Some(author) = self.author_name {
            draft.author_name = author;
        }
        if let Some(isbn) = self.isbn {
            draft.isbn = Some(isbn);
        }
        if let Some(synopsis) = self.synopsis {
            draft.synopsis = Some(synopsis);
        }
        if let Some(is_checked) = self.is_checked {
            draft.is_checked = is_checked;
        }
        if let Some(cover_url) = self.cover_url {
            draft.cover_url = Some(cover_url);
        }
    }
}

/// Which column a library search matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    #[default]
    Title,
    Author,
    Isbn,
}

impl SearchField {
    /// Case-insensitive substring match; `needle` must already be lowercase
    pub fn matches(self, book: &Book, needle: &str) -> bool {
        let haystack = match self {
            SearchField::Title => Some(book.book_title.as_str()),
            SearchField::Author => Some(book.author_name.as_str()),
            SearchField::Isbn => book.isbn.as_deref(),
        };
        haystack.is_some_and(|value| value.to_lowercase().contains(needle))
    }
}

impl std::str::FromStr for SearchField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "title" => Ok(SearchField::Title),
            "author" => Ok(SearchField::Author),
            "isbn" => Ok(SearchField::Isbn),
            other => Err(format!("unknown search field '{other}'; expected title/author/isbn")),
        }
    }
}
