use serde::Serialize;

/// One row of the book/author association, joined with the author.
#[derive(Debug, sqlx::FromRow)]
pub struct BookAuthorRow {
    pub book_id: String,
    pub author_id: String,
    pub name: String,
    pub last_first: String,
}

/// An author as shown on a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    pub id: String,
    pub name: String,
    pub last_first: String,
}

impl From<BookAuthorRow> for AuthorRef {
    fn from(row: BookAuthorRow) -> Self {
        Self {
            id: row.author_id,
            name: row.name,
            last_first: row.last_first,
        }
    }
}
