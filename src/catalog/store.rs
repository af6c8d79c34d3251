//! SQLite-backed catalog of novels, genres, alternate names, and chapters.
//!
//! Uniqueness lives in the schema: novel name, normalized genre name, and
//! (novel, order_number) are UNIQUE, so concurrent writers fall back to
//! constraint errors rather than silent duplicates. Deleting a novel
//! cascades to its names, genre associations, and chapters; that cascade is
//! part of the store contract, not an ORM side effect.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::model::{NovelStatus, NovelSubmission, ScrapedChapter};

pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open (or create) a catalog database file.
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory catalog, used by tests and dry runs.
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS novels (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                author      TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                rating      REAL,
                status      TEXT NOT NULL DEFAULT 'ongoing',
                source_url  TEXT,
                cover_path  TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS novel_names (
                id       INTEGER PRIMARY KEY,
                novel_id INTEGER NOT NULL REFERENCES novels(id) ON DELETE CASCADE,
                name     TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_novel_names_novel ON novel_names(novel_id);

            CREATE TABLE IF NOT EXISTS genres (
                id   INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS novel_genres (
                novel_id INTEGER NOT NULL REFERENCES novels(id) ON DELETE CASCADE,
                genre_id INTEGER NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
                UNIQUE(novel_id, genre_id)
            );

            CREATE TABLE IF NOT EXISTS chapters (
                id           INTEGER PRIMARY KEY,
                novel_id     INTEGER NOT NULL REFERENCES novels(id) ON DELETE CASCADE,
                title        TEXT NOT NULL,
                content      TEXT NOT NULL,
                order_number INTEGER NOT NULL,
                source_url   TEXT,
                created_at   TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(novel_id, order_number)
            );
            CREATE INDEX IF NOT EXISTS idx_chapters_novel ON chapters(novel_id);
            ",
        )?;
        Ok(Self { conn })
    }

    /// Start a transaction on this connection. Statements issued through the
    /// catalog participate until commit.
    pub fn begin(&self) -> rusqlite::Result<Transaction<'_>> {
        self.conn.unchecked_transaction()
    }

    // ── Novels ──

    pub fn find_novel_by_name(&self, name: &str) -> rusqlite::Result<Option<i64>> {
        self.conn
            .query_row("SELECT id FROM novels WHERE name = ?1", params![name], |row| row.get(0))
            .optional()
    }

    /// Insert the core novel record. The cover is deferred; see
    /// [Catalog::set_cover_path].
    pub fn insert_novel(&self, novel: &NovelSubmission) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO novels (name, author, description, rating, status, source_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                novel.name,
                novel.author,
                novel.description,
                novel.rating,
                novel.status.as_str(),
                novel.source_url,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_cover_path(&self, novel_id: i64, cover_path: &str) -> rusqlite::Result<()> {
        self.conn.execute(
            "UPDATE novels SET cover_path = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![cover_path, novel_id],
        )?;
        Ok(())
    }

    pub fn novel_cover_path(&self, novel_id: i64) -> rusqlite::Result<Option<String>> {
        self.conn.query_row(
            "SELECT cover_path FROM novels WHERE id = ?1",
            params![novel_id],
            |row| row.get(0),
        )
    }

    pub fn novel_status(&self, novel_id: i64) -> rusqlite::Result<Option<NovelStatus>> {
        let status: String = self.conn.query_row(
            "SELECT status FROM novels WHERE id = ?1",
            params![novel_id],
            |row| row.get(0),
        )?;
        Ok(NovelStatus::parse(&status))
    }

    pub fn novel_count(&self) -> rusqlite::Result<u32> {
        self.conn.query_row("SELECT COUNT(*) FROM novels", [], |row| row.get(0))
    }

    /// Delete a novel. Alternate names, genre associations, and chapters go
    /// with it (schema-level cascade). Returns false when the id was absent.
    pub fn delete_novel(&self, novel_id: i64) -> rusqlite::Result<bool> {
        let affected =
            self.conn.execute("DELETE FROM novels WHERE id = ?1", params![novel_id])?;
        Ok(affected > 0)
    }

    // ── Alternate names ──

    pub fn insert_novel_name(&self, novel_id: i64, name: &str) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO novel_names (novel_id, name) VALUES (?1, ?2)",
            params![novel_id, name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn novel_name_count(&self, novel_id: i64) -> rusqlite::Result<u32> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM novel_names WHERE novel_id = ?1",
            params![novel_id],
            |row| row.get(0),
        )
    }

    // ── Genres ──

    pub fn find_genre_by_name(&self, name: &str) -> rusqlite::Result<Option<i64>> {
        self.conn
            .query_row("SELECT id FROM genres WHERE name = ?1", params![name], |row| row.get(0))
            .optional()
    }

    pub fn insert_genre(&self, name: &str) -> rusqlite::Result<i64> {
        self.conn.execute("INSERT INTO genres (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn genre_count(&self) -> rusqlite::Result<u32> {
        self.conn.query_row("SELECT COUNT(*) FROM genres", [], |row| row.get(0))
    }

    pub fn association_exists(&self, novel_id: i64, genre_id: i64) -> rusqlite::Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM novel_genres WHERE novel_id = ?1 AND genre_id = ?2",
                params![novel_id, genre_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn insert_association(&self, novel_id: i64, genre_id: i64) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO novel_genres (novel_id, genre_id) VALUES (?1, ?2)",
            params![novel_id, genre_id],
        )?;
        Ok(())
    }

    pub fn association_count(&self, novel_id: i64) -> rusqlite::Result<u32> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM novel_genres WHERE novel_id = ?1",
            params![novel_id],
            |row| row.get(0),
        )
    }

    // ── Chapters ──

    pub fn find_chapter(&self, novel_id: i64, order_number: u32) -> rusqlite::Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM chapters WHERE novel_id = ?1 AND order_number = ?2",
                params![novel_id, order_number],
                |row| row.get(0),
            )
            .optional()
    }

    pub fn insert_chapter(
        &self,
        novel_id: i64,
        chapter: &ScrapedChapter,
    ) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO chapters (novel_id, title, content, order_number, source_url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                novel_id,
                chapter.title,
                chapter.content,
                chapter.order_number,
                chapter.source_url,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_chapter(
        &self,
        chapter_id: i64,
        chapter: &ScrapedChapter,
    ) -> rusqlite::Result<()> {
        self.conn.execute(
            "UPDATE chapters SET title = ?1, content = ?2, source_url = ?3 WHERE id = ?4",
            params![chapter.title, chapter.content, chapter.source_url, chapter_id],
        )?;
        Ok(())
    }

    pub fn chapter_count(&self, novel_id: i64) -> rusqlite::Result<u32> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM chapters WHERE novel_id = ?1",
            params![novel_id],
            |row| row.get(0),
        )
    }

    pub fn chapter_content(
        &self,
        novel_id: i64,
        order_number: u32,
    ) -> rusqlite::Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT content FROM chapters WHERE novel_id = ?1 AND order_number = ?2",
                params![novel_id, order_number],
                |row| row.get(0),
            )
            .optional()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NovelStatus;

    fn submission(name: &str) -> NovelSubmission {
        NovelSubmission {
            name: name.to_string(),
            author: "Autor".to_string(),
            description: "desc".to_string(),
            rating: Some(8.0),
            status: NovelStatus::Completed,
            source_url: "https://novelasligera.com/novela/x/".to_string(),
            image_path: None,
            alternative_names: vec![],
            genres: vec![],
            chapters: vec![],
        }
    }

    fn chapter(n: u32, content: &str) -> ScrapedChapter {
        ScrapedChapter {
            title: format!("Capítulo {}", n),
            content: content.to_string(),
            order_number: n,
            source_url: None,
        }
    }

    #[test]
    fn novel_insert_and_lookup() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert_eq!(catalog.find_novel_by_name("Alguna").unwrap(), None);
        let id = catalog.insert_novel(&submission("Alguna")).unwrap();
        assert_eq!(catalog.find_novel_by_name("Alguna").unwrap(), Some(id));
        assert_eq!(catalog.novel_status(id).unwrap(), Some(NovelStatus::Completed));
    }

    #[test]
    fn novel_name_is_unique() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.insert_novel(&submission("Alguna")).unwrap();
        assert!(catalog.insert_novel(&submission("Alguna")).is_err());
    }

    #[test]
    fn genre_resolve_and_unique() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert_genre("drama").unwrap();
        assert_eq!(catalog.find_genre_by_name("drama").unwrap(), Some(id));
        assert!(catalog.insert_genre("drama").is_err());
    }

    #[test]
    fn association_is_unique_per_pair() {
        let catalog = Catalog::open_in_memory().unwrap();
        let novel_id = catalog.insert_novel(&submission("Alguna")).unwrap();
        let genre_id = catalog.insert_genre("drama").unwrap();
        assert!(!catalog.association_exists(novel_id, genre_id).unwrap());
        catalog.insert_association(novel_id, genre_id).unwrap();
        assert!(catalog.association_exists(novel_id, genre_id).unwrap());
        assert!(catalog.insert_association(novel_id, genre_id).is_err());
    }

    #[test]
    fn chapter_unique_per_novel_and_ordinal() {
        let catalog = Catalog::open_in_memory().unwrap();
        let novel_id = catalog.insert_novel(&submission("Alguna")).unwrap();
        catalog.insert_chapter(novel_id, &chapter(1, "uno")).unwrap();
        assert!(catalog.insert_chapter(novel_id, &chapter(1, "uno bis")).is_err());

        // The same ordinal under another novel is fine.
        let other_id = catalog.insert_novel(&submission("Otra")).unwrap();
        catalog.insert_chapter(other_id, &chapter(1, "uno")).unwrap();
    }

    #[test]
    fn chapter_update_in_place() {
        let catalog = Catalog::open_in_memory().unwrap();
        let novel_id = catalog.insert_novel(&submission("Alguna")).unwrap();
        catalog.insert_chapter(novel_id, &chapter(1, "viejo")).unwrap();
        let chapter_id = catalog.find_chapter(novel_id, 1).unwrap().unwrap();
        catalog.update_chapter(chapter_id, &chapter(1, "nuevo")).unwrap();
        assert_eq!(catalog.chapter_count(novel_id).unwrap(), 1);
        assert_eq!(catalog.chapter_content(novel_id, 1).unwrap().as_deref(), Some("nuevo"));
    }

    #[test]
    fn delete_novel_cascades_to_dependents() {
        let catalog = Catalog::open_in_memory().unwrap();
        let novel_id = catalog.insert_novel(&submission("Alguna")).unwrap();
        catalog.insert_novel_name(novel_id, "Some Novel").unwrap();
        let genre_id = catalog.insert_genre("drama").unwrap();
        catalog.insert_association(novel_id, genre_id).unwrap();
        catalog.insert_chapter(novel_id, &chapter(1, "uno")).unwrap();

        assert!(catalog.delete_novel(novel_id).unwrap());
        assert_eq!(catalog.novel_name_count(novel_id).unwrap(), 0);
        assert_eq!(catalog.association_count(novel_id).unwrap(), 0);
        assert_eq!(catalog.chapter_count(novel_id).unwrap(), 0);
        // The genre itself survives; only the association is dependent.
        assert_eq!(catalog.genre_count().unwrap(), 1);
        assert!(!catalog.delete_novel(novel_id).unwrap());
    }

    #[test]
    fn transaction_commits_batched_writes() {
        let catalog = Catalog::open_in_memory().unwrap();
        let novel_id = catalog.insert_novel(&submission("Alguna")).unwrap();
        let tx = catalog.begin().unwrap();
        for n in 1..=3 {
            catalog.insert_chapter(novel_id, &chapter(n, "contenido")).unwrap();
        }
        tx.commit().unwrap();
        assert_eq!(catalog.chapter_count(novel_id).unwrap(), 3);
    }
}
