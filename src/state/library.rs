use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::data::{unique_name, EntryMeta, Locator, MediaRecord, NewEntry, MIME_JPEG};
use super::edit::EditRecord;
use super::store::MediaStore;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};

/// Prefix of every locator issued by a `Library`
const LOCATOR_PREFIX: &str = "media://images/";

/// Image file extensions picked up by `scan`
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Result of a library scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportResult {
    pub imported_count: usize,
    pub skipped_count: usize,
}

/// The Library manages the SQLite catalog and the photo files under its root.
///
/// Every entry is a row in `images` pointing at a file below `root`.
/// Rows with `pending = 1` are staged writes and never show up in listings.
pub struct Library {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    root: PathBuf,
}

impl Library {
    /// Open (or create) the library described by `config`
    pub fn from_config(config: &Config) -> StoreResult<Self> {
        Self::open(&config.library_root, &config.database_path)
    }

    /// Open (or create) a library with photos under `root` and its catalog at `db_path`
    pub fn open(root: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let db_path = db_path.into();

        fs::create_dir_all(&root)?;
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        info!(db = %db_path.display(), root = %root.display(), "library opened");

        let library = Library {
            conn: Mutex::new(conn),
            db_path,
            root,
        };
        library.init_schema()?;

        Ok(library)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // One row per photo file; pending rows are staged writes
        conn.execute(
            "CREATE TABLE IF NOT EXISTS images (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                path            TEXT NOT NULL UNIQUE,
                filename        TEXT NOT NULL,
                relative_path   TEXT NOT NULL,
                mime_type       TEXT NOT NULL,
                imported_at     INTEGER NOT NULL,
                pending         INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        // Filter edits, stored as JSON
        conn.execute(
            "CREATE TABLE IF NOT EXISTS edits (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                image_id        INTEGER NOT NULL,
                settings_json   TEXT NOT NULL,
                FOREIGN KEY(image_id) REFERENCES images(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_images_imported_at
             ON images(imported_at DESC)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_edits_image_id
             ON edits(image_id)",
            [],
        )?;

        debug!("library schema initialized");
        Ok(())
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("library connection lock poisoned".to_string()))
    }

    /// Get the path to the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Directory holding the photo files
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Count of all entries, pending ones included
    pub fn image_count(&self) -> StoreResult<i64> {
        let count = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Whether an entry is still staged; `None` if it doesn't exist
    pub fn is_pending(&self, locator: &Locator) -> StoreResult<Option<bool>> {
        let id = parse_locator(locator)?;
        let pending = self
            .conn()?
            .query_row("SELECT pending FROM images WHERE id = ?1", [id], |row| {
                row.get::<_, bool>(0)
            })
            .optional()?;
        Ok(pending)
    }

    /// Edit history of one entry, oldest first
    pub fn edit_history(&self, locator: &Locator) -> StoreResult<Vec<EditRecord>> {
        let id = parse_locator(locator)?;
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT settings_json FROM edits WHERE image_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map([id], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for json in rows {
            match EditRecord::from_json(&json?) {
                Ok(record) => records.push(record),
                Err(e) => warn!(%locator, error = %e, "skipping unreadable edit record"),
            }
        }
        Ok(records)
    }

    /// Index image files already present under the root.
    ///
    /// Files that are catalogued already are counted as skipped.
    pub fn scan(&self) -> StoreResult<ImportResult> {
        let mut result = ImportResult::default();

        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !is_image_file(path) {
                continue;
            }

            let filename = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let relative_path = path
                .parent()
                .and_then(|p| p.strip_prefix(&self.root).ok())
                .map(to_relative_string)
                .unwrap_or_default();
            let added = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
                .unwrap_or_else(|| Utc::now().timestamp_millis());

            let insert = self.conn()?.execute(
                "INSERT INTO images (path, filename, relative_path, mime_type, imported_at, pending)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                rusqlite::params![
                    path.to_string_lossy(),
                    &filename,
                    &relative_path,
                    mime_for(path),
                    added,
                ],
            );

            match insert {
                Ok(_) => result.imported_count += 1,
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    result.skipped_count += 1;
                }
                Err(e) => warn!(file = %filename, error = %e, "failed to index file"),
            }
        }

        info!(
            imported = result.imported_count,
            skipped = result.skipped_count,
            "library scan complete"
        );
        Ok(result)
    }

    /// File path of an entry
    fn file_path(&self, locator: &Locator) -> StoreResult<PathBuf> {
        let id = parse_locator(locator)?;
        let path: Option<String> = self
            .conn()?
            .query_row("SELECT path FROM images WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        path.map(PathBuf::from)
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))
    }

    fn query_records(&self, sql: &str) -> StoreResult<Vec<MediaRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            Ok(MediaRecord {
                id: id.to_string(),
                locator: make_locator(id),
                display_name: row.get(1)?,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }
}

impl MediaStore for Library {
    fn list_photos(&self) -> StoreResult<Vec<MediaRecord>> {
        self.query_records(
            "SELECT id, filename FROM images
             WHERE pending = 0
             ORDER BY imported_at DESC, id DESC",
        )
    }

    fn record(&self, locator: &Locator) -> StoreResult<MediaRecord> {
        let id = parse_locator(locator)?;
        let name: Option<String> = self
            .conn()?
            .query_row("SELECT filename FROM images WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        let display_name = name.ok_or_else(|| StoreError::NotFound(locator.to_string()))?;
        Ok(MediaRecord {
            id: id.to_string(),
            locator: locator.clone(),
            display_name,
        })
    }

    fn open_read(&self, locator: &Locator) -> StoreResult<Box<dyn Read + Send>> {
        let path = self.file_path(locator)?;
        let file = File::open(&path).map_err(|e| map_io(e, locator))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn insert(&self, entry: &NewEntry) -> StoreResult<Locator> {
        let album = sanitize_relative(&entry.relative_path);
        let relative_path = to_relative_string(&album);
        let dir = self.root.join(&album);
        fs::create_dir_all(&dir)?;

        let requested = Path::new(&entry.display_name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "untitled.jpg".to_string());
        let (filename, path) = reserve_file(&dir, &requested)?;

        let inserted = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO images (path, filename, relative_path, mime_type, imported_at, pending)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    path.to_string_lossy(),
                    &filename,
                    &relative_path,
                    &entry.mime_type,
                    Utc::now().timestamp_millis(),
                    entry.pending,
                ],
            )
            .map(|_| conn.last_insert_rowid())
        };

        match inserted {
            Ok(id) => {
                let locator = make_locator(id);
                debug!(%locator, file = %filename, pending = entry.pending, "entry inserted");
                Ok(locator)
            }
            Err(e) => {
                let _ = fs::remove_file(&path);
                Err(e.into())
            }
        }
    }

    fn set_pending(&self, locator: &Locator, pending: bool) -> StoreResult<()> {
        let id = parse_locator(locator)?;
        let updated = self.conn()?.execute(
            "UPDATE images SET pending = ?1 WHERE id = ?2",
            rusqlite::params![pending, id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(locator.to_string()));
        }
        Ok(())
    }

    fn open_write(&self, locator: &Locator) -> StoreResult<Box<dyn Write + Send>> {
        // The file was reserved by insert; never recreate one that was deleted
        let path = self.file_path(locator)?;
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| map_io(e, locator))?;
        Ok(Box::new(file))
    }

    fn delete(&self, locator: &Locator) -> StoreResult<()> {
        let path = self.file_path(locator)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(map_io(e, locator)),
        }

        let id = parse_locator(locator)?;
        self.conn()?
            .execute("DELETE FROM images WHERE id = ?1", [id])?;
        debug!(%locator, "entry deleted");
        Ok(())
    }

    fn query_meta(&self, locator: &Locator) -> StoreResult<EntryMeta> {
        let id = parse_locator(locator)?;
        self.conn()?
            .query_row(
                "SELECT filename, relative_path FROM images WHERE id = ?1",
                [id],
                |row| {
                    Ok(EntryMeta {
                        display_name: row.get(0)?,
                        relative_path: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))
    }

    fn mark_edited(&self, locator: &Locator, edit: &EditRecord) -> StoreResult<()> {
        let id = parse_locator(locator)?;
        let json = edit
            .to_json()
            .map_err(|e| StoreError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        self.conn()?.execute(
            "INSERT INTO edits (image_id, settings_json) VALUES (?1, ?2)",
            rusqlite::params![id, json],
        )?;
        Ok(())
    }

    fn edited_photos(&self) -> StoreResult<Vec<MediaRecord>> {
        self.query_records(
            "SELECT id, filename FROM images
             WHERE pending = 0 AND id IN (SELECT image_id FROM edits)
             ORDER BY imported_at DESC, id DESC",
        )
    }
}

// Implement Debug without exposing the connection
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .field("root", &self.root)
            .finish()
    }
}

fn make_locator(id: i64) -> Locator {
    Locator::new(format!("{}{}", LOCATOR_PREFIX, id))
}

fn parse_locator(locator: &Locator) -> StoreResult<i64> {
    locator
        .as_str()
        .strip_prefix(LOCATOR_PREFIX)
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| StoreError::InvalidLocator(locator.to_string()))
}

/// Create an empty file in `dir` named `requested`, or its first free " (n)" variant.
/// Two callers can never both create the same name.
fn reserve_file(dir: &Path, requested: &str) -> StoreResult<(String, PathBuf)> {
    loop {
        let filename = unique_name(requested, |candidate| dir.join(candidate).exists());
        let path = dir.join(&filename);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok((filename, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn map_io(err: io::Error, locator: &Locator) -> StoreError {
    match err.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(locator.to_string()),
        io::ErrorKind::PermissionDenied => StoreError::PermissionDenied(locator.to_string()),
        _ => StoreError::Io(err),
    }
}

/// Keep only plain path components so an album can't escape the root
fn sanitize_relative(relative: &str) -> PathBuf {
    Path::new(relative)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

fn to_relative_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => MIME_JPEG,
    }
}
