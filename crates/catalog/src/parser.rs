//! Reading and writing catalog snapshots.
//!
//! A snapshot is one JSON document shaped like the voting backend's API
//! responses. The backend is loose about a few field types (SQLite hands
//! out `0`/`1` for booleans, years may come through as numbers, unset
//! dates as empty strings), so the film decoders below accept all of them.

use crate::error::{CatalogError, Result};
use crate::types::Snapshot;
use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Parse a snapshot file from disk
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let file = File::open(path)?;
    let snapshot = serde_json::from_reader(BufReader::new(file))?;
    Ok(snapshot)
}

/// Parse a snapshot held in memory
pub fn parse_snapshot(json: &str) -> Result<Snapshot> {
    Ok(serde_json::from_str(json)?)
}

/// Write a snapshot as pretty-printed JSON, replacing the file.
///
/// A failed write leaves the previous file untouched.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    replace_file(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, snapshot)?;
        writer.write_all(b"\n")?;
        Ok(())
    })
}

/// Write into a temporary file next to `path`, then rename it over `path`
pub(crate) fn replace_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Parse an archive date.
///
/// Example: "2024-01-10" -> Some(2024-01-10)
///          ""           -> None
///          "2024-01-10T20:30:00" -> Some(2024-01-10)
///          "2024-01-10junk"      -> Err
pub fn parse_archive_date(s: &str) -> Result<Option<NaiveDate>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    // Timestamps sometimes leak in where a calendar date is expected
    let date_part = match trimmed.as_bytes().get(10) {
        Some(b'T' | b' ') => &trimmed[..10],
        _ => trimmed,
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| CatalogError::InvalidValue {
            field: "archive_date".to_string(),
            value: s.to_string(),
        })
}

pub(crate) fn optional_iso_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_archive_date(&s).map_err(D::Error::custom),
        None => Ok(None),
    }
}

pub(crate) fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        None => false,
    })
}

pub(crate) fn year_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<Year>::deserialize(deserializer)? {
        Some(Year::Text(s)) => s,
        Some(Year::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Mode, VoteValue};

    #[test]
    fn test_parse_archive_date() {
        assert_eq!(
            parse_archive_date("2024-01-10").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
        assert_eq!(parse_archive_date("  ").unwrap(), None);
        assert_eq!(
            parse_archive_date("2023-05-01T21:00:00").unwrap(),
            NaiveDate::from_ymd_opt(2023, 5, 1)
        );
        assert_eq!(
            parse_archive_date("2023-05-01 21:00").unwrap(),
            NaiveDate::from_ymd_opt(2023, 5, 1)
        );
        assert!(parse_archive_date("yesterday").is_err());
        assert!(parse_archive_date("2024-01-10junk").is_err());
    }

    #[test]
    fn test_failed_write_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = parse_snapshot(r#"{"profiles": [{"id": 1, "name": "Ana"}], "films": []}"#).unwrap();
        write_snapshot(&path, &snapshot).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let result = replace_file(&path, |writer| {
            writer.write_all(b"{\"profiles\": [")?;
            Err(CatalogError::ValidationError("interrupted".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(read_snapshot(&path).unwrap().profiles[0].name, "Ana");
        // the temporary file is cleaned up
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_parse_backend_shaped_film() {
        let snapshot = parse_snapshot(
            r#"{
                "profiles": [{"id": 1, "name": "Ana"}],
                "films": [{
                    "id": 7,
                    "imdb_id": "tt0081505",
                    "title": "The Shining",
                    "year": 1980,
                    "genre": "Drama, Horror",
                    "is_archived": 1,
                    "archive_date": "",
                    "upvotes": 2,
                    "created_at": "2024-01-01 10:00:00"
                }],
                "votes": [{"film_id": 7, "profile_id": 1, "vote": 2}]
            }"#,
        )
        .unwrap();

        let film = &snapshot.films[0];
        assert_eq!(film.year, "1980");
        assert!(film.is_archived);
        assert_eq!(film.mode(), Mode::Archived);
        assert_eq!(film.archive_date, None);
        assert_eq!(film.director, None);
        assert_eq!(snapshot.votes[0].vote, VoteValue::Neutral);
        assert!(snapshot.ratings.is_empty());
    }

    #[test]
    fn test_reject_unknown_vote_code() {
        let result = parse_snapshot(
            r#"{"profiles": [], "films": [], "votes": [{"film_id": 1, "profile_id": 1, "vote": 3}]}"#,
        );
        assert!(matches!(result, Err(CatalogError::JsonError(_))));
    }
}
