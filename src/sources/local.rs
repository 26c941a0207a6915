//! Offline mail sources: exported JSON records and `.eml` directories.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{MailSource, SourceKind};
use crate::errors::{IoResultExt, Result, SpamOriginError};
use crate::headers;
use crate::records::MailRecord;

/// Reads a JSON array of `MailRecord` values.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MailSource for JsonFileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::JsonFile
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_spam_records(&self, _token: &str, limit: usize) -> Result<Vec<MailRecord>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_path(self.location(), "read")?;
        let mut records: Vec<MailRecord> = serde_json::from_str(&content).map_err(|e| {
            SpamOriginError::parse(format!("records file {}", self.location()), e.to_string())
        })?;
        records.truncate(limit);
        debug!(count = records.len(), path = %self.location(), "loaded records from JSON");
        Ok(records)
    }
}

/// Reads every `*.eml` file in a directory, in file-name order.
pub struct EmlDirectorySource {
    dir: PathBuf,
}

impl EmlDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn eml_paths(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_path(self.location(), "list directory")?;
        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_path(self.location(), "list directory")?
        {
            let path = entry.path();
            if !has_eml_extension(&path) {
                continue;
            }
            let file_type = entry
                .file_type()
                .await
                .with_path(path.display().to_string(), "stat")?;
            // `file_type` does not follow symlinks.
            let is_file = if file_type.is_symlink() {
                tokio::fs::metadata(&path)
                    .await
                    .is_ok_and(|meta| meta.is_file())
            } else {
                file_type.is_file()
            };
            if is_file {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

fn has_eml_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
}

#[async_trait]
impl MailSource for EmlDirectorySource {
    fn kind(&self) -> SourceKind {
        SourceKind::EmlDirectory
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }

    async fn fetch_spam_records(&self, _token: &str, limit: usize) -> Result<Vec<MailRecord>> {
        let paths = self.eml_paths().await?;
        if paths.is_empty() {
            warn!(dir = %self.location(), "no .eml files found");
        }
        let mut records = Vec::with_capacity(paths.len().min(limit));
        for path in paths.into_iter().take(limit) {
            let bytes = tokio::fs::read(&path)
                .await
                .with_path(path.display().to_string(), "read")?;
            records.push(headers::parse_eml(&String::from_utf8_lossy(&bytes)));
        }
        debug!(count = records.len(), dir = %self.location(), "parsed .eml files");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn json_source_reads_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        fs::write(
            &path,
            r#"[
                {"subject":"a","sender_name":"A","sender_address":"a@x.com","dkim_domain":"x.com"},
                {"subject":"b","sender_name":"B","sender_address":"b@y.com"},
                {"subject":"c","sender_name":"C","sender_address":"c@z.com","spf_domain":"none"}
            ]"#,
        )
        .unwrap();

        let source = JsonFileSource::new(&path);
        let all = source.fetch_spam_records("", 50).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].dkim_domain.as_deref(), Some("x.com"));

        let two = source.fetch_spam_records("", 2).await.unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(source.kind(), SourceKind::JsonFile);
    }

    #[tokio::test]
    async fn json_source_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileSource::new(&path)
            .fetch_spam_records("", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, SpamOriginError::Parse { .. }));
    }

    #[tokio::test]
    async fn json_source_reports_missing_file() {
        let err = JsonFileSource::new("/nonexistent/spamorigin/records.json")
            .fetch_spam_records("", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, SpamOriginError::Io { .. }));
    }

    #[tokio::test]
    async fn eml_directory_source_parses_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("b.eml"),
            "From: b@second.example\nSubject: second\n\nbody\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("a.EML"),
            "From: Promo <a@first.example>\nAuthentication-Results: dkim=pass header.d=signer.example\nSubject: first\n\nbody\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("archive.eml")).unwrap();

        let source = EmlDirectorySource::new(dir.path());
        let records = source.fetch_spam_records("", 10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subject, "first");
        assert_eq!(records[0].dkim_domain.as_deref(), Some("signer.example"));
        assert_eq!(records[1].sender_address, "b@second.example");

        let limited = source.fetch_spam_records("", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
