//! FileSource - line-oriented record source backed by a file
//!
//! Each `open` starts from the beginning of the file, so a source is
//! restartable per open. The handle is released when the source drops,
//! on every exit path.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use contracts::{DispatchError, RecordSource};

/// Record source reading lines from a file
pub struct FileSource {
    origin: String,
    lines: Lines<BufReader<File>>,
}

impl FileSource {
    /// Open the file for reading
    ///
    /// # Errors
    /// `SourceRead` with the path and the underlying cause.
    pub async fn open(path: &Path) -> Result<Self, DispatchError> {
        let origin = path.display().to_string();
        let file = File::open(path)
            .await
            .map_err(|e| DispatchError::source_read(origin.as_str(), e.to_string()))?;

        Ok(Self {
            origin,
            lines: BufReader::new(file).lines(),
        })
    }
}

impl RecordSource for FileSource {
    fn origin(&self) -> &str {
        &self.origin
    }

    async fn next_line(&mut self) -> Result<Option<String>, DispatchError> {
        self.lines
            .next_line()
            .await
            .map_err(|e| DispatchError::source_read(self.origin.as_str(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_all_lines_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "second").unwrap();
        writeln!(file, "third").unwrap();

        let mut source = FileSource::open(file.path()).await.unwrap();
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("third"));
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_source_read_error() {
        let result = FileSource::open(Path::new("/nonexistent/data.csv")).await;
        assert!(matches!(
            result,
            Err(DispatchError::SourceRead { ref path, .. }) if path.contains("nonexistent")
        ));
    }

    #[tokio::test]
    async fn test_restartable_per_open() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "only line").unwrap();

        let mut first = FileSource::open(file.path()).await.unwrap();
        assert!(first.next_line().await.unwrap().is_some());
        assert!(first.next_line().await.unwrap().is_none());
        drop(first);

        let mut second = FileSource::open(file.path()).await.unwrap();
        assert_eq!(
            second.next_line().await.unwrap().as_deref(),
            Some("only line")
        );
    }
}
