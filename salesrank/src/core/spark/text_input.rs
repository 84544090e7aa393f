use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::debug;

use crate::error::{RecordLocation, StageError};

/// One line of an input file together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub path: Arc<PathBuf>,
    /// 1-based
    pub number: usize,
    pub text: String,
}

impl TextLine {
    pub fn location(&self) -> RecordLocation {
        RecordLocation {
            path: self.path.as_ref().clone(),
            line: self.number,
        }
    }
}

/// Files making up `path`: the file itself, or every visible regular file of
/// the directory in name order. Names starting with `_` or `.` are markers and
/// scratch files, not data.
pub async fn list_input_files(path: &Path) -> Result<Vec<PathBuf>, StageError> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StageError::MissingInput(path.to_path_buf())
        } else {
            StageError::io(path, e)
        }
    })?;
    if meta.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| StageError::io(path, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StageError::io(path, e))?
    {
        let hidden = entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.starts_with('_') || name.starts_with('.'));
        let is_file = entry
            .file_type()
            .await
            .map_err(|e| StageError::io(entry.path(), e))?
            .is_file();
        if is_file && !hidden {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Byte ranges of roughly `split_size` bytes, each stretched to end right
/// after a newline so no line is cut in two.
pub fn split_ranges(contents: &[u8], split_size: usize) -> Vec<(usize, usize)> {
    let split_size = split_size.max(1);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < contents.len() {
        let target = start + split_size;
        let end = if target >= contents.len() {
            contents.len()
        } else {
            contents[target - 1..]
                .iter()
                .position(|b| *b == b'\n')
                .map_or(contents.len(), |pos| target + pos)
        };
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Reads every input file and cuts it into line aligned splits, one split per
/// returned partition.
pub async fn read_splits(path: &Path, split_size: usize) -> Result<Vec<Vec<TextLine>>, StageError> {
    let mut splits = Vec::new();
    for file in list_input_files(path).await? {
        let bytes = tokio::fs::read(&file)
            .await
            .map_err(|e| StageError::io(&file, e))?;
        let contents =
            String::from_utf8(bytes).map_err(|_| StageError::Encoding { path: file.clone() })?;

        let file = Arc::new(file);
        let ranges = split_ranges(contents.as_bytes(), split_size);
        debug!(file = %file.display(), splits = ranges.len(), "input file split");

        let mut number = 0;
        for (start, end) in ranges {
            let lines: Vec<TextLine> = contents[start..end]
                .lines()
                .map(|text| {
                    number += 1;
                    TextLine {
                        path: file.clone(),
                        number,
                        text: text.to_string(),
                    }
                })
                .collect();
            splits.push(lines);
        }
    }
    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_end_on_line_boundaries() {
        let text = b"aaaa\nbb\ncccccc\nd\n";
        let ranges = split_ranges(text, 5);
        assert_eq!(ranges, vec![(0, 5), (5, 15), (15, 17)]);
    }

    #[test]
    fn long_line_stays_whole() {
        let text = b"0123456789\nx";
        assert_eq!(split_ranges(text, 3), vec![(0, 11), (11, 12)]);
    }

    #[test]
    fn one_split_when_small() {
        assert_eq!(split_ranges(b"a\nb\n", 1024), vec![(0, 4)]);
        assert!(split_ranges(b"", 1024).is_empty());
    }

    #[tokio::test]
    async fn splits_keep_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sales.csv");
        std::fs::write(&file, "h\r\nl2\nl3\nl4\n").unwrap();

        let splits = read_splits(&file, 4).await.unwrap();
        let lines: Vec<(usize, String)> = splits
            .into_iter()
            .flatten()
            .map(|l| (l.number, l.text))
            .collect();
        assert_eq!(
            lines,
            vec![
                (1, "h".to_string()),
                (2, "l2".to_string()),
                (3, "l3".to_string()),
                (4, "l4".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn directory_inputs_skip_markers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part-r-00001"), "b\n").unwrap();
        std::fs::write(dir.path().join("part-r-00000"), "a\n").unwrap();
        std::fs::write(dir.path().join("_SUCCESS"), "{}").unwrap();
        std::fs::write(dir.path().join(".crc"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let files = list_input_files(dir.path()).await.unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("part-r-00000"), dir.path().join("part-r-00001")]
        );
    }

    #[tokio::test]
    async fn missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_splits(&dir.path().join("nope.csv"), 1024).await;
        assert!(matches!(result, Err(StageError::MissingInput(_))));
    }

    #[tokio::test]
    async fn invalid_utf8_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.csv");
        std::fs::write(&file, [0x66, 0xff, 0x0a]).unwrap();
        assert!(matches!(
            read_splits(&file, 1024).await,
            Err(StageError::Encoding { .. })
        ));
    }
}
