//! Line-oriented text input

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use tracing::debug;

use batchline_core::error::{Error, Result};
use batchline_core::RecordSource;

/// Reads newline-delimited UTF-8 text from a file or glob pattern.
///
/// When the pattern matches several files they are read in lexicographic
/// path order; lines within a file keep their file order. Only one file is
/// open at a time, so arbitrarily large inputs stream without being held in
/// memory. Non-UTF-8 input is fatal and aborts the run.
pub struct TextLineReader {
    pattern: String,
}

impl TextLineReader {
    /// Create a reader over a file path or glob pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// The configured path or pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn matched_files(&self) -> Result<Vec<PathBuf>> {
        // A literal path that exists short-circuits pattern matching, so
        // file names containing glob metacharacters still work.
        let literal = Path::new(&self.pattern);
        if literal.is_file() {
            return Ok(vec![literal.to_path_buf()]);
        }

        let entries = glob::glob(&self.pattern).map_err(|e| Error::InvalidPattern {
            pattern: self.pattern.clone(),
            reason: e.to_string(),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::Io(e.into_error()))?;
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(Error::SourceNotFound(self.pattern.clone()));
        }
        Ok(files)
    }
}

impl RecordSource for TextLineReader {
    type Item = String;

    fn read(&self) -> Result<Box<dyn Iterator<Item = Result<String>> + Send>> {
        let files = self.matched_files()?;
        debug!(files = files.len(), pattern = %self.pattern, "opening text source");
        Ok(Box::new(LineIter {
            files: files.into_iter(),
            current: None,
        }))
    }
}

struct LineIter {
    files: std::vec::IntoIter<PathBuf>,
    current: Option<Lines<BufReader<File>>>,
}

impl Iterator for LineIter {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(lines) = &mut self.current {
                match lines.next() {
                    Some(Ok(line)) => return Some(Ok(line)),
                    Some(Err(e)) => {
                        self.current = None;
                        return Some(Err(Error::Io(e)));
                    }
                    None => self.current = None,
                }
            }
            let path = self.files.next()?;
            match File::open(&path) {
                Ok(file) => self.current = Some(BufReader::new(file).lines()),
                Err(e) => return Some(Err(Error::Io(e))),
            }
        }
    }
}
