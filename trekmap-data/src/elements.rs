//! JSON-lines reader for decoded elements.
//!
//! Each non-blank line holds one [`Element`] serialised with `serde_json`.
//! Decoding upstream formats stays with the decoder that writes these files;
//! the reader only hands resolved elements to the engine in file order.

use std::io::{self, BufRead, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8;
use thiserror::Error;
use trekmap_core::Element;

use crate::fs::open_utf8_file;

/// Errors raised while streaming decoded elements.
#[derive(Debug, Error)]
pub enum ElementStreamError {
    /// The element file could not be opened.
    #[error("failed to open element stream at {path:?}")]
    Open {
        /// Path that failed to open.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Reading a line failed.
    #[error("failed to read line {line} of the element stream")]
    Read {
        /// One-based line number.
        line: u64,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A line did not hold a valid element.
    #[error("line {line} is not a valid element")]
    Decode {
        /// One-based line number.
        line: u64,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
}

/// Iterator over the elements of a JSON-lines stream.
#[derive(Debug)]
pub struct ElementReader<R> {
    lines: io::Lines<R>,
    line: u64,
}

impl<R: BufRead> ElementReader<R> {
    /// Wrap a buffered reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for ElementReader<R> {
    type Item = Result<Element, ElementStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.lines.next()?;
            self.line = self.line.saturating_add(1);
            let line = self.line;
            let text = match next {
                Ok(text) => text,
                Err(source) => return Some(Err(ElementStreamError::Read { line, source })),
            };
            if text.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&text)
                    .map_err(|source| ElementStreamError::Decode { line, source }),
            );
        }
    }
}

/// Open a JSON-lines element file.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use trekmap_data::read_elements;
///
/// # fn main() -> Result<(), trekmap_data::ElementStreamError> {
/// for item in read_elements(Utf8Path::new("elements.jsonl"))? {
///     let element = item?;
///     println!("{}", element.id);
/// }
/// # Ok(())
/// # }
/// ```
pub fn read_elements(
    path: &Utf8Path,
) -> Result<ElementReader<BufReader<fs_utf8::File>>, ElementStreamError> {
    let file = open_utf8_file(path).map_err(|source| ElementStreamError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ElementReader::new(BufReader::new(file)))
}
