use serde::Deserialize;
use serde_json::Value;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::movie::{InvalidRecord, Movie};

/// The input could not be opened or does not start a JSON array.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read input: {0}")]
    Read(#[source] io::Error),
    #[error("input must be a JSON array of movie records")]
    NotAnArray,
}

/// A single element of the array could not be turned into a movie.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The element is valid JSON but not a valid movie. Later elements are
    /// still read.
    #[error("record {index}: {reason}")]
    Invalid { index: usize, reason: InvalidRecord },
    /// The document is broken at this element. Nothing after it can be read.
    #[error("record {index}: malformed input: {message}")]
    Malformed { index: usize, message: String },
}

impl RecordError {
    pub fn index(&self) -> usize {
        match self {
            RecordError::Invalid { index, .. } | RecordError::Malformed { index, .. } => *index,
        }
    }
}

/// Single-pass sequence of movie records read lazily from a JSON array.
///
/// Only the opening `[` is checked up front. Each element is parsed from the
/// reader when the iterator reaches it, so memory use is bounded by the
/// largest record rather than the whole document. An element that is not a
/// movie is reported on its own; broken JSON ends the sequence with a
/// [`RecordError::Malformed`].
#[derive(Debug)]
pub struct MovieRecords<R> {
    reader: R,
    index: usize,
    expect_separator: bool,
    done: bool,
}

impl MovieRecords<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Reading movie records from {}", path.display());
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> MovieRecords<BufReader<R>> {
    pub fn from_reader(reader: R) -> Result<Self, LoadError> {
        Self::new(BufReader::new(reader))
    }
}

impl<R: BufRead> MovieRecords<R> {
    fn new(mut reader: R) -> Result<Self, LoadError> {
        match peek_significant(&mut reader).map_err(LoadError::Read)? {
            Some(b'[') => reader.consume(1),
            _ => return Err(LoadError::NotAnArray),
        }
        Ok(Self {
            reader,
            index: 0,
            expect_separator: false,
            done: false,
        })
    }

    /// Reads the next array element, or `None` after the closing `]`.
    fn next_value(&mut self) -> Result<Option<Value>, String> {
        let mut next = peek_significant(&mut self.reader).map_err(read_failed)?;

        if self.expect_separator {
            match next {
                Some(b',') => {
                    self.reader.consume(1);
                    next = peek_significant(&mut self.reader).map_err(read_failed)?;
                    if next == Some(b']') {
                        return Err("trailing comma before `]`".to_string());
                    }
                }
                Some(b']') => return self.finish(),
                Some(other) => {
                    return Err(format!("expected `,` or `]`, found `{}`", other as char))
                }
                None => return Err("input ended inside the array".to_string()),
            }
        } else if next == Some(b']') {
            return self.finish();
        }

        let value = match next {
            None => return Err("input ended inside the array".to_string()),
            Some(b'-' | b'0'..=b'9') => self.read_number()?,
            // Objects, arrays, strings and literals end on their own last
            // byte, so the deserializer never reads past the element.
            Some(_) => Value::deserialize(&mut serde_json::Deserializer::from_reader(
                &mut self.reader,
            ))
            .map_err(|e| e.to_string())?,
        };
        self.expect_separator = true;
        Ok(Some(value))
    }

    /// Numbers have no closing byte, so they are collected here instead of
    /// letting the deserializer consume the separator after them.
    fn read_number(&mut self) -> Result<Value, String> {
        let mut text = String::new();
        loop {
            let buf = self.reader.fill_buf().map_err(read_failed)?;
            let len = buf
                .iter()
                .take_while(|b| matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'))
                .count();
            text.extend(buf[..len].iter().map(|&b| b as char));
            let complete = buf.is_empty() || len < buf.len();
            self.reader.consume(len);
            if complete {
                break;
            }
        }
        serde_json::from_str(&text).map_err(|e| format!("invalid number `{text}`: {e}"))
    }

    fn finish(&mut self) -> Result<Option<Value>, String> {
        self.reader.consume(1);
        match peek_significant(&mut self.reader).map_err(read_failed)? {
            None => Ok(None),
            Some(other) => Err(format!(
                "unexpected `{}` after the closing `]`",
                other as char
            )),
        }
    }
}

impl<R: BufRead> Iterator for MovieRecords<R> {
    type Item = Result<Movie, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let index = self.index;
        match self.next_value() {
            Ok(Some(value)) => {
                self.index += 1;
                Some(Movie::from_json(value).map_err(|reason| RecordError::Invalid { index, reason }))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(message) => {
                self.done = true;
                Some(Err(RecordError::Malformed { index, message }))
            }
        }
    }
}

/// Skips JSON whitespace and returns the next byte without consuming it.
fn peek_significant<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        match buf
            .iter()
            .position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
        {
            Some(pos) => {
                let byte = buf[pos];
                reader.consume(pos);
                return Ok(Some(byte));
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

fn read_failed(err: io::Error) -> String {
    format!("cannot read input: {err}")
}
