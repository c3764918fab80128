//! Loading matrices and writing ranked results.
//!
//! Matrix text format: one vector per line, components separated by
//! whitespace and/or commas. Blank lines and lines starting with `#` are
//! skipped. Every row must have the same number of components.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::matrix::Matrix;
use crate::mips::TopKLists;
use crate::topk::Neighbor;
use crate::{MipsError, Result};

/// Result file encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `user<TAB>item:score item:score ...`, one line per user.
    #[default]
    Text,
    /// JSON array of `{"user", "neighbors"}` / `{"user", "error"}` records.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}' (expected text or json)")),
        }
    }
}

/// Parse a matrix from text.
pub fn read_matrix<R: Read>(reader: R) -> Result<Matrix> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut dimension: Option<usize> = None;

    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let row = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(|tok| {
                tok.parse::<f64>().map_err(|e| MipsError::Parse {
                    line: line_no,
                    message: format!("'{tok}': {e}"),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if let Some(value) = row.iter().find(|v| !v.is_finite()) {
            return Err(MipsError::Parse {
                line: line_no,
                message: format!("non-finite value {value}"),
            });
        }

        match dimension {
            None => dimension = Some(row.len()),
            Some(d) if d != row.len() => {
                return Err(MipsError::Parse {
                    line: line_no,
                    message: format!("expected {d} values, found {}", row.len()),
                });
            }
            Some(_) => {}
        }
        rows.push(row);
    }

    Matrix::from_rows_with_dimension(rows, dimension.unwrap_or(0))
}

/// Load a matrix from a text file.
pub fn load_matrix(path: impl AsRef<Path>) -> Result<Matrix> {
    read_matrix(File::open(path)?)
}

#[derive(Serialize)]
struct UserRecord<'a> {
    user: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    neighbors: Option<&'a [Neighbor]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Write ranked lists in the given format.
pub fn write_results<W: Write>(writer: W, results: &TopKLists, format: OutputFormat) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    match format {
        OutputFormat::Text => {
            for (user, result) in results.iter() {
                write!(writer, "{user}\t")?;
                match result {
                    Ok(list) => {
                        for (i, n) in list.iter().enumerate() {
                            if i > 0 {
                                write!(writer, " ")?;
                            }
                            write!(writer, "{}:{}", n.id, n.score)?;
                        }
                    }
                    Err(e) => write!(writer, "ERROR {e}")?,
                }
                writeln!(writer)?;
            }
        }
        OutputFormat::Json => {
            let records: Vec<UserRecord<'_>> = results
                .iter()
                .map(|(user, result)| match result {
                    Ok(list) => UserRecord {
                        user,
                        neighbors: Some(list.as_slice()),
                        error: None,
                    },
                    Err(e) => UserRecord {
                        user,
                        neighbors: None,
                        error: Some(e.to_string()),
                    },
                })
                .collect();
            serde_json::to_writer_pretty(&mut writer, &records)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write ranked lists to a file, replacing it if present.
pub fn save_results(path: impl AsRef<Path>, results: &TopKLists, format: OutputFormat) -> Result<()> {
    write_results(File::create(path)?, results, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_separators_and_comments() {
        let text = "# items\n1.0, 2.0 3\n\n-4 5e-1,6\n";
        let m = read_matrix(text.as_bytes()).unwrap();
        assert_eq!(m.num_rows(), 2);
        assert_eq!(m.dimension(), 3);
        assert_eq!(m.row(1), &[-4.0, 0.5, 6.0]);
    }

    #[test]
    fn ragged_line_reports_line_number() {
        let err = read_matrix("1 2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, MipsError::Parse { line: 2, .. }));
    }

    #[test]
    fn bad_token_reports_line_number() {
        let err = read_matrix("1 2\n3 x\n".as_bytes()).unwrap_err();
        assert!(matches!(err, MipsError::Parse { line: 2, .. }));
    }

    #[test]
    fn nan_rejected() {
        assert!(read_matrix("1 NaN\n".as_bytes()).is_err());
    }

    #[test]
    fn empty_input_is_empty_matrix() {
        let m = read_matrix("# nothing\n".as_bytes()).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
