use std::io::Read;
use std::path::Path;

use super::response::{AxisScore, ResponseSet};
use super::template::TemplateId;

const RESPONSE_ID_COLUMN: &str = "response_id";
const FLAGS_COLUMN: &str = "flags";

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingColumn(&'static str),
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read response export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid response CSV data: {}", err),
            ImportError::MissingColumn(column) => {
                write!(f, "response CSV is missing the '{}' column", column)
            }
            ImportError::InvalidCell { row, column, value } => write!(
                f,
                "row {} column '{}' has unreadable score '{}'",
                row, column, value
            ),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::MissingColumn(_) | ImportError::InvalidCell { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads batch response exports: one row per response set.
///
/// Columns are `response_id`, an optional `flags` column of `;`-separated codes, and one
/// column per axis code. `L3` is rubric level 3, a plain number is a raw score, and an
/// empty cell leaves the axis unscored.
pub struct ResponseSetImporter;

impl ResponseSetImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        template_id: &TemplateId,
    ) -> Result<Vec<ResponseSet>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, template_id)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        template_id: &TemplateId,
    ) -> Result<Vec<ResponseSet>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let id_index = headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(RESPONSE_ID_COLUMN))
            .ok_or(ImportError::MissingColumn(RESPONSE_ID_COLUMN))?;
        let flags_index = headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(FLAGS_COLUMN));

        let mut sets = Vec::new();
        for (offset, record) in csv_reader.records().enumerate() {
            let record = record?;
            // Header is row 1.
            let row = offset + 2;

            let id = record.get(id_index).unwrap_or_default();
            if id.is_empty() {
                return Err(ImportError::InvalidCell {
                    row,
                    column: RESPONSE_ID_COLUMN.to_string(),
                    value: String::new(),
                });
            }

            let mut set = ResponseSet::new(id, template_id.clone());

            for (index, header) in headers.iter().enumerate() {
                if index == id_index || Some(index) == flags_index {
                    continue;
                }

                let cell = record.get(index).unwrap_or_default();
                if let Some(score) = parse_cell(cell).map_err(|_| ImportError::InvalidCell {
                    row,
                    column: header.to_string(),
                    value: cell.to_string(),
                })? {
                    set.axis_scores.insert(header.to_string(), score);
                }
            }

            if let Some(cell) = flags_index.and_then(|index| record.get(index)) {
                set.asserted_flags = cell
                    .split(';')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(str::to_string)
                    .collect();
            }

            sets.push(set);
        }

        Ok(sets)
    }
}

/// Parse a score cell; range checks are left to validation.
fn parse_cell(cell: &str) -> Result<Option<AxisScore>, ()> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Some(level) = trimmed
        .strip_prefix('L')
        .or_else(|| trimmed.strip_prefix('l'))
    {
        return level
            .trim()
            .parse::<i64>()
            .map(|level| Some(AxisScore::Level(level)))
            .map_err(|_| ());
    }

    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| Some(AxisScore::Raw(value)))
        .ok_or(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn template_id() -> TemplateId {
        TemplateId("bridge-watch".to_string())
    }

    #[test]
    fn parses_levels_raw_scores_and_flags() {
        let csv = "response_id,situational_awareness,colregs,flags\n\
r-1,L4,82.5,ignored_storm_warning; no_lookout\n\
r-2,l2,,\n";
        let sets = ResponseSetImporter::from_reader(Cursor::new(csv), &template_id())
            .expect("import succeeds");

        assert_eq!(sets.len(), 2);
        assert_eq!(
            sets[0].axis_scores.get("situational_awareness"),
            Some(&AxisScore::Level(4))
        );
        assert_eq!(sets[0].axis_scores.get("colregs"), Some(&AxisScore::Raw(82.5)));
        assert_eq!(
            sets[0].asserted_flags,
            vec!["ignored_storm_warning".to_string(), "no_lookout".to_string()]
        );

        assert_eq!(sets[1].axis_scores.len(), 1);
        assert!(sets[1].asserted_flags.is_empty());
        assert_eq!(sets[1].template_id, template_id());
    }

    #[test]
    fn reports_unreadable_cells_with_position() {
        let csv = "response_id,colregs\nr-1,excellent\n";
        match ResponseSetImporter::from_reader(Cursor::new(csv), &template_id()) {
            Err(ImportError::InvalidCell { row, column, value }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "colregs");
                assert_eq!(value, "excellent");
            }
            other => panic!("expected invalid cell, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_levels_are_kept_for_validation() {
        let csv = "response_id,colregs\nr-1,L9\n";
        let sets = ResponseSetImporter::from_reader(Cursor::new(csv), &template_id())
            .expect("import succeeds");
        assert_eq!(sets[0].axis_scores.get("colregs"), Some(&AxisScore::Level(9)));
    }

    #[test]
    fn requires_response_id_column() {
        let csv = "candidate,colregs\nr-1,L3\n";
        let error = ResponseSetImporter::from_reader(Cursor::new(csv), &template_id())
            .expect_err("missing column");
        assert!(matches!(error, ImportError::MissingColumn("response_id")));
    }

    #[test]
    fn from_path_propagates_io_errors() {
        match ResponseSetImporter::from_path("./does-not-exist.csv", &template_id()) {
            Err(ImportError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
