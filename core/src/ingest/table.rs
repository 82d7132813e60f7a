//! Line-oriented CSV reading and writing shared by every tool.
//!
//! Blank lines are skipped, the first non-blank line is the header and
//! fields are split on `,` and trimmed. Line numbers in errors are the
//! physical 1-indexed lines of the uploaded text.

use crate::prelude::{RowProblem, SurveyError, SurveyResult};

/// How the header row of a schema is checked.
#[derive(Debug, Clone, Copy)]
pub enum HeaderSpec {
    /// Exactly this many columns, names not checked.
    Positional(usize),
    /// Every listed name must be present (case-insensitive, any order).
    Named(&'static [&'static str]),
    /// `time` followed by one or more `traceN` columns.
    TimeTraces,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub line: usize,
    pub values: Vec<f64>,
}

/// Parsed numeric table. `columns` and each row's `values` follow the schema's order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

struct Layout {
    columns: Vec<String>,
    positions: Vec<usize>,
}

/// Zero-based trace index of a `traceN` header (`trace1` is index 0).
pub fn trace_index(name: &str) -> Option<usize> {
    let number: usize = name
        .trim()
        .to_ascii_lowercase()
        .strip_prefix("trace")?
        .parse()
        .ok()?;
    number.checked_sub(1)
}

fn split(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn resolve(schema: HeaderSpec, header: &[&str], line: usize) -> SurveyResult<Layout> {
    match schema {
        HeaderSpec::Positional(count) => {
            if header.len() != count {
                return Err(SurveyError::MalformedRow {
                    line,
                    problem: RowProblem::ColumnCount {
                        expected: count,
                        found: header.len(),
                    },
                });
            }
            Ok(Layout {
                columns: header.iter().map(|h| h.to_string()).collect(),
                positions: (0..count).collect(),
            })
        }
        HeaderSpec::Named(names) => {
            let lowered: Vec<String> = header.iter().map(|h| h.to_ascii_lowercase()).collect();
            let positions = names
                .iter()
                .map(|name| {
                    lowered
                        .iter()
                        .position(|h| h == name)
                        .ok_or_else(|| SurveyError::MissingHeader {
                            name: name.to_string(),
                        })
                })
                .collect::<SurveyResult<Vec<usize>>>()?;
            Ok(Layout {
                columns: names.iter().map(|n| n.to_string()).collect(),
                positions,
            })
        }
        HeaderSpec::TimeTraces => {
            if !header
                .first()
                .is_some_and(|first| first.eq_ignore_ascii_case("time"))
            {
                return Err(SurveyError::MissingHeader {
                    name: "time".into(),
                });
            }
            if header.len() < 2 {
                return Err(SurveyError::MissingHeader {
                    name: "trace1".into(),
                });
            }
            // trace numbers may not exceed the number of trace columns
            let width = header.len() - 1;
            if let Some((position, found)) = header
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, name)| trace_index(name).map_or(true, |idx| idx >= width))
            {
                return Err(SurveyError::UnexpectedHeader {
                    position: position + 1,
                    found: found.to_string(),
                });
            }
            Ok(Layout {
                columns: header.iter().map(|h| h.to_ascii_lowercase()).collect(),
                positions: (0..header.len()).collect(),
            })
        }
    }
}

fn parse_number(field: &str, column: &str, line: usize) -> SurveyResult<f64> {
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SurveyError::MalformedRow {
            line,
            problem: RowProblem::NonNumeric {
                column: column.to_string(),
                value: field.to_string(),
            },
        }),
    }
}

/// Parses `content` against `schema`; fails on the first bad header or row.
pub fn parse_table(content: &str, schema: HeaderSpec) -> SurveyResult<Table> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(idx, text)| (idx + 1, text))
        .filter(|(_, text)| !text.trim().is_empty());

    let (header_line, header_text) = lines.next().ok_or(SurveyError::EmptyFile)?;
    let header = split(header_text);
    let layout = resolve(schema, &header, header_line)?;

    let mut rows = Vec::new();
    for (line, text) in lines {
        let fields = split(text);
        if fields.len() != header.len() {
            return Err(SurveyError::MalformedRow {
                line,
                problem: RowProblem::ColumnCount {
                    expected: header.len(),
                    found: fields.len(),
                },
            });
        }
        let values = layout
            .positions
            .iter()
            .map(|&pos| parse_number(fields[pos], header[pos], line))
            .collect::<SurveyResult<Vec<f64>>>()?;
        rows.push(Row { line, values });
    }

    if rows.is_empty() {
        return Err(SurveyError::EmptyFile);
    }

    Ok(Table {
        columns: layout.columns,
        rows,
    })
}

/// Renders a header and numeric rows; values use the shortest round-trip formatting.
pub fn write_table<H, I>(header: &[H], rows: I) -> String
where
    H: AsRef<str>,
    I: IntoIterator<Item = Vec<f64>>,
{
    let mut out = header
        .iter()
        .map(|h| h.as_ref())
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');
    for row in rows {
        let line = row
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}
