//! Group CSV rows by a key column and aggregate a numeric value column.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{MapError, SummaError};
use crate::task_queue::BoundedMapper;

#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub group_by: String,
    pub value: String,
    pub delimiter: u8,
}

impl CsvOptions {
    pub fn new(group_by: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            group_by: group_by.into(),
            value: value.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvSummary {
    pub group_by: String,
    pub value: String,
    /// Sorted by key.
    pub groups: Vec<GroupStats>,
}

impl CsvSummary {
    pub fn total_count(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }
}

/// Running aggregate for one group.
#[derive(Debug)]
struct Acc {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Acc {
    fn new(x: f64) -> Self {
        Self {
            count: 1,
            sum: x,
            min: x,
            max: x,
        }
    }

    fn push(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    fn merge(&mut self, other: &Acc) {
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

type Groups = BTreeMap<String, Acc>;

fn merge_groups(into: &mut Groups, from: Groups) {
    for (key, acc) in from {
        into.entry(key)
            .and_modify(|existing| existing.merge(&acc))
            .or_insert(acc);
    }
}

fn finish(groups: Groups, opts: &CsvOptions) -> CsvSummary {
    CsvSummary {
        group_by: opts.group_by.clone(),
        value: opts.value.clone(),
        groups: groups
            .into_iter()
            .map(|(key, acc)| GroupStats {
                key,
                count: acc.count,
                sum: acc.sum,
                mean: acc.sum / acc.count as f64,
                min: acc.min,
                max: acc.max,
            })
            .collect(),
    }
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize, SummaError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| SummaError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
}

fn aggregate<R: Read>(reader: R, opts: &CsvOptions, path: &Path) -> Result<Groups, SummaError> {
    let csv_err = |source| SummaError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .from_reader(reader);
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let key_col = column_index(&headers, &opts.group_by, path)?;
    let value_col = column_index(&headers, &opts.value, path)?;

    let mut groups = Groups::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let raw = record.get(value_col).unwrap_or("").trim();
        // Rows with no value do not count towards any group.
        if raw.is_empty() {
            continue;
        }
        // NaN and infinities parse as f64 but would poison sum/min/max.
        let x = raw
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .ok_or_else(|| SummaError::InvalidNumber {
                path: path.to_path_buf(),
                line: record.position().map(|p| p.line()).unwrap_or(0),
                column: opts.value.clone(),
                value: raw.to_string(),
            })?;
        let key = record.get(key_col).unwrap_or("").trim().to_string();
        groups
            .entry(key)
            .and_modify(|acc| acc.push(x))
            .or_insert_with(|| Acc::new(x));
    }
    Ok(groups)
}

/// Summarize CSV text. `path` only labels errors.
pub fn summarize_csv_str(path: &Path, text: &str, opts: &CsvOptions) -> Result<CsvSummary, SummaError> {
    aggregate(text.as_bytes(), opts, path).map(|groups| finish(groups, opts))
}

pub fn summarize_csv_file(path: &Path, opts: &CsvOptions) -> Result<CsvSummary, SummaError> {
    let file = std::fs::File::open(path).map_err(|e| SummaError::io(path, e))?;
    aggregate(file, opts, path).map(|groups| finish(groups, opts))
}

/// Aggregate several files, at most `concurrency` at a time, and merge the
/// groups. Any failing file fails the whole summary.
pub fn summarize_csv_files(
    paths: &[PathBuf],
    opts: &CsvOptions,
    concurrency: usize,
) -> Result<CsvSummary, MapError<SummaError>> {
    let parts = BoundedMapper::new(concurrency).run(paths, |path, _| {
        let file = std::fs::File::open(path).map_err(|e| SummaError::io(path, e))?;
        aggregate(file, opts, path)
    })?;
    let mut groups = Groups::new();
    for part in parts {
        merge_groups(&mut groups, part);
    }
    Ok(finish(groups, opts))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALES: &str = "region,product,amount\n\
                         north,apples,10\n\
                         south,pears,4.5\n\
                         north,pears,2\n\
                         east,apples,\n\
                         south,apples,0.5\n";

    fn opts() -> CsvOptions {
        CsvOptions::new("region", "amount")
    }

    #[test]
    fn test_groups_sorted_with_stats() {
        let s = summarize_csv_str(Path::new("sales.csv"), SALES, &opts()).unwrap();
        let keys: Vec<&str> = s.groups.iter().map(|g| g.key.as_str()).collect();
        // "east" has no amount, so it never forms a group.
        assert_eq!(keys, vec!["north", "south"]);

        let north = &s.groups[0];
        assert_eq!(north.count, 2);
        assert_eq!(north.sum, 12.0);
        assert_eq!(north.mean, 6.0);
        assert_eq!(north.min, 2.0);
        assert_eq!(north.max, 10.0);

        let south = &s.groups[1];
        assert_eq!(south.count, 2);
        assert_eq!(south.sum, 5.0);
        assert_eq!(south.min, 0.5);
        assert_eq!(s.total_count(), 4);
    }

    #[test]
    fn test_missing_column() {
        let err = summarize_csv_str(
            Path::new("sales.csv"),
            SALES,
            &CsvOptions::new("country", "amount"),
        )
        .unwrap_err();
        match err {
            SummaError::MissingColumn { column, .. } => assert_eq!(column, "country"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let text = "region,amount\nnorth,1\nsouth,lots\n";
        let err = summarize_csv_str(Path::new("bad.csv"), text, &opts()).unwrap_err();
        match err {
            SummaError::InvalidNumber { line, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let text = "region,amount\nnorth,1\nnorth,NaN\nsouth,inf\n";
        let err = summarize_csv_str(Path::new("nan.csv"), text, &opts()).unwrap_err();
        match err {
            SummaError::InvalidNumber { line, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(value, "NaN");
            }
            other => panic!("unexpected error {:?}", other),
        }

        for bad in ["inf", "-infinity", "1e999"] {
            let text = format!("region,amount\nsouth,{}\n", bad);
            let err = summarize_csv_str(Path::new("inf.csv"), &text, &opts()).unwrap_err();
            assert!(
                matches!(err, SummaError::InvalidNumber { line: 2, .. }),
                "{} accepted: {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_custom_delimiter() {
        let text = "region;amount\nwest;3\nwest;5\n";
        let s = summarize_csv_str(Path::new("semi.csv"), text, &opts().with_delimiter(b';')).unwrap();
        assert_eq!(s.groups.len(), 1);
        assert_eq!(s.groups[0].mean, 4.0);
    }

    #[test]
    fn test_header_only_is_empty() {
        let s = summarize_csv_str(Path::new("empty.csv"), "region,amount\n", &opts()).unwrap();
        assert!(s.groups.is_empty());
        assert_eq!(s.total_count(), 0);
    }

    #[test]
    fn test_files_are_merged() {
        let td = tempfile::tempdir().expect("tmp");
        let a = td.path().join("a.csv");
        let b = td.path().join("b.csv");
        std::fs::write(&a, "region,amount\nnorth,1\nsouth,8\n").expect("write");
        std::fs::write(&b, "region,amount\nnorth,5\nwest,-2\n").expect("write");

        let s = summarize_csv_files(&[a, b], &opts(), 2).unwrap();
        let north = s.groups.iter().find(|g| g.key == "north").unwrap();
        assert_eq!(north.count, 2);
        assert_eq!(north.sum, 6.0);
        assert_eq!(north.min, 1.0);
        assert_eq!(north.max, 5.0);
        assert_eq!(s.groups.len(), 3);
    }

    #[test]
    fn test_one_bad_file_fails_all() {
        let td = tempfile::tempdir().expect("tmp");
        let a = td.path().join("a.csv");
        std::fs::write(&a, "region,amount\nnorth,1\n").expect("write");
        let missing = td.path().join("nope.csv");

        let err = summarize_csv_files(&[a, missing], &opts(), 2).unwrap_err();
        assert_eq!(err.index(), Some(1));
    }
}
