//! Shape summaries of JSON documents: size, top-level type, keys or element
//! kinds, and nesting depth.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::{MapError, SummaError};
use crate::task_queue::BoundedMapper;

/// Top-level shape of a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonShape {
    Object { keys: Vec<String> },
    Array {
        len: usize,
        element_kinds: BTreeMap<String, usize>,
    },
    Scalar { kind: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonSummary {
    pub path: PathBuf,
    pub bytes: usize,
    pub depth: usize,
    pub shape: JsonShape,
}

impl JsonSummary {
    /// One-line human description, e.g. `object with 3 keys (a, b, c)`.
    pub fn describe(&self) -> String {
        match &self.shape {
            JsonShape::Object { keys } if keys.is_empty() => "empty object".to_string(),
            JsonShape::Object { keys } => format!(
                "object with {} ({})",
                plural(keys.len(), "key"),
                keys.join(", ")
            ),
            JsonShape::Array { len: 0, .. } => "empty array".to_string(),
            JsonShape::Array { len, element_kinds } => {
                let kinds: Vec<String> = element_kinds
                    .iter()
                    .map(|(kind, n)| format!("{} {}", n, kind))
                    .collect();
                format!("array of {} ({})", len, kinds.join(", "))
            }
            JsonShape::Scalar { kind } => kind.clone(),
        }
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Nesting depth: scalars are 0, an array or object adds one level.
pub fn depth_of(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(depth_of).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(depth_of).max().unwrap_or(0),
        _ => 0,
    }
}

pub fn shape_of(value: &Value) -> JsonShape {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();
            JsonShape::Object { keys }
        }
        Value::Array(items) => {
            let mut element_kinds = BTreeMap::new();
            for item in items {
                *element_kinds.entry(kind_of(item).to_string()).or_insert(0) += 1;
            }
            JsonShape::Array {
                len: items.len(),
                element_kinds,
            }
        }
        other => JsonShape::Scalar {
            kind: kind_of(other).to_string(),
        },
    }
}

/// Summarize JSON text. `path` is only used to label the summary and errors.
pub fn summarize_json_str(path: &Path, text: &str) -> Result<JsonSummary, SummaError> {
    let value: Value = serde_json::from_str(text).map_err(|source| SummaError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(JsonSummary {
        path: path.to_path_buf(),
        bytes: text.len(),
        depth: depth_of(&value),
        shape: shape_of(&value),
    })
}

pub fn summarize_json_file(path: &Path) -> Result<JsonSummary, SummaError> {
    let text = std::fs::read_to_string(path).map_err(|e| SummaError::io(path, e))?;
    summarize_json_str(path, &text)
}

#[cfg(feature = "async")]
pub async fn summarize_json_file_async(path: PathBuf) -> Result<JsonSummary, SummaError> {
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| SummaError::io(&path, e))?;
    summarize_json_str(&path, &text)
}

/// Summarize many files on a worker pool, at most `concurrency` at a time.
/// `on_done` is called after each file succeeds (progress reporting).
pub fn summarize_json_files<F>(
    paths: &[PathBuf],
    concurrency: usize,
    on_done: F,
) -> Result<Vec<JsonSummary>, MapError<SummaError>>
where
    F: Fn(&JsonSummary) + Sync,
{
    BoundedMapper::new(concurrency).run(paths, |path, _| -> Result<JsonSummary, SummaError> {
        let summary = summarize_json_file(path)?;
        on_done(&summary);
        Ok(summary)
    })
}

/// Async variant of [`summarize_json_files`] on tokio tasks.
#[cfg(feature = "async")]
pub async fn summarize_json_files_async<F>(
    paths: Vec<PathBuf>,
    concurrency: usize,
    on_done: F,
) -> Result<Vec<JsonSummary>, MapError<SummaError>>
where
    F: Fn(&JsonSummary) + Send + Sync + 'static,
{
    let on_done = std::sync::Arc::new(on_done);
    BoundedMapper::new(concurrency)
        .run_async(paths, move |path, _| {
            let on_done = std::sync::Arc::clone(&on_done);
            async move {
                let summary = summarize_json_file_async(path).await?;
                on_done(&summary);
                Ok::<_, SummaError>(summary)
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_depth() {
        assert_eq!(depth_of(&json!(1)), 0);
        assert_eq!(depth_of(&json!([])), 1);
        assert_eq!(depth_of(&json!({})), 1);
        assert_eq!(depth_of(&json!({"a": [1, {"b": null}]})), 3);
    }

    #[test]
    fn test_object_shape_keys_sorted() {
        let s = summarize_json_str(Path::new("x.json"), r#"{"b": 1, "a": {"c": true}}"#).unwrap();
        assert_eq!(
            s.shape,
            JsonShape::Object {
                keys: vec!["a".to_string(), "b".to_string()]
            }
        );
        assert_eq!(s.depth, 2);
        assert_eq!(s.describe(), "object with 2 keys (a, b)");
    }

    #[test]
    fn test_array_shape_counts_kinds() {
        let s = summarize_json_str(Path::new("x.json"), r#"[1, 2, "x", null, [3]]"#).unwrap();
        match &s.shape {
            JsonShape::Array { len, element_kinds } => {
                assert_eq!(*len, 5);
                assert_eq!(element_kinds["number"], 2);
                assert_eq!(element_kinds["string"], 1);
                assert_eq!(element_kinds["null"], 1);
                assert_eq!(element_kinds["array"], 1);
            }
            other => panic!("unexpected shape {:?}", other),
        }
        assert_eq!(s.describe(), "array of 5 (1 array, 1 null, 2 number, 1 string)");
    }

    #[test]
    fn test_scalar_and_empty_shapes() {
        let s = summarize_json_str(Path::new("x.json"), "\"hi\"").unwrap();
        assert_eq!(s.describe(), "string");
        assert_eq!(s.bytes, 4);
        let s = summarize_json_str(Path::new("x.json"), "[]").unwrap();
        assert_eq!(s.describe(), "empty array");
        let s = summarize_json_str(Path::new("x.json"), "{}").unwrap();
        assert_eq!(s.describe(), "empty object");
    }

    #[test]
    fn test_invalid_json_names_path() {
        let err = summarize_json_str(Path::new("broken.json"), "{").unwrap_err();
        assert!(matches!(err, SummaError::Json { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_summarize_files_in_order() {
        let td = tempfile::tempdir().expect("tmp");
        let mut paths = Vec::new();
        for i in 0..6 {
            let p = td.path().join(format!("f{}.json", i));
            std::fs::write(&p, format!("[{}]", "0,".repeat(i) + "0")).expect("write");
            paths.push(p);
        }
        let seen = AtomicUsize::new(0);
        let out = summarize_json_files(&paths, 3, |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 6);
        for (i, s) in out.iter().enumerate() {
            assert_eq!(s.path, paths[i]);
            assert!(matches!(s.shape, JsonShape::Array { len, .. } if len == i + 1));
        }
    }

    #[test]
    fn test_missing_file_fails_whole_run() {
        let td = tempfile::tempdir().expect("tmp");
        let good = td.path().join("good.json");
        std::fs::write(&good, "{}").expect("write");
        let paths = vec![good, td.path().join("missing.json")];
        let err = summarize_json_files(&paths, 2, |_| {}).unwrap_err();
        assert_eq!(err.index(), Some(1));
        assert!(matches!(
            err.into_worker_error(),
            Some(SummaError::Io { .. })
        ));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_summarize_files_async() {
        let td = tempfile::tempdir().expect("tmp");
        let a = td.path().join("a.json");
        let b = td.path().join("b.json");
        std::fs::write(&a, r#"{"k": 1}"#).expect("write");
        std::fs::write(&b, "true").expect("write");
        let out = summarize_json_files_async(vec![a.clone(), b.clone()], 4, |_| {})
            .await
            .unwrap();
        assert_eq!(out[0].path, a);
        assert_eq!(out[0].describe(), "object with 1 key (k)");
        assert_eq!(out[1].describe(), "bool");
    }
}
