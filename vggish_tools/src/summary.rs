use anyhow::{Context, Result, bail, ensure};
use std::{collections::BTreeMap, path::Path};

/// What a feature CSV contains, checked against the writer's layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvSummary {
    pub dims: usize,
    pub rows: usize,
    pub rows_per_label: BTreeMap<String, usize>,
    pub distinct_ids: usize,
}

/// Number of `vggN` columns, if the header is `filename, vgg0.., label`.
pub(crate) fn feature_dims(header: &csv::StringRecord) -> Result<usize> {
    ensure!(header.len() >= 3, "header has only {} columns", header.len());
    ensure!(&header[0] == "filename", "first column is `{}`, expected `filename`", &header[0]);
    ensure!(
        &header[header.len() - 1] == "label",
        "last column is `{}`, expected `label`",
        &header[header.len() - 1]
    );

    let dims = header.len() - 2;
    for (i, name) in header.iter().skip(1).take(dims).enumerate() {
        if name != format!("vgg{i}") {
            bail!("column {} is `{name}`, expected `vgg{i}`", i + 1);
        }
    }
    Ok(dims)
}

pub fn summarize(csv_path: &Path) -> Result<CsvSummary> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open CSV: {}", csv_path.display()))?;

    let header = rdr.headers().context("Failed to read CSV header")?.clone();
    let dims = feature_dims(&header)?;

    let mut summary = CsvSummary {
        dims,
        ..Default::default()
    };
    let mut ids = std::collections::BTreeSet::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse row {}", line + 1))?;
        ensure!(
            record.len() == dims + 2,
            "row {} has {} fields, expected {}",
            line + 1,
            record.len(),
            dims + 2
        );
        for value in record.iter().skip(1).take(dims) {
            value
                .parse::<f32>()
                .with_context(|| format!("row {}: `{value}` is not a number", line + 1))?;
        }

        ids.insert((record[dims + 1].to_string(), record[0].to_string()));
        *summary
            .rows_per_label
            .entry(record[dims + 1].to_string())
            .or_default() += 1;
        summary.rows += 1;
    }

    summary.distinct_ids = ids.len();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn counts_rows_per_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "f.csv",
            "filename,vgg0,vgg1,label\n15,1,2,A\n15,3,4,A\n7,0,255,B\n",
        );

        let summary = summarize(&path).unwrap();
        assert_eq!(summary.dims, 2);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.rows_per_label["A"], 2);
        assert_eq!(summary.rows_per_label["B"], 1);
        assert_eq!(summary.distinct_ids, 2);
    }

    #[test]
    fn rejects_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "f.csv", "filename,vgg0,vgg2,label\n");
        let err = summarize(&path).unwrap_err();
        assert!(err.to_string().contains("vgg1"));
    }

    #[test]
    fn rejects_non_numeric_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "f.csv", "filename,vgg0,label\n1,abc,A\n");
        assert!(summarize(&path).is_err());
    }
}
