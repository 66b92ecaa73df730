//! libFM text-format reader and prediction writer.
//!
//! The format is one sample per line: a target value followed by
//! `feature:value` pairs with 0-based feature ids, e.g.
//!
//! ```text
//! 5.0 0:1 23:0.5
//! 1.0 7:1
//! ```
//!
//! Train and test files share one feature space sized to the largest id seen
//! across both, so callers typically run [`scan_num_features`] over every
//! file first and pass the maximum to [`read_libfm`].

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::dataset::SparseDataset;
use super::sparse::SparseMatrix;
use super::DataError;

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> DataError {
    DataError::Parse {
        path: path.display().to_string(),
        line,
        message: message.into(),
    }
}

/// Scan a libFM file for the number of features it implies.
///
/// Returns the largest feature id seen plus one, or 0 for a file with no
/// feature tokens.
pub fn scan_num_features(path: impl AsRef<Path>) -> Result<usize, DataError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut max_feature: Option<usize> = None;

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        if tokens.next().is_none() {
            continue;
        }
        for token in tokens {
            let (feature, _) = split_entry(token)
                .ok_or_else(|| parse_error(path, line_idx + 1, format!("invalid entry '{token}'")))?;
            max_feature = Some(max_feature.map_or(feature, |m| m.max(feature)));
        }
    }

    Ok(max_feature.map_or(0, |m| m + 1))
}

/// Read a libFM file into a [`SparseDataset`] over a fixed feature space.
///
/// `n_features` must be at least the scanned feature count of the file; pass
/// the maximum over all files that share the feature space.
///
/// # Errors
///
/// Returns [`DataError::Parse`] (with the 1-based line number) on malformed
/// targets or entries, and the constructor errors of [`SparseDataset`] on
/// empty files.
pub fn read_libfm(path: impl AsRef<Path>, n_features: usize) -> Result<SparseDataset, DataError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut targets = Vec::new();
    let mut indptr = vec![0usize];
    let mut indices: Vec<u32> = Vec::new();
    let mut values: Vec<f64> = Vec::new();

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        let Some(target_token) = tokens.next() else {
            continue;
        };
        let target: f64 = target_token
            .parse()
            .map_err(|_| parse_error(path, line_idx + 1, format!("invalid target '{target_token}'")))?;
        targets.push(target);

        for token in tokens {
            let (feature, value) = split_entry(token)
                .ok_or_else(|| parse_error(path, line_idx + 1, format!("invalid entry '{token}'")))?;
            if feature >= n_features {
                return Err(parse_error(
                    path,
                    line_idx + 1,
                    format!("feature id {feature} exceeds feature space {n_features}"),
                ));
            }
            indices.push(feature as u32);
            values.push(value);
        }
        indptr.push(indices.len());
    }

    let n_samples = targets.len();
    let samples = SparseMatrix::new(n_samples, n_features, indptr, indices, values)?;
    SparseDataset::new(samples, targets)
}

/// Write predictions to a file, one value per line.
pub fn write_predictions(path: impl AsRef<Path>, predictions: &[f64]) -> Result<(), DataError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for p in predictions {
        writeln!(writer, "{p:.10}")?;
    }
    writer.flush()?;
    Ok(())
}

fn split_entry(token: &str) -> Option<(usize, f64)> {
    let (feature, value) = token.split_once(':')?;
    let feature: usize = feature.parse().ok()?;
    let value: f64 = value.parse().ok()?;
    Some((feature, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn scans_feature_space() {
        let f = write_temp("1.0 0:1 7:0.5\n0.0 3:1\n");
        assert_eq!(scan_num_features(f.path()).unwrap(), 8);
    }

    #[test]
    fn reads_targets_and_entries() {
        let f = write_temp("5.0 0:1 2:0.5\n1.0 1:1\n");
        let ds = read_libfm(f.path(), 3).unwrap();
        assert_eq!(ds.targets(), &[5.0, 1.0]);
        assert_eq!(ds.n_features(), 3);
        let row = ds.samples().row(0);
        assert_eq!(row.indices, &[0, 2]);
        assert_eq!(row.values, &[1.0, 0.5]);
        assert_eq!(ds.min_target(), 1.0);
        assert_eq!(ds.max_target(), 5.0);
    }

    #[test]
    fn reports_line_number_on_bad_entry() {
        let f = write_temp("1.0 0:1\n0.0 nonsense\n");
        let err = read_libfm(f.path(), 1).unwrap_err();
        match err {
            DataError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_feature_beyond_space() {
        let f = write_temp("1.0 9:1\n");
        let err = read_libfm(f.path(), 3).unwrap_err();
        assert!(matches!(err, DataError::Parse { .. }));
    }

    #[test]
    fn writes_one_prediction_per_line() {
        let f = tempfile::NamedTempFile::new().unwrap();
        write_predictions(f.path(), &[0.5, 1.25]).unwrap();
        let content = std::fs::read_to_string(f.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0.5"));
        assert!(lines[1].starts_with("1.25"));
    }
}
