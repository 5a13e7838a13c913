//! Row-major numeric arrays exchanged with a storage backend.

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// A numeric array with one row per time step.
///
/// Deterministic series have a single column; probabilistic series carry
/// one column per percentile and scenario series one column per scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeriesData")]
pub struct SeriesData {
    values: Vec<f64>,
    columns: usize,
}

/// Unchecked wire form; deserialization goes through [`SeriesData::new`].
#[derive(Deserialize)]
struct RawSeriesData {
    values: Vec<f64>,
    columns: usize,
}

impl TryFrom<RawSeriesData> for SeriesData {
    type Error = StorageError;

    fn try_from(raw: RawSeriesData) -> StorageResult<Self> {
        Self::new(raw.values, raw.columns)
    }
}

impl SeriesData {
    /// Create an array from row-major values.
    pub fn new(values: Vec<f64>, columns: usize) -> StorageResult<Self> {
        if columns == 0 || values.len() % columns != 0 {
            return Err(StorageError::ShapeMismatch {
                len: values.len(),
                columns,
            });
        }
        Ok(Self { values, columns })
    }

    /// Create a single-column array.
    pub fn single(values: Vec<f64>) -> Self {
        Self { values, columns: 1 }
    }

    /// Number of rows (time steps).
    pub fn rows(&self) -> usize {
        self.values.len() / self.columns
    }

    /// Number of columns per row.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// All values in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consume the array, returning its values.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Get one row.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index >= self.rows() {
            return None;
        }
        let start = index * self.columns;
        Some(&self.values[start..start + self.columns])
    }

    /// Get one column as an owned vector.
    pub fn column(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.columns {
            return None;
        }
        Some(
            self.values
                .iter()
                .skip(index)
                .step_by(self.columns)
                .copied()
                .collect(),
        )
    }

    /// Copy the rows `[offset, offset + length)` into a new array.
    pub fn slice_rows(&self, offset: usize, length: usize) -> StorageResult<Self> {
        let end = offset.saturating_add(length);
        let rows = self.rows();
        if end > rows {
            return Err(StorageError::OutOfRange { offset, end, rows });
        }

        Ok(Self {
            values: self.values[offset * self.columns..end * self.columns].to_vec(),
            columns: self.columns,
        })
    }

    /// Multiply every value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for value in &mut self.values {
            *value *= factor;
        }
    }

    /// Check if the array has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_ragged_values() {
        let err = SeriesData::new(vec![1.0, 2.0, 3.0], 2).unwrap_err();
        assert!(matches!(err, StorageError::ShapeMismatch { len: 3, columns: 2 }));
        assert!(SeriesData::new(vec![], 0).is_err());
    }

    #[test]
    fn test_rows_and_columns() {
        let data = SeriesData::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3).unwrap();
        assert_eq!(data.rows(), 2);
        assert_eq!(data.row(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(data.row(2), None);
        assert_eq!(data.column(1), Some(vec![2.0, 5.0]));
    }

    #[test]
    fn test_slice_rows() {
        let data = SeriesData::single((0..10).map(f64::from).collect());
        let slice = data.slice_rows(3, 4).unwrap();
        assert_eq!(slice.values(), &[3.0, 4.0, 5.0, 6.0]);

        let err = data.slice_rows(3, 8).unwrap_err();
        assert!(matches!(err, StorageError::OutOfRange { offset: 3, end: 11, rows: 10 }));
    }

    #[test]
    fn test_slice_multi_column() {
        let data = SeriesData::new((0..12).map(f64::from).collect(), 2).unwrap();
        let slice = data.slice_rows(1, 2).unwrap();
        assert_eq!(slice.columns(), 2);
        assert_eq!(slice.values(), &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_scale() {
        let mut data = SeriesData::single(vec![1.0, 2.0]);
        data.scale(2.5);
        assert_eq!(data.values(), &[2.5, 5.0]);
    }

    #[test]
    fn test_serde_shape() {
        let data = SeriesData::new(vec![1.0, 2.0], 2).unwrap();
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["columns"], 2);
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let err = serde_json::from_str::<SeriesData>(r#"{"values":[1.0],"columns":0}"#);
        assert!(err.is_err());

        let err = serde_json::from_str::<SeriesData>(r#"{"values":[1.0,2.0,3.0],"columns":2}"#);
        assert!(err.is_err());

        let data: SeriesData =
            serde_json::from_str(r#"{"values":[1.0,2.0,3.0,4.0],"columns":2}"#).unwrap();
        assert_eq!(data.rows(), 2);
        assert_eq!(data.row(1), Some(&[3.0, 4.0][..]));
    }
}
