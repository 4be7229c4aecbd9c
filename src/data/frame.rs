use super::Matrix;
use crate::error::{Result, SymbindError};
use polars::prelude::*;

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::Int16
            | DataType::Int8
            | DataType::UInt64
            | DataType::UInt32
            | DataType::UInt16
            | DataType::UInt8
            | DataType::Boolean
    )
}

fn column_values(column: &Column) -> Result<Vec<f64>> {
    let name = column.name().to_string();
    if !is_numeric(column.dtype()) {
        return Err(SymbindError::Marshal(format!(
            "column '{}' has non-numeric type {}",
            name,
            column.dtype()
        )));
    }
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.ok_or_else(|| {
                SymbindError::Marshal(format!("column '{}' has a missing value at row {}", name, i))
            })
        })
        .collect()
}

/// Splits a frame into a feature matrix, a target vector and the feature
/// names, in column order. Every cell must be numeric and present.
pub fn split_frame(df: &DataFrame, target: &str) -> Result<(Matrix, Vec<f64>, Vec<String>)> {
    let y = column_values(df.column(target)?)?;

    let mut names = Vec::new();
    let mut columns = Vec::new();
    for column in df.get_columns() {
        if column.name().as_str() == target {
            continue;
        }
        names.push(column.name().to_string());
        columns.push(column_values(column)?);
    }

    let x = if columns.is_empty() {
        Matrix::with_rows(df.height())
    } else {
        Matrix::from_columns(columns)?
    };
    log::debug!(
        "Split frame into {}x{} features and target '{}'",
        x.n_rows(),
        x.n_cols(),
        target
    );
    Ok((x, y, names))
}

/// Converts every column of the frame into a feature matrix.
pub fn frame_to_matrix(df: &DataFrame) -> Result<(Matrix, Vec<String>)> {
    let mut names = Vec::new();
    let mut columns = Vec::new();
    for column in df.get_columns() {
        names.push(column.name().to_string());
        columns.push(column_values(column)?);
    }
    let x = if columns.is_empty() {
        Matrix::with_rows(df.height())
    } else {
        Matrix::from_columns(columns)?
    };
    Ok((x, names))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_frame() {
        let df = df! {
            "a" => [0.0, 1.0, 2.0],
            "y" => [0.0, 2.0, 4.0],
            "b" => [1i64, 2, 3],
        }
        .unwrap();
        let (x, y, names) = split_frame(&df, "y").unwrap();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(y, vec![0.0, 2.0, 4.0]);
        assert_eq!(x.row(2).unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn test_string_column_rejected() {
        let df = df! {
            "a" => ["x", "y"],
            "y" => [0.0, 1.0],
        }
        .unwrap();
        assert!(matches!(split_frame(&df, "y"), Err(SymbindError::Marshal(_))));
    }

    #[test]
    fn test_missing_value_rejected() {
        let df = df! {
            "a" => [Some(1.0), None],
        }
        .unwrap();
        assert!(matches!(frame_to_matrix(&df), Err(SymbindError::Marshal(_))));
    }
}
