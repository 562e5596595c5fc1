use itertools::Itertools;
use log::warn;

use crate::{
    data_table::FeatureTable,
    error::{EvaluationError, Result},
};

/// Mean of the known values of every feature column.
pub fn column_means(table: &FeatureTable) -> Result<Vec<f64>> {
    table
        .list_columns()
        .iter()
        .enumerate()
        .map(|(j, feature)| {
            let known = table.column_values(j).iter().flatten().copied().collect_vec();
            if known.is_empty() {
                Err(EvaluationError::DataIntegrity(format!(
                    "feature '{feature}' has no value for any instance"
                )))
            } else {
                Ok(known.iter().sum::<f64>() / known.len() as f64)
            }
        })
        .collect()
}

/// Copy of `table` with every missing value replaced by its column mean.
pub fn impute_missing_values(table: &FeatureTable) -> Result<FeatureTable> {
    let mut imputed = table.clone();
    if !table.has_missing_values() {
        return Ok(imputed);
    }
    warn!(
        "There are missing values in the feature data, they are imputed with the mean of all other non-missing values"
    );
    let means = column_means(table)?;
    for (i, instance) in table.list_rows().iter().enumerate() {
        for (j, feature) in table.list_columns().iter().enumerate() {
            if table.value_at(i, j).is_none() {
                imputed.set(instance, feature, means[j])?;
            }
        }
    }
    Ok(imputed)
}

/// Feature values of `instance` in column order, missing values imputed.
pub fn feature_vector(table: &FeatureTable, instance: &str) -> Result<Vec<f64>> {
    let position = table.row_position(instance).ok_or_else(|| {
        EvaluationError::DataIntegrity(format!(
            "no feature data for instance '{instance}'"
        ))
    })?;
    let row = table.row_values(position);
    if row.iter().all(Option::is_some) {
        return Ok(row.iter().flatten().copied().collect());
    }
    let means = column_means(table)?;
    Ok(row
        .iter()
        .zip(means)
        .map(|(value, mean)| value.unwrap_or(mean))
        .collect())
}

/// Space separated feature vector as passed on a selector's command line.
pub fn feature_vector_string(vector: &[f64]) -> String {
    vector.iter().join(" ")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn features() -> FeatureTable {
        FeatureTable::load(&PathBuf::from("data/test/feature_data.csv")).unwrap()
    }

    #[test]
    fn test_feature_vector() {
        let table = features();
        assert_eq!(feature_vector(&table, "i1").unwrap(), vec![0.0, 0.5]);
        // f2 is missing for i2 and falls back to the mean of f2
        assert_eq!(feature_vector(&table, "i2").unwrap(), vec![1.0, 0.5]);
        assert!(matches!(
            feature_vector(&table, "i9"),
            Err(EvaluationError::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_impute_missing_values() {
        let table = features();
        assert!(table.has_missing_values());
        let imputed = impute_missing_values(&table).unwrap();
        assert!(!imputed.has_missing_values());
        assert_eq!(imputed.get("i2", "f2").unwrap(), Some(0.5));
        assert_eq!(table.get("i2", "f2").unwrap(), None);
    }

    #[test]
    fn test_empty_feature_column() {
        let table = FeatureTable::from_rows(
            &["i1", "i2"],
            &["f1", "f2"],
            vec![vec![Some(1.0), None], vec![Some(2.0), None]],
        )
        .unwrap();
        assert!(column_means(&table).is_err());
        assert!(impute_missing_values(&table).is_err());
    }

    #[test]
    fn test_feature_vector_string() {
        assert_eq!(feature_vector_string(&[1.0, 0.25, -3.0]), "1 0.25 -3");
    }
}
