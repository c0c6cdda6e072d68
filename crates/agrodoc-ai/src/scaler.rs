//! Per-feature standardization.

use serde::{Deserialize, Serialize};

/// Centers each feature on its training mean and divides by its population
/// standard deviation. Constant features keep a scale of 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major data. All rows must share one length.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len().max(1) as f64;

        let mut mean = vec![0.0; dim];
        for row in rows {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0; dim];
        for row in rows {
            for ((s, &v), &m) in var.iter_mut().zip(row).zip(&mean) {
                *s += (v - m) * (v - m);
            }
        }
        let scale = var
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&v, (&m, &s))| (v - m) / s)
            .collect()
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_to_zero_mean_unit_variance() {
        let rows = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform_all(&rows);

        for col in 0..2 {
            let mean: f64 = scaled.iter().map(|r| r[col]).sum::<f64>() / 3.0;
            let var: f64 = scaled.iter().map(|r| r[col] * r[col]).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_feature_is_only_centered() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 3.0]];
        let scaler = StandardScaler::fit(&rows);
        assert_eq!(scaler.transform(&[5.0, 2.0]), vec![0.0, 0.0]);
        assert_eq!(scaler.transform(&[7.0, 2.0])[0], 2.0);
    }
}
