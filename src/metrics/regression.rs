pub struct RegressionMetrics;

impl RegressionMetrics {
    pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
        let sum: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
        sum / y_true.len() as f64
    }

    pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
        let sum: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
        sum / y_true.len() as f64
    }

    pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
        Self::mse(y_true, y_pred).sqrt()
    }

    /// Coefficient of determination. A constant target with a perfect
    /// prediction scores 1, with any error 0.
    pub fn r2(y_true: &[f64], y_pred: &[f64]) -> f64 {
        let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
        let ssr: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (p - t).powi(2)).sum();
        let sst: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
        if sst == 0.0 {
            return if ssr == 0.0 { 1.0 } else { 0.0 };
        }
        1.0 - ssr / sst
    }

    /// Pearson correlation; 0 when either side has no variance.
    pub fn pearson(y_true: &[f64], y_pred: &[f64]) -> f64 {
        let n = y_true.len() as f64;
        let mean_t = y_true.iter().sum::<f64>() / n;
        let mean_p = y_pred.iter().sum::<f64>() / n;
        let mut cov = 0.0;
        let mut var_t = 0.0;
        let mut var_p = 0.0;
        for (t, p) in y_true.iter().zip(y_pred) {
            cov += (t - mean_t) * (p - mean_p);
            var_t += (t - mean_t).powi(2);
            var_p += (p - mean_p).powi(2);
        }
        if var_t == 0.0 || var_p == 0.0 {
            return 0.0;
        }
        cov / (var_t.sqrt() * var_p.sqrt())
    }
}
