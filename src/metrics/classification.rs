pub struct ClassificationMetrics;

impl ClassificationMetrics {
    /// Maps raw program outputs to probabilities of class 1.
    pub fn sigmoid(values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| 1.0 / (1.0 + (-v).exp())).collect()
    }

    /// Thresholds probabilities at 0.5 into 0/1 labels.
    pub fn labels(probabilities: &[f64]) -> Vec<f64> {
        probabilities
            .iter()
            .map(|&p| if p > 0.5 { 1.0 } else { 0.0 })
            .collect()
    }

    /// Share of predictions equal to the true label.
    pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
        let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
        hits as f64 / y_true.len() as f64
    }

    /// Binary cross-entropy; predictions are probabilities of class 1,
    /// clipped away from 0 and 1.
    pub fn log_loss(y_true: &[f64], y_pred: &[f64]) -> f64 {
        const EPS: f64 = 1e-15;
        let sum: f64 = y_true
            .iter()
            .zip(y_pred)
            .map(|(t, p)| {
                let p = p.clamp(EPS, 1.0 - EPS);
                -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
            })
            .sum();
        sum / y_true.len() as f64
    }
}
