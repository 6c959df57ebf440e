use serde::Serialize;

/// Time-frequency energy grid plus its two axis projections.
///
/// `matrix` is indexed `[frequency_bin][time_step]`. Values are one-sided
/// power spectral density at absolute scale; nothing is normalized.
#[derive(Clone, Debug, Serialize)]
pub struct SpectrogramResult {
    /// Bin centre frequencies in Hz, ascending from 0 to Nyquist
    pub frequencies: Vec<f64>,
    /// Window centre times in seconds, ascending
    pub time_steps: Vec<f64>,
    pub matrix: Vec<Vec<f64>>,
    /// Energy per frequency bin, summed over time
    pub frequency_profile: Vec<f64>,
    /// Energy per time step, summed over frequency
    pub temporal_profile: Vec<f64>,
}

impl SpectrogramResult {
    /// Builds the result from per-window spectra given in time order.
    pub(crate) fn from_columns(frequencies: Vec<f64>, time_steps: Vec<f64>, columns: Vec<Vec<f64>>) -> Self {
        let bins = frequencies.len();
        let mut matrix = vec![vec![0.0; columns.len()]; bins];
        for (t, column) in columns.iter().enumerate() {
            for (f, &energy) in column.iter().enumerate() {
                matrix[f][t] = energy;
            }
        }

        let frequency_profile: Vec<f64> = matrix.iter().map(|row| row.iter().sum::<f64>()).collect();
        let temporal_profile: Vec<f64> = columns.iter().map(|column| column.iter().sum::<f64>()).collect();

        Self {
            frequencies,
            time_steps,
            matrix,
            frequency_profile,
            temporal_profile,
        }
    }

    pub fn frequency_bins(&self) -> usize {
        self.frequencies.len()
    }

    pub fn time_step_count(&self) -> usize {
        self.time_steps.len()
    }

    /// Mean energy over the finite cells of the matrix.
    ///
    /// A float container may carry `inf`/NaN samples; those cells are skipped.
    pub fn mean(&self) -> f64 {
        let (total, cells) = self
            .matrix
            .iter()
            .flatten()
            .filter(|v| v.is_finite())
            .fold((0.0_f64, 0_usize), |(sum, n), &v| (sum + v, n + 1));
        if cells == 0 {
            return 0.0;
        }
        total / cells as f64
    }

    /// Upper bound for heat-map colouring: `multiple` times the mean energy.
    ///
    /// Always finite and non-negative; anything else collapses to 0.
    pub fn clip_ceiling(&self, multiple: f64) -> f64 {
        let ceiling = self.mean() * multiple;
        if ceiling.is_finite() && ceiling > 0.0 {
            ceiling
        } else {
            0.0
        }
    }

    /// Copy of `matrix` clamped to `[0, clip_ceiling(multiple)]`, so one outlier
    /// cannot wash out the rest of the heat map. NaN cells become 0 and
    /// infinite cells sit at the ceiling.
    pub fn clipped(&self, multiple: f64) -> Vec<Vec<f64>> {
        let ceiling = self.clip_ceiling(multiple);
        self.matrix
            .iter()
            .map(|row| row.iter().map(|&v| v.max(0.0).min(ceiling)).collect())
            .collect()
    }
}
