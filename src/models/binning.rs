//! Квантование признаков для деревьев

use ndarray::ArrayView2;

/// Upper bound on bins per feature.
pub const MAX_BINS: usize = 255;

/// Column-major bin indices plus the borders that produced them.
///
/// A value lands in bin `b` when exactly `b` borders are strictly below it,
/// so `bin <= b` is the same predicate as `value <= borders[b]`.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    n_rows: usize,
    borders: Vec<Vec<f64>>,
    bins: Vec<u16>,
}

impl BinnedMatrix {
    pub fn new(x: ArrayView2<f64>, max_bins: usize) -> Self {
        let n_rows = x.nrows();
        let max_bins = max_bins.clamp(2, MAX_BINS);
        let mut borders = Vec::with_capacity(x.ncols());
        let mut bins = Vec::with_capacity(n_rows * x.ncols());

        for column in x.columns() {
            let feature_borders = Self::borders_for(column.iter().copied(), max_bins);
            bins.extend(column.iter().map(|&v| Self::locate(&feature_borders, v)));
            borders.push(feature_borders);
        }

        Self {
            n_rows,
            borders,
            bins,
        }
    }

    fn borders_for(values: impl Iterator<Item = f64>, max_bins: usize) -> Vec<f64> {
        let mut sorted: Vec<f64> = values.filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);

        let mut distinct = sorted.clone();
        distinct.dedup();

        if distinct.len() <= max_bins {
            return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
        }

        // Квантильные границы; граница, равная максимуму столбца, дала бы пустой бин.
        let last = sorted[sorted.len() - 1];
        let mut quantiles: Vec<f64> = (1..max_bins)
            .map(|k| sorted[k * sorted.len() / max_bins])
            .filter(|&b| b < last)
            .collect();
        quantiles.dedup();
        quantiles
    }

    fn locate(borders: &[f64], value: f64) -> u16 {
        borders.partition_point(|&b| b < value) as u16
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.borders.len()
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.borders[feature].len() + 1
    }

    #[inline]
    pub fn bin(&self, row: usize, feature: usize) -> usize {
        self.bins[feature * self.n_rows + row] as usize
    }

    /// Raw threshold of the split `bin <= border`.
    pub fn threshold(&self, feature: usize, border: usize) -> f64 {
        self.borders[feature][border]
    }

    /// Rows ordered by bin for one feature; ties keep row order.
    pub fn rows_by_bin(&self, feature: usize) -> Vec<usize> {
        let column = &self.bins[feature * self.n_rows..(feature + 1) * self.n_rows];
        let mut rows: Vec<usize> = (0..self.n_rows).collect();
        rows.sort_by_key(|&row| column[row]);
        rows
    }
}
