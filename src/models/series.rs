//! Yearly samples and the assembled time series

use serde::Serialize;

/// One year of the series; `value` is absent when that year could not be sampled
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearSample {
    year: i32,
    value: Option<f64>,
}

impl YearSample {
    #[must_use]
    pub fn new(year: i32, value: Option<f64>) -> Self {
        Self { year, value }
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Ordered, gap-free yearly series
///
/// Only the assembler builds these, one entry per requested year in ascending
/// order. The value is immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    samples: Vec<YearSample>,
}

impl TimeSeries {
    pub(crate) fn from_ordered(samples: Vec<YearSample>) -> Self {
        debug_assert!(samples.windows(2).all(|w| w[1].year == w[0].year + 1));
        Self { samples }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &YearSample> {
        self.samples.iter()
    }

    #[must_use]
    pub fn samples(&self) -> &[YearSample] {
        &self.samples
    }

    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        self.samples.iter().map(YearSample::year).collect()
    }

    #[must_use]
    pub fn values(&self) -> Vec<Option<f64>> {
        self.samples.iter().map(YearSample::value).collect()
    }

    /// Number of years with a value
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.samples.iter().filter(|s| s.value.is_some()).count()
    }

    /// Years whose value lies strictly above `threshold`
    #[must_use]
    pub fn years_above(&self, threshold: f64) -> Vec<i32> {
        self.samples
            .iter()
            .filter(|s| s.value.is_some_and(|v| v > threshold))
            .map(YearSample::year)
            .collect()
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a YearSample;
    type IntoIter = std::slice::Iter<'a, YearSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
