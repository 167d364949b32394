//! Synthetic price path and its read cursor.

use rand::Rng;

use crate::types::XenithError;

/// Lowest price the random walk may reach.
pub const PRICE_FLOOR: f64 = 1.0;

/// Generate a driftless multiplicative random walk.
///
/// `vol` is the total width (in percent) of the uniform per-step shock.
pub fn generate_price_path<R: Rng>(points: usize, start: f64, vol: f64, rng: &mut R) -> Vec<f64> {
    if points == 0 {
        return Vec::new();
    }
    let mut path = Vec::with_capacity(points);
    path.push(start.max(PRICE_FLOOR));
    for i in 1..points {
        let shock = (rng.gen::<f64>() - 0.5) * vol;
        let next = path[i - 1] * (1.0 + shock / 100.0);
        path.push(next.max(PRICE_FLOOR));
    }
    path
}

/// A read-only price sequence consumed one step at a time.
///
/// The cursor never passes the last element; once exhausted the series
/// keeps returning its final price.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    prices: Vec<f64>,
    cursor: usize,
}

impl PriceSeries {
    pub fn new(prices: Vec<f64>) -> Result<Self, XenithError> {
        if prices.is_empty() {
            return Err(XenithError::Config("price series must not be empty".into()));
        }
        if let Some(bad) = prices.iter().find(|p| !p.is_finite() || **p <= 0.0) {
            return Err(XenithError::Config(format!("price series contains non-positive price {bad}")));
        }
        Ok(Self { prices, cursor: 0 })
    }

    /// Price at the cursor, then move the cursor forward (clamped).
    pub fn advance(&mut self) -> f64 {
        let price = self.prices[self.cursor];
        self.cursor = (self.cursor + 1).min(self.prices.len() - 1);
        price
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }
}
