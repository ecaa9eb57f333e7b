// analytics/engine.rs
//
// Per-symbol rolling statistics over a bounded ring of the most recent
// samples. The registry lock is only taken to look up or create a window;
// each window has its own lock so distinct symbols never contend.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use ticker_common::types::RollingMetrics;

/// Fixed-capacity ring of `(price, volume)` samples, indexed off a write
/// cursor so nothing ever shifts. Once full, the oldest sample is
/// overwritten.
struct RollingWindow {
    prices: Vec<f64>,
    volumes: Vec<f64>,
    pos: usize,
    full: bool,
}

impl RollingWindow {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            prices: vec![0.0; capacity],
            volumes: vec![0.0; capacity],
            pos: 0,
            full: false,
        }
    }

    fn capacity(&self) -> usize {
        self.prices.len()
    }

    fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            self.pos
        }
    }

    fn push(&mut self, price: f64, volume: f64) {
        self.prices[self.pos] = price;
        self.volumes[self.pos] = volume;
        self.pos = (self.pos + 1) % self.capacity();
        if self.pos == 0 {
            self.full = true;
        }
    }

    fn vwap(&self) -> f64 {
        let mut sum_pv = 0.0;
        let mut sum_v = 0.0;
        for i in 0..self.len() {
            sum_pv += self.prices[i] * self.volumes[i];
            sum_v += self.volumes[i];
        }
        if sum_v == 0.0 {
            return 0.0;
        }
        sum_pv / sum_v
    }

    fn volatility(&self) -> f64 {
        let count = self.len();
        if count == 0 {
            return 0.0;
        }
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for i in 0..count {
            sum += self.prices[i];
            sum_sq += self.prices[i] * self.prices[i];
        }
        let mean = sum / count as f64;
        let variance = sum_sq / count as f64 - mean * mean;
        // Floating-point cancellation can push the computed variance
        // slightly negative.
        if variance < 0.0 {
            return 0.0;
        }
        variance.sqrt()
    }

    /// Index of the oldest live sample.
    fn first_index(&self) -> usize {
        (self.pos + self.capacity() - self.len()) % self.capacity()
    }

    /// Index of the newest live sample.
    fn last_index(&self) -> usize {
        (self.pos + self.capacity() - 1) % self.capacity()
    }

    fn change_pct(values: &[f64], first: usize, last: usize) -> f64 {
        if values[first] == 0.0 {
            return 0.0;
        }
        (values[last] - values[first]) / values[first] * 100.0
    }

    fn price_change(&self) -> f64 {
        if self.len() < 2 {
            return 0.0;
        }
        Self::change_pct(&self.prices, self.first_index(), self.last_index())
    }

    fn volume_change(&self) -> f64 {
        if self.len() < 2 {
            return 0.0;
        }
        Self::change_pct(&self.volumes, self.first_index(), self.last_index())
    }
}

/// Rolling metrics engine: one window per symbol, created on first
/// observation and kept for the life of the process.
pub struct AnalyticsEngine {
    windows: Mutex<HashMap<String, Arc<Mutex<RollingWindow>>>>,
    window_size: usize,
}

impl AnalyticsEngine {
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "window size must be > 0");
        Self {
            windows: Mutex::new(HashMap::new()),
            window_size,
        }
    }

    /// Append one sample and return the metrics over the live window.
    ///
    /// The snapshot is a plain value; nothing in it points back into the
    /// window.
    pub fn process(&self, symbol: &str, price: f64, volume: f64) -> RollingMetrics {
        let window = {
            let mut windows = self.windows.lock();
            windows
                .entry(symbol.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(RollingWindow::with_capacity(self.window_size))))
                .clone()
        };

        let mut window = window.lock();
        window.push(price, volume);

        RollingMetrics {
            symbol: symbol.to_string(),
            vwap: window.vwap(),
            volatility: window.volatility(),
            price_change: window.price_change(),
            volume_change: window.volume_change(),
        }
    }

    /// Number of live samples for a symbol (0 if never observed).
    pub fn sample_count(&self, symbol: &str) -> usize {
        let window = { self.windows.lock().get(symbol).cloned() };
        window.map(|w| w.lock().len()).unwrap_or(0)
    }
}
