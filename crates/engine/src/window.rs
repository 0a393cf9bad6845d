//! Rolling window of completed volume buckets.

use std::collections::VecDeque;
use vpin_core::VolumeBucket;

/// Trailing window of completed buckets over which VPIN is computed.
#[derive(Debug, Clone)]
pub struct ImbalanceWindow {
    /// Maximum buckets kept.
    window_size: usize,
    /// Completed buckets, oldest first.
    buckets: VecDeque<VolumeBucket>,
    /// Last emitted VPIN.
    last_vpin: Option<f64>,
}

impl ImbalanceWindow {
    /// Create an empty window.
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            buckets: VecDeque::with_capacity(window_size + 1),
            last_vpin: None,
        }
    }

    /// Append a completed bucket and recompute VPIN.
    ///
    /// Evicts the oldest bucket once the window is over capacity. Returns
    /// `None` while the window holds no volume, in which case the previous
    /// VPIN is kept.
    pub fn push(&mut self, bucket: VolumeBucket) -> Option<f64> {
        self.buckets.push_back(bucket);
        if self.buckets.len() > self.window_size {
            self.buckets.pop_front();
        }

        // Full recompute; sums are not maintained across evictions.
        let (total_imbalance, total_volume) = self.totals();
        if total_volume > 0.0 {
            let vpin = total_imbalance / total_volume;
            self.last_vpin = Some(vpin);
            Some(vpin)
        } else {
            None
        }
    }

    /// Sum of imbalances and sum of volumes over the window.
    pub fn totals(&self) -> (f64, f64) {
        self.buckets
            .iter()
            .fold((0.0, 0.0), |(imb, vol), b| (imb + b.imbalance, vol + b.volume))
    }

    /// Last emitted VPIN, if any.
    pub fn last_vpin(&self) -> Option<f64> {
        self.last_vpin
    }

    /// Number of buckets in the window.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the window holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Whether the window has reached its capacity.
    pub fn is_full(&self) -> bool {
        self.buckets.len() == self.window_size
    }

    /// Window capacity.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Buckets in arrival order.
    pub fn buckets(&self) -> impl Iterator<Item = &VolumeBucket> {
        self.buckets.iter()
    }

    /// Clear all buckets and the last VPIN.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.last_vpin = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bucket(imbalance: f64, volume: f64) -> VolumeBucket {
        VolumeBucket { imbalance, volume }
    }

    #[test]
    fn test_single_bucket() {
        let mut window = ImbalanceWindow::new(3);
        let vpin = window.push(bucket(30.0, 120.0)).unwrap();
        assert_relative_eq!(vpin, 0.25);
        assert_eq!(window.len(), 1);
        assert_eq!(window.last_vpin(), Some(vpin));
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        let size = 5;
        let mut window = ImbalanceWindow::new(size);
        for i in 0..=size {
            window.push(bucket(i as f64, 100.0 + i as f64));
        }

        assert_eq!(window.len(), size);
        assert!(window.is_full());
        let imbalances: Vec<f64> = window.buckets().map(|b| b.imbalance).collect();
        assert_eq!(imbalances, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_vpin_over_window() {
        let mut window = ImbalanceWindow::new(2);
        window.push(bucket(110.0, 110.0));
        window.push(bucket(100.0, 100.0));
        let vpin = window.push(bucket(0.0, 200.0)).unwrap();
        assert_relative_eq!(vpin, 100.0 / 300.0);
        assert_eq!(window.totals(), (100.0, 300.0));
    }

    #[test]
    fn test_zero_volume_keeps_last_vpin() {
        let mut window = ImbalanceWindow::new(1);
        assert!(window.push(bucket(0.0, 0.0)).is_none());
        assert_eq!(window.last_vpin(), None);

        window.push(bucket(5.0, 10.0));
        assert_eq!(window.last_vpin(), Some(0.5));

        assert!(window.push(bucket(0.0, 0.0)).is_none());
        assert_eq!(window.last_vpin(), Some(0.5));
    }

    #[test]
    fn test_clear() {
        let mut window = ImbalanceWindow::new(4);
        window.push(bucket(1.0, 2.0));
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.last_vpin(), None);
    }
}
