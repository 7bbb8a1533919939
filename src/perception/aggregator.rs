/// Region aggregation: merges the three detector outputs and suppresses
/// near-duplicates, keeping the larger of any two heavily overlapping boxes.
use std::cmp::Reverse;

use crate::perception::types::Region;

/// Default suppression threshold on intersection / smaller-area.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy)]
pub struct RegionAggregator {
    overlap_threshold: f64,
}

impl Default for RegionAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_OVERLAP_THRESHOLD)
    }
}

impl RegionAggregator {
    pub fn new(overlap_threshold: f64) -> Self {
        Self { overlap_threshold }
    }

    pub fn overlap_threshold(&self) -> f64 {
        self.overlap_threshold
    }

    /// Concatenate colour, edge and text candidates (in that order) and
    /// suppress overlaps.
    pub fn aggregate(&self, color: Vec<Region>, edge: Vec<Region>, text: Vec<Region>) -> Vec<Region> {
        let mut all = color;
        all.extend(edge);
        all.extend(text);
        self.remove_overlaps(all)
    }

    /// Greedy suppression by descending area. A candidate is dropped when
    /// its overlap ratio with any already accepted region exceeds the
    /// threshold. The sort is stable, so equal areas keep input order.
    pub fn remove_overlaps(&self, mut regions: Vec<Region>) -> Vec<Region> {
        regions.sort_by_key(|r| Reverse(r.area()));

        let mut kept: Vec<Region> = Vec::with_capacity(regions.len());
        for candidate in regions {
            let dominated = kept
                .iter()
                .any(|k| candidate.overlap_ratio(k) > self.overlap_threshold);
            if !dominated {
                kept.push(candidate);
            }
        }
        kept
    }
}
