//! Diversity Distributor
//!
//! Reorders a ranked feed so no single content type dominates it.
//!
//! 1. **Group** items into producer/event/user/other buckets, keeping rank order
//! 2. **Target distribution**: default fractions, or the viewer's observed
//!    engagement mix with per-type floors, capped by what each bucket can supply
//! 3. **Target counts**: round fractions to item counts, trimming overshoot
//! 4. **Interleave** buckets round-robin until quotas are spent, then append
//!    whatever is left
//!
//! Items are only reordered: output length and per-type counts equal the input.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use super::model::{ContentType, PerType, Typed, Viewer};

/// Distribution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Target mix when the viewer has no engagement history
    pub default_fractions: PerType<f64>,
    /// Minimum share per type once the mix comes from engagement history
    pub floors: PerType<f64>,
    /// Feeds with at most this many items are returned as ranked
    pub min_items: usize,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            default_fractions: PerType {
                producer: 0.35,
                event: 0.35,
                user: 0.25,
                other: 0.05,
            },
            floors: PerType {
                producer: 0.15,
                event: 0.15,
                user: 0.10,
                other: 0.0,
            },
            min_items: 3,
        }
    }
}

/// Target share and item count per content type for one feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionPlan {
    pub fractions: PerType<f64>,
    pub counts: PerType<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DiversityDistributor {
    config: DistributionConfig,
}

impl DiversityDistributor {
    pub fn new(config: DistributionConfig) -> Self {
        Self { config }
    }

    /// Reorder `ranked` for type diversity, preserving rank within each type
    pub fn diversify<T: Typed>(&self, ranked: Vec<T>, viewer: &Viewer) -> Vec<T> {
        if ranked.len() <= self.config.min_items {
            return ranked;
        }

        let total = ranked.len();
        let groups = group(ranked);
        let sizes = groups.map(|_, bucket| bucket.len());
        let plan = self.plan(&sizes, &viewer.engagement_stats);

        debug!(
            viewer_id = %viewer.id,
            total,
            producer = plan.counts.producer,
            event = plan.counts.event,
            user = plan.counts.user,
            other = plan.counts.other,
            "diversity quotas"
        );

        interleave(groups, plan.counts)
    }

    /// Compute target fractions and counts for the given bucket sizes
    pub fn plan(&self, sizes: &PerType<usize>, engagement: &PerType<u64>) -> DistributionPlan {
        let total = sizes.sum();
        let fractions = self.target_distribution(sizes, engagement);
        let counts = target_counts(&fractions, total);
        DistributionPlan { fractions, counts }
    }

    fn target_distribution(&self, sizes: &PerType<usize>, engagement: &PerType<u64>) -> PerType<f64> {
        let mut fractions = self.config.default_fractions;

        let engaged = engagement.sum();
        if engaged > 0 {
            fractions = engagement.map(|t, count| {
                (*count as f64 / engaged as f64).max(self.config.floors[t])
            });
            normalize(&mut fractions);
        }

        let total = sizes.sum();
        if total == 0 {
            return fractions;
        }

        // Can't target more of a type than there is
        for t in ContentType::ALL {
            let available = sizes[t] as f64 / total as f64;
            fractions[t] = fractions[t].min(available);
        }

        if fractions.sum() > 0.0 {
            normalize(&mut fractions);
        } else {
            fractions = sizes.map(|_, n| *n as f64 / total as f64);
        }
        fractions
    }
}

/// Split items into per-type buckets, keeping their relative order
pub fn group<T: Typed>(items: Vec<T>) -> PerType<VecDeque<T>> {
    let mut groups: PerType<VecDeque<T>> = PerType::from_fn(|_| VecDeque::new());
    for item in items {
        groups[item.content_type()].push_back(item);
    }
    groups
}

/// Round fractions to counts; if rounding overshoots, scale down and hand the
/// shortfall to the most under-served types
pub fn target_counts(fractions: &PerType<f64>, total: usize) -> PerType<usize> {
    let mut counts = fractions.map(|_, f| (f * total as f64).round() as usize);

    let rounded_sum = counts.sum();
    if rounded_sum > total {
        let factor = total as f64 / rounded_sum as f64;
        counts = counts.map(|_, c| (*c as f64 * factor).floor() as usize);

        let shortfall = total - counts.sum();
        if shortfall > 0 {
            let mut gaps: Vec<(ContentType, f64)> = ContentType::ALL
                .into_iter()
                .map(|t| (t, fractions[t] - counts[t] as f64 / total as f64))
                .collect();
            gaps.sort_by(|a, b| b.1.total_cmp(&a.1));

            for i in 0..shortfall {
                counts[gaps[i % gaps.len()].0] += 1;
            }
        }
    }

    counts
}

/// Round-robin over `ContentType::ALL`, taking the next item of a type while it
/// has quota left. Stops once quotas are spent (or no pass can make progress)
/// and appends the leftovers bucket by bucket.
pub fn interleave<T>(mut groups: PerType<VecDeque<T>>, quotas: PerType<usize>) -> Vec<T> {
    let total: usize = groups.iter().map(|(_, g)| g.len()).sum();
    let mut remaining = quotas;
    let mut out = Vec::with_capacity(total);

    loop {
        let mut progressed = false;
        for t in ContentType::ALL {
            if remaining[t] == 0 {
                continue;
            }
            if let Some(item) = groups[t].pop_front() {
                out.push(item);
                remaining[t] -= 1;
                progressed = true;
            }
        }

        if remaining.sum() == 0 || !progressed {
            break;
        }
    }

    for t in ContentType::ALL {
        out.extend(groups[t].drain(..));
    }
    out
}

fn normalize(fractions: &mut PerType<f64>) {
    let sum = fractions.sum();
    if sum > 0.0 {
        for t in ContentType::ALL {
            fractions[t] /= sum;
        }
    }
}
