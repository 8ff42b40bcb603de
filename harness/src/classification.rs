//! Weighted classification metrics over integer class labels.
//!
//! Labels are the union of the classes present in the targets and the
//! predictions. Each class is weighted by its support in the targets, and a
//! zero denominator contributes 0 instead of NaN.

use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ClassCounts {
    true_positives: usize,
    false_positives: usize,
    false_negatives: usize,
    support: usize,
}

impl ClassCounts {
    fn recall(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    fn precision(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }
}

#[inline]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Per-class confusion counts, ordered by label.
#[derive(Clone, Debug, Default)]
pub struct ConfusionCounts {
    classes: BTreeMap<i64, ClassCounts>,
    total: usize,
}

impl ConfusionCounts {
    pub fn from_labels(predictions: &[i64], targets: &[i64]) -> Self {
        let mut classes: BTreeMap<i64, ClassCounts> = BTreeMap::new();

        for (&pred, &target) in predictions.iter().zip(targets) {
            classes.entry(target).or_default().support += 1;

            if pred == target {
                classes.entry(target).or_default().true_positives += 1;
            } else {
                classes.entry(target).or_default().false_negatives += 1;
                classes.entry(pred).or_default().false_positives += 1;
            }
        }

        Self {
            classes,
            total: predictions.len().min(targets.len()),
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = i64> + '_ {
        self.classes.keys().copied()
    }

    pub fn support(&self, label: i64) -> usize {
        self.classes.get(&label).map_or(0, |c| c.support)
    }

    pub fn weighted_recall(&self) -> f64 {
        self.weighted(ClassCounts::recall)
    }

    pub fn weighted_precision(&self) -> f64 {
        self.weighted(ClassCounts::precision)
    }

    pub fn weighted_f1(&self) -> f64 {
        self.weighted(ClassCounts::f1)
    }

    fn weighted(&self, metric: fn(&ClassCounts) -> f64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        let sum: f64 = self
            .classes
            .values()
            .map(|c| metric(c) * c.support as f64)
            .sum();

        sum / self.total as f64
    }
}

/// Maps a float label (as produced by rounding a sigmoid output) to a class id.
#[inline]
pub fn to_label(value: f32) -> i64 {
    value.round() as i64
}

pub fn weighted_recall(predictions: &[i64], targets: &[i64]) -> f64 {
    ConfusionCounts::from_labels(predictions, targets).weighted_recall()
}

pub fn weighted_f1(predictions: &[i64], targets: &[i64]) -> f64 {
    ConfusionCounts::from_labels(predictions, targets).weighted_f1()
}
