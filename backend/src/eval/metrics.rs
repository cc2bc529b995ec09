//! Model performance over the session table.
//!
//! HOAX is the positive class. Every ratio with a zero denominator is
//! reported as 0.0 rather than NaN, so an empty table or a degenerate
//! prediction set never leaks NaN into the API.

use shared::{ConfusionCounts, EvaluationReport, Label};

/// Count (detection, ground truth) pairs into a binary confusion matrix.
pub fn tally<I>(pairs: I) -> ConfusionCounts
where
    I: IntoIterator<Item = (Label, Label)>,
{
    let mut counts = ConfusionCounts::default();
    for (detection, truth) in pairs {
        match (detection, truth) {
            (Label::Hoax, Label::Hoax) => counts.tp += 1,
            (Label::NonHoax, Label::NonHoax) => counts.tn += 1,
            (Label::Hoax, Label::NonHoax) => counts.fp += 1,
            (Label::NonHoax, Label::Hoax) => counts.fn_ += 1,
        }
    }
    counts
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn accuracy(c: &ConfusionCounts) -> f64 {
    ratio(c.tp + c.tn, c.tp + c.tn + c.fp + c.fn_)
}

pub fn precision(c: &ConfusionCounts) -> f64 {
    ratio(c.tp, c.tp + c.fp)
}

pub fn recall(c: &ConfusionCounts) -> f64 {
    ratio(c.tp, c.tp + c.fn_)
}

pub fn f1_score(c: &ConfusionCounts) -> f64 {
    let p = precision(c);
    let r = recall(c);
    if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
}

pub fn report(counts: ConfusionCounts) -> EvaluationReport {
    EvaluationReport {
        accuracy: accuracy(&counts),
        precision: precision(&counts),
        recall: recall(&counts),
        f1: f1_score(&counts),
        support: counts.tp + counts.tn + counts.fp + counts.fn_,
        confusion: counts,
    }
}
