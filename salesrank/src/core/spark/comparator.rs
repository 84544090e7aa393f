use std::cmp::Ordering;

use crate::{core::rdd::shuffle_rdd::KeyComparator, record::Revenue};

/// Largest revenue first. NaN sorts ahead of every number, `-0.0` after `0.0`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DoubleDecreasing;

impl KeyComparator for DoubleDecreasing {
    type Key = Revenue;

    fn compare(&self, a: &Self::Key, b: &Self::Key) -> Ordering {
        b.0.total_cmp(&a.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverses_natural_order() {
        let cmp = DoubleDecreasing;
        assert_eq!(cmp.compare(&Revenue(250.0), &Revenue(50.0)), Ordering::Less);
        assert_eq!(cmp.compare(&Revenue(50.0), &Revenue(250.0)), Ordering::Greater);
        assert_eq!(cmp.compare(&Revenue(1.5), &Revenue(1.5)), Ordering::Equal);

        let mut keys = vec![Revenue(3.0), Revenue(-2.0), Revenue(10.0), Revenue(0.0)];
        keys.sort_by(|a, b| cmp.compare(a, b));
        let values: Vec<f64> = keys.iter().map(|k| k.0).collect();
        assert_eq!(values, vec![10.0, 3.0, 0.0, -2.0]);
    }
}
