use indexmap::IndexMap;
use std::hash::Hash;

/// Values grouped by key, keys in first-occurrence order.
pub type Shuffled<K, V> = IndexMap<K, Vec<V>>;

/// Summary counts attached by the progress-reporting variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub total_input: usize,
    pub mapped_items: usize,
    pub unique_keys: usize,
    pub result_count: usize,
}

/// Everything one engine call produced: the mapped pairs, the shuffled
/// groups and the reduced results, in that order of derivation.
///
/// Note that `IndexMap` equality ignores ordering, so compare
/// `shuffled.iter()` when the key order matters.
#[derive(Debug, Clone)]
pub struct ResultBundle<K: Hash + Eq, V, A> {
    pub mapped: Vec<(K, V)>,
    pub shuffled: Shuffled<K, V>,
    pub results: Vec<(K, A)>,
    pub stats: Option<Stats>,
}

impl<K: Hash + Eq, V, A> ResultBundle<K, V, A> {
    pub fn new(mapped: Vec<(K, V)>, shuffled: Shuffled<K, V>, results: Vec<(K, A)>) -> Self {
        Self {
            mapped,
            shuffled,
            results,
            stats: None,
        }
    }

    pub fn with_stats(mut self, total_input: usize) -> Self {
        self.stats = Some(Stats {
            total_input,
            mapped_items: self.mapped.len(),
            unique_keys: self.shuffled.len(),
            result_count: self.results.len(),
        });
        self
    }

    /// Aggregate reduced for `key`, if any.
    pub fn result(&self, key: &K) -> Option<&A> {
        self.results
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, aggregate)| aggregate)
    }

    pub fn is_empty(&self) -> bool {
        self.mapped.is_empty() && self.shuffled.is_empty() && self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_reflect_bundle() {
        let mut shuffled = Shuffled::new();
        shuffled.insert("a", vec![1, 2]);
        shuffled.insert("b", vec![3]);
        let bundle = ResultBundle::new(
            vec![("a", 1), ("b", 3), ("a", 2)],
            shuffled,
            vec![("a", 3), ("b", 3)],
        )
        .with_stats(2);

        assert_eq!(
            bundle.stats,
            Some(Stats {
                total_input: 2,
                mapped_items: 3,
                unique_keys: 2,
                result_count: 2,
            })
        );
        assert_eq!(bundle.result(&"a"), Some(&3));
        assert_eq!(bundle.result(&"c"), None);
        assert!(!bundle.is_empty());
    }
}
