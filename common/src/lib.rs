pub use eyre::Result;
use std::{fmt::Debug, hash::Hash, iter, vec};

/// Pairs produced by a mapper for a single input record.
///
/// A mapper states explicitly whether it produced one pair or a list of
/// pairs, so a value that happens to look like a pair is never mistaken for
/// several of them.
#[derive(Debug, Clone, PartialEq)]
pub enum Emit<K, V> {
    Single(K, V),
    Multiple(Vec<(K, V)>),
}

impl<K, V> Emit<K, V> {
    /// A record that contributes nothing.
    pub fn none() -> Self {
        Emit::Multiple(Vec::new())
    }

    pub fn len(&self) -> usize {
        match self {
            Emit::Single(..) => 1,
            Emit::Multiple(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> From<(K, V)> for Emit<K, V> {
    fn from((k, v): (K, V)) -> Self {
        Emit::Single(k, v)
    }
}

impl<K, V> From<Vec<(K, V)>> for Emit<K, V> {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Emit::Multiple(pairs)
    }
}

pub enum IntoIter<K, V> {
    Single(iter::Once<(K, V)>),
    Multiple(vec::IntoIter<(K, V)>),
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            IntoIter::Single(once) => once.next(),
            IntoIter::Multiple(pairs) => pairs.next(),
        }
    }
}

impl<K, V> IntoIterator for Emit<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Emit::Single(k, v) => IntoIter::Single(iter::once((k, v))),
            Emit::Multiple(pairs) => IntoIter::Multiple(pairs.into_iter()),
        }
    }
}

/// A map/reduce application: one mapper and one reducer over a record type.
///
/// Keys are a single concrete type per application, so two keys only collide
/// when they are equal as values of that type.
pub trait App: Debug + Send + Sync {
    type Record;
    type Key: Eq + Hash + Clone + Debug;
    type Value: Clone + Debug;
    type Output: Debug;

    /// `position` is 1-based.
    fn map(&self, record: &Self::Record, position: usize) -> Result<Emit<Self::Key, Self::Value>>;
    fn reduce(&self, key: &Self::Key, values: &[Self::Value]) -> Result<Self::Output>;
}

/// Values the batch merge knows how to add up.
///
/// `None` means the value is not a number and is left out of the sum.
pub trait Numeric {
    fn as_f64(&self) -> Option<f64>;
}

macro_rules! impl_numeric {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                fn as_f64(&self) -> Option<f64> {
                    Some(*self as f64)
                }
            }
        )*
    };
}

impl_numeric!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: Numeric> Numeric for Option<T> {
    fn as_f64(&self) -> Option<f64> {
        self.as_ref().and_then(Numeric::as_f64)
    }
}

impl Numeric for String {
    fn as_f64(&self) -> Option<f64> {
        None
    }
}

impl Numeric for &str {
    fn as_f64(&self) -> Option<f64> {
        None
    }
}

pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_preserves_order() {
        let emit: Emit<&str, i32> = vec![("sum", 5), ("count", 1)].into();
        assert_eq!(emit.len(), 2);
        assert_eq!(
            emit.into_iter().collect::<Vec<_>>(),
            vec![("sum", 5), ("count", 1)]
        );
    }

    #[test]
    fn single_pair_is_not_split() {
        // a pair whose value is itself a pair stays one pair
        let emit: Emit<&str, (&str, i32)> = ("k", ("inner", 1)).into();
        assert_eq!(emit.len(), 1);
        assert_eq!(emit.into_iter().collect::<Vec<_>>(), vec![("k", ("inner", 1))]);
    }

    #[test]
    fn empty_emit() {
        let emit = Emit::<String, u32>::none();
        assert!(emit.is_empty());
        assert_eq!(emit.into_iter().count(), 0);
    }

    #[test]
    fn numeric() {
        assert_eq!(3u32.as_f64(), Some(3.0));
        assert_eq!((-2i64).as_f64(), Some(-2.0));
        assert_eq!(Some(1.5f64).as_f64(), Some(1.5));
        assert_eq!(None::<u8>.as_f64(), None);
        assert_eq!("x".as_f64(), None);
        assert_eq!(String::from("7").as_f64(), None);
    }
}
