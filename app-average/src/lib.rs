use common::{App, Emit, Numeric, Result};
use itertools::{Itertools, MinMaxResult};

pub const AVERAGE: &str = "average";
pub const SUM: &str = "sum";
pub const COUNT: &str = "count";

/// A running total and how many values went into it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Partial {
    pub value: f64,
    pub count: u64,
}

impl Partial {
    pub fn merge(self, other: Partial) -> Partial {
        Partial {
            value: self.value + other.value,
            count: self.count + other.count,
        }
    }

    pub fn mean(&self) -> f64 {
        if self.count > 0 {
            self.value / self.count as f64
        } else {
            0.0
        }
    }
}

// A partial is not a plain number, so a batch merge leaves it out.
impl Numeric for Partial {
    fn as_f64(&self) -> Option<f64> {
        None
    }
}

/// Every number goes to the single key `"average"` as a one-element
/// partial; the reducer merges the partials and takes the mean.
#[derive(Debug, Default)]
pub struct AverageApp;

impl App for AverageApp {
    type Record = f64;
    type Key = &'static str;
    type Value = Partial;
    type Output = f64;

    fn map(&self, number: &f64, _position: usize) -> Result<Emit<&'static str, Partial>> {
        Ok(Emit::Single(
            AVERAGE,
            Partial {
                value: *number,
                count: 1,
            },
        ))
    }

    fn reduce(&self, _key: &&'static str, partials: &[Partial]) -> Result<f64> {
        Ok(partials
            .iter()
            .fold(Partial::default(), |acc, p| acc.merge(*p))
            .mean())
    }
}

/// Emits `("sum", n)` and `("count", 1)` for every number and adds each key
/// up.
#[derive(Debug, Default)]
pub struct SumCountApp;

impl App for SumCountApp {
    type Record = f64;
    type Key = &'static str;
    type Value = f64;
    type Output = f64;

    fn map(&self, number: &f64, _position: usize) -> Result<Emit<&'static str, f64>> {
        Ok(Emit::Multiple(vec![(SUM, *number), (COUNT, 1.0)]))
    }

    fn reduce(&self, _key: &&'static str, values: &[f64]) -> Result<f64> {
        Ok(values.iter().sum())
    }
}

/// Mean of `numbers`, `None` when there are none.
pub fn average(numbers: &[f64]) -> Result<Option<f64>> {
    let bundle = engine::run(&AverageApp, numbers)?;
    Ok(bundle.result(&AVERAGE).copied())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub sum: f64,
    pub count: u64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

pub fn summarize(numbers: &[f64]) -> Result<Option<Summary>> {
    let bundle = engine::run(&SumCountApp, numbers)?;
    let (sum, count) = match (bundle.result(&SUM), bundle.result(&COUNT)) {
        (Some(sum), Some(count)) => (*sum, *count as u64),
        _ => return Ok(None),
    };
    let (min, max) = match numbers.iter().copied().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => return Ok(None),
        MinMaxResult::OneElement(n) => (n, n),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    Ok(Some(Summary {
        sum,
        count,
        average: sum / count as f64,
        min,
        max,
        range: max - min,
    }))
}

/// One number per line; lines that do not parse are dropped.
pub fn parse_numbers(text: &str) -> Vec<f64> {
    text.lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .filter(|n| !n.is_nan())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_numbers() {
        assert_eq!(average(&[1.0, 2.0, 3.0, 4.0]).unwrap(), Some(2.5));
        assert_eq!(average(&[-3.0]).unwrap(), Some(-3.0));
        assert_eq!(average(&[]).unwrap(), None);
    }

    #[test]
    fn single_key_carries_all_partials() {
        let bundle = engine::run(&AverageApp, &[10.0, 20.0]).unwrap();
        assert_eq!(bundle.shuffled.len(), 1);
        assert_eq!(
            bundle.shuffled[AVERAGE],
            vec![
                Partial {
                    value: 10.0,
                    count: 1
                },
                Partial {
                    value: 20.0,
                    count: 1
                }
            ]
        );
        assert_eq!(bundle.results, vec![(AVERAGE, 15.0)]);
    }

    #[test]
    fn batching_loses_the_mean() {
        let numbers = [1.0, 2.0, 3.0];
        let batch = engine::run_batch(&AverageApp, &numbers, 2).unwrap();
        assert_eq!(batch.batch_count, 2);
        assert_eq!(batch.bundle.results, vec![(AVERAGE, 0.0)]);

        // sum and count survive, being additive
        let batch = engine::run_batch(&SumCountApp, &numbers, 2).unwrap();
        assert_eq!(batch.bundle.results, vec![(SUM, 6.0), (COUNT, 3.0)]);
    }

    #[test]
    fn summary() {
        let summary = summarize(&[4.0, -1.0, 7.0]).unwrap().unwrap();
        assert_eq!(
            summary,
            Summary {
                sum: 10.0,
                count: 3,
                average: 10.0 / 3.0,
                min: -1.0,
                max: 7.0,
                range: 8.0,
            }
        );
        assert_eq!(summarize(&[]).unwrap(), None);
    }

    #[test]
    fn parse() {
        assert_eq!(
            parse_numbers("1\n 2.5 \nabc\n\n-4\nNaN"),
            vec![1.0, 2.5, -4.0]
        );
    }
}
