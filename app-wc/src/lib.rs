use common::{App, Emit, Result};
use engine::ResultBundle;
use itertools::Itertools;

/// Word frequencies, one record per line of text.
#[derive(Debug, Default)]
pub struct WcApp;

impl App for WcApp {
    type Record = String;
    type Key = String;
    type Value = u64;
    type Output = u64;

    fn map(&self, line: &String, _position: usize) -> Result<Emit<String, u64>> {
        Ok(Emit::Multiple(
            tokenize(line).into_iter().map(|w| (w, 1)).collect(),
        ))
    }

    fn reduce(&self, _word: &String, counts: &[u64]) -> Result<u64> {
        Ok(counts.iter().sum())
    }
}

/// Lowercases `text` and splits it on anything that is not an ASCII word character.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Word frequencies of `text`, one record per token.
pub fn word_count(text: &str) -> Result<ResultBundle<String, u64, u64>> {
    engine::map_reduce(
        &tokenize(text),
        |word: &String, _| Ok(Emit::Single(word.clone(), 1)),
        |_, counts: &[u64]| Ok(counts.iter().sum()),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_words: u64,
    pub unique_words: usize,
    pub average_length: f64,
}

pub fn summarize(results: &[(String, u64)]) -> Summary {
    let total_words = results.iter().map(|(_, count)| count).sum::<u64>();
    let letters = results
        .iter()
        .map(|(word, count)| word.chars().count() as u64 * count)
        .sum::<u64>();
    Summary {
        total_words,
        unique_words: results.len(),
        average_length: if total_words > 0 {
            letters as f64 / total_words as f64
        } else {
            0.0
        },
    }
}

/// The `n` most frequent words. Ties keep their first-occurrence order.
pub fn top(results: &[(String, u64)], n: usize) -> Vec<(String, u64)> {
    results
        .iter()
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(n)
        .cloned()
        .collect()
}
