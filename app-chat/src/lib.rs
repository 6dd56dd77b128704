use common::{App, Emit, Result};
use csv::ReaderBuilder;
use eyre::{bail, WrapErr};
use itertools::Itertools;
use log::debug;
use regex::Regex;
use std::{fmt, str::FromStr};

/// Filler words left out of the frequency ranking.
pub const STOP_WORDS: &[&str] = &[
    "yang", "dan", "di", "ke", "dari", "untuk", "pada", "dengan", "ini", "itu", "tidak", "ada",
];

pub const TOP_WORDS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub timestamp: String,
    pub user: String,
    pub text: String,
    pub words: usize,
    pub hour: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `timestamp,user,message` rows, optionally under a header row.
    Csv,
    /// `[D/M/YY H:MM:SS] user: message` lines of a chat export.
    WhatsApp,
}

impl FromStr for Format {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Format::Csv),
            "whatsapp" => Ok(Format::WhatsApp),
            other => bail!("unknown chat format {:?}", other),
        }
    }
}

struct Patterns {
    export_line: Regex,
    hour: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Self {
            export_line: Regex::new(
                r"^\[(\d{1,2})/(\d{1,2})/(\d{2,4}) (\d{1,2}:\d{2}:\d{2})\] (.+?): (.+)",
            )?,
            hour: Regex::new(r"(?:^|[\sT])(\d{1,2}):\d{2}")?,
        })
    }

    fn hour(&self, timestamp: &str) -> Option<u8> {
        self.hour
            .captures(timestamp)
            .and_then(|caps| caps[1].parse::<u8>().ok())
            .filter(|hour| *hour < 24)
    }

    fn message(&self, timestamp: String, user: &str, text: &str) -> Message {
        let text = text.trim();
        Message {
            hour: self.hour(&timestamp),
            timestamp,
            user: user.trim().to_owned(),
            text: text.to_owned(),
            words: text.split_whitespace().count(),
        }
    }
}

/// Guesses the format from the first non-empty line.
pub fn detect(text: &str) -> Format {
    match text.lines().find(|line| !line.trim().is_empty()) {
        Some(line) if line.trim_start().starts_with('[') => Format::WhatsApp,
        _ => Format::Csv,
    }
}

pub fn parse(text: &str, format: Format) -> Result<Vec<Message>> {
    let patterns = Patterns::new()?;
    let messages = match format {
        Format::Csv => parse_csv(text, &patterns)?,
        Format::WhatsApp => parse_export(text, &patterns),
    };
    if messages.is_empty() {
        bail!("no chat messages found");
    }
    debug!("parsed {} chat messages", messages.len());
    Ok(messages)
}

fn parse_csv(text: &str, patterns: &Patterns) -> Result<Vec<Message>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut messages = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.wrap_err("malformed chat line")?;
        if i == 0 && record.iter().join(",").to_lowercase().contains("timestamp,user,message") {
            continue;
        }
        if record.len() < 3 {
            continue;
        }
        // the message itself may contain commas
        let text = record.iter().skip(2).join(",");
        let (timestamp, user) = (record[0].trim(), record[1].trim());
        if timestamp.is_empty() || user.is_empty() || text.trim().is_empty() {
            continue;
        }
        messages.push(patterns.message(timestamp.to_owned(), user, &text));
    }
    Ok(messages)
}

fn parse_export(text: &str, patterns: &Patterns) -> Vec<Message> {
    text.lines()
        .filter_map(|line| patterns.export_line.captures(line.trim()))
        .map(|caps| {
            let year = if caps[3].len() == 2 {
                format!("20{}", &caps[3])
            } else {
                caps[3].to_owned()
            };
            let timestamp = format!(
                "{}-{:0>2}-{:0>2} {}",
                year, &caps[2], &caps[1], &caps[4]
            );
            patterns.message(timestamp, &caps[5], &caps[6])
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Activity {
    pub messages: usize,
    pub words: usize,
}

impl Activity {
    pub fn words_per_message(&self) -> f64 {
        if self.messages > 0 {
            self.words as f64 / self.messages as f64
        } else {
            0.0
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "messages={} words={}", self.messages, self.words)
    }
}

/// Messages and words per participant.
#[derive(Debug, Default)]
pub struct ParticipantApp;

impl App for ParticipantApp {
    type Record = Message;
    type Key = String;
    type Value = usize;
    type Output = Activity;

    fn map(&self, message: &Message, _position: usize) -> Result<Emit<String, usize>> {
        Ok(Emit::Single(message.user.clone(), message.words))
    }

    fn reduce(&self, _user: &String, words: &[usize]) -> Result<Activity> {
        Ok(Activity {
            messages: words.len(),
            words: words.iter().sum(),
        })
    }
}

/// Lowercased word occurrences across all messages.
#[derive(Debug)]
pub struct WordFrequencyApp {
    word: Regex,
}

impl WordFrequencyApp {
    pub fn new() -> Result<Self> {
        Ok(Self {
            word: Regex::new(r"(?-u:\w)+")?,
        })
    }
}

impl App for WordFrequencyApp {
    type Record = Message;
    type Key = String;
    type Value = u64;
    type Output = u64;

    fn map(&self, message: &Message, _position: usize) -> Result<Emit<String, u64>> {
        let text = message.text.to_lowercase();
        Ok(Emit::Multiple(
            self.word
                .find_iter(&text)
                .map(|m| (m.as_str().to_owned(), 1))
                .collect(),
        ))
    }

    fn reduce(&self, _word: &String, counts: &[u64]) -> Result<u64> {
        Ok(counts.iter().sum())
    }
}

/// Messages per hour of the day. Messages without a readable hour are left
/// out.
#[derive(Debug, Default)]
pub struct HourlyApp;

impl App for HourlyApp {
    type Record = Message;
    type Key = u8;
    type Value = u64;
    type Output = u64;

    fn map(&self, message: &Message, _position: usize) -> Result<Emit<u8, u64>> {
        Ok(match message.hour {
            Some(hour) => Emit::Single(hour, 1),
            None => Emit::none(),
        })
    }

    fn reduce(&self, _hour: &u8, counts: &[u64]) -> Result<u64> {
        Ok(counts.iter().sum())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReport {
    pub total_messages: usize,
    pub total_words: usize,
    pub words_per_message: f64,
    /// Busiest participant first.
    pub participants: Vec<(String, Activity)>,
    /// At most [`TOP_WORDS`] entries, stop words excluded.
    pub top_words: Vec<(String, u64)>,
    pub hourly: [u64; 24],
}

pub fn analyze(messages: &[Message]) -> Result<ChatReport> {
    let participants = engine::run(&ParticipantApp, messages)?
        .results
        .into_iter()
        .sorted_by(|a, b| b.1.messages.cmp(&a.1.messages))
        .collect_vec();

    let top_words = engine::run(&WordFrequencyApp::new()?, messages)?
        .results
        .into_iter()
        .filter(|(word, _)| !STOP_WORDS.contains(&word.as_str()))
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(TOP_WORDS)
        .collect_vec();

    let mut hourly = [0; 24];
    for (hour, count) in engine::run(&HourlyApp, messages)?.results {
        hourly[hour as usize] = count;
    }

    let total_messages = messages.len();
    let total_words = messages.iter().map(|m| m.words).sum::<usize>();
    Ok(ChatReport {
        total_messages,
        total_words,
        words_per_message: if total_messages > 0 {
            total_words as f64 / total_messages as f64
        } else {
            0.0
        },
        participants,
        top_words,
        hourly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "timestamp,user,message\n\
                       2024-01-01 09:15:00,Andi,Halo semua apa kabar\n\
                       2024-01-01 09:20:00,Budi,Baik, dan kamu?\n\
                       2024-01-01 21:05:00,Andi,Baik juga\n\
                       2024-01-01 21:06:00,,tanpa nama\n\
                       broken line\n";

    const EXPORT: &str = "[1/2/24 8:05:09] Andi: Selamat pagi\n\
                          not a message\n\
                          [15/12/2023 23:59:59] Citra: pagi pagi sekali\n";

    #[test]
    fn csv_messages() {
        let messages = parse(CSV, Format::Csv).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[1],
            Message {
                timestamp: "2024-01-01 09:20:00".to_owned(),
                user: "Budi".to_owned(),
                text: "Baik, dan kamu?".to_owned(),
                words: 3,
                hour: Some(9),
            }
        );
        assert_eq!(messages[2].hour, Some(21));
    }

    #[test]
    fn quotes_stay_in_messages() {
        let csv = "2024-01-01 09:15:00,Andi,\"Halo semua\n\
                   2024-01-01 09:20:00,Budi,\"Baik\", katanya\n\
                   2024-01-01 09:25:00,Citra,Oke\n";
        let messages = parse(csv, Format::Csv).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].text, "\"Halo semua");
        assert_eq!(messages[1].text, "\"Baik\", katanya");
        assert_eq!(messages[2].user, "Citra");
    }

    #[test]
    fn words_are_ascii() {
        let messages = parse("2024-01-01 10:00:00,Andi,Kopi café\n", Format::Csv).unwrap();
        let words = engine::run(&WordFrequencyApp::new().unwrap(), &messages).unwrap();
        assert_eq!(
            words.results,
            vec![("kopi".to_owned(), 1), ("caf".to_owned(), 1)]
        );
    }

    #[test]
    fn export_messages() {
        assert_eq!(detect(EXPORT), Format::WhatsApp);
        let messages = parse(EXPORT, Format::WhatsApp).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].timestamp, "2024-02-01 8:05:09");
        assert_eq!(messages[0].hour, Some(8));
        assert_eq!(messages[1].timestamp, "2023-12-15 23:59:59");
        assert_eq!(messages[1].user, "Citra");
        assert_eq!(messages[1].words, 3);
    }

    #[test]
    fn format_names() {
        assert_eq!("csv".parse::<Format>().unwrap(), Format::Csv);
        assert_eq!(detect(CSV), Format::Csv);
        assert!("irc".parse::<Format>().is_err());
    }

    #[test]
    fn nothing_to_parse() {
        let err = parse("just text\n", Format::WhatsApp).unwrap_err();
        assert_eq!(err.to_string(), "no chat messages found");
    }

    #[test]
    fn report() {
        let messages = parse(CSV, Format::Csv).unwrap();
        let report = analyze(&messages).unwrap();
        assert_eq!(report.total_messages, 3);
        assert_eq!(report.total_words, 9);
        assert_eq!(
            report.participants,
            vec![
                (
                    "Andi".to_owned(),
                    Activity {
                        messages: 2,
                        words: 6
                    }
                ),
                (
                    "Budi".to_owned(),
                    Activity {
                        messages: 1,
                        words: 3
                    }
                ),
            ]
        );
        assert_eq!(report.participants[0].1.words_per_message(), 3.0);
        assert_eq!(report.participants[1].1.to_string(), "messages=1 words=3");
        // "dan" is a stop word
        assert_eq!(report.top_words[0], ("baik".to_owned(), 2));
        assert!(report.top_words.iter().all(|(w, _)| w != "dan"));
        assert_eq!(report.hourly[9], 2);
        assert_eq!(report.hourly[21], 1);
        assert_eq!(report.hourly.iter().sum::<u64>(), 3);
    }
}
