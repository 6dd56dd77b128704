use app_average::AverageApp;
use app_chat::ParticipantApp;
use app_sales::SalesApp;
use app_wc::WcApp;
use common::{init_logger, App, Numeric, Result};
use engine::Progress;
use eyre::{bail, WrapErr};
use itertools::Itertools;
use log::{debug, info};
use std::{
    fmt::Display,
    fs::{read_to_string, File},
    io::Write,
    path::PathBuf,
    str::FromStr,
};
use structopt::StructOpt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppName {
    Wc,
    Average,
    Sales,
    Chat,
}

impl FromStr for AppName {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "wc" => AppName::Wc,
            "average" => AppName::Average,
            "sales" => AppName::Sales,
            "chat" => AppName::Chat,
            other => bail!("unknown app {:?}", other),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sync,
    Async,
    Batch,
}

impl FromStr for Mode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "sync" => Mode::Sync,
            "async" => Mode::Async,
            "batch" => Mode::Batch,
            other => bail!("unknown mode {:?}", other),
        })
    }
}

#[derive(StructOpt, Debug)]
struct Opt {
    #[structopt(short, long, possible_values = &["wc", "average", "sales", "chat"])]
    app_name: AppName,
    #[structopt(short, long)]
    input_files: Vec<PathBuf>,
    #[structopt(short, long, default_value = "sync", possible_values = &["sync", "async", "batch"])]
    mode: Mode,
    #[structopt(short, long, default_value = "1000")]
    batch_size: usize,
    #[structopt(short, long, default_value = "mr-out-0")]
    output: PathBuf,
}

fn render<K: Display, A: Display>(results: &[(K, A)]) -> Vec<String> {
    results
        .iter()
        .map(|(k, a)| format!("{} {}", k, a))
        .collect_vec()
}

async fn execute<A>(app: &A, records: &[A::Record], opt: &Opt) -> Result<Vec<String>>
where
    A: App,
    A::Key: Display,
    A::Value: Numeric,
    A::Output: Display,
{
    let lines = match opt.mode {
        Mode::Sync => render(&engine::run(app, records)?.results),
        Mode::Async => {
            let mut phase = None;
            let mut log_progress = |p: Progress| {
                if phase != Some(p.phase) {
                    info!("{} phase started", p.phase);
                    phase = Some(p.phase);
                }
                debug!("{} {}% ({}/{})", p.phase, p.percent, p.current, p.total);
            };
            let bundle = engine::run_async(app, records, Some(&mut log_progress)).await;
            if let Some(stats) = bundle.stats {
                info!("stats: {:?}", stats);
            }
            render(&bundle.results)
        }
        Mode::Batch => {
            let batch = engine::run_batch(app, records, opt.batch_size)?;
            info!("merged {} batches", batch.batch_count);
            render(&batch.bundle.results)
        }
    };
    Ok(lines)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let opt = Opt::from_args();
    info!("running {:?} over {} files in {:?} mode", opt.app_name, opt.input_files.len(), opt.mode);

    let contents = opt
        .input_files
        .iter()
        .map(|file| {
            read_to_string(file).wrap_err_with(|| format!("failed to read {}", file.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let lines = match opt.app_name {
        AppName::Wc => {
            let records = contents
                .iter()
                .flat_map(|content| content.lines().map(str::to_owned))
                .collect_vec();
            let summary = app_wc::summarize(&app_wc::word_count(&contents.join("\n"))?.results);
            info!(
                "{} words, {} unique, average length {:.2}",
                summary.total_words, summary.unique_words, summary.average_length
            );
            execute(&WcApp, &records, &opt).await?
        }
        AppName::Average => {
            let numbers = contents
                .iter()
                .flat_map(|content| app_average::parse_numbers(content))
                .collect_vec();
            if let Some(summary) = app_average::summarize(&numbers)? {
                info!(
                    "{} numbers, sum {}, min {}, max {}",
                    summary.count, summary.sum, summary.min, summary.max
                );
            }
            execute(&AverageApp, &numbers, &opt).await?
        }
        AppName::Sales => {
            let mut sales = vec![];
            for content in &contents {
                sales.extend(app_sales::parse_csv(content)?);
            }
            let report = app_sales::analyze(&sales)?;
            info!(
                "{} transactions, total sales {:.2}, {} products, {} regions",
                report.total_transactions,
                report.total_sales,
                report.unique_products,
                report.unique_regions
            );
            execute(&SalesApp::default(), &sales, &opt).await?
        }
        AppName::Chat => {
            let mut messages = vec![];
            for content in &contents {
                messages.extend(app_chat::parse(content, app_chat::detect(content))?);
            }
            let report = app_chat::analyze(&messages)?;
            info!(
                "{} messages, {} words, top words: {}",
                report.total_messages,
                report.total_words,
                report.top_words.iter().map(|(w, n)| format!("{}({})", w, n)).join(" ")
            );
            execute(&ParticipantApp, &messages, &opt).await?
        }
    };

    let mut output_file = File::create(&opt.output)?;
    for line in lines {
        writeln!(output_file, "{}", line)?;
    }

    Ok(())
}
