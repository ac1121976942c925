use anyhow::{bail, Context, Result};
use crypto_chatter::{init_tracing_once, CsvStore, HarvestOptions, Harvester, Rollup, Summarizer, VaderScorer};

const DATA_ROOT: &str = "./data/reddit";
const LOG_FILE: &str = "./data/logs/crypto_chatter.log";

fn options_from_env() -> Result<HarvestOptions> {
    let mut opts = HarvestOptions::default()
        .with_data_root(std::env::var("CHATTER_DATA_ROOT").unwrap_or_else(|_| DATA_ROOT.to_string()))
        .with_log_file(std::env::var("CHATTER_LOG_FILE").unwrap_or_else(|_| LOG_FILE.to_string()));
    if let Ok(year) = std::env::var("CHATTER_START_YEAR") {
        let year: u16 = year.trim().parse().with_context(|| format!("CHATTER_START_YEAR={year}"))?;
        opts = opts.with_start_year(year);
    }
    Ok(opts)
}

fn extract(opts: &HarvestOptions) -> Result<()> {
    let report = Harvester::from_options(opts.clone())?.run();
    println!(
        "extract: {} fetched, {} skipped, {} abandoned, {} not saved",
        report.fetched, report.skipped, report.abandoned, report.write_failures
    );
    Ok(())
}

fn summarize(opts: &HarvestOptions) -> Result<()> {
    tracing::info!("Starting reddit preprocess.");
    let summarizer = Summarizer::new(VaderScorer::new(), CsvStore::new(&opts.data_root));
    let report = Rollup::new(summarizer).progress(opts.progress).rollup_all()?;
    println!("summarize: {} communities, {} joined days", report.communities, report.rows);
    for (community, err) in &report.failed {
        eprintln!("summarize failed for {community}: {err}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let opts = options_from_env()?;
    init_tracing_once(&opts);

    match std::env::args().nth(1).as_deref().unwrap_or("all") {
        "extract" => extract(&opts),
        "summarize" => summarize(&opts),
        "all" => {
            extract(&opts)?;
            summarize(&opts)
        }
        other => bail!("unknown command {other:?}; expected extract, summarize or all"),
    }
}
