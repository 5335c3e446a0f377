//! portfolio-export – command-line portfolio exporter.
//!
//! Usage:
//!   portfolio-export --records <records.json> --out-dir <dir> [--format pdf]
//!                    [--config <config.json>] [--site-url <url>] '<names-json>'
//!
//! Prints the JSON status payload and exits non-zero when the export failed.

use std::{env, path::PathBuf, process};

use portfolio_export::fetch::HttpImageFetcher;
use portfolio_export::pipeline::FlowPdfConverter;
use portfolio_export::store::{JsonRecordStore, LocalFileStore};
use portfolio_export::{ExportConfig, ExportStatus, Exporter};

struct Args {
    records: PathBuf,
    out_dir: PathBuf,
    format: String,
    config: Option<PathBuf>,
    site_url: Option<String>,
    names: String,
}

fn main() {
    env_logger::init();

    let argv: Vec<String> = env::args().collect();
    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("Error: {msg}");
            print_usage(&argv[0]);
            process::exit(1);
        }
    };

    let mut config = match &args.config {
        Some(path) => ExportConfig::from_json_file(path).unwrap_or_else(|e| fail(&e.to_string())),
        None => ExportConfig::default(),
    };
    if args.site_url.is_some() {
        config.site_url = args.site_url.clone();
    }

    let records = JsonRecordStore::open(&args.records).unwrap_or_else(|e| fail(&e.to_string()));
    let files = LocalFileStore::new(&args.out_dir);

    let mut fetcher = HttpImageFetcher::new(config.fetch_timeout());
    if let Some(site) = &config.site_url {
        fetcher = fetcher.with_site_url(site);
    }
    let pdf = FlowPdfConverter::new(config.pdf.clone(), &fetcher);

    let exporter = Exporter::new(&records, &files, &fetcher, &pdf).with_config(config);
    let response = exporter.export_portfolio(&args.names, &args.format);

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(&e.to_string()),
    }
    if response.status != ExportStatus::Success {
        process::exit(1);
    }
}

fn parse_args(argv: &[String]) -> Result<Args, String> {
    let mut records = None;
    let mut out_dir = None;
    let mut format = "pdf".to_string();
    let mut config = None;
    let mut site_url = None;
    let mut names = None;

    let mut iter = argv.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--records" | "-r" => records = Some(PathBuf::from(value(arg)?)),
            "--out-dir" | "-o" => out_dir = Some(PathBuf::from(value(arg)?)),
            "--format" | "-f" => format = value(arg)?,
            "--config" | "-c" => config = Some(PathBuf::from(value(arg)?)),
            "--site-url" => site_url = Some(value(arg)?),
            "--help" | "-h" => {
                print_usage(&argv[0]);
                process::exit(0);
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(format!("unknown flag: {other}"));
            }
            positional => {
                if names.is_some() {
                    return Err(format!("unexpected argument: {positional}"));
                }
                names = Some(positional.to_string());
            }
        }
    }

    Ok(Args {
        records: records.ok_or("--records is required")?,
        out_dir: out_dir.ok_or("--out-dir is required")?,
        format,
        config,
        site_url,
        // Missing names go through the exporter so they are reported in the payload.
        names: names.unwrap_or_default(),
    })
}

fn fail(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}

fn print_usage(prog: &str) {
    eprintln!("portfolio-export – export portfolio records as PDF or DOCX");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} --records <records.json> --out-dir <dir> [options] '<names-json>'");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <names-json>       JSON list of record names, e.g. '[\"PF-0001\"]'");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --records, -r      JSON file holding an array of portfolio records");
    eprintln!("  --out-dir, -o      Root directory of the file store");
    eprintln!("  --format, -f       pdf | docx | world_bank (default: pdf)");
    eprintln!("  --config, -c       JSON export config file");
    eprintln!("  --site-url         Base URL for site-relative image references");
    eprintln!("  --help             Print this message");
}
