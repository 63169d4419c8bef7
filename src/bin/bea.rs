use anyhow::{Context, Result};
use bea_rs::{Client, config, merge, storage};
use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bea",
    version,
    about = "Fetch BEA regional statistics and merge them into one table"
)]
struct Cli {
    /// YAML file with request fields, `Year` list, and `LineCode` mapping
    config: PathBuf,
    /// BEA API key (sent as UserID)
    key: String,
    /// Output file. Writes to stdout when omitted or `-`.
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, `.json` outputs get JSON and everything else CSV.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// API endpoint.
    #[arg(long, default_value = bea_rs::api::BASE_URL)]
    base_url: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutFormat {
    Csv,
    Json,
}

impl OutFormat {
    fn resolve(explicit: Option<Self>, out: Option<&PathBuf>) -> Self {
        if let Some(f) = explicit {
            return f;
        }
        let is_json = out
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json { OutFormat::Json } else { OutFormat::Csv }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let out = cli.out.filter(|p| p.as_os_str() != "-");
    let format = OutFormat::resolve(cli.format, out.as_ref());
    let (spec, vars) = config::load(&cli.config, &cli.key)
        .with_context(|| format!("load config {}", cli.config.display()))?;
    let client = Client::new(cli.base_url);
    let table = merge::collect(&client, spec, &vars)?;

    match out.as_ref() {
        Some(path) => {
            match format {
                OutFormat::Csv => storage::save_csv(&table, path)?,
                OutFormat::Json => storage::save_json(&table, path)?,
            }
            eprintln!("Saved {} rows to {}", table.len(), path.display());
        }
        None => {
            // Buffer first so a write error never leaves half a table on stdout.
            let mut buf = Vec::new();
            match format {
                OutFormat::Csv => storage::write_csv(&table, &mut buf)?,
                OutFormat::Json => storage::write_json(&table, &mut buf)?,
            }
            let mut stdout = io::stdout().lock();
            stdout.write_all(&buf).context("write stdout")?;
            stdout.flush().context("write stdout")?;
        }
    }

    Ok(())
}
