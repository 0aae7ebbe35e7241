//! `price-scout` command line front end

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use price_scout::infrastructure::{bootstrap_logging, init_logging_with_config};
use price_scout::infrastructure::parsing::price::price_value;
use price_scout::{ConfigManager, PriceResult, PriceScraper, Query, ResultSet};

#[derive(Parser)]
#[command(name = "price-scout", version)]
#[command(about = "Look up a product's price across Vietnamese retailers", long_about = None)]
struct Cli {
    /// Config file path (defaults to the per-user config file)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only query this site
    #[arg(short, long)]
    site: Option<String>,

    /// Sites processed at once (0 = all at once, 1 = one by one)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// List registered sites and exit
    #[arg(long)]
    list_sites: bool,

    /// Overwrite the config file with defaults and exit
    #[arg(long)]
    reset_config: bool,

    /// Product name or model code, e.g. "Tivi LG 65UQ7550"
    #[arg(required_unless_present_any = ["list_sites", "reset_config"])]
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };

    if cli.reset_config {
        let _bootstrap = bootstrap_logging();
        manager.reset_to_defaults().await.context("Failed to reset configuration")?;
        println!("{}", manager.config_path().display());
        return Ok(ExitCode::SUCCESS);
    }

    // 설정 로드 중 경고(손상된 파일 백업 등)는 구독자 설치 전에 발생
    let mut config = {
        let _bootstrap = bootstrap_logging();
        manager.load_config().await.context("Failed to load configuration")?
    };
    if let Some(concurrency) = cli.concurrency {
        config.scraper.concurrency = concurrency;
    }

    init_logging_with_config(config.logging.clone())?;
    let scraper = PriceScraper::from_config(&config).context("Invalid configuration")?;

    if cli.list_sites {
        for name in scraper.registry().names() {
            println!("{name}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let query = match Query::parse(&cli.query.join(" ")) {
        Ok(query) => query,
        Err(e) => {
            eprintln!("❌ {e}");
            return Ok(ExitCode::from(2));
        }
    };

    let results = match &cli.site {
        Some(site) => match scraper.get_price(site, &query).await {
            Some(result) => ResultSet::new(query.as_str(), vec![result]),
            None => bail!(
                "Unknown site '{}'. Registered sites: {}",
                site,
                scraper.registry().names().join(", ")
            ),
        },
        None => scraper.scrape_all(query.as_str()).await?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_results(results: &ResultSet) {
    println!("🔍 {}\n", results.query);
    for result in results {
        println!("{}\n", render(result));
    }

    let cheapest = results
        .priced()
        .filter_map(|r| Some((price_value(r.price.as_deref()?)?, r)))
        .min_by_key(|(value, _)| *value);
    if let Some((_, best)) = cheapest {
        if results.priced().count() > 1 {
            println!("🏆 Rẻ nhất: {} - {}", best.site, best.price.as_deref().unwrap_or_default());
        }
    }
}

fn render(result: &PriceResult) -> String {
    let mut lines = Vec::new();

    match &result.price {
        Some(price) => {
            lines.push(format!(
                "✅ [{}] {}",
                result.site,
                result.title.as_deref().unwrap_or_default()
            ));
            let mut price_line = format!("💰 Giá: {price}");
            if let Some(original) = &result.original_price {
                price_line.push_str(&format!(" (Giá gốc: {original})"));
            }
            lines.push(price_line);
        }
        None => {
            lines.push(format!("❌ [{}] Không tìm thấy giá", result.site));
            if let Some(title) = &result.title {
                lines.push(format!("📦 {title}"));
            }
        }
    }

    if let Some(promo) = &result.promo {
        lines.push(format!("🎁 KM: {promo}"));
    }
    if let Some(url) = &result.url {
        lines.push(format!("🔗 {url}"));
    }
    if let Some(note) = &result.note {
        lines.push(format!("ℹ️  {note}"));
    }

    lines.join("\n")
}
