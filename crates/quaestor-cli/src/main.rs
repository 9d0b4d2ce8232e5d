use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use quaestor_core::config::Settings;
use quaestor_core::logging::{setup_logging, setup_minimal_logging};
use quaestor_core::sink::build_sink;
use quaestor_data::{import_csv, label, HistorySource, SqliteHistory};
use quaestor_search::Trainer;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_help();
        return Ok(());
    }
    match args[1].as_str() {
        "import" => cmd_import(&args[2..]),
        "markets" => cmd_markets(&args[2..]),
        "window" => cmd_window(&args[2..]),
        "label" => cmd_label(&args[2..]),
        "train" => cmd_train(&args[2..]),
        "config" => cmd_config(&args[2..]),
        _ => {
            print_help();
            Ok(())
        }
    }
}

fn cmd_import(args: &[String]) -> Result<()> {
    setup_minimal_logging(false)?;
    let settings = load_settings(args)?;
    let Some(csv) = parse_flag(args, "--csv") else {
        bail!("import needs --csv FILE");
    };
    let exchange = parse_flag(args, "--exchange").unwrap_or_else(|| settings.data.exchange.clone());
    let market = parse_flag(args, "--market").unwrap_or_else(|| settings.data.market.clone());

    let entries = import_csv(&csv, &exchange, &market)?;
    let store = open_store(args, &settings)?;
    let written = store.insert_entries(&entries)?;
    println!(
        "Imported {} {} candles from {} into {:?}",
        written,
        market,
        csv,
        store.path()
    );
    Ok(())
}

fn cmd_markets(args: &[String]) -> Result<()> {
    setup_minimal_logging(false)?;
    let settings = load_settings(args)?;
    let store = open_store(args, &settings)?;
    let markets = store.markets()?;
    println!("Markets ({}):", markets.len());
    for market in markets {
        println!("  {} ({} candles)", market, store.count(&market)?);
    }
    Ok(())
}

fn cmd_window(args: &[String]) -> Result<()> {
    setup_minimal_logging(false)?;
    let settings = load_settings(args)?;
    let market = parse_flag(args, "--market").unwrap_or_else(|| settings.data.market.clone());
    let store = open_store(args, &settings)?;

    let earliest = store.earliest_timestamp(&market)?;
    let latest = store.latest_timestamp(&market)?;
    match (earliest, latest) {
        (Some(first), Some(last)) => {
            println!("{}: {} candles", market, store.count(&market)?);
            println!("  first {} ({})", first, format_ts(first));
            println!("  last  {} ({})", last, format_ts(last));
        }
        _ => println!("{}: no stored candles", market),
    }
    Ok(())
}

fn cmd_label(args: &[String]) -> Result<()> {
    setup_minimal_logging(false)?;
    let settings = load_settings(args)?;
    let market = parse_flag(args, "--market").unwrap_or_else(|| settings.data.market.clone());
    let seconds = parse_number::<i64>(args, "--seconds")?.unwrap_or(settings.training.window_seconds);
    let store = open_store(args, &settings)?;

    let start = match parse_number::<i64>(args, "--start")? {
        Some(ts) => ts,
        None => match store.earliest_timestamp(&market)? {
            Some(ts) => ts,
            None => bail!("No stored candles for {}", market),
        },
    };

    let entries = store.fetch(&market, start, start.saturating_add(seconds))?;
    let labels = label(&entries, seconds);
    if labels.is_empty() {
        println!("{}: no candles in [{}, {})", market, start, start.saturating_add(seconds));
        return Ok(());
    }

    let mean = labels.iter().sum::<f64>() / labels.len() as f64;
    let sells = labels.iter().filter(|l| **l > 0.8).count();
    let buys = labels.iter().filter(|l| **l < 0.2).count();
    println!(
        "Labeled {} {} candles from {} ({}s)",
        labels.len(),
        market,
        format_ts(start),
        seconds
    );
    println!("  mean {:.4}  sell-regime {}  buy-regime {}", mean, sells, buys);
    Ok(())
}

fn cmd_train(args: &[String]) -> Result<()> {
    let verbose = args.iter().any(|a| a == "--verbose");
    let _guard = setup_logging(verbose)?;

    let mut settings = load_settings(args)?;
    if let Some(market) = parse_flag(args, "--market") {
        settings.data.market = market;
    }
    if let Some(seed) = parse_number::<u64>(args, "--seed")? {
        settings.training.seed = Some(seed);
    }
    if let Some(population) = parse_number::<usize>(args, "--population")? {
        settings.training.population_size = population;
    }
    let generations = parse_number::<u64>(args, "--generations")?.or(settings.training.max_generations);

    let store = open_store(args, &settings)?;
    let sink = build_sink(&settings.sink)?;
    let mut trainer = Trainer::new(&settings, Arc::new(store), Arc::new(sink))?;

    info!(
        "Training on {} with population {} ({})",
        settings.data.market,
        settings.training.population_size,
        generations.map_or_else(|| "until stopped".to_string(), |g| format!("{} generations", g))
    );
    let state = trainer.run(generations);
    match state.best_ever {
        Some(best) => println!(
            "Finished {} generations, best fitness {:.8}",
            state.generation, best.fitness
        ),
        None => println!("Finished {} generations without a scored network", state.generation),
    }
    Ok(())
}

fn cmd_config(args: &[String]) -> Result<()> {
    let out = parse_flag(args, "--out").unwrap_or_else(|| "config.yaml".to_string());
    Settings::default().save(&out)?;
    println!("Wrote default settings to {}", out);
    Ok(())
}

/// `--config FILE`, else `QUAESTOR_CONFIG`/`config.yaml` when present, else
/// defaults; environment overrides apply on top.
fn load_settings(args: &[String]) -> Result<Settings> {
    let mut settings = if let Some(path) = parse_flag(args, "--config") {
        Settings::from_yaml(&path).with_context(|| format!("Failed to read settings from {}", path))?
    } else if std::env::var("QUAESTOR_CONFIG").is_ok() || Path::new("config.yaml").exists() {
        Settings::load()?
    } else {
        Settings::default()
    };
    settings.apply_env_overrides()?;
    Ok(settings)
}

fn open_store(args: &[String], settings: &Settings) -> Result<SqliteHistory> {
    match parse_flag(args, "--db") {
        Some(db) => SqliteHistory::open(db),
        None => SqliteHistory::open(&settings.data.db_path),
    }
}

fn format_ts(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "invalid time".to_string())
}

fn parse_number<T: std::str::FromStr>(args: &[String], name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match parse_flag(args, name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} expects a number, got {:?}: {}", name, raw, e)),
        None => Ok(None),
    }
}

fn parse_flag(args: &[String], name: &str) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == name {
            return iter.next().cloned();
        }
    }
    None
}

fn print_help() {
    println!("quaestor");
    println!("  import --csv candles.csv --exchange coinbasepro --market BTC-USD --db data/market_data.sqlite");
    println!("  markets --db data/market_data.sqlite");
    println!("  window --market BTC-USD --db data/market_data.sqlite");
    println!("  label --market BTC-USD --start 1500000000 --seconds 216000");
    println!("  train --config config.yaml --market BTC-USD --generations 100 --seed 42 --population 100 --verbose");
    println!("  config --out config.yaml");
}
