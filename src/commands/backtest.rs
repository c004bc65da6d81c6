//! Backtest command implementation

use anyhow::Result;
use trend_reversal::strategies;
use trend_reversal::{backtest::Backtester, data, Config};
use tracing::{debug, info};

pub fn run(
    config_path: String,
    symbol_override: Option<String>,
    rr_min_override: Option<f64>,
    start_override: Option<String>,
    end_override: Option<String>,
) -> Result<()> {
    info!("Starting backtest");

    let mut config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    if let Some(symbol) = symbol_override {
        info!("Overriding symbol to: {}", symbol);
        config.backtest.symbol = symbol;
    }

    if let Some(rr_min) = rr_min_override {
        info!("Overriding rr_min to: {:.2}", rr_min);
        config.set_strategy_param("rr_min", serde_json::json!(rr_min));
    }

    if let Some(start) = start_override {
        info!("Overriding start date to: {}", start);
        config.backtest.start_date = Some(start);
    }

    if let Some(end) = end_override {
        info!("Overriding end date to: {}", end);
        config.backtest.end_date = Some(end);
    }

    let start = config.backtest.start_date.as_deref().map(data::parse_date).transpose()?;
    let end = config.backtest.end_date.as_deref().map(data::parse_date).transpose()?;

    info!("Creating strategy: {}", config.strategy_name);
    let strategy = strategies::create_strategy(&config)?;
    let (fast_tf, slow_tf) = {
        let (fast, slow) = strategy.timeframes();
        (fast.to_string(), slow.to_string())
    };

    info!("Loading data from: {}", config.backtest.data_dir);
    debug!("Symbol: {} ({} / {})", config.backtest.symbol, fast_tf, slow_tf);
    let pair = data::load_timeframe_pair(
        &config.backtest.data_dir,
        &config.backtest.symbol,
        &fast_tf,
        &slow_tf,
        start,
        end,
    )?;

    let mut backtester = Backtester::new(config.clone(), strategy);

    info!("Running backtest...");
    let result = backtester.run(&pair);
    result.write_artifacts(&config.backtest.results_dir)?;

    let summary = &result.summary;
    println!("\n{}", "=".repeat(60));
    println!("BACKTEST RESULTS");
    println!("{}", "=".repeat(60));
    println!("Symbol:             {}", config.backtest.symbol);
    println!("Timeframes:         {} / {}", fast_tf, slow_tf);
    println!("Fast Bars:          {}", result.bars_processed);
    println!("Swing Pivots:       {}", result.pivots.len());
    println!("Total Trades:       {}", summary.total_trades);
    println!("Filled Trades:      {}", summary.filled_trades);
    println!("Open Trades:        {}", summary.open_trades);
    println!("Favourable Fills:   {}", summary.favourable_fills);
    println!("Adverse Fills:      {}", summary.adverse_fills);
    println!("Favourable Rate:    {:.2}%", summary.favourable_rate);
    println!("Total Fill Pips:    {:.1}", summary.total_pips);
    println!("Average Fill Pips:  {:.1}", summary.avg_pips);
    println!("{}", "=".repeat(60));

    if !result.trades.is_empty() {
        println!(
            "\n{:<22} {:>10} {:>10} {:>10} {:>10} {:>8}",
            "Entry", "Price", "SL", "TP", "Exit", "Pips"
        );
        println!("{}", "-".repeat(75));
        for trade in &result.trades {
            println!(
                "{:<22} {:>10.5} {:>10.5} {:>10.5} {:>10} {:>8}",
                trade.entry_dt.format("%Y-%m-%d %H:%M"),
                trade.entry_price,
                trade.sl,
                trade.tp,
                trade
                    .exit_price
                    .map(|p| format!("{:.5}", p))
                    .unwrap_or_else(|| "-".to_string()),
                trade
                    .pips
                    .map(|p| format!("{:.1}", p))
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
    }

    info!("Backtest completed successfully");

    Ok(())
}
