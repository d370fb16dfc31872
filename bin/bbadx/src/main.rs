use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use backtest::{run_by_period, simulate, write_equity_curve, BacktestReport, Period, SimulatorConfig};
use common::{Config, ExchangeClient, TradingMode};
use engine::{cache, BitbankClient, Bot, MarketFeed, PublicClient, Trader};
use paper::PaperClient;
use strategy::{SignalEngine, StrategyFileConfig};

#[derive(Parser)]
#[command(name = "bbadx", version, about = "Bollinger/ADX mean-reversion bot for bitbank")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the market and trade on each new signal
    Trade(TradeArgs),
    /// Replay cached candles through the signal engine and position simulator
    Backtest(BacktestArgs),
}

#[derive(Parser)]
struct TradeArgs {
    /// Run a single polling cycle and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[derive(Parser)]
struct BacktestArgs {
    /// Candle cache; fetched and written when missing
    #[arg(long, default_value = "data/candles.json")]
    cache_file: PathBuf,

    /// Days of history to fetch when the cache is missing
    #[arg(long, default_value_t = 365)]
    days: u32,

    /// Starting fiat balance
    #[arg(long, default_value_t = 1_000_000.0)]
    initial_cash: f64,

    /// Fee charged on notional for every entry and exit
    #[arg(long, default_value_t = 0.0012)]
    fee_rate: f64,

    /// Write the equity curve as JSON to this file
    #[arg(long)]
    equity_out: Option<PathBuf>,

    /// Also report independent monthly and yearly runs
    #[arg(long, default_value_t = false)]
    by_period: bool,

    /// Strategy file; the backtest rule includes the RSI leg
    #[arg(long, default_value = "config/backtest.toml")]
    strategy: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let cfg = Config::from_env();

    match cli.command {
        Commands::Trade(args) => trade(cfg, args).await,
        Commands::Backtest(args) => run_backtest(cfg, args).await,
    }
}

async fn trade(cfg: Config, args: TradeArgs) -> anyhow::Result<()> {
    info!(mode = %cfg.trading_mode, pair = %cfg.pair, "bbadx starting");

    let strategy_file = StrategyFileConfig::load(&cfg.strategy_config_path)
        .with_context(|| format!("loading strategy config '{}'", cfg.strategy_config_path))?;
    let signals = SignalEngine::new(strategy_file.to_params())?;
    let public = PublicClient::new()?;

    // ── Exchange client (injected based on TRADING_MODE) ──────────────────────
    let client: Arc<dyn ExchangeClient> = match cfg.trading_mode {
        TradingMode::Live => {
            let credentials = cfg
                .credentials
                .clone()
                .context("live trading requires BITBANK_API_KEY and BITBANK_API_SECRET")?;
            info!("Live trading mode, orders go to bitbank");
            Arc::new(BitbankClient::new(credentials, public.clone())?)
        }
        TradingMode::Paper => {
            info!(slippage_bps = cfg.paper_slippage_bps, "Paper trading mode, using PaperClient");
            Arc::new(PaperClient::new(
                cfg.quote_asset(),
                cfg.paper_initial_fiat,
                cfg.paper_fee_rate,
                cfg.paper_slippage_bps,
            ))
        }
    };

    let trader = Trader::new(
        client,
        cfg.pair.clone(),
        cfg.base_asset(),
        cfg.fiat_per_entry,
        cfg.dust_threshold,
    );
    let feed = MarketFeed {
        client: public,
        pair: cfg.pair.clone(),
        candle_type: cfg.candle_type.clone(),
        fetch_days: cfg.fetch_days,
    };
    let bot = Bot::new(feed, signals, trader, cfg.poll_interval);

    if args.once {
        let outcome = bot.tick().await?;
        info!(signal = %outcome.signal, price = outcome.price, filled = outcome.fill.is_some(), "Single cycle done");
        return Ok(());
    }

    // ── Shutdown on Ctrl-C ────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    bot.run(shutdown_rx).await;
    info!("bbadx stopped");
    Ok(())
}

async fn run_backtest(cfg: Config, args: BacktestArgs) -> anyhow::Result<()> {
    let strategy_path = &args.strategy;
    let strategy_file = StrategyFileConfig::load(strategy_path)
        .with_context(|| format!("loading strategy config '{}'", strategy_path.display()))?;
    let signals = SignalEngine::new(strategy_file.to_params())?;
    let sim_config = SimulatorConfig::new(args.initial_cash, args.fee_rate)?;

    let public = PublicClient::new()?;
    let series = cache::load_or_fetch(&args.cache_file, &public, &cfg.pair, &cfg.candle_type, args.days)
        .await
        .with_context(|| format!("loading candles from '{}'", args.cache_file.display()))?;

    let rows = signals.annotate(&series);
    let simulation = simulate(&rows, &sim_config)?;
    info!(
        candles = rows.len(),
        trades = simulation.trades.len(),
        final_cash = simulation.final_cash,
        "Backtest complete"
    );

    let mut report = BacktestReport::new(&simulation, sim_config.fee_rate());
    if args.by_period {
        for period in [Period::Month, Period::Year] {
            let results = run_by_period(&rows, period, &sim_config)?;
            report = report.with_periods(period, &results);
        }
    }
    print!("{}", report.render());

    if let Some(path) = &args.equity_out {
        write_equity_curve(path, &simulation.equity)
            .with_context(|| format!("writing equity curve to '{}'", path.display()))?;
        info!(path = %path.display(), points = simulation.equity.len(), "Equity curve written");
    }
    Ok(())
}
