//! Trading bot orchestration.
//!
//! One cycle refreshes market data, generates and executes signals, monitors
//! orders and positions, and updates the portfolio. Market data and signal
//! generation run on their own intervals; the other steps run every cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::application::analysis::MarketAnalyzer;
use crate::application::order::{OrderManager, OrderUpdate};
use crate::application::portfolio::{PortfolioService, PortfolioSummary};
use crate::domain::money::from_f64;
use crate::domain::{
    CryptoPair, MarketData, PortfolioMetrics, Position, PositionId, Price, RiskLevel,
    TradingSignal,
};
use crate::error::{Error, Result};
use crate::infrastructure::config::schedule::ScheduleConfig;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::config::trading::TradingConfig;
use crate::port::outbound::exchange::Exchange;
use crate::port::outbound::store::TradingStore;

const DEFAULT_ORDERMIN: Decimal = dec!(0.001);
const DEFAULT_PAIR_DECIMALS: u32 = 2;
const DEFAULT_LOT_DECIMALS: u32 = 8;
const RECENT_SIGNALS: usize = 10;

/// Outcome of one trading cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub market_data_updated: bool,
    pub signals_generated: usize,
    pub positions_created: usize,
    pub positions_monitored: usize,
    pub portfolio_updated: bool,
    pub errors: Vec<String>,
}

/// A trailing-stop move.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopAdjustment {
    pub position_id: PositionId,
    pub old_stop: Option<Price>,
    pub new_stop: Price,
}

/// Outcome of order and position monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorReport {
    pub order_updates: Vec<OrderUpdate>,
    pub adjustments: Vec<StopAdjustment>,
    pub monitored_positions: usize,
}

/// A signal joined with its pair symbol.
#[derive(Debug, Clone, Serialize)]
pub struct SignalView {
    #[serde(flatten)]
    pub signal: TradingSignal,
    pub symbol: String,
}

/// Snapshot of the bot for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BotStatus {
    pub is_running: bool,
    pub last_market_update: Option<DateTime<Utc>>,
    pub last_signal_generation: Option<DateTime<Utc>>,
    pub portfolio: PortfolioSummary,
    pub recent_signals: Vec<SignalView>,
    pub intervals: ScheduleConfig,
}

#[derive(Debug, Default)]
struct Timestamps {
    last_market_update: Option<DateTime<Utc>>,
    last_signal_generation: Option<DateTime<Utc>>,
}

/// True when `interval_secs` have passed since `last`, or it never ran.
fn due(last: Option<DateTime<Utc>>, interval_secs: u64, now: DateTime<Utc>) -> bool {
    last.map_or(true, |at| {
        (now - at).num_seconds() >= i64::try_from(interval_secs).unwrap_or(i64::MAX)
    })
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Coordinates analysis, order management and the portfolio.
pub struct TradingBot {
    exchange: Arc<dyn Exchange>,
    store: Arc<dyn TradingStore>,
    analyzer: MarketAnalyzer,
    orders: OrderManager,
    portfolio: PortfolioService,
    trading: TradingConfig,
    schedule: ScheduleConfig,
    timestamps: RwLock<Timestamps>,
    running: AtomicBool,
}

impl TradingBot {
    pub fn new(exchange: Arc<dyn Exchange>, store: Arc<dyn TradingStore>, config: &Config) -> Self {
        let analyzer = MarketAnalyzer::new(Arc::clone(&store), config.analysis.clone());
        let orders = OrderManager::new(
            Arc::clone(&exchange),
            Arc::clone(&store),
            config.risk.trailing_stop_pct,
        );
        let portfolio = PortfolioService::new(
            Arc::clone(&exchange),
            Arc::clone(&store),
            config.trading.quote_asset.clone(),
            config.risk.max_exposure_pct,
        );
        Self {
            exchange,
            store,
            analyzer,
            orders,
            portfolio,
            trading: config.trading.clone(),
            schedule: config.schedule.clone(),
            timestamps: RwLock::new(Timestamps::default()),
            running: AtomicBool::new(false),
        }
    }

    pub const fn orders(&self) -> &OrderManager {
        &self.orders
    }

    pub const fn portfolio(&self) -> &PortfolioService {
        &self.portfolio
    }

    pub const fn analyzer(&self) -> &MarketAnalyzer {
        &self.analyzer
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Register configured target pairs that the exchange lists and the
    /// store does not know yet. Returns how many pairs were added.
    pub async fn initialize_pairs(&self) -> Result<usize> {
        let listed = self.exchange.asset_pairs().await?;
        let mut added = 0;

        for symbol in &self.trading.target_pairs {
            let Some(info) = listed.values().find(|info| info.matches(symbol)) else {
                warn!(pair = %symbol, "Pair not listed on exchange");
                continue;
            };
            if self.store.pair_by_symbol(symbol).await?.is_some() {
                continue;
            }

            let pair = CryptoPair::new(
                symbol.clone(),
                info.base.clone(),
                info.quote.clone(),
                info.ordermin.unwrap_or(DEFAULT_ORDERMIN),
                info.pair_decimals.unwrap_or(DEFAULT_PAIR_DECIMALS),
                info.lot_decimals.unwrap_or(DEFAULT_LOT_DECIMALS),
            )
            .with_metadata(info.raw.clone());
            self.store.save_pair(&pair).await?;
            info!(pair = %symbol, exchange_name = %info.name, "Pair registered");
            added += 1;
        }

        Ok(added)
    }

    /// Fetch recent candles for every active pair and refresh indicators.
    ///
    /// Per-pair failures are logged; the step fails only when every pair
    /// failed. Returns the number of new candles stored.
    pub async fn update_market_data(&self) -> Result<usize> {
        let pairs = self.store.active_pairs().await?;
        let mut inserted = 0;
        let mut first_error: Option<Error> = None;
        let mut failures = 0;

        for (i, pair) in pairs.iter().enumerate() {
            if i > 0 {
                pause(self.schedule.pair_pause()).await;
            }
            match self.refresh_pair(pair).await {
                Ok(n) => inserted += n,
                Err(e) => {
                    warn!(pair = %pair.symbol, error = %e, "Market data update failed");
                    failures += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error.filter(|_| failures == pairs.len()) {
            return Err(e);
        }
        self.timestamps.write().last_market_update = Some(Utc::now());
        debug!(pairs = pairs.len(), inserted, "Market data updated");
        Ok(inserted)
    }

    async fn refresh_pair(&self, pair: &CryptoPair) -> Result<usize> {
        let candles = self
            .exchange
            .ohlc(&pair.symbol, self.trading.ohlc_interval, None)
            .await?;
        let skip = candles.len().saturating_sub(self.trading.candles_per_update);

        let mut inserted = 0;
        for candle in &candles[skip..] {
            let row = MarketData::new(
                pair.id,
                candle.time,
                candle.open,
                candle.high,
                candle.low,
                candle.close,
                candle.volume,
            );
            if self.store.insert_candle(&row).await? {
                inserted += 1;
            }
        }

        self.analyzer.update_indicators(pair.id).await?;
        Ok(inserted)
    }

    /// Run the analyzer over every active pair.
    pub async fn generate_signals(&self) -> Result<Vec<TradingSignal>> {
        let pairs = self.store.active_pairs().await?;
        let mut signals = Vec::new();

        for (i, pair) in pairs.iter().enumerate() {
            if i > 0 {
                pause(self.schedule.signal_pause()).await;
            }
            match self.analyzer.generate_signal(pair).await {
                Ok(Some(signal)) => signals.push(signal),
                Ok(None) => {}
                Err(e) => warn!(pair = %pair.symbol, error = %e, "Signal generation failed"),
            }
        }

        self.timestamps.write().last_signal_generation = Some(Utc::now());
        Ok(signals)
    }

    /// Open bracket positions for the most confident signals.
    ///
    /// Nothing is executed while trading is disabled or the risk status is
    /// high.
    pub async fn execute_signals(&self, mut signals: Vec<TradingSignal>) -> Result<Vec<Position>> {
        let portfolio = self.portfolio.init().await?;
        if !portfolio.is_trading_enabled {
            info!("Trading disabled, skipping signal execution");
            return Ok(Vec::new());
        }

        let risk = self.portfolio.check_risk_limits().await;
        if risk.status == RiskLevel::High {
            warn!(alerts = risk.alerts.len(), "High risk detected, skipping signal execution");
            return Ok(Vec::new());
        }

        signals.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        signals.truncate(self.trading.max_signals_per_cycle);

        let mut positions = Vec::new();
        for (i, signal) in signals.iter().enumerate() {
            if i > 0 {
                pause(self.schedule.order_pause()).await;
            }
            let pct = from_f64(signal.position_size_recommendation).unwrap_or_default();
            let size_usd = portfolio.available_balance_usd * pct / Decimal::ONE_HUNDRED;
            if size_usd < self.trading.min_position_usd {
                debug!(
                    signal_id = %signal.id,
                    size_usd = %size_usd,
                    minimum = %self.trading.min_position_usd,
                    "Position too small, skipping"
                );
                continue;
            }

            match self.orders.create_bracket_order(signal, size_usd).await {
                Ok(position) => positions.push(position),
                Err(e) => warn!(signal_id = %signal.id, error = %e, "Bracket order failed"),
            }
        }

        Ok(positions)
    }

    /// Reconcile orders, mark open positions to market and trail stops.
    pub async fn monitor_positions(&self) -> Result<MonitorReport> {
        let order_updates = match self.orders.monitor_orders().await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "Order monitoring failed");
                Vec::new()
            }
        };

        let open = self.store.open_positions().await?;
        let mut adjustments = Vec::new();
        for position in &open {
            match self.monitor_position(position).await {
                Ok(Some(adjustment)) => adjustments.push(adjustment),
                Ok(None) => {}
                Err(e) => warn!(position_id = %position.id, error = %e, "Position monitoring failed"),
            }
        }

        Ok(MonitorReport {
            order_updates,
            adjustments,
            monitored_positions: open.len(),
        })
    }

    async fn monitor_position(&self, position: &Position) -> Result<Option<StopAdjustment>> {
        let Some(pair) = self.store.pair(position.pair_id).await? else {
            return Ok(None);
        };
        let tickers = self.exchange.ticker(&[pair.symbol.clone()]).await?;
        let Some(ticker) = tickers.get(&pair.symbol) else {
            debug!(pair = %pair.symbol, "No ticker for pair");
            return Ok(None);
        };
        let price = ticker.last;

        self.portfolio.update_position_pnl(position.id, price).await?;

        let Some(new_stop) = position.trailing_stop_at(price) else {
            return Ok(None);
        };
        if !self.orders.adjust_stop_loss(position.id, new_stop).await? {
            return Ok(None);
        }
        Ok(Some(StopAdjustment {
            position_id: position.id,
            old_stop: position.stop_loss_price,
            new_stop: pair.round_price(new_stop),
        }))
    }

    /// Refresh the account balance, then recompute metrics.
    pub async fn update_portfolio(&self) -> Result<PortfolioMetrics> {
        self.portfolio.update_account_balance().await?;
        self.portfolio.calculate_metrics().await
    }

    /// Run one full trading cycle. Step failures are recorded in the report.
    pub async fn run_cycle(&self) -> CycleReport {
        let now = Utc::now();
        let mut report = CycleReport {
            timestamp: now,
            market_data_updated: false,
            signals_generated: 0,
            positions_created: 0,
            positions_monitored: 0,
            portfolio_updated: false,
            errors: Vec::new(),
        };
        let (last_market, last_signal) = {
            let ts = self.timestamps.read();
            (ts.last_market_update, ts.last_signal_generation)
        };

        if due(last_market, self.schedule.market_data_secs, now) {
            match self.update_market_data().await {
                Ok(_) => report.market_data_updated = true,
                Err(e) => report
                    .errors
                    .push(format!("Failed to update market data: {e}")),
            }
        }

        if due(last_signal, self.schedule.signal_generation_secs, now) {
            match self.generate_signals().await {
                Ok(signals) => {
                    report.signals_generated = signals.len();
                    if !signals.is_empty() {
                        match self.execute_signals(signals).await {
                            Ok(positions) => report.positions_created = positions.len(),
                            Err(e) => report
                                .errors
                                .push(format!("Failed to execute signals: {e}")),
                        }
                    }
                }
                Err(e) => report
                    .errors
                    .push(format!("Failed to generate signals: {e}")),
            }
        }

        match self.monitor_positions().await {
            Ok(monitor) => report.positions_monitored = monitor.monitored_positions,
            Err(e) => report
                .errors
                .push(format!("Failed to monitor positions: {e}")),
        }

        match self.update_portfolio().await {
            Ok(_) => report.portfolio_updated = true,
            Err(e) => report
                .errors
                .push(format!("Failed to update portfolio metrics: {e}")),
        }

        if report.errors.is_empty() {
            info!(
                signals = report.signals_generated,
                positions = report.positions_created,
                monitored = report.positions_monitored,
                "Trading cycle complete"
            );
        } else {
            warn!(errors = ?report.errors, "Trading cycle completed with errors");
        }
        report
    }

    /// Run cycles every tick until `shutdown` flips to `true` or its sender
    /// is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.portfolio.init().await?;
        if let Err(e) = self.initialize_pairs().await {
            error!(error = %e, "Pair initialization failed");
        }

        self.running.store(true, Ordering::SeqCst);
        info!(tick_secs = self.schedule.tick_secs, "Trading bot started");

        let mut ticker = tokio::time::interval(self.schedule.tick());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Trading bot stopped");
        Ok(())
    }

    /// Running flag, step timestamps, portfolio summary and the last day's
    /// signals.
    pub async fn status(&self) -> Result<BotStatus> {
        let portfolio = self.portfolio.summary().await?;
        let since = Utc::now() - chrono::Duration::hours(24);
        let signals = self.store.signals_since(since, RECENT_SIGNALS).await?;

        let mut recent_signals = Vec::with_capacity(signals.len());
        for signal in signals {
            if let Some(pair) = self.store.pair(signal.pair_id).await? {
                recent_signals.push(SignalView {
                    symbol: pair.symbol,
                    signal,
                });
            }
        }

        let (last_market_update, last_signal_generation) = {
            let ts = self.timestamps.read();
            (ts.last_market_update, ts.last_signal_generation)
        };
        Ok(BotStatus {
            is_running: self.is_running(),
            last_market_update,
            last_signal_generation,
            portfolio,
            recent_signals,
            intervals: self.schedule.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::domain::{OrderType, SignalType};
    use crate::testkit::config;
    use crate::testkit::domain::{asset_pair, pair, signal};
    use crate::testkit::exchange::ScriptedExchange;

    fn bot(exchange: &Arc<ScriptedExchange>, store: &Arc<MemoryStore>) -> TradingBot {
        let mut config = config::fast();
        config.trading.target_pairs = vec!["BTCUSD".into(), "ETHUSD".into(), "DOGEUSD".into()];
        config.risk.trailing_stop_pct = Some(dec!(2));
        TradingBot::new(exchange.clone(), store.clone(), &config)
    }

    #[test]
    fn due_after_interval() {
        let now = Utc::now();
        assert!(due(None, 60, now));
        assert!(!due(Some(now - chrono::Duration::seconds(59)), 60, now));
        assert!(due(Some(now - chrono::Duration::seconds(60)), 60, now));
    }

    #[tokio::test]
    async fn initialize_pairs_matches_kraken_names() {
        let exchange = Arc::new(ScriptedExchange::new());
        exchange.add_pair(asset_pair("XXBTZUSD", "XBTUSD"));
        exchange.add_pair(asset_pair("XETHZUSD", "ETHUSD"));
        let store = Arc::new(MemoryStore::new());
        let bot = bot(&exchange, &store);

        assert_eq!(bot.initialize_pairs().await.unwrap(), 2);
        assert_eq!(bot.initialize_pairs().await.unwrap(), 0);

        let btc = store.pair_by_symbol("BTCUSD").await.unwrap().unwrap();
        assert_eq!(btc.base_asset, "XBT");
        assert_eq!(btc.price_precision, 1);
        assert_eq!(btc.min_order_size, dec!(0.0001));
        assert!(store.pair_by_symbol("DOGEUSD").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn market_data_keeps_newest_candles() {
        let exchange = Arc::new(ScriptedExchange::new());
        let store = Arc::new(MemoryStore::new());
        let btc = pair("BTCUSD");
        store.save_pair(&btc).await.unwrap();
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + f64::from(i)).collect();
        exchange.set_candles("BTCUSD", crate::testkit::domain::exchange_candles(&closes));
        let bot = bot(&exchange, &store);

        assert_eq!(bot.update_market_data().await.unwrap(), 10);
        assert_eq!(bot.update_market_data().await.unwrap(), 0);
        let stored = store.recent_candles(btc.id, 100).await.unwrap();
        assert_eq!(stored.len(), 10);
        assert_eq!(stored[0].close_price, dec!(114));
    }

    #[tokio::test]
    async fn market_data_fails_when_every_pair_fails() {
        let exchange = Arc::new(ScriptedExchange::new());
        exchange.fail_market_data(true);
        let store = Arc::new(MemoryStore::new());
        store.save_pair(&pair("BTCUSD")).await.unwrap();
        let bot = bot(&exchange, &store);

        assert!(bot.update_market_data().await.is_err());
        assert!(bot.status().await.unwrap().last_market_update.is_none());
    }

    #[tokio::test]
    async fn execution_skipped_when_trading_disabled() {
        let exchange = Arc::new(ScriptedExchange::new());
        let store = Arc::new(MemoryStore::new());
        let btc = pair("BTCUSD");
        store.save_pair(&btc).await.unwrap();
        let bot = bot(&exchange, &store);
        bot.portfolio().set_trading_enabled(false).await.unwrap();

        let signals = vec![signal(btc.id, SignalType::Buy, dec!(100), dec!(110), dec!(95))];
        assert!(bot.execute_signals(signals).await.unwrap().is_empty());
        assert!(exchange.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn execution_takes_most_confident_and_sizes_by_balance() {
        let exchange = Arc::new(ScriptedExchange::new());
        exchange.set_balance("ZUSD", dec!(10000));
        exchange.set_trade_balance(dec!(10000));
        let store = Arc::new(MemoryStore::new());
        let btc = pair("BTCUSD");
        store.save_pair(&btc).await.unwrap();
        let bot = bot(&exchange, &store);
        bot.update_portfolio().await.unwrap();

        let mut signals = Vec::new();
        for (confidence, size) in [(0.65, 2.0), (0.9, 1.0), (0.7, 2.0), (0.8, 0.1)] {
            let mut s = signal(btc.id, SignalType::Buy, dec!(100), dec!(110), dec!(95));
            s.confidence = confidence;
            s.position_size_recommendation = size;
            signals.push(s);
        }

        let positions = bot.execute_signals(signals).await.unwrap();
        // 0.9 -> $100, 0.8 -> $10 (skipped), 0.7 -> $200
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].amount, dec!(1));
        assert_eq!(positions[1].amount, dec!(2));
    }

    #[tokio::test]
    async fn monitoring_trails_stop() {
        let exchange = Arc::new(ScriptedExchange::new());
        let store = Arc::new(MemoryStore::new());
        let btc = pair("BTCUSD");
        store.save_pair(&btc).await.unwrap();
        let bot = bot(&exchange, &store);

        let s = signal(btc.id, SignalType::Buy, dec!(100), dec!(110), dec!(95));
        let position = bot.orders().create_bracket_order(&s, dec!(1000)).await.unwrap();
        exchange.fill(&ScriptedExchange::txid(0), dec!(100));
        exchange.set_price("BTCUSD", dec!(105));

        let report = bot.monitor_positions().await.unwrap();
        assert_eq!(report.order_updates.len(), 1);
        assert_eq!(report.monitored_positions, 1);
        assert_eq!(
            report.adjustments,
            vec![StopAdjustment {
                position_id: position.id,
                old_stop: Some(dec!(95)),
                new_stop: dec!(103),
            }]
        );

        let stored = store.position(position.id).await.unwrap().unwrap();
        assert_eq!(stored.current_price, Some(dec!(105)));
        assert_eq!(stored.unrealized_pnl, dec!(50));
        assert_eq!(stored.stop_loss_price, Some(dec!(103)));
        let last = exchange.placed_orders().pop().unwrap();
        assert_eq!(last.order_type, OrderType::StopLoss);
    }
}
