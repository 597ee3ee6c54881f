//! The bar-loop runner — strictly sequential over dates.
//!
//! Per step: filter the day's bars (universe, daily rules, top-N score),
//! invoke the strategy against an immutable portfolio snapshot, apply its
//! orders in emission order with reject-don't-clip semantics, then recompute
//! equity and record the day. Later dates never run before an earlier date's
//! mutation is committed, and identical inputs always produce an identical
//! result.

use crate::data::market::MarketData;
use crate::domain::bar::Bar;
use crate::domain::order::{Order, OrderAction, OrderSize};
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::position::Position;
use crate::domain::score::ScoreConfig;
use crate::engine::params::{BacktestParams, ParamsError};
use crate::engine::result::{
    BacktestResult, DailyRecord, EquityPoint, OrderRecord, OrderStatus, RejectedOrder,
    SelectedCandidate, Summary, TradeRecord,
};
use crate::filters::daily_rules::DailyRuleFilter;
use crate::filters::universe::UniverseFilter;
use crate::fingerprint::fingerprint_run;
use crate::strategy::Strategy;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Run a backtest over materialized market data.
///
/// Dates absent from the data are skipped, not treated as zero-return days.
/// The warmup prefix feeds the strategy without trading or logging.
pub fn run_backtest(
    data: &MarketData,
    params: &BacktestParams,
    strategy: &mut dyn Strategy,
    universe: &UniverseFilter,
    rules: &DailyRuleFilter,
    score_cfg: &ScoreConfig,
) -> Result<BacktestResult, ParamsError> {
    params.validate()?;
    let members = universe.members(params.start_date);
    info!(
        strategy = strategy.name(),
        start = %params.start_date,
        end = %params.end_date,
        universe = members.len(),
        "backtest start"
    );

    let warmup_start = params.warmup_start();
    let dates: Vec<NaiveDate> = data
        .dates()
        .filter(|d| *d >= warmup_start && *d <= params.end_date)
        .collect();

    let mut cash = params.initial_cash;
    let mut positions: BTreeMap<String, Position> = BTreeMap::new();
    let mut last_prices: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut last_buy_date: BTreeMap<String, NaiveDate> = BTreeMap::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::new();
    let mut daily_log: Vec<DailyRecord> = Vec::new();
    let mut trades: Vec<TradeRecord> = Vec::new();
    let mut rejections: Vec<RejectedOrder> = Vec::new();
    let mut peak_equity = cash;

    strategy.on_start(params.start_date, params.end_date);

    for date in dates {
        let Some(all_bars) = data.bars_on(date) else {
            continue;
        };
        let member_bars: BTreeMap<String, Bar> = all_bars
            .iter()
            .filter(|(symbol, _)| members.contains(symbol.as_str()))
            .map(|(symbol, bar)| (symbol.clone(), bar.clone()))
            .collect();
        for (symbol, bar) in &member_bars {
            last_prices.insert(symbol.clone(), bar.close);
        }

        let (selected, candidates) = pick_top_n(
            &member_bars,
            data.prev_closes_on(date),
            rules,
            score_cfg,
        );

        let equity = equity_of(cash, &positions, &last_prices);
        let snapshot = PortfolioSnapshot {
            cash,
            equity,
            positions: positions.clone(),
        };

        if date < params.start_date {
            // Warmup: feed bars to the strategy, but do not trade or log.
            let _ = strategy.on_bar(date, &selected, &snapshot);
            continue;
        }

        let orders = strategy.on_bar(date, &selected, &snapshot);
        let mut day_orders: Vec<OrderRecord> = Vec::new();
        for order in orders {
            let record = apply_order(
                &order,
                date,
                equity,
                &member_bars,
                params,
                &mut cash,
                &mut positions,
                &mut last_buy_date,
                &mut trades,
                &mut rejections,
            );
            day_orders.push(record);
        }

        let equity = equity_of(cash, &positions, &last_prices);
        peak_equity = peak_equity.max(equity);
        let drawdown = if peak_equity > Decimal::ZERO {
            (equity / peak_equity).to_f64().unwrap_or(1.0) - 1.0
        } else {
            0.0
        };
        let invested_ratio = if equity > Decimal::ZERO {
            ((equity - cash) / equity).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };

        equity_curve.push(EquityPoint {
            date,
            cash,
            equity,
            drawdown,
            invested_ratio,
        });
        daily_log.push(DailyRecord {
            date,
            selected: candidates,
            orders: day_orders,
            positions: positions
                .iter()
                .map(|(symbol, pos)| (symbol.clone(), pos.quantity))
                .collect(),
            cash,
            equity,
        });
        debug!(%date, %equity, positions = positions.len(), "step complete");
    }

    let final_snapshot = PortfolioSnapshot {
        cash,
        equity: equity_of(cash, &positions, &last_prices),
        positions: positions.clone(),
    };
    strategy.on_finish(&final_snapshot);

    let final_equity = equity_curve
        .last()
        .map(|p| p.equity)
        .unwrap_or(params.initial_cash);
    let total_return = (final_equity / params.initial_cash)
        .to_f64()
        .unwrap_or(1.0)
        - 1.0;
    let max_drawdown = equity_curve
        .iter()
        .map(|p| p.drawdown)
        .fold(0.0f64, f64::min);
    let summary = Summary {
        total_return,
        max_drawdown,
        total_trades: trades.len(),
        total_rejections: rejections.len(),
        final_equity,
    };
    info!(
        trades = summary.total_trades,
        rejections = summary.total_rejections,
        final_equity = %summary.final_equity,
        "backtest complete"
    );

    Ok(BacktestResult {
        summary,
        equity_curve,
        daily_log,
        trades,
        rejections,
        fingerprint: fingerprint_run(strategy.name(), params, data),
    })
}

/// Equity identity: cash + Σ(quantity × last known close).
fn equity_of(
    cash: Decimal,
    positions: &BTreeMap<String, Position>,
    last_prices: &BTreeMap<String, Decimal>,
) -> Decimal {
    cash + positions
        .values()
        .map(|pos| {
            let price = last_prices.get(&pos.symbol).copied().unwrap_or(pos.avg_cost);
            pos.market_value(price)
        })
        .sum::<Decimal>()
}

/// Rank the day's rule-accepted bars and keep the top N.
fn pick_top_n(
    bars: &BTreeMap<String, Bar>,
    prev_closes: Option<&BTreeMap<String, Decimal>>,
    rules: &DailyRuleFilter,
    score_cfg: &ScoreConfig,
) -> (BTreeMap<String, Bar>, Vec<SelectedCandidate>) {
    let mut scored: Vec<(String, f64)> = bars
        .iter()
        .filter(|(_, bar)| rules.accepts(bar))
        .map(|(symbol, bar)| {
            let prev_close = prev_closes
                .and_then(|m| m.get(symbol))
                .copied()
                .unwrap_or(bar.close);
            (symbol.clone(), score_bar(bar, prev_close, score_cfg))
        })
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    let top_n = score_cfg.top_n.max(1);
    let candidates: Vec<SelectedCandidate> = scored
        .iter()
        .take(top_n)
        .map(|(symbol, score)| SelectedCandidate {
            symbol: symbol.clone(),
            score: *score,
            close: bars[symbol].close,
        })
        .collect();
    let selected: BTreeMap<String, Bar> = candidates
        .iter()
        .map(|c| (c.symbol.clone(), bars[&c.symbol].clone()))
        .collect();
    (selected, candidates)
}

fn score_bar(bar: &Bar, prev_close: Decimal, score_cfg: &ScoreConfig) -> f64 {
    let momentum = if prev_close > Decimal::ZERO {
        (bar.close / prev_close).to_f64().unwrap_or(1.0) - 1.0
    } else {
        0.0
    };
    score_cfg.momentum_weight * momentum
        + score_cfg.volume_weight * bar.volume_f64().max(0.0).ln_1p()
        + score_cfg.amount_weight * bar.amount_f64().max(0.0).ln_1p()
}

/// Apply one order atomically: cash and position update together or not at
/// all. Orders that do not fit are rejected with a reason, never clipped.
#[allow(clippy::too_many_arguments)]
fn apply_order(
    order: &Order,
    date: NaiveDate,
    equity: Decimal,
    bars: &BTreeMap<String, Bar>,
    params: &BacktestParams,
    cash: &mut Decimal,
    positions: &mut BTreeMap<String, Position>,
    last_buy_date: &mut BTreeMap<String, NaiveDate>,
    trades: &mut Vec<TradeRecord>,
    rejections: &mut Vec<RejectedOrder>,
) -> OrderRecord {
    let mut record = OrderRecord {
        symbol: order.symbol.clone(),
        action: order.action,
        size: order.size,
        status: OrderStatus::Skipped,
        reason: order.reason.clone(),
        detail: None,
        exec_quantity: None,
        exec_price: None,
    };

    let Some(bar) = bars.get(&order.symbol) else {
        record.detail = Some("no bar for symbol on this date".to_string());
        return record;
    };
    let price = bar.avg_price;
    if price <= Decimal::ZERO {
        record.detail = Some("non-positive reference price".to_string());
        return record;
    }

    let buy_price = price * (Decimal::ONE + params.slippage_rate);
    let sell_price = price * (Decimal::ONE - params.slippage_rate);
    let fee_mult = Decimal::ONE + params.fee_rate;
    let current_qty = positions
        .get(&order.symbol)
        .map(|p| p.quantity)
        .unwrap_or(Decimal::ZERO);

    // Resolve the order into an effective (action, quantity). Target-weight
    // orders size against pre-order equity and round down to whole shares.
    let resolved = match order.size {
        OrderSize::Quantity(qty) => {
            if qty <= Decimal::ZERO {
                record.detail = Some("non-positive quantity".to_string());
                return record;
            }
            (order.action, qty)
        }
        OrderSize::TargetPct(pct) => {
            let pct = pct.clamp(Decimal::ZERO, Decimal::ONE);
            let target_value = equity * pct;
            let desired_buy = (target_value / (buy_price * fee_mult)).floor();
            let desired_sell = (target_value / price).floor();
            if desired_buy > current_qty {
                (OrderAction::Buy, desired_buy - current_qty)
            } else if desired_sell < current_qty {
                (OrderAction::Sell, current_qty - desired_sell)
            } else {
                record.detail = Some("already at target weight".to_string());
                return record;
            }
        }
    };
    let (action, qty) = resolved;
    record.action = action;

    let mut reject = |record: &mut OrderRecord, reject_reason: String| {
        debug!(symbol = %order.symbol, %date, reason = %reject_reason, "order rejected");
        rejections.push(RejectedOrder {
            trade_date: date,
            symbol: order.symbol.clone(),
            action,
            size: order.size,
            order_reason: order.reason.clone(),
            reject_reason: reject_reason.clone(),
        });
        record.status = OrderStatus::Rejected;
        record.detail = Some(reject_reason);
    };

    match action {
        OrderAction::Buy => {
            let cost = qty * buy_price;
            let fee = cost * params.fee_rate;
            let total = cost + fee;
            if total > *cash {
                reject(
                    &mut record,
                    format!("insufficient cash: need {total}, have {cash}"),
                );
                return record;
            }
            *cash -= total;
            let position = positions
                .entry(order.symbol.clone())
                .or_insert_with(|| Position::new(order.symbol.clone(), Decimal::ZERO, Decimal::ZERO));
            let new_qty = position.quantity + qty;
            position.avg_cost = (position.avg_cost * position.quantity + cost) / new_qty;
            position.quantity = new_qty;
            last_buy_date.insert(order.symbol.clone(), date);
            trades.push(TradeRecord {
                symbol: order.symbol.clone(),
                trade_date: date,
                action,
                quantity: qty,
                price: buy_price,
                fee,
                cash_after: *cash,
                reason: order.reason.clone(),
            });
            record.status = OrderStatus::Executed;
            record.exec_quantity = Some(qty);
            record.exec_price = Some(buy_price);
        }
        OrderAction::Sell => {
            // T+1: a position opened today cannot be closed today.
            if last_buy_date.get(&order.symbol) == Some(&date) {
                reject(
                    &mut record,
                    "T+1: position opened today cannot be sold".to_string(),
                );
                return record;
            }
            if qty > current_qty {
                reject(
                    &mut record,
                    format!("insufficient position: need {qty}, have {current_qty}"),
                );
                return record;
            }
            let proceeds = qty * sell_price;
            let fee = proceeds * params.fee_rate;
            *cash += proceeds - fee;
            let remaining = current_qty - qty;
            if remaining <= Decimal::ZERO {
                positions.remove(&order.symbol);
            } else if let Some(position) = positions.get_mut(&order.symbol) {
                position.quantity = remaining;
            }
            trades.push(TradeRecord {
                symbol: order.symbol.clone(),
                trade_date: date,
                action,
                quantity: qty,
                price: sell_price,
                fee,
                cash_after: *cash,
                reason: order.reason.clone(),
            });
            record.status = OrderStatus::Executed;
            record.exec_quantity = Some(qty);
            record.exec_price = Some(sell_price);
        }
    }
    record
}
