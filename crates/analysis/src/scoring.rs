use kizashi_core::analysis::entity::{IndicatorResult, Signal, Tier};
use kizashi_core::market::entity::Candle;
use kizashi_indicator::average::{ema, sma};
use kizashi_indicator::levels::support_resistance;
use kizashi_indicator::momentum::{cci, macd, mfi, rsi, stochastic, williams_r};
use kizashi_indicator::trend::{adx, parabolic_sar};
use kizashi_indicator::volatility::{atr, bollinger};
use kizashi_indicator::volume::{obv, obv_slope, volume_oscillator, vwap};
use std::collections::BTreeMap;

/// 价格距最近支撑 / 阻力在该比例内视为贴近
const LEVEL_PROXIMITY: f64 = 0.02;

/// 三向规则：看涨得 `+points`，看跌得 `-points`，否则 0
fn rule(value: f64, signal: Signal, points: i32, tier: Tier, description: String) -> IndicatorResult {
    let score = match signal {
        Signal::Bullish => points,
        Signal::Bearish => -points,
        Signal::Neutral => 0,
    };
    IndicatorResult::new(value, signal, score, tier, description)
}

/// 由两个条件得到方向，都不满足时为中性
fn direction(bullish: bool, bearish: bool) -> Signal {
    if bullish {
        Signal::Bullish
    } else if bearish {
        Signal::Bearish
    } else {
        Signal::Neutral
    }
}

pub fn score_rsi(value: f64) -> IndicatorResult {
    let signal = direction(value < 30.0, value > 70.0);
    let text = match signal {
        Signal::Bullish => "oversold",
        Signal::Bearish => "overbought",
        Signal::Neutral => "neutral",
    };
    rule(value, signal, 2, Tier::Medium, format!("RSI(14) {:.1} {}", value, text))
}

pub fn score_adx(value: f64, plus_di: f64, minus_di: f64) -> IndicatorResult {
    let trending = value > 25.0;
    let signal = direction(trending && plus_di >= minus_di, trending && minus_di > plus_di);
    rule(
        value,
        signal,
        3,
        Tier::Medium,
        format!("ADX {:.1} (+DI {:.1} / -DI {:.1})", value, plus_di, minus_di),
    )
}

/// # Summary
/// 支撑 / 阻力贴近度评分。
///
/// # Logic
/// 1. 价格在最近支撑之上 2% 以内为看涨。
/// 2. 否则价格在最近阻力之下 2% 以内为看跌。
pub fn score_levels(price: f64, support: Option<f64>, resistance: Option<f64>) -> IndicatorResult {
    if let Some(s) = support
        && s > 0.0
        && (price - s) / s <= LEVEL_PROXIMITY
    {
        return rule(s, Signal::Bullish, 2, Tier::Context, format!("Near support {:.4}", s));
    }
    if let Some(r) = resistance
        && price > 0.0
        && (r - price) / price <= LEVEL_PROXIMITY
    {
        return rule(r, Signal::Bearish, 2, Tier::Context, format!("Near resistance {:.4}", r));
    }
    rule(price, Signal::Neutral, 2, Tier::Context, "No nearby level".to_string())
}

/// # Summary
/// 计算全部指标并按规则表评分。
///
/// # Logic
/// 每个指标在历史不足时使用其中性默认值，因此任何长度的输入都能得到完整的指标表。
///
/// # Returns
/// 以指标名为键的结果表，空输入返回空表。
pub fn score_indicators(candles: &[Candle]) -> BTreeMap<String, IndicatorResult> {
    let mut out = BTreeMap::new();
    let Some(last) = candles.last() else {
        return out;
    };
    let price = last.close;
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    out.insert("rsi".to_string(), score_rsi(rsi(&closes, 14)));

    let m = macd(&closes, 12, 26, 9);
    out.insert(
        "macd".to_string(),
        rule(
            m.macd,
            direction(m.macd > m.signal, m.macd < m.signal),
            9,
            Tier::High,
            format!("MACD {:.4} vs signal {:.4}", m.macd, m.signal),
        ),
    );

    let (ema20, ema50) = (ema(&closes, 20), ema(&closes, 50));
    out.insert(
        "ema_cross".to_string(),
        rule(
            ema20 - ema50,
            direction(ema20 > ema50, ema20 < ema50),
            9,
            Tier::High,
            format!("EMA20 {:.4} / EMA50 {:.4}", ema20, ema50),
        ),
    );

    let a = adx(candles, 14);
    out.insert("adx".to_string(), score_adx(a.adx, a.plus_di, a.minus_di));

    let sma50 = sma(&closes, 50);
    out.insert(
        "sma50".to_string(),
        rule(
            sma50,
            direction(price > sma50, price < sma50),
            3,
            Tier::Medium,
            format!("Price vs SMA50 {:.4}", sma50),
        ),
    );

    let bands = bollinger(&closes, 20, 2.0);
    let squeeze = if bands.squeeze { ", squeeze" } else { "" };
    out.insert(
        "bollinger".to_string(),
        rule(
            bands.width,
            direction(price < bands.lower, price > bands.upper),
            3,
            Tier::Medium,
            format!("Bands {:.4} - {:.4}{}", bands.lower, bands.upper, squeeze),
        ),
    );

    let stoch = stochastic(candles, 14, 3);
    out.insert(
        "stochastic".to_string(),
        rule(
            stoch.k,
            direction(stoch.k < 20.0, stoch.k > 80.0),
            2,
            Tier::Medium,
            format!("%K {:.1} / %D {:.1}", stoch.k, stoch.d),
        ),
    );

    let money_flow = mfi(candles, 14);
    out.insert(
        "mfi".to_string(),
        rule(
            money_flow,
            direction(money_flow < 20.0, money_flow > 80.0),
            2,
            Tier::Medium,
            format!("MFI {:.1}", money_flow),
        ),
    );

    let vw = vwap(candles);
    out.insert(
        "vwap".to_string(),
        rule(
            vw,
            direction(price > vw, price < vw),
            2,
            Tier::Medium,
            format!("VWAP {:.4}", vw),
        ),
    );

    let sar = parabolic_sar(candles, 0.02, 0.2);
    out.insert(
        "parabolic_sar".to_string(),
        rule(
            sar.value,
            direction(sar.uptrend, !sar.uptrend),
            2,
            Tier::Medium,
            format!("SAR {:.4}", sar.value),
        ),
    );

    let wr = williams_r(candles, 14);
    out.insert(
        "williams_r".to_string(),
        rule(
            wr,
            direction(wr < -80.0, wr > -20.0),
            1,
            Tier::Context,
            format!("Williams %R {:.1}", wr),
        ),
    );

    let commodity = cci(candles, 20);
    out.insert(
        "cci".to_string(),
        rule(
            commodity,
            direction(commodity < -100.0, commodity > 100.0),
            1,
            Tier::Context,
            format!("CCI {:.1}", commodity),
        ),
    );

    let slope = obv_slope(candles, 5);
    out.insert(
        "obv".to_string(),
        rule(
            obv(candles),
            direction(slope > 0.0, slope < 0.0),
            1,
            Tier::Context,
            format!("OBV 5-bar slope {:.1}", slope),
        ),
    );

    let vo = volume_oscillator(&volumes, 5, 10);
    let prev_close = closes.len().checked_sub(2).map(|i| closes[i]).unwrap_or(price);
    out.insert(
        "volume_oscillator".to_string(),
        rule(
            vo,
            direction(vo > 0.0 && price > prev_close, vo > 0.0 && price < prev_close),
            1,
            Tier::Context,
            format!("Volume oscillator {:.1}%", vo),
        ),
    );

    let levels = support_resistance(candles);
    out.insert(
        "support_resistance".to_string(),
        score_levels(price, levels.nearest_support(), levels.nearest_resistance()),
    );

    let range = atr(candles, 14);
    out.insert(
        "atr".to_string(),
        IndicatorResult::new(range, Signal::Neutral, 0, Tier::Context, format!("ATR(14) {:.4}", range)),
    );

    out
}
