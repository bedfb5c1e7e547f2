use crate::high_potential::HighPotentialScanner;
use crate::momentum::MomentumScanner;
use crate::support_resistance::SupportResistanceScanner;
use crate::trend_dip::TrendDipScanner;
use crate::volume_spike::VolumeSpikeScanner;
use kizashi_core::config::ConfluenceConfig;
use kizashi_core::scan::entity::{
    Badge, ConfluenceRecord, HighPotentialParams, HighPotentialResult, LevelKind, MomentumParams,
    MomentumResult, MomentumState, ScanSource, SrMode, SupportResistanceParams,
    SupportResistanceResult, TrendDipParams, TrendDipResult, VolumeSpikeParams, VolumeSpikeResult,
};
use kizashi_core::scan::port::Scanner;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

const SUPPORT_BONUS: i32 = 15;
const GOLDEN_SETUP_BONUS: i32 = 20;
const BREAKOUT_BONUS: i32 = 30;
const MOMENTUM_BONUS: i32 = 25;
const HEATED_BONUS: i32 = 10;
const VOLUME_SURGE_BONUS: i32 = 20;
const STRONG_SURGE_BONUS: i32 = 10;
const STRONG_SURGE_MULTIPLE: f64 = 3.0;
const DEEP_DIP_BONUS: i32 = 15;
const SHALLOW_DIP_BONUS: i32 = 5;
const DIP_RSI: f64 = 40.0;
const HIGH_POTENTIAL_BONUS: i32 = 10;
const LIKELY_UPSIDE_BONUS: i32 = 15;
const TWO_SOURCE_BONUS: i32 = 15;
const MULTI_SOURCE_BONUS: i32 = 30;
const SUPPORT_SURGE_BONUS: i32 = 15;
const BREAKOUT_SURGE_BONUS: i32 = 20;
const DIP_SUPPORT_BONUS: i32 = 15;

/// # Summary
/// 单次聚合的共振计分表。
///
/// # Invariants
/// - 交易对首次产生贡献时建档，价格取首次出现的值。
/// - 不产生贡献的结果（Resistance、Breakdown、CAUTION、TOPPED、兜底放量）不建档。
#[derive(Debug, Default)]
pub struct Tally {
    records: HashMap<String, ConfluenceRecord>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    fn credit(
        &mut self,
        symbol: &str,
        price: f64,
        source: ScanSource,
        bonus: i32,
        tag: &str,
        reason: String,
    ) -> &mut ConfluenceRecord {
        let record = self
            .records
            .entry(symbol.to_string())
            .or_insert_with(|| ConfluenceRecord::new(symbol, price));
        if !record.has_source(source) {
            record.sources.push(source);
        }
        record.score += bonus;
        record.tags.push(tag.to_string());
        record.reasons.push(reason);
        record
    }

    /// 支撑位反弹：Support +15，黄金形态再 +20
    pub fn add_support(&mut self, r: &SupportResistanceResult) {
        if r.kind != LevelKind::Support {
            return;
        }
        let record = self.credit(
            &r.symbol,
            r.price,
            ScanSource::Support,
            SUPPORT_BONUS,
            "Support",
            format!("Near support {:.6} ({:.2}% away)", r.level, r.distance_percent),
        );
        if r.badges.contains(&Badge::GoldenSetup) {
            record.score += GOLDEN_SETUP_BONUS;
            record.tags.push("Golden Setup".to_string());
            record
                .reasons
                .push(format!("Oversold at support with {} tests", r.tests));
        }
    }

    /// 向上突破：Breakout +30
    pub fn add_breakout(&mut self, r: &SupportResistanceResult) {
        if r.kind != LevelKind::Breakout {
            return;
        }
        self.credit(
            &r.symbol,
            r.price,
            ScanSource::Breakout,
            BREAKOUT_BONUS,
            "Breakout",
            format!("Breaking {:.6} ({:.2}%)", r.level, r.distance_percent),
        );
    }

    /// 动量：RIDE / MOMENTUM +25，HEATED +10
    pub fn add_momentum(&mut self, r: &MomentumResult) {
        let (bonus, tag) = match r.state {
            MomentumState::Ride => (MOMENTUM_BONUS, "RIDE"),
            MomentumState::Momentum => (MOMENTUM_BONUS, "MOMENTUM"),
            MomentumState::Heated => (HEATED_BONUS, "HEATED"),
            MomentumState::Caution | MomentumState::Topped => return,
        };
        self.credit(
            &r.symbol,
            r.price,
            ScanSource::Momentum,
            bonus,
            tag,
            format!(
                "Up {:.2}% in 24h on {:.1}x volume",
                r.change_24h, r.volume_factor
            ),
        );
    }

    /// 放量：+20，倍数不低于 3 时再 +10
    pub fn add_volume_spike(&mut self, r: &VolumeSpikeResult) {
        if r.fallback {
            return;
        }
        let bonus = if r.volume_multiple >= STRONG_SURGE_MULTIPLE {
            VOLUME_SURGE_BONUS + STRONG_SURGE_BONUS
        } else {
            VOLUME_SURGE_BONUS
        };
        self.credit(
            &r.symbol,
            r.price,
            ScanSource::VolumeSpike,
            bonus,
            "Volume Surge",
            format!("Volume {:.1}x the 20-bar average", r.volume_multiple),
        );
    }

    /// 趋势回调：1h RSI 低于 40 时 +15，否则 +5
    pub fn add_trend_dip(&mut self, r: &TrendDipResult) {
        let bonus = if r.rsi.h1 < DIP_RSI {
            DEEP_DIP_BONUS
        } else {
            SHALLOW_DIP_BONUS
        };
        self.credit(
            &r.symbol,
            r.price,
            ScanSource::TrendDip,
            bonus,
            "Trend Dip",
            format!("Above 4h EMA200 with 1h RSI {:.1}", r.rsi.h1),
        );
    }

    /// 高潜力：达标 +10，可能上行 10% 再 +15
    pub fn add_high_potential(&mut self, r: &HighPotentialResult) {
        if !r.passes {
            return;
        }
        let record = self.credit(
            &r.symbol,
            r.price,
            ScanSource::HighPotential,
            HIGH_POTENTIAL_BONUS,
            "High Potential",
            format!("Checklist score {}", r.score),
        );
        let upside = &r.likely_10_percent_upside;
        if upside.likely {
            record.score += LIKELY_UPSIDE_BONUS;
            record.tags.push("10% Upside".to_string());
            record
                .reasons
                .push(format!("{} of 5 upside conditions met", upside.met));
        }
    }

    /// # Summary
    /// 结算共振奖励并输出排行。
    ///
    /// # Logic
    /// 1. 两个来源 +15，三个及以上 +30。
    /// 2. 组合奖励：Support+VolumeSpike +15，Breakout+VolumeSpike +20，TrendDip+Support +15。
    /// 3. 过滤低于 `min_score` 的记录，按得分降序（同分按交易对）排序后截断。
    pub fn finish(self, min_score: i32, count: usize) -> Vec<ConfluenceRecord> {
        let mut out: Vec<ConfluenceRecord> = self
            .records
            .into_values()
            .map(|mut record| {
                apply_confluence(&mut record);
                record
            })
            .filter(|r| r.score >= min_score)
            .collect();
        out.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.symbol.cmp(&b.symbol)));
        out.truncate(count);
        out
    }
}

fn apply_confluence(record: &mut ConfluenceRecord) {
    let sources = record.sources.len();
    let agreement = match sources {
        0 | 1 => None,
        2 => Some(TWO_SOURCE_BONUS),
        _ => Some(MULTI_SOURCE_BONUS),
    };
    if let Some(bonus) = agreement {
        record.score += bonus;
        record.tags.push("Confluence".to_string());
        record
            .reasons
            .push(format!("{} scanners agree", sources));
    }

    let pairs = [
        (ScanSource::Support, ScanSource::VolumeSpike, SUPPORT_SURGE_BONUS, "Support bounce on volume"),
        (ScanSource::Breakout, ScanSource::VolumeSpike, BREAKOUT_SURGE_BONUS, "Breakout on volume"),
        (ScanSource::TrendDip, ScanSource::Support, DIP_SUPPORT_BONUS, "Trend dip into support"),
    ];
    for (a, b, bonus, reason) in pairs {
        if record.has_source(a) && record.has_source(b) {
            record.score += bonus;
            record.reasons.push(reason.to_string());
        }
    }
}

/// # Summary
/// 共振聚合器：并发运行一组扫描器，按交易对合并结果并计分。
pub struct ConfluenceAggregator {
    support_resistance: Arc<SupportResistanceScanner>,
    volume_spike: Arc<VolumeSpikeScanner>,
    momentum: Arc<MomentumScanner>,
    trend_dip: Arc<TrendDipScanner>,
    high_potential: Arc<HighPotentialScanner>,
    config: ConfluenceConfig,
}

impl ConfluenceAggregator {
    pub fn new(
        support_resistance: Arc<SupportResistanceScanner>,
        volume_spike: Arc<VolumeSpikeScanner>,
        momentum: Arc<MomentumScanner>,
        trend_dip: Arc<TrendDipScanner>,
        high_potential: Arc<HighPotentialScanner>,
        config: ConfluenceConfig,
    ) -> Self {
        Self {
            support_resistance,
            volume_spike,
            momentum,
            trend_dip,
            high_potential,
            config,
        }
    }

    fn sr_params(mode: SrMode) -> SupportResistanceParams {
        SupportResistanceParams {
            mode,
            ..SupportResistanceParams::default()
        }
    }

    /// # Summary
    /// 综合精选：支撑反弹、突破、放量、动量、趋势回调。
    ///
    /// # Arguments
    /// * `count`: 返回记录数量上限。
    pub async fn top_picks(&self, count: usize) -> Vec<ConfluenceRecord> {
        let (bounces, breakouts, spikes, movers, dips) = tokio::join!(
            self.support_resistance.scan(Self::sr_params(SrMode::Bounce)),
            self.support_resistance.scan(Self::sr_params(SrMode::Breakout)),
            self.volume_spike.scan(VolumeSpikeParams::default()),
            self.momentum.scan(MomentumParams::default()),
            self.trend_dip.scan(TrendDipParams::default()),
        );

        let mut tally = Tally::new();
        bounces.iter().for_each(|r| tally.add_support(r));
        breakouts.iter().for_each(|r| tally.add_breakout(r));
        spikes.iter().for_each(|r| tally.add_volume_spike(r));
        movers.iter().for_each(|r| tally.add_momentum(r));
        dips.iter().for_each(|r| tally.add_trend_dip(r));

        let picks = tally.finish(self.config.top_picks_min_score, count);
        info!("[confluence] top picks: {}", picks.len());
        picks
    }

    /// # Summary
    /// 热门形态：放量、动量、突破、高潜力。
    pub async fn hot_setups(&self, count: usize) -> Vec<ConfluenceRecord> {
        let (spikes, movers, breakouts, potentials) = tokio::join!(
            self.volume_spike.scan(VolumeSpikeParams::default()),
            self.momentum.scan(MomentumParams::default()),
            self.support_resistance.scan(Self::sr_params(SrMode::Breakout)),
            self.high_potential.scan(HighPotentialParams::default()),
        );

        let mut tally = Tally::new();
        spikes.iter().for_each(|r| tally.add_volume_spike(r));
        movers.iter().for_each(|r| tally.add_momentum(r));
        breakouts.iter().for_each(|r| tally.add_breakout(r));
        potentials.iter().for_each(|r| tally.add_high_potential(r));

        let setups = tally.finish(self.config.hot_setups_min_score, count);
        info!("[confluence] hot setups: {}", setups.len());
        setups
    }
}
