//! Day summary, built as a fold over stock outcomes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::constants::events;
use crate::report::{AnalysisReport, PipelineOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockState {
    Complete,
    /// Complete, but some optional stages were skipped
    Degraded,
    /// Stopped after at least one stage succeeded
    PartialFailure,
    /// No stage succeeded
    TotalFailure,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockLine {
    pub stock_id: String,
    pub stock_name: String,
    pub state: StockState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_stages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StockLine {
    pub fn of(outcome: &PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Complete(report) => Self {
                stock_id: report.stock_info.ts_code.clone(),
                stock_name: report.stock_info.name.clone(),
                state: if report.is_degraded() {
                    StockState::Degraded
                } else {
                    StockState::Complete
                },
                missing_stages: report.skipped_stages.iter().map(|s| s.stage.clone()).collect(),
                fatal_stage: None,
                reason: None,
            },
            PipelineOutcome::Failed(failure) => Self {
                stock_id: failure.stock_id.clone(),
                stock_name: failure.stock_name.clone(),
                state: if failure.completed_stages.is_empty() {
                    StockState::TotalFailure
                } else {
                    StockState::PartialFailure
                },
                missing_stages: Vec::new(),
                fatal_stage: failure.first_fatal_stage.clone(),
                reason: Some(failure.reason.clone()),
            },
        }
    }
}

/// Per player type, how many stocks had that type among the key forces of
/// each side. A stock counts once per side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerActivity {
    pub buy_side_appearances: BTreeMap<String, usize>,
    pub sell_side_appearances: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub verdict_distribution: BTreeMap<String, usize>,
    pub average_confidence: f64,
    pub kline_behavior_distribution: BTreeMap<String, usize>,
    pub market_sentiment_distribution: BTreeMap<String, usize>,
    pub capital_confrontation_distribution: BTreeMap<String, usize>,
    pub player_activity_summary: PlayerActivity,
    pub listing_reason_distribution: BTreeMap<String, usize>,

    #[serde(skip)]
    confidence_total: f64,
    #[serde(skip)]
    confidence_count: usize,
}

impl MarketStats {
    pub fn fold(mut self, report: &AnalysisReport) -> Self {
        if let Some(overall) = report.overall() {
            bump(&mut self.verdict_distribution, overall.verdict.label());
            bump(
                &mut self.market_sentiment_distribution,
                overall.market_sentiment.level.label(),
            );
            bump(
                &mut self.capital_confrontation_distribution,
                overall.capital_confrontation.level.label(),
            );
            self.confidence_total += overall.confidence_score;
            self.confidence_count += 1;
            self.average_confidence =
                round2(self.confidence_total / self.confidence_count as f64);
        }

        if let Some(historical) = report.historical() {
            bump(&mut self.kline_behavior_distribution, &historical.behavior_type);
        }

        if let Some(forces) = report.key_forces() {
            let buyers: BTreeSet<_> = forces.buying_force.iter().map(|f| f.player_type).collect();
            let sellers: BTreeSet<_> = forces.selling_force.iter().map(|f| f.player_type).collect();
            for player in buyers {
                bump(&mut self.player_activity_summary.buy_side_appearances, player.label());
            }
            for player in sellers {
                bump(&mut self.player_activity_summary.sell_side_appearances, player.label());
            }
        }

        if let Some(listing) = report.listing() {
            for reason in &listing.reasons {
                bump(&mut self.listing_reason_distribution, reason);
            }
        }

        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub trade_date: String,
    pub total: usize,
    pub complete: usize,
    pub degraded: usize,
    pub partial_failure: usize,
    pub total_failure: usize,
    /// Percentage of stocks with a report, one decimal
    pub success_rate: f64,
    pub stocks: Vec<StockLine>,
    pub summary_stats: MarketStats,
    pub generated_at: String,
}

impl BatchSummary {
    pub fn new(trade_date: impl Into<String>) -> Self {
        Self {
            trade_date: trade_date.into(),
            total: 0,
            complete: 0,
            degraded: 0,
            partial_failure: 0,
            total_failure: 0,
            success_rate: 0.0,
            stocks: Vec::new(),
            summary_stats: MarketStats::default(),
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    /// Add one stock's outcome.
    pub fn fold(mut self, outcome: &PipelineOutcome) -> Self {
        let line = StockLine::of(outcome);
        match line.state {
            StockState::Complete => self.complete += 1,
            StockState::Degraded => self.degraded += 1,
            StockState::PartialFailure => self.partial_failure += 1,
            StockState::TotalFailure => self.total_failure += 1,
        }
        self.total += 1;
        self.stocks.push(line);

        if let PipelineOutcome::Complete(report) = outcome {
            self.summary_stats = self.summary_stats.fold(report);
        }

        let reported = (self.complete + self.degraded) as f64;
        self.success_rate = (reported / self.total as f64 * 1000.0).round() / 10.0;
        self
    }

    pub fn from_outcomes<'a>(
        trade_date: impl Into<String>,
        outcomes: impl IntoIterator<Item = &'a PipelineOutcome>,
    ) -> Self {
        outcomes
            .into_iter()
            .fold(Self::new(trade_date), |summary, outcome| summary.fold(outcome))
    }

    pub fn reported(&self) -> usize {
        self.complete + self.degraded
    }

    pub fn log(&self) {
        info!(
            event = events::BATCH_SUMMARY,
            "📊 [BATCH] {}: {} stocks, {} complete, {} degraded, {} partial, {} failed ({}%)",
            self.trade_date,
            self.total,
            self.complete,
            self.degraded,
            self.partial_failure,
            self.total_failure,
            self.success_rate
        );
        for line in self.stocks.iter().filter(|l| l.state != StockState::Complete) {
            match line.state {
                StockState::Degraded => info!(
                    "📊 [BATCH]   {} {}: degraded, missing {}",
                    line.stock_id,
                    line.stock_name,
                    line.missing_stages.join(", ")
                ),
                _ => info!(
                    "📊 [BATCH]   {} {}: {:?} at {}: {}",
                    line.stock_id,
                    line.stock_name,
                    line.state,
                    line.fatal_stage.as_deref().unwrap_or("-"),
                    line.reason.as_deref().unwrap_or("")
                ),
            }
        }
        if !self.summary_stats.verdict_distribution.is_empty() {
            info!(
                "📊 [BATCH] Verdicts: {:?}, average confidence {:.2}",
                self.summary_stats.verdict_distribution, self.summary_stats.average_confidence
            );
        }
    }
}

fn bump(counter: &mut BTreeMap<String, usize>, key: &str) {
    *counter.entry(key.to_string()).or_insert(0) += 1;
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
