//! Disclosure records as delivered by the data-processing step.
//!
//! Every type here is read-only input to the pipeline. The feed writes most
//! numbers as pre-formatted display strings (`"9.99%"`, `"1234.56万元"`), so
//! those are kept verbatim in [`Metric`] and parsed on demand.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

use crate::error::StoreError;

/// A display value from the feed: either a formatted string or a bare number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Metric(String);

impl Metric {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value with `%` dropped and `万`/`亿` multipliers applied.
    pub fn value(&self) -> Option<f64> {
        let mut text = self.0.trim();
        text = text.strip_suffix('元').unwrap_or(text);
        text = text.strip_suffix('%').unwrap_or(text);

        let (text, scale) = if let Some(t) = text.strip_suffix('亿') {
            (t, 1e8)
        } else if let Some(t) = text.strip_suffix('万') {
            (t, 1e4)
        } else {
            (text, 1.0)
        };

        text.trim().replace(',', "").parse::<f64>().ok().map(|v| v * scale)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Metric(s),
            Raw::Int(i) => Metric(i.to_string()),
            Raw::Float(f) => Metric(f.to_string()),
        })
    }
}

/// Who is behind a seat. Labels outside the closed set count as unclassified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerType {
    Institution,
    KnownSpeculator,
    Quant,
    #[default]
    Retail,
}

impl PlayerType {
    pub const ALL: [PlayerType; 4] = [
        PlayerType::Institution,
        PlayerType::KnownSpeculator,
        PlayerType::Quant,
        PlayerType::Retail,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PlayerType::Institution => "机构",
            PlayerType::KnownSpeculator => "知名游资",
            PlayerType::Quant => "量化",
            PlayerType::Retail => "普通席位",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "机构" | "机构专用" | "institution" => PlayerType::Institution,
            "知名游资" | "游资" | "known_speculator" => PlayerType::KnownSpeculator,
            "量化" | "quant" => PlayerType::Quant,
            _ => PlayerType::Retail,
        }
    }
}

impl Serialize for PlayerType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PlayerType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.map(|l| PlayerType::from_label(&l)).unwrap_or_default())
    }
}

/// One disclosed trading desk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub seat_name: String,
    #[serde(default)]
    pub player_type: PlayerType,
    #[serde(default)]
    pub player_name: Option<String>,

    #[serde(default, alias = "buy")]
    pub buy_amount: Option<Metric>,
    #[serde(default, alias = "sell")]
    pub sell_amount: Option<Metric>,
    #[serde(default, alias = "net")]
    pub net_amount: Option<Metric>,
    #[serde(default)]
    pub buy_rate: Option<Metric>,
    #[serde(default)]
    pub sell_rate: Option<Metric>,
    #[serde(default)]
    pub net_rate: Option<Metric>,

    /// Free-text behaviour profile from the known-player registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Style tags from the registry
    #[serde(default, deserialize_with = "tags", skip_serializing_if = "Vec::is_empty")]
    pub style: Vec<String>,
}

impl Seat {
    pub fn has_profile(&self) -> bool {
        self.description.is_some() || !self.style.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeatData {
    #[serde(default)]
    pub buy_seats: Vec<Seat>,
    #[serde(default)]
    pub sell_seats: Vec<Seat>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicInfo {
    #[serde(default)]
    pub close: Option<Metric>,
    #[serde(default)]
    pub pct_change: Option<Metric>,
    #[serde(default)]
    pub turnover_rate: Option<Metric>,
    #[serde(default)]
    pub amount: Option<Metric>,
    #[serde(default)]
    pub l_buy: Option<Metric>,
    #[serde(default)]
    pub l_sell: Option<Metric>,
    #[serde(default)]
    pub l_amount: Option<Metric>,
    #[serde(default)]
    pub net_amount: Option<Metric>,
    #[serde(default)]
    pub net_rate: Option<Metric>,
    #[serde(default)]
    pub amount_rate: Option<Metric>,
    #[serde(default)]
    pub float_values: Option<Metric>,
    /// Why the stock was listed today
    #[serde(default, alias = "reason", deserialize_with = "tags")]
    pub reasons: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    #[serde(alias = "trade_date")]
    pub date: String,
    #[serde(default)]
    pub open: Option<Metric>,
    #[serde(default)]
    pub high: Option<Metric>,
    #[serde(default)]
    pub low: Option<Metric>,
    #[serde(default)]
    pub close: Option<Metric>,
    #[serde(default, alias = "vol")]
    pub volume: Option<Metric>,
    #[serde(default)]
    pub amount: Option<Metric>,
    #[serde(default, alias = "pct_chg")]
    pub pct_change: Option<Metric>,
}

/// One trading day's dragon-tiger entry for one security.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StockDisclosureRecord {
    pub ts_code: String,
    pub name: String,
    pub trade_date: String,
    /// Absent when the feed carried no quote section for the stock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_info: Option<BasicInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_data: Option<SeatData>,
    #[serde(default, deserialize_with = "history_window")]
    pub historical_data: Option<Vec<DailyBar>>,
}

impl StockDisclosureRecord {
    /// The prior daily bars, if the feed provided a non-empty window.
    pub fn history(&self) -> Option<&[DailyBar]> {
        self.historical_data
            .as_deref()
            .filter(|bars| !bars.is_empty())
    }

    /// Today's listing reasons, empty when none were disclosed.
    pub fn reasons(&self) -> &[String] {
        self.basic_info
            .as_ref()
            .map(|info| info.reasons.as_slice())
            .unwrap_or_default()
    }

    /// The seat lists, if the feed disclosed at least one seat on either side.
    pub fn seats(&self) -> Option<&SeatData> {
        self.seat_data
            .as_ref()
            .filter(|seats| !seats.buy_seats.is_empty() || !seats.sell_seats.is_empty())
    }

    /// File-name friendly identity, `<name>_<code>` with dots replaced.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.name, self.ts_code.replace('.', "_"))
    }
}

/// Parse a processed day file: `{"meta":..,"stocks":[..]}`, a bare array, or
/// a single record.
pub fn parse_day(content: &str) -> Result<Vec<StockDisclosureRecord>, StoreError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DayPayload {
        Wrapped { stocks: Vec<StockDisclosureRecord> },
        List(Vec<StockDisclosureRecord>),
        Single(Box<StockDisclosureRecord>),
    }

    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    Ok(match serde_json::from_str::<DayPayload>(content)? {
        DayPayload::Wrapped { stocks } => stocks,
        DayPayload::List(stocks) => stocks,
        DayPayload::Single(record) => vec![*record],
    })
}

pub fn load_day(path: impl AsRef<Path>) -> Result<Vec<StockDisclosureRecord>, StoreError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    parse_day(&content)
}

/// Accepts a list of strings, a single string, or a map (flattened to
/// `key: value` tags).
fn tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(serde_json::Value::String(s)) => vec![s],
        Some(serde_json::Value::Array(items)) => items.into_iter().map(plain_text).collect(),
        Some(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| format!("{}: {}", k, plain_text(v)))
            .collect(),
        Some(other) => vec![plain_text(other)],
    })
}

fn plain_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn history_window<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<DailyBar>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Window {
        Bars(Vec<DailyBar>),
        Chart { chart_data: Vec<DailyBar> },
    }

    Ok(Option::<Window>::deserialize(deserializer)?.map(|w| match w {
        Window::Bars(bars) => bars,
        Window::Chart { chart_data } => chart_data,
    }))
}
