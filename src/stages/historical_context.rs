use crate::constants::stages::HISTORICAL_CONTEXT;
use crate::pipeline::{RecordField, StageDefinition};
use crate::schema::{FieldType, SchemaSpec};

const TEMPLATE: &str = r#"你是一位精通"量价时空"的K线分析专家。请基于 {{ stock }} 近期的日K线数据，分析龙虎榜当天（即数据中的最后一天）的上榜行为。

1. **行为定性 (behavior_type):** 对本次上榜行为给出一个清晰、简洁的定性判断。
2. **趋势解读 (trend_interpretation):** 说明当前股价处于短期趋势的哪个阶段，结合上榜日及前几日的成交量变化分析量价配合，并指出关键的K线形态或技术信号。

近期K线数据:
{{ historical_bars }}
"#;

pub fn schema() -> SchemaSpec {
    SchemaSpec::new()
        .required("behavior_type", FieldType::text())
        .required("trend_interpretation", FieldType::text())
}

/// Runs only when the feed carries a bar window.
pub fn definition() -> StageDefinition {
    StageDefinition::new(HISTORICAL_CONTEXT, TEMPLATE, schema())
        .reads(RecordField::StockIdentity)
        .reads(RecordField::HistoricalBars)
        .optional()
}
