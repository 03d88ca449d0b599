use crate::constants::stages::LISTING_REASON;
use crate::pipeline::{RecordField, StageDefinition};
use crate::schema::{FieldType, SchemaSpec, SignalStrength};

const TEMPLATE: &str = r#"你是一位A股龙虎榜分析专家。请解读 {{ stock }} 今日的上榜原因。

上榜原因列表:
{{ listing_reasons }}

{% if basic_info %}
核心摘要数据 (JSON):
{{ basic_info }}
{% else %}
核心摘要数据: 不可用
{% endif %}

请分析：
1. 这些原因说明了什么？
2. 它们反映了当前市场对这只股票怎样的情绪和博弈状态？（例如：是强烈的多头共识，还是剧烈的多空分歧？）
3. 给出上榜信号的强度。
"#;

pub fn schema() -> SchemaSpec {
    SchemaSpec::new()
        .required("reasons", FieldType::list_of(FieldType::text()))
        .required("signal_strength", FieldType::one_of(SignalStrength::LABELS))
        .required("interpretation", FieldType::text())
}

/// Optional: a stock listed without reasons still gets a report.
pub fn definition() -> StageDefinition {
    StageDefinition::new(LISTING_REASON, TEMPLATE, schema())
        .reads(RecordField::StockIdentity)
        .reads(RecordField::ListingReasons)
        .reads_optional(RecordField::BasicInfo)
        .optional()
}
