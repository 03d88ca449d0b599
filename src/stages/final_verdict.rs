use crate::constants::stages::{
    BUYER_ANALYSIS, FINAL_VERDICT, HISTORICAL_CONTEXT, KEY_FORCES, LISTING_REASON,
    OVERALL_ASSESSMENT, SELLER_ANALYSIS,
};
use crate::pipeline::{RecordField, StageDefinition};
use crate::schema::{FieldType, SchemaSpec};

const TEMPLATE: &str = r#"你是一位经验丰富的投资顾问，擅长为散户提供清晰的交易策略。请综合以下所有分析模块的结论，为 {{ stock }} 给出完整的后市展望、具体的操作策略建议和明确的风险提示。

战局总览:
{{ overall_assessment }}

核心力量:
{{ key_forces }}

上榜原因解读:
{% if listing_reason_analysis %}
{{ listing_reason_analysis }}
{% else %}
不可用，请勿臆测该部分内容。
{% endif %}

买方结构:
{% if buyer_analysis %}
{{ buyer_analysis }}
{% else %}
不可用，请勿臆测该部分内容。
{% endif %}

卖方压力:
{% if seller_analysis %}
{{ seller_analysis }}
{% else %}
不可用，请勿臆测该部分内容。
{% endif %}

历史趋势:
{% if historical_context %}
{{ historical_context }}
{% else %}
不可用，请勿臆测该部分内容。
{% endif %}
"#;

pub fn schema() -> SchemaSpec {
    SchemaSpec::new()
        .required("outlook", FieldType::text())
        .required("strategy", FieldType::text())
        .required("risk_warning", FieldType::text())
}

pub fn definition() -> StageDefinition {
    StageDefinition::new(FINAL_VERDICT, TEMPLATE, schema())
        .requires(OVERALL_ASSESSMENT)
        .requires(KEY_FORCES)
        .uses(LISTING_REASON)
        .uses(BUYER_ANALYSIS)
        .uses(SELLER_ANALYSIS)
        .uses(HISTORICAL_CONTEXT)
        .reads(RecordField::StockIdentity)
}
