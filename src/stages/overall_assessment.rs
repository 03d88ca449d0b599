use crate::constants::stages::{LISTING_REASON, OVERALL_ASSESSMENT};
use crate::pipeline::{RecordField, StageDefinition};
use crate::schema::{FieldType, SchemaSpec, SentimentLevel, Verdict};

const TEMPLATE: &str = r#"你是一位A股龙虎榜分析专家。请对 {{ stock }} 今日的龙虎榜战局进行三维度综合评估：

1. **战局定性**: 给出多空胜负的最终判断
2. **市场情绪评估**: 基于`pct_change`和`turnover_rate`，评估市场的真实情绪
3. **资金对抗评估**: 基于所有资金相关数据（如`l_buy`, `l_sell`, `net_amount`等），评估主力资金的控盘力度和多空对抗的激烈程度
4. **核心结论**: 用一句话点出今天战局的核心看点

**重要提示**: 请确保你的分析是数据驱动的。同样的净买入额，对于小盘股（`float_values`低）的影响力远大于大盘股。
confidence_score 为0到1之间的小数。

**核心摘要数据 (JSON):**
{{ basic_info }}

{% if listing_reason_analysis %}
**上榜原因解读:**
{{ listing_reason_analysis }}
{% else %}
**上榜原因解读:** 不可用，请仅依据摘要数据判断。
{% endif %}
"#;

fn level() -> FieldType {
    FieldType::object(
        SchemaSpec::new()
            .required("level", FieldType::one_of(SentimentLevel::LABELS))
            .required("interpretation", FieldType::text()),
    )
}

pub fn schema() -> SchemaSpec {
    SchemaSpec::new()
        .required("verdict", FieldType::one_of(Verdict::LABELS))
        .required("confidence_score", FieldType::ranged(0.0, 1.0))
        .required("market_sentiment", level())
        .required("capital_confrontation", level())
        .required("key_takeaway", FieldType::text())
}

pub fn definition() -> StageDefinition {
    StageDefinition::new(OVERALL_ASSESSMENT, TEMPLATE, schema())
        .uses(LISTING_REASON)
        .reads(RecordField::StockIdentity)
        .reads(RecordField::BasicInfo)
}
