use crate::constants::stages::{BUYER_ANALYSIS, KEY_FORCES};
use crate::pipeline::{RecordField, StageDefinition};
use crate::schema::{FieldType, SchemaSpec};

pub const CONCENTRATION_LEVELS: &[&str] = &["高度集中", "相对分散"];

const TEMPLATE: &str = r#"请基于以下龙虎榜买方席位数据，分析买方结构：

1. 买方的集中度是"高度集中"还是"相对分散"？
2. 是否存在协同作战的迹象（比如多个知名游资同时上榜）？

买方席位:
{{ buy_seats }}

已识别的核心力量:
{{ key_forces }}
"#;

pub fn schema() -> SchemaSpec {
    SchemaSpec::new()
        .required("concentration_level", FieldType::one_of(CONCENTRATION_LEVELS))
        .required("concentration_desc", FieldType::text())
        .required("synergy_analysis", FieldType::text())
}

pub fn definition() -> StageDefinition {
    StageDefinition::new(BUYER_ANALYSIS, TEMPLATE, schema())
        .requires(KEY_FORCES)
        .reads(RecordField::BuySeats)
        .optional()
}
