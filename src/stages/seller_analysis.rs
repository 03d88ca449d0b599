use crate::constants::stages::{KEY_FORCES, SELLER_ANALYSIS};
use crate::pipeline::{RecordField, StageDefinition};
use crate::schema::{FieldType, SchemaSpec, SignalStrength};

const TEMPLATE: &str = r#"请分析以下龙虎榜卖方席位数据，判断卖压的来源和性质：是来自特定主力的"集中出货"，还是普遍的"获利了结"？
pressure_level 用 强、中、弱 表示卖压大小。

卖方席位:
{{ sell_seats }}

已识别的核心力量:
{{ key_forces }}
"#;

pub fn schema() -> SchemaSpec {
    SchemaSpec::new()
        .required("pressure_level", FieldType::one_of(SignalStrength::LABELS))
        .required("pressure_desc", FieldType::text())
}

pub fn definition() -> StageDefinition {
    StageDefinition::new(SELLER_ANALYSIS, TEMPLATE, schema())
        .requires(KEY_FORCES)
        .reads(RecordField::SellSeats)
        .optional()
}
