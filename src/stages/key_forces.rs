use crate::constants::stages::KEY_FORCES;
use crate::model::PlayerType;
use crate::pipeline::{RecordField, StageDefinition};
use crate::schema::{FieldType, SchemaSpec};

const TEMPLATE: &str = r#"你是一位精通识别游资和机构手法的专家。请基于以下龙虎榜席位数据，识别出 {{ stock }} 买卖双方阵营中的核心力量（优先选择知名游资、机构等）。

对于每个核心力量，请进行深入的风格画像分析：
1. **行为解读**: 他们今天具体做了什么？（例如：主封、接力、做T、出货）
2. **风格画像**: 如果席位带有 `style` 或 `description` 信息，结合其风格和今日行为，阐述他们的意图和后市可能的剧本。
   没有特殊信息的席位不需要硬做风格分析，style_profile 可以省略。

player_type 只能取: 机构、知名游资、量化、普通席位。

买方席位:
{{ buy_seats }}

卖方席位:
{{ sell_seats }}
"#;

fn force() -> FieldType {
    let player_types: Vec<&str> = PlayerType::ALL.iter().map(|p| p.label()).collect();
    let style = SchemaSpec::new()
        .optional("summary", FieldType::text())
        .optional("time_horizon", FieldType::text())
        .optional("preferred_setup", FieldType::text())
        .optional("typical_exit", FieldType::text());

    FieldType::list_of(FieldType::object(
        SchemaSpec::new()
            .required("seat_name", FieldType::text())
            .required("player_type", FieldType::one_of(&player_types))
            .optional("player_name", FieldType::text())
            .required("action_interpretation", FieldType::text())
            .optional("style_profile", FieldType::object(style)),
    ))
}

pub fn schema() -> SchemaSpec {
    SchemaSpec::new()
        .required("buying_force", force())
        .required("selling_force", force())
}

pub fn definition() -> StageDefinition {
    StageDefinition::new(KEY_FORCES, TEMPLATE, schema())
        .reads(RecordField::StockIdentity)
        .reads(RecordField::BuySeats)
        .reads(RecordField::SellSeats)
}
