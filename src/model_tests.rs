#[cfg(test)]
mod model_tests {
    use crate::model::{load_day, parse_day, Metric, PlayerType, Seat};
    use serde_json::json;

    #[test]
    fn test_metric_value_applies_units() {
        assert_eq!(Metric::new("1.5亿").value(), Some(1.5e8));
        assert_eq!(Metric::new("4567万元").value(), Some(45_670_000.0));
        assert_eq!(Metric::new("9.99%").value(), Some(9.99));
        assert_eq!(Metric::new("1,234.5").value(), Some(1234.5));
        assert_eq!(Metric::new("-").value(), None);
    }

    #[test]
    fn test_metric_accepts_bare_numbers() {
        let m: Metric = serde_json::from_value(json!(12.34)).unwrap();
        assert_eq!(m.as_str(), "12.34");
        let m: Metric = serde_json::from_value(json!(410000)).unwrap();
        assert_eq!(m.value(), Some(410000.0));
    }

    #[test]
    fn test_player_type_labels() {
        assert_eq!(PlayerType::from_label("机构专用"), PlayerType::Institution);
        assert_eq!(PlayerType::from_label(" 知名游资 "), PlayerType::KnownSpeculator);
        assert_eq!(PlayerType::from_label("量化"), PlayerType::Quant);
        assert_eq!(PlayerType::from_label("某营业部"), PlayerType::Retail);

        let seat: Seat = serde_json::from_value(json!({
            "seat_name": "某营业部",
            "player_type": null
        }))
        .unwrap();
        assert_eq!(seat.player_type, PlayerType::Retail);
        assert_eq!(
            serde_json::to_value(PlayerType::Institution).unwrap(),
            json!("机构")
        );
    }

    #[test]
    fn test_seat_profile_from_style_map() {
        let seat: Seat = serde_json::from_value(json!({
            "seat_name": "华鑫证券上海分公司",
            "style": {"偏好": "打板"}
        }))
        .unwrap();
        assert!(seat.has_profile());
        assert_eq!(seat.style, vec!["偏好: 打板".to_string()]);
    }

    #[test]
    fn test_reason_alias_and_single_string() {
        let records = parse_day(
            &json!([{
                "ts_code": "000001.SZ",
                "name": "平安银行",
                "trade_date": "20250815",
                "basic_info": {"reason": "连续三个交易日内收盘价格涨幅偏离值累计达20%"}
            }])
            .to_string(),
        )
        .unwrap();
        assert_eq!(
            records[0].reasons(),
            vec!["连续三个交易日内收盘价格涨幅偏离值累计达20%".to_string()]
        );
    }

    #[test]
    fn test_history_window_shapes() {
        let bare = parse_day(
            &json!({
                "ts_code": "000001.SZ",
                "name": "平安银行",
                "trade_date": "20250815",
                "historical_data": [{"trade_date": "20250814", "close": 11.0}]
            })
            .to_string(),
        )
        .unwrap();
        assert_eq!(bare[0].history().map(|b| b.len()), Some(1));

        let empty = parse_day(
            &json!({
                "ts_code": "000001.SZ",
                "name": "平安银行",
                "trade_date": "20250815",
                "historical_data": {"chart_data": []}
            })
            .to_string(),
        )
        .unwrap();
        assert!(empty[0].history().is_none());

        let missing = parse_day(
            &json!({"ts_code": "000001.SZ", "name": "平安银行", "trade_date": "20250815"})
                .to_string(),
        )
        .unwrap();
        assert!(missing[0].history().is_none());
    }

    #[test]
    fn test_missing_sections_stay_absent() {
        let bare = parse_day(
            &json!({"ts_code": "600000.SH", "name": "浦发银行", "trade_date": "20250815"})
                .to_string(),
        )
        .unwrap()
        .remove(0);
        assert!(bare.basic_info.is_none());
        assert!(bare.seat_data.is_none());
        assert!(bare.seats().is_none());
        assert!(bare.reasons().is_empty());

        let empty_seats = parse_day(
            &json!({
                "ts_code": "600000.SH",
                "name": "浦发银行",
                "trade_date": "20250815",
                "seat_data": {"buy_seats": [], "sell_seats": []}
            })
            .to_string(),
        )
        .unwrap()
        .remove(0);
        assert!(empty_seats.seat_data.is_some());
        assert!(empty_seats.seats().is_none());

        let one_side = parse_day(
            &json!({
                "ts_code": "600000.SH",
                "name": "浦发银行",
                "trade_date": "20250815",
                "seat_data": {"sell_seats": [{"seat_name": "机构专用"}]}
            })
            .to_string(),
        )
        .unwrap()
        .remove(0);
        assert_eq!(one_side.seats().map(|s| s.sell_seats.len()), Some(1));
    }

    #[test]
    fn test_parse_day_variants() {
        let record = json!({"ts_code": "600000.SH", "name": "浦发银行", "trade_date": "20250815"});

        let wrapped = parse_day(
            &json!({"meta": {"count": 1}, "stocks": [record.clone()]}).to_string(),
        )
        .unwrap();
        let list = parse_day(&json!([record.clone()]).to_string()).unwrap();
        let single = parse_day(&format!("\u{feff}{}", record)).unwrap();

        for records in [wrapped, list, single] {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].ts_code, "600000.SH");
        }

        assert!(parse_day("not json").is_err());
    }

    #[test]
    fn test_load_day_missing_file() {
        let path = std::env::temp_dir().join(format!("missing_{}.json", uuid::Uuid::new_v4()));
        assert!(load_day(&path).is_err());
    }

    #[test]
    fn test_file_stem_replaces_dots() {
        let records = parse_day(
            &json!({"ts_code": "600000.SH", "name": "浦发银行", "trade_date": "20250815"})
                .to_string(),
        )
        .unwrap();
        assert_eq!(records[0].file_stem(), "浦发银行_600000_SH");
    }
}
