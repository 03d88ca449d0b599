//! Test doubles and fixtures shared by the unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::constants::stages;
use crate::error::LlmError;
use crate::llm::{LlmCall, LlmRequest};
use crate::model::{parse_day, StockDisclosureRecord};

type Responder = dyn Fn(&LlmRequest, u32) -> Result<String, LlmError> + Send + Sync;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CallEvent {
    Start(String),
    End(String),
}

/// Answers each call through a closure that sees the request and the
/// 1-based count of calls made so far for that stage name. The count spans
/// every stock sharing the double, so it is a per-stage attempt number only
/// when a single stock runs.
pub(crate) struct ScriptedLlm {
    responder: Box<Responder>,
    events: Mutex<Vec<CallEvent>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl ScriptedLlm {
    pub(crate) fn new(
        responder: impl Fn(&LlmRequest, u32) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            events: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: Duration::from_millis(0),
        }
    }

    /// Every canonical stage answers with a valid object.
    pub(crate) fn canned() -> Self {
        Self::new(|req, _| Ok(canned_output(&req.stage).to_string()))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn events(&self) -> Vec<CallEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, stage: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, CallEvent::Start(s) if s == stage))
            .count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmCall for ScriptedLlm {
    async fn call(&self, request: LlmRequest) -> Result<String, LlmError> {
        let attempt = {
            let mut events = self.events.lock().unwrap();
            events.push(CallEvent::Start(request.stage.clone()));
            events
                .iter()
                .filter(|e| matches!(e, CallEvent::Start(s) if *s == request.stage))
                .count() as u32
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .push(CallEvent::End(request.stage.clone()));

        (self.responder)(&request, attempt)
    }
}

/// A schema-valid answer for each canonical stage.
pub(crate) fn canned_output(stage: &str) -> Value {
    match stage {
        stages::LISTING_REASON => json!({
            "reasons": ["日涨幅偏离值达7%的证券"],
            "signal_strength": "强",
            "interpretation": "资金抢筹意愿明确"
        }),
        stages::OVERALL_ASSESSMENT => json!({
            "verdict": "多方惨胜",
            "confidence_score": 0.72,
            "market_sentiment": {"level": "分歧", "interpretation": "高换手下分歧加大"},
            "capital_confrontation": {"level": "博弈", "interpretation": "买卖双方金额接近"},
            "key_takeaway": "多方小胜，次日看承接"
        }),
        stages::KEY_FORCES => json!({
            "buying_force": [{
                "seat_name": "国泰君安上海江苏路",
                "player_type": "知名游资",
                "player_name": "章盟主",
                "action_interpretation": "主买封板"
            }],
            "selling_force": [{
                "seat_name": "机构专用",
                "player_type": "机构",
                "action_interpretation": "高位兑现"
            }]
        }),
        stages::BUYER_ANALYSIS => json!({
            "concentration_level": "高度集中",
            "concentration_desc": "前两席占买入七成",
            "synergy_analysis": "无明显协同"
        }),
        stages::SELLER_ANALYSIS => json!({
            "pressure_level": "中",
            "pressure_desc": "机构获利了结"
        }),
        stages::HISTORICAL_CONTEXT => json!({
            "behavior_type": "突破",
            "trend_interpretation": "放量突破平台"
        }),
        stages::FINAL_VERDICT => json!({
            "outlook": "短线偏强",
            "strategy": "不追高，回踩五日线低吸",
            "risk_warning": "机构持续卖出"
        }),
        _ => json!({"ok": true}),
    }
}

/// A processed-feed record with seats, reasons and a three-bar window.
pub(crate) fn sample_record(ts_code: &str) -> StockDisclosureRecord {
    let raw = json!({
        "ts_code": ts_code,
        "name": "测试股份",
        "trade_date": "20250815",
        "basic_info": {
            "close": 12.34,
            "pct_change": "9.99%",
            "turnover_rate": "18.52%",
            "l_buy": "1.23亿",
            "l_sell": "4567.89万",
            "net_amount": "7732.11万",
            "float_values": "35.6亿",
            "reason": "日涨幅偏离值达7%的证券"
        },
        "seat_data": {
            "buy_seats": [{
                "seat_name": "国泰君安证券股份有限公司上海江苏路证券营业部",
                "player_type": "知名游资",
                "player_name": "章盟主",
                "buy_amount": "8012.00万",
                "style": ["打板", "趋势"]
            }],
            "sell_seats": [{
                "seat_name": "机构专用",
                "player_type": "机构专用",
                "sell_amount": "3120.45万"
            }]
        },
        "historical_data": {
            "chart_data": [
                {"trade_date": "20250813", "open": 10.1, "high": 10.5, "low": 10.0, "close": 10.2, "vol": 120000},
                {"trade_date": "20250814", "open": 10.2, "high": 11.3, "low": 10.2, "close": 11.22, "vol": 260000},
                {"trade_date": "20250815", "open": 11.3, "high": 12.34, "low": 11.2, "close": 12.34, "vol": 410000}
            ],
            "summary": {"days": 3}
        }
    });
    parse_day(&raw.to_string())
        .expect("fixture parses")
        .remove(0)
}
