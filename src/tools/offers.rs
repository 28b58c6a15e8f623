//! 优惠查询工具：返回当前可用的优惠码列表

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::tools::Tool;

pub const OFFERS_TOOL_NAME: &str = "offers_query_tool";

#[derive(Debug, Clone, Serialize)]
pub struct Offer {
    pub code: &'static str,
    pub discount_percent: u8,
}

pub const OFFERS: [Offer; 3] = [
    Offer {
        code: "LAUNCH_10",
        discount_percent: 10,
    },
    Offer {
        code: "SUMMER_15",
        discount_percent: 15,
    },
    Offer {
        code: "VIP_20",
        discount_percent: 20,
    },
];

/// 优惠工具：无参数，固定返回三条优惠
pub struct OffersTool;

#[async_trait]
impl Tool for OffersTool {
    fn name(&self) -> &str {
        OFFERS_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Call this tool to get the available offer and discounts"
    }

    async fn execute(&self, _args: Value) -> Result<String, String> {
        serde_json::to_string(&OFFERS).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_offers_list() {
        let out = OffersTool.execute(json!({})).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed,
            json!([
                {"code": "LAUNCH_10", "discount_percent": 10},
                {"code": "SUMMER_15", "discount_percent": 15},
                {"code": "VIP_20", "discount_percent": 20}
            ])
        );
    }
}
