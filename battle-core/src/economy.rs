//! Battle coin economy: recharge conversion, shop catalog and VIP plans

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// Battle coins granted per currency unit recharged
pub const COINS_PER_RECHARGE_UNIT: f64 = 10.0;

/// Battle coins per currency unit when paying for VIP
pub const VIP_COINS_PER_PRICE_UNIT: i64 = 10;

/// Coins earned per VIP month
pub const VIP_MONTHLY_COINS: i64 = 100;

/// Comments a VIP member may pin
pub const VIP_PINNED_COMMENTS: i64 = 3;

/// Largest amount accepted in a single recharge
pub const MAX_RECHARGE_AMOUNT: f64 = 100_000.0;

/// Reject recharge amounts that are not a positive finite number, or that
/// exceed [`MAX_RECHARGE_AMOUNT`]
pub fn validate_recharge_amount(amount: f64) -> Result<f64, CoreError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CoreError::InvalidAmount(
            "Recharge amount must be greater than zero".into(),
        ));
    }
    if amount > MAX_RECHARGE_AMOUNT {
        return Err(CoreError::InvalidAmount(format!(
            "Recharge amount cannot exceed {}",
            MAX_RECHARGE_AMOUNT
        )));
    }
    Ok(amount)
}

/// Battle coins bought by recharging `amount`, floored
pub fn coins_from_recharge(amount: f64) -> i64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    (amount * COINS_PER_RECHARGE_UNIT).floor() as i64
}

/// A purchasable shop item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopItem {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: i64,
    pub item_type: &'static str,
    pub effect: &'static str,
}

/// Items the shop sells
pub const SHOP_CATALOG: [ShopItem; 4] = [
    ShopItem {
        id: "highlight_comment",
        name: "Comment Highlight Card",
        description: "Highlight your comment inside a ranking",
        price: 90,
        item_type: "HIGHLIGHT",
        effect: "comment_highlight",
    },
    ShopItem {
        id: "anonymous_comment",
        name: "Anonymous Comment Card",
        description: "Post anonymous comments (5 uses)",
        price: 250,
        item_type: "ANONYMOUS",
        effect: "anonymous_comment",
    },
    ShopItem {
        id: "boost_ranking",
        name: "Ranking Boost Card",
        description: "Feature your ranking on the front page for 3 days",
        price: 500,
        item_type: "BOOST",
        effect: "ranking_boost",
    },
    ShopItem {
        id: "change_title",
        name: "Title Change Card",
        description: "Set a custom title",
        price: 666,
        item_type: "TITLE",
        effect: "custom_title",
    },
];

pub fn shop_item(id: &str) -> Option<&'static ShopItem> {
    SHOP_CATALOG.iter().find(|item| item.id == id)
}

/// Total coin cost of buying `quantity` of an item
pub fn purchase_cost(price: i64, quantity: i64) -> Result<i64, CoreError> {
    if quantity < 1 {
        return Err(CoreError::InvalidAmount("Quantity must be at least 1".into()));
    }
    price
        .checked_mul(quantity)
        .ok_or_else(|| CoreError::InvalidAmount("Quantity too large".into()))
}

/// VIP subscription plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VipPlan {
    MonthlyContinuous,
    YearlyContinuous,
    Monthly,
    Yearly,
}

/// Price sheet entry for a VIP plan
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VipPlanInfo {
    #[serde(rename = "type")]
    pub plan: VipPlan,
    pub name: &'static str,
    pub price: i64,
    pub days: i64,
    pub coin_cost: i64,
}

impl VipPlan {
    pub const ALL: [VipPlan; 4] = [
        VipPlan::MonthlyContinuous,
        VipPlan::YearlyContinuous,
        VipPlan::Monthly,
        VipPlan::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VipPlan::MonthlyContinuous => "MONTHLY_CONTINUOUS",
            VipPlan::YearlyContinuous => "YEARLY_CONTINUOUS",
            VipPlan::Monthly => "MONTHLY",
            VipPlan::Yearly => "YEARLY",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VipPlan::MonthlyContinuous => "Continuous Monthly",
            VipPlan::YearlyContinuous => "Continuous Yearly",
            VipPlan::Monthly => "Monthly",
            VipPlan::Yearly => "Yearly",
        }
    }

    /// List price in currency units
    pub fn price(&self) -> i64 {
        match self {
            VipPlan::MonthlyContinuous => 9,
            VipPlan::YearlyContinuous => 99,
            VipPlan::Monthly => 10,
            VipPlan::Yearly => 120,
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            VipPlan::MonthlyContinuous | VipPlan::Monthly => 30,
            VipPlan::YearlyContinuous | VipPlan::Yearly => 365,
        }
    }

    pub fn coin_cost(&self) -> i64 {
        self.price() * VIP_COINS_PER_PRICE_UNIT
    }

    pub fn info(&self) -> VipPlanInfo {
        VipPlanInfo {
            plan: *self,
            name: self.name(),
            price: self.price(),
            days: self.days(),
            coin_cost: self.coin_cost(),
        }
    }

    /// New membership window when buying this plan at `now`
    ///
    /// An active membership is extended from its current end date; an
    /// expired or missing one starts fresh.
    pub fn membership_window(
        &self,
        now: DateTime<Utc>,
        current_end: Option<DateTime<Utc>>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = match current_end {
            Some(end) if end > now => end,
            _ => now,
        };
        (start, start + Duration::days(self.days()))
    }
}

impl FromStr for VipPlan {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VipPlan::ALL
            .into_iter()
            .find(|plan| plan.as_str() == s)
            .ok_or_else(|| CoreError::unknown("VIP plan", s))
    }
}

/// Whole days left on a membership, rounded up; zero once expired
pub fn remaining_days(end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    if end <= now {
        return 0;
    }
    let seconds = (end - now).num_seconds();
    let day = 24 * 60 * 60;
    (seconds + day - 1) / day
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_recharge_conversion() {
        assert_eq!(coins_from_recharge(68.0), 680);
        assert_eq!(coins_from_recharge(0.55), 5);
        assert_eq!(coins_from_recharge(0.0), 0);
        assert!(validate_recharge_amount(0.0).is_err());
        assert!(validate_recharge_amount(f64::INFINITY).is_err());
        assert!(validate_recharge_amount(-1.0).is_err());
        assert_eq!(validate_recharge_amount(6.0).unwrap(), 6.0);
        assert_eq!(validate_recharge_amount(MAX_RECHARGE_AMOUNT).unwrap(), MAX_RECHARGE_AMOUNT);
        assert!(validate_recharge_amount(MAX_RECHARGE_AMOUNT + 0.01).is_err());
        assert!(validate_recharge_amount(1e18).is_err());
    }

    #[test]
    fn test_shop_catalog() {
        assert_eq!(shop_item("change_title").unwrap().price, 666);
        assert!(shop_item("golden_throne").is_none());
        assert_eq!(purchase_cost(90, 3).unwrap(), 270);
        assert!(purchase_cost(90, 0).is_err());
        assert!(purchase_cost(i64::MAX, 2).is_err());
    }

    #[test]
    fn test_vip_plan_costs() {
        assert_eq!(VipPlan::MonthlyContinuous.coin_cost(), 90);
        assert_eq!(VipPlan::Yearly.coin_cost(), 1200);
        assert_eq!("YEARLY_CONTINUOUS".parse::<VipPlan>().unwrap().days(), 365);
        assert!("WEEKLY".parse::<VipPlan>().is_err());
    }

    #[test]
    fn test_membership_extends_active_window() {
        let now = at(1);
        let (start, end) = VipPlan::Monthly.membership_window(now, None);
        assert_eq!(start, now);
        assert_eq!(end, now + Duration::days(30));

        let (start, end) = VipPlan::Monthly.membership_window(at(2), Some(end));
        assert_eq!(start, now + Duration::days(30));
        assert_eq!(end, now + Duration::days(60));

        // Expired memberships restart from now
        let (start, _) = VipPlan::Monthly.membership_window(at(20), Some(at(10)));
        assert_eq!(start, at(20));
    }

    #[test]
    fn test_remaining_days_rounds_up() {
        assert_eq!(remaining_days(at(3), at(1)), 2);
        assert_eq!(remaining_days(at(3) + Duration::hours(1), at(1)), 3);
        assert_eq!(remaining_days(at(1), at(3)), 0);
    }
}
