use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

impl User {
    pub fn new(organization_id: Uuid, email: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            email: email.to_lowercase(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_active: true,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Digits only.
    pub phone: String,
    pub email: Option<String>,
    pub total_lifetime_value: Decimal,
    pub total_purchases: u32,
    pub last_purchase_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub organization_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl Customer {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Lifetime aggregates recomputed from all of a customer's sales.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerStats {
    pub total_lifetime_value: Decimal,
    pub total_purchases: u32,
    pub last_purchase_date: Option<NaiveDate>,
}

impl CustomerStats {
    /// `None` if the lifetime value leaves the `Decimal` range.
    pub fn from_sales<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> Option<Self> {
        let mut stats = CustomerStats {
            total_lifetime_value: Decimal::ZERO,
            total_purchases: 0,
            last_purchase_date: None,
        };

        for sale in sales {
            stats.total_lifetime_value =
                stats.total_lifetime_value.checked_add(sale.total_amount)?;
            stats.total_purchases = stats.total_purchases.checked_add(1)?;
            stats.last_purchase_date = stats.last_purchase_date.max(Some(sale.sale_date));
        }

        Some(stats)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCategory {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub code: String,
}

impl ProductCategory {
    pub fn new(organization_id: Uuid, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name: name.to_string(),
            code: category_code(name),
        }
    }
}

/// "Living Room" -> "LIVING_ROOM"
pub fn category_code(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub location_id: Uuid,
    pub salesperson_id: Uuid,
    pub customer_id: Uuid,
    pub transaction_number: String,
    pub sale_date: NaiveDate,
    pub sale_time: NaiveTime,
    pub total_amount: Decimal,
    pub fcp_amount: Decimal,
    pub hours_worked: Decimal,
    pub customer_name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub category_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub cost_price: Option<Decimal>,
    pub margin_amount: Option<Decimal>,
    pub margin_percentage: Option<Decimal>,
}

impl SaleItem {
    /// Prices the line. `None` when the line total or margin leaves the
    /// `Decimal` range.
    pub fn new(
        sale_id: Uuid,
        category_id: Uuid,
        product_name: &str,
        quantity: u32,
        unit_price: Decimal,
        cost_price: Option<Decimal>,
    ) -> Option<Self> {
        let quantity_dec = Decimal::from(quantity);
        let line_total = quantity_dec.checked_mul(unit_price)?;
        let margin_amount = match cost_price {
            Some(cost) => Some(line_total.checked_sub(cost.checked_mul(quantity_dec)?)?),
            None => None,
        };
        let margin_percentage = match margin_amount {
            Some(margin) if !line_total.is_zero() => Some(
                margin
                    .checked_div(line_total)?
                    .checked_mul(Decimal::ONE_HUNDRED)?
                    .round_dp(2),
            ),
            _ => None,
        };

        Some(Self {
            id: Uuid::new_v4(),
            sale_id,
            category_id,
            product_name: product_name.to_string(),
            quantity,
            unit_price,
            line_total,
            cost_price,
            margin_amount,
            margin_percentage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_category_code() {
        assert_eq!(category_code("Living Room"), "LIVING_ROOM");
        assert_eq!(category_code("  dining   room set "), "DINING_ROOM_SET");
        assert_eq!(category_code("Bedroom"), "BEDROOM");
    }

    #[test]
    fn test_sale_item_margin() {
        let item = SaleItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Sofa",
            2,
            Decimal::from(500),
            Some(Decimal::from(300)),
        )
        .unwrap();

        assert_eq!(item.line_total, Decimal::from(1000));
        assert_eq!(item.margin_amount, Some(Decimal::from(400)));
        assert_eq!(item.margin_percentage, Some(Decimal::from(40)));
    }

    #[test]
    fn test_sale_item_without_cost() {
        let item = SaleItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Lamp",
            3,
            Decimal::from_str("19.99").unwrap(),
            None,
        )
        .unwrap();

        assert_eq!(item.line_total, Decimal::from_str("59.97").unwrap());
        assert_eq!(item.margin_amount, None);
        assert_eq!(item.margin_percentage, None);
    }

    #[test]
    fn test_sale_item_zero_price_has_no_percentage() {
        let item = SaleItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Promo pillow",
            1,
            Decimal::ZERO,
            Some(Decimal::from(5)),
        )
        .unwrap();

        assert_eq!(item.margin_amount, Some(Decimal::from(-5)));
        assert_eq!(item.margin_percentage, None);
    }

    #[test]
    fn test_sale_item_out_of_range_total() {
        let item = SaleItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Sofa",
            2,
            Decimal::MAX,
            None,
        );
        assert_eq!(item, None);

        let item = SaleItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Sofa",
            2,
            Decimal::ONE,
            Some(Decimal::MAX),
        );
        assert_eq!(item, None);
    }

    #[test]
    fn test_customer_stats_out_of_range_lifetime_value() {
        let sale = |total: Decimal, day: u32| Sale {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            location_id: Uuid::nil(),
            salesperson_id: Uuid::nil(),
            customer_id: Uuid::nil(),
            transaction_number: format!("TXN-{}", day),
            sale_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            sale_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            total_amount: total,
            fcp_amount: Decimal::ZERO,
            hours_worked: Decimal::ZERO,
            customer_name: "A B".into(),
            notes: None,
        };

        let sales = [sale(Decimal::from(100), 3), sale(Decimal::from(50), 9)];
        let stats = CustomerStats::from_sales(&sales).unwrap();
        assert_eq!(stats.total_lifetime_value, Decimal::from(150));
        assert_eq!(stats.total_purchases, 2);
        assert_eq!(stats.last_purchase_date, NaiveDate::from_ymd_opt(2025, 1, 9));

        assert_eq!(
            CustomerStats::from_sales(&[sale(Decimal::MAX, 3), sale(Decimal::ONE, 9)]),
            None
        );
    }
}
