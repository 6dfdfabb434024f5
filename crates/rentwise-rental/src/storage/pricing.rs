use crate::domain::pricing::{NewPricingRule, PricingRule};
use crate::domain::types::{PricingId, VehicleType};
use crate::error::{RentalError, Result};
use crate::storage::{code_column, decimal_column, unique_violation};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const PRICING_COLUMNS: &str = "id, vehicle_type, base_daily_rate, weekend_multiplier, \
     holiday_multiplier, long_term_discount, insurance_daily_rate, created_at, updated_at";

/// Single adjustable figure of a pricing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingField {
    BaseDailyRate,
    WeekendMultiplier,
    HolidayMultiplier,
    LongTermDiscount,
    InsuranceDailyRate,
}

impl PricingField {
    fn column(&self) -> &'static str {
        match self {
            PricingField::BaseDailyRate => "base_daily_rate",
            PricingField::WeekendMultiplier => "weekend_multiplier",
            PricingField::HolidayMultiplier => "holiday_multiplier",
            PricingField::LongTermDiscount => "long_term_discount",
            PricingField::InsuranceDailyRate => "insurance_daily_rate",
        }
    }
}

#[async_trait]
pub trait PricingRepository: Send + Sync {
    async fn create(&self, rule: &NewPricingRule) -> Result<PricingRule>;
    async fn get(&self, id: PricingId) -> Result<Option<PricingRule>>;
    async fn get_by_vehicle_type(&self, vehicle_type: VehicleType) -> Result<Option<PricingRule>>;
    /// All rules, ordered by vehicle type code.
    async fn list(&self) -> Result<Vec<PricingRule>>;
    async fn update(&self, rule: &PricingRule) -> Result<PricingRule>;
    /// Change one figure of the rule for `vehicle_type`, keeping the rule valid.
    async fn update_field(
        &self,
        vehicle_type: VehicleType,
        field: PricingField,
        value: Decimal,
    ) -> Result<PricingRule>;
    async fn delete(&self, id: PricingId) -> Result<bool>;
    async fn exists_for_type(&self, vehicle_type: VehicleType) -> Result<bool>;
    async fn count(&self) -> Result<i64>;

    async fn update_base_daily_rate(
        &self,
        vehicle_type: VehicleType,
        rate: Decimal,
    ) -> Result<PricingRule> {
        self.update_field(vehicle_type, PricingField::BaseDailyRate, rate)
            .await
    }

    async fn update_weekend_multiplier(
        &self,
        vehicle_type: VehicleType,
        multiplier: Decimal,
    ) -> Result<PricingRule> {
        self.update_field(vehicle_type, PricingField::WeekendMultiplier, multiplier)
            .await
    }

    async fn update_holiday_multiplier(
        &self,
        vehicle_type: VehicleType,
        multiplier: Decimal,
    ) -> Result<PricingRule> {
        self.update_field(vehicle_type, PricingField::HolidayMultiplier, multiplier)
            .await
    }

    async fn update_long_term_discount(
        &self,
        vehicle_type: VehicleType,
        factor: Decimal,
    ) -> Result<PricingRule> {
        self.update_field(vehicle_type, PricingField::LongTermDiscount, factor)
            .await
    }

    async fn update_insurance_daily_rate(
        &self,
        vehicle_type: VehicleType,
        rate: Decimal,
    ) -> Result<PricingRule> {
        self.update_field(vehicle_type, PricingField::InsuranceDailyRate, rate)
            .await
    }
}

pub struct SqlitePricingRepository {
    pool: SqlitePool,
}

impl SqlitePricingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn rule_from_row(row: &SqliteRow) -> Result<PricingRule> {
        Ok(PricingRule {
            id: PricingId::new(row.try_get("id")?),
            vehicle_type: code_column(row, "pricing", "vehicle_type")?,
            base_daily_rate: decimal_column(row, "pricing", "base_daily_rate")?,
            weekend_multiplier: decimal_column(row, "pricing", "weekend_multiplier")?,
            holiday_multiplier: decimal_column(row, "pricing", "holiday_multiplier")?,
            long_term_discount: decimal_column(row, "pricing", "long_term_discount")?,
            insurance_daily_rate: decimal_column(row, "pricing", "insurance_daily_rate")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn rates_of(rule: &PricingRule) -> NewPricingRule {
        NewPricingRule {
            vehicle_type: rule.vehicle_type,
            base_daily_rate: rule.base_daily_rate,
            weekend_multiplier: rule.weekend_multiplier,
            holiday_multiplier: rule.holiday_multiplier,
            long_term_discount: rule.long_term_discount,
            insurance_daily_rate: rule.insurance_daily_rate,
        }
    }

    fn not_found(vehicle_type: VehicleType) -> RentalError {
        RentalError::PricingNotFound {
            vehicle_type: vehicle_type.to_string(),
        }
    }
}

#[async_trait]
impl PricingRepository for SqlitePricingRepository {
    async fn create(&self, rule: &NewPricingRule) -> Result<PricingRule> {
        rule.validate()?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO pricing
            (vehicle_type, base_daily_rate, weekend_multiplier, holiday_multiplier,
             long_term_discount, insurance_daily_rate, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rule.vehicle_type.as_str())
        .bind(rule.base_daily_rate.to_string())
        .bind(rule.weekend_multiplier.to_string())
        .bind(rule.holiday_multiplier.to_string())
        .bind(rule.long_term_discount.to_string())
        .bind(rule.insurance_daily_rate.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(e, || {
                format!("a pricing rule for {} already exists", rule.vehicle_type)
            })
        })?;

        self.get_by_vehicle_type(rule.vehicle_type)
            .await?
            .ok_or_else(|| Self::not_found(rule.vehicle_type))
    }

    async fn get(&self, id: PricingId) -> Result<Option<PricingRule>> {
        let sql = format!("SELECT {PRICING_COLUMNS} FROM pricing WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::rule_from_row).transpose()
    }

    async fn get_by_vehicle_type(&self, vehicle_type: VehicleType) -> Result<Option<PricingRule>> {
        let sql = format!("SELECT {PRICING_COLUMNS} FROM pricing WHERE vehicle_type = ?");
        let row = sqlx::query(&sql)
            .bind(vehicle_type.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::rule_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<PricingRule>> {
        let sql = format!("SELECT {PRICING_COLUMNS} FROM pricing ORDER BY vehicle_type");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(Self::rule_from_row).collect()
    }

    async fn update(&self, rule: &PricingRule) -> Result<PricingRule> {
        Self::rates_of(rule).validate()?;

        let result = sqlx::query(
            r#"
            UPDATE pricing
            SET vehicle_type = ?, base_daily_rate = ?, weekend_multiplier = ?,
                holiday_multiplier = ?, long_term_discount = ?, insurance_daily_rate = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(rule.vehicle_type.as_str())
        .bind(rule.base_daily_rate.to_string())
        .bind(rule.weekend_multiplier.to_string())
        .bind(rule.holiday_multiplier.to_string())
        .bind(rule.long_term_discount.to_string())
        .bind(rule.insurance_daily_rate.to_string())
        .bind(Utc::now())
        .bind(rule.id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(e, || {
                format!("a pricing rule for {} already exists", rule.vehicle_type)
            })
        })?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(rule.vehicle_type));
        }
        self.get(rule.id)
            .await?
            .ok_or_else(|| Self::not_found(rule.vehicle_type))
    }

    async fn update_field(
        &self,
        vehicle_type: VehicleType,
        field: PricingField,
        value: Decimal,
    ) -> Result<PricingRule> {
        let current = self
            .get_by_vehicle_type(vehicle_type)
            .await?
            .ok_or_else(|| Self::not_found(vehicle_type))?;

        let mut rates = Self::rates_of(&current);
        match field {
            PricingField::BaseDailyRate => rates.base_daily_rate = value,
            PricingField::WeekendMultiplier => rates.weekend_multiplier = value,
            PricingField::HolidayMultiplier => rates.holiday_multiplier = value,
            PricingField::LongTermDiscount => rates.long_term_discount = value,
            PricingField::InsuranceDailyRate => rates.insurance_daily_rate = value,
        }
        rates.validate()?;

        let sql = format!(
            "UPDATE pricing SET {} = ?, updated_at = ? WHERE vehicle_type = ?",
            field.column()
        );
        sqlx::query(&sql)
            .bind(value.to_string())
            .bind(Utc::now())
            .bind(vehicle_type.as_str())
            .execute(&self.pool)
            .await?;

        self.get_by_vehicle_type(vehicle_type)
            .await?
            .ok_or_else(|| Self::not_found(vehicle_type))
    }

    async fn delete(&self, id: PricingId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pricing WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists_for_type(&self, vehicle_type: VehicleType) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pricing WHERE vehicle_type = ?")
            .bind(vehicle_type.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pricing")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
