use crate::{db::DbPool, errors::ServiceError, events::EventSender};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer};
use std::sync::Arc;
use validator::ValidationError;

pub mod flats;
pub mod tenancies;

/// A single business operation: validate, write, publish.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `db_pool` - Database connection pool for persistence operations
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

pub(crate) fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    Ok(())
}

pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("must_not_be_blank"));
    }
    Ok(())
}

/// Parses a user-entered money amount. Every non-digit character is dropped,
/// so `"₹1,500"` reads as 1500 and an empty result is zero.
pub fn parse_lenient_amount(raw: &str) -> Decimal {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Decimal::ZERO;
    }
    // Anything longer than Decimal's 28 digits of precision saturates.
    digits.parse::<Decimal>().unwrap_or(Decimal::MAX)
}

/// Deserializes an amount given either as a JSON number or as free text.
pub fn deserialize_lenient_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(Decimal::ZERO),
        serde_json::Value::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(de::Error::custom),
        serde_json::Value::String(s) => Ok(parse_lenient_amount(&s)),
        other => Err(de::Error::custom(format!("expected an amount, got {}", other))),
    }
}

/// Optional variant of [`deserialize_lenient_amount`] for partial updates.
pub fn deserialize_optional_lenient_amount<'de, D>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => deserialize_lenient_amount(value).map(Some).map_err(de::Error::custom),
    }
}

/// Accepts `YYYY-MM-DD` (date inputs) and `DD-MM-YYYY` (hand-typed dates).
pub fn parse_flexible_date(raw: &str) -> Result<NaiveDate, ServiceError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d-%m-%Y"))
        .map_err(|_| {
            ServiceError::ValidationError(format!(
                "invalid date '{}': expected YYYY-MM-DD or DD-MM-YYYY",
                trimmed
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[derive(Deserialize)]
    struct Amount {
        #[serde(deserialize_with = "deserialize_lenient_amount")]
        amount: Decimal,
    }

    fn amount(json: &str) -> Decimal {
        serde_json::from_str::<Amount>(json).unwrap().amount
    }

    #[test]
    fn lenient_amounts_strip_non_digits() {
        assert_eq!(parse_lenient_amount("1,500"), dec!(1500));
        assert_eq!(parse_lenient_amount("Rs. 250"), dec!(250));
        assert_eq!(parse_lenient_amount(""), Decimal::ZERO);
        assert_eq!(parse_lenient_amount("abc"), Decimal::ZERO);
    }

    #[test]
    fn amounts_accept_numbers_and_strings() {
        assert_eq!(amount(r#"{"amount": 500}"#), dec!(500));
        assert_eq!(amount(r#"{"amount": 99.5}"#), dec!(99.5));
        assert_eq!(amount(r#"{"amount": "1500"}"#), dec!(1500));
        assert_eq!(amount(r#"{"amount": null}"#), Decimal::ZERO);
        assert!(serde_json::from_str::<Amount>(r#"{"amount": [1]}"#).is_err());
    }

    #[rstest]
    #[case("2024-03-05")]
    #[case("05-03-2024")]
    #[case(" 2024-03-05 ")]
    fn dates_accept_both_formats(#[case] raw: &str) {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_flexible_date(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("March 5")]
    #[case("")]
    #[case("2024/03/05")]
    #[case("31-02-2024")]
    fn unreadable_dates_are_rejected(#[case] raw: &str) {
        assert!(parse_flexible_date(raw).is_err());
    }

    #[test]
    fn negative_values_are_rejected() {
        assert!(validate_non_negative(&dec!(0)).is_ok());
        assert!(validate_non_negative(&dec!(10)).is_ok());
        assert!(validate_non_negative(&dec!(-1)).is_err());
    }
}
