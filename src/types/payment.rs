//! Payment input accepted at checkout.
//!
//! Card and boleto data is only validated for shape. It is never stored; the
//! order row keeps the method label alone.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

const BOLETO_DIGITS: usize = 47;
const CPF_DIGITS: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Boleto,
    CreditCard,
    DebitCard,
}

impl PaymentMethod {
    /// Label written to `orders.payment_method`.
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Boleto => "Boleto",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::DebitCard => "Debit Card",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
}

impl CardBrand {
    /// Brand from a digits-only card number, `None` when the prefix/length
    /// pair is not one we accept.
    pub fn detect(digits: &str) -> Option<CardBrand> {
        let len = digits.len();
        let prefix2: u32 = digits.get(..2)?.parse().ok()?;
        if digits.starts_with('4') && matches!(len, 13 | 16 | 19) {
            Some(CardBrand::Visa)
        } else if (51..=55).contains(&prefix2) && len == 16 {
            Some(CardBrand::Mastercard)
        } else if matches!(prefix2, 34 | 37) && len == 15 {
            Some(CardBrand::Amex)
        } else {
            None
        }
    }

    fn cvv_len(self) -> usize {
        match self {
            CardBrand::Amex => 4,
            CardBrand::Visa | CardBrand::Mastercard => 3,
        }
    }
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct CardDetails {
    pub card_number: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
    pub cvv: String,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = digits_only(&self.card_number);
        let last4 = digits.get(digits.len().saturating_sub(4)..).unwrap_or("");
        f.debug_struct("CardDetails")
            .field("card_number", &format_args!("****{last4}"))
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("cvv", &"***")
            .finish()
    }
}

#[derive(Clone, Deserialize, ToSchema)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    Boleto { boleto_number: String, cpf: String },
    CreditCard(CardDetails),
    DebitCard(CardDetails),
}

impl fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentDetails::Boleto { .. } => f.write_str("Boleto"),
            PaymentDetails::CreditCard(card) => f.debug_tuple("CreditCard").field(card).finish(),
            PaymentDetails::DebitCard(card) => f.debug_tuple("DebitCard").field(card).finish(),
        }
    }
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Boleto { .. } => PaymentMethod::Boleto,
            PaymentDetails::CreditCard(_) => PaymentMethod::CreditCard,
            PaymentDetails::DebitCard(_) => PaymentMethod::DebitCard,
        }
    }

    /// Check the payment input against `today` and return the method to
    /// record on the order.
    pub fn validate(&self, today: NaiveDate) -> AppResult<PaymentMethod> {
        match self {
            PaymentDetails::Boleto { boleto_number, cpf } => {
                if !is_digits(boleto_number, BOLETO_DIGITS) {
                    return Err(AppError::BadRequest(
                        "Please enter a valid Boleto number (47 digits)".into(),
                    ));
                }
                if !is_digits(cpf, CPF_DIGITS) {
                    return Err(AppError::BadRequest(
                        "Please enter a valid CPF (11 digits)".into(),
                    ));
                }
            }
            PaymentDetails::CreditCard(card) | PaymentDetails::DebitCard(card) => {
                validate_card(card, today)?;
            }
        }
        Ok(self.method())
    }
}

fn validate_card(card: &CardDetails, today: NaiveDate) -> AppResult<CardBrand> {
    let digits = digits_only(&card.card_number);
    if digits.len() != card.card_number.chars().filter(|c| !c.is_whitespace()).count() {
        return Err(AppError::BadRequest("Please enter a valid card number".into()));
    }
    let brand = CardBrand::detect(&digits)
        .ok_or_else(|| AppError::BadRequest("Card type not recognized".into()))?;

    if !(1..=12).contains(&card.expiry_month) {
        return Err(AppError::BadRequest("Expiry month must be 1-12".into()));
    }
    let expired = card.expiry_year < today.year()
        || (card.expiry_year == today.year() && card.expiry_month < today.month());
    if expired {
        return Err(AppError::BadRequest("Expiry date must be in the future".into()));
    }

    if !is_digits(&card.cvv, brand.cvv_len()) {
        return Err(AppError::BadRequest(format!(
            "CVV must be {} digits long and numeric",
            brand.cvv_len()
        )));
    }
    Ok(brand)
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn is_digits(raw: &str, len: usize) -> bool {
    raw.len() == len && raw.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn card(number: &str, month: u32, year: i32, cvv: &str) -> CardDetails {
        CardDetails {
            card_number: number.into(),
            expiry_month: month,
            expiry_year: year,
            cvv: cvv.into(),
        }
    }

    #[test]
    fn detects_brands() {
        assert_eq!(CardBrand::detect("4111111111111111"), Some(CardBrand::Visa));
        assert_eq!(CardBrand::detect("4222222222222"), Some(CardBrand::Visa));
        assert_eq!(CardBrand::detect("5500000000000004"), Some(CardBrand::Mastercard));
        assert_eq!(CardBrand::detect("340000000000009"), Some(CardBrand::Amex));
        assert_eq!(CardBrand::detect("6011000000000004"), None);
        assert_eq!(CardBrand::detect("4"), None);
    }

    #[test]
    fn card_with_spaces_is_accepted() {
        let payment = PaymentDetails::CreditCard(card("4111 1111 1111 1111", 12, 2027, "123"));
        assert_eq!(payment.validate(today()).unwrap(), PaymentMethod::CreditCard);
        assert_eq!(PaymentMethod::CreditCard.label(), "Credit Card");
    }

    #[test]
    fn expiry_this_month_is_still_valid() {
        let payment = PaymentDetails::DebitCard(card("5500000000000004", 6, 2026, "999"));
        assert_eq!(payment.validate(today()).unwrap(), PaymentMethod::DebitCard);
    }

    #[test]
    fn expired_card_is_rejected() {
        let payment = PaymentDetails::DebitCard(card("5500000000000004", 5, 2026, "999"));
        assert!(matches!(payment.validate(today()), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn amex_needs_four_digit_cvv() {
        let short = PaymentDetails::CreditCard(card("370000000000002", 1, 2030, "123"));
        let long = PaymentDetails::CreditCard(card("370000000000002", 1, 2030, "1234"));
        assert!(short.validate(today()).is_err());
        assert!(long.validate(today()).is_ok());
    }

    #[test]
    fn letters_in_card_number_are_rejected() {
        let payment = PaymentDetails::CreditCard(card("4111-1111-1111-1111", 1, 2030, "123"));
        assert!(payment.validate(today()).is_err());
    }

    #[test]
    fn boleto_requires_exact_digit_counts() {
        let ok = PaymentDetails::Boleto {
            boleto_number: "1".repeat(47),
            cpf: "12345678901".into(),
        };
        let bad_cpf = PaymentDetails::Boleto {
            boleto_number: "1".repeat(47),
            cpf: "1234567890".into(),
        };
        assert_eq!(ok.validate(today()).unwrap(), PaymentMethod::Boleto);
        assert!(bad_cpf.validate(today()).is_err());
    }

    #[test]
    fn deserializes_tagged_payload() {
        let payment: PaymentDetails = serde_json::from_value(serde_json::json!({
            "method": "debit_card",
            "card_number": "4111111111111111",
            "expiry_month": 1,
            "expiry_year": 2031,
            "cvv": "321"
        }))
        .unwrap();
        assert_eq!(payment.method(), PaymentMethod::DebitCard);
    }

    #[test]
    fn debug_output_masks_card_data() {
        let payment = PaymentDetails::CreditCard(card("4111111111111111", 1, 2030, "123"));
        let printed = format!("{payment:?}");
        assert!(printed.contains("****1111"));
        assert!(!printed.contains("4111111111111111"));
        assert!(!printed.contains("123\""));
    }
}
