use crate::error::{AppError, AppResult};

/// Delivery details as entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingAddress {
    pub full_name: String,
    pub address: String,
    pub state: String,
    pub phone: String,
}

impl ShippingAddress {
    pub fn parse(full_name: &str, address: &str, state: &str, phone: &str) -> AppResult<Self> {
        let full_name = full_name.trim();
        let address = address.trim();
        let state = state.trim();
        if full_name.is_empty() || address.is_empty() || state.is_empty() {
            return Err(AppError::BadRequest(
                "Please fill in all the required address fields".into(),
            ));
        }

        // Local numbers only, no country prefix.
        let phone = phone.trim();
        if !(8..=9).contains(&phone.len()) || !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::BadRequest(
                "Mobile number must be 8 or 9 digits".into(),
            ));
        }

        Ok(Self {
            full_name: full_name.to_string(),
            address: address.to_string(),
            state: state.to_string(),
            phone: phone.to_string(),
        })
    }

    /// Single-line form stored on each order row.
    pub fn combined(&self) -> String {
        format!("{}, {}, {}", self.full_name, self.address, self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_trimmed_fields() {
        let addr = ShippingAddress::parse(" Ana Souza ", "Rua A, 10 - 01000-000", "SP", "912345678")
            .unwrap();
        assert_eq!(addr.combined(), "Ana Souza, Rua A, 10 - 01000-000, SP");
        assert_eq!(addr.phone, "912345678");
    }

    #[test]
    fn blank_fields_are_rejected() {
        let err = ShippingAddress::parse("Ana", "   ", "SP", "12345678").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn phone_length_and_digits_are_checked() {
        assert!(ShippingAddress::parse("Ana", "Rua A", "SP", "1234567").is_err());
        assert!(ShippingAddress::parse("Ana", "Rua A", "SP", "1234567890").is_err());
        assert!(ShippingAddress::parse("Ana", "Rua A", "SP", "1234-5678").is_err());
        assert!(ShippingAddress::parse("Ana", "Rua A", "SP", "12345678").is_ok());
    }
}
