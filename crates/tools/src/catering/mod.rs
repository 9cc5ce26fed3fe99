//! Catering lookup tools
//!
//! Stateless tools over the reference data and qualification policy. Each
//! tool lives in its own module; the session-bound tools (recording
//! requirements, sending the lead) belong to the model driver.

mod contact;
mod order_minimum;
mod partners;
mod rules;
mod service_area;

pub use contact::ExtractContactInfoTool;
pub use order_minimum::{order_minimum_message, CheckOrderMinimumTool, OrderSizeTier};
pub use partners::FindRestaurantPartnersTool;
pub use rules::BusinessRulesTool;
pub use service_area::CheckServiceAreaTool;

/// Title-case each word ("portland, oregon" -> "Portland, Oregon")
pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("portland,  OREGON"), "Portland, Oregon");
        assert_eq!(title_case(""), "");
    }
}
