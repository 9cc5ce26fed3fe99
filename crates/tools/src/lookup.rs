//! Pure lookups over the reference data
//!
//! Nothing here mutates state or performs I/O; the tools and the stage
//! engine share these functions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use lead_agent_config::reference::normalize;
use lead_agent_config::{
    CapacityTier, QualificationPolicy, ReferenceData, RestaurantPartner, ServiceArea,
};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
// US format, optional +1 prefix
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap()
});

/// Lowercased words; punctuation other than inner dots splits words
fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '.'))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Find the service area a free-text location refers to.
///
/// A match is the area's city name or one of its aliases appearing in the
/// input as whole words, case-insensitive. A fragment of a name ("York",
/// "San") does not match.
/// Areas are tried in table order and the first match wins, so a message
/// naming two areas resolves to the one listed first.
pub fn check_area<'a>(data: &'a ReferenceData, location: &str) -> Option<&'a ServiceArea> {
    check_area_in_state(data, location, None)
}

/// [`check_area`] restricted to a state abbreviation
pub fn check_area_in_state<'a>(
    data: &'a ReferenceData,
    location: &str,
    state: Option<&str>,
) -> Option<&'a ServiceArea> {
    let input = tokens(location);
    if input.is_empty() {
        return None;
    }

    data.service_areas.iter().find(|area| {
        if let Some(state) = state.map(str::trim).filter(|s| !s.is_empty()) {
            if !area.state.eq_ignore_ascii_case(state) {
                return false;
            }
        }
        area.names().any(|name| {
            let name = tokens(&name);
            contains_phrase(&input, &name)
        })
    })
}

/// Partner search filters
#[derive(Debug, Clone, Default)]
pub struct PartnerQuery {
    pub city: String,
    /// Any-match, case-insensitive
    pub cuisine: Vec<String>,
    /// Any-match, case-insensitive
    pub dietary: Vec<String>,
    /// Only partners at or below this size
    pub capacity_ceiling: Option<CapacityTier>,
    pub limit: usize,
}

impl PartnerQuery {
    pub fn new(city: impl Into<String>, limit: usize) -> Self {
        Self {
            city: city.into(),
            limit,
            ..Default::default()
        }
    }

    pub fn with_cuisine(mut self, cuisine: Vec<String>) -> Self {
        self.cuisine = cuisine;
        self
    }

    pub fn with_dietary(mut self, dietary: Vec<String>) -> Self {
        self.dietary = dietary;
        self
    }

    pub fn with_capacity_ceiling(mut self, ceiling: CapacityTier) -> Self {
        self.capacity_ceiling = Some(ceiling);
        self
    }
}

fn any_tag_matches(wanted: &[String], tags: &[String]) -> bool {
    wanted.iter().any(|w| {
        let w = normalize(w);
        tags.iter().any(|t| normalize(t) == w)
    })
}

/// Partners in the query's city, filtered, first `limit` in table order.
///
/// The city matches a partner when the partner's city contains it, or when
/// it resolves to the partner's service area ("nyc" finds New York City
/// partners). A blank city matches nothing.
pub fn find_partners<'a>(data: &'a ReferenceData, query: &PartnerQuery) -> Vec<&'a RestaurantPartner> {
    let city = normalize(&query.city);
    if city.is_empty() || query.limit == 0 {
        return Vec::new();
    }
    let area_city = check_area(data, &query.city).map(|a| a.key());

    data.restaurant_partners
        .iter()
        .filter(|p| {
            let partner_city = normalize(&p.city);
            partner_city.contains(&city) || area_city.as_deref() == Some(partner_city.as_str())
        })
        .filter(|p| query.cuisine.is_empty() || any_tag_matches(&query.cuisine, &p.cuisine_tags))
        .filter(|p| query.dietary.is_empty() || any_tag_matches(&query.dietary, &p.dietary_tags))
        .filter(|p| query.capacity_ceiling.map_or(true, |ceiling| p.capacity <= ceiling))
        .take(query.limit)
        .collect()
}

/// Contact details found in free text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Best-effort extraction of one email and one US phone number
pub fn extract_contact_info(text: &str) -> ContactInfo {
    ContactInfo {
        email: EMAIL_RE.find(text).map(|m| m.as_str().to_string()),
        phone: PHONE_RE.find(text).map(|m| m.as_str().trim().to_string()),
    }
}

/// Business rules summary for the model and the tools endpoint
pub fn business_rules(data: &ReferenceData, policy: &QualificationPolicy) -> Value {
    json!({
        "minimum_order_size": policy.minimum_order_size,
        "lead_time_hours": {
            "one_time": policy.one_time_lead_hours,
            "recurring_setup": policy.recurring_setup_hours,
        },
        "service_areas": data.city_names(),
        "qualification_thresholds": {
            "qualified_score": policy.thresholds.qualified,
            "maybe_score": policy.thresholds.maybe,
        },
    })
}
