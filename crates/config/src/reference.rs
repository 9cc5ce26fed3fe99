//! Reference data: service areas and restaurant partners
//!
//! Loaded once at startup and shared read-only. A configured file that
//! cannot be read, parsed or validated is a startup failure; the service
//! never runs on partial data.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A city the business operates in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceArea {
    pub city: String,
    pub state: String,
    #[serde(default = "default_lead_time_hours")]
    pub lead_time_hours: u32,
    pub restaurant_count: u32,
    #[serde(default)]
    pub notes: Option<String>,
    /// Other names visitors use for this area ("nyc", "manhattan")
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_lead_time_hours() -> u32 {
    48
}

impl ServiceArea {
    pub fn new(city: &str, state: &str, restaurant_count: u32) -> Self {
        Self {
            city: city.to_string(),
            state: state.to_string(),
            lead_time_hours: default_lead_time_hours(),
            restaurant_count,
            notes: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Normalized lookup key
    pub fn key(&self) -> String {
        normalize(&self.city)
    }

    /// City name followed by aliases, all normalized
    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.key()).chain(self.aliases.iter().map(|a| normalize(a)))
    }
}

/// Partner kitchen size, ordered small < medium < large
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityTier {
    Small,
    Medium,
    Large,
}

impl CapacityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityTier::Small => "small",
            CapacityTier::Medium => "medium",
            CapacityTier::Large => "large",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "small" => Some(CapacityTier::Small),
            "medium" => Some(CapacityTier::Medium),
            "large" => Some(CapacityTier::Large),
            _ => None,
        }
    }
}

/// A restaurant partner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantPartner {
    pub name: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub cuisine_tags: Vec<String>,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
    pub capacity: CapacityTier,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub avg_price_per_person: Option<String>,
}

impl RestaurantPartner {
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: &str,
        city: &str,
        state: &str,
        cuisine: &[&str],
        dietary: &[&str],
        capacity: CapacityTier,
        description: &str,
        price: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            cuisine_tags: cuisine.iter().map(|s| s.to_string()).collect(),
            dietary_tags: dietary.iter().map(|s| s.to_string()).collect(),
            capacity,
            description: description.to_string(),
            avg_price_per_person: Some(price.to_string()),
        }
    }
}

/// Read-only reference tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub service_areas: Vec<ServiceArea>,
    #[serde(default)]
    pub restaurant_partners: Vec<RestaurantPartner>,
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceData {
    /// Load and validate reference data; `None` selects the built-in table
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let data = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::builtin(),
        };
        data.validate()?;
        tracing::info!(
            service_areas = data.service_areas.len(),
            restaurant_partners = data.restaurant_partners.len(),
            source = path.unwrap_or("builtin"),
            "Loaded reference data"
        );
        Ok(data)
    }

    /// Parse a file, choosing the format by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        let parsed = match extension.as_deref() {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| e.to_string())
            }
            Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
            Some("toml") => toml::from_str(&content).map_err(|e| e.to_string()),
            _ => {
                return Err(ConfigError::ParseError(format!(
                    "Unsupported reference data format: {}",
                    path.display()
                )))
            }
        };

        parsed.map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Reject data the lookups cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_areas.is_empty() {
            return Err(ConfigError::invalid(
                "service_areas",
                "At least one service area is required",
            ));
        }

        let mut owners: HashMap<String, &str> = HashMap::new();
        for (i, area) in self.service_areas.iter().enumerate() {
            if area.city.trim().is_empty() || area.state.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("service_areas[{}]", i),
                    "City and state must be non-empty",
                ));
            }
            for name in area.names() {
                if name.is_empty() {
                    return Err(ConfigError::invalid(
                        format!("service_areas[{}].aliases", i),
                        "Aliases must be non-empty",
                    ));
                }
                if let Some(owner) = owners.get(&name) {
                    return Err(ConfigError::invalid(
                        format!("service_areas[{}]", i),
                        format!("Name '{}' is already used by {}", name, owner),
                    ));
                }
                owners.insert(name, &area.city);
            }
        }

        for (i, partner) in self.restaurant_partners.iter().enumerate() {
            if partner.name.trim().is_empty() || partner.city.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("restaurant_partners[{}]", i),
                    "Name and city must be non-empty",
                ));
            }
            if self.area(&partner.city).is_none() {
                tracing::warn!(
                    partner = %partner.name,
                    city = %partner.city,
                    "Restaurant partner is outside every service area"
                );
            }
        }

        Ok(())
    }

    /// Service area by exact (normalized) city name
    pub fn area(&self, city: &str) -> Option<&ServiceArea> {
        let key = normalize(city);
        self.service_areas.iter().find(|a| a.key() == key)
    }

    /// Canonical city names in table order
    pub fn city_names(&self) -> Vec<&str> {
        self.service_areas.iter().map(|a| a.city.as_str()).collect()
    }

    /// Built-in table used when no file is configured
    pub fn builtin() -> Self {
        use CapacityTier::*;

        let service_areas = vec![
            ServiceArea::new("New York City", "NY", 25)
                .with_notes("Manhattan, Brooklyn, Queens - outer boroughs may have higher delivery fees")
                .with_aliases(&["new york", "nyc", "manhattan", "brooklyn", "queens"]),
            ServiceArea::new("Los Angeles", "CA", 20)
                .with_notes("Greater LA area including Downtown")
                .with_aliases(&["la", "l.a."]),
            ServiceArea::new("Chicago", "IL", 18),
            ServiceArea::new("San Francisco", "CA", 22)
                .with_notes("SF proper and nearby cities like Oakland, Berkeley")
                .with_aliases(&["sf", "oakland", "berkeley"]),
            ServiceArea::new("Boston", "MA", 15).with_aliases(&["bos"]),
            ServiceArea::new("Washington DC", "DC", 16)
                .with_notes("DC, Arlington metro area")
                .with_aliases(&["washington d.c.", "dc", "arlington"]),
            ServiceArea::new("Seattle", "WA", 14).with_aliases(&["sea"]),
            ServiceArea::new("Austin", "TX", 12),
            ServiceArea::new("Denver", "CO", 10),
            ServiceArea::new("Miami", "FL", 13),
            ServiceArea::new("Bellevue", "WA", 8),
            ServiceArea::new("Herndon", "VA", 6),
            ServiceArea::new("Reston", "VA", 6),
            ServiceArea::new("Alexandria", "VA", 7),
            ServiceArea::new("Columbus", "OH", 40),
            ServiceArea::new("San Diego", "CA", 12),
            ServiceArea::new("Emeryville", "CA", 6),
            ServiceArea::new("San Jose", "CA", 10),
            ServiceArea::new("Bridgeport", "CT", 5),
            ServiceArea::new("Fairfield", "CT", 5),
            ServiceArea::new("Sacramento", "CA", 8),
            ServiceArea::new("Raleigh", "NC", 9),
            ServiceArea::new("Durham", "NC", 7),
            ServiceArea::new("Cary", "NC", 5),
            ServiceArea::new("Charlotte", "NC", 9),
            ServiceArea::new("Culver City", "CA", 6),
            ServiceArea::new("San Mateo", "CA", 6),
            ServiceArea::new("Santa Monica", "CA", 8),
            ServiceArea::new("Sunnyvale", "CA", 6),
        ];

        let restaurant_partners = vec![
            RestaurantPartner::new(
                "Ben's Fast Food",
                "New York City",
                "NY",
                &["Italian"],
                &["vegetarian", "gluten-free"],
                Large,
                "Healthy delicious bowls with a variety of options",
                "$25-35",
            ),
            RestaurantPartner::new(
                "Pokeworks",
                "New York City",
                "NY",
                &["Healthy", "Vegetarian"],
                &["vegetarian", "vegan", "gluten-free", "dairy-free"],
                Medium,
                "Incredible poke bowls with a variety of options",
                "$18-28",
            ),
            RestaurantPartner::new(
                "Starbird Chicken",
                "New York City",
                "NY",
                &["BBQ", "American"],
                &["gluten-free"],
                Large,
                "Delicious chicken meals",
                "$22-32",
            ),
            RestaurantPartner::new(
                "Pokeworks",
                "Los Angeles",
                "CA",
                &["Seafood", "California Cuisine"],
                &["vegetarian", "gluten-free", "pescatarian"],
                Medium,
                "Incredible poke bowls with a variety of options",
                "$28-38",
            ),
            RestaurantPartner::new(
                "Starbird Chicken",
                "Los Angeles",
                "CA",
                &["Mexican", "Latin"],
                &["vegetarian", "vegan", "gluten-free"],
                Large,
                "Delicious chicken meals",
                "$16-24",
            ),
            RestaurantPartner::new(
                "Curry Up Now",
                "San Francisco",
                "CA",
                &["Healthy", "Indian Street Food"],
                &["vegetarian", "vegan", "gluten-free", "dairy-free"],
                Medium,
                "Modern Indian street food with authentic flavors",
                "$19-27",
            ),
        ];

        Self {
            service_areas,
            restaurant_partners,
        }
    }
}

/// Lowercase and collapse whitespace
pub fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_is_valid() {
        let data = ReferenceData::builtin();
        assert!(data.validate().is_ok());
        assert_eq!(data.service_areas[0].city, "New York City");
        assert_eq!(data.restaurant_partners.len(), 6);
        assert!(data.area("  new   YORK city ").is_some());
    }

    #[test]
    fn test_capacity_ordering() {
        assert!(CapacityTier::Small < CapacityTier::Medium);
        assert!(CapacityTier::Medium < CapacityTier::Large);
        assert_eq!(CapacityTier::parse("LARGE"), Some(CapacityTier::Large));
        assert_eq!(CapacityTier::parse("huge"), None);
    }

    #[test]
    fn test_validation_rejects_bad_tables() {
        let empty = ReferenceData {
            service_areas: vec![],
            restaurant_partners: vec![],
        };
        assert!(empty.validate().is_err());

        let duplicate = ReferenceData {
            service_areas: vec![
                ServiceArea::new("Boston", "MA", 15),
                ServiceArea::new("boston", "MA", 3),
            ],
            restaurant_partners: vec![],
        };
        assert!(duplicate.validate().is_err());

        let alias_clash = ReferenceData {
            service_areas: vec![
                ServiceArea::new("Los Angeles", "CA", 20).with_aliases(&["la"]),
                ServiceArea::new("Louisiana City", "LA", 1).with_aliases(&["la"]),
            ],
            restaurant_partners: vec![],
        };
        assert!(alias_clash.validate().is_err());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
service_areas:
  - city: Portland
    state: OR
    restaurant_count: 4
    aliases: [pdx]
restaurant_partners:
  - name: Nong's
    city: Portland
    state: OR
    cuisine_tags: [Thai]
    capacity: small
"#
        )
        .unwrap();

        let data = ReferenceData::load(file.path().to_str()).unwrap();
        assert_eq!(data.service_areas[0].lead_time_hours, 48);
        assert_eq!(data.restaurant_partners[0].capacity, CapacityTier::Small);
        assert_eq!(data.city_names(), vec!["Portland"]);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"service_areas": [{{"city": "Austin", "state": "TX", "restaurant_count": 12}}]}}"#
        )
        .unwrap();
        let data = ReferenceData::load(file.path().to_str()).unwrap();
        assert!(data.restaurant_partners.is_empty());
    }

    #[test]
    fn test_load_failures_are_errors() {
        assert!(matches!(
            ReferenceData::load(Some("/nonexistent/reference.yaml")),
            Err(ConfigError::FileNotFound(_))
        ));

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "service_areas: [{{city: 12").unwrap();
        assert!(matches!(
            ReferenceData::load(file.path().to_str()),
            Err(ConfigError::ParseError(_))
        ));

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "service_areas: []").unwrap();
        assert!(ReferenceData::load(file.path().to_str()).is_err());

        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        assert!(ReferenceData::load(file.path().to_str()).is_err());
    }
}
