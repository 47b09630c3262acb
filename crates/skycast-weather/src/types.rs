use serde::{Deserialize, Serialize};

/// Offset between Kelvin and Celsius scales
pub const KELVIN_OFFSET: f64 = 273.15;

/// Convert Kelvin to whole Celsius degrees, truncating toward zero.
///
/// -10.0 °C stays -10, 26.85 °C becomes 26, -23.15 °C becomes -23.
pub fn kelvin_to_celsius(kelvin: f64) -> i32 {
    (kelvin - KELVIN_OFFSET) as i32
}

/// A geocoded city.
///
/// Identity is the search key: lowercase name and country. State and
/// coordinates are ignored, so two same-named cities in one country collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl City {
    pub fn new(
        name: impl Into<String>,
        country: impl Into<String>,
        state: Option<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            state,
            latitude,
            longitude,
        }
    }

    /// Case-insensitive `name, country` identity key
    pub fn search_key(&self) -> String {
        search_key(&self.name, &self.country)
    }

    /// True when both cities are the same logical entity
    pub fn same_city(&self, other: &City) -> bool {
        self.search_key() == other.search_key()
    }

    pub fn display_name(&self) -> String {
        match &self.state {
            Some(state) => format!("{}, {}, {}", self.name, state, self.country),
            None => format!("{}, {}", self.name, self.country),
        }
    }
}

/// Build a search key from a name and a country.
pub fn search_key(name: &str, country: &str) -> String {
    format!("{}, {}", name.to_lowercase(), country.to_lowercase())
}

/// Current conditions. Temperatures are kept in Kelvin as delivered by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_k: f64,
    pub feels_like_k: f64,
    pub min_k: f64,
    pub max_k: f64,
    pub humidity_pct: u8,
    pub condition_main: String,
    pub condition_description: String,
    pub icon_id: String,
}

impl WeatherSnapshot {
    pub fn temperature_c(&self) -> i32 {
        kelvin_to_celsius(self.temperature_k)
    }

    pub fn feels_like_c(&self) -> i32 {
        kelvin_to_celsius(self.feels_like_k)
    }

    pub fn min_c(&self) -> i32 {
        kelvin_to_celsius(self.min_k)
    }

    pub fn max_c(&self) -> i32 {
        kelvin_to_celsius(self.max_k)
    }

    /// Icon image URL, empty when the API sent no icon
    pub fn icon_url(&self) -> String {
        if self.icon_id.is_empty() {
            return String::new();
        }
        format!("https://openweathermap.org/img/wn/{}@2x.png", self.icon_id)
    }
}

/// A weather lookup result: the conditions plus the place the API resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city_name: String,
    pub country: String,
    pub weather: WeatherSnapshot,
}

impl WeatherReport {
    pub fn formatted_location(&self) -> String {
        format!("{}, {}", self.city_name, self.country)
    }

    pub fn search_key(&self) -> String {
        search_key(&self.city_name, &self.country)
    }

    /// City derived from the report. The API does not echo coordinates, so
    /// they are zero; only the search key matters for favorites.
    pub fn city(&self) -> City {
        City::new(self.city_name.clone(), self.country.clone(), None, 0.0, 0.0)
    }
}

/// Outcome of an asynchronous lookup as seen by the state layer.
///
/// `Loading` is never produced by the clients in this workspace but every
/// call site still matches it.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource<T> {
    Success(T),
    Error(String),
    Loading,
}

impl<T> Resource<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Resource::Success(_))
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Resource<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Resource::Success(value),
            Err(e) => Resource::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(temp: f64, feels: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_k: temp,
            feels_like_k: feels,
            min_k: temp - 2.0,
            max_k: temp + 2.0,
            humidity_pct: 60,
            condition_main: "Clear".to_string(),
            condition_description: "clear sky".to_string(),
            icon_id: "01d".to_string(),
        }
    }

    #[test]
    fn test_kelvin_to_celsius_exact_values() {
        assert_eq!(kelvin_to_celsius(293.15), 20);
        assert_eq!(kelvin_to_celsius(263.15), -10);
        assert_eq!(kelvin_to_celsius(273.15), 0);
    }

    #[test]
    fn test_kelvin_to_celsius_truncates_toward_zero() {
        assert_eq!(kelvin_to_celsius(300.0), 26);
        assert_eq!(kelvin_to_celsius(250.0), -23);
    }

    #[test]
    fn test_snapshot_celsius_accessors() {
        let w = snapshot(293.15, 295.15);
        assert_eq!(w.temperature_c(), 20);
        assert_eq!(w.feels_like_c(), 22);
        assert_eq!(w.min_c(), 18);
        assert_eq!(w.max_c(), 22);
    }

    #[test]
    fn test_search_key_is_case_insensitive() {
        let a = City::new("London", "GB", None, 51.5, -0.12);
        let b = City::new("LONDON", "gb", Some("England".to_string()), 42.98, -81.24);
        assert_eq!(a.search_key(), "london, gb");
        assert!(a.same_city(&b));
    }

    #[test]
    fn test_display_name_includes_state_when_present() {
        let la = City::new("Los Angeles", "US", Some("California".to_string()), 34.05, -118.24);
        assert_eq!(la.display_name(), "Los Angeles, California, US");
        let london = City::new("London", "GB", None, 51.5, -0.12);
        assert_eq!(london.display_name(), "London, GB");
    }

    #[test]
    fn test_report_city_uses_name_and_country() {
        let report = WeatherReport {
            city_name: "Paris".to_string(),
            country: "FR".to_string(),
            weather: snapshot(290.0, 289.0),
        };
        assert_eq!(report.formatted_location(), "Paris, FR");
        assert_eq!(report.city().search_key(), report.search_key());
    }

    #[test]
    fn test_icon_url() {
        assert!(snapshot(290.0, 290.0).icon_url().ends_with("01d@2x.png"));
        let mut no_icon = snapshot(290.0, 290.0);
        no_icon.icon_id.clear();
        assert!(no_icon.icon_url().is_empty());
    }

    #[test]
    fn test_resource_from_result() {
        let ok: Resource<u8> = Ok::<u8, String>(3).into();
        assert_eq!(ok, Resource::Success(3));
        let err: Resource<u8> = Err::<u8, &str>("boom").into();
        assert_eq!(err, Resource::Error("boom".to_string()));
        assert!(!Resource::<u8>::Loading.is_success());
    }
}
