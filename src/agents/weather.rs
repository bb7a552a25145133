//! Current weather lookup: free-text city extraction, Nominatim geocoding
//! with a preset fallback, then Open-Meteo. Every failure path returns a
//! readable message rather than an error — weather is best-effort.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
const USER_AGENT: &str = "studymate/0.3 (education use)";
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

static CITY_AFTER_PREP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:in|at|for|à|a|pour|au)\s+([a-zA-ZÀ-ÖØ-öø-ÿ' -]{2,})").unwrap()
});
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-ZÀ-ÖØ-öø-ÿ']{2,}").unwrap());

/// Words that are part of the request, not part of the city name.
static CITY_STOPWORDS: &[&str] = &[
    "today", "tomorrow", "now", "currently", "please", "thanks", "weather", "meteo", "météo",
    "temperature", "température", "forecast", "the", "what", "whats", "what's", "is", "like",
    "tell", "me", "aujourd'hui", "demain", "stp", "svp", "merci",
];

/// Cities that must keep working even when geocoding is down.
fn preset_coordinates(city_key: &str) -> Option<(f64, f64)> {
    match city_key {
        "paris" => Some((48.8566, 2.3522)),
        "lyon" => Some((45.7640, 4.8357)),
        "marseille" => Some((43.2965, 5.3698)),
        "london" => Some((51.5074, -0.1278)),
        "brussels" => Some((50.8503, 4.3517)),
        _ => None,
    }
}

/// Extract a city name from free text.
///
/// "what's the weather in Paris today?" → "Paris"; defaults to "Paris" when
/// nothing usable remains after stripping request words.
pub fn normalize_city(raw: &str) -> String {
    if raw.trim().is_empty() {
        return "Paris".to_string();
    }

    let candidate = CITY_AFTER_PREP_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());

    // Cut at strong punctuation
    let candidate = candidate
        .split(['?', ',', '!', '.', ';', ':', '(', ')', '\n'])
        .next()
        .unwrap_or(candidate);

    let tokens: Vec<&str> = WORD_RE
        .find_iter(candidate)
        .map(|m| m.as_str())
        .filter(|t| !CITY_STOPWORDS.contains(&t.to_lowercase().as_str()))
        .collect();

    if tokens.is_empty() {
        return "Paris".to_string();
    }

    title_case(&tokens.join(" "))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
}

#[derive(Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
}

/// Geocode via Nominatim. `None` on any failure or empty result.
fn geocode(client: &reqwest::blocking::Client, city: &str) -> Option<(f64, f64)> {
    let resp = client
        .get(NOMINATIM_URL)
        .query(&[("q", city), ("format", "json"), ("limit", "1")])
        .send()
        .ok()?
        .error_for_status()
        .ok()?;

    let hits: Vec<GeocodeHit> = resp.json().ok()?;
    let hit = hits.first()?;
    Some((hit.lat.parse().ok()?, hit.lon.parse().ok()?))
}

/// Current weather for a city mentioned in free text, as a display-ready
/// markdown block.
pub fn current_weather(raw_city: &str) -> String {
    let city = normalize_city(raw_city);
    let city_key = city.to_lowercase();

    let client = match reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
    {
        Ok(c) => c,
        Err(e) => return format!("Weather unavailable: {e}"),
    };

    // Geocoding first, presets as the offline fallback.
    let coords = geocode(&client, &city).or_else(|| {
        debug!("Geocoding failed for {city}, trying presets");
        preset_coordinates(&city_key)
    });

    let Some((lat, lon)) = coords else {
        return "Weather unavailable: city not found and geocoding unreachable.\n\
                Try another spelling or a major city (Paris, Lyon, London...)."
            .to_string();
    };

    let resp = client
        .get(OPEN_METEO_URL)
        .query(&[
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("current_weather", "true".to_string()),
        ])
        .send()
        .and_then(reqwest::blocking::Response::error_for_status);

    let forecast: ForecastResponse = match resp.and_then(|r| r.json()) {
        Ok(f) => f,
        Err(e) => return format!("Weather unavailable (network or service issue): {e}"),
    };

    match forecast.current_weather {
        Some(cw) => format!(
            "🛠️ Weather\n\nCity: **{city}**\nTemperature: **{}°C**\nWind: **{} km/h**",
            cw.temperature, cw.windspeed
        ),
        None => "Weather unavailable for this location.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_city_after_preposition() {
        assert_eq!(normalize_city("what's the weather in Paris today?"), "Paris");
        assert_eq!(normalize_city("weather for lyon please"), "Lyon");
    }

    #[test]
    fn test_normalize_city_multiword() {
        assert_eq!(normalize_city("weather in new york"), "New York");
    }

    #[test]
    fn test_normalize_city_default() {
        assert_eq!(normalize_city(""), "Paris");
        assert_eq!(normalize_city("what's the weather like today?"), "Paris");
    }

    #[test]
    fn test_normalize_city_french() {
        assert_eq!(normalize_city("quelle est la météo à Marseille ?"), "Marseille");
    }

    #[test]
    fn test_presets() {
        assert!(preset_coordinates("paris").is_some());
        assert!(preset_coordinates("atlantis").is_none());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("new york"), "New York");
        assert_eq!(title_case("PARIS"), "PARIS");
    }
}
