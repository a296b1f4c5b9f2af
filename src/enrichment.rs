//! Parsing of the text generation service's responses.
//!
//! The service itself is an external collaborator. Its answers are free
//! text that usually contains a JSON payload, so parsing is tolerant and
//! always falls back to safe defaults instead of failing.

use crate::biometrics::FALLBACK_STRIDE_M;
use crate::types::SubjectProfile;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FALLBACK_ANALYSIS: &str = "Great job! Keep monitoring for any signs of fatigue.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyLevel {
    Low,
    Moderate,
    High,
    Working,
}

/// Breed-derived traits used to fill in a profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedTraits {
    pub is_brachycephalic: bool,
    pub stride_length_meters: f64,
    pub energy_baseline: EnergyLevel,
    pub heat_tolerance: f64,
}

impl BreedTraits {
    pub fn fallback() -> Self {
        Self {
            is_brachycephalic: false,
            stride_length_meters: FALLBACK_STRIDE_M,
            energy_baseline: EnergyLevel::Moderate,
            heat_tolerance: 5.0,
        }
    }

    /// Copy stride length and heat tolerance onto a profile.
    /// Takes effect for the next session started with that profile.
    pub fn apply_to(&self, mut profile: SubjectProfile) -> SubjectProfile {
        profile.stride_length_m = self.stride_length_meters;
        profile.heat_tolerance = self.heat_tolerance;
        profile
    }
}

impl Default for BreedTraits {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Pull a JSON value out of model output.
///
/// Tries, in order: a fenced code block, the outermost `[...]`, the
/// outermost `{...}`, then the whole text.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Some(block) = fenced_block(text) {
        if let Ok(v) = serde_json::from_str(block) {
            return Some(v);
        }
    }

    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if end > start {
                if let Ok(v) = serde_json::from_str(&text[start..=end]) {
                    return Some(v);
                }
            }
        }
    }

    serde_json::from_str(text.trim()).ok()
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let rest = &text[start + 3..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// Breed traits from a response, or the fallback traits if anything about
/// the payload is unusable.
pub fn parse_breed_traits(text: &str) -> BreedTraits {
    let parsed = extract_json(text).and_then(|v| serde_json::from_value::<BreedTraits>(v).ok());
    match parsed {
        Some(traits) if traits.stride_length_meters > 0.0 && traits.stride_length_meters.is_finite() => {
            BreedTraits {
                heat_tolerance: traits.heat_tolerance.clamp(0.0, 10.0),
                ..traits
            }
        }
        _ => {
            warn!("breed traits unavailable, using fallback");
            BreedTraits::fallback()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

/// One recommended trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trail {
    pub id: String,
    pub name: String,
    pub distance_miles: f64,
    pub elevation_gain_feet: f64,
    pub difficulty: Difficulty,
    /// 0-100
    pub dog_ability_score: f64,
    pub dog_ability_reason: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hazards: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// A titled link the service cited while answering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

/// Trail list from a response. Anything but a JSON array yields no trails;
/// array elements that do not describe a trail are skipped.
pub fn parse_trails(text: &str) -> Vec<Trail> {
    let items = match extract_json(text) {
        Some(Value::Array(items)) => items,
        _ => {
            warn!("trail recommendations unavailable: response is not a JSON array");
            return Vec::new();
        }
    };

    let total = items.len();
    let trails: Vec<Trail> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if trails.len() < total {
        warn!("skipped {} malformed trail entries", total - trails.len());
    }
    trails
}

/// Give each trail the link of the first source whose title contains the
/// trail name, or is contained in it. Case-insensitive; untitled sources
/// never match and unmatched trails keep their current link.
pub fn attach_sources(trails: &mut [Trail], sources: &[GroundingSource]) {
    for trail in trails.iter_mut() {
        let name = trail.name.to_lowercase();
        if name.is_empty() {
            continue;
        }
        let matched = sources.iter().find(|source| {
            let title = source.title.to_lowercase();
            !title.is_empty() && (title.contains(&name) || name.contains(&title))
        });
        if let Some(source) = matched {
            trail.uri = Some(source.uri.clone());
        }
    }
}

/// Post-hike narrative, or a generic encouragement when the service gave
/// nothing usable.
pub fn analysis_or_fallback(response: Option<&str>) -> String {
    match response.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => FALLBACK_ANALYSIS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUG: &str = r#"{"isBrachycephalic": true, "strideLengthMeters": 0.3, "energyBaseline": "Low", "heatTolerance": 2}"#;

    #[test]
    fn test_fenced_json() {
        let text = format!("Here you go:\n```json\n{}\n```\nEnjoy!", PUG);
        let traits = parse_breed_traits(&text);
        assert!(traits.is_brachycephalic);
        assert_eq!(traits.stride_length_meters, 0.3);
        assert_eq!(traits.energy_baseline, EnergyLevel::Low);
        assert_eq!(traits.heat_tolerance, 2.0);
    }

    #[test]
    fn test_object_in_prose() {
        let text = format!("Based on search results {} as requested.", PUG);
        assert_eq!(parse_breed_traits(&text).stride_length_meters, 0.3);
    }

    #[test]
    fn test_raw_json() {
        assert!(parse_breed_traits(PUG).is_brachycephalic);
    }

    #[test]
    fn test_garbage_falls_back() {
        assert_eq!(parse_breed_traits("no idea, sorry"), BreedTraits::fallback());
        assert_eq!(parse_breed_traits(r#"{"strideLengthMeters": "long"}"#), BreedTraits::fallback());
    }

    #[test]
    fn test_non_positive_stride_falls_back() {
        let text = r#"{"isBrachycephalic": false, "strideLengthMeters": 0, "energyBaseline": "High", "heatTolerance": 7}"#;
        assert_eq!(parse_breed_traits(text), BreedTraits::fallback());
    }

    #[test]
    fn test_heat_tolerance_clamped() {
        let text = r#"{"isBrachycephalic": false, "strideLengthMeters": 0.9, "energyBaseline": "Working", "heatTolerance": 14}"#;
        assert_eq!(parse_breed_traits(text).heat_tolerance, 10.0);
    }

    #[test]
    fn test_extract_array() {
        let v = extract_json("Trails: [1, 2, 3] done").unwrap();
        assert_eq!(v, serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_apply_to_profile() {
        let profile = SubjectProfile::new("pip", 0.5, 5.0, 8.0);
        let updated = parse_breed_traits(PUG).apply_to(profile);
        assert_eq!(updated.stride_length_m, 0.3);
        assert_eq!(updated.heat_tolerance, 2.0);
        assert_eq!(updated.weight_kg, 8.0);
    }

    const TRAILS: &str = r#"[
        {"id": "t1", "name": "Mesa Trail", "distanceMiles": 6.7, "elevationGainFeet": 1200,
         "difficulty": "Moderate", "dogAbilityScore": 82, "dogAbilityReason": "Shaded creek crossings",
         "tags": ["Shaded", "Water Access"], "hazards": ["Ticks"]},
        {"id": "t2", "name": "Royal Arch", "distanceMiles": 3.4, "elevationGainFeet": 1400,
         "difficulty": "Hard", "dogAbilityScore": 40, "dogAbilityReason": "Steep rocky steps"}
    ]"#;

    #[test]
    fn test_trails_fenced() {
        let text = format!("Here are three options:\n```json\n{}\n```", TRAILS);
        let trails = parse_trails(&text);
        assert_eq!(trails.len(), 2);
        assert_eq!(trails[0].name, "Mesa Trail");
        assert_eq!(trails[0].difficulty, Difficulty::Moderate);
        assert_eq!(trails[0].tags, vec!["Shaded", "Water Access"]);
        assert_eq!(trails[1].difficulty, Difficulty::Hard);
        assert!(trails[1].hazards.is_empty());
        assert_eq!(trails[1].uri, None);
    }

    #[test]
    fn test_trails_in_prose() {
        let text = format!("I found these near Boulder {} - enjoy the hike!", TRAILS);
        let trails = parse_trails(&text);
        assert_eq!(trails.len(), 2);
        assert_eq!(trails[1].elevation_gain_feet, 1400.0);
    }

    #[test]
    fn test_trails_non_array_is_empty() {
        assert!(parse_trails(PUG).is_empty());
        assert!(parse_trails(r#"{"trails": []}"#).is_empty());
    }

    #[test]
    fn test_trails_garbage_is_empty() {
        assert!(parse_trails("The maps tool returned nothing useful.").is_empty());
        assert!(parse_trails("").is_empty());
    }

    #[test]
    fn test_trails_skip_malformed_entries() {
        let text = r#"[{"id": "x", "name": "No numbers"}, {"id": "t3", "name": "Sanitas",
            "distanceMiles": 3.1, "elevationGainFeet": 1300, "difficulty": "Hard",
            "dogAbilityScore": 55, "dogAbilityReason": "Exposed"}]"#;
        let trails = parse_trails(text);
        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].id, "t3");
    }

    #[test]
    fn test_attach_sources() {
        let mut trails = parse_trails(TRAILS);
        let sources = vec![
            GroundingSource {
                title: String::new(),
                uri: "https://example.com/untitled".to_string(),
            },
            GroundingSource {
                title: "Mesa Trail - Boulder County".to_string(),
                uri: "https://maps.example.com/mesa".to_string(),
            },
        ];
        attach_sources(&mut trails, &sources);
        assert_eq!(trails[0].uri.as_deref(), Some("https://maps.example.com/mesa"));
        assert_eq!(trails[1].uri, None);

        let round_trip: Trail = serde_json::from_str(&serde_json::to_string(&trails[0]).unwrap()).unwrap();
        assert_eq!(round_trip, trails[0]);
    }

    #[test]
    fn test_analysis_fallback() {
        assert_eq!(analysis_or_fallback(None), FALLBACK_ANALYSIS);
        assert_eq!(analysis_or_fallback(Some("   ")), FALLBACK_ANALYSIS);
        assert_eq!(analysis_or_fallback(Some(" Nice hike. ")), "Nice hike.");
    }
}
