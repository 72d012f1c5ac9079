use crate::models::CURRENT_LOCATION;

pub fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Two query texts are the same query when they match after whitespace
/// normalization. Case changes count as a new query.
pub fn same_query(left: &str, right: &str) -> bool {
    normalize_text(left) == normalize_text(right)
}

pub fn is_current_location(text: &str) -> bool {
    let normalized = normalize_text(text).to_lowercase();
    normalized.is_empty()
        || normalized == CURRENT_LOCATION.to_lowercase()
        || matches!(normalized.as_str(), "my location" | "here" | "current position")
}

/// Preference words the backend pipeline can turn into waypoint searches.
pub fn preference_keywords(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    [
        "park",
        "scenic",
        "water",
        "beach",
        "view",
        "cafe",
        "coffee",
        "garden",
        "forest",
        "museum",
        "historic",
        "quiet",
    ]
    .into_iter()
    .filter(|keyword| lower.contains(keyword))
    .collect()
}
