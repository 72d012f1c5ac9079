use once_cell::sync::Lazy;
use regex::Regex;

static TAG_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z_]+(?::[a-z_]+)*)=([a-z0-9_;:-]+)").expect("valid tag syntax regex")
});

const PLACEHOLDER_TOKENS: &[&str] = &[
    "unnamed", "unknown", "waypoint", "poi", "none", "null", "n/a",
];

const SCENIC_AREA: &str = "Scenic Area";

fn name_words(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '/' || c == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_placeholder(name: &str) -> bool {
    let words = name_words(name);
    words.is_empty()
        || words.join(" ").contains("point of interest")
        || words
            .iter()
            .any(|word| PLACEHOLDER_TOKENS.contains(&word.as_str()))
}

/// Display name for a waypoint. Names made of OSM tag syntax (`leisure=park (node 42)`)
/// or carrying a placeholder token (`Unnamed park`) are replaced by a generic place label.
pub fn waypoint_display_name(name: &str, category: &str) -> String {
    let trimmed = name.trim();

    if let Some(captures) = TAG_SYNTAX.captures(trimmed) {
        return generic_place_label(&captures[1], &captures[2]).to_string();
    }

    if is_placeholder(trimmed) {
        let label = match TAG_SYNTAX.captures(category) {
            Some(captures) => generic_place_label(&captures[1], &captures[2]),
            None => generic_place_label("", category),
        };
        if label != SCENIC_AREA {
            return label.to_string();
        }
        // No usable category; the rest of the name may still say what the place is.
        return name_words(trimmed)
            .iter()
            .map(|word| generic_place_label("", word))
            .find(|label| *label != SCENIC_AREA)
            .unwrap_or(SCENIC_AREA)
            .to_string();
    }

    trimmed.to_string()
}

fn generic_place_label(key: &str, value: &str) -> &'static str {
    let key = key.to_lowercase();
    let value = value.trim().to_lowercase();

    match (key.as_str(), value.as_str()) {
        (_, "park" | "garden" | "nature_reserve" | "dog_park" | "playground" | "recreation_ground") => {
            "Park"
        }
        (_, "cafe" | "coffee" | "coffee_shop") => "Cafe",
        ("tourism" | "historic", _) => "Attraction",
        (
            _,
            "attraction" | "viewpoint" | "museum" | "artwork" | "gallery" | "monument"
            | "memorial" | "zoo" | "theme_park",
        ) => "Attraction",
        ("natural" | "waterway", _) => "Natural Area",
        (_, "forest" | "wood" | "water" | "beach" | "coastline" | "peak" | "waterfall" | "cliff") => {
            "Natural Area"
        }
        _ => SCENIC_AREA,
    }
}

/// Human label for a classification tag; unknown tags pass through verbatim.
pub fn tag_label(tag: &str) -> String {
    let label = match tag.trim().to_lowercase().as_str() {
        "scenic" | "scenery" => "Scenic",
        "park" | "parks" | "leisure=park" | "leisure=garden" | "garden" => "Parks & gardens",
        "waterfront" | "water" | "natural=water" | "natural=coastline" | "leisure=marina" => {
            "Waterfront"
        }
        "beach" | "natural=beach" => "Beach",
        "viewpoint" | "viewpoints" | "tourism=viewpoint" | "natural=peak" => "Viewpoints",
        "cafe" | "coffee" | "amenity=cafe" => "Coffee stops",
        "attraction" | "tourism=attraction" | "tourism=museum" | "museum" => "Attractions",
        "forest" | "green" | "landuse=forest" | "natural=wood" => "Green space",
        "historic" | "history" => "Historic",
        "quiet" | "quiet_streets" => "Quiet streets",
        "shortest" => "Shortest",
        "fastest" => "Fastest",
        _ => return tag.trim().to_string(),
    };
    label.to_string()
}
