//! Text of outgoing Telegram messages.

/// Google Maps link for a position.
pub fn maps_link(latitude: f64, longitude: f64) -> String {
    format!("https://maps.google.com/?q={latitude:.6},{longitude:.6}")
}

/// Fixed message, prefixed with the pilot name when one is set.
pub fn message_text(pilot: Option<&str>, message: &str) -> String {
    match non_empty(pilot) {
        Some(pilot) => format!("{pilot}: {message}"),
        None => message.to_string(),
    }
}

/// Position message; wording depends on which of pilot and event are known.
pub fn position_text(
    pilot: Option<&str>,
    event: Option<&str>,
    latitude: f64,
    longitude: f64,
) -> String {
    let link = maps_link(latitude, longitude);
    match (non_empty(pilot), non_empty(event)) {
        (Some(pilot), Some(event)) => format!("Position from {pilot} ({event}): {link}"),
        (Some(pilot), None) => format!("Position from {pilot}: {link}"),
        (None, Some(event)) => format!("Position ({event}): {link}"),
        (None, None) => format!("Position: {link}"),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
