use crate::models::illuminance::{Daypart, TwilightFlags};
use crate::services::window_exposure::circular_distance;

/// Classifies the time of day from sun position alone.
///
/// Without an azimuth the morning/afternoon side is unknown, so the label
/// follows a single rising elevation ladder.
pub fn daypart(elevation_deg: f64, azimuth_deg: Option<f64>, latitude: Option<f64>) -> Daypart {
    if elevation_deg < -6.0 {
        return Daypart::Night;
    }
    if elevation_deg < 0.0 {
        return match azimuth_deg {
            Some(az) if az >= 180.0 => Daypart::LateEvening,
            _ => Daypart::EarlyMorning,
        };
    }

    let Some(az) = azimuth_deg else {
        return if elevation_deg < 8.0 {
            Daypart::EarlyMorning
        } else if elevation_deg < 20.0 {
            Daypart::Morning
        } else if elevation_deg < 35.0 {
            Daypart::LateMorning
        } else {
            Daypart::Midday
        };
    };

    // Sun culminates due south in the northern hemisphere, due north in the south
    let noon_az = match latitude {
        Some(lat) if lat < 0.0 => 0.0,
        _ => 180.0,
    };
    if elevation_deg >= 35.0 && circular_distance(az, noon_az) <= 30.0 {
        return Daypart::Midday;
    }

    if az < 180.0 {
        if elevation_deg < 8.0 {
            Daypart::EarlyMorning
        } else if elevation_deg < 20.0 {
            Daypart::Morning
        } else {
            Daypart::LateMorning
        }
    } else if elevation_deg >= 20.0 {
        Daypart::Afternoon
    } else if elevation_deg >= 8.0 {
        Daypart::LateAfternoon
    } else {
        Daypart::Evening
    }
}

const LABELS_EN: &[(&str, &str)] = &[
    ("night", "night"),
    ("late_evening", "late evening"),
    ("early_morning", "early morning"),
    ("morning", "forenoon"),
    ("late_morning", "late forenoon"),
    ("midday", "midday"),
    ("afternoon", "afternoon"),
    ("late_afternoon", "late afternoon"),
    ("evening", "evening"),
];

const LABELS_DE: &[(&str, &str)] = &[
    ("night", "Nacht"),
    ("late_evening", "Spätabend"),
    ("early_morning", "Früher Morgen"),
    ("morning", "Vormittag"),
    ("late_morning", "Später Vormittag"),
    ("midday", "Mittag"),
    ("afternoon", "Nachmittag"),
    ("late_afternoon", "Später Nachmittag"),
    ("evening", "Abends"),
];

/// Renders a daypart slug in the given language. German for tags starting
/// with `de`, English otherwise; unknown slugs come back unchanged.
pub fn localized_label<'a>(slug: &'a str, language: &str) -> &'a str {
    let table = if language.to_ascii_lowercase().starts_with("de") {
        LABELS_DE
    } else {
        LABELS_EN
    };
    table
        .iter()
        .find(|(key, _)| *key == slug)
        .map(|(_, label)| *label)
        .unwrap_or(slug)
}

pub fn twilight_flags(elevation_deg: f64) -> TwilightFlags {
    TwilightFlags {
        civil: (-6.0..0.0).contains(&elevation_deg),
        nautical: (-12.0..-6.0).contains(&elevation_deg),
        astronomical: (-18.0..-12.0).contains(&elevation_deg),
    }
}
