use serde::{Deserialize, Serialize};

/// UI icon, serialized as the Font Awesome class string the dashboard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IconId {
    #[serde(rename = "fas fa-sun")]
    Sun,
    #[serde(rename = "fas fa-moon")]
    Moon,
    #[serde(rename = "fas fa-cloud-sun")]
    CloudSun,
    #[serde(rename = "fas fa-cloud-moon")]
    CloudMoon,
    #[serde(rename = "fas fa-cloud")]
    Cloud,
    #[serde(rename = "fas fa-cloud-rain")]
    CloudRain,
    #[serde(rename = "fas fa-cloud-sun-rain")]
    CloudSunRain,
    #[serde(rename = "fas fa-cloud-moon-rain")]
    CloudMoonRain,
    #[serde(rename = "fas fa-bolt")]
    Bolt,
    #[serde(rename = "fas fa-snowflake")]
    Snowflake,
    #[serde(rename = "fas fa-smog")]
    Smog,
}

impl IconId {
    pub const FALLBACK: IconId = IconId::Cloud;

    pub fn as_str(&self) -> &'static str {
        match self {
            IconId::Sun => "fas fa-sun",
            IconId::Moon => "fas fa-moon",
            IconId::CloudSun => "fas fa-cloud-sun",
            IconId::CloudMoon => "fas fa-cloud-moon",
            IconId::Cloud => "fas fa-cloud",
            IconId::CloudRain => "fas fa-cloud-rain",
            IconId::CloudSunRain => "fas fa-cloud-sun-rain",
            IconId::CloudMoonRain => "fas fa-cloud-moon-rain",
            IconId::Bolt => "fas fa-bolt",
            IconId::Snowflake => "fas fa-snowflake",
            IconId::Smog => "fas fa-smog",
        }
    }
}

/// Upstream condition code to icon. Day and night variants of the nine
/// condition families; this is the only place the UI tells day from night.
const ICON_TABLE: [(&str, IconId); 18] = [
    ("01d", IconId::Sun),
    ("01n", IconId::Moon),
    ("02d", IconId::CloudSun),
    ("02n", IconId::CloudMoon),
    ("03d", IconId::Cloud),
    ("03n", IconId::Cloud),
    ("04d", IconId::Cloud),
    ("04n", IconId::Cloud),
    ("09d", IconId::CloudRain),
    ("09n", IconId::CloudRain),
    ("10d", IconId::CloudSunRain),
    ("10n", IconId::CloudMoonRain),
    ("11d", IconId::Bolt),
    ("11n", IconId::Bolt),
    ("13d", IconId::Snowflake),
    ("13n", IconId::Snowflake),
    ("50d", IconId::Smog),
    ("50n", IconId::Smog),
];

pub fn classify(condition_code: &str) -> IconId {
    ICON_TABLE
        .iter()
        .find(|(code, _)| *code == condition_code)
        .map(|(_, icon)| *icon)
        .unwrap_or_else(|| {
            tracing::debug!(
                "Unknown condition code {:?}, showing {}",
                condition_code,
                IconId::FALLBACK.as_str()
            );
            IconId::FALLBACK
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_codes() {
        let expected = [
            ("01d", "fas fa-sun"),
            ("01n", "fas fa-moon"),
            ("02d", "fas fa-cloud-sun"),
            ("02n", "fas fa-cloud-moon"),
            ("03d", "fas fa-cloud"),
            ("03n", "fas fa-cloud"),
            ("04d", "fas fa-cloud"),
            ("04n", "fas fa-cloud"),
            ("09d", "fas fa-cloud-rain"),
            ("09n", "fas fa-cloud-rain"),
            ("10d", "fas fa-cloud-sun-rain"),
            ("10n", "fas fa-cloud-moon-rain"),
            ("11d", "fas fa-bolt"),
            ("11n", "fas fa-bolt"),
            ("13d", "fas fa-snowflake"),
            ("13n", "fas fa-snowflake"),
            ("50d", "fas fa-smog"),
            ("50n", "fas fa-smog"),
        ];

        for (code, icon) in expected {
            assert_eq!(classify(code).as_str(), icon, "code {}", code);
        }
    }

    #[test]
    fn test_classify_unknown_falls_back_to_cloud() {
        assert_eq!(classify("99z"), IconId::Cloud);
        assert_eq!(classify(""), IconId::Cloud);
        assert_eq!(classify("01D"), IconId::Cloud);
    }

    #[test]
    fn test_icon_serializes_as_class_string() {
        let json = serde_json::to_string(&IconId::CloudMoonRain).unwrap();
        assert_eq!(json, "\"fas fa-cloud-moon-rain\"");
    }
}
