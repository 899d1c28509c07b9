use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::Link;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Ocean,
    Sunset,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Light, Theme::Dark, Theme::Ocean, Theme::Sunset];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Ocean => "ocean",
            Theme::Sunset => "sunset",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme '{0}'")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

/// Stored values outside the known set render with the default theme.
impl From<String> for Theme {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub owner_id: String,
    pub username: String,
    pub full_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub theme: Theme,
    pub updated_at: i64,
}

/// What a visitor sees at `/u/{username}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicPage {
    pub profile: Profile,
    pub links: Vec<Link>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parses_case_insensitively() {
        assert_eq!("Ocean".parse::<Theme>().unwrap(), Theme::Ocean);
        assert_eq!(" sunset ".parse::<Theme>().unwrap(), Theme::Sunset);
        assert!("neon".parse::<Theme>().is_err());
    }

    #[test]
    fn unknown_stored_theme_falls_back_to_light() {
        assert_eq!(Theme::from("neon".to_string()), Theme::Light);
        assert_eq!(Theme::from("dark".to_string()), Theme::Dark);
    }

    #[test]
    fn theme_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Theme::Sunset).unwrap(), "\"sunset\"");
    }
}
