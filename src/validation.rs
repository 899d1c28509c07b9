//! Input checks that run before anything reaches the mutation coordinator
//! or the store. A value of [`LinkDraft`], [`LinkPatch`] or [`ProfileDraft`]
//! is always valid; the only way to build one is through its constructor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{LinkChanges, NewLink, Theme};

const FALLBACK_TITLE: &str = "New Link";
const MIN_USERNAME_LEN: usize = 3;
const MAX_BIO_LEN: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("URL cannot be empty")]
    EmptyUrl,
    #[error("'{0}' is not a valid URL")]
    MalformedUrl(String),
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("nothing to update")]
    EmptyPatch,
    #[error("username must be at least 3 characters")]
    UsernameTooShort,
    #[error("username may only contain letters, numbers, and underscores")]
    UsernameCharset,
    #[error("name is required")]
    EmptyFullName,
    #[error("bio must be at most 160 characters")]
    BioTooLong,
    #[error(transparent)]
    Theme(#[from] crate::models::profile::UnknownTheme),
}

/// Trim the input and make sure it carries an explicit scheme.
pub fn normalize_url(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::MalformedUrl(trimmed.to_string()));
    }

    let url = if scheme_len(trimmed).is_some() {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    if host_segment(&url).is_empty() {
        return Err(ValidationError::MalformedUrl(trimmed.to_string()));
    }

    Ok(url)
}

/// Title shown for a link created without one: the host segment of the URL
/// without a leading `www.`.
pub fn default_title(url: &str) -> String {
    let host = host_segment(url);
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        host.to_string()
    }
}

fn scheme_len(url: &str) -> Option<usize> {
    ["https://", "http://"].into_iter().find_map(|scheme| {
        url.get(..scheme.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
            .map(|_| scheme.len())
    })
}

fn host_segment(url: &str) -> &str {
    let rest = &url[scheme_len(url).unwrap_or(0)..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

/// A link ready to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDraft {
    title: String,
    url: String,
}

impl LinkDraft {
    pub fn new(url: &str, title: Option<&str>) -> Result<Self, ValidationError> {
        let url = normalize_url(url)?;
        let title = match title {
            Some(title) => {
                let title = title.trim();
                if title.is_empty() {
                    return Err(ValidationError::EmptyTitle);
                }
                title.to_string()
            }
            None => default_title(&url),
        };
        Ok(Self { title, url })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn into_new_link(self, display_order: i64) -> NewLink {
        NewLink {
            title: self.title,
            url: self.url,
            display_order: Some(display_order),
        }
    }
}

/// Edit of a link's title, URL, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPatch {
    title: Option<String>,
    url: Option<String>,
}

impl LinkPatch {
    pub fn new(title: Option<&str>, url: Option<&str>) -> Result<Self, ValidationError> {
        if title.is_none() && url.is_none() {
            return Err(ValidationError::EmptyPatch);
        }

        let title = title
            .map(|t| {
                let t = t.trim();
                if t.is_empty() {
                    Err(ValidationError::EmptyTitle)
                } else {
                    Ok(t.to_string())
                }
            })
            .transpose()?;
        let url = url.map(normalize_url).transpose()?;

        Ok(Self { title, url })
    }

    pub fn title(title: &str) -> Result<Self, ValidationError> {
        Self::new(Some(title), None)
    }

    pub fn url(url: &str) -> Result<Self, ValidationError> {
        Self::new(None, Some(url))
    }

    pub fn to_changes(&self) -> LinkChanges {
        LinkChanges {
            title: self.title.clone(),
            url: self.url.clone(),
            ..LinkChanges::default()
        }
    }
}

/// Profile form contents after checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub username: String,
    pub full_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub theme: Theme,
}

/// Raw profile form as submitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileForm {
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
}

impl ProfileDraft {
    pub fn new(form: ProfileForm) -> Result<Self, ValidationError> {
        let username = form.username.trim().to_string();
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(ValidationError::UsernameTooShort);
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ValidationError::UsernameCharset);
        }

        let full_name = form.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(ValidationError::EmptyFullName);
        }

        let bio = form.bio.unwrap_or_default();
        if bio.chars().count() > MAX_BIO_LEN {
            return Err(ValidationError::BioTooLong);
        }

        let theme = match form.theme.as_deref() {
            Some(raw) => raw.parse()?,
            None => Theme::default(),
        };

        let avatar_url = form
            .avatar_url
            .filter(|url| !url.trim().is_empty())
            .map(|url| normalize_url(&url))
            .transpose()?;

        Ok(Self {
            username,
            full_name,
            bio,
            avatar_url,
            theme,
        })
    }
}
