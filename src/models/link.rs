use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Store-assigned link identifier.
pub type LinkId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: LinkId,
    pub owner_id: String,
    pub title: String,
    pub url: String,
    /// Missing only on rows written before ordering existed.
    pub display_order: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
}

/// Fields for a link about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLink {
    pub title: String,
    pub url: String,
    pub display_order: Option<i64>,
}

/// Partial update of a link. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl LinkChanges {
    pub fn order(display_order: i64) -> Self {
        Self {
            display_order: Some(display_order),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.url.is_none()
            && self.display_order.is_none()
            && self.is_active.is_none()
    }

    /// Apply the present fields to a locally held link.
    pub fn apply_to(&self, link: &mut Link) {
        if let Some(title) = &self.title {
            link.title = title.clone();
        }
        if let Some(url) = &self.url {
            link.url = url.clone();
        }
        if let Some(order) = self.display_order {
            link.display_order = Some(order);
        }
        if let Some(active) = self.is_active {
            link.is_active = active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_serialize_only_present_fields() {
        let json = serde_json::to_value(LinkChanges::order(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "display_order": 3 }));
    }

    #[test]
    fn apply_to_leaves_absent_fields_alone() {
        let mut link = Link {
            id: 1,
            owner_id: "owner".into(),
            title: "Old".into(),
            url: "https://old.example".into(),
            display_order: Some(0),
            is_active: true,
            created_at: 0,
        };

        LinkChanges {
            title: Some("New".into()),
            ..LinkChanges::default()
        }
        .apply_to(&mut link);

        assert_eq!(link.title, "New");
        assert_eq!(link.url, "https://old.example");
        assert_eq!(link.display_order, Some(0));
    }
}
