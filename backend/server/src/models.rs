//! # Documents
//!
//! Everything the store persists, serialized as camelCase JSON both on the wire and at rest.
//!
//! - **NavigationItem**: one clickable header link. Ordered collection, see [`crate::header`].
//! - **HeaderSettings**: text label + uploaded logo reference + display size hint.
//! - **SiteLogo**: the single logo shown in the header, replaced in place.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_LOGO_WIDTH: u32 = 100;
pub const DEFAULT_LOGO_HEIGHT: u32 = 50;
pub const DEFAULT_LOGO_ALT: &str = "Site Logo";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    pub id: Uuid,
    pub text: String,
    pub link: String,
    pub order: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl NavigationItem {
    pub fn new(text: String, link: String, order: Option<u32>, is_active: Option<bool>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            link,
            order: order.unwrap_or(0),
            is_active: is_active.unwrap_or(true),
            created_at: Utc::now(),
        }
    }
}

/// Create/update body for navigation items. Text and link stay optional here so that
/// a missing field reaches validation instead of failing deserialization.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItemPayload {
    pub text: Option<String>,
    pub link: Option<String>,
    pub order: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeaderSettings {
    pub id: Uuid,
    pub text: String,
    pub logo: String,
    pub logo_width: u32,
    pub logo_height: u32,
    pub created_at: DateTime<Utc>,
}

impl HeaderSettings {
    pub fn new(text: String, logo: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            logo,
            logo_width: DEFAULT_LOGO_WIDTH,
            logo_height: DEFAULT_LOGO_HEIGHT,
            created_at: Utc::now(),
        }
    }

    /// Fixed-width `createdAt` + id, ordered the same way the settings list is.
    pub fn rank(&self) -> String {
        format!("{}:{}", self.created_at.format("%Y%m%d%H%M%S%9f"), self.id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SiteLogo {
    pub url: String,
    pub path: String,
    pub alt: String,
}
