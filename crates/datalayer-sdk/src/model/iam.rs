// IAM model types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::epoch_seconds;

/// Platform user profile
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub uid: String,
    #[serde(rename = "handle_s", alias = "handle")]
    pub handle: String,
    #[serde(rename = "email_s", alias = "email")]
    pub email: String,
    #[serde(rename = "first_name_t", alias = "first_name")]
    pub first_name: String,
    #[serde(rename = "last_name_t", alias = "last_name")]
    pub last_name: String,
    #[serde(
        rename = "avatar_url_s",
        alias = "avatar_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_url: Option<String>,
    #[serde(rename = "roles_ss", alias = "roles")]
    pub roles: Vec<String>,
}

impl User {
    /// First and last name, or the handle when both are blank
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.handle.clone()
        } else {
            full.to_string()
        }
    }

    /// Upper-cased initials of the display name
    pub fn initials(&self) -> String {
        let first = self.first_name.trim().chars().next();
        let last = self.last_name.trim().chars().next();
        match (first, last) {
            (None, None) => self
                .handle
                .chars()
                .next()
                .map(|c| c.to_uppercase().collect::<String>())
                .unwrap_or_default(),
            (first, last) => first
                .into_iter()
                .chain(last)
                .flat_map(char::to_uppercase)
                .collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Successful login answer
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    pub token: String,
    pub user: Option<User>,
}

/// Profile fields to change with `update_me`; unset fields are left as-is
#[derive(Clone, Debug, Default, Serialize)]
pub struct UpdateMe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UpdateMe {
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_first_name(mut self, first_name: &str) -> Self {
        self.first_name = Some(first_name.to_string());
        self
    }

    pub fn with_last_name(mut self, last_name: &str) -> Self {
        self.last_name = Some(last_name.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }
}

/// Credit balance of the current account
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credits {
    pub credits: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<f64>,
    #[serde(with = "epoch_seconds")]
    pub last_update: Option<DateTime<Utc>>,
}

/// Credits held back for a running resource
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reservation {
    pub id: String,
    pub credits: f64,
    pub resource: String,
    #[serde(with = "epoch_seconds")]
    pub last_update: Option<DateTime<Utc>>,
}

/// Balance plus outstanding reservations
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditsInfo {
    pub credits: Credits,
    pub reservations: Vec<Reservation>,
}

impl CreditsInfo {
    pub fn reserved(&self) -> f64 {
        self.reservations.iter().map(|r| r.credits).sum()
    }

    /// Credits left once reservations are accounted for
    pub fn available(&self) -> f64 {
        self.credits.credits - self.reserved()
    }
}

/// User-issued API token
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToken {
    pub uid: String,
    #[serde(alias = "name_s")]
    pub name: String,
    #[serde(alias = "description_t")]
    pub description: String,
    #[serde(alias = "variant_s")]
    pub variant: String,
    #[serde(with = "epoch_seconds", alias = "expiration_ts_dt")]
    pub expiration_date: Option<DateTime<Utc>>,
    /// Secret value, only returned when the token is created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ApiToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date.is_some_and(|expiration| expiration <= now)
    }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct CreateToken<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub variant: &'a str,
    pub expiration_date: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(first: &str, last: &str, handle: &str) -> User {
        User {
            first_name: first.to_string(),
            last_name: last.to_string(),
            handle: handle.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_user_from_suffixed_fields() {
        let user: User = serde_json::from_value(json!({
            "id": "42",
            "uid": "01HRQ",
            "handle_s": "eric",
            "email_s": "eric@example.com",
            "first_name_t": "Eric",
            "last_name_t": "Charles",
            "roles_ss": ["platform_member", "platform_admin"],
        }))
        .unwrap();

        assert_eq!(user.handle, "eric");
        assert_eq!(user.email, "eric@example.com");
        assert!(user.has_role("platform_admin"));
        assert!(!user.has_role("guest"));
        assert!(user.avatar_url.is_none());
    }

    #[test]
    fn test_user_from_plain_fields() {
        let user: User = serde_json::from_value(json!({
            "handle": "ada",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "roles": ["member"],
        }))
        .unwrap();

        assert_eq!(user.display_name(), "Ada Lovelace");
        assert!(user.has_role("member"));
    }

    #[test]
    fn test_display_name_and_initials() {
        assert_eq!(user("Ada", "Lovelace", "ada").display_name(), "Ada Lovelace");
        assert_eq!(user("Ada", "", "ada").display_name(), "Ada");
        assert_eq!(user("  ", "", "ada").display_name(), "ada");

        assert_eq!(user("ada", "lovelace", "x").initials(), "AL");
        assert_eq!(user("", "Lovelace", "x").initials(), "L");
        assert_eq!(user("", "", "zed").initials(), "Z");
        assert_eq!(user("", "", "").initials(), "");
    }

    #[test]
    fn test_update_me_skips_unset_fields() {
        let update = UpdateMe::default().with_first_name("Ada");
        assert!(!update.is_empty());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"first_name": "Ada"}));
        assert!(UpdateMe::default().is_empty());
    }

    #[test]
    fn test_credits_available() {
        let info: CreditsInfo = serde_json::from_value(json!({
            "success": true,
            "credits": {"credits": 100.0, "quota": 500.0, "last_update": "1700000000"},
            "reservations": [
                {"id": "r1", "credits": 12.5, "resource": "jupyter-ada-1"},
                {"id": "r2", "credits": 7.5, "resource": "jupyter-ada-2"},
            ],
        }))
        .unwrap();

        assert_eq!(info.reserved(), 20.0);
        assert_eq!(info.available(), 80.0);
        assert_eq!(info.credits.quota, Some(500.0));
        assert!(info.credits.last_update.is_some());
    }

    #[test]
    fn test_api_token_expiration() {
        let token: ApiToken = serde_json::from_value(json!({
            "uid": "t1",
            "name": "ci",
            "variant": "user_token",
            "expiration_date": 1_700_000_000,
        }))
        .unwrap();

        let before = DateTime::from_timestamp(1_699_999_999, 0).unwrap();
        let after = DateTime::from_timestamp(1_700_000_001, 0).unwrap();
        assert!(!token.is_expired(before));
        assert!(token.is_expired(after));
        assert!(!ApiToken::default().is_expired(after));
    }
}
