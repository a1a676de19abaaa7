//! Auth session claim accessors.
//!
//! [`SessionUser`] is the user payload returned by the platform auth provider
//! for an authenticated session. [`UserInfo`] exposes the lookups that data
//! source conditions need when evaluating current user values.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::mapvalue::string_slice_contains_key;

/// Named-permission set that carries platform-level grants.
pub const PLATFORM_PERMISSION_SET: &str = "skuid";

/// Permission granting site administration.
pub const CONFIGURE_SITE_PERMISSION: &str = "configure_site";

/// Permission granting platform-wide administration.
pub const PLATFORM_ADMIN_PERMISSION: &str = "skuid_admin";

/// Profile name treated as admin when no platform permission set is present.
const ADMIN_PROFILE_NAME: &str = "Admin";

/// User information for an authenticated session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionUser {
    /// User ID
    pub id: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Email address
    pub email: String,
    /// Username
    pub username: String,
    /// Federation ID from the identity provider
    pub federation_id: String,
    /// Site the session belongs to
    pub site_id: String,
    /// Profile name
    pub profile_name: String,
    /// Site subdomain
    pub subdomain: String,
    /// Permission names grouped by permission set
    #[serde(deserialize_with = "null_as_default")]
    pub named_permissions: HashMap<String, Vec<String>>,
    /// Claims returned by the identity provider (SAML sessions)
    #[serde(deserialize_with = "null_as_default")]
    pub identity_provider_claims: HashMap<String, Vec<String>>,
    /// Session variable name to identity attribute name
    #[serde(deserialize_with = "null_as_default")]
    pub session_variables: HashMap<String, String>,
    /// Feature flags enabled for this user
    #[serde(deserialize_with = "null_as_default")]
    pub feature_flags: HashMap<String, bool>,
}

/// Reads an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lookups over the current user's values.
pub trait UserInfo {
    /// Whether this user has site admin privileges.
    fn is_admin(&self) -> bool;

    /// Whether this user is a platform administrator.
    fn is_platform_admin(&self) -> bool;

    /// Retrieve a value by field name, `None` for unknown fields.
    fn field_value(&self, field: &str) -> Option<&str>;

    /// Retrieve a claim from the identity provider, `None` when missing or empty.
    fn identity_provider_claim(&self, claim_name: &str) -> Option<&[String]>;

    /// Identity attribute name tied to a session variable, empty when unmapped.
    fn identity_attribute_name(&self, session_variable_name: &str) -> &str;

    /// Profile name.
    fn profile_name(&self) -> &str;

    /// Feature flags.
    fn feature_flags(&self) -> &HashMap<String, bool>;
}

impl SessionUser {
    fn platform_permissions(&self) -> Option<&[String]> {
        self.named_permissions
            .get(PLATFORM_PERMISSION_SET)
            .map(Vec::as_slice)
    }
}

impl UserInfo for SessionUser {
    fn is_admin(&self) -> bool {
        match self.platform_permissions() {
            Some(permissions) => string_slice_contains_key(permissions, CONFIGURE_SITE_PERMISSION),
            // Older auth providers omit named permissions entirely.
            None => self.profile_name == ADMIN_PROFILE_NAME,
        }
    }

    fn is_platform_admin(&self) -> bool {
        self.platform_permissions().is_some_and(|permissions| {
            string_slice_contains_key(permissions, PLATFORM_ADMIN_PERMISSION)
        })
    }

    fn field_value(&self, field: &str) -> Option<&str> {
        let value = match field {
            "first_name" => &self.first_name,
            "last_name" => &self.last_name,
            "email" => &self.email,
            "username" => &self.username,
            "user_id" => &self.id,
            "federation_id" => &self.federation_id,
            "site_id" => &self.site_id,
            "profile_name" => &self.profile_name,
            "subdomain" => &self.subdomain,
            _ => return None,
        };
        Some(value.as_str())
    }

    fn identity_provider_claim(&self, claim_name: &str) -> Option<&[String]> {
        self.identity_provider_claims
            .get(claim_name)
            .filter(|claim| !claim.is_empty())
            .map(Vec::as_slice)
    }

    fn identity_attribute_name(&self, session_variable_name: &str) -> &str {
        self.session_variables
            .get(session_variable_name)
            .map_or("", String::as_str)
    }

    fn profile_name(&self) -> &str {
        &self.profile_name
    }

    fn feature_flags(&self) -> &HashMap<String, bool> {
        &self.feature_flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_permissions(permissions: &[&str]) -> SessionUser {
        let mut user = SessionUser::default();
        user.named_permissions.insert(
            PLATFORM_PERMISSION_SET.to_string(),
            permissions.iter().map(ToString::to_string).collect(),
        );
        user
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "id": "u-1",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "siteId": "site-9",
            "profileName": "Standard",
            "namedPermissions": {"skuid": ["configure_site"]},
            "featureFlags": {"beta": true}
        }"#;

        let user: SessionUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.site_id, "site-9");
        assert!(user.identity_provider_claims.is_empty());
        assert_eq!(user.feature_flags().get("beta"), Some(&true));
    }

    #[test]
    fn test_deserialize_null_maps() {
        let json = r#"{
            "id": "u-1",
            "profileName": "Admin",
            "namedPermissions": null,
            "featureFlags": null
        }"#;

        let user: SessionUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "u-1");
        assert!(user.named_permissions.is_empty());
        assert!(user.feature_flags.is_empty());
        assert!(user.is_admin());
        assert!(!user.is_platform_admin());
    }

    #[test]
    fn test_is_admin_from_named_permissions() {
        assert!(user_with_permissions(&["configure_site"]).is_admin());

        // Permission set present but without the grant wins over profile name.
        let mut user = user_with_permissions(&["view"]);
        user.profile_name = "Admin".to_string();
        assert!(!user.is_admin());
    }

    #[test]
    fn test_is_admin_falls_back_to_profile() {
        let user = SessionUser {
            profile_name: "Admin".to_string(),
            ..SessionUser::default()
        };
        assert!(user.is_admin());
        assert!(!SessionUser::default().is_admin());
    }

    #[test]
    fn test_is_platform_admin() {
        assert!(user_with_permissions(&["skuid_admin"]).is_platform_admin());
        assert!(!user_with_permissions(&["configure_site"]).is_platform_admin());
        assert!(!SessionUser::default().is_platform_admin());
    }

    #[test]
    fn test_field_value() {
        let user = SessionUser {
            id: "u-1".to_string(),
            email: "ada@example.com".to_string(),
            subdomain: "acme".to_string(),
            ..SessionUser::default()
        };

        assert_eq!(user.field_value("user_id"), Some("u-1"));
        assert_eq!(user.field_value("email"), Some("ada@example.com"));
        assert_eq!(user.field_value("subdomain"), Some("acme"));
        assert_eq!(user.field_value("first_name"), Some(""));
        assert_eq!(user.field_value("shoe_size"), None);
    }

    #[test]
    fn test_identity_provider_claim() {
        let mut user = SessionUser::default();
        user.identity_provider_claims
            .insert("groups".to_string(), vec!["eng".to_string()]);
        user.identity_provider_claims.insert("empty".to_string(), vec![]);

        assert_eq!(user.identity_provider_claim("groups"), Some(&["eng".to_string()][..]));
        assert_eq!(user.identity_provider_claim("empty"), None);
        assert_eq!(user.identity_provider_claim("missing"), None);
    }

    #[test]
    fn test_identity_attribute_name() {
        let mut user = SessionUser::default();
        user.session_variables
            .insert("department".to_string(), "urn:dept".to_string());

        assert_eq!(user.identity_attribute_name("department"), "urn:dept");
        assert_eq!(user.identity_attribute_name("missing"), "");
    }
}
