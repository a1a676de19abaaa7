//! Test fixtures with sample data.

use serde_json::{json, Value};

/// Session JSON for a site admin with identity provider claims.
#[must_use]
pub fn admin_session_json() -> Value {
    json!({
        "id": "0051a000000AbCdEF",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com",
        "username": "ada",
        "federationId": "ada-fed",
        "siteId": "site-1",
        "profileName": "Admin",
        "subdomain": "acme",
        "namedPermissions": {
            "skuid": ["configure_site", "skuid_admin"]
        },
        "identityProviderClaims": {
            "groups": ["engineering", "admins"],
            "empty": []
        },
        "sessionVariables": {
            "idp_attribute": "groups"
        },
        "featureFlags": {
            "new-builder": true,
            "legacy-mode": false
        }
    })
}

/// Session JSON for a standard user with only the required fields.
#[must_use]
pub fn standard_session_json() -> Value {
    json!({
        "id": "0051a000000XyZ",
        "firstName": "Grace",
        "lastName": "Hopper",
        "email": "grace@example.com",
        "username": "grace",
        "siteId": "site-1",
        "profileName": "Standard User"
    })
}

/// A JSON object exercising every value kind.
#[must_use]
pub fn sample_object() -> Value {
    json!({
        "name": "widget",
        "count": 3,
        "ratio": 0.5,
        "enabled": true,
        "tags": ["a", "b"],
        "children": [{"id": 1}, {"id": 2}],
        "meta": {"owner": "ops"},
        "nothing": null
    })
}
