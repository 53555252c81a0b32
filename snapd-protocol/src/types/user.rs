use serde::Deserialize;

use super::AuthData;

/// A local user known to snapd, as returned by login, create-user and users.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserInformation {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub ssh_keys: Vec<String>,
    #[serde(default)]
    pub macaroon: Option<String>,
    #[serde(default)]
    pub discharges: Vec<String>,
}

impl UserInformation {
    /// Credentials handed back by a successful login.
    pub fn auth_data(&self) -> Option<AuthData> {
        self.macaroon
            .as_ref()
            .map(|macaroon| AuthData::new(macaroon.clone(), self.discharges.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_result_carries_auth_data() {
        let user: UserInformation = serde_json::from_str(
            r#"{"id": 1, "username": "alice", "email": "alice@example.com",
                "macaroon": "root", "discharges": ["d1", "d2"]}"#,
        )
        .unwrap();
        let auth = user.auth_data().unwrap();
        assert_eq!(auth.macaroon, "root");
        assert_eq!(auth.discharges, vec!["d1", "d2"]);
    }

    #[test]
    fn plain_user_has_no_auth_data() {
        let user: UserInformation =
            serde_json::from_str(r#"{"id": 2, "username": "bob"}"#).unwrap();
        assert_eq!(user.auth_data(), None);
    }
}
