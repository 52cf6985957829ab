use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for registration. Fields default to empty so a missing
/// key reaches the handler's own validation instead of a 422 from the
/// JSON extractor.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response after registration. Password is never echoed.
#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Response after login.
#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_request_defaults_missing_fields_to_empty() {
        let req: SignupRequest = serde_json::from_str(r#"{"email":"a@b.co"}"#).unwrap();
        assert!(req.name.is_empty());
        assert_eq!(req.email, "a@b.co");
        assert!(req.password.is_empty());
    }

    #[test]
    fn signin_response_serialization() {
        let response = SigninResponse {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            role: None,
            token: "abc.def.ghi".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("token"));
        assert!(json.contains("role"));
    }
}
