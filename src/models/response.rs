use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `{"status": "Success", "msg": ..., <payload fields>}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub msg: String,
    #[serde(flatten)]
    pub data: T,
}

/// Payload for responses that only carry a message.
#[derive(Debug, Serialize)]
pub struct Empty {}

/// Listing and detail payloads are keyed `row`.
#[derive(Debug, Serialize)]
pub struct Rows<T: Serialize> {
    pub row: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(msg: impl Into<String>, data: T) -> Self {
        ApiResponse {
            status: "Success",
            msg: msg.into(),
            data,
        }
    }
}

impl<T: Serialize> ApiResponse<Rows<T>> {
    pub fn rows(msg: impl Into<String>, row: T) -> Self {
        Self::success(msg, Rows { row })
    }
}

impl ApiResponse<Empty> {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::success(msg, Empty {})
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Token {
        #[serde(rename = "tokenId")]
        token_id: String,
    }

    #[test]
    fn test_payload_is_flattened() {
        let response = ApiResponse::success("Login Success", Token { token_id: "abc".to_string() });
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json, serde_json::json!({"status": "Success", "msg": "Login Success", "tokenId": "abc"}));
    }

    #[test]
    fn test_message_only() {
        let json = serde_json::to_value(ApiResponse::message("oke logout")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "Success", "msg": "oke logout"}));
    }

    #[test]
    fn test_rows() {
        let json = serde_json::to_value(ApiResponse::rows("list", vec![1, 2])).unwrap();
        assert_eq!(json["row"], serde_json::json!([1, 2]));
    }
}
