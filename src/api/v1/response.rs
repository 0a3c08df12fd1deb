use serde::Serialize;
use warp::Reply;
use warp::http::StatusCode;

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.as_u16() < 400,
            status,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    pub fn into_response(self) -> warp::reply::Response {
        let status = self.status;
        warp::reply::with_status(warp::reply::json(&self), status).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_follows_status_code() {
        let created = serde_json::to_value(ApiResponse::new(StatusCode::CREATED, 1, "made")).unwrap();
        assert_eq!(
            created,
            json!({"statusCode": 201, "data": 1, "message": "made", "success": true})
        );

        let odd = serde_json::to_value(ApiResponse::new(StatusCode::BAD_REQUEST, (), "no")).unwrap();
        assert_eq!(odd["success"], false);
    }

    #[test]
    fn into_response_keeps_status() {
        let res = ApiResponse::new(StatusCode::CREATED, json!({}), "made").into_response();
        assert_eq!(res.status(), StatusCode::CREATED);
    }
}
