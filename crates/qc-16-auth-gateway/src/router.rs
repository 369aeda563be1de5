//! JSON-RPC 2.0 envelope handling shared by every listener.
//!
//! Authentication has already happened by the time a payload gets here; the
//! caller passes the resulting [`AuthStatus`] along with the body.

use crate::domain::error::{ApiError, ApiResult};
use crate::rpc::{AuthStatus, Dispatcher};
use serde_json::{json, Value};

/// Longest accepted string id
pub const MAX_ID_LENGTH: usize = 256;

/// Request processor bound to one listener's dispatcher.
#[derive(Debug, Clone)]
pub struct RpcRouter {
    dispatcher: Dispatcher,
    max_batch_size: usize,
}

impl RpcRouter {
    pub fn new(dispatcher: Dispatcher, max_batch_size: usize) -> Self {
        Self {
            dispatcher,
            max_batch_size,
        }
    }

    /// Parse and process a raw payload.
    pub async fn handle_body(&self, body: &str, status: AuthStatus) -> Value {
        match serde_json::from_str::<Value>(body) {
            Ok(request) => self.handle_value(request, status).await,
            Err(e) => error_response(Value::Null, &ApiError::parse_error(e.to_string())),
        }
    }

    /// Process a parsed single request or batch.
    pub async fn handle_value(&self, request: Value, status: AuthStatus) -> Value {
        match request {
            Value::Array(requests) => {
                if requests.is_empty() {
                    return error_response(Value::Null, &ApiError::invalid_request("empty batch"));
                }
                if requests.len() > self.max_batch_size {
                    return error_response(
                        Value::Null,
                        &ApiError::limit_exceeded(format!(
                            "batch of {} exceeds maximum of {}",
                            requests.len(),
                            self.max_batch_size
                        )),
                    );
                }

                let mut responses = Vec::with_capacity(requests.len());
                for req in &requests {
                    responses.push(self.handle_single(req, status).await);
                }
                Value::Array(responses)
            }
            single => self.handle_single(&single, status).await,
        }
    }

    async fn handle_single(&self, request: &Value, status: AuthStatus) -> Value {
        if !request.is_object() {
            return error_response(
                Value::Null,
                &ApiError::invalid_request("request must be an object"),
            );
        }

        let id = match validate_id(request.get("id")) {
            Ok(id) => id,
            Err(e) => return error_response(Value::Null, &e),
        };

        if let Some(version) = request.get("jsonrpc") {
            if version != "2.0" {
                return error_response(id, &ApiError::invalid_request("jsonrpc must be \"2.0\""));
            }
        }

        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return error_response(id, &ApiError::invalid_request("missing method"));
        };

        match self
            .dispatcher
            .dispatch(method, request.get("params"), status)
            .await
        {
            Ok(result) => success_response(id, result),
            Err(e) => error_response(id, &e),
        }
    }
}

/// Check a request id.
///
/// Null ids (notifications) are refused, as are empty or overlong strings and
/// any type other than string or number. An absent id answers with `null`.
pub fn validate_id(id: Option<&Value>) -> ApiResult<Value> {
    let Some(id) = id else {
        return Ok(Value::Null);
    };

    match id {
        Value::Null => Err(ApiError::invalid_request(
            "null id (notifications not supported)",
        )),
        Value::String(s) if s.is_empty() => Err(ApiError::invalid_request("empty string id")),
        Value::String(s) if s.len() > MAX_ID_LENGTH => Err(ApiError::invalid_request(format!(
            "id string too long (max {} chars)",
            MAX_ID_LENGTH
        ))),
        Value::String(_) | Value::Number(_) => Ok(id.clone()),
        _ => Err(ApiError::invalid_request("id must be string or number")),
    }
}

pub fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn error_response(id: Value, error: &ApiError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": error
    })
}
