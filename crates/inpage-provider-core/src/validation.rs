//! Shape checks for `request` arguments.

use serde_json::Value;

use crate::domain::RequestArguments;
use crate::error::ProviderError;

pub const INVALID_ARGS_MESSAGE: &str = "Expected a single, non-array, object argument.";
pub const INVALID_METHOD_MESSAGE: &str = "'args.method' must be a non-empty string.";
pub const INVALID_PARAMS_MESSAGE: &str = "'args.params' must be an object or array if provided.";

/// Validates a single RPC call argument.
///
/// The argument must be an object, `method` a non-empty string and `params`,
/// when present, an array or object. An explicit `null` params is rejected.
pub fn validate_request_args(args: &Value) -> Result<RequestArguments, ProviderError> {
    let obj = match args {
        Value::Object(obj) => obj,
        _ => {
            return Err(ProviderError::invalid_request(
                INVALID_ARGS_MESSAGE,
                args.clone(),
            ))
        }
    };

    let method = match obj.get("method") {
        Some(Value::String(method)) if !method.is_empty() => method.clone(),
        _ => {
            return Err(ProviderError::invalid_request(
                INVALID_METHOD_MESSAGE,
                args.clone(),
            ))
        }
    };

    let params = match obj.get("params") {
        None => None,
        Some(params @ (Value::Array(_) | Value::Object(_))) => Some(params.clone()),
        Some(_) => {
            return Err(ProviderError::invalid_request(
                INVALID_PARAMS_MESSAGE,
                args.clone(),
            ))
        }
    };

    Ok(RequestArguments { method, params })
}
