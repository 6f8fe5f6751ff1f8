//! Thin JSON-RPC 2.0 envelope around [`MeRpc`] (§6). Binding this to an
//! actual HTTP/IPC listener is out of scope (§1) — `dispatch` takes an
//! already-parsed request and returns an already-built response value,
//! the way a caller would wire it into whatever transport they have.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{code_for, RpcError};
use crate::service::MeRpc;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcResponseError>,
}

#[derive(Debug, Serialize)]
pub struct RpcResponseError {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        RpcResponse { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    fn err(id: Value, err: &RpcError) -> Self {
        use meshid_types::Classify;
        RpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcResponseError { code: code_for(err.kind()).0, message: err.to_string() }),
        }
    }
}

/// Pulls a single string param out of either a positional array or a
/// named-object params value; the §6 surface never takes more than two
/// scalar arguments, so this is the only shape a caller needs.
fn param_str(params: &Value, index: usize, name: &str) -> std::result::Result<String, RpcError> {
    let value = match params {
        Value::Array(items) => items.get(index),
        Value::Object(map) => map.get(name),
        _ => None,
    };
    value
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RpcError::InvalidParams(format!("missing param `{name}`")))
}

fn param_bytes(params: &Value, index: usize, name: &str) -> std::result::Result<Vec<u8>, RpcError> {
    Ok(param_str(params, index, name)?.into_bytes())
}

/// Routes a parsed request to the matching [`MeRpc`] method and wraps the
/// outcome back into a JSON-RPC response. Never returns `Err`: per the
/// JSON-RPC 2.0 spec, a failed call is still a well-formed response with
/// an `error` member, not a transport-level failure.
pub async fn dispatch<R: MeRpc + Send + Sync>(rpc: &R, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    match handle(rpc, &request).await {
        Ok(value) => RpcResponse::ok(id, value),
        Err(e) => RpcResponse::err(id, &e),
    }
}

async fn handle<R: MeRpc + Send + Sync>(rpc: &R, request: &RpcRequest) -> std::result::Result<Value, RpcError> {
    let params = &request.params;
    let value = match request.method.as_str() {
        "get" => serde_json::to_value(rpc.get().await?),
        "getRawMe" => serde_json::to_value(rpc.get_raw_me().await?),
        "getTotalWeight" => serde_json::to_value(rpc.get_total_weight().await?),
        "getMyNodes" => serde_json::to_value(rpc.get_my_nodes().await?),
        "showMeURL" => serde_json::to_value(rpc.show_me_url().await?),
        "joinMe" => {
            let hash = param_str(params, 0, "joinKeyHash")?;
            let name = param_bytes(params, 1, "creatorName").unwrap_or_default();
            serde_json::to_value(rpc.join_me(hash, name).await?)
        }
        "showMyKey" => serde_json::to_value(rpc.show_my_key().await?),
        "setMyName" => serde_json::to_value(rpc.set_my_name(param_bytes(params, 0, "name")?).await?),
        "setMyImage" => serde_json::to_value(rpc.set_my_image(param_bytes(params, 0, "img")?).await?),
        "revoke" => serde_json::to_value(rpc.revoke().await?),
        "getRaftStatus" => serde_json::to_value(rpc.get_raft_status().await?),
        "forceRemoveNode" => {
            serde_json::to_value(rpc.force_remove_node(param_str(params, 0, "nodeId")?).await?)
        }
        "getJoinKeyInfos" => serde_json::to_value(rpc.get_join_key_infos().await?),
        "getOpKeyInfos" => serde_json::to_value(rpc.get_op_key_infos().await?),
        "getFriendRequests" => serde_json::to_value(rpc.get_friend_requests().await?),
        "getMeRequests" => serde_json::to_value(rpc.get_me_requests().await?),
        "countPeers" => serde_json::to_value(rpc.count_peers().await?),
        "getPeers" => serde_json::to_value(rpc.get_peers().await?),
        other => return Err(RpcError::UnknownMethod(other.to_string())),
    };
    value.map_err(|e| RpcError::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_str_reads_positional_and_named() {
        let arr = serde_json::json!(["abc"]);
        assert_eq!(param_str(&arr, 0, "x").unwrap(), "abc");

        let obj = serde_json::json!({"x": "abc"});
        assert_eq!(param_str(&obj, 0, "x").unwrap(), "abc");
    }

    #[test]
    fn param_str_rejects_missing() {
        let arr = serde_json::json!([]);
        assert!(param_str(&arr, 0, "x").is_err());
    }

    #[test]
    fn response_error_skips_result_field() {
        let resp = RpcResponse::err(Value::Null, &RpcError::UnknownMethod("nope".into()));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_some());
    }
}
