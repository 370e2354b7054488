use actix_web::{error::InternalError, post, web, HttpRequest, HttpResponse, ResponseError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    error::ServiceError,
    models::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcSuccess},
    services::RpcServices,
};

/// JSON-RPC 2.0 endpoint serving the `net_*` and `cmt_*` namespaces
#[post("/")]
async fn json_rpc(
    req: HttpRequest,
    services: web::Data<Arc<RpcServices>>,
    request: web::Json<JsonRpcRequest<Value>>,
) -> HttpResponse {
    let request = request.into_inner();
    debug!(
        method = %request.method,
        peer = ?req.peer_addr(),
        "Received JSON-RPC request"
    );

    // Validate JSON-RPC version
    if request.jsonrpc != "2.0" {
        return HttpResponse::BadRequest().json(JsonRpcError::invalid_request(
            request.id,
            "Invalid JSON-RPC version. Expected 2.0".to_string(),
        ));
    }

    match services.dispatch(&request.method, request.params).await {
        Ok(result) => HttpResponse::Ok().json(JsonRpcSuccess::new(request.id, result)),
        Err(e) => {
            error!(method = %request.method, error = %e, "RPC call failed");
            HttpResponse::build(e.status_code()).json(JsonRpcError::from_error(request.id, &e))
        }
    }
}

/// Service health check endpoint that verifies the consensus node answers
#[post("/api/v1/health")]
async fn health_check(
    services: web::Data<Arc<RpcServices>>,
) -> Result<HttpResponse, ServiceError> {
    info!("Health check requested");

    match services.cmt.status().await {
        Ok(status) => {
            let response = serde_json::json!({
                "status": "ok",
                "network": status.node_info.network,
                "latest_block": status.sync_info.latest_block_height,
                "catching_up": status.sync_info.catching_up,
            });
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            error!("Health check failed: {:?}", e);
            Err(ServiceError::RPCConnectionError(format!("consensus node unreachable: {}", e)))
        }
    }
}

/// Request bodies that are not a JSON-RPC request still get a JSON-RPC error
fn json_error_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!(error = %err, "Rejected malformed JSON-RPC request");
        let body = JsonRpcError::invalid_request(Value::Null, err.to_string());
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

/// Configure the API routes for the service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_error_config())
       .service(json_rpc)
       .service(health_check);
}
