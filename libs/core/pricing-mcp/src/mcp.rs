//! MCP (Model Context Protocol) handler
//!
//! Implements a JSON-RPC style MCP server over the pricing tools.

use domain_pricing::{PriceListFetcher, PricingService};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::codes;
use crate::tools::{self, Tool};

// ============================================================================
// MCP Protocol Types
// ============================================================================

/// MCP request structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// MCP response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

/// MCP error structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self::error_with_data(id, code, message, None)
    }

    pub fn error_with_data(
        id: Option<Value>,
        code: i32,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
                data,
            }),
        }
    }
}

// ============================================================================
// MCP Handler
// ============================================================================

/// MCP request handler
pub struct McpHandler {
    tools: Vec<Box<dyn Tool>>,
    server_info: ServerInfo,
}

#[derive(Clone, Serialize)]
struct ServerInfo {
    name: String,
    version: String,
}

impl McpHandler {
    /// Create a new MCP handler exposing every pricing tool
    pub fn new<F: PriceListFetcher + 'static>(service: PricingService<F>) -> Self {
        Self {
            tools: tools::all(&service),
            server_info: ServerInfo {
                name: "aws-pricing-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.iter().map(|tool| tool.name())
    }

    /// Handle an MCP request
    pub async fn handle(&self, request: McpRequest) -> McpResponse {
        debug!(method = %request.method, "Handling MCP request");

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_list_tools(request.id),
            "tools/call" => self.handle_call_tool(request.id, request.params).await,
            _ => McpResponse::error(request.id, codes::METHOD_NOT_FOUND, "Method not found"),
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<Value>) -> McpResponse {
        McpResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": self.server_info,
                "capabilities": {
                    "tools": {}
                }
            }),
        )
    }

    /// Handle tools/list request
    fn handle_list_tools(&self, id: Option<Value>) -> McpResponse {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema()
                })
            })
            .collect();

        McpResponse::success(id, json!({ "tools": tools }))
    }

    /// Handle tools/call request
    async fn handle_call_tool(&self, id: Option<Value>, params: Value) -> McpResponse {
        let tool_name = match params.get("name").and_then(|v| v.as_str()) {
            Some(name) => name,
            None => return McpResponse::error(id, codes::INVALID_PARAMS, "Missing tool name"),
        };

        let tool = match self.tools.iter().find(|tool| tool.name() == tool_name) {
            Some(tool) => tool,
            None => {
                return McpResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    format!("Unknown tool: {tool_name}"),
                );
            }
        };

        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        match tool.execute(arguments).await {
            Ok(result) => {
                let text = match serde_json::to_string_pretty(&result) {
                    Ok(text) => text,
                    Err(e) => {
                        return McpResponse::error(id, codes::TOOL_ERROR, e.to_string());
                    }
                };
                McpResponse::success(
                    id,
                    json!({
                        "content": [{
                            "type": "text",
                            "text": text
                        }]
                    }),
                )
            }
            Err(e) => {
                warn!(tool = tool_name, error = %e, "Tool call failed");
                McpResponse::error_with_data(id, e.code(), e.to_string(), e.data())
            }
        }
    }

    /// Parse and handle a JSON request string
    pub async fn handle_json(&self, json: &str) -> String {
        let response = match serde_json::from_str::<McpRequest>(json) {
            Ok(request) => self.handle(request).await,
            Err(e) => McpResponse::error(None, codes::PARSE_ERROR, format!("Parse error: {e}")),
        };

        serde_json::to_string(&response).unwrap_or_default()
    }
}
