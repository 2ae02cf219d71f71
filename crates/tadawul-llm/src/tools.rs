//! Tool definition types for LLM function calling

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition for LLM provider
///
/// This describes a function the LLM may propose to call, including its
/// name, description, and parameters in JSON Schema format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name, echoed back by the model in its tool calls
    pub name: String,

    /// Description of what the function does
    pub description: String,

    /// JSON schema for the function's parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Helper module to build JSON schemas for tools
pub mod schema {
    use serde_json::{Value, json};

    /// Create a JSON schema for an object with properties
    ///
    /// # Example
    ///
    /// ```
    /// use tadawul_llm::tools::schema;
    /// use serde_json::json;
    ///
    /// let schema = schema::object(
    ///     json!({
    ///         "companyName": schema::string("The name of the company to search for"),
    ///     }),
    ///     vec!["companyName"],
    /// );
    /// assert_eq!(schema["additionalProperties"], false);
    /// ```
    pub fn object(properties: Value, required: Vec<&str>) -> Value {
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// String property schema
    pub fn string(description: &str) -> Value {
        json!({
            "type": "string",
            "description": description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_definition_creation() {
        let schema = schema::object(
            json!({
                "tadawulID": schema::string("The tadawul id of the company"),
            }),
            vec!["tadawulID"],
        );

        let tool = ToolDefinition::new(
            "GetDetailedCompanyStockPrices",
            "Get detailed prices",
            schema.clone(),
        );
        assert_eq!(tool.name, "GetDetailedCompanyStockPrices");
        assert_eq!(tool.input_schema, schema);
        assert_eq!(tool.input_schema["required"][0], "tadawulID");
    }

    #[test]
    fn test_schema_builders() {
        let str_schema = schema::string("test");
        assert_eq!(str_schema["type"], "string");
        assert_eq!(str_schema["description"], "test");
    }
}
