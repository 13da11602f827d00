//! Current-weather lookup
//!
//! Placeholder: performs no I/O and always reports "sunny". A real lookup can
//! replace the body of `invoke` without touching dispatch.

use super::{Tool, ToolError};
use crate::llm::{ParameterSchema, PropertySchema};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    #[serde(default, alias = "Location")]
    location: String,
}

pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_current_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a location"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::object().property(
            "location",
            PropertySchema::string("The location to get the weather for, e.g. San Francisco, CA"),
            true,
        )
    }

    async fn invoke(&self, arguments: &Value) -> Result<String, ToolError> {
        let args: WeatherArgs = ToolError::decode(self.name(), arguments)?;
        tracing::debug!(location = %args.location, "Weather lookup");
        Ok("sunny".to_string())
    }
}
