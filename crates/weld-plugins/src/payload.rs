use serde::de::DeserializeOwned;
use weld_model::Step;
use weld_plugin::PluginError;

/// Decode a step's flattened payload into a kind-specific struct, mapping
/// a serde failure into the plugin contract's `InvalidPayload` error so
/// every plugin reports malformed payloads the same way.
pub fn decode<T: DeserializeOwned>(step: &Step) -> Result<T, PluginError> {
    serde_json::from_value(step.payload.clone()).map_err(|e| PluginError::InvalidPayload {
        step_id: step.id.clone(),
        kind: step.kind,
        message: e.to_string(),
    })
}
