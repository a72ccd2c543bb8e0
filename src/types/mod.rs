//! Interface between the transport and resource models.
//!
//! The client treats request and response bodies as opaque JSON maps; models
//! such as pets or orders convert themselves through [`WireFormat`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A resource model that can be sent to and read from the API.
pub trait WireFormat: Sized {
    /// Serialize into the JSON object sent as a request body.
    fn to_wire_format(&self) -> Map<String, Value>;

    /// Build from a response body, or `None` if the data does not describe
    /// this resource.
    fn from_wire(data: &Value) -> Option<Self>;
}

/// Serialize any serde model into a wire map.
///
/// Values that do not serialize to a JSON object yield an empty map.
pub fn to_wire_map<T: Serialize>(model: &T) -> Map<String, Value> {
    match serde_json::to_value(model) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => Map::new(),
    }
}

/// Deserialize a wire value into any serde model.
pub fn from_wire_value<T: DeserializeOwned>(data: &Value) -> Option<T> {
    T::deserialize(data).ok()
}
