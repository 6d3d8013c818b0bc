use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "engine": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "bucket": { "type": "string", "minLength": 3 },
                    "linux_payload": { "type": "string", "minLength": 1 },
                    "windows_payload": { "type": "string", "minLength": 1 },
                    "patch_name": { "type": "string", "maxLength": 63 },
                    "patch_description": { "type": "string" },
                    "persistence": { "type": "boolean" },
                    "project": { "type": "string" }
                }
            },
            "output": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "report": { "type": "string" }
                }
            }
        }
    })
});
