//! Lenient typed access to a scene's free-form JSON parameters.
//!
//! Scenes read tunables such as cube counts or animation periods from the
//! `scene_params` object of the config file. A missing key or a value of the
//! wrong type falls back to the scene's default, so reading never fails.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON object of per-scene parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneParams(Value);

impl Default for SceneParams {
    fn default() -> Self {
        Self(Value::Object(Default::default()))
    }
}

impl From<Value> for SceneParams {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl SceneParams {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Integers are accepted and converted.
    pub fn f32(&self, name: &str, default: f32) -> f32 {
        self.0
            .get(name)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
            .unwrap_or(default)
    }

    /// Only non-negative integers that fit in `u32`.
    pub fn u32(&self, name: &str, default: u32) -> u32 {
        self.0
            .get(name)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default)
    }

    pub fn bool(&self, name: &str, default: bool) -> bool {
        self.0.get(name).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn string(&self, name: &str, default: &str) -> String {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| default.to_owned())
    }

    /// A three-element numeric array.
    pub fn vec3(&self, name: &str, default: Vec3) -> Vec3 {
        let Some(items) = self.0.get(name).and_then(Value::as_array) else {
            return default;
        };
        let floats: Vec<f32> = items
            .iter()
            .filter_map(Value::as_f64)
            .map(|v| v as f32)
            .collect();
        match floats.as_slice() {
            &[x, y, z] if items.len() == 3 => Vec3::new(x, y, z),
            _ => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn f32_accepts_integers() {
        let p = SceneParams::from(json!({"period": 1}));
        assert_eq!(p.f32("period", 0.05), 1.0);
    }

    #[test]
    fn f32_falls_back_on_missing_or_wrong_type() {
        let p = SceneParams::from(json!({"period": "slow"}));
        assert_eq!(p.f32("period", 0.05), 0.05);
        assert_eq!(p.f32("other", 2.5), 2.5);
    }

    #[test]
    fn u32_rejects_negative_float_and_huge() {
        let p = SceneParams::from(json!({"a": -1, "b": 1.5, "c": 5_000_000_000u64, "d": 10}));
        assert_eq!(p.u32("a", 7), 7);
        assert_eq!(p.u32("b", 7), 7);
        assert_eq!(p.u32("c", 7), 7);
        assert_eq!(p.u32("d", 7), 10);
    }

    #[test]
    fn bool_and_string() {
        let p = SceneParams::from(json!({"outline": false, "name": ""}));
        assert!(!p.bool("outline", true));
        assert!(p.bool("missing", true));
        assert_eq!(p.string("name", "x"), "");
        assert_eq!(p.string("missing", "x"), "x");
    }

    #[test]
    fn vec3_needs_exactly_three_numbers() {
        let p = SceneParams::from(json!({
            "ok": [1, 2.5, -3],
            "short": [1, 2],
            "mixed": [1, "2", 3],
        }));
        assert_eq!(p.vec3("ok", Vec3::ZERO), Vec3::new(1.0, 2.5, -3.0));
        assert_eq!(p.vec3("short", Vec3::ONE), Vec3::ONE);
        assert_eq!(p.vec3("mixed", Vec3::ONE), Vec3::ONE);
    }

    #[test]
    fn non_object_params_use_defaults() {
        let p = SceneParams::from(json!([1, 2, 3]));
        assert_eq!(p.u32("count", 10), 10);
    }
}
