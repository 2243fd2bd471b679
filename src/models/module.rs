use serde::{Deserialize, Serialize};
use serde_json::Value;
use super::{de, Keyed};

/// A runnable program deployable to one or more PCEs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Module {
    #[serde(alias = "id", deserialize_with = "de::lenient_i64")]
    pub module_id: i64,
    #[serde(default, alias = "name", deserialize_with = "de::lenient_string")]
    pub module_name: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub version: String,
    #[serde(default, alias = "src_location_path", deserialize_with = "de::lenient_string")]
    pub src_location: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub src_location_type: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub install_location: String,
    #[serde(default = "visible", deserialize_with = "de::lenient_bool")]
    pub is_visible: bool,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub state_str: String,
}

fn visible() -> bool {
    true
}

impl Module {
    /// Internal slug: the last segment of the source path, or the name when there is no path.
    pub fn slug(&self) -> &str {
        let path = self.src_location.trim_end_matches('/');
        match path.rsplit('/').next() {
            Some(last) if !last.is_empty() => last,
            _ => &self.module_name,
        }
    }
}

impl Keyed for Module {
    fn key(&self) -> i64 {
        self.module_id
    }
}

/// Runtime parameters of a module on one PCE, grouped by family.
///
/// Families keep the order the server sent them in; `onramp` holds the
/// parameters common to every module.
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct ParamSchema {
    pub families: Vec<(String, Vec<String>)>,
}

pub const COMMON_FAMILY: &str = "onramp";

impl ParamSchema {
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("expected an object of parameter lists, found {}", value))?;
        let mut families = Vec::with_capacity(object.len());
        for (family, params) in object {
            let params = params
                .as_array()
                .ok_or_else(|| format!("parameters of {} are not a list", family))?
                .iter()
                .map(|p| match p {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            families.push((family.clone(), params));
        }
        Ok(Self { families })
    }

    pub fn params(&self, family: &str) -> Option<&[String]> {
        self.families
            .iter()
            .find(|(name, _)| name == family)
            .map(|(_, params)| params.as_slice())
    }

    /// Families other than the common one.
    pub fn module_families(&self) -> impl Iterator<Item = &str> {
        self.families
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| *name != COMMON_FAMILY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, path: &str) -> Module {
        serde_json::from_value(serde_json::json!({
            "module_id": 3, "module_name": name, "src_location": path
        }))
        .unwrap()
    }

    #[test]
    fn slug_is_last_path_segment() {
        assert_eq!(module("Ring", "/opt/onramp/modules/mpi-ring").slug(), "mpi-ring");
        assert_eq!(module("Ring", "/opt/onramp/modules/mpi-ring/").slug(), "mpi-ring");
        assert_eq!(module("template", "template").slug(), "template");
    }

    #[test]
    fn slug_falls_back_to_name() {
        assert_eq!(module("AUC", "").slug(), "AUC");
    }

    #[test]
    fn schema_keeps_family_order() {
        let schema = ParamSchema::from_value(&serde_json::json!({
            "onramp": ["nodes", "np"],
            "ring": ["iters", "work"]
        }))
        .unwrap();
        assert_eq!(schema.params("onramp").unwrap(), ["nodes", "np"]);
        assert_eq!(schema.module_families().collect::<Vec<_>>(), ["ring"]);
        assert!(schema.params("hello").is_none());
    }

    #[test]
    fn schema_rejects_non_list_family() {
        assert!(ParamSchema::from_value(&serde_json::json!({"onramp": "nodes"})).is_err());
    }
}
