// Lenient field decoders: generation-1 rows carry ids and flags as strings or 0/1.
use serde::{Deserialize, Deserializer, de::Error};
use serde_json::Value;

pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("id {} is not an integer", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("id {:?} is not an integer", s))),
        other => Err(D::Error::custom(format!("expected an id, found {}", other))),
    }
}

pub fn lenient_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::Number(n) => Ok(n.as_i64()),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("{:?} is not an integer", s))),
        other => Err(D::Error::custom(format!("expected an integer, found {}", other))),
    }
}

pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "lenient_i64")]
        id: i64,
        #[serde(default, deserialize_with = "lenient_bool")]
        flag: bool,
        #[serde(default, deserialize_with = "lenient_string")]
        text: String,
    }

    #[test]
    fn accepts_numeric_strings_and_flags() {
        let row: Row = serde_json::from_str(r#"{"id": "12", "flag": 1, "text": 3}"#).unwrap();
        assert_eq!(row.id, 12);
        assert!(row.flag);
        assert_eq!(row.text, "3");

        let row: Row = serde_json::from_str(r#"{"id": 5, "flag": "false", "text": null}"#).unwrap();
        assert_eq!(row.id, 5);
        assert!(!row.flag);
        assert!(row.text.is_empty());
    }

    #[test]
    fn rejects_non_numeric_id() {
        assert!(serde_json::from_str::<Row>(r#"{"id": "abc"}"#).is_err());
    }
}
