//! Lenient serde helpers for model-produced JSON.
//!
//! Models routinely send `"10"` where an integer is declared and `36.06` where a
//! string is declared. These helpers accept both shapes.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

/// Optional string that may arrive as a number. Empty strings become `None`.
pub fn opt_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(d)?
        .map(Scalar::into_string)
        .filter(|s| !s.trim().is_empty()))
}

/// Optional positive integer that may arrive as a string; unparsable values become `None`.
pub fn opt_u32<'de, D>(d: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(d)?.and_then(|v| match v {
        Scalar::Int(i) => u32::try_from(i).ok(),
        Scalar::Float(f) if f >= 0.0 && f.fract() == 0.0 => Some(f as u32),
        Scalar::Str(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// Boolean that may arrive as `"true"` / `"false"`.
pub fn lenient_bool<'de, D>(d: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(d)? {
        Some(Scalar::Bool(b)) => b,
        Some(Scalar::Str(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(Scalar::Int(i)) => i != 0,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize, Default)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_string")]
        s: Option<String>,
        #[serde(default, deserialize_with = "opt_u32")]
        n: Option<u32>,
        #[serde(default, deserialize_with = "lenient_bool")]
        b: bool,
    }

    #[test]
    fn numbers_and_strings_are_interchangeable() {
        let p: Probe = serde_json::from_value(json!({"s": 36.06, "n": "10", "b": "true"})).unwrap();
        assert_eq!(p.s.as_deref(), Some("36.06"));
        assert_eq!(p.n, Some(10));
        assert!(p.b);

        let p: Probe = serde_json::from_value(json!({"s": "", "n": -1, "b": null})).unwrap();
        assert_eq!(p.s, None);
        assert_eq!(p.n, None);
        assert!(!p.b);
    }
}
