use serde_json::Value;

/// Field names the backend has used for the remaining-credit balance, in
/// order of preference
pub const CREDIT_FIELDS: [&str; 4] = ["remainingTokens", "tokenCredits", "credits", "tokensRemaining"];

/// Out-of-band data that accompanies an assistant reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyMetadata {
    pub intent: Option<String>,
    pub token_credits: Option<u64>,
}

impl ReplyMetadata {
    /// Read `intent` and the credit balance from a JSON object
    pub fn from_value(value: &Value) -> Self {
        let intent = value
            .get("intent")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            intent,
            token_credits: extract_credits(value),
        }
    }

    /// Fold later metadata into this one; values present in `other` win
    pub fn merge(&mut self, other: ReplyMetadata) {
        if other.intent.is_some() {
            self.intent = other.intent;
        }
        if other.token_credits.is_some() {
            self.token_credits = other.token_credits;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intent.is_none() && self.token_credits.is_none()
    }
}

/// Pick the credit balance out of a payload.
///
/// The first field of [`CREDIT_FIELDS`] that is present and not `null` is
/// authoritative, even if a later one would parse. Numbers and numeric
/// strings are accepted; anything else yields `None`.
pub fn extract_credits(value: &Value) -> Option<u64> {
    let field = CREDIT_FIELDS
        .iter()
        .find_map(|name| value.get(*name).filter(|v| !v.is_null()))?;

    match field {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_credits_each_field_name() {
        for name in CREDIT_FIELDS {
            let mut payload = serde_json::Map::new();
            payload.insert(name.to_string(), json!(42));
            let payload = Value::Object(payload);
            assert_eq!(extract_credits(&payload), Some(42), "field {}", name);
        }
    }

    #[test]
    fn test_extract_credits_prefers_first_present() {
        let payload = json!({"tokensRemaining": 1, "credits": 2, "tokenCredits": 3});
        assert_eq!(extract_credits(&payload), Some(3));

        let payload = json!({"remainingTokens": null, "credits": 7});
        assert_eq!(extract_credits(&payload), Some(7));
    }

    #[test]
    fn test_extract_credits_coercion() {
        assert_eq!(extract_credits(&json!({"credits": "15"})), Some(15));
        assert_eq!(extract_credits(&json!({"credits": 9.0})), Some(9));
        assert_eq!(extract_credits(&json!({"credits": -3})), None);
        assert_eq!(extract_credits(&json!({"credits": "lots"})), None);
        assert_eq!(extract_credits(&json!({"other": 1})), None);
    }

    #[test]
    fn test_metadata_merge() {
        let mut metadata = ReplyMetadata::from_value(&json!({"intent": "general_inquiry"}));
        metadata.merge(ReplyMetadata::from_value(&json!({"tokenCredits": 988})));
        metadata.merge(ReplyMetadata::default());

        assert_eq!(metadata.intent.as_deref(), Some("general_inquiry"));
        assert_eq!(metadata.token_credits, Some(988));
    }
}
