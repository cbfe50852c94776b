use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

/// Operand of a filter leaf, as produced by a filter parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "literal", rename_all = "lowercase")]
pub enum Token {
    /// Field path, macro (`@now`) or bare literal (`null`, `true`, `false`).
    Identifier(String),
    Text(String),
    Number(NotNan<f64>),
}

impl Token {
    pub fn identifier(literal: impl Into<String>) -> Self {
        Token::Identifier(literal.into())
    }

    pub fn text(literal: impl Into<String>) -> Self {
        Token::Text(literal.into())
    }

    /// `None` for NaN.
    pub fn number(value: f64) -> Option<Self> {
        NotNan::new(value).ok().map(Token::Number)
    }

    pub fn literal(&self) -> String {
        match self {
            Token::Identifier(s) | Token::Text(s) => s.clone(),
            Token::Number(n) => n.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nan_is_not_a_number_token() {
        assert!(Token::number(f64::NAN).is_none());
        assert_eq!(Token::number(1.5).unwrap().literal(), "1.5");
    }

    #[test]
    fn deserializes_tagged_tokens() {
        let token: Token = serde_json::from_value(json!({ "type": "identifier", "literal": "title" })).unwrap();
        assert_eq!(token, Token::identifier("title"));

        let token: Token = serde_json::from_value(json!({ "type": "number", "literal": 3.0 })).unwrap();
        assert_eq!(token, Token::number(3.0).unwrap());
    }
}
