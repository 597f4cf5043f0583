use serde::{Deserialize, Serialize};

/// Request body for a consultation.
#[derive(Debug, Deserialize)]
pub struct ConsultaRequest {
    pub prompt: Option<String>,
}

/// Response carrying the completion text.
#[derive(Debug, Serialize)]
pub struct ConsultaResponse {
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consulta_response_serialization() {
        let response = ConsultaResponse {
            response: "hola".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"response":"hola"}"#);
    }

    #[test]
    fn consulta_request_tolerates_missing_prompt() {
        let parsed: ConsultaRequest = serde_json::from_str("{}").unwrap();
        assert!(parsed.prompt.is_none());
    }
}
