//! Mapping from internal error text to user-facing messages.
//!
//! Internal errors (provider bodies, SQL errors, upstream stack traces) are
//! never shown to API clients. Callers log the full chain and return the
//! message of the class the error falls into.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ConnectionRefused,
    ConnectionTimeout,
    HostNotFound,
    ConnectionReset,
    Database,
    LlmQuota,
    LlmRateLimit,
    LlmApiKey,
    Llm,
    InsufficientFunds,
    Payment,
    Validation,
    InvalidUrl,
    Workflow,
    Timeout,
    Other,
}

impl ErrorClass {
    /// Classify an error by the text of its full chain.
    ///
    /// Order matters: specific signals (quota, funds) are checked before the
    /// generic ones that would also match them.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();

        if msg.contains("econnrefused") || msg.contains("connection refused") {
            ErrorClass::ConnectionRefused
        } else if msg.contains("etimedout") || msg.contains("connect timeout") {
            ErrorClass::ConnectionTimeout
        } else if msg.contains("enotfound")
            || msg.contains("dns error")
            || msg.contains("failed to lookup address")
        {
            ErrorClass::HostNotFound
        } else if msg.contains("econnreset") || msg.contains("connection reset") {
            ErrorClass::ConnectionReset
        } else if msg.contains("insufficient_quota") || msg.contains("quota exceeded") {
            ErrorClass::LlmQuota
        } else if msg.contains("rate_limit_exceeded") || msg.contains("rate limited") {
            ErrorClass::LlmRateLimit
        } else if msg.contains("invalid api key")
            || msg.contains("invalid_api_key")
            || msg.contains("incorrect api key")
        {
            ErrorClass::LlmApiKey
        } else if msg.contains("insufficient funds") || msg.contains("insufficient_funds") {
            ErrorClass::InsufficientFunds
        } else if msg.contains("database error")
            || msg.contains("sqlite")
            || msg.contains("store error")
        {
            ErrorClass::Database
        } else if msg.contains("openai") || msg.contains("llm error") {
            ErrorClass::Llm
        } else if msg.contains("payment") || msg.contains("facilitator") {
            ErrorClass::Payment
        } else if msg.contains("invalid url") {
            ErrorClass::InvalidUrl
        } else if msg.contains("validation") {
            ErrorClass::Validation
        } else if msg.contains("timed out") || msg.contains("timeout") {
            ErrorClass::Timeout
        } else if msg.contains("workflow") || msg.contains("stage ") {
            ErrorClass::Workflow
        } else {
            ErrorClass::Other
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            ErrorClass::ConnectionRefused => "Service temporarily unavailable. Please try again.",
            ErrorClass::ConnectionTimeout => "Request timed out. Please try again.",
            ErrorClass::HostNotFound => "Unable to connect to service. Please try again.",
            ErrorClass::ConnectionReset => "Connection interrupted. Please try again.",
            ErrorClass::Database => "Database error occurred. Please try again.",
            ErrorClass::LlmQuota => "AI service quota exceeded. Please contact support.",
            ErrorClass::LlmRateLimit => "Too many requests. Please try again in a moment.",
            ErrorClass::LlmApiKey => "Service configuration error. Please contact support.",
            ErrorClass::Llm => "AI service error. Please try again.",
            ErrorClass::InsufficientFunds => "Insufficient funds. Please add USDC to your wallet.",
            ErrorClass::Payment => "Payment processing error. Please try again.",
            ErrorClass::Validation => "Invalid input provided.",
            ErrorClass::InvalidUrl => "Invalid URL provided.",
            ErrorClass::Workflow => "Analysis workflow error. Please try again.",
            ErrorClass::Timeout => "Request timed out. Please try again.",
            ErrorClass::Other => "An error occurred. Please try again.",
        }
    }
}

/// Public message for an arbitrary error, using its `{:#}` chain.
pub fn sanitize(err: &anyhow::Error) -> &'static str {
    ErrorClass::classify(&format!("{err:#}")).public_message()
}

/// Same as [`sanitize`] for plain message text.
pub fn sanitize_message(message: &str) -> &'static str {
    ErrorClass::classify(message).public_message()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_network_errors() {
        assert_eq!(
            ErrorClass::classify("error sending request: Connection refused (os error 111)"),
            ErrorClass::ConnectionRefused
        );
        assert_eq!(
            ErrorClass::classify("dns error: failed to lookup address information"),
            ErrorClass::HostNotFound
        );
        assert_eq!(
            ErrorClass::classify("connection reset by peer"),
            ErrorClass::ConnectionReset
        );
    }

    #[test]
    fn quota_wins_over_generic_llm() {
        let msg = "OpenAI API error (429): {\"error\":{\"code\":\"insufficient_quota\"}}";
        assert_eq!(ErrorClass::classify(msg), ErrorClass::LlmQuota);
        assert_eq!(
            sanitize_message(msg),
            "AI service quota exceeded. Please contact support."
        );
        assert_eq!(
            ErrorClass::classify("OpenAI API error (500): boom"),
            ErrorClass::Llm
        );
    }

    #[test]
    fn funds_wins_over_generic_payment() {
        assert_eq!(
            ErrorClass::classify("payment verification failed: insufficient_funds"),
            ErrorClass::InsufficientFunds
        );
        assert_eq!(
            ErrorClass::classify("facilitator returned 500"),
            ErrorClass::Payment
        );
    }

    #[test]
    fn database_errors_hide_sql() {
        let err = anyhow::anyhow!("Database error: no such table: reports")
            .context("failed to checkpoint run seo_1_abcdefghi");
        assert_eq!(sanitize(&err), "Database error occurred. Please try again.");
    }

    #[test]
    fn unknown_errors_get_generic_message() {
        assert_eq!(
            sanitize_message("something odd happened"),
            "An error occurred. Please try again."
        );
    }
}
