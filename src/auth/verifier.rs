/// Checks a one-time code a user received on their phone. Real deployments
/// plug in an SMS provider here.
pub trait CodeVerifier: Send + Sync {
    fn verify_code(&self, phone: &str, code: &str) -> bool;
}

/// Accepts one fixed code for every phone number. Demo only.
#[derive(Debug, Clone)]
pub struct DemoCodeVerifier {
    code: String,
}

impl DemoCodeVerifier {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl CodeVerifier for DemoCodeVerifier {
    fn verify_code(&self, _phone: &str, code: &str) -> bool {
        !self.code.is_empty() && code.trim() == self.code
    }
}

#[cfg(test)]
mod tests {
    use super::{CodeVerifier, DemoCodeVerifier};

    #[test]
    fn accepts_only_the_configured_code() {
        let verifier = DemoCodeVerifier::new("123456");
        assert!(verifier.verify_code("+1234567890", "123456"));
        assert!(verifier.verify_code("+1234567890", " 123456 "));
        assert!(!verifier.verify_code("+1234567890", "654321"));
        assert!(!verifier.verify_code("+1234567890", ""));
    }

    #[test]
    fn empty_configured_code_accepts_nothing() {
        let verifier = DemoCodeVerifier::new("");
        assert!(!verifier.verify_code("+1234567890", ""));
    }
}
