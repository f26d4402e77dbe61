pub mod session;
pub mod verifier;

pub use session::{Session, SessionRegistry};
pub use verifier::{CodeVerifier, DemoCodeVerifier};
