use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::verifier::CodeVerifier;
use crate::error::AppError;
use crate::models::identity::{Identity, Role};
use crate::storage::{load_all, put_json, Storage, SESSIONS_PREFIX};

const MIN_PHONE_DIGITS: usize = 10;

/// Holds at most one logged-in identity.
#[derive(Debug, Clone, Default)]
pub struct Session {
    identity: Option<Identity>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Verifies `code` for `phone` and, on success, replaces any held
    /// identity with a fresh one for `role`.
    pub fn authenticate(
        &mut self,
        verifier: &dyn CodeVerifier,
        phone: &str,
        code: &str,
        role: Role,
    ) -> Result<&Identity, AppError> {
        let phone = phone.trim();
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if digits < MIN_PHONE_DIGITS {
            return Err(AppError::BadRequest(
                "please enter a valid phone number".to_string(),
            ));
        }

        if !verifier.verify_code(phone, code) {
            return Err(AppError::Unauthorized(
                "invalid verification code".to_string(),
            ));
        }

        let identity = self.identity.insert(Identity {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            name: display_name(role).to_string(),
            role,
        });
        Ok(identity)
    }

    pub fn deauthenticate(&mut self) -> Option<Identity> {
        self.identity.take()
    }
}

fn display_name(role: Role) -> &'static str {
    match role {
        Role::Customer => "John Doe",
        Role::Partner => "Partner Smith",
    }
}

fn session_key(token: Uuid) -> String {
    format!("{SESSIONS_PREFIX}{token}")
}

/// Live sessions by bearer token, written through to storage.
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Session>,
    storage: Arc<dyn Storage>,
}

impl SessionRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            sessions: DashMap::new(),
            storage,
        }
    }

    pub fn load(storage: Arc<dyn Storage>) -> Result<Self, AppError> {
        let registry = Self::new(storage);
        let stored: Vec<(String, Identity)> =
            load_all(registry.storage.as_ref(), SESSIONS_PREFIX)?;

        for (key, identity) in stored {
            let token = key
                .strip_prefix(SESSIONS_PREFIX)
                .and_then(|raw| Uuid::parse_str(raw).ok());
            match token {
                Some(token) => {
                    registry.sessions.insert(
                        token,
                        Session {
                            identity: Some(identity),
                        },
                    );
                }
                None => warn!(key = %key, "skipping session with malformed token"),
            }
        }

        info!(sessions = registry.len(), "sessions loaded");
        Ok(registry)
    }

    /// Opens a new session and returns its token with the identity it holds.
    pub fn login(
        &self,
        verifier: &dyn CodeVerifier,
        phone: &str,
        code: &str,
        role: Role,
    ) -> Result<(Uuid, Identity), AppError> {
        let mut session = Session::new();
        let identity = session.authenticate(verifier, phone, code, role)?.clone();

        let token = Uuid::new_v4();
        put_json(self.storage.as_ref(), &session_key(token), &identity)?;
        self.sessions.insert(token, session);

        info!(user_id = %identity.id, role = %identity.role, "user logged in");
        Ok((token, identity))
    }

    pub fn resolve(&self, token: Uuid) -> Result<Identity, AppError> {
        self.sessions
            .get(&token)
            .and_then(|session| session.identity().cloned())
            .ok_or_else(|| AppError::Unauthorized("session expired or unknown".to_string()))
    }

    pub fn logout(&self, token: Uuid) -> Result<(), AppError> {
        let Some((_, mut session)) = self.sessions.remove(&token) else {
            return Err(AppError::Unauthorized(
                "session expired or unknown".to_string(),
            ));
        };

        self.storage.delete(&session_key(token))?;
        if let Some(identity) = session.deauthenticate() {
            info!(user_id = %identity.id, "user logged out");
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Session, SessionRegistry};
    use crate::auth::verifier::DemoCodeVerifier;
    use crate::error::AppError;
    use crate::models::identity::Role;
    use crate::storage::{MemoryStorage, Storage};

    fn verifier() -> DemoCodeVerifier {
        DemoCodeVerifier::new("123456")
    }

    #[test]
    fn authenticate_fabricates_identity_for_role() {
        let mut session = Session::new();
        let identity = session
            .authenticate(&verifier(), "+1234567890", "123456", Role::Partner)
            .unwrap();

        assert_eq!(identity.role, Role::Partner);
        assert_eq!(identity.name, "Partner Smith");
        assert_eq!(identity.phone, "+1234567890");
    }

    #[test]
    fn wrong_code_leaves_session_empty() {
        let mut session = Session::new();
        let err = session
            .authenticate(&verifier(), "+1234567890", "000000", Role::Customer)
            .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(session.identity().is_none());
    }

    #[test]
    fn short_phone_is_a_validation_error() {
        let mut session = Session::new();
        let err = session
            .authenticate(&verifier(), "12345", "123456", Role::Customer)
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn second_login_replaces_the_held_identity() {
        let mut session = Session::new();
        let first = session
            .authenticate(&verifier(), "+1234567890", "123456", Role::Customer)
            .unwrap()
            .id;
        let second = session
            .authenticate(&verifier(), "+1987654321", "123456", Role::Partner)
            .unwrap()
            .id;

        assert_ne!(first, second);
        assert_eq!(session.identity().map(|i| i.role), Some(Role::Partner));

        session.deauthenticate();
        assert!(session.identity().is_none());
    }

    #[test]
    fn registry_sessions_survive_reload_until_logout() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let registry = SessionRegistry::new(storage.clone());

        let (token, identity) = registry
            .login(&verifier(), "+1234567890", "123456", Role::Customer)
            .unwrap();
        assert_eq!(registry.resolve(token).unwrap(), identity);

        let reloaded = SessionRegistry::load(storage.clone()).unwrap();
        assert_eq!(reloaded.resolve(token).unwrap(), identity);

        reloaded.logout(token).unwrap();
        assert!(reloaded.resolve(token).is_err());
        assert!(SessionRegistry::load(storage).unwrap().is_empty());
    }
}
