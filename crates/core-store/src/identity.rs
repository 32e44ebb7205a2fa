/// Opaque handle of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    user_id: String,
}

impl Identity {
    /// `None` for a blank id: no handle means no operations.
    pub fn new(user_id: impl Into<String>) -> Option<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            None
        } else {
            Some(Self { user_id })
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Supplies the current identity, asked once per operation.
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<Identity>;
}

/// Fixed identity (or fixed absence of one).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<Identity>);

impl StaticIdentity {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self(Identity::new(user_id))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Option<Identity> {
        self.0.clone()
    }
}
