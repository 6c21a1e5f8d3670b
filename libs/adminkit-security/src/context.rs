use uuid::Uuid;

/// `SecurityContext` carries the authenticated principal and its active
/// organization through one operation.
///
/// Produced by the authentication collaborator before the pipeline runs.
/// The data-access engine combines it with resolved privileges to scope every
/// read and write.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SecurityContext {
    /// The authenticated user or service.
    principal_id: Uuid,
    /// Principal type classification (e.g., "user", "service").
    principal_type: Option<String>,
    /// Organization the principal is currently acting in.
    active_org_id: Uuid,
}

impl SecurityContext {
    #[must_use]
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::default()
    }

    /// Create an anonymous `SecurityContext` with nil principal and organization.
    #[must_use]
    pub fn anonymous() -> Self {
        SecurityContextBuilder::default().build()
    }

    #[must_use]
    pub fn principal_id(&self) -> Uuid {
        self.principal_id
    }

    #[must_use]
    pub fn principal_type(&self) -> Option<&str> {
        self.principal_type.as_deref()
    }

    #[must_use]
    pub fn active_org_id(&self) -> Uuid {
        self.active_org_id
    }

    /// Returns `true` when no principal was authenticated.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.principal_id.is_nil()
    }
}

#[derive(Default)]
pub struct SecurityContextBuilder {
    principal_id: Option<Uuid>,
    principal_type: Option<String>,
    active_org_id: Option<Uuid>,
}

impl SecurityContextBuilder {
    #[must_use]
    pub fn principal_id(mut self, principal_id: Uuid) -> Self {
        self.principal_id = Some(principal_id);
        self
    }

    #[must_use]
    pub fn principal_type(mut self, principal_type: &str) -> Self {
        self.principal_type = Some(principal_type.to_owned());
        self
    }

    #[must_use]
    pub fn active_org_id(mut self, active_org_id: Uuid) -> Self {
        self.active_org_id = Some(active_org_id);
        self
    }

    #[must_use]
    pub fn build(self) -> SecurityContext {
        SecurityContext {
            principal_id: self.principal_id.unwrap_or_default(),
            principal_type: self.principal_type,
            active_org_id: self.active_org_id.unwrap_or_default(),
        }
    }
}
