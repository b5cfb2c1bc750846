//! Multi-tenancy strategy.
//!
//! A single physical index may hold documents from several logical tenants.
//! The discriminator strategy tags every document with a tenant field at
//! index time and filters on that field at query time. In single-tenant mode
//! both operations are no-ops.
//!
//! Tenant ids are validated before any write or query that depends on tenant
//! scoping; a missing or malformed id is a configuration error, never a
//! silent "no tenant" scope.

use std::collections::BTreeSet;

use tantivy::{
    TantivyDocument, Term,
    query::{BooleanQuery, Occur, Query, TermQuery},
    schema::IndexRecordOption,
};

use crate::{EventContext, IndexError, fields::MetadataFields};

/// Separator joining tenant id and entity id into a unique key.
///
/// Tenant ids containing this character are rejected by validation, which
/// keeps the joined encoding injective.
pub const UNIQUE_KEY_SEPARATOR: char = '\u{1f}';

/// How tenant isolation is enforced for one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenancyMode {
    /// One logical tenant per physical index; no tenant field, no filtering.
    Single,
    /// Discriminator strategy: shared index, tenant field plus query filter.
    Discriminator,
}

/// Tenant isolation operations for one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiTenancy {
    /// Active strategy.
    mode: TenancyMode,
}

impl MultiTenancy {
    /// Creates a strategy for the given mode.
    pub fn new(mode: TenancyMode) -> Self {
        Self { mode }
    }

    /// Returns the active mode.
    pub fn mode(&self) -> TenancyMode {
        self.mode
    }

    /// Whether tenant isolation is active.
    pub fn enabled(&self) -> bool {
        self.mode == TenancyMode::Discriminator
    }

    /// Validates a tenant id against the active mode.
    ///
    /// Must run before any index mutation or query execution that depends on
    /// tenant scoping. Fails when multi-tenancy is enabled and the id is
    /// missing, empty, or contains the unique-key separator; also fails when
    /// an id is supplied in single-tenant mode.
    pub fn check_tenant_id(
        &self,
        tenant_id: Option<&str>,
        context: &EventContext,
    ) -> Result<(), IndexError> {
        match (self.mode, tenant_id) {
            (TenancyMode::Single, None) => Ok(()),
            (TenancyMode::Single, Some(tenant)) => Err(IndexError::config(
                context,
                format!("tenant id '{tenant}' supplied but multi-tenancy is disabled"),
            )),
            (TenancyMode::Discriminator, None) => Err(IndexError::config(
                context,
                "multi-tenancy is enabled but no tenant id was provided",
            )),
            (TenancyMode::Discriminator, Some("")) => Err(IndexError::config(
                context,
                "multi-tenancy is enabled but the tenant id is empty",
            )),
            (TenancyMode::Discriminator, Some(tenant)) => {
                if tenant.contains(UNIQUE_KEY_SEPARATOR) {
                    return Err(IndexError::config(
                        context,
                        format!("tenant id '{tenant}' contains a reserved control character"),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Validates a set of tenant ids for a cross-tenant query.
    ///
    /// The empty set is invalid: it would silently match nothing.
    pub fn check_tenant_ids(
        &self,
        tenant_ids: &BTreeSet<String>,
        context: &EventContext,
    ) -> Result<(), IndexError> {
        if self.enabled() && tenant_ids.is_empty() {
            return Err(IndexError::config(
                context,
                "multi-tenancy is enabled but the tenant id set is empty",
            ));
        }
        for tenant in tenant_ids {
            self.check_tenant_id(Some(tenant), context)?;
        }
        Ok(())
    }

    /// Appends the tenant field to a document about to be indexed.
    ///
    /// Must be called exactly once per document write. No-op in single-tenant
    /// mode. The tenant id must have been validated beforehand.
    pub fn contribute_to_document(
        &self,
        doc: &mut TantivyDocument,
        fields: &MetadataFields,
        tenant_id: Option<&str>,
    ) {
        if let (TenancyMode::Discriminator, Some(tenant)) = (self.mode, tenant_id) {
            fields.add_tenant_id(doc, tenant);
        }
    }

    /// Builds the query-time tenant filter, or `None` when no filtering is
    /// needed.
    ///
    /// The returned query must be combined with the user's query as a
    /// non-scoring must clause at search and delete time.
    pub fn filter_or_null(
        &self,
        fields: &MetadataFields,
        tenant_id: Option<&str>,
    ) -> Option<Box<dyn Query>> {
        match (self.mode, tenant_id) {
            (TenancyMode::Discriminator, Some(tenant)) => {
                Some(Box::new(tenant_term_query(fields, tenant)))
            }
            _ => None,
        }
    }

    /// Builds a filter matching any of several tenants, for cross-tenant
    /// administrative queries.
    pub fn filter_any_of(
        &self,
        fields: &MetadataFields,
        tenant_ids: &BTreeSet<String>,
        context: &EventContext,
    ) -> Result<Option<Box<dyn Query>>, IndexError> {
        if !self.enabled() {
            return Ok(None);
        }
        self.check_tenant_ids(tenant_ids, context)?;

        if let Some(tenant) = tenant_ids.iter().next()
            && tenant_ids.len() == 1
        {
            return Ok(Some(Box::new(tenant_term_query(fields, tenant))));
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = tenant_ids
            .iter()
            .map(|tenant| {
                let query: Box<dyn Query> = Box::new(tenant_term_query(fields, tenant));
                (Occur::Should, query)
            })
            .collect();

        Ok(Some(Box::new(BooleanQuery::new(clauses))))
    }

    /// Returns the document-key policy matching the active mode.
    pub fn key_policy(&self) -> DocumentKeyPolicy {
        match self.mode {
            TenancyMode::Single => DocumentKeyPolicy::Flat,
            TenancyMode::Discriminator => DocumentKeyPolicy::TenantScoped,
        }
    }
}

/// Exact term query over the tenant field.
fn tenant_term_query(fields: &MetadataFields, tenant_id: &str) -> TermQuery {
    let term = Term::from_field_text(fields.tenant_id, tenant_id);
    TermQuery::new(term, IndexRecordOption::Basic)
}

/// How unique document keys are derived from entity identifiers.
///
/// Callers that need a unique key can check support up front instead of
/// relying on an error from [`DocumentKeyPolicy::unique_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKeyPolicy {
    /// Key is the entity id itself; only valid without a tenant.
    Flat,
    /// Key joins tenant id and entity id; requires a tenant.
    TenantScoped,
}

impl DocumentKeyPolicy {
    /// Whether this policy can derive a unique key for the given tenant
    /// argument shape.
    pub fn supports_unique_key(&self, tenant_id: Option<&str>) -> bool {
        match self {
            Self::Flat => tenant_id.is_none(),
            Self::TenantScoped => tenant_id.is_some(),
        }
    }

    /// Derives the unique key for an entity.
    pub fn unique_key(&self, tenant_id: Option<&str>, id: &str) -> Result<String, IndexError> {
        match (self, tenant_id) {
            (Self::Flat, None) => Ok(id.to_string()),
            (Self::Flat, Some(_)) => Err(IndexError::Unsupported {
                operation: "unique_key",
                message: "flat keys cannot encode a tenant id".to_string(),
            }),
            (Self::TenantScoped, Some(tenant)) => {
                Ok(format!("{tenant}{UNIQUE_KEY_SEPARATOR}{id}"))
            }
            (Self::TenantScoped, None) => Err(IndexError::Unsupported {
                operation: "unique_key",
                message: "tenant-scoped keys require a tenant id".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn context() -> EventContext {
        EventContext::index("test")
    }

    #[test]
    fn single_mode_accepts_only_absent_tenant() {
        let tenancy = MultiTenancy::new(TenancyMode::Single);
        assert!(tenancy.check_tenant_id(None, &context()).is_ok());
        assert!(tenancy.check_tenant_id(Some("t1"), &context()).is_err());
    }

    #[test]
    fn discriminator_mode_requires_non_empty_tenant() {
        let tenancy = MultiTenancy::new(TenancyMode::Discriminator);
        assert!(tenancy.check_tenant_id(Some("tenant-A"), &context()).is_ok());

        for bad in [None, Some("")] {
            let err = tenancy.check_tenant_id(bad, &context()).unwrap_err();
            assert!(err.to_string().contains("index 'test'"), "{err}");
        }
    }

    #[test]
    fn rejects_tenant_containing_separator() {
        let tenancy = MultiTenancy::new(TenancyMode::Discriminator);
        let bad = format!("t{UNIQUE_KEY_SEPARATOR}1");
        assert!(tenancy.check_tenant_id(Some(&bad), &context()).is_err());
    }

    #[test]
    fn empty_tenant_set_is_invalid() {
        let tenancy = MultiTenancy::new(TenancyMode::Discriminator);
        let err = tenancy
            .check_tenant_ids(&BTreeSet::new(), &context())
            .unwrap_err();
        assert!(matches!(err, IndexError::Config { .. }));
    }

    #[test]
    fn filter_is_null_in_single_mode() {
        let tenancy = MultiTenancy::new(TenancyMode::Single);
        let schema = crate::IndexSchema::build(&[], &context()).unwrap();
        assert!(
            tenancy
                .filter_or_null(&schema.metadata, Some("t1"))
                .is_none()
        );
    }

    #[test]
    fn filter_targets_the_tenant_field() {
        let tenancy = MultiTenancy::new(TenancyMode::Discriminator);
        let schema = crate::IndexSchema::build(&[], &context()).unwrap();
        let filter = tenancy
            .filter_or_null(&schema.metadata, Some("t1"))
            .expect("discriminator mode must filter");
        assert!(format!("{filter:?}").contains("t1"));
    }

    #[test]
    fn contribute_adds_exactly_one_tenant_field() {
        let tenancy = MultiTenancy::new(TenancyMode::Discriminator);
        let schema = crate::IndexSchema::build(&[], &context()).unwrap();

        let mut doc = TantivyDocument::new();
        tenancy.contribute_to_document(&mut doc, &schema.metadata, Some("t1"));

        let values: Vec<_> = doc.get_all(schema.metadata.tenant_id).collect();
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn key_policy_capability_checks() {
        assert!(DocumentKeyPolicy::Flat.supports_unique_key(None));
        assert!(!DocumentKeyPolicy::Flat.supports_unique_key(Some("t1")));
        assert!(DocumentKeyPolicy::TenantScoped.supports_unique_key(Some("t1")));
        assert!(!DocumentKeyPolicy::TenantScoped.supports_unique_key(None));

        assert_eq!(
            DocumentKeyPolicy::Flat.unique_key(None, "doc-1").unwrap(),
            "doc-1"
        );
        assert!(matches!(
            DocumentKeyPolicy::Flat.unique_key(Some("t1"), "doc-1"),
            Err(IndexError::Unsupported { .. })
        ));
        assert!(matches!(
            DocumentKeyPolicy::TenantScoped.unique_key(None, "doc-1"),
            Err(IndexError::Unsupported { .. })
        ));
    }

    #[test]
    fn tenant_scoped_keys_are_injective() {
        let policy = DocumentKeyPolicy::TenantScoped;
        let key_a = policy.unique_key(Some("a"), "b-c").unwrap();
        let key_b = policy.unique_key(Some("a-b"), "c").unwrap();
        assert_ne!(key_a, key_b);
    }
}
