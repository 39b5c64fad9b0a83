//! Tenant-isolation guard configuration.

use serde::{Deserialize, Serialize};

/// Resources that must always be filtered by tenant.
pub const DEFAULT_TENANT_RESOURCES: &[&str] = &[
    "orders",
    "order_items",
    "customers",
    "products",
    "inventory",
    "pricing_rules",
    "price_lists",
    "invoices",
    "deliveries",
    "sync_jobs",
    "sync_logs",
    "audit_logs",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TenantConfig {
    /// Tenant-scoped resource names. Default: `DEFAULT_TENANT_RESOURCES`.
    pub resources: Vec<String>,
    /// Column carrying the tenant identifier. Default: "tenant_id".
    pub field: Option<String>,
    /// Variable holding the tenant identifier in handler code. Default: "tenantId".
    pub variable: Option<String>,
    /// Statement synthesized when the variable is not in scope.
    pub extraction: Option<String>,
}

impl TenantConfig {
    pub fn effective_resources(&self) -> Vec<String> {
        if self.resources.is_empty() {
            DEFAULT_TENANT_RESOURCES.iter().map(|r| r.to_string()).collect()
        } else {
            self.resources.clone()
        }
    }

    pub fn effective_field(&self) -> String {
        self.field.clone().unwrap_or_else(|| "tenant_id".to_string())
    }

    pub fn effective_variable(&self) -> String {
        self.variable.clone().unwrap_or_else(|| "tenantId".to_string())
    }

    pub fn effective_extraction(&self) -> String {
        self.extraction.clone().unwrap_or_else(|| {
            format!(
                "const {} = request.headers.get('x-tenant-id');",
                self.effective_variable()
            )
        })
    }
}
