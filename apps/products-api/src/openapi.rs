//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for Products API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Products API",
        version = "0.1.0",
        description = "Product catalog API with MongoDB change auditing",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api/products", api = domain_products::ApiDoc),
        (path = "/api/v1/audit-history", api = mongo_audit::ApiDoc)
    ),
    tags(
        (name = "Products", description = "Product management endpoints"),
        (name = "Audit History", description = "Change history of audited collections")
    )
)]
pub struct ApiDoc;
