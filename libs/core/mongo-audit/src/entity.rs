/// Static declaration of an audited document type.
///
/// Implemented by entities whose collection changes should be captured. The
/// registry builder reads these constants once at startup.
///
/// ```ignore
/// impl Auditable for Product {
///     const COLLECTION: &'static str = "products";
///     const VERSION_FIELD: Option<&'static str> = Some("version");
/// }
/// ```
pub trait Auditable {
    /// Source collection name
    const COLLECTION: &'static str;

    /// Explicit audit collection, bypassing the configured prefix/suffix
    const AUDIT_COLLECTION: Option<&'static str> = None;

    /// Optimistic-concurrency field used to tell creates from updates
    const VERSION_FIELD: Option<&'static str> = None;
}

/// Version value a freshly inserted document carries.
pub const INITIAL_VERSION: i64 = 0;
