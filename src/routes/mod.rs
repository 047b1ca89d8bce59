/// Router Module Index
///
/// Routes are grouped by how they are protected. The access gate middleware in
/// `create_router` sits in front of both groups.

/// Landing pages the gate redirects to, plus the health probe.
pub mod public;

/// JSON poll administration API, nested under `/api/admin`.
/// Every handler re-checks the admin role through the `AdminUser` extractor.
pub mod admin;
