//! Router module index, organized by resource. Authentication is enforced
//! per-handler through the `AuthUser`/`MaybeAuthUser` extractors rather than a
//! router-level layer, because most paths mix public reads with owner-only
//! writes on the same route (e.g. GET vs PATCH /users/{id}).

/// Account, session, profile, and avatar routes.
pub mod users;

/// Petition, category, signature, and hero-image routes.
pub mod petitions;
