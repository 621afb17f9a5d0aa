/// Whether an expired-credential failure on a route may be healed by a
/// refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePolicy {
    /// Regular API route: a 401 goes through the refresh gate once.
    Guarded,
    /// Authentication route: a 401 can never be healed by refreshing, so
    /// it signs the session out directly. This keeps failed logins and a
    /// rejected renewal from looping back into another renewal.
    Exempt,
}

/// Everything under the authentication prefix (login, registration,
/// verification, renewal, profile completion) is exempt.
pub fn policy_for(path: &str) -> RoutePolicy {
    if path.starts_with("/auth/") {
        RoutePolicy::Exempt
    } else {
        RoutePolicy::Guarded
    }
}
