/// Which strategy an intercepted request gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not a GET: straight to the network, queued if it is a syncable
    /// mutation and the network is down.
    Bypass,
    /// Health/status probes: network first, no time bound.
    Liveness,
    /// Any other API call: network first within the API timeout.
    Api,
    /// Pages and assets: network first, no time bound.
    Static,
}

/// Paths that report backend liveness and must always hit the network first.
const LIVENESS_PATHS: [&str; 2] = ["/api/health", "/api/status"];

const API_PREFIX: &str = "/api/";

impl Route {
    pub fn classify(method: &str, path: &str) -> Self {
        if !method.eq_ignore_ascii_case("GET") {
            Route::Bypass
        } else if LIVENESS_PATHS.contains(&path) {
            Route::Liveness
        } else if path.starts_with(API_PREFIX) {
            Route::Api
        } else {
            Route::Static
        }
    }
}
