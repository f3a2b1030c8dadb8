//! Health probe: a narrow, synchronous-callable surface the out-of-scope
//! HTTP health endpoint would invoke. Owns no state of its own — checks
//! `SearchBackend` reachability and credential presence without a full LLM
//! round trip.

use crate::search::SearchClient;

/// Snapshot of whether each upstream dependency looks reachable/configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthStatus {
    pub search_reachable: bool,
    pub llm_credentials_present: bool,
    pub embedding_credentials_present: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.search_reachable && self.llm_credentials_present && self.embedding_credentials_present
    }
}

/// Calls `SearchClient::health_check` and checks the two credential strings
/// are non-empty; never performs an LLM or embedding call.
pub async fn check_health(
    search: &SearchClient,
    llm_api_key: &str,
    embedding_api_endpoint: &str,
) -> HealthStatus {
    HealthStatus {
        search_reachable: search.health_check().await,
        llm_credentials_present: !llm_api_key.trim().is_empty(),
        embedding_credentials_present: !embedding_api_endpoint.trim().is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_credentials_are_reported_unhealthy_regardless_of_search() {
        let search = SearchClient::new("http://localhost:1", None);
        let status = check_health(&search, "", "").await;
        assert!(!status.is_healthy());
        assert!(!status.llm_credentials_present);
        assert!(!status.embedding_credentials_present);
    }

    #[tokio::test]
    async fn present_credentials_with_unreachable_search_is_still_unhealthy() {
        let search = SearchClient::new("http://127.0.0.1:1", None);
        let status = check_health(&search, "sk-test", "http://localhost:9999").await;
        assert!(!status.search_reachable);
        assert!(!status.is_healthy());
    }
}
