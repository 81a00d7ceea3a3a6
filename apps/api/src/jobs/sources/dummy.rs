use async_trait::async_trait;
use chrono::Utc;

use super::JobSource;
use crate::models::job::JobPosting;

/// Offline source producing up to five synthetic postings mentioning the query.
pub struct DummySource;

#[async_trait]
impl JobSource for DummySource {
    fn name(&self) -> &'static str {
        "dummy"
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<JobPosting> {
        let now = Utc::now();
        (1..=limit.min(5))
            .map(|i| JobPosting {
                job_id: format!("dummy-{i}"),
                title: format!("Sample Role {i}"),
                company: "Acme Corp".to_string(),
                location: Some("Remote".to_string()),
                url: format!("https://example.com/jobs/{i}"),
                source: self.name().to_string(),
                posted_at: Some(now),
                description: format!("Example job {i} description related to {query}"),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dummy_caps_at_five() {
        assert_eq!(DummySource.search("rust", 50).await.len(), 5);
        assert_eq!(DummySource.search("rust", 2).await.len(), 2);
        assert!(DummySource.search("rust", 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_dummy_mentions_query() {
        let jobs = DummySource.search("kubernetes", 1).await;
        assert_eq!(jobs[0].job_id, "dummy-1");
        assert_eq!(jobs[0].source, "dummy");
        assert!(jobs[0].description.contains("kubernetes"));
    }
}
