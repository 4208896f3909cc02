use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const PAGE_SIZE: usize = 50;

/// Admin-facing user record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: u64,
    pub email: String,
    pub plan: String,
    pub last_login_ms: i64,
}

impl AdminUser {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            email: format!("user{}@example.com", id),
            plan: if id % 7 == 0 { "premium" } else { "free" }.to_string(),
            last_login_ms: 1_700_000_000_000 + id as i64 * 1_000,
        }
    }
}

/// Simulated source of truth with configurable latency
#[derive(Clone)]
pub struct FakeAdminDatabase {
    users: Arc<Vec<AdminUser>>,
    latency_ms: u64,
    query_count: Arc<AtomicUsize>,
}

impl FakeAdminDatabase {
    pub fn new(num_users: usize, latency_ms: u64) -> Self {
        Self {
            users: Arc::new((0..num_users as u64).map(AdminUser::new).collect()),
            latency_ms,
            query_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn num_pages(&self) -> usize {
        self.users.len().div_ceil(PAGE_SIZE)
    }

    /// One page of the user listing.
    pub async fn list_page(&self, page: usize) -> Result<Vec<AdminUser>, String> {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        // Simulate query latency
        tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;

        let start = page * PAGE_SIZE;
        if start >= self.users.len() {
            return Err(format!("page {} out of range", page));
        }
        let end = (start + PAGE_SIZE).min(self.users.len());
        Ok(self.users[start..end].to_vec())
    }

    #[allow(dead_code)]
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }
}

/// Generate cache keys for different workload patterns
pub struct KeyGenerator {
    num_pages: usize,
}

impl KeyGenerator {
    pub fn new(num_pages: usize) -> Self {
        Self { num_pages }
    }

    pub fn key(page: usize) -> String {
        format!("admin_users_list:page:{}", page)
    }

    /// Page numbers in order (for cold cache tests)
    pub fn sequential(&self) -> Vec<usize> {
        (0..self.num_pages).collect()
    }

    /// Skewed page access: 80% of requests go to the first 20% of pages
    pub fn skewed(&self, count: usize) -> Vec<usize> {
        let mut rng = rand::thread_rng();
        let hot = (self.num_pages / 5).max(1);
        (0..count)
            .map(|_| {
                if rng.gen_bool(0.8) || hot == self.num_pages {
                    rng.gen_range(0..hot)
                } else {
                    rng.gen_range(hot..self.num_pages)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_database_pages() {
        let db = FakeAdminDatabase::new(120, 0);
        assert_eq!(db.num_pages(), 3);

        assert_eq!(db.list_page(0).await.unwrap().len(), PAGE_SIZE);
        assert_eq!(db.list_page(2).await.unwrap().len(), 20);
        assert!(db.list_page(3).await.is_err());
        assert_eq!(db.query_count(), 3);
    }

    #[test]
    fn test_key_generator() {
        let key_gen = KeyGenerator::new(10);

        assert_eq!(key_gen.sequential().len(), 10);
        assert_eq!(KeyGenerator::key(3), "admin_users_list:page:3");

        let skewed = key_gen.skewed(100);
        assert_eq!(skewed.len(), 100);
        assert!(skewed.iter().all(|&p| p < 10));
    }
}
