//! Candidate profiles: onboarding, lookups, and the read seam the generation
//! pipeline uses to fetch a snapshot.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::profile::ProfileSnapshot;

pub mod handlers;
pub mod repository;

/// Read access to stored profiles. `Ok(None)` means the user does not exist;
/// `Err` means the store itself could not answer.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn get_profile_with_details(&self, user_id: Uuid) -> Result<Option<ProfileSnapshot>>;
}
