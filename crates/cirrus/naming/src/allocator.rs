//! Sequenced name allocation
//!
//! Allocation seeds a candidate from the visible listing (one past the
//! highest visible sequence) and then probes the candidate by name, because
//! draining resources hold their names without appearing in listings.
//! Gaps below the highest sequence are never backfilled.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cirrus_types::{NamingConfig, ProgressSink, RemoteResult, SilentProgress};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{NamingError, Result};
use crate::inventory::ClusterInventory;
use crate::names::{cluster_name, sequenced_name, validate_components, NameParts};

const PHASE: &str = "DEPLOY";

/// A remote resource occupying a sequence in a family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakenSlot {
    pub name: String,
    pub sequence: u32,
    pub created_at: DateTime<Utc>,
}

/// A name under consideration; rendering is fully determined by its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCandidate {
    pub application: String,
    pub stack: Option<String>,
    pub detail: Option<String>,
    pub sequence: u32,
    pub ignore_sequence: bool,
}

impl NameCandidate {
    pub fn cluster(&self) -> String {
        cluster_name(
            &self.application,
            self.stack.as_deref(),
            self.detail.as_deref(),
        )
    }

    /// Render the candidate, with a `-vNNN` suffix unless sequencing is off.
    pub fn render(&self, digits: usize) -> String {
        let cluster = self.cluster();
        if self.ignore_sequence {
            cluster
        } else {
            sequenced_name(&cluster, self.sequence, digits)
        }
    }

    /// The next sequenced candidate after this one, wrapping past `max_sequence`.
    pub fn successor(&self, max_sequence: u32) -> Self {
        let sequence = if self.ignore_sequence {
            1
        } else {
            next_sequence(self.sequence, max_sequence)
        };
        Self {
            sequence,
            ignore_sequence: false,
            ..self.clone()
        }
    }
}

fn next_sequence(sequence: u32, max_sequence: u32) -> u32 {
    if sequence >= max_sequence {
        0
    } else {
        sequence + 1
    }
}

/// A name together with whatever claiming it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation<T> {
    pub name: String,
    pub claimed: T,
}

/// Resolves unused sequenced names within one remote cluster.
pub struct NameAllocator {
    inventory: Arc<dyn ClusterInventory>,
    cluster: String,
    region: String,
    config: NamingConfig,
}

impl NameAllocator {
    /// Create an allocator for the given remote cluster and region
    pub fn new(
        inventory: Arc<dyn ClusterInventory>,
        cluster: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            inventory,
            cluster: cluster.into(),
            region: region.into(),
            config: NamingConfig::default(),
        }
    }

    /// Replace the default naming configuration
    pub fn with_config(mut self, config: NamingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    /// Enumerate the visible slots of a family.
    ///
    /// Listings match by substring, so members of sibling families (for
    /// example `app-prod-web` when asking for `app-prod`) are dropped here.
    #[instrument(skip(self), fields(cluster = %self.cluster))]
    pub async fn taken_slots(&self, family: &str) -> Result<Vec<TakenSlot>> {
        let mut slots = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .inventory
                .list_family_members(family, cursor.as_deref())
                .await
                .map_err(NamingError::remote("listing family members"))?;

            for member in page.members {
                let parts =
                    NameParts::parse_with_digits(&member.name, self.config.sequence_digits);
                if parts.cluster != family {
                    continue;
                }
                if let Some(sequence) = parts.sequence {
                    slots.push(TakenSlot {
                        name: member.name,
                        sequence,
                        created_at: member.created_at,
                    });
                }
            }

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(family = family, slots = slots.len(), "Collected taken slots");
        Ok(slots)
    }

    /// First candidate for a family, before any remote confirmation.
    pub fn seed_candidate(
        &self,
        application: &str,
        stack: Option<&str>,
        detail: Option<&str>,
        ignore_sequence: bool,
        slots: &[TakenSlot],
    ) -> NameCandidate {
        let highest = slots
            .iter()
            .filter(|slot| slot.sequence <= self.config.max_sequence)
            .max_by_key(|slot| slot.sequence);

        let sequence = match highest {
            Some(slot) => {
                debug!(
                    name = %slot.name,
                    created_at = %slot.created_at,
                    "Seeding from highest visible slot"
                );
                next_sequence(slot.sequence, self.config.max_sequence)
            }
            None => 0,
        };

        NameCandidate {
            application: application.to_string(),
            stack: stack.map(str::to_string),
            detail: detail.map(str::to_string),
            sequence,
            ignore_sequence,
        }
    }

    /// Resolve the next unused name without recording progress.
    pub async fn resolve_next_name(
        &self,
        application: &str,
        stack: Option<&str>,
        detail: Option<&str>,
        ignore_sequence: bool,
    ) -> Result<String> {
        self.resolve_next_name_with(&SilentProgress, application, stack, detail, ignore_sequence)
            .await
    }

    /// Resolve the next unused name, reporting progress to `progress`.
    #[instrument(skip(self, progress), fields(cluster = %self.cluster, region = %self.region))]
    pub async fn resolve_next_name_with(
        &self,
        progress: &dyn ProgressSink,
        application: &str,
        stack: Option<&str>,
        detail: Option<&str>,
        ignore_sequence: bool,
    ) -> Result<String> {
        let candidate = self
            .initial_candidate(progress, application, stack, detail, ignore_sequence)
            .await?;
        let mut attempts = 0;
        let free = self.first_free(progress, candidate, &mut attempts).await?;
        Ok(free.render(self.config.sequence_digits))
    }

    /// Resolve a name and claim it with `claim`.
    ///
    /// A claim rejected with a remote conflict means another orchestrator
    /// took the name between probe and claim; allocation resumes from the
    /// next sequence. Probes and claims share one attempt budget.
    #[instrument(skip(self, progress, claim), fields(cluster = %self.cluster, region = %self.region))]
    pub async fn allocate<T, F, Fut>(
        &self,
        progress: &dyn ProgressSink,
        application: &str,
        stack: Option<&str>,
        detail: Option<&str>,
        ignore_sequence: bool,
        mut claim: F,
    ) -> Result<Allocation<T>>
    where
        F: FnMut(String) -> Fut + Send,
        Fut: Future<Output = RemoteResult<T>> + Send,
    {
        let mut candidate = self
            .initial_candidate(progress, application, stack, detail, ignore_sequence)
            .await?;
        let mut attempts = 0;

        loop {
            let free = self.first_free(progress, candidate, &mut attempts).await?;
            let name = free.render(self.config.sequence_digits);

            match claim(name.clone()).await {
                Ok(claimed) => {
                    info!(name = %name, "Claimed server group name");
                    return Ok(Allocation { name, claimed });
                }
                Err(e) if e.is_conflict() => {
                    attempts += 1;
                    warn!(name = %name, error = %e, "Name claimed concurrently, retrying");
                    candidate = free.successor(self.config.max_sequence);
                }
                Err(source) => return Err(NamingError::ClaimFailed { name, source }),
            }
        }
    }

    async fn initial_candidate(
        &self,
        progress: &dyn ProgressSink,
        application: &str,
        stack: Option<&str>,
        detail: Option<&str>,
        ignore_sequence: bool,
    ) -> Result<NameCandidate> {
        validate_components(application, stack, detail)?;
        let family = cluster_name(application, stack, detail);

        let slots = if ignore_sequence {
            Vec::new()
        } else {
            progress.record(
                PHASE,
                &format!("Looking up next sequence for {family} in {}", self.region),
            );
            self.taken_slots(&family).await?
        };

        Ok(self.seed_candidate(application, stack, detail, ignore_sequence, &slots))
    }

    /// Probe candidates until one is free or the attempt budget is spent.
    async fn first_free(
        &self,
        progress: &dyn ProgressSink,
        mut candidate: NameCandidate,
        attempts: &mut u32,
    ) -> Result<NameCandidate> {
        while *attempts < self.config.max_attempts {
            *attempts += 1;
            let name = candidate.render(self.config.sequence_digits);

            let described = self
                .inventory
                .describe_by_name(&name)
                .await
                .map_err(NamingError::remote("describing candidate name"))?;

            match described {
                Some(resource) if resource.status.occupies_name() => {
                    warn!(
                        name = %name,
                        status = ?resource.status,
                        attempt = *attempts,
                        "Candidate name is occupied"
                    );
                    candidate = candidate.successor(self.config.max_sequence);
                }
                _ => {
                    progress.record(PHASE, &format!("Resolved next name {name}"));
                    debug!(name = %name, attempt = *attempts, "Candidate name is free");
                    return Ok(candidate);
                }
            }
        }

        Err(NamingError::ExhaustedRetries {
            cluster: candidate.cluster(),
            region: self.region.clone(),
            attempts: *attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{InMemoryClusterInventory, ResourceStatus};

    fn allocator(inventory: &Arc<InMemoryClusterInventory>) -> NameAllocator {
        NameAllocator::new(inventory.clone(), "ecs-cluster", "us-west-2")
    }

    #[tokio::test]
    async fn test_empty_family_starts_at_zero() {
        let inventory = Arc::new(InMemoryClusterInventory::new());
        let name = allocator(&inventory)
            .resolve_next_name("app", Some("prod"), None, false)
            .await
            .unwrap();
        assert_eq!(name, "app-prod-v000");
    }

    #[tokio::test]
    async fn test_sibling_families_are_ignored() {
        let inventory = Arc::new(InMemoryClusterInventory::new());
        inventory.add_active("app-prod-v007", Utc::now());
        inventory.add_active("app-prod-web-v042", Utc::now());

        let name = allocator(&inventory)
            .resolve_next_name("app", Some("prod"), None, false)
            .await
            .unwrap();
        assert_eq!(name, "app-prod-v008");
    }

    #[tokio::test]
    async fn test_sequence_wraps_past_maximum() {
        let inventory = Arc::new(InMemoryClusterInventory::new());
        inventory.add_active("app-v999", Utc::now());

        let name = allocator(&inventory)
            .resolve_next_name("app", None, None, false)
            .await
            .unwrap();
        assert_eq!(name, "app-v000");
    }

    #[tokio::test]
    async fn test_ignore_sequence_uses_bare_cluster() {
        let inventory = Arc::new(InMemoryClusterInventory::new());
        inventory.add_active("app-prod-v003", Utc::now());

        let name = allocator(&inventory)
            .resolve_next_name("app", Some("prod"), None, true)
            .await
            .unwrap();
        assert_eq!(name, "app-prod");
        assert!(inventory.list_calls().is_empty());
    }

    #[tokio::test]
    async fn test_ignore_sequence_conflict_falls_back_to_sequencing() {
        let inventory = Arc::new(InMemoryClusterInventory::new());
        inventory.add_unlisted("app-prod", ResourceStatus::Draining);

        let name = allocator(&inventory)
            .resolve_next_name("app", Some("prod"), None, true)
            .await
            .unwrap();
        assert_eq!(name, "app-prod-v001");
    }

    #[tokio::test]
    async fn test_inactive_resource_does_not_hold_name() {
        let inventory = Arc::new(InMemoryClusterInventory::new());
        inventory.add_unlisted("app-v000", ResourceStatus::Inactive);

        let name = allocator(&inventory)
            .resolve_next_name("app", None, None, false)
            .await
            .unwrap();
        assert_eq!(name, "app-v000");
    }

    #[tokio::test]
    async fn test_invalid_application_is_rejected_before_remote_calls() {
        let inventory = Arc::new(InMemoryClusterInventory::new());
        let err = allocator(&inventory)
            .resolve_next_name("", None, None, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), cirrus_types::ErrorKind::Validation);
        assert!(inventory.list_calls().is_empty());
        assert!(inventory.probed_names().is_empty());
    }

    #[tokio::test]
    async fn test_progress_is_recorded() {
        let inventory = Arc::new(InMemoryClusterInventory::new());
        let history = cirrus_types::TaskHistory::new();

        allocator(&inventory)
            .resolve_next_name_with(&history, "app", None, None, false)
            .await
            .unwrap();

        let messages = history.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].starts_with("DEPLOY:Resolved next name app-v000"));
    }

    #[test]
    fn test_candidate_rendering_is_deterministic() {
        let candidate = NameCandidate {
            application: "app".into(),
            stack: Some("prod".into()),
            detail: Some("web".into()),
            sequence: 4,
            ignore_sequence: false,
        };
        assert_eq!(candidate.render(3), "app-prod-web-v004");
        assert_eq!(candidate.successor(999).render(3), "app-prod-web-v005");
    }
}
