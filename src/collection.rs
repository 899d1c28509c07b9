use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::LinkResult;
use crate::models::Link;
use crate::remote::RemoteClient;

#[derive(Debug, Default)]
struct CollectionState {
    owner_id: Option<String>,
    links: Vec<Link>,
    generation: u64,
}

/// Ordered links of the signed-in owner, as last loaded from the client or as
/// optimistically changed ahead of it.
///
/// Readers get whole-sequence snapshots. Writes other than [`load`] and
/// [`replace`] go through the mutation coordinator. Once [`abandon`]ed the
/// collection ignores every later write, so responses arriving after the
/// editor went away are dropped.
///
/// [`load`]: LinkCollection::load
/// [`replace`]: LinkCollection::replace
/// [`abandon`]: LinkCollection::abandon
pub struct LinkCollection {
    client: Arc<dyn RemoteClient>,
    state: RwLock<CollectionState>,
    abandoned: AtomicBool,
    stale: AtomicBool,
}

impl LinkCollection {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            state: RwLock::new(CollectionState::default()),
            abandoned: AtomicBool::new(false),
            stale: AtomicBool::new(false),
        }
    }

    /// Fetch the owner's links and hold them.
    ///
    /// Records without a `display_order` get their position in the fetched
    /// sequence. The default is local only; it reaches the store with the
    /// next reorder.
    ///
    /// A failed load marks the held sequence stale until a later load
    /// succeeds.
    pub async fn load(&self) -> LinkResult<Vec<Link>> {
        let fetched = self.fetch().await;
        self.stale.store(fetched.is_err(), Ordering::SeqCst);
        let (owner_id, fetched) = fetched?;
        let links = with_fallback_order(&owner_id, fetched);

        if self.is_abandoned() {
            debug!(owner_id = %owner_id, "dropping load result for abandoned collection");
            return Ok(links);
        }

        let mut state = self.state.write().await;
        state.owner_id = Some(owner_id);
        state.links = links.clone();
        state.generation += 1;
        Ok(links)
    }

    async fn fetch(&self) -> LinkResult<(String, Vec<Link>)> {
        let owner_id = self.client.current_owner_id().await?;
        let fetched = self.client.list_links(&owner_id).await?;
        Ok((owner_id, fetched))
    }

    /// Swap the whole held sequence. Returns `false` when the collection was
    /// abandoned and nothing changed.
    pub async fn replace(&self, links: Vec<Link>) -> bool {
        if self.is_abandoned() {
            return false;
        }
        let mut state = self.state.write().await;
        state.links = links;
        state.generation += 1;
        true
    }

    pub async fn snapshot(&self) -> Vec<Link> {
        self.state.read().await.links.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.links.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.links.is_empty()
    }

    /// Owner of the last successful load.
    pub async fn owner_id(&self) -> Option<String> {
        self.state.read().await.owner_id.clone()
    }

    /// Bumped by every change to the held sequence.
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    pub fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Whether the last load failed, so the held sequence may not match the
    /// store.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    pub(crate) fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    /// Run `f` against the held sequence under the write lock without
    /// changing it. Holding the write lock orders `f` with every [`update`].
    ///
    /// [`update`]: LinkCollection::update
    pub(crate) async fn inspect<T, E>(
        &self,
        f: impl FnOnce(&[Link]) -> Result<T, E>,
    ) -> Result<T, E> {
        let state = self.state.write().await;
        f(&state.links)
    }

    /// Run `f` against the held sequence under the write lock. The generation
    /// only moves when `f` succeeds. Abandoned collections run `f` on a
    /// scratch copy so callers still get their result.
    pub(crate) async fn update<T, E>(
        &self,
        f: impl FnOnce(&mut Vec<Link>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut state = self.state.write().await;
        if self.is_abandoned() {
            let mut scratch = state.links.clone();
            return f(&mut scratch);
        }

        let result = f(&mut state.links)?;
        state.generation += 1;
        Ok(result)
    }
}

fn with_fallback_order(owner_id: &str, fetched: Vec<Link>) -> Vec<Link> {
    fetched
        .into_iter()
        .filter(|link| {
            let own = link.owner_id == owner_id;
            if !own {
                warn!(link_id = link.id, "dropping link of another owner from listing");
            }
            own
        })
        .enumerate()
        .map(|(index, mut link)| {
            link.display_order.get_or_insert(index as i64);
            link
        })
        .collect()
}
