//! Optimistic mutations of the link collection.
//!
//! Every operation runs as: apply locally (when it can be) -> persist through
//! the client -> reconcile. Remote writes are issued by a single write lane in
//! the order their local changes were applied, so back-to-back reorders land
//! in the store in submission order and the last one wins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::collection::LinkCollection;
use crate::error::{LinkError, LinkResult};
use crate::models::{Link, LinkChanges, LinkId};
use crate::notify::{Notification, Notifier};
use crate::remote::RemoteError;
use crate::reorder::{move_link, renumber};
use crate::validation::{LinkDraft, LinkPatch};

/// Where the most recent mutation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    /// Local change applied, request in flight.
    Pending,
    Committed,
    /// Failed without touching local state any further.
    Failed,
    /// Failed and reloading from the client.
    FailedReconciling,
}

/// A mutation whose local part is done and whose remote part is queued.
#[must_use = "a submitted mutation reports its outcome through `settled`"]
pub struct Submitted<T> {
    rx: oneshot::Receiver<LinkResult<T>>,
}

impl<T> Submitted<T> {
    fn ready(value: LinkResult<T>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(value);
        Self { rx }
    }

    /// Wait for the remote write and its reconciliation.
    pub async fn settled(self) -> LinkResult<T> {
        self.rx.await.unwrap_or_else(|_| Err(lane_closed()))
    }
}

fn lane_closed() -> LinkError {
    LinkError::Remote(RemoteError::Transport("write lane closed".to_string()))
}

enum Job {
    Create {
        owner_id: String,
        draft: LinkDraft,
        display_order: i64,
        reply: oneshot::Sender<LinkResult<Link>>,
    },
    Update {
        id: LinkId,
        changes: LinkChanges,
        reply: oneshot::Sender<LinkResult<()>>,
    },
    Delete {
        id: LinkId,
        reply: oneshot::Sender<LinkResult<()>>,
    },
    Reorder {
        order: Vec<LinkId>,
        reply: oneshot::Sender<LinkResult<()>>,
    },
}

/// The only writer of a [`LinkCollection`].
pub struct MutationCoordinator {
    collection: Arc<LinkCollection>,
    notifier: Arc<dyn Notifier>,
    lane: mpsc::UnboundedSender<Job>,
    phase: Arc<watch::Sender<MutationPhase>>,
    in_flight: Arc<AtomicUsize>,
}

impl MutationCoordinator {
    /// Create the coordinator and spawn its write lane. Must be called inside
    /// a tokio runtime. The lane stops once the coordinator is dropped and
    /// the queued writes are done.
    pub fn new(collection: Arc<LinkCollection>, notifier: Arc<dyn Notifier>) -> Self {
        let (lane, rx) = mpsc::unbounded_channel();
        let (phase, _) = watch::channel(MutationPhase::Idle);
        let phase = Arc::new(phase);
        let in_flight = Arc::new(AtomicUsize::new(0));

        let worker = WriteLane {
            collection: Arc::clone(&collection),
            notifier: Arc::clone(&notifier),
            phase: Arc::clone(&phase),
            in_flight: Arc::clone(&in_flight),
            needs_refresh: false,
        };
        tokio::spawn(worker.run(rx));

        Self {
            collection,
            notifier,
            lane,
            phase,
            in_flight,
        }
    }

    pub fn collection(&self) -> &Arc<LinkCollection> {
        &self.collection
    }

    pub fn phase(&self) -> MutationPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationPhase> {
        self.phase.subscribe()
    }

    /// Reload the collection from the client.
    pub async fn refresh(&self) -> LinkResult<Vec<Link>> {
        self.collection.load().await
    }

    /// Stop applying responses to the collection and stop notifying. Writes
    /// already queued are still sent.
    pub fn abandon(&self) {
        info!("editor abandoned; ignoring further responses");
        self.collection.abandon();
    }

    pub async fn add(&self, draft: LinkDraft) -> LinkResult<Link> {
        self.submit_add(draft).await?.settled().await
    }

    pub async fn edit(&self, id: LinkId, patch: LinkPatch) -> LinkResult<()> {
        self.submit_edit(id, patch).await?.settled().await
    }

    pub async fn delete(&self, id: LinkId) -> LinkResult<()> {
        self.submit_delete(id).await?.settled().await
    }

    pub async fn reorder(&self, moved: LinkId, target: LinkId) -> LinkResult<()> {
        self.submit_reorder(moved, target).await?.settled().await
    }

    /// Create a link at the end of the list. Nothing is shown locally until
    /// the store has assigned the id.
    ///
    /// The new link's `display_order` is the number of links held at
    /// submission. Adds submitted before an earlier add has settled get the
    /// same order; listing breaks the tie by id and the next reorder
    /// renumbers them.
    pub async fn submit_add(&self, draft: LinkDraft) -> LinkResult<Submitted<Link>> {
        let owner_id = match self.collection.client().current_owner_id().await {
            Ok(owner_id) => owner_id,
            Err(err) => return Err(self.reject(err.into())),
        };

        self.collection
            .inspect(|links| {
                let display_order = links.len() as i64;
                let (reply, rx) = oneshot::channel();
                self.enqueue(Job::Create {
                    owner_id,
                    draft,
                    display_order,
                    reply,
                })?;
                Ok::<_, LinkError>(Submitted { rx })
            })
            .await
    }

    /// Send the changed fields of a link. The editing surface already shows
    /// the user's text, so there is no local step and no revert on failure.
    pub async fn submit_edit(&self, id: LinkId, patch: LinkPatch) -> LinkResult<Submitted<()>> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(Job::Update {
            id,
            changes: patch.to_changes(),
            reply,
        })?;
        Ok(Submitted { rx })
    }

    /// Remove a link locally at once, then remotely. A failed remote delete
    /// is reported but the link is not put back; the user retries or
    /// refreshes.
    pub async fn submit_delete(&self, id: LinkId) -> LinkResult<Submitted<()>> {
        self.collection
            .update(|links| {
                links.retain(|link| link.id != id);
                let (reply, rx) = oneshot::channel();
                self.enqueue(Job::Delete { id, reply })?;
                Ok::<_, LinkError>(Submitted { rx })
            })
            .await
    }

    /// Move `moved` onto `target`'s position, show it at once, then write
    /// every link's new index. A failed write reloads the list from the
    /// client rather than guessing which writes landed.
    pub async fn submit_reorder(
        &self,
        moved: LinkId,
        target: LinkId,
    ) -> LinkResult<Submitted<()>> {
        if moved == target {
            return Ok(Submitted::ready(Ok(())));
        }

        let submitted: LinkResult<Submitted<()>> = self
            .collection
            .update(|links| {
                let mut reordered = move_link(links, moved, target)?;
                renumber(&mut reordered);
                let order = reordered.iter().map(|link| link.id).collect();
                let (reply, rx) = oneshot::channel();
                self.enqueue(Job::Reorder { order, reply })?;
                *links = reordered;
                Ok::<_, LinkError>(Submitted { rx })
            })
            .await;

        submitted.map_err(|err| self.reject(err))
    }

    /// Put a job on the lane. Called with the collection lock held so the
    /// lane sees jobs in the order their local changes were applied.
    fn enqueue(&self, job: Job) -> LinkResult<()> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.phase.send_replace(MutationPhase::Pending);

        if self.lane.send(job).is_err() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(lane_closed());
        }
        Ok(())
    }

    /// Report a mutation that failed before reaching the lane.
    fn reject(&self, err: LinkError) -> LinkError {
        if !self.collection.is_abandoned() {
            self.notifier.notify(Notification::error(err.to_string()));
        }
        err
    }
}

struct WriteLane {
    collection: Arc<LinkCollection>,
    notifier: Arc<dyn Notifier>,
    phase: Arc<watch::Sender<MutationPhase>>,
    in_flight: Arc<AtomicUsize>,
    /// A reconciling reload may have replaced optimistic changes of jobs
    /// still queued; reload again once they are done.
    needs_refresh: bool,
}

impl WriteLane {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = rx.recv().await {
            let outcome = self.process(job).await;

            if outcome == MutationPhase::FailedReconciling {
                // Jobs queued by now may have had their local change replaced
                // by the reload.
                self.needs_refresh = !rx.is_empty();
            } else if self.needs_refresh && rx.is_empty() {
                debug!("queue drained after a reconciling reload; refreshing");
                self.needs_refresh = false;
                self.reload().await;
            }

            let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            self.phase.send_replace(if remaining == 0 {
                MutationPhase::Idle
            } else {
                MutationPhase::Pending
            });
        }
        debug!("write lane stopped");
    }

    async fn process(&mut self, job: Job) -> MutationPhase {
        match job {
            Job::Create {
                owner_id,
                draft,
                display_order,
                reply,
            } => {
                let result = self.create(&owner_id, draft, display_order).await;
                self.settle(reply, result)
            }
            Job::Update { id, changes, reply } => {
                let result = self.update(id, changes).await;
                self.settle(reply, result)
            }
            Job::Delete { id, reply } => {
                let result = self.delete(id).await;
                self.settle(reply, result)
            }
            Job::Reorder { order, reply } => {
                let result = self.persist_order(&order).await;
                if result.is_err() {
                    self.phase.send_replace(MutationPhase::FailedReconciling);
                    self.reload().await;
                    let _ = reply.send(result);
                    return MutationPhase::FailedReconciling;
                }
                self.settle(reply, result)
            }
        }
    }

    fn settle<T>(
        &self,
        reply: oneshot::Sender<LinkResult<T>>,
        result: LinkResult<T>,
    ) -> MutationPhase {
        let phase = if result.is_ok() {
            MutationPhase::Committed
        } else {
            MutationPhase::Failed
        };
        self.phase.send_replace(phase);
        // The caller may have stopped waiting; the outcome is already applied.
        let _ = reply.send(result);
        phase
    }

    fn notify(&self, notification: Notification) {
        if self.collection.is_abandoned() {
            debug!(message = %notification.message, "dropping notification for abandoned editor");
            return;
        }
        self.notifier.notify(notification);
    }

    async fn create(
        &self,
        owner_id: &str,
        draft: LinkDraft,
        display_order: i64,
    ) -> LinkResult<Link> {
        let client = self.collection.client();
        match client
            .create_link(owner_id, draft.title(), draft.url(), display_order)
            .await
        {
            Ok(link) => {
                if link.owner_id == owner_id {
                    let appended = link.clone();
                    let _ = self
                        .collection
                        .update(|links| {
                            links.push(appended);
                            Ok::<_, LinkError>(())
                        })
                        .await;
                } else {
                    warn!(link_id = link.id, "created link belongs to another owner; not shown");
                }
                self.notify(Notification::success("Link added successfully"));
                Ok(link)
            }
            Err(err) => {
                self.notify(Notification::error(err.to_string()));
                Err(err.into())
            }
        }
    }

    async fn update(&self, id: LinkId, changes: LinkChanges) -> LinkResult<()> {
        match self.collection.client().update_link(id, &changes).await {
            Ok(()) => {
                let _ = self
                    .collection
                    .update(|links| {
                        if let Some(link) = links.iter_mut().find(|link| link.id == id) {
                            changes.apply_to(link);
                        }
                        Ok::<_, LinkError>(())
                    })
                    .await;
                Ok(())
            }
            Err(err) => {
                self.notify(Notification::error(format!("Failed to update link: {err}")));
                Err(err.into())
            }
        }
    }

    async fn delete(&self, id: LinkId) -> LinkResult<()> {
        match self.collection.client().delete_link(id).await {
            Ok(()) => {
                self.notify(Notification::info("Link deleted"));
                Ok(())
            }
            Err(err) => {
                warn!(link_id = id, error = %err, "delete failed; link stays hidden until refresh");
                self.notify(Notification::error(format!("Failed to delete link: {err}")));
                Err(err.into())
            }
        }
    }

    /// Write `display_order = index` for each link, in index order, stopping
    /// at the first failure.
    async fn persist_order(&self, order: &[LinkId]) -> LinkResult<()> {
        let client = self.collection.client();
        for (index, &id) in order.iter().enumerate() {
            if let Err(source) = client
                .update_link(id, &LinkChanges::order(index as i64))
                .await
            {
                warn!(link_id = id, index, error = %source, "order write failed");
                self.notify(Notification::error("Failed to save order"));
                return Err(LinkError::ReorderPersist {
                    written: index,
                    total: order.len(),
                    source,
                });
            }
        }
        debug!(links = order.len(), "order saved");
        Ok(())
    }

    /// A failed reload leaves the collection marked stale (see
    /// [`LinkCollection::is_stale`]) until the next successful load.
    async fn reload(&self) {
        if let Err(err) = self.collection.load().await {
            warn!(error = %err, "reload failed; list stays stale until the next load");
        }
    }
}
