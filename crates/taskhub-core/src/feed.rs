use std::future::Future;
use std::pin::pin;

use futures::future::{Either, select};
use taskhub_shared::{Task, TaskChange};
use tracing::{debug, info, warn};

use crate::backend::{ChangeFeed, FeedSubscription};
use crate::error::BackendError;
use crate::realtime::FeedTopic;

/// Applies one change-feed event to the displayed list.
///
/// Inserts append in arrival order, so the list can drift from the
/// `created_at` order of the initial load. Updates and deletes for ids that
/// are not in the list are no-ops.
pub fn apply(mut tasks: Vec<Task>, change: TaskChange) -> Vec<Task> {
    apply_in_place(&mut tasks, change);
    tasks
}

pub fn apply_in_place(tasks: &mut Vec<Task>, change: TaskChange) {
    match change {
        TaskChange::Inserted(task) => tasks.push(task),
        TaskChange::Updated(task) => {
            if let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) {
                *slot = task;
            }
        }
        TaskChange::Deleted { id } => tasks.retain(|t| t.id != id),
    }
}

/// Subscribes once, forwards every change to `on_change` until `stop`
/// resolves or the feed ends, then unsubscribes once.
///
/// A feed that ends on its own is not reopened.
#[tracing::instrument(skip_all, fields(channel = %topic.channel, table = %topic.table))]
pub async fn follow<F, S, C>(feed: &F, topic: &FeedTopic, stop: S, mut on_change: C) -> Result<(), BackendError>
where
    F: ChangeFeed,
    S: Future<Output = ()>,
    C: FnMut(TaskChange),
{
    let mut subscription = feed.subscribe(topic).await?;
    info!("subscribed to change feed");

    {
        let pump = pin!(pump(&mut subscription, &mut on_change));
        let stop = pin!(stop);
        match select(pump, stop).await {
            Either::Left(((), _)) => warn!("change feed ended; live updates stopped"),
            Either::Right(((), _)) => debug!("change feed stop requested"),
        }
    }

    subscription.unsubscribe().await;
    info!("unsubscribed from change feed");
    Ok(())
}

async fn pump<S, C>(subscription: &mut S, on_change: &mut C)
where
    S: FeedSubscription,
    C: FnMut(TaskChange),
{
    while let Some(next) = subscription.next_change().await {
        match next {
            Ok(change) => {
                debug!(kind = change.kind().as_str(), id = change.task_id(), "applying change");
                on_change(change);
            }
            Err(err) => warn!(error = %err, "skipping undecodable change"),
        }
    }
}
