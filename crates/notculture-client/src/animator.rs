//! The step-movement animator: one tile per fixed tick.
//!
//! Each moving player gets its own explicit [`AnimationHandle`] that can
//! be queried, cancelled, or awaited. Animations for *different* players
//! run concurrently; a second request for the *same* player is rejected
//! with [`AnimatorError::Busy`] rather than queued — the caller either
//! awaits the running handle or drops the request.
//!
//! Position updates and completions are delivered as [`StepEvent`]s on a
//! channel, so a single consumer (the session loop or the local driver)
//! applies them to the reducer in order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notculture_rules::{FINISH, MOVE_TICK_MS};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::AnimatorError;
use crate::state::LocalPlayerId;

/// One step or terminal event of a movement animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// The player advanced one tile.
    Step { player: LocalPlayerId, position: u8 },
    /// The animation ran to completion. Sent exactly once.
    Finished { player: LocalPlayerId, position: u8 },
    /// The animation was cancelled before completing.
    Cancelled { player: LocalPlayerId },
}

/// Handle to one in-flight animation.
pub struct AnimationHandle {
    player: LocalPlayerId,
    done: oneshot::Receiver<u8>,
}

impl AnimationHandle {
    pub fn player(&self) -> LocalPlayerId {
        self.player
    }

    /// Waits for the animation to complete, returning the final position,
    /// or `None` if it was cancelled.
    pub async fn finished(self) -> Option<u8> {
        self.done.await.ok()
    }
}

/// Spawns and tracks per-player movement animations.
///
/// Cheap to clone; clones share the same running set and event channel.
#[derive(Clone)]
pub struct Animator {
    tick: Duration,
    running: Arc<Mutex<HashMap<LocalPlayerId, JoinHandle<()>>>>,
    events: mpsc::UnboundedSender<StepEvent>,
}

impl Animator {
    /// Creates an animator and the receiving end of its event stream.
    pub fn new(tick: Duration) -> (Self, mpsc::UnboundedReceiver<StepEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let animator = Self {
            tick,
            running: Arc::new(Mutex::new(HashMap::new())),
            events,
        };
        (animator, receiver)
    }

    /// An animator ticking at the standard move interval.
    pub fn standard() -> (Self, mpsc::UnboundedReceiver<StepEvent>) {
        Self::new(Duration::from_millis(MOVE_TICK_MS))
    }

    /// Starts an animation: `steps` ticks of one tile each, stopping early
    /// at the finish tile. Completion is reported exactly once, both on
    /// the event stream and through the returned handle.
    pub fn start(
        &self,
        player: LocalPlayerId,
        from: u8,
        steps: u8,
    ) -> Result<AnimationHandle, AnimatorError> {
        let mut running = self.running.lock().expect("animator lock");
        if running.get(&player).is_some_and(|task| !task.is_finished()) {
            return Err(AnimatorError::Busy(player));
        }

        let (done_tx, done_rx) = oneshot::channel();
        let events = self.events.clone();
        let running_map = Arc::clone(&self.running);
        let tick = self.tick;

        let task = tokio::spawn(async move {
            let mut position = from.min(FINISH);
            for _ in 0..steps {
                if position >= FINISH {
                    break;
                }
                tokio::time::sleep(tick).await;
                position += 1;
                let _ = events.send(StepEvent::Step { player, position });
            }
            running_map.lock().expect("animator lock").remove(&player);
            let _ = events.send(StepEvent::Finished { player, position });
            let _ = done_tx.send(position);
        });

        // Inserted under the same lock the task must take to remove
        // itself, so the entry can never be leapfrogged.
        running.insert(player, task);
        Ok(AnimationHandle { player, done: done_rx })
    }

    pub fn is_animating(&self, player: LocalPlayerId) -> bool {
        self.running
            .lock()
            .expect("animator lock")
            .get(&player)
            .is_some_and(|task| !task.is_finished())
    }

    /// Cancels a player's animation. Returns whether one was running.
    pub fn cancel(&self, player: LocalPlayerId) -> bool {
        let task = self.running.lock().expect("animator lock").remove(&player);
        match task {
            Some(task) if !task.is_finished() => {
                task.abort();
                let _ = self.events.send(StepEvent::Cancelled { player });
                true
            }
            _ => false,
        }
    }

    /// Cancels every in-flight animation (hard reset path).
    pub fn cancel_all(&self) {
        let tasks: Vec<(LocalPlayerId, JoinHandle<()>)> = {
            let mut running = self.running.lock().expect("animator lock");
            running.drain().collect()
        };
        for (player, task) in tasks {
            if !task.is_finished() {
                task.abort();
                let _ = self.events.send(StepEvent::Cancelled { player });
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Uses `start_paused` so the tick sleeps resolve deterministically.

    use super::*;

    fn fast_animator() -> (Animator, mpsc::UnboundedReceiver<StepEvent>) {
        Animator::new(Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_steps_once_per_tick_then_finishes() {
        let (animator, mut events) = fast_animator();
        let handle = animator.start(1, 5, 3).unwrap();

        assert_eq!(events.recv().await, Some(StepEvent::Step { player: 1, position: 6 }));
        assert_eq!(events.recv().await, Some(StepEvent::Step { player: 1, position: 7 }));
        assert_eq!(events.recv().await, Some(StepEvent::Step { player: 1, position: 8 }));
        assert_eq!(
            events.recv().await,
            Some(StepEvent::Finished { player: 1, position: 8 })
        );
        assert_eq!(handle.finished().await, Some(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_steps_completes_immediately() {
        let (animator, mut events) = fast_animator();
        let handle = animator.start(2, 4, 0).unwrap();

        assert_eq!(
            events.recv().await,
            Some(StepEvent::Finished { player: 2, position: 4 })
        );
        assert_eq!(handle.finished().await, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_clamps_at_finish() {
        let (animator, mut events) = fast_animator();
        let handle = animator.start(1, 45, 6).unwrap();

        assert_eq!(handle.finished().await, Some(FINISH));
        let mut last_step = None;
        while let Ok(event) = events.try_recv() {
            if let StepEvent::Step { position, .. } = event {
                last_step = Some(position);
            }
        }
        assert_eq!(last_step, Some(FINISH), "steps stop at the finish tile");
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_player_second_request_is_busy() {
        let (animator, _events) = fast_animator();
        let _handle = animator.start(1, 0, 5).unwrap();

        assert!(matches!(animator.start(1, 0, 2), Err(AnimatorError::Busy(1))));
        assert!(animator.is_animating(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_players_animate_concurrently() {
        let (animator, _events) = fast_animator();
        let first = animator.start(1, 0, 2).unwrap();
        let second = animator.start(2, 10, 2).unwrap();

        assert_eq!(first.finished().await, Some(2));
        assert_eq!(second.finished().await, Some(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_can_animate_again_after_completion() {
        let (animator, _events) = fast_animator();
        animator.start(1, 0, 1).unwrap().finished().await.unwrap();
        assert!(animator.start(1, 1, 1).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reports_and_unblocks_player() {
        let (animator, mut events) = fast_animator();
        let handle = animator.start(1, 0, 50).unwrap();

        assert!(animator.cancel(1));
        assert_eq!(handle.finished().await, None, "cancelled handle yields None");
        assert!(!animator.is_animating(1));
        assert!(animator.start(1, 0, 1).is_ok());

        let mut saw_cancelled = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, StepEvent::Cancelled { player: 1 }) {
                saw_cancelled = true;
            }
        }
        assert!(saw_cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_idle_player_is_false() {
        let (animator, _events) = fast_animator();
        assert!(!animator.cancel(7));
    }
}
