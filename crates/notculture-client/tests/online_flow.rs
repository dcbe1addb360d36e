//! End-to-end online play: two sessions over one shared in-memory store,
//! exercising roll fanout, question broadcast, answer resolution,
//! movement replication, and the lock-timeout safety net.
//!
//! Runs under paused Tokio time, so animation ticks and timeouts resolve
//! deterministically.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notculture_client::{Content, OnlineSession, SessionConfig, SyncEffect};
use notculture_model::{Category, QuestionId, RoomCode, RoomDoc};
use notculture_questions::{CulturePool, CulturePrompt, NotCard, NotDeck, Question, QuestionPool};
use notculture_room::RoomService;
use notculture_store::{MemoryStore, RoomStore, StoreError, TxDecision, TxOutcome};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

// =========================================================================
// Helpers
// =========================================================================

/// Opt-in log output for debugging: `RUST_LOG=debug cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn content() -> Content {
    let questions = Category::ALL
        .iter()
        .flat_map(|&category| {
            (1..=6).map(move |difficulty| Question {
                id: QuestionId::new(format!("{category:?}-{difficulty}")),
                category,
                difficulty,
                prompt: "?".into(),
                answers: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_index: 1,
            })
        })
        .collect();
    Content {
        questions: QuestionPool::new(questions),
        culture: CulturePool::new(
            (0..8)
                .map(|i| CulturePrompt {
                    id: format!("c{i}"),
                    prompt: format!("perform {i}"),
                    answers: (0..10).map(|j| format!("a{j}")).collect(),
                })
                .collect(),
        ),
        not_cards: NotDeck::new(
            (0..10)
                .map(|i| NotCard {
                    id: format!("n{i}"),
                    answers: (0..6).map(|j| format!("w{j}")).collect(),
                })
                .collect(),
        ),
    }
}

fn fast_config() -> SessionConfig {
    SessionConfig {
        lock_timeout: Duration::from_millis(200),
        move_tick: Duration::from_millis(10),
    }
}

/// Drains effects until one matches, failing the test on timeout.
async fn wait_for<F>(
    rx: &mut mpsc::UnboundedReceiver<SyncEffect>,
    description: &str,
    mut matches: F,
) -> SyncEffect
where
    F: FnMut(&SyncEffect) -> bool,
{
    timeout(Duration::from_secs(60), async {
        loop {
            let effect = rx.recv().await.expect("effect stream closed");
            if matches(&effect) {
                return effect;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {description}"))
}

// =========================================================================
// Full turn flow across two clients
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_trivia_turn_replicates_across_clients() {
    init_tracing();
    let store = MemoryStore::new();
    let lobby = RoomService::new(store.clone());
    let (code, alice) = lobby.create_room("Alice").await.unwrap();
    let bob = lobby.join_room(&code, "Bob", None).await.unwrap();

    let (mut session_a, mut effects_a) =
        OnlineSession::with_config(RoomService::new(store.clone()), content(), fast_config());
    let (mut session_b, mut effects_b) =
        OnlineSession::with_config(RoomService::new(store.clone()), content(), fast_config());
    session_a.start(code.clone(), alice.clone(), None).await.unwrap();
    session_b.start(code.clone(), bob.clone(), None).await.unwrap();

    wait_for(&mut effects_a, "initial roster on A", |e| {
        matches!(e, SyncEffect::Roster { players, .. } if players.len() == 2)
    })
    .await;
    wait_for(&mut effects_b, "initial roster on B", |e| {
        matches!(e, SyncEffect::Roster { players, .. } if players.len() == 2)
    })
    .await;

    // Alice rolls: the event fans out to every client, herself included.
    session_a.request_roll().await.unwrap();
    let rolled = wait_for(&mut effects_a, "dice on A", |e| {
        matches!(e, SyncEffect::DiceRolled { .. })
    })
    .await;
    match &rolled {
        SyncEffect::DiceRolled { is_my_turn, .. } => assert!(is_my_turn),
        _ => unreachable!(),
    }
    let on_b = wait_for(&mut effects_b, "dice on B", |e| {
        matches!(e, SyncEffect::DiceRolled { .. })
    })
    .await;
    match &on_b {
        SyncEffect::DiceRolled { is_my_turn, .. } => {
            assert!(!is_my_turn, "only the turn-holder drives game logic");
        }
        _ => unreachable!(),
    }
    assert!(session_a.state().turn_locked, "roll request locks the turn");

    // The turn-holder drives the logic with a fixed value: 0 + 2 lands on
    // a plain trivia tile.
    session_a.process_roll(2).await.unwrap();

    wait_for(&mut effects_b, "question on B", |e| {
        matches!(e, SyncEffect::QuestionOpened { .. })
    })
    .await;
    let state_b = session_b.state();
    assert!(state_b.show_question_modal, "modal appears identically everywhere");
    let question_b = state_b.active_question.expect("B resolved the question locally");

    // Alice answers correctly (content sets correct_index = 1).
    let result = session_a.submit_answer(1).await.unwrap();
    assert!(result.was_correct);
    let resolved = wait_for(&mut effects_b, "answer on B", |e| {
        matches!(e, SyncEffect::AnswerResolved { .. })
    })
    .await;
    match resolved {
        SyncEffect::AnswerResolved { result, by_me } => {
            assert!(!by_me, "B cues the feedback sound");
            assert_eq!(result.correct_index, question_b.correct_index);
        }
        _ => unreachable!(),
    }

    // Resolving the answer animates the move, writes the position, and
    // advances the turn for everyone.
    session_a.conclude_answer(true).await.unwrap();

    wait_for(&mut effects_b, "turn handoff on B", |e| {
        matches!(e, SyncEffect::Roster { turn_index: 1, .. })
    })
    .await;
    wait_for(&mut effects_b, "movement on B", |e| {
        matches!(e, SyncEffect::StartMove { player: 1, from: 0, steps: 2 })
    })
    .await;

    // B's replica converges once its local animation finishes.
    timeout(Duration::from_secs(60), async {
        loop {
            let state = session_b.state();
            if state.player(1).map(|p| p.position) == Some(2) && state.current_turn_index == 1
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("B converged on the new position and turn");

    let state_a = session_a.state();
    assert!(!state_a.turn_locked, "turn fully resolved");
    assert_eq!(state_a.player(1).map(|p| p.position), Some(2));

    session_a.stop().await;
    session_b.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_roll_rejected_for_non_holder_unlocks_immediately() {
    init_tracing();
    let store = MemoryStore::new();
    let lobby = RoomService::new(store.clone());
    let (code, _alice) = lobby.create_room("Alice").await.unwrap();
    let bob = lobby.join_room(&code, "Bob", None).await.unwrap();

    let (mut session_b, mut effects_b) =
        OnlineSession::with_config(RoomService::new(store.clone()), content(), fast_config());
    session_b.start(code.clone(), bob.clone(), None).await.unwrap();
    wait_for(&mut effects_b, "roster", |e| matches!(e, SyncEffect::Roster { .. })).await;

    let result = session_b.request_roll().await;
    assert!(result.is_err(), "not Bob's turn");
    assert!(!session_b.state().turn_locked, "rejected roll leaves no lock behind");

    session_b.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_propagates_as_hard_reset() {
    init_tracing();
    let store = MemoryStore::new();
    let lobby = RoomService::new(store.clone());
    let (code, alice) = lobby.create_room("Alice").await.unwrap();
    let bob = lobby.join_room(&code, "Bob", None).await.unwrap();
    lobby.update_position(&code, &alice, 12).await.unwrap();

    let (mut session_b, mut effects_b) = OnlineSession::with_config(
        RoomService::new(store.clone()),
        content(),
        fast_config(),
    );
    session_b.start(code.clone(), bob, None).await.unwrap();
    wait_for(&mut effects_b, "roster", |e| matches!(e, SyncEffect::Roster { .. })).await;

    lobby.reset_room(&code).await.unwrap();

    wait_for(&mut effects_b, "hard reset", |e| matches!(e, SyncEffect::HardReset)).await;
    timeout(Duration::from_secs(60), async {
        loop {
            let state = session_b.state();
            if state.players.is_empty()
                || state.players.iter().all(|p| p.position == 0)
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("positions zeroed after reset");

    session_b.stop().await;
}

// =========================================================================
// Lock-timeout safety unlock (dropped write)
// =========================================================================

/// A store that can silently swallow writes while still running
/// transaction closures — simulating an accepted-then-lost mutation.
#[derive(Clone)]
struct LossyStore {
    inner: MemoryStore,
    dropping: Arc<AtomicBool>,
}

impl LossyStore {
    fn new(inner: MemoryStore) -> Self {
        Self { inner, dropping: Arc::new(AtomicBool::new(false)) }
    }

    fn drop_writes(&self, on: bool) {
        self.dropping.store(on, Ordering::SeqCst);
    }

    fn is_dropping(&self) -> bool {
        self.dropping.load(Ordering::SeqCst)
    }
}

impl RoomStore for LossyStore {
    async fn read(&self, code: &RoomCode) -> Result<Option<RoomDoc>, StoreError> {
        self.inner.read(code).await
    }

    async fn write(&self, code: &RoomCode, doc: RoomDoc) -> Result<(), StoreError> {
        if self.is_dropping() {
            return Ok(());
        }
        self.inner.write(code, doc).await
    }

    async fn update<F>(&self, code: &RoomCode, f: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut RoomDoc) + Send,
    {
        if self.is_dropping() {
            let _ = f;
            return Ok(true);
        }
        self.inner.update(code, f).await
    }

    async fn transaction<F>(&self, code: &RoomCode, mut f: F) -> Result<TxOutcome, StoreError>
    where
        F: FnMut(Option<&RoomDoc>) -> TxDecision + Send,
    {
        if self.is_dropping() {
            // Run the closure against current state (so callers observe a
            // "successful" commit) but discard the result.
            let doc = self.inner.read(code).await?;
            let _ = f(doc.as_ref());
            return Ok(TxOutcome::Committed);
        }
        self.inner.transaction(code, f).await
    }

    async fn subscribe(
        &self,
        code: &RoomCode,
    ) -> Result<watch::Receiver<Option<RoomDoc>>, StoreError> {
        self.inner.subscribe(code).await
    }

    async fn delete(&self, code: &RoomCode) -> Result<(), StoreError> {
        self.inner.delete(code).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_lock_times_out_when_roll_write_is_lost() {
    init_tracing();
    let memory = MemoryStore::new();
    let lobby = RoomService::new(memory.clone());
    let (code, alice) = lobby.create_room("Alice").await.unwrap();
    lobby.join_room(&code, "Bob", None).await.unwrap();

    let lossy = LossyStore::new(memory.clone());
    let (mut session_a, mut effects_a) = OnlineSession::with_config(
        RoomService::new(lossy.clone()),
        content(),
        fast_config(),
    );
    session_a.start(code.clone(), alice.clone(), None).await.unwrap();
    wait_for(&mut effects_a, "roster", |e| matches!(e, SyncEffect::Roster { .. })).await;

    // The roll is "accepted" but the write never lands, so no roll event
    // ever fans back out.
    lossy.drop_writes(true);
    session_a.request_roll().await.unwrap();
    assert!(session_a.state().turn_locked);

    // The bounded-time safety unlock clears the dangling lock.
    timeout(Duration::from_secs(60), async {
        loop {
            if !session_a.state().turn_locked {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("safety unlock fired");

    session_a.stop().await;
}
