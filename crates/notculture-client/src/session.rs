//! The online session: one constructible object per joined room.
//!
//! `OnlineSession` owns everything the original protocol kept in
//! module-level singletons — the subscription, the diff tracker, the
//! last-processed event keys, the turn-lock timeout — behind an explicit
//! `start(room_code)` / `stop()` lifecycle, so multiple instances never
//! collide through shared globals.
//!
//! Internally a single task drives the session with `tokio::select!` over
//! the snapshot stream, the animator's step events, a command channel,
//! and the lock-timeout deadline. All reducer mutations happen on that
//! task or in short lock scopes of the turn-driver methods; no lock is
//! ever held across an await.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use notculture_model::{
    AnswerResult, NotCardData, PlayerId, RoomCode, RoomDoc, TeamId, TileKind,
    TilePayload,
};
use notculture_questions::{CulturePool, NotCard, NotDeck, QuestionPool};
use notculture_room::RoomService;
use notculture_rules::{MOVE_TICK_MS, destination, is_culture, is_not, trivia_category,
    unix_now_ms};
use notculture_store::RoomStore;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::animator::{Animator, StepEvent};
use crate::diff::{SyncEffect, SyncTracker};
use crate::error::ClientError;
use crate::state::{GameState, PlayMode};
use crate::Action;

/// Tunables for the online session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Safety unlock: if no roll event arrives within this window after a
    /// roll request, the turn lock is force-cleared (guards a dropped
    /// write, not a true cancellation protocol).
    pub lock_timeout: Duration,
    /// Movement animation tick.
    pub move_tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(10),
            move_tick: Duration::from_millis(MOVE_TICK_MS),
        }
    }
}

/// The pre-loaded content pools this client plays with.
pub struct Content {
    pub questions: QuestionPool,
    pub culture: CulturePool,
    pub not_cards: NotDeck,
}

enum SessionCmd {
    ArmLockTimeout,
    Stop,
}

/// A client's connection to one online room.
pub struct OnlineSession<S: RoomStore> {
    service: Arc<RoomService<S>>,
    config: SessionConfig,
    state: Arc<StdMutex<GameState>>,
    effects: mpsc::UnboundedSender<SyncEffect>,
    content: Arc<StdMutex<Content>>,
    animator: Option<Animator>,
    cmds: Option<mpsc::UnboundedSender<SessionCmd>>,
    task: Option<JoinHandle<()>>,
    room_code: Option<RoomCode>,
    me: Option<PlayerId>,
    my_team: Option<TeamId>,
}

impl<S: RoomStore> OnlineSession<S> {
    /// Creates a session and the effect stream the UI consumes.
    pub fn new(
        service: RoomService<S>,
        content: Content,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEffect>) {
        Self::with_config(service, content, SessionConfig::default())
    }

    pub fn with_config(
        service: RoomService<S>,
        content: Content,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEffect>) {
        let (effects, receiver) = mpsc::unbounded_channel();
        let mut state = GameState::new();
        state.apply(Action::SetPlayMode(PlayMode::Online));
        let session = Self {
            service: Arc::new(service),
            config,
            state: Arc::new(StdMutex::new(state)),
            effects,
            content: Arc::new(StdMutex::new(content)),
            animator: None,
            cmds: None,
            task: None,
            room_code: None,
            me: None,
            my_team: None,
        };
        (session, receiver)
    }

    /// A cloned snapshot of the reducer state, for rendering and tests.
    pub fn state(&self) -> GameState {
        self.state.lock().expect("state lock").clone()
    }

    /// Dispatches a local-only action (modal toggles and the like).
    pub fn dispatch(&self, action: Action) {
        self.state.lock().expect("state lock").apply(action);
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.room_code.as_ref()
    }

    pub fn service(&self) -> &RoomService<S> {
        &self.service
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Subscribes to the room and starts the session task. An already
    /// running session is stopped first.
    pub async fn start(
        &mut self,
        code: RoomCode,
        me: PlayerId,
        my_team: Option<TeamId>,
    ) -> Result<(), ClientError> {
        self.stop().await;

        // A fresh room must not inherit the previous room's positions,
        // or the monotonic sync guard would reject its lower values.
        self.state.lock().expect("state lock").apply(Action::ResetGame);

        let snapshots = self.service.store().subscribe(&code).await?;
        let (animator, anim_events) = Animator::new(self.config.move_tick);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let task = SessionTask {
            service: Arc::clone(&self.service),
            state: Arc::clone(&self.state),
            effects: self.effects.clone(),
            content: Arc::clone(&self.content),
            animator: animator.clone(),
            tracker: SyncTracker::new(),
            code: code.clone(),
            me: me.clone(),
            my_team: my_team.clone(),
            lock_timeout: self.config.lock_timeout,
            ttl_ms: self.service.options().ttl_ms(),
        };
        self.task = Some(tokio::spawn(task.run(snapshots, anim_events, cmd_rx)));

        self.animator = Some(animator);
        self.cmds = Some(cmd_tx);
        self.room_code = Some(code);
        self.me = Some(me);
        self.my_team = my_team;
        Ok(())
    }

    /// Stops the session task and cancels in-flight animations. Safe to
    /// call when not started.
    pub async fn stop(&mut self) {
        if let Some(cmds) = self.cmds.take() {
            let _ = cmds.send(SessionCmd::Stop);
        }
        if let Some(animator) = self.animator.take() {
            animator.cancel_all();
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.room_code = None;
        self.me = None;
        self.my_team = None;
    }

    /// Leaves the room (removing this player server-side) and stops.
    pub async fn leave(&mut self) -> Result<(), ClientError> {
        if let (Some(code), Some(me)) = (self.room_code.clone(), self.me.clone()) {
            match &self.my_team {
                Some(team) => self.service.leave_team(&code, &me, team).await?,
                None => self.service.leave_room(&code, &me).await?,
            }
        }
        self.stop().await;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Turn drivers (called by the UI on the authorized client)
    // -----------------------------------------------------------------

    /// Requests a dice roll for this client.
    ///
    /// Locks the turn locally and arms the safety-unlock timeout; the
    /// actual dice animation is driven by the roll event fanning back out
    /// through the snapshot stream. A rejected roll unlocks immediately.
    pub async fn request_roll(&self) -> Result<(), ClientError> {
        let (code, me) = self.identity()?;
        {
            let mut state = self.state.lock().expect("state lock");
            if state.turn_locked {
                return Err(ClientError::TurnLocked);
            }
            state.apply(Action::LockTurn);
        }
        if let Some(cmds) = &self.cmds {
            let _ = cmds.send(SessionCmd::ArmLockTimeout);
        }

        let result = match &self.my_team {
            Some(_) => self.service.roll_dice_team(&code, &me).await,
            None => self.service.roll_dice(&code, &me).await,
        };
        if let Err(err) = result {
            self.state.lock().expect("state lock").apply(Action::UnlockTurn);
            return Err(err.into());
        }
        Ok(())
    }

    /// Drives the game logic for a roll. Called on the turn-holding
    /// client once the dice animation completes; other clients only
    /// observe the resulting writes.
    pub async fn process_roll(&self, value: u8) -> Result<(), ClientError> {
        let (code, _me) = self.identity()?;
        let animator = self.animator.as_ref().ok_or(ClientError::NotStarted)?;
        let (player_id, position, turn_index) = {
            let state = self.state.lock().expect("state lock");
            let player = state.current_player().ok_or(ClientError::NotStarted)?;
            (player.id, player.position, state.current_turn_index)
        };
        let dest = destination(position, value);

        if is_culture(dest) {
            // Culture skips trivia entirely: move, then activate the
            // performance minigame with the seed-derived prompt.
            let prompt_index = {
                let content = self.content.lock().expect("content lock");
                content.culture.index_for(turn_index, dest)
            }
            .ok_or(ClientError::NoContent)?;

            self.animate_own_move(animator, player_id, position, value).await;
            self.write_position(dest).await?;
            self.service
                .activate_tile_event(&code, TilePayload::Culture { prompt_index })
                .await?;
            return Ok(());
        }

        if is_not(dest) {
            let card = {
                let mut content = self.content.lock().expect("content lock");
                content.not_cards.draw(&mut rand::rng())
            }
            .ok_or(ClientError::NoContent)?;

            self.animate_own_move(animator, player_id, position, value).await;
            self.write_position(dest).await?;
            self.service
                .activate_tile_event(
                    &code,
                    TilePayload::Not {
                        card: NotCardData { id: card.id, answers: card.answers },
                    },
                )
                .await?;
            return Ok(());
        }

        // Trivia: category from the current path index, difficulty from
        // the roll.
        let category = trivia_category(position, &mut rand::rng());
        let question = {
            let mut content = self.content.lock().expect("content lock");
            content.questions.draw(category, value, &mut rand::rng())
        }
        .ok_or(ClientError::NoContent)?;

        {
            let mut state = self.state.lock().expect("state lock");
            state.apply(Action::SetPendingCategory(Some(category)));
            state.apply(Action::SetActiveQuestion {
                question: question.clone(),
                roll: value,
            });
        }
        self.service.set_current_question(&code, question.id).await?;
        Ok(())
    }

    /// Grades the active question locally and broadcasts the result.
    pub async fn submit_answer(&self, selected_index: u8) -> Result<AnswerResult, ClientError> {
        let (code, _me) = self.identity()?;
        let question = self
            .state
            .lock()
            .expect("state lock")
            .active_question
            .clone()
            .ok_or(ClientError::NoActiveQuestion)?;

        let result = AnswerResult {
            selected_index,
            correct_index: question.correct_index,
            was_correct: selected_index == question.correct_index,
        };
        self.state
            .lock()
            .expect("state lock")
            .apply(Action::SetAnswerResult(Some(result)));
        self.service.submit_answer(&code, result).await?;
        Ok(result)
    }

    /// Resolves the answered question: a correct answer moves the pending
    /// steps and then advances the turn; an incorrect one advances
    /// immediately.
    pub async fn conclude_answer(&self, was_correct: bool) -> Result<(), ClientError> {
        let (code, _me) = self.identity()?;
        let animator = self.animator.as_ref().ok_or(ClientError::NotStarted)?;
        let (player_id, position, steps) = {
            let mut state = self.state.lock().expect("state lock");
            let player = state.current_player().cloned().ok_or(ClientError::NotStarted)?;
            let steps = state.pending_move;
            state.apply(Action::ShowQuestionModal(false));
            state.apply(Action::ClearQuestion);
            state.apply(Action::AdvanceTurn);
            state.apply(Action::UnlockTurn);
            (player.id, player.position, steps)
        };

        // Advance first: clearing the question server-side closes the
        // modal on every client before the movement starts.
        self.write_advance(&code).await?;

        if was_correct && steps > 0 {
            let dest = destination(position, steps);
            self.animate_own_move(animator, player_id, position, steps).await;
            self.write_position(dest).await?;
        }
        Ok(())
    }

    /// Resolves a tile minigame with the judged score: move by the score
    /// (zero allowed), then advance the turn.
    pub async fn resolve_tile(&self, kind: TileKind, score: u8) -> Result<(), ClientError> {
        let (code, _me) = self.identity()?;
        let animator = self.animator.as_ref().ok_or(ClientError::NotStarted)?;
        let (player_id, position) = {
            let mut state = self.state.lock().expect("state lock");
            state.apply(match kind {
                TileKind::Culture => Action::ShowCultureModal(false),
                TileKind::Not => Action::ShowNotModal(false),
            });
            let player = state.current_player().cloned().ok_or(ClientError::NotStarted)?;
            (player.id, player.position)
        };

        let dest = destination(position, score);
        if score > 0 {
            self.animate_own_move(animator, player_id, position, score).await;
        }
        {
            let mut state = self.state.lock().expect("state lock");
            state.apply(Action::AdvanceTurn);
            state.apply(Action::UnlockTurn);
        }
        self.write_position(dest).await?;
        self.write_advance(&code).await?;
        Ok(())
    }

    // -- Judge controls ------------------------------------------------

    pub async fn start_tile_timer(&self) -> Result<(), ClientError> {
        let (code, _) = self.identity()?;
        Ok(self.service.start_tile_timer(&code).await?)
    }

    pub async fn finish_tile_timer_early(&self) -> Result<(), ClientError> {
        let (code, _) = self.identity()?;
        Ok(self.service.finish_tile_timer_early(&code).await?)
    }

    pub async fn submit_tile_score(&self, score: u8) -> Result<(), ClientError> {
        let (code, _) = self.identity()?;
        Ok(self.service.submit_tile_score(&code, score).await?)
    }

    /// Resets the whole game for every client in the room.
    pub async fn reset_room(&self) -> Result<(), ClientError> {
        let (code, _) = self.identity()?;
        match &self.my_team {
            Some(_) => self.service.reset_team_room(&code).await?,
            None => self.service.reset_room(&code).await?,
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn identity(&self) -> Result<(RoomCode, PlayerId), ClientError> {
        match (&self.room_code, &self.me) {
            (Some(code), Some(me)) => Ok((code.clone(), me.clone())),
            _ => Err(ClientError::NotStarted),
        }
    }

    /// Animates this client's own token; steps flow to the reducer
    /// through the session task. A same-player collision just skips the
    /// animation (the position write still lands).
    async fn animate_own_move(
        &self,
        animator: &Animator,
        player_id: u8,
        from: u8,
        steps: u8,
    ) {
        match animator.start(player_id, from, steps) {
            Ok(handle) => {
                handle.finished().await;
            }
            Err(err) => {
                tracing::warn!(%err, "skipping own movement animation");
            }
        }
    }

    async fn write_position(&self, dest: u8) -> Result<(), ClientError> {
        let (code, me) = self.identity()?;
        match &self.my_team {
            Some(team) => self.service.update_team_position(&code, team, dest).await?,
            None => self.service.update_position(&code, &me, dest).await?,
        }
        Ok(())
    }

    async fn write_advance(&self, code: &RoomCode) -> Result<(), ClientError> {
        match &self.my_team {
            Some(_) => self.service.advance_team_turn(code).await?,
            None => self.service.advance_turn(code).await?,
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session task
// ---------------------------------------------------------------------------

/// The state owned by the session's background task.
struct SessionTask<S: RoomStore> {
    service: Arc<RoomService<S>>,
    state: Arc<StdMutex<GameState>>,
    effects: mpsc::UnboundedSender<SyncEffect>,
    content: Arc<StdMutex<Content>>,
    animator: Animator,
    tracker: SyncTracker,
    code: RoomCode,
    me: PlayerId,
    my_team: Option<TeamId>,
    lock_timeout: Duration,
    ttl_ms: u64,
}

impl<S: RoomStore> SessionTask<S> {
    async fn run(
        mut self,
        mut snapshots: watch::Receiver<Option<RoomDoc>>,
        mut anim_events: mpsc::UnboundedReceiver<StepEvent>,
        mut cmds: mpsc::UnboundedReceiver<SessionCmd>,
    ) {
        tracing::info!(room_code = %self.code, player_id = %self.me, "online session started");
        let mut lock_deadline: Option<Instant> = None;
        let mut saw_room = false;

        loop {
            let deadline_at = lock_deadline;
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let doc = snapshots.borrow_and_update().clone();
                    match doc {
                        Some(doc) => {
                            saw_room = true;
                            self.handle_snapshot(&doc, &mut lock_deadline).await;
                        }
                        None if saw_room => {
                            // The room was deleted out from under us.
                            self.animator.cancel_all();
                            self.apply(Action::ResetGame);
                            self.emit(SyncEffect::RoomClosed);
                        }
                        None => {}
                    }
                }
                event = anim_events.recv() => {
                    let Some(event) = event else { break };
                    self.handle_step(event);
                }
                cmd = cmds.recv() => {
                    match cmd {
                        Some(SessionCmd::ArmLockTimeout) => {
                            lock_deadline = Some(Instant::now() + self.lock_timeout);
                        }
                        Some(SessionCmd::Stop) | None => break,
                    }
                }
                _ = async move {
                    match deadline_at {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => {
                    lock_deadline = None;
                    let locked = self.state.lock().expect("state lock").turn_locked;
                    if locked {
                        tracing::warn!(
                            room_code = %self.code,
                            "no roll event before lock timeout — safety unlock"
                        );
                        self.apply(Action::UnlockTurn);
                    }
                }
            }
        }

        tracing::info!(room_code = %self.code, "online session stopped");
    }

    async fn handle_snapshot(&mut self, doc: &RoomDoc, lock_deadline: &mut Option<Instant>) {
        let local_players = self.state.lock().expect("state lock").players.clone();
        let effects = self.tracker.observe(
            doc,
            Some(&self.me),
            self.my_team.as_ref(),
            &local_players,
            unix_now_ms(),
            self.ttl_ms,
        );
        for effect in effects {
            self.handle_effect(effect, lock_deadline).await;
        }
    }

    async fn handle_effect(&mut self, effect: SyncEffect, lock_deadline: &mut Option<Instant>) {
        match &effect {
            SyncEffect::RoomExpired => {
                // Lazily discovered expiry: delete server-side, reset here.
                let _ = self.service.store().delete(&self.code).await;
                self.animator.cancel_all();
                self.apply(Action::ResetGame);
            }

            SyncEffect::HardReset => {
                self.animator.cancel_all();
                self.apply(Action::ResetGame);
                self.content.lock().expect("content lock").questions.reset_used();
            }

            SyncEffect::RoomClosed => {}

            SyncEffect::Roster { players, turn_index, .. } => {
                self.apply(Action::SyncOnlineState {
                    players: players.clone(),
                    turn_index: *turn_index,
                });
            }

            SyncEffect::StartMove { player, from, steps } => {
                if let Err(err) = self.animator.start(*player, *from, *steps) {
                    // Diff suppresses animating slots, so this is a late
                    // completion race at worst.
                    tracing::warn!(%err, "dropping overlapping movement");
                    self.tracker.finish_animation(*player);
                }
            }

            SyncEffect::DiceRolled { .. } => {
                // The awaited event arrived; the safety timeout stands down.
                *lock_deadline = None;
            }

            SyncEffect::QuestionOpened { id, roll_value } => {
                let question = {
                    let mut content = self.content.lock().expect("content lock");
                    let found = content.questions.by_id(id).cloned();
                    if found.is_some() {
                        content.questions.mark_used(id);
                    }
                    found
                };
                match question {
                    Some(question) => self.apply(Action::SetActiveQuestion {
                        question,
                        roll: *roll_value,
                    }),
                    None => {
                        tracing::warn!(question_id = %id, "question id not in local pool — ignoring");
                    }
                }
            }

            SyncEffect::QuestionClosed => self.apply(Action::ShowQuestionModal(false)),

            SyncEffect::AnswerResolved { result, .. } => {
                self.apply(Action::SetAnswerResult(Some(*result)));
            }

            SyncEffect::AnswerCleared => self.apply(Action::SetAnswerResult(None)),

            SyncEffect::TileOpened { payload } => match payload {
                TilePayload::Culture { prompt_index } => {
                    self.apply(Action::SetCulturePromptIndex(Some(*prompt_index)));
                    self.apply(Action::ShowCultureModal(true));
                }
                TilePayload::Not { card } => {
                    self.apply(Action::SetNotCard(Some(NotCard {
                        id: card.id.clone(),
                        answers: card.answers.clone(),
                    })));
                    self.apply(Action::ShowNotModal(true));
                }
            },

            SyncEffect::TileClosed { kind } => self.apply(match kind {
                TileKind::Culture => Action::ShowCultureModal(false),
                TileKind::Not => Action::ShowNotModal(false),
            }),

            SyncEffect::TileTimerStarted { kind, started_at } => self.apply(match kind {
                TileKind::Culture => Action::SetCultureTimerStart(Some(*started_at)),
                TileKind::Not => Action::SetNotTimerStart(Some(*started_at)),
            }),

            SyncEffect::TileScoreRevealed { kind, score } => self.apply(match kind {
                TileKind::Culture => Action::SetCultureScore(Some(*score)),
                TileKind::Not => Action::SetNotScore(Some(*score)),
            }),

            SyncEffect::WinReached { .. } => self.apply(Action::ShowWinModal(true)),
        }

        self.emit(effect);
    }

    fn handle_step(&mut self, event: StepEvent) {
        match event {
            StepEvent::Step { player, position } => {
                self.apply(Action::SetPlayerPosition { id: player, position });
            }
            StepEvent::Finished { player, position } => {
                self.apply(Action::SetPlayerPosition { id: player, position });
                self.tracker.finish_animation(player);
            }
            StepEvent::Cancelled { player } => {
                self.tracker.finish_animation(player);
            }
        }
    }

    fn apply(&self, action: Action) {
        self.state.lock().expect("state lock").apply(action);
    }

    fn emit(&self, effect: SyncEffect) {
        // The UI may have dropped its receiver; the session keeps running.
        let _ = self.effects.send(effect);
    }
}
