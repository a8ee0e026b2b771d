use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::metrics::{ANSWERS_TOTAL, QUIZ_RUNS_ACTIVE, QUIZ_RUNS_TOTAL};
use crate::models::events::{self, QuizEvent};
use crate::models::session::{
    AnswerOutcome, AnswerResponse, DispatchStatus, HintResponse, NextStep, QuizSnapshot,
    SessionStatus,
};
use crate::models::{
    Achievement, AttemptRecord, Exercise, ExerciseView, Level, LevelMap, LevelProgress,
    PlanetUnlockView, ProgressOverview, UnlockSource,
};
use crate::utils::retry::{retry_async_when, RetryConfig};

use super::achievements::AchievementCatalog;
use super::catalog::ExerciseCatalog;
use super::countdown::{Countdown, CountdownEvent};
use super::dispatcher::{DispatchOutcome, DispatchTicket, SubmissionDispatcher};
use super::mission_api::MissionApi;
use super::navigator::{self, Next};
use super::progress;
use super::quiz_session::{QuizSession, QuizState};
use super::unlock;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tick_interval: Duration,
    pub fetch_retry: RetryConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            fetch_retry: RetryConfig::default(),
        }
    }
}

/// One student's pass through a level.
struct QuizRun {
    id: Uuid,
    student_id: String,
    level_id: String,
    exercises: Vec<Exercise>,
    session: QuizSession,
    countdown: Option<Countdown>,
    dispatcher: Arc<SubmissionDispatcher>,
    attempts: Vec<AttemptRecord>,
    dispatch: Option<DispatchStatus>,
    new_achievements: Vec<Achievement>,
    level_result: Option<LevelProgress>,
    closed: bool,
    events: broadcast::Sender<QuizEvent>,
}

impl QuizRun {
    fn emit(&self, event: QuizEvent) {
        // No subscriber is fine; the UI may poll snapshots instead.
        let _ = self.events.send(event);
    }

    fn stop_countdown(&mut self) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.stop();
        }
    }

    fn is_current(&self, session_id: Uuid) -> bool {
        !self.closed && self.session.id() == session_id
    }

    fn close(&mut self) {
        self.closed = true;
        self.stop_countdown();
    }

    /// Freezes the decided question: stops the timer, keeps the attempt and
    /// prepares the single dispatch for it.
    fn record(&mut self, outcome: AnswerOutcome) -> DispatchTicket {
        self.stop_countdown();

        let exercise_id = self.session.exercise_id().unwrap_or_default().to_string();
        self.attempts.push(AttemptRecord {
            student_id: self.student_id.clone(),
            exercise_id: exercise_id.clone(),
            chosen_answer: outcome.selected_answer.clone(),
            is_correct: outcome.is_correct,
            score_awarded: outcome.score,
            time_taken_seconds: outcome.time_taken_seconds,
            hints_used: outcome.hints_used,
            created_at: Utc::now(),
        });
        self.dispatch = Some(DispatchStatus::Pending);
        self.new_achievements.clear();

        let cause = if outcome.timed_out() { "timeout" } else { "submitted" };
        let correct = if outcome.is_correct { "true" } else { "false" };
        ANSWERS_TOTAL.with_label_values(&[cause, correct]).inc();

        tracing::info!(
            "Question answered: run={}, exercise={}, cause={}, correct={}, score={}",
            self.id,
            exercise_id,
            cause,
            outcome.is_correct,
            outcome.score
        );

        self.emit(QuizEvent::Answered(events::Answered {
            session_id: self.session.id(),
            exercise_id: exercise_id.clone(),
            cause: outcome.cause,
            is_correct: outcome.is_correct,
            score: outcome.score,
            timestamp: Utc::now(),
        }));

        DispatchTicket {
            session_id: self.id,
            student_id: self.student_id.clone(),
            exercise_id,
            chosen_answer: outcome.selected_answer,
            time_taken_seconds: outcome.time_taken_seconds,
            hints_used: outcome.hints_used,
        }
    }

    /// Applies a dispatch result unless the question it belongs to has been
    /// replaced or the run was closed in the meantime.
    fn apply_dispatch(&mut self, session_id: Uuid, outcome: DispatchOutcome) -> bool {
        if !self.is_current(session_id) {
            tracing::debug!(
                "Discarding stale dispatch result for session {} (run {})",
                session_id,
                self.id
            );
            return false;
        }

        match outcome {
            DispatchOutcome::Accepted {
                correct,
                achievements,
            } => {
                if let (Some(remote), Some(local)) = (correct, self.session.outcome()) {
                    if remote != local.is_correct {
                        tracing::warn!(
                            "Backend graded exercise {} differently (remote={}, local={})",
                            self.session.exercise_id().unwrap_or_default(),
                            remote,
                            local.is_correct
                        );
                    }
                }
                for achievement in &achievements {
                    self.emit(QuizEvent::AchievementUnlocked(events::AchievementUnlocked {
                        achievement: achievement.clone(),
                        timestamp: Utc::now(),
                    }));
                }
                self.new_achievements = achievements;
                self.dispatch = Some(DispatchStatus::Accepted { correct });
            }
            DispatchOutcome::Failed { message } => {
                self.emit(QuizEvent::warning(format!(
                    "Your answer could not be saved: {}",
                    message
                )));
                self.dispatch = Some(DispatchStatus::Failed { message });
            }
            DispatchOutcome::Duplicate => {}
        }
        true
    }

    fn finish_level(&mut self) -> LevelProgress {
        if let Some(result) = &self.level_result {
            return result.clone();
        }
        self.stop_countdown();

        let result = progress::summarize_level(
            &self.student_id,
            &self.level_id,
            &self.exercises,
            &self.attempts,
        );
        tracing::info!(
            "Level completed: run={}, level={}, completed={}/{}, score={}",
            self.id,
            self.level_id,
            result.completed_exercises,
            result.total_exercises,
            result.score
        );
        QUIZ_RUNS_TOTAL.with_label_values(&["completed"]).inc();

        self.emit(QuizEvent::LevelComplete(events::LevelComplete {
            level_id: self.level_id.clone(),
            result: result.clone(),
            timestamp: Utc::now(),
        }));
        self.level_result = Some(result.clone());
        result
    }

    fn snapshot(&self) -> QuizSnapshot {
        let outcome = self.session.outcome();
        let exercise = self.session.exercise();
        let answered = outcome.is_some();

        let status = if self.level_result.is_some() {
            SessionStatus::LevelComplete
        } else {
            match self.session.state() {
                QuizState::Idle => SessionStatus::Idle,
                QuizState::Active { .. } => SessionStatus::Active,
                QuizState::Answered(_) => SessionStatus::Answered,
            }
        };

        QuizSnapshot {
            run_id: self.id,
            session_id: self.session.id(),
            level_id: self.level_id.clone(),
            status,
            position: self
                .session
                .exercise_id()
                .and_then(|id| navigator::position(&self.exercises, id))
                .unwrap_or(0),
            total_exercises: self.exercises.len(),
            exercise: exercise.map(ExerciseView::from),
            remaining_seconds: self.session.remaining_seconds(),
            selected_answer: outcome.and_then(|o| o.selected_answer.clone()),
            is_correct: outcome.map(|o| o.is_correct),
            awarded_score: outcome.map(|o| o.score).unwrap_or(0),
            timed_out: outcome.map(|o| o.timed_out()).unwrap_or(false),
            hints_used: self.session.hints_used(),
            correct_answer: exercise
                .filter(|_| answered)
                .map(|e| e.correct_answer.clone()),
            explanation: exercise
                .filter(|_| answered)
                .and_then(|e| e.explanation.clone()),
            unusable_reason: self.session.unusable().map(|reason| reason.to_string()),
            dispatch: self.dispatch.clone(),
            new_achievements: self.new_achievements.clone(),
            level_result: self.level_result.clone(),
        }
    }
}

/// Countdown consumer for one question. Every event is checked against the
/// question it was started for; anything for a replaced or closed question
/// ends the loop.
async fn drive_countdown(
    run: Arc<Mutex<QuizRun>>,
    session_id: Uuid,
    total_seconds: u32,
    mut events: mpsc::UnboundedReceiver<CountdownEvent>,
) {
    while let Some(event) = events.recv().await {
        let mut guard = run.lock().await;
        if !guard.is_current(session_id) {
            tracing::debug!("Ignoring countdown event for replaced session {}", session_id);
            return;
        }

        match event {
            CountdownEvent::Tick { remaining } => {
                if guard.session.tick(remaining) {
                    let exercise_id = guard.session.exercise_id().unwrap_or_default().to_string();
                    guard.emit(QuizEvent::TimerTick(events::TimerTick {
                        session_id,
                        exercise_id,
                        remaining_seconds: remaining,
                        total_seconds,
                        timestamp: Utc::now(),
                    }));
                }
            }
            CountdownEvent::Expired => {
                let Some(outcome) = guard.session.expire() else {
                    return;
                };
                let ticket = guard.record(outcome);
                let dispatcher = guard.dispatcher.clone();
                drop(guard);

                let result = dispatcher.dispatch(ticket).await;
                run.lock().await.apply_dispatch(session_id, result);
                return;
            }
        }
    }
}

/// Closes a run that left the run map.
async fn retire(student_id: &str, run: Arc<Mutex<QuizRun>>) {
    let mut guard = run.lock().await;
    guard.close();
    QUIZ_RUNS_ACTIVE.dec();
    tracing::info!("Quiz run closed: run={}, student={}", guard.id, student_id);
}

fn prune_channels(
    channels: &mut HashMap<String, broadcast::Sender<QuizEvent>>,
    runs: &HashMap<String, Arc<Mutex<QuizRun>>>,
) {
    channels.retain(|student_id, sender| {
        sender.receiver_count() > 0 || runs.contains_key(student_id)
    });
}

/// Runs quizzes for many students, one independent run per student.
pub struct QuizEngine {
    api: Arc<dyn MissionApi>,
    catalog: ExerciseCatalog,
    achievements: Arc<AchievementCatalog>,
    settings: EngineSettings,
    runs: RwLock<HashMap<String, Arc<Mutex<QuizRun>>>>,
    channels: std::sync::Mutex<HashMap<String, broadcast::Sender<QuizEvent>>>,
}

impl QuizEngine {
    pub fn new(api: Arc<dyn MissionApi>, settings: EngineSettings) -> Self {
        Self {
            catalog: ExerciseCatalog::new(api.clone(), settings.fetch_retry.clone()),
            achievements: Arc::new(AchievementCatalog::new(api.clone())),
            api,
            settings,
            runs: RwLock::new(HashMap::new()),
            channels: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub async fn check_remote(&self) -> EngineResult<()> {
        self.api.ping().await
    }

    pub async fn active_runs(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Event stream for a student; survives across runs.
    pub async fn subscribe(&self, student_id: &str) -> broadcast::Receiver<QuizEvent> {
        let runs = self.runs.read().await;
        self.channel(&runs, student_id).subscribe()
    }

    /// Sender for a student's events. Entries left with neither a receiver
    /// nor a run are dropped on the way; callers hold the runs lock so no
    /// run can appear between the check and the removal.
    fn channel(
        &self,
        runs: &HashMap<String, Arc<Mutex<QuizRun>>>,
        student_id: &str,
    ) -> broadcast::Sender<QuizEvent> {
        let mut channels = self.lock_channels();
        prune_channels(&mut channels, runs);
        channels
            .entry(student_id.to_string())
            .or_insert_with(|| broadcast::channel(EVENT_BUFFER).0)
            .clone()
    }

    fn lock_channels(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<QuizEvent>>> {
        match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Students with an event channel, live or held by a run.
    pub fn event_streams(&self) -> usize {
        self.lock_channels().len()
    }

    async fn fetch<T, F, Fut>(&self, f: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        retry_async_when(self.settings.fetch_retry.clone(), f, EngineError::is_retryable).await
    }

    async fn run(&self, student_id: &str) -> EngineResult<Arc<Mutex<QuizRun>>> {
        self.runs
            .read()
            .await
            .get(student_id)
            .cloned()
            .ok_or_else(|| EngineError::NoActiveQuiz(student_id.to_string()))
    }

    /// Puts `exercise` on screen as a fresh question, arming a countdown for
    /// timed exercises.
    fn load_question(
        &self,
        run: &Arc<Mutex<QuizRun>>,
        guard: &mut QuizRun,
        exercise: Exercise,
    ) -> EngineResult<()> {
        guard.stop_countdown();
        guard.dispatch = None;
        guard.new_achievements.clear();

        let (session, result) = QuizSession::load(exercise, Instant::now());
        guard.session = session;
        result?;

        if let Some(seconds) = guard
            .session
            .exercise()
            .filter(|exercise| exercise.is_timed())
            .map(|exercise| exercise.time_limit_seconds)
        {
            let (countdown, events) = Countdown::start(seconds, self.settings.tick_interval);
            guard.countdown = Some(countdown);
            tokio::spawn(drive_countdown(
                run.clone(),
                guard.session.id(),
                seconds,
                events,
            ));
        }

        tracing::debug!(
            "Question loaded: run={}, exercise={}",
            guard.id,
            guard.session.exercise_id().unwrap_or_default()
        );
        Ok(())
    }

    /// Starts a level for a student, replacing any run in progress. With
    /// `start_at` the run begins at that exercise instead of the first one.
    pub async fn start_level(
        &self,
        student_id: &str,
        level_id: &str,
        start_at: Option<&str>,
    ) -> EngineResult<QuizSnapshot> {
        let exercises = self.catalog.exercises_for_level(level_id).await?;
        let resume = match start_at {
            Some(exercise_id) => Some(self.catalog.exercise(exercise_id).await?),
            None => None,
        };

        // Held until the run is in place: two starts for the same student
        // cannot both miss each other.
        let mut runs = self.runs.write().await;

        let run = Arc::new(Mutex::new(QuizRun {
            id: Uuid::new_v4(),
            student_id: student_id.to_string(),
            level_id: level_id.to_string(),
            exercises,
            session: QuizSession::idle(),
            countdown: None,
            dispatcher: Arc::new(SubmissionDispatcher::new(
                self.api.clone(),
                self.achievements.clone(),
            )),
            attempts: Vec::new(),
            dispatch: None,
            new_achievements: Vec::new(),
            level_result: None,
            closed: false,
            events: self.channel(&runs, student_id),
        }));

        let (loaded, snapshot) = {
            let mut guard = run.lock().await;
            let opening = resume.or_else(|| match navigator::first(&guard.exercises) {
                Next::Exercise(exercise) => Some(exercise.clone()),
                Next::LevelComplete => None,
            });
            let loaded = match opening {
                Some(exercise) => self.load_question(&run, &mut guard, exercise),
                None => {
                    guard.finish_level();
                    Ok(())
                }
            };
            tracing::info!(
                "Quiz run started: run={}, student={}, level={}, exercises={}",
                guard.id,
                student_id,
                level_id,
                guard.exercises.len()
            );
            (loaded, guard.snapshot())
        };

        QUIZ_RUNS_TOTAL.with_label_values(&["started"]).inc();
        QUIZ_RUNS_ACTIVE.inc();
        if let Some(previous) = runs.insert(student_id.to_string(), run) {
            retire(student_id, previous).await;
        }
        drop(runs);

        loaded.map(|_| snapshot)
    }

    pub async fn snapshot(&self, student_id: &str) -> EngineResult<QuizSnapshot> {
        let run = self.run(student_id).await?;
        let guard = run.lock().await;
        Ok(guard.snapshot())
    }

    /// Selecting an option submits it. Answers for a question that is no
    /// longer on screen, or that was already decided, are ignored.
    pub async fn answer(
        &self,
        student_id: &str,
        exercise_id: &str,
        answer: &str,
    ) -> EngineResult<AnswerResponse> {
        let run = self.run(student_id).await?;
        let mut guard = run.lock().await;

        if guard.session.exercise_id() != Some(exercise_id) {
            tracing::debug!(
                "Ignoring answer for exercise {} (current: {:?})",
                exercise_id,
                guard.session.exercise_id()
            );
            return Ok(AnswerResponse {
                accepted: false,
                quiz: guard.snapshot(),
            });
        }

        let Some(outcome) = guard.session.submit(answer, Instant::now()) else {
            return Ok(AnswerResponse {
                accepted: false,
                quiz: guard.snapshot(),
            });
        };

        let session_id = guard.session.id();
        let ticket = guard.record(outcome);
        let dispatcher = guard.dispatcher.clone();
        drop(guard);

        let result = dispatcher.dispatch(ticket).await;

        let mut guard = run.lock().await;
        guard.apply_dispatch(session_id, result);
        Ok(AnswerResponse {
            accepted: true,
            quiz: guard.snapshot(),
        })
    }

    pub async fn reveal_hint(&self, student_id: &str) -> EngineResult<HintResponse> {
        let run = self.run(student_id).await?;
        let mut guard = run.lock().await;

        let exercise_id = guard
            .session
            .exercise_id()
            .map(str::to_string)
            .ok_or_else(|| EngineError::NoActiveQuiz(student_id.to_string()))?;
        if !guard.session.is_active() {
            return Err(EngineError::QuestionClosed(exercise_id));
        }

        let hint = guard
            .session
            .reveal_hint()
            .ok_or_else(|| EngineError::not_found(format!("hint for exercise {}", exercise_id)))?;

        Ok(HintResponse {
            exercise_id,
            hint,
            hints_used: guard.session.hints_used(),
        })
    }

    /// Moves past an answered (or unusable) question.
    pub async fn next(&self, student_id: &str) -> EngineResult<NextStep> {
        let run = self.run(student_id).await?;
        let mut guard = run.lock().await;

        if guard.session.is_active() {
            return Err(EngineError::AnswerPending(
                guard.session.exercise_id().unwrap_or_default().to_string(),
            ));
        }
        if let Some(result) = &guard.level_result {
            return Ok(NextStep::LevelComplete {
                level_id: guard.level_id.clone(),
                result: result.clone(),
            });
        }

        let upcoming = {
            let step = match guard.session.exercise_id() {
                Some(current) => navigator::next(&guard.exercises, current),
                None => navigator::first(&guard.exercises),
            };
            match step {
                Next::Exercise(exercise) => Some(exercise.clone()),
                Next::LevelComplete => None,
            }
        };

        match upcoming {
            Some(exercise) => {
                self.load_question(&run, &mut guard, exercise)?;
                Ok(NextStep::Exercise {
                    quiz: guard.snapshot(),
                })
            }
            None => {
                let result = guard.finish_level();
                Ok(NextStep::LevelComplete {
                    level_id: guard.level_id.clone(),
                    result,
                })
            }
        }
    }

    /// Leaves the quiz: the countdown stops and late results are dropped.
    pub async fn exit(&self, student_id: &str) -> EngineResult<()> {
        if !self.close_run(student_id).await {
            return Err(EngineError::NoActiveQuiz(student_id.to_string()));
        }
        QUIZ_RUNS_TOTAL.with_label_values(&["exited"]).inc();
        Ok(())
    }

    async fn close_run(&self, student_id: &str) -> bool {
        let removed = {
            let mut runs = self.runs.write().await;
            let removed = runs.remove(student_id);
            prune_channels(&mut self.lock_channels(), &runs);
            removed
        };
        match removed {
            Some(run) => {
                retire(student_id, run).await;
                true
            }
            None => false,
        }
    }

    /// Level map of a planet for a student.
    ///
    /// Unlock state is computed locally from the student's progress records.
    /// The mission API's own unlock endpoint is only consulted when those
    /// records (or the level list) cannot be fetched.
    pub async fn level_map(&self, student_id: &str, planet_id: &str) -> EngineResult<LevelMap> {
        let (levels, records) = tokio::join!(
            self.fetch(|| self.api.levels_by_planet(planet_id)),
            self.fetch(|| self.api.user_progress(student_id)),
        );

        let local_error = match (levels, records) {
            (Ok(levels), Ok(records)) => {
                let views = unlock::resolve(&levels, &progress::progress_map(&records));
                return Ok(LevelMap {
                    planet_id: planet_id.to_string(),
                    current_level_id: unlock::current_level_id(&views),
                    levels: views,
                    source: UnlockSource::Progress,
                });
            }
            (Err(e), _) | (_, Err(e)) => e,
        };

        tracing::warn!(
            "Local unlock computation unavailable for planet {} ({}), using remote status",
            planet_id,
            local_error
        );
        match self.api.levels_with_unlock_status(student_id, planet_id).await {
            Ok(status) => {
                let current = status.current_level_id.clone();
                let views = unlock::from_remote(status);
                Ok(LevelMap {
                    planet_id: planet_id.to_string(),
                    current_level_id: current.or_else(|| unlock::current_level_id(&views)),
                    levels: views,
                    source: UnlockSource::Remote,
                })
            }
            Err(remote_error) => {
                tracing::warn!("Remote unlock status failed too: {}", remote_error);
                Err(local_error)
            }
        }
    }

    async fn all_levels(&self, planet_ids: &[String]) -> EngineResult<Vec<Level>> {
        let per_planet = futures::future::try_join_all(
            planet_ids
                .iter()
                .map(|id| self.fetch(move || self.api.levels_by_planet(id))),
        )
        .await?;
        Ok(per_planet.into_iter().flatten().collect())
    }

    pub async fn planets(&self, student_id: &str) -> EngineResult<Vec<PlanetUnlockView>> {
        let planets = self.fetch(|| self.api.planets()).await?;
        let planet_ids: Vec<String> = planets.iter().map(|p| p.id.clone()).collect();
        let (levels, records) = tokio::join!(
            self.all_levels(&planet_ids),
            self.fetch(|| self.api.user_progress(student_id)),
        );
        Ok(unlock::resolve_planets(
            &planets,
            &levels?,
            &progress::progress_map(&records?),
        ))
    }

    pub async fn dashboard(&self, student_id: &str) -> EngineResult<ProgressOverview> {
        let planets = self.fetch(|| self.api.planets()).await?;
        let planet_ids: Vec<String> = planets.iter().map(|p| p.id.clone()).collect();
        let (levels, records) = tokio::join!(
            self.all_levels(&planet_ids),
            self.fetch(|| self.api.user_progress(student_id)),
        );
        Ok(progress::aggregate(&levels?, &records?))
    }
}
