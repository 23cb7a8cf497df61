//! Debounced recipe query pipeline.
//!
//! Three inputs (selected type, search text, refresh trigger) are folded into one
//! query stream processed by a single worker task:
//!
//! - type and search changes (re)arm a debounce deadline; when it expires the
//!   latest values of both are queried together,
//! - a refresh starts a query with the current values as soon as the worker reads
//!   it, so input changes queued behind it cannot postpone it,
//! - each query is a numbered tick; a completed fetch is published only if no newer
//!   tick has been issued since, so results always follow input recency rather
//!   than completion order.
//!
//! Fetches run on their own tasks, so a hung fetch never blocks later ticks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{RecipeError, Result};
use crate::models::{Recipe, title_matches};
use crate::repository::RecipeRepository;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

const FAILURE_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub debounce: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryInputs {
    /// `None` means every type.
    pub recipe_type: Option<String>,
    pub search_text: String,
}

/// The latest published result set. `tick` is 0 until the first query completes.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub tick: u64,
    pub inputs: QueryInputs,
    pub recipes: Vec<Recipe>,
}

/// Reported on the failure channel when a tick's fetch fails. The published result
/// set is left untouched.
#[derive(Debug, Clone)]
pub struct QueryFailure {
    pub tick: u64,
    pub inputs: QueryInputs,
    pub error: RecipeError,
}

#[derive(Debug)]
enum Signal {
    Type(Option<String>),
    Search(String),
    Refresh,
}

struct Completed {
    tick: u64,
    inputs: QueryInputs,
    outcome: Result<Vec<Recipe>>,
}

/// Cloneable handle that fires the coordinator's refresh trigger.
#[derive(Clone)]
pub struct RefreshTrigger {
    signals: mpsc::UnboundedSender<Signal>,
}

impl RefreshTrigger {
    pub fn fire(&self) {
        // A closed channel means the coordinator is gone; nothing left to refresh.
        let _ = self.signals.send(Signal::Refresh);
    }
}

pub struct QueryCoordinator {
    signals: mpsc::UnboundedSender<Signal>,
    results: watch::Receiver<ResultSet>,
    failures: broadcast::Sender<QueryFailure>,
    worker: JoinHandle<()>,
}

impl QueryCoordinator {
    /// Start the worker on the current tokio runtime. The first query runs immediately
    /// with default inputs (every type, empty search).
    pub fn spawn(repo: Arc<dyn RecipeRepository>, config: QueryConfig) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = watch::channel(ResultSet::default());
        let (failures_tx, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);

        let worker = Worker {
            repo,
            debounce: config.debounce,
            inputs: QueryInputs::default(),
            deadline: Some(Instant::now()),
            issued: 0,
            results: results_tx,
            failures: failures_tx.clone(),
        };
        let worker = tokio::spawn(worker.run(signals_rx));

        Self {
            signals: signals_tx,
            results: results_rx,
            failures: failures_tx,
            worker,
        }
    }

    pub fn set_type(&self, recipe_type: Option<String>) {
        let _ = self.signals.send(Signal::Type(recipe_type));
    }

    pub fn set_search_text(&self, text: impl Into<String>) {
        let _ = self.signals.send(Signal::Search(text.into()));
    }

    pub fn refresh(&self) {
        let _ = self.signals.send(Signal::Refresh);
    }

    #[must_use]
    pub fn refresh_trigger(&self) -> RefreshTrigger {
        RefreshTrigger {
            signals: self.signals.clone(),
        }
    }

    #[must_use]
    pub fn current(&self) -> ResultSet {
        self.results.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResultSet> {
        self.results.clone()
    }

    #[must_use]
    pub fn subscribe_failures(&self) -> broadcast::Receiver<QueryFailure> {
        self.failures.subscribe()
    }
}

impl Drop for QueryCoordinator {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

struct Worker {
    repo: Arc<dyn RecipeRepository>,
    debounce: Duration,
    inputs: QueryInputs,
    deadline: Option<Instant>,
    issued: u64,
    results: watch::Sender<ResultSet>,
    failures: broadcast::Sender<QueryFailure>,
}

impl Worker {
    async fn run(mut self, mut signals: mpsc::UnboundedReceiver<Signal>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completed>();

        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;

                signal = signals.recv() => match signal {
                    Some(signal) => self.on_signal(signal, &done_tx),
                    None => break,
                },
                Some(done) = done_rx.recv() => self.on_completed(done),
                () = wait_until(deadline) => {
                    self.deadline = None;
                    self.start_tick(&done_tx);
                }
            }
        }
    }

    fn on_signal(&mut self, signal: Signal, done: &mpsc::UnboundedSender<Completed>) {
        match signal {
            Signal::Type(recipe_type) => {
                self.inputs.recipe_type = recipe_type;
                self.deadline = Some(Instant::now() + self.debounce);
            }
            Signal::Search(text) => {
                self.inputs.search_text = text;
                self.deadline = Some(Instant::now() + self.debounce);
            }
            // The refresh tick already carries every input change received so far.
            Signal::Refresh => {
                self.deadline = None;
                self.start_tick(done);
            }
        }
    }

    fn start_tick(&mut self, done: &mpsc::UnboundedSender<Completed>) {
        self.issued += 1;
        let tick = self.issued;
        let inputs = self.inputs.clone();
        let repo = Arc::clone(&self.repo);
        let done = done.clone();

        debug!(tick, recipe_type = ?inputs.recipe_type, search = %inputs.search_text, "query tick");
        tokio::spawn(async move {
            let outcome = repo.fetch_recipes(inputs.recipe_type.as_deref()).await;
            let _ = done.send(Completed {
                tick,
                inputs,
                outcome,
            });
        });
    }

    fn on_completed(&mut self, done: Completed) {
        if done.tick != self.issued {
            debug!(
                tick = done.tick,
                latest = self.issued,
                "discarding superseded query result"
            );
            return;
        }

        match done.outcome {
            Ok(recipes) => {
                let recipes: Vec<Recipe> = recipes
                    .into_iter()
                    .filter(|r| title_matches(r, &done.inputs.search_text))
                    .collect();
                debug!(tick = done.tick, count = recipes.len(), "publishing results");
                self.results.send_replace(ResultSet {
                    tick: done.tick,
                    inputs: done.inputs,
                    recipes,
                });
            }
            Err(error) => {
                warn!(tick = done.tick, %error, "recipe query failed");
                let _ = self.failures.send(QueryFailure {
                    tick: done.tick,
                    inputs: done.inputs,
                    error,
                });
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::repository::StoreRepository;
    use crate::store::MemoryStore;

    /// Wraps a real repository, counts fetches, and can stall or fail by type.
    struct ScriptedRepo {
        inner: StoreRepository,
        fetches: AtomicUsize,
        slow_type: Option<&'static str>,
        broken_type: Option<&'static str>,
    }

    impl ScriptedRepo {
        fn new(recipes: Vec<Recipe>) -> Self {
            Self {
                inner: StoreRepository::new(Arc::new(MemoryStore::with_recipes(recipes))),
                fetches: AtomicUsize::new(0),
                slow_type: None,
                broken_type: None,
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecipeRepository for ScriptedRepo {
        async fn fetch_recipes(&self, recipe_type: Option<&str>) -> Result<Vec<Recipe>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if recipe_type.is_some() && recipe_type == self.slow_type {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if recipe_type.is_some() && recipe_type == self.broken_type {
                return Err(RecipeError::Storage("disk I/O error".to_string()));
            }
            self.inner.fetch_recipes(recipe_type).await
        }

        async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>> {
            self.inner.get_recipe(id).await
        }

        async fn save_recipe(&self, recipe: Recipe) -> Result<()> {
            self.inner.save_recipe(recipe).await
        }

        async fn delete_recipe(&self, id: Uuid) -> Result<bool> {
            self.inner.delete_recipe(id).await
        }
    }

    fn sample_recipes() -> Vec<Recipe> {
        vec![
            Recipe::new("Pancakes", "Breakfast", "", ""),
            Recipe::new("Cake", "Dessert", "", ""),
        ]
    }

    fn inputs(recipe_type: Option<&str>, search: &str) -> QueryInputs {
        QueryInputs {
            recipe_type: recipe_type.map(String::from),
            search_text: search.to_string(),
        }
    }

    async fn wait_for_inputs(
        rx: &mut watch::Receiver<ResultSet>,
        expected: &QueryInputs,
    ) -> ResultSet {
        tokio::time::timeout(
            Duration::from_secs(30),
            rx.wait_for(|r| r.tick > 0 && r.inputs == *expected),
        )
        .await
        .unwrap()
        .unwrap()
        .clone()
    }

    fn titles(set: &ResultSet) -> Vec<&str> {
        set.recipes.iter().map(|r| r.title.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_query_returns_everything() {
        let repo = Arc::new(ScriptedRepo::new(sample_recipes()));
        let coordinator = QueryCoordinator::spawn(repo.clone(), QueryConfig::default());
        let mut rx = coordinator.subscribe();

        let set = wait_for_inputs(&mut rx, &QueryInputs::default()).await;
        assert_eq!(titles(&set), vec!["Pancakes", "Cake"]);
        assert_eq!(repo.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_then_search_scenario() {
        let repo = Arc::new(ScriptedRepo::new(sample_recipes()));
        let coordinator = QueryCoordinator::spawn(repo, QueryConfig::default());
        let mut rx = coordinator.subscribe();

        coordinator.set_type(Some("Breakfast".to_string()));
        let set = wait_for_inputs(&mut rx, &inputs(Some("Breakfast"), "")).await;
        assert_eq!(titles(&set), vec!["Pancakes"]);

        coordinator.set_type(None);
        coordinator.set_search_text("cake");
        let set = wait_for_inputs(&mut rx, &inputs(None, "cake")).await;
        // "Pancakes" contains "cake" too.
        assert_eq!(titles(&set), vec!["Pancakes", "Cake"]);

        coordinator.set_search_text("CAKE");
        coordinator.set_type(Some("Dessert".to_string()));
        let set = wait_for_inputs(&mut rx, &inputs(Some("Dessert"), "CAKE")).await;
        assert_eq!(titles(&set), vec!["Cake"]);

        coordinator.set_search_text("");
        let set = wait_for_inputs(&mut rx, &inputs(Some("Dessert"), "")).await;
        assert_eq!(titles(&set), vec!["Cake"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_without_type_filter() {
        let repo = Arc::new(ScriptedRepo::new(vec![
            Recipe::new("Pancakes", "Breakfast", "", ""),
            Recipe::new("Chocolate Cake", "Dessert", "", ""),
            Recipe::new("Salad", "Lunch", "", ""),
        ]));
        let coordinator = QueryCoordinator::spawn(repo, QueryConfig::default());
        let mut rx = coordinator.subscribe();

        coordinator.set_search_text("choc");
        let set = wait_for_inputs(&mut rx, &inputs(None, "choc")).await;
        assert_eq!(titles(&set), vec!["Chocolate Cake"]);

        coordinator.set_search_text("zzz");
        let set = wait_for_inputs(&mut rx, &inputs(None, "zzz")).await;
        assert!(set.recipes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_collapse_into_one_fetch() {
        let repo = Arc::new(ScriptedRepo::new(sample_recipes()));
        let coordinator = QueryCoordinator::spawn(repo.clone(), QueryConfig::default());
        let mut rx = coordinator.subscribe();
        wait_for_inputs(&mut rx, &QueryInputs::default()).await;
        assert_eq!(repo.fetches(), 1);

        for text in ["c", "ca", "cak", "cake"] {
            coordinator.set_search_text(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let set = wait_for_inputs(&mut rx, &inputs(None, "cake")).await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(repo.fetches(), 2);
        assert_eq!(coordinator.current().tick, set.tick);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fetch_before_debounce_elapses() {
        let repo = Arc::new(ScriptedRepo::new(sample_recipes()));
        let coordinator = QueryCoordinator::spawn(repo.clone(), QueryConfig::default());
        let mut rx = coordinator.subscribe();
        wait_for_inputs(&mut rx, &QueryInputs::default()).await;

        coordinator.set_type(Some("Dessert".to_string()));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(repo.fetches(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(repo.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stale_result_is_discarded() {
        let mut repo = ScriptedRepo::new(sample_recipes());
        repo.slow_type = Some("Breakfast");
        let repo = Arc::new(repo);
        let coordinator = QueryCoordinator::spawn(repo.clone(), QueryConfig::default());
        let mut rx = coordinator.subscribe();
        wait_for_inputs(&mut rx, &QueryInputs::default()).await;

        // Tick A: slow.
        coordinator.set_type(Some("Breakfast".to_string()));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(repo.fetches(), 2);

        // Tick B: fast, completes first.
        coordinator.set_type(Some("Dessert".to_string()));
        let set = wait_for_inputs(&mut rx, &inputs(Some("Dessert"), "")).await;
        assert_eq!(titles(&set), vec!["Cake"]);

        // Let tick A finish; its result must not replace B's.
        tokio::time::sleep(Duration::from_secs(10)).await;
        let current = coordinator.current();
        assert_eq!(current.inputs, inputs(Some("Dessert"), ""));
        assert_eq!(titles(&current), vec!["Cake"]);
        assert_eq!(current.tick, set.tick);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_keeps_last_results() {
        let mut repo = ScriptedRepo::new(sample_recipes());
        repo.broken_type = Some("Broken");
        let coordinator = QueryCoordinator::spawn(Arc::new(repo), QueryConfig::default());
        let mut rx = coordinator.subscribe();
        let mut failures = coordinator.subscribe_failures();

        coordinator.set_type(Some("Breakfast".to_string()));
        let good = wait_for_inputs(&mut rx, &inputs(Some("Breakfast"), "")).await;

        coordinator.set_type(Some("Broken".to_string()));
        let failure = tokio::time::timeout(Duration::from_secs(5), failures.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failure.inputs, inputs(Some("Broken"), ""));
        assert!(matches!(failure.error, RecipeError::Storage(_)));

        let current = coordinator.current();
        assert_eq!(current.tick, good.tick);
        assert_eq!(titles(&current), vec!["Pancakes"]);

        // The pipeline keeps working after a failure.
        coordinator.set_type(Some("Dessert".to_string()));
        let set = wait_for_inputs(&mut rx, &inputs(Some("Dessert"), "")).await;
        assert_eq!(titles(&set), vec!["Cake"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_picks_up_saved_recipe_within_debounce() {
        let repo = Arc::new(ScriptedRepo::new(sample_recipes()));
        let coordinator = QueryCoordinator::spawn(repo.clone(), QueryConfig::default());
        let mut rx = coordinator.subscribe();
        wait_for_inputs(&mut rx, &QueryInputs::default()).await;

        let waffles = Recipe::new("Waffles", "Breakfast", "", "");
        repo.save_recipe(waffles.clone()).await.unwrap();
        coordinator.refresh_trigger().fire();

        let set = tokio::time::timeout(
            DEFAULT_DEBOUNCE,
            rx.wait_for(|r| r.recipes.iter().any(|x| x.id == waffles.id)),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(set.recipes.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_is_not_held_back_by_typing() {
        let repo = Arc::new(ScriptedRepo::new(sample_recipes()));
        let coordinator = QueryCoordinator::spawn(repo, QueryConfig::default());
        let mut rx = coordinator.subscribe();
        wait_for_inputs(&mut rx, &QueryInputs::default()).await;

        coordinator.set_search_text("pan");
        coordinator.refresh();

        let set = tokio::time::timeout(
            Duration::from_millis(100),
            rx.wait_for(|r| r.inputs.search_text == "pan"),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(titles(&set), vec!["Pancakes"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_after_refresh_does_not_postpone_it() {
        let repo = Arc::new(ScriptedRepo::new(sample_recipes()));
        let coordinator = QueryCoordinator::spawn(repo.clone(), QueryConfig::default());
        let mut rx = coordinator.subscribe();
        let initial = wait_for_inputs(&mut rx, &QueryInputs::default()).await;

        coordinator.refresh();
        coordinator.set_search_text("p");
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Ten more keystrokes, each inside the debounce window of the previous one.
        for i in 2..12 {
            coordinator.set_search_text("p".repeat(i));
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(repo.fetches(), 2, "only the refresh may query while typing");
        }

        let refreshed = coordinator.current();
        assert!(refreshed.tick > initial.tick);
        assert_eq!(refreshed.inputs, QueryInputs::default());

        let set = wait_for_inputs(&mut rx, &inputs(None, &"p".repeat(11))).await;
        assert!(set.recipes.is_empty());
        assert_eq!(repo.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_then_refresh_drops_record() {
        let recipes = sample_recipes();
        let doomed = recipes[0].id;
        let repo = Arc::new(ScriptedRepo::new(recipes));
        let coordinator = QueryCoordinator::spawn(repo.clone(), QueryConfig::default());
        let mut rx = coordinator.subscribe();
        wait_for_inputs(&mut rx, &QueryInputs::default()).await;

        repo.delete_recipe(doomed).await.unwrap();
        coordinator.refresh();
        let set = tokio::time::timeout(
            DEFAULT_DEBOUNCE,
            rx.wait_for(|r| r.recipes.iter().all(|x| x.id != doomed)),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(titles(&set), vec!["Cake"]);
    }
}
