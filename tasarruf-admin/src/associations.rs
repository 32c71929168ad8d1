use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use tasarruf_types::{Category, Id, Plan, PlanRequest};

use crate::api::{ApiClient, FetchError, MutationError};
use crate::notify::{LoadingFlag, Snackbar};

/// Plan side of the plan↔category relation.
#[async_trait]
pub trait PlanAssociations: Send + Sync {
    async fn categories_of_plan(&self, plan_id: Id) -> Result<Vec<Category>, FetchError>;
    async fn associate(&self, plan_id: Id, category_id: Id) -> Result<(), MutationError>;
    async fn disassociate(&self, plan_id: Id, category_id: Id) -> Result<(), MutationError>;
    async fn save_plan(&self, plan_id: Id, plan: &PlanRequest) -> Result<Plan, MutationError>;
}

/// Every category that exists.
#[async_trait]
pub trait CategoryCatalog: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>, FetchError>;
}

#[async_trait]
impl PlanAssociations for ApiClient {
    async fn categories_of_plan(&self, plan_id: Id) -> Result<Vec<Category>, FetchError> {
        Ok(self.get_categories_of_plan(plan_id).await?)
    }

    async fn associate(&self, plan_id: Id, category_id: Id) -> Result<(), MutationError> {
        self.associate_plan_with_category(plan_id, category_id).await?;
        Ok(())
    }

    async fn disassociate(&self, plan_id: Id, category_id: Id) -> Result<(), MutationError> {
        self.remove_plan_category_association(plan_id, category_id)
            .await?;
        Ok(())
    }

    async fn save_plan(&self, plan_id: Id, plan: &PlanRequest) -> Result<Plan, MutationError> {
        Ok(self.update_plan(plan_id, plan).await?)
    }
}

#[async_trait]
impl CategoryCatalog for ApiClient {
    async fn categories(&self) -> Result<Vec<Category>, FetchError> {
        Ok(self.get_categories().await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Add(Id),
    Remove(Id),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
    Loading,
    Ready,
    Mutating(Mutation),
    /// A fetch failed. `load` may be called again.
    Error(String),
}

/// Result of `bulk_add_then_update_plan`. Each add is reported on its own.
#[derive(Debug)]
pub struct BulkOutcome {
    pub associated: Vec<Id>,
    /// Already associated, or not in the catalog
    pub skipped: Vec<Id>,
    pub failed: Vec<(Id, MutationError)>,
    pub plan: Result<Plan, MutationError>,
}

/// Editing session for the categories of a single plan.
///
/// `current` and `catalog` are fetched independently and may land in either
/// order. `available` is always `catalog - current` once both are known, and
/// empty before that; callers should only show it when `is_ready()`.
pub struct AssociationEditor {
    plans: Arc<dyn PlanAssociations>,
    catalog_source: Arc<dyn CategoryCatalog>,
    plan_id: Id,
    current: Option<Vec<Category>>,
    catalog: Option<Vec<Category>>,
    available: Vec<Category>,
    state: EditorState,
    snackbar: Snackbar,
    loading: LoadingFlag,
}

impl AssociationEditor {
    pub fn new(
        plan_id: Id,
        plans: Arc<dyn PlanAssociations>,
        catalog_source: Arc<dyn CategoryCatalog>,
        snackbar: Snackbar,
        loading: LoadingFlag,
    ) -> Self {
        Self {
            plans,
            catalog_source,
            plan_id,
            current: None,
            catalog: None,
            available: Vec::new(),
            state: EditorState::Loading,
            snackbar,
            loading,
        }
    }

    /// Editor backed by the REST API for both collaborators.
    pub fn for_client(client: &ApiClient, plan_id: Id, snackbar: Snackbar, loading: LoadingFlag) -> Self {
        let client = Arc::new(client.clone());
        Self::new(plan_id, client.clone(), client, snackbar, loading)
    }

    pub fn plan_id(&self) -> Id {
        self.plan_id
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.current.is_some() && self.catalog.is_some() && self.state == EditorState::Ready
    }

    pub fn current(&self) -> &[Category] {
        self.current.as_deref().unwrap_or(&[])
    }

    pub fn available(&self) -> &[Category] {
        &self.available
    }

    /// Fetches the plan's categories and the catalog concurrently.
    pub async fn load(&mut self) -> Result<(), FetchError> {
        self.state = EditorState::Loading;
        let _busy = self.loading.begin();

        let (current, catalog) = tokio::join!(
            self.plans.categories_of_plan(self.plan_id),
            self.catalog_source.categories()
        );

        let mut first_error = None;
        match current {
            Ok(categories) => self.apply_current(categories),
            Err(e) => first_error = Some(e),
        }
        match catalog {
            Ok(categories) => self.apply_catalog(categories),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            None => Ok(()),
            Some(e) => {
                log::error!("Failed to load categories for plan {}: {}", self.plan_id, e);
                self.state = EditorState::Error(e.to_string());
                self.snackbar.error("error getting categories, please try again");
                Err(e)
            }
        }
    }

    /// Records the plan's current categories.
    pub fn apply_current(&mut self, categories: Vec<Category>) {
        self.current = Some(categories);
        self.settle();
    }

    /// Records the full category catalog.
    pub fn apply_catalog(&mut self, categories: Vec<Category>) {
        self.catalog = Some(categories);
        self.settle();
    }

    fn settle(&mut self) {
        self.recompute_available();
        if self.current.is_some() && self.catalog.is_some() && self.state == EditorState::Loading {
            self.state = EditorState::Ready;
        }
    }

    fn recompute_available(&mut self) {
        self.available = match (&self.current, &self.catalog) {
            (Some(current), Some(catalog)) => {
                let taken: HashSet<Id> = current.iter().map(|c| c.id).collect();
                catalog.iter().filter(|c| !taken.contains(&c.id)).cloned().collect()
            }
            _ => Vec::new(),
        };
    }

    fn is_current(&self, category_id: Id) -> bool {
        self.current().iter().any(|c| c.id == category_id)
    }

    fn catalog_entry(&self, category_id: Id) -> Option<Category> {
        self.catalog
            .as_ref()?
            .iter()
            .find(|c| c.id == category_id)
            .cloned()
    }

    fn ensure_ready(&self) -> Result<(), MutationError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(MutationError::Validation(
                "categories are not loaded yet".to_string(),
            ))
        }
    }

    /// Links `category_id` to the plan.
    ///
    /// Adding a category that is already associated succeeds without a
    /// request. On failure nothing changes and an error notice is raised.
    pub async fn add(&mut self, category_id: Id) -> Result<(), MutationError> {
        self.ensure_ready()?;
        if self.is_current(category_id) {
            log_association!("Category {} already on plan {}", category_id, self.plan_id);
            return Ok(());
        }
        let category = self.catalog_entry(category_id).ok_or_else(|| {
            MutationError::Validation(format!("category {} does not exist", category_id))
        })?;

        self.state = EditorState::Mutating(Mutation::Add(category_id));
        let result = {
            let _busy = self.loading.begin();
            self.plans.associate(self.plan_id, category_id).await
        };
        self.state = EditorState::Ready;

        match result {
            Ok(()) => {
                log_association!("Associated category {} with plan {}", category_id, self.plan_id);
                if let Some(current) = self.current.as_mut() {
                    current.push(category);
                }
                self.recompute_available();
                self.snackbar.open("Associated successfully");
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "Failed to associate category {} with plan {}: {}",
                    category_id,
                    self.plan_id,
                    e
                );
                self.snackbar.error("error associating category, please try again");
                Err(e)
            }
        }
    }

    /// Unlinks `category_id` from the plan, then refreshes the catalog.
    pub async fn remove(&mut self, category_id: Id) -> Result<(), MutationError> {
        self.ensure_ready()?;
        if !self.is_current(category_id) {
            log_association!("Category {} not on plan {}", category_id, self.plan_id);
            return Ok(());
        }

        self.state = EditorState::Mutating(Mutation::Remove(category_id));
        let result = {
            let _busy = self.loading.begin();
            self.plans.disassociate(self.plan_id, category_id).await
        };
        self.state = EditorState::Ready;

        if let Err(e) = result {
            log::error!(
                "Failed to remove category {} from plan {}: {}",
                category_id,
                self.plan_id,
                e
            );
            self.snackbar.error("error removing association, please try again");
            return Err(e);
        }

        log_association!("Removed category {} from plan {}", category_id, self.plan_id);
        if let Some(current) = self.current.as_mut() {
            current.retain(|c| c.id != category_id);
        }
        self.snackbar.open("Association removed successfully");

        let refreshed = {
            let _busy = self.loading.begin();
            self.catalog_source.categories().await
        };
        match refreshed {
            Ok(categories) => self.catalog = Some(categories),
            Err(e) => {
                log::warn!("Keeping previous catalog, refresh failed: {}", e);
                self.snackbar.error("error getting categories, please try again");
            }
        }
        self.recompute_available();
        Ok(())
    }

    /// Associates every id in `category_ids`, then saves the plan.
    ///
    /// Adds run one after another and fail independently; each failure
    /// raises its own notice. The plan is saved whatever happened to the
    /// adds. Ids already associated, or (once loaded) missing from the
    /// available set, are skipped without a request.
    pub async fn bulk_add_then_update_plan(&mut self, category_ids: &[Id], plan: &PlanRequest) -> BulkOutcome {
        let mut associated = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        let ready = self.is_ready();
        let previous = self.state.clone();

        for &category_id in category_ids {
            let offered = self.available.iter().any(|c| c.id == category_id);
            if self.is_current(category_id) || (ready && !offered) {
                skipped.push(category_id);
                continue;
            }

            self.state = EditorState::Mutating(Mutation::Add(category_id));
            let result = {
                let _busy = self.loading.begin();
                self.plans.associate(self.plan_id, category_id).await
            };

            match result {
                Ok(()) => {
                    log_association!("Associated category {} with plan {}", category_id, self.plan_id);
                    if let Some(category) = self.catalog_entry(category_id) {
                        if let Some(current) = self.current.as_mut() {
                            current.push(category);
                        }
                    }
                    self.recompute_available();
                    associated.push(category_id);
                }
                Err(e) => {
                    log::error!(
                        "Failed to associate category {} with plan {}: {}",
                        category_id,
                        self.plan_id,
                        e
                    );
                    self.snackbar
                        .error("There has been an error processing your request, please try again");
                    failed.push((category_id, e));
                }
            }
        }
        self.state = previous;

        let saved = {
            let _busy = self.loading.begin();
            self.plans.save_plan(self.plan_id, plan).await
        };
        match &saved {
            Ok(_) => self.snackbar.open("Plan edited successfully"),
            Err(e) => {
                log::error!("Failed to update plan {}: {}", self.plan_id, e);
                self.snackbar.error("error editing plan, please try again");
            }
        }

        BulkOutcome {
            associated,
            skipped,
            failed,
            plan: saved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    fn category(id: Id) -> Category {
        Category {
            id,
            english_name: format!("Category {}", id),
            turkish_name: format!("Kategori {}", id),
        }
    }

    fn plan_request() -> PlanRequest {
        PlanRequest {
            english_name: "Gold".to_string(),
            turkish_name: "Altın".to_string(),
            price: 99.0,
            count_of_offers: 10,
            ..Default::default()
        }
    }

    /// In-memory backend; ids in `failing` fail with a transport error.
    #[derive(Default)]
    struct FakeBackend {
        linked: Mutex<Vec<Id>>,
        catalog: Vec<Id>,
        failing: Mutex<HashSet<Id>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(catalog: &[Id], linked: &[Id]) -> Arc<Self> {
            Arc::new(Self {
                linked: Mutex::new(linked.to_vec()),
                catalog: catalog.to_vec(),
                ..Default::default()
            })
        }

        fn fail(&self, id: Id) {
            self.failing.lock().unwrap().insert(id);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn check(&self, id: Id) -> Result<(), MutationError> {
            if self.failing.lock().unwrap().contains(&id) {
                Err(MutationError::Transport("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl PlanAssociations for FakeBackend {
        async fn categories_of_plan(&self, _plan_id: Id) -> Result<Vec<Category>, FetchError> {
            Ok(self.linked.lock().unwrap().iter().map(|&id| category(id)).collect())
        }

        async fn associate(&self, _plan_id: Id, category_id: Id) -> Result<(), MutationError> {
            self.calls.lock().unwrap().push(format!("add {}", category_id));
            self.check(category_id)?;
            self.linked.lock().unwrap().push(category_id);
            Ok(())
        }

        async fn disassociate(&self, _plan_id: Id, category_id: Id) -> Result<(), MutationError> {
            self.calls.lock().unwrap().push(format!("remove {}", category_id));
            self.check(category_id)?;
            self.linked.lock().unwrap().retain(|&id| id != category_id);
            Ok(())
        }

        async fn save_plan(&self, plan_id: Id, plan: &PlanRequest) -> Result<Plan, MutationError> {
            self.calls.lock().unwrap().push("save".to_string());
            Ok(Plan {
                id: plan_id,
                english_name: plan.english_name.clone(),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl CategoryCatalog for FakeBackend {
        async fn categories(&self) -> Result<Vec<Category>, FetchError> {
            Ok(self.catalog.iter().map(|&id| category(id)).collect())
        }
    }

    fn editor(backend: &Arc<FakeBackend>) -> AssociationEditor {
        AssociationEditor::new(7, backend.clone(), backend.clone(), Snackbar::new(), LoadingFlag::new())
    }

    fn ids(categories: &[Category]) -> Vec<Id> {
        let mut ids: Vec<Id> = categories.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids
    }

    #[tokio::test]
    async fn test_load_computes_available() {
        let backend = FakeBackend::new(&[1, 2, 3], &[1]);
        let mut editor = editor(&backend);
        assert_eq!(editor.state(), &EditorState::Loading);

        editor.load().await.unwrap();

        assert!(editor.is_ready());
        assert_eq!(ids(editor.current()), vec![1]);
        assert_eq!(ids(editor.available()), vec![2, 3]);
    }

    #[test]
    fn test_available_empty_until_both_loaded() {
        let backend = FakeBackend::new(&[], &[]);
        let mut editor = editor(&backend);

        editor.apply_catalog(vec![category(1), category(2)]);
        assert!(!editor.is_ready());
        assert!(editor.available().is_empty());

        editor.apply_current(vec![category(2)]);
        assert!(editor.is_ready());
        assert_eq!(ids(editor.available()), vec![1]);
    }

    #[tokio::test]
    async fn test_add_twice_does_not_duplicate() {
        let backend = FakeBackend::new(&[1, 2], &[]);
        let snackbar = Snackbar::new();
        let mut editor = AssociationEditor::new(7, backend.clone(), backend.clone(), snackbar.clone(), LoadingFlag::new());
        editor.load().await.unwrap();

        editor.add(2).await.unwrap();
        editor.add(2).await.unwrap();

        assert_eq!(ids(editor.current()), vec![2]);
        assert_eq!(ids(editor.available()), vec![1]);
        assert_eq!(backend.calls(), vec!["add 2"]);
        assert_eq!(snackbar.messages(), vec!["Associated successfully"]);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_state_unchanged() {
        let backend = FakeBackend::new(&[1, 2], &[1]);
        backend.fail(2);
        let snackbar = Snackbar::new();
        let mut editor = AssociationEditor::new(7, backend.clone(), backend.clone(), snackbar.clone(), LoadingFlag::new());
        editor.load().await.unwrap();

        let err = editor.add(2).await.unwrap_err();

        assert_eq!(err, MutationError::Transport("connection reset".to_string()));
        assert_eq!(ids(editor.current()), vec![1]);
        assert_eq!(ids(editor.available()), vec![2]);
        assert_eq!(editor.state(), &EditorState::Ready);
        assert_eq!(snackbar.drain().iter().filter(|n| n.is_error).count(), 1);
    }

    #[tokio::test]
    async fn test_add_unknown_category_is_rejected() {
        let backend = FakeBackend::new(&[1], &[]);
        let mut editor = editor(&backend);
        editor.load().await.unwrap();

        assert!(matches!(editor.add(99).await, Err(MutationError::Validation(_))));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_before_load_is_rejected() {
        let backend = FakeBackend::new(&[1], &[]);
        let mut editor = editor(&backend);

        assert!(matches!(editor.add(1).await, Err(MutationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_remove_returns_category_to_available() {
        let backend = FakeBackend::new(&[1, 2], &[1, 2]);
        let mut editor = editor(&backend);
        editor.load().await.unwrap();

        editor.remove(1).await.unwrap();

        assert_eq!(ids(editor.current()), vec![2]);
        assert_eq!(ids(editor.available()), vec![1]);
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_category() {
        let backend = FakeBackend::new(&[1, 2], &[1]);
        backend.fail(1);
        let snackbar = Snackbar::new();
        let mut editor = AssociationEditor::new(7, backend.clone(), backend.clone(), snackbar.clone(), LoadingFlag::new());
        editor.load().await.unwrap();

        assert!(editor.remove(1).await.is_err());
        assert_eq!(ids(editor.current()), vec![1]);
        assert_eq!(snackbar.messages(), vec!["error removing association, please try again"]);
    }

    #[tokio::test]
    async fn test_bulk_saves_plan_after_partial_failure() {
        let backend = FakeBackend::new(&[1, 2, 3, 4], &[1]);
        backend.fail(3);
        let mut editor = editor(&backend);
        editor.load().await.unwrap();

        let outcome = editor.bulk_add_then_update_plan(&[1, 2, 3, 4, 4], &plan_request()).await;

        assert_eq!(outcome.associated, vec![2, 4]);
        assert_eq!(outcome.skipped, vec![1, 4]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, 3);
        assert_eq!(outcome.plan.unwrap().english_name, "Gold");
        assert_eq!(backend.calls(), vec!["add 2", "add 3", "add 4", "save"]);
        assert_eq!(ids(editor.current()), vec![1, 2, 4]);
        assert_eq!(ids(editor.available()), vec![3]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(Id),
        Remove(Id),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![(0u64..12).prop_map(Op::Add), (0u64..12).prop_map(Op::Remove)]
    }

    proptest! {
        #[test]
        fn prop_available_is_catalog_minus_current(
            catalog in proptest::collection::btree_set(0u64..12, 0..10),
            linked_mask in proptest::collection::vec(any::<bool>(), 10),
            failing in proptest::collection::btree_set(0u64..12, 0..3),
            catalog_first in any::<bool>(),
            ops in proptest::collection::vec(op(), 0..12),
        ) {
            let catalog: Vec<Id> = catalog.into_iter().collect();
            let linked: Vec<Id> = catalog
                .iter()
                .zip(linked_mask.iter())
                .filter(|(_, keep)| **keep)
                .map(|(id, _)| *id)
                .collect();
            let backend = FakeBackend::new(&catalog, &linked);
            for id in failing {
                backend.fail(id);
            }
            let mut editor = editor(&backend);

            let current: Vec<Category> = linked.iter().map(|&id| category(id)).collect();
            let all: Vec<Category> = catalog.iter().map(|&id| category(id)).collect();
            if catalog_first {
                editor.apply_catalog(all);
                editor.apply_current(current);
            } else {
                editor.apply_current(current);
                editor.apply_catalog(all);
            }

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let check = |editor: &AssociationEditor| {
                let current: HashSet<Id> = editor.current().iter().map(|c| c.id).collect();
                let expected: Vec<Id> = catalog.iter().copied().filter(|id| !current.contains(id)).collect();
                assert_eq!(ids(editor.available()), expected);
                assert_eq!(current.len(), editor.current().len());
            };
            check(&editor);

            for op in ops {
                runtime.block_on(async {
                    let _ = match op {
                        Op::Add(id) => editor.add(id).await,
                        Op::Remove(id) => editor.remove(id).await,
                    };
                });
                check(&editor);
            }
        }
    }
}
