//! Workshop - concurrent item store with budget history
//!
//! Items, the budget config and the history share one lock, so every
//! mutation computes its before and after budgets from a single consistent
//! view and appends its history record before anyone else can write.

use crate::config::WorkshopConfig;
use crate::error::{Error, Result};
use crate::rate_limit::{MemoryStore, RateLimitResult, RateLimitStore, RateLimiter};
use armory_core::{
    compute_item_budget, resolve_formula_expression, validate, BudgetBreakdown, BudgetConfig,
    Item, ItemId,
};
use armory_journal::{History, HistoryConfig, MutationAction};
use armory_script::{AttributeDefs, DefinitionIssue, Definitions};
use indexmap::IndexMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Tracked actors above which idle rate limit buckets are swept
const SWEEP_ABOVE: usize = 1024;

struct State {
    items: IndexMap<ItemId, Item>,
    config: BudgetConfig,
    history: History,
    next_id: u64,
}

/// Item store that keeps a budget history of every change
///
/// ```
/// use armory_core::{AttributeBound, BudgetConfig, EquipClass, Item, ItemAttribute};
/// use armory_workshop::Workshop;
///
/// let config = BudgetConfig::new("weight * max")
///     .with_weight("ATTACK_DAMAGE", 3.0)
///     .with_allowance("RARE", EquipClass::Sword, 30.0);
/// let workshop = Workshop::new(config);
///
/// let sword = Item::new("Edge", "RARE", "Sword.IRON").with_attribute(
///     ItemAttribute::new("ATTACK_DAMAGE").with_bound(AttributeBound::double("0", "5")),
/// );
/// let (id, budget) = workshop.create_item("ana", sword).unwrap();
/// assert_eq!(budget.used, 15.0);
/// assert_eq!(workshop.history().unwrap().records_for(id).len(), 1);
/// ```
pub struct Workshop<S: RateLimitStore = MemoryStore> {
    state: RwLock<State>,
    limiter: Option<RateLimiter<S>>,
    definitions: Option<AttributeDefs>,
}

impl Workshop<MemoryStore> {
    /// Create a workshop with no rate limit and unlimited history
    pub fn new(config: BudgetConfig) -> Self {
        Self::with_config(config, WorkshopConfig::default())
    }

    pub fn with_config(config: BudgetConfig, workshop: WorkshopConfig) -> Self {
        let limiter = workshop.rate_limit.map(RateLimiter::new);
        Self::build(config, &workshop, limiter)
    }

    /// Create a workshop from loaded definitions
    ///
    /// Items are checked against the attribute definitions on every save.
    pub fn from_definitions(defs: Definitions, workshop: WorkshopConfig) -> Self {
        let config = defs.budget_config();
        Self::with_config(config, workshop).with_definitions(defs.attributes)
    }
}

impl<S: RateLimitStore> Workshop<S> {
    /// Create a workshop whose rate limit buckets live in `store`
    pub fn with_store(config: BudgetConfig, workshop: WorkshopConfig, store: S) -> Self {
        let limiter = workshop
            .rate_limit
            .map(|limit| RateLimiter::with_store(limit, store));
        Self::build(config, &workshop, limiter)
    }

    fn build(config: BudgetConfig, workshop: &WorkshopConfig, limiter: Option<RateLimiter<S>>) -> Self {
        let history = History::with_config(HistoryConfig {
            max_records: workshop.max_history,
        });
        Self {
            state: RwLock::new(State {
                items: IndexMap::new(),
                config,
                history,
                next_id: 1,
            }),
            limiter,
            definitions: None,
        }
    }

    /// Check saved items against attribute definitions
    pub fn with_definitions(mut self, definitions: AttributeDefs) -> Self {
        self.definitions = Some(definitions);
        self
    }

    /// Store a new item and record its initial budget
    pub fn create_item(&self, actor: &str, item: Item) -> Result<(ItemId, BudgetBreakdown)> {
        let mut state = self.write()?;
        self.admit(actor)?;
        self.report_issues(&item);

        let id = ItemId(state.next_id);
        state.next_id += 1;

        let budget = compute_item_budget(&item, &state.config);
        state.items.insert(id, item);
        state
            .history
            .record(id, MutationAction::Created, actor, None, Some(budget.used));

        info!(item = %id, actor, used = budget.used, status = %budget.status, "item created");
        Ok((id, budget))
    }

    /// Replace a stored item and record the budget change
    pub fn update_item(&self, actor: &str, id: ItemId, item: Item) -> Result<BudgetBreakdown> {
        let mut state = self.write()?;
        self.admit(actor)?;

        let State {
            items,
            config,
            history,
            ..
        } = &mut *state;
        let slot = items.get_mut(&id).ok_or(Error::ItemNotFound(id))?;
        self.report_issues(&item);

        let before = compute_item_budget(slot, config).used;
        let budget = compute_item_budget(&item, config);
        *slot = item;
        history.record(id, MutationAction::Updated, actor, Some(before), Some(budget.used));

        info!(
            item = %id,
            actor,
            before,
            after = budget.used,
            status = %budget.status,
            "item updated"
        );
        Ok(budget)
    }

    /// Remove a stored item, recording the budget it released
    pub fn delete_item(&self, actor: &str, id: ItemId) -> Result<Item> {
        let mut state = self.write()?;
        self.admit(actor)?;

        let item = state.items.shift_remove(&id).ok_or(Error::ItemNotFound(id))?;
        let before = compute_item_budget(&item, &state.config).used;
        state
            .history
            .record(id, MutationAction::Deleted, actor, Some(before), None);

        info!(item = %id, actor, before, "item deleted");
        Ok(item)
    }

    /// Get a copy of a stored item
    pub fn item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    /// IDs of stored items in creation order
    pub fn item_ids(&self) -> Result<Vec<ItemId>> {
        Ok(self.read()?.items.keys().copied().collect())
    }

    /// Budget of an item that has not been saved
    ///
    /// Used for live editing; nothing is recorded.
    pub fn preview(&self, item: &Item) -> Result<BudgetBreakdown> {
        let state = self.read()?;
        let budget = compute_item_budget(item, &state.config);
        debug!(used = budget.used, allowed = budget.allowed, "budget preview");
        Ok(budget)
    }

    /// Budget of a stored item under the current config
    pub fn budget(&self, id: ItemId) -> Result<BudgetBreakdown> {
        let state = self.read()?;
        let item = state.items.get(&id).ok_or(Error::ItemNotFound(id))?;
        Ok(compute_item_budget(item, &state.config))
    }

    pub fn config(&self) -> Result<BudgetConfig> {
        Ok(self.read()?.config.clone())
    }

    /// Replace the budget config after validating its formula
    pub fn set_config(&self, actor: &str, config: BudgetConfig) -> Result<()> {
        validate(resolve_formula_expression(&config.formula))?;

        let mut state = self.write()?;
        self.admit(actor)?;
        info!(actor, formula = %config.formula, "budget config replaced");
        state.config = config;
        Ok(())
    }

    /// Snapshot of the history
    pub fn history(&self) -> Result<History> {
        Ok(self.read()?.history.clone())
    }

    /// Run `f` against the history without copying it
    pub fn with_history<R>(&self, f: impl FnOnce(&History) -> R) -> Result<R> {
        Ok(f(&self.read()?.history))
    }

    /// Definition issues for an item (empty without definitions)
    pub fn check(&self, item: &Item) -> Vec<DefinitionIssue> {
        self.definitions
            .as_ref()
            .map(|defs| defs.check_item(item))
            .unwrap_or_default()
    }

    pub fn rate_limiter(&self) -> Option<&RateLimiter<S>> {
        self.limiter.as_ref()
    }

    fn admit(&self, actor: &str) -> Result<()> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        let now = Instant::now();
        limiter.sweep_if_above(now, SWEEP_ABOVE);
        match limiter.check(actor, now) {
            RateLimitResult::Allowed { .. } => Ok(()),
            RateLimitResult::Limited { retry_after, .. } => {
                warn!(actor, retry_ms = retry_after.as_millis() as u64, "mutation rate limited");
                Err(Error::RateLimited {
                    actor: actor.to_string(),
                    retry_after,
                })
            }
        }
    }

    fn report_issues(&self, item: &Item) {
        for issue in self.check(item) {
            warn!(item = %item.name, %issue, "item does not match attribute definitions");
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| Error::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| Error::LockPoisoned)
    }
}
