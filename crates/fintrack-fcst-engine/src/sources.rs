//! Data-source traits the engine is built against, with in-memory
//! implementations for tests and embedding.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{EngineError, Result};
use crate::types::{SavingsGoal, Transaction, TransactionFilter};

/// Read access to a user's transaction history.
pub trait TransactionSource {
    /// All transactions of a user matching the filter, ascending by date.
    fn find_transactions(&self, user_id: &str, filter: &TransactionFilter)
        -> Result<Vec<Transaction>>;
}

/// Read access to a user's savings goals.
pub trait GoalSource {
    /// A goal by id, `None` when the user has no such goal.
    fn find_savings_goal(&self, user_id: &str, goal_id: &str) -> Result<Option<SavingsGoal>>;
}

impl<S: TransactionSource + ?Sized> TransactionSource for Arc<S> {
    fn find_transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        (**self).find_transactions(user_id, filter)
    }
}

impl<S: GoalSource + ?Sized> GoalSource for Arc<S> {
    fn find_savings_goal(&self, user_id: &str, goal_id: &str) -> Result<Option<SavingsGoal>> {
        (**self).find_savings_goal(user_id, goal_id)
    }
}

/// Transaction source backed by a process-local map, keyed by user.
#[derive(Debug, Default)]
pub struct InMemoryTransactionSource {
    transactions: RwLock<HashMap<String, Vec<Transaction>>>,
}

impl InMemoryTransactionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: &str, transaction: Transaction) -> Result<()> {
        let mut map = self
            .transactions
            .write()
            .map_err(|e| EngineError::Source(format!("transaction store lock poisoned: {}", e)))?;
        map.entry(user_id.to_string()).or_default().push(transaction);
        Ok(())
    }

    pub fn insert_many(
        &self,
        user_id: &str,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> Result<()> {
        let mut map = self
            .transactions
            .write()
            .map_err(|e| EngineError::Source(format!("transaction store lock poisoned: {}", e)))?;
        map.entry(user_id.to_string()).or_default().extend(transactions);
        Ok(())
    }
}

impl TransactionSource for InMemoryTransactionSource {
    fn find_transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let map = self
            .transactions
            .read()
            .map_err(|e| EngineError::Source(format!("transaction store lock poisoned: {}", e)))?;
        let mut matched: Vec<Transaction> = map
            .get(user_id)
            .map(|txns| txns.iter().filter(|t| filter.matches(t)).cloned().collect())
            .unwrap_or_default();
        matched.sort_by_key(|t| t.date);
        Ok(matched)
    }
}

/// Goal source backed by a process-local map, keyed by (user, goal).
#[derive(Debug, Default)]
pub struct InMemoryGoalSource {
    goals: RwLock<HashMap<(String, String), SavingsGoal>>,
}

impl InMemoryGoalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: &str, goal_id: &str, goal: SavingsGoal) -> Result<()> {
        let mut map = self
            .goals
            .write()
            .map_err(|e| EngineError::Source(format!("goal store lock poisoned: {}", e)))?;
        map.insert((user_id.to_string(), goal_id.to_string()), goal);
        Ok(())
    }
}

impl GoalSource for InMemoryGoalSource {
    fn find_savings_goal(&self, user_id: &str, goal_id: &str) -> Result<Option<SavingsGoal>> {
        let map = self
            .goals
            .read()
            .map_err(|e| EngineError::Source(format!("goal store lock poisoned: {}", e)))?;
        Ok(map.get(&(user_id.to_string(), goal_id.to_string())).cloned())
    }
}
