// In-memory store - the same joins as SQLite over plain vectors.
// Used as the engine's test double and for seeding demos.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;

use super::TransactionStore;
use crate::filter::TransactionQuery;
use crate::models::{Card, Statement, Transaction, TransactionRecord, User, UserId};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    users: Vec<User>,
    cards: Vec<Card>,
    statements: Vec<Statement>,
    transactions: Vec<Transaction>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, user: User) {
        self.users.push(user);
    }

    pub fn add_card(&mut self, card: Card) -> Result<()> {
        if !self.users.iter().any(|u| u.id == card.user_id) {
            bail!("unknown user '{}' for card '{}'", card.user_id, card.id);
        }
        self.cards.push(card);
        Ok(())
    }

    pub fn add_statement(&mut self, statement: Statement) -> Result<()> {
        if !self.cards.iter().any(|c| c.id == statement.card_id) {
            bail!("unknown card '{}' for statement '{}'", statement.card_id, statement.id);
        }
        self.statements.push(statement);
        Ok(())
    }

    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<()> {
        if !self.statements.iter().any(|s| s.id == transaction.statement_id) {
            bail!(
                "unknown statement '{}' for transaction '{}'",
                transaction.statement_id,
                transaction.id
            );
        }
        self.transactions.push(transaction);
        Ok(())
    }

    fn owned_cards<'a>(&'a self, query: &'a TransactionQuery) -> impl Iterator<Item = &'a Card> + 'a {
        self.cards
            .iter()
            .filter(move |c| c.user_id == query.user_id.as_str() && query.includes_card(&c.id))
    }

    fn records_for(&self, user_id: &UserId) -> Vec<TransactionRecord> {
        let mut records = Vec::new();

        for card in self.cards.iter().filter(|c| c.user_id == user_id.as_str()) {
            for statement in self.statements.iter().filter(|s| s.card_id == card.id) {
                for tx in self.transactions.iter().filter(|t| t.statement_id == statement.id) {
                    records.push(TransactionRecord {
                        id: tx.id.clone(),
                        statement_id: statement.id.clone(),
                        card_id: card.id.clone(),
                        card_name: card.name.clone(),
                        card_color: card.color.clone(),
                        date: tx.date,
                        description: tx.description.clone(),
                        amount: tx.amount,
                        transaction_type: tx.transaction_type,
                        category: tx.category.clone(),
                        statement_year: statement.year,
                        statement_month: statement.month,
                    });
                }
            }
        }

        records
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn user_exists(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.users.iter().any(|u| u.id == user_id.as_str()))
    }

    async fn fetch_transactions(&self, query: &TransactionQuery) -> Result<Vec<TransactionRecord>> {
        let mut records: Vec<TransactionRecord> = self
            .records_for(&query.user_id)
            .into_iter()
            .filter(|r| query.matches(r))
            .collect();
        records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn count_cards(&self, query: &TransactionQuery) -> Result<usize> {
        Ok(self.owned_cards(query).count())
    }

    async fn count_statements(&self, query: &TransactionQuery) -> Result<usize> {
        let count = self
            .owned_cards(query)
            .flat_map(|card| self.statements.iter().filter(move |s| s.card_id == card.id))
            .filter(|s| query.includes_date(s.statement_date))
            .count();
        Ok(count)
    }

    async fn distinct_categories(&self, user_id: &UserId) -> Result<Vec<Option<String>>> {
        let categories: BTreeSet<Option<String>> = self
            .records_for(user_id)
            .into_iter()
            .map(|r| r.category)
            .collect();
        Ok(categories.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use chrono::NaiveDate;

    fn store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.add_user(User {
            id: "alice".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
        });
        store
            .add_card(Card {
                id: "visa".to_string(),
                user_id: "alice".to_string(),
                name: "Visa".to_string(),
                color: "#111111".to_string(),
            })
            .unwrap();
        store
            .add_statement(Statement {
                id: "st-jan".to_string(),
                card_id: "visa".to_string(),
                statement_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                year: 2024,
                month: 1,
            })
            .unwrap();
        store
            .add_transaction(Transaction {
                id: "t1".to_string(),
                statement_id: "st-jan".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
                description: "BOOKS".to_string(),
                amount: "-12.00".parse().unwrap(),
                transaction_type: TransactionType::Debit,
                category: Some("Books".to_string()),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_rejects_orphans() {
        let mut store = store();
        let orphan = Statement {
            id: "st-x".to_string(),
            card_id: "missing".to_string(),
            statement_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            year: 2024,
            month: 1,
        };
        assert!(store.add_statement(orphan).is_err());
    }

    #[tokio::test]
    async fn test_scoped_reads() {
        let store = store();
        let alice = TransactionQuery::for_user(&UserId::new("alice"));
        let bob = TransactionQuery::for_user(&UserId::new("bob"));

        assert_eq!(store.fetch_transactions(&alice).await.unwrap().len(), 1);
        assert!(store.fetch_transactions(&bob).await.unwrap().is_empty());
        assert_eq!(store.count_cards(&alice).await.unwrap(), 1);
        assert_eq!(store.count_statements(&bob).await.unwrap(), 0);
        assert_eq!(
            store.distinct_categories(&UserId::new("alice")).await.unwrap(),
            vec![Some("Books".to_string())]
        );
    }
}
