//! In-process store used by tests and local demos.
//!
//! Mirrors the constraints of the Postgres schema: unique email, unique
//! payment-intent id, and the conditional return update. Every operation
//! holds the lock for its whole read-modify-write, which gives the same
//! single-winner behavior the database constraints give.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use aerox_core::{Email, OrderId, OrderStatus, ShippingAddress, UserId};

use super::{OrderStore, RepositoryError, UserStore};
use crate::models::{NewOrder, NewUser, Order, User};

#[derive(Default)]
struct Tables {
    next_user_id: i32,
    users: Vec<(User, String)>,
    orders: Vec<Order>,
    by_intent: HashMap<String, OrderId>,
}

impl Tables {
    fn user_mut(&mut self, id: UserId) -> Option<&mut (User, String)> {
        self.users.iter_mut().find(|(u, _)| u.id == id)
    }

    fn insert_user(&mut self, new: &NewUser) -> User {
        self.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: UserId::new(self.next_user_id),
            email: new.email.clone(),
            name: new.name.clone(),
            shipping_address: new.shipping_address.clone(),
            created_at: now,
            updated_at: now,
        };
        self.users.push((user.clone(), new.password_hash.clone()));
        user
    }

    fn insert_order(&mut self, id: OrderId, intent: Option<&str>, new: &NewOrder) {
        self.orders.push(Order {
            id,
            user_id: new.user_id,
            items: new.items.clone(),
            total_price: new.total_price,
            shipping_address: new.shipping_address.clone(),
            is_paid: new.is_paid,
            status: new.status,
            payment_intent_id: intent.map(str::to_owned),
            created_at: Utc::now(),
        });
    }
}

/// Users and orders kept in memory behind a mutex.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.lock().map_or(0, |t| t.users.len())
    }

    /// Number of stored orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.lock().map_or(0, |t| t.orders.len())
    }

    /// Snapshot of every stored order, oldest first.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().map(|t| t.orders.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::DataCorruption("memory store lock poisoned".to_owned()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|(u, _)| &u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables.users.iter().find(|(u, _)| &u.email == email).cloned())
    }

    async fn get_password_hash_by_id(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(_, h)| h.clone()))
    }

    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.users.iter().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        Ok(tables.insert_user(user))
    }

    async fn create_or_get(&self, user: &NewUser) -> Result<(User, bool), RepositoryError> {
        let mut tables = self.lock()?;
        if let Some((existing, _)) = tables.users.iter().find(|(u, _)| u.email == user.email) {
            return Ok((existing.clone(), false));
        }
        Ok((tables.insert_user(user), true))
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        shipping_address: Option<&ShippingAddress>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let (user, _) = tables.user_mut(id).ok_or(RepositoryError::NotFound)?;
        user.name = name.map(str::to_owned);
        user.shipping_address = shipping_address.cloned();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let (user, hash) = tables.user_mut(id).ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(hash);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, id: OrderId, order: &NewOrder) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.orders.iter().any(|o| o.id == id) {
            return Err(RepositoryError::Conflict("order id already exists".to_owned()));
        }
        tables.insert_order(id, None, order);
        Ok(())
    }

    async fn insert_for_payment_intent(
        &self,
        id: OrderId,
        payment_intent_id: &str,
        order: &NewOrder,
    ) -> Result<OrderId, RepositoryError> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables.by_intent.get(payment_intent_id) {
            return Ok(*existing);
        }
        tables.insert_order(id, Some(payment_intent_id), order);
        tables.by_intent.insert(payment_intent_id.to_owned(), id);
        Ok(id)
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<OrderId>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables.by_intent.get(payment_intent_id).copied())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.lock()?;
        // Insertion order is creation order; reverse for newest first.
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn owner_and_status(
        &self,
        id: OrderId,
    ) -> Result<Option<(Option<UserId>, OrderStatus)>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| (o.user_id, o.status)))
    }

    async fn initiate_return(&self, id: OrderId, user_id: UserId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        let Some(order) = tables.orders.iter_mut().find(|o| {
            o.id == id && o.user_id == Some(user_id) && o.status == OrderStatus::Processed
        }) else {
            return Ok(false);
        };
        order.status = OrderStatus::ReturnInitiated;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            name: None,
            shipping_address: None,
        }
    }

    fn new_order(user_id: Option<UserId>) -> NewOrder {
        NewOrder::paid(user_id, Vec::new(), Decimal::new(37, 0), ShippingAddress::default())
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.create(&new_user("a@aero-x.dev")).await.unwrap();
        let err = store.create(&new_user("a@aero-x.dev")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_create_or_get_single_winner() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create_or_get(&new_user("race@aero-x.dev")).await })
            })
            .collect();

        let mut created = 0;
        let mut ids = Vec::new();
        for h in handles {
            let (user, was_created) = h.await.unwrap().unwrap();
            created += usize::from(was_created);
            ids.push(user.id);
        }

        assert_eq!(created, 1);
        assert_eq!(store.user_count(), 1);
        assert!(ids.iter().all(|id| *id == ids[0]));
    }

    #[tokio::test]
    async fn test_payment_intent_insert_is_idempotent() {
        let store = MemoryStore::new();
        let first = OrderId::generate();
        let second = OrderId::generate();

        let a = store
            .insert_for_payment_intent(first, "pi_123", &new_order(None))
            .await
            .unwrap();
        let b = store
            .insert_for_payment_intent(second, "pi_123", &new_order(None))
            .await
            .unwrap();

        assert_eq!(a, first);
        assert_eq!(b, first);
        assert_eq!(store.order_count(), 1);
        assert_eq!(store.find_by_payment_intent("pi_123").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_initiate_return_is_conditional() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        let id = OrderId::generate();
        store.insert(id, &new_order(Some(owner))).await.unwrap();

        assert!(!store.initiate_return(id, UserId::new(2)).await.unwrap());
        assert!(store.initiate_return(id, owner).await.unwrap());
        assert!(!store.initiate_return(id, owner).await.unwrap());
        assert_eq!(
            store.owner_and_status(id).await.unwrap(),
            Some((Some(owner), OrderStatus::ReturnInitiated))
        );
    }

    #[tokio::test]
    async fn test_list_for_user_newest_first() {
        let store = MemoryStore::new();
        let owner = UserId::new(7);
        let older = OrderId::generate();
        let newer = OrderId::generate();
        store.insert(older, &new_order(Some(owner))).await.unwrap();
        store.insert(OrderId::generate(), &new_order(None)).await.unwrap();
        store.insert(newer, &new_order(Some(owner))).await.unwrap();

        let ids: Vec<_> = store
            .list_for_user(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![newer, older]);
    }

    #[tokio::test]
    async fn test_update_profile_unknown_user() {
        let store = MemoryStore::new();
        let err = store
            .update_profile(UserId::new(99), Some("X"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
