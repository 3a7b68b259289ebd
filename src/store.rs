use crate::error::{ImportError, StoreError};
use crate::models::{Customer, CustomerStats, NewCustomer, ProductCategory, Sale, SaleItem, User};

use async_trait::async_trait;
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// The relational store the importer reads from and writes to.
#[async_trait]
pub trait SalesStore: Send + Sync {
    async fn find_active_user_by_email(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn find_customer_by_phone(
        &self,
        organization_id: Uuid,
        phone: &str,
    ) -> Result<Option<Customer>, StoreError>;

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError>;

    async fn find_category(
        &self,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Option<ProductCategory>, StoreError>;

    async fn create_category(&self, category: ProductCategory)
        -> Result<ProductCategory, StoreError>;

    async fn transaction_exists(&self, transaction_number: &str) -> Result<bool, StoreError>;

    /// Writes a sale together with all of its items, or nothing.
    async fn create_sale(&self, sale: Sale, items: Vec<SaleItem>) -> Result<Sale, StoreError>;

    async fn sales_for_customer(&self, customer_id: Uuid) -> Result<Vec<Sale>, StoreError>;

    async fn update_customer_stats(
        &self,
        customer_id: Uuid,
        stats: CustomerStats,
    ) -> Result<Customer, StoreError>;
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    customers: HashMap<Uuid, Customer>,
    categories: HashMap<Uuid, ProductCategory>,
    sales: HashMap<String, Sale>,
    items: HashMap<Uuid, Vec<SaleItem>>,
}

/// In-process store. Enforces the same uniqueness keys as the relational
/// schema: customers by (organization, phone), categories by
/// (organization, name), sales by transaction number.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Deserialize)]
struct CsvUser {
    email: String,
    first_name: String,
    last_name: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    /// Loads `email,first_name,last_name[,active]` rows as users of one
    /// organization.
    pub async fn load_users_csv(
        &self,
        organization_id: Uuid,
        text: &str,
    ) -> Result<usize, ImportError> {
        let rdr = ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut count = 0;
        for record in rdr.into_deserialize::<CsvUser>() {
            let record = record?;
            let mut user = User::new(
                organization_id,
                &record.email,
                &record.first_name,
                &record.last_name,
            );
            user.is_active = record.active;
            self.add_user(user).await;
            count += 1;
        }

        Ok(count)
    }

    pub async fn sales(&self) -> Vec<Sale> {
        self.state.lock().await.sales.values().cloned().collect()
    }

    pub async fn sale(&self, transaction_number: &str) -> Option<Sale> {
        self.state.lock().await.sales.get(transaction_number).cloned()
    }

    pub async fn sale_items(&self, sale_id: Uuid) -> Vec<SaleItem> {
        self.state
            .lock()
            .await
            .items
            .get(&sale_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn customers(&self) -> Vec<Customer> {
        self.state.lock().await.customers.values().cloned().collect()
    }

    pub async fn categories(&self) -> Vec<ProductCategory> {
        self.state
            .lock()
            .await
            .categories
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SalesStore for MemoryStore {
    async fn find_active_user_by_email(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        let state = self.state.lock().await;

        Ok(state
            .users
            .values()
            .find(|u| u.organization_id == organization_id && u.is_active && u.email == email)
            .cloned())
    }

    async fn find_customer_by_phone(
        &self,
        organization_id: Uuid,
        phone: &str,
    ) -> Result<Option<Customer>, StoreError> {
        let state = self.state.lock().await;

        Ok(state
            .customers
            .values()
            .find(|c| c.organization_id == organization_id && c.phone == phone)
            .cloned())
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let mut state = self.state.lock().await;

        let exists = state
            .customers
            .values()
            .any(|c| c.organization_id == customer.organization_id && c.phone == customer.phone);
        if exists {
            return Err(StoreError::UniqueViolation {
                entity: "Customer",
                key: customer.phone,
            });
        }

        let created = Customer {
            id: Uuid::new_v4(),
            organization_id: customer.organization_id,
            first_name: customer.first_name,
            last_name: customer.last_name,
            phone: customer.phone,
            email: customer.email,
            total_lifetime_value: Decimal::ZERO,
            total_purchases: 0,
            last_purchase_date: None,
        };
        state.customers.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_category(
        &self,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Option<ProductCategory>, StoreError> {
        let state = self.state.lock().await;

        Ok(state
            .categories
            .values()
            .find(|c| c.organization_id == organization_id && c.name == name)
            .cloned())
    }

    async fn create_category(
        &self,
        category: ProductCategory,
    ) -> Result<ProductCategory, StoreError> {
        let mut state = self.state.lock().await;

        let exists = state
            .categories
            .values()
            .any(|c| c.organization_id == category.organization_id && c.name == category.name);
        if exists {
            return Err(StoreError::UniqueViolation {
                entity: "ProductCategory",
                key: category.name,
            });
        }

        state.categories.insert(category.id, category.clone());

        Ok(category)
    }

    async fn transaction_exists(&self, transaction_number: &str) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .sales
            .contains_key(transaction_number))
    }

    async fn create_sale(&self, sale: Sale, items: Vec<SaleItem>) -> Result<Sale, StoreError> {
        let mut state = self.state.lock().await;

        if state.sales.contains_key(&sale.transaction_number) {
            return Err(StoreError::UniqueViolation {
                entity: "Sale",
                key: sale.transaction_number,
            });
        }
        if !state.customers.contains_key(&sale.customer_id) {
            return Err(StoreError::NotFound {
                entity: "Customer",
                key: sale.customer_id.to_string(),
            });
        }

        state.items.insert(sale.id, items);
        state
            .sales
            .insert(sale.transaction_number.clone(), sale.clone());

        Ok(sale)
    }

    async fn sales_for_customer(&self, customer_id: Uuid) -> Result<Vec<Sale>, StoreError> {
        let state = self.state.lock().await;

        Ok(state
            .sales
            .values()
            .filter(|s| s.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn update_customer_stats(
        &self,
        customer_id: Uuid,
        stats: CustomerStats,
    ) -> Result<Customer, StoreError> {
        let mut state = self.state.lock().await;

        let customer = state
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Customer",
                key: customer_id.to_string(),
            })?;
        customer.total_lifetime_value = stats.total_lifetime_value;
        customer.total_purchases = stats.total_purchases;
        customer.last_purchase_date = stats.last_purchase_date;

        Ok(customer.clone())
    }
}
