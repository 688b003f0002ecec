use rusqlite::Connection;

use super::{ServiceError, Store};
use crate::adapters::db::{self, NewConsumer, NewOperator};
use crate::domain::models::{Consumer, Operator};

#[derive(Debug, Clone, PartialEq)]
pub struct NewOperatorRequest {
    pub email: String,
    pub password_hash: String,
    pub operator_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConsumerRequest {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

/// Identity records for operators and consumers. Stores credential hashes as
/// given; hashing and verification live with the identity provider.
#[derive(Clone)]
pub struct Directory {
    store: Store,
}

impl Directory {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn register_operator(&self, request: NewOperatorRequest) -> Result<Operator, ServiceError> {
        let email = normalize_email(&request.email)?;
        require_hash(&request.password_hash)?;

        let operator = self.store.write(|connection| {
            if db::find_operator_by_email(connection, &email)?.is_some() {
                return Err(ServiceError::conflict(format!(
                    "operator email {email} is already registered"
                )));
            }

            let id = db::insert_operator(
                connection,
                &NewOperator {
                    email: email.clone(),
                    password_hash: request.password_hash,
                    operator_type: request.operator_type.trim().to_string(),
                },
            )?;
            require_operator(connection, id)
        })?;

        tracing::info!(operator_id = operator.id, "operator registered");
        Ok(operator)
    }

    pub fn register_consumer(&self, request: NewConsumerRequest) -> Result<Consumer, ServiceError> {
        let email = normalize_email(&request.email)?;
        require_hash(&request.password_hash)?;

        let consumer = self.store.write(|connection| {
            if db::find_consumer_by_email(connection, &email)?.is_some() {
                return Err(ServiceError::conflict(format!(
                    "consumer email {email} is already registered"
                )));
            }

            let id = db::insert_consumer(
                connection,
                &NewConsumer {
                    email: email.clone(),
                    password_hash: request.password_hash,
                    name: request.name.trim().to_string(),
                },
            )?;
            require_consumer(connection, id)
        })?;

        tracing::info!(consumer_id = consumer.id, "consumer registered");
        Ok(consumer)
    }

    pub fn get_operator(&self, id: i64) -> Result<Operator, ServiceError> {
        self.store.read(|connection| require_operator(connection, id))
    }

    pub fn get_consumer(&self, id: i64) -> Result<Consumer, ServiceError> {
        self.store.read(|connection| require_consumer(connection, id))
    }

    pub fn find_operator_by_email(&self, email: &str) -> Result<Option<Operator>, ServiceError> {
        let email = normalize_email(email)?;
        self.store
            .read(|connection| Ok(db::find_operator_by_email(connection, &email)?))
    }

    pub fn find_consumer_by_email(&self, email: &str) -> Result<Option<Consumer>, ServiceError> {
        let email = normalize_email(email)?;
        self.store
            .read(|connection| Ok(db::find_consumer_by_email(connection, &email)?))
    }

    pub fn update_operator_password(
        &self,
        id: i64,
        password_hash: &str,
    ) -> Result<Operator, ServiceError> {
        require_hash(password_hash)?;
        self.store.write(|connection| {
            if db::update_operator_password(connection, id, password_hash)? == 0 {
                return Err(ServiceError::not_found("operator", id));
            }
            require_operator(connection, id)
        })
    }

    pub fn update_consumer_password(
        &self,
        id: i64,
        password_hash: &str,
    ) -> Result<Consumer, ServiceError> {
        require_hash(password_hash)?;
        self.store.write(|connection| {
            if db::update_consumer_password(connection, id, password_hash)? == 0 {
                return Err(ServiceError::not_found("consumer", id));
            }
            require_consumer(connection, id)
        })
    }
}

pub(super) fn require_operator(connection: &Connection, id: i64) -> Result<Operator, ServiceError> {
    db::get_operator(connection, id)?.ok_or_else(|| ServiceError::not_found("operator", id))
}

pub(super) fn require_consumer(connection: &Connection, id: i64) -> Result<Consumer, ServiceError> {
    db::get_consumer(connection, id)?.ok_or_else(|| ServiceError::not_found("consumer", id))
}

fn normalize_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ServiceError::invalid(format!("malformed email address: {email:?}"))),
    }
}

fn require_hash(password_hash: &str) -> Result<(), ServiceError> {
    if password_hash.trim().is_empty() {
        return Err(ServiceError::invalid("password hash must not be empty"));
    }
    Ok(())
}
