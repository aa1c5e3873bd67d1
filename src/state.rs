use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Key;
use diesel::{
    SqliteConnection,
    connection::TransactionManager,
    r2d2::{ConnectionManager, Pool, PooledConnection},
};

use crate::util_resp::FailureResponse;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

type PooledConn = PooledConnection<ConnectionManager<SqliteConnection>>;

type PoolTx = <PooledConn as diesel::Connection>::TransactionManager;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub key: Key,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

/// Holds the connection (if any) which was checked out while handling a
/// request, so that the transaction opened on it can be settled once the
/// response is known.
#[derive(Clone, Default)]
pub struct TxSlot {
    inner: Arc<std::sync::Mutex<Option<ThreadSafeConn>>>,
}

impl TxSlot {
    fn get(&self) -> Option<ThreadSafeConn> {
        self.inner.lock().ok().and_then(|slot| slot.clone())
    }

    fn set(&self, conn: ThreadSafeConn) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(conn);
        }
    }

    fn take(&self) -> Option<ThreadSafeConn> {
        self.inner.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// This middleware commits the transaction opened for a request after the
/// request has been handled (or rolls it back, if the handler failed).
pub async fn tx_commit(mut req: Request, next: Next) -> Response {
    let slot = TxSlot::default();
    req.extensions_mut().insert(slot.clone());

    let res = next.run(req).await;

    let Some(conn) = slot.take() else {
        return res;
    };
    let mut conn = conn.inner.lock().await;

    let status = res.status();
    if status.is_success()
        || status.is_redirection()
        || status.is_informational()
    {
        if let Err(e) = PoolTx::commit_transaction(&mut *conn) {
            tracing::error!("failed to commit request transaction: {e}");
            return FailureResponse::ServerError(()).into_response();
        }
    } else if let Err(e) = PoolTx::rollback_transaction(&mut *conn) {
        tracing::error!("failed to roll back request transaction: {e}");
    }

    res
}

pub struct Conn {
    inner: tokio::sync::OwnedMutexGuard<PooledConn>,
}

impl Deref for Conn {
    type Target = PooledConn;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl DerefMut for Conn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.deref_mut()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Conn
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let conn = ThreadSafeConn::from_request_parts(parts, state).await?;
        let inner = conn.inner.try_lock_owned().map_err(|_| {
            tracing::error!("request connection is already in use");
            FailureResponse::ServerError(())
        })?;
        Ok(Conn { inner })
    }
}

/// A connection shared between the extractors of a single request. All
/// statements run inside one transaction, which [`tx_commit`] settles.
#[derive(Clone)]
pub struct ThreadSafeConn {
    pub inner: Arc<tokio::sync::Mutex<PooledConn>>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ThreadSafeConn
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let slot = parts.extensions.get::<TxSlot>().cloned();

        if let Some(conn) = slot.as_ref().and_then(|slot| slot.get()) {
            return Ok(conn);
        }

        let pool = DbPool::from_ref(state);
        let mut conn = tokio::task::spawn_blocking(move || pool.get())
            .await
            .map_err(|_| FailureResponse::ServerError(()))?
            .map_err(|e| {
                tracing::error!("could not check out a connection: {e}");
                FailureResponse::ServerError(())
            })?;

        match &slot {
            Some(slot) => {
                PoolTx::begin_transaction(&mut conn).map_err(|e| {
                    tracing::error!("could not begin transaction: {e}");
                    FailureResponse::ServerError(())
                })?;
                let conn = ThreadSafeConn {
                    inner: Arc::new(tokio::sync::Mutex::new(conn)),
                };
                slot.set(conn.clone());
                Ok(conn)
            }
            None => {
                // Without the commit middleware nobody would settle the
                // transaction, so statements autocommit instead.
                tracing::warn!("no transaction slot; running in autocommit");
                Ok(ThreadSafeConn {
                    inner: Arc::new(tokio::sync::Mutex::new(conn)),
                })
            }
        }
    }
}
