//! Request dispatch
//!
//! A [`Dispatcher`] owns a registry from [`EntityKind`] to handler, built once
//! from the store configuration. Table names that map to no kind fall through
//! to the [`GenericHandler`], so every whitelisted table keeps plain CRUD.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{Instrument, info_span, warn};

use crate::catalog::{CatalogSchema, REFERENCE_TABLES};
use crate::config::{Clock, StoreConfig};
use crate::error::Result;
use crate::executor::Executor;
use crate::handlers::{
    CopyHandler, CredentialHandler, DocumentHandler, DocumentKind, EntityHandler, GenericHandler,
    HandlerContext, OrderHandler, ReferenceHandler, SubscriptionHandler,
};
use crate::types::{Operation, Request, Response};

/// Entity kinds with a specialized handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Book,
    Dvd,
    Periodical,
    Order,
    Subscription,
    Copy,
    Credential,
    Reference,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Book,
        EntityKind::Dvd,
        EntityKind::Periodical,
        EntityKind::Order,
        EntityKind::Subscription,
        EntityKind::Copy,
        EntityKind::Credential,
        EntityKind::Reference,
    ];

    /// Kind served for a request table name, `None` for generic tables
    pub fn from_table(table: &str) -> Option<Self> {
        let kind = match table {
            "livre" => EntityKind::Book,
            "dvd" => EntityKind::Dvd,
            "revue" => EntityKind::Periodical,
            "commande" | "commandes" => EntityKind::Order,
            "abonnement" => EntityKind::Subscription,
            "exemplaire" => EntityKind::Copy,
            "utilisateur" => EntityKind::Credential,
            t if REFERENCE_TABLES.contains(&t) => EntityKind::Reference,
            _ => return None,
        };
        Some(kind)
    }

    /// Stock handler for this kind
    pub fn default_handler(&self) -> Arc<dyn EntityHandler> {
        match self {
            EntityKind::Book => Arc::new(DocumentHandler::new(DocumentKind::Book)),
            EntityKind::Dvd => Arc::new(DocumentHandler::new(DocumentKind::Dvd)),
            EntityKind::Periodical => Arc::new(DocumentHandler::new(DocumentKind::Periodical)),
            EntityKind::Order => Arc::new(OrderHandler::new()),
            EntityKind::Subscription => Arc::new(SubscriptionHandler::new()),
            EntityKind::Copy => Arc::new(CopyHandler::new()),
            EntityKind::Credential => Arc::new(CredentialHandler::new()),
            EntityKind::Reference => Arc::new(ReferenceHandler::new()),
        }
    }
}

/// Routes requests to the handler registered for their entity kind
pub struct Dispatcher {
    handlers: HashMap<EntityKind, Arc<dyn EntityHandler>>,
    fallback: Arc<dyn EntityHandler>,
    executor: Arc<dyn Executor>,
    catalog: CatalogSchema,
    clock: Clock,
    expiry_window_days: i64,
}

impl Dispatcher {
    /// Dispatcher with the stock handler for every kind
    pub fn new(executor: Arc<dyn Executor>, config: &StoreConfig) -> Self {
        let handlers = EntityKind::ALL
            .iter()
            .map(|kind| (*kind, kind.default_handler()))
            .collect();

        Self {
            handlers,
            fallback: Arc::new(GenericHandler::new()),
            executor,
            catalog: config.catalog.clone(),
            clock: config.clock,
            expiry_window_days: config.expiry_window_days,
        }
    }

    /// Replace the handler for `kind`
    pub fn register(&mut self, kind: EntityKind, handler: Arc<dyn EntityHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn catalog(&self) -> &CatalogSchema {
        &self.catalog
    }

    fn handler_for(&self, table: &str) -> &Arc<dyn EntityHandler> {
        EntityKind::from_table(table)
            .and_then(|kind| self.handlers.get(&kind))
            .unwrap_or(&self.fallback)
    }

    /// Serve one request
    ///
    /// Malformed requests and vetoed deletes come back as rejections (see
    /// [`CatalogError::is_rejection`](crate::error::CatalogError::is_rejection))
    /// without any write having been issued.
    pub async fn handle(&self, request: &Request) -> Result<Response> {
        let span = info_span!(
            "catalog_request",
            request_id = %uuid::Uuid::new_v4(),
            table = %request.table,
            operation = %request.operation,
        );

        async {
            let result = self.route(request).await;
            if let Err(e) = &result {
                if e.is_rejection() {
                    warn!(error = %e, "request rejected");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Like [`handle`](Self::handle), with every rejection mapped to `None`
    ///
    /// Execution failures still propagate as errors.
    pub async fn handle_compat(&self, request: &Request) -> Result<Option<Response>> {
        match self.handle(request).await {
            Ok(response) => Ok(Some(response)),
            Err(e) if e.is_rejection() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn route(&self, request: &Request) -> Result<Response> {
        let ctx = HandlerContext {
            executor: self.executor.as_ref(),
            catalog: &self.catalog,
            clock: self.clock,
            expiry_window_days: self.expiry_window_days,
        };
        let handler = self.handler_for(&request.table);

        match request.operation {
            Operation::Select => handler.select(&ctx, request).await.map(Response::Rows),
            Operation::Insert => handler.insert(&ctx, request).await.map(Response::Affected),
            Operation::Update => handler.update(&ctx, request).await.map(Response::Affected),
            Operation::Delete => handler.delete(&ctx, request).await.map(Response::Affected),
        }
    }
}
