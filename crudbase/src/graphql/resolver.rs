//! Sequential resolver chains.
//!
//! A chain runs its resolvers one after another with the same parameters.
//! A resolver returns [`Step::Skip`] to hand over to the next one (guards,
//! validators) or [`Step::Done`] to produce the field value. The first error
//! stops the chain and is turned into a GraphQL error: codes meant for users
//! get a translated message, anything else becomes `INTERNAL_SERVER_ERROR`.
//!
//! ```rust,ignore
//! let resolver = CombinedResolver::new()
//!     .then(|p: Arc<ResolveParams<(), NoteArgs>>| async move {
//!         if p.context.uid.is_none() {
//!             return Err(Error::custom(ErrorCode::Unauthenticated, "application.error.401"));
//!         }
//!         Ok(Step::Skip)
//!     })
//!     .then(move |p| {
//!         let service = service.clone();
//!         async move { Ok(Step::Done(service.detail(FindOptions::by_id(&p.args.id)).await?)) }
//!     });
//!
//! let note = resolver.resolve_in(ctx, (), args).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_graphql::Context;
use futures::future::BoxFuture;
use tracing::{debug, error};

use super::context::{GraphqlContext, GraphqlContextExt};
use super::error::{GraphqlErrorSpec, generate_graphql_error};
use crate::error::{Error, ErrorCode, Result};
use crate::i18n::I18n;

/// Outcome of one resolver in a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// Defer to the next resolver
    Skip,
    Done(T),
}

/// The field being resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldInfo {
    pub field_name: String,
    /// Response path, e.g. `notes.0.title`
    pub path: String,
}

impl FieldInfo {
    pub fn from_context(ctx: &Context<'_>) -> Self {
        Self {
            field_name: ctx.field().name().to_string(),
            path: ctx.path_node.map(|node| node.to_string()).unwrap_or_default(),
        }
    }
}

/// Everything a resolver in a chain receives.
#[derive(Debug, Clone)]
pub struct ResolveParams<S, A> {
    pub source: S,
    pub args: A,
    pub context: GraphqlContext,
    pub info: FieldInfo,
}

/// One step of a resolver chain.
///
/// Implemented for any `Fn(Arc<ResolveParams<S, A>>) -> impl Future<Output =
/// Result<Step<T>>>` closure.
pub trait FieldResolver<S, A, T>: Send + Sync {
    fn resolve(&self, params: Arc<ResolveParams<S, A>>) -> BoxFuture<'static, Result<Step<T>>>;
}

impl<S, A, T, F, Fut> FieldResolver<S, A, T> for F
where
    F: Fn(Arc<ResolveParams<S, A>>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Step<T>>> + Send + 'static,
{
    fn resolve(&self, params: Arc<ResolveParams<S, A>>) -> BoxFuture<'static, Result<Step<T>>> {
        Box::pin(self(params))
    }
}

pub struct CombinedResolver<S, A, T> {
    resolvers: Vec<Box<dyn FieldResolver<S, A, T>>>,
}

impl<S, A, T> Default for CombinedResolver<S, A, T> {
    fn default() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }
}

/// Chain `resolvers` in order.
pub fn combine_resolvers<S, A, T>(
    resolvers: Vec<Box<dyn FieldResolver<S, A, T>>>,
) -> CombinedResolver<S, A, T> {
    CombinedResolver { resolvers }
}

impl<S, A, T> CombinedResolver<S, A, T>
where
    S: Send + Sync + 'static,
    A: Send + Sync + 'static,
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver to the chain.
    pub fn then(mut self, resolver: impl FieldResolver<S, A, T> + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Run the chain. `Ok(None)` when every resolver skipped.
    pub async fn run(
        &self,
        params: ResolveParams<S, A>,
        i18n: &I18n,
    ) -> async_graphql::Result<Option<T>> {
        let params = Arc::new(params);

        for (index, resolver) in self.resolvers.iter().enumerate() {
            match resolver.resolve(Arc::clone(&params)).await {
                Ok(Step::Skip) => {
                    debug!(field = %params.info.field_name, index, "Resolver skipped");
                }
                Ok(Step::Done(value)) => return Ok(Some(value)),
                Err(e) => return Err(to_graphql_error(&e, params.context.lang(), i18n)),
            }
        }

        Ok(None)
    }

    /// Run the chain with the request context and catalog stored in the
    /// schema data. Missing data falls back to defaults.
    pub async fn resolve_in(
        &self,
        ctx: &Context<'_>,
        source: S,
        args: A,
    ) -> async_graphql::Result<Option<T>> {
        let params = ResolveParams {
            source,
            args,
            context: ctx.request_context(),
            info: FieldInfo::from_context(ctx),
        };

        match ctx.data_opt::<I18n>() {
            Some(i18n) => self.run(params, i18n).await,
            None => self.run(params, &I18n::default()).await,
        }
    }
}

fn to_graphql_error(err: &Error, lang: &str, i18n: &I18n) -> async_graphql::Error {
    let code = err.code();

    if code.is_translatable() {
        debug!(code = %code, phrase = %err, lang, "Resolver chain rejected");
        return generate_graphql_error(GraphqlErrorSpec::phrase(err.to_string(), lang, code), i18n);
    }

    error!(error = %err, "Resolver chain failed");
    generate_graphql_error(
        GraphqlErrorSpec::message(err.to_string(), ErrorCode::InternalServerError),
        i18n,
    )
}
