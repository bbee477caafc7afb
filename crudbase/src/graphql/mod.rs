//! GraphQL building blocks: request context, error translation and resolver
//! chains.

pub mod context;
pub mod error;
pub mod resolver;

pub use context::{GraphqlContext, GraphqlContextExt, SERVICE_TOKEN_HEADER};
pub use error::{GraphqlErrorSpec, I18nSpec, generate_graphql_error};
pub use resolver::{
    CombinedResolver, FieldInfo, FieldResolver, ResolveParams, Step, combine_resolvers,
};
