//! Procedural macros for crudbase
//!
//! This crate provides macros to reduce boilerplate in services built on crudbase:
//!
//! - `paging_result!` - Generate a concrete GraphQL type for `PagingResult<T>`

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse::Parse, parse::ParseStream, parse_macro_input, Ident, Token, Type};

/// Generate a GraphQL paging result type for an entity.
///
/// async-graphql cannot expose the generic `crudbase::query::PagingResult<T>`
/// directly, so each entity gets its own concrete object.
///
/// # Usage
///
/// ```ignore
/// // Struct named `NotePagingResult`
/// paging_result!(Note);
///
/// // Explicit struct name
/// paging_result!(NotePage, Note);
/// ```
///
/// # Generated Code
///
/// For `paging_result!(NotePage, Note)`:
///
/// ```ignore
/// #[derive(Debug, Clone, async_graphql::SimpleObject)]
/// pub struct NotePage {
///     pub data: Vec<Note>,
///     pub page_info: crudbase::query::PageInfo,
/// }
///
/// impl From<crudbase::query::PagingResult<Note>> for NotePage { ... }
/// ```
#[proc_macro]
pub fn paging_result(input: TokenStream) -> TokenStream {
    let parsed = parse_macro_input!(input as PagingResultInput);

    let struct_name = &parsed.name;
    let node_type = &parsed.node;

    let output: proc_macro2::TokenStream = quote! {
        #[derive(Debug, Clone, async_graphql::SimpleObject)]
        pub struct #struct_name {
            pub data: Vec<#node_type>,
            pub page_info: ::crudbase::query::PageInfo,
        }

        impl #struct_name {
            pub fn total_count(&self) -> i64 {
                self.page_info.total_count
            }
        }

        impl From<::crudbase::query::PagingResult<#node_type>> for #struct_name {
            fn from(result: ::crudbase::query::PagingResult<#node_type>) -> Self {
                Self {
                    data: result.data,
                    page_info: result.page_info,
                }
            }
        }
    };
    output.into()
}

/// Input for paging_result! macro
struct PagingResultInput {
    name: Ident,
    node: Type,
}

impl Parse for PagingResultInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let first: Type = input.parse()?;

        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            let node: Type = input.parse()?;
            let name = match first {
                Type::Path(ref path) if path.qself.is_none() => path
                    .path
                    .get_ident()
                    .cloned()
                    .ok_or_else(|| syn::Error::new_spanned(&first, "expected a struct name"))?,
                _ => return Err(syn::Error::new_spanned(&first, "expected a struct name")),
            };
            Ok(PagingResultInput { name, node })
        } else {
            let base = match first {
                Type::Path(ref path) => path
                    .path
                    .segments
                    .last()
                    .map(|s| s.ident.clone())
                    .ok_or_else(|| syn::Error::new_spanned(&first, "expected an entity type"))?,
                _ => return Err(syn::Error::new_spanned(&first, "expected an entity type")),
            };
            Ok(PagingResultInput {
                name: format_ident!("{}PagingResult", base),
                node: first,
            })
        }
    }
}
