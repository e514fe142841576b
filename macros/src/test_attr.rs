// Floe - Rust client library for Apache Iceberg tables
// Copyright 2025 The Floe Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use darling::FromMeta;
use darling_core::Error;
use proc_macro2::TokenStream;
use quote::{ToTokens, quote, quote_spanned};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{FnArg, ItemFn, ReturnType};
use uuid::Uuid;

#[derive(Debug, FromMeta)]
pub(crate) struct MacroArgs {
    flavor: Option<String>,
    worker_threads: Option<usize>,
    table_name: Option<String>,
    no_table: darling::util::Flag,
    no_cleanup: darling::util::Flag,
}

impl MacroArgs {
    pub(crate) fn validate(&self, func: &ItemFn) -> Result<(), proc_macro::TokenStream> {
        if self.no_table.is_present() && self.table_name.is_some() {
            return fail(
                "The `no_table` argument cannot be used with `table_name`",
                &func.sig,
            );
        }

        if self.no_table.is_present() && func.sig.inputs.len() != 1 {
            return fail(
                "When using `no_table`, the test function must have exactly one argument: (ctx: TestContext)",
                &func.sig.inputs,
            );
        }

        if !self.no_table.is_present() && func.sig.inputs.len() != 2 {
            return fail(
                "Floe test function must have exactly two arguments: (ctx: TestContext, ident: TableIdent)",
                &func.sig.inputs,
            );
        }

        let mut iter = func.sig.inputs.iter();

        if let Some(FnArg::Typed(pat_type)) = iter.next() {
            let type_str = pat_type.ty.to_token_stream().to_string();
            if !type_str.contains("TestContext") {
                return fail("The first argument must be of type TestContext", pat_type);
            }
        }

        if !self.no_table.is_present()
            && let Some(FnArg::Typed(pat_type)) = iter.next()
        {
            let type_str = pat_type.ty.to_token_stream().to_string();
            if !type_str.contains("TableIdent") {
                return fail("The second argument must be of type TableIdent", pat_type);
            }
        }

        Ok(())
    }
}

fn fail<T: Spanned>(msg: &str, node: &T) -> Result<(), proc_macro::TokenStream> {
    Err(proc_macro::TokenStream::from(
        Error::custom(msg).with_span(node).write_errors(),
    ))
}

/// Expands the test macro into the final TokenStream
pub(crate) fn expand_test_macro(
    args: MacroArgs,
    mut func: ItemFn,
) -> Result<TokenStream, proc_macro::TokenStream> {
    let input_span = func.sig.paren_token.span.span();
    func.sig.output = ReturnType::Default;
    let old_inps = func.sig.inputs.clone();
    func.sig.inputs = Punctuated::default();
    let sig = func.sig.clone().into_token_stream();

    let header = generate_tokio_test_header(&args, sig);

    let test_function_block = func.block.clone().into_token_stream();

    let inner_inputs = quote_spanned!(input_span=> #old_inps);
    let inner_fn_name = create_inner_func_name(&func);
    let inner_header = quote_spanned!(func.sig.span()=> async fn #inner_fn_name(#inner_inputs));

    let prelude = quote!(
            use ::futures_util::FutureExt;
            use ::std::panic::AssertUnwindSafe;
            use ::floe::builders::CatalogApi;

            let ctx = ::floe_common::test_context::TestContext::new_from_env();
    );

    let outer_body = if args.no_table.is_present() {
        generate_no_table_body(prelude, inner_fn_name, func.block.span())
    } else {
        generate_with_table_body(prelude, inner_fn_name, &args, func.block.span())
    };

    let inner_impl = quote_spanned!(func.span()=>
        #inner_header
        #test_function_block
    );

    let mut out = TokenStream::new();
    out.extend(header);
    out.extend(outer_body);
    out.extend(inner_impl);

    Ok(out)
}

fn generate_tokio_test_header(args: &MacroArgs, sig: TokenStream) -> TokenStream {
    let flavor = args
        .flavor
        .as_ref()
        .map(ToString::to_string)
        .or(std::env::var("FLOE_TEST_TOKIO_RUNTIME_FLAVOR").ok());
    match (flavor, args.worker_threads) {
        (Some(flavor), None) => {
            quote!(#[::tokio::test(flavor = #flavor)]
            #sig
                )
        }
        (None, Some(worker_threads)) => {
            quote!(#[::tokio::test(worker_threads = #worker_threads)]
            #sig
                )
        }
        (None, None) => {
            quote!(#[::tokio::test]
            #sig
                )
        }
        (Some(flavor), Some(worker_threads)) => {
            quote!(#[::tokio::test(flavor = #flavor, worker_threads = #worker_threads)]
            #sig
                )
        }
    }
}

fn generate_no_table_body(
    prelude: TokenStream,
    inner_fn_name: TokenStream,
    span: proc_macro2::Span,
) -> TokenStream {
    quote_spanned!(span=> {
        #prelude
        #inner_fn_name(ctx).await;
    })
}

fn generate_with_table_body(
    prelude: TokenStream,
    inner_fn_name: TokenStream,
    args: &MacroArgs,
    span: proc_macro2::Span,
) -> TokenStream {
    let table_name = args
        .table_name
        .as_ref()
        .map(|t| t.to_token_stream())
        .unwrap_or_else(|| {
            let random_name = format!("test_ns.table_{}", Uuid::new_v4().simple());
            proc_macro2::Literal::string(&random_name).into_token_stream()
        });
    let maybe_cleanup = if args.no_cleanup.is_present() {
        quote! {}
    } else {
        quote! {
            ::floe_common::cleanup_guard::cleanup(client_clone, &ident).await;
        }
    };
    quote_spanned!(span=> {
        #prelude

        let client_clone = ctx.client.clone();
        let ident = ::floe::catalog::TableIdent::parse(#table_name).expect("Invalid table name");
        client_clone
            .create_table(ident.clone(), ::floe_common::utils::test_schema())
            .build()
            .send()
            .await
            .expect("Failed to create table");
        let res = AssertUnwindSafe(#inner_fn_name(ctx, ident.clone())).catch_unwind().await;
        #maybe_cleanup
        if let Err(e) = res {
            ::std::panic::resume_unwind(e);
        }
    })
}

fn create_inner_func_name(func: &ItemFn) -> TokenStream {
    let inner_name = format!("{}_test_impl", func.sig.ident);
    let ident = proc_macro2::Ident::new(&inner_name, func.sig.span());
    quote! { #ident }
}
