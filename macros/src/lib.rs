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

mod test_attr;

use darling::ast::NestedMeta;
use darling::{Error, FromMeta};
use syn::ItemFn;
extern crate proc_macro;

/// A proc macro attribute for writing Floe table tests.
///
/// This macro extends `#[tokio::test]`: it builds a [`TestContext`] from the
/// environment, creates a table for the test and purges it afterwards, even
/// when the test panics.
///
/// By default, it requires the test function to have two parameters:
///
/// - `ctx: TestContext` - The test context giving access to a catalog client.
/// - `ident: TableIdent` - The identifier of the table created for the test.
///
/// ```no_run
/// use floe::catalog::TableIdent;
/// use floe_common::test_context::TestContext;
/// #[floe_macros::test]
/// async fn my_test(ctx: TestContext, ident: TableIdent) {
///    // Your test code here
/// }
/// ```
///
/// If the `no_table` argument is provided, the test function must have only one parameter:
///
/// ```no_run
/// use floe_common::test_context::TestContext;
/// #[floe_macros::test(no_table)]
/// async fn my_test(ctx: TestContext) {
///    // Your test code here
/// }
/// ```
/// The macro also supports additional arguments:
///
/// - `flavor`: Specifies the flavor of the Tokio test (e.g., "multi_thread").
/// - `worker_threads`: Specifies the number of worker threads for the Tokio test.
/// - `table_name`: Dotted identifier of the table to create. If not provided, a random one is generated.
/// - `no_cleanup`: Leaves the table and its files in place after the test.
///
/// [`TestContext`]: https://docs.rs/floe-common
#[proc_macro_attribute]
pub fn test(
    args: proc_macro::TokenStream,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    // Parse the function
    let input_fn = match syn::parse::<ItemFn>(input.clone()) {
        Ok(input_fn) => input_fn,
        Err(err) => return err.to_compile_error().into(),
    };

    // Parse the macro arguments
    let attr_args = match NestedMeta::parse_meta_list(args.into()) {
        Ok(v) => v,
        Err(e) => return Error::from(e).write_errors().into(),
    };

    let args = match test_attr::MacroArgs::from_list(&attr_args) {
        Ok(v) => v,
        Err(e) => return e.write_errors().into(),
    };

    if let Err(err) = args.validate(&input_fn) {
        return err;
    }

    match test_attr::expand_test_macro(args, input_fn) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.into(),
    }
}
