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

//! Response type for CreateTable operation

use crate::impl_has_table;
use crate::table::Table;

/// Response from CreateTable operation
///
/// Holds the table at metadata version 0.
#[derive(Clone, Debug)]
pub struct CreateTableResponse {
    table: Table,
}

impl_has_table!(CreateTableResponse);
