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

//! Per-partition-field summaries stored in manifest-list entries

use super::types::{FieldSummary, PartitionData};
use crate::metadata::Literal;

#[derive(Debug, Default)]
struct FieldStats {
    contains_null: bool,
    contains_nan: bool,
    lower: Option<Literal>,
    upper: Option<Literal>,
}

impl FieldStats {
    fn update(&mut self, value: Option<&Literal>) {
        let Some(value) = value else {
            self.contains_null = true;
            return;
        };
        if value.is_nan() {
            self.contains_nan = true;
            return;
        }
        if self.lower.as_ref().is_none_or(|l| value < l) {
            self.lower = Some(value.clone());
        }
        if self.upper.as_ref().is_none_or(|u| value > u) {
            self.upper = Some(value.clone());
        }
    }

    fn finish(self, is_floating: bool) -> FieldSummary {
        FieldSummary {
            contains_null: self.contains_null,
            contains_nan: is_floating.then_some(self.contains_nan),
            lower_bound: self.lower.map(|l| l.to_bytes()),
            upper_bound: self.upper.map(|u| u.to_bytes()),
        }
    }
}

/// Accumulates partition tuples of the files written into one manifest
#[derive(Debug)]
pub struct PartitionSummaryBuilder {
    fields: Vec<FieldStats>,
    floating: Vec<bool>,
}

impl PartitionSummaryBuilder {
    /// `floating[i]` marks partition fields of float or double type
    pub fn new(floating: Vec<bool>) -> Self {
        PartitionSummaryBuilder {
            fields: floating.iter().map(|_| FieldStats::default()).collect(),
            floating,
        }
    }

    pub fn update(&mut self, partition: &PartitionData) {
        for (i, stats) in self.fields.iter_mut().enumerate() {
            stats.update(partition.get(i));
        }
    }

    pub fn finish(self) -> Vec<FieldSummary> {
        self.fields
            .into_iter()
            .zip(self.floating)
            .map(|(stats, floating)| stats.finish(floating))
            .collect()
    }
}
