// Copyright 2026 the Opcode Tables Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `opcode_tables`: derives an interpreter's opcode headers from a declarative
//! instruction-set description.
//!
//! The pipeline runs in two phases over a single occupancy bitmap:
//!
//! 1. assign: every named opcode marks its code used, then each specialized
//!    instruction takes the lowest free code ([`slots::allocate_specialized`]);
//! 2. derive: the cache, deopt, and name tables and the unused-code list are
//!    computed from the result ([`tables::Tables`]) and rendered ([`emit::Emitter`]).
//!
//! ## Example
//!
//! ```
//! use opcode_tables::schema::Schema;
//!
//! let instructions = r#"{
//!     "version": 1,
//!     "MIN_INSTRUMENTED_OPCODE": 250,
//!     "MIN_PSEUDO_OPCODE": 256,
//!     "MAX_PSEUDO_OPCODE": 256,
//!     "opcodes": [
//!         { "name": "CACHE", "code": 0 },
//!         { "name": "LOAD_ATTR", "code": 1 },
//!         { "name": "JUMP", "code": 256 }
//!     ],
//!     "inline_cache_entries": { "LOAD_ATTR": 9 }
//! }"#;
//! let metadata = r#"{
//!     "version": 1,
//!     "specialized_instructions": ["LOAD_ATTR_SLOT"],
//!     "specializations": { "LOAD_ATTR": ["LOAD_ATTR_SLOT"] },
//!     "nb_ops": [["NB_ADD", "+"]]
//! }"#;
//!
//! let schema = Schema::from_json(instructions, metadata)?;
//! let derived = opcode_tables::derive(&schema)?;
//! assert_eq!(derived.allocation.code_of("LOAD_ATTR_SLOT"), Some(2));
//! assert_eq!(derived.tables.deopt()[2], Some(1));
//!
//! let artifacts = opcode_tables::generate(&schema, "opcode.json")?;
//! assert!(artifacts.dispatch_targets.contains("&&TARGET_LOAD_ATTR_SLOT"));
//! # Ok::<(), opcode_tables::Error>(())
//! ```

pub mod emit;
pub mod error;
pub mod output;
pub mod schema;
pub mod slots;
pub mod tables;

use std::path::Path;

pub use error::{Error, SchemaError, SlotExhaustionError};

use emit::{Emitter, Symbols};
use schema::Schema;
use slots::{Allocation, UsedSlots, allocate_specialized};
use tables::Tables;

/// Everything computed from a schema before rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Derived {
    /// Occupancy after allocation.
    pub used: UsedSlots,
    /// Specialized instruction codes.
    pub allocation: Allocation,
    /// Lookup tables.
    pub tables: Tables,
}

/// Runs the assign and derive phases.
pub fn derive(schema: &Schema) -> Result<Derived, Error> {
    let set = schema.instructions();
    let bounds = set.boundaries();
    let mut used = UsedSlots::seeded(set);
    let allocation = allocate_specialized(
        schema.metadata().specialized(),
        &mut used,
        bounds.min_pseudo..=bounds.max_pseudo,
    )?;
    let tables = Tables::build(schema, &allocation, &used)?;
    Ok(Derived {
        used,
        allocation,
        tables,
    })
}

/// The three rendered files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifacts {
    /// Opcode `#define`s.
    pub public_header: String,
    /// Cache, deopt, and name tables plus `EXTRA_CASES`.
    pub internal_header: String,
    /// Computed-goto target array.
    pub dispatch_targets: String,
}

/// Derives and renders all artifacts with the default [`Symbols`].
///
/// `source` names the instruction description in the generated banner.
pub fn generate(schema: &Schema, source: &str) -> Result<Artifacts, Error> {
    generate_with(schema, &Symbols::default(), source)
}

/// Derives and renders all artifacts with custom symbol names.
pub fn generate_with(schema: &Schema, symbols: &Symbols, source: &str) -> Result<Artifacts, Error> {
    let derived = derive(schema)?;
    let emitter = Emitter::new(
        schema,
        &derived.allocation,
        &derived.tables,
        symbols,
        source,
    );
    Ok(Artifacts {
        public_header: emitter.public_header(),
        internal_header: emitter.internal_header(),
        dispatch_targets: emitter.dispatch_targets(),
    })
}

/// Destination paths for [`Artifacts`].
#[derive(Copy, Clone, Debug)]
pub struct OutputPaths<'a> {
    /// Public header.
    pub public_header: &'a Path,
    /// Dispatch table fragment.
    pub dispatch_targets: &'a Path,
    /// Internal header.
    pub internal_header: &'a Path,
}

impl Artifacts {
    /// Writes every artifact via [`output::write_artifact`].
    pub fn write(&self, paths: OutputPaths<'_>) -> Result<(), Error> {
        output::write_artifact(paths.public_header, &self.public_header)?;
        output::write_artifact(paths.internal_header, &self.internal_header)?;
        output::write_artifact(paths.dispatch_targets, &self.dispatch_targets)?;
        Ok(())
    }
}
