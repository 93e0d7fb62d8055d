// Copyright 2026 the Opcode Tables Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed instruction-set and metadata descriptions.
//!
//! Both descriptions are JSON documents. The instruction-set document carries the
//! opcode map, the pseudo/instrumented boundary constants, and the inline cache
//! sizes. The metadata document carries the specialized instruction list, the
//! specialization families, and the binary-operator names.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Boundary, Error, SchemaError};

/// Number of codes the interpreter can dispatch on.
pub const DISPATCH_SLOTS: usize = 256;

/// First character of synthetic names given to unnamed codes (`<42>`).
pub const PLACEHOLDER_MARKER: char = '<';

const SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInstructionSet {
    version: u32,
    #[serde(rename = "MIN_PSEUDO_OPCODE")]
    min_pseudo_opcode: Option<u16>,
    #[serde(rename = "MAX_PSEUDO_OPCODE")]
    max_pseudo_opcode: Option<u16>,
    #[serde(rename = "MIN_INSTRUMENTED_OPCODE")]
    min_instrumented_opcode: Option<u16>,
    opcodes: Vec<RawOpcode>,
    #[serde(default)]
    inline_cache_entries: BTreeMap<String, u8>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOpcode {
    name: String,
    code: u16,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMetadata {
    version: u32,
    specialized_instructions: Vec<String>,
    #[serde(default)]
    specializations: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    nb_ops: Vec<(String, String)>,
}

/// The pseudo and instrumented range boundaries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Boundaries {
    /// First pseudo opcode.
    pub min_pseudo: u16,
    /// Last pseudo opcode (inclusive).
    pub max_pseudo: u16,
    /// First instrumented opcode.
    pub min_instrumented: u16,
}

impl Boundaries {
    fn validate(self) -> Result<Self, SchemaError> {
        if self.min_instrumented > self.min_pseudo || self.min_pseudo > self.max_pseudo {
            return Err(SchemaError::BoundaryOrder {
                min_instrumented: self.min_instrumented,
                min_pseudo: self.min_pseudo,
                max_pseudo: self.max_pseudo,
            });
        }
        Ok(self)
    }

    /// Returns `true` if `code` lies in `[MIN_PSEUDO_OPCODE, MAX_PSEUDO_OPCODE]`.
    #[must_use]
    pub fn is_pseudo(self, code: u16) -> bool {
        (self.min_pseudo..=self.max_pseudo).contains(&code)
    }

    /// Length of the dense name table: every pseudo code plus the full dispatch range.
    #[must_use]
    pub fn opcode_space(self) -> usize {
        (usize::from(self.max_pseudo) + 1).max(DISPATCH_SLOTS)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with(PLACEHOLDER_MARKER)
}

/// Returns `true` if `name` is a synthetic placeholder for an unnamed code.
#[must_use]
pub fn is_placeholder(name: &str) -> bool {
    name.starts_with(PLACEHOLDER_MARKER)
}

/// The loaded instruction-set description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionSet {
    opmap: BTreeMap<String, u16>,
    opname: Vec<String>,
    boundaries: Boundaries,
    inline_cache_entries: BTreeMap<String, u8>,
}

impl InstructionSet {
    /// Builds an instruction set from already-parsed parts, checking that names and
    /// codes form a bijection inside the addressable opcode space.
    pub fn new(
        boundaries: Boundaries,
        opcodes: impl IntoIterator<Item = (String, u16)>,
        inline_cache_entries: BTreeMap<String, u8>,
    ) -> Result<Self, SchemaError> {
        let boundaries = boundaries.validate()?;
        let space = boundaries.opcode_space();
        let mut opname: Vec<String> = (0..space).map(|code| format!("<{code}>")).collect();
        let mut opmap = BTreeMap::new();

        for (name, code) in opcodes {
            if !is_valid_name(&name) {
                return Err(SchemaError::InvalidName { name });
            }
            if usize::from(code) >= DISPATCH_SLOTS && !boundaries.is_pseudo(code) {
                return Err(SchemaError::CodeOutOfRange { name, code });
            }
            let slot = &mut opname[usize::from(code)];
            if !is_placeholder(slot) {
                return Err(SchemaError::DuplicateCode {
                    code,
                    first: slot.clone(),
                    second: name,
                });
            }
            if opmap.contains_key(&name) {
                return Err(SchemaError::DuplicateName { name });
            }
            slot.clone_from(&name);
            opmap.insert(name, code);
        }

        Ok(Self {
            opmap,
            opname,
            boundaries,
            inline_cache_entries,
        })
    }

    /// Parses the JSON instruction-set description.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let raw: RawInstructionSet =
            serde_json::from_str(json).map_err(|e| SchemaError::Malformed {
                what: "instruction set",
                message: e.to_string(),
            })?;
        if raw.version != SCHEMA_VERSION {
            return Err(SchemaError::UnsupportedVersion {
                what: "instruction set",
                version: raw.version,
            });
        }
        let boundaries = Boundaries {
            min_pseudo: raw
                .min_pseudo_opcode
                .ok_or(SchemaError::MissingBoundary(Boundary::MinPseudo))?,
            max_pseudo: raw
                .max_pseudo_opcode
                .ok_or(SchemaError::MissingBoundary(Boundary::MaxPseudo))?,
            min_instrumented: raw
                .min_instrumented_opcode
                .ok_or(SchemaError::MissingBoundary(Boundary::MinInstrumented))?,
        };
        Self::new(
            boundaries,
            raw.opcodes.into_iter().map(|op| (op.name, op.code)),
            raw.inline_cache_entries,
        )
    }

    /// Name to code mapping for every named opcode, pseudo ones included.
    #[must_use]
    pub fn opmap(&self) -> &BTreeMap<String, u16> {
        &self.opmap
    }

    /// Dense code to name array; unnamed codes hold a `<N>` placeholder.
    #[must_use]
    pub fn opname(&self) -> &[String] {
        &self.opname
    }

    /// Code of the named opcode, if any.
    #[must_use]
    pub fn code_of(&self, name: &str) -> Option<u16> {
        self.opmap.get(name).copied()
    }

    /// Returns `true` if `code` is a pseudo opcode.
    #[must_use]
    pub fn is_pseudo(&self, code: u16) -> bool {
        self.boundaries.is_pseudo(code)
    }

    /// Boundary constants.
    #[must_use]
    pub fn boundaries(&self) -> Boundaries {
        self.boundaries
    }

    /// Inline cache entry counts by opcode name.
    #[must_use]
    pub fn inline_cache_entries(&self) -> &BTreeMap<String, u8> {
        &self.inline_cache_entries
    }
}

/// A binary-operator name and its source-level symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryOp {
    /// Macro name, e.g. `NB_ADD`.
    pub name: String,
    /// Operator symbol, e.g. `+`.
    pub symbol: String,
}

/// The loaded specialization metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    specialized: Vec<String>,
    specializations: BTreeMap<String, Vec<String>>,
    nb_ops: Vec<BinaryOp>,
}

impl Metadata {
    /// Builds metadata from already-parsed parts.
    ///
    /// `specialized` order decides code assignment and must not contain repeats.
    pub fn new(
        specialized: Vec<String>,
        specializations: BTreeMap<String, Vec<String>>,
        nb_ops: Vec<BinaryOp>,
    ) -> Result<Self, SchemaError> {
        let mut seen = BTreeSet::new();
        for name in &specialized {
            if !is_valid_name(name) {
                return Err(SchemaError::InvalidName { name: name.clone() });
            }
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateName { name: name.clone() });
            }
        }
        Ok(Self {
            specialized,
            specializations,
            nb_ops,
        })
    }

    /// Parses the JSON metadata description.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let raw: RawMetadata = serde_json::from_str(json).map_err(|e| SchemaError::Malformed {
            what: "metadata",
            message: e.to_string(),
        })?;
        if raw.version != SCHEMA_VERSION {
            return Err(SchemaError::UnsupportedVersion {
                what: "metadata",
                version: raw.version,
            });
        }
        let nb_ops = raw
            .nb_ops
            .into_iter()
            .map(|(name, symbol)| BinaryOp { name, symbol })
            .collect();
        Self::new(raw.specialized_instructions, raw.specializations, nb_ops)
    }

    /// Specialized instruction names in allocation order.
    #[must_use]
    pub fn specialized(&self) -> &[String] {
        &self.specialized
    }

    /// Specialization families: base opcode name to its variants.
    #[must_use]
    pub fn specializations(&self) -> &BTreeMap<String, Vec<String>> {
        &self.specializations
    }

    /// Binary-operator names in ordinal order.
    #[must_use]
    pub fn nb_ops(&self) -> &[BinaryOp] {
        &self.nb_ops
    }
}

/// An instruction set paired with its metadata, cross-checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    instructions: InstructionSet,
    metadata: Metadata,
}

impl Schema {
    /// Pairs the two descriptions, rejecting specialized names that shadow an
    /// opcode map entry.
    pub fn new(instructions: InstructionSet, metadata: Metadata) -> Result<Self, SchemaError> {
        if let Some(name) = metadata
            .specialized()
            .iter()
            .find(|name| instructions.opmap().contains_key(name.as_str()))
        {
            return Err(SchemaError::DuplicateName { name: name.clone() });
        }
        Ok(Self {
            instructions,
            metadata,
        })
    }

    /// Parses both JSON descriptions.
    pub fn from_json(instructions: &str, metadata: &str) -> Result<Self, SchemaError> {
        Self::new(
            InstructionSet::from_json(instructions)?,
            Metadata::from_json(metadata)?,
        )
    }

    /// Reads and parses both descriptions from disk.
    pub fn load(instructions: &Path, metadata: &Path) -> Result<Self, Error> {
        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        let instructions_json = read(instructions)?;
        let metadata_json = read(metadata)?;
        Ok(Self::from_json(&instructions_json, &metadata_json)?)
    }

    /// The instruction-set description.
    #[must_use]
    pub fn instructions(&self) -> &InstructionSet {
        &self.instructions
    }

    /// The specialization metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}
