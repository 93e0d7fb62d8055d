// Copyright 2026 the Opcode Tables Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for schema loading, slot allocation, and artifact output.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Which boundary constant a [`SchemaError`] refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// `MIN_PSEUDO_OPCODE`.
    MinPseudo,
    /// `MAX_PSEUDO_OPCODE`.
    MaxPseudo,
    /// `MIN_INSTRUMENTED_OPCODE`.
    MinInstrumented,
}

impl Boundary {
    /// The macro name used for this boundary in the generated header.
    #[must_use]
    pub const fn macro_name(self) -> &'static str {
        match self {
            Self::MinPseudo => "MIN_PSEUDO_OPCODE",
            Self::MaxPseudo => "MAX_PSEUDO_OPCODE",
            Self::MinInstrumented => "MIN_INSTRUMENTED_OPCODE",
        }
    }
}

/// A malformed or inconsistent instruction-set or metadata description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// The document could not be parsed.
    Malformed {
        /// Which document failed to parse.
        what: &'static str,
        /// Parser diagnostic.
        message: String,
    },
    /// The document declares a version this tool does not understand.
    UnsupportedVersion {
        /// Which document carried the version.
        what: &'static str,
        /// The declared version.
        version: u32,
    },
    /// A boundary constant was not defined.
    MissingBoundary(Boundary),
    /// The boundary constants are not ordered
    /// `MIN_INSTRUMENTED_OPCODE <= MIN_PSEUDO_OPCODE <= MAX_PSEUDO_OPCODE`.
    BoundaryOrder {
        /// `MIN_INSTRUMENTED_OPCODE`.
        min_instrumented: u16,
        /// `MIN_PSEUDO_OPCODE`.
        min_pseudo: u16,
        /// `MAX_PSEUDO_OPCODE`.
        max_pseudo: u16,
    },
    /// An opcode name is empty or begins with the reserved `<` marker.
    InvalidName {
        /// The offending name.
        name: String,
    },
    /// A name was bound more than once.
    DuplicateName {
        /// The duplicated name.
        name: String,
    },
    /// Two names were bound to the same code.
    DuplicateCode {
        /// The shared code.
        code: u16,
        /// The name bound first.
        first: String,
        /// The name bound second.
        second: String,
    },
    /// A code lies outside the addressable opcode space.
    CodeOutOfRange {
        /// Opcode name.
        name: String,
        /// The out-of-range code.
        code: u16,
    },
    /// A table entry names an opcode that is neither in the opcode map nor
    /// among the specialized instructions.
    UnknownOpcode {
        /// The unresolved name.
        name: String,
        /// Where the name was referenced.
        context: &'static str,
    },
    /// A specialization family is keyed by a name missing from the opcode map.
    UnknownFamilyBase {
        /// The unresolved base name.
        base: String,
    },
    /// A variant was listed under more than one specialization family.
    DuplicateFamilyMember {
        /// The variant name.
        variant: String,
        /// The family that claimed it first.
        first: String,
        /// The family that claimed it again.
        second: String,
    },
    /// A pseudo opcode appeared where only real instructions are allowed.
    PseudoOpcode {
        /// Opcode name.
        name: String,
        /// Where the name was referenced.
        context: &'static str,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { what, message } => write!(f, "malformed {what}: {message}"),
            Self::UnsupportedVersion { what, version } => {
                write!(f, "unsupported {what} version {version}")
            }
            Self::MissingBoundary(b) => write!(f, "missing boundary constant {}", b.macro_name()),
            Self::BoundaryOrder {
                min_instrumented,
                min_pseudo,
                max_pseudo,
            } => write!(
                f,
                "boundary constants out of order: MIN_INSTRUMENTED_OPCODE={min_instrumented}, \
                 MIN_PSEUDO_OPCODE={min_pseudo}, MAX_PSEUDO_OPCODE={max_pseudo}"
            ),
            Self::InvalidName { name } => write!(f, "invalid opcode name '{name}'"),
            Self::DuplicateName { name } => write!(f, "duplicate opcode name '{name}'"),
            Self::DuplicateCode {
                code,
                first,
                second,
            } => write!(f, "duplicate opcode code {code}: {first} and {second}"),
            Self::CodeOutOfRange { name, code } => {
                write!(f, "opcode {name} has out-of-range code {code}")
            }
            Self::UnknownOpcode { name, context } => {
                write!(f, "unknown opcode '{name}' in {context}")
            }
            Self::UnknownFamilyBase { base } => {
                write!(f, "specialization family base '{base}' is not in the opcode map")
            }
            Self::DuplicateFamilyMember {
                variant,
                first,
                second,
            } => write!(
                f,
                "specialized opcode '{variant}' listed under both {first} and {second}"
            ),
            Self::PseudoOpcode { name, context } => {
                write!(f, "pseudo opcode '{name}' is not allowed in {context}")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// No free code remained for a specialized instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotExhaustionError {
    /// The first instruction that could not be placed.
    pub name: String,
    /// How many specialized instructions were requested in total.
    pub requested: usize,
    /// How many had been placed before running out.
    pub allocated: usize,
}

impl fmt::Display for SlotExhaustionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no free opcode slot for specialized instruction {} ({} of {} allocated)",
            self.name, self.allocated, self.requested
        )
    }
}

impl std::error::Error for SlotExhaustionError {}

/// Any failure of the generation pipeline.
#[derive(Debug)]
pub enum Error {
    /// The input descriptions are malformed or inconsistent.
    Schema(SchemaError),
    /// Specialized instructions did not fit in the opcode space.
    SlotExhaustion(SlotExhaustionError),
    /// Reading an input or writing an artifact failed.
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(e) => write!(f, "schema error: {e}"),
            Self::SlotExhaustion(e) => write!(f, "slot exhaustion: {e}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            Self::SlotExhaustion(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<SlotExhaustionError> for Error {
    fn from(e: SlotExhaustionError) -> Self {
        Self::SlotExhaustion(e)
    }
}
