// Copyright 2026 the Opcode Tables Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lookup tables derived from a schema and its specialized-opcode allocation.

use std::collections::BTreeMap;

use crate::error::SchemaError;
use crate::schema::{DISPATCH_SLOTS, Schema};
use crate::slots::{Allocation, UsedSlots};

/// The cache, deopt, and name tables plus the extra-cases list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tables {
    caches: [u8; DISPATCH_SLOTS],
    deopt: [Option<u8>; DISPATCH_SLOTS],
    names: Vec<String>,
    extra_cases: Vec<u8>,
}

impl Tables {
    /// Derives every table. `used` must already include the allocated codes.
    pub fn build(
        schema: &Schema,
        allocation: &Allocation,
        used: &UsedSlots,
    ) -> Result<Self, SchemaError> {
        let set = schema.instructions();
        let resolve = |name: &str| -> Option<u16> {
            set.code_of(name)
                .or_else(|| allocation.code_of(name).map(u16::from))
        };

        let mut caches = [0_u8; DISPATCH_SLOTS];
        for (name, &entries) in set.inline_cache_entries() {
            let code = resolve(name).ok_or_else(|| SchemaError::UnknownOpcode {
                name: name.clone(),
                context: "inline cache entries",
            })?;
            let slot = dispatch_index(name, code, "inline cache entries", set.is_pseudo(code))?;
            caches[slot] = entries;
        }

        let mut deopt = [None; DISPATCH_SLOTS];
        for &code in set.opmap().values() {
            if set.is_pseudo(code) {
                continue;
            }
            // Non-pseudo codes are below 256 by construction.
            if let Ok(code) = u8::try_from(code) {
                deopt[usize::from(code)] = Some(code);
            }
        }

        let mut family_of: BTreeMap<&str, &str> = BTreeMap::new();
        for (base, family) in schema.metadata().specializations() {
            let base_code = set
                .code_of(base)
                .ok_or_else(|| SchemaError::UnknownFamilyBase { base: base.clone() })?;
            let base_slot = dispatch_index(
                base,
                base_code,
                "specialization families",
                set.is_pseudo(base_code),
            )?;
            for variant in family {
                if let Some(first) = family_of.insert(variant.as_str(), base.as_str()) {
                    return Err(SchemaError::DuplicateFamilyMember {
                        variant: variant.clone(),
                        first: first.to_string(),
                        second: base.clone(),
                    });
                }
                let code = resolve(variant).ok_or_else(|| SchemaError::UnknownOpcode {
                    name: variant.clone(),
                    context: "specialization families",
                })?;
                let slot =
                    dispatch_index(variant, code, "specialization families", set.is_pseudo(code))?;
                deopt[slot] = u8::try_from(base_slot).ok();
            }
        }

        let mut names = set.opname().to_vec();
        for (name, code) in allocation.entries() {
            names[usize::from(*code)].clone_from(name);
        }

        let extra_cases: Vec<u8> = used.unused_dispatch_codes().collect();
        log::debug!(
            "derived tables: {} specialized, {} extra cases",
            allocation.len(),
            extra_cases.len()
        );

        Ok(Self {
            caches,
            deopt,
            names,
            extra_cases,
        })
    }

    /// Inline cache entry count per code; zero when unspecified.
    #[must_use]
    pub fn caches(&self) -> &[u8; DISPATCH_SLOTS] {
        &self.caches
    }

    /// Base code per code; `None` for pseudo and unnamed codes.
    #[must_use]
    pub fn deopt(&self) -> &[Option<u8>; DISPATCH_SLOTS] {
        &self.deopt
    }

    /// Dense name table including specialized names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Codes in `[0, 256)` no opcode occupies, ascending.
    #[must_use]
    pub fn extra_cases(&self) -> &[u8] {
        &self.extra_cases
    }
}

fn dispatch_index(
    name: &str,
    code: u16,
    context: &'static str,
    is_pseudo: bool,
) -> Result<usize, SchemaError> {
    if is_pseudo || usize::from(code) >= DISPATCH_SLOTS {
        return Err(SchemaError::PseudoOpcode {
            name: name.to_string(),
            context,
        });
    }
    Ok(usize::from(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Boundaries, InstructionSet, Metadata};
    use crate::slots::allocate_specialized;

    const BOUNDS: Boundaries = Boundaries {
        min_pseudo: 256,
        max_pseudo: 258,
        min_instrumented: 250,
    };

    fn schema(
        ops: &[(&str, u16)],
        caches: &[(&str, u8)],
        specialized: &[&str],
        families: &[(&str, &[&str])],
    ) -> Result<Schema, SchemaError> {
        let set = InstructionSet::new(
            BOUNDS,
            ops.iter().map(|(n, c)| ((*n).to_string(), *c)),
            caches.iter().map(|(n, e)| ((*n).to_string(), *e)).collect(),
        )?;
        let meta = Metadata::new(
            specialized.iter().map(|s| (*s).to_string()).collect(),
            families
                .iter()
                .map(|(b, vs)| ((*b).to_string(), vs.iter().map(|v| (*v).to_string()).collect()))
                .collect(),
            vec![],
        )?;
        Schema::new(set, meta)
    }

    fn build(schema: &Schema) -> Result<Tables, SchemaError> {
        let mut used = UsedSlots::seeded(schema.instructions());
        let alloc = allocate_specialized(
            schema.metadata().specialized(),
            &mut used,
            BOUNDS.min_pseudo..=BOUNDS.max_pseudo,
        )
        .unwrap();
        Tables::build(schema, &alloc, &used)
    }

    #[test]
    fn deopt_self_maps_bases_and_redirects_variants() {
        let s = schema(
            &[("CACHE", 0), ("LOAD_ATTR", 1), ("STORE_ATTR", 3), ("JUMP", 256)],
            &[],
            &["LOAD_ATTR_SLOT", "LOAD_ATTR_MODULE"],
            &[("LOAD_ATTR", &["LOAD_ATTR_SLOT", "LOAD_ATTR_MODULE"])],
        )
        .unwrap();
        let t = build(&s).unwrap();
        assert_eq!(t.deopt()[0], Some(0));
        assert_eq!(t.deopt()[1], Some(1));
        assert_eq!(t.deopt()[3], Some(3));
        // LOAD_ATTR_SLOT -> 2, LOAD_ATTR_MODULE -> 4
        assert_eq!(t.deopt()[2], Some(1));
        assert_eq!(t.deopt()[4], Some(1));
        assert_eq!(t.deopt()[5], None);
    }

    #[test]
    fn cache_table_is_exact() {
        let s = schema(
            &[("CACHE", 0), ("LOAD_ATTR", 1), ("CALL", 7)],
            &[("LOAD_ATTR", 9), ("CALL", 3), ("LOAD_ATTR_SLOT", 9)],
            &["LOAD_ATTR_SLOT"],
            &[],
        )
        .unwrap();
        let t = build(&s).unwrap();
        for (code, &entries) in t.caches().iter().enumerate() {
            let expected = match code {
                1 | 2 => 9,
                7 => 3,
                _ => 0,
            };
            assert_eq!(entries, expected, "code {code}");
        }
    }

    #[test]
    fn names_include_specialized_and_placeholders() {
        let s = schema(&[("CACHE", 0), ("NOP", 2)], &[], &["NOP_FAST"], &[]).unwrap();
        let t = build(&s).unwrap();
        assert_eq!(t.names().len(), 259);
        assert_eq!(t.names()[1], "NOP_FAST");
        assert_eq!(t.names()[3], "<3>");
        assert_eq!(t.extra_cases()[0], 3);
        assert_eq!(t.extra_cases().len(), 256 - 3);
    }

    #[test]
    fn unknown_family_base_is_an_error() {
        let s = schema(&[("CACHE", 0)], &[], &["X_FAST"], &[("X", &["X_FAST"])]).unwrap();
        assert_eq!(
            build(&s).unwrap_err(),
            SchemaError::UnknownFamilyBase { base: "X".into() }
        );
    }

    #[test]
    fn unknown_family_member_is_an_error() {
        let s = schema(&[("X", 1)], &[], &[], &[("X", &["X_FAST"])]).unwrap();
        assert_eq!(
            build(&s).unwrap_err(),
            SchemaError::UnknownOpcode {
                name: "X_FAST".into(),
                context: "specialization families",
            }
        );
    }

    #[test]
    fn variant_in_two_families_is_an_error() {
        let s = schema(
            &[("A", 1), ("B", 2)],
            &[],
            &["SHARED"],
            &[("A", &["SHARED"]), ("B", &["SHARED"])],
        )
        .unwrap();
        assert_eq!(
            build(&s).unwrap_err(),
            SchemaError::DuplicateFamilyMember {
                variant: "SHARED".into(),
                first: "A".into(),
                second: "B".into(),
            }
        );
    }

    #[test]
    fn unknown_cache_name_is_an_error() {
        let s = schema(&[("A", 1)], &[("B", 2)], &[], &[]).unwrap();
        assert_eq!(
            build(&s).unwrap_err(),
            SchemaError::UnknownOpcode {
                name: "B".into(),
                context: "inline cache entries",
            }
        );
    }

    #[test]
    fn pseudo_family_base_is_an_error() {
        let s = schema(
            &[("JUMP", 257)],
            &[],
            &["JUMP_FAST"],
            &[("JUMP", &["JUMP_FAST"])],
        )
        .unwrap();
        assert_eq!(
            build(&s).unwrap_err(),
            SchemaError::PseudoOpcode {
                name: "JUMP".into(),
                context: "specialization families",
            }
        );
    }
}
