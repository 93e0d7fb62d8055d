// Copyright 2026 the Opcode Tables Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renders the public header, the internal table header, and the dispatch table.
//!
//! Output is a pure function of the inputs: every walk is in ascending code order
//! or in allocation order, never in hash order.

use crate::error::Boundary;
use crate::schema::{DISPATCH_SLOTS, Schema, is_placeholder};
use crate::slots::Allocation;
use crate::tables::Tables;

/// C symbol and macro names used in the generated files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbols {
    /// Tool name written into the banner.
    pub generator: &'static str,
    /// Include guard of the public header.
    pub public_guard: &'static str,
    /// Include guard of the internal header.
    pub internal_guard: &'static str,
    /// Macro every includer of the internal header must define.
    pub build_guard: &'static str,
    /// Macro selecting the table definitions instead of declarations.
    pub tables_guard: &'static str,
    /// File name the internal header includes for the opcode macros.
    pub public_include: &'static str,
    /// Inline cache size table.
    pub caches_table: &'static str,
    /// Deoptimization table.
    pub deopt_table: &'static str,
    /// Opcode name table.
    pub name_table: &'static str,
    /// Macro expanding to the unused-code case labels.
    pub extra_cases_macro: &'static str,
    /// Dispatch table array.
    pub dispatch_array: &'static str,
    /// Prefix of every computed-goto label.
    pub target_prefix: &'static str,
    /// Label for codes without an instruction.
    pub unknown_target: &'static str,
}

impl Default for Symbols {
    fn default() -> Self {
        Self {
            generator: "opcode_tables_codegen",
            public_guard: "Py_OPCODE_H",
            internal_guard: "Py_INTERNAL_OPCODE_H",
            build_guard: "Py_BUILD_CORE",
            tables_guard: "NEED_OPCODE_TABLES",
            public_include: "opcode.h",
            caches_table: "_PyOpcode_Caches",
            deopt_table: "_PyOpcode_Deopt",
            name_table: "_PyOpcode_OpName",
            extra_cases_macro: "EXTRA_CASES",
            dispatch_array: "opcode_targets",
            target_prefix: "TARGET_",
            unknown_target: "_unknown_opcode",
        }
    }
}

fn define(name: &str, value: impl std::fmt::Display) -> String {
    format!("#define {name:<38} {value:>3}\n")
}

/// Renders the three artifacts for one derived opcode layout.
#[derive(Clone, Copy, Debug)]
pub struct Emitter<'a> {
    schema: &'a Schema,
    allocation: &'a Allocation,
    tables: &'a Tables,
    symbols: &'a Symbols,
    source: &'a str,
}

impl<'a> Emitter<'a> {
    /// `source` names the instruction description in the banner.
    #[must_use]
    pub fn new(
        schema: &'a Schema,
        allocation: &'a Allocation,
        tables: &'a Tables,
        symbols: &'a Symbols,
        source: &'a str,
    ) -> Self {
        Self {
            schema,
            allocation,
            tables,
            symbols,
            source,
        }
    }

    fn banner(&self) -> String {
        format!(
            "// Auto-generated by {} from {}\n\n",
            self.symbols.generator, self.source
        )
    }

    /// The public header: one `#define` per opcode, specialized opcode, and
    /// binary operator.
    #[must_use]
    pub fn public_header(&self) -> String {
        let sym = self.symbols;
        let set = self.schema.instructions();
        let bounds = set.boundaries();
        let guard = sym.public_guard;

        let mut out = self.banner();
        out.push_str(&format!("#ifndef {guard}\n#define {guard}\n"));
        out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n\n");
        out.push_str("/* Instruction opcodes for compiled code */\n");

        for (code, name) in set.opname().iter().enumerate() {
            let code = code as u16;
            if code == bounds.min_pseudo {
                out.push_str(&define(Boundary::MinPseudo.macro_name(), code));
            }
            if code == bounds.min_instrumented {
                out.push_str(&define(Boundary::MinInstrumented.macro_name(), code));
            }
            if !is_placeholder(name) {
                out.push_str(&define(name, code));
            }
            if code == bounds.max_pseudo {
                out.push_str(&define(Boundary::MaxPseudo.macro_name(), code));
            }
        }

        for (name, code) in self.allocation.entries() {
            out.push_str(&define(name, code));
        }

        out.push('\n');
        for (i, op) in self.schema.metadata().nb_ops().iter().enumerate() {
            out.push_str(&define(&op.name, i));
        }

        out.push_str("\n\n#ifdef __cplusplus\n}\n#endif\n");
        out.push_str(&format!("#endif /* !{guard} */\n"));
        out
    }

    /// The internal header: cache, deopt, and name tables plus the extra-cases macro.
    #[must_use]
    pub fn internal_header(&self) -> String {
        let sym = self.symbols;
        let names = self.tables.names();
        let guard = sym.internal_guard;
        let tables_guard = sym.tables_guard;

        let mut out = self.banner();
        out.push_str(&format!("#ifndef {guard}\n#define {guard}\n"));
        out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");
        out.push_str(&format!(
            "#ifndef {b}\n#  error \"this header requires {b} define\"\n#endif\n\n",
            b = sym.build_guard
        ));
        out.push_str(&format!("#include \"{}\"\n", sym.public_include));

        out.push_str(&format!(
            "\nextern const uint8_t {}[{DISPATCH_SLOTS}];\n",
            sym.caches_table
        ));
        out.push_str(&format!(
            "\nextern const uint8_t {}[{DISPATCH_SLOTS}];\n",
            sym.deopt_table
        ));
        out.push_str(&format!("\n#ifdef {tables_guard}\n"));

        out.push_str(&format!(
            "\nconst uint8_t {}[{DISPATCH_SLOTS}] = {{\n",
            sym.caches_table
        ));
        for (code, &entries) in self.tables.caches().iter().enumerate() {
            if entries != 0 {
                out.push_str(&format!("    [{}] = {entries},\n", names[code]));
            }
        }
        out.push_str("};\n");

        out.push_str(&format!(
            "\nconst uint8_t {}[{DISPATCH_SLOTS}] = {{\n",
            sym.deopt_table
        ));
        for (code, deopt) in self.tables.deopt().iter().enumerate() {
            if let Some(base) = deopt {
                out.push_str(&format!(
                    "    [{}] = {},\n",
                    names[code],
                    names[usize::from(*base)]
                ));
            }
        }
        out.push_str("};\n");
        out.push_str(&format!("#endif   // {tables_guard}\n"));

        let count = names.len();
        out.push('\n');
        out.push_str(&format!(
            "\nextern const char *const {}[{count}];\n",
            sym.name_table
        ));
        out.push_str(&format!("\n#ifdef {tables_guard}\n"));
        out.push_str(&format!(
            "const char *const {}[{count}] = {{\n",
            sym.name_table
        ));
        for (code, name) in names.iter().enumerate() {
            if is_placeholder(name) {
                out.push_str(&format!("    [{code}] = \"{name}\",\n"));
            } else {
                out.push_str(&format!("    [{name}] = \"{name}\",\n"));
            }
        }
        out.push_str("};\n");
        out.push_str(&format!("#endif   // {tables_guard}\n"));

        out.push('\n');
        out.push_str(&format!("#define {} \\\n", sym.extra_cases_macro));
        for code in self.tables.extra_cases() {
            out.push_str(&format!("    case {code}: \\\n"));
        }
        out.push_str("        ;\n");

        out.push_str("\n#ifdef __cplusplus\n}\n#endif\n");
        out.push_str(&format!("#endif  // !{guard}\n"));
        out
    }

    /// The computed-goto dispatch table: one label per code in `[0, 256)`.
    #[must_use]
    pub fn dispatch_targets(&self) -> String {
        let sym = self.symbols;
        let targets: Vec<String> = self.tables.names()[..DISPATCH_SLOTS]
            .iter()
            .map(|name| {
                if is_placeholder(name) {
                    format!("    &&{}", sym.unknown_target)
                } else {
                    format!("    &&{}{name}", sym.target_prefix)
                }
            })
            .collect();

        let mut out = format!("static void *{}[{DISPATCH_SLOTS}] = {{\n", sym.dispatch_array);
        out.push_str(&targets.join(",\n"));
        out.push_str("\n};\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::schema::{BinaryOp, Boundaries, InstructionSet, Metadata};
    use crate::slots::{UsedSlots, allocate_specialized};

    struct Fixture {
        schema: Schema,
        allocation: Allocation,
        tables: Tables,
        symbols: Symbols,
    }

    impl Fixture {
        fn new() -> Self {
            let bounds = Boundaries {
                min_pseudo: 256,
                max_pseudo: 257,
                min_instrumented: 250,
            };
            let set = InstructionSet::new(
                bounds,
                [
                    ("CACHE", 0),
                    ("POP_TOP", 1),
                    ("LOAD_ATTR", 3),
                    ("INSTRUMENTED_CALL", 250),
                    ("SETUP_FINALLY", 256),
                    ("POP_BLOCK", 257),
                ]
                .into_iter()
                .map(|(n, c)| (n.to_string(), c)),
                BTreeMap::from([("LOAD_ATTR".to_string(), 9)]),
            )
            .unwrap();
            let meta = Metadata::new(
                vec!["LOAD_ATTR_SLOT".into()],
                BTreeMap::from([("LOAD_ATTR".to_string(), vec!["LOAD_ATTR_SLOT".to_string()])]),
                vec![
                    BinaryOp {
                        name: "NB_ADD".into(),
                        symbol: "+".into(),
                    },
                    BinaryOp {
                        name: "NB_AND".into(),
                        symbol: "&".into(),
                    },
                ],
            )
            .unwrap();
            let schema = Schema::new(set, meta).unwrap();
            let mut used = UsedSlots::seeded(schema.instructions());
            let allocation =
                allocate_specialized(schema.metadata().specialized(), &mut used, 256..=257)
                    .unwrap();
            let tables = Tables::build(&schema, &allocation, &used).unwrap();
            Self {
                schema,
                allocation,
                tables,
                symbols: Symbols::default(),
            }
        }

        fn emitter(&self) -> Emitter<'_> {
            Emitter::new(
                &self.schema,
                &self.allocation,
                &self.tables,
                &self.symbols,
                "opcode.json",
            )
        }
    }

    #[test]
    fn define_lines_are_aligned() {
        assert_eq!(
            define("NOP", 9),
            format!("#define NOP{}   9\n", " ".repeat(35))
        );
    }

    #[test]
    fn public_header_orders_markers_and_sections() {
        let f = Fixture::new();
        let text = f.emitter().public_header();
        let names: Vec<&str> = text
            .lines()
            .filter_map(|l| l.strip_prefix("#define "))
            .filter_map(|l| l.split_whitespace().next())
            .collect();
        assert_eq!(
            names,
            [
                "Py_OPCODE_H",
                "CACHE",
                "POP_TOP",
                "LOAD_ATTR",
                "MIN_INSTRUMENTED_OPCODE",
                "INSTRUMENTED_CALL",
                "MIN_PSEUDO_OPCODE",
                "SETUP_FINALLY",
                "POP_BLOCK",
                "MAX_PSEUDO_OPCODE",
                "LOAD_ATTR_SLOT",
                "NB_ADD",
                "NB_AND",
            ]
        );
        assert!(text.starts_with("// Auto-generated by opcode_tables_codegen from opcode.json\n"));
        assert!(text.ends_with("#endif /* !Py_OPCODE_H */\n"));
        assert!(text.contains(&define("LOAD_ATTR_SLOT", 2)));
        assert!(text.contains(&define("NB_AND", 1)));
    }

    #[test]
    fn internal_header_writes_sparse_tables() {
        let f = Fixture::new();
        let text = f.emitter().internal_header();
        assert!(text.contains("#  error \"this header requires Py_BUILD_CORE define\"\n"));
        assert!(text.contains("const uint8_t _PyOpcode_Caches[256] = {\n    [LOAD_ATTR] = 9,\n};\n"));
        assert!(text.contains(
            "const uint8_t _PyOpcode_Deopt[256] = {\n    [CACHE] = CACHE,\n    [POP_TOP] = POP_TOP,\n    [LOAD_ATTR_SLOT] = LOAD_ATTR,\n    [LOAD_ATTR] = LOAD_ATTR,\n    [INSTRUMENTED_CALL] = INSTRUMENTED_CALL,\n};\n"
        ));
        assert!(text.contains("extern const char *const _PyOpcode_OpName[258];\n"));
        assert!(text.contains("    [LOAD_ATTR_SLOT] = \"LOAD_ATTR_SLOT\",\n"));
        assert!(text.contains("    [4] = \"<4>\",\n"));
        assert!(text.contains("    [SETUP_FINALLY] = \"SETUP_FINALLY\",\n"));
        assert!(text.contains("#define EXTRA_CASES \\\n    case 4: \\\n"));
        assert!(text.contains("    case 255: \\\n        ;\n"));
        assert!(!text.contains("    case 250: \\\n"));
        assert!(text.ends_with("#endif  // !Py_INTERNAL_OPCODE_H\n"));
    }

    #[test]
    fn dispatch_table_has_one_label_per_code() {
        let f = Fixture::new();
        let text = f.emitter().dispatch_targets();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.first(), Some(&"static void *opcode_targets[256] = {"));
        assert_eq!(lines.last(), Some(&"};"));
        assert_eq!(lines.len(), 258);
        assert_eq!(lines[1], "    &&TARGET_CACHE,");
        assert_eq!(lines[3], "    &&TARGET_LOAD_ATTR_SLOT,");
        assert_eq!(lines[5], "    &&_unknown_opcode,");
        assert_eq!(lines[256], "    &&_unknown_opcode");
    }
}
