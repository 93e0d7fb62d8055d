// Copyright 2026 the Opcode Tables Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conformance tests for `opcode_tables`.
//!
//! The tests live in `tests/` and run against the fixture schemas in `data/`.
