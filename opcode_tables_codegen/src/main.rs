// Copyright 2026 the Opcode Tables Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![doc = "Regenerates the opcode headers and dispatch table from the instruction schema.\n\n\
          Usage: `opcode_tables_codegen <opcode.json> <opcode_metadata.json> <opcode.h> \
          <opcode_targets.h> <pycore_opcode.h>`\n"]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use opcode_tables::OutputPaths;
use opcode_tables::schema::Schema;

const USAGE: &str = "usage: opcode_tables_codegen <opcode.json> <opcode_metadata.json> \
                     <opcode.h> <opcode_targets.h> <pycore_opcode.h>";

struct Args {
    instructions: PathBuf,
    metadata: PathBuf,
    public_header: PathBuf,
    dispatch_targets: PathBuf,
    internal_header: PathBuf,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut args = args.into_iter().map(PathBuf::from);
    let (
        Some(instructions),
        Some(metadata),
        Some(public_header),
        Some(dispatch_targets),
        Some(internal_header),
        None,
    ) = (
        args.next(),
        args.next(),
        args.next(),
        args.next(),
        args.next(),
        args.next(),
    )
    else {
        bail!(USAGE);
    };
    Ok(Args {
        instructions,
        metadata,
        public_header,
        dispatch_targets,
        internal_header,
    })
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run(args: &Args) -> Result<()> {
    let schema = Schema::load(&args.instructions, &args.metadata).with_context(|| {
        format!(
            "load {} and {}",
            args.instructions.display(),
            args.metadata.display()
        )
    })?;

    let artifacts = opcode_tables::generate(&schema, &source_name(&args.instructions))
        .with_context(|| format!("generate tables from {}", args.instructions.display()))?;

    artifacts
        .write(OutputPaths {
            public_header: &args.public_header,
            dispatch_targets: &args.dispatch_targets,
            internal_header: &args.internal_header,
        })
        .context("write generated files")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args(std::env::args().skip(1))?;
    run(&args)?;

    let message = format!(
        "{} regenerated from {}",
        args.public_header.display(),
        args.instructions.display()
    );
    log::info!("{message}");
    println!("{message}");
    Ok(())
}
