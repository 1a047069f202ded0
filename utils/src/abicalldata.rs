// Copyright 2021 Michael Rodler
// This file is part of abimutator.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

#[macro_use]
extern crate anyhow;
extern crate abimutator;
extern crate clap;

use abimutator::{format_call_data, splitted_hex_string, AbiModel, LayoutConfig};
use anyhow::Context;
use clap::{Arg, Command};
use std::fs;
use std::path::PathBuf;

fn init_tracing() {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let app = Command::new("abicalldata")
        .about("map a flat fuzzer buffer onto a contract interface and print the resulting call data")
        .version(abimutator::VERSION)
        .arg(
            Arg::new("layout")
                .short('l')
                .long("layout")
                .value_name("LAYOUT_YAML")
                .help("Buffer layout configuration; defaults to the AM_* environment variables")
                .value_parser(clap::value_parser!(PathBuf))
                .takes_value(true),
        )
        .arg(
            Arg::new("write-seed")
                .short('s')
                .long("write-seed")
                .value_name("SEED_FILE")
                .help("Write the all-zero buffer for the interface to this file and exit")
                .value_parser(clap::value_parser!(PathBuf))
                .takes_value(true),
        )
        .arg(
            Arg::new("raw")
                .short('r')
                .long("raw")
                .help("print call data as hex instead of decoding it")
                .takes_value(false),
        )
        .arg(
            Arg::new("ABI")
                .help("Path to contract ABI definition file")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("BUFFER")
                .help("path to a mutated buffer; the all-zero buffer is used if omitted")
                .value_parser(clap::value_parser!(PathBuf)),
        );

    let matches = app.get_matches();

    let abi_path: &PathBuf = matches
        .get_one("ABI")
        .ok_or_else(|| anyhow!("need to provide an ABI definition file"))?;

    let layout = if let Some(path) = matches.get_one::<PathBuf>("layout") {
        LayoutConfig::from_yaml_file(path)?
    } else {
        LayoutConfig::from_env()?
    };
    let model = AbiModel::from_file(abi_path)?.with_layout(layout);
    let testcase_len = model
        .testcase_len()
        .context("layout does not fit the interface")?;
    tracing::info!(
        functions = model.functions().len(),
        testcase_len,
        "loaded contract interface"
    );

    if let Some(seed_path) = matches.get_one::<PathBuf>("write-seed") {
        fs::write(seed_path, vec![0u8; testcase_len])
            .with_context(|| format!("failed to write seed file {}", seed_path.display()))?;
        return Ok(());
    }

    let buffer = if let Some(path) = matches.get_one::<PathBuf>("BUFFER") {
        fs::read(path).with_context(|| format!("failed to read file {}", path.display()))?
    } else {
        vec![0u8; testcase_len]
    };
    if buffer.len() > testcase_len {
        tracing::warn!(
            len = buffer.len(),
            used = testcase_len,
            "ignoring trailing bytes of buffer"
        );
    }

    let testcase = model
        .absorb_mutated_buffer(&buffer)
        .context("buffer does not fit the interface")?;
    let raw = matches.is_present("raw");

    if let Some(ctor) = model.constructor() {
        let args = model.encode_constructor(&testcase)?;
        println!("constructor: {}", ctor.signature());
        println!("  input: {}", splitted_hex_string::<32>(&args));
    }
    for call in model.encode_functions(&testcase)?.iter() {
        if raw {
            println!("0x{}", hex::encode(call));
        } else {
            print!("{}", format_call_data(call, Some(&model)));
        }
    }

    Ok(())
}
