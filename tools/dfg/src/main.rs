//! rvsim-dfg — data-flow graph over a file of hex opcodes.
//!
//! Reads one opcode per line, decodes it, and prints a per-line
//! trace with the producer indices of each register source. With
//! `-p` also writes `dfg.dot`.

mod graph;

use std::fs;
use std::io::BufWriter;
use std::process::ExitCode;

use clap::Parser;

use graph::DfgBuilder;
use rvsim_frontend::decode;

/// Register data-flow graph from a hex opcode listing.
#[derive(Parser, Debug)]
#[command(name = "rvsim-dfg", version)]
struct Args {
    /// Text file with one hex opcode per line
    #[arg(short = 'f', value_name = "FILE")]
    file: Option<String>,

    /// Write the graph to dfg.dot
    #[arg(short = 'p')]
    print_dot: bool,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };
    let Some(file) = args.file else {
        eprintln!("an opcode file is required (-f <file>)");
        return ExitCode::FAILURE;
    };

    let text = match fs::read_to_string(&file) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("cannot read {file}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut builder = DfgBuilder::new();
    // Synthetic pc so relative targets in labels stay meaningful.
    let mut pc: u64 = 0;

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let hex = line
            .strip_prefix("0x")
            .or_else(|| line.strip_prefix("0X"))
            .unwrap_or(line);
        let word = match u32::from_str_radix(hex, 16) {
            Ok(w) => w,
            Err(_) => {
                eprintln!("malformed opcode on line {}: {line}", lineno + 1);
                continue;
            }
        };

        let Some(op) = decode(word) else {
            println!("no decode for {word:x}");
            pc += if word & 3 == 3 { 4 } else { 2 };
            continue;
        };

        let node = builder.record(&op, pc);
        pc += op.len as u64;

        let pad = if op.len == 4 { "  " } else { "" };
        if node.producers.is_empty() {
            println!("{}\t{pad}{}", node.index, node.disasm);
        } else {
            let list = node
                .producers
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            println!("{}\t{pad}{}\t[{list}]", node.index, node.disasm);
        }
    }

    if args.print_dot {
        let f = match fs::File::create("dfg.dot") {
            Ok(f) => f,
            Err(e) => {
                eprintln!("cannot create dfg.dot: {e}");
                return ExitCode::FAILURE;
            }
        };
        let mut w = BufWriter::new(f);
        if let Err(e) = builder.write_dot(&mut w) {
            eprintln!("cannot write dfg.dot: {e}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
