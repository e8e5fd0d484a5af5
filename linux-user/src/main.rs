use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use rvsim_core::{ArchState, SparseMem};
use rvsim_exec::ExitReason;
use rvsim_linux_user::HostSystem;

/// User-mode RV64GC simulator.
#[derive(Parser, Debug)]
#[command(name = "rvsim", version)]
struct Args {
    /// Per-instruction trace (pc, opcode word, disassembly)
    #[arg(short = 'd')]
    debug: bool,

    /// State-change logging within instructions
    #[arg(short = 'v')]
    verbose: bool,

    /// Stop after COUNT instructions (0 = unlimited)
    #[arg(short = 'i', value_name = "COUNT", default_value_t = 0)]
    max_insns: u64,

    /// Statically linked RV64 ELF executable
    elf: String,

    /// Arguments passed to the guest as argv[1..]
    #[arg(trailing_var_arg = true)]
    guest_args: Vec<String>,
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level),
    )
    .format_timestamp(None)
    .init();
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };
    init_logging(&args);

    println!("run program {}", args.elf);

    let mut host = HostSystem::new(&args.elf);
    for arg in &args.guest_args {
        log::info!("guest argument: {arg}");
        host.add_arg(arg);
    }
    host.set_stdin(PathBuf::from(format!("{}.stdin", args.elf)));

    let mut state = ArchState::new(SparseMem::new());
    if let Err(e) = host.load_elf(&mut state) {
        eprintln!("failed to load {}: {e}", args.elf);
        return ExitCode::FAILURE;
    }
    host.open_std_streams(Path::new("."));

    let (reason, icount) = rvsim_exec::run(&mut state, &mut host, args.max_insns);
    match reason {
        ExitReason::GuestExit => {
            println!("program exited after {icount} instructions");
        }
        ExitReason::Shell => {
            println!("program returned to shell after {icount} instructions");
        }
        ExitReason::InsnLimit => {
            println!("instruction limit reached after {icount} instructions");
        }
    }

    if args.debug {
        dump_state(&state);
    }
    println!("executed {icount} instructions");

    ExitCode::SUCCESS
}

/// Final register dump, four per line.
fn dump_state(state: &ArchState) {
    println!("\narchitected state");
    for row in 0..8 {
        let mut line = String::new();
        for col in 0..4 {
            let i = row * 4 + col;
            line.push_str(&format!(
                "x{i:<2} {:016x}  ",
                state.get_reg(i as u8)
            ));
        }
        println!("{line}");
    }
    println!("pc  {:016x}", state.pc());
}
