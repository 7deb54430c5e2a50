//! mcu8 simulator - CLI entry point
//!
//! Commands:
//! - `mcu8-sim run [program]` - Run a number of instruction cycles and print the state
//! - `mcu8-sim step [program]` - Menu-driven stepping (instruction / clock cycle / pin input)
//! - `mcu8-sim debug [program]` - Interactive TUI debugger
//! - `mcu8-sim asm <source>` - Assemble to a hex listing
//! - `mcu8-sim disasm <listing>` - Disassemble a hex listing
//!
//! Without a program argument the built-in port B demo is used.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use mcu8::asm::{self, disasm::disassemble_instruction};
use mcu8::isa::{format_binary, PINB};
use mcu8::{Config, ControlUnit, Cycle, Snapshot, UnknownOpcodePolicy, DEMO_PROGRAM};
use std::io::{BufRead, Write};

#[derive(Parser)]
#[command(name = "mcu8-sim")]
#[command(version)]
#[command(about = "An instructional simulator of a small 8-bit microcontroller core")]
struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// What to do when an undeclared opcode is executed
    #[arg(long, global = true, value_enum, default_value = "reset")]
    on_unknown: OnUnknown,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a number of instruction cycles and print the final state
    Run {
        /// Program to load (.asm source or hex listing)
        program: Option<String>,
        /// Number of instruction cycles to run
        #[arg(short = 'n', long, default_value = "100")]
        cycles: u64,
        /// Print each executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Step the machine from a menu on stdin
    Step {
        /// Program to load (.asm source or hex listing)
        program: Option<String>,
    },
    /// Interactive TUI debugger
    Debug {
        /// Program to load (.asm source or hex listing)
        program: Option<String>,
    },
    /// Assemble source to a hex listing
    Asm {
        /// Path to the source file
        source: String,
        /// Output listing file (default: source with .hex extension)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a hex listing
    Disasm {
        /// Path to the listing
        listing: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OnUnknown {
    /// Reset the machine and continue
    Reset,
    /// Stop with an error
    Fault,
}

impl From<OnUnknown> for UnknownOpcodePolicy {
    fn from(value: OnUnknown) -> Self {
        match value {
            OnUnknown::Reset => UnknownOpcodePolicy::Reset,
            OnUnknown::Fault => UnknownOpcodePolicy::Fault,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config { unknown_opcode: cli.on_unknown.into() };

    let result = match cli.command {
        Some(Commands::Run { program, cycles, trace, json }) => {
            build_machine(program.as_deref(), config)
                .and_then(|cu| run_program(cu, cycles, trace, json))
        }
        Some(Commands::Step { program }) => {
            build_machine(program.as_deref(), config).and_then(step_interactive)
        }
        Some(Commands::Debug { program }) => {
            build_machine(program.as_deref(), config).and_then(debug_program)
        }
        Some(Commands::Asm { source, output }) => assemble_file(&source, output),
        Some(Commands::Disasm { listing }) => disassemble_file(&listing),
        None => build_machine(None, config).and_then(step_interactive),
    };

    if let Err(message) = result {
        eprintln!("error: {}", message);
        std::process::exit(1);
    }
}

fn build_machine(path: Option<&str>, config: Config) -> Result<ControlUnit, String> {
    let words = match path {
        Some(path) => {
            let words = asm::load_program(path).map_err(|e| format!("{}: {}", path, e))?;
            log::info!("loaded {} words from {}", words.len(), path);
            words
        }
        None => DEMO_PROGRAM.to_vec(),
    };

    if words.is_empty() {
        return Err("no instructions to execute".into());
    }

    ControlUnit::with_program(&words)
        .map(|cu| cu.with_config(config))
        .map_err(|e| e.to_string())
}

fn run_program(mut cu: ControlUnit, cycles: u64, trace: bool, json: bool) -> Result<(), String> {
    for _ in 0..cycles {
        let cycle = cu.step_instruction().map_err(|e| {
            format!("at {:02X} after {} instructions: {}", cu.mar(), cu.instructions(), e)
        })?;

        if trace {
            match cycle {
                Cycle::Reset { opcode, address } => {
                    println!("{:02X}: unknown opcode {:#04x}, system reset", address, opcode);
                }
                _ => println!("{:02X}: {}", cu.mar(), disassemble_instruction(cu.ir())),
            }
        }
    }

    let snapshot = cu.snapshot();
    if json {
        let text = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        print_state(&snapshot);
    }
    Ok(())
}

/// Print the machine state in the classic console layout.
fn print_state(snap: &Snapshot) {
    let byte = |value: u8| format_binary(value as u32, 8);

    println!("{}", "-".repeat(80));
    println!("Current instruction:\t\t\t\t{}", snap.opcode_name);
    println!("Current state:\t\t\t\t\t{}", snap.state_name);
    println!("Program counter:\t\t\t\t{}", snap.program_counter);
    println!(
        "Instruction register:\t\t\t\t{} {} {}",
        byte(snap.fields.opcode),
        byte(snap.fields.operand1),
        byte(snap.fields.operand2)
    );
    println!("Status register (INZVC):\t\t\t{}\n", format_binary(snap.status as u32, 5));
    println!("Content in CPU register R16:\t\t\t{}", byte(snap.registers[16]));
    println!("Content in CPU register R24:\t\t\t{}\n", byte(snap.registers[24]));
    println!("Content in data direction register DDRB:\t{}", byte(snap.io.ddrb));
    println!("Content in data register PORTB:\t\t\t{}", byte(snap.io.portb));
    println!("Content in pin input register PINB:\t\t{}", byte(snap.io.pinb));
    println!("{}\n", "-".repeat(80));
}

/// Menu-driven stepping over stdin.
fn step_interactive(mut cu: ControlUnit) -> Result<(), String> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    println!("A led is connected to pin 8 (PORTB0).");
    println!("Press the button connected to pin 13 (PORTB5) to toggle the led.");
    println!("To press the button, set the fifth bit of the PINB register,");
    println!("for instance by entering the value 32!\n");

    loop {
        print_state(&cu.snapshot());
        println!("Please select between the following alternatives:");
        println!("1. Execute next instruction cycle");
        println!("2. Run next clock cycle");
        println!("3. Reset system");
        println!("4. Enter new input for pin input register PINB");
        println!("5. Finish execution\n");

        let selection = loop {
            match read_byte(&mut lines)? {
                Some(n @ 1..=5) => break n,
                Some(_) => println!("Invalid input, try again!\n"),
                None => return Ok(()),
            }
        };

        match selection {
            1 => report(cu.step_instruction()),
            2 => report(cu.step_state()),
            3 => {
                cu.reset();
                println!("System reset!\n");
            }
            4 => {
                println!("Enter new data for pin input register PINB:");
                let Some(input) = read_byte(&mut lines)? else {
                    return Ok(());
                };
                cu.write_data_memory(PINB as usize, input).map_err(|e| e.to_string())?;
                println!("Wrote {} to pin input register PINB!\n", format_binary(input as u32, 8));
            }
            _ => {
                println!("System exit!\n");
                return Ok(());
            }
        }
    }
}

fn report(result: Result<Cycle, mcu8::CpuError>) {
    match result {
        Ok(Cycle::Reset { opcode, address }) => {
            println!("Unknown opcode {:#04x} at {:02X}, system reset!\n", opcode, address);
        }
        Ok(_) => {}
        Err(e) => println!("Error: {}\n", e),
    }
}

/// Read one line as a byte; re-prompts on malformed input, `None` on EOF.
fn read_byte<B: BufRead>(lines: &mut std::io::Lines<B>) -> Result<Option<u8>, String> {
    loop {
        print!("> ");
        std::io::stdout().flush().map_err(|e| e.to_string())?;

        let Some(line) = lines.next() else {
            return Ok(None);
        };
        let line = line.map_err(|e| e.to_string())?;
        println!();

        match line.trim().parse::<u8>() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => println!("Invalid input, try again!\n"),
        }
    }
}

#[cfg(feature = "tui")]
fn debug_program(cu: ControlUnit) -> Result<(), String> {
    mcu8::run_debugger(cu).map_err(|e| format!("debugger error: {}", e))
}

#[cfg(not(feature = "tui"))]
fn debug_program(_cu: ControlUnit) -> Result<(), String> {
    Err("built without the `tui` feature".into())
}

fn assemble_file(source_path: &str, output: Option<String>) -> Result<(), String> {
    let out_path = output.unwrap_or_else(|| {
        std::path::Path::new(source_path)
            .with_extension("hex")
            .to_string_lossy()
            .into_owned()
    });

    let source = std::fs::read_to_string(source_path)
        .map_err(|e| format!("failed to read {}: {}", source_path, e))?;
    let words = asm::assemble(&source).map_err(|e| e.to_string())?;
    asm::save_listing(&out_path, &words).map_err(|e| e.to_string())?;

    println!("Assembled {} instructions: {} -> {}", words.len(), source_path, out_path);
    Ok(())
}

fn disassemble_file(path: &str) -> Result<(), String> {
    let words = asm::load_listing(path).map_err(|e| format!("{}: {}", path, e))?;
    print!("{}", asm::disassemble(&words));
    Ok(())
}
