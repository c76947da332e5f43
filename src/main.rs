//! Salvador - CLI Entry Point
//!
//! Commands:
//! - `salvador check <config.json>` - Validate a gear configuration
//! - `salvador decode <frame>...` - Show how the gear reads forward frames
//! - `salvador table` - Print the FRAM persistence layout

use clap::{Parser, Subcommand};
use salvador::gear::{decode, profile_for, Addressing, PersistMap, Persisted};
use salvador::GearConfig;

#[derive(Parser)]
#[command(name = "salvador")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "Tick-accurate DALI control gear")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a JSON gear configuration
    Check {
        /// Path to the configuration file
        config: String,
    },
    /// Decode 16-bit forward frames given in hex (e.g. FF99)
    Decode {
        frames: Vec<String>,
        /// Device type used for application extended commands
        #[arg(short, long, default_value = "6")]
        device_type: u8,
    },
    /// Print the persistence table
    Table {
        /// FRAM base offset
        #[arg(short, long, default_value = "0")]
        base: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => check_config(&config),
        Commands::Decode { frames, device_type } => decode_frames(&frames, device_type),
        Commands::Table { base } => print_table(base),
    }
}

fn check_config(path: &str) {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    };

    match GearConfig::from_json(&text) {
        Ok(config) => {
            println!("{:#?}", config);
            if let Ok(half) = config.half_bit_ticks() {
                println!("half-bit period: {} ticks", half);
            }
        }
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn decode_frames(frames: &[String], device_type: u8) {
    let profile = match profile_for(device_type) {
        Ok(profile) => profile,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    for text in frames {
        let frame = match u16::from_str_radix(text.trim_start_matches("0x"), 16) {
            Ok(frame) => frame,
            Err(e) => {
                eprintln!("{}: {}", text, e);
                continue;
            }
        };
        let address = (frame >> 8) as u8;
        let opcode = frame as u8;

        let meaning = match Addressing::classify(address) {
            Addressing::Special(_) => "special command".to_string(),
            _ if address & 0x01 == 0 => format!("direct arc power {}", opcode),
            _ => format!("{:?}", decode(opcode, profile)),
        };
        println!("{:04X}  {:?}  {}", frame, Addressing::classify(address), meaning);
    }
}

fn print_table(base: u16) {
    let map = PersistMap::new(base);
    for reg in Persisted::ALL {
        let first = map.address_of(reg, 0);
        let last = map.address_of(reg, reg.width() - 1);
        if first == last {
            println!("{:#06x}          {:?}", first, reg);
        } else {
            println!("{:#06x}-{:#06x}  {:?}", first, last, reg);
        }
    }
}
