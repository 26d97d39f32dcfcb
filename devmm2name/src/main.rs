//! # devmm2name
//!
//! Main entry point for the device name tool.

use devmm2name::{CommandParser, DeviceRuntime, RuntimeConfig, EXIT_USAGE};
use log::warn;
use std::env;
use std::io;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("devmm2name");

    let (config, rejected) = RuntimeConfig::from_env();
    if let Err(e) = services_logger::init(config.log_level) {
        eprintln!("Failed to install logger: {}", e);
    }
    for setting in rejected {
        warn!("Ignoring invalid {} value {:?}", setting.key, setting.value);
    }

    let command = CommandParser::parse(args.get(1..).unwrap_or_default()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(EXIT_USAGE);
    });

    let mut runtime = DeviceRuntime::new(&config);
    let code = runtime.execute(command, &mut io::stdout().lock());
    process::exit(code);
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} char|block <major>:<minor>", program);
    eprintln!("  {} char|block <major> <minor>", program);
    eprintln!("  {} mkchar|mkblock <major>:<minor>", program);
    eprintln!("  {} mkchar|mkblock <major> <minor>", program);
    eprintln!("  {} scan", program);
    eprintln!("  {} update", program);
    eprintln!("  {} watch [interval]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  char|block       Print the path of a device");
    eprintln!("  mkchar|mkblock   Create the special file of a device");
    eprintln!("  scan             Recreate nodes for every live device");
    eprintln!("  update           Create nodes missing for live devices");
    eprintln!("  watch            Scan, then update every interval seconds (default 10)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DEVMM2NAME_MTDBLOCK_MAJOR   Major whose minors are /dev/mtdblock<minor>");
    eprintln!("  DEVMM2NAME_SYSFS_ROOT       sysfs mount point (default /sys)");
    eprintln!("  DEVMM2NAME_DEV_ROOT         Root for created nodes (default /)");
    eprintln!("  DEVMM2NAME_LOG              Log level (default warn)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} block 8:1", program);
    eprintln!("  {} char 4 64", program);
    eprintln!("  {} mkblock 179:1", program);
    eprintln!("  {} watch 30", program);
}
