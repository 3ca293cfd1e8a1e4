use std::env;
use std::process;

use strand::error::ShellError;
use strand::flags::Flags;
use strand::shell::Shell;
use tracing_subscriber::filter::LevelFilter;

fn init_tracing(debug: bool) {
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), ShellError> {
    let mut flags = Flags::new();
    let args: Vec<String> = env::args().skip(1).collect();
    flags.parse(&args)?;

    if flags.is_set("help") {
        flags.print_help();
        return Ok(());
    }

    if flags.is_set("version") {
        println!("strand {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_tracing(flags.is_set("debug"));

    if let Some(line) = flags.get_value("command") {
        let status = Shell::run_command(&flags, line, &mut std::io::stderr().lock());
        process::exit(status);
    }

    let mut shell = Shell::new(flags)?;
    shell.run()
}
