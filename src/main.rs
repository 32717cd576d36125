use std::{env, io, process};

use color_eyre::eyre::Result;
use log::{error, LevelFilter};
use simple_logger::SimpleLogger;

use cpu8::memory::StdMem;
use cpu8::processor::Processor;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .init()
        .unwrap(); // logging

    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: cpu8 <image>");
            process::exit(1);
        }
    };

    // the only fatal error: an image we cannot read
    let mut mem = match StdMem::from_file(&path) {
        Ok(mem) => mem,
        Err(err) => {
            error!("failed to open image `{}`: {}", path, err);
            process::exit(2);
        }
    };

    let mut cpu = Processor::new();
    let stdout = io::stdout();
    cpu.run(&mut mem, &mut stdout.lock())?;

    Ok(())
}
