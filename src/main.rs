use colored::Colorize;
use sbmmio::mems::ram::RamBus;
use sbmmio::{
    BUS_PAGE_SHIFT, BUS_WINDOW_BASE, DEVICE_NAME, MiscRegistry, SbmmioDriver, SbmmioError, Whence,
};
use std::sync::Arc;

// Bring-up harness: stands the driver up over the software bus and walks
// the whole byte-stream surface the way a user-space register tool would.
const DEMO_WINDOW_SIZE: usize = 64 * 1024;

fn hexdump(base: u64, bytes: &[u8]) {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        println!("{:010x}:  {}", base + (row as u64) * 16, hex.join(" "));
    }
}

fn banner(text: &str) {
    println!("{}", format!("==== {text} ====").bright_cyan().bold());
}

fn run() -> Result<(), SbmmioError> {
    env_logger::init();

    // The software bus backs the head of the platform window.
    let bus = Arc::new(RamBus::new(BUS_WINDOW_BASE, DEMO_WINDOW_SIZE));
    let mut registry = MiscRegistry::default();

    let driver = SbmmioDriver::load_with_window(
        &mut registry,
        bus.clone(),
        &*bus,
        BUS_WINDOW_BASE,
        BUS_PAGE_SHIFT,
        DEMO_WINDOW_SIZE as u64,
    )?;

    banner("endpoint up");
    println!(
        "window base 0x{BUS_WINDOW_BASE:010x}, demo size 0x{DEMO_WINDOW_SIZE:x}, endpoint '{DEVICE_NAME}'"
    );

    let file = registry.open(DEVICE_NAME)?;

    banner("poke");
    let pattern: Vec<u8> = (0u16..64).map(|i| (i * 3) as u8).collect();
    file.seek(0x100, Whence::Set)?;
    let written = file.write(&pattern)?;
    println!("wrote {written} bytes at 0x100");

    banner("peek");
    file.seek(0x100, Whence::Set)?;
    let mut readback = vec![0u8; 64];
    let got = file.read(&mut readback)?;
    println!("read {got} bytes back:");
    hexdump(BUS_WINDOW_BASE + 0x100, &readback[..got]);

    banner("window edge");
    let end = file.seek(0, Whence::End)?;
    println!("seek to end lands at 0x{end:x}");
    file.seek(-6, Whence::End)?;
    let mut tail = vec![0u8; 32];
    let got = file.read(&mut tail)?;
    println!("oversized read 6 bytes before the end transfers {got} bytes");
    let got = file.read(&mut tail)?;
    println!("read at the end transfers {got} bytes");

    driver.unload(&mut registry);
    banner("endpoint down");

    Ok(())
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
