use eyre::{eyre, Report};
use smd::{Master, OperationMode, DEFAULT_BAUD_RATE};
use std::env;
use std::process::exit;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const POLL_COUNT: usize = 30;

fn main() -> Result<(), Report> {
    stable_eyre::install()?;
    pretty_env_logger::init();
    color_backtrace::install();

    let mut args = env::args();
    let binary_name = args
        .next()
        .ok_or_else(|| eyre!("Binary name missing"))?;
    if args.len() != 2 {
        eprintln!("Usage:");
        eprintln!("  {} <serial port> <position>", binary_name);
        exit(1);
    }
    let port_name = args.next().unwrap();
    let target: f32 = args.next().unwrap().parse()?;

    let mut master = Master::open(&port_name, DEFAULT_BAUD_RATE)?;
    let id = *master
        .scan()?
        .first()
        .ok_or_else(|| eyre!("No drivers found on {}", port_name))?;

    master.set_operation_mode(id, OperationMode::Position)?;
    master.enable_torque(id, true)?;
    master.set_position(id, target)?;

    for _ in 0..POLL_COUNT {
        match master.get_position(id)? {
            Some(position) => println!("Driver {} at {}", id, position),
            None => println!("No reply from driver {}", id),
        }
        thread::sleep(POLL_INTERVAL);
    }

    master.enable_torque(id, false)?;
    Ok(())
}
