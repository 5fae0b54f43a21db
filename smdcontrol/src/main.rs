mod config;

use config::Config;
use eyre::{Report, WrapErr};
use log::warn;
use serialport::SerialPort;
use smd::Master;

fn main() -> Result<(), Report> {
    stable_eyre::install()?;
    pretty_env_logger::init();
    color_backtrace::install();

    let config = Config::from_file()?;
    let timing = config.timing();

    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(timing.read_timeout)
        .open()
        .wrap_err_with(|| format!("Failed to open serial port {}", config.port))?;
    let mut master = Master::with_timing(port, config.baud_rate, timing)?;

    let ids = master.scan()?;
    if ids.is_empty() {
        println!("No drivers found on {}", config.port);
        return Ok(());
    }
    for id in ids {
        describe(&mut master, id, config.scan_modules)
            .wrap_err_with(|| format!("Querying driver {}", id))?;
    }
    Ok(())
}

fn describe(
    master: &mut Master<Box<dyn SerialPort>>,
    id: u8,
    scan_modules: bool,
) -> Result<(), Report> {
    println!("Driver {}:", id);
    match master.get_driver_info(id)? {
        Some(info) => println!(
            "  hardware {}, software {}",
            info.hardware_version, info.software_version
        ),
        None => warn!("No version reply from driver {}", id),
    }
    if let Some(baud_rate) = master.get_driver_baudrate(id)? {
        println!("  baud rate {}", baud_rate);
    }
    if let Some(mode) = master.get_operation_mode(id)? {
        println!("  operation mode {:?}", mode);
    }
    if scan_modules {
        match master.scan_modules(id)? {
            Some(modules) if modules.is_empty() => println!("  no modules"),
            Some(modules) => println!("  modules {:?}", modules),
            None => warn!("No module scan reply from driver {}", id),
        }
    }
    Ok(())
}
