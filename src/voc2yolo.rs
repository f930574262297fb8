use clap::Parser;
use log::{error, info};

use voc2yolo::{run, Args};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match args.to_convert_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    info!("Starting the conversion process...");

    match run(&config) {
        Ok(stats) => info!(
            "Conversion finished: {} images written to {}",
            stats.images_converted,
            config.output_dir.display()
        ),
        Err(e) => {
            error!("{}: {}", e.kind(), e);
            std::process::exit(1);
        }
    }
}
