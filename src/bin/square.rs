use std::{path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser};
use fbtoys::{config::Config, graphics::Graphics, logging, square::Driver};
use log::info;
use num_format::{Locale, ToFormattedString};

/// Exit status when the framebuffer or terminal cannot be set up.
const INIT_FAILURE: u8 = 3;

#[derive(Parser, Debug)]
#[clap(name = "square", about = "Move a colored square around the framebuffer")]
struct Args {
    /// JSON configuration file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,
    /// Framebuffer device, overriding the configuration file
    #[clap(short, long, value_parser)]
    device: Option<PathBuf>,
    /// More log output, repeat for more detail
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn load_config(&self) -> Result<Config, fbtoys::config::Error> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = match args.load_config() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("square: {}", error);
            return ExitCode::FAILURE;
        }
    };

    let mut graphics = match Graphics::init(&config) {
        Ok(graphics) => graphics,
        Err(error) => {
            eprintln!("square: {}", error);
            return ExitCode::from(INIT_FAILURE);
        }
    };

    let (surface, console) = graphics.split();
    let driver = Driver::new(&config, surface.width(), surface.height());
    let result = driver.run(surface, console);

    // restore the terminal before printing anything
    if let Err(error) = graphics.shutdown() {
        eprintln!("square: {}", error);
        return ExitCode::FAILURE;
    }

    match result {
        Ok(summary) => {
            info!(
                "Rendered {} frames, wrote {} dump(s)",
                summary.frames.to_formatted_string(&Locale::en),
                summary.dumps.len()
            );
            for path in summary.dumps {
                println!("Framebuffer dumped to {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("square: {}", error);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_flag_overrides_default() {
        let args = Args::try_parse_from(["square", "-vv", "--device", "/dev/fb1"]).unwrap();
        assert_eq!(args.verbose, 2);
        let config = args.load_config().unwrap();
        assert_eq!(config.device, PathBuf::from("/dev/fb1"));
        assert_eq!(config.frame_delay_ms, Config::default().frame_delay_ms);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let args = Args::try_parse_from(["square", "--config", "/nonexistent/square.json"]).unwrap();
        assert!(args.load_config().is_err());
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Args::try_parse_from(["square", "--colour", "red"]).is_err());
    }
}
