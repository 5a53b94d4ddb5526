use anyhow::Result;

use calc_tui::backend;
use calc_tui::config::Config;
use calc_tui::logging;
use calc_tui::ui::app;

fn print_help() {
    println!("calc-tui - four-function terminal calculator");
    println!();
    println!("Usage:");
    println!("  calc-tui [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --generate-config  Write a commented default config file and exit");
    println!("  --ascii            Plain ASCII keypad (no Unicode glyphs)");
    println!("  --help             Show this help");
    println!();
    println!("Keys: 0-9 .  + - * /  Enter/=  Esc/Backspace/c (clear)  q (quit)");
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.contains(&"--help".to_string()) {
        print_help();
        return Ok(());
    }

    if args.contains(&"--generate-config".to_string()) {
        match Config::generate_default_file() {
            Ok(path) => {
                println!("Configuration file created at: {}", path.display());
                println!("Edit this file to customize calc-tui.");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Error generating config: {e:#}");
                std::process::exit(1);
            }
        }
    }

    // Logging goes to the in-TUI ring buffer, so it must exist before any
    // component starts tracing.
    let log_buffer = logging::init_tracing();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e:#}");
            eprintln!("Fix the file or regenerate it with --generate-config.");
            std::process::exit(1);
        }
    };
    if args.contains(&"--ascii".to_string()) {
        config.display.use_glyphs = false;
    }

    // One runtime for the single asynchronous concern: backend initialization.
    // The UI loop itself stays synchronous.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()?;
    let backend = backend::spawn_loader(runtime.handle(), &config.backend);

    app::run_app(config, backend, log_buffer)
}
