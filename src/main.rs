//!
//! Command line front end: loads a program, starts the GPIO ingress and the debugger, and runs
//! the machine on its own thread.
//!

use log::{error, info, warn};
use std::error::Error;
use std::io;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tinyrv::config::Config;
use tinyrv::debugger::console::{self, RenderOptions};
use tinyrv::debugger::{Debugger, Mode};
use tinyrv::simulator::{Machine, StopReason};
use tinyrv::{ingress, loader};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::get().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let program = loader::load_file(config.file(), config.program_size).unwrap_or_else(|e| {
        eprintln!("An error occurred while loading your program:\n{e}");
        process::exit(1);
    });

    let mut breakpoints = config.breaks.clone();
    if let Some(path) = &config.breakpoints {
        match loader::load_breakpoints(path) {
            Ok(lines) => breakpoints.extend(lines),
            Err(e) => warn!("Ignoring breakpoint file {}: {e}", path.display()),
        }
    }

    let listing = match &config.listing {
        Some(path) => loader::load_listing(path).unwrap_or_else(|e| {
            warn!("Ignoring listing file {}: {e}", path.display());
            Vec::new()
        }),
        None => Vec::new(),
    };

    let mut machine = Machine::with_memory_size(program, config.memory_size)?;

    let debugger = Arc::new(if config.headless {
        Debugger::headless()
    } else {
        Debugger::new(Mode::Paused, breakpoints)
    });

    if let Some(port) = config.port {
        match ingress::bind(port) {
            Ok(socket) => {
                let memory = machine.memory().clone();
                thread::Builder::new()
                    .name("ingress".into())
                    .spawn(move || ingress::serve(&socket, &memory))?;
            }
            Err(e) => warn!("GPIO ingress disabled, cannot bind port {port}: {e}"),
        }
    }

    if !config.headless {
        let view = machine.view();
        let options = RenderOptions {
            refresh: config.refresh,
            window: config.window,
            listing,
        };
        let d = debugger.clone();
        thread::Builder::new()
            .name("render".into())
            .spawn(move || console::render_loop(&view, &d, &options))?;

        let d = debugger.clone();
        thread::Builder::new()
            .name("input".into())
            .spawn(move || console::input_loop(io::stdin().lock(), &d))?;
    }

    let lifetime = config.lifetime;
    let execution = {
        let debugger = debugger.clone();
        thread::Builder::new()
            .name("execution".into())
            .spawn(move || {
                let start_time = Instant::now();
                let reason = machine.run(&debugger, lifetime);
                info!("Finished in {}ms", start_time.elapsed().as_millis());
                (machine, reason)
            })?
    };

    let Ok((machine, reason)) = execution.join() else {
        error!("The execution thread panicked");
        process::exit(101);
    };

    if config.print_state {
        machine.print_state();
    }

    // Leave the last state on screen until the user is done with it
    if !config.headless && reason != StopReason::Quit {
        eprintln!("Program stopped ({reason}), enter 'q' to quit");
        debugger.wait_for_quit();
    }

    process::exit(match reason {
        StopReason::EndOfProgram { .. } => 1,
        StopReason::LifetimeExhausted | StopReason::Quit => 0,
    });
}
