mod cli;
mod render;
mod util;
mod vm;

use crate::{
    cli::Cli,
    render::Renderer,
    util::Interval,
    vm::{
        audio::{spawn_audio_thread, AudioEvent},
        input::Key,
        interp::Interpreter,
        prog::Program,
    },
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    poll, read, Event, KeyCode as CrosstermKey, KeyEventKind,
    KeyModifiers as CrosstermKeyModifiers,
};
use device_query::{DeviceQuery, DeviceState};

use std::{collections::HashSet, time::Duration};

const FRAME_RATE: u32 = 60;
const FRAME_DURATION: Duration = Duration::from_nanos(1_000_000_000 / FRAME_RATE as u64);

fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = cli.log.is_some();
    if let Some(level) = cli.log {
        let filter = level.to_level_filter();
        tui_logger::init_logger(filter).context("Failed to initialize logger")?;
        tui_logger::set_default_level(filter);
    }

    let program = Program::read(&cli.rom)
        .with_context(|| format!("Failed to load program {:?}", cli.rom))?;

    let (audio_sender, audio_thread) = spawn_audio_thread();

    let mut interp = Interpreter::new();
    interp.load(&program.data)?;
    interp.set_beeper(move || {
        audio_sender.send(AudioEvent::Beep).ok();
    });

    // cycles are batched per rendered frame
    let steps_per_frame = (cli.hz / FRAME_RATE).max(1);

    let mut renderer = Renderer::setup(&program.name, logging)?;
    let mut interval = Interval::new(FRAME_DURATION);

    let device_state = DeviceState::new();
    let mut last_keys = HashSet::new();

    log::info!("running {} at {} hz", program.name, steps_per_frame * FRAME_RATE);

    'vm: loop {
        let mut force_redraw = false;

        // drain pending terminal events without blocking the frame
        while poll(Duration::ZERO).unwrap_or(false) {
            match read().context("Failed to read terminal event")? {
                Event::Resize(_, _) => force_redraw = true,
                Event::Key(key_event) => {
                    // Esc or Ctrl+C exits
                    if key_event.code == CrosstermKey::Esc
                        || key_event.modifiers.contains(CrosstermKeyModifiers::CONTROL)
                            && (key_event.code == CrosstermKey::Char('c')
                                || key_event.code == CrosstermKey::Char('C'))
                    {
                        break 'vm;
                    }

                    // terminal key events have no release counterpart, so
                    // they only ever latch a key down; the device query
                    // below releases it
                    if let KeyEventKind::Press | KeyEventKind::Repeat = key_event.kind {
                        if let Ok(key) = Key::try_from(key_event.code) {
                            interp.keypad.set_key(key.to_code(), true);
                        }
                    }
                }
                _ => (),
            }
        }

        let keys: HashSet<Key> = device_state
            .get_keys()
            .into_iter()
            .filter_map(|keycode| Key::try_from(keycode).ok())
            .collect();

        for &key in keys.difference(&last_keys) {
            interp.keypad.set_key(key.to_code(), true);
        }

        for &key in last_keys.difference(&keys) {
            interp.keypad.set_key(key.to_code(), false);
        }

        last_keys = keys;

        for _ in 0..steps_per_frame {
            interp.step();
        }

        if interp.display.take_redraw() || force_redraw || logging {
            renderer.draw(&interp.display)?;
        }

        interval.sleep();
    }

    renderer.exit()?;

    // the beeper closure owns the only sender, so dropping the
    // interpreter shuts the audio thread down
    drop(interp);
    audio_thread.join().ok();

    Ok(())
}
