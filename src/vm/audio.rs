use rodio::{
    source::{SineWave, Source},
    OutputStream, Sink,
};

use std::{
    sync::mpsc::{channel, Sender},
    thread::JoinHandle,
    time::Duration,
};

const BEEP_FREQUENCY: f32 = 440.0;
const BEEP_DURATION: Duration = Duration::from_millis(150);

#[derive(Debug, Copy, Clone)]
pub enum AudioEvent {
    Beep,
}

/// Spawns the thread that owns the audio device.
///
/// If no output device is available the thread stays alive and drains
/// events silently, so the machine still runs on headless systems.
pub fn spawn_audio_thread() -> (Sender<AudioEvent>, JoinHandle<()>) {
    let (event_sender, event_receiver) = channel();
    let handle = std::thread::spawn(move || {
        let Ok((_stream, stream_handle)) = OutputStream::try_default() else {
            log::warn!("No audio output device, running silent");
            while event_receiver.recv().is_ok() {}
            return;
        };

        let Ok(sink) = Sink::try_new(&stream_handle) else {
            log::warn!("Failed to create audio sink, running silent");
            while event_receiver.recv().is_ok() {}
            return;
        };

        while let Ok(event) = event_receiver.recv() {
            match event {
                AudioEvent::Beep => {
                    if sink.empty() {
                        sink.append(
                            SineWave::new(BEEP_FREQUENCY)
                                .take_duration(BEEP_DURATION)
                                .amplify(0.20),
                        );
                        sink.play();
                    }
                }
            }
        }

        sink.stop();
    });

    (event_sender, handle)
}
