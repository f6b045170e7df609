#![no_main]

use libfuzzer_sys::fuzz_target;
use podwheel::config::Settings;
use podwheel::model::Track;
use podwheel::pod::{Command, PodCore, PodParts};
use podwheel::storage::{MemoryStorage, Storage, StoreKey};

const COMMANDS: [Command; 18] = [
    Command::Back,
    Command::SelectUp,
    Command::SelectDown,
    Command::Activate,
    Command::PlayPause,
    Command::NextTrack,
    Command::PreviousTrack,
    Command::ToggleShuffle,
    Command::CycleRepeat,
    Command::ToggleBacklight,
    Command::SeekForward,
    Command::SeekBackward,
    Command::EnterFullScreen,
    Command::ExitFullScreen,
    Command::RemoveCurrent,
    Command::NudgeLyrics(50),
    Command::OpenMenu,
    Command::Focus,
];

fuzz_target!(|data: &[u8]| {
    let len = data.first().map(|b| usize::from(*b % 8)).unwrap_or(0);
    let tracks: Vec<Track> = (0..len)
        .map(|idx| {
            let id = format!("track{idx:06}");
            Track::new(id.clone(), format!("https://youtu.be/{id}"), id)
        })
        .collect();
    let mut storage = MemoryStorage::new();
    if let Ok(value) = serde_json::to_value(&tracks) {
        let _ = storage.save(StoreKey::Tracks, value);
    }

    let mut settings = Settings::default();
    settings.platform_blocks_autoplay = data.len() % 2 == 1;
    let mut core = PodCore::new(PodParts::simulated(Box::new(storage), settings), 0);
    let mut now = 0u64;

    for byte in data.iter().skip(1) {
        now += u64::from(*byte) * 37;
        let index = usize::from(*byte) % (COMMANDS.len() + 1);
        match COMMANDS.get(index) {
            Some(command) => core.dispatch(*command, now),
            None => core.tick(now),
        }
        let library = core.library();
        assert!(library.tracks.is_empty() || library.current_index < library.tracks.len());
        assert!(!(library.loop_all && library.loop_current));
        assert_eq!(library.tracks.len(), library.original_order.len());
    }
    core.shutdown();
});
