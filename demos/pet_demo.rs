//! Scripted walkthrough of a pet's day on a virtual clock.
//!
//! Runs headless: a null audio backend and an in-memory store stand in
//! for the desktop shell. Enable debug logs to watch every transition:
//!
//! ```sh
//! RUST_LOG=deskpet=debug cargo run --example pet_demo
//! ```

use ahash::AHashMap;
use deskpet::audio::backend::NullBackend;
use deskpet::core::clock::ManualClock;
use deskpet::core::config::{SkinConfig, SoundSource};
use deskpet::core::store::MemoryStore;
use deskpet::pet::orchestrator::Pet;
use std::cell::RefCell;
use std::rc::Rc;

fn cat_skin() -> SkinConfig {
    let mut sounds = AHashMap::new();
    sounds.insert(
        "meow".to_string(),
        SoundSource::Variants(vec!["meow1.ogg".to_string(), "meow2.ogg".to_string()]),
    );
    sounds.insert(
        "purr".to_string(),
        SoundSource::Detailed {
            src: Some("purr.ogg".to_string()),
            srcs: Vec::new(),
            looped: true,
            volume: 0.8,
            playback_rate: 1.0,
            loop_delay: None,
        },
    );
    SkinConfig {
        base_path: "skins/cat".to_string(),
        sounds,
        behaviors: None,
    }
}

fn report(pet: &Pet, label: &str) {
    println!(
        "{label:<28} state={:<10} energy={:>3} ({})",
        pet.current_state(),
        pet.energy(),
        pet.tier().as_str()
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deskpet=info".into()),
        )
        .init();

    let clock = ManualClock::new();
    clock.set_local_time(14, 0, 6);
    let store = Rc::new(RefCell::new(MemoryStore::new()));
    let mut pet = Pet::new(
        cat_skin(),
        Box::new(NullBackend),
        store,
        Rc::new(clock.clone()),
        2024,
    );
    report(&pet, "afternoon, freshly spawned");

    // The user pets the cat a few times
    for _ in 0..3 {
        pet.pointer_down(200.0, 200.0);
        pet.pointer_up();
    }
    report(&pet, "after three clicks");

    // Then drags it across the screen
    pet.pointer_down(200.0, 200.0);
    pet.pointer_move(600.0, 350.0);
    report(&pet, "mid-drag");
    pet.pointer_up();
    report(&pet, "dropped");

    // Left alone for an hour, pumped once a minute like a real shell
    for _ in 0..60 {
        clock.advance(60_000);
        pet.pump();
    }
    report(&pet, "an hour unattended");

    // Late evening rolls around; the night trigger puts it to bed
    clock.set_local_time(23, 15, 6);
    clock.advance(60_000);
    pet.pump();
    report(&pet, "23:15");

    // Morning: quiet mode off, the pet wakes up
    clock.set_local_time(8, 0, 0);
    pet.set_quiet_mode(true);
    report(&pet, "quiet mode on");
    pet.set_quiet_mode(false);
    report(&pet, "quiet mode off");

    pet.dispose();
}
