//! Composition layer
//!
//! Owns every component and wires the one-directional subscriptions:
//! engine state changes drive sound playback, the energy value feeds the
//! scheduler context, and pointer input flows through the drag adapter
//! into engine transitions. No component reaches sideways into another;
//! they meet only here.

use ahash::AHashMap;
use std::cell::RefCell;
use std::rc::Rc;

use crate::audio::backend::AudioBackend;
use crate::audio::manager::SoundManager;
use crate::behavior::condition::CtxValue;
use crate::behavior::engine::{BehaviorEngine, EngineEvent};
use crate::behavior::scheduler::{TriggerScheduler, DEFAULT_EVAL_INTERVAL_MS};
use crate::core::clock::Clock;
use crate::core::config::{BehaviorConfig, SkinConfig};
use crate::core::store::{PetStore, Settings};
use crate::energy::{EnergyManager, Tier};
use crate::pet::drag::{DragController, PointerOutcome};

/// Petting feels good
const CLICK_ENERGY_DELTA: i32 = 2;
/// Being hauled around does not
const DRAG_ENERGY_DELTA: i32 = -1;

pub struct Pet {
    config: BehaviorConfig,
    engine: Rc<RefCell<BehaviorEngine>>,
    scheduler: TriggerScheduler,
    sounds: Rc<RefCell<SoundManager>>,
    energy: EnergyManager,
    drag: DragController,
    store: Rc<RefCell<dyn PetStore>>,
    clock: Rc<dyn Clock>,
    seed: u64,
}

impl Pet {
    /// Assemble the whole pet from a skin. Settings are read up front
    /// (quiet mode, mute); a failed read logs and falls back to defaults.
    pub fn new(
        skin: SkinConfig,
        backend: Box<dyn AudioBackend>,
        store: Rc<RefCell<dyn PetStore>>,
        clock: Rc<dyn Clock>,
        seed: u64,
    ) -> Self {
        let settings = store.borrow_mut().load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings; using defaults");
            Settings::default()
        });

        let mut sound_mgr = SoundManager::new(backend, seed.wrapping_mul(0x9e3779b9));
        sound_mgr.load_sounds(&skin.sounds, &skin.base_path);
        sound_mgr.set_muted(!settings.sound.enabled);
        let sounds = Rc::new(RefCell::new(sound_mgr));

        let config = skin.behaviors.unwrap_or_default();
        let engine = build_engine(&config, clock.clone(), seed, sounds.clone());
        if settings.quiet_mode {
            engine.borrow_mut().set_quiet_mode(true);
        }

        let mut scheduler =
            TriggerScheduler::new(engine.clone(), config.triggers.clone(), clock.clone());
        scheduler.start(DEFAULT_EVAL_INTERVAL_MS);

        let mut energy = EnergyManager::new(store.clone(), clock.clone());
        energy.init();
        scheduler.set_value("energy", CtxValue::Num(energy.energy() as f64));

        Self {
            config,
            engine,
            scheduler,
            sounds,
            energy,
            drag: DragController::new(),
            store,
            clock,
            seed,
        }
    }

    pub fn current_state(&self) -> String {
        self.engine.borrow().current_state().to_string()
    }

    pub fn energy(&self) -> i32 {
        self.energy.energy()
    }

    pub fn tier(&self) -> Tier {
        self.energy.tier()
    }

    pub fn engine(&self) -> Rc<RefCell<BehaviorEngine>> {
        self.engine.clone()
    }

    pub fn sounds(&self) -> Rc<RefCell<SoundManager>> {
        self.sounds.clone()
    }

    /// Advance every timer. The shell calls this on its own cadence; all
    /// deadlines that fell due since the last pump fire now.
    pub fn pump(&mut self) {
        let now = self.clock.now_ms();
        self.engine.borrow_mut().tick(now);
        self.scheduler
            .set_value("energy", CtxValue::Num(self.energy.energy() as f64));
        self.scheduler.tick(now);
        self.energy.tick(now);
        self.sounds.borrow_mut().tick(now);
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.drag.pointer_down(x, y);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if self.drag.pointer_move(x, y) == PointerOutcome::DragStart {
            self.scheduler.reset_idle_time();
            self.handle_interaction("drag");
        }
    }

    pub fn pointer_up(&mut self) {
        match self.drag.pointer_up() {
            PointerOutcome::Click => {
                self.scheduler.reset_idle_time();
                self.energy.modify_energy(CLICK_ENERGY_DELTA);
                self.handle_interaction("click");
            }
            PointerOutcome::DragEnd => {
                self.scheduler.reset_idle_time();
                self.energy.modify_energy(DRAG_ENERGY_DELTA);
                self.engine.borrow_mut().revert();
            }
            _ => {}
        }
    }

    /// Apply a named interaction from the config: transition, optional
    /// explicit duration, or a bare sound when no state is given.
    pub fn handle_interaction(&mut self, name: &str) -> bool {
        let Some(spec) = self.config.interactions.get(name).cloned() else {
            tracing::debug!(interaction = name, "no interaction configured");
            return false;
        };
        if let Some(state) = &spec.state {
            let mut engine = self.engine.borrow_mut();
            if !engine.transition(state) {
                return false;
            }
            if let Some(duration_ms) = spec.duration_ms {
                engine.schedule_revert(duration_ms);
            }
            return true;
        }
        if let Some(sound) = &spec.sound {
            return route_sound(&mut self.sounds.borrow_mut(), sound);
        }
        false
    }

    pub fn set_quiet_mode(&mut self, enabled: bool) {
        self.engine.borrow_mut().set_quiet_mode(enabled);
        self.save_settings(|s| s.quiet_mode = enabled);
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sounds.borrow_mut().set_muted(!enabled);
        self.save_settings(|s| s.sound.enabled = enabled);
    }

    /// Swap skins at runtime: reload every sound and rebuild the
    /// engine/scheduler pair around the new behavior config. Quiet mode
    /// survives the swap.
    pub fn switch_skin(&mut self, skin: SkinConfig) {
        self.sounds
            .borrow_mut()
            .load_sounds(&skin.sounds, &skin.base_path);

        let quiet = self.engine.borrow().quiet_mode();
        self.engine.borrow_mut().dispose();
        self.scheduler.dispose();

        let config = skin.behaviors.unwrap_or_default();
        self.seed = self.seed.wrapping_add(1);
        self.engine = build_engine(&config, self.clock.clone(), self.seed, self.sounds.clone());
        if quiet {
            self.engine.borrow_mut().set_quiet_mode(true);
        }

        self.scheduler = TriggerScheduler::new(
            self.engine.clone(),
            config.triggers.clone(),
            self.clock.clone(),
        );
        self.scheduler.start(DEFAULT_EVAL_INTERVAL_MS);
        self.scheduler
            .set_value("energy", CtxValue::Num(self.energy.energy() as f64));
        self.config = config;
        tracing::info!("skin switched");
    }

    pub fn dispose(&mut self) {
        self.scheduler.dispose();
        self.engine.borrow_mut().dispose();
        self.sounds.borrow_mut().dispose();
        self.energy.dispose();
    }

    fn save_settings(&mut self, apply: impl FnOnce(&mut Settings)) {
        let mut store = self.store.borrow_mut();
        let mut settings = store.load_settings().unwrap_or_default();
        apply(&mut settings);
        if let Err(e) = store.save_settings(&settings) {
            tracing::warn!(error = %e, "failed to persist settings");
        }
    }
}

/// Build an engine and subscribe the sound routing listener: entering a
/// state with a configured sound plays it (ambience entries loop, the
/// rest are one-shots); entering a state without one silences the
/// ambience channel so audio stays consistent with what is on screen.
fn build_engine(
    config: &BehaviorConfig,
    clock: Rc<dyn Clock>,
    seed: u64,
    sounds: Rc<RefCell<SoundManager>>,
) -> Rc<RefCell<BehaviorEngine>> {
    let mut engine = BehaviorEngine::new(config.clone(), clock, seed);
    let sound_map = state_sound_map(config);
    engine.on_event(move |event| match event {
        EngineEvent::StateChange { to, .. } => {
            let mut mgr = sounds.borrow_mut();
            match sound_map.get(to) {
                Some(id) => {
                    route_sound(&mut mgr, id);
                }
                None => mgr.stop_loop(),
            }
        }
        EngineEvent::SoundPlay { id } => {
            route_sound(&mut sounds.borrow_mut(), id);
        }
        EngineEvent::ActionTriggered { .. } => {}
    });
    Rc::new(RefCell::new(engine))
}

fn route_sound(mgr: &mut SoundManager, id: &str) -> bool {
    if mgr.is_loop_sound(id) {
        mgr.loop_sound(id)
    } else {
        mgr.play(id)
    }
}

/// State name -> sound id, merged from idle actions and interactions
fn state_sound_map(config: &BehaviorConfig) -> AHashMap<String, String> {
    let mut map = AHashMap::new();
    for action in &config.idle_actions {
        if let Some(sound) = &action.sound {
            map.insert(action.state.clone(), sound.clone());
        }
    }
    for spec in config.interactions.values() {
        if let (Some(state), Some(sound)) = (&spec.state, &spec.sound) {
            map.insert(state.clone(), sound.clone());
        }
    }
    map
}
