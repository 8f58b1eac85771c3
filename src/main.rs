//! Coin Guard entry point
//!
//! Native: headless run driven by a simple autopilot, saved to a JSON file.
//! wasm32: requestAnimationFrame loop over a DOM board, saved to LocalStorage.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element};

    use coin_guard::Tuning;
    use coin_guard::audio::WebAudio;
    use coin_guard::consts::*;
    use coin_guard::persistence::{LocalStorageStore, MemoryStore, PersistenceGateway, PersistenceStore};
    use coin_guard::present::{Animator, present, sync_positions};
    use coin_guard::sim::{
        AnimationIntent, CoinKind, EntityId, EntityRef, Purchase, SimulationContext, SlimeSpawner,
        TickInput, tick,
    };

    const STORAGE_PREFIX: &str = "coin_guard_";

    /// Board rendered as absolutely positioned DOM elements
    struct DomAnimator {
        document: Document,
        board: Element,
        nodes: BTreeMap<EntityRef, Element>,
    }

    impl DomAnimator {
        fn new(document: Document, board: Element) -> Self {
            Self {
                document,
                board,
                nodes: BTreeMap::new(),
            }
        }

        fn tag(entity: EntityRef) -> String {
            match entity {
                EntityRef::Coin(id) => format!("coin:{}", id),
                EntityRef::Helper(id) => format!("helper:{}", id),
                EntityRef::Slime(id) => format!("slime:{}", id),
            }
        }

        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(text));
            }
        }
    }

    impl Animator for DomAnimator {
        fn spawn(&mut self, entity: EntityRef) {
            let Ok(el) = self.document.create_element("div") else { return };
            let _ = el.set_attribute("data-entity", &Self::tag(entity));
            let _ = el.set_attribute("class", "sprite");
            if self.board.append_child(&el).is_ok() {
                self.nodes.insert(entity, el);
            }
        }

        fn play(&mut self, entity: EntityRef, intent: AnimationIntent) {
            let Some(el) = self.nodes.get(&entity) else { return };
            let flip = if intent.flip_x { " flip" } else { "" };
            let _ = el.set_attribute("class", &format!("sprite {}{}", intent.key(), flip));
        }

        fn set_velocity(&mut self, _entity: EntityRef, _vel: Vec2) {}

        fn set_position(&mut self, entity: EntityRef, pos: Vec2) {
            if let Some(el) = self.nodes.get(&entity) {
                let _ = el.set_attribute("style", &format!("left:{:.0}px;top:{:.0}px", pos.x, pos.y));
            }
        }

        fn remove(&mut self, entity: EntityRef) {
            if let Some(el) = self.nodes.remove(&entity) {
                el.remove();
            }
        }

        fn score_changed(&mut self, score: u64) {
            self.set_text("score", &score.to_string());
        }

        fn level_completed(&mut self, level: u32) {
            self.set_text("level", &(level + 1).to_string());
        }
    }

    struct Game {
        ctx: SimulationContext,
        gateway: PersistenceGateway<Box<dyn PersistenceStore>>,
        spawner: SlimeSpawner,
        animator: DomAnimator,
        audio: WebAudio,
        input: TickInput,
        accumulator: f64,
        last_time: f64,
    }

    impl Game {
        /// Run simulation ticks for one animation frame
        fn update(&mut self, dt_ms: f64) {
            self.accumulator += dt_ms.min(100.0);

            let mut substeps = 0;
            while self.accumulator >= SIM_DT_MS as f64 && substeps < MAX_SUBSTEPS {
                // Player input applies to the first substep only
                let input = std::mem::take(&mut self.input);
                tick(&mut self.ctx, &input, SIM_DT_MS);
                self.spawner.poll(&mut self.ctx);
                self.gateway.after_tick(&mut self.ctx);
                self.accumulator -= SIM_DT_MS as f64;
                substeps += 1;
            }

            present(&mut self.ctx, &mut self.animator, &mut self.audio);
            sync_positions(&self.ctx, &mut self.animator);
            self.update_hud();
        }

        fn update_hud(&self) {
            let secs = self.ctx.progress.level_time_left_ms / 1000;
            self.animator.set_text("timer", &secs.to_string());
            self.animator
                .set_text("target", &self.ctx.progress.level_target_score.to_string());
        }

        fn tap(&mut self, tag: &str) {
            let Some((kind, id)) = tag.split_once(':') else { return };
            let Ok(id) = id.parse::<EntityId>() else { return };
            match kind {
                "coin" => self.input.spin_coins.push(id),
                "slime" => self.input.hit_slimes.push(id),
                _ => {}
            }
            self.audio.resume();
        }
    }

    fn open_store() -> Box<dyn PersistenceStore> {
        match LocalStorageStore::open(STORAGE_PREFIX) {
            Some(store) => Box::new(store),
            None => {
                log::warn!("LocalStorage unavailable, progress will not survive a reload");
                Box::new(MemoryStore::new())
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Coin Guard starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");
        let board = document.get_element_by_id("board").expect("no board element");

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let seed = js_sys::Date::now() as u64;
        let mut ctx = SimulationContext::empty(seed, Tuning::default());
        let gateway = PersistenceGateway::for_context(open_store(), &ctx);
        gateway.restore(&mut ctx);
        let spawner = SlimeSpawner::from_tuning(&ctx.tuning, ctx.time_ms);

        let game = Rc::new(RefCell::new(Game {
            ctx,
            gateway,
            spawner,
            animator: DomAnimator::new(document.clone(), board.clone()),
            audio: WebAudio::new(),
            input: TickInput::default(),
            accumulator: 0.0,
            last_time: 0.0,
        }));
        log::info!("Game initialized with seed: {}", seed);

        setup_board_clicks(&board, game.clone());
        setup_shop(&document, game.clone());
        setup_flush_on_exit(game.clone());

        request_animation_frame(game);
    }

    fn setup_board_clicks(board: &Element, game: Rc<RefCell<Game>>) {
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
            let tag = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|el| el.get_attribute("data-entity"));
            if let Some(tag) = tag {
                game.borrow_mut().tap(&tag);
            }
        });
        let _ = board.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_shop(document: &Document, game: Rc<RefCell<Game>>) {
        let buttons = [
            ("buy-copper", Purchase::Coin(CoinKind::Copper)),
            ("buy-silver", Purchase::Coin(CoinKind::Silver)),
            ("buy-gold", Purchase::Coin(CoinKind::Gold)),
            ("buy-helper", Purchase::Helper),
        ];
        for (id, order) in buttons {
            let Some(btn) = document.get_element_by_id(id) else { continue };
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().input.purchases.push(order);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Flush the save when the tab closes or is hidden
    fn setup_flush_on_exit(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let mut g = game.borrow_mut();
                let Game { ctx, gateway, .. } = &mut *g;
                gateway.flush(ctx);
            });
            let _ = window
                .add_event_listener_with_callback("beforeunload", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(document) = window.document() {
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    let Game { ctx, gateway, .. } = &mut *g;
                    gateway.flush(ctx);
                    log::info!("Saved (tab hidden)");
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();
            let dt_ms = if g.last_time > 0.0 {
                time - g.last_time
            } else {
                SIM_DT_MS as f64
            };
            g.last_time = time;
            g.update(dt_ms);
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use coin_guard::Tuning;
    use coin_guard::audio::{RecordingAudio, SoundEffect};
    use coin_guard::consts::SIM_DT_MS;
    use coin_guard::persistence::{FileStore, PersistenceGateway};
    use coin_guard::present::{LogAnimator, present};
    use coin_guard::sim::{
        CoinKind, Purchase, SimulationContext, SlimeSpawner, TickInput, can_afford, tick,
    };

    const DEFAULT_SECONDS: u64 = 120;
    const DEFAULT_SEED: u64 = 12345;
    const DEFAULT_SAVE_PATH: &str = "coin-guard-save.json";
    /// How often the autopilot taps a coin (ms)
    const TAP_INTERVAL_MS: u64 = 1000;
    const SUMMARY_INTERVAL_MS: u64 = 10_000;

    fn load_tuning() -> Tuning {
        let Ok(path) = std::env::var("COIN_GUARD_TUNING") else {
            return Tuning::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(json) => {
                log::info!("Tuning loaded from {}", path);
                Tuning::from_json(&json)
            }
            Err(e) => {
                log::warn!("Could not read tuning {} ({}), using defaults", path, e);
                Tuning::default()
            }
        }
    }

    /// Stand-in player: taps the first idle coin, slaps slimes, shops greedily
    fn autopilot(ctx: &SimulationContext) -> TickInput {
        let mut input = TickInput::default();
        if ctx.time_ms % TAP_INTERVAL_MS >= SIM_DT_MS {
            return input;
        }
        if let Some(coin) = ctx.coins.iter().find(|c| c.is_available()) {
            input.spin_coins.push(coin.id);
        }
        if let Some(slime) = ctx.slimes.iter().find(|s| s.active) {
            input.hit_slimes.push(slime.id);
        }
        let wishlist = [
            Purchase::Helper,
            Purchase::Coin(CoinKind::Gold),
            Purchase::Coin(CoinKind::Silver),
            Purchase::Coin(CoinKind::Copper),
        ];
        if let Some(order) = wishlist.into_iter().find(|o| can_afford(ctx, *o)) {
            input.purchases.push(order);
        }
        input
    }

    fn summary(ctx: &SimulationContext) {
        log::info!(
            "t={}s score={} level={} coins={} helpers={} slimes={}",
            ctx.time_ms / 1000,
            ctx.score(),
            ctx.progress.current_level,
            ctx.coins.len(),
            ctx.helpers.len(),
            ctx.alive_slime_count()
        );
    }

    pub fn run() {
        let mut args = std::env::args().skip(1);
        let seconds = args
            .next()
            .and_then(|a| a.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SECONDS);
        let seed = args
            .next()
            .and_then(|a| a.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SEED);
        let save_path =
            std::env::var("COIN_GUARD_SAVE").unwrap_or_else(|_| DEFAULT_SAVE_PATH.to_string());

        log::info!("Coin Guard (headless) for {}s with seed {}", seconds, seed);

        let mut ctx = SimulationContext::empty(seed, load_tuning());
        let mut gateway = PersistenceGateway::for_context(FileStore::open(&save_path), &ctx);
        gateway.restore(&mut ctx);
        let mut spawner = SlimeSpawner::from_tuning(&ctx.tuning, ctx.time_ms);
        let mut animator = LogAnimator::default();
        let mut audio = RecordingAudio::default();

        let ticks = seconds * 1000 / SIM_DT_MS;
        for _ in 0..ticks {
            let input = autopilot(&ctx);
            tick(&mut ctx, &input, SIM_DT_MS);
            spawner.poll(&mut ctx);
            gateway.after_tick(&mut ctx);
            present(&mut ctx, &mut animator, &mut audio);

            if ctx.time_ms % SUMMARY_INTERVAL_MS < SIM_DT_MS {
                summary(&ctx);
            }
        }

        if !gateway.flush(&ctx) {
            log::error!("Final save to {} failed", save_path);
        }
        summary(&ctx);
        log::info!(
            "Spins: {} rewarded, {} missed; coins eaten: {}; saves written: {}",
            animator.rewards,
            animator.misses,
            audio.count(SoundEffect::CoinDestroyed),
            gateway.write_count()
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    headless::run();
}
