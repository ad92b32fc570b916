use crate::gesture::{GestureOutput, PressGesture};
use crate::presets::{Preset, PresetId, PresetStore};
use crate::reconciler::{ButtonState, Edit, Effect, Event, Reconciler, Tab, UiStatus};
use crate::remote::RemoteSettingsClient;
use crate::settings::Configuration;
use crate::simulation::{Grid, SimulatorHandle, SparkleSimulator};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Everything the view talks to.
///
/// All state changes happen on the caller's thread. Remote calls run on
/// short-lived worker threads and only report back through a channel that
/// [`Session::pump`] drains, so an answer is never applied while another
/// event is being handled.
pub struct Session {
    reconciler: Reconciler,
    store: PresetStore,
    remote: Arc<dyn RemoteSettingsClient>,
    simulator: SparkleSimulator,
    running: Option<SimulatorHandle>,
    next_tick: Instant,
    gesture: PressGesture,
    timers: Vec<(Instant, Event)>,
    completions_tx: Sender<Event>,
    completions: Receiver<Event>,
    in_flight: usize,
    confirmation: Option<(PresetId, String)>,
}

impl Session {
    pub fn new(
        store: PresetStore,
        remote: Arc<dyn RemoteSettingsClient>,
        initial: Configuration,
        applied_hold: Duration,
        long_press: Duration,
        now: Instant,
    ) -> Self {
        let (completions_tx, completions) = mpsc::channel();
        let has_api_key = remote.has_api_key();
        Self {
            reconciler: Reconciler::new(initial, has_api_key, applied_hold),
            store,
            remote,
            simulator: SparkleSimulator::new(),
            running: None,
            next_tick: now,
            gesture: PressGesture::new(long_press),
            timers: Vec::new(),
            completions_tx,
            completions,
            in_flight: 0,
            confirmation: None,
        }
    }

    /// Start the animation and load the device settings
    pub fn mount(&mut self, now: Instant) {
        self.dispatch(Event::Mount, now);
    }

    /// Feed one event through the reconciler and carry out the effects,
    /// including any events those effects produce right away
    pub fn dispatch(&mut self, event: Event, now: Instant) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let effects = self.reconciler.handle(event, self.store.list());
            for effect in effects {
                if let Some(follow_up) = self.execute(effect, now) {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    fn execute(&mut self, effect: Effect, now: Instant) -> Option<Event> {
        match effect {
            Effect::Fetch(request) => {
                self.spawn(move |remote| Event::FetchCompleted {
                    request,
                    result: remote.fetch_current(),
                });
                None
            }
            Effect::Push { request, config } => {
                self.spawn(move |remote| Event::PushCompleted {
                    request,
                    result: remote.push(&config),
                });
                None
            }
            Effect::Generate(request) => {
                self.spawn(move |remote| Event::GenerateCompleted {
                    request,
                    result: remote.generate(),
                });
                None
            }
            Effect::SavePreset { name, config } => {
                let preset = self.store.save(name.as_deref(), &config);
                Some(Event::PresetSaved(preset))
            }
            Effect::DeletePreset(id) => {
                self.store.delete(id);
                None
            }
            Effect::RestartSimulation(config) => {
                self.restart_simulation(&config, now);
                None
            }
            Effect::Schedule { after, event } => {
                self.timers.push((now + after, event));
                None
            }
            Effect::ConfirmDeletion { id, name } => {
                self.confirmation = Some((id, name));
                None
            }
            Effect::ClearConfirmation => {
                self.confirmation = None;
                None
            }
        }
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce(&dyn RemoteSettingsClient) -> Event + Send + 'static,
    {
        let remote = Arc::clone(&self.remote);
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let event = job(remote.as_ref());
            // The session may be gone by now; nothing left to tell
            let _ = tx.send(event);
        });
    }

    /// Stop the running animation and start a fresh one, with a new deadline
    fn restart_simulation(&mut self, config: &Configuration, now: Instant) {
        if let Some(handle) = self.running.take() {
            self.simulator.stop(handle);
        }
        self.running = Some(self.simulator.start(config));
        self.next_tick = now + self.simulator.interval();
        log::debug!(
            "Simulator restarted, ticking every {:?}",
            self.simulator.interval()
        );
    }

    /// Apply finished requests, due timers and the long-press deadline, then
    /// advance the animation if its tick is due. Returns whether a new frame
    /// was produced.
    pub fn pump(&mut self, now: Instant) -> bool {
        while let Ok(event) = self.completions.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            self.dispatch(event, now);
        }

        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.timers)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.timers = pending;
        for (_, event) in due {
            self.dispatch(event, now);
        }

        if let Some(output) = self.gesture.poll(now) {
            self.gesture_output(output, now);
        }

        if self.simulator.is_running() && now >= self.next_tick {
            self.simulator.tick();
            self.next_tick = now + self.simulator.interval();
            true
        } else {
            false
        }
    }

    /// Earliest moment [`Session::pump`] has something to do
    pub fn next_deadline(&self) -> Instant {
        self.timers
            .iter()
            .map(|(at, _)| *at)
            .chain(self.gesture.deadline())
            .fold(self.next_tick, Instant::min)
    }

    fn gesture_output(&mut self, output: GestureOutput, now: Instant) {
        match output {
            GestureOutput::Click(id) => self.select_preset(id, now),
            GestureOutput::LongPress(id) => self.long_press(id, now),
        }
    }

    // === View events ===

    pub fn select_tab(&mut self, tab: Tab, now: Instant) {
        self.dispatch(Event::TabChanged(tab), now);
    }

    pub fn edit(&mut self, edit: Edit, now: Instant) {
        self.dispatch(Event::Edit(edit), now);
    }

    pub fn select_preset(&mut self, id: PresetId, now: Instant) {
        self.dispatch(Event::SelectPreset(id), now);
    }

    pub fn press_primary(&mut self, now: Instant) {
        self.dispatch(Event::PressPrimary, now);
    }

    pub fn press_start(&mut self, id: PresetId, now: Instant) {
        if self.confirmation.is_none() {
            self.gesture.press_start(id, now);
        }
    }

    pub fn press_end(&mut self, now: Instant) {
        if let Some(output) = self.gesture.press_end(now) {
            self.gesture_output(output, now);
        }
    }

    pub fn press_cancel(&mut self) {
        self.gesture.press_cancel();
    }

    /// Ask to delete a preset without going through a press gesture
    pub fn long_press(&mut self, id: PresetId, now: Instant) {
        self.dispatch(Event::LongPressPreset(id), now);
    }

    pub fn resolve_confirmation(&mut self, confirmed: bool, now: Instant) {
        let event = if confirmed {
            Event::ConfirmDelete
        } else {
            Event::CancelDelete
        };
        self.dispatch(event, now);
    }

    // === View state ===

    pub fn config(&self) -> &Configuration {
        self.reconciler.config()
    }

    pub fn status(&self) -> &UiStatus {
        self.reconciler.status()
    }

    pub fn button(&self) -> ButtonState {
        self.reconciler.button(self.store.list())
    }

    pub fn tab(&self) -> Tab {
        self.reconciler.tab()
    }

    pub fn presets(&self) -> &[Preset] {
        self.store.list()
    }

    pub fn selected(&self) -> Option<PresetId> {
        self.reconciler.selected()
    }

    pub fn has_pending_edits(&self) -> bool {
        self.reconciler.has_pending_edits()
    }

    pub fn device_known(&self) -> bool {
        self.reconciler.remote().is_some()
    }

    pub fn has_api_key(&self) -> bool {
        self.reconciler.has_api_key()
    }

    pub fn is_generating(&self) -> bool {
        self.reconciler.is_generating()
    }

    /// Preset waiting for a delete confirmation
    pub fn confirmation(&self) -> Option<(PresetId, &str)> {
        self.confirmation
            .as_ref()
            .map(|(id, name)| (*id, name.as_str()))
    }

    pub fn grid(&self) -> &Grid {
        self.simulator.grid()
    }

    /// Sparkles drawn in the current frame
    pub fn sparkle_count(&self) -> usize {
        self.simulator.paint_ops()
    }

    pub fn tick_interval(&self) -> Duration {
        self.simulator.interval()
    }

    /// Block until every outstanding remote request has been applied
    #[cfg(test)]
    fn settle(&mut self, now: Instant) {
        while self.in_flight > 0 {
            match self.completions.recv_timeout(Duration::from_secs(5)) {
                Ok(event) => {
                    self.in_flight -= 1;
                    self.dispatch(event, now);
                }
                Err(e) => panic!("remote request never completed: {}", e),
            }
        }
    }
}
