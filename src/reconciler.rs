//! Settings reconciliation.
//!
//! Keeps the local configuration, the selected preset and the device's last
//! reported settings consistent, and decides what the primary button says and
//! does. Everything here is a pure transition: [`Reconciler::handle`] takes an
//! event and returns the effects the session has to carry out. Remote results
//! and timers come back in as events.

use crate::presets::{find_by_id, find_matching, Preset, PresetId};
use crate::remote::{GeneratedPreset, RemoteError};
use crate::settings::Configuration;
use std::time::Duration;

/// Control tabs of the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Colors,
    Values,
    Presets,
}

impl Tab {
    pub fn name(&self) -> &str {
        match self {
            Tab::Colors => "Colors",
            Tab::Values => "Values",
            Tab::Presets => "Presets",
        }
    }

    pub fn next(&self) -> Tab {
        match self {
            Tab::Colors => Tab::Values,
            Tab::Values => Tab::Presets,
            Tab::Presets => Tab::Colors,
        }
    }

    pub fn prev(&self) -> Tab {
        match self {
            Tab::Colors => Tab::Presets,
            Tab::Values => Tab::Colors,
            Tab::Presets => Tab::Values,
        }
    }
}

/// What the primary button currently reflects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiStatus {
    Loading,
    NeedsApply,
    Applying,
    Applied,
    NeedsSave,
    Saving,
    Saved,
    UsingPreset(String),
    CanUsePreset(String),
}

impl UiStatus {
    fn is_in_flight(&self) -> bool {
        matches!(self, UiStatus::Applying | UiStatus::Saving)
    }
}

/// Tags a remote request so late or superseded answers can be told apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(u64);

/// A single user edit of the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    ToggleColor(usize),
    NumSparkles(u32),
    SparkleSize(u32),
    Speed(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Mount,
    TabChanged(Tab),
    Edit(Edit),
    SelectPreset(PresetId),
    PressPrimary,
    Generate,
    LongPressPreset(PresetId),
    ConfirmDelete,
    CancelDelete,
    FetchCompleted {
        request: RequestId,
        result: Result<Configuration, RemoteError>,
    },
    PushCompleted {
        request: RequestId,
        result: Result<(), RemoteError>,
    },
    GenerateCompleted {
        request: RequestId,
        result: Result<GeneratedPreset, RemoteError>,
    },
    PresetSaved(Preset),
    HoldElapsed(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch(RequestId),
    Push {
        request: RequestId,
        config: Configuration,
    },
    Generate(RequestId),
    SavePreset {
        name: Option<String>,
        config: Configuration,
    },
    DeletePreset(PresetId),
    RestartSimulation(Configuration),
    Schedule {
        after: Duration,
        event: Event,
    },
    ConfirmDeletion {
        id: PresetId,
        name: String,
    },
    ClearConfirmation,
}

/// What pressing the primary button does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    None,
    Apply,
    Save,
    UsePreset,
    Generate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub label: String,
    pub enabled: bool,
    pub action: PrimaryAction,
}

impl ButtonState {
    fn disabled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: false,
            action: PrimaryAction::None,
        }
    }

    fn enabled(label: impl Into<String>, action: PrimaryAction) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            action,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PushKind {
    Edits,
    Preset { id: PresetId, name: String },
}

#[derive(Debug, Clone)]
struct InFlightPush {
    request: RequestId,
    kind: PushKind,
    prior: UiStatus,
    revision: u64,
    config: Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPurpose {
    /// First load: adopt whatever the device runs
    Mount,
    /// Later check: only match presets against the device
    Poll,
}

#[derive(Debug, Clone, Copy)]
struct InFlightFetch {
    request: RequestId,
    purpose: FetchPurpose,
    revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveOrigin {
    Button,
    Generated,
    /// Generated while the user kept editing: stored, not adopted
    Suggestion,
}

#[derive(Debug, Clone, Copy)]
struct InFlightGenerate {
    request: RequestId,
    revision: u64,
}

/// Settings reconciliation state
pub struct Reconciler {
    config: Configuration,
    selected: Option<PresetId>,
    pending_edits: bool,
    remote: Option<Configuration>,
    status: UiStatus,
    tab: Tab,
    push: Option<InFlightPush>,
    fetch: Option<InFlightFetch>,
    generate: Option<InFlightGenerate>,
    saving: Option<SaveOrigin>,
    pending_delete: Option<PresetId>,
    /// Bumped on every edit or selection; in-flight work compares against it
    revision: u64,
    hold_token: u64,
    next_request: u64,
    has_api_key: bool,
    applied_hold: Duration,
}

impl Reconciler {
    pub fn new(config: Configuration, has_api_key: bool, applied_hold: Duration) -> Self {
        Self {
            config,
            selected: None,
            pending_edits: false,
            remote: None,
            status: UiStatus::Loading,
            tab: Tab::default(),
            push: None,
            fetch: None,
            generate: None,
            saving: None,
            pending_delete: None,
            revision: 0,
            hold_token: 0,
            next_request: 0,
            has_api_key,
            applied_hold,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn status(&self) -> &UiStatus {
        &self.status
    }

    pub fn selected(&self) -> Option<PresetId> {
        self.selected
    }

    pub fn has_pending_edits(&self) -> bool {
        self.pending_edits
    }

    pub fn remote(&self) -> Option<&Configuration> {
        self.remote.as_ref()
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn is_generating(&self) -> bool {
        self.generate.is_some()
    }

    #[cfg(test)]
    pub fn pending_delete(&self) -> Option<PresetId> {
        self.pending_delete
    }

    pub fn has_api_key(&self) -> bool {
        self.has_api_key
    }

    /// Apply one event; `presets` is the current preset list
    pub fn handle(&mut self, event: Event, presets: &[Preset]) -> Vec<Effect> {
        match event {
            Event::Mount => self.mount(),
            Event::TabChanged(tab) => self.change_tab(tab),
            Event::Edit(edit) => self.edit(edit),
            Event::SelectPreset(id) => self.select_preset(id, presets),
            Event::PressPrimary => self.press_primary(presets),
            Event::Generate => self.start_generate(),
            Event::LongPressPreset(id) => self.long_press(id, presets),
            Event::ConfirmDelete => self.confirm_delete(),
            Event::CancelDelete => {
                self.pending_delete = None;
                vec![Effect::ClearConfirmation]
            }
            Event::FetchCompleted { request, result } => {
                self.fetch_completed(request, result, presets)
            }
            Event::PushCompleted { request, result } => {
                self.push_completed(request, result, presets)
            }
            Event::GenerateCompleted { request, result } => {
                self.generate_completed(request, result)
            }
            Event::PresetSaved(preset) => self.preset_saved(preset),
            Event::HoldElapsed(token) => self.hold_elapsed(token, presets),
        }
    }

    /// Primary button label, enabled state and action for the current tab
    pub fn button(&self, presets: &[Preset]) -> ButtonState {
        let selected_name = self.selected_preset(presets).map(|p| p.name.clone());

        let offers_generate = self.tab == Tab::Presets
            && self.selected.is_none()
            && matches!(self.status, UiStatus::NeedsApply | UiStatus::NeedsSave);
        if offers_generate {
            return if !self.has_api_key {
                ButtonState::disabled("No API key")
            } else if self.is_generating() {
                ButtonState::disabled("Generating...")
            } else {
                ButtonState::enabled("Generate AI preset", PrimaryAction::Generate)
            };
        }

        match &self.status {
            UiStatus::Loading => ButtonState::disabled("Loading..."),
            UiStatus::NeedsApply => {
                if !self.has_api_key {
                    ButtonState::disabled("No API key")
                } else if self.pending_edits || self.selected.is_some() {
                    ButtonState::enabled("Apply", PrimaryAction::Apply)
                } else {
                    ButtonState::disabled("Apply")
                }
            }
            UiStatus::Applying => ButtonState::disabled("Applying..."),
            UiStatus::Applied => match selected_name {
                Some(name) => ButtonState::disabled(format!("Applied {}", name)),
                None => ButtonState::disabled("Applied"),
            },
            UiStatus::NeedsSave => ButtonState::enabled("Save preset", PrimaryAction::Save),
            UiStatus::Saving => ButtonState::disabled("Saving..."),
            UiStatus::Saved => match selected_name {
                Some(name) => ButtonState::disabled(format!("Saved {}", name)),
                None => ButtonState::disabled("Saved"),
            },
            UiStatus::UsingPreset(name) => ButtonState::disabled(format!("Applied {}", name)),
            UiStatus::CanUsePreset(name) => {
                if self.has_api_key {
                    ButtonState::enabled(format!("Apply {}", name), PrimaryAction::UsePreset)
                } else {
                    ButtonState::disabled("No API key")
                }
            }
        }
    }

    fn selected_preset<'a>(&self, presets: &'a [Preset]) -> Option<&'a Preset> {
        self.selected.and_then(|id| find_by_id(presets, id))
    }

    /// Status implied by the current state when nothing is in flight
    fn settled_status(&self, presets: &[Preset]) -> UiStatus {
        if self.pending_edits {
            return UiStatus::NeedsApply;
        }
        if let Some(preset) = self.selected_preset(presets) {
            return if self.remote.as_ref() == Some(&preset.configuration) {
                UiStatus::UsingPreset(preset.name.clone())
            } else {
                UiStatus::CanUsePreset(preset.name.clone())
            };
        }
        if self.remote.as_ref() == Some(&self.config) {
            UiStatus::NeedsSave
        } else {
            UiStatus::NeedsApply
        }
    }

    fn next_request(&mut self) -> RequestId {
        self.next_request += 1;
        RequestId(self.next_request)
    }

    fn request_fetch(&mut self, purpose: FetchPurpose) -> Option<Effect> {
        if !self.has_api_key || self.fetch.is_some() {
            return None;
        }
        let request = self.next_request();
        self.fetch = Some(InFlightFetch {
            request,
            purpose,
            revision: self.revision,
        });
        Some(Effect::Fetch(request))
    }

    fn mount(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::RestartSimulation(self.config.clone())];
        match self.request_fetch(FetchPurpose::Mount) {
            Some(fetch) => {
                self.status = UiStatus::Loading;
                effects.push(fetch);
            }
            None => {
                log::info!("No API key configured, device sync disabled");
                self.status = UiStatus::NeedsApply;
            }
        }
        effects
    }

    fn change_tab(&mut self, tab: Tab) -> Vec<Effect> {
        self.tab = tab;
        if tab == Tab::Presets {
            self.request_fetch(FetchPurpose::Poll).into_iter().collect()
        } else {
            Vec::new()
        }
    }

    fn edit(&mut self, edit: Edit) -> Vec<Effect> {
        let changed = match edit {
            Edit::ToggleColor(index) => self.config.toggle_color(index),
            Edit::NumSparkles(value) => self.config.set_num_sparkles(value),
            Edit::SparkleSize(value) => self.config.set_sparkle_size(value),
            Edit::Speed(value) => self.config.set_speed(value),
        };
        if !changed {
            return Vec::new();
        }

        self.pending_edits = true;
        self.selected = None;
        self.revision += 1;
        self.hold_token += 1;
        if !self.status.is_in_flight() {
            self.status = UiStatus::NeedsApply;
        }
        vec![Effect::RestartSimulation(self.config.clone())]
    }

    fn select_preset(&mut self, id: PresetId, presets: &[Preset]) -> Vec<Effect> {
        let Some(preset) = find_by_id(presets, id) else {
            return Vec::new();
        };
        self.config = preset.configuration.clone();
        self.selected = Some(id);
        self.pending_edits = false;
        self.revision += 1;
        self.hold_token += 1;
        if !self.status.is_in_flight() {
            self.status = self.settled_status(presets);
        }
        vec![Effect::RestartSimulation(self.config.clone())]
    }

    fn press_primary(&mut self, presets: &[Preset]) -> Vec<Effect> {
        let button = self.button(presets);
        if !button.enabled {
            return Vec::new();
        }
        match button.action {
            PrimaryAction::None => Vec::new(),
            PrimaryAction::Apply => {
                let config = self.config.clone();
                self.start_push(PushKind::Edits, config)
            }
            PrimaryAction::UsePreset => match self.selected_preset(presets) {
                Some(preset) => {
                    let kind = PushKind::Preset {
                        id: preset.id,
                        name: preset.name.clone(),
                    };
                    let config = preset.configuration.clone();
                    self.start_push(kind, config)
                }
                None => Vec::new(),
            },
            PrimaryAction::Save => {
                self.status = UiStatus::Saving;
                self.saving = Some(SaveOrigin::Button);
                vec![Effect::SavePreset {
                    name: None,
                    config: self.config.clone(),
                }]
            }
            PrimaryAction::Generate => self.start_generate(),
        }
    }

    fn start_push(&mut self, kind: PushKind, config: Configuration) -> Vec<Effect> {
        let request = self.next_request();
        self.push = Some(InFlightPush {
            request,
            kind,
            prior: self.status.clone(),
            revision: self.revision,
            config: config.clone(),
        });
        self.status = UiStatus::Applying;
        vec![Effect::Push { request, config }]
    }

    fn push_completed(
        &mut self,
        request: RequestId,
        result: Result<(), RemoteError>,
        presets: &[Preset],
    ) -> Vec<Effect> {
        let push = match self.push.take() {
            Some(push) if push.request == request => push,
            other => {
                self.push = other;
                log::debug!("Ignoring stale push result {:?}", request);
                return Vec::new();
            }
        };

        if result.is_ok() {
            self.remote = Some(push.config.clone());
        }

        if push.revision != self.revision {
            // Something was edited meanwhile; that newer state decides
            self.status = self.settled_status(presets);
            return Vec::new();
        }

        match (push.kind, result) {
            (PushKind::Edits, Ok(())) => {
                log::info!("Applied settings to device");
                self.pending_edits = false;
                self.selected = find_matching(presets, &self.config).map(|p| p.id);
                self.status = UiStatus::Applied;
                self.hold_token += 1;
                vec![Effect::Schedule {
                    after: self.applied_hold,
                    event: Event::HoldElapsed(self.hold_token),
                }]
            }
            (PushKind::Preset { name, .. }, Ok(())) => {
                log::info!("Applied preset {:?} to device", name);
                self.status = UiStatus::UsingPreset(name);
                Vec::new()
            }
            (_, Err(e)) => {
                log::warn!("Apply failed: {}", e);
                self.status = push.prior;
                Vec::new()
            }
        }
    }

    fn hold_elapsed(&mut self, token: u64, presets: &[Preset]) -> Vec<Effect> {
        if token != self.hold_token || self.status != UiStatus::Applied {
            return Vec::new();
        }
        self.status = match self.selected_preset(presets) {
            Some(preset) => UiStatus::CanUsePreset(preset.name.clone()),
            None => UiStatus::NeedsSave,
        };
        Vec::new()
    }

    fn preset_saved(&mut self, preset: Preset) -> Vec<Effect> {
        let Some(origin) = self.saving.take() else {
            return Vec::new();
        };
        if origin == SaveOrigin::Suggestion {
            log::info!("Kept suggestion {:?} without applying it", preset.name);
            return Vec::new();
        }
        self.selected = Some(preset.id);
        self.pending_edits = false;
        if self.push.is_some() {
            return Vec::new();
        }
        self.status = match origin {
            SaveOrigin::Button => UiStatus::Saved,
            SaveOrigin::Generated if self.remote.as_ref() == Some(&preset.configuration) => {
                UiStatus::UsingPreset(preset.name)
            }
            _ => UiStatus::CanUsePreset(preset.name),
        };
        Vec::new()
    }

    fn start_generate(&mut self) -> Vec<Effect> {
        if !self.has_api_key || self.generate.is_some() || self.status.is_in_flight() {
            return Vec::new();
        }
        let request = self.next_request();
        self.generate = Some(InFlightGenerate {
            request,
            revision: self.revision,
        });
        vec![Effect::Generate(request)]
    }

    fn generate_completed(
        &mut self,
        request: RequestId,
        result: Result<GeneratedPreset, RemoteError>,
    ) -> Vec<Effect> {
        let Some(pending) = self.generate.filter(|g| g.request == request) else {
            log::debug!("Ignoring stale generate result {:?}", request);
            return Vec::new();
        };
        self.generate = None;
        let generated = match result {
            Ok(generated) => generated,
            Err(e) => {
                log::warn!("Preset generation failed: {}", e);
                return Vec::new();
            }
        };

        if pending.revision != self.revision {
            // The user moved on meanwhile; keep the suggestion as a preset only
            log::info!("Generated preset {:?} after further edits", generated.theme);
            self.saving = Some(SaveOrigin::Suggestion);
            return vec![Effect::SavePreset {
                name: Some(generated.theme),
                config: generated.configuration,
            }];
        }

        log::info!("Generated preset {:?}", generated.theme);
        self.config = generated.configuration;
        self.pending_edits = false;
        self.selected = None;
        self.revision += 1;
        self.hold_token += 1;
        self.saving = Some(SaveOrigin::Generated);
        vec![
            Effect::RestartSimulation(self.config.clone()),
            Effect::SavePreset {
                name: Some(generated.theme),
                config: self.config.clone(),
            },
        ]
    }

    fn long_press(&mut self, id: PresetId, presets: &[Preset]) -> Vec<Effect> {
        let Some(preset) = find_by_id(presets, id) else {
            return Vec::new();
        };
        self.pending_delete = Some(id);
        vec![Effect::ConfirmDeletion {
            id,
            name: preset.name.clone(),
        }]
    }

    fn confirm_delete(&mut self) -> Vec<Effect> {
        let Some(id) = self.pending_delete.take() else {
            return vec![Effect::ClearConfirmation];
        };
        if self.selected == Some(id) {
            self.selected = None;
            if !self.status.is_in_flight() {
                self.status = UiStatus::NeedsApply;
            }
        }
        vec![Effect::ClearConfirmation, Effect::DeletePreset(id)]
    }

    fn fetch_completed(
        &mut self,
        request: RequestId,
        result: Result<Configuration, RemoteError>,
        presets: &[Preset],
    ) -> Vec<Effect> {
        let Some(fetch) = self.fetch.filter(|f| f.request == request) else {
            log::debug!("Ignoring stale fetch result {:?}", request);
            return Vec::new();
        };
        self.fetch = None;

        let remote = match result {
            Ok(remote) => remote,
            Err(e) => {
                log::warn!("Could not read device settings: {}", e);
                if self.status == UiStatus::Loading {
                    self.status = self.settled_status(presets);
                }
                return Vec::new();
            }
        };
        self.remote = Some(remote.clone());

        let untouched = fetch.revision == self.revision;
        let mut effects = Vec::new();
        // A push in flight is about to change the device; this reading is older
        if untouched && !self.pending_edits && self.push.is_none() {
            let matching = find_matching(presets, &remote);
            match (fetch.purpose, matching) {
                (_, Some(preset)) => {
                    self.selected = Some(preset.id);
                    if self.config != preset.configuration {
                        self.config = preset.configuration.clone();
                        effects.push(Effect::RestartSimulation(self.config.clone()));
                    }
                }
                (FetchPurpose::Mount, None) => {
                    self.selected = None;
                    if self.config != remote {
                        self.config = remote;
                        effects.push(Effect::RestartSimulation(self.config.clone()));
                    }
                }
                (FetchPurpose::Poll, None) => {}
            }
        }

        let keep = self.status.is_in_flight()
            || matches!(self.status, UiStatus::Saved | UiStatus::Applied);
        if !keep {
            self.status = self.settled_status(presets);
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PALETTE_LEN;

    const HOLD: Duration = Duration::from_millis(1500);

    fn base() -> Configuration {
        let mut active_colors = vec![false; PALETTE_LEN];
        active_colors[0] = true;
        Configuration {
            active_colors,
            num_sparkles: 150,
            sparkle_size: 3,
            speed: 40,
        }
    }

    fn with_size(size: u32) -> Configuration {
        Configuration {
            sparkle_size: size,
            ..base()
        }
    }

    fn preset(id: PresetId, name: &str, configuration: Configuration) -> Preset {
        Preset {
            id,
            name: name.to_string(),
            configuration,
        }
    }

    fn fetch_request(effects: &[Effect]) -> RequestId {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Fetch(request) => Some(*request),
                _ => None,
            })
            .expect("fetch effect")
    }

    fn push_request(effects: &[Effect]) -> (RequestId, Configuration) {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Push { request, config } => Some((*request, config.clone())),
                _ => None,
            })
            .expect("push effect")
    }

    fn scheduled(effects: &[Effect]) -> Event {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Schedule { event, .. } => Some(event.clone()),
                _ => None,
            })
            .expect("schedule effect")
    }

    /// Reconciler that has loaded `device` from the remote
    fn mounted(device: Configuration, presets: &[Preset]) -> Reconciler {
        let mut r = Reconciler::new(Configuration::default(), true, HOLD);
        let effects = r.handle(Event::Mount, presets);
        assert_eq!(r.status(), &UiStatus::Loading);
        let request = fetch_request(&effects);
        r.handle(
            Event::FetchCompleted {
                request,
                result: Ok(device),
            },
            presets,
        );
        r
    }

    #[test]
    fn test_mount_adopts_device_settings() {
        let r = mounted(with_size(7), &[]);
        assert_eq!(r.config(), &with_size(7));
        assert_eq!(r.status(), &UiStatus::NeedsSave);
        assert!(!r.has_pending_edits());
    }

    #[test]
    fn test_mount_selects_matching_preset() {
        let presets = [preset(1, "Calm", with_size(2)), preset(2, "Big", with_size(7))];
        let r = mounted(with_size(7), &presets);
        assert_eq!(r.selected(), Some(2));
        assert_eq!(r.status(), &UiStatus::UsingPreset("Big".to_string()));
        assert!(!r.button(&presets).enabled);
    }

    #[test]
    fn test_mount_failure_leaves_unknown_state() {
        let mut r = Reconciler::new(base(), true, HOLD);
        let request = fetch_request(&r.handle(Event::Mount, &[]));
        r.handle(
            Event::FetchCompleted {
                request,
                result: Err(RemoteError::Network("down".to_string())),
            },
            &[],
        );
        assert_eq!(r.status(), &UiStatus::NeedsApply);
        assert_eq!(r.remote(), None);
        assert!(!r.button(&[]).enabled);
    }

    #[test]
    fn test_mount_without_key_never_fetches() {
        let mut r = Reconciler::new(base(), false, HOLD);
        let effects = r.handle(Event::Mount, &[]);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Fetch(_))));
        r.handle(Event::Edit(Edit::Speed(100)), &[]);
        let button = r.button(&[]);
        assert_eq!(button.label, "No API key");
        assert!(!button.enabled);
        assert!(r.handle(Event::PressPrimary, &[]).is_empty());
        assert!(r.handle(Event::TabChanged(Tab::Presets), &[]).is_empty());
    }

    #[test]
    fn test_edit_moves_to_needs_apply_and_clears_selection() {
        let presets = [preset(1, "Start", base())];
        let mut r = mounted(base(), &presets);
        assert_eq!(r.selected(), Some(1));

        let effects = r.handle(Event::Edit(Edit::SparkleSize(5)), &presets);
        assert_eq!(effects, vec![Effect::RestartSimulation(with_size(5))]);
        assert_eq!(r.status(), &UiStatus::NeedsApply);
        assert_eq!(r.selected(), None);
        assert!(r.has_pending_edits());
        assert_eq!(r.button(&presets).label, "Apply");
        assert!(r.button(&presets).enabled);
    }

    #[test]
    fn test_toggle_last_color_changes_nothing() {
        let mut r = mounted(base(), &[]);
        let effects = r.handle(Event::Edit(Edit::ToggleColor(0)), &[]);
        assert!(effects.is_empty());
        assert_eq!(r.config(), &base());
        assert_eq!(r.status(), &UiStatus::NeedsSave);
    }

    #[test]
    fn test_apply_success_then_needs_save() {
        let mut r = mounted(base(), &[]);
        r.handle(Event::Edit(Edit::SparkleSize(5)), &[]);
        let (request, config) = push_request(&r.handle(Event::PressPrimary, &[]));
        assert_eq!(config, with_size(5));
        assert_eq!(r.status(), &UiStatus::Applying);
        assert!(!r.button(&[]).enabled);

        let effects = r.handle(
            Event::PushCompleted {
                request,
                result: Ok(()),
            },
            &[],
        );
        assert_eq!(r.status(), &UiStatus::Applied);
        assert_eq!(r.remote(), Some(&with_size(5)));
        assert!(!r.has_pending_edits());

        r.handle(scheduled(&effects), &[]);
        assert_eq!(r.status(), &UiStatus::NeedsSave);
        assert_eq!(r.button(&[]).label, "Save preset");
    }

    #[test]
    fn test_apply_success_with_matching_preset_offers_it() {
        let presets = [preset(9, "Five", with_size(5))];
        let mut r = mounted(base(), &presets);
        r.handle(Event::Edit(Edit::SparkleSize(5)), &presets);
        let (request, _) = push_request(&r.handle(Event::PressPrimary, &presets));
        let effects = r.handle(
            Event::PushCompleted {
                request,
                result: Ok(()),
            },
            &presets,
        );
        assert_eq!(r.button(&presets).label, "Applied Five");
        r.handle(scheduled(&effects), &presets);
        assert_eq!(r.status(), &UiStatus::CanUsePreset("Five".to_string()));
    }

    #[test]
    fn test_apply_failure_reverts() {
        let mut r = mounted(base(), &[]);
        r.handle(Event::Edit(Edit::Speed(90)), &[]);
        let (request, _) = push_request(&r.handle(Event::PressPrimary, &[]));
        r.handle(
            Event::PushCompleted {
                request,
                result: Err(RemoteError::Network("500".to_string())),
            },
            &[],
        );
        assert_eq!(r.status(), &UiStatus::NeedsApply);
        assert!(r.has_pending_edits());
        assert_eq!(r.remote(), Some(&base()));
    }

    #[test]
    fn test_edit_during_apply_wins_over_completion() {
        let mut r = mounted(base(), &[]);
        r.handle(Event::Edit(Edit::SparkleSize(5)), &[]);
        let (request, _) = push_request(&r.handle(Event::PressPrimary, &[]));

        r.handle(Event::Edit(Edit::SparkleSize(6)), &[]);
        assert_eq!(r.status(), &UiStatus::Applying);

        let effects = r.handle(
            Event::PushCompleted {
                request,
                result: Ok(()),
            },
            &[],
        );
        assert!(effects.is_empty());
        assert_eq!(r.status(), &UiStatus::NeedsApply);
        assert_eq!(r.config(), &with_size(6));
        assert!(r.has_pending_edits());
    }

    #[test]
    fn test_stale_push_result_is_ignored() {
        let mut r = mounted(base(), &[]);
        r.handle(Event::Edit(Edit::SparkleSize(5)), &[]);
        let (request, _) = push_request(&r.handle(Event::PressPrimary, &[]));
        r.handle(
            Event::PushCompleted {
                request,
                result: Err(RemoteError::Network("timeout".to_string())),
            },
            &[],
        );
        let (second, _) = push_request(&r.handle(Event::PressPrimary, &[]));
        assert_ne!(request, second);

        r.handle(
            Event::PushCompleted {
                request,
                result: Ok(()),
            },
            &[],
        );
        assert_eq!(r.status(), &UiStatus::Applying);
    }

    #[test]
    fn test_hold_cancelled_by_edit() {
        let mut r = mounted(base(), &[]);
        r.handle(Event::Edit(Edit::SparkleSize(5)), &[]);
        let (request, _) = push_request(&r.handle(Event::PressPrimary, &[]));
        let effects = r.handle(
            Event::PushCompleted {
                request,
                result: Ok(()),
            },
            &[],
        );
        r.handle(Event::Edit(Edit::SparkleSize(4)), &[]);
        r.handle(scheduled(&effects), &[]);
        assert_eq!(r.status(), &UiStatus::NeedsApply);
    }

    #[test]
    fn test_save_selects_new_preset() {
        let mut r = mounted(base(), &[]);
        let effects = r.handle(Event::PressPrimary, &[]);
        assert_eq!(
            effects,
            vec![Effect::SavePreset {
                name: None,
                config: base()
            }]
        );
        assert_eq!(r.status(), &UiStatus::Saving);

        let saved = preset(5, "Preset 1", base());
        let presets = [saved.clone()];
        r.handle(Event::PresetSaved(saved), &presets);
        assert_eq!(r.status(), &UiStatus::Saved);
        assert_eq!(r.selected(), Some(5));
        assert_eq!(r.button(&presets).label, "Saved Preset 1");
        assert!(!r.button(&presets).enabled);
    }

    #[test]
    fn test_saved_survives_poll() {
        let mut r = mounted(base(), &[]);
        r.handle(Event::PressPrimary, &[]);
        let saved = preset(5, "Preset 1", base());
        let presets = [saved.clone()];
        r.handle(Event::PresetSaved(saved), &presets);

        let request = fetch_request(&r.handle(Event::TabChanged(Tab::Presets), &presets));
        r.handle(
            Event::FetchCompleted {
                request,
                result: Ok(base()),
            },
            &presets,
        );
        assert_eq!(r.status(), &UiStatus::Saved);

        r.handle(Event::TabChanged(Tab::Colors), &presets);
        let request = fetch_request(&r.handle(Event::TabChanged(Tab::Presets), &presets));
        r.handle(
            Event::FetchCompleted {
                request,
                result: Err(RemoteError::Decode("bad".to_string())),
            },
            &presets,
        );
        assert_eq!(r.status(), &UiStatus::Saved);
    }

    #[test]
    fn test_select_preset_compares_with_device() {
        let presets = [preset(1, "Same", base()), preset(2, "Other", with_size(8))];
        let mut r = mounted(base(), &presets);

        r.handle(Event::SelectPreset(2), &presets);
        assert_eq!(r.config(), &with_size(8));
        assert_eq!(r.status(), &UiStatus::CanUsePreset("Other".to_string()));
        assert_eq!(r.button(&presets).label, "Apply Other");

        r.handle(Event::SelectPreset(1), &presets);
        assert_eq!(r.status(), &UiStatus::UsingPreset("Same".to_string()));
        assert!(r.handle(Event::SelectPreset(77), &presets).is_empty());
    }

    #[test]
    fn test_use_preset_push() {
        let presets = [preset(2, "Other", with_size(8))];
        let mut r = mounted(base(), &presets);
        r.handle(Event::SelectPreset(2), &presets);

        let (request, config) = push_request(&r.handle(Event::PressPrimary, &presets));
        assert_eq!(config, with_size(8));
        r.handle(
            Event::PushCompleted {
                request,
                result: Err(RemoteError::Network("offline".to_string())),
            },
            &presets,
        );
        assert_eq!(r.status(), &UiStatus::CanUsePreset("Other".to_string()));

        let (request, _) = push_request(&r.handle(Event::PressPrimary, &presets));
        r.handle(
            Event::PushCompleted {
                request,
                result: Ok(()),
            },
            &presets,
        );
        assert_eq!(r.status(), &UiStatus::UsingPreset("Other".to_string()));
        assert_eq!(r.remote(), Some(&with_size(8)));
    }

    #[test]
    fn test_poll_matches_device_preset() {
        let presets = [preset(3, "Device", with_size(9))];
        let mut r = mounted(base(), &presets);
        let request = fetch_request(&r.handle(Event::TabChanged(Tab::Presets), &presets));
        let effects = r.handle(
            Event::FetchCompleted {
                request,
                result: Ok(with_size(9)),
            },
            &presets,
        );
        assert_eq!(effects, vec![Effect::RestartSimulation(with_size(9))]);
        assert_eq!(r.selected(), Some(3));
        assert_eq!(r.status(), &UiStatus::UsingPreset("Device".to_string()));
    }

    #[test]
    fn test_poll_keeps_pending_edits() {
        let presets = [preset(3, "Device", with_size(9))];
        let mut r = mounted(base(), &presets);
        r.handle(Event::Edit(Edit::NumSparkles(20)), &presets);
        let request = fetch_request(&r.handle(Event::TabChanged(Tab::Presets), &presets));
        let effects = r.handle(
            Event::FetchCompleted {
                request,
                result: Ok(with_size(9)),
            },
            &presets,
        );
        assert!(effects.is_empty());
        assert_eq!(r.config().num_sparkles, 20);
        assert_eq!(r.selected(), None);
        assert_eq!(r.status(), &UiStatus::NeedsApply);
    }

    #[test]
    fn test_long_press_cancel_keeps_everything() {
        let presets = [preset(1, "Keep", base())];
        let mut r = mounted(base(), &presets);
        let effects = r.handle(Event::LongPressPreset(1), &presets);
        assert_eq!(
            effects,
            vec![Effect::ConfirmDeletion {
                id: 1,
                name: "Keep".to_string()
            }]
        );
        let effects = r.handle(Event::CancelDelete, &presets);
        assert_eq!(effects, vec![Effect::ClearConfirmation]);
        assert_eq!(r.selected(), Some(1));
        assert_eq!(r.pending_delete(), None);
        assert_eq!(r.status(), &UiStatus::UsingPreset("Keep".to_string()));
    }

    #[test]
    fn test_confirm_delete_of_selected_resets() {
        let presets = [preset(1, "Gone", base())];
        let mut r = mounted(base(), &presets);
        r.handle(Event::LongPressPreset(1), &presets);
        let effects = r.handle(Event::ConfirmDelete, &presets);
        assert_eq!(
            effects,
            vec![Effect::ClearConfirmation, Effect::DeletePreset(1)]
        );
        assert_eq!(r.selected(), None);
        assert_eq!(r.status(), &UiStatus::NeedsApply);
    }

    #[test]
    fn test_generate_saves_theme_preset() {
        let mut r = mounted(base(), &[]);
        r.handle(Event::TabChanged(Tab::Presets), &[]);
        // the poll fetch stays in flight; it doesn't block generation
        let button = r.button(&[]);
        assert_eq!(button.action, PrimaryAction::Generate);

        let effects = r.handle(Event::PressPrimary, &[]);
        let request = match effects.as_slice() {
            [Effect::Generate(request)] => *request,
            other => panic!("unexpected effects {:?}", other),
        };
        assert!(r.is_generating());
        assert_eq!(r.button(&[]).label, "Generating...");

        let effects = r.handle(
            Event::GenerateCompleted {
                request,
                result: Ok(GeneratedPreset {
                    theme: "Ocean".to_string(),
                    configuration: with_size(2),
                }),
            },
            &[],
        );
        assert_eq!(
            effects,
            vec![
                Effect::RestartSimulation(with_size(2)),
                Effect::SavePreset {
                    name: Some("Ocean".to_string()),
                    config: with_size(2)
                }
            ]
        );
        let saved = preset(4, "Ocean", with_size(2));
        let presets = [saved.clone()];
        r.handle(Event::PresetSaved(saved), &presets);
        assert!(!r.is_generating());
        assert_eq!(r.selected(), Some(4));
        assert_eq!(r.status(), &UiStatus::CanUsePreset("Ocean".to_string()));
    }

    #[test]
    fn test_generate_failure_only_clears_flag() {
        let mut r = mounted(base(), &[]);
        let request = match r.handle(Event::Generate, &[]).as_slice() {
            [Effect::Generate(request)] => *request,
            other => panic!("unexpected effects {:?}", other),
        };
        r.handle(
            Event::GenerateCompleted {
                request,
                result: Err(RemoteError::Network("down".to_string())),
            },
            &[],
        );
        assert!(!r.is_generating());
        assert_eq!(r.config(), &base());
        assert_eq!(r.status(), &UiStatus::NeedsSave);
    }

    #[test]
    fn test_generate_after_edit_is_kept_but_not_adopted() {
        let mut r = mounted(base(), &[]);
        r.handle(Event::TabChanged(Tab::Presets), &[]);
        let request = match r.handle(Event::PressPrimary, &[]).as_slice() {
            [Effect::Generate(request)] => *request,
            other => panic!("unexpected effects {:?}", other),
        };
        r.handle(Event::TabChanged(Tab::Colors), &[]);
        r.handle(Event::Edit(Edit::SparkleSize(5)), &[]);

        let effects = r.handle(
            Event::GenerateCompleted {
                request,
                result: Ok(GeneratedPreset {
                    theme: "Lagoon".to_string(),
                    configuration: with_size(2),
                }),
            },
            &[],
        );
        assert_eq!(
            effects,
            vec![Effect::SavePreset {
                name: Some("Lagoon".to_string()),
                config: with_size(2)
            }]
        );
        assert_eq!(r.config(), &with_size(5));
        assert!(r.has_pending_edits());

        let saved = preset(7, "Lagoon", with_size(2));
        let presets = [saved.clone()];
        r.handle(Event::PresetSaved(saved), &presets);
        assert_eq!(r.selected(), None);
        assert_eq!(r.config(), &with_size(5));
        assert_eq!(r.status(), &UiStatus::NeedsApply);
        assert!(!r.is_generating());
    }

    #[test]
    fn test_poll_during_preset_push_keeps_selection() {
        let presets = [preset(1, "A", base()), preset(2, "B", with_size(8))];
        let mut r = mounted(base(), &presets);
        r.handle(Event::SelectPreset(2), &presets);
        let (push, _) = push_request(&r.handle(Event::PressPrimary, &presets));

        // The poll reads the device before the push lands
        let fetch = fetch_request(&r.handle(Event::TabChanged(Tab::Presets), &presets));
        let effects = r.handle(
            Event::FetchCompleted {
                request: fetch,
                result: Ok(base()),
            },
            &presets,
        );
        assert!(effects.is_empty());
        assert_eq!(r.selected(), Some(2));
        assert_eq!(r.config(), &with_size(8));
        assert_eq!(r.status(), &UiStatus::Applying);

        r.handle(
            Event::PushCompleted {
                request: push,
                result: Ok(()),
            },
            &presets,
        );
        assert_eq!(r.status(), &UiStatus::UsingPreset("B".to_string()));
        assert_eq!(r.selected(), Some(2));
        assert_eq!(r.config(), &with_size(8));
        assert_eq!(r.remote(), Some(&with_size(8)));
    }

    #[test]
    fn test_poll_during_applied_hold_waits_for_hold() {
        let mut r = mounted(base(), &[]);
        r.handle(Event::Edit(Edit::SparkleSize(5)), &[]);
        let (push, _) = push_request(&r.handle(Event::PressPrimary, &[]));
        let hold = scheduled(&r.handle(
            Event::PushCompleted {
                request: push,
                result: Ok(()),
            },
            &[],
        ));

        let fetch = fetch_request(&r.handle(Event::TabChanged(Tab::Presets), &[]));
        r.handle(
            Event::FetchCompleted {
                request: fetch,
                result: Ok(with_size(5)),
            },
            &[],
        );
        assert_eq!(r.status(), &UiStatus::Applied);

        r.handle(hold, &[]);
        assert_eq!(r.status(), &UiStatus::NeedsSave);
    }

    #[test]
    fn test_button_disabled_states() {
        let mut r = Reconciler::new(base(), true, HOLD);
        r.handle(Event::Mount, &[]);
        assert_eq!(r.button(&[]), ButtonState::disabled("Loading..."));
        assert!(r.handle(Event::PressPrimary, &[]).is_empty());
    }

    #[test]
    fn test_tab_cycle() {
        assert_eq!(Tab::Colors.next(), Tab::Values);
        assert_eq!(Tab::Presets.next(), Tab::Colors);
        assert_eq!(Tab::Colors.prev(), Tab::Presets);
    }
}
