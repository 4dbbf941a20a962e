// Overlay Scheduler: idempotent visibility reconciliation, run on every position update.
// Every non-dismissed layer is re-evaluated independently against the current position;
// form/CTA/poll layers additionally gate resuming playback while they are up.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::command::PlayerCommand;
use crate::error::PlayerError;
use crate::layer::{layer_dom_id, LayerDescriptor, LayerRegistry};
use crate::time_source::TimeSource;

/// Lets the scheduler ask whether a layer's DOM node exists yet.
pub trait LayerDom {
    fn is_mounted(&self, dom_id: &str) -> bool;
}

/// Every layer element is present.
pub struct AllMounted;

impl LayerDom for AllMounted {
    fn is_mounted(&self, _dom_id: &str) -> bool {
        true
    }
}

/// DOM ids the host could not find this tick.
pub struct UnmountedLayers<'a>(pub &'a [String]);

impl LayerDom for UnmountedLayers<'_> {
    fn is_mounted(&self, dom_id: &str) -> bool {
        !self.0.iter().any(|id| id == dom_id)
    }
}

/// How the viewer closed a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismissal {
    /// The skip affordance; only honored when the layer allows skipping.
    Skip,
    /// "Continue" or a submitted embedded form.
    Continue,
}

/// Per-layer runtime state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRuntimeState {
    pub visible: bool,
    /// Terminal for the session.
    pub dismissed: bool,
    /// Set when the "shown" notification of the current visible episode has fired.
    pub triggered_callback_once: bool,
}

/// Output of one reconciliation pass. Indices point into the registry.
#[derive(Debug, Default, PartialEq)]
pub struct Reconciliation {
    pub commands: Vec<PlayerCommand>,
    /// Layers that went hidden -> visible.
    pub shown: Vec<usize>,
    /// Layers whose one-time "shown" notification fires now.
    pub notify: Vec<usize>,
    /// Layers that went visible -> hidden.
    pub hidden: Vec<usize>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.shown.is_empty() && self.hidden.is_empty()
    }
}

/// Decides layer visibility and the pause/controls side effects that come with it.
#[derive(Debug, Clone)]
pub struct OverlayScheduler {
    player_id: String,
    states: Vec<LayerRuntimeState>,
    controls_disabled: bool,
}

impl OverlayScheduler {
    pub fn new(player_id: impl Into<String>, registry: &LayerRegistry) -> Self {
        OverlayScheduler {
            player_id: player_id.into(),
            states: vec![LayerRuntimeState::default(); registry.len()],
            controls_disabled: false,
        }
    }

    pub fn state(&self, index: usize) -> Option<&LayerRuntimeState> {
        self.states.get(index)
    }

    pub fn states(&self) -> &[LayerRuntimeState] {
        &self.states
    }

    pub fn controls_disabled(&self) -> bool {
        self.controls_disabled
    }

    pub fn dom_id(&self, layer: &LayerDescriptor) -> String {
        layer_dom_id(&self.player_id, &layer.id)
    }

    /// Indices of currently visible layers.
    pub fn visible(&self) -> impl Iterator<Item = usize> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.visible)
            .map(|(i, _)| i)
    }

    /// Bring every layer's visibility in line with the current position.
    /// Calling it twice with the same position produces nothing the second time.
    pub fn reconcile<T, D>(&mut self, registry: &LayerRegistry, time: &T, dom: &D) -> Reconciliation
    where
        T: TimeSource + ?Sized,
        D: LayerDom + ?Sized,
    {
        let mut out = Reconciliation::default();
        let mut gate_layer_hidden = false;

        for (index, layer) in registry.all().iter().enumerate() {
            let Some(state) = self.states.get(index).copied() else {
                continue;
            };
            if state.dismissed {
                continue;
            }

            let dom_id = layer_dom_id(&self.player_id, &layer.id);
            if !dom.is_mounted(&dom_id) {
                debug!(layer = %layer.id, "layer element not mounted, retrying next tick");
                continue;
            }

            let should_be_visible = layer.is_active_at(time);

            if should_be_visible && !state.visible {
                self.states[index].visible = true;
                out.commands.push(PlayerCommand::ShowLayer {
                    dom_id,
                    allow_skip: layer.allow_skip,
                });

                if layer.pause_on_show {
                    out.commands.push(PlayerCommand::Pause);
                    if layer.layer_type().gates_playback() && !self.controls_disabled {
                        self.controls_disabled = true;
                        out.commands.push(PlayerCommand::DisableControls);
                    }
                }

                if !state.triggered_callback_once {
                    self.states[index].triggered_callback_once = true;
                    out.notify.push(index);
                }
                out.shown.push(index);
            } else if !should_be_visible && state.visible {
                self.states[index].visible = false;
                self.states[index].triggered_callback_once = false;
                out.commands.push(PlayerCommand::HideLayer { dom_id });
                out.hidden.push(index);
                gate_layer_hidden |= layer.layer_type().gates_playback();
            }
        }

        if gate_layer_hidden {
            self.restore_controls_if_ungated(registry, &mut out.commands);
        }

        out
    }

    /// True while any form/CTA/poll layer is visible.
    pub fn gate_active(&self, registry: &LayerRegistry) -> bool {
        registry
            .all()
            .iter()
            .zip(self.states.iter())
            .any(|(layer, state)| state.visible && layer.layer_type().gates_playback())
    }

    /// Command that must answer a play attempt, if playback is gated.
    pub fn play_gate(&self, registry: &LayerRegistry) -> Option<PlayerCommand> {
        if self.gate_active(registry) {
            debug!("play refused while a blocking layer is visible");
            Some(PlayerCommand::Pause)
        } else {
            None
        }
    }

    /// Handle a user "play" request.
    pub fn request_play(&self, registry: &LayerRegistry) -> PlayerCommand {
        self.play_gate(registry).unwrap_or(PlayerCommand::Play)
    }

    /// Skip/continue on a visible layer. Terminal for the session: the layer never shows
    /// again. `Ok(None)` means nothing changed (already dismissed, not visible, or a skip
    /// on a layer that does not offer one).
    pub fn dismiss(
        &mut self,
        registry: &LayerRegistry,
        layer_id: &str,
        how: Dismissal,
    ) -> Result<Option<Vec<PlayerCommand>>, PlayerError> {
        let index = registry
            .position(layer_id)
            .ok_or_else(|| PlayerError::UnknownLayer(layer_id.to_string()))?;
        let state = self.states[index];
        if state.dismissed {
            return Ok(None);
        }
        if !state.visible {
            debug!(layer = %layer_id, "dismiss on hidden layer ignored");
            return Ok(None);
        }
        let skippable = registry.get(index).is_some_and(|layer| layer.allow_skip);
        if how == Dismissal::Skip && !skippable {
            warn!(layer = %layer_id, "skip refused, layer does not allow skipping");
            return Ok(None);
        }

        self.states[index] = LayerRuntimeState {
            visible: false,
            dismissed: true,
            triggered_callback_once: false,
        };

        let mut commands = vec![PlayerCommand::HideLayer {
            dom_id: layer_dom_id(&self.player_id, layer_id),
        }];
        self.restore_controls_if_ungated(registry, &mut commands);
        if !self.gate_active(registry) {
            commands.push(PlayerCommand::Play);
        }

        Ok(Some(commands))
    }

    /// Start a new viewing session: everything hidden, nothing dismissed.
    /// Returns the commands that bring the DOM back to that state.
    pub fn reset(&mut self, registry: &LayerRegistry) -> Vec<PlayerCommand> {
        let mut commands: Vec<PlayerCommand> = registry
            .all()
            .iter()
            .zip(self.states.iter())
            .filter(|(_, state)| state.visible)
            .map(|(layer, _)| PlayerCommand::HideLayer {
                dom_id: layer_dom_id(&self.player_id, &layer.id),
            })
            .collect();
        if self.controls_disabled {
            commands.push(PlayerCommand::EnableControls);
        }

        self.states = vec![LayerRuntimeState::default(); registry.len()];
        self.controls_disabled = false;
        commands
    }

    fn restore_controls_if_ungated(
        &mut self,
        registry: &LayerRegistry,
        commands: &mut Vec<PlayerCommand>,
    ) {
        if self.controls_disabled && !self.gate_active(registry) {
            self.controls_disabled = false;
            commands.push(PlayerCommand::EnableControls);
        }
    }
}
