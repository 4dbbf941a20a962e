// Commands returned to the JS shim. The engine never touches the DOM or the media element
// itself; the shim applies these in order.

use serde::{Deserialize, Serialize};

use crate::events::PlayerEvent;
use crate::hotspot::HotspotPlacement;
use crate::layer::HotspotDescriptor;

/// Side effect for the host to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerCommand {
    /// Add the visibility class to a server-rendered layer element. `allow_skip` tells the
    /// shim whether to render the skip control.
    ShowLayer { dom_id: String, allow_skip: bool },
    HideLayer { dom_id: String },
    Pause,
    Play,
    DisableControls,
    EnableControls,
    /// Build hotspot child nodes inside a layer. Issued once per layer per session.
    CreateHotspots {
        dom_id: String,
        layer_id: String,
        hotspots: Vec<HotspotDescriptor>,
    },
    PositionHotspots {
        dom_id: String,
        placements: Vec<HotspotPlacement>,
    },
    OpenLink { url: String },
    /// Remove every listener and observer attached for this player.
    Detach { player_id: String },
}

/// Everything one signal produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub commands: Vec<PlayerCommand>,
    pub events: Vec<PlayerEvent>,
}

impl Reaction {
    pub fn new() -> Self {
        Reaction::default()
    }

    pub fn push(&mut self, command: PlayerCommand) {
        self.commands.push(command);
    }

    pub fn extend<I: IntoIterator<Item = PlayerCommand>>(&mut self, commands: I) {
        self.commands.extend(commands);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.events.is_empty()
    }

    pub fn has_command(&self, command: &PlayerCommand) -> bool {
        self.commands.contains(command)
    }
}
