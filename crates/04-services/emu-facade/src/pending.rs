use aesp_wire::payloads::{ConsoleKeysPayload, JoystickPayload, KeyEventPayload};

/// Input staged by the transport layer, latched into effect at the start
/// of the next frame rather than applied immediately. No chip emulation
/// (GTIA/POKEY/PIA registers) exists to receive this state, so "applying"
/// it means making it the frame's current input snapshot, inspectable via
/// [`super::EmuFacade::applied_input`] — the wiring of that snapshot onto
/// real hardware registers is out of scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingInput {
    pub key_events: Vec<(KeyEventPayload, bool)>,
    pub joystick: Vec<JoystickPayload>,
    pub console_keys: Option<ConsoleKeysPayload>,
}

impl PendingInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_key(&mut self, event: KeyEventPayload, down: bool) {
        self.key_events.push((event, down));
    }

    pub fn set_joystick(&mut self, state: JoystickPayload) {
        self.joystick.retain(|j| j.port != state.port);
        self.joystick.push(state);
    }

    pub fn set_console_keys(&mut self, state: ConsoleKeysPayload) {
        self.console_keys = Some(state);
    }

    pub fn is_empty(&self) -> bool {
        self.key_events.is_empty() && self.joystick.is_empty() && self.console_keys.is_none()
    }
}
