//! Device state and input descriptors.
//!
//! Raw device events (key presses, pointer moves, gamepad polls) are written
//! into the *raw* layer of an [`InputState`] as they arrive. Once per tick
//! [`InputState::step`] promotes `current` to `previous` and copies `raw` into
//! `current`. Every read goes through `current`/`previous`, so all reads
//! within one tick agree regardless of when events arrived.
//!
//! [`Button`], [`Axis`] and [`HalfAxis`] are *descriptors*: plain data that
//! names which device inputs to look at. They hold no state of their own and
//! are evaluated against an `InputState`. Because they are data they can be
//! loaded from configuration (see [`Bindings`]).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Default threshold at which an analog input counts as a press.
pub const DEFAULT_PRESS_THRESHOLD: f64 = 0.5;

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Mouse buttons, numbered as in DOM `MouseEvent.button`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Back,
    Forward,
}

impl MouseButton {
    pub const ALL: [MouseButton; 5] = [
        MouseButton::Left,
        MouseButton::Middle,
        MouseButton::Right,
        MouseButton::Back,
        MouseButton::Forward,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Keys currently held, by DOM `KeyboardEvent.code` (`"Space"`, `"KeyW"`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyboardDevice {
    down: BTreeSet<String>,
}

impl KeyboardDevice {
    pub fn is_down(&self, code: &str) -> bool {
        self.down.contains(code)
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = &str> {
        self.down.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MouseDevice {
    buttons: [bool; 5],
    /// Pointer position in world coordinates.
    pub position: Vec2,
    /// Wheel movement accumulated during the tick.
    pub wheel: Vec2,
}

impl MouseDevice {
    pub fn is_down(&self, button: MouseButton) -> bool {
        self.buttons[button.index()]
    }
}

/// One gamepad slot. Buttons are analog in `[0, 1]`, axes in `[-1, 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadDevice {
    pub connected: bool,
    buttons: Vec<f64>,
    axes: Vec<f64>,
}

impl GamepadDevice {
    /// Button value, `0.0` when absent or disconnected.
    pub fn button(&self, index: usize) -> f64 {
        if !self.connected {
            return 0.0;
        }
        self.buttons.get(index).copied().unwrap_or(0.0)
    }

    /// Axis value, `0.0` when absent or disconnected.
    pub fn axis(&self, index: usize) -> f64 {
        if !self.connected {
            return 0.0;
        }
        self.axes.get(index).copied().unwrap_or(0.0)
    }
}

/// A complete copy of every device, as seen at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSnapshot {
    pub keyboard: KeyboardDevice,
    pub mouse: MouseDevice,
    pub gamepads: Vec<GamepadDevice>,
}

impl DeviceSnapshot {
    pub fn gamepad(&self, pad: usize) -> Option<&GamepadDevice> {
        self.gamepads.get(pad)
    }
}

// ---------------------------------------------------------------------------
// InputState
// ---------------------------------------------------------------------------

/// Double-buffered device state.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    raw: DeviceSnapshot,
    current: DeviceSnapshot,
    previous: DeviceSnapshot,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Promote `current` to `previous` and the latest raw events to `current`.
    ///
    /// Call exactly once per tick.
    pub fn step(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.raw.clone());
        self.raw.mouse.wheel = Vec2::ZERO;
    }

    pub fn current(&self) -> &DeviceSnapshot {
        &self.current
    }

    pub fn previous(&self) -> &DeviceSnapshot {
        &self.previous
    }

    /// World-space pointer position as of the last step.
    pub fn pointer(&self) -> Vec2 {
        self.current.mouse.position
    }

    // -- raw event entry points -------------------------------------------

    pub fn key_down(&mut self, code: &str) {
        self.raw.keyboard.down.insert(code.to_owned());
    }

    pub fn key_up(&mut self, code: &str) {
        self.raw.keyboard.down.remove(code);
    }

    pub fn button_down(&mut self, button: MouseButton) {
        self.raw.mouse.buttons[button.index()] = true;
    }

    pub fn button_up(&mut self, button: MouseButton) {
        self.raw.mouse.buttons[button.index()] = false;
    }

    /// Move the pointer to a world-space position.
    pub fn move_to(&mut self, position: Vec2) {
        self.raw.mouse.position = position;
    }

    pub fn scroll(&mut self, delta: Vec2) {
        self.raw.mouse.wheel += delta;
    }

    pub fn set_gamepad_connected(&mut self, pad: usize, connected: bool) {
        self.pad_mut(pad).connected = connected;
    }

    /// Write an analog button value, clamped to `[0, 1]`.
    pub fn set_gamepad_button(&mut self, pad: usize, button: usize, value: f64) {
        let device = self.pad_mut(pad);
        if device.buttons.len() <= button {
            device.buttons.resize(button + 1, 0.0);
        }
        device.buttons[button] = value.clamp(0.0, 1.0);
    }

    /// Write an axis value, clamped to `[-1, 1]`.
    pub fn set_axis(&mut self, pad: usize, axis: usize, value: f64) {
        let device = self.pad_mut(pad);
        if device.axes.len() <= axis {
            device.axes.resize(axis + 1, 0.0);
        }
        device.axes[axis] = value.clamp(-1.0, 1.0);
    }

    /// Release every key and mouse button, as when the window loses focus.
    pub fn release_all(&mut self) {
        self.raw.keyboard.down.clear();
        self.raw.mouse.buttons = [false; 5];
    }

    /// Alias of [`release_all`](Self::release_all) for focus loss.
    pub fn blur(&mut self) {
        self.release_all();
    }

    fn pad_mut(&mut self, pad: usize) -> &mut GamepadDevice {
        if self.raw.gamepads.len() <= pad {
            self.raw.gamepads.resize_with(pad + 1, || GamepadDevice {
                connected: true,
                ..GamepadDevice::default()
            });
        }
        &mut self.raw.gamepads[pad]
    }
}

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

/// A digital input descriptor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Button {
    Key {
        code: String,
    },
    Mouse {
        button: MouseButton,
    },
    GamepadButton {
        pad: usize,
        button: usize,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// Down while the half-axis reads at least `threshold`.
    AxisHalf {
        half: Box<HalfAxis>,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// Down while any constituent is down.
    Any {
        buttons: Vec<Button>,
    },
    #[default]
    Never,
}

fn default_threshold() -> f64 {
    DEFAULT_PRESS_THRESHOLD
}

impl Button {
    pub fn key(code: &str) -> Self {
        Self::Key {
            code: code.to_owned(),
        }
    }

    pub fn mouse(button: MouseButton) -> Self {
        Self::Mouse { button }
    }

    pub fn gamepad(pad: usize, button: usize) -> Self {
        Self::GamepadButton {
            pad,
            button,
            threshold: DEFAULT_PRESS_THRESHOLD,
        }
    }

    /// Combine buttons into one that is down when any of them is.
    ///
    /// Nested `Any` buttons are flattened and `Never` is dropped, so merging
    /// repeatedly never builds deep chains. Merging nothing yields `Never`;
    /// merging one button yields that button.
    pub fn merge(buttons: impl IntoIterator<Item = Button>) -> Button {
        let mut flat = Vec::new();
        flatten_into(buttons, &mut flat);
        match flat.len() {
            0 => Button::Never,
            1 => flat.pop().unwrap_or_default(),
            _ => Button::Any { buttons: flat },
        }
    }

    pub fn is_down(&self, input: &InputState) -> bool {
        self.down_in(&input.current)
    }

    pub fn was_down(&self, input: &InputState) -> bool {
        self.down_in(&input.previous)
    }

    /// Went down this tick.
    pub fn is_pressed(&self, input: &InputState) -> bool {
        self.is_down(input) && !self.was_down(input)
    }

    /// Went up this tick.
    pub fn is_released(&self, input: &InputState) -> bool {
        !self.is_down(input) && self.was_down(input)
    }

    /// Evaluate against one snapshot.
    pub fn down_in(&self, snap: &DeviceSnapshot) -> bool {
        match self {
            Button::Key { code } => snap.keyboard.is_down(code),
            Button::Mouse { button } => snap.mouse.is_down(*button),
            Button::GamepadButton {
                pad,
                button,
                threshold,
            } => snap
                .gamepad(*pad)
                .is_some_and(|p| analog_pressed(p.button(*button), *threshold)),
            Button::AxisHalf { half, threshold } => analog_pressed(half.value_in(snap), *threshold),
            Button::Any { buttons } => buttons.iter().any(|b| b.down_in(snap)),
            Button::Never => false,
        }
    }
}

fn flatten_into(buttons: impl IntoIterator<Item = Button>, out: &mut Vec<Button>) {
    for button in buttons {
        match button {
            Button::Any { buttons } => flatten_into(buttons, out),
            Button::Never => {}
            other => out.push(other),
        }
    }
}

fn analog_pressed(value: f64, threshold: f64) -> bool {
    value > 0.0 && value >= threshold
}

// ---------------------------------------------------------------------------
// Axis
// ---------------------------------------------------------------------------

/// An analog input descriptor reading in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Axis {
    /// A gamepad stick axis. `|raw| < deadzone` reads as exactly zero.
    GamepadAxis {
        pad: usize,
        axis: usize,
        #[serde(default)]
        deadzone: f64,
    },
    /// `-1` while `negative` is down, `+1` while `positive` is down, `0` for
    /// both or neither.
    Buttons { negative: Button, positive: Button },
    Inverted { axis: Box<Axis> },
    /// Sum of constituents, clamped to `[-1, 1]`.
    Sum { axes: Vec<Axis> },
}

impl Axis {
    pub fn value(&self, input: &InputState) -> f64 {
        self.value_in(&input.current)
    }

    pub fn previous_value(&self, input: &InputState) -> f64 {
        self.value_in(&input.previous)
    }

    pub fn value_in(&self, snap: &DeviceSnapshot) -> f64 {
        match self {
            Axis::GamepadAxis {
                pad,
                axis,
                deadzone,
            } => {
                let raw = snap.gamepad(*pad).map_or(0.0, |p| p.axis(*axis));
                apply_deadzone(raw, *deadzone).clamp(-1.0, 1.0)
            }
            Axis::Buttons { negative, positive } => {
                let neg = if negative.down_in(snap) { 1.0 } else { 0.0 };
                let pos = if positive.down_in(snap) { 1.0 } else { 0.0 };
                pos - neg
            }
            Axis::Inverted { axis } => -axis.value_in(snap),
            Axis::Sum { axes } => axes
                .iter()
                .map(|a| a.value_in(snap))
                .sum::<f64>()
                .clamp(-1.0, 1.0),
        }
    }

    /// The `[0, 1]` half above zero.
    pub fn positive_half(self) -> HalfAxis {
        HalfAxis::Positive {
            axis: Box::new(self),
        }
    }

    /// The `[0, 1]` half below zero, mirrored.
    pub fn negative_half(self) -> HalfAxis {
        HalfAxis::Negative {
            axis: Box::new(self),
        }
    }

    /// Derive two independent digital buttons from the two halves.
    ///
    /// Returns `(negative, positive)`.
    pub fn split_half_axis_buttons(self, threshold: f64) -> (Button, Button) {
        let negative = self.clone().negative_half().as_button(threshold);
        let positive = self.positive_half().as_button(threshold);
        (negative, positive)
    }
}

fn apply_deadzone(raw: f64, deadzone: f64) -> f64 {
    if raw.abs() < deadzone {
        0.0
    } else {
        raw
    }
}

// ---------------------------------------------------------------------------
// HalfAxis
// ---------------------------------------------------------------------------

/// An analog input descriptor reading in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HalfAxis {
    Positive { axis: Box<Axis> },
    Negative { axis: Box<Axis> },
    /// An analog trigger button.
    GamepadTrigger {
        pad: usize,
        button: usize,
        #[serde(default)]
        deadzone: f64,
    },
    /// `1` while the button is down.
    FromButton { button: Box<Button> },
}

impl HalfAxis {
    pub fn value(&self, input: &InputState) -> f64 {
        self.value_in(&input.current)
    }

    pub fn previous_value(&self, input: &InputState) -> f64 {
        self.value_in(&input.previous)
    }

    pub fn value_in(&self, snap: &DeviceSnapshot) -> f64 {
        match self {
            HalfAxis::Positive { axis } => axis.value_in(snap).max(0.0),
            HalfAxis::Negative { axis } => (-axis.value_in(snap)).max(0.0),
            HalfAxis::GamepadTrigger {
                pad,
                button,
                deadzone,
            } => {
                let raw = snap.gamepad(*pad).map_or(0.0, |p| p.button(*button));
                apply_deadzone(raw, *deadzone).clamp(0.0, 1.0)
            }
            HalfAxis::FromButton { button } => {
                if button.down_in(snap) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// A button that is down while this reads at least `threshold`.
    pub fn as_button(self, threshold: f64) -> Button {
        Button::AxisHalf {
            half: Box::new(self),
            threshold,
        }
    }
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

/// Named game actions mapped to buttons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bindings {
    /// Flap / jump.
    pub jump: Button,
    /// Primary pointer action (editor placement and selection).
    pub pointer: Button,
    /// Switch between play and edit mode.
    pub editor_toggle: Button,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            jump: Button::merge([
                Button::key("Space"),
                Button::key("ArrowUp"),
                Button::key("KeyW"),
                Button::mouse(MouseButton::Left),
                Button::gamepad(0, 0),
            ]),
            pointer: Button::mouse(MouseButton::Left),
            editor_toggle: Button::key("KeyE"),
        }
    }
}

impl Bindings {
    /// Parse bindings from JSON. Missing actions keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> Button {
        Button::key("Space")
    }

    #[test]
    fn edges_over_down_down_up() {
        let mut input = InputState::new();
        let b = space();

        input.key_down("Space");
        input.step();
        assert!(b.is_pressed(&input));
        assert!(!b.is_released(&input));

        input.step();
        assert!(b.is_down(&input));
        assert!(!b.is_pressed(&input));
        assert!(!b.is_released(&input));

        input.key_up("Space");
        input.step();
        assert!(!b.is_pressed(&input));
        assert!(b.is_released(&input));

        input.step();
        assert!(!b.is_pressed(&input));
        assert!(!b.is_released(&input));
    }

    #[test]
    fn reads_are_stable_between_steps() {
        let mut input = InputState::new();
        input.key_down("KeyW");
        assert!(!Button::key("KeyW").is_down(&input));
        input.step();
        input.key_up("KeyW");
        assert!(Button::key("KeyW").is_down(&input));
    }

    #[test]
    fn merge_flattens_and_drops_never() {
        let inner = Button::merge([space(), Button::key("KeyW")]);
        let merged = Button::merge([inner, Button::Never, Button::mouse(MouseButton::Left)]);
        match &merged {
            Button::Any { buttons } => {
                assert_eq!(buttons.len(), 3);
                assert!(buttons.iter().all(|b| !matches!(b, Button::Any { .. })));
            }
            other => panic!("expected Any, got {other:?}"),
        }
        assert_eq!(Button::merge([]), Button::Never);
        assert_eq!(Button::merge([Button::Never, space()]), space());
    }

    #[test]
    fn merged_button_is_down_if_any_is() {
        let mut input = InputState::new();
        let b = Button::merge([space(), Button::mouse(MouseButton::Right)]);
        input.button_down(MouseButton::Right);
        input.step();
        assert!(b.is_pressed(&input));
    }

    #[test]
    fn deadzone_reads_zero() {
        let mut input = InputState::new();
        let axis = Axis::GamepadAxis {
            pad: 0,
            axis: 1,
            deadzone: 0.2,
        };
        input.set_axis(0, 1, 0.15);
        input.step();
        assert_eq!(axis.value(&input), 0.0);
        input.set_axis(0, 1, -0.6);
        input.step();
        assert_eq!(axis.value(&input), -0.6);
        assert_eq!(axis.previous_value(&input), 0.0);
    }

    #[test]
    fn split_half_axis_buttons_are_independent() {
        let mut input = InputState::new();
        let axis = Axis::GamepadAxis {
            pad: 0,
            axis: 0,
            deadzone: 0.1,
        };
        let (left, right) = axis.split_half_axis_buttons(0.5);

        input.set_axis(0, 0, -0.8);
        input.step();
        assert!(left.is_pressed(&input));
        assert!(!right.is_down(&input));

        input.set_axis(0, 0, 0.9);
        input.step();
        assert!(left.is_released(&input));
        assert!(right.is_pressed(&input));
    }

    #[test]
    fn button_axis_and_sum_clamp() {
        let mut input = InputState::new();
        let keys = Axis::Buttons {
            negative: Button::key("ArrowLeft"),
            positive: Button::key("ArrowRight"),
        };
        let sum = Axis::Sum {
            axes: vec![keys.clone(), keys.clone()],
        };
        input.key_down("ArrowRight");
        input.step();
        assert_eq!(keys.value(&input), 1.0);
        assert_eq!(sum.value(&input), 1.0);
        assert_eq!(
            Axis::Inverted {
                axis: Box::new(keys)
            }
            .value(&input),
            -1.0
        );
    }

    #[test]
    fn trigger_and_disconnect() {
        let mut input = InputState::new();
        let trigger = HalfAxis::GamepadTrigger {
            pad: 1,
            button: 7,
            deadzone: 0.05,
        };
        input.set_gamepad_button(1, 7, 0.75);
        input.step();
        assert_eq!(trigger.value(&input), 0.75);

        input.set_gamepad_connected(1, false);
        input.step();
        assert_eq!(trigger.value(&input), 0.0);
    }

    #[test]
    fn release_all_on_blur() {
        let mut input = InputState::new();
        input.key_down("Space");
        input.button_down(MouseButton::Left);
        input.step();
        input.blur();
        input.step();
        assert!(space().is_released(&input));
        assert!(Button::mouse(MouseButton::Left).is_released(&input));
    }

    #[test]
    fn bindings_defaults_and_json() {
        let defaults = Bindings::default();
        let mut input = InputState::new();
        input.key_down("ArrowUp");
        input.step();
        assert!(defaults.jump.is_pressed(&input));

        let custom = Bindings::from_json_str(r#"{ "jump": { "kind": "key", "code": "KeyJ" } }"#)
            .unwrap();
        assert_eq!(custom.jump, Button::key("KeyJ"));
        assert_eq!(custom.pointer, defaults.pointer);
    }
}
