use egui::{Context, InputState, Key, PointerButton, Pos2, Rect, Vec2};

/// Represents the location where an input event occurred
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputLocation {
    /// Position relative to the canvas top-left, in device pixels
    pub position: Vec2,
    /// Whether this position is within the canvas bounds
    pub is_in_canvas: bool,
}

/// Input the canvas reacts to, already converted to viewport pixels
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Mouse button was pressed
    PointerDown {
        location: InputLocation,
        button: PointerButton,
    },
    /// Mouse button was released
    PointerUp {
        location: InputLocation,
        button: PointerButton,
    },
    /// Mouse moved (with or without buttons pressed)
    PointerMove {
        location: InputLocation,
        /// Buttons that are currently held down
        held_buttons: Vec<PointerButton>,
    },
    /// Pointer left the canvas or the window
    PointerLeave,
    /// Wheel scrolled over the canvas. Positive is away from the user.
    Scroll { location: InputLocation, delta: f32 },
    /// Middle-button drag, in device pixels
    Pan { delta: Vec2 },
    KeyDown { key: Key },
}

impl InputEvent {
    /// Helper to check if an input event occurred within the canvas
    pub fn is_in_canvas(&self) -> bool {
        match self {
            InputEvent::PointerDown { location, .. }
            | InputEvent::PointerUp { location, .. }
            | InputEvent::PointerMove { location, .. }
            | InputEvent::Scroll { location, .. } => location.is_in_canvas,
            InputEvent::Pan { .. } => true,
            InputEvent::PointerLeave | InputEvent::KeyDown { .. } => false,
        }
    }
}

const BUTTONS: [PointerButton; 3] = [PointerButton::Primary, PointerButton::Secondary, PointerButton::Middle];

/// Keys forwarded to the canvas
const KEYS: [Key; 1] = [Key::Escape];

/// Handles converting raw egui input into canvas [`InputEvent`]s
#[derive(Debug)]
pub struct InputHandler {
    last_pointer_pos: Option<Pos2>,
    canvas_rect: Rect,
    pixels_per_point: f32,
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            last_pointer_pos: None,
            canvas_rect: Rect::NOTHING,
            pixels_per_point: 1.0,
        }
    }

    /// Update the canvas rectangle, in points, and the display scale
    pub fn set_canvas_rect(&mut self, rect: Rect, pixels_per_point: f32) {
        self.canvas_rect = rect;
        self.pixels_per_point = pixels_per_point;
    }

    pub fn canvas_rect(&self) -> Rect {
        self.canvas_rect
    }

    fn make_location(&self, pos: Pos2) -> InputLocation {
        InputLocation {
            position: (pos - self.canvas_rect.min) * self.pixels_per_point,
            is_in_canvas: self.canvas_rect.contains(pos),
        }
    }

    /// Process raw egui input and generate canvas events
    pub fn process_input(&mut self, ctx: &Context) -> Vec<InputEvent> {
        ctx.input(|input| self.process(input))
    }

    fn process(&mut self, input: &InputState) -> Vec<InputEvent> {
        let mut events = Vec::new();

        match input.pointer.hover_pos() {
            Some(pos) => {
                let location = self.make_location(pos);
                if Some(pos) != self.last_pointer_pos {
                    if let Some(last) = self.last_pointer_pos {
                        if input.pointer.button_down(PointerButton::Middle) {
                            events.push(InputEvent::Pan {
                                delta: (pos - last) * self.pixels_per_point,
                            });
                        }
                    }

                    let was_inside = self.last_pointer_pos.is_some_and(|last| self.canvas_rect.contains(last));
                    if location.is_in_canvas {
                        let held_buttons = BUTTONS
                            .into_iter()
                            .filter(|button| input.pointer.button_down(*button))
                            .collect();
                        events.push(InputEvent::PointerMove { location, held_buttons });
                    } else if was_inside {
                        events.push(InputEvent::PointerLeave);
                    }
                }
                self.last_pointer_pos = Some(pos);

                for button in BUTTONS {
                    if input.pointer.button_pressed(button) {
                        events.push(InputEvent::PointerDown { location, button });
                    }
                    if input.pointer.button_released(button) {
                        events.push(InputEvent::PointerUp { location, button });
                    }
                }

                let scroll = input.smooth_scroll_delta.y;
                if scroll != 0.0 && location.is_in_canvas {
                    events.push(InputEvent::Scroll { location, delta: scroll });
                }
            }
            None => {
                if self.last_pointer_pos.take().is_some() {
                    events.push(InputEvent::PointerLeave);
                }
            }
        }

        for key in KEYS {
            if input.key_pressed(key) {
                events.push(InputEvent::KeyDown { key });
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2, Event, RawInput};

    fn run(ctx: &Context, handler: &mut InputHandler, events: Vec<Event>) -> Vec<InputEvent> {
        let mut out = Vec::new();
        let raw = RawInput {
            events,
            ..Default::default()
        };
        let _ = ctx.run(raw, |ctx| out = handler.process_input(ctx));
        out
    }

    #[test]
    fn test_motion_is_relative_to_canvas() {
        let ctx = Context::default();
        let mut handler = InputHandler::new();
        handler.set_canvas_rect(Rect::from_min_size(pos2(100.0, 50.0), vec2(200.0, 200.0)), 2.0);

        let events = run(&ctx, &mut handler, vec![Event::PointerMoved(pos2(110.0, 60.0))]);
        assert_eq!(
            events,
            vec![InputEvent::PointerMove {
                location: InputLocation {
                    position: vec2(20.0, 20.0),
                    is_in_canvas: true,
                },
                held_buttons: Vec::new(),
            }]
        );
    }

    #[test]
    fn test_leaving_canvas_emits_leave() {
        let ctx = Context::default();
        let mut handler = InputHandler::new();
        handler.set_canvas_rect(Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0)), 1.0);

        run(&ctx, &mut handler, vec![Event::PointerMoved(pos2(10.0, 10.0))]);
        let events = run(&ctx, &mut handler, vec![Event::PointerMoved(pos2(150.0, 10.0))]);
        assert_eq!(events, vec![InputEvent::PointerLeave]);

        let events = run(&ctx, &mut handler, vec![Event::PointerGone]);
        assert_eq!(events, vec![InputEvent::PointerLeave]);
    }
}
