//! Pointer gesture state machine.
//!
//! One gesture session runs from pointer-down to pointer-up and is exactly
//! one of: panning (which may turn out to be a click), dragging a marker,
//! or dragging the compare divider. The machine knows nothing about the
//! workspace; it turns input plus "what was under the pointer" into
//! [`GestureAction`]s the controller applies.
//!
//! | State | Entered on | Pointer-move | Pointer-up |
//! |-------|------------|--------------|------------|
//! | Idle | - | hover | - |
//! | Panning | down on empty canvas | pan once past threshold | click if never moved |
//! | DraggingMarker | down on a marker handle | move marker | end drag |
//! | DraggingSlider | down on the divider (compare mode) | move split | end drag |

use crate::input::InputEvent;
use mc_core::{Id, Point, Vec2};
use smallvec::{SmallVec, smallvec};

/// What the pointer-down landed on, as determined by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressTarget {
    /// Empty canvas; starts a pan/click gesture.
    Canvas,
    /// A marker's drag handle.
    Marker(Id),
    /// The compare divider handle.
    Slider,
    /// Nothing interactive (e.g. compare mode away from the divider).
    Inert,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    Panning {
        down: Point,
        last: Point,
        moved: bool,
    },
    DraggingMarker {
        id: Id,
    },
    DraggingSlider,
}

/// Effects of one input event on the gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    /// Translate the viewport by this many container pixels.
    Pan(Vec2),
    /// A press released without passing the pan threshold.
    Click(Point),
    BeginMarkerDrag(Id),
    MoveMarker { id: Id, at: Point },
    EndMarkerDrag(Id),
    BeginSliderDrag,
    MoveSlider(Point),
    EndSliderDrag,
    /// Pointer moved outside any gesture; resolve hover.
    Hover(Point),
}

pub type Actions = SmallVec<[GestureAction; 2]>;

#[derive(Debug, Clone)]
pub struct GestureMachine {
    state: Gesture,
    /// Displacement (container px, either axis) beyond which a press pans.
    threshold: f64,
}

impl GestureMachine {
    pub fn new(threshold: f64) -> Self {
        Self {
            state: Gesture::Idle,
            threshold,
        }
    }

    pub fn state(&self) -> Gesture {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, Gesture::Idle)
    }

    fn past_threshold(&self, down: Point, p: Point) -> bool {
        let d = p - down;
        d.x.abs() > self.threshold || d.y.abs() > self.threshold
    }

    /// Handle a pointer event. `target` is only consulted on pointer-down.
    pub fn handle(&mut self, event: &InputEvent, target: PressTarget) -> Actions {
        match *event {
            InputEvent::PointerDown { x, y, .. } => {
                let p = Point::new(x, y);
                // A stray down while a session is open (lost pointer-up)
                // closes the old session first.
                let mut actions = self.cancel();
                match target {
                    PressTarget::Canvas => {
                        self.state = Gesture::Panning {
                            down: p,
                            last: p,
                            moved: false,
                        };
                    }
                    PressTarget::Marker(id) => {
                        self.state = Gesture::DraggingMarker { id };
                        actions.push(GestureAction::BeginMarkerDrag(id));
                    }
                    PressTarget::Slider => {
                        self.state = Gesture::DraggingSlider;
                        actions.push(GestureAction::BeginSliderDrag);
                    }
                    PressTarget::Inert => {}
                }
                actions
            }
            InputEvent::PointerMove { x, y, .. } => {
                let p = Point::new(x, y);
                let threshold = self.threshold;
                match &mut self.state {
                    Gesture::Idle => smallvec![GestureAction::Hover(p)],
                    Gesture::Panning { down, last, moved } => {
                        if !*moved {
                            let d = p - *down;
                            if d.x.abs() > threshold || d.y.abs() > threshold {
                                *moved = true;
                            }
                        }
                        if *moved {
                            let delta = p - *last;
                            *last = p;
                            smallvec![GestureAction::Pan(delta)]
                        } else {
                            SmallVec::new()
                        }
                    }
                    Gesture::DraggingMarker { id } => {
                        smallvec![GestureAction::MoveMarker { id: *id, at: p }]
                    }
                    Gesture::DraggingSlider => smallvec![GestureAction::MoveSlider(p)],
                }
            }
            InputEvent::PointerUp { x, y, .. } => {
                let p = Point::new(x, y);
                let actions = match self.state {
                    // The release point counts too: a down/up pair with no
                    // move in between can still be a drag.
                    Gesture::Panning {
                        moved: false, down, ..
                    } if !self.past_threshold(down, p) => smallvec![GestureAction::Click(p)],
                    Gesture::Panning { .. } | Gesture::Idle => SmallVec::new(),
                    Gesture::DraggingMarker { id } => smallvec![GestureAction::EndMarkerDrag(id)],
                    Gesture::DraggingSlider => smallvec![GestureAction::EndSliderDrag],
                };
                self.state = Gesture::Idle;
                actions
            }
            InputEvent::PointerLeave => self.cancel(),
            _ => SmallVec::new(),
        }
    }

    /// Abort the current session without a click. Open drags are closed.
    pub fn cancel(&mut self) -> Actions {
        let actions = match self.state {
            Gesture::DraggingMarker { id } => smallvec![GestureAction::EndMarkerDrag(id)],
            Gesture::DraggingSlider => smallvec![GestureAction::EndSliderDrag],
            Gesture::Idle | Gesture::Panning { .. } => SmallVec::new(),
        };
        self.state = Gesture::Idle;
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> GestureMachine {
        GestureMachine::new(5.0)
    }

    #[test]
    fn small_wiggle_is_a_click() {
        let mut g = machine();
        assert!(g.handle(&InputEvent::pointer_down(100.0, 100.0), PressTarget::Canvas).is_empty());
        assert!(g.handle(&InputEvent::pointer_move(104.0, 97.0), PressTarget::Canvas).is_empty());
        assert!(g.handle(&InputEvent::pointer_move(105.0, 105.0), PressTarget::Canvas).is_empty());
        let actions = g.handle(&InputEvent::pointer_up(105.0, 105.0), PressTarget::Canvas);
        assert_eq!(actions.as_slice(), &[GestureAction::Click(Point::new(105.0, 105.0))]);
        assert!(g.is_idle());
    }

    #[test]
    fn crossing_threshold_pans_by_full_delta() {
        let mut g = machine();
        g.handle(&InputEvent::pointer_down(100.0, 100.0), PressTarget::Canvas);
        let a = g.handle(&InputEvent::pointer_move(103.0, 100.0), PressTarget::Canvas);
        assert!(a.is_empty());
        let a = g.handle(&InputEvent::pointer_move(106.0, 101.0), PressTarget::Canvas);
        assert_eq!(a.as_slice(), &[GestureAction::Pan(Vec2::new(6.0, 1.0))]);
        let a = g.handle(&InputEvent::pointer_move(110.0, 90.0), PressTarget::Canvas);
        assert_eq!(a.as_slice(), &[GestureAction::Pan(Vec2::new(4.0, -11.0))]);
        let a = g.handle(&InputEvent::pointer_up(110.0, 90.0), PressTarget::Canvas);
        assert!(a.is_empty(), "a pan never clicks");
    }

    #[test]
    fn release_past_threshold_is_not_a_click() {
        let mut g = machine();
        g.handle(&InputEvent::pointer_down(0.0, 0.0), PressTarget::Canvas);
        let a = g.handle(&InputEvent::pointer_up(50.0, 0.0), PressTarget::Canvas);
        assert!(a.is_empty());
        assert!(g.is_idle());

        g.handle(&InputEvent::pointer_down(0.0, 0.0), PressTarget::Canvas);
        let a = g.handle(&InputEvent::pointer_up(5.0, -5.0), PressTarget::Canvas);
        assert_eq!(a.as_slice(), &[GestureAction::Click(Point::new(5.0, -5.0))]);
    }

    #[test]
    fn once_moved_returning_home_still_pans() {
        let mut g = machine();
        g.handle(&InputEvent::pointer_down(0.0, 0.0), PressTarget::Canvas);
        g.handle(&InputEvent::pointer_move(0.0, 20.0), PressTarget::Canvas);
        g.handle(&InputEvent::pointer_move(0.0, 0.0), PressTarget::Canvas);
        let a = g.handle(&InputEvent::pointer_up(0.0, 0.0), PressTarget::Canvas);
        assert!(a.is_empty());
    }

    #[test]
    fn marker_drag_session() {
        let mut g = machine();
        let id = Id::intern("edit_drag");
        let a = g.handle(&InputEvent::pointer_down(10.0, 10.0), PressTarget::Marker(id));
        assert_eq!(a.as_slice(), &[GestureAction::BeginMarkerDrag(id)]);
        // Even tiny moves drag a marker; there is no threshold.
        let a = g.handle(&InputEvent::pointer_move(11.0, 10.0), PressTarget::Canvas);
        assert_eq!(
            a.as_slice(),
            &[GestureAction::MoveMarker {
                id,
                at: Point::new(11.0, 10.0)
            }]
        );
        let a = g.handle(&InputEvent::pointer_up(11.0, 10.0), PressTarget::Canvas);
        assert_eq!(a.as_slice(), &[GestureAction::EndMarkerDrag(id)]);
        let a = g.handle(&InputEvent::pointer_move(50.0, 50.0), PressTarget::Canvas);
        assert_eq!(a.as_slice(), &[GestureAction::Hover(Point::new(50.0, 50.0))]);
    }

    #[test]
    fn slider_drag_session() {
        let mut g = machine();
        let a = g.handle(&InputEvent::pointer_down(400.0, 10.0), PressTarget::Slider);
        assert_eq!(a.as_slice(), &[GestureAction::BeginSliderDrag]);
        let a = g.handle(&InputEvent::pointer_move(420.0, 300.0), PressTarget::Canvas);
        assert_eq!(a.as_slice(), &[GestureAction::MoveSlider(Point::new(420.0, 300.0))]);
        let a = g.handle(&InputEvent::PointerLeave, PressTarget::Canvas);
        assert_eq!(a.as_slice(), &[GestureAction::EndSliderDrag]);
    }

    #[test]
    fn inert_press_does_nothing() {
        let mut g = machine();
        assert!(g.handle(&InputEvent::pointer_down(1.0, 1.0), PressTarget::Inert).is_empty());
        assert!(g.handle(&InputEvent::pointer_up(1.0, 1.0), PressTarget::Inert).is_empty());
    }

    #[test]
    fn leave_cancels_pending_click() {
        let mut g = machine();
        g.handle(&InputEvent::pointer_down(1.0, 1.0), PressTarget::Canvas);
        assert!(g.handle(&InputEvent::PointerLeave, PressTarget::Canvas).is_empty());
        assert!(g.handle(&InputEvent::pointer_up(1.0, 1.0), PressTarget::Canvas).is_empty());
    }
}
