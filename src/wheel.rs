//! Click-wheel input decoding.
//!
//! Pointer clicks resolve to one of five zones, while scroll deltas and touch
//! drags resolve to discrete rotation steps. Coordinates are screen-space with
//! `y` growing downward, so an angle of 90 degrees points at the bottom zone.

use crate::config::WheelSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelZone {
    Top,
    Right,
    Bottom,
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    Counterclockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelInput {
    /// The menu button hit-region, layered above the wheel.
    Menu,
    Click(WheelZone),
    Rotate(Rotation),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl HitRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelGeometry {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    pub center_button_radius: f64,
    pub menu_button: HitRect,
}

impl WheelGeometry {
    /// A wheel with the menu button occupying the top band of its bounding box.
    pub fn centered(center_x: f64, center_y: f64, radius: f64) -> Self {
        let band = radius * 0.45;
        Self {
            center_x,
            center_y,
            radius,
            center_button_radius: radius * 0.35,
            menu_button: HitRect {
                x: center_x - band,
                y: center_y - radius,
                width: band * 2.0,
                height: radius - band,
            },
        }
    }

    pub fn angle_of(&self, x: f64, y: f64) -> f64 {
        angle_degrees(x - self.center_x, y - self.center_y)
    }

    fn distance(&self, x: f64, y: f64) -> f64 {
        (x - self.center_x).hypot(y - self.center_y)
    }
}

pub fn angle_degrees(dx: f64, dy: f64) -> f64 {
    dy.atan2(dx).to_degrees()
}

/// Right is `[-45, 45)`, bottom `[45, 135)`, left `[135, 180] ∪ [-180, -135)`,
/// and top is what remains, `[-135, -45)`.
pub fn zone_for_angle(angle: f64) -> WheelZone {
    if (-45.0..45.0).contains(&angle) {
        WheelZone::Right
    } else if (45.0..135.0).contains(&angle) {
        WheelZone::Bottom
    } else if angle >= 135.0 || angle < -135.0 {
        WheelZone::Left
    } else {
        WheelZone::Top
    }
}

/// Signed shortest rotation from `previous` to `current`, in `[-180, 180]`.
pub fn shortest_delta(previous: f64, current: f64) -> f64 {
    let mut delta = current - previous;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    delta
}

/// Coalesces high-resolution scroll streams into rotation steps.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollAccumulator {
    threshold: f64,
    accumulated: f64,
}

impl ScrollAccumulator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.max(f64::EPSILON),
            accumulated: 0.0,
        }
    }

    pub fn feed(&mut self, delta: f64) -> Option<Rotation> {
        if delta == 0.0 || !delta.is_finite() {
            return None;
        }
        self.accumulated += delta.abs();
        if self.accumulated < self.threshold {
            return None;
        }
        self.accumulated = 0.0;
        Some(if delta > 0.0 {
            Rotation::Clockwise
        } else {
            Rotation::Counterclockwise
        })
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TouchTracker {
    step_degrees: f64,
    last_angle: Option<f64>,
    accumulated: f64,
}

impl TouchTracker {
    pub fn new(step_degrees: f64) -> Self {
        Self {
            step_degrees: step_degrees.max(f64::EPSILON),
            last_angle: None,
            accumulated: 0.0,
        }
    }

    pub fn start(&mut self, angle: f64) {
        self.last_angle = Some(angle);
        self.accumulated = 0.0;
    }

    pub fn is_tracking(&self) -> bool {
        self.last_angle.is_some()
    }

    /// Emits one rotation per whole step consumed by this sample.
    pub fn update(&mut self, angle: f64) -> Vec<Rotation> {
        let Some(previous) = self.last_angle else {
            return Vec::new();
        };
        self.accumulated += shortest_delta(previous, angle);
        self.last_angle = Some(angle);

        let mut steps = Vec::new();
        while self.accumulated.abs() > self.step_degrees {
            if self.accumulated > 0.0 {
                steps.push(Rotation::Clockwise);
                self.accumulated -= self.step_degrees;
            } else {
                steps.push(Rotation::Counterclockwise);
                self.accumulated += self.step_degrees;
            }
        }
        steps
    }

    pub fn end(&mut self) {
        self.last_angle = None;
        self.accumulated = 0.0;
    }
}

/// Stateful decoder for one wheel instance.
#[derive(Debug, Clone)]
pub struct ClickWheel {
    geometry: WheelGeometry,
    scroll: ScrollAccumulator,
    touch: TouchTracker,
}

impl ClickWheel {
    pub fn new(geometry: WheelGeometry, settings: &WheelSettings) -> Self {
        Self {
            geometry,
            scroll: ScrollAccumulator::new(settings.scroll_threshold),
            touch: TouchTracker::new(settings.rotation_step_degrees),
        }
    }

    pub fn geometry(&self) -> &WheelGeometry {
        &self.geometry
    }

    /// Layout changed; any in-flight gesture is dropped.
    pub fn set_geometry(&mut self, geometry: WheelGeometry) {
        if geometry != self.geometry {
            self.geometry = geometry;
            self.touch.end();
            self.scroll.reset();
        }
    }

    pub fn click(&self, x: f64, y: f64) -> Option<WheelInput> {
        if self.geometry.menu_button.contains(x, y) {
            return Some(WheelInput::Menu);
        }
        let distance = self.geometry.distance(x, y);
        if distance <= self.geometry.center_button_radius {
            return Some(WheelInput::Click(WheelZone::Center));
        }
        if distance > self.geometry.radius {
            return None;
        }
        Some(WheelInput::Click(zone_for_angle(self.geometry.angle_of(x, y))))
    }

    pub fn scroll(&mut self, x: f64, y: f64, delta: f64) -> Option<WheelInput> {
        if self.geometry.menu_button.contains(x, y) {
            return None;
        }
        self.scroll.feed(delta).map(WheelInput::Rotate)
    }

    pub fn touch_start(&mut self, x: f64, y: f64) {
        if self.geometry.menu_button.contains(x, y) {
            self.touch.end();
            return;
        }
        self.touch.start(self.geometry.angle_of(x, y));
    }

    pub fn touch_move(&mut self, x: f64, y: f64) -> Vec<WheelInput> {
        if !self.touch.is_tracking() {
            return Vec::new();
        }
        self.touch
            .update(self.geometry.angle_of(x, y))
            .into_iter()
            .map(WheelInput::Rotate)
            .collect()
    }

    pub fn touch_end(&mut self) {
        self.touch.end();
    }
}
