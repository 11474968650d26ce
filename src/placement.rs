//! Caption box placement: default layout, pointer drag and edge resize.
//!
//! The box starts centred on a percentage anchor computed from the video's
//! letterboxed geometry. The first pointer move of a drag or resize switches
//! it to absolute pixel offsets. Gestures end when the box unmounts because
//! no caption is active. Any relayout (metadata load, container resize) discards
//! manual placement and starts over from the defaults.

use serde::Serialize;
use tracing::debug;

/// Hard floor for the caption box width, in pixels.
pub const MIN_WIDTH: f64 = 100.0;

/// Share of the rendered video width used by the default caption box.
const DEFAULT_WIDTH_RATIO: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_empty(self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    fn aspect_ratio(self) -> f64 {
        self.width / self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pixel rectangle relative to the container's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A position along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum Offset {
    Percent(f64),
    Px(f64),
}

impl Offset {
    fn to_px(self, extent: f64) -> f64 {
        match self {
            Self::Percent(p) => extent * p / 100.0,
            Self::Px(px) => px,
        }
    }

    /// CSS value, e.g. `92%` or `140px`.
    #[must_use]
    pub fn css(self) -> String {
        match self {
            Self::Percent(p) => format!("{p}%"),
            Self::Px(px) => format!("{px}px"),
        }
    }
}

/// Whether offsets name the box centre or its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    /// Offsets point at the box centre (`translate(-50%, -50%)`).
    Centered,
    /// Offsets are the box's top-left corner in pixels.
    Absolute,
}

impl AnchorMode {
    #[must_use]
    pub fn css_transform(self) -> &'static str {
        match self {
            Self::Centered => "translate(-50%, -50%)",
            Self::Absolute => "none",
        }
    }
}

/// Aspect-ratio class of the source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Portrait,
    Square,
    Landscape,
}

impl AspectClass {
    #[must_use]
    pub fn of(video: Size) -> Self {
        let ar = video.aspect_ratio();
        if ar < 1.0 {
            Self::Portrait
        } else if (ar - 1.0).abs() < f64::EPSILON {
            Self::Square
        } else {
            Self::Landscape
        }
    }

    /// Default vertical anchor, as a percentage of container height.
    #[must_use]
    pub fn default_top_percent(self) -> f64 {
        match self {
            Self::Portrait => 80.0,
            Self::Square => 90.0,
            Self::Landscape => 92.0,
        }
    }
}

/// On-screen geometry of the caption box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub left: Offset,
    pub top: Offset,
    pub width: f64,
    pub anchor: AnchorMode,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            left: Offset::Percent(50.0),
            top: Offset::Percent(AspectClass::Landscape.default_top_percent()),
            width: 0.0,
            anchor: AnchorMode::Centered,
        }
    }
}

impl Placement {
    /// Default placement for a video shown `object-fit: contain` inside the
    /// container. Returns `None` when either size is still unknown.
    #[must_use]
    pub fn initial(video: Size, container: Size) -> Option<Self> {
        if video.is_empty() || container.is_empty() {
            return None;
        }

        let video_ar = video.aspect_ratio();
        let rendered_width = if video_ar < container.aspect_ratio() {
            container.height * video_ar
        } else {
            container.width
        };

        Some(Self {
            left: Offset::Percent(50.0),
            top: Offset::Percent(AspectClass::of(video).default_top_percent()),
            width: rendered_width * DEFAULT_WIDTH_RATIO,
            anchor: AnchorMode::Centered,
        })
    }

    /// Pixel rectangle of the box inside `container`.
    #[must_use]
    pub fn resolve(&self, container: Size, box_height: f64) -> Rect {
        let mut left = self.left.to_px(container.width);
        let mut top = self.top.to_px(container.height);
        if self.anchor == AnchorMode::Centered {
            left -= self.width / 2.0;
            top -= box_height / 2.0;
        }
        Rect {
            left,
            top,
            width: self.width,
            height: box_height,
        }
    }
}

/// Edge grabbed by a resize gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Left,
    Right,
}

/// Gesture state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    Dragging {
        pointer: Point,
        origin: Point,
        box_size: Size,
    },
    Resizing {
        edge: Edge,
        pointer_x: f64,
        width: f64,
        left: f64,
        top: f64,
    },
}

/// Owns the caption box geometry and applies pointer gestures to it.
#[derive(Debug, Clone)]
pub struct PlacementController {
    placement: Placement,
    container: Size,
    gesture: Gesture,
    /// Whether the caption box is on screen.
    mounted: bool,
}

impl Default for PlacementController {
    fn default() -> Self {
        Self {
            placement: Placement::default(),
            container: Size::default(),
            gesture: Gesture::Idle,
            mounted: true,
        }
    }
}

impl PlacementController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn placement(&self) -> Placement {
        self.placement
    }

    #[must_use]
    pub fn container(&self) -> Size {
        self.container
    }

    #[must_use]
    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Track whether the caption box is mounted. Unmounting ends any active
    /// gesture, and pointer-down is ignored until the box mounts again.
    pub fn set_mounted(&mut self, mounted: bool) {
        if self.mounted && !mounted {
            self.end_gesture();
            debug!("caption box unmounted");
        }
        self.mounted = mounted;
    }

    /// Recompute the default layout after metadata load or a container
    /// resize. Ends any active gesture and discards manual placement.
    /// Unknown (zero) sizes leave the current state untouched.
    pub fn relayout(&mut self, video: Size, container: Size) -> bool {
        let Some(placement) = Placement::initial(video, container) else {
            return false;
        };
        self.end_gesture();
        self.container = container;
        self.placement = placement;
        debug!(
            width = placement.width,
            top = %placement.top.css(),
            "caption box reset to default layout"
        );
        true
    }

    /// Pointer-down on the box body. Ignored while a resize is active or
    /// the box is unmounted. The placement itself is untouched until the
    /// first move.
    pub fn begin_drag(&mut self, pointer: Point, box_height: f64) -> bool {
        if !self.mounted || matches!(self.gesture, Gesture::Resizing { .. }) {
            return false;
        }
        let rect = self.placement.resolve(self.container, box_height);
        self.gesture = Gesture::Dragging {
            pointer,
            origin: Point::new(rect.left, rect.top),
            box_size: Size::new(rect.width, rect.height),
        };
        true
    }

    /// Pointer-down on a resize handle. Takes precedence over dragging.
    /// Ignored while the box is unmounted.
    pub fn begin_resize(&mut self, edge: Edge, pointer: Point, box_height: f64) -> bool {
        if !self.mounted {
            return false;
        }
        let rect = self.placement.resolve(self.container, box_height);
        self.gesture = Gesture::Resizing {
            edge,
            pointer_x: pointer.x,
            width: rect.width,
            left: rect.left,
            top: rect.top,
        };
        true
    }

    /// Pointer-move while a gesture is active. No-op when idle.
    ///
    /// Every move writes pixel offsets for both axes, so the first one
    /// switches a centred box to absolute anchoring without a jump.
    pub fn pointer_move(&mut self, pointer: Point) {
        match self.gesture {
            Gesture::Idle => return,
            Gesture::Dragging {
                pointer: start,
                origin,
                box_size,
            } => {
                let max_left = self.container.width - box_size.width;
                let max_top = self.container.height - box_size.height;
                let left = clamp_offset(origin.x + pointer.x - start.x, max_left);
                let top = clamp_offset(origin.y + pointer.y - start.y, max_top);
                self.placement.left = Offset::Px(left);
                self.placement.top = Offset::Px(top);
            }
            Gesture::Resizing {
                edge,
                pointer_x,
                width,
                left,
                top,
            } => {
                let (left, width) =
                    resize(edge, pointer.x - pointer_x, width, left, self.container.width);
                self.placement.left = Offset::Px(left);
                self.placement.top = Offset::Px(top);
                self.placement.width = width;
            }
        }
        self.placement.anchor = AnchorMode::Absolute;
    }

    /// Pointer-up anywhere, or the caption box unmounting.
    pub fn end_gesture(&mut self) {
        if self.gesture != Gesture::Idle {
            debug!("caption gesture ended");
        }
        self.gesture = Gesture::Idle;
    }

    /// Start a drag and return a guard that ends it when dropped.
    pub fn capture_drag(&mut self, pointer: Point, box_height: f64) -> GestureCapture<'_> {
        self.begin_drag(pointer, box_height);
        GestureCapture { controller: self }
    }

    /// Start a resize and return a guard that ends it when dropped.
    pub fn capture_resize(
        &mut self,
        edge: Edge,
        pointer: Point,
        box_height: f64,
    ) -> GestureCapture<'_> {
        self.begin_resize(edge, pointer, box_height);
        GestureCapture { controller: self }
    }
}

/// Scoped input capture for one gesture.
///
/// Holding the guard is equivalent to having move/up listeners attached;
/// dropping it detaches them, on every exit path.
pub struct GestureCapture<'a> {
    controller: &'a mut PlacementController,
}

impl GestureCapture<'_> {
    pub fn pointer_move(&mut self, pointer: Point) {
        self.controller.pointer_move(pointer);
    }

    #[must_use]
    pub fn placement(&self) -> Placement {
        self.controller.placement()
    }

    /// Explicit pointer-up.
    pub fn release(self) {}
}

impl Drop for GestureCapture<'_> {
    fn drop(&mut self) {
        self.controller.end_gesture();
    }
}

/// Clamp to `[0, max]`; a box larger than the container pins to 0.
fn clamp_offset(value: f64, max: f64) -> f64 {
    value.min(max).max(0.0)
}

/// Apply a horizontal resize delta. Returns the new `(left, width)`.
fn resize(edge: Edge, dx: f64, width0: f64, left0: f64, container_width: f64) -> (f64, f64) {
    let (mut left, mut width) = match edge {
        Edge::Right => {
            let mut width = width0 + dx;
            if left0 + width > container_width {
                width = container_width - left0;
            }
            (left0, width)
        }
        Edge::Left => {
            let mut width = width0 - dx;
            let mut left = left0 + dx;
            if left < 0.0 {
                width += left;
                left = 0.0;
            }
            (left, width)
        }
    };

    if width < MIN_WIDTH {
        // Keep the right edge fixed when the left handle hits the floor.
        if edge == Edge::Left {
            left += width - MIN_WIDTH;
        }
        width = MIN_WIDTH;
    }

    (left, width)
}
