//! Surface view transform: pan / zoom / rotation state and the coordinate
//! mapping between viewport space and raster space.
//!
//! The affine transform is `translate → rotate → scale` with the origin at
//! the surface's top-left, matching a CSS
//! `translate(tx, ty) rotate(r) scale(s)` with `transform-origin: 0 0`.

/// Minimum number of CSS pixels of the surface that must stay visible inside
/// the viewport on every axis.
pub const MIN_VISIBLE: f64 = 36.0;

pub const MIN_SCALE: f64 = 1.0;
pub const MAX_SCALE: f64 = 5.0;

/// Scales closer to 1 than this snap to exactly 1 (with recentering), so the
/// "reset" state is always reachable and never drifts to 1.004.
pub const SCALE_SNAP_WINDOW: f64 = 0.02;

/// Rotations closer to 0° than this snap to exactly 0 after a gesture frame.
pub const ROTATION_SNAP_DEG: f64 = 1.0;

/// Wheel zoom factors (in / out) and the rotation step per wheel notch.
pub const WHEEL_ZOOM_IN: f64 = 1.08;
pub const WHEEL_ZOOM_OUT: f64 = 0.92;
pub const WHEEL_ROTATE_STEP_DEG: f64 = 6.0;

/// Margin used when clamping the grid anchor dot into the viewport.
const GRID_ANCHOR_MARGIN: f64 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub tx: f64,
    pub ty: f64,
    pub scale: f64,
    pub rotation_deg: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { tx: 0.0, ty: 0.0, scale: 1.0, rotation_deg: 0.0 }
    }
}

impl ViewTransform {
    pub fn is_identity(&self) -> bool {
        self.tx == 0.0 && self.ty == 0.0 && self.scale == 1.0 && self.rotation_deg == 0.0
    }

    /// Matrix coefficients (a, b, c, d) of `rotate → scale`.
    fn coefficients(&self) -> (f64, f64, f64, f64) {
        let rad = self.rotation_deg.to_radians();
        let (sin, cos) = rad.sin_cos();
        (self.scale * cos, self.scale * sin, -self.scale * sin, self.scale * cos)
    }

    /// Map a surface-local point into viewport space.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let (a, b, c, d) = self.coefficients();
        (self.tx + a * x + c * y, self.ty + b * x + d * y)
    }

    /// Map a viewport point back into surface-local space (matrix inverse).
    pub fn invert(&self, view_x: f64, view_y: f64) -> (f64, f64) {
        let (a, b, c, d) = self.coefficients();
        let det = {
            let det = a * d - b * c;
            if det == 0.0 { 1.0 } else { det }
        };
        let dx = view_x - self.tx;
        let dy = view_y - self.ty;
        ((dx * d - dy * c) / det, (-dx * b + dy * a) / det)
    }
}

/// Axis-aligned bounding box of the transformed surface in viewport space.
pub fn transformed_bounds(
    width: f64,
    height: f64,
    transform: &ViewTransform,
) -> (f64, f64, f64, f64) {
    let corners = [
        transform.apply(0.0, 0.0),
        transform.apply(width, 0.0),
        transform.apply(0.0, height),
        transform.apply(width, height),
    ];
    let min_x = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    (min_x, max_x, min_y, max_y)
}

/// One drawing surface's view state: the CSS-equivalent surface size, the
/// viewport it lives in, and the current transform.
#[derive(Clone, Debug)]
pub struct SurfaceView {
    pub css_width: f64,
    pub css_height: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    transform: ViewTransform,
}

impl SurfaceView {
    pub fn new(css_width: f64, css_height: f64, viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            css_width,
            css_height,
            viewport_width,
            viewport_height,
            transform: ViewTransform::default(),
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    /// Reset pan/zoom/rotation to the identity (e.g. after a resize).
    pub fn reset(&mut self) {
        self.transform = ViewTransform::default();
    }

    /// Apply a transform, clamping translation so the surface keeps at least
    /// [`MIN_VISIBLE`] pixels inside the viewport on every edge.
    pub fn set_transform(&mut self, tx: f64, ty: f64, scale: f64, rotation_deg: f64) {
        let mut next = ViewTransform { tx, ty, scale, rotation_deg };
        let (tx, ty) = self.clamp_translation(&next);
        next.tx = tx;
        next.ty = ty;
        self.transform = next;
    }

    fn clamp_translation(&self, transform: &ViewTransform) -> (f64, f64) {
        if self.viewport_width <= 0.0 || self.viewport_height <= 0.0 {
            return (transform.tx, transform.ty);
        }
        let (min_x, max_x, min_y, max_y) =
            transformed_bounds(self.css_width, self.css_height, transform);
        let max_left = self.viewport_width - MIN_VISIBLE;
        let max_top = self.viewport_height - MIN_VISIBLE;

        let mut shift_x = 0.0;
        let mut shift_y = 0.0;

        // Never let the surface leave the viewport entirely
        if max_x < MIN_VISIBLE {
            shift_x = MIN_VISIBLE - max_x;
        } else if min_x > max_left {
            shift_x = max_left - min_x;
        }
        if max_y < MIN_VISIBLE {
            shift_y = MIN_VISIBLE - max_y;
        } else if min_y > max_top {
            shift_y = max_top - min_y;
        }

        (transform.tx + shift_x, transform.ty + shift_y)
    }

    /// Translation that puts the surface midpoint at the viewport center for
    /// a given scale and rotation.
    fn centered_translation(&self, scale: f64, rotation_deg: f64) -> (f64, f64) {
        let probe = ViewTransform { tx: 0.0, ty: 0.0, scale, rotation_deg };
        let (mx, my) = probe.apply(self.css_width / 2.0, self.css_height / 2.0);
        (self.viewport_width / 2.0 - mx, self.viewport_height / 2.0 - my)
    }

    /// Zoom by `factor` while keeping the surface point under the given
    /// viewport point fixed. Scale is clamped to `[MIN_SCALE, MAX_SCALE]`
    /// and snaps to exactly 1 (recentered) inside the snap window.
    pub fn zoom_around_point(&mut self, factor: f64, view_x: f64, view_y: f64) {
        let current = self.transform;
        let mut new_scale = (current.scale * factor).clamp(MIN_SCALE, MAX_SCALE);

        // Surface-local point under the cursor before the zoom
        let (px, py) = current.invert(view_x, view_y);

        let probe = ViewTransform {
            tx: 0.0,
            ty: 0.0,
            scale: new_scale,
            rotation_deg: current.rotation_deg,
        };
        let (qx, qy) = probe.apply(px, py);
        let mut new_tx = view_x - qx;
        let mut new_ty = view_y - qy;

        if new_scale < MIN_SCALE + SCALE_SNAP_WINDOW {
            new_scale = MIN_SCALE;
            let (cx, cy) = self.centered_translation(new_scale, current.rotation_deg);
            new_tx = cx;
            new_ty = cy;
        }

        self.set_transform(new_tx, new_ty, new_scale, current.rotation_deg);
    }

    /// Rotate by `delta_deg` around whatever surface point currently sits at
    /// the viewport center, re-solving translation so that point stays put
    /// and rotation never turns into a pan.
    pub fn rotate_around_viewport_center(&mut self, delta_deg: f64) {
        let current = self.transform;
        let cx = self.viewport_width / 2.0;
        let cy = self.viewport_height / 2.0;

        let (px, py) = current.invert(cx, cy);

        let new_rotation = current.rotation_deg + delta_deg;
        let probe =
            ViewTransform { tx: 0.0, ty: 0.0, scale: current.scale, rotation_deg: new_rotation };
        let (qx, qy) = probe.apply(px, py);

        self.set_transform(cx - qx, cy - qy, current.scale, new_rotation);
    }

    /// Map a pointer position (viewport space) to raster-buffer pixel
    /// coordinates, clamped to the buffer. The identity transform takes the
    /// direct CSS→raster scaling path; anything else goes through the matrix
    /// inverse.
    pub fn map_pointer_to_raster(
        &self,
        view_x: f64,
        view_y: f64,
        raster_width: u32,
        raster_height: u32,
    ) -> (f64, f64) {
        let css_w = if self.css_width > 0.0 { self.css_width } else { 1.0 };
        let css_h = if self.css_height > 0.0 { self.css_height } else { 1.0 };

        let (local_x, local_y) = if self.transform.is_identity() {
            (view_x, view_y)
        } else {
            self.transform.invert(view_x, view_y)
        };

        let x = local_x / css_w * raster_width as f64;
        let y = local_y / css_h * raster_height as f64;
        (x.clamp(0.0, raster_width as f64), y.clamp(0.0, raster_height as f64))
    }

    /// Viewport position of the reference-grid anchor dot: local point
    /// `(w/2, h−8)` through the transform, clamped into the viewport with a
    /// small margin.
    pub fn grid_anchor(&self) -> (f64, f64) {
        let local_x = self.css_width / 2.0;
        let local_y = (self.css_height - 8.0).max(0.0);
        let (x, y) = self.transform.apply(local_x, local_y);
        let max_x = (self.viewport_width - GRID_ANCHOR_MARGIN).max(GRID_ANCHOR_MARGIN);
        let max_y = (self.viewport_height - GRID_ANCHOR_MARGIN).max(GRID_ANCHOR_MARGIN);
        (x.clamp(GRID_ANCHOR_MARGIN, max_x), y.clamp(GRID_ANCHOR_MARGIN, max_y))
    }
}

// ---------------------------------------------------------------------------
// Two-finger gestures
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

pub fn touch_distance(a: TouchPoint, b: TouchPoint) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

pub fn touch_angle_deg(a: TouchPoint, b: TouchPoint) -> f64 {
    (b.y - a.y).atan2(b.x - a.x).to_degrees()
}

pub fn touch_center(a: TouchPoint, b: TouchPoint) -> (f64, f64) {
    ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Normalize an angle delta into (−180°, 180°] so a finger crossing the
/// ±180° seam doesn't read as a near-full-circle jump.
pub fn normalize_angle_delta(delta_deg: f64) -> f64 {
    let mut delta = delta_deg;
    while delta > 180.0 {
        delta -= 360.0;
    }
    while delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Frame-to-frame state of an active two-finger gesture.
#[derive(Clone, Copy, Debug)]
pub struct PinchState {
    last_dist: f64,
    last_angle_deg: f64,
    last_center: (f64, f64),
}

impl PinchState {
    pub fn begin(a: TouchPoint, b: TouchPoint) -> Self {
        Self {
            last_dist: touch_distance(a, b),
            last_angle_deg: touch_angle_deg(a, b),
            last_center: touch_center(a, b),
        }
    }
}

impl SurfaceView {
    /// Apply one input frame of a two-finger gesture: pan by the midpoint
    /// delta, zoom by the distance ratio, rotate by the angle delta. The
    /// three updates are independent and order-insensitive per frame.
    pub fn apply_pinch_frame(&mut self, state: &mut PinchState, a: TouchPoint, b: TouchPoint) {
        let dist = touch_distance(a, b);
        let angle = touch_angle_deg(a, b);
        let center = touch_center(a, b);

        // 1) Pan by the midpoint movement
        let pan_dx = center.0 - state.last_center.0;
        let pan_dy = center.1 - state.last_center.1;
        if pan_dx != 0.0 || pan_dy != 0.0 {
            let t = self.transform;
            self.set_transform(t.tx + pan_dx, t.ty + pan_dy, t.scale, t.rotation_deg);
        }

        // 2) Zoom around the midpoint
        let zoom_factor = if state.last_dist > 0.0 { dist / state.last_dist } else { 1.0 };
        if (zoom_factor - 1.0).abs() > 0.0001 {
            self.zoom_around_point(zoom_factor, center.0, center.1);
        }

        // 3) Rotate around the visible center
        let delta_deg = normalize_angle_delta(angle - state.last_angle_deg);
        if delta_deg.abs() > 0.05 {
            self.rotate_around_viewport_center(delta_deg);
        }

        // Light snap back to 0° so near-level surfaces end up exactly level
        let t = self.transform;
        if t.rotation_deg.abs() < ROTATION_SNAP_DEG && t.rotation_deg != 0.0 {
            self.set_transform(t.tx, t.ty, t.scale, 0.0);
        }

        state.last_dist = dist;
        state.last_angle_deg = angle;
        state.last_center = center;
    }
}
