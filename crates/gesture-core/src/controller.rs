//! The gesture controller.
//!
//! # Rules
//!
//! 1. **Pinch** starts when a second pointer goes down. Zoom follows
//!    `start_zoom * d1 / d0`, where `d0` is the pointer distance at pinch
//!    start and `d1` the current one. The pinch midpoint stays fixed.
//! 2. **Pan** applies while exactly one pointer is active and no pinch is
//!    running. The center moves against the pointer by the normalized
//!    delta divided by zoom, so panning slows down as zoom increases.
//!    Lifting one of the two pinch fingers while others remain re-anchors
//!    the pinch on the two that are left.
//! 3. **Wheel** with ctrl or meta held zooms one step per event, keeping
//!    the pointer location fixed.
//!
//! Every update goes through [`ViewportState`], which re-clamps the center
//! so the crop window never leaves the source.

use lenscast_viewport::{
    Center, InputSample, PointerId, PointerSample, PresentationSize, SourceSize, ViewportState,
    WheelSample,
};

/// Tunables for gesture handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// Multiplicative zoom per modified wheel notch.
    pub wheel_step: f64,

    /// Smallest pinch start distance (presentation pixels) used as divisor.
    pub min_pinch_distance: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            wheel_step: 1.1,
            min_pinch_distance: 1.0,
        }
    }
}

/// Environment the controller consults for each sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureContext {
    /// Current presentation size of the interaction surface.
    pub presentation: PresentationSize,

    /// Current source dimensions, if metadata is available.
    pub source: Option<SourceSize>,
}

/// What a sample did to the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEffect {
    /// Sample consumed without changing the viewport.
    None,
    /// The center moved.
    Pan { from: Center, to: Center },
    /// Zoom (and possibly center) changed.
    Zoom { from: f64, to: f64 },
    /// A second pointer went down and a pinch began.
    PinchStarted,
    /// A pinch pointer went up.
    PinchEnded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PinchAnchor {
    ids: (PointerId, PointerId),
    start_distance: f64,
    start_zoom: f64,
    /// Normalized midpoint at pinch start.
    focus: (f64, f64),
}

/// Tracking state between samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureState {
    /// Active pointers in the order they went down.
    pointers: Vec<PointerSample>,
    pinch: Option<PinchAnchor>,
    /// Last position of the panning pointer.
    last_pan: Option<PointerSample>,
}

impl GestureState {
    /// Number of pointers currently down.
    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    fn pointer(&self, id: PointerId) -> Option<&PointerSample> {
        self.pointers.iter().find(|p| p.id == id)
    }

    fn upsert(&mut self, sample: PointerSample) {
        match self.pointers.iter_mut().find(|p| p.id == sample.id) {
            Some(existing) => *existing = sample,
            None => self.pointers.push(sample),
        }
    }
}

/// Apply one sample.
///
/// Pure: the inputs are left untouched and the next gesture state, the
/// next viewport and a description of the change are returned.
pub fn apply(
    state: &GestureState,
    viewport: &ViewportState,
    sample: &InputSample,
    ctx: &GestureContext,
    config: &GestureConfig,
) -> (GestureState, ViewportState, GestureEffect) {
    let mut state = state.clone();
    let mut viewport = *viewport;

    if !has_finite_position(sample) {
        return (state, viewport, GestureEffect::None);
    }

    let effect = match *sample {
        InputSample::PointerDown(p) => pointer_down(&mut state, &viewport, p, ctx, config),
        InputSample::PointerMove(p) => pointer_move(&mut state, &mut viewport, p, ctx),
        InputSample::PointerUp(p) | InputSample::PointerCancel(p) => {
            pointer_up(&mut state, &viewport, p, ctx, config)
        }
        InputSample::Wheel(w) => wheel(&mut viewport, w, ctx, config),
    };

    (state, viewport, effect)
}

/// Up and cancel only need the pointer id, so their coordinates are not
/// checked.
fn has_finite_position(sample: &InputSample) -> bool {
    match *sample {
        InputSample::PointerDown(p) | InputSample::PointerMove(p) => {
            p.x.is_finite() && p.y.is_finite()
        }
        InputSample::Wheel(w) => w.x.is_finite() && w.y.is_finite(),
        InputSample::PointerUp(_) | InputSample::PointerCancel(_) => true,
    }
}

fn anchor_pinch(
    a: PointerSample,
    b: PointerSample,
    viewport: &ViewportState,
    ctx: &GestureContext,
    config: &GestureConfig,
) -> PinchAnchor {
    let (mx, my) = a.midpoint(&b);
    PinchAnchor {
        ids: (a.id, b.id),
        start_distance: a.distance_to(&b).max(config.min_pinch_distance),
        start_zoom: viewport.zoom(),
        focus: ctx.presentation.normalize(mx, my),
    }
}

fn pointer_down(
    state: &mut GestureState,
    viewport: &ViewportState,
    sample: PointerSample,
    ctx: &GestureContext,
    config: &GestureConfig,
) -> GestureEffect {
    state.upsert(sample);

    match state.pointers.len() {
        1 => {
            state.last_pan = Some(sample);
            GestureEffect::None
        }
        2 if state.pinch.is_none() => {
            let (a, b) = (state.pointers[0], state.pointers[1]);
            state.pinch = Some(anchor_pinch(a, b, viewport, ctx, config));
            state.last_pan = None;
            GestureEffect::PinchStarted
        }
        // Extra fingers neither pan nor join the running pinch.
        _ => GestureEffect::None,
    }
}

fn pointer_move(
    state: &mut GestureState,
    viewport: &mut ViewportState,
    sample: PointerSample,
    ctx: &GestureContext,
) -> GestureEffect {
    if state.pointer(sample.id).is_none() {
        return GestureEffect::None;
    }
    state.upsert(sample);

    if let Some(pinch) = state.pinch {
        if sample.id != pinch.ids.0 && sample.id != pinch.ids.1 {
            return GestureEffect::None;
        }
        let (Some(a), Some(b)) = (state.pointer(pinch.ids.0), state.pointer(pinch.ids.1)) else {
            return GestureEffect::None;
        };
        let ratio = a.distance_to(b) / pinch.start_distance;
        let target = pinch.start_zoom * ratio;
        return zoom_about(viewport, target, pinch.focus, ctx.source);
    }

    if state.pointers.len() != 1 {
        return GestureEffect::None;
    }

    let Some(last) = state.last_pan.replace(sample) else {
        return GestureEffect::None;
    };
    if last.id != sample.id {
        return GestureEffect::None;
    }

    let (nx, ny) = ctx
        .presentation
        .normalize(sample.x - last.x, sample.y - last.y);
    let from = viewport.center();
    let zoom = viewport.zoom();
    let target = Center::new(from.cx - nx / zoom, from.cy - ny / zoom);
    viewport.set_center(target, ctx.source);

    let to = viewport.center();
    if to == from {
        GestureEffect::None
    } else {
        GestureEffect::Pan { from, to }
    }
}

fn pointer_up(
    state: &mut GestureState,
    viewport: &ViewportState,
    sample: PointerSample,
    ctx: &GestureContext,
    config: &GestureConfig,
) -> GestureEffect {
    state.pointers.retain(|p| p.id != sample.id);

    let mut effect = GestureEffect::None;
    if let Some(pinch) = state.pinch {
        if sample.id == pinch.ids.0 || sample.id == pinch.ids.1 || state.pointers.len() < 2 {
            state.pinch = None;
            effect = GestureEffect::PinchEnded;
            // Fresh anchor from the current zoom, so the next move does
            // not jump.
            if let [a, b] = state.pointers.as_slice() {
                state.pinch = Some(anchor_pinch(*a, *b, viewport, ctx, config));
                effect = GestureEffect::PinchStarted;
            }
        }
    }

    // Resume panning from where the remaining finger is now, not from
    // where it was before the pinch.
    state.last_pan = match state.pointers.as_slice() {
        [only] if state.pinch.is_none() => Some(*only),
        _ => None,
    };

    effect
}

fn wheel(
    viewport: &mut ViewportState,
    sample: WheelSample,
    ctx: &GestureContext,
    config: &GestureConfig,
) -> GestureEffect {
    if !sample.is_zoom() || sample.delta_y == 0.0 || sample.delta_y.is_nan() {
        return GestureEffect::None;
    }

    let factor = if sample.delta_y < 0.0 {
        config.wheel_step
    } else {
        1.0 / config.wheel_step
    };
    let focus = ctx.presentation.normalize(sample.x, sample.y);
    zoom_about(viewport, viewport.zoom() * factor, focus, ctx.source)
}

/// Zoom to `target`, shifting the center so the normalized `focus` point
/// of the view keeps showing the same source location.
fn zoom_about(
    viewport: &mut ViewportState,
    target: f64,
    focus: (f64, f64),
    source: Option<SourceSize>,
) -> GestureEffect {
    let from = viewport.zoom();
    let to = viewport.bounds().clamp(target);
    let c = viewport.center();
    let shift = 1.0 / from - 1.0 / to;
    let center = Center::new(
        c.cx + (focus.0 - 0.5) * shift,
        c.cy + (focus.1 - 0.5) * shift,
    );
    viewport.set(to, center, source);

    if viewport.zoom() == from {
        GestureEffect::None
    } else {
        GestureEffect::Zoom {
            from,
            to: viewport.zoom(),
        }
    }
}

/// Stateful wrapper around [`apply`] for hosts that feed samples one by one.
#[derive(Debug, Clone, Default)]
pub struct GestureController {
    config: GestureConfig,
    state: GestureState,
}

impl GestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::default(),
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Consume a sample, updating `viewport` in place.
    pub fn handle(
        &mut self,
        viewport: &mut ViewportState,
        sample: &InputSample,
        ctx: &GestureContext,
    ) -> GestureEffect {
        let (state, next, effect) = apply(&self.state, viewport, sample, ctx, &self.config);
        self.state = state;
        *viewport = next;
        effect
    }

    /// Forget all active pointers (listeners detached).
    pub fn reset(&mut self) {
        self.state = GestureState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lenscast_viewport::ZoomBounds;
    use proptest::prelude::*;

    const HD: SourceSize = SourceSize {
        width: 1920,
        height: 1080,
    };

    fn ctx() -> GestureContext {
        GestureContext {
            presentation: PresentationSize::new(1000.0, 500.0),
            source: Some(HD),
        }
    }

    fn down(id: PointerId, x: f64, y: f64) -> InputSample {
        InputSample::PointerDown(PointerSample::new(id, x, y, 0.0))
    }

    fn moved(id: PointerId, x: f64, y: f64) -> InputSample {
        InputSample::PointerMove(PointerSample::new(id, x, y, 16.0))
    }

    fn up(id: PointerId) -> InputSample {
        InputSample::PointerUp(PointerSample::new(id, 0.0, 0.0, 32.0))
    }

    fn ctrl_wheel(delta_y: f64) -> InputSample {
        InputSample::Wheel(WheelSample {
            delta_y,
            ctrl_key: true,
            meta_key: false,
            x: 500.0,
            y: 250.0,
        })
    }

    #[test]
    fn pinch_scales_by_distance_ratio() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::default();

        ctl.handle(&mut vp, &down(1, 400.0, 250.0), &ctx());
        assert_eq!(
            ctl.handle(&mut vp, &down(2, 600.0, 250.0), &ctx()),
            GestureEffect::PinchStarted
        );
        ctl.handle(&mut vp, &moved(2, 800.0, 250.0), &ctx());

        assert!((vp.zoom() - 2.0).abs() < 1e-12);
        // Pinch centered on the view keeps the center in place.
        assert_eq!(vp.center(), Center::MIDDLE);
    }

    #[test]
    fn pinch_does_not_compound_across_samples() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::default();
        ctl.handle(&mut vp, &down(1, 400.0, 250.0), &ctx());
        ctl.handle(&mut vp, &down(2, 500.0, 250.0), &ctx());
        ctl.handle(&mut vp, &moved(2, 550.0, 250.0), &ctx());
        ctl.handle(&mut vp, &moved(2, 550.0, 250.0), &ctx());
        assert!((vp.zoom() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn pinch_is_clamped_to_bounds() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::default();
        ctl.handle(&mut vp, &down(1, 490.0, 250.0), &ctx());
        ctl.handle(&mut vp, &down(2, 510.0, 250.0), &ctx());
        ctl.handle(&mut vp, &moved(2, 990.0, 250.0), &ctx());
        assert_eq!(vp.zoom(), 4.0);
    }

    #[test]
    fn lifting_a_pinch_finger_does_not_jump_the_pan() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::new(ZoomBounds::default(), 2.0);

        ctl.handle(&mut vp, &down(1, 400.0, 250.0), &ctx());
        ctl.handle(&mut vp, &down(2, 600.0, 250.0), &ctx());
        ctl.handle(&mut vp, &moved(1, 300.0, 250.0), &ctx());
        assert_eq!(ctl.handle(&mut vp, &up(2), &ctx()), GestureEffect::PinchEnded);
        assert!(!ctl.state().is_pinching());

        let before = vp.center();
        // Same position as the remaining finger's last move: no pan.
        assert_eq!(
            ctl.handle(&mut vp, &moved(1, 300.0, 250.0), &ctx()),
            GestureEffect::None
        );
        assert_eq!(vp.center(), before);
    }

    #[test]
    fn lifting_a_pinch_finger_with_three_down_re_anchors_on_the_rest() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::default();

        ctl.handle(&mut vp, &down(1, 400.0, 250.0), &ctx());
        ctl.handle(&mut vp, &down(2, 500.0, 250.0), &ctx());
        ctl.handle(&mut vp, &down(3, 700.0, 250.0), &ctx());
        assert_eq!(
            ctl.handle(&mut vp, &up(2), &ctx()),
            GestureEffect::PinchStarted
        );
        assert_eq!(ctl.state().active_pointers(), 2);
        assert!(ctl.state().is_pinching());
        assert_eq!(vp.zoom(), 1.0);

        // Pointers 1 and 3 are 300 apart; spreading to 600 doubles zoom.
        let effect = ctl.handle(&mut vp, &moved(3, 1000.0, 250.0), &ctx());
        assert!(matches!(effect, GestureEffect::Zoom { .. }));
        assert!((vp.zoom() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn lifting_the_extra_finger_keeps_the_pinch() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::default();

        ctl.handle(&mut vp, &down(1, 400.0, 250.0), &ctx());
        ctl.handle(&mut vp, &down(2, 500.0, 250.0), &ctx());
        ctl.handle(&mut vp, &down(3, 700.0, 250.0), &ctx());
        ctl.handle(&mut vp, &moved(2, 600.0, 250.0), &ctx());
        assert_eq!(ctl.handle(&mut vp, &up(3), &ctx()), GestureEffect::None);
        assert!(ctl.state().is_pinching());
        assert!((vp.zoom() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn non_finite_positions_leave_the_viewport_alone() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::new(ZoomBounds::default(), 2.0);
        ctl.handle(&mut vp, &down(1, 400.0, 250.0), &ctx());
        ctl.handle(&mut vp, &down(2, 600.0, 250.0), &ctx());
        let before = vp;

        assert_eq!(
            ctl.handle(&mut vp, &moved(2, f64::NAN, 250.0), &ctx()),
            GestureEffect::None
        );
        assert_eq!(
            ctl.handle(&mut vp, &down(3, f64::INFINITY, 0.0), &ctx()),
            GestureEffect::None
        );
        let wheel = InputSample::Wheel(WheelSample {
            delta_y: -1.0,
            ctrl_key: true,
            meta_key: false,
            x: f64::NAN,
            y: 10.0,
        });
        assert_eq!(ctl.handle(&mut vp, &wheel, &ctx()), GestureEffect::None);
        assert_eq!(vp, before);
        assert_eq!(ctl.state().active_pointers(), 2);
    }

    #[test]
    fn pan_moves_against_pointer_scaled_by_zoom() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::new(ZoomBounds::default(), 2.0);

        ctl.handle(&mut vp, &down(1, 500.0, 250.0), &ctx());
        let effect = ctl.handle(&mut vp, &moved(1, 600.0, 300.0), &ctx());

        // dx = 0.1, dy = 0.1 normalized; at zoom 2 the center moves 0.05.
        assert!(matches!(effect, GestureEffect::Pan { .. }));
        assert!((vp.center().cx - 0.45).abs() < 1e-12);
        assert!((vp.center().cy - 0.45).abs() < 1e-12);
    }

    #[test]
    fn pan_at_zoom_one_is_pinned() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::default();
        ctl.handle(&mut vp, &down(1, 500.0, 250.0), &ctx());
        assert_eq!(
            ctl.handle(&mut vp, &moved(1, 900.0, 10.0), &ctx()),
            GestureEffect::None
        );
        assert_eq!(vp.center(), Center::MIDDLE);
    }

    #[test]
    fn moves_from_unknown_pointers_are_ignored() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::new(ZoomBounds::default(), 2.0);
        assert_eq!(
            ctl.handle(&mut vp, &moved(9, 10.0, 10.0), &ctx()),
            GestureEffect::None
        );
    }

    #[test]
    fn wheel_requires_modifier() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::default();
        let plain = InputSample::Wheel(WheelSample {
            delta_y: -100.0,
            ctrl_key: false,
            meta_key: false,
            x: 0.0,
            y: 0.0,
        });
        assert_eq!(ctl.handle(&mut vp, &plain, &ctx()), GestureEffect::None);
        assert_eq!(vp.zoom(), 1.0);
    }

    #[test]
    fn wheel_steps_multiplicatively() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::default();

        ctl.handle(&mut vp, &ctrl_wheel(-100.0), &ctx());
        assert!((vp.zoom() - 1.1).abs() < 1e-12);
        ctl.handle(&mut vp, &ctrl_wheel(-3.0), &ctx());
        assert!((vp.zoom() - 1.21).abs() < 1e-12);
        ctl.handle(&mut vp, &ctrl_wheel(40.0), &ctx());
        assert!((vp.zoom() - 1.1).abs() < 1e-12);
    }

    #[test]
    fn wheel_zoom_keeps_pointer_location_fixed() {
        let mut ctl = GestureController::default();
        let mut vp = ViewportState::new(ZoomBounds::default(), 2.0);
        let sample = InputSample::Wheel(WheelSample {
            delta_y: -1.0,
            ctrl_key: false,
            meta_key: true,
            x: 750.0,
            y: 125.0,
        });

        // Source point under the focus before and after must match.
        let under = |vp: &ViewportState| {
            let c = vp.center();
            (c.cx + 0.25 / vp.zoom(), c.cy - 0.25 / vp.zoom())
        };
        let before = under(&vp);
        ctl.handle(&mut vp, &sample, &ctx());
        let after = under(&vp);
        assert!((before.0 - after.0).abs() < 1e-12);
        assert!((before.1 - after.1).abs() < 1e-12);
    }

    #[test]
    fn apply_is_pure() {
        let state = GestureState::default();
        let vp = ViewportState::default();
        let (next, next_vp, _) = apply(
            &state,
            &vp,
            &ctrl_wheel(-1.0),
            &ctx(),
            &GestureConfig::default(),
        );
        assert_eq!(state, GestureState::default());
        assert_eq!(vp, ViewportState::default());
        assert_eq!(next, GestureState::default());
        assert!(next_vp.zoom() > 1.0);
    }

    proptest! {
        #[test]
        fn pinch_ratio_matches_distance_ratio(
            start_zoom in 1.0f64..4.0,
            d0 in 20.0f64..400.0,
            d1 in 20.0f64..400.0,
        ) {
            let target = start_zoom * d1 / d0;
            prop_assume!(target >= 1.0 && target <= 4.0);

            let mut ctl = GestureController::default();
            let mut vp = ViewportState::new(ZoomBounds::default(), start_zoom);
            let zoom_before = vp.zoom();

            ctl.handle(&mut vp, &down(1, 100.0, 200.0), &ctx());
            ctl.handle(&mut vp, &down(2, 100.0 + d0, 200.0), &ctx());
            ctl.handle(&mut vp, &moved(2, 100.0 + d1, 200.0), &ctx());

            prop_assert!((vp.zoom() / zoom_before - d1 / d0).abs() < 1e-9);
        }

        #[test]
        fn gestures_keep_crop_inside_source(
            moves in proptest::collection::vec((0.0f64..1000.0, 0.0f64..500.0), 1..20),
            wheel in -5i32..5,
        ) {
            let mut ctl = GestureController::default();
            let mut vp = ViewportState::default();
            for _ in 0..wheel.unsigned_abs() {
                ctl.handle(&mut vp, &ctrl_wheel(-f64::from(wheel.signum())), &ctx());
            }
            ctl.handle(&mut vp, &down(1, 500.0, 250.0), &ctx());
            for (x, y) in moves {
                ctl.handle(&mut vp, &moved(1, x, y), &ctx());
                let rect = vp.crop_rect(HD).unwrap();
                prop_assert!(rect.is_within(HD, 1e-6));
            }
        }
    }
}
