//! Placement geometry: fit-within scaling and centering.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Where the scaled subject lands on the backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub size: Size,
}

/// Scales `source` proportionally to fit inside `bounds`, never enlarging.
///
/// The constrained side takes the bound exactly; the other side is either
/// the floor or the ceil of its scaled length, whichever keeps the aspect
/// ratio closer to the source. Neither side drops below 1.
pub fn fit_within(source: Size, bounds: Size) -> Size {
    let bound_w = bounds.width.max(1);
    let bound_h = bounds.height.max(1);
    if source.width == 0 || source.height == 0 {
        return source;
    }
    if bound_w >= source.width && bound_h >= source.height {
        return source;
    }

    let aspect = f64::from(source.width) / f64::from(source.height);
    let (x, y) = (f64::from(bound_w), f64::from(bound_h));

    if x / y >= aspect {
        let width = round_aspect(y * aspect, |n| (aspect - n / y).abs());
        Size::new(width, bound_h)
    } else {
        let height = round_aspect(x / aspect, |n| {
            if n == 0.0 {
                0.0
            } else {
                (aspect - x / n).abs()
            }
        });
        Size::new(bound_w, height)
    }
}

fn round_aspect(number: f64, error: impl Fn(f64) -> f64) -> u32 {
    let floor = number.floor();
    let ceil = number.ceil();
    // Ties keep the floor.
    let best = if error(ceil) < error(floor) { ceil } else { floor };
    (best as u32).max(1)
}

/// Top-left offset that centers `inner` over `outer` (floor division).
pub fn center_offset(outer: Size, inner: Size) -> (u32, u32) {
    (
        outer.width.saturating_sub(inner.width) / 2,
        outer.height.saturating_sub(inner.height) / 2,
    )
}

/// Fits `subject` into `canvas` and centers it.
pub fn place(subject: Size, canvas: Size) -> Placement {
    let size = fit_within(subject, canvas);
    let (x, y) = center_offset(canvas, size);
    Placement { x, y, size }
}
